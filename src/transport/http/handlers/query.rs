use crate::app::Scope;
use crate::error::AppError;
use crate::transport::http::types::{AppState, QueryParams};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;

#[utoipa::path(
    get,
    path = "/query",
    params(QueryParams),
    responses(
        (status = 200, description = "Records of the collection (one object when `id` is given)", body = Vec<serde_json::Value>),
        (status = 400, description = "Missing or invalid collection", body = crate::transport::http::types::ErrorResponse),
        (status = 404, description = "No record with that id", body = crate::transport::http::types::ErrorResponse),
        (status = 500, description = "Store error", body = crate::transport::http::types::ErrorResponse)
    )
)]
pub async fn query_handler(
    State(state): State<AppState>,
    Query(params): Query<QueryParams>,
) -> impl IntoResponse {
    let collection = params.collection.unwrap_or_default();

    if let Some(id) = params.id {
        return match state.service.get_by_id(&collection, &id).await {
            Ok(record) => (StatusCode::OK, Json(record)).into_response(),
            Err(e) => e.into_response(),
        };
    }

    let scope = match (params.owner, params.applicant) {
        (Some(_), Some(_)) => {
            return AppError::BadRequest("owner and applicant cannot be combined".to_string())
                .into_response()
        }
        (Some(owner), None) => Scope::Owner(owner),
        (None, Some(applicant)) => Scope::Applicant(applicant),
        (None, None) => Scope::All,
    };

    match state.service.query(&collection, scope).await {
        Ok(rows) => (StatusCode::OK, Json(rows)).into_response(),
        Err(e) => e.into_response(),
    }
}
