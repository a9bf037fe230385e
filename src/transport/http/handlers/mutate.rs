use crate::transport::http::handlers::common::parse_mutation_body;
use crate::transport::http::types::{AppState, MutationResponse};
use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;

/// The body is taken as raw bytes so clients that send a BOM or a double-encoded JSON
/// string are still understood.
#[utoipa::path(
    post,
    path = "/mutate",
    request_body = crate::app::MutationRequest,
    responses(
        (status = 200, description = "Mutation applied", body = MutationResponse),
        (status = 400, description = "Invalid body, collection, action, id or field values", body = crate::transport::http::types::ErrorResponse),
        (status = 500, description = "Store error or schema mismatch", body = crate::transport::http::types::ErrorResponse)
    )
)]
pub async fn mutate_handler(State(state): State<AppState>, body: Bytes) -> impl IntoResponse {
    let request = match parse_mutation_body(&body) {
        Ok(r) => r,
        Err(e) => return e.into_response(),
    };

    match state.service.mutate(request).await {
        Ok(id) => (StatusCode::OK, Json(MutationResponse { ok: true, id })).into_response(),
        Err(e) => e.into_response(),
    }
}
