use crate::transport::http::types::{AppState, SchemaResponse};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;

#[utoipa::path(
    get,
    path = "/bootstrap/schema",
    responses(
        (status = 200, description = "Declared layout vs. live columns per collection", body = SchemaResponse),
        (status = 500, description = "Internal server error", body = crate::transport::http::types::ErrorResponse)
    )
)]
pub async fn bootstrap_get_schema_handler(State(state): State<AppState>) -> impl IntoResponse {
    match state.service.schema_report().await {
        Ok(collections) => (StatusCode::OK, Json(SchemaResponse { collections })).into_response(),
        Err(e) => e.into_response(),
    }
}
