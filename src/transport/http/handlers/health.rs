use crate::infra::config::mask_url;
use crate::transport::http::types::{AppState, DbHealthResponse, HealthResponse};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;

#[utoipa::path(
    get,
    path = "/health-check",
    responses(
        (status = 200, description = "Service is reachable", body = HealthResponse)
    )
)]
pub async fn health_check_handler() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            ok: true,
            message: "Service is reachable".to_string(),
        }),
    )
}

#[utoipa::path(
    get,
    path = "/db-health",
    responses(
        (status = 200, description = "Connected, or no database URL / in-memory store (ok=false)", body = DbHealthResponse),
        (status = 500, description = "Database unreachable", body = DbHealthResponse)
    )
)]
pub async fn db_health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let backend = state.service.store().backend().to_string();
    let url = state.config.resolve_database_url();

    if url.is_none() {
        return (
            StatusCode::OK,
            Json(DbHealthResponse {
                ok: false,
                message: "Database URL env var not set".to_string(),
                backend,
                masked_db_url: None,
                vars: Some(state.config.database_url_presence()),
                error: None,
            }),
        )
            .into_response();
    }
    let masked_db_url = url.as_deref().map(mask_url);

    if state.service.store().is_in_memory() {
        return (
            StatusCode::OK,
            Json(DbHealthResponse {
                ok: false,
                message: "In-memory store in use; database not contacted".to_string(),
                backend,
                masked_db_url,
                vars: None,
                error: None,
            }),
        )
            .into_response();
    }

    match state.service.ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(DbHealthResponse {
                ok: true,
                message: "Connected to DB".to_string(),
                backend,
                masked_db_url,
                vars: None,
                error: None,
            }),
        )
            .into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(DbHealthResponse {
                ok: false,
                message: "Failed to connect to DB".to_string(),
                backend,
                masked_db_url,
                vars: None,
                error: Some(e.to_string()),
            }),
        )
            .into_response(),
    }
}
