use crate::error::AppError;
use crate::transport::http::types::{
    AppState, MigrateRequest, MigrateResponse, MigrationSummary,
};
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use tracing::info;

#[utoipa::path(
    post,
    path = "/bootstrap/migrate",
    request_body = MigrateRequest,
    responses(
        (status = 200, description = "Migrations applied and column layouts re-synced", body = MigrateResponse),
        (status = 400, description = "Bad request", body = crate::transport::http::types::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::transport::http::types::ErrorResponse)
    )
)]
pub async fn bootstrap_migrate_handler(
    State(state): State<AppState>,
    request: Result<Json<MigrateRequest>, JsonRejection>,
) -> impl IntoResponse {
    let Json(request) = match request {
        Ok(v) => v,
        Err(_) => return AppError::InvalidJson.into_response(),
    };

    if !request.confirm {
        return AppError::ConfirmRequired.into_response();
    }

    let applied = match state.service.migrate().await {
        Ok(m) => m,
        Err(e) => return e.into_response(),
    };
    let collections = match state.service.schema_report().await {
        Ok(c) => c,
        Err(e) => return e.into_response(),
    };
    info!(migrations = applied.len(), "bootstrap migrate finished");

    (
        StatusCode::OK,
        Json(MigrateResponse {
            migrated: true,
            migrations: applied
                .into_iter()
                .map(|m| MigrationSummary {
                    version: m.version,
                    description: m.description,
                })
                .collect(),
            collections,
        }),
    )
        .into_response()
}
