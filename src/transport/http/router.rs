use crate::app::{CollectionLayoutReport, MutationRequest};
use crate::domain::adoption::RequestStatus;
use crate::domain::collection::{ColumnSpec, FieldError};
use crate::domain::session::{Role, Session};
use crate::transport::http::handlers::{bootstrap, common, health, mutate, query, schema};
use crate::transport::http::types::{
    AppState, DbHealthResponse, ErrorResponse, HealthResponse, MigrateRequest, MigrateResponse,
    MigrationSummary, MutationResponse, SchemaResponse,
};
use axum::http::{header, Method};
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        query::query_handler,
        mutate::mutate_handler,
        health::health_check_handler,
        health::db_health_handler,
        schema::bootstrap_get_schema_handler,
        bootstrap::bootstrap_migrate_handler
    ),
    components(schemas(
        MutationRequest,
        MutationResponse,
        ErrorResponse,
        FieldError,
        HealthResponse,
        DbHealthResponse,
        SchemaResponse,
        CollectionLayoutReport,
        ColumnSpec,
        MigrateRequest,
        MigrateResponse,
        MigrationSummary,
        RequestStatus,
        Role,
        Session
    ))
)]
pub struct ApiDoc;

/// Any origin; `GET, POST, OPTIONS`; `Content-Type, Authorization`.
pub fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}

pub fn create_router(app_state: AppState) -> Router {
    Router::new()
        .route(
            "/query",
            get(query::query_handler).fallback(common::method_not_allowed),
        )
        .route(
            "/mutate",
            post(mutate::mutate_handler).fallback(common::method_not_allowed),
        )
        .route(
            "/health-check",
            get(health::health_check_handler).fallback(common::method_not_allowed),
        )
        .route(
            "/db-health",
            get(health::db_health_handler).fallback(common::method_not_allowed),
        )
        .route(
            "/bootstrap/schema",
            get(schema::bootstrap_get_schema_handler).fallback(common::method_not_allowed),
        )
        .route(
            "/bootstrap/migrate",
            post(bootstrap::bootstrap_migrate_handler).fallback(common::method_not_allowed),
        )
        .fallback(common::not_found)
        .with_state(app_state)
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer())
}
