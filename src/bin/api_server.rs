// src/bin/api_server.rs

use patita_store::infra::startup::{build_service, init_tracing};
use patita_store::transport;
use patita_store::Config;
use tracing::{info, warn};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg = Config::load()?;
    init_tracing(&cfg);

    info!(
        bind_addr = %cfg.bind_addr,
        storage = ?cfg.storage,
        run_migrations = cfg.run_migrations,
        column_layout = ?cfg.column_layout,
        "starting collection service"
    );

    // --- Service Initialization ---
    let service = build_service(&cfg).await?;
    if cfg.run_migrations {
        let applied = service.migrate().await?;
        info!(migrations = applied.len(), "migrations up to date");
    } else {
        service.sync_layouts().await?;
    }
    for report in service.schema_report().await? {
        if !report.matches_layout {
            warn!(
                collection = %report.collection,
                table = %report.table,
                detail = report.detail.as_deref().unwrap_or(""),
                "table does not match its declared layout; writes will fail until migrated"
            );
        }
    }

    // --- API Server Initialization ---
    let bind_addr = cfg.bind_addr.clone();
    let app_state = transport::http::AppState::new(service, cfg);
    let app = transport::http::create_router(app_state).merge(
        SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", transport::http::ApiDoc::openapi()),
    );
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("API server listening on http://{}", bind_addr);
    info!("Swagger UI available at http://{}/swagger-ui", bind_addr);

    tokio::select! {
        result = axum::serve(listener, app) => {
            result?;
        }
        _ = tokio::signal::ctrl_c() => {
            info!("shutdown signal received; exiting");
        }
    }

    Ok(())
}
