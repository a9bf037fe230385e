//! Process startup shared by the binaries: tracing and service construction.

use crate::app::CollectionService;
use crate::domain::collection::CollectionRegistry;
use crate::infra::config::{mask_url, Config, StorageKind, DATABASE_URL_VARS};
use crate::storage::{CollectionStore, MemoryCollectionStore, PgCollectionStore};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// `RUST_LOG` when set, else the configured level.
pub fn init_tracing(cfg: &Config) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cfg.log_level.clone()));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_level(true)
                .with_target(false),
        )
        .init();
}

/// The registry with `column_layout` collections switched over.
pub fn registry_from_config(cfg: &Config) -> anyhow::Result<CollectionRegistry> {
    let mut registry = CollectionRegistry::builtin();
    for name in &cfg.column_layout {
        if !registry.use_column_layout(name) {
            anyhow::bail!(
                "column_layout names unknown collection '{}' (known: {})",
                name,
                registry.list_collections().join(", ")
            );
        }
    }
    Ok(registry)
}

pub async fn connect_store(cfg: &Config) -> anyhow::Result<Arc<dyn CollectionStore>> {
    match cfg.storage {
        StorageKind::Memory => Ok(Arc::new(MemoryCollectionStore::new())),
        StorageKind::Postgres => {
            let url = cfg.resolve_database_url().ok_or_else(|| {
                anyhow::anyhow!(
                    "no database URL: set PATITA_DATABASE_URL or one of {}",
                    DATABASE_URL_VARS.join(", ")
                )
            })?;
            info!(url = %mask_url(&url), max_connections = cfg.max_connections, "connecting to postgres");
            let store = PgCollectionStore::connect(&url, cfg.max_connections).await?;
            Ok(Arc::new(store))
        }
    }
}

/// Store + registry + migrations dir. Layouts are not synced yet.
pub async fn build_service(cfg: &Config) -> anyhow::Result<CollectionService> {
    let registry = registry_from_config(cfg)?;
    let store = connect_store(cfg).await?;
    Ok(CollectionService::new(store, registry).with_migrations_dir(cfg.migrations_dir.clone()))
}
