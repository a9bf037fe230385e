//! Persistence for collection rows.
//!
//! `CollectionStore` is the seam between the service and a backend. Two backends exist:
//! Postgres via sqlx (`PgCollectionStore`) and an in-process map (`MemoryCollectionStore`)
//! used by tests and by `storage = "memory"` deployments.

use crate::domain::collection::{CollectionSchema, ColumnSpec};
use async_trait::async_trait;
use serde_json::Value as JsonValue;
use std::path::Path;

pub mod memory;
pub mod plan;
pub mod postgres;

pub use memory::MemoryCollectionStore;
pub use plan::{plan_row, ColumnValue, RowPlan};
pub use postgres::PgCollectionStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error(transparent)]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("table '{table}' does not match its declared layout: {detail}; apply the pending migrations (POST /bootstrap/migrate)")]
    SchemaMismatch { table: String, detail: String },
}

impl StoreError {
    pub fn mismatch(table: &str, detail: impl Into<String>) -> Self {
        StoreError::SchemaMismatch {
            table: table.to_string(),
            detail: detail.into(),
        }
    }
}

/// One applied (or already present) migration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationInfo {
    pub version: i64,
    pub description: String,
}

#[async_trait]
pub trait CollectionStore: Send + Sync {
    /// Short backend name for health and preflight output.
    fn backend(&self) -> &'static str;

    /// True when rows live in process memory and no database is involved.
    fn is_in_memory(&self) -> bool {
        false
    }

    /// Every record of a collection. A missing or empty table yields `[]`.
    async fn fetch_all(&self, schema: &CollectionSchema) -> Result<Vec<JsonValue>, StoreError>;

    /// Insert-or-replace one row. Never issues DDL.
    async fn upsert(&self, plan: &RowPlan) -> Result<(), StoreError>;

    /// Deletes by id; returns the number of removed rows.
    async fn delete(&self, schema: &CollectionSchema, id: &str) -> Result<u64, StoreError>;

    async fn ping(&self) -> Result<(), StoreError>;

    /// Live columns of `table`, in ordinal order. Empty when the table does not exist.
    async fn table_columns(&self, table: &str) -> Result<Vec<ColumnSpec>, StoreError>;

    /// Applies the versioned migrations found in `dir`.
    async fn migrate(&self, dir: &Path) -> Result<Vec<MigrationInfo>, StoreError>;
}

/// Double-quoted SQL identifier.
pub(crate) fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}
