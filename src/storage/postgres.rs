//! Postgres-backed collection store.

use crate::domain::collection::{CollectionSchema, ColumnKind, ColumnSpec, Layout, SqlValue};
use crate::storage::{quote_ident, CollectionStore, MigrationInfo, RowPlan, StoreError};
use async_trait::async_trait;
use serde_json::Value as JsonValue;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres, QueryBuilder, Row};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, warn};

const UNDEFINED_COLUMN: &str = "42703";
const UNDEFINED_TABLE: &str = "42P01";

fn db_code(e: &sqlx::Error) -> Option<String> {
    match e {
        sqlx::Error::Database(db) => db.code().map(|c| c.into_owned()),
        _ => None,
    }
}

/// Maps "relation/column does not exist" on the write path onto a schema mismatch.
fn write_error(table: &str, e: sqlx::Error) -> StoreError {
    match db_code(&e).as_deref() {
        Some(UNDEFINED_COLUMN) | Some(UNDEFINED_TABLE) => {
            let detail = match &e {
                sqlx::Error::Database(db) => db.message().to_string(),
                other => other.to_string(),
            };
            StoreError::mismatch(table, detail)
        }
        _ => StoreError::Database(e),
    }
}

#[derive(Clone)]
pub struct PgCollectionStore {
    pool: PgPool,
}

impl PgCollectionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Opens a small pool against `database_url`.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(10))
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn fetch_row_json(&self, table: &str) -> Result<Vec<JsonValue>, sqlx::Error> {
        let sql = format!(
            "SELECT row_to_json(t.*) AS record FROM {} t",
            quote_ident(table)
        );
        debug!(%sql, "fetch");
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
        rows.iter()
            .map(|r| r.try_get::<JsonValue, _>("record"))
            .collect()
    }

    async fn fetch_documents(&self, table: &str) -> Result<Vec<JsonValue>, sqlx::Error> {
        let sql = format!("SELECT id, data FROM {}", quote_ident(table));
        debug!(%sql, "fetch");
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            let id: String = row.try_get("id")?;
            let data: Option<JsonValue> = row.try_get("data")?;
            out.push(match data {
                Some(JsonValue::Object(mut obj)) => {
                    obj.entry("id").or_insert_with(|| JsonValue::from(id));
                    JsonValue::Object(obj)
                }
                Some(other) if !other.is_null() => other,
                _ => serde_json::json!({ "id": id }),
            });
        }
        Ok(out)
    }
}

/// `INSERT .. ON CONFLICT (id)` for a planned row. Column plans only overwrite the
/// columns they carry.
fn upsert_query(plan: &RowPlan) -> QueryBuilder<'static, Postgres> {
    let mut qb: QueryBuilder<'static, Postgres> = QueryBuilder::new("INSERT INTO ");
    qb.push(quote_ident(plan.table()));
    match plan {
        RowPlan::Document { id, data, .. } => {
            qb.push(" (id, data) VALUES (");
            qb.push_bind(id.clone());
            qb.push(", ");
            qb.push_bind(data.clone());
            qb.push("::jsonb) ON CONFLICT (id) DO UPDATE SET data = EXCLUDED.data");
        }
        RowPlan::Columns {
            id, id_type, values, ..
        } => {
            qb.push(" (id");
            for v in values {
                qb.push(", ");
                qb.push(quote_ident(&v.column));
            }
            qb.push(") VALUES (");
            qb.push_bind(id.clone());
            if let Some(cast) = id_cast(id_type) {
                qb.push("::");
                qb.push(cast);
            }
            for v in values {
                qb.push(", ");
                push_value(&mut qb, v.kind, &v.sql_type, &v.value);
            }
            qb.push(") ON CONFLICT (id) DO ");
            if values.is_empty() {
                qb.push("NOTHING");
            } else {
                qb.push("UPDATE SET ");
                let mut sep = qb.separated(", ");
                for v in values {
                    let col = quote_ident(&v.column);
                    sep.push(format!("{} = EXCLUDED.{}", col, col));
                }
            }
        }
    }
    qb
}

fn push_value(
    qb: &mut QueryBuilder<'static, Postgres>,
    kind: ColumnKind,
    sql_type: &str,
    value: &SqlValue,
) {
    match value {
        SqlValue::Json(v) => {
            qb.push_bind(v.clone());
            qb.push("::jsonb");
        }
        SqlValue::Text(v) => {
            qb.push_bind(v.clone());
            if kind == ColumnKind::Other && is_plain_type_name(sql_type) {
                qb.push("::");
                qb.push(sql_type);
            }
        }
        SqlValue::Int(v) => {
            qb.push_bind(*v);
        }
        SqlValue::Float(v) => {
            qb.push_bind(*v);
        }
        SqlValue::Bool(v) => {
            qb.push_bind(*v);
        }
    }
}

/// Ids are bound as text; a non-text `id` column (`int4`, `uuid`, ...) gets an explicit
/// cast so the comparison and the insert type-check.
fn id_cast(id_type: &str) -> Option<&str> {
    (ColumnKind::from_sql_type(id_type) != ColumnKind::Text && is_plain_type_name(id_type))
        .then_some(id_type)
}

fn delete_query(table: &str, id_type: Option<&str>) -> String {
    let cast = id_type
        .and_then(id_cast)
        .map(|t| format!("::{}", t))
        .unwrap_or_default();
    format!("DELETE FROM {} WHERE id = $1{}", quote_ident(table), cast)
}

/// Catalog `udt_name`s are plain identifiers (`timestamptz`, `uuid`, `_text`).
fn is_plain_type_name(t: &str) -> bool {
    let mut chars = t.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[async_trait]
impl CollectionStore for PgCollectionStore {
    fn backend(&self) -> &'static str {
        "postgres"
    }

    async fn fetch_all(&self, schema: &CollectionSchema) -> Result<Vec<JsonValue>, StoreError> {
        let result = match schema.layout {
            Layout::Document => match self.fetch_documents(&schema.table).await {
                Err(e) if db_code(&e).as_deref() == Some(UNDEFINED_COLUMN) => {
                    warn!(
                        table = %schema.table,
                        "document table has no id/data columns; reading row_to_json instead"
                    );
                    self.fetch_row_json(&schema.table).await
                }
                other => other,
            },
            Layout::Columns(_) => self.fetch_row_json(&schema.table).await,
        };
        match result {
            Ok(rows) => Ok(rows),
            Err(e) if db_code(&e).as_deref() == Some(UNDEFINED_TABLE) => {
                debug!(table = %schema.table, "table missing; returning no rows");
                Ok(Vec::new())
            }
            Err(e) => Err(StoreError::Database(e)),
        }
    }

    async fn upsert(&self, plan: &RowPlan) -> Result<(), StoreError> {
        let table = plan.table();
        let mut qb = upsert_query(plan);
        debug!(table, id = plan.id(), "upsert");
        qb.build()
            .execute(&self.pool)
            .await
            .map_err(|e| write_error(table, e))?;
        Ok(())
    }

    async fn delete(&self, schema: &CollectionSchema, id: &str) -> Result<u64, StoreError> {
        let table = schema.table.as_str();
        let sql = delete_query(table, schema.id_sql_type());
        debug!(%sql, id, "delete");
        let res = sqlx::query(&sql)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| write_error(table, e))?;
        Ok(res.rows_affected())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn table_columns(&self, table: &str) -> Result<Vec<ColumnSpec>, StoreError> {
        let rows = sqlx::query(
            "SELECT column_name, udt_name
             FROM information_schema.columns
             WHERE table_schema = current_schema() AND table_name = $1
             ORDER BY ordinal_position",
        )
        .bind(table)
        .fetch_all(&self.pool)
        .await?;

        let mut cols = Vec::with_capacity(rows.len());
        for r in rows {
            let name: String = r.try_get("column_name")?;
            let sql_type: String = r.try_get("udt_name")?;
            cols.push(ColumnSpec { name, sql_type });
        }
        Ok(cols)
    }

    async fn migrate(&self, dir: &Path) -> Result<Vec<MigrationInfo>, StoreError> {
        // Loaded at runtime so deployments can ship their own migrations directory.
        let migrator = sqlx::migrate::Migrator::new(dir).await?;
        migrator.run(&self.pool).await?;
        Ok(migrator
            .iter()
            .map(|m| MigrationInfo {
                version: m.version,
                description: m.description.to_string(),
            })
            .collect())
    }
}
