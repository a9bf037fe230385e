//! In-process store. Tables holding documents appear on first write; column tables must
//! be declared up front with [`MemoryCollectionStore::with_table_columns`], the way a
//! migration would have created them.

use crate::domain::collection::{CollectionSchema, ColumnSpec, Layout};
use crate::storage::{CollectionStore, MigrationInfo, RowPlan, StoreError};
use async_trait::async_trait;
use serde_json::{Map, Value as JsonValue};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use tokio::sync::RwLock;

#[derive(Debug, Default)]
struct MemTable {
    /// `None` for `(id, data)` tables.
    columns: Option<Vec<ColumnSpec>>,
    rows: BTreeMap<String, JsonValue>,
}

impl MemTable {
    fn has_column(&self, name: &str) -> bool {
        match &self.columns {
            Some(cols) => cols.iter().any(|c| c.name == name),
            None => name == "id" || name == "data",
        }
    }
}

#[derive(Debug, Default)]
pub struct MemoryCollectionStore {
    tables: RwLock<HashMap<String, MemTable>>,
}

impl MemoryCollectionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a named-column table.
    pub fn with_table_columns(mut self, table: &str, columns: Vec<ColumnSpec>) -> Self {
        self.tables.get_mut().insert(
            table.to_string(),
            MemTable {
                columns: Some(columns),
                rows: BTreeMap::new(),
            },
        );
        self
    }

    /// Number of rows currently stored in `table`.
    pub async fn row_count(&self, table: &str) -> usize {
        self.tables
            .read()
            .await
            .get(table)
            .map(|t| t.rows.len())
            .unwrap_or(0)
    }
}

fn with_id(data: &JsonValue, id: &str) -> JsonValue {
    match data {
        JsonValue::Object(obj) => {
            let mut obj = obj.clone();
            obj.entry("id").or_insert_with(|| JsonValue::from(id));
            JsonValue::Object(obj)
        }
        _ => serde_json::json!({ "id": id }),
    }
}

#[async_trait]
impl CollectionStore for MemoryCollectionStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    fn is_in_memory(&self) -> bool {
        true
    }

    async fn fetch_all(&self, schema: &CollectionSchema) -> Result<Vec<JsonValue>, StoreError> {
        let tables = self.tables.read().await;
        let Some(table) = tables.get(&schema.table) else {
            return Ok(Vec::new());
        };
        let rows = table.rows.iter();
        let out = match (&schema.layout, &table.columns) {
            (_, None) => rows.map(|(id, data)| with_id(data, id)).collect(),
            (Layout::Document, Some(_)) if table.has_column("data") => rows
                .map(|(id, row)| with_id(row.get("data").unwrap_or(&JsonValue::Null), id))
                .collect(),
            _ => rows.map(|(_, row)| row.clone()).collect(),
        };
        Ok(out)
    }

    async fn upsert(&self, plan: &RowPlan) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        match plan {
            RowPlan::Document { table, id, data } => {
                let t = tables.entry(table.clone()).or_default();
                match &t.columns {
                    None => {
                        t.rows.insert(id.clone(), data.clone());
                    }
                    Some(_) if t.has_column("data") => {
                        let row = t
                            .rows
                            .entry(id.clone())
                            .or_insert_with(|| JsonValue::Object(Map::new()));
                        if let JsonValue::Object(obj) = row {
                            obj.insert("id".to_string(), JsonValue::from(id.as_str()));
                            obj.insert("data".to_string(), data.clone());
                        }
                    }
                    Some(_) => {
                        return Err(StoreError::mismatch(
                            table,
                            "column \"data\" does not exist",
                        ))
                    }
                }
            }
            RowPlan::Columns {
                table, id, values, ..
            } => {
                let Some(t) = tables.get_mut(table) else {
                    return Err(StoreError::mismatch(table, "table does not exist"));
                };
                if let Some(missing) = values.iter().find(|v| !t.has_column(&v.column)) {
                    return Err(StoreError::mismatch(
                        table,
                        format!("column \"{}\" does not exist", missing.column),
                    ));
                }
                let row = t
                    .rows
                    .entry(id.clone())
                    .or_insert_with(|| JsonValue::Object(Map::new()));
                if let JsonValue::Object(obj) = row {
                    obj.insert("id".to_string(), JsonValue::from(id.as_str()));
                    for v in values {
                        obj.insert(v.column.clone(), v.value.to_json());
                    }
                }
            }
        }
        Ok(())
    }

    async fn delete(&self, schema: &CollectionSchema, id: &str) -> Result<u64, StoreError> {
        let mut tables = self.tables.write().await;
        let removed = tables
            .get_mut(&schema.table)
            .and_then(|t| t.rows.remove(id))
            .map(|_| 1)
            .unwrap_or(0);
        Ok(removed)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn table_columns(&self, table: &str) -> Result<Vec<ColumnSpec>, StoreError> {
        let tables = self.tables.read().await;
        Ok(match tables.get(table) {
            Some(MemTable {
                columns: Some(cols),
                ..
            }) => cols.clone(),
            Some(_) => vec![
                ColumnSpec::new("id", "text"),
                ColumnSpec::new("data", "jsonb"),
            ],
            None => Vec::new(),
        })
    }

    async fn migrate(&self, _dir: &Path) -> Result<Vec<MigrationInfo>, StoreError> {
        Ok(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::collection::{CollectionRegistry, ColumnKind, SqlValue};
    use crate::storage::ColumnValue;
    use serde_json::json;

    #[tokio::test]
    async fn document_rows_are_replaced_on_upsert() {
        let store = MemoryCollectionStore::new();
        let reg = CollectionRegistry::builtin();
        let pets = reg.get("pets").unwrap();
        assert!(store.fetch_all(&pets).await.unwrap().is_empty());

        for name in ["Luna", "Toby"] {
            let plan = RowPlan::Document {
                table: "pets".into(),
                id: "p1".into(),
                data: json!({"id": "p1", "name": name}),
            };
            store.upsert(&plan).await.unwrap();
        }
        assert_eq!(
            store.fetch_all(&pets).await.unwrap(),
            vec![json!({"id": "p1", "name": "Toby"})]
        );
        assert_eq!(store.row_count("pets").await, 1);
        assert_eq!(store.delete(&pets, "p1").await.unwrap(), 1);
        assert_eq!(store.delete(&pets, "p1").await.unwrap(), 0);
        assert_eq!(store.row_count("pets").await, 0);
    }

    #[tokio::test]
    async fn column_rows_merge_only_provided_columns() {
        let store = MemoryCollectionStore::new().with_table_columns(
            "users",
            vec![
                ColumnSpec::new("id", "text"),
                ColumnSpec::new("username", "text"),
                ColumnSpec::new("capacity", "int4"),
            ],
        );
        let value = |column: &str, value: SqlValue| ColumnValue {
            column: column.into(),
            sql_type: "text".into(),
            kind: ColumnKind::Text,
            value,
        };
        store
            .upsert(&RowPlan::Columns {
                table: "users".into(),
                id: "u1".into(),
                id_type: "text".into(),
                values: vec![
                    value("username", SqlValue::Text(Some("ana".into()))),
                    value("capacity", SqlValue::Int(Some(4))),
                ],
            })
            .await
            .unwrap();
        store
            .upsert(&RowPlan::Columns {
                table: "users".into(),
                id: "u1".into(),
                id_type: "text".into(),
                values: vec![value("capacity", SqlValue::Int(Some(9)))],
            })
            .await
            .unwrap();

        let mut reg = CollectionRegistry::builtin();
        reg.use_column_layout("users");
        let users = reg.get("users").unwrap();
        assert_eq!(
            store.fetch_all(&users).await.unwrap(),
            vec![json!({"id": "u1", "username": "ana", "capacity": 9})]
        );

        let doc = RowPlan::Document {
            table: "users".into(),
            id: "u2".into(),
            data: json!({"id": "u2"}),
        };
        assert!(matches!(
            store.upsert(&doc).await,
            Err(StoreError::SchemaMismatch { .. })
        ));
    }
}
