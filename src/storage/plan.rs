use crate::domain::collection::columns::column_matches;
use crate::domain::collection::{CollectionSchema, ColumnKind, Layout, SqlValue};
use crate::storage::StoreError;
use serde_json::{Map, Value as JsonValue};
use std::collections::HashSet;

/// A write, shaped for the table's layout.
#[derive(Debug, Clone, PartialEq)]
pub enum RowPlan {
    Document {
        table: String,
        id: String,
        data: JsonValue,
    },
    Columns {
        table: String,
        id: String,
        /// `udt_name` of the table's `id` column.
        id_type: String,
        values: Vec<ColumnValue>,
    },
}

impl RowPlan {
    pub fn table(&self) -> &str {
        match self {
            RowPlan::Document { table, .. } | RowPlan::Columns { table, .. } => table,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            RowPlan::Document { id, .. } | RowPlan::Columns { id, .. } => id,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnValue {
    pub column: String,
    pub sql_type: String,
    pub kind: ColumnKind,
    pub value: SqlValue,
}

/// Builds the write for `item` under `id`. The second element lists item fields that
/// have no matching column (column layout only) and were dropped.
pub fn plan_row(
    schema: &CollectionSchema,
    id: &str,
    item: &Map<String, JsonValue>,
) -> Result<(RowPlan, Vec<String>), StoreError> {
    let columns = match &schema.layout {
        Layout::Document => {
            let mut data = item.clone();
            data.entry("id").or_insert_with(|| JsonValue::from(id));
            return Ok((
                RowPlan::Document {
                    table: schema.table.clone(),
                    id: id.to_string(),
                    data: JsonValue::Object(data),
                },
                Vec::new(),
            ));
        }
        Layout::Columns(columns) => columns,
    };

    if columns.is_empty() {
        return Err(StoreError::mismatch(
            &schema.table,
            "no columns known for a column-layout table (table missing or schema not synced)",
        ));
    }
    let Some(id_column) = columns.iter().find(|c| c.name == "id") else {
        return Err(StoreError::mismatch(&schema.table, "no \"id\" column"));
    };

    let mut used = HashSet::new();
    let mut values = Vec::new();
    let mut dropped = Vec::new();
    for (field, value) in item {
        if field == "id" {
            continue;
        }
        let target = columns
            .iter()
            .find(|c| c.name != "id" && column_matches(&c.name, field));
        match target {
            Some(col) if used.insert(col.name.clone()) => {
                let kind = ColumnKind::from_sql_type(&col.sql_type);
                values.push(ColumnValue {
                    column: col.name.clone(),
                    sql_type: col.sql_type.clone(),
                    kind,
                    value: kind.coerce(value),
                });
            }
            _ => dropped.push(field.clone()),
        }
    }

    Ok((
        RowPlan::Columns {
            table: schema.table.clone(),
            id: id.to_string(),
            id_type: id_column.sql_type.clone(),
            values,
        },
        dropped,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::collection::{CollectionRegistry, ColumnSpec};
    use serde_json::json;

    fn item(v: JsonValue) -> Map<String, JsonValue> {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn document_plan_keeps_the_whole_item_and_fills_id() {
        let reg = CollectionRegistry::builtin();
        let pets = reg.get("pets").unwrap();
        let (plan, dropped) = plan_row(&pets, "p1", &item(json!({"name": "Luna"}))).unwrap();
        assert!(dropped.is_empty());
        assert_eq!(
            plan,
            RowPlan::Document {
                table: "pets".into(),
                id: "p1".into(),
                data: json!({"id": "p1", "name": "Luna"}),
            }
        );
    }

    #[test]
    fn column_plan_maps_coerces_and_drops() {
        let mut reg = CollectionRegistry::builtin();
        reg.use_column_layout("pets");
        reg.set_columns(
            "pets",
            vec![
                ColumnSpec::new("id", "text"),
                ColumnSpec::new("name", "varchar"),
                ColumnSpec::new("age", "int4"),
                ColumnSpec::new("profile_id", "text"),
                ColumnSpec::new("photos", "jsonb"),
            ],
        );
        let pets = reg.get("pets").unwrap();
        let (plan, dropped) = plan_row(
            &pets,
            "p1",
            &item(json!({
                "id": "p1",
                "name": "Luna",
                "age": "two",
                "profileId": 7,
                "photos": ["a.png"],
                "color": "black"
            })),
        )
        .unwrap();
        assert_eq!(dropped, vec!["color".to_string()]);
        let RowPlan::Columns { id_type, values, .. } = plan else {
            panic!("expected a column plan");
        };
        assert_eq!(id_type, "text");
        let by_col = |c: &str| values.iter().find(|v| v.column == c).unwrap().value.clone();
        assert_eq!(by_col("age"), SqlValue::Float(None));
        assert_eq!(by_col("profile_id"), SqlValue::Text(Some("7".into())));
        assert_eq!(by_col("photos"), SqlValue::Json(Some(json!(["a.png"]))));
    }

    #[test]
    fn column_plan_fails_closed_without_synced_columns() {
        let mut reg = CollectionRegistry::builtin();
        reg.use_column_layout("users");
        let users = reg.get("users").unwrap();
        let err = plan_row(&users, "u1", &item(json!({"username": "ana"}))).unwrap_err();
        assert!(matches!(err, StoreError::SchemaMismatch { ref table, .. } if table == "users"));

        reg.set_columns("users", vec![ColumnSpec::new("username", "text")]);
        let users = reg.get("users").unwrap();
        assert!(plan_row(&users, "u1", &item(json!({"username": "ana"}))).is_err());
    }
}
