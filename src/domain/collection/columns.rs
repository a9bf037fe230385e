//! Field-to-column mapping for column-layout tables.

use serde_json::Value as JsonValue;

/// snake_case column name for a JSON field: `profileId` -> `profile_id`, `pet-ID` -> `pet_id`.
pub fn column_name_for(field: &str) -> String {
    let mut out = String::with_capacity(field.len() + 4);
    let mut prev_lower = false;
    for c in field.chars() {
        if c.is_ascii_uppercase() {
            if prev_lower {
                out.push('_');
            }
            out.push(c.to_ascii_lowercase());
            prev_lower = false;
        } else if c.is_ascii_alphanumeric() {
            out.push(c);
            prev_lower = true;
        } else {
            out.push('_');
            prev_lower = false;
        }
    }
    out
}

/// Plain lowercase form (`profileId` -> `profileid`), the other spelling legacy tables use.
pub fn plain_column_name(field: &str) -> String {
    field
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect()
}

/// Whether `column` is the column a JSON `field` maps onto.
pub fn column_matches(column: &str, field: &str) -> bool {
    column == column_name_for(field) || column == plain_column_name(field)
}

/// How a value must be bound for a column of a given SQL type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Json,
    Text,
    Number,
    Bool,
    Other,
}

impl ColumnKind {
    /// Classifies a catalog type name (`udt_name` or `data_type` spelling).
    pub fn from_sql_type(sql_type: &str) -> Self {
        let t = sql_type.trim().to_lowercase();
        match t.as_str() {
            s if s.starts_with("json") => ColumnKind::Json,
            s if s.contains("char") || s == "text" || s == "bpchar" || s == "citext" => {
                ColumnKind::Text
            }
            "int" | "int2" | "int4" | "int8" | "smallint" | "integer" | "bigint" | "numeric"
            | "decimal" | "real" | "float4" | "float8" | "double precision" => ColumnKind::Number,
            s if s.starts_with("numeric(") || s.starts_with("decimal(") => ColumnKind::Number,
            "bool" | "boolean" => ColumnKind::Bool,
            _ => ColumnKind::Other,
        }
    }

    /// Converts a JSON value into the typed parameter bound for this column.
    pub fn coerce(self, v: &JsonValue) -> SqlValue {
        match self {
            ColumnKind::Json => SqlValue::Json((!v.is_null()).then(|| v.clone())),
            ColumnKind::Text | ColumnKind::Other => SqlValue::Text(match v {
                JsonValue::Null => None,
                JsonValue::String(s) => Some(s.clone()),
                other => Some(other.to_string()),
            }),
            ColumnKind::Number => coerce_number(v),
            ColumnKind::Bool => SqlValue::Bool(match v {
                JsonValue::Bool(b) => Some(*b),
                JsonValue::Number(n) => n.as_f64().map(|f| f != 0.0),
                JsonValue::String(s) => match s.trim().to_lowercase().as_str() {
                    "true" | "t" | "1" => Some(true),
                    "false" | "f" | "0" => Some(false),
                    _ => None,
                },
                JsonValue::Array(_) | JsonValue::Object(_) => Some(true),
                JsonValue::Null => None,
            }),
        }
    }
}

fn coerce_number(v: &JsonValue) -> SqlValue {
    match v {
        JsonValue::Number(n) => match n.as_i64() {
            Some(i) => SqlValue::Int(Some(i)),
            None => SqlValue::Float(n.as_f64()),
        },
        JsonValue::String(s) => {
            let s = s.trim();
            if let Ok(i) = s.parse::<i64>() {
                SqlValue::Int(Some(i))
            } else {
                // non-numeric text becomes NULL
                SqlValue::Float(s.parse::<f64>().ok().filter(|f| f.is_finite()))
            }
        }
        JsonValue::Bool(b) => SqlValue::Int(Some(i64::from(*b))),
        _ => SqlValue::Float(None),
    }
}

/// A typed bind parameter. `None` binds a typed SQL NULL.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Json(Option<JsonValue>),
    Text(Option<String>),
    Int(Option<i64>),
    Float(Option<f64>),
    Bool(Option<bool>),
}

impl SqlValue {
    /// JSON rendering, used by the in-memory store and in `row_to_json`-shaped reads.
    pub fn to_json(&self) -> JsonValue {
        match self {
            SqlValue::Json(v) => v.clone().unwrap_or(JsonValue::Null),
            SqlValue::Text(v) => v.clone().map(JsonValue::from).unwrap_or(JsonValue::Null),
            SqlValue::Int(v) => v.map(JsonValue::from).unwrap_or(JsonValue::Null),
            SqlValue::Float(v) => v
                .and_then(serde_json::Number::from_f64)
                .map(JsonValue::Number)
                .unwrap_or(JsonValue::Null),
            SqlValue::Bool(v) => v.map(JsonValue::from).unwrap_or(JsonValue::Null),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn field_names_map_to_snake_case_columns() {
        assert_eq!(column_name_for("profileId"), "profile_id");
        assert_eq!(column_name_for("isActive"), "is_active");
        assert_eq!(column_name_for("petID"), "pet_id");
        assert_eq!(column_name_for("rescued_by"), "rescued_by");
        assert_eq!(column_name_for("owner.id"), "owner_id");
        assert!(column_matches("profileid", "profileId"));
        assert!(column_matches("profile_id", "profileId"));
        assert!(!column_matches("profile", "profileId"));
    }

    #[test]
    fn sql_types_are_classified() {
        assert_eq!(ColumnKind::from_sql_type("jsonb"), ColumnKind::Json);
        assert_eq!(ColumnKind::from_sql_type("character varying"), ColumnKind::Text);
        assert_eq!(ColumnKind::from_sql_type("varchar"), ColumnKind::Text);
        assert_eq!(ColumnKind::from_sql_type("int4"), ColumnKind::Number);
        assert_eq!(ColumnKind::from_sql_type("double precision"), ColumnKind::Number);
        assert_eq!(ColumnKind::from_sql_type("boolean"), ColumnKind::Bool);
        assert_eq!(ColumnKind::from_sql_type("interval"), ColumnKind::Other);
        assert_eq!(ColumnKind::from_sql_type("timestamptz"), ColumnKind::Other);
    }

    #[test]
    fn values_are_coerced_by_column_kind() {
        assert_eq!(ColumnKind::Number.coerce(&json!("12")), SqlValue::Int(Some(12)));
        assert_eq!(ColumnKind::Number.coerce(&json!("2.5")), SqlValue::Float(Some(2.5)));
        assert_eq!(ColumnKind::Number.coerce(&json!("young")), SqlValue::Float(None));
        assert_eq!(
            ColumnKind::Text.coerce(&json!(42)),
            SqlValue::Text(Some("42".to_string()))
        );
        assert_eq!(ColumnKind::Bool.coerce(&json!("f")), SqlValue::Bool(Some(false)));
        assert_eq!(ColumnKind::Json.coerce(&JsonValue::Null), SqlValue::Json(None));
        assert_eq!(
            ColumnKind::Json.coerce(&json!({"a": 1})).to_json(),
            json!({"a": 1})
        );
    }
}
