//! Collection definitions: how a logical collection (`pets`, `users`, ...) maps onto a
//! SQL table, which layout that table follows, and which fields are typed.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use utoipa::ToSchema;

pub mod columns;
pub mod registry;
pub mod validate;

pub use columns::{column_name_for, ColumnKind, SqlValue};
pub use registry::{sanitize_table, CollectionRegistry};
pub use validate::validate_item;

/// One live column of a table, as reported by `information_schema.columns`.
///
/// `sql_type` holds the catalog `udt_name` (e.g. `int4`, `jsonb`, `timestamptz`), which is
/// both the input of [`ColumnKind::from_sql_type`] and a valid cast target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ColumnSpec {
    pub name: String,
    pub sql_type: String,
}

impl ColumnSpec {
    pub fn new(name: impl Into<String>, sql_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sql_type: sql_type.into(),
        }
    }
}

/// Physical shape of a collection table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Layout {
    /// `(id TEXT PRIMARY KEY, data JSONB)`; the whole item lives in `data`.
    Document,
    /// Named columns. The list is filled by the schema sync step and stays empty
    /// until the table has been introspected.
    Columns(Vec<ColumnSpec>),
}

impl Layout {
    pub fn label(&self) -> &'static str {
        match self {
            Layout::Document => "document",
            Layout::Columns(_) => "columns",
        }
    }
}

/// Declared type of a known item field, checked at write time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Number,
    Bool,
    Json,
    RequestStatus,
}

impl FieldKind {
    pub fn label(self) -> &'static str {
        match self {
            FieldKind::Text => "text",
            FieldKind::Number => "number",
            FieldKind::Bool => "bool",
            FieldKind::Json => "json",
            FieldKind::RequestStatus => "request_status",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
}

/// A registered collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionSchema {
    /// Canonical collection name (what `/query` and `/mutate` clients send).
    pub name: String,
    /// Sanitized SQL table name.
    pub table: String,
    /// Extra accepted spellings, e.g. `adoption-requests`.
    pub aliases: Vec<String>,
    pub layout: Layout,
    /// Canonical ownership field stamped at write time.
    pub owner_field: Option<&'static str>,
    pub fields: Vec<FieldSpec>,
}

impl CollectionSchema {
    /// A document-layout collection whose table is the sanitized name.
    pub fn document(name: &str) -> Self {
        Self {
            name: name.to_string(),
            table: sanitize_table(name),
            aliases: Vec::new(),
            layout: Layout::Document,
            owner_field: None,
            fields: Vec::new(),
        }
    }

    pub fn with_alias(mut self, alias: &str) -> Self {
        self.aliases.push(alias.to_string());
        self
    }

    pub fn with_owner_field(mut self, field: &'static str) -> Self {
        self.owner_field = Some(field);
        self
    }

    pub fn with_field(mut self, name: &'static str, kind: FieldKind) -> Self {
        self.fields.push(FieldSpec { name, kind });
        self
    }

    pub fn field_kind(&self, name: &str) -> Option<FieldKind> {
        self.fields.iter().find(|f| f.name == name).map(|f| f.kind)
    }

    pub fn is_column_layout(&self) -> bool {
        matches!(self.layout, Layout::Columns(_))
    }

    /// Catalog type of the live `id` column. Document tables always key on text.
    pub fn id_sql_type(&self) -> Option<&str> {
        match &self.layout {
            Layout::Columns(columns) => columns
                .iter()
                .find(|c| c.name == "id")
                .map(|c| c.sql_type.as_str()),
            Layout::Document => None,
        }
    }
}

/// A declared field whose value could not be coerced to its kind.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct FieldError {
    pub field: String,
    pub expected: String,
    pub got: String,
    #[schema(value_type = Object)]
    pub value: JsonValue,
}

/// Short JSON type name used in validation messages.
pub fn json_type_name(v: &JsonValue) -> &'static str {
    match v {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "bool",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}
