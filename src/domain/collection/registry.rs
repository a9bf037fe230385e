//! CollectionRegistry: the allow-list of collections and their table layouts.

use crate::domain::collection::{CollectionSchema, ColumnSpec, FieldKind, Layout};
use std::collections::HashMap;
use std::sync::Arc;

/// Maps a raw collection name onto a valid Postgres identifier: hyphens become
/// underscores, anything outside `[A-Za-z0-9_]` is dropped, and the result is lowercased.
pub fn sanitize_table(name: &str) -> String {
    name.chars()
        .map(|c| if c == '-' { '_' } else { c })
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect::<String>()
        .to_lowercase()
}

/// A registry that maps collection names to their schema.
#[derive(Debug, Clone, Default)]
pub struct CollectionRegistry {
    collections: HashMap<String, Arc<CollectionSchema>>,
}

impl CollectionRegistry {
    /// Creates a new empty registry.
    pub fn new() -> Self {
        Self {
            collections: HashMap::new(),
        }
    }

    /// The four collections the adoption front end reads and writes, all on the
    /// document layout.
    pub fn builtin() -> Self {
        let mut reg = Self::new();
        reg.register(
            CollectionSchema::document("pets")
                .with_owner_field("profileId")
                .with_field("name", FieldKind::Text)
                .with_field("age", FieldKind::Number)
                .with_field("status", FieldKind::Text)
                .with_field("size", FieldKind::Text)
                .with_field("profileId", FieldKind::Text),
        );
        reg.register(
            CollectionSchema::document("users")
                .with_field("username", FieldKind::Text)
                .with_field("email", FieldKind::Text)
                .with_field("role", FieldKind::Text)
                .with_field("capacity", FieldKind::Number)
                .with_field("animalsAvailable", FieldKind::Number)
                .with_field("paymentMethods", FieldKind::Json)
                .with_field("paymentConfigured", FieldKind::Bool),
        );
        reg.register(
            CollectionSchema::document("publications")
                .with_owner_field("ownerId")
                .with_field("petId", FieldKind::Text)
                .with_field("ownerId", FieldKind::Text)
                .with_field("title", FieldKind::Text)
                .with_field("isActive", FieldKind::Bool),
        );
        reg.register(
            CollectionSchema::document("adoption_requests")
                .with_alias("adoption-requests")
                .with_owner_field("ownerId")
                .with_field("status", FieldKind::RequestStatus)
                .with_field("petId", FieldKind::Text)
                .with_field("publicationId", FieldKind::Text)
                .with_field("applicantId", FieldKind::Text)
                .with_field("ownerId", FieldKind::Text),
        );
        reg
    }

    /// Registers (or replaces) a collection under its canonical name.
    pub fn register(&mut self, schema: CollectionSchema) {
        self.collections
            .insert(schema.name.clone(), Arc::new(schema));
    }

    /// Retrieves a collection by canonical name.
    pub fn get(&self, name: &str) -> Option<Arc<CollectionSchema>> {
        self.collections.get(name).cloned()
    }

    /// Resolves a client-supplied name against the allow-list.
    ///
    /// Accepts the canonical name, any alias, or any spelling whose sanitized form equals
    /// a registered table (so `adoption-requests` and `Adoption_Requests` both resolve).
    pub fn resolve(&self, raw: &str) -> Option<Arc<CollectionSchema>> {
        if let Some(schema) = self.get(raw) {
            return Some(schema);
        }
        let sanitized = sanitize_table(raw);
        if sanitized.is_empty() {
            return None;
        }
        self.collections
            .values()
            .find(|c| {
                c.table == sanitized
                    || c
                        .aliases
                        .iter()
                        .any(|a| a == raw || sanitize_table(a) == sanitized)
            })
            .cloned()
    }

    /// Returns all registered collection names, sorted.
    pub fn list_collections(&self) -> Vec<String> {
        let mut names: Vec<String> = self.collections.keys().cloned().collect();
        names.sort();
        names
    }

    /// Switches a collection (any accepted spelling) to the column layout. Its column list
    /// stays empty, and writes fail closed, until [`CollectionRegistry::set_columns`] runs.
    pub fn use_column_layout(&mut self, name: &str) -> bool {
        match self.resolve(name) {
            Some(schema) => {
                if !schema.is_column_layout() {
                    let mut updated = (*schema).clone();
                    updated.layout = Layout::Columns(Vec::new());
                    self.register(updated);
                }
                true
            }
            None => false,
        }
    }

    /// Stores the introspected columns of a column-layout collection.
    pub fn set_columns(&mut self, name: &str, columns: Vec<ColumnSpec>) -> bool {
        match self.get(name) {
            Some(schema) if schema.is_column_layout() => {
                let mut updated = (*schema).clone();
                updated.layout = Layout::Columns(columns);
                self.register(updated);
                true
            }
            _ => false,
        }
    }

    /// Collections on the column layout (the ones the schema sync must introspect).
    pub fn column_layout_collections(&self) -> Vec<Arc<CollectionSchema>> {
        let mut out: Vec<_> = self
            .collections
            .values()
            .filter(|c| c.is_column_layout())
            .cloned()
            .collect();
        out.sort_by(|a, b| a.name.cmp(&b.name));
        out
    }

    /// All collections, sorted by name.
    pub fn all(&self) -> Vec<Arc<CollectionSchema>> {
        let mut out: Vec<_> = self.collections.values().cloned().collect();
        out.sort_by(|a, b| a.name.cmp(&b.name));
        out
    }
}
