//! The collection service.
//!
//! Sits between the HTTP handlers (and the import binary) and a `CollectionStore`:
//! 1.  Resolves collection names against the registry allow-list.
//! 2.  Validates, owner-normalizes and plans writes for the table's layout.
//! 3.  Scopes reads to an owner or applicant profile.
//! 4.  Keeps column-layout tables' column lists in sync with the live schema.

use crate::domain::collection::{
    validate_item, CollectionRegistry, CollectionSchema, ColumnSpec, Layout,
};
use crate::domain::ownership::{
    id_string, normalize_owner, pets_owned_by, publications_owned_by, requests_for_applicant,
    requests_for_shelter,
};
use crate::error::AppError;
use crate::storage::{plan_row, CollectionStore, MigrationInfo};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use utoipa::ToSchema;

/// Body of `POST /mutate`. Every field is optional on the wire so missing ones map to
/// the right 400 message instead of a deserialization failure.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct MutationRequest {
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub collection: Option<String>,
    #[serde(default)]
    #[schema(value_type = Option<Object>)]
    pub item: Option<JsonValue>,
    #[serde(default)]
    #[schema(value_type = Option<String>)]
    pub id: Option<JsonValue>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Create,
    Update,
    Delete,
}

impl Action {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "create" => Some(Action::Create),
            "update" => Some(Action::Update),
            "delete" => Some(Action::Delete),
            _ => None,
        }
    }
}

/// Read scope for `query`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    All,
    /// Records owned by a shelter/rescuer profile.
    Owner(String),
    /// Adoption requests filed by an adopter profile.
    Applicant(String),
}

/// Layout check for one collection, as served by `GET /bootstrap/schema`.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CollectionLayoutReport {
    pub collection: String,
    pub table: String,
    pub layout: String,
    pub columns: Vec<ColumnSpec>,
    pub matches_layout: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

fn layout_problem(layout: &Layout, live: &[ColumnSpec]) -> Option<String> {
    if live.is_empty() {
        return Some("table does not exist".to_string());
    }
    let has = |name: &str| live.iter().any(|c| c.name == name);
    if !has("id") {
        return Some("no \"id\" column".to_string());
    }
    match layout {
        Layout::Document if !has("data") => Some("no \"data\" column".to_string()),
        _ => None,
    }
}

pub struct CollectionService {
    store: Arc<dyn CollectionStore>,
    registry: Arc<RwLock<CollectionRegistry>>,
    migrations_dir: PathBuf,
}

impl CollectionService {
    pub fn new(store: Arc<dyn CollectionStore>, registry: CollectionRegistry) -> Self {
        Self {
            store,
            registry: Arc::new(RwLock::new(registry)),
            migrations_dir: PathBuf::from("./migrations"),
        }
    }

    pub fn with_migrations_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.migrations_dir = dir.into();
        self
    }

    pub fn store(&self) -> &Arc<dyn CollectionStore> {
        &self.store
    }

    pub fn registry(&self) -> &Arc<RwLock<CollectionRegistry>> {
        &self.registry
    }

    /// Looks a client-supplied name up in the allow-list.
    pub async fn resolve(&self, collection: &str) -> Option<Arc<CollectionSchema>> {
        self.registry.read().await.resolve(collection)
    }

    async fn resolve_for_read(&self, collection: &str) -> Result<Arc<CollectionSchema>, AppError> {
        if collection.is_empty() {
            return Err(AppError::BadRequest(
                "Missing `collection` query parameter. Example: ?collection=pets".to_string(),
            ));
        }
        let registry = self.registry.read().await;
        registry.resolve(collection).ok_or_else(|| {
            AppError::BadRequest(format!(
                "Invalid collection. Allowed: {}",
                registry.list_collections().join(", ")
            ))
        })
    }

    async fn fetch_named(&self, name: &str) -> Result<Vec<JsonValue>, AppError> {
        let schema = self.registry.read().await.get(name);
        match schema {
            Some(schema) => Ok(self.store.fetch_all(&schema).await?),
            None => Ok(Vec::new()),
        }
    }

    /// All records of a collection, optionally scoped to a profile.
    pub async fn query(&self, collection: &str, scope: Scope) -> Result<Vec<JsonValue>, AppError> {
        let schema = self.resolve_for_read(collection).await?;
        let rows = self.store.fetch_all(&schema).await?;
        debug!(collection = %schema.name, rows = rows.len(), "query");

        match scope {
            Scope::All => Ok(rows),
            Scope::Owner(pid) => match schema.name.as_str() {
                "pets" => {
                    let publications = self.fetch_named("publications").await?;
                    Ok(pets_owned_by(&rows, &publications, &pid))
                }
                "publications" => Ok(publications_owned_by(&rows, &pid)),
                "adoption_requests" => {
                    let pets = self.fetch_named("pets").await?;
                    let publications = self.fetch_named("publications").await?;
                    Ok(requests_for_shelter(&rows, &pets, &publications, &pid))
                }
                other => Err(AppError::BadRequest(format!(
                    "Collection '{}' has no owner",
                    other
                ))),
            },
            Scope::Applicant(pid) => match schema.name.as_str() {
                "adoption_requests" => Ok(requests_for_applicant(&rows, &pid)),
                other => Err(AppError::BadRequest(format!(
                    "Collection '{}' has no applicant",
                    other
                ))),
            },
        }
    }

    /// One record by id (ids are compared in string form).
    pub async fn get_by_id(&self, collection: &str, id: &str) -> Result<JsonValue, AppError> {
        let rows = self.query(collection, Scope::All).await?;
        rows.into_iter()
            .find(|r| r.get("id").and_then(id_string).as_deref() == Some(id))
            .ok_or_else(|| AppError::NotFound("Item not found".to_string()))
    }

    /// Applies one create/update/delete. Returns the affected id.
    pub async fn mutate(&self, request: MutationRequest) -> Result<String, AppError> {
        let action = request.action.as_deref().unwrap_or_default();
        let collection = request.collection.as_deref().unwrap_or_default();
        if action.is_empty() || collection.is_empty() {
            return Err(AppError::BadRequest(
                "Missing action or collection".to_string(),
            ));
        }
        let schema = self
            .resolve(collection)
            .await
            .ok_or(AppError::CollectionNotAllowed)?;
        let action = Action::parse(action).ok_or(AppError::UnknownAction)?;

        let item_id = request
            .item
            .as_ref()
            .and_then(|i| i.get("id"))
            .and_then(id_string)
            .filter(|id| !id.is_empty());
        let explicit_id = request
            .id
            .as_ref()
            .and_then(id_string)
            .filter(|id| !id.is_empty());

        match action {
            Action::Create => {
                let id = item_id.ok_or_else(|| {
                    AppError::BadRequest("Item with id required for create".to_string())
                })?;
                self.write(&schema, &id, request.item).await?;
                Ok(id)
            }
            Action::Update => {
                let id = item_id.or(explicit_id).ok_or_else(|| {
                    AppError::BadRequest("item or id required for update".to_string())
                })?;
                self.write(&schema, &id, request.item).await?;
                Ok(id)
            }
            Action::Delete => {
                let id = explicit_id.or(item_id).ok_or_else(|| {
                    AppError::BadRequest("id required for delete".to_string())
                })?;
                let removed = self.store.delete(&schema, &id).await?;
                debug!(collection = %schema.name, %id, removed, "delete");
                Ok(id)
            }
        }
    }

    async fn write(
        &self,
        schema: &CollectionSchema,
        id: &str,
        item: Option<JsonValue>,
    ) -> Result<(), AppError> {
        let mut item = match item {
            None | Some(JsonValue::Null) => Map::new(),
            Some(JsonValue::Object(obj)) => obj,
            Some(_) => {
                return Err(AppError::BadRequest(
                    "item must be a JSON object".to_string(),
                ))
            }
        };
        validate_item(schema, &mut item).map_err(AppError::Validation)?;
        if let Some(owner) = normalize_owner(schema, &mut item) {
            debug!(collection = %schema.name, %id, %owner, "stamped owner");
        }

        let (plan, dropped) = plan_row(schema, id, &item)?;
        if !dropped.is_empty() {
            warn!(table = %schema.table, %id, ?dropped, "fields without a matching column were dropped");
        }
        self.store.upsert(&plan).await?;
        debug!(collection = %schema.name, %id, "upsert");
        Ok(())
    }

    /// Re-reads the live columns of every column-layout table into the registry.
    pub async fn sync_layouts(&self) -> Result<usize, AppError> {
        let targets = self.registry.read().await.column_layout_collections();
        let mut synced = 0;
        for schema in targets {
            let columns = self.store.table_columns(&schema.table).await?;
            if columns.is_empty() {
                warn!(table = %schema.table, "column-layout table not found; writes will fail until it is migrated");
            }
            let count = columns.len();
            self.registry.write().await.set_columns(&schema.name, columns);
            info!(collection = %schema.name, columns = count, "synced column layout");
            synced += 1;
        }
        Ok(synced)
    }

    /// Runs the versioned migrations, then re-syncs column layouts.
    pub async fn migrate(&self) -> Result<Vec<MigrationInfo>, AppError> {
        let applied = self.store.migrate(&self.migrations_dir).await?;
        info!(count = applied.len(), dir = %self.migrations_dir.display(), "migrations applied");
        self.sync_layouts().await?;
        Ok(applied)
    }

    /// Declared vs. live layout of every registered collection.
    pub async fn schema_report(&self) -> Result<Vec<CollectionLayoutReport>, AppError> {
        let collections = self.registry.read().await.all();
        let mut out = Vec::with_capacity(collections.len());
        for schema in collections {
            let live = self.store.table_columns(&schema.table).await?;
            let detail = layout_problem(&schema.layout, &live);
            out.push(CollectionLayoutReport {
                collection: schema.name.clone(),
                table: schema.table.clone(),
                layout: schema.layout.label().to_string(),
                columns: live,
                matches_layout: detail.is_none(),
                detail,
            });
        }
        Ok(out)
    }

    pub async fn ping(&self) -> Result<(), AppError> {
        Ok(self.store.ping().await?)
    }
}
