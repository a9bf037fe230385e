use crate::app::{CollectionLayoutReport, CollectionService};
use crate::infra::config::Config;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use utoipa::{IntoParams, ToSchema};

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<CollectionService>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(service: CollectionService, config: Config) -> Self {
        Self {
            service: Arc::new(service),
            config: Arc::new(config),
        }
    }
}

/// `GET /query` parameters. `owner` and `applicant` are mutually exclusive.
#[derive(Deserialize, Debug, Default, IntoParams)]
pub struct QueryParams {
    /// Collection name, e.g. `pets` or `adoption-requests`.
    pub collection: Option<String>,
    /// Return the single record with this id (404 when absent).
    pub id: Option<String>,
    /// Only records owned by this shelter/rescuer profile.
    pub owner: Option<String>,
    /// Only adoption requests filed by this adopter profile.
    pub applicant: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, ToSchema)]
pub struct MutationResponse {
    pub ok: bool,
    pub id: String,
}

#[derive(Serialize, Debug, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Serialize, Debug, ToSchema)]
pub struct HealthResponse {
    pub ok: bool,
    pub message: String,
}

#[derive(Serialize, Debug, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DbHealthResponse {
    pub ok: bool,
    pub message: String,
    pub backend: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub masked_db_url: Option<String>,
    /// Which database URL variables are set, reported when none resolves.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vars: Option<BTreeMap<String, bool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Serialize, Debug, ToSchema)]
pub struct SchemaResponse {
    pub collections: Vec<CollectionLayoutReport>,
}

#[derive(Deserialize, Debug, ToSchema)]
pub struct MigrateRequest {
    /// Must be `true`.
    #[serde(default)]
    pub confirm: bool,
}

#[derive(Serialize, Debug, ToSchema)]
pub struct MigrationSummary {
    pub version: i64,
    pub description: String,
}

#[derive(Serialize, Debug, ToSchema)]
pub struct MigrateResponse {
    pub migrated: bool,
    pub migrations: Vec<MigrationSummary>,
    pub collections: Vec<CollectionLayoutReport>,
}
