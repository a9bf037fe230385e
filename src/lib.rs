pub mod app;
pub mod domain;
pub mod error;
pub mod infra;
pub mod storage;
pub mod transport;

// Convenience re-exports (keeps call-sites clean)
pub use app::{CollectionService, MutationRequest, Scope};
pub use domain::collection::CollectionRegistry;
pub use domain::session::{Role, Session};
pub use error::AppError;
pub use infra::client::{ClientError, CollectionClient};
pub use infra::config::Config;
pub use storage::{CollectionStore, MemoryCollectionStore, PgCollectionStore, StoreError};
