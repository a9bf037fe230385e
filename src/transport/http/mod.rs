pub mod router;
pub mod types;
pub mod handlers {
    pub mod bootstrap;
    pub mod common;
    pub mod health;
    pub mod mutate;
    pub mod query;
    pub mod schema;
}

pub use router::{cors_layer, create_router, ApiDoc};
pub use types::AppState;
