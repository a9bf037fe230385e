pub mod collection_service;

pub use collection_service::{
    Action, CollectionLayoutReport, CollectionService, MutationRequest, Scope,
};
