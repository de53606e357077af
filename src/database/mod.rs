pub mod catalog;
pub mod manager;
pub mod models;
pub mod repository;
pub mod scope;
pub mod service;

pub use catalog::{CatalogError, QueryCatalog, QueryId};
pub use manager::{DatabaseManager, StorageError};
pub use models::page::{PageByIdLookup, PageLookup, PageRecord};
pub use repository::PageRepository;
pub use scope::{ConnectionScope, ScopeStats};
pub use service::{ServiceError, WikiDatabaseService};
