use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::database::manager::StorageError;
use crate::database::models::page::{PageByIdLookup, PageLookup, PageRecord};

/// Errors visible to callers of the page store, on either side of the bus.
///
/// Serializable so the worker can ship them back in a reply envelope.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", content = "message", rename_all = "snake_case")]
pub enum ServiceError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("No reply from {0} before the deadline")]
    ChannelTimeout(String),

    #[error("Channel closed: {0}")]
    ChannelClosed(String),

    #[error("Malformed message: {0}")]
    Codec(String),
}

impl From<StorageError> for ServiceError {
    fn from(err: StorageError) -> Self {
        ServiceError::Storage(err.to_string())
    }
}

/// Async CRUD contract of the page store.
///
/// Implemented directly by [`crate::database::repository::PageRepository`] and,
/// over the bus, by [`crate::bus::proxy::WikiDatabaseProxy`].
#[async_trait]
pub trait WikiDatabaseService: Send + Sync {
    /// Page names, sorted lexicographically
    async fn list_page_names(&self) -> Result<Vec<String>, ServiceError>;

    async fn fetch_page(&self, name: &str) -> Result<PageLookup, ServiceError>;

    async fn fetch_page_by_id(&self, id: i64) -> Result<PageByIdLookup, ServiceError>;

    async fn create_page(&self, title: &str, markdown: &str) -> Result<(), ServiceError>;

    /// Replace page content; `NotFound` when no page has this id
    async fn save_page(&self, id: i64, markdown: &str) -> Result<(), ServiceError>;

    /// Idempotent: deleting an unknown id succeeds
    async fn delete_page(&self, id: i64) -> Result<(), ServiceError>;

    async fn list_all_page_data(&self) -> Result<Vec<PageRecord>, ServiceError>;
}
