use async_trait::async_trait;
use sqlx::Row;
use std::sync::Arc;
use tracing::{error, info};

use crate::database::catalog::{QueryCatalog, QueryId};
use crate::database::manager::StorageError;
use crate::database::models::page::{PageByIdLookup, PageLookup, PageRecord};
use crate::database::scope::ConnectionScope;
use crate::database::service::{ServiceError, WikiDatabaseService};

/// Page store backed by the SQL catalog; every operation runs in its own connection scope
#[derive(Clone)]
pub struct PageRepository {
    scope: ConnectionScope,
    catalog: Arc<QueryCatalog>,
}

impl PageRepository {
    pub fn new(scope: ConnectionScope, catalog: Arc<QueryCatalog>) -> Self {
        Self { scope, catalog }
    }

    pub fn scope(&self) -> &ConnectionScope {
        &self.scope
    }

    /// Create the pages table; must succeed before the store takes requests
    pub async fn initialize(&self) -> Result<(), StorageError> {
        let sql = self.sql(QueryId::CreateTable);
        self.scope
            .with_connection(move |conn| {
                Box::pin(async move { sqlx::query(&sql).execute(conn).await.map(|_| ()) })
            })
            .await?;
        info!("Page store schema ready");
        Ok(())
    }

    fn sql(&self, id: QueryId) -> String {
        self.catalog.lookup(id).to_string()
    }

    fn storage_failure(operation: &str, err: StorageError) -> ServiceError {
        error!("Database query error in {}: {}", operation, err);
        ServiceError::from(err)
    }
}

#[async_trait]
impl WikiDatabaseService for PageRepository {
    async fn list_page_names(&self) -> Result<Vec<String>, ServiceError> {
        let sql = self.sql(QueryId::ListNames);
        let mut names: Vec<String> = self
            .scope
            .with_connection(move |conn| {
                Box::pin(async move { sqlx::query_scalar(&sql).fetch_all(conn).await })
            })
            .await
            .map_err(|e| Self::storage_failure("list_page_names", e))?;

        names.sort();
        Ok(names)
    }

    async fn fetch_page(&self, name: &str) -> Result<PageLookup, ServiceError> {
        let sql = self.sql(QueryId::GetByName);
        let name = name.to_string();
        let row = self
            .scope
            .with_connection(move |conn| {
                Box::pin(async move { sqlx::query(&sql).bind(name).fetch_optional(conn).await })
            })
            .await
            .map_err(|e| Self::storage_failure("fetch_page", e))?;

        match row {
            Some(row) => {
                let id: i64 = row.try_get(0).map_err(|e| Self::storage_failure("fetch_page", e.into()))?;
                let content: String =
                    row.try_get(1).map_err(|e| Self::storage_failure("fetch_page", e.into()))?;
                Ok(PageLookup::found(id, content))
            }
            None => Ok(PageLookup::missing()),
        }
    }

    async fn fetch_page_by_id(&self, id: i64) -> Result<PageByIdLookup, ServiceError> {
        let sql = self.sql(QueryId::GetById);
        let record = self
            .scope
            .with_connection(move |conn| {
                Box::pin(async move {
                    sqlx::query_as::<_, PageRecord>(&sql).bind(id).fetch_optional(conn).await
                })
            })
            .await
            .map_err(|e| Self::storage_failure("fetch_page_by_id", e))?;

        Ok(record.map(PageByIdLookup::from).unwrap_or_else(PageByIdLookup::missing))
    }

    async fn create_page(&self, title: &str, markdown: &str) -> Result<(), ServiceError> {
        let sql = self.sql(QueryId::Create);
        let (title, markdown) = (title.to_string(), markdown.to_string());
        self.scope
            .with_connection(move |conn| {
                Box::pin(async move {
                    sqlx::query(&sql).bind(title).bind(markdown).execute(conn).await.map(|_| ())
                })
            })
            .await
            .map_err(|e| Self::storage_failure("create_page", e))
    }

    async fn save_page(&self, id: i64, markdown: &str) -> Result<(), ServiceError> {
        let sql = self.sql(QueryId::Update);
        let markdown = markdown.to_string();
        let affected = self
            .scope
            .with_connection(move |conn| {
                Box::pin(async move {
                    sqlx::query(&sql)
                        .bind(markdown)
                        .bind(id)
                        .execute(conn)
                        .await
                        .map(|done| done.rows_affected())
                })
            })
            .await
            .map_err(|e| Self::storage_failure("save_page", e))?;

        if affected == 0 {
            return Err(ServiceError::NotFound(format!("There is no page with ID {}", id)));
        }
        Ok(())
    }

    async fn delete_page(&self, id: i64) -> Result<(), ServiceError> {
        let sql = self.sql(QueryId::Delete);
        self.scope
            .with_connection(move |conn| {
                Box::pin(async move { sqlx::query(&sql).bind(id).execute(conn).await.map(|_| ()) })
            })
            .await
            .map_err(|e| Self::storage_failure("delete_page", e))
    }

    async fn list_all_page_data(&self) -> Result<Vec<PageRecord>, ServiceError> {
        let sql = self.sql(QueryId::ListAll);
        self.scope
            .with_connection(move |conn| {
                Box::pin(async move { sqlx::query_as::<_, PageRecord>(&sql).fetch_all(conn).await })
            })
            .await
            .map_err(|e| Self::storage_failure("list_all_page_data", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::database::manager::DatabaseManager;

    async fn repository() -> PageRepository {
        let config = AppConfig::development();
        let pool = DatabaseManager::connect(&config.database).await.unwrap();
        let repo = PageRepository::new(ConnectionScope::new(pool), Arc::new(QueryCatalog::builtin()));
        repo.initialize().await.unwrap();
        repo
    }

    #[tokio::test]
    async fn crud_operations() {
        let repo = repository().await;

        repo.create_page("Test", "Some content").await.unwrap();

        let page = repo.fetch_page("Test").await.unwrap();
        assert!(page.found);
        assert_eq!(page.raw_content.as_deref(), Some("Some content"));
        let id = page.id.unwrap();

        repo.save_page(id, "Yo!").await.unwrap();
        assert_eq!(repo.list_page_names().await.unwrap().len(), 1);
        assert_eq!(repo.fetch_page("Test").await.unwrap().raw_content.as_deref(), Some("Yo!"));

        let before = repo.list_all_page_data().await.unwrap().len();
        repo.delete_page(id).await.unwrap();
        let after = repo.list_all_page_data().await.unwrap();
        assert_eq!(after.len(), before - 1);
        assert!(after.iter().all(|p| p.id != id));

        let stats = repo.scope().stats();
        assert_eq!(stats.acquired(), stats.released());
    }

    #[tokio::test]
    async fn missing_page_is_not_an_error() {
        let repo = repository().await;
        assert_eq!(repo.fetch_page("Nope").await.unwrap(), PageLookup::missing());
        assert!(!repo.fetch_page_by_id(99).await.unwrap().found);
    }

    #[tokio::test]
    async fn names_are_sorted() {
        let repo = repository().await;
        for name in ["zebra", "Apple", "mango"] {
            repo.create_page(name, "x").await.unwrap();
        }
        assert_eq!(repo.list_page_names().await.unwrap(), vec!["Apple", "mango", "zebra"]);
    }

    #[tokio::test]
    async fn duplicate_name_is_a_storage_error() {
        let repo = repository().await;
        repo.create_page("Home", "a").await.unwrap();
        let err = repo.create_page("Home", "b").await.unwrap_err();
        assert!(matches!(err, ServiceError::Storage(_)));

        let stats = repo.scope().stats();
        assert_eq!(stats.acquired(), stats.released());
    }

    #[tokio::test]
    async fn saving_unknown_id_is_not_found() {
        let repo = repository().await;
        let err = repo.save_page(404, "text").await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn deleting_unknown_id_is_idempotent() {
        let repo = repository().await;
        repo.delete_page(12345).await.unwrap();
    }

    #[tokio::test]
    async fn fetch_by_id_returns_full_row() {
        let repo = repository().await;
        repo.create_page("Home", "# Welcome").await.unwrap();
        let id = repo.fetch_page("Home").await.unwrap().id.unwrap();

        let record = repo.fetch_page_by_id(id).await.unwrap().into_record().unwrap();
        assert_eq!(record, PageRecord { id, name: "Home".into(), content: "# Welcome".into() });
    }
}
