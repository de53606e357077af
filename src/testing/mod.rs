use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

use crate::auth::{CredentialRealm, SessionStore, TokenIssuer};
use crate::backup::{BackupClient, BackupError};
use crate::bus::{Delivery, EventBus, ServiceWorker, WikiDatabaseProxy, WorkerHandle};
use crate::config::AppConfig;
use crate::database::{
    ConnectionScope, DatabaseManager, PageByIdLookup, PageLookup, PageRecord, PageRepository, QueryCatalog,
    ServiceError, WikiDatabaseService,
};
use crate::render::Templates;
use crate::server::AppState;

/// Fresh page store on its own in-memory database, table created
pub async fn memory_repository() -> PageRepository {
    let config = AppConfig::development();
    let pool = DatabaseManager::connect(&config.database)
        .await
        .expect("in-memory database");
    let repository = PageRepository::new(ConnectionScope::new(pool), Arc::new(QueryCatalog::builtin()));
    repository.initialize().await.expect("create table");
    repository
}

/// Counts every call that reaches the page store
pub struct CountingService {
    inner: Arc<dyn WikiDatabaseService>,
    calls: AtomicUsize,
}

impl CountingService {
    pub fn new(inner: Arc<dyn WikiDatabaseService>) -> Self {
        Self {
            inner,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn tick(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl WikiDatabaseService for CountingService {
    async fn list_page_names(&self) -> Result<Vec<String>, ServiceError> {
        self.tick();
        self.inner.list_page_names().await
    }

    async fn fetch_page(&self, name: &str) -> Result<PageLookup, ServiceError> {
        self.tick();
        self.inner.fetch_page(name).await
    }

    async fn fetch_page_by_id(&self, id: i64) -> Result<PageByIdLookup, ServiceError> {
        self.tick();
        self.inner.fetch_page_by_id(id).await
    }

    async fn create_page(&self, title: &str, markdown: &str) -> Result<(), ServiceError> {
        self.tick();
        self.inner.create_page(title, markdown).await
    }

    async fn save_page(&self, id: i64, markdown: &str) -> Result<(), ServiceError> {
        self.tick();
        self.inner.save_page(id, markdown).await
    }

    async fn delete_page(&self, id: i64) -> Result<(), ServiceError> {
        self.tick();
        self.inner.delete_page(id).await
    }

    async fn list_all_page_data(&self) -> Result<Vec<PageRecord>, ServiceError> {
        self.tick();
        self.inner.list_all_page_data().await
    }
}

/// Backup endpoint stand-in that records what it was sent
pub struct FakeBackup {
    outcome: Result<String, u16>,
    received: Mutex<Vec<Vec<PageRecord>>>,
}

impl FakeBackup {
    pub fn succeeding(url: &str) -> Self {
        Self {
            outcome: Ok(url.to_string()),
            received: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(status: u16) -> Self {
        Self {
            outcome: Err(status),
            received: Mutex::new(Vec::new()),
        }
    }

    pub fn received(&self) -> Vec<Vec<PageRecord>> {
        self.received.lock().expect("fake backup lock").clone()
    }
}

#[async_trait]
impl BackupClient for FakeBackup {
    async fn backup(&self, pages: &[PageRecord]) -> Result<String, BackupError> {
        self.received.lock().expect("fake backup lock").push(pages.to_vec());
        match &self.outcome {
            Ok(url) => Ok(url.clone()),
            Err(status) => Err(BackupError::UnexpectedStatus {
                status: *status,
                body: "{\"message\":\"nope\"}".to_string(),
            }),
        }
    }
}

/// Full HTTP state over a real bus and worker, with the page store calls
/// counted and the backup endpoint faked
pub struct TestContext {
    pub state: AppState,
    pub repository: PageRepository,
    pub pages: Arc<CountingService>,
    pub backup: Arc<FakeBackup>,
    _worker: Option<WorkerHandle>,
    _stalled_inbox: Option<mpsc::Receiver<Delivery>>,
}

impl TestContext {
    pub async fn new() -> Self {
        Self::with_backup(FakeBackup::succeeding("https://gist.example/abc")).await
    }

    pub async fn with_backup(backup: FakeBackup) -> Self {
        let config = AppConfig::development();
        let repository = memory_repository().await;

        let bus = EventBus::new();
        let worker = ServiceWorker::spawn(&bus, "wikidb.test", 16, Arc::new(repository.clone()))
            .await
            .expect("worker");
        let proxy = WikiDatabaseProxy::new(bus, "wikidb.test", config.channel.reply_timeout());

        let mut ctx = Self::assemble(&config, repository, proxy, backup);
        ctx._worker = Some(worker);
        ctx
    }

    /// Page store address whose consumer never reads, so every call runs into `timeout`
    pub async fn stalled(timeout: Duration) -> Self {
        let config = AppConfig::development();
        let repository = memory_repository().await;

        let bus = EventBus::new();
        let inbox = bus.consumer("wikidb.stalled", 1).await.expect("stalled consumer");
        let proxy = WikiDatabaseProxy::new(bus, "wikidb.stalled", timeout);

        let backup = FakeBackup::succeeding("https://gist.example/abc");
        let mut ctx = Self::assemble(&config, repository, proxy, backup);
        ctx._stalled_inbox = Some(inbox);
        ctx
    }

    fn assemble(config: &AppConfig, repository: PageRepository, proxy: WikiDatabaseProxy, backup: FakeBackup) -> Self {
        let pages = Arc::new(CountingService::new(Arc::new(proxy)));
        let backup = Arc::new(backup);

        let state = AppState {
            pages: pages.clone(),
            realm: Arc::new(CredentialRealm::builtin()),
            tokens: Arc::new(TokenIssuer::new(&config.security).expect("token issuer")),
            sessions: SessionStore::new(config.security.session_ttl_minutes),
            templates: Arc::new(Templates::embedded().expect("templates")),
            backup: backup.clone(),
            pool: repository.scope().pool().clone(),
        };

        Self {
            state,
            repository,
            pages,
            backup,
            _worker: None,
            _stalled_inbox: None,
        }
    }

    /// `Cookie` header value for a fresh session of `username`
    pub async fn session_cookie(&self, username: &str) -> String {
        let id = self.state.sessions.create(username).await;
        SessionStore::cookie(&id)
            .split(';')
            .next()
            .unwrap_or_default()
            .to_string()
    }

    /// `Authorization` header value carrying `username`'s realm grants
    pub fn bearer(&self, username: &str) -> String {
        let subject = self.state.realm.subject_for(username).expect("known user");
        format!("Bearer {}", self.state.tokens.issue(&subject).expect("token"))
    }
}
