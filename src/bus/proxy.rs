use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::envelope::{Method, Outcome, ReplyEnvelope, RequestEnvelope};
use super::{BusError, EventBus};
use crate::database::models::page::{PageByIdLookup, PageLookup, PageRecord};
use crate::database::service::{ServiceError, WikiDatabaseService};

const REPLY_MAILBOX_CAPACITY: usize = 64;

struct PendingCall {
    method: Method,
    reply: oneshot::Sender<Outcome>,
}

/// Outstanding calls keyed by correlation id
#[derive(Default)]
struct PendingCalls {
    slots: Mutex<HashMap<u64, PendingCall>>,
}

impl PendingCalls {
    fn register(&self, id: u64, call: PendingCall) {
        self.lock().insert(id, call);
    }

    fn remove(&self, id: u64) -> Option<PendingCall> {
        self.lock().remove(&id)
    }

    fn len(&self) -> usize {
        self.lock().len()
    }

    fn resolve(&self, reply: ReplyEnvelope) {
        match self.remove(reply.id) {
            Some(call) => {
                if call.reply.send(reply.outcome).is_err() {
                    debug!("Caller of {:?} #{} went away before its reply", call.method, reply.id);
                }
            }
            // Late, duplicate or foreign reply
            None => debug!("Dropping reply for unknown call #{}", reply.id),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<u64, PendingCall>> {
        // Critical sections never panic, but recover the map rather than propagate poison
        self.slots.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Removes a pending call on every exit path of `invoke`, including cancellation
struct PendingGuard<'a> {
    calls: &'a PendingCalls,
    id: u64,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.calls.remove(self.id);
    }
}

/// Client-side stub of the page store that speaks only through the bus
pub struct WikiDatabaseProxy {
    bus: EventBus,
    address: String,
    timeout: Duration,
    next_id: AtomicU64,
    pending: Arc<PendingCalls>,
    reply_to: mpsc::Sender<String>,
    dispatcher: JoinHandle<()>,
}

impl WikiDatabaseProxy {
    /// Must be called from within a Tokio runtime
    pub fn new(bus: EventBus, address: impl Into<String>, timeout: Duration) -> Self {
        let pending = Arc::new(PendingCalls::default());
        let (reply_to, mut replies) = mpsc::channel::<String>(REPLY_MAILBOX_CAPACITY);

        let table = pending.clone();
        let dispatcher = tokio::spawn(async move {
            while let Some(body) = replies.recv().await {
                match ReplyEnvelope::decode(&body) {
                    Ok(reply) => table.resolve(reply),
                    Err(e) => warn!("Discarding undecodable reply: {}", e),
                }
            }
        });

        Self {
            bus,
            address: address.into(),
            timeout,
            next_id: AtomicU64::new(1),
            pending,
            reply_to,
            dispatcher,
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    /// Calls still waiting for a reply
    pub fn pending_calls(&self) -> usize {
        self.pending.len()
    }

    async fn invoke(&self, method: Method, args: Vec<Value>) -> Result<Outcome, ServiceError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (reply, receiver) = oneshot::channel();
        self.pending.register(id, PendingCall { method, reply });
        let _guard = PendingGuard { calls: &self.pending, id };

        let request = RequestEnvelope {
            id,
            method,
            args,
            timeout_ms: Some(self.timeout.as_millis() as u64),
        };
        let body = request.encode()?;

        // One deadline covers both the hand-off to a possibly full mailbox and the reply
        let exchange = async {
            if let Err(e) = self.bus.send(&self.address, body, self.reply_to.clone()).await {
                return Err(match e {
                    BusError::NoConsumer(addr) | BusError::Closed(addr) | BusError::AddressInUse(addr) => {
                        ServiceError::ChannelClosed(addr)
                    }
                });
            }
            debug!("Sent {:?} #{} to '{}'", method, id, self.address);

            receiver
                .await
                .map_err(|_| ServiceError::ChannelClosed(self.address.clone()))
        };

        match tokio::time::timeout(self.timeout, exchange).await {
            Ok(result) => result,
            Err(_) => {
                warn!("No reply to {:?} #{} from '{}' within {:?}", method, id, self.address, self.timeout);
                Err(ServiceError::ChannelTimeout(self.address.clone()))
            }
        }
    }

    async fn call<T: DeserializeOwned>(&self, method: Method, args: Vec<Value>) -> Result<T, ServiceError> {
        self.invoke(method, args).await?.into_result()
    }
}

impl Drop for WikiDatabaseProxy {
    fn drop(&mut self) {
        self.dispatcher.abort();
    }
}

#[async_trait]
impl WikiDatabaseService for WikiDatabaseProxy {
    async fn list_page_names(&self) -> Result<Vec<String>, ServiceError> {
        self.call(Method::ListPageNames, Vec::new()).await
    }

    async fn fetch_page(&self, name: &str) -> Result<PageLookup, ServiceError> {
        self.call(Method::FetchPage, vec![json!(name)]).await
    }

    async fn fetch_page_by_id(&self, id: i64) -> Result<PageByIdLookup, ServiceError> {
        self.call(Method::FetchPageById, vec![json!(id)]).await
    }

    async fn create_page(&self, title: &str, markdown: &str) -> Result<(), ServiceError> {
        self.call(Method::CreatePage, vec![json!(title), json!(markdown)]).await
    }

    async fn save_page(&self, id: i64, markdown: &str) -> Result<(), ServiceError> {
        self.call(Method::SavePage, vec![json!(id), json!(markdown)]).await
    }

    async fn delete_page(&self, id: i64) -> Result<(), ServiceError> {
        self.call(Method::DeletePage, vec![json!(id)]).await
    }

    async fn list_all_page_data(&self) -> Result<Vec<PageRecord>, ServiceError> {
        self.call(Method::ListAllPageData, Vec::new()).await
    }
}
