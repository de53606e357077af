use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::envelope::{Method, ReplyEnvelope, RequestEnvelope};
use super::{BusError, Delivery, EventBus};
use crate::database::service::{ServiceError, WikiDatabaseService};

/// Running consumer loop for one bus address
pub struct WorkerHandle {
    address: String,
    bus: EventBus,
    task: JoinHandle<()>,
}

impl WorkerHandle {
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Stop consuming; calls already dispatched run to completion
    pub async fn shutdown(self) {
        self.bus.unregister(&self.address).await;
        self.task.abort();
        info!("Page store worker at '{}' stopped", self.address);
    }
}

/// Serves a [`WikiDatabaseService`] on a bus address
pub struct ServiceWorker;

impl ServiceWorker {
    pub async fn spawn(
        bus: &EventBus,
        address: &str,
        capacity: usize,
        service: Arc<dyn WikiDatabaseService>,
    ) -> Result<WorkerHandle, BusError> {
        let inbox = bus.consumer(address, capacity).await?;
        let task = tokio::spawn(Self::run(inbox, service));
        info!("Page store worker consuming '{}'", address);

        Ok(WorkerHandle {
            address: address.to_string(),
            bus: bus.clone(),
            task,
        })
    }

    async fn run(mut inbox: mpsc::Receiver<Delivery>, service: Arc<dyn WikiDatabaseService>) {
        while let Some(delivery) = inbox.recv().await {
            let service = service.clone();
            // Calls interleave; the pool is the only thing that serializes them
            tokio::spawn(async move {
                let reply = Self::handle(service.as_ref(), &delivery.body).await;
                let Some(reply) = reply else { return };
                match reply.encode() {
                    Ok(body) => {
                        if !delivery.reply(body).await {
                            debug!("Caller of #{} is gone; reply dropped", reply.id);
                        }
                    }
                    Err(e) => warn!("Failed to encode reply #{}: {}", reply.id, e),
                }
            });
        }
    }

    async fn handle(service: &dyn WikiDatabaseService, body: &str) -> Option<ReplyEnvelope> {
        let request = match RequestEnvelope::decode(body) {
            Ok(request) => request,
            Err(e) => {
                warn!("Malformed request on the bus: {}", e);
                return RequestEnvelope::peek_id(body).map(|id| ReplyEnvelope::err(id, e));
            }
        };

        debug!("Dispatching {:?} #{}", request.method, request.id);
        let id = request.id;
        let reply = match request.timeout_ms {
            // Past the caller's deadline the work is dropped, which releases its connection
            Some(ms) => tokio::time::timeout(Duration::from_millis(ms), Self::dispatch(service, &request))
                .await
                .unwrap_or_else(|_| {
                    ReplyEnvelope::err(id, ServiceError::ChannelTimeout(format!("{:?}", request.method)))
                }),
            None => Self::dispatch(service, &request).await,
        };
        Some(reply)
    }

    async fn dispatch(service: &dyn WikiDatabaseService, request: &RequestEnvelope) -> ReplyEnvelope {
        let id = request.id;
        let result = match request.method {
            Method::ListPageNames => service.list_page_names().await.map(|v| ReplyEnvelope::ok(id, &v)),
            Method::FetchPage => match request.arg::<String>(0) {
                Ok(name) => service.fetch_page(&name).await.map(|v| ReplyEnvelope::ok(id, &v)),
                Err(e) => Err(e),
            },
            Method::FetchPageById => match request.arg::<i64>(0) {
                Ok(page_id) => service.fetch_page_by_id(page_id).await.map(|v| ReplyEnvelope::ok(id, &v)),
                Err(e) => Err(e),
            },
            Method::CreatePage => match (request.arg::<String>(0), request.arg::<String>(1)) {
                (Ok(title), Ok(markdown)) => {
                    service.create_page(&title, &markdown).await.map(|v| ReplyEnvelope::ok(id, &v))
                }
                (Err(e), _) | (_, Err(e)) => Err(e),
            },
            Method::SavePage => match (request.arg::<i64>(0), request.arg::<String>(1)) {
                (Ok(page_id), Ok(markdown)) => {
                    service.save_page(page_id, &markdown).await.map(|v| ReplyEnvelope::ok(id, &v))
                }
                (Err(e), _) | (_, Err(e)) => Err(e),
            },
            Method::DeletePage => match request.arg::<i64>(0) {
                Ok(page_id) => service.delete_page(page_id).await.map(|v| ReplyEnvelope::ok(id, &v)),
                Err(e) => Err(e),
            },
            Method::ListAllPageData => {
                service.list_all_page_data().await.map(|v| ReplyEnvelope::ok(id, &v))
            }
        };

        result.unwrap_or_else(|e| ReplyEnvelope::err(id, e))
    }
}
