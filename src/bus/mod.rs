// In-process request/reply bus.
//
// Consumers register a mailbox under a well-known address; senders address
// a message by that string and hand over a reply mailbox of their own. Only
// encoded text crosses the bus, so the two sides share no memory and either
// one can be moved behind a real transport without touching the other.

pub mod envelope;
pub mod proxy;
pub mod worker;

use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, RwLock};

pub use envelope::{Method, Outcome, ReplyEnvelope, RequestEnvelope};
pub use proxy::WikiDatabaseProxy;
pub use worker::{ServiceWorker, WorkerHandle};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BusError {
    #[error("No consumer registered at '{0}'")]
    NoConsumer(String),

    #[error("Consumer at '{0}' is gone")]
    Closed(String),

    #[error("Address '{0}' already has a consumer")]
    AddressInUse(String),
}

/// One message as seen by a consumer
#[derive(Debug)]
pub struct Delivery {
    pub body: String,
    pub reply_to: mpsc::Sender<String>,
}

impl Delivery {
    /// Send a reply; a caller that has gone away is not an error for the consumer
    pub async fn reply(&self, body: String) -> bool {
        self.reply_to.send(body).await.is_ok()
    }
}

#[derive(Clone, Default)]
pub struct EventBus {
    consumers: Arc<RwLock<HashMap<String, mpsc::Sender<Delivery>>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the single consumer of `address`
    pub async fn consumer(
        &self,
        address: &str,
        capacity: usize,
    ) -> Result<mpsc::Receiver<Delivery>, BusError> {
        let mut consumers = self.consumers.write().await;
        if let Some(existing) = consumers.get(address) {
            if !existing.is_closed() {
                return Err(BusError::AddressInUse(address.to_string()));
            }
        }
        let (tx, rx) = mpsc::channel(capacity.max(1));
        consumers.insert(address.to_string(), tx);
        tracing::debug!("Registered bus consumer at '{}'", address);
        Ok(rx)
    }

    pub async fn unregister(&self, address: &str) {
        if self.consumers.write().await.remove(address).is_some() {
            tracing::debug!("Unregistered bus consumer at '{}'", address);
        }
    }

    /// Deliver `body` to the consumer at `address`; suspends while its mailbox is full
    pub async fn send(
        &self,
        address: &str,
        body: String,
        reply_to: mpsc::Sender<String>,
    ) -> Result<(), BusError> {
        let sender = {
            let consumers = self.consumers.read().await;
            consumers
                .get(address)
                .cloned()
                .ok_or_else(|| BusError::NoConsumer(address.to_string()))?
        };

        sender
            .send(Delivery { body, reply_to })
            .await
            .map_err(|_| BusError::Closed(address.to_string()))
    }
}
