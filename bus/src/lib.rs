//! Message bus plumbing for the SSE gateway.
//!
//! This crate knows how bus payloads are shaped and how a subscription is
//! consumed. It has no knowledge of HTTP or of connected clients.
//!
//! # Architecture
//!
//! - **Envelope**: the decoded form of one message published on the response subject
//! - **MessageHandler**: trait for anything that reacts to raw bus payloads
//! - **Subscriber**: drives a subscription stream, handing each payload to its handlers

use async_trait::async_trait;
use bytes::Bytes;
use futures::{Stream, StreamExt};
use log::*;
use std::sync::Arc;

pub mod envelope;
pub mod error;

pub use envelope::Envelope;

/// Default subject that backend services publish responses on.
pub const RESPONSE_SUBJECT: &str = "res";

/// Trait for handling raw bus payloads.
/// Implementations must not block on any single recipient: the subscription is
/// consumed serially and a slow handler stalls every message behind it.
#[async_trait]
pub trait MessageHandler: Send + Sync {
    async fn handle(&self, payload: &[u8]);
}

/// Consumes a bus subscription and hands every payload to registered handlers.
/// Handlers are called sequentially in registration order.
#[derive(Clone)]
pub struct Subscriber {
    handlers: Arc<Vec<Arc<dyn MessageHandler>>>,
}

impl Subscriber {
    pub fn new() -> Self {
        Self {
            handlers: Arc::new(Vec::new()),
        }
    }

    /// Register a new message handler.
    /// Note: This creates a new subscriber instance with the additional handler.
    pub fn with_handler(mut self, handler: Arc<dyn MessageHandler>) -> Self {
        let mut handlers = (*self.handlers).clone();
        handlers.push(handler);
        self.handlers = Arc::new(handlers);
        self
    }

    /// Read payloads until the subscription ends. Returns the number of
    /// payloads handled.
    pub async fn consume<S>(&self, messages: S) -> u64
    where
        S: Stream<Item = Bytes> + Send,
    {
        futures::pin_mut!(messages);
        let mut handled = 0u64;

        while let Some(payload) = messages.next().await {
            for handler in self.handlers.iter() {
                handler.handle(&payload).await;
            }
            handled += 1;
        }

        info!("Bus subscription closed after {handled} message(s)");
        handled
    }
}

impl Default for Subscriber {
    fn default() -> Self {
        Self::new()
    }
}
