use crate::connection::{ClientIdentity, ConnectionRegistry, Sink};
use crate::message::{Delivery, OutboundEvent};
use log::*;
use std::sync::Arc;
use tokio::sync::mpsc::error::TrySendError;

/// Default number of undelivered events a single connection may queue.
pub const DEFAULT_SINK_CAPACITY: usize = 64;

pub struct Manager {
    registry: Arc<ConnectionRegistry>,
    sink_capacity: usize,
}

impl Manager {
    pub fn new() -> Self {
        Self::with_registry(Arc::new(ConnectionRegistry::new()), DEFAULT_SINK_CAPACITY)
    }

    pub fn with_registry(registry: Arc<ConnectionRegistry>, sink_capacity: usize) -> Self {
        Self {
            registry,
            sink_capacity,
        }
    }

    pub fn registry(&self) -> &ConnectionRegistry {
        &self.registry
    }

    pub fn sink_capacity(&self) -> usize {
        self.sink_capacity
    }

    pub fn connection_count(&self) -> usize {
        self.registry.len()
    }

    /// Register a connection for `identity`, replacing any previous one
    pub fn register_connection(&self, identity: ClientIdentity, sink: Sink) {
        debug!("Registering SSE connection for {identity}");
        self.registry.register(identity, sink);
    }

    /// Unregister a connection, unless a newer one has taken its place
    pub fn unregister_connection(&self, identity: &ClientIdentity, sink: &Sink) {
        if self.registry.unregister(identity, sink) {
            debug!("Unregistered SSE connection for {identity}");
        } else {
            debug!("SSE connection for {identity} was already replaced; leaving registry as is");
        }
    }

    /// Serialize `event` and hand it to the live connection for `identity`.
    ///
    /// Never waits: a connection whose queue is full drops the event.
    pub fn send_message(&self, identity: &ClientIdentity, event: &OutboundEvent) -> Delivery {
        let Some(sink) = self.registry.lookup(identity) else {
            trace!("No SSE connection for {identity}; dropping event");
            return Delivery::NoConnection;
        };

        let payload = match serde_json::to_string(event) {
            Ok(json) => json,
            Err(e) => {
                error!("Failed to serialize SSE event: {e}");
                return Delivery::Dropped;
            }
        };

        match sink.try_send(payload) {
            Ok(()) => Delivery::Delivered,
            Err(TrySendError::Full(_)) => {
                warn!(
                    "SSE connection for {identity} is not keeping up (queue of {} full); dropping event with code {}",
                    self.sink_capacity, event.code
                );
                Delivery::Dropped
            }
            Err(TrySendError::Closed(_)) => {
                debug!("SSE connection for {identity} closed before delivery; dropping event");
                Delivery::Dropped
            }
        }
    }
}

impl Default for Manager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn connect(manager: &Manager, identity: &ClientIdentity) -> tokio::sync::mpsc::Receiver<String> {
        let (sink, rx) = Sink::channel(manager.sink_capacity());
        manager.register_connection(identity.clone(), sink);
        rx
    }

    #[test]
    fn send_message_reaches_only_the_addressed_identity() {
        let manager = Manager::new();
        let a = ClientIdentity::new("u1", "c1");
        let b = ClientIdentity::new("u2", "c2");
        let mut rx_a = connect(&manager, &a);
        let mut rx_b = connect(&manager, &b);

        let delivery = manager.send_message(&a, &OutboundEvent::new(200, "for a"));

        assert_eq!(delivery, Delivery::Delivered);
        assert_eq!(rx_a.try_recv().unwrap(), r#"{"code":200,"message":"for a"}"#);
        assert!(rx_b.try_recv().is_err());
    }

    #[test]
    fn send_message_without_connection_is_noop() {
        let manager = Manager::new();

        let delivery = manager.send_message(
            &ClientIdentity::new("nobody", "none"),
            &OutboundEvent::new(404, "gone"),
        );

        assert_eq!(delivery, Delivery::NoConnection);
    }

    #[test]
    fn send_message_after_reconnect_reaches_newest_connection_only() {
        let manager = Manager::new();
        let x = ClientIdentity::new("u1", "c1");
        let mut first = connect(&manager, &x);
        let mut second = connect(&manager, &x);

        manager.send_message(&x, &OutboundEvent::new(200, "latest"));

        assert!(first.try_recv().is_err());
        assert_eq!(second.try_recv().unwrap(), r#"{"code":200,"message":"latest"}"#);
    }

    #[test]
    fn send_message_drops_when_connection_queue_is_full() {
        let manager = Manager::with_registry(Arc::new(ConnectionRegistry::new()), 1);
        let x = ClientIdentity::new("slow", "client");
        let mut rx = connect(&manager, &x);

        assert_eq!(
            manager.send_message(&x, &OutboundEvent::new(1, "kept")),
            Delivery::Delivered
        );
        assert_eq!(
            manager.send_message(&x, &OutboundEvent::new(2, "dropped")),
            Delivery::Dropped
        );

        assert_eq!(rx.try_recv().unwrap(), r#"{"code":1,"message":"kept"}"#);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn send_message_to_closed_connection_is_dropped() {
        let manager = Manager::new();
        let x = ClientIdentity::new("u1", "c1");
        drop(connect(&manager, &x));

        assert_eq!(
            manager.send_message(&x, &OutboundEvent::new(200, "late")),
            Delivery::Dropped
        );
    }

    #[test]
    fn unregister_connection_ignores_replaced_sink() {
        let manager = Manager::new();
        let x = ClientIdentity::new("u1", "c1");
        let (old_sink, _old_rx) = Sink::channel(1);
        manager.register_connection(x.clone(), old_sink.clone());
        let mut new_rx = connect(&manager, &x);

        manager.unregister_connection(&x, &old_sink);

        assert_eq!(manager.connection_count(), 1);
        manager.send_message(&x, &OutboundEvent::new(200, "still here"));
        assert!(new_rx.try_recv().is_ok());
    }
}
