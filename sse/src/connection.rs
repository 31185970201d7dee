use dashmap::DashMap;
use log::*;
use serde::Deserialize;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc::{self, error::TrySendError, Receiver, Sender};

/// Identifies one logical client connection: the user plus the client component
/// (browser tab, device) the user connected from.
///
/// Deserializes from the identity claim `{"userid": "...", "clientid": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
pub struct ClientIdentity {
    #[serde(rename = "userid")]
    pub user_id: String,
    #[serde(rename = "clientid")]
    pub client_id: String,
}

impl ClientIdentity {
    pub fn new(user_id: impl Into<String>, client_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            client_id: client_id.into(),
        }
    }
}

impl fmt::Display for ClientIdentity {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}/{}", self.user_id, self.client_id)
    }
}

/// Write end of a session's delivery channel.
///
/// Cloning a `Sink` yields another handle to the same channel; two sinks are
/// equal only when they feed the same channel.
#[derive(Debug, Clone)]
pub struct Sink {
    sender: Sender<String>,
}

impl Sink {
    /// Creates a sink and the receiving end its session reads from.
    pub fn channel(capacity: usize) -> (Self, Receiver<String>) {
        let (sender, receiver) = mpsc::channel(capacity);
        (Self { sender }, receiver)
    }

    /// Pushes a payload without waiting for room.
    pub fn try_send(&self, payload: String) -> Result<(), TrySendError<String>> {
        self.sender.try_send(payload)
    }

    pub fn same_channel(&self, other: &Sink) -> bool {
        self.sender.same_channel(&other.sender)
    }
}

/// Concurrent mapping from client identity to the sink of its live session.
///
/// Holds at most one sink per identity: the most recently registered one.
pub struct ConnectionRegistry {
    connections: DashMap<ClientIdentity, Sink>,
    replaced: AtomicU64,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self {
            connections: DashMap::new(),
            replaced: AtomicU64::new(0),
        }
    }

    /// Installs `sink` under `identity`, replacing any previous sink.
    pub fn register(&self, identity: ClientIdentity, sink: Sink) {
        let label = identity.to_string();

        if let Some(previous) = self.connections.insert(identity, sink) {
            // The previous session keeps running but receives nothing further.
            self.replaced.fetch_add(1, Ordering::Relaxed);
            warn!(
                "Client identity {} registered twice; older connection no longer receives events (closed: {})",
                label,
                previous.sender.is_closed()
            );
        }
    }

    /// Removes the entry for `identity` only if `sink` is the one installed.
    /// Returns whether an entry was removed.
    pub fn unregister(&self, identity: &ClientIdentity, sink: &Sink) -> bool {
        self.connections
            .remove_if(identity, |_, current| current.same_channel(sink))
            .is_some()
    }

    pub fn lookup(&self, identity: &ClientIdentity) -> Option<Sink> {
        self.connections
            .get(identity)
            .map(|entry| entry.value().clone())
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    /// Number of registrations that replaced a live entry for the same identity.
    pub fn replaced_count(&self) -> u64 {
        self.replaced.load(Ordering::Relaxed)
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
