//! Lifecycle of one client stream.
//!
//! A session is `OPEN` from [`Session::open`] until [`Session::run`] returns,
//! and `CLOSED` afterwards. While open it waits on whichever comes first:
//!
//! - an event arriving on its sink, written to the client as one frame
//! - the keep-alive timer, written as a comment frame
//! - the client going away, which ends the session
//!
//! The transport is a bounded frame channel. The HTTP body owns the receiving
//! end and drops it when the peer disconnects, which the session observes as the
//! channel closing. A failed write is treated the same way.

use crate::connection::{ClientIdentity, Sink};
use crate::message::Frame;
use crate::Manager;
use log::*;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{Receiver, Sender};
use tokio::time::{self, Instant, MissedTickBehavior};

/// Interval between keep-alive frames on an idle stream.
pub const DEFAULT_KEEP_ALIVE: Duration = Duration::from_secs(25);

pub struct Session {
    manager: Arc<Manager>,
    identity: ClientIdentity,
    sink: Sink,
    inbox: Receiver<String>,
    keep_alive: Duration,
}

impl Session {
    /// Creates a fresh sink for `identity` and registers it.
    pub fn open(manager: Arc<Manager>, identity: ClientIdentity, keep_alive: Duration) -> Self {
        let (sink, inbox) = Sink::channel(manager.sink_capacity());
        manager.register_connection(identity.clone(), sink.clone());
        info!("SSE session opened for {identity}");

        Self {
            manager,
            identity,
            sink,
            inbox,
            keep_alive,
        }
    }

    pub fn identity(&self) -> &ClientIdentity {
        &self.identity
    }

    /// Drives the session until the client disconnects, then unregisters it.
    pub async fn run(mut self, out: Sender<Frame>) {
        let start = Instant::now() + self.keep_alive;
        let mut ticker = time::interval_at(start, self.keep_alive);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            let frame = tokio::select! {
                _ = out.closed() => {
                    debug!("Client {} disconnected", self.identity);
                    break;
                }
                payload = self.inbox.recv() => match payload {
                    Some(payload) => Frame::Event(payload),
                    None => break,
                },
                _ = ticker.tick() => Frame::KeepAlive,
            };

            if out.send(frame).await.is_err() {
                debug!("Write to client {} failed; closing session", self.identity);
                break;
            }
        }

        self.close();
    }

    fn close(self) {
        drop(self.inbox);
        self.manager.unregister_connection(&self.identity, &self.sink);
        info!("SSE session closed for {}", self.identity);
    }
}
