//! Server-Sent Events (SSE) fan-out of bus responses.
//!
//! This crate connects the single bus subscription to the many long-lived
//! client streams, delivering each response to the one client it addresses.
//!
//! # Architecture
//!
//! - **One connection per client identity**: a client is identified by its user id
//!   plus client id. A newer connection with the same identity replaces the older
//!   one in the registry; the older stream stays open but receives nothing further.
//! - **Concurrent registry**: `ConnectionRegistry` is a sharded concurrent map, so
//!   sessions registering and the pipeline looking up never race.
//! - **Ephemeral messages**: if the addressed client is not connected the response
//!   is dropped. There is no buffering and no retry.
//! - **Non-blocking delivery**: each connection has a bounded queue; when it is full
//!   the newest event is dropped and logged rather than stalling the pipeline.
//!
//! # Message Flow
//!
//! 1. A client opens `/subscribe/...`; the web layer resolves its `ClientIdentity`
//! 2. `Session::open` creates a sink and registers it
//! 3. The bus subscriber hands each payload to `Pipeline`
//! 4. `Pipeline` decodes the envelope and asks `Manager` to deliver `{code, message}`
//! 5. The session writes the event frame; idle sessions write keep-alive comments
//! 6. On disconnect the session unregisters, unless a newer session replaced it
//!
//! # Modules
//!
//! - `connection`: ClientIdentity, Sink and the ConnectionRegistry
//! - `manager`: serialization and routing on top of the registry
//! - `message`: outbound event, wire frame and delivery outcome types
//! - `session`: per-connection state machine with keep-alive
//! - `ingest`: the bus-facing pipeline

pub mod connection;
pub mod ingest;
pub mod manager;
pub mod message;
pub mod session;

pub use connection::{ClientIdentity, ConnectionRegistry, Sink};
pub use ingest::Pipeline;
pub use manager::Manager;
pub use session::Session;
