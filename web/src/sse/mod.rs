//! SSE HTTP handlers for the web layer.
//!
//! This module contains only the Axum handlers for the streaming endpoints.
//! The registry, session and pipeline live in the `sse` crate.

pub mod handler;
