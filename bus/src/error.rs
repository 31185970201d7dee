//! Error types for the `bus` crate.
//!
//! Follows the same pattern as the other layers: a root `Error` struct holding an
//! `error_kind` plus the optional underlying cause.

use std::error::Error as StdError;
use std::fmt;

#[derive(Debug)]
pub struct Error {
    pub source: Option<Box<dyn StdError + Send + Sync>>,
    pub error_kind: ErrorKind,
}

/// Ways a bus message can fail to become an envelope.
#[derive(Debug, PartialEq)]
pub enum ErrorKind {
    /// The payload is not a valid protobuf `Response`.
    Decode,
    /// The payload decoded but carries no client reference to route on.
    MissingClient,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.source {
            Some(source) => write!(f, "Bus Error: {:?}: {source}", self.error_kind),
            None => write!(f, "Bus Error: {:?}", self.error_kind),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn StdError + 'static))
    }
}

impl From<prost::DecodeError> for Error {
    fn from(err: prost::DecodeError) -> Self {
        Error {
            source: Some(Box::new(err)),
            error_kind: ErrorKind::Decode,
        }
    }
}

impl From<ErrorKind> for Error {
    fn from(error_kind: ErrorKind) -> Self {
        Error {
            source: None,
            error_kind,
        }
    }
}
