use std::error::Error as StdError;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use log::*;

pub type Result<T> = core::result::Result<T, Error>;

/// Errors the web layer reports to clients before a stream is opened.
#[derive(Debug)]
pub struct Error {
    pub source: Option<Box<dyn StdError + Send + Sync>>,
    pub error_kind: ErrorKind,
}

#[derive(Debug, PartialEq)]
pub enum ErrorKind {
    Identity(IdentityErrorKind),
    Internal,
}

/// Problems with the client identity claim.
#[derive(Debug, PartialEq)]
pub enum IdentityErrorKind {
    /// The identity header is absent.
    Missing,
    /// The claim is not valid UTF-8 or not a `{"userid", "clientid"}` object.
    Malformed,
    /// The claim names an empty user or client id.
    Empty,
}

impl Error {
    pub(crate) fn identity(kind: IdentityErrorKind) -> Self {
        Error {
            source: None,
            error_kind: ErrorKind::Identity(kind),
        }
    }

    pub(crate) fn malformed_identity(err: impl StdError + Send + Sync + 'static) -> Self {
        Error {
            source: Some(Box::new(err)),
            error_kind: ErrorKind::Identity(IdentityErrorKind::Malformed),
        }
    }

    pub(crate) fn internal(err: impl StdError + Send + Sync + 'static) -> Self {
        Error {
            source: Some(Box::new(err)),
            error_kind: ErrorKind::Internal,
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

impl std::fmt::Display for Error {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> core::result::Result<(), std::fmt::Error> {
        write!(fmt, "{self:?}")
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match self.error_kind {
            ErrorKind::Identity(identity_error_kind) => {
                debug!("Rejecting stream request: {identity_error_kind:?}");
                (StatusCode::BAD_REQUEST, "BAD REQUEST").into_response()
            }
            ErrorKind::Internal => {
                error!("Unable to open event stream: {:?}", self.source);
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL SERVER ERROR").into_response()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_errors_are_bad_requests() {
        for kind in [
            IdentityErrorKind::Missing,
            IdentityErrorKind::Malformed,
            IdentityErrorKind::Empty,
        ] {
            let response = Error::identity(kind).into_response();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        }
    }

    #[test]
    fn internal_errors_are_server_errors() {
        let err = Error::internal(std::io::Error::other("no runtime"));

        assert!(err.source().is_some());
        assert_eq!(
            err.into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
