use crate::error::{Error, IdentityErrorKind};
use crate::extractors::require_complete;
use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use log::*;
use service::AppState;
use sse::ClientIdentity;

/// Identity claim resolved upstream and forwarded in a request header as
/// `{"userid": "...", "clientid": "..."}`. The header name comes from configuration.
pub(crate) struct ClientIdentityClaim(pub ClientIdentity);

#[async_trait]
impl FromRequestParts<AppState> for ClientIdentityClaim {
    type Rejection = Error;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header_name = state.config.identity_header();
        let value = parts
            .headers
            .get(header_name)
            .ok_or_else(|| Error::identity(IdentityErrorKind::Missing))?;

        let claim = value.to_str().map_err(Error::malformed_identity)?;
        let identity: ClientIdentity =
            serde_json::from_str(claim).map_err(Error::malformed_identity)?;

        trace!("Resolved identity claim from {header_name} header");
        Ok(ClientIdentityClaim(require_complete(identity)?))
    }
}
