pub(crate) mod client_identity;

use crate::error::{Error, IdentityErrorKind};
use sse::ClientIdentity;

/// Accepts an identity only when both parts are present.
pub(crate) fn require_complete(identity: ClientIdentity) -> Result<ClientIdentity, Error> {
    if identity.user_id.trim().is_empty() || identity.client_id.trim().is_empty() {
        return Err(Error::identity(IdentityErrorKind::Empty));
    }
    Ok(identity)
}
