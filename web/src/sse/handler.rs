use crate::error::{Error, Result};
use crate::extractors::client_identity::ClientIdentityClaim;
use crate::extractors::require_complete;
use async_stream::stream;
use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use log::*;
use service::AppState;
use sse::message::Frame;
use sse::{ClientIdentity, Session};
use std::convert::Infallible;
use tokio::runtime::Handle;
use tokio::sync::mpsc;

/// Frames waiting to be written to one client. Kept at one so each event is
/// handed to the body as soon as the previous one has been taken.
const FRAME_BUFFER: usize = 1;

/// GET /subscribe/:userid/client/:clientid
pub(crate) async fn subscribe(
    State(app_state): State<AppState>,
    Path((user_id, client_id)): Path<(String, String)>,
) -> Result<Response> {
    let identity = require_complete(ClientIdentity::new(user_id, client_id))?;
    open_stream(&app_state, identity)
}

/// GET /subscribe with the identity claim in a header
pub(crate) async fn subscribe_with_claim(
    State(app_state): State<AppState>,
    ClientIdentityClaim(identity): ClientIdentityClaim,
) -> Result<Response> {
    open_stream(&app_state, identity)
}

/// Registers a session for `identity` and streams its frames as the response body.
/// The session ends when the body is dropped, i.e. when the client goes away.
fn open_stream(app_state: &AppState, identity: ClientIdentity) -> Result<Response> {
    let runtime = Handle::try_current().map_err(Error::internal)?;

    debug!("Establishing SSE connection for {identity}");
    let session = Session::open(
        app_state.sse_manager.clone(),
        identity,
        app_state.config.keep_alive(),
    );

    let (out, mut frames) = mpsc::channel::<Frame>(FRAME_BUFFER);
    runtime.spawn(session.run(out));

    let body = stream! {
        while let Some(frame) = frames.recv().await {
            yield Ok::<_, Infallible>(frame.to_wire());
        }
    };

    Ok((
        [
            (header::CONTENT_TYPE, "text/event-stream"),
            (header::CACHE_CONTROL, "no-cache"),
            (header::CONNECTION, "keep-alive"),
        ],
        Body::from_stream(body),
    )
        .into_response())
}
