use crate::connection::ClientIdentity;
use crate::message::{Delivery, OutboundEvent};
use crate::Manager;
use async_trait::async_trait;
use bus::{Envelope, MessageHandler};
use log::*;
use std::sync::Arc;

pub use bus::RESPONSE_SUBJECT;

/// Routes bus responses to the SSE connection they are addressed to.
///
/// For every payload on the response subject the pipeline:
/// 1. Decodes the envelope (malformed payloads are logged and dropped)
/// 2. Resolves the target client identity
/// 3. Hands a JSON `{code, message}` event to that client's connection, if it has one
///
/// Nothing is buffered or retried; a client that is not connected misses the event.
pub struct Pipeline {
    sse_manager: Arc<Manager>,
}

impl Pipeline {
    pub fn new(sse_manager: Arc<Manager>) -> Self {
        Self { sse_manager }
    }

    /// Handle one raw bus payload. Never blocks on the recipient.
    pub fn dispatch(&self, payload: &[u8]) -> Delivery {
        let envelope = match Envelope::decode(payload) {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!("Dropping malformed bus message ({} bytes): {e}", payload.len());
                return Delivery::Dropped;
            }
        };

        let identity = ClientIdentity::new(envelope.user_id, envelope.client_id);
        let event = OutboundEvent::new(
            envelope.code,
            String::from_utf8_lossy(&envelope.message),
        );

        self.sse_manager.send_message(&identity, &event)
    }
}

#[async_trait]
impl MessageHandler for Pipeline {
    async fn handle(&self, payload: &[u8]) {
        self.dispatch(payload);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Frame;
    use crate::session::{Session, DEFAULT_KEEP_ALIVE};
    use bus::Subscriber;
    use bytes::Bytes;
    use tokio::sync::mpsc;

    fn envelope(user_id: &str, client_id: &str, code: u32, message: &str) -> Bytes {
        Envelope {
            user_id: user_id.to_string(),
            client_id: client_id.to_string(),
            code,
            message: message.as_bytes().to_vec(),
        }
        .encode_to_vec()
        .into()
    }

    #[tokio::test]
    async fn connected_client_receives_translated_event() {
        let manager = Arc::new(Manager::new());
        let session = Session::open(
            manager.clone(),
            ClientIdentity::new("u1", "c1"),
            DEFAULT_KEEP_ALIVE,
        );
        let (out, mut frames) = mpsc::channel(8);
        tokio::spawn(session.run(out));

        let pipeline = Pipeline::new(manager);
        let delivery = pipeline.dispatch(&envelope("u1", "c1", 200, "hello"));

        assert_eq!(delivery, Delivery::Delivered);
        let frame = frames.recv().await.unwrap();
        assert_eq!(frame.to_wire(), "data: {\"code\":200,\"message\":\"hello\"}\n\n");
    }

    #[tokio::test]
    async fn envelope_for_absent_client_reaches_nobody() {
        let manager = Arc::new(Manager::new());
        let (out, mut frames) = mpsc::channel(8);
        tokio::spawn(
            Session::open(
                manager.clone(),
                ClientIdentity::new("u1", "c1"),
                DEFAULT_KEEP_ALIVE,
            )
            .run(out),
        );

        let pipeline = Pipeline::new(manager);
        let delivery = pipeline.dispatch(&envelope("u2", "c2", 200, "nobody home"));

        assert_eq!(delivery, Delivery::NoConnection);
        assert!(frames.try_recv().is_err());
    }

    #[tokio::test]
    async fn malformed_envelope_does_not_stop_the_subscription() {
        let manager = Arc::new(Manager::new());
        let (out, mut frames) = mpsc::channel(8);
        tokio::spawn(
            Session::open(
                manager.clone(),
                ClientIdentity::new("u1", "c1"),
                DEFAULT_KEEP_ALIVE,
            )
            .run(out),
        );

        let good = envelope("u1", "c1", 200, "after the bad one");
        let truncated = good.slice(..good.len() - 3);
        let subscriber = Subscriber::new().with_handler(Arc::new(Pipeline::new(manager)));
        let handled = subscriber
            .consume(futures::stream::iter(vec![
                Bytes::from_static(&[0xde, 0xad, 0xbe, 0xef]),
                truncated,
                good,
            ]))
            .await;

        assert_eq!(handled, 3);
        assert_eq!(
            frames.recv().await.unwrap(),
            Frame::Event(r#"{"code":200,"message":"after the bad one"}"#.to_string())
        );
        assert!(frames.try_recv().is_err());
    }

    #[test]
    fn invalid_utf8_message_is_replaced_not_rejected() {
        let manager = Arc::new(Manager::new());
        let (sink, mut inbox) = crate::connection::Sink::channel(1);
        manager.register_connection(ClientIdentity::new("u1", "c1"), sink);

        let payload = Envelope {
            user_id: "u1".to_string(),
            client_id: "c1".to_string(),
            code: 500,
            message: vec![b'o', b'k', 0xff],
        }
        .encode_to_vec();
        Pipeline::new(manager).dispatch(&payload);

        assert_eq!(
            inbox.try_recv().unwrap(),
            "{\"code\":500,\"message\":\"ok\u{fffd}\"}"
        );
    }
}
