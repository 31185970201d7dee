use serde::Serialize;

/// Client-facing form of a bus response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutboundEvent {
    pub code: u32,
    pub message: String,
}

impl OutboundEvent {
    pub fn new(code: u32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// One unit written to a client stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// An application event carrying a serialized `OutboundEvent`.
    Event(String),
    /// Comment-only heartbeat that keeps idle proxies from closing the stream.
    /// Clients discard it.
    KeepAlive,
}

impl Frame {
    /// Encodes the frame in `text/event-stream` framing.
    pub fn to_wire(&self) -> String {
        match self {
            Frame::Event(payload) => format!("data: {payload}\n\n"),
            Frame::KeepAlive => ":\n\n".to_string(),
        }
    }
}

/// Outcome of handing an event to the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Delivered,
    /// No live connection for the target identity.
    NoConnection,
    /// The connection exists but could not take the event (full or closing).
    Dropped,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outbound_event_serializes_code_then_message() {
        let json = serde_json::to_string(&OutboundEvent::new(200, "hello")).unwrap();

        assert_eq!(json, r#"{"code":200,"message":"hello"}"#);
    }

    #[test]
    fn event_frame_uses_data_field() {
        let frame = Frame::Event(r#"{"code":200,"message":"hello"}"#.to_string());

        assert_eq!(frame.to_wire(), "data: {\"code\":200,\"message\":\"hello\"}\n\n");
    }

    #[test]
    fn keep_alive_frame_is_bare_comment() {
        assert_eq!(Frame::KeepAlive.to_wire(), ":\n\n");
    }
}
