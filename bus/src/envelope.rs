//! Wire format of the messages published on the response subject.
//!
//! Backend services publish a protobuf `Response`:
//!
//! ```proto
//! message Client {
//!   string key = 1;     // user id
//!   string client = 2;  // client id
//! }
//!
//! message Response {
//!   Client client = 1;
//!   uint32 code = 2;
//!   bytes message = 3;
//! }
//! ```

use crate::error::{Error, ErrorKind};
use prost::Message;

#[derive(Clone, PartialEq, Message)]
pub struct ClientProto {
    #[prost(string, tag = "1")]
    pub key: String,
    #[prost(string, tag = "2")]
    pub client: String,
}

#[derive(Clone, PartialEq, Message)]
pub struct ResponseProto {
    #[prost(message, optional, tag = "1")]
    pub client: Option<ClientProto>,
    #[prost(uint32, tag = "2")]
    pub code: u32,
    #[prost(bytes = "vec", tag = "3")]
    pub message: Vec<u8>,
}

/// A decoded bus message, addressed to one client connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub user_id: String,
    pub client_id: String,
    pub code: u32,
    pub message: Vec<u8>,
}

impl Envelope {
    /// Decodes a raw bus payload.
    pub fn decode(payload: &[u8]) -> Result<Self, Error> {
        let response = ResponseProto::decode(payload)?;
        let client = response.client.ok_or(ErrorKind::MissingClient)?;

        Ok(Envelope {
            user_id: client.key,
            client_id: client.client,
            code: response.code,
            message: response.message,
        })
    }

    /// Encodes the envelope the way backend publishers do.
    pub fn encode_to_vec(&self) -> Vec<u8> {
        ResponseProto {
            client: Some(ClientProto {
                key: self.user_id.clone(),
                client: self.client_id.clone(),
            }),
            code: self.code,
            message: self.message.clone(),
        }
        .encode_to_vec()
    }
}
