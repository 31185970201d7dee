use anyhow::{Context, Result};
use bus::Envelope;
use log::*;

/// Publishes hand-built envelopes onto the gateway's response subject.
pub struct Publisher {
    client: async_nats::Client,
    subject: String,
}

impl Publisher {
    pub async fn connect(nats_url: &str, subject: &str) -> Result<Self> {
        let client = async_nats::connect(nats_url)
            .await
            .with_context(|| format!("connecting to NATS at {nats_url}"))?;

        Ok(Self {
            client,
            subject: subject.to_string(),
        })
    }

    pub async fn publish(&self, user_id: &str, client_id: &str, code: u32, message: &str) -> Result<()> {
        let envelope = Envelope {
            user_id: user_id.to_string(),
            client_id: client_id.to_string(),
            code,
            message: message.as_bytes().to_vec(),
        };
        self.publish_raw(envelope.encode_to_vec()).await
    }

    /// Publishes bytes as-is, e.g. a deliberately corrupt envelope.
    pub async fn publish_raw(&self, payload: Vec<u8>) -> Result<()> {
        debug!("Publishing {} bytes on {}", payload.len(), self.subject);
        self.client
            .publish(self.subject.clone(), payload.into())
            .await
            .context("publishing envelope")?;
        self.client.flush().await.context("flushing NATS connection")?;
        Ok(())
    }
}
