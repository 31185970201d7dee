use anyhow::Result;
use eventsource_client::{self as es, Client};
use futures_util::stream::StreamExt;
use log::*;
use serde::Deserialize;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

/// The `{code, message}` payload the gateway sends for every bus response.
#[derive(Debug, Clone, Deserialize)]
pub struct Payload {
    pub code: u32,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct Event {
    pub payload: Payload,
    pub received_after: Duration,
}

pub struct Connection {
    pub label: String,
    event_rx: mpsc::UnboundedReceiver<Event>,
    _handle: tokio::task::JoinHandle<()>,
}

impl Connection {
    pub async fn establish(base_url: &str, user_id: &str, client_id: &str) -> Result<Self> {
        let url = format!("{base_url}/subscribe/{user_id}/client/{client_id}");
        let label = format!("{user_id}/{client_id}");
        let (tx, rx) = mpsc::unbounded_channel();

        let client = es::ClientBuilder::for_url(&url)?.build();

        let task_label = label.clone();
        let opened = Instant::now();
        let handle = tokio::spawn(async move {
            let mut stream = client.stream();

            loop {
                match stream.next().await {
                    Some(Ok(es::SSE::Event(event))) => {
                        match serde_json::from_str::<Payload>(&event.data) {
                            Ok(payload) => {
                                let event = Event {
                                    payload,
                                    received_after: opened.elapsed(),
                                };
                                if tx.send(event).is_err() {
                                    debug!("SSE receiver dropped for {}", task_label);
                                    break;
                                }
                            }
                            Err(e) => warn!("Unexpected event data for {}: {}", task_label, e),
                        }
                    }
                    Some(Ok(es::SSE::Comment(_))) => {
                        trace!("Keep-alive received for {}", task_label);
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        warn!("SSE error for {}: {}", task_label, e);
                    }
                    None => {
                        debug!("SSE stream ended for {}", task_label);
                        break;
                    }
                }
            }
        });

        Ok(Self {
            label,
            event_rx: rx,
            _handle: handle,
        })
    }

    pub async fn next_event(&mut self) -> Option<Event> {
        self.event_rx.recv().await
    }

    /// Waits for an event carrying `code`, skipping any others.
    pub async fn wait_for_code(&mut self, code: u32, timeout: Duration) -> Result<Event> {
        let deadline = Instant::now() + timeout;

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                anyhow::bail!("Timeout waiting for event with code {}", code);
            }

            match tokio::time::timeout(remaining, self.event_rx.recv()).await {
                Ok(Some(event)) if event.payload.code == code => return Ok(event),
                Ok(Some(_)) => continue,
                Ok(None) => anyhow::bail!("SSE connection closed"),
                Err(_) => anyhow::bail!("Timeout waiting for event with code {}", code),
            }
        }
    }

    /// Collects whatever arrives within `window`.
    pub async fn drain_for(&mut self, window: Duration) -> Vec<Event> {
        let mut events = Vec::new();
        while let Ok(Some(event)) = tokio::time::timeout(window, self.event_rx.recv()).await {
            events.push(event);
        }
        events
    }
}
