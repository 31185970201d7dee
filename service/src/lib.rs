use config::Config;
use log::info;
use sse::Manager;
use std::sync::Arc;

pub mod config;
pub mod logging;

/// Connects to the NATS server named in the configuration.
pub async fn init_bus(config: &Config) -> Result<async_nats::Client, async_nats::ConnectError> {
    info!(
        "Connecting to NATS at {} (subject {:?})",
        config.nats_url(),
        config.subject()
    );

    let client = async_nats::ConnectOptions::new()
        .name("sse-gateway")
        .connect(config.nats_url())
        .await?;

    Ok(client)
}

// Service-level state shared by every request handler and the bus pipeline
// Needs to implement Clone to be able to be passed into Router as State
#[derive(Clone)]
pub struct AppState {
    pub sse_manager: Arc<Manager>,
    pub config: Config,
}

impl AppState {
    pub fn new(app_config: Config, sse_manager: &Arc<Manager>) -> Self {
        Self {
            sse_manager: Arc::clone(sse_manager),
            config: app_config,
        }
    }
}
