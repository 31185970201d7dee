use bus::Subscriber;
use futures::StreamExt;
use log::*;
use service::{config::Config, logging::Logger, AppState};
use sse::{ConnectionRegistry, Manager, Pipeline};
use std::process::ExitCode;
use std::sync::Arc;
use tokio::signal;

#[tokio::main]
async fn main() -> ExitCode {
    let config = Config::new();
    Logger::init_logger(&config);

    if let Err(e) = config.validate() {
        error!("Invalid configuration: {e}");
        return ExitCode::FAILURE;
    }

    info!(
        "Starting sse_gateway {} ({} environment)",
        env!("CARGO_PKG_VERSION"),
        config.runtime_env()
    );

    let bus_client = match service::init_bus(&config).await {
        Ok(client) => client,
        Err(e) => {
            error!("Failed to connect to NATS at {}: {e}", config.nats_url());
            return ExitCode::FAILURE;
        }
    };

    let subscription = match bus_client.subscribe(config.subject().to_string()).await {
        Ok(subscription) => subscription,
        Err(e) => {
            error!("Failed to subscribe to {:?}: {e}", config.subject());
            return ExitCode::FAILURE;
        }
    };

    let sse_manager = Arc::new(Manager::with_registry(
        Arc::new(ConnectionRegistry::new()),
        config.sink_capacity,
    ));

    let subscriber = Subscriber::new().with_handler(Arc::new(Pipeline::new(sse_manager.clone())));
    let ingestion = tokio::spawn(async move {
        subscriber
            .consume(subscription.map(|message| message.payload))
            .await
    });

    let app_state = AppState::new(config, &sse_manager);

    let listener = match web::bind(&app_state.config).await {
        Ok(listener) => listener,
        Err(e) => {
            error!(
                "Failed to bind {}:{}: {e}",
                app_state.config.interface(),
                app_state.config.port
            );
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = web::serve(listener, app_state, shutdown_signal()).await {
        error!("Server error: {e}");
        return ExitCode::FAILURE;
    }

    ingestion.abort();
    drop(bus_client);
    info!("Server stopped");

    ExitCode::SUCCESS
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
