use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::*;
use std::time::Duration;

mod output;
mod publisher;
mod scenarios;
mod sse_client;

use output::{print_event, print_test_summary};
use publisher::Publisher;
use sse_client::Connection;

/// Time allowed for freshly opened streams to register before publishing.
const CONNECT_SETTLE: Duration = Duration::from_millis(500);

#[derive(Parser)]
#[command(name = "sse-test-client")]
#[command(about = "SSE gateway integration testing tool")]
struct Cli {
    /// Base URL of the gateway (e.g., http://localhost:8080)
    #[arg(long, default_value = "http://localhost:8080")]
    base_url: String,

    /// NATS server the gateway subscribes to
    #[arg(long, default_value = "nats://localhost:4222")]
    nats_url: String,

    /// Subject the gateway consumes responses from
    #[arg(long, default_value = bus::RESPONSE_SUBJECT)]
    subject: String,

    /// Enable verbose output
    #[arg(long, short)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Open a stream for one identity and print every event until interrupted
    Listen {
        #[arg(long)]
        user_id: String,
        #[arg(long)]
        client_id: String,
    },
    /// Publish a single envelope onto the bus
    Publish {
        #[arg(long)]
        user_id: String,
        #[arg(long)]
        client_id: String,
        #[arg(long, default_value_t = 200)]
        code: u32,
        #[arg(long)]
        message: String,
    },
    /// Run the end-to-end delivery scenarios against a running gateway
    Scenarios,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.verbose {
        env_logger::Builder::from_default_env()
            .filter_level(log::LevelFilter::Debug)
            .init();
    }

    match cli.command {
        Command::Listen { user_id, client_id } => {
            let mut connection = Connection::establish(&cli.base_url, &user_id, &client_id).await?;
            println!("{} Listening as {}", "→".blue(), connection.label.bold());

            while let Some(event) = connection.next_event().await {
                print_event(&connection.label, &event);
            }
            println!("{} Stream closed", "✗".red());
        }
        Command::Publish {
            user_id,
            client_id,
            code,
            message,
        } => {
            let publisher = Publisher::connect(&cli.nats_url, &cli.subject).await?;
            publisher.publish(&user_id, &client_id, code, &message).await?;
            println!("{} Published code {} to {}/{}", "✓".green(), code, user_id, client_id);
        }
        Command::Scenarios => run_scenarios(&cli.base_url, &cli.nats_url, &cli.subject).await?,
    }

    Ok(())
}

async fn run_scenarios(base_url: &str, nats_url: &str, subject: &str) -> Result<()> {
    println!("{}", "=== SETUP PHASE ===".bright_white().bold());

    let publisher = Publisher::connect(nats_url, subject).await?;
    println!("{} Connected to NATS at {}", "✓".green(), nats_url);

    // Fresh identities so concurrent runs never collide
    let user_id = format!("user-{}", uuid::Uuid::new_v4());
    let target_client = "target".to_string();
    let mut target = Connection::establish(base_url, &user_id, &target_client).await?;
    let mut bystander = Connection::establish(base_url, &user_id, "bystander").await?;
    tokio::time::sleep(CONNECT_SETTLE).await;
    println!("{} Streams opened for {} and {}", "✓".green(), target.label, bystander.label);

    println!("\n{}", "=== TEST PHASE ===".bright_white().bold());

    let results = vec![
        scenarios::test_delivery(&publisher, &mut target, &user_id, &target_client).await?,
        scenarios::test_isolation(&publisher, &mut target, &mut bystander, &user_id, &target_client).await?,
        scenarios::test_unknown_client(&publisher, &mut target).await?,
        scenarios::test_malformed_envelope(&publisher, &mut target, &user_id, &target_client).await?,
    ];

    println!("\n{}", "=== RESULTS ===".bright_white().bold());
    print_test_summary(&results);

    let all_passed = results.iter().all(|r| r.passed);

    if all_passed {
        println!("\n{}", "All tests passed! ✓".bright_green().bold());
    } else {
        println!("\n{}", "Some tests failed! ✗".bright_red().bold());
    }

    std::process::exit(if all_passed { 0 } else { 1 });
}
