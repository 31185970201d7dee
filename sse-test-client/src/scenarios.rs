use anyhow::Result;
use colored::*;
use std::time::{Duration, Instant};

use crate::output::TestResult;
use crate::publisher::Publisher;
use crate::sse_client::Connection;

const EVENT_TIMEOUT: Duration = Duration::from_secs(5);
const QUIET_WINDOW: Duration = Duration::from_millis(500);

/// A published envelope reaches the client it addresses.
pub async fn test_delivery(publisher: &Publisher, target: &mut Connection, user_id: &str, client_id: &str) -> Result<TestResult> {
    let scenario = "delivery";
    println!("\n{} {}", "→".blue(), "Publishing to a connected client...".bold());
    let start = Instant::now();

    publisher.publish(user_id, client_id, 200, "hello").await?;

    Ok(match target.wait_for_code(200, EVENT_TIMEOUT).await {
        Ok(event) if event.payload.message == "hello" => TestResult::pass(scenario, start.elapsed()),
        Ok(event) => TestResult::fail(
            scenario,
            start.elapsed(),
            format!("unexpected message {:?}", event.payload.message),
        ),
        Err(e) => TestResult::fail(scenario, start.elapsed(), e.to_string()),
    })
}

/// An envelope for one client is not seen by another connected client.
pub async fn test_isolation(
    publisher: &Publisher,
    target: &mut Connection,
    bystander: &mut Connection,
    user_id: &str,
    client_id: &str,
) -> Result<TestResult> {
    let scenario = "isolation";
    println!("\n{} {}", "→".blue(), "Checking events stay with their client...".bold());
    let start = Instant::now();

    publisher.publish(user_id, client_id, 201, "only for target").await?;

    if let Err(e) = target.wait_for_code(201, EVENT_TIMEOUT).await {
        return Ok(TestResult::fail(scenario, start.elapsed(), e.to_string()));
    }

    let leaked = bystander.drain_for(QUIET_WINDOW).await;
    Ok(if leaked.is_empty() {
        TestResult::pass(scenario, start.elapsed())
    } else {
        TestResult::fail(
            scenario,
            start.elapsed(),
            format!("{} received {} event(s) meant for another client", bystander.label, leaked.len()),
        )
    })
}

/// An envelope for a client that is not connected is silently dropped.
pub async fn test_unknown_client(publisher: &Publisher, connected: &mut Connection) -> Result<TestResult> {
    let scenario = "unknown client";
    println!("\n{} {}", "→".blue(), "Publishing to a client that is not connected...".bold());
    let start = Instant::now();

    publisher.publish("nobody", "nowhere", 404, "nobody home").await?;

    let stray = connected.drain_for(QUIET_WINDOW).await;
    Ok(if stray.is_empty() {
        TestResult::pass(scenario, start.elapsed())
    } else {
        TestResult::fail(scenario, start.elapsed(), "event delivered to the wrong client")
    })
}

/// A corrupt envelope does not stop later envelopes from being delivered.
pub async fn test_malformed_envelope(
    publisher: &Publisher,
    target: &mut Connection,
    user_id: &str,
    client_id: &str,
) -> Result<TestResult> {
    let scenario = "malformed envelope";
    println!("\n{} {}", "→".blue(), "Publishing a corrupt envelope followed by a valid one...".bold());
    let start = Instant::now();

    publisher.publish_raw(vec![0xde, 0xad, 0xbe, 0xef]).await?;
    publisher.publish(user_id, client_id, 202, "still flowing").await?;

    Ok(match target.wait_for_code(202, EVENT_TIMEOUT).await {
        Ok(_) => TestResult::pass(scenario, start.elapsed()),
        Err(e) => TestResult::fail(scenario, start.elapsed(), e.to_string()),
    })
}
