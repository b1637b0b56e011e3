//! Score aggregator entry point for the ballgame.
//!
//! # Startup Sequence
//!
//! 1. Initialize structured logging (tracing)
//! 2. Load configuration (`BALLGAME_CONFIG` file + environment overrides)
//! 3. Create an empty score ledger
//! 4. Connect to the broker, declare the exchange, subscribe the queue
//! 5. Aggregate and broadcast until the connection is lost
//!
//! Scores live only in memory; a restart starts from an empty ledger.

use anyhow::Context as _;
use ballgame_aggregator::{AggregatorConfig, AggregatorService};
use ballgame_ledger::SharedLedger;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Application entry point.
///
/// # Errors
///
/// Returns an error if configuration is invalid, startup against the broker
/// fails, or the broker connection is lost.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    info!("ballgame-aggregator starting");

    let config = AggregatorConfig::load().context("loading configuration")?;
    info!(
        broker = ?config.broker,
        exchange = config.topology.exchange,
        queue = config.topology.queue,
        binding_key = config.topology.binding_key,
        routing_key = config.topology.routing_key,
        broadcast_interval_ms = config.aggregation.broadcast_interval_ms,
        publish_mode = ?config.aggregation.publish_mode,
        "configuration loaded"
    );

    let service = AggregatorService::new(config, SharedLedger::new());
    service.run().await.context("score aggregator stopped")?;

    Ok(())
}
