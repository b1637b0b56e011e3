//! Periodic leaderboard broadcast.
//!
//! On every tick the scheduler copies the ledger into a ranked
//! [`LeaderboardSnapshot`], wraps it in an `aggregated.scores` envelope and
//! publishes it. The ledger lock is held only for the copy, never across
//! the publish, so a slow broker cannot stall score accumulation.
//!
//! Ticks are independent. A failed publish is logged and the next tick
//! simply publishes a fresh snapshot; nothing is queued or retried.
//!
//! [`LeaderboardSnapshot`]: ballgame_types::LeaderboardSnapshot

use std::time::Duration;

use ballgame_ledger::SharedLedger;
use ballgame_types::Envelope;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::broker::Publisher;
use crate::error::AggregatorError;

/// Summary of one successful broadcast.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickReport {
    /// Number of players on the published leaderboard.
    pub players: usize,
    /// Size of the serialized payload in bytes.
    pub payload_bytes: usize,
}

/// Publishes the leaderboard on a fixed period.
#[derive(Debug)]
pub struct AggregationScheduler<P> {
    ledger: SharedLedger,
    publisher: P,
    routing_key: String,
    interval: Duration,
}

impl<P: Publisher> AggregationScheduler<P> {
    /// Create a scheduler that reads `ledger` and publishes through
    /// `publisher` under `routing_key` every `interval`.
    pub fn new(
        ledger: SharedLedger,
        publisher: P,
        routing_key: impl Into<String>,
        interval: Duration,
    ) -> Self {
        Self {
            ledger,
            publisher,
            routing_key: routing_key.into(),
            interval,
        }
    }

    /// Serialized `aggregated.scores` envelope for the ledger as it is now.
    ///
    /// # Errors
    ///
    /// Returns [`AggregatorError::Serde`] if serialization fails.
    pub fn broadcast_payload(&self) -> Result<(usize, Vec<u8>), AggregatorError> {
        let snapshot = self.ledger.snapshot();
        let players = snapshot.len();
        let envelope = Envelope::aggregated(snapshot)?;
        Ok((players, serde_json::to_vec(&envelope)?))
    }

    /// Run one broadcast.
    ///
    /// The publish is bounded by the broadcast interval so a hung broker
    /// call cannot hold up later ticks indefinitely.
    ///
    /// # Errors
    ///
    /// Returns the serialization or publish error, or
    /// [`AggregatorError::PublishTimedOut`] if the publish did not finish
    /// within one interval.
    pub async fn tick(&self) -> Result<TickReport, AggregatorError> {
        let (players, payload) = self.broadcast_payload()?;
        let payload_bytes = payload.len();

        tokio::time::timeout(
            self.interval,
            self.publisher.publish(&self.routing_key, payload),
        )
        .await
        .map_err(|elapsed| AggregatorError::PublishTimedOut {
            after_ms: u64::try_from(self.interval.as_millis()).unwrap_or(u64::MAX),
            reason: elapsed.to_string(),
        })??;

        Ok(TickReport {
            players,
            payload_bytes,
        })
    }

    /// Broadcast forever.
    ///
    /// The first broadcast happens one full interval after the call, then
    /// once per interval. If a tick overruns, the schedule shifts rather
    /// than bursting to catch up.
    pub async fn run(self) {
        let start = Instant::now()
            .checked_add(self.interval)
            .unwrap_or_else(Instant::now);
        let mut ticker = tokio::time::interval_at(start, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            interval_ms = u64::try_from(self.interval.as_millis()).unwrap_or(u64::MAX),
            routing_key = self.routing_key,
            "leaderboard broadcast scheduled"
        );

        loop {
            ticker.tick().await;
            match self.tick().await {
                Ok(report) => debug!(
                    players = report.players,
                    payload_bytes = report.payload_bytes,
                    "leaderboard published"
                ),
                Err(e) => warn!(
                    error = %e,
                    routing_key = self.routing_key,
                    "leaderboard publish failed, skipping this tick"
                ),
            }
        }
    }
}
