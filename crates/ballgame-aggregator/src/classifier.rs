//! Inbound event classification.
//!
//! Every delivery from the bound queue passes through here. Scoring events
//! (`single.score`) add one point to the named player; everything else on
//! the topic, including the aggregator's own `aggregated.scores`
//! broadcasts, is dropped. Bad payloads are logged and dropped; nothing in
//! this path can take the service down.

use ballgame_ledger::SharedLedger;
use ballgame_types::{Envelope, MessageType, PlayerId};
use tracing::{debug, info, warn};

use crate::error::ClassifyError;

/// What an inbound payload means to the aggregator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    /// A point for this player.
    Score(PlayerId),
    /// Not a scoring event; carries the tag for logging.
    Ignored(MessageType),
}

/// What [`EventClassifier::handle`] did with a payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The player's score was incremented to `score`.
    Scored {
        /// The player credited.
        player: PlayerId,
        /// Their score after this event.
        score: u64,
    },
    /// A well-formed non-scoring event was filtered out.
    Ignored(MessageType),
    /// The payload was rejected; the ledger is unchanged.
    Rejected,
}

/// Decode a raw payload and decide whether it is a scoring event.
///
/// # Errors
///
/// Returns [`ClassifyError::Decode`] if the payload is not a JSON envelope
/// with a `type` field, and [`ClassifyError::MissingPlayer`] if a
/// `single.score` event has no usable `name`.
pub fn classify(payload: &[u8]) -> Result<Classification, ClassifyError> {
    let envelope: Envelope = serde_json::from_slice(payload)?;
    match envelope.kind {
        MessageType::SingleScore => {
            let player = envelope
                .name
                .and_then(|name| PlayerId::new(name).ok())
                .ok_or(ClassifyError::MissingPlayer)?;
            Ok(Classification::Score(player))
        }
        other => Ok(Classification::Ignored(other)),
    }
}

/// Routes scoring events into the shared ledger.
///
/// This is the only writer of the ledger.
#[derive(Debug, Clone)]
pub struct EventClassifier {
    ledger: SharedLedger,
}

impl EventClassifier {
    /// Create a classifier that credits points to `ledger`.
    pub const fn new(ledger: SharedLedger) -> Self {
        Self { ledger }
    }

    /// Classify one payload and apply it.
    ///
    /// Never fails: decode and classification errors are logged at `warn`
    /// and reported as [`Outcome::Rejected`].
    pub fn handle(&self, payload: &[u8]) -> Outcome {
        debug!(
            payload = %String::from_utf8_lossy(payload),
            "received message"
        );
        match classify(payload) {
            Ok(Classification::Score(player)) => {
                let score = self.ledger.increment(&player);
                info!(player = %player, score = score, "score received");
                Outcome::Scored { player, score }
            }
            Ok(Classification::Ignored(kind)) => {
                debug!(message_type = %kind, "discarding non-score message");
                Outcome::Ignored(kind)
            }
            Err(e) => {
                warn!(
                    error = %e,
                    payload_size = payload.len(),
                    "discarding unusable message"
                );
                Outcome::Rejected
            }
        }
    }
}
