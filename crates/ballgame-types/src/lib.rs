//! Wire types shared by the ballgame services.
//!
//! Every message on the `ballgame` topic is a JSON [`Envelope`]. The browser
//! clients publish player events (`single.new-player`, `ball`,
//! `single.score`); the score aggregator consumes the scoring events and
//! publishes `aggregated.scores` leaderboards back onto the same topic.
//!
//! # Modules
//!
//! - [`ids`] -- The [`PlayerId`] newtype
//! - [`envelope`] -- [`Envelope`] and [`MessageType`]
//! - [`leaderboard`] -- [`ScoreEntry`], [`LeaderboardSnapshot`], [`AggregatedScores`]
//!
//! # Wire format
//!
//! ```text
//! {"type":"single.score","name":"alice","value":{"player":"alice"},"ts":"..."}
//! {"type":"aggregated.scores","value":{"scores":[["alice",2],["bob",1]]}}
//! ```
//!
//! Field names are load-bearing: the front-end reads them directly.

pub mod envelope;
pub mod ids;
pub mod leaderboard;

// Re-export all public types at crate root for convenience.
pub use envelope::{Envelope, MessageType};
pub use ids::PlayerId;
pub use leaderboard::{AggregatedScores, LeaderboardSnapshot, ScoreEntry};

/// Errors raised when constructing wire types from untrusted input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TypeError {
    /// A player identifier was empty or whitespace-only.
    #[error("player identifier must be non-empty")]
    EmptyPlayerId,
}
