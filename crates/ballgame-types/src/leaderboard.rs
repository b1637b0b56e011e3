//! Ranked score views published by the aggregator.
//!
//! A [`LeaderboardSnapshot`] is an owned, point-in-time copy of the score
//! ledger. On the wire it is a JSON array of `[player, score]` pairs so the
//! ranking order survives serialization.

use serde::{Deserialize, Serialize};

use crate::ids::PlayerId;

/// One ranked row: a player and their score.
///
/// Serialized as a two-element array, `["alice", 2]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreEntry(PlayerId, u64);

impl ScoreEntry {
    /// Create a new entry.
    pub const fn new(player: PlayerId, score: u64) -> Self {
        Self(player, score)
    }

    /// The player this row belongs to.
    pub const fn player(&self) -> &PlayerId {
        &self.0
    }

    /// The player's score.
    pub const fn score(&self) -> u64 {
        self.1
    }
}

/// Ranked, immutable copy of all known scores.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LeaderboardSnapshot(Vec<ScoreEntry>);

impl LeaderboardSnapshot {
    /// Rows in rank order.
    pub fn entries(&self) -> &[ScoreEntry] {
        &self.0
    }

    /// Number of ranked players.
    pub const fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no player has scored yet.
    pub const fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Rows as borrowed `(player, score)` pairs, in rank order.
    pub fn pairs(&self) -> impl Iterator<Item = (&str, u64)> {
        self.0.iter().map(|e| (e.player().as_str(), e.score()))
    }
}

impl From<Vec<ScoreEntry>> for LeaderboardSnapshot {
    fn from(entries: Vec<ScoreEntry>) -> Self {
        Self(entries)
    }
}

/// `value` payload of an `aggregated.scores` envelope.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregatedScores {
    /// The ranked leaderboard.
    pub scores: LeaderboardSnapshot,
}
