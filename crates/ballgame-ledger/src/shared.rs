//! Thread-safe handle over a [`ScoreLedger`].
//!
//! Deliveries and broadcast ticks run on separate tokio tasks, which may be
//! scheduled on different worker threads. Both the read-modify-write of
//! [`SharedLedger::increment`] and the copy in [`SharedLedger::snapshot`]
//! happen under the same lock, so there are no lost updates and no torn
//! snapshots.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use ballgame_types::{LeaderboardSnapshot, PlayerId};

use crate::ledger::ScoreLedger;

/// Clonable, mutex-guarded [`ScoreLedger`].
///
/// Clones share the same underlying ledger.
#[derive(Debug, Clone, Default)]
pub struct SharedLedger {
    inner: Arc<Mutex<ScoreLedger>>,
}

impl SharedLedger {
    /// Create a handle over a fresh, empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one point to `player`. Returns the new score.
    pub fn increment(&self, player: &PlayerId) -> u64 {
        self.lock().increment(player)
    }

    /// Ranked copy of all scores at this instant.
    pub fn snapshot(&self) -> LeaderboardSnapshot {
        self.lock().snapshot()
    }

    /// Current score for `player`.
    pub fn score(&self, player: &PlayerId) -> Option<u64> {
        self.lock().score(player)
    }

    /// Number of players with at least one point.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether nobody has scored yet.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    // A panic while holding the lock cannot leave a half-applied increment,
    // so a poisoned ledger is still consistent.
    fn lock(&self) -> MutexGuard<'_, ScoreLedger> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
