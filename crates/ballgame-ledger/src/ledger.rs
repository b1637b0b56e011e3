//! The owned score map.

use std::collections::BTreeMap;

use ballgame_types::{LeaderboardSnapshot, PlayerId, ScoreEntry};
use tracing::debug;

/// Running per-player score counters.
///
/// Keyed by [`PlayerId`] in a [`BTreeMap`] so iteration is already in
/// ascending player order; ranking then only needs a stable sort on score.
#[derive(Debug, Default, Clone)]
pub struct ScoreLedger {
    scores: BTreeMap<PlayerId, u64>,
}

impl ScoreLedger {
    /// Create an empty ledger.
    pub const fn new() -> Self {
        Self {
            scores: BTreeMap::new(),
        }
    }

    /// Number of players with at least one point.
    pub fn len(&self) -> usize {
        self.scores.len()
    }

    /// Whether nobody has scored yet.
    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    /// Current score for `player`, or `None` if they have never scored.
    pub fn score(&self, player: &PlayerId) -> Option<u64> {
        self.scores.get(player).copied()
    }

    /// Add one point to `player`, creating the entry at 1 if absent.
    ///
    /// Returns the new score. Saturates at [`u64::MAX`].
    pub fn increment(&mut self, player: &PlayerId) -> u64 {
        let score = self.scores.entry(player.clone()).or_insert(0);
        *score = score.saturating_add(1);
        debug!(player = %player, score = *score, "score incremented");
        *score
    }

    /// Ranked copy of every entry.
    ///
    /// Descending by score; ties in ascending player id order.
    pub fn snapshot(&self) -> LeaderboardSnapshot {
        let mut entries: Vec<ScoreEntry> = self
            .scores
            .iter()
            .map(|(player, &score)| ScoreEntry::new(player.clone(), score))
            .collect();
        // Stable: equal scores keep the map's ascending key order.
        entries.sort_by(|a, b| b.score().cmp(&a.score()));
        LeaderboardSnapshot::from(entries)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn player(name: &str) -> PlayerId {
        PlayerId::new(name).unwrap()
    }

    #[test]
    fn new_ledger_is_empty() {
        let ledger = ScoreLedger::new();
        assert!(ledger.is_empty());
        assert_eq!(ledger.len(), 0);
        assert!(ledger.snapshot().is_empty());
    }

    #[test]
    fn first_increment_initializes_to_one() {
        let mut ledger = ScoreLedger::new();
        assert_eq!(ledger.increment(&player("alice")), 1);
        assert_eq!(ledger.score(&player("alice")), Some(1));
        assert_eq!(ledger.score(&player("bob")), None);
    }

    #[test]
    fn score_equals_number_of_increments() {
        let mut ledger = ScoreLedger::new();
        let names = ["alice", "bob", "alice", "carol", "alice", "bob"];
        for name in names {
            ledger.increment(&player(name));
        }
        for name in ["alice", "bob", "carol"] {
            let expected = names.iter().filter(|n| **n == name).count() as u64;
            assert_eq!(ledger.score(&player(name)), Some(expected));
        }
    }

    #[test]
    fn snapshot_orders_by_descending_score() {
        let mut ledger = ScoreLedger::new();
        for name in ["bob", "alice", "carol", "carol", "alice", "carol"] {
            ledger.increment(&player(name));
        }
        let pairs: Vec<_> = ledger.snapshot().pairs().map(|(p, s)| (p.to_owned(), s)).collect();
        assert_eq!(
            pairs,
            vec![
                ("carol".to_owned(), 3),
                ("alice".to_owned(), 2),
                ("bob".to_owned(), 1),
            ]
        );
    }

    #[test]
    fn ties_break_on_ascending_player_id() {
        let mut ledger = ScoreLedger::new();
        for name in ["zed", "mallory", "alice", "mallory"] {
            ledger.increment(&player(name));
        }
        let order: Vec<_> = ledger.snapshot().pairs().map(|(p, _)| p.to_owned()).collect();
        assert_eq!(order, vec!["mallory", "alice", "zed"]);
    }

    #[test]
    fn snapshot_never_contains_zero_scores() {
        let mut ledger = ScoreLedger::new();
        for name in ["a", "b", "c", "a"] {
            ledger.increment(&player(name));
        }
        assert!(ledger.snapshot().entries().iter().all(|e| e.score() >= 1));
    }

    #[test]
    fn snapshot_is_detached_from_ledger() {
        let mut ledger = ScoreLedger::new();
        ledger.increment(&player("alice"));
        let before = ledger.snapshot();
        ledger.increment(&player("alice"));
        ledger.increment(&player("bob"));

        assert_eq!(before.pairs().collect::<Vec<_>>(), vec![("alice", 1)]);
        assert_eq!(ledger.snapshot().len(), 2);
    }

    #[test]
    fn snapshot_serializes_as_ranked_pairs() {
        let mut ledger = ScoreLedger::new();
        ledger.increment(&player("bob"));
        ledger.increment(&player("alice"));
        ledger.increment(&player("alice"));
        let json = serde_json::to_string(&ledger.snapshot()).unwrap();
        assert_eq!(json, r#"[["alice",2],["bob",1]]"#);
    }
}
