//! Per-player score ledger for the ballgame aggregator.
//!
//! The ledger is the only mutable state of the aggregator. It counts one
//! point per accepted `single.score` event and produces ranked,
//! point-in-time [`LeaderboardSnapshot`]s for broadcast.
//!
//! # Architecture
//!
//! - [`ledger`] -- [`ScoreLedger`], the plain owned map.
//! - [`shared`] -- [`SharedLedger`], a clonable handle guarding one
//!   [`ScoreLedger`] behind a single mutex, handed to both the event
//!   classifier (writer) and the broadcast scheduler (reader).
//!
//! # Invariants
//!
//! - Entries are never removed; scores only go up, by exactly one per
//!   increment.
//! - Every entry has a score of at least 1.
//! - Snapshots are ordered by descending score, then ascending player id.
//!
//! # Usage
//!
//! ```
//! use ballgame_ledger::ScoreLedger;
//! use ballgame_types::PlayerId;
//!
//! let alice = PlayerId::new("alice").ok();
//! let mut ledger = ScoreLedger::new();
//! if let Some(alice) = alice {
//!     ledger.increment(&alice);
//!     ledger.increment(&alice);
//!     assert_eq!(ledger.score(&alice), Some(2));
//! }
//! ```
//!
//! [`LeaderboardSnapshot`]: ballgame_types::LeaderboardSnapshot

pub mod ledger;
pub mod shared;

pub use ledger::ScoreLedger;
pub use shared::SharedLedger;
