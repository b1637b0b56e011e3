//! Score aggregation service for the ballgame.
//!
//! Consumes game events from a topic exchange, keeps a running count of
//! points per player, and broadcasts the ranked leaderboard on a fixed
//! interval.
//!
//! # Architecture
//!
//! ```text
//! queue --> EventClassifier --> SharedLedger <-- AggregationScheduler --> exchange
//! ```
//!
//! - [`classifier`] -- decodes deliveries and credits `single.score` events.
//! - [`scheduler`] -- snapshots the ledger and publishes `aggregated.scores`.
//! - [`broker`] -- AMQP connection, topology, and the [`Publisher`] seam.
//! - [`service`] -- lifecycle wiring of the above.
//! - [`config`] -- YAML + environment configuration.
//!
//! The ledger is constructed by the caller and handed to the classifier and
//! scheduler, so every test can run against its own instance.

pub mod broker;
pub mod classifier;
pub mod config;
pub mod error;
pub mod scheduler;
pub mod service;

pub use broker::{AmqpBroker, AmqpPublisher, Publisher};
pub use classifier::{Classification, EventClassifier, Outcome, classify};
pub use config::{AggregatorConfig, ConfigError, PublishMode};
pub use error::{AggregatorError, ClassifyError};
pub use scheduler::{AggregationScheduler, TickReport};
pub use service::{AggregatorService, ServiceState};
