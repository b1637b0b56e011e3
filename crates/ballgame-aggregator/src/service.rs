//! Process lifecycle for the aggregator.
//!
//! ```text
//! Disconnected -> Connecting -> Ready -> Running <-> Errored
//! ```
//!
//! `Ready` covers exchange declaration and queue subscription. Once
//! `Running`, deliveries are classified into the ledger while the scheduler
//! broadcasts on its own task. Connection and delivery errors move the
//! service to `Errored` without stopping it; the next good delivery moves it
//! back to `Running`. When the delivery stream ends the connection is gone
//! and [`AggregatorService::run`] returns [`AggregatorError::ConnectionLost`].
//! There is no reconnect: restarting is the supervisor's job.

use std::sync::Arc;

use ballgame_ledger::SharedLedger;
use futures::{Stream, StreamExt as _};
use lapin::message::Delivery;
use lapin::options::BasicAckOptions;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::broker::AmqpBroker;
use crate::classifier::EventClassifier;
use crate::config::AggregatorConfig;
use crate::error::AggregatorError;
use crate::scheduler::AggregationScheduler;

/// Lifecycle state of the aggregator process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceState {
    /// Not yet started.
    Disconnected,
    /// Opening the broker connection.
    Connecting,
    /// Connected; declaring the exchange and subscribing.
    Ready,
    /// Steady state: classifying deliveries and broadcasting.
    Running,
    /// A non-fatal broker error was observed.
    Errored,
}

impl core::fmt::Display for ServiceState {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let name = match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Ready => "ready",
            Self::Running => "running",
            Self::Errored => "errored",
        };
        f.write_str(name)
    }
}

/// Shared, observable service state.
#[derive(Debug, Clone)]
struct StateCell {
    tx: Arc<watch::Sender<ServiceState>>,
}

impl StateCell {
    fn new() -> Self {
        let (tx, _rx) = watch::channel(ServiceState::Disconnected);
        Self { tx: Arc::new(tx) }
    }

    fn get(&self) -> ServiceState {
        *self.tx.borrow()
    }

    fn set(&self, next: ServiceState) {
        let previous = self.tx.send_replace(next);
        if previous != next {
            info!(from = %previous, to = %next, "service state changed");
        }
    }
}

/// The score aggregator: owns the ledger and wires it to the broker.
#[derive(Debug)]
pub struct AggregatorService {
    config: AggregatorConfig,
    ledger: SharedLedger,
    state: StateCell,
}

impl AggregatorService {
    /// Create a service over `ledger`. Nothing connects until [`run`].
    ///
    /// [`run`]: AggregatorService::run
    pub fn new(config: AggregatorConfig, ledger: SharedLedger) -> Self {
        Self {
            config,
            ledger,
            state: StateCell::new(),
        }
    }

    /// The ledger this service accumulates into.
    pub const fn ledger(&self) -> &SharedLedger {
        &self.ledger
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ServiceState {
        self.state.get()
    }

    /// Watch lifecycle transitions.
    pub fn subscribe_state(&self) -> watch::Receiver<ServiceState> {
        self.state.tx.subscribe()
    }

    /// Connect, subscribe, and aggregate until the connection is lost.
    ///
    /// # Errors
    ///
    /// Returns [`AggregatorError::Broker`] if startup fails, or
    /// [`AggregatorError::ConnectionLost`] once the delivery stream ends.
    pub async fn run(&self) -> Result<(), AggregatorError> {
        let result = self.run_inner().await;
        if let Err(e) = &result {
            warn!(error = %e, "aggregator stopped");
            self.state.set(ServiceState::Errored);
        }
        result
    }

    async fn run_inner(&self) -> Result<(), AggregatorError> {
        let topology = &self.config.topology;
        let aggregation = &self.config.aggregation;

        self.state.set(ServiceState::Connecting);
        let broker = AmqpBroker::connect(&self.config.broker).await?;
        let state = self.state.clone();
        broker.on_error(move |err| {
            warn!(error = %err, "broker connection error");
            state.set(ServiceState::Errored);
        });
        self.state.set(ServiceState::Ready);

        let publisher = broker
            .declare_exchange(topology, aggregation.publish_mode)
            .await?;
        let deliveries = broker.subscribe_queue(topology).await?;

        let scheduler = AggregationScheduler::new(
            self.ledger.clone(),
            publisher,
            topology.routing_key.clone(),
            aggregation.broadcast_interval(),
        );
        let broadcast = tokio::spawn(scheduler.run());
        self.state.set(ServiceState::Running);

        let classifier = EventClassifier::new(self.ledger.clone());
        let result = self.consume(&classifier, deliveries).await;
        broadcast.abort();

        result
    }

    /// Drain `deliveries` into the classifier until the stream ends.
    ///
    /// Every delivery is acknowledged after handling, including ones that
    /// were rejected: redelivering a malformed payload cannot fix it. Always
    /// ends in [`AggregatorError::ConnectionLost`].
    async fn consume<S>(
        &self,
        classifier: &EventClassifier,
        deliveries: S,
    ) -> Result<(), AggregatorError>
    where
        S: Stream<Item = Result<Delivery, lapin::Error>>,
    {
        let mut deliveries = std::pin::pin!(deliveries);
        while let Some(next) = deliveries.next().await {
            match next {
                Ok(delivery) => {
                    if self.state.get() == ServiceState::Errored {
                        self.state.set(ServiceState::Running);
                    }
                    classifier.handle(&delivery.data);
                    if let Err(e) = delivery.acker.ack(BasicAckOptions::default()).await {
                        warn!(
                            error = %e,
                            delivery_tag = delivery.delivery_tag,
                            "failed to ack delivery"
                        );
                    }
                }
                Err(e) => {
                    warn!(error = %e, "delivery error");
                    self.state.set(ServiceState::Errored);
                }
            }
        }
        info!("delivery stream ended");
        Err(AggregatorError::ConnectionLost)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use ballgame_types::PlayerId;
    use lapin::BasicProperties;
    use lapin::acker::Acker;

    use super::*;
    use crate::config::BrokerConfig;

    fn delivery(tag: u64, body: &[u8]) -> Result<Delivery, lapin::Error> {
        Ok(Delivery {
            delivery_tag: tag,
            exchange: "amq.topic".into(),
            routing_key: "ballgame".into(),
            redelivered: false,
            properties: BasicProperties::default(),
            data: body.to_vec(),
            acker: Acker::default(),
        })
    }

    fn service() -> AggregatorService {
        AggregatorService::new(AggregatorConfig::default(), SharedLedger::new())
    }

    #[test]
    fn starts_disconnected() {
        let service = service();
        assert_eq!(service.state(), ServiceState::Disconnected);
        assert!(service.ledger().is_empty());
    }

    #[test]
    fn state_changes_are_observable() {
        let service = service();
        let rx = service.subscribe_state();

        service.state.set(ServiceState::Connecting);
        assert_eq!(*rx.borrow(), ServiceState::Connecting);

        let cloned = service.state.clone();
        cloned.set(ServiceState::Errored);
        assert_eq!(service.state(), ServiceState::Errored);
    }

    #[test]
    fn state_names() {
        assert_eq!(ServiceState::Running.to_string(), "running");
        assert_eq!(ServiceState::Errored.to_string(), "errored");
    }

    #[tokio::test]
    async fn consume_recovers_after_delivery_error() {
        let service = service();
        service.state.set(ServiceState::Running);
        let classifier = EventClassifier::new(service.ledger().clone());
        let score = br#"{"type":"single.score","name":"alice"}"#;
        let deliveries = futures::stream::iter(vec![
            delivery(1, score),
            Err(lapin::Error::ChannelsLimitReached),
            delivery(2, b"not json"),
            delivery(3, score),
        ]);

        let result = service.consume(&classifier, deliveries).await;

        assert!(matches!(result, Err(AggregatorError::ConnectionLost)));
        assert_eq!(service.state(), ServiceState::Running);
        let alice = PlayerId::new("alice").unwrap();
        assert_eq!(service.ledger().score(&alice), Some(2));
        assert_eq!(service.ledger().len(), 1);
    }

    #[tokio::test]
    async fn consume_ending_on_error_stays_errored() {
        let service = service();
        service.state.set(ServiceState::Running);
        let classifier = EventClassifier::new(service.ledger().clone());
        let deliveries = futures::stream::iter(vec![
            delivery(1, br#"{"type":"ball","name":"carol"}"#),
            Err(lapin::Error::ChannelsLimitReached),
        ]);

        let result = service.consume(&classifier, deliveries).await;

        assert!(matches!(result, Err(AggregatorError::ConnectionLost)));
        assert_eq!(service.state(), ServiceState::Errored);
        assert!(service.ledger().is_empty());
    }

    #[tokio::test]
    async fn unreachable_broker_ends_in_errored() {
        let config = AggregatorConfig {
            broker: BrokerConfig {
                // Nothing listens on the discard port.
                port: 9,
                ..BrokerConfig::default()
            },
            ..AggregatorConfig::default()
        };
        let service = AggregatorService::new(config, SharedLedger::new());

        let outcome = tokio::time::timeout(Duration::from_secs(10), service.run()).await;

        match outcome {
            Ok(result) => {
                assert!(matches!(result, Err(AggregatorError::Broker(_))));
                assert_eq!(service.state(), ServiceState::Errored);
            }
            // Something accepted the connection but never spoke AMQP.
            Err(_) => assert_eq!(service.state(), ServiceState::Connecting),
        }
    }
}
