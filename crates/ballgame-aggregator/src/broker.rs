//! AMQP broker integration.
//!
//! The aggregator talks to a topic exchange on an AMQP 0-9-1 broker
//! (`RabbitMQ` in the ballgame deployment). Inbound events arrive on a named
//! queue bound to the game's binding key; leaderboards go out on the same
//! exchange under the game's routing key.
//!
//! # Topology
//!
//! ```text
//! browser --(ballgame)--> amq.topic --(ballgame)--> score_aggregator_service --> aggregator
//! aggregator --(ballgame)--> amq.topic --> browsers (and back to the aggregator)
//! ```
//!
//! The scheduler only depends on the [`Publisher`] trait so that tests can
//! capture broadcasts in memory.

use std::net::Ipv6Addr;

use lapin::options::{
    BasicConsumeOptions, BasicPublishOptions, ConfirmSelectOptions, ExchangeDeclareOptions,
    QueueBindOptions, QueueDeclareOptions,
};
use lapin::publisher_confirm::Confirmation;
use lapin::types::FieldTable;
use lapin::uri::{AMQPAuthority, AMQPUri, AMQPUserInfo};
use lapin::{BasicProperties, Channel, Connection, ConnectionProperties, Consumer, ExchangeKind};
use tracing::{debug, info};

use crate::config::{BrokerConfig, PublishMode, TopologyConfig};
use crate::error::AggregatorError;

/// Consumer tag used for the inbound subscription.
const CONSUMER_TAG: &str = "score_aggregator";

/// Prefix of exchange names the broker reserves for itself.
const RESERVED_EXCHANGE_PREFIX: &str = "amq.";

/// Outbound side of the broker, as seen by the broadcast scheduler.
pub trait Publisher: Send + Sync + 'static {
    /// Publish `payload` under `routing_key`.
    ///
    /// Whether this waits for a broker acknowledgement is up to the
    /// implementation.
    fn publish(
        &self,
        routing_key: &str,
        payload: Vec<u8>,
    ) -> impl Future<Output = Result<(), AggregatorError>> + Send;
}

/// Connection target for `config`.
///
/// Credentials and vhost are carried as-is, so nothing needs escaping.
/// IPv6 literals are bracketed so the socket address stays unambiguous.
fn amqp_uri(config: &BrokerConfig) -> AMQPUri {
    let host = if config.host.parse::<Ipv6Addr>().is_ok() {
        format!("[{}]", config.host)
    } else {
        config.host.clone()
    };
    AMQPUri {
        authority: AMQPAuthority {
            userinfo: AMQPUserInfo {
                username: config.username.clone(),
                password: config.password.clone(),
            },
            host,
            port: config.port,
        },
        vhost: config.vhost.clone(),
        ..AMQPUri::default()
    }
}

/// An open AMQP connection.
pub struct AmqpBroker {
    connection: Connection,
}

impl AmqpBroker {
    /// Connect to the broker described by `config`.
    ///
    /// # Errors
    ///
    /// Returns [`AggregatorError::Broker`] if the connection cannot be
    /// established or the login is refused.
    pub async fn connect(config: &BrokerConfig) -> Result<Self, AggregatorError> {
        info!(
            host = config.host,
            port = config.port,
            vhost = config.vhost,
            "connecting to AMQP broker"
        );
        let connection =
            Connection::connect_uri(amqp_uri(config), ConnectionProperties::default()).await?;
        info!("AMQP connection established");
        Ok(Self { connection })
    }

    /// Register a callback for asynchronous connection errors.
    ///
    /// The callback runs on the client's I/O thread and must not block.
    pub fn on_error<F>(&self, handler: F)
    where
        F: FnMut(lapin::Error) + Send + 'static,
    {
        self.connection.on_error(handler);
    }

    /// Declare the durable topic exchange and return a publisher bound to it.
    ///
    /// Exchanges under the broker-reserved `amq.` prefix are declared
    /// passively; they always exist and may not be redeclared.
    ///
    /// # Errors
    ///
    /// Returns [`AggregatorError::Broker`] if the channel cannot be opened,
    /// the exchange declaration fails, or confirm mode cannot be enabled.
    pub async fn declare_exchange(
        &self,
        topology: &TopologyConfig,
        mode: PublishMode,
    ) -> Result<AmqpPublisher, AggregatorError> {
        let channel = self.connection.create_channel().await?;
        let options = ExchangeDeclareOptions {
            passive: topology.exchange.starts_with(RESERVED_EXCHANGE_PREFIX),
            durable: true,
            ..ExchangeDeclareOptions::default()
        };
        debug!(exchange = topology.exchange, passive = options.passive, "declaring exchange");
        channel
            .exchange_declare(
                &topology.exchange,
                ExchangeKind::Topic,
                options,
                FieldTable::default(),
            )
            .await?;

        if mode == PublishMode::Confirmed {
            channel.confirm_select(ConfirmSelectOptions::default()).await?;
        }
        info!(exchange = topology.exchange, mode = ?mode, "exchange ready");

        Ok(AmqpPublisher {
            channel,
            exchange: topology.exchange.clone(),
            mode,
        })
    }

    /// Declare the inbound queue, bind it, and start consuming.
    ///
    /// Deliveries must be acknowledged by the caller.
    ///
    /// # Errors
    ///
    /// Returns [`AggregatorError::Broker`] if any of the declare, bind or
    /// consume steps fail.
    pub async fn subscribe_queue(
        &self,
        topology: &TopologyConfig,
    ) -> Result<Consumer, AggregatorError> {
        let channel = self.connection.create_channel().await?;
        channel
            .queue_declare(
                &topology.queue,
                QueueDeclareOptions::default(),
                FieldTable::default(),
            )
            .await?;
        channel
            .queue_bind(
                &topology.queue,
                &topology.exchange,
                &topology.binding_key,
                QueueBindOptions::default(),
                FieldTable::default(),
            )
            .await?;
        let consumer = channel
            .basic_consume(
                &topology.queue,
                CONSUMER_TAG,
                BasicConsumeOptions::default(),
                FieldTable::default(),
            )
            .await?;
        info!(
            queue = topology.queue,
            exchange = topology.exchange,
            binding_key = topology.binding_key,
            "subscribed to queue"
        );
        Ok(consumer)
    }
}

impl core::fmt::Debug for AmqpBroker {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AmqpBroker")
            .field("status", &self.connection.status().state())
            .finish()
    }
}

/// Publishes onto one exchange over a dedicated channel.
#[derive(Debug, Clone)]
pub struct AmqpPublisher {
    channel: Channel,
    exchange: String,
    mode: PublishMode,
}

impl Publisher for AmqpPublisher {
    async fn publish(&self, routing_key: &str, payload: Vec<u8>) -> Result<(), AggregatorError> {
        let properties = BasicProperties::default().with_content_type("application/json".into());
        let confirm = self
            .channel
            .basic_publish(
                &self.exchange,
                routing_key,
                BasicPublishOptions::default(),
                &payload,
                properties,
            )
            .await?;

        match self.mode {
            PublishMode::FireAndForget => Ok(()),
            PublishMode::Confirmed => match confirm.await? {
                Confirmation::Nack(_) => Err(AggregatorError::PublishNacked {
                    routing_key: routing_key.to_owned(),
                }),
                Confirmation::Ack(_) | Confirmation::NotRequested => Ok(()),
            },
        }
    }
}
