//! Configuration for the score aggregator.
//!
//! Configuration is an optional YAML file (path in `BALLGAME_CONFIG`) whose
//! structure mirrors [`AggregatorConfig`]. Every field has a default, so an
//! empty file or no file at all yields a working local setup against a
//! broker on `127.0.0.1:5672`. Environment variables override file values:
//!
//! | Variable | Field |
//! |----------|-------|
//! | `AMQP_HOST` | `broker.host` |
//! | `AMQP_PORT` | `broker.port` |
//! | `AMQP_USERNAME` | `broker.username` |
//! | `AMQP_PASSWORD` | `broker.password` |
//! | `AMQP_VHOST` | `broker.vhost` |
//! | `BROADCAST_INTERVAL_MS` | `aggregation.broadcast_interval_ms` |
//! | `PUBLISH_MODE` | `aggregation.publish_mode` |

use std::env::VarError;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

/// Environment variable naming the YAML config file.
pub const CONFIG_PATH_VAR: &str = "BALLGAME_CONFIG";

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// A value was present but unusable.
    #[error("invalid config value for {field}: {reason}")]
    Invalid {
        /// Dotted path or variable name of the offending setting.
        field: String,
        /// What is wrong with it.
        reason: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level aggregator configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct AggregatorConfig {
    /// Broker connection parameters.
    #[serde(default)]
    pub broker: BrokerConfig,

    /// Exchange, queue and routing names.
    #[serde(default)]
    pub topology: TopologyConfig,

    /// Broadcast timing and delivery mode.
    #[serde(default)]
    pub aggregation: AggregationConfig,
}

impl AggregatorConfig {
    /// Load configuration for the running process.
    ///
    /// Reads the file named by `BALLGAME_CONFIG` if set, otherwise starts
    /// from defaults. Environment overrides are applied and the result is
    /// validated.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read or parsed, or if
    /// any resulting value is invalid.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::base(std::env::var(CONFIG_PATH_VAR))?;
        config.apply_overrides(|name| std::env::var(name).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Starting point for [`load`](Self::load): the file at `path` if the
    /// variable is set, defaults if it is unset.
    fn base(path: Result<String, VarError>) -> Result<Self, ConfigError> {
        match path {
            Ok(path) => Self::from_file(Path::new(&path)),
            Err(VarError::NotPresent) => Ok(Self::default()),
            Err(e @ VarError::NotUnicode(_)) => Err(invalid(CONFIG_PATH_VAR, e)),
        }
    }

    /// Load configuration from a YAML file. No overrides are applied.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Yaml`] if the content is not valid YAML.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string. No overrides are applied.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yml::from_str(yaml)?)
    }

    /// Apply overrides from a variable lookup (normally the process
    /// environment).
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if a numeric or enum variable does
    /// not parse.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(val) = lookup("AMQP_HOST") {
            self.broker.host = val;
        }
        if let Some(val) = lookup("AMQP_PORT") {
            self.broker.port = parse_var("AMQP_PORT", &val)?;
        }
        if let Some(val) = lookup("AMQP_USERNAME") {
            self.broker.username = val;
        }
        if let Some(val) = lookup("AMQP_PASSWORD") {
            self.broker.password = val;
        }
        if let Some(val) = lookup("AMQP_VHOST") {
            self.broker.vhost = val;
        }
        if let Some(val) = lookup("BROADCAST_INTERVAL_MS") {
            self.aggregation.broadcast_interval_ms = parse_var("BROADCAST_INTERVAL_MS", &val)?;
        }
        if let Some(val) = lookup("PUBLISH_MODE") {
            self.aggregation.publish_mode = parse_var("PUBLISH_MODE", &val)?;
        }
        Ok(())
    }

    /// Check cross-field constraints.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for a zero broadcast interval or an
    /// empty host, exchange, queue or key.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.aggregation.broadcast_interval_ms == 0 {
            return Err(invalid(
                "aggregation.broadcast_interval_ms",
                "must be greater than zero",
            ));
        }
        let required = [
            ("broker.host", &self.broker.host),
            ("topology.exchange", &self.topology.exchange),
            ("topology.queue", &self.topology.queue),
            ("topology.binding_key", &self.topology.binding_key),
            ("topology.routing_key", &self.topology.routing_key),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(invalid(field, "must not be empty"));
            }
        }
        Ok(())
    }
}

/// Connection parameters for the AMQP broker.
///
/// Credentials are passed through to the broker untouched.
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct BrokerConfig {
    /// Broker hostname or IP.
    #[serde(default = "default_host")]
    pub host: String,

    /// Broker AMQP port.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Login user.
    #[serde(default = "default_credential")]
    pub username: String,

    /// Login password.
    #[serde(default = "default_credential")]
    pub password: String,

    /// Virtual host.
    #[serde(default = "default_vhost")]
    pub vhost: String,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            username: default_credential(),
            password: default_credential(),
            vhost: default_vhost(),
        }
    }
}

impl core::fmt::Debug for BrokerConfig {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("BrokerConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("vhost", &self.vhost)
            .finish()
    }
}

/// Names of the exchange, queue and keys the aggregator uses.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TopologyConfig {
    /// Durable topic exchange for both directions.
    #[serde(default = "default_exchange")]
    pub exchange: String,

    /// Queue the aggregator consumes from.
    #[serde(default = "default_queue")]
    pub queue: String,

    /// Binding key from the exchange to the queue.
    #[serde(default = "default_game_key")]
    pub binding_key: String,

    /// Routing key for leaderboard broadcasts.
    #[serde(default = "default_game_key")]
    pub routing_key: String,
}

impl Default for TopologyConfig {
    fn default() -> Self {
        Self {
            exchange: default_exchange(),
            queue: default_queue(),
            binding_key: default_game_key(),
            routing_key: default_game_key(),
        }
    }
}

/// Broadcast timing and publish delivery mode.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AggregationConfig {
    /// Milliseconds between leaderboard broadcasts.
    #[serde(default = "default_broadcast_interval_ms")]
    pub broadcast_interval_ms: u64,

    /// Whether broadcasts wait for broker confirmation.
    #[serde(default)]
    pub publish_mode: PublishMode,
}

impl AggregationConfig {
    /// Broadcast period as a [`Duration`].
    pub const fn broadcast_interval(&self) -> Duration {
        Duration::from_millis(self.broadcast_interval_ms)
    }
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            broadcast_interval_ms: default_broadcast_interval_ms(),
            publish_mode: PublishMode::default(),
        }
    }
}

/// Delivery guarantee for outbound broadcasts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PublishMode {
    /// At-most-once: hand the frame to the broker and move on.
    #[default]
    FireAndForget,
    /// Put the channel in confirm mode and wait for the broker's ack.
    Confirmed,
}

impl FromStr for PublishMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "fire_and_forget" | "fire-and-forget" => Ok(Self::FireAndForget),
            "confirmed" => Ok(Self::Confirmed),
            other => Err(format!(
                "unknown publish mode {other:?} (expected fire_and_forget or confirmed)"
            )),
        }
    }
}

fn parse_var<T>(name: &str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: core::fmt::Display,
{
    value.trim().parse().map_err(|e| invalid(name, e))
}

fn invalid(field: &str, reason: impl core::fmt::Display) -> ConfigError {
    ConfigError::Invalid {
        field: field.to_owned(),
        reason: reason.to_string(),
    }
}

fn default_host() -> String {
    "127.0.0.1".to_owned()
}

const fn default_port() -> u16 {
    5672
}

fn default_credential() -> String {
    "guest".to_owned()
}

fn default_vhost() -> String {
    "/".to_owned()
}

fn default_exchange() -> String {
    "amq.topic".to_owned()
}

fn default_queue() -> String {
    "score_aggregator_service".to_owned()
}

fn default_game_key() -> String {
    "ballgame".to_owned()
}

const fn default_broadcast_interval_ms() -> u64 {
    5000
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::BTreeMap;
    use std::ffi::OsString;

    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect()
    }

    #[test]
    fn defaults_match_the_game_topology() {
        let config = AggregatorConfig::default();
        assert_eq!(config.broker.host, "127.0.0.1");
        assert_eq!(config.broker.port, 5672);
        assert_eq!(config.topology.exchange, "amq.topic");
        assert_eq!(config.topology.queue, "score_aggregator_service");
        assert_eq!(config.topology.binding_key, "ballgame");
        assert_eq!(config.topology.routing_key, "ballgame");
        assert_eq!(config.aggregation.broadcast_interval(), Duration::from_secs(5));
        assert_eq!(config.aggregation.publish_mode, PublishMode::FireAndForget);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn parse_empty_yaml() {
        let config = AggregatorConfig::parse("").unwrap();
        assert_eq!(config, AggregatorConfig::default());
    }

    #[test]
    fn parse_partial_yaml() {
        let yaml = "broker:\n  host: rabbit\naggregation:\n  broadcast_interval_ms: 250\n  publish_mode: confirmed\n";
        let config = AggregatorConfig::parse(yaml).unwrap();
        assert_eq!(config.broker.host, "rabbit");
        assert_eq!(config.broker.port, 5672);
        assert_eq!(config.aggregation.broadcast_interval_ms, 250);
        assert_eq!(config.aggregation.publish_mode, PublishMode::Confirmed);
        assert_eq!(config.topology.queue, "score_aggregator_service");
    }

    #[test]
    fn parse_rejects_bad_yaml() {
        let result = AggregatorConfig::parse("broker: [unclosed");
        assert!(matches!(result, Err(ConfigError::Yaml { .. })));
    }

    #[test]
    fn overrides_replace_file_values() {
        let env = vars(&[
            ("AMQP_HOST", "broker.internal"),
            ("AMQP_PORT", "5673"),
            ("AMQP_PASSWORD", "s3cret"),
            ("BROADCAST_INTERVAL_MS", "1000"),
            ("PUBLISH_MODE", "confirmed"),
        ]);
        let mut config = AggregatorConfig::default();
        config.apply_overrides(|k| env.get(k).cloned()).unwrap();

        assert_eq!(config.broker.host, "broker.internal");
        assert_eq!(config.broker.port, 5673);
        assert_eq!(config.broker.password, "s3cret");
        assert_eq!(config.broker.username, "guest");
        assert_eq!(config.aggregation.broadcast_interval_ms, 1000);
        assert_eq!(config.aggregation.publish_mode, PublishMode::Confirmed);
    }

    #[test]
    fn invalid_override_is_reported() {
        let env = vars(&[("AMQP_PORT", "not-a-port")]);
        let mut config = AggregatorConfig::default();
        let err = config.apply_overrides(|k| env.get(k).cloned()).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { ref field, .. } if field == "AMQP_PORT"));
    }

    #[test]
    fn zero_interval_fails_validation() {
        let mut config = AggregatorConfig::default();
        config.aggregation.broadcast_interval_ms = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn empty_queue_fails_validation() {
        let mut config = AggregatorConfig::default();
        config.topology.queue = " ".to_owned();
        assert!(config.validate().is_err());
    }

    #[test]
    fn debug_output_redacts_password() {
        let broker = BrokerConfig {
            password: "hunter2".to_owned(),
            ..BrokerConfig::default()
        };
        let rendered = format!("{broker:?}");
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn unset_config_path_uses_defaults() {
        let config = AggregatorConfig::base(Err(VarError::NotPresent)).unwrap();
        assert_eq!(config, AggregatorConfig::default());
    }

    #[test]
    fn non_unicode_config_path_is_invalid() {
        let path = Err(VarError::NotUnicode(OsString::from("bad")));
        let err = AggregatorConfig::base(path).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { ref field, .. } if field == CONFIG_PATH_VAR));
    }

    #[test]
    fn missing_config_file_is_an_error() {
        let path = "/nonexistent/ballgame-config.yaml".to_owned();
        assert!(matches!(AggregatorConfig::base(Ok(path)), Err(ConfigError::Io { .. })));
    }

    #[test]
    fn load_project_config_file() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("..")
            .join("..")
            .join("ballgame-config.yaml");
        if path.exists() {
            let config = AggregatorConfig::from_file(&path).unwrap();
            assert_eq!(config, AggregatorConfig::default());
        }
    }

    #[test]
    fn publish_mode_from_str() {
        assert_eq!("fire-and-forget".parse::<PublishMode>(), Ok(PublishMode::FireAndForget));
        assert_eq!("Confirmed".parse::<PublishMode>(), Ok(PublishMode::Confirmed));
        assert!("exactly_once".parse::<PublishMode>().is_err());
    }
}
