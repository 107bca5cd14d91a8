//! Runtime settings: defaults, then an optional TOML file, then `CANTEEN__*` environment
//! variables.
//!
//! ```toml
//! topic_prefix = "campus/canteen"
//! actor_buffer = 64
//!
//! [gateway]
//! reconnect_initial_ms = 250
//! publish_qos = "at_least_once"
//!
//! [broker]
//! transport = "mqtt"
//! host = "broker.emqx.io"
//! port = 1883
//! client_id = "canteen-orders-1"
//! ```

use crate::gateway::QoS;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct CanteenConfig {
    /// Namespace placed before every topic; empty for none.
    pub topic_prefix: String,
    /// Mailbox capacity of the order and notification actors.
    pub actor_buffer: usize,
    pub gateway: GatewayConfig,
    pub broker: BrokerConfig,
}

impl Default for CanteenConfig {
    fn default() -> Self {
        Self {
            topic_prefix: String::new(),
            actor_buffer: 32,
            gateway: GatewayConfig::default(),
            broker: BrokerConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub command_buffer: usize,
    pub reconnect_initial_ms: u64,
    pub reconnect_max_ms: u64,
    /// Delivery quality for order events. Only `at_least_once` passes validation.
    pub publish_qos: QoS,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            command_buffer: 64,
            reconnect_initial_ms: 200,
            reconnect_max_ms: 10_000,
            publish_qos: QoS::AtLeastOnce,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BrokerTransport {
    /// In-process broker; nothing leaves the process.
    #[default]
    Memory,
    Mqtt,
}

impl FromStr for BrokerTransport {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "memory" => Ok(BrokerTransport::Memory),
            "mqtt" => Ok(BrokerTransport::Mqtt),
            other => Err(format!("unknown transport '{other}'")),
        }
    }
}

/// Which broker the gateway talks to. The connection fields are used by `mqtt` only.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct BrokerConfig {
    pub transport: BrokerTransport,
    pub host: String,
    pub port: u16,
    pub client_id: String,
    pub keep_alive_secs: u64,
    /// How long to wait for the broker's CONNACK, and for a PUBACK.
    pub connect_timeout_ms: u64,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            transport: BrokerTransport::Memory,
            host: "localhost".into(),
            port: 1883,
            client_id: "canteen-orders".into(),
            keep_alive_secs: 30,
            connect_timeout_ms: 5_000,
            username: None,
            password: None,
        }
    }
}

impl CanteenConfig {
    /// Loads the file at `path` (if any), applies the process environment and validates.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => {
                let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                })?;
                Self::from_toml(&raw)?
            }
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml(raw: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(raw)?)
    }

    /// Applies `CANTEEN__*` overrides read through `lookup`.
    pub fn apply_env(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(v) = lookup("CANTEEN__TOPIC_PREFIX") {
            self.topic_prefix = v;
        }
        if let Some(v) = lookup("CANTEEN__ACTOR_BUFFER") {
            self.actor_buffer = parse("CANTEEN__ACTOR_BUFFER", &v)?;
        }
        if let Some(v) = lookup("CANTEEN__GATEWAY__COMMAND_BUFFER") {
            self.gateway.command_buffer = parse("CANTEEN__GATEWAY__COMMAND_BUFFER", &v)?;
        }
        if let Some(v) = lookup("CANTEEN__GATEWAY__RECONNECT_INITIAL_MS") {
            self.gateway.reconnect_initial_ms =
                parse("CANTEEN__GATEWAY__RECONNECT_INITIAL_MS", &v)?;
        }
        if let Some(v) = lookup("CANTEEN__GATEWAY__RECONNECT_MAX_MS") {
            self.gateway.reconnect_max_ms = parse("CANTEEN__GATEWAY__RECONNECT_MAX_MS", &v)?;
        }
        if let Some(v) = lookup("CANTEEN__GATEWAY__PUBLISH_QOS") {
            self.gateway.publish_qos = parse("CANTEEN__GATEWAY__PUBLISH_QOS", &v)?;
        }
        if let Some(v) = lookup("CANTEEN__BROKER__TRANSPORT") {
            self.broker.transport = parse("CANTEEN__BROKER__TRANSPORT", &v)?;
        }
        if let Some(v) = lookup("CANTEEN__BROKER__HOST") {
            self.broker.host = v;
        }
        if let Some(v) = lookup("CANTEEN__BROKER__PORT") {
            self.broker.port = parse("CANTEEN__BROKER__PORT", &v)?;
        }
        if let Some(v) = lookup("CANTEEN__BROKER__CLIENT_ID") {
            self.broker.client_id = v;
        }
        if let Some(v) = lookup("CANTEEN__BROKER__USERNAME") {
            self.broker.username = Some(v);
        }
        if let Some(v) = lookup("CANTEEN__BROKER__PASSWORD") {
            self.broker.password = Some(v);
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.actor_buffer == 0 {
            return Err(ConfigError::Invalid("actor_buffer must be at least 1".into()));
        }
        if self.gateway.command_buffer == 0 {
            return Err(ConfigError::Invalid("gateway.command_buffer must be at least 1".into()));
        }
        if self.gateway.reconnect_initial_ms == 0
            || self.gateway.reconnect_initial_ms > self.gateway.reconnect_max_ms
        {
            return Err(ConfigError::Invalid(
                "gateway.reconnect_initial_ms must be between 1 and reconnect_max_ms".into(),
            ));
        }
        if self.gateway.publish_qos != QoS::AtLeastOnce {
            return Err(ConfigError::Invalid(
                "gateway.publish_qos must be at_least_once: order events may not be lost".into(),
            ));
        }
        if self.topic_prefix.contains(['+', '#']) {
            return Err(ConfigError::Invalid("topic_prefix may not contain wildcards".into()));
        }
        if self.broker.transport == BrokerTransport::Mqtt {
            let broker = &self.broker;
            if broker.host.trim().is_empty() || broker.client_id.trim().is_empty() {
                return Err(ConfigError::Invalid(
                    "broker.host and broker.client_id are required".into(),
                ));
            }
            if broker.keep_alive_secs < 5 {
                return Err(ConfigError::Invalid(
                    "broker.keep_alive_secs must be at least 5".into(),
                ));
            }
            if broker.connect_timeout_ms == 0 {
                return Err(ConfigError::Invalid(
                    "broker.connect_timeout_ms must be at least 1".into(),
                ));
            }
            if broker.username.is_some() != broker.password.is_some() {
                return Err(ConfigError::Invalid(
                    "broker.username and broker.password go together".into(),
                ));
            }
        }
        Ok(())
    }
}

fn parse<T: FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::Invalid(format!("{key}: cannot parse '{value}'")))
}
