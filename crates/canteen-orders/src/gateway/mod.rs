//! # Pub/Sub Gateway
//!
//! One long-lived broker connection per process, owned by a background task and shared
//! through cloneable [`PubSubGateway`] handles.
//!
//! - **Subscribe** with literal topics or patterns (`+` one level, `#` the rest).
//!   Every handler whose pattern matches an inbound message runs, in registration order.
//! - **Unsubscribe** takes effect before the call returns: no message is handed to the
//!   handler afterwards.
//! - **Publish** waits for the broker to accept the message. While the connection is
//!   down it fails with [`GatewayError::NotConnected`] instead of queueing.
//! - **Reconnect** happens in the background with exponential backoff; every live
//!   pattern is subscribed again on the new session.
//!
//! The broker itself sits behind [`BrokerConnector`]. [`memory::InMemoryBroker`] runs
//! in-process and [`mqtt::MqttConnector`] talks to an MQTT broker; [`connector_for`]
//! picks one from the `[broker]` config.

pub mod memory;
pub mod mqtt;
pub mod pattern;
mod task;
pub mod transport;

pub use transport::{BrokerConnector, BrokerLink, BrokerSession};

use crate::config::{BrokerConfig, BrokerTransport, GatewayConfig};
use crate::order_actor::OrderError;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use task::{Backoff, Command, GatewayTask};
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::task::JoinHandle;
use tracing::{info, instrument};

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("Not connected to the broker")]
    NotConnected,
    #[error("Broker connect failed: {0}")]
    ConnectFailed(String),
    #[error("Publish rejected: {0}")]
    Rejected(String),
    #[error("Invalid topic: {0}")]
    InvalidTopic(String),
    #[error("Invalid pattern: {0}")]
    InvalidPattern(String),
    #[error("Gateway closed")]
    Closed,
    #[error("Payload codec error: {0}")]
    Codec(#[from] serde_json::Error),
}

/// The connector named by `[broker] transport`.
pub fn connector_for(config: &BrokerConfig) -> Arc<dyn BrokerConnector> {
    match config.transport {
        BrokerTransport::Memory => Arc::new(memory::InMemoryBroker::new()),
        BrokerTransport::Mqtt => Arc::new(mqtt::MqttConnector::new(config.clone())),
    }
}

impl From<GatewayError> for OrderError {
    fn from(e: GatewayError) -> Self {
        OrderError::TransportFailure(e.to_string())
    }
}

/// Delivery quality. Exactly-once is not offered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QoS {
    AtMostOnce,
    /// Acknowledged by the broker; may be redelivered.
    #[default]
    AtLeastOnce,
}

impl FromStr for QoS {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "at_most_once" | "0" => Ok(QoS::AtMostOnce),
            "at_least_once" | "1" => Ok(QoS::AtLeastOnce),
            other => Err(format!("unknown qos '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub topic: String,
    pub payload: Vec<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u64);

impl Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub_{}", self.0)
    }
}

/// Runs on the gateway task for each matching message; keep it short and non-blocking.
pub type MessageHandler = Arc<dyn Fn(&InboundMessage) + Send + Sync>;

/// Handle to the gateway task. Cheap to clone.
#[derive(Clone)]
pub struct PubSubGateway {
    commands: mpsc::Sender<Command>,
    connected: Arc<AtomicBool>,
    task: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl PubSubGateway {
    /// Connects (once, inline) and spawns the gateway task.
    ///
    /// A failed first connect is not an error: the task keeps retrying with backoff and
    /// publishes fail with `NotConnected` until it succeeds.
    pub async fn start(connector: Arc<dyn BrokerConnector>, config: &GatewayConfig) -> Self {
        let (sender, receiver) = mpsc::channel(config.command_buffer);
        let connected = Arc::new(AtomicBool::new(false));
        let backoff = Backoff::new(
            Duration::from_millis(config.reconnect_initial_ms),
            Duration::from_millis(config.reconnect_max_ms),
        );

        let mut task = GatewayTask::new(connector, receiver, connected.clone(), backoff);
        task.connect().await;
        let handle = tokio::spawn(task.run());

        Self {
            commands: sender,
            connected,
            task: Arc::new(Mutex::new(Some(handle))),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn request<R>(
        &self,
        build: impl FnOnce(oneshot::Sender<R>) -> Command,
    ) -> Result<R, GatewayError> {
        let (respond_to, response) = oneshot::channel();
        self.commands
            .send(build(respond_to))
            .await
            .map_err(|_| GatewayError::Closed)?;
        response.await.map_err(|_| GatewayError::Closed)
    }

    pub async fn subscribe<F>(
        &self,
        pattern: &str,
        handler: F,
    ) -> Result<SubscriptionId, GatewayError>
    where
        F: Fn(&InboundMessage) + Send + Sync + 'static,
    {
        pattern::validate_pattern(pattern)?;
        let pattern = pattern.to_string();
        self.request(|respond_to| Command::Subscribe {
            pattern,
            handler: Arc::new(handler),
            respond_to,
        })
        .await
    }

    /// Subscribes with a handler that forwards every matching message into a channel.
    pub async fn subscribe_channel(
        &self,
        pattern: &str,
    ) -> Result<(SubscriptionId, mpsc::UnboundedReceiver<InboundMessage>), GatewayError> {
        let (sender, receiver) = mpsc::unbounded_channel();
        let id = self
            .subscribe(pattern, move |message| {
                let _ = sender.send(message.clone());
            })
            .await?;
        Ok((id, receiver))
    }

    /// Removes the handler. Unknown ids are ignored.
    pub async fn unsubscribe(&self, id: SubscriptionId) -> Result<(), GatewayError> {
        self.request(|respond_to| Command::Unsubscribe { id, respond_to })
            .await
    }

    #[instrument(skip(self, payload), fields(bytes = payload.len()))]
    pub async fn publish(
        &self,
        topic: &str,
        payload: Vec<u8>,
        qos: QoS,
    ) -> Result<(), GatewayError> {
        pattern::validate_topic(topic)?;
        let topic = topic.to_string();
        self.request(|respond_to| Command::Publish {
            topic,
            payload,
            qos,
            respond_to,
        })
        .await?
    }

    pub async fn publish_json<T: Serialize>(
        &self,
        topic: &str,
        value: &T,
        qos: QoS,
    ) -> Result<(), GatewayError> {
        let payload = serde_json::to_vec(value)?;
        self.publish(topic, payload, qos).await
    }

    /// Stops the gateway task and closes the session. Later calls on any clone fail
    /// with `Closed`.
    pub async fn shutdown(&self) {
        let _ = self.commands.send(Command::Shutdown).await;
        if let Some(handle) = self.task.lock().await.take() {
            if let Err(e) = handle.await {
                tracing::error!(error = ?e, "Gateway task failed");
            }
        }
        info!("Gateway stopped");
    }
}
