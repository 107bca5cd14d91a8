//! In-process broker.
//!
//! Routes published messages to every live connection with a matching pattern and
//! keeps a log of everything it accepted. Faults can be switched on from tests:
//! dropping all connections, refusing new ones, and rejecting publishes.

use crate::gateway::pattern::topic_matches;
use crate::gateway::transport::{BrokerConnector, BrokerLink, BrokerSession};
use crate::gateway::{GatewayError, InboundMessage, QoS};
use async_trait::async_trait;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc;
use tracing::debug;

/// A message the broker accepted.
#[derive(Debug, Clone, PartialEq)]
pub struct PublishedMessage {
    pub topic: String,
    pub payload: Vec<u8>,
    pub qos: QoS,
}

impl PublishedMessage {
    pub fn json(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::from_slice(&self.payload)
    }
}

struct Connection {
    id: u64,
    patterns: Vec<String>,
    sender: mpsc::UnboundedSender<InboundMessage>,
}

#[derive(Default)]
struct BrokerState {
    connections: Vec<Connection>,
    published: Vec<PublishedMessage>,
    next_connection: u64,
    refuse_connect: bool,
    reject_publish: bool,
    connects: usize,
}

#[derive(Clone, Default)]
pub struct InMemoryBroker {
    state: Arc<Mutex<BrokerState>>,
}

impl InMemoryBroker {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, BrokerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Closes every open connection, as a broker restart would.
    pub fn drop_connections(&self) {
        let dropped = std::mem::take(&mut self.state().connections);
        debug!(count = dropped.len(), "Dropped broker connections");
    }

    pub fn set_refuse_connect(&self, refuse: bool) {
        self.state().refuse_connect = refuse;
    }

    pub fn set_reject_publish(&self, reject: bool) {
        self.state().reject_publish = reject;
    }

    pub fn connection_count(&self) -> usize {
        self.state().connections.len()
    }

    /// Successful connects so far, reconnects included.
    pub fn connect_count(&self) -> usize {
        self.state().connects
    }

    pub fn published(&self) -> Vec<PublishedMessage> {
        self.state().published.clone()
    }

    pub fn published_on(&self, topic: &str) -> Vec<PublishedMessage> {
        self.state()
            .published
            .iter()
            .filter(|m| m.topic == topic)
            .cloned()
            .collect()
    }

    /// Delivers a message as if another client had published it. Skips the log.
    pub fn inject(&self, topic: &str, payload: Vec<u8>) {
        self.route(topic, &payload);
    }

    fn route(&self, topic: &str, payload: &[u8]) {
        let state = self.state();
        for connection in &state.connections {
            if connection.patterns.iter().any(|p| topic_matches(p, topic)) {
                let _ = connection.sender.send(InboundMessage {
                    topic: topic.to_string(),
                    payload: payload.to_vec(),
                });
            }
        }
    }
}

#[async_trait]
impl BrokerConnector for InMemoryBroker {
    async fn connect(&self) -> Result<BrokerLink, GatewayError> {
        let mut state = self.state();
        if state.refuse_connect {
            return Err(GatewayError::ConnectFailed("broker refused the connection".into()));
        }
        let (sender, inbound) = mpsc::unbounded_channel();
        state.next_connection += 1;
        state.connects += 1;
        let id = state.next_connection;
        state.connections.push(Connection {
            id,
            patterns: Vec::new(),
            sender,
        });
        debug!(connection = id, "Broker accepted connection");
        Ok(BrokerLink {
            session: Box::new(MemorySession {
                broker: self.clone(),
                connection: id,
            }),
            inbound,
        })
    }
}

struct MemorySession {
    broker: InMemoryBroker,
    connection: u64,
}

impl MemorySession {
    fn with_connection<R>(&self, f: impl FnOnce(&mut Connection) -> R) -> Result<R, GatewayError> {
        let mut state = self.broker.state();
        state
            .connections
            .iter_mut()
            .find(|c| c.id == self.connection)
            .map(f)
            .ok_or(GatewayError::NotConnected)
    }
}

#[async_trait]
impl BrokerSession for MemorySession {
    async fn subscribe(&mut self, pattern: &str) -> Result<(), GatewayError> {
        self.with_connection(|c| {
            if !c.patterns.iter().any(|p| p == pattern) {
                c.patterns.push(pattern.to_string());
            }
        })
    }

    async fn unsubscribe(&mut self, pattern: &str) -> Result<(), GatewayError> {
        self.with_connection(|c| c.patterns.retain(|p| p != pattern))
    }

    async fn publish(
        &mut self,
        topic: &str,
        payload: &[u8],
        qos: QoS,
    ) -> Result<(), GatewayError> {
        self.with_connection(|_| ())?;
        {
            let mut state = self.broker.state();
            if state.reject_publish {
                return Err(GatewayError::Rejected(format!("broker rejected publish on {topic}")));
            }
            state.published.push(PublishedMessage {
                topic: topic.to_string(),
                payload: payload.to_vec(),
                qos,
            });
        }
        self.broker.route(topic, payload);
        Ok(())
    }
}
