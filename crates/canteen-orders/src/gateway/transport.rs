//! The broker seam. A [`BrokerConnector`] opens sessions; each [`BrokerLink`] is one
//! live connection: a [`BrokerSession`] to send on and a stream of inbound messages.
//! The stream ending means the connection is gone.

use crate::gateway::{GatewayError, InboundMessage, QoS};
use async_trait::async_trait;
use tokio::sync::mpsc;

pub struct BrokerLink {
    pub session: Box<dyn BrokerSession>,
    pub inbound: mpsc::UnboundedReceiver<InboundMessage>,
}

#[async_trait]
pub trait BrokerConnector: Send + Sync + 'static {
    async fn connect(&self) -> Result<BrokerLink, GatewayError>;
}

#[async_trait]
pub trait BrokerSession: Send + Sync {
    async fn subscribe(&mut self, pattern: &str) -> Result<(), GatewayError>;

    async fn unsubscribe(&mut self, pattern: &str) -> Result<(), GatewayError>;

    /// Returns once the broker has accepted the message at `qos`.
    async fn publish(
        &mut self,
        topic: &str,
        payload: &[u8],
        qos: QoS,
    ) -> Result<(), GatewayError>;
}
