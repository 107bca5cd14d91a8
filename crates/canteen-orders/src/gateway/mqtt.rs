//! MQTT transport over [`rumqttc`].
//!
//! Each [`BrokerConnector::connect`] opens a fresh client and waits for the broker's
//! CONNACK. A background task then polls the event loop, forwarding PUBLISH packets as
//! [`InboundMessage`]s. The first connection error ends that task and closes the
//! inbound stream; reconnecting is left to the gateway's backoff.
//!
//! `AtLeastOnce` publishes return after the broker's PUBACK. The broker acknowledges in
//! the order it received, so pending acknowledgements are matched first in, first out.

use crate::config::BrokerConfig;
use crate::gateway::transport::{BrokerConnector, BrokerLink, BrokerSession};
use crate::gateway::{GatewayError, InboundMessage, QoS};
use async_trait::async_trait;
use rumqttc::{
    AsyncClient, ClientError, ConnectionError, Event, EventLoop, MqttOptions, Packet,
};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Requests the client may queue ahead of the event loop.
const REQUEST_CAPACITY: usize = 64;

type PendingAcks = Arc<Mutex<VecDeque<oneshot::Sender<()>>>>;

pub struct MqttConnector {
    config: BrokerConfig,
}

impl MqttConnector {
    pub fn new(config: BrokerConfig) -> Self {
        Self { config }
    }

    fn options(&self) -> MqttOptions {
        let mut options = MqttOptions::new(
            self.config.client_id.clone(),
            self.config.host.clone(),
            self.config.port,
        );
        options.set_keep_alive(Duration::from_secs(self.config.keep_alive_secs));
        options.set_clean_session(true);
        if let (Some(username), Some(password)) = (&self.config.username, &self.config.password) {
            options.set_credentials(username.clone(), password.clone());
        }
        options
    }

    fn ack_timeout(&self) -> Duration {
        Duration::from_millis(self.config.connect_timeout_ms)
    }
}

#[async_trait]
impl BrokerConnector for MqttConnector {
    async fn connect(&self) -> Result<BrokerLink, GatewayError> {
        let (client, mut eventloop) = AsyncClient::new(self.options(), REQUEST_CAPACITY);
        match tokio::time::timeout(self.ack_timeout(), wait_for_connack(&mut eventloop)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(GatewayError::ConnectFailed(e.to_string())),
            Err(_) => {
                return Err(GatewayError::ConnectFailed(format!(
                    "no CONNACK from {}:{} within {}ms",
                    self.config.host, self.config.port, self.config.connect_timeout_ms
                )))
            }
        }

        let (sender, inbound) = mpsc::unbounded_channel();
        let acks = PendingAcks::default();
        let poller = tokio::spawn(poll(eventloop, sender, acks.clone()));
        info!(host = self.config.host, port = self.config.port, "MQTT session open");
        Ok(BrokerLink {
            session: Box::new(MqttSession {
                client,
                poller,
                acks,
                ack_timeout: self.ack_timeout(),
            }),
            inbound,
        })
    }
}

async fn wait_for_connack(eventloop: &mut EventLoop) -> Result<(), ConnectionError> {
    loop {
        if let Event::Incoming(Packet::ConnAck(_)) = eventloop.poll().await? {
            return Ok(());
        }
    }
}

async fn poll(
    mut eventloop: EventLoop,
    sender: mpsc::UnboundedSender<InboundMessage>,
    acks: PendingAcks,
) {
    loop {
        match eventloop.poll().await {
            Ok(Event::Incoming(Packet::Publish(publish))) => {
                let message = InboundMessage {
                    topic: publish.topic,
                    payload: publish.payload.to_vec(),
                };
                if sender.send(message).is_err() {
                    break;
                }
            }
            Ok(Event::Incoming(Packet::PubAck(ack))) => {
                let waiter = acks
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .pop_front();
                if let Some(waiter) = waiter {
                    let _ = waiter.send(());
                }
                debug!(pkid = ack.pkid, "PUBACK");
            }
            Ok(_) => {}
            Err(e) => {
                warn!(error = %e, "MQTT connection closed");
                break;
            }
        }
    }
}

struct MqttSession {
    client: AsyncClient,
    poller: JoinHandle<()>,
    acks: PendingAcks,
    ack_timeout: Duration,
}

impl MqttSession {
    fn ensure_open(&self) -> Result<(), GatewayError> {
        if self.poller.is_finished() {
            Err(GatewayError::NotConnected)
        } else {
            Ok(())
        }
    }
}

impl Drop for MqttSession {
    fn drop(&mut self) {
        self.poller.abort();
    }
}

/// The client only fails when its event loop is gone.
fn closed(e: ClientError) -> GatewayError {
    debug!(error = %e, "MQTT request not queued");
    GatewayError::NotConnected
}

fn mqtt_qos(qos: QoS) -> rumqttc::QoS {
    match qos {
        QoS::AtMostOnce => rumqttc::QoS::AtMostOnce,
        QoS::AtLeastOnce => rumqttc::QoS::AtLeastOnce,
    }
}

#[async_trait]
impl BrokerSession for MqttSession {
    async fn subscribe(&mut self, pattern: &str) -> Result<(), GatewayError> {
        self.ensure_open()?;
        self.client
            .subscribe(pattern, rumqttc::QoS::AtLeastOnce)
            .await
            .map_err(closed)
    }

    async fn unsubscribe(&mut self, pattern: &str) -> Result<(), GatewayError> {
        self.ensure_open()?;
        self.client.unsubscribe(pattern).await.map_err(closed)
    }

    async fn publish(
        &mut self,
        topic: &str,
        payload: &[u8],
        qos: QoS,
    ) -> Result<(), GatewayError> {
        self.ensure_open()?;
        let acked = match qos {
            QoS::AtMostOnce => None,
            QoS::AtLeastOnce => {
                let (waiter, acked) = oneshot::channel();
                self.acks
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .push_back(waiter);
                Some(acked)
            }
        };
        self.client
            .publish(topic, mqtt_qos(qos), false, payload.to_vec())
            .await
            .map_err(closed)?;

        let Some(acked) = acked else {
            return Ok(());
        };
        match tokio::time::timeout(self.ack_timeout, acked).await {
            Ok(Ok(())) => Ok(()),
            // The poller ended with the acknowledgement still pending.
            Ok(Err(_)) => Err(GatewayError::NotConnected),
            Err(_) => Err(GatewayError::Rejected(format!("no PUBACK for {topic}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BrokerTransport;

    fn config(port: u16) -> BrokerConfig {
        BrokerConfig {
            transport: BrokerTransport::Mqtt,
            host: "127.0.0.1".into(),
            port,
            client_id: "canteen-test".into(),
            keep_alive_secs: 15,
            connect_timeout_ms: 500,
            username: Some("kitchen".into()),
            password: Some("secret".into()),
        }
    }

    #[test]
    fn options_follow_the_config() {
        let options = MqttConnector::new(config(1884)).options();
        assert_eq!(options.client_id(), "canteen-test");
        assert_eq!(options.broker_address(), ("127.0.0.1".to_string(), 1884));
        assert_eq!(options.keep_alive(), Duration::from_secs(15));
        assert!(options.clean_session());
    }

    #[test]
    fn qos_maps_one_to_one() {
        assert_eq!(mqtt_qos(QoS::AtMostOnce), rumqttc::QoS::AtMostOnce);
        assert_eq!(mqtt_qos(QoS::AtLeastOnce), rumqttc::QoS::AtLeastOnce);
    }

    #[tokio::test]
    async fn unreachable_broker_fails_to_connect() {
        // Nothing listens on port 1.
        let result = MqttConnector::new(config(1)).connect().await;
        assert!(matches!(result, Err(GatewayError::ConnectFailed(_))));
    }
}
