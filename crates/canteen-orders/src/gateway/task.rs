//! The gateway's event loop. One task owns the broker session, the subscription table
//! and the reconnect timer; commands from every `PubSubGateway` clone and inbound broker
//! messages are handled one at a time.

use crate::gateway::pattern::topic_matches;
use crate::gateway::transport::{BrokerConnector, BrokerSession};
use crate::gateway::{GatewayError, InboundMessage, MessageHandler, QoS, SubscriptionId};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;
use tracing::{debug, info, warn};

pub(crate) enum Command {
    Subscribe {
        pattern: String,
        handler: MessageHandler,
        respond_to: oneshot::Sender<SubscriptionId>,
    },
    Unsubscribe {
        id: SubscriptionId,
        respond_to: oneshot::Sender<()>,
    },
    Publish {
        topic: String,
        payload: Vec<u8>,
        qos: QoS,
        respond_to: oneshot::Sender<Result<(), GatewayError>>,
    },
    Shutdown,
}

struct Subscription {
    id: SubscriptionId,
    pattern: String,
    handler: MessageHandler,
}

/// Exponential reconnect delay, doubling up to `max`.
#[derive(Debug)]
pub(crate) struct Backoff {
    initial: Duration,
    max: Duration,
    current: Duration,
}

impl Backoff {
    pub(crate) fn new(initial: Duration, max: Duration) -> Self {
        Self {
            initial,
            max,
            current: initial,
        }
    }

    pub(crate) fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.current = (self.current * 2).min(self.max);
        delay
    }

    pub(crate) fn reset(&mut self) {
        self.current = self.initial;
    }
}

pub(crate) struct GatewayTask {
    connector: Arc<dyn BrokerConnector>,
    commands: mpsc::Receiver<Command>,
    subscriptions: Vec<Subscription>,
    next_id: u64,
    session: Option<Box<dyn BrokerSession>>,
    inbound: Option<mpsc::UnboundedReceiver<InboundMessage>>,
    connected: Arc<AtomicBool>,
    backoff: Backoff,
    reconnect_at: Option<Instant>,
}

impl GatewayTask {
    pub(crate) fn new(
        connector: Arc<dyn BrokerConnector>,
        commands: mpsc::Receiver<Command>,
        connected: Arc<AtomicBool>,
        backoff: Backoff,
    ) -> Self {
        Self {
            connector,
            commands,
            subscriptions: Vec::new(),
            next_id: 1,
            session: None,
            inbound: None,
            connected,
            backoff,
            reconnect_at: None,
        }
    }

    pub(crate) async fn run(mut self) {
        info!("Gateway started");
        loop {
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(Command::Shutdown) | None => break,
                    Some(command) => self.handle(command).await,
                },
                message = next_inbound(&mut self.inbound) => match message {
                    Some(message) => self.deliver(&message),
                    None => self.disconnected("inbound stream closed"),
                },
                _ = wait_until(self.reconnect_at) => self.connect().await,
            }
        }
        self.session = None;
        self.inbound = None;
        self.connected.store(false, Ordering::SeqCst);
        info!(subscriptions = self.subscriptions.len(), "Gateway shutdown");
    }

    /// Opens a session and re-subscribes every live pattern. Schedules a retry on failure.
    pub(crate) async fn connect(&mut self) {
        self.reconnect_at = None;
        let link = match self.connector.connect().await {
            Ok(link) => link,
            Err(e) => {
                let delay = self.backoff.next_delay();
                warn!(error = %e, retry_in_ms = delay.as_millis() as u64, "Broker connect failed");
                self.reconnect_at = Some(Instant::now() + delay);
                return;
            }
        };

        let mut session = link.session;
        for pattern in self.patterns() {
            if let Err(e) = session.subscribe(&pattern).await {
                self.disconnected(&format!("resubscribe to {pattern} failed: {e}"));
                return;
            }
        }
        self.session = Some(session);
        self.inbound = Some(link.inbound);
        self.connected.store(true, Ordering::SeqCst);
        self.backoff.reset();
        info!(patterns = self.subscriptions.len(), "Broker connected");
    }

    fn disconnected(&mut self, reason: &str) {
        self.session = None;
        self.inbound = None;
        self.connected.store(false, Ordering::SeqCst);
        let delay = self.backoff.next_delay();
        warn!(reason, retry_in_ms = delay.as_millis() as u64, "Broker connection lost");
        self.reconnect_at = Some(Instant::now() + delay);
    }

    /// Distinct patterns in registration order.
    fn patterns(&self) -> Vec<String> {
        let mut patterns: Vec<String> = Vec::new();
        for sub in &self.subscriptions {
            if !patterns.contains(&sub.pattern) {
                patterns.push(sub.pattern.clone());
            }
        }
        patterns
    }

    fn pattern_in_use(&self, pattern: &str) -> bool {
        self.subscriptions.iter().any(|s| s.pattern == pattern)
    }

    async fn handle(&mut self, command: Command) {
        match command {
            Command::Subscribe {
                pattern,
                handler,
                respond_to,
            } => {
                let id = SubscriptionId(self.next_id);
                self.next_id += 1;
                let first = !self.pattern_in_use(&pattern);
                self.subscriptions.push(Subscription {
                    id,
                    pattern: pattern.clone(),
                    handler,
                });
                let sent = match self.session.as_mut() {
                    Some(session) if first => session.subscribe(&pattern).await,
                    _ => Ok(()),
                };
                if let Err(e) = sent {
                    // Kept locally; sent again after reconnect.
                    self.disconnected(&format!("subscribe to {pattern} failed: {e}"));
                }
                debug!(%id, pattern, "Subscribed");
                let _ = respond_to.send(id);
            }
            Command::Unsubscribe { id, respond_to } => {
                if let Some(index) = self.subscriptions.iter().position(|s| s.id == id) {
                    let removed = self.subscriptions.remove(index);
                    if !self.pattern_in_use(&removed.pattern) {
                        if let Some(session) = self.session.as_mut() {
                            if let Err(e) = session.unsubscribe(&removed.pattern).await {
                                let pattern = &removed.pattern;
                                warn!(pattern, error = %e, "Broker unsubscribe failed");
                            }
                        }
                    }
                    debug!(%id, pattern = removed.pattern, "Unsubscribed");
                }
                let _ = respond_to.send(());
            }
            Command::Publish {
                topic,
                payload,
                qos,
                respond_to,
            } => {
                let result = match self.session.as_mut() {
                    None => Err(GatewayError::NotConnected),
                    Some(session) => session.publish(&topic, &payload, qos).await,
                };
                if let Err(GatewayError::NotConnected) = result {
                    if self.session.is_some() {
                        self.disconnected("publish found the connection closed");
                    }
                }
                match &result {
                    Ok(()) => debug!(topic, bytes = payload.len(), ?qos, "Published"),
                    Err(e) => warn!(topic, error = %e, "Publish failed"),
                }
                let _ = respond_to.send(result);
            }
            Command::Shutdown => {}
        }
    }

    /// Every handler whose pattern matches runs, in registration order.
    fn deliver(&self, message: &InboundMessage) {
        let mut matched = 0usize;
        for sub in &self.subscriptions {
            if topic_matches(&sub.pattern, &message.topic) {
                (sub.handler)(message);
                matched += 1;
            }
        }
        debug!(topic = message.topic, handlers = matched, "Delivered");
    }
}

async fn next_inbound(
    inbound: &mut Option<mpsc::UnboundedReceiver<InboundMessage>>,
) -> Option<InboundMessage> {
    match inbound {
        Some(receiver) => receiver.recv().await,
        None => std::future::pending().await,
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
