//! # Notification Dispatcher
//!
//! Turns the events of a committed transition into notifications and pushes.
//!
//! For each event, in order:
//! 1. Customer-facing events get a message from a fixed template and a persisted
//!    [`Notification`]. If persisting fails, that event is abandoned: nothing is
//!    published for it.
//! 2. The event is published on every topic the [`TopicRouter`] names.
//!
//! Neither step rolls back the order change that produced the event. Failures are
//! collected into a [`DispatchReport`] for the caller and logged.

use crate::gateway::{GatewayError, PubSubGateway, QoS};
use crate::model::{EventKind, Notice, Notification, Order, OrderEvent};
use crate::order_actor::OrderError;
use crate::store::OrderStore;
use crate::topics::TopicRouter;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

#[derive(Debug)]
pub enum DispatchFailure {
    /// The notification row could not be written; the event was not published.
    Store { kind: EventKind, error: OrderError },
    /// The row exists (if any) but the push on `topic` was lost.
    Transport {
        kind: EventKind,
        topic: String,
        error: GatewayError,
    },
}

#[derive(Debug, Default)]
pub struct DispatchReport {
    pub notifications: Vec<Notification>,
    pub published: Vec<String>,
    pub failures: Vec<DispatchFailure>,
}

impl DispatchReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Customer message for `kind`, or `None` when the event is staff-only.
pub fn message_for(kind: EventKind, order: &Order) -> Option<String> {
    let short = order.id.short();
    match kind {
        EventKind::Submitted => None,
        EventKind::Accepted => Some(format!(
            "Order {short} has been accepted and is being prepared"
        )),
        EventKind::Paid => Some(format!("Payment confirmed for order {short}")),
        EventKind::Ready => Some(format!("Order {short} is ready for pickup")),
        EventKind::Completed => Some(format!("Order {short} has been picked up")),
        EventKind::Cancelled => Some(format!("Order {short} was cancelled by the store")),
    }
}

#[derive(Clone)]
pub struct NotificationDispatcher {
    store: Arc<dyn OrderStore>,
    gateway: PubSubGateway,
    router: TopicRouter,
    qos: QoS,
}

impl NotificationDispatcher {
    pub fn new(
        store: Arc<dyn OrderStore>,
        gateway: PubSubGateway,
        router: TopicRouter,
        qos: QoS,
    ) -> Self {
        Self {
            store,
            gateway,
            router,
            qos,
        }
    }

    #[instrument(skip(self, order), fields(order_id = %order.id))]
    pub async fn dispatch(&self, order: &Order, events: &[EventKind]) -> DispatchReport {
        let mut report = DispatchReport::default();
        for &kind in events {
            self.dispatch_one(order, kind, &mut report).await;
        }
        if !report.is_complete() {
            warn!(failures = report.failures.len(), "Dispatch degraded");
        }
        report
    }

    async fn dispatch_one(&self, order: &Order, kind: EventKind, report: &mut DispatchReport) {
        let (notification_id, message) = match message_for(kind, order) {
            Some(message) => {
                match self
                    .store
                    .create_notification(order.customer_id.clone(), order.id, message)
                    .await
                {
                    Ok(notification) => {
                        let id = notification.id;
                        let message = notification.message.clone();
                        report.notifications.push(notification);
                        (Some(id), message)
                    }
                    Err(error) => {
                        warn!(event_kind = %kind, %error, "Notification not persisted");
                        report.failures.push(DispatchFailure::Store { kind, error });
                        return;
                    }
                }
            }
            None => (None, format!("New order {} received", order.id.short())),
        };

        for topic in self.router.route(kind, order) {
            let notice = Notice {
                order_id: order.id,
                notification_id,
                message: message.clone(),
                order: self.router.carries_order(&topic).then(|| order.clone()),
            };
            let event = OrderEvent::new(kind, notice);
            match self.gateway.publish_json(&topic, &event, self.qos).await {
                Ok(()) => {
                    debug!(event_kind = %kind, topic, "Event published");
                    report.published.push(topic);
                }
                Err(error) => {
                    warn!(event_kind = %kind, topic, error = %error, "Event not published");
                    report.failures.push(DispatchFailure::Transport { kind, topic, error });
                }
            }
        }
        info!(event_kind = %kind, notification_id = ?notification_id, "Event dispatched");
    }
}
