//! # Order Service
//!
//! The synchronous operation surface offered to callers (API handlers, CLIs, tests).
//! Authorization is assumed to have happened before any of these are called.
//!
//! A transition runs as: read the order, validate the change against that snapshot,
//! write it conditionally, then dispatch its events. The first three steps decide the
//! outcome. Dispatch problems come back inside [`Transitioned::report`] and never undo
//! the write.

use crate::dispatcher::{DispatchReport, NotificationDispatcher};
use crate::gateway::{PubSubGateway, SubscriptionId};
use crate::model::{
    CustomerId, EventKind, LineItem, Notification, NotificationFilter, NotificationId, Order,
    OrderChange, OrderCreate, OrderEvent, OrderFilter, OrderId, OrderStatus, OrderUpdate,
};
use crate::order_actor::OrderError;
use crate::state_machine::request_transition;
use crate::store::OrderStore;
use crate::topics::TopicRouter;
use crate::view::{spawn_view, ClientOrderView, ViewHandle, ViewKind};
use chrono::Utc;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Outcome of a successful transition.
#[derive(Debug)]
pub struct Transitioned {
    pub order: Order,
    pub events: Vec<EventKind>,
    pub report: DispatchReport,
}

impl Transitioned {
    /// The state change stuck but at least one notification or push did not.
    pub fn is_degraded(&self) -> bool {
        !self.report.is_complete()
    }
}

/// Wire form of a transition request: `{status?, paymentStatus?, markPrepared?}`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionRequest {
    pub status: Option<OrderStatus>,
    pub payment_status: Option<bool>,
    pub mark_prepared: Option<bool>,
}

impl TransitionRequest {
    pub fn into_change(self) -> Result<OrderChange, OrderError> {
        let prepared = self.mark_prepared.unwrap_or(false);
        match (self.status, self.payment_status) {
            (Some(_), Some(_)) => Err(OrderError::validation(
                "status and paymentStatus cannot change in the same request",
            )),
            (None, Some(true)) if !prepared => Ok(OrderChange::ConfirmPayment),
            (None, Some(true)) => Err(OrderError::validation(
                "markPrepared cannot be combined with paymentStatus",
            )),
            (None, Some(false)) => Err(OrderError::validation(
                "paymentStatus can only be set to true",
            )),
            (Some(OrderStatus::Ready), None) if prepared => Ok(OrderChange::MarkPreparedAndReady),
            (Some(status), None) if prepared => Err(OrderError::validation(format!(
                "markPrepared can only be combined with status READY, not {status}"
            ))),
            (Some(status), None) => Ok(OrderChange::Status(status)),
            (None, None) => Ok(OrderChange::MarkPrepared),
        }
    }
}

#[derive(Clone)]
pub struct OrderService {
    store: Arc<dyn OrderStore>,
    dispatcher: NotificationDispatcher,
    gateway: PubSubGateway,
    router: TopicRouter,
}

impl OrderService {
    pub fn new(
        store: Arc<dyn OrderStore>,
        dispatcher: NotificationDispatcher,
        gateway: PubSubGateway,
        router: TopicRouter,
    ) -> Self {
        Self {
            store,
            dispatcher,
            gateway,
            router,
        }
    }

    pub fn router(&self) -> &TopicRouter {
        &self.router
    }

    /// Stores a new `PENDING` order and announces it to the staff boards.
    #[instrument(skip(self, items), fields(item_count = items.len()))]
    pub async fn submit_order(
        &self,
        customer_id: CustomerId,
        items: Vec<LineItem>,
    ) -> Result<Order, OrderError> {
        let order = self
            .store
            .insert_order(OrderCreate { customer_id, items })
            .await?;
        info!(order_id = %order.id, total = order.total_amount, "Order submitted");

        let report = self.dispatcher.dispatch(&order, &[EventKind::Submitted]).await;
        if !report.is_complete() {
            warn!(order_id = %order.id, "Submission announced incompletely");
        }
        Ok(order)
    }

    #[instrument(skip(self))]
    pub async fn transition_order(
        &self,
        id: OrderId,
        change: OrderChange,
    ) -> Result<Transitioned, OrderError> {
        let current = self.store.find_order(id).await?;
        let transition = request_transition(&current, change, Utc::now())?;
        if transition.is_noop() {
            debug!(order_id = %id, %change, "No-op transition");
            return Ok(Transitioned {
                order: current,
                events: Vec::new(),
                report: DispatchReport::default(),
            });
        }

        let update = OrderUpdate::to_match(transition.guard, change, &transition.order);
        let order = self.store.update_order(id, update).await?;
        let paid = order.payment_status;
        info!(order_id = %id, status = %order.status, paid, "Order transitioned");

        let report = self.dispatcher.dispatch(&order, &transition.events).await;
        Ok(Transitioned {
            order,
            events: transition.events,
            report,
        })
    }

    /// Decodes a wire request and runs it through [`OrderService::transition_order`].
    pub async fn apply_request(
        &self,
        id: OrderId,
        request: TransitionRequest,
    ) -> Result<Transitioned, OrderError> {
        let change = request.into_change()?;
        self.transition_order(id, change).await
    }

    pub async fn get_order(&self, id: OrderId) -> Result<Order, OrderError> {
        self.store.find_order(id).await
    }

    /// Newest first. An empty filter lists every status.
    pub async fn list_orders(&self, statuses: &[OrderStatus]) -> Result<Vec<Order>, OrderError> {
        self.store.list_orders(OrderFilter::statuses(statuses)).await
    }

    /// One customer's order history, newest first.
    pub async fn list_customer_orders(
        &self,
        customer_id: &CustomerId,
    ) -> Result<Vec<Order>, OrderError> {
        self.store
            .list_orders(OrderFilter {
                customer_id: Some(customer_id.clone()),
                ..OrderFilter::default()
            })
            .await
    }

    /// Paid orders waiting at the counter.
    pub async fn list_ready_orders(&self) -> Result<Vec<Order>, OrderError> {
        self.store
            .list_orders(OrderFilter {
                paid: Some(true),
                ..OrderFilter::statuses(&[OrderStatus::Ready])
            })
            .await
    }

    /// Deletes the order together with its notifications.
    pub async fn delete_order(&self, id: OrderId) -> Result<Order, OrderError> {
        self.store.delete_order(id).await
    }

    pub async fn list_notifications(
        &self,
        user_id: &CustomerId,
    ) -> Result<Vec<Notification>, OrderError> {
        self.store
            .list_notifications(NotificationFilter {
                user_id: Some(user_id.clone()),
                ..NotificationFilter::default()
            })
            .await
    }

    pub async fn mark_notification_read(
        &self,
        id: NotificationId,
    ) -> Result<Notification, OrderError> {
        self.store.mark_notification_read(id).await
    }

    pub async fn delete_notification(
        &self,
        id: NotificationId,
    ) -> Result<Notification, OrderError> {
        self.store.delete_notification(id).await
    }

    /// Calls `on_event` for every known event on the customer's topic.
    ///
    /// Undecodable payloads and unknown event kinds are skipped.
    #[instrument(skip(self, on_event))]
    pub async fn subscribe_customer<F>(
        &self,
        customer_id: &CustomerId,
        on_event: F,
    ) -> Result<SubscriptionId, OrderError>
    where
        F: Fn(OrderEvent) + Send + Sync + 'static,
    {
        let topic = self.router.customer_topic(customer_id);
        let id = self
            .gateway
            .subscribe(&topic, move |message| {
                match serde_json::from_slice::<OrderEvent>(&message.payload) {
                    Ok(OrderEvent::Unknown) => {
                        debug!(topic = message.topic, "Unknown event kind skipped")
                    }
                    Ok(event) => on_event(event),
                    Err(e) => warn!(topic = message.topic, error = %e, "Undecodable order event"),
                }
            })
            .await?;
        Ok(id)
    }

    pub async fn unsubscribe(&self, id: SubscriptionId) -> Result<(), OrderError> {
        Ok(self.gateway.unsubscribe(id).await?)
    }

    /// Starts a live view and loads its first baseline.
    ///
    /// The view subscribes before the fetch, so a push racing the fetch reaches it
    /// either way; the baseline token keeps the older fetch from evicting it.
    pub async fn open_view(&self, kind: ViewKind) -> Result<ViewHandle, OrderError> {
        let view = spawn_view(&self.gateway, &self.router, ClientOrderView::new(kind)).await?;
        if let Err(e) = self.refresh_view(&view).await {
            let _ = view.close().await;
            return Err(e);
        }
        Ok(view)
    }

    /// Fetches a fresh baseline for an open view.
    pub async fn refresh_view(&self, view: &ViewHandle) -> Result<(), OrderError> {
        let token = view.begin_refresh().await?;
        let baseline = self.store.list_orders(view.kind().baseline_filter()).await?;
        Ok(view.refresh(token, baseline).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(raw: &str) -> Result<OrderChange, OrderError> {
        serde_json::from_str::<TransitionRequest>(raw).unwrap().into_change()
    }

    #[test]
    fn wire_requests_map_to_changes() {
        assert_eq!(decode(r#"{"paymentStatus":true}"#).unwrap(), OrderChange::ConfirmPayment);
        assert_eq!(
            decode(r#"{"status":"PREPARING"}"#).unwrap(),
            OrderChange::Status(OrderStatus::Preparing)
        );
        assert_eq!(decode("{}").unwrap(), OrderChange::MarkPrepared);
        assert_eq!(
            decode(r#"{"status":"READY","markPrepared":true}"#).unwrap(),
            OrderChange::MarkPreparedAndReady
        );
    }

    #[test]
    fn conflicting_wire_requests_fail_validation() {
        for raw in [
            r#"{"status":"READY","paymentStatus":true}"#,
            r#"{"paymentStatus":false}"#,
            r#"{"status":"CANCELLED","markPrepared":true}"#,
            r#"{"paymentStatus":true,"markPrepared":true}"#,
        ] {
            assert!(matches!(decode(raw), Err(OrderError::ValidationFailed { .. })), "{raw}");
        }
    }
}
