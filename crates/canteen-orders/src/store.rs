//! # Order Store
//!
//! The persistence collaborator seen by the service and the dispatcher. [`OrderStore`]
//! is the seam; [`ActorStore`] implements it over the order and notification actors.
//!
//! Every failure arrives as an [`OrderError`]: `NotFound` for unknown ids,
//! `PreconditionFailed` for a lost conditional write, `StoreFailure` for anything the
//! store itself could not do.

use crate::clients::{NotificationClient, OrderClient};
use crate::model::{
    CustomerId, Notification, NotificationCreate, NotificationFilter, NotificationId, Order,
    OrderCreate, OrderFilter, OrderId, OrderUpdate,
};
use crate::order_actor::OrderError;
use async_trait::async_trait;
use canteen_actor::ActorClient;
use tracing::{info, instrument, warn};

#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn insert_order(&self, params: OrderCreate) -> Result<Order, OrderError>;

    async fn find_order(&self, id: OrderId) -> Result<Order, OrderError>;

    /// Applies `update` only if the stored order still matches `update.expected`.
    async fn update_order(&self, id: OrderId, update: OrderUpdate) -> Result<Order, OrderError>;

    /// Newest first.
    async fn list_orders(&self, filter: OrderFilter) -> Result<Vec<Order>, OrderError>;

    /// Removes the order and every notification that references it.
    async fn delete_order(&self, id: OrderId) -> Result<Order, OrderError>;

    async fn create_notification(
        &self,
        user_id: CustomerId,
        order_id: OrderId,
        message: String,
    ) -> Result<Notification, OrderError>;

    /// Newest first.
    async fn list_notifications(
        &self,
        filter: NotificationFilter,
    ) -> Result<Vec<Notification>, OrderError>;

    async fn mark_notification_read(&self, id: NotificationId) -> Result<Notification, OrderError>;

    async fn delete_notification(&self, id: NotificationId) -> Result<Notification, OrderError>;
}

/// [`OrderStore`] backed by the order and notification actors.
#[derive(Clone)]
pub struct ActorStore {
    orders: OrderClient,
    notifications: NotificationClient,
}

impl ActorStore {
    pub fn new(orders: OrderClient, notifications: NotificationClient) -> Self {
        Self {
            orders,
            notifications,
        }
    }
}

#[async_trait]
impl OrderStore for ActorStore {
    async fn insert_order(&self, params: OrderCreate) -> Result<Order, OrderError> {
        self.orders.create_order(params).await
    }

    async fn find_order(&self, id: OrderId) -> Result<Order, OrderError> {
        self.orders
            .get(id)
            .await?
            .ok_or_else(|| OrderError::NotFound(id.to_string()))
    }

    async fn update_order(&self, id: OrderId, update: OrderUpdate) -> Result<Order, OrderError> {
        self.orders.update_order(id, update).await
    }

    async fn list_orders(&self, filter: OrderFilter) -> Result<Vec<Order>, OrderError> {
        let mut orders = self.orders.list(filter).await?;
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(orders)
    }

    #[instrument(skip(self))]
    async fn delete_order(&self, id: OrderId) -> Result<Order, OrderError> {
        let removed = self.orders.delete(id).await?;

        let attached = self
            .notifications
            .list(NotificationFilter {
                order_id: Some(id),
                ..NotificationFilter::default()
            })
            .await?;
        for notification in &attached {
            match self.notifications.delete(notification.id).await {
                // Deleted concurrently by its owner.
                Ok(_) | Err(OrderError::NotFound(_)) => {}
                Err(e) => {
                    warn!(
                        order_id = %id,
                        notification_id = %notification.id,
                        error = %e,
                        "Cascade delete failed"
                    );
                    return Err(OrderError::StoreFailure(format!(
                        "order {id} deleted but notification {} remains: {e}",
                        notification.id
                    )));
                }
            }
        }
        info!(order_id = %id, notifications = attached.len(), "Order deleted");
        Ok(removed)
    }

    async fn create_notification(
        &self,
        user_id: CustomerId,
        order_id: OrderId,
        message: String,
    ) -> Result<Notification, OrderError> {
        self.notifications
            .create_notification(NotificationCreate {
                user_id,
                order_id,
                message,
            })
            .await
    }

    async fn list_notifications(
        &self,
        filter: NotificationFilter,
    ) -> Result<Vec<Notification>, OrderError> {
        let mut notifications = self.notifications.list(filter).await?;
        notifications.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(notifications)
    }

    async fn mark_notification_read(&self, id: NotificationId) -> Result<Notification, OrderError> {
        self.notifications.mark_read(id).await?;
        self.notifications
            .get(id)
            .await?
            .ok_or_else(|| OrderError::NotFound(id.to_string()))
    }

    async fn delete_notification(&self, id: NotificationId) -> Result<Notification, OrderError> {
        self.notifications.delete(id).await
    }
}
