use crate::model::{CustomerId, OrderId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NotificationId(pub Uuid);

impl NotificationId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for NotificationId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for NotificationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A persisted, customer-facing message about one order.
///
/// Only the read flag ever changes after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: NotificationId,
    pub user_id: CustomerId,
    pub order_id: OrderId,
    pub message: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NotificationCreate {
    pub user_id: CustomerId,
    pub order_id: OrderId,
    pub message: String,
}

#[derive(Debug, Clone, Copy)]
pub enum NotificationAction {
    /// Returns whether the flag changed.
    MarkRead,
}

#[derive(Debug, Clone, Default)]
pub struct NotificationFilter {
    pub user_id: Option<CustomerId>,
    pub order_id: Option<OrderId>,
}

impl NotificationFilter {
    pub fn matches(&self, notification: &Notification) -> bool {
        self.user_id
            .as_ref()
            .map_or(true, |u| *u == notification.user_id)
            && self.order_id.map_or(true, |o| o == notification.order_id)
    }
}
