//! Wire events published on every order transition.
//!
//! The JSON shape is `{eventKind, orderId, notificationId, message}` with an optional
//! full `order` snapshot. Unknown `eventKind` values decode to [`OrderEvent::Unknown`].

use crate::model::{NotificationId, Order, OrderId};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventKind {
    Submitted,
    Accepted,
    Paid,
    Ready,
    Completed,
    Cancelled,
}

impl EventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::Submitted => "SUBMITTED",
            EventKind::Accepted => "ACCEPTED",
            EventKind::Paid => "PAID",
            EventKind::Ready => "READY",
            EventKind::Completed => "COMPLETED",
            EventKind::Cancelled => "CANCELLED",
        }
    }
}

impl Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fields shared by every known event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notice {
    pub order_id: OrderId,
    pub notification_id: Option<NotificationId>,
    pub message: String,
    /// Present when the receiver may not have the order cached yet.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<Order>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "eventKind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderEvent {
    Submitted(Notice),
    Accepted(Notice),
    Paid(Notice),
    Ready(Notice),
    Completed(Notice),
    Cancelled(Notice),
    #[serde(other)]
    Unknown,
}

impl OrderEvent {
    pub fn new(kind: EventKind, notice: Notice) -> Self {
        match kind {
            EventKind::Submitted => OrderEvent::Submitted(notice),
            EventKind::Accepted => OrderEvent::Accepted(notice),
            EventKind::Paid => OrderEvent::Paid(notice),
            EventKind::Ready => OrderEvent::Ready(notice),
            EventKind::Completed => OrderEvent::Completed(notice),
            EventKind::Cancelled => OrderEvent::Cancelled(notice),
        }
    }

    pub fn kind(&self) -> Option<EventKind> {
        match self {
            OrderEvent::Submitted(_) => Some(EventKind::Submitted),
            OrderEvent::Accepted(_) => Some(EventKind::Accepted),
            OrderEvent::Paid(_) => Some(EventKind::Paid),
            OrderEvent::Ready(_) => Some(EventKind::Ready),
            OrderEvent::Completed(_) => Some(EventKind::Completed),
            OrderEvent::Cancelled(_) => Some(EventKind::Cancelled),
            OrderEvent::Unknown => None,
        }
    }

    pub fn notice(&self) -> Option<&Notice> {
        match self {
            OrderEvent::Submitted(n)
            | OrderEvent::Accepted(n)
            | OrderEvent::Paid(n)
            | OrderEvent::Ready(n)
            | OrderEvent::Completed(n)
            | OrderEvent::Cancelled(n) => Some(n),
            OrderEvent::Unknown => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn delta_payload_has_flat_wire_shape() {
        let order_id = OrderId(Uuid::nil());
        let event = OrderEvent::Paid(Notice {
            order_id,
            notification_id: None,
            message: "Payment confirmed".into(),
            order: None,
        });

        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["eventKind"], "PAID");
        assert_eq!(value["orderId"], order_id.to_string());
        assert!(value["notificationId"].is_null());
        assert!(value.get("order").is_none());
    }

    #[test]
    fn unknown_event_kind_is_ignorable() {
        let raw = r#"{"eventKind":"REFUNDED","orderId":"x","message":"later"}"#;
        let event: OrderEvent = serde_json::from_str(raw).unwrap();
        assert_eq!(event, OrderEvent::Unknown);
        assert!(event.kind().is_none());
    }

    #[test]
    fn missing_notification_id_decodes_as_none() {
        let raw = format!(
            r#"{{"eventKind":"READY","orderId":"{}","message":"ready"}}"#,
            Uuid::nil()
        );
        let event: OrderEvent = serde_json::from_str(&raw).unwrap();
        assert_eq!(event.kind(), Some(EventKind::Ready));
        assert!(event.notice().unwrap().notification_id.is_none());
    }
}
