//! # Topic Router
//!
//! Maps an event to the topics that must carry it.
//!
//! | Topic | Carries |
//! |---|---|
//! | `orders/intake` | new submissions, for every staff board |
//! | `orders/kitchen/intake` | accepted orders, for the kitchen board |
//! | `orders/kitchen/cancel` | cancellations, so the kitchen can pull a ticket |
//! | `notify/order/{customerId}` | every status notification for one customer |
//!
//! All topics are placed under an optional namespace prefix.

use crate::model::{CustomerId, EventKind, Order};

pub const ORDER_INTAKE: &str = "orders/intake";
pub const KITCHEN_INTAKE: &str = "orders/kitchen/intake";
pub const KITCHEN_CANCEL: &str = "orders/kitchen/cancel";
pub const CUSTOMER_ROOT: &str = "notify/order";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TopicRouter {
    prefix: String,
}

impl TopicRouter {
    /// `prefix` is trimmed of slashes; an empty prefix leaves topics as they are.
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into().trim_matches('/').to_string(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    fn qualify(&self, topic: &str) -> String {
        if self.prefix.is_empty() {
            topic.to_string()
        } else {
            format!("{}/{topic}", self.prefix)
        }
    }

    pub fn order_intake(&self) -> String {
        self.qualify(ORDER_INTAKE)
    }

    pub fn kitchen_intake(&self) -> String {
        self.qualify(KITCHEN_INTAKE)
    }

    pub fn kitchen_cancel(&self) -> String {
        self.qualify(KITCHEN_CANCEL)
    }

    pub fn customer_topic(&self, customer_id: &CustomerId) -> String {
        self.qualify(&format!("{CUSTOMER_ROOT}/{customer_id}"))
    }

    /// Matches every customer topic.
    pub fn customer_wildcard(&self) -> String {
        self.qualify(&format!("{CUSTOMER_ROOT}/+"))
    }

    /// Topics whose subscribers may not have the order cached, so the payload carries it.
    pub fn carries_order(&self, topic: &str) -> bool {
        topic == self.order_intake() || topic == self.kitchen_intake()
    }

    pub fn route(&self, kind: EventKind, order: &Order) -> Vec<String> {
        let customer = self.customer_topic(&order.customer_id);
        match kind {
            EventKind::Submitted => vec![self.order_intake()],
            EventKind::Accepted => vec![customer, self.kitchen_intake()],
            EventKind::Paid | EventKind::Ready | EventKind::Completed => vec![customer],
            EventKind::Cancelled => vec![customer, self.kitchen_cancel()],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{LineItem, OrderId, OrderStatus};
    use chrono::Utc;

    fn order_for(customer: &str) -> Order {
        Order {
            id: OrderId::new(),
            customer_id: CustomerId::from(customer),
            items: vec![LineItem::new("A", 1, 1.0)],
            total_amount: 1.0,
            status: OrderStatus::Pending,
            payment_status: false,
            completed_at: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn routes_follow_the_topic_table() {
        let router = TopicRouter::default();
        let order = order_for("u42");

        assert_eq!(router.route(EventKind::Submitted, &order), vec!["orders/intake"]);
        assert_eq!(
            router.route(EventKind::Accepted, &order),
            vec!["notify/order/u42", "orders/kitchen/intake"]
        );
        for kind in [EventKind::Paid, EventKind::Ready, EventKind::Completed] {
            assert_eq!(router.route(kind, &order), vec!["notify/order/u42"]);
        }
        assert_eq!(
            router.route(EventKind::Cancelled, &order),
            vec!["notify/order/u42", "orders/kitchen/cancel"]
        );
    }

    #[test]
    fn prefix_namespaces_every_topic() {
        let router = TopicRouter::new("/campus/canteen/");
        let order = order_for("u1");

        assert_eq!(router.prefix(), "campus/canteen");
        assert_eq!(router.route(EventKind::Ready, &order), vec!["campus/canteen/notify/order/u1"]);
        assert_eq!(router.customer_wildcard(), "campus/canteen/notify/order/+");
        assert!(router.carries_order("campus/canteen/orders/kitchen/intake"));
        assert!(!router.carries_order("campus/canteen/orders/kitchen/cancel"));
    }
}
