/// A customer order and the types that travel with it.
///
/// # Actor Framework
/// [`Order`] implements [`ActorEntity`](canteen_actor::ActorEntity) (see
/// [`crate::order_actor::entity`]) so the in-process store can own it:
/// - Creation parameters ([`OrderCreate`]) are validated and priced once.
/// - Updates ([`OrderUpdate`]) are conditional on an [`OrderGuard`].
/// - Lists are narrowed with an [`OrderFilter`].
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};
use uuid::Uuid;

/// Opaque order identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(pub Uuid);

impl OrderId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// First 8 characters of the id, as shown to customers.
    pub fn short(&self) -> String {
        self.0.to_string().chars().take(8).collect()
    }
}

impl Default for OrderId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Reference to the customer that placed an order. Also one level of a topic path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CustomerId(pub String);

impl CustomerId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for CustomerId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl Display for CustomerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Pending,
    Preparing,
    Ready,
    Completed,
    Cancelled,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 5] = [
        OrderStatus::Pending,
        OrderStatus::Preparing,
        OrderStatus::Ready,
        OrderStatus::Completed,
        OrderStatus::Cancelled,
    ];

    pub fn is_terminal(self) -> bool {
        matches!(self, OrderStatus::Completed | OrderStatus::Cancelled)
    }

    /// Position along the happy path. Both terminal states share the last rank.
    pub fn rank(self) -> u8 {
        match self {
            OrderStatus::Pending => 0,
            OrderStatus::Preparing => 1,
            OrderStatus::Ready => 2,
            OrderStatus::Completed | OrderStatus::Cancelled => 3,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::Pending => "PENDING",
            OrderStatus::Preparing => "PREPARING",
            OrderStatus::Ready => "READY",
            OrderStatus::Completed => "COMPLETED",
            OrderStatus::Cancelled => "CANCELLED",
        }
    }
}

impl Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    pub menu_item_id: String,
    pub quantity: u32,
    /// Unit price at checkout time.
    pub price: f64,
    #[serde(default)]
    pub special_request: String,
}

impl LineItem {
    pub fn new(menu_item_id: impl Into<String>, quantity: u32, price: f64) -> Self {
        Self {
            menu_item_id: menu_item_id.into(),
            quantity,
            price,
            special_request: String::new(),
        }
    }

    pub fn subtotal(&self) -> f64 {
        self.price * f64::from(self.quantity)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    pub customer_id: CustomerId,
    pub items: Vec<LineItem>,
    /// Frozen at creation.
    pub total_amount: f64,
    pub status: OrderStatus,
    pub payment_status: bool,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Order {
    /// The kitchen has finished cooking.
    pub fn is_prepared(&self) -> bool {
        self.completed_at.is_some()
    }

    pub fn guard(&self) -> OrderGuard {
        OrderGuard {
            status: self.status,
            payment_status: self.payment_status,
            prepared: self.is_prepared(),
        }
    }
}

/// The facts a transition was validated against.
///
/// A conditional update only applies while the stored order still shows the same guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderGuard {
    pub status: OrderStatus,
    pub payment_status: bool,
    pub prepared: bool,
}

/// The one change a single transition request may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderChange {
    ConfirmPayment,
    /// Set `completedAt` without touching `status`.
    MarkPrepared,
    Status(OrderStatus),
    /// Set `completedAt` and move to `READY` in one step.
    MarkPreparedAndReady,
}

impl Display for OrderChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderChange::ConfirmPayment => f.write_str("payment confirmation"),
            OrderChange::MarkPrepared => f.write_str("mark prepared"),
            OrderChange::Status(status) => write!(f, "{status}"),
            OrderChange::MarkPreparedAndReady => f.write_str("mark prepared and READY"),
        }
    }
}

/// Payload for creating a new order.
#[derive(Debug, Clone)]
pub struct OrderCreate {
    pub customer_id: CustomerId,
    pub items: Vec<LineItem>,
}

/// Conditional write produced from a validated transition.
#[derive(Debug, Clone)]
pub struct OrderUpdate {
    pub expected: OrderGuard,
    pub change: OrderChange,
    pub status: OrderStatus,
    pub payment_status: bool,
    pub completed_at: Option<DateTime<Utc>>,
}

impl OrderUpdate {
    /// The write that turns the snapshot described by `expected` into `next`.
    pub fn to_match(expected: OrderGuard, change: OrderChange, next: &Order) -> Self {
        Self {
            expected,
            change,
            status: next.status,
            payment_status: next.payment_status,
            completed_at: next.completed_at,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct OrderFilter {
    /// Empty means every status.
    pub statuses: Vec<OrderStatus>,
    pub customer_id: Option<CustomerId>,
    pub paid: Option<bool>,
}

impl OrderFilter {
    pub fn statuses(statuses: &[OrderStatus]) -> Self {
        Self {
            statuses: statuses.to_vec(),
            ..Self::default()
        }
    }

    pub fn matches(&self, order: &Order) -> bool {
        (self.statuses.is_empty() || self.statuses.contains(&order.status))
            && self
                .customer_id
                .as_ref()
                .map_or(true, |c| *c == order.customer_id)
            && self.paid.map_or(true, |p| p == order.payment_status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_id_is_first_eight_characters() {
        let id = OrderId::new();
        assert_eq!(id.short(), id.to_string()[..8]);
    }

    #[test]
    fn status_serializes_screaming_snake_case() {
        let json = serde_json::to_string(&OrderStatus::Preparing).unwrap();
        assert_eq!(json, "\"PREPARING\"");
        let back: OrderStatus = serde_json::from_str("\"CANCELLED\"").unwrap();
        assert_eq!(back, OrderStatus::Cancelled);
    }

    #[test]
    fn line_item_reads_checkout_shape() {
        let item: LineItem =
            serde_json::from_str(r#"{"menuItemId":"A","quantity":2,"price":50}"#).unwrap();
        assert_eq!(item.special_request, "");
        assert_eq!(item.subtotal(), 100.0);
    }
}
