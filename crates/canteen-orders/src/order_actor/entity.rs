//! [`ActorEntity`] implementation for [`Order`].
//!
//! Creation validates the checkout payload and freezes the total. Updates are
//! compare-and-set: the actor applies them one at a time, so comparing the guard and
//! writing the fields inside `on_update` cannot interleave with another writer.

use crate::model::{Order, OrderCreate, OrderFilter, OrderId, OrderStatus, OrderUpdate};
use crate::order_actor::OrderError;
use async_trait::async_trait;
use canteen_actor::ActorEntity;
use chrono::Utc;

#[async_trait]
impl ActorEntity for Order {
    type Id = OrderId;
    type Create = OrderCreate;
    type Update = OrderUpdate;
    type Action = std::convert::Infallible;
    type ActionResult = ();
    type Filter = OrderFilter;
    type Context = ();
    type Error = OrderError;

    fn from_create_params(id: OrderId, params: OrderCreate) -> Result<Self, Self::Error> {
        validate_customer(params.customer_id.as_str())?;
        if params.items.is_empty() {
            return Err(OrderError::validation("an order needs at least one item"));
        }
        for item in &params.items {
            if item.menu_item_id.trim().is_empty() {
                return Err(OrderError::validation("menuItemId is required"));
            }
            if item.quantity == 0 {
                return Err(OrderError::validation(format!(
                    "quantity for {} must be at least 1",
                    item.menu_item_id
                )));
            }
            if !item.price.is_finite() || item.price < 0.0 {
                return Err(OrderError::validation(format!(
                    "price for {} must be a non-negative number",
                    item.menu_item_id
                )));
            }
        }

        let total_amount = params.items.iter().map(|i| i.subtotal()).sum();
        Ok(Self {
            id,
            customer_id: params.customer_id,
            items: params.items,
            total_amount,
            status: OrderStatus::Pending,
            payment_status: false,
            completed_at: None,
            created_at: Utc::now(),
        })
    }

    fn matches(&self, filter: &OrderFilter) -> bool {
        filter.matches(self)
    }

    async fn on_update(&mut self, update: OrderUpdate, _ctx: &()) -> Result<(), Self::Error> {
        if self.guard() != update.expected {
            return Err(OrderError::PreconditionFailed {
                status: self.status,
                requested: update.change,
                reason: "order changed since it was read".into(),
            });
        }
        self.status = update.status;
        self.payment_status = update.payment_status;
        // completedAt is write-once.
        if self.completed_at.is_none() {
            self.completed_at = update.completed_at;
        }
        Ok(())
    }

    async fn handle_action(
        &mut self,
        action: std::convert::Infallible,
        _ctx: &(),
    ) -> Result<(), Self::Error> {
        match action {}
    }
}

/// The customer id becomes a topic level, so it may not contain separators or wildcards.
fn validate_customer(customer_id: &str) -> Result<(), OrderError> {
    if customer_id.trim().is_empty() {
        return Err(OrderError::validation("customerId is required"));
    }
    if customer_id.contains(['/', '+', '#']) {
        return Err(OrderError::validation(
            "customerId may not contain '/', '+' or '#'",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CustomerId, LineItem, OrderChange};

    fn create(items: Vec<LineItem>) -> Result<Order, OrderError> {
        Order::from_create_params(
            OrderId::new(),
            OrderCreate {
                customer_id: CustomerId::from("c-1"),
                items,
            },
        )
    }

    #[test]
    fn total_is_frozen_from_line_items() {
        let order = create(vec![LineItem::new("A", 2, 50.0), LineItem::new("B", 1, 30.0)]).unwrap();
        assert_eq!(order.total_amount, 130.0);
        assert_eq!(order.status, OrderStatus::Pending);
        assert!(!order.payment_status);
    }

    #[test]
    fn checkout_payload_is_validated() {
        assert!(matches!(create(vec![]), Err(OrderError::ValidationFailed { .. })));
        assert!(matches!(
            create(vec![LineItem::new("A", 0, 5.0)]),
            Err(OrderError::ValidationFailed { .. })
        ));
        assert!(matches!(
            create(vec![LineItem::new("", 1, 5.0)]),
            Err(OrderError::ValidationFailed { .. })
        ));
        assert!(matches!(
            create(vec![LineItem::new("A", 1, f64::NAN)]),
            Err(OrderError::ValidationFailed { .. })
        ));

        let bad_customer = Order::from_create_params(
            OrderId::new(),
            OrderCreate {
                customer_id: CustomerId::from("a/b"),
                items: vec![LineItem::new("A", 1, 5.0)],
            },
        );
        assert!(matches!(bad_customer, Err(OrderError::ValidationFailed { .. })));
    }

    #[tokio::test]
    async fn stale_guard_is_rejected() {
        let mut order = create(vec![LineItem::new("A", 1, 5.0)]).unwrap();
        let mut stale = order.guard();
        stale.status = OrderStatus::Preparing;

        let update = OrderUpdate {
            expected: stale,
            change: OrderChange::Status(OrderStatus::Ready),
            status: OrderStatus::Ready,
            payment_status: false,
            completed_at: None,
        };
        let err = order.on_update(update, &()).await.unwrap_err();
        assert!(matches!(err, OrderError::PreconditionFailed { status: OrderStatus::Pending, .. }));
        assert_eq!(order.status, OrderStatus::Pending);
    }

    #[tokio::test]
    async fn completed_at_is_never_overwritten() {
        let mut order = create(vec![LineItem::new("A", 1, 5.0)]).unwrap();
        let first = Utc::now();
        order.completed_at = Some(first);

        let update = OrderUpdate {
            expected: order.guard(),
            change: OrderChange::MarkPrepared,
            status: order.status,
            payment_status: order.payment_status,
            completed_at: Some(first + chrono::Duration::seconds(5)),
        };
        order.on_update(update, &()).await.unwrap();
        assert_eq!(order.completed_at, Some(first));
    }
}
