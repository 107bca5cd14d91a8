//! # Order State Machine
//!
//! Pure transition logic: given an order snapshot and one requested change, produce
//! the next snapshot and the events it raises, or say why the change is refused.
//! Nothing here touches the store or the clock; `now` is passed in.
//!
//! ```text
//! PENDING ──accept──▶ PREPARING ──ready──▶ READY ──pickup──▶ COMPLETED
//!    │                    │
//!    └──────cancel────────┴──────▶ CANCELLED
//! ```
//!
//! ## Guards
//!
//! - Terminal orders (`COMPLETED`, `CANCELLED`) refuse every change: `IllegalTransition`.
//! - Asking for the status the order already has is `PreconditionFailed`. This is what
//!   the loser of an accept race sees when it reads the winner's write.
//! - `READY` needs `PREPARING`, `paymentStatus` and [`Order::is_prepared`] (or the
//!   fused [`OrderChange::MarkPreparedAndReady`], which sets `completedAt` itself).
//!   Any failed part of that guard is `PreconditionFailed`.
//! - Confirming payment is legal in every non-terminal state and never moves `status`.
//!   Confirming it twice is a no-op that raises nothing.
//! - `MarkPrepared` sets `completedAt` on a `PREPARING` order. Once set it is a no-op.

use crate::model::{EventKind, Order, OrderChange, OrderGuard, OrderStatus};
use crate::order_actor::OrderError;
use chrono::{DateTime, Utc};

/// Result of a legal change.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    /// The next snapshot, with only the changed fields applied.
    pub order: Order,
    /// The facts the change was validated against; the store write is conditional on them.
    pub guard: OrderGuard,
    /// Events to dispatch, in order. Empty for no-op changes.
    pub events: Vec<EventKind>,
}

impl Transition {
    /// True when nothing needs to be written.
    pub fn is_noop(&self) -> bool {
        self.events.is_empty() && self.order.guard() == self.guard
    }
}

pub fn request_transition(
    order: &Order,
    change: OrderChange,
    now: DateTime<Utc>,
) -> Result<Transition, OrderError> {
    let from = order.status;
    if from.is_terminal() {
        return Err(OrderError::IllegalTransition {
            from,
            requested: change,
        });
    }

    let precondition = |reason: &str| OrderError::PreconditionFailed {
        status: from,
        requested: change,
        reason: reason.to_string(),
    };
    let illegal = || OrderError::IllegalTransition {
        from,
        requested: change,
    };

    let mut next = order.clone();
    let mut events = Vec::new();

    match change {
        OrderChange::ConfirmPayment => {
            if !order.payment_status {
                next.payment_status = true;
                events.push(EventKind::Paid);
            }
        }
        OrderChange::MarkPrepared => {
            if from != OrderStatus::Preparing {
                return Err(illegal());
            }
            if next.completed_at.is_none() {
                next.completed_at = Some(now);
            }
        }
        OrderChange::MarkPreparedAndReady => {
            check_ready(order, true).map_err(|reason| precondition(reason))?;
            next.completed_at.get_or_insert(now);
            next.status = OrderStatus::Ready;
            events.push(EventKind::Ready);
        }
        OrderChange::Status(to) if to == from => {
            return Err(precondition("order already has this status"));
        }
        OrderChange::Status(to) => match (from, to) {
            (OrderStatus::Pending, OrderStatus::Preparing) => {
                next.status = to;
                events.push(EventKind::Accepted);
            }
            (_, OrderStatus::Ready) => {
                check_ready(order, false).map_err(|reason| precondition(reason))?;
                next.status = to;
                events.push(EventKind::Ready);
            }
            (OrderStatus::Ready, OrderStatus::Completed) => {
                next.completed_at.get_or_insert(now);
                next.status = to;
                events.push(EventKind::Completed);
            }
            (OrderStatus::Pending | OrderStatus::Preparing, OrderStatus::Cancelled) => {
                next.status = to;
                events.push(EventKind::Cancelled);
            }
            _ => return Err(illegal()),
        },
    }

    Ok(Transition {
        order: next,
        guard: order.guard(),
        events,
    })
}

/// READY guard. `sets_completion` is true when the same request stamps `completedAt`.
fn check_ready(order: &Order, sets_completion: bool) -> Result<(), &'static str> {
    if order.status != OrderStatus::Preparing {
        return Err("only a PREPARING order can become READY");
    }
    if !order.payment_status {
        return Err("payment has not been confirmed");
    }
    if !order.is_prepared() && !sets_completion {
        return Err("the kitchen has not marked the order prepared");
    }
    Ok(())
}
