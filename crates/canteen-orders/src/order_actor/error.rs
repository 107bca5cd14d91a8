//! Error types for order operations.

use crate::model::{OrderChange, OrderStatus};
use canteen_actor::FrameworkError;
use thiserror::Error;

/// Errors that can occur during order operations.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum OrderError {
    /// Malformed input or a missing required field.
    #[error("Validation failed: {reason}")]
    ValidationFailed { reason: String },

    /// The requested edge does not exist in the lifecycle.
    #[error("Illegal transition: {requested} from {from}")]
    IllegalTransition {
        from: OrderStatus,
        requested: OrderChange,
    },

    /// The edge exists but a guard does not hold, or a concurrent write got there first.
    #[error("Precondition failed: {requested} while {status}: {reason}")]
    PreconditionFailed {
        status: OrderStatus,
        requested: OrderChange,
        reason: String,
    },

    #[error("Not found: {0}")]
    NotFound(String),

    /// Broker unreachable or publish rejected.
    #[error("Transport failure: {0}")]
    TransportFailure(String),

    /// The store could not complete the operation; nothing was written.
    #[error("Store failure: {0}")]
    StoreFailure(String),
}

impl OrderError {
    pub fn validation(reason: impl Into<String>) -> Self {
        OrderError::ValidationFailed {
            reason: reason.into(),
        }
    }
}

impl From<FrameworkError> for OrderError {
    fn from(e: FrameworkError) -> Self {
        match e.downcast_entity::<OrderError>() {
            Ok(entity) => entity,
            Err(FrameworkError::NotFound(id)) => OrderError::NotFound(id),
            Err(other) => OrderError::StoreFailure(other.to_string()),
        }
    }
}
