//! # Framework Errors
//!
//! Errors raised by the actor plumbing itself, plus the boxed record error that a hook
//! returned. Callers that know the record type recover the typed error with
//! [`FrameworkError::downcast_entity`].

/// Errors that can occur within the actor framework itself.
#[derive(Debug, thiserror::Error)]
pub enum FrameworkError {
    #[error("Actor closed")]
    ActorClosed,
    #[error("Actor dropped response channel")]
    ActorDropped,
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Entity error: {0}")]
    EntityError(Box<dyn std::error::Error + Send + Sync>),
}

impl FrameworkError {
    /// Recover the record's own error type from an `EntityError`.
    ///
    /// Returns `Err(self)` unchanged when this is a plumbing error or the boxed error
    /// has a different type.
    pub fn downcast_entity<E>(self) -> Result<E, Self>
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        match self {
            FrameworkError::EntityError(inner) => match inner.downcast::<E>() {
                Ok(typed) => Ok(*typed),
                Err(other) => Err(FrameworkError::EntityError(other)),
            },
            other => Err(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, thiserror::Error, PartialEq)]
    #[error("bad record")]
    struct BadRecord;

    #[derive(Debug, thiserror::Error)]
    #[error("other")]
    struct Other;

    #[test]
    fn downcast_recovers_typed_entity_error() {
        let err = FrameworkError::EntityError(Box::new(BadRecord));
        assert_eq!(err.downcast_entity::<BadRecord>().unwrap(), BadRecord);
    }

    #[test]
    fn downcast_keeps_mismatched_errors() {
        let err = FrameworkError::EntityError(Box::new(Other));
        let back = err.downcast_entity::<BadRecord>().unwrap_err();
        assert!(matches!(back, FrameworkError::EntityError(_)));

        let closed = FrameworkError::ActorClosed.downcast_entity::<BadRecord>();
        assert!(matches!(closed, Err(FrameworkError::ActorClosed)));
    }
}
