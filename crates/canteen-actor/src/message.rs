//! # Generic Messages
//!
//! Request envelopes passed from a `ResourceClient` to its `ResourceActor`. Every
//! variant carries a oneshot `respond_to` sender; the actor answers exactly once.

use crate::entity::ActorEntity;
use crate::error::FrameworkError;
use tokio::sync::oneshot;

/// Type alias for the one-shot response channel used by actors.
pub type Response<T> = oneshot::Sender<Result<T, FrameworkError>>;

/// Request sent to a `ResourceActor`.
///
/// The variants are the record lifecycle (create, get, update, delete), a filtered
/// `List` read and a record-specific `Action`. All of them are typed through the
/// associated types of [`ActorEntity`], so an order payload can never reach the
/// notification actor.
#[derive(Debug)]
pub enum ResourceRequest<T: ActorEntity> {
    Create {
        params: T::Create,
        respond_to: Response<T>,
    },
    Get {
        id: T::Id,
        respond_to: Response<Option<T>>,
    },
    List {
        filter: T::Filter,
        respond_to: Response<Vec<T>>,
    },
    Update {
        id: T::Id,
        update: T::Update,
        respond_to: Response<T>,
    },
    Delete {
        id: T::Id,
        respond_to: Response<T>,
    },
    Action {
        id: T::Id,
        action: T::Action,
        respond_to: Response<T::ActionResult>,
    },
}
