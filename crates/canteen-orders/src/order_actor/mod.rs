//! # Order Actor
//!
//! The in-process system of record for orders.
//!
//! ## Structure
//!
//! - [`entity`] - [`ActorEntity`](canteen_actor::ActorEntity) implementation for [`Order`]
//! - [`error`] - [`OrderError`], the error taxonomy shared by every order operation
//! - [`new()`] - Factory function that creates the actor and client
//!
//! Orders have no custom actions (`Action = Infallible`); every change goes through a
//! conditional [`OrderUpdate`](crate::model::OrderUpdate).

pub mod entity;
pub mod error;

pub use error::*;

use crate::clients::OrderClient;
use crate::model::{Order, OrderId};
use canteen_actor::ResourceActor;

/// Creates a new Order actor and its client.
pub fn new(buffer: usize) -> (ResourceActor<Order>, OrderClient) {
    let (actor, generic_client) = ResourceActor::new(buffer, OrderId::new);
    (actor, OrderClient::new(generic_client))
}
