//! # Notification Actor
//!
//! Owns the notification inbox. Records are created by the dispatcher, flipped to read
//! by their owner through [`NotificationAction::MarkRead`](crate::model::NotificationAction),
//! and deleted explicitly or when their order is deleted.

pub mod entity;

use crate::clients::NotificationClient;
use crate::model::{Notification, NotificationId};
use canteen_actor::ResourceActor;

/// Creates a new Notification actor and its client.
pub fn new(buffer: usize) -> (ResourceActor<Notification>, NotificationClient) {
    let (actor, generic_client) = ResourceActor::new(buffer, NotificationId::new);
    (actor, NotificationClient::new(generic_client))
}
