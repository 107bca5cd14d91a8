//! Typed wrappers around the generic `ResourceClient`s.
//!
//! Each wrapper maps [`FrameworkError`](canteen_actor::FrameworkError) into
//! [`OrderError`](crate::order_actor::OrderError) and gets `get`, `list` and `delete`
//! from [`ActorClient`](canteen_actor::ActorClient).

pub mod notification_client;
pub mod order_client;

pub use notification_client::NotificationClient;
pub use order_client::OrderClient;
