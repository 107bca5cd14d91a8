//! # Canteen Actor
//!
//! A small resource-actor runtime used as the in-process record store of the canteen
//! order core. Each record type (orders, notifications) is owned by one
//! [`ResourceActor`] running on its own Tokio task; callers talk to it through a
//! cloneable [`ResourceClient`].
//!
//! ## Why actors for the store
//!
//! The order core needs one property from its store above all others: two transition
//! requests against the same order must be serialized, and the loser must see the
//! winner's write. An actor processes its mailbox strictly in order and owns its
//! `HashMap` outright, so a compare-then-write performed inside
//! [`ActorEntity::on_update`] is atomic with respect to every other request. No locks
//! are involved.
//!
//! ## Layers
//!
//! 1. **Record layer** ([`ActorEntity`]) - validation, updates and actions for one record type.
//! 2. **Runtime layer** ([`ResourceActor`]) - the sequential message loop.
//! 3. **Interface layer** ([`ResourceClient`], [`ActorClient`]) - typed request/response.
//!
//! ## Concurrency Model
//!
//! - Each actor runs in its own Tokio task and handles one request at a time.
//! - Updates and actions run against a copy that replaces the stored record only on success.
//! - Dropping every client closes the channel and ends the actor loop.
//!
//! ## Testing
//!
//! [`mock::MockClient`] answers requests from a queue of expectations, which makes it
//! easy to inject store failures into code that sits on top of a client.

pub mod actor;
pub mod client;
pub mod client_trait;
pub mod entity;
pub mod error;
pub mod message;
pub mod mock;

pub use actor::ResourceActor;
pub use client::ResourceClient;
pub use client_trait::ActorClient;
pub use entity::ActorEntity;
pub use error::FrameworkError;
pub use message::{ResourceRequest, Response};
