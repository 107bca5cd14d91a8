//! # Canteen Orders
//!
//! Order lifecycle and live notification core of the canteen ordering system.
//!
//! ## Modules
//!
//! - [`model`]: orders, notifications and wire events.
//! - [`state_machine`]: pure transition rules and the events each transition raises.
//! - [`topics`]: the topic hierarchy events are published on.
//! - [`dispatcher`]: persists notifications and publishes events after a transition.
//! - [`gateway`]: the single broker connection, with wildcard subscriptions and reconnect.
//! - [`view`]: client-side caches that merge fetched baselines with pushed events.
//! - [`service`]: the operation surface callers use.
//! - [`store`], [`order_actor`], [`notification_actor`], [`clients`]: the in-process
//!   system of record, built on [`canteen_actor`].
//! - [`config`], [`lifecycle`]: settings, startup, shutdown and tracing.

pub mod clients;
pub mod config;
pub mod dispatcher;
pub mod gateway;
pub mod lifecycle;
pub mod model;
pub mod notification_actor;
pub mod order_actor;
pub mod service;
pub mod state_machine;
pub mod store;
pub mod topics;
pub mod view;

pub use order_actor::OrderError;
