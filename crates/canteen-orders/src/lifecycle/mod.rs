//! # System Lifecycle
//!
//! Starting, wiring and stopping the order core.
//!
//! ## Startup order
//!
//! 1. Create the order and notification actors and spawn their run loops.
//! 2. Start the [`PubSubGateway`](crate::gateway::PubSubGateway): it owns the single
//!    broker connection for the whole process.
//! 3. Build the store, dispatcher and service on top and hand out the service.
//!
//! ## Shutdown
//!
//! [`CanteenSystem::shutdown`] stops the gateway first so nothing is published against
//! a closing store, then drops every client. Each actor sees its channel close, logs
//! its final size and exits; shutdown waits for all of them.
//!
//! Clones of the service that outlive the system keep the actors alive, so drop them
//! before calling `shutdown`.
//!
//! ## Observability
//!
//! [`setup_tracing`] installs the `tracing` subscriber once per process:
//!
//! ```bash
//! RUST_LOG=info cargo run --bin canteen-demo     # state changes and lifecycle
//! RUST_LOG=debug cargo run --bin canteen-demo    # payloads and every actor request
//! ```

pub mod canteen_system;
pub mod tracing;

pub use self::canteen_system::*;
pub use self::tracing::setup_tracing;
