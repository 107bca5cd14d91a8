//! # ActorEntity Trait
//!
//! The contract every stored record (orders, notifications, ...) implements so that a
//! [`ResourceActor`](crate::ResourceActor) can own it. Associated types pin down the id,
//! the create/update payloads, custom actions, list filters, the injected context and
//! the error type, so a payload meant for one record type cannot reach another.
//!
//! # Provided Methods (Hooks)
//! - [`ActorEntity::matches`] defaults to "every record matches".
//! - [`ActorEntity::on_create`] and [`ActorEntity::on_delete`] default to `Ok(())`.

use async_trait::async_trait;
use std::fmt::{Debug, Display};
use std::hash::Hash;

/// Trait that any record type must implement to be managed by a `ResourceActor`.
///
/// # Async & Context
/// Hooks are `#[async_trait]` so they may call other actors. The `Context` is handed to
/// `run()` rather than `new()`, which lets actors be wired after they are constructed.
///
/// # Atomic updates
/// `on_update` runs against a *copy* of the stored record. The copy replaces the stored
/// value only when the hook returns `Ok`, so a hook may validate and mutate in any order
/// without leaving a half-applied record behind. This is what makes conditional writes
/// (compare the current state, then apply) safe to express inside the hook.
#[async_trait]
pub trait ActorEntity: Clone + Send + Sync + 'static {
    /// The unique identifier for this record.
    type Id: Eq + Hash + Clone + Send + Sync + Display + Debug;

    /// The data required to create a new instance.
    type Create: Send + Sync + Debug;

    /// The data required to update an existing instance.
    type Update: Send + Sync + Debug;

    /// Record-specific operations that are neither plain updates nor CRUD.
    type Action: Send + Sync + Debug;

    /// The result type returned by custom actions.
    type ActionResult: Send + Sync + Debug;

    /// Query predicate accepted by `List` requests.
    type Filter: Send + Sync + Debug;

    /// The runtime context (dependencies) injected into the actor.
    /// Use `()` if no dependencies are needed.
    type Context: Send + Sync;

    /// One error enum per record type; hooks and constructors share it.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Construct the full record from the generated id and the payload.
    /// Called synchronously before `on_create`; this is where input validation lives.
    fn from_create_params(id: Self::Id, params: Self::Create) -> Result<Self, Self::Error>;

    /// Whether this record belongs in the result of a `List` request.
    fn matches(&self, _filter: &Self::Filter) -> bool {
        true
    }

    // --- Lifecycle Hooks (Async) ---

    /// Called after the record is constructed and before it is stored.
    async fn on_create(&mut self, _ctx: &Self::Context) -> Result<(), Self::Error> {
        Ok(())
    }

    /// Apply an update to this (copied) record.
    async fn on_update(
        &mut self,
        update: Self::Update,
        _ctx: &Self::Context,
    ) -> Result<(), Self::Error>;

    /// Called immediately before the record is removed.
    async fn on_delete(&self, _ctx: &Self::Context) -> Result<(), Self::Error> {
        Ok(())
    }

    // --- Action Handler (Async) ---

    /// Handle a record-specific action.
    async fn handle_action(
        &mut self,
        action: Self::Action,
        _ctx: &Self::Context,
    ) -> Result<Self::ActionResult, Self::Error>;
}
