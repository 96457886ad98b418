//! # BackendEntity Trait
//!
//! The `BackendEntity` trait defines the contract that every simulated resource (pipeline,
//! network ACL, configuration set, bucket, ...) implements to be held by a generic
//! [`ResourceStore`](crate::ResourceStore). It specifies associated types for ids, creation and
//! update payloads, the scope context and the service error, and provides lifecycle hooks
//! (`from_create_params`, `on_update`, `on_delete`).
//!
//! # Architecture Note
//! Every service backend repeats the same CRUD moves over a map of resources. By defining a
//! contract all resource types satisfy, the store logic (existence checks, insertion, logging)
//! is written *once* and reused by every service.
//!
//! Associated types keep payloads apart: a `NetworkAcl` store only accepts a
//! `NetworkAclCreate`, and a pipeline update only accepts a `PipelineDeclaration`.
//!
//! # Provided Methods (Hooks)
//! - [`BackendEntity::on_delete`]
//!
//! The default implementation does nothing (`Ok(())`).

use std::fmt::{Debug, Display};

/// Trait that any resource entity must implement to be managed by a `ResourceStore`.
///
/// # Context
/// The `Context` type is owned by the store and handed to every hook. Services use it to
/// carry the account and region the resource lives in, so hooks can build ARNs and error
/// messages that mention the owning account.
pub trait BackendEntity: Clone + Debug {
    /// Unique identifier for this entity (a name or a provider-style id).
    ///
    /// `Ord` is required because listings must come back in a deterministic order.
    type Id: Ord + Clone + Display + Debug;

    /// The data required to create a new instance.
    type Create: Debug;

    /// The data required to update an existing instance.
    type Update: Debug;

    /// The runtime context (account, region, ...) injected into every hook.
    type Context: Debug;

    /// The error type of the owning service.
    ///
    /// One enum per service rather than per operation; every store operation on any entity
    /// of that service fails with the same type.
    type Error: std::error::Error;

    /// Short resource name used in log records (`"Pipeline"`, `"NetworkAcl"`).
    const KIND: &'static str;

    /// Returns the id this entity is stored under.
    fn id(&self) -> &Self::Id;

    /// Construct the full entity from the id and payload, applying default values.
    fn from_create_params(
        id: Self::Id,
        params: Self::Create,
        ctx: &Self::Context,
    ) -> Result<Self, Self::Error>;

    /// Apply an update in place.
    fn on_update(&mut self, update: Self::Update, ctx: &Self::Context) -> Result<(), Self::Error>;

    /// Called immediately before the entity is removed from the store.
    /// Returning an error vetoes the removal.
    fn on_delete(&self, _ctx: &Self::Context) -> Result<(), Self::Error> {
        Ok(())
    }

    /// Error reported when `id` is absent.
    fn not_found(id: &Self::Id, ctx: &Self::Context) -> Self::Error;

    /// Error reported when `id` is already taken on create.
    fn already_exists(id: &Self::Id, ctx: &Self::Context) -> Self::Error;
}
