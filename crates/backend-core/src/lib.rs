//! # Backend Core
//!
//! Building blocks for in-process simulations of cloud service APIs. A *backend* is the
//! in-memory state of one service for one (account, region) pair; client code calls its
//! methods directly instead of talking to live infrastructure.
//!
//! ## Architecture Overview
//!
//! The crate separates concerns into three layers:
//!
//! 1. **Entity Layer** ([`BackendEntity`]) - one simulated resource, its defaults and its
//!    lifecycle hooks
//! 2. **Store Layer** ([`ResourceStore`]) - the id → entity map with uniform create, get,
//!    update, delete and logging
//! 3. **Registry Layer** ([`BackendRegistry`]) - lazily built backends keyed by account and
//!    region, with reset
//!
//! Around them sit the shared concerns every service needs: the error taxonomy
//! ([`ErrorKind`], [`ProviderError`]), tag limits ([`TagPolicy`]), resumable listings
//! ([`paginate`]), ids and ARNs ([`ids`]), timestamps ([`time`]), run configuration
//! ([`MockConfig`]) and log setup ([`tracing`]).
//!
//! ## Defining an Entity
//!
//! ```rust
//! use backend_core::{BackendEntity, ResourceStore};
//!
//! #[derive(Clone, Debug)]
//! struct Queue {
//!     name: String,
//!     delay: u32,
//! }
//!
//! #[derive(Debug)]
//! struct QueueCreate {
//!     delay: Option<u32>,
//! }
//!
//! #[derive(Debug, thiserror::Error)]
//! enum QueueError {
//!     #[error("Queue {0} does not exist")]
//!     NotFound(String),
//!     #[error("Queue {0} already exists")]
//!     AlreadyExists(String),
//! }
//!
//! impl BackendEntity for Queue {
//!     type Id = String;
//!     type Create = QueueCreate;
//!     type Update = u32;
//!     type Context = ();
//!     type Error = QueueError;
//!     const KIND: &'static str = "Queue";
//!
//!     fn id(&self) -> &String { &self.name }
//!
//!     fn from_create_params(id: String, params: QueueCreate, _: &()) -> Result<Self, QueueError> {
//!         Ok(Self { name: id, delay: params.delay.unwrap_or(0) })
//!     }
//!
//!     fn on_update(&mut self, delay: u32, _: &()) -> Result<(), QueueError> {
//!         self.delay = delay;
//!         Ok(())
//!     }
//!
//!     fn not_found(id: &String, _: &()) -> QueueError { QueueError::NotFound(id.clone()) }
//!     fn already_exists(id: &String, _: &()) -> QueueError { QueueError::AlreadyExists(id.clone()) }
//! }
//!
//! let mut queues = ResourceStore::<Queue>::new(());
//! queues.create("jobs".into(), QueueCreate { delay: None }).unwrap();
//! assert_eq!(queues.get(&"jobs".to_string()).unwrap().delay, 0);
//! assert!(queues.create("jobs".into(), QueueCreate { delay: Some(5) }).is_err());
//! ```
//!
//! ## Context Injection
//!
//! A store owns a `Context` value (usually the backend's [`Scope`]) and passes it to every
//! hook, so an entity can mention its account in an error message or build its own ARN
//! without holding a reference back to the backend. Cross-service collaborators (an IAM
//! backend for role lookups, an SNS backend for notifications) are passed into the backend
//! method that needs them, by the caller that owns both.
//!
//! ## Concurrency Model
//!
//! Every operation runs to completion on the caller's thread. Stores are mutated through
//! `&mut`, so there are no locks and no background tasks.

pub mod config;
pub mod entity;
pub mod error;
pub mod ids;
pub mod pagination;
pub mod registry;
pub mod store;
pub mod tags;
pub mod time;
pub mod tracing;

// Re-export core types for convenience
pub use config::{ConfigError, MockConfig};
pub use entity::BackendEntity;
pub use error::{ErrorDetails, ErrorKind, ProviderError};
pub use pagination::{paginate, Page, PageLimits, PageRequest, PaginationError};
pub use registry::{Backend, BackendRegistry, Scope, GLOBAL_REGION};
pub use store::ResourceStore;
pub use tags::{Tag, TagMap, TagPolicy, TagViolation};
