//! Resource lifecycle coordination for txweave
//!
//! This crate implements the transaction resource coordinator:
//! - ResourceRegistry: context-scoped bindings from factory key to holder
//! - SessionHolder / ConnectionHolder: acquired handles plus bookkeeping
//! - ResourceAdapter: pluggable strategy for the underlying resource
//! - Coordinator: the lifecycle hook set consumed by a transaction template
//!   (get/begin/suspend/resume/commit/rollback/mark-rollback-only/cleanup)
//! - Savepoint operations for nested transactions

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod adapter;
pub mod coordinator;
pub mod holder;
pub mod registry;
pub mod transaction;

pub use adapter::{BeginOutcome, ResourceAdapter, Savepoint, SavepointBackend, SessionFactory};
pub use coordinator::{Coordinator, CoordinatorOptions};
pub use holder::{ConnectionHolder, SessionHolder};
pub use registry::ResourceRegistry;
pub use transaction::{SuspendedResources, TransactionObject};

// Re-export the shared vocabulary from core for convenience
pub use txweave_core::{
    AdapterError, AdapterResult, DataAccessError, Error, IsolationLevel, ResourceKey, Result,
    TransactionDefinition,
};
