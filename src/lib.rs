//! # txweave
//!
//! Transaction resource coordination for session and connection data
//! access.
//!
//! txweave lets application code mix high-level persistence operations and
//! direct low-level data access within one logical transaction, without
//! either side being aware of the other's API. A [`Coordinator`] binds the
//! persistence session and an optional raw connection (sharing the same
//! physical connection) to the current execution context, drives the
//! native transaction through a pluggable [`ResourceAdapter`], and
//! guarantees exactly-once acquisition and release of both handles under
//! failure.
//!
//! ## Quick Start
//!
//! ```ignore
//! use txweave::prelude::*;
//!
//! // One registry per logical execution context.
//! let mut registry = ResourceRegistry::new();
//!
//! let coordinator = Coordinator::new(adapter, session_factory)
//!     .with_connection_key(ResourceKey::new());
//!
//! // The hook sequence an outer transaction template drives:
//! let mut tx = coordinator.get_transaction(&registry);
//! if !coordinator.is_existing_transaction(&registry, &tx) {
//!     coordinator.begin(&mut registry, &mut tx, &TransactionDefinition::new())?;
//! }
//!
//! // ... run the transactional body; raw code can discover the bound
//! // connection holder through the registry ...
//!
//! let outcome = coordinator.commit(&mut registry, &mut tx);
//! coordinator.cleanup(&mut registry, tx)?;
//! outcome?;
//! ```
//!
//! ## Pieces
//!
//! - [`ResourceRegistry`] - context-scoped bindings from factory key to
//!   resource holder; at most one binding per key
//! - [`SessionHolder`] / [`ConnectionHolder`] - acquired handles plus
//!   bookkeeping (ownership, rollback-only flag, deadline, savepoints)
//! - [`ResourceAdapter`] - per-technology strategy: begin, commit,
//!   rollback, connection derivation and release, error translation
//! - [`Coordinator`] - the lifecycle hook set
//! - Savepoints - nested transactions via the holder's optional capability

#![warn(missing_docs)]

pub mod prelude;

// Re-export the coordination layer
pub use txweave_coordinator::{
    BeginOutcome, ConnectionHolder, Coordinator, CoordinatorOptions, ResourceAdapter,
    ResourceRegistry, Savepoint, SavepointBackend, SessionFactory, SessionHolder,
    SuspendedResources, TransactionObject,
};

// Re-export the shared vocabulary
pub use txweave_core::{
    AdapterError, AdapterErrorKind, AdapterResult, DataAccessError, Error, IsolationLevel,
    ResourceKey, Result, TransactionDefinition,
};
