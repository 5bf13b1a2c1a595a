//! Convenience re-exports for the common txweave surface.
//!
//! ```ignore
//! use txweave::prelude::*;
//! ```

pub use crate::{
    AdapterError, AdapterResult, BeginOutcome, ConnectionHolder, Coordinator, CoordinatorOptions,
    DataAccessError, Error, IsolationLevel, ResourceAdapter, ResourceKey, ResourceRegistry, Result,
    Savepoint, SavepointBackend, SessionFactory, SessionHolder, SuspendedResources,
    TransactionDefinition, TransactionObject,
};
