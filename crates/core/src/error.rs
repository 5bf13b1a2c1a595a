//! Error types for transaction coordination.
//!
//! Two layers are defined here:
//!
//! - [`AdapterError`] / [`DataAccessError`]: what a resource adapter reports
//!   when a native call fails, and the categorized form an adapter may
//!   translate a failure into.
//! - [`Error`]: the coordinator's taxonomy, surfaced to the transaction
//!   template. Every lifecycle hook reports through this type.

use thiserror::Error;

/// Result type for coordinator operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Result type for resource adapter operations.
pub type AdapterResult<T> = std::result::Result<T, AdapterError>;

/// All coordinator errors.
///
/// This is the canonical error type for lifecycle hooks. The taxonomy is
/// closed: callers branch on the variant to decide whether a failure is
/// retryable, a programming error, or a potentially inconsistent outcome.
#[derive(Debug, Error)]
pub enum Error {
    /// Resource acquisition or native begin failed before any commitment
    /// was made. Safe to retry at a higher level.
    #[error("cannot create transaction ({context})")]
    CannotCreate {
        /// What the coordinator was doing when the failure occurred
        context: String,
        /// The underlying adapter failure
        #[source]
        source: AdapterError,
    },

    /// A structural precondition was violated (double-bind, unbind of an
    /// absent key, a foreign unsynchronized holder found bound). Indicates
    /// a programming or configuration error, not a runtime condition.
    #[error("illegal transaction state: {0}")]
    IllegalState(String),

    /// Commit, rollback, or cleanup of an already-active transaction
    /// failed. Resource state is potentially inconsistent and must be
    /// surfaced, never silently retried.
    #[error("transaction system failure while {context}")]
    System {
        /// What the coordinator was doing when the failure occurred
        context: String,
        /// The underlying adapter failure
        #[source]
        source: AdapterError,
    },

    /// Savepoint capability was requested but is unavailable or disabled.
    #[error("nested transaction not supported: {0}")]
    NestedNotSupported(String),

    /// Categorized data-access failure produced by the adapter's
    /// `translate` contract. Preferred over [`Error::System`] whenever the
    /// adapter recognizes the cause.
    #[error(transparent)]
    DataAccess(#[from] DataAccessError),

    /// Commit was requested but the transaction had been marked
    /// rollback-only; the coordinator rolled back instead.
    #[error("transaction was marked rollback-only and has been rolled back")]
    UnexpectedRollback,
}

impl Error {
    /// Check if this error is retryable.
    ///
    /// Retryable errors occurred before any commitment was made; a fresh
    /// attempt may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::CannotCreate { .. })
    }

    /// Check if this is a structural precondition violation.
    pub fn is_illegal_state(&self) -> bool {
        matches!(self, Error::IllegalState(_))
    }

    /// Check if this is a serious failure of an active transaction.
    ///
    /// After a system failure the caller must treat the outcome as unknown.
    pub fn is_system(&self) -> bool {
        matches!(self, Error::System { .. })
    }

    /// Check if this is a categorized data-access error.
    pub fn is_data_access(&self) -> bool {
        matches!(self, Error::DataAccess(_))
    }
}

/// Classification of an adapter failure.
///
/// The kind lets the coordinator classify a failed native call without
/// inspecting cause chains: a `RolledBack` commit failure is reported
/// differently from a plain runtime failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdapterErrorKind {
    /// Acquisition of a resource handle failed
    Resource,
    /// The native transaction was rolled back by a participant
    RolledBack,
    /// Any other runtime failure in the underlying resource
    Runtime,
}

/// A failure reported by a resource adapter or factory.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct AdapterError {
    kind: AdapterErrorKind,
    message: String,
}

impl AdapterError {
    /// A resource-acquisition failure.
    pub fn resource(message: impl Into<String>) -> Self {
        AdapterError {
            kind: AdapterErrorKind::Resource,
            message: message.into(),
        }
    }

    /// A commit failure caused by a participant having rolled back.
    pub fn rolled_back(message: impl Into<String>) -> Self {
        AdapterError {
            kind: AdapterErrorKind::RolledBack,
            message: message.into(),
        }
    }

    /// A general runtime failure.
    pub fn runtime(message: impl Into<String>) -> Self {
        AdapterError {
            kind: AdapterErrorKind::Runtime,
            message: message.into(),
        }
    }

    /// The failure classification.
    pub fn kind(&self) -> AdapterErrorKind {
        self.kind
    }

    /// Check if this failure signals a participant rollback.
    pub fn is_rolled_back(&self) -> bool {
        self.kind == AdapterErrorKind::RolledBack
    }

    /// The failure message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Categorized data-access errors.
///
/// Produced by an adapter's `translate` contract when it recognizes a
/// resource failure as a concrete data problem. The coordinator prefers
/// these over the generic [`Error::System`].
#[derive(Debug, Error)]
pub enum DataAccessError {
    /// A constraint was violated by the attempted change
    #[error("constraint violation: {0}")]
    ConstraintViolation(String),

    /// A unique key already exists
    #[error("duplicate key: {0}")]
    DuplicateKey(String),

    /// The underlying query or operation timed out
    #[error("query timeout: {0}")]
    QueryTimeout(String),

    /// A deadlock was detected by the resource
    #[error("deadlock detected: {0}")]
    Deadlock(String),
}
