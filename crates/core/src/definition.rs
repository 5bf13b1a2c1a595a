//! Per-transaction settings.
//!
//! A [`TransactionDefinition`] is supplied by the caller for each unit of
//! work. The coordinator interprets `timeout` and `read_only` itself and
//! passes the whole definition to the adapter's begin step, which may honor
//! `isolation` as the underlying resource allows.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Isolation level requested for a transaction.
///
/// `Default` defers to whatever the underlying resource is configured
/// with; the other levels map onto the usual ANSI levels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum IsolationLevel {
    /// Use the resource's configured default
    #[default]
    Default,
    /// Dirty reads permitted
    ReadUncommitted,
    /// Only committed data is visible
    ReadCommitted,
    /// Repeated reads within the transaction are stable
    RepeatableRead,
    /// Full serializable isolation
    Serializable,
}

/// Settings for one unit of work.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use txweave_core::TransactionDefinition;
///
/// let def = TransactionDefinition::new()
///     .named("order-import")
///     .read_only(false)
///     .timeout(Duration::from_secs(30));
/// assert_eq!(def.timeout, Some(Duration::from_secs(30)));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionDefinition {
    /// Optional diagnostic name, carried into log output
    pub name: Option<String>,
    /// Whether the unit of work only reads
    pub read_only: bool,
    /// Optional timeout applied to the resource holder's deadline
    pub timeout: Option<Duration>,
    /// Requested isolation level
    pub isolation: IsolationLevel,
}

impl TransactionDefinition {
    /// Create a definition with default settings: read-write, no timeout,
    /// default isolation.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a diagnostic name.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Mark the unit of work read-only (or not).
    pub fn read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }

    /// Set the transaction timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the requested isolation level.
    pub fn isolation(mut self, isolation: IsolationLevel) -> Self {
        self.isolation = isolation;
        self
    }
}
