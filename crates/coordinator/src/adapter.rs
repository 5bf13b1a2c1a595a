//! Pluggable resource strategy consumed by the coordinator.
//!
//! A [`ResourceAdapter`] knows one resource technology: how to begin a
//! native transaction on a session, derive a raw connection sharing the
//! same physical connection, release that connection, and translate
//! resource failures into categorized errors. The coordinator never touches
//! a session or connection except through this trait, so the lifecycle
//! logic stays independent of any particular driver.
//!
//! Savepoint support is modeled as an optional capability returned from the
//! begin step rather than probed by downcasting: an adapter that supports
//! nesting puts a [`SavepointBackend`] into its [`BeginOutcome`].

use txweave_core::{AdapterError, AdapterResult, DataAccessError, ResourceKey, TransactionDefinition};

/// Factory for primary resource handles.
///
/// The factory itself must be safe for concurrent acquisition; the
/// coordinator only requires that `resource_key` is stable, since that key
/// identifies the factory's binding in every [`crate::ResourceRegistry`].
pub trait SessionFactory {
    /// The primary resource handle this factory produces.
    type Session: 'static;

    /// Acquire a new session.
    fn open_session(&self) -> AdapterResult<Self::Session>;

    /// The registry key under which sessions from this factory are bound.
    fn resource_key(&self) -> ResourceKey;
}

/// Opaque token identifying a savepoint within a native transaction.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Savepoint {
    name: String,
}

impl Savepoint {
    /// Create a token with the given name.
    pub fn named(name: impl Into<String>) -> Self {
        Savepoint { name: name.into() }
    }

    /// The savepoint name.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl std::fmt::Display for Savepoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Savepoint capability for nested transactions.
///
/// Returned (optionally) by [`ResourceAdapter::begin_transaction`] and
/// attached to the session holder for the lifetime of that native
/// transaction.
pub trait SavepointBackend {
    /// The session type savepoints operate on.
    type Session;

    /// Create a savepoint at the current point of the native transaction.
    fn create_savepoint(&mut self, session: &Self::Session) -> AdapterResult<Savepoint>;

    /// Roll the native transaction back to a previously created savepoint.
    fn rollback_to_savepoint(
        &mut self,
        session: &Self::Session,
        savepoint: &Savepoint,
    ) -> AdapterResult<()>;

    /// Release a savepoint that is no longer needed.
    fn release_savepoint(
        &mut self,
        session: &Self::Session,
        savepoint: Savepoint,
    ) -> AdapterResult<()>;
}

/// Result of a successful native begin.
pub struct BeginOutcome<S, D> {
    /// Opaque per-transaction data, handed back to the adapter at commit,
    /// rollback, and cleanup.
    pub tx_data: D,
    /// Savepoint capability, present only when the resource supports
    /// nested transactions.
    pub savepoints: Option<Box<dyn SavepointBackend<Session = S>>>,
}

impl<S, D> BeginOutcome<S, D> {
    /// A begin outcome without savepoint capability.
    pub fn new(tx_data: D) -> Self {
        BeginOutcome {
            tx_data,
            savepoints: None,
        }
    }

    /// Attach a savepoint capability.
    pub fn with_savepoints(mut self, backend: Box<dyn SavepointBackend<Session = S>>) -> Self {
        self.savepoints = Some(backend);
        self
    }
}

/// Strategy for one resource technology.
///
/// Implemented per driver, out of the coordinator's scope. All methods take
/// the session by reference; ownership stays with the holder until
/// [`ResourceAdapter::close_session`] consumes it at cleanup.
pub trait ResourceAdapter {
    /// The primary resource handle (a persistence-session-like object).
    type Session: 'static;
    /// The secondary, lower-level handle derived from the session.
    type Connection: 'static;
    /// Opaque native transaction data returned by the begin step.
    type TxData;

    /// Begin a native transaction on the session.
    fn begin_transaction(
        &self,
        session: &Self::Session,
        definition: &TransactionDefinition,
    ) -> AdapterResult<BeginOutcome<Self::Session, Self::TxData>>;

    /// Whether the session currently has an active native transaction.
    fn is_transaction_active(&self, session: &Self::Session) -> bool;

    /// Commit the native transaction.
    fn commit_transaction(
        &self,
        session: &Self::Session,
        data: &mut Self::TxData,
    ) -> AdapterResult<()>;

    /// Roll back the native transaction.
    fn rollback_transaction(
        &self,
        session: &Self::Session,
        data: &mut Self::TxData,
    ) -> AdapterResult<()>;

    /// Derive a raw connection sharing the session's physical connection,
    /// or `None` if the resource refuses to expose one.
    fn derive_connection(
        &self,
        session: &Self::Session,
        read_only: bool,
    ) -> AdapterResult<Option<Self::Connection>>;

    /// Release a connection previously derived from the session.
    fn release_connection(
        &self,
        connection: Self::Connection,
        session: &Self::Session,
    ) -> AdapterResult<()>;

    /// Discard the session's buffered, uncommitted state.
    ///
    /// Called when an inner unit of work aborts on a session owned by an
    /// enclosing scope, so the abort cannot leak pending changes outward.
    fn clear_pending_state(&self, session: &Self::Session);

    /// Translate a resource failure into a categorized data-access error,
    /// or `None` if the failure is not recognized.
    fn translate(&self, error: &AdapterError) -> Option<DataAccessError>;

    /// Dispose of the per-transaction data after commit or rollback.
    fn cleanup_transaction_data(&self, data: Self::TxData);

    /// Close a session the coordinator created.
    fn close_session(&self, session: Self::Session);
}
