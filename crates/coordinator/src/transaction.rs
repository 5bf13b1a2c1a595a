//! Per-invocation transaction state.
//!
//! A [`TransactionObject`] is constructed once per `get_transaction` call
//! and discarded after cleanup. It snapshots which holders are in play for
//! one begin-to-finalize cycle; ongoing mutation (rollback-only flags,
//! deadlines) happens on the holders themselves, never on the snapshot.

use crate::holder::{ConnectionHolder, SessionHolder};
use txweave_core::ResourceKey;

/// Snapshot of the resources participating in one unit of work.
pub struct TransactionObject<D> {
    session_key: ResourceKey,
    connection_key: Option<ResourceKey>,
    new_session_holder: bool,
    connection_holder_bound: bool,
    tx_data: Option<D>,
}

impl<D> TransactionObject<D> {
    pub(crate) fn new(session_key: ResourceKey, connection_key: Option<ResourceKey>) -> Self {
        TransactionObject {
            session_key,
            connection_key,
            new_session_holder: false,
            connection_holder_bound: false,
            tx_data: None,
        }
    }

    /// Registry key of the primary session holder.
    pub fn session_key(&self) -> ResourceKey {
        self.session_key
    }

    /// Registry key configured for the secondary connection holder.
    pub fn connection_key(&self) -> Option<ResourceKey> {
        self.connection_key
    }

    /// Whether the coordinator created the session holder for this unit of
    /// work (as opposed to adopting one bound by an enclosing scope).
    pub fn is_new_session_holder(&self) -> bool {
        self.new_session_holder
    }

    /// Whether this unit of work bound a connection holder itself.
    ///
    /// A participant observing a connection holder bound by an enclosing
    /// scope reports `false`: releasing that holder belongs to the scope
    /// that bound it.
    pub fn has_connection_holder(&self) -> bool {
        self.connection_holder_bound
    }

    /// Whether this invocation began the native transaction itself.
    ///
    /// A participant in an outer transaction carries no transaction data
    /// and must not finalize the native transaction.
    pub fn has_transaction_data(&self) -> bool {
        self.tx_data.is_some()
    }

    pub(crate) fn set_new_session_holder(&mut self, new_session_holder: bool) {
        self.new_session_holder = new_session_holder;
    }

    pub(crate) fn set_connection_holder_bound(&mut self, bound: bool) {
        self.connection_holder_bound = bound;
    }

    pub(crate) fn set_transaction_data(&mut self, data: D) {
        self.tx_data = Some(data);
    }

    pub(crate) fn transaction_data_mut(&mut self) -> Option<&mut D> {
        self.tx_data.as_mut()
    }

    pub(crate) fn take_transaction_data(&mut self) -> Option<D> {
        self.tx_data.take()
    }

    pub(crate) fn clear_holder_references(&mut self) {
        self.new_session_holder = false;
        self.connection_holder_bound = false;
    }

    pub(crate) fn restore_holder_references(
        &mut self,
        new_session_holder: bool,
        connection_holder_bound: bool,
    ) {
        self.new_session_holder = new_session_holder;
        self.connection_holder_bound = connection_holder_bound;
    }
}

impl<D> std::fmt::Debug for TransactionObject<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionObject")
            .field("session_key", &self.session_key)
            .field("connection_key", &self.connection_key)
            .field("new_session_holder", &self.new_session_holder)
            .field("connection_holder_bound", &self.connection_holder_bound)
            .field("has_transaction_data", &self.tx_data.is_some())
            .finish()
    }
}

/// Holders taken out of the registry by `suspend`.
///
/// Opaque to the caller: the template passes the bundle back verbatim to
/// `resume`, which restores the exact bindings present before suspension.
pub struct SuspendedResources<S: 'static, C: 'static> {
    pub(crate) session_holder: Option<SessionHolder<S>>,
    pub(crate) connection_holder: Option<ConnectionHolder<C>>,
    pub(crate) session_key: ResourceKey,
    pub(crate) connection_key: Option<ResourceKey>,
    pub(crate) new_session_holder: bool,
    pub(crate) connection_holder_bound: bool,
}

impl<S, C> std::fmt::Debug for SuspendedResources<S, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SuspendedResources")
            .field("session_key", &self.session_key)
            .field("connection_key", &self.connection_key)
            .field("has_session_holder", &self.session_holder.is_some())
            .field("has_connection_holder", &self.connection_holder.is_some())
            .finish()
    }
}
