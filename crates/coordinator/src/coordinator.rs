//! The resource lifecycle coordinator.
//!
//! The [`Coordinator`] implements the fixed hook contract an outer
//! transaction template drives, per unit of work and in order:
//!
//! ```text
//! get_transaction -> (begin | reuse existing) -> body
//!     -> (commit | rollback, possibly after mark_rollback_only)
//!     -> cleanup
//! ```
//!
//! `suspend`/`resume` bracket a nested unit of work that must run without
//! the outer resources bound. All hooks take the context's
//! [`ResourceRegistry`] explicitly; the coordinator itself holds no mutable
//! state and one instance may serve many contexts.
//!
//! Ordering guarantees kept by this module: the secondary connection is
//! derived only after the primary native transaction has begun, and it is
//! released after the primary transaction is finalized but before the
//! primary session is closed. A session the coordinator did not create is
//! never closed by it.

use crate::adapter::{BeginOutcome, ResourceAdapter, Savepoint, SessionFactory};
use crate::holder::{ConnectionHolder, SessionHolder};
use crate::registry::ResourceRegistry;
use crate::transaction::{SuspendedResources, TransactionObject};
use std::time::Duration;
use tracing::{debug, warn};
use txweave_core::{Error, ResourceKey, Result, TransactionDefinition};

/// Configuration for a coordinator instance.
#[derive(Debug, Clone)]
pub struct CoordinatorOptions {
    /// Whether savepoint-based nested transactions may be used.
    pub nested_transactions_allowed: bool,
    /// Timeout applied when a definition carries none.
    pub default_timeout: Option<Duration>,
}

impl Default for CoordinatorOptions {
    fn default() -> Self {
        CoordinatorOptions {
            nested_transactions_allowed: true,
            default_timeout: None,
        }
    }
}

/// Coordinates session and connection holders for one resource technology.
///
/// Generic over the adapter (the "dialect" of the underlying resource) and
/// the session factory. Configure a `connection_key` to expose a secondary
/// raw-connection view of the session's physical connection; without one,
/// only the primary holder is managed.
pub struct Coordinator<A, F>
where
    A: ResourceAdapter,
    F: SessionFactory<Session = A::Session>,
{
    adapter: A,
    session_factory: F,
    connection_key: Option<ResourceKey>,
    options: CoordinatorOptions,
}

impl<A, F> Coordinator<A, F>
where
    A: ResourceAdapter,
    F: SessionFactory<Session = A::Session>,
{
    /// Create a coordinator with default options and no secondary resource.
    pub fn new(adapter: A, session_factory: F) -> Self {
        Coordinator {
            adapter,
            session_factory,
            connection_key: None,
            options: CoordinatorOptions::default(),
        }
    }

    /// Configure the registry key under which the derived connection is
    /// bound, enabling the secondary resource view.
    pub fn with_connection_key(mut self, connection_key: ResourceKey) -> Self {
        self.connection_key = Some(connection_key);
        self
    }

    /// Replace the coordinator options.
    pub fn with_options(mut self, options: CoordinatorOptions) -> Self {
        self.options = options;
        self
    }

    /// The adapter this coordinator drives.
    pub fn adapter(&self) -> &A {
        &self.adapter
    }

    /// The configured connection key, if a secondary resource is enabled.
    pub fn connection_key(&self) -> Option<ResourceKey> {
        self.connection_key
    }

    /// Snapshot the holders currently in play for a new unit of work.
    ///
    /// Never fails: absent bindings are the normal "no existing
    /// transaction" outcome. Pre-bound holders are observed with
    /// `is_new = false` and nothing is begun.
    pub fn get_transaction(&self, registry: &ResourceRegistry) -> TransactionObject<A::TxData> {
        let session_key = self.session_factory.resource_key();
        debug!(
            %session_key,
            existing = registry.is_bound(&session_key),
            "snapshot transaction state"
        );
        TransactionObject::new(session_key, self.connection_key)
    }

    /// Whether an active native transaction is already bound in this
    /// context. Used by the template to decide propagation behavior.
    pub fn is_existing_transaction(
        &self,
        registry: &ResourceRegistry,
        tx: &TransactionObject<A::TxData>,
    ) -> bool {
        registry
            .lookup::<SessionHolder<A::Session>>(&tx.session_key())
            .map(|holder| self.adapter.is_transaction_active(holder.session()))
            .unwrap_or(false)
    }

    /// Begin a native transaction for this unit of work.
    ///
    /// Creates a session through the factory unless a usable (bound but not
    /// yet synchronized) holder exists, begins the native transaction,
    /// applies the definition timeout, derives and binds the secondary
    /// connection when configured, and publishes the holders in the
    /// registry. Any failure before publication closes a newly created
    /// session and surfaces as [`Error::CannotCreate`], unless it is
    /// already a coordinator error, which propagates unchanged.
    pub fn begin(
        &self,
        registry: &mut ResourceRegistry,
        tx: &mut TransactionObject<A::TxData>,
        definition: &TransactionDefinition,
    ) -> Result<()> {
        // A connection holder still bound at begin either leaked in from an
        // incompatible outer coordinator (unsynchronized) or belongs to an
        // active transaction the template failed to suspend. Neither may be
        // silently reused.
        if let Some(connection_key) = self.connection_key {
            if let Some(holder) = registry.lookup::<ConnectionHolder<A::Connection>>(&connection_key)
            {
                if !holder.is_synchronized() {
                    return Err(Error::IllegalState(format!(
                        "connection holder bound for key {connection_key} is not synchronized \
                         with a transaction"
                    )));
                }
                return Err(Error::IllegalState(format!(
                    "connection holder for key {connection_key} is still bound to an active \
                     transaction"
                )));
            }
        }

        let session_key = tx.session_key();
        let reuse_bound_session = registry
            .lookup::<SessionHolder<A::Session>>(&session_key)
            .map(|holder| !holder.is_synchronized())
            .unwrap_or(false);

        let mut new_holder = if reuse_bound_session {
            None
        } else {
            if registry.is_bound(&session_key) {
                return Err(Error::IllegalState(format!(
                    "a synchronized session holder is already bound for key {session_key}; \
                     suspend it before beginning a new transaction"
                )));
            }
            let session = self
                .session_factory
                .open_session()
                .map_err(|source| Error::CannotCreate {
                    context: "opening session".to_string(),
                    source,
                })?;
            debug!(%session_key, "opened new session for transaction");
            Some(SessionHolder::new_for_transaction(session))
        };

        let result = self.try_begin(registry, &mut new_holder, tx, definition);
        if result.is_err() {
            // Exactly-once release: a session created above and not yet
            // published must not leak.
            if let Some(holder) = new_holder.take() {
                debug!(%session_key, "closing newly created session after failed begin");
                self.adapter.close_session(holder.into_session());
            }
        }
        result
    }

    fn try_begin(
        &self,
        registry: &mut ResourceRegistry,
        new_holder: &mut Option<SessionHolder<A::Session>>,
        tx: &mut TransactionObject<A::TxData>,
        definition: &TransactionDefinition,
    ) -> Result<()> {
        let session_key = tx.session_key();

        let BeginOutcome { tx_data, savepoints } = {
            let session = match new_holder.as_ref() {
                Some(holder) => holder.session(),
                None => registry
                    .lookup::<SessionHolder<A::Session>>(&session_key)
                    .ok_or_else(|| {
                        Error::IllegalState(format!(
                            "no session holder available for key {session_key} during begin"
                        ))
                    })?
                    .session(),
            };
            self.adapter
                .begin_transaction(session, definition)
                .map_err(|source| Error::CannotCreate {
                    context: "beginning native transaction".to_string(),
                    source,
                })?
        };

        let timeout = definition.timeout.or(self.options.default_timeout);
        let deadline = match new_holder.as_mut() {
            Some(holder) => {
                holder.attach_savepoints(savepoints);
                if let Some(timeout) = timeout {
                    holder.set_timeout(timeout);
                }
                holder.deadline()
            }
            None => {
                let holder = registry
                    .lookup_mut::<SessionHolder<A::Session>>(&session_key)
                    .ok_or_else(|| {
                        Error::IllegalState(format!(
                            "session holder for key {session_key} vanished during begin"
                        ))
                    })?;
                holder.attach_savepoints(savepoints);
                if let Some(timeout) = timeout {
                    holder.set_timeout(timeout);
                }
                holder.deadline()
            }
        };

        // The secondary view shares the primary's physical connection, so
        // derivation comes after the native transaction exists and after
        // the holder's deadline is in place.
        let connection = match self.connection_key {
            Some(_) => {
                let session = match new_holder.as_ref() {
                    Some(holder) => holder.session(),
                    None => registry
                        .lookup::<SessionHolder<A::Session>>(&session_key)
                        .ok_or_else(|| {
                            Error::IllegalState(format!(
                                "session holder for key {session_key} vanished during begin"
                            ))
                        })?
                        .session(),
                };
                self.adapter
                    .derive_connection(session, definition.read_only)
                    .map_err(|source| Error::CannotCreate {
                        context: "deriving connection from session".to_string(),
                        source,
                    })?
            }
            None => None,
        };

        // Bind the secondary holder first, then publish the primary.
        if let (Some(connection_key), Some(connection)) = (self.connection_key, connection) {
            let mut holder = ConnectionHolder::new(connection);
            holder.set_deadline(deadline);
            holder.mark_synchronized();
            registry.bind(connection_key, holder)?;
            tx.set_connection_holder_bound(true);
            debug!(%session_key, %connection_key, "bound derived connection holder");
        }

        match new_holder.take() {
            Some(mut holder) => {
                holder.mark_synchronized();
                registry.bind(session_key, holder)?;
                tx.set_new_session_holder(true);
            }
            None => {
                let holder = registry
                    .lookup_mut::<SessionHolder<A::Session>>(&session_key)
                    .ok_or_else(|| {
                        Error::IllegalState(format!(
                            "session holder for key {session_key} vanished during begin"
                        ))
                    })?;
                holder.mark_synchronized();
                tx.set_new_session_holder(false);
            }
        }

        tx.set_transaction_data(tx_data);
        debug!(
            %session_key,
            name = definition.name.as_deref().unwrap_or(""),
            read_only = definition.read_only,
            "began native transaction"
        );
        Ok(())
    }

    /// Unbind both holders from the registry for a nested unit of work.
    ///
    /// Returns an opaque bundle that must be passed back verbatim to
    /// [`Coordinator::resume`].
    pub fn suspend(
        &self,
        registry: &mut ResourceRegistry,
        tx: &mut TransactionObject<A::TxData>,
    ) -> Result<SuspendedResources<A::Session, A::Connection>> {
        let session_key = tx.session_key();

        let connection_holder = match self.connection_key {
            Some(connection_key) if registry.is_bound(&connection_key) => {
                Some(registry.unbind::<ConnectionHolder<A::Connection>>(&connection_key)?)
            }
            _ => None,
        };
        let session_holder = if registry.is_bound(&session_key) {
            Some(registry.unbind::<SessionHolder<A::Session>>(&session_key)?)
        } else {
            None
        };

        let suspended = SuspendedResources {
            session_holder,
            connection_holder,
            session_key,
            connection_key: self.connection_key,
            new_session_holder: tx.is_new_session_holder(),
            connection_holder_bound: tx.has_connection_holder(),
        };
        tx.clear_holder_references();
        debug!(%session_key, "suspended resource bindings");
        Ok(suspended)
    }

    /// Restore bindings taken out by [`Coordinator::suspend`].
    ///
    /// Pure bookkeeping: no adapter calls occur.
    pub fn resume(
        &self,
        registry: &mut ResourceRegistry,
        tx: &mut TransactionObject<A::TxData>,
        suspended: SuspendedResources<A::Session, A::Connection>,
    ) -> Result<()> {
        let SuspendedResources {
            session_holder,
            connection_holder,
            session_key,
            connection_key,
            new_session_holder,
            connection_holder_bound,
        } = suspended;

        if let (Some(connection_key), Some(holder)) = (connection_key, connection_holder) {
            registry.bind(connection_key, holder)?;
        }
        if let Some(holder) = session_holder {
            registry.bind(session_key, holder)?;
        }
        tx.restore_holder_references(new_session_holder, connection_holder_bound);
        debug!(%session_key, "resumed resource bindings");
        Ok(())
    }

    /// Commit the native transaction.
    ///
    /// A holder marked rollback-only is rolled back instead and reported as
    /// [`Error::UnexpectedRollback`]. Commit failures are run through the
    /// adapter's translate contract; a categorized data error is preferred,
    /// with [`Error::System`] as the fallback.
    pub fn commit(
        &self,
        registry: &mut ResourceRegistry,
        tx: &mut TransactionObject<A::TxData>,
    ) -> Result<()> {
        let session_key = tx.session_key();

        let rollback_only = {
            let session_marked = registry
                .lookup::<SessionHolder<A::Session>>(&session_key)
                .map(SessionHolder::is_rollback_only)
                .unwrap_or(false);
            let connection_marked = self
                .connection_key
                .and_then(|key| registry.lookup::<ConnectionHolder<A::Connection>>(&key))
                .map(ConnectionHolder::is_rollback_only)
                .unwrap_or(false);
            session_marked || connection_marked
        };
        if rollback_only {
            debug!(%session_key, "transaction marked rollback-only; rolling back instead");
            self.rollback(registry, tx)?;
            return Err(Error::UnexpectedRollback);
        }

        // A participant did not begin the native transaction and must not
        // finalize it.
        let data = match tx.transaction_data_mut() {
            Some(data) => data,
            None => return Ok(()),
        };
        let holder = registry
            .lookup::<SessionHolder<A::Session>>(&session_key)
            .ok_or_else(|| {
                Error::IllegalState(format!(
                    "no session holder bound for key {session_key} at commit"
                ))
            })?;

        debug!(%session_key, "committing native transaction");
        match self.adapter.commit_transaction(holder.session(), data) {
            Ok(()) => Ok(()),
            Err(source) => {
                if let Some(categorized) = self.adapter.translate(&source) {
                    return Err(categorized.into());
                }
                let context = if source.is_rolled_back() {
                    "committing a transaction already rolled back by a participant"
                } else {
                    "committing native transaction"
                };
                Err(Error::System {
                    context: context.to_string(),
                    source,
                })
            }
        }
    }

    /// Roll back the native transaction.
    ///
    /// The native rollback runs only when this unit of work began the
    /// transaction and it is still active. In all cases, a pre-bound
    /// session has its pending state cleared afterwards so an aborted inner
    /// unit of work cannot leak uncommitted changes into the still-active
    /// outer transaction. Rollback failures are always reported.
    pub fn rollback(
        &self,
        registry: &mut ResourceRegistry,
        tx: &mut TransactionObject<A::TxData>,
    ) -> Result<()> {
        let session_key = tx.session_key();
        let new_session_holder = tx.is_new_session_holder();

        let mut outcome = Ok(());
        if let Some(data) = tx.transaction_data_mut() {
            if let Some(holder) = registry.lookup::<SessionHolder<A::Session>>(&session_key) {
                if self.adapter.is_transaction_active(holder.session()) {
                    debug!(%session_key, "rolling back native transaction");
                    if let Err(source) =
                        self.adapter.rollback_transaction(holder.session(), data)
                    {
                        // A failed rollback leaves resource state undefined
                        // and must never be swallowed.
                        outcome = Err(Error::System {
                            context: "rolling back native transaction".to_string(),
                            source,
                        });
                    }
                }
            }
        }

        if !new_session_holder {
            if let Some(holder) = registry.lookup::<SessionHolder<A::Session>>(&session_key) {
                debug!(%session_key, "clearing pending state on pre-bound session");
                self.adapter.clear_pending_state(holder.session());
            }
        }

        outcome
    }

    /// Mark the transaction rollback-only.
    ///
    /// Sets the sticky flag on the session holder (when the native
    /// transaction is active) and on the bound connection holder.
    /// Idempotent.
    pub fn mark_rollback_only(
        &self,
        registry: &mut ResourceRegistry,
        tx: &TransactionObject<A::TxData>,
    ) {
        let session_key = tx.session_key();
        if let Some(holder) = registry.lookup_mut::<SessionHolder<A::Session>>(&session_key) {
            if self.adapter.is_transaction_active(holder.session()) {
                holder.mark_rollback_only();
            }
        }
        if let Some(connection_key) = self.connection_key {
            if let Some(holder) =
                registry.lookup_mut::<ConnectionHolder<A::Connection>>(&connection_key)
            {
                holder.mark_rollback_only();
            }
        }
    }

    /// Tear down after commit or rollback. Must always be called, exactly
    /// once, as the final hook of a unit of work.
    ///
    /// Order is fixed: evict a coordinator-owned session holder, reset
    /// holder state, release the derived connection (failures are logged,
    /// never raised, so they cannot mask the primary outcome), dispose of
    /// the native transaction data, and finally close the session iff the
    /// coordinator created it.
    pub fn cleanup(
        &self,
        registry: &mut ResourceRegistry,
        mut tx: TransactionObject<A::TxData>,
    ) -> Result<()> {
        let session_key = tx.session_key();

        let owned_holder = if tx.is_new_session_holder() {
            let mut holder = registry.unbind::<SessionHolder<A::Session>>(&session_key)?;
            holder.clear();
            Some(holder)
        } else {
            if let Some(holder) = registry.lookup_mut::<SessionHolder<A::Session>>(&session_key) {
                holder.clear();
            }
            None
        };

        if tx.has_connection_holder() {
            if let Some(connection_key) = self.connection_key {
                let holder = registry.unbind::<ConnectionHolder<A::Connection>>(&connection_key)?;
                let connection = holder.into_connection();
                let session = owned_holder
                    .as_ref()
                    .map(SessionHolder::session)
                    .or_else(|| {
                        registry
                            .lookup::<SessionHolder<A::Session>>(&session_key)
                            .map(SessionHolder::session)
                    });
                match session {
                    Some(session) => {
                        if let Err(error) = self.adapter.release_connection(connection, session) {
                            warn!(
                                %session_key,
                                %connection_key,
                                %error,
                                "failed to release derived connection during cleanup"
                            );
                        }
                    }
                    None => warn!(
                        %session_key,
                        %connection_key,
                        "no session available to release derived connection against"
                    ),
                }
            }
        }

        if let Some(data) = tx.take_transaction_data() {
            self.adapter.cleanup_transaction_data(data);
        }

        if let Some(holder) = owned_holder {
            debug!(%session_key, "closing coordinator-owned session");
            self.adapter.close_session(holder.into_session());
        }
        Ok(())
    }

    /// Create a savepoint on the primary holder for a nested transaction.
    pub fn create_savepoint(
        &self,
        registry: &mut ResourceRegistry,
        tx: &TransactionObject<A::TxData>,
    ) -> Result<Savepoint> {
        let holder = self.savepoint_holder(registry, tx)?;
        holder
            .create_savepoint()
            .map_err(|source| Error::System {
                context: "creating savepoint".to_string(),
                source,
            })
    }

    /// Roll the primary holder back to a savepoint.
    pub fn rollback_to_savepoint(
        &self,
        registry: &mut ResourceRegistry,
        tx: &TransactionObject<A::TxData>,
        savepoint: &Savepoint,
    ) -> Result<()> {
        let holder = self.savepoint_holder(registry, tx)?;
        holder
            .rollback_to_savepoint(savepoint)
            .map_err(|source| Error::System {
                context: "rolling back to savepoint".to_string(),
                source,
            })
    }

    /// Release a savepoint that is no longer needed.
    pub fn release_savepoint(
        &self,
        registry: &mut ResourceRegistry,
        tx: &TransactionObject<A::TxData>,
        savepoint: Savepoint,
    ) -> Result<()> {
        let holder = self.savepoint_holder(registry, tx)?;
        holder
            .release_savepoint(savepoint)
            .map_err(|source| Error::System {
                context: "releasing savepoint".to_string(),
                source,
            })
    }

    fn savepoint_holder<'r>(
        &self,
        registry: &'r mut ResourceRegistry,
        tx: &TransactionObject<A::TxData>,
    ) -> Result<&'r mut SessionHolder<A::Session>> {
        if !self.options.nested_transactions_allowed {
            return Err(Error::NestedNotSupported(
                "nested transactions are disabled by coordinator options".to_string(),
            ));
        }
        let session_key = tx.session_key();
        let holder = registry
            .lookup_mut::<SessionHolder<A::Session>>(&session_key)
            .ok_or_else(|| {
                Error::IllegalState(format!(
                    "no session holder bound for key {session_key} for savepoint operation"
                ))
            })?;
        if !holder.supports_savepoints() {
            return Err(Error::NestedNotSupported(
                "the resource adapter exposes no savepoint capability".to_string(),
            ));
        }
        Ok(holder)
    }
}
