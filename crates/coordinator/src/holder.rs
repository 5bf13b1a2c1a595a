//! Resource holders: an acquired handle plus transaction bookkeeping.
//!
//! A holder wraps one handle for the duration of a unit of work and records
//! whether the coordinator created it, whether it has been wired into an
//! active native transaction, a sticky rollback-only flag, and an optional
//! deadline. Holders are never reused across units of work: the coordinator
//! clears and evicts them during cleanup.

use crate::adapter::{Savepoint, SavepointBackend};
use std::time::{Duration, Instant};
use txweave_core::{AdapterError, AdapterResult};

/// Bookkeeping shared by all holder kinds.
#[derive(Debug, Default)]
pub(crate) struct HolderState {
    synchronized: bool,
    rollback_only: bool,
    deadline: Option<Instant>,
}

impl HolderState {
    // rollback_only survives: it is monotonic for the lifetime of the
    // holder, so a participant's mark is still visible to the scope that
    // owns the native transaction.
    fn clear(&mut self) {
        self.synchronized = false;
        self.deadline = None;
    }
}

/// Holder for the primary resource handle.
///
/// Created by the coordinator during begin (`is_new = true`) or constructed
/// and bound by an enclosing scope (`is_new = false`). A holder the
/// coordinator did not create is never closed by it; only transient flags
/// may be set.
pub struct SessionHolder<S> {
    session: S,
    is_new: bool,
    state: HolderState,
    savepoints: Option<Box<dyn SavepointBackend<Session = S>>>,
}

impl<S> SessionHolder<S> {
    /// Wrap a session acquired by an enclosing scope.
    ///
    /// The resulting holder is not owned by any coordinator: cleanup will
    /// leave the session open for the scope that bound it.
    pub fn new(session: S) -> Self {
        SessionHolder {
            session,
            is_new: false,
            state: HolderState::default(),
            savepoints: None,
        }
    }

    /// Wrap a session the coordinator just created for one unit of work.
    pub(crate) fn new_for_transaction(session: S) -> Self {
        SessionHolder {
            session,
            is_new: true,
            state: HolderState::default(),
            savepoints: None,
        }
    }

    /// The wrapped session.
    pub fn session(&self) -> &S {
        &self.session
    }

    /// Whether the coordinator created this session for the current unit
    /// of work.
    pub fn is_new(&self) -> bool {
        self.is_new
    }

    /// Recover the session, dropping all bookkeeping.
    pub fn into_session(self) -> S {
        self.session
    }

    /// Whether this holder has been fully wired into an active native
    /// transaction.
    pub fn is_synchronized(&self) -> bool {
        self.state.synchronized
    }

    pub(crate) fn mark_synchronized(&mut self) {
        self.state.synchronized = true;
    }

    /// Whether the transaction may only be rolled back.
    pub fn is_rollback_only(&self) -> bool {
        self.state.rollback_only
    }

    /// Set the sticky rollback-only flag. Idempotent; the flag is never
    /// reset for the lifetime of the transaction.
    pub fn mark_rollback_only(&mut self) {
        self.state.rollback_only = true;
    }

    /// Apply a timeout, recording an absolute deadline from now.
    pub fn set_timeout(&mut self, timeout: Duration) {
        self.state.deadline = Some(Instant::now() + timeout);
    }

    /// The absolute deadline, if a timeout was applied.
    pub fn deadline(&self) -> Option<Instant> {
        self.state.deadline
    }

    /// Whether the deadline has passed. Always false without a deadline.
    pub fn has_expired(&self) -> bool {
        self.state
            .deadline
            .is_some_and(|deadline| Instant::now() >= deadline)
    }

    /// Time remaining until the deadline, if one is set.
    pub fn time_to_live(&self) -> Option<Duration> {
        self.state
            .deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    /// Whether a savepoint capability is attached.
    pub fn supports_savepoints(&self) -> bool {
        self.savepoints.is_some()
    }

    pub(crate) fn attach_savepoints(
        &mut self,
        savepoints: Option<Box<dyn SavepointBackend<Session = S>>>,
    ) {
        self.savepoints = savepoints;
    }

    /// Create a savepoint through the attached capability.
    pub fn create_savepoint(&mut self) -> AdapterResult<Savepoint> {
        let SessionHolder {
            session,
            savepoints,
            ..
        } = self;
        match savepoints.as_mut() {
            Some(backend) => backend.create_savepoint(session),
            None => Err(AdapterError::runtime("no savepoint capability attached")),
        }
    }

    /// Roll back to a savepoint through the attached capability.
    pub fn rollback_to_savepoint(&mut self, savepoint: &Savepoint) -> AdapterResult<()> {
        let SessionHolder {
            session,
            savepoints,
            ..
        } = self;
        match savepoints.as_mut() {
            Some(backend) => backend.rollback_to_savepoint(session, savepoint),
            None => Err(AdapterError::runtime("no savepoint capability attached")),
        }
    }

    /// Release a savepoint through the attached capability.
    pub fn release_savepoint(&mut self, savepoint: Savepoint) -> AdapterResult<()> {
        let SessionHolder {
            session,
            savepoints,
            ..
        } = self;
        match savepoints.as_mut() {
            Some(backend) => backend.release_savepoint(session, savepoint),
            None => Err(AdapterError::runtime("no savepoint capability attached")),
        }
    }

    /// Reset synchronization, deadline, and savepoint state.
    ///
    /// Called during cleanup; after this the holder can carry a plain,
    /// non-transactional session again (pre-bound case) or be discarded.
    /// The rollback-only flag is deliberately left alone.
    pub(crate) fn clear(&mut self) {
        self.state.clear();
        self.savepoints = None;
    }
}

impl<S: std::fmt::Debug> std::fmt::Debug for SessionHolder<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionHolder")
            .field("session", &self.session)
            .field("is_new", &self.is_new)
            .field("state", &self.state)
            .field("savepoints", &self.savepoints.is_some())
            .finish()
    }
}

/// Holder for the secondary, connection-like handle derived from the
/// session during begin.
#[derive(Debug)]
pub struct ConnectionHolder<C> {
    connection: C,
    state: HolderState,
}

impl<C> ConnectionHolder<C> {
    /// Wrap a derived connection.
    ///
    /// The holder starts unsynchronized; the coordinator marks holders it
    /// binds itself, which is how a leaked foreign binding is detected at
    /// the next begin.
    pub fn new(connection: C) -> Self {
        ConnectionHolder {
            connection,
            state: HolderState::default(),
        }
    }

    /// The wrapped connection.
    pub fn connection(&self) -> &C {
        &self.connection
    }

    /// Recover the connection, dropping all bookkeeping.
    pub fn into_connection(self) -> C {
        self.connection
    }

    /// Whether this holder was wired in by an active transaction.
    pub fn is_synchronized(&self) -> bool {
        self.state.synchronized
    }

    pub(crate) fn mark_synchronized(&mut self) {
        self.state.synchronized = true;
    }

    /// Whether the transaction may only be rolled back.
    pub fn is_rollback_only(&self) -> bool {
        self.state.rollback_only
    }

    /// Set the sticky rollback-only flag.
    pub fn mark_rollback_only(&mut self) {
        self.state.rollback_only = true;
    }

    pub(crate) fn set_deadline(&mut self, deadline: Option<Instant>) {
        self.state.deadline = deadline;
    }

    /// The absolute deadline, if one was propagated from the session.
    pub fn deadline(&self) -> Option<Instant> {
        self.state.deadline
    }
}
