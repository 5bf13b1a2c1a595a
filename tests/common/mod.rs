//! Shared mock harness for coordinator integration tests.
//!
//! The mock adapter, factory, and savepoint backend all write into one
//! ordered [`EventLog`], so tests can assert the exact sequence of
//! adapter-visible operations (begin before derive, release before close)
//! in addition to the end state captured by per-session probes.

#![allow(dead_code)]

use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use txweave::prelude::*;

// ============================================================================
// Event log
// ============================================================================

/// Ordered record of every adapter-visible operation.
#[derive(Clone, Default)]
pub struct EventLog(Arc<Mutex<Vec<String>>>);

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, event: impl Into<String>) {
        self.0.lock().push(event.into());
    }

    pub fn events(&self) -> Vec<String> {
        self.0.lock().clone()
    }

    pub fn contains(&self, event: &str) -> bool {
        self.0.lock().iter().any(|e| e == event)
    }

    /// Index of the first occurrence of `event`; panics if absent.
    pub fn index_of(&self, event: &str) -> usize {
        self.0
            .lock()
            .iter()
            .position(|e| e == event)
            .unwrap_or_else(|| panic!("event {event:?} not recorded; log: {:?}", self.events()))
    }
}

// ============================================================================
// Sessions and connections
// ============================================================================

/// Observable end state of one mock session, shared with the factory.
#[derive(Default)]
pub struct SessionProbe {
    closed: AtomicBool,
    txn_active: AtomicBool,
    committed: AtomicBool,
    rolled_back: AtomicBool,
    pending_cleared: AtomicUsize,
}

impl SessionProbe {
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn is_active(&self) -> bool {
        self.txn_active.load(Ordering::SeqCst)
    }

    pub fn is_committed(&self) -> bool {
        self.committed.load(Ordering::SeqCst)
    }

    pub fn is_rolled_back(&self) -> bool {
        self.rolled_back.load(Ordering::SeqCst)
    }

    pub fn pending_cleared(&self) -> usize {
        self.pending_cleared.load(Ordering::SeqCst)
    }
}

pub struct MockSession {
    pub id: u64,
    pub probe: Arc<SessionProbe>,
}

pub struct MockConnection {
    pub id: u64,
}

pub struct MockTxData {
    pub id: u64,
}

// ============================================================================
// Session factory
// ============================================================================

pub struct MockFactory {
    key: ResourceKey,
    next_id: AtomicU64,
    opened: AtomicUsize,
    probes: Mutex<Vec<Arc<SessionProbe>>>,
    fail_open: AtomicBool,
    log: EventLog,
}

impl MockFactory {
    pub fn new(log: EventLog) -> Self {
        MockFactory {
            key: ResourceKey::new(),
            next_id: AtomicU64::new(0),
            opened: AtomicUsize::new(0),
            probes: Mutex::new(Vec::new()),
            fail_open: AtomicBool::new(false),
            log,
        }
    }

    /// Number of sessions handed out so far.
    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    /// Probe of the n-th session opened by this factory.
    pub fn probe(&self, index: usize) -> Arc<SessionProbe> {
        self.probes.lock()[index].clone()
    }

    pub fn fail_next_open(&self) {
        self.fail_open.store(true, Ordering::SeqCst);
    }
}

impl SessionFactory for MockFactory {
    type Session = MockSession;

    fn open_session(&self) -> AdapterResult<MockSession> {
        if self.fail_open.swap(false, Ordering::SeqCst) {
            return Err(AdapterError::resource("session factory exhausted"));
        }
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.opened.fetch_add(1, Ordering::SeqCst);
        let probe = Arc::new(SessionProbe::default());
        self.probes.lock().push(probe.clone());
        self.log.record(format!("open_session:{id}"));
        Ok(MockSession { id, probe })
    }

    fn resource_key(&self) -> ResourceKey {
        self.key
    }
}

// ============================================================================
// Savepoint backend
// ============================================================================

pub struct MockSavepoints {
    counter: u64,
    log: EventLog,
}

impl SavepointBackend for MockSavepoints {
    type Session = MockSession;

    fn create_savepoint(&mut self, session: &MockSession) -> AdapterResult<Savepoint> {
        self.counter += 1;
        let savepoint = Savepoint::named(format!("sp_{}", self.counter));
        self.log
            .record(format!("create_savepoint:{}:{}", session.id, savepoint.name()));
        Ok(savepoint)
    }

    fn rollback_to_savepoint(
        &mut self,
        session: &MockSession,
        savepoint: &Savepoint,
    ) -> AdapterResult<()> {
        self.log.record(format!(
            "rollback_to_savepoint:{}:{}",
            session.id,
            savepoint.name()
        ));
        Ok(())
    }

    fn release_savepoint(
        &mut self,
        session: &MockSession,
        savepoint: Savepoint,
    ) -> AdapterResult<()> {
        self.log.record(format!(
            "release_savepoint:{}:{}",
            session.id,
            savepoint.name()
        ));
        Ok(())
    }
}

// ============================================================================
// Resource adapter
// ============================================================================

pub struct MockAdapter {
    log: EventLog,
    next_tx: AtomicU64,
    provide_connection: AtomicBool,
    with_savepoints: AtomicBool,
    fail_begin: AtomicBool,
    fail_derive: AtomicBool,
    fail_commit: Mutex<Option<AdapterError>>,
    fail_rollback: AtomicBool,
    fail_release: AtomicBool,
    translate_recognizes: AtomicBool,
    cleaned_tx_data: AtomicUsize,
    released_connections: Mutex<Vec<u64>>,
}

impl MockAdapter {
    pub fn new(log: EventLog) -> Self {
        MockAdapter {
            log,
            next_tx: AtomicU64::new(0),
            provide_connection: AtomicBool::new(true),
            with_savepoints: AtomicBool::new(false),
            fail_begin: AtomicBool::new(false),
            fail_derive: AtomicBool::new(false),
            fail_commit: Mutex::new(None),
            fail_rollback: AtomicBool::new(false),
            fail_release: AtomicBool::new(false),
            translate_recognizes: AtomicBool::new(false),
            cleaned_tx_data: AtomicUsize::new(0),
            released_connections: Mutex::new(Vec::new()),
        }
    }

    pub fn enable_savepoints(&self) {
        self.with_savepoints.store(true, Ordering::SeqCst);
    }

    pub fn refuse_connections(&self) {
        self.provide_connection.store(false, Ordering::SeqCst);
    }

    pub fn fail_next_begin(&self) {
        self.fail_begin.store(true, Ordering::SeqCst);
    }

    pub fn fail_next_derive(&self) {
        self.fail_derive.store(true, Ordering::SeqCst);
    }

    pub fn fail_next_commit(&self, error: AdapterError) {
        *self.fail_commit.lock() = Some(error);
    }

    pub fn fail_rollback(&self) {
        self.fail_rollback.store(true, Ordering::SeqCst);
    }

    pub fn fail_release(&self) {
        self.fail_release.store(true, Ordering::SeqCst);
    }

    pub fn recognize_failures_as_constraint_violations(&self) {
        self.translate_recognizes.store(true, Ordering::SeqCst);
    }

    pub fn cleaned_tx_data(&self) -> usize {
        self.cleaned_tx_data.load(Ordering::SeqCst)
    }

    pub fn released_connections(&self) -> Vec<u64> {
        self.released_connections.lock().clone()
    }
}

impl ResourceAdapter for MockAdapter {
    type Session = MockSession;
    type Connection = MockConnection;
    type TxData = MockTxData;

    fn begin_transaction(
        &self,
        session: &MockSession,
        _definition: &TransactionDefinition,
    ) -> AdapterResult<BeginOutcome<MockSession, MockTxData>> {
        if self.fail_begin.swap(false, Ordering::SeqCst) {
            self.log.record(format!("begin_failed:{}", session.id));
            return Err(AdapterError::runtime("native begin refused"));
        }
        session.probe.txn_active.store(true, Ordering::SeqCst);
        self.log.record(format!("begin:{}", session.id));
        let id = self.next_tx.fetch_add(1, Ordering::SeqCst);
        let mut outcome = BeginOutcome::new(MockTxData { id });
        if self.with_savepoints.load(Ordering::SeqCst) {
            outcome = outcome.with_savepoints(Box::new(MockSavepoints {
                counter: 0,
                log: self.log.clone(),
            }));
        }
        Ok(outcome)
    }

    fn is_transaction_active(&self, session: &MockSession) -> bool {
        session.probe.txn_active.load(Ordering::SeqCst)
    }

    fn commit_transaction(
        &self,
        session: &MockSession,
        _data: &mut MockTxData,
    ) -> AdapterResult<()> {
        if let Some(error) = self.fail_commit.lock().take() {
            self.log.record(format!("commit_failed:{}", session.id));
            return Err(error);
        }
        session.probe.txn_active.store(false, Ordering::SeqCst);
        session.probe.committed.store(true, Ordering::SeqCst);
        self.log.record(format!("commit:{}", session.id));
        Ok(())
    }

    fn rollback_transaction(
        &self,
        session: &MockSession,
        _data: &mut MockTxData,
    ) -> AdapterResult<()> {
        if self.fail_rollback.swap(false, Ordering::SeqCst) {
            self.log.record(format!("rollback_failed:{}", session.id));
            return Err(AdapterError::runtime("native rollback refused"));
        }
        session.probe.txn_active.store(false, Ordering::SeqCst);
        session.probe.rolled_back.store(true, Ordering::SeqCst);
        self.log.record(format!("rollback:{}", session.id));
        Ok(())
    }

    fn derive_connection(
        &self,
        session: &MockSession,
        read_only: bool,
    ) -> AdapterResult<Option<MockConnection>> {
        if !self.provide_connection.load(Ordering::SeqCst) {
            return Ok(None);
        }
        if self.fail_derive.swap(false, Ordering::SeqCst) {
            self.log.record(format!("derive_failed:{}", session.id));
            return Err(AdapterError::runtime("cannot expose raw connection"));
        }
        if read_only {
            self.log.record(format!("derive_connection:{}:ro", session.id));
        } else {
            self.log.record(format!("derive_connection:{}", session.id));
        }
        Ok(Some(MockConnection { id: session.id }))
    }

    fn release_connection(
        &self,
        connection: MockConnection,
        session: &MockSession,
    ) -> AdapterResult<()> {
        if self.fail_release.swap(false, Ordering::SeqCst) {
            self.log.record(format!("release_failed:{}", connection.id));
            return Err(AdapterError::runtime("connection release refused"));
        }
        self.released_connections.lock().push(connection.id);
        self.log
            .record(format!("release_connection:{}:{}", connection.id, session.id));
        Ok(())
    }

    fn clear_pending_state(&self, session: &MockSession) {
        session.probe.pending_cleared.fetch_add(1, Ordering::SeqCst);
        self.log.record(format!("clear_pending:{}", session.id));
    }

    fn translate(&self, error: &AdapterError) -> Option<DataAccessError> {
        if self.translate_recognizes.load(Ordering::SeqCst) {
            Some(DataAccessError::ConstraintViolation(
                error.message().to_string(),
            ))
        } else {
            None
        }
    }

    fn cleanup_transaction_data(&self, data: MockTxData) {
        self.cleaned_tx_data.fetch_add(1, Ordering::SeqCst);
        self.log.record(format!("cleanup_data:{}", data.id));
    }

    fn close_session(&self, session: MockSession) {
        session.probe.closed.store(true, Ordering::SeqCst);
        self.log.record(format!("close_session:{}", session.id));
    }
}

// ============================================================================
// Shared handles
// ============================================================================

// The orphan rule forbids implementing the coordinator traits directly on
// `Arc<MockFactory>` / `Arc<MockAdapter>` here, so these newtypes let the
// harness and the coordinator share one mock via `Arc` while the traits
// stay implemented on the plain mock types above.

#[derive(Clone)]
pub struct FactoryHandle(pub Arc<MockFactory>);

impl SessionFactory for FactoryHandle {
    type Session = MockSession;

    fn open_session(&self) -> AdapterResult<MockSession> {
        self.0.open_session()
    }

    fn resource_key(&self) -> ResourceKey {
        self.0.resource_key()
    }
}

#[derive(Clone)]
pub struct AdapterHandle(pub Arc<MockAdapter>);

impl ResourceAdapter for AdapterHandle {
    type Session = MockSession;
    type Connection = MockConnection;
    type TxData = MockTxData;

    fn begin_transaction(
        &self,
        session: &MockSession,
        definition: &TransactionDefinition,
    ) -> AdapterResult<BeginOutcome<MockSession, MockTxData>> {
        self.0.begin_transaction(session, definition)
    }

    fn is_transaction_active(&self, session: &MockSession) -> bool {
        self.0.is_transaction_active(session)
    }

    fn commit_transaction(
        &self,
        session: &MockSession,
        data: &mut MockTxData,
    ) -> AdapterResult<()> {
        self.0.commit_transaction(session, data)
    }

    fn rollback_transaction(
        &self,
        session: &MockSession,
        data: &mut MockTxData,
    ) -> AdapterResult<()> {
        self.0.rollback_transaction(session, data)
    }

    fn derive_connection(
        &self,
        session: &MockSession,
        read_only: bool,
    ) -> AdapterResult<Option<MockConnection>> {
        self.0.derive_connection(session, read_only)
    }

    fn release_connection(
        &self,
        connection: MockConnection,
        session: &MockSession,
    ) -> AdapterResult<()> {
        self.0.release_connection(connection, session)
    }

    fn clear_pending_state(&self, session: &MockSession) {
        self.0.clear_pending_state(session)
    }

    fn translate(&self, error: &AdapterError) -> Option<DataAccessError> {
        self.0.translate(error)
    }

    fn cleanup_transaction_data(&self, data: MockTxData) {
        self.0.cleanup_transaction_data(data)
    }

    fn close_session(&self, session: MockSession) {
        self.0.close_session(session)
    }
}

// ============================================================================
// Harness
// ============================================================================

pub struct Harness {
    pub log: EventLog,
    pub adapter: Arc<MockAdapter>,
    pub factory: Arc<MockFactory>,
    pub coordinator: Coordinator<AdapterHandle, FactoryHandle>,
    pub registry: ResourceRegistry,
}

impl Harness {
    /// Coordinator managing only the primary session, default options.
    pub fn new() -> Self {
        Self::build(false, false, CoordinatorOptions::default())
    }

    /// Coordinator with a secondary connection key configured.
    pub fn with_connection() -> Self {
        Self::build(true, false, CoordinatorOptions::default())
    }

    /// Coordinator whose adapter exposes savepoint capability.
    pub fn with_savepoints() -> Self {
        Self::build(false, true, CoordinatorOptions::default())
    }

    /// Savepoint-capable adapter with custom coordinator options.
    pub fn with_options(options: CoordinatorOptions) -> Self {
        Self::build(false, true, options)
    }

    fn build(connection: bool, savepoints: bool, options: CoordinatorOptions) -> Self {
        let log = EventLog::new();
        let adapter = Arc::new(MockAdapter::new(log.clone()));
        if savepoints {
            adapter.enable_savepoints();
        }
        let factory = Arc::new(MockFactory::new(log.clone()));
        let mut coordinator =
            Coordinator::new(AdapterHandle(adapter.clone()), FactoryHandle(factory.clone()))
                .with_options(options);
        if connection {
            coordinator = coordinator.with_connection_key(ResourceKey::new());
        }
        Harness {
            log,
            adapter,
            factory,
            coordinator,
            registry: ResourceRegistry::new(),
        }
    }

    pub fn session_key(&self) -> ResourceKey {
        self.factory.resource_key()
    }

    pub fn connection_key(&self) -> ResourceKey {
        self.coordinator
            .connection_key()
            .expect("harness has no connection key configured")
    }
}
