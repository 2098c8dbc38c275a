use std::{
    sync::{
        atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

use anyhow::{anyhow, bail, Result};
use appvisor::{
    AppProtocol, Collaborators, ConnectivitySource, IndexerControl, OrchestratorConfig,
    ProtocolFuture, StatePersister, StatusSink, TickContext,
};
use futures::future::BoxFuture;
use once_cell::sync::Lazy;
use std::sync::Mutex;
use tokio::sync::Notify;
use tracing_subscriber::EnvFilter;

static TRACING_SUBSCRIBER: Lazy<()> = Lazy::new(|| {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
});

pub fn init_tracing() {
    Lazy::force(&TRACING_SUBSCRIBER);
}

pub fn test_config(tick: Duration, startup_delay: Duration) -> Result<OrchestratorConfig> {
    OrchestratorConfig::builder()
        .app_name("appvisor-test")
        .tick_interval(tick)
        .startup_delay(startup_delay)
        .shutdown_grace(Duration::from_secs(1))
        .build()
}

#[derive(Debug, Default, Clone)]
pub struct StatusLog {
    pub ready: Vec<bool>,
    pub synced: Vec<bool>,
    pub checked: Vec<bool>,
    pub balance_refreshes: usize,
    pub heights: Vec<(u64, u64, u64)>,
}

#[derive(Default)]
pub struct FakeStatus {
    log: Mutex<StatusLog>,
}

impl FakeStatus {
    pub fn log(&self) -> StatusLog {
        self.log.lock().expect("status log poisoned").clone()
    }

    pub fn last(&self) -> (Option<bool>, Option<bool>, Option<bool>) {
        let log = self.log();
        (
            log.ready.last().copied(),
            log.synced.last().copied(),
            log.checked.last().copied(),
        )
    }

    fn record(&self, f: impl FnOnce(&mut StatusLog)) {
        f(&mut self.log.lock().expect("status log poisoned"));
    }
}

impl StatusSink for FakeStatus {
    fn set_ready(&self, ready: bool) {
        self.record(|log| log.ready.push(ready));
    }

    fn set_synced(&self, synced: bool) {
        self.record(|log| log.synced.push(synced));
    }

    fn set_checked(&self, checked: bool) {
        self.record(|log| log.checked.push(checked));
    }

    fn refresh_balance_display(&self) {
        self.record(|log| log.balance_refreshes += 1);
    }

    fn update_height_displays(&self, local: u64, remote: u64, indexed_count: u64) {
        self.record(|log| log.heights.push((local, remote, indexed_count)));
    }
}

pub struct FakeConnectivity {
    daemon_up: AtomicBool,
    wallet_up: AtomicBool,
    endpoint: Mutex<String>,
}

impl FakeConnectivity {
    pub fn connected() -> Self {
        Self {
            daemon_up: AtomicBool::new(true),
            wallet_up: AtomicBool::new(true),
            endpoint: Mutex::new("http://127.0.0.1:10102".to_string()),
        }
    }

    pub fn set_daemon(&self, up: bool) {
        self.daemon_up.store(up, Ordering::SeqCst);
    }

    pub fn set_wallet(&self, up: bool) {
        self.wallet_up.store(up, Ordering::SeqCst);
    }

    pub fn set_endpoint(&self, endpoint: &str) {
        *self.endpoint.lock().expect("endpoint poisoned") = endpoint.to_string();
    }
}

impl ConnectivitySource for FakeConnectivity {
    fn ping_daemon(&self) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            if self.daemon_up.load(Ordering::SeqCst) {
                Ok(())
            } else {
                Err(anyhow!("daemon unreachable"))
            }
        })
    }

    fn ping_wallet(&self) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            if self.wallet_up.load(Ordering::SeqCst) {
                Ok(())
            } else {
                Err(anyhow!("wallet unreachable"))
            }
        })
    }

    fn is_daemon_connected(&self) -> bool {
        self.daemon_up.load(Ordering::SeqCst)
    }

    fn is_wallet_connected(&self) -> bool {
        self.wallet_up.load(Ordering::SeqCst)
    }

    fn daemon_endpoint(&self) -> String {
        self.endpoint.lock().expect("endpoint poisoned").clone()
    }
}

#[derive(Default)]
pub struct FakeIndexer {
    pub initialized: AtomicBool,
    pub running: AtomicBool,
    pub count: AtomicU64,
    pub local: AtomicU64,
    pub remote: AtomicU64,
    pub stops: AtomicUsize,
    endpoints: Mutex<Vec<String>>,
}

impl FakeIndexer {
    pub fn running_at(local: u64, remote: u64, count: u64) -> Self {
        let indexer = Self::default();
        indexer.initialized.store(true, Ordering::SeqCst);
        indexer.running.store(true, Ordering::SeqCst);
        indexer.set_heights(local, remote);
        indexer.count.store(count, Ordering::SeqCst);
        indexer
    }

    pub fn set_heights(&self, local: u64, remote: u64) {
        self.local.store(local, Ordering::SeqCst);
        self.remote.store(remote, Ordering::SeqCst);
    }

    pub fn endpoints(&self) -> Vec<String> {
        self.endpoints.lock().expect("endpoints poisoned").clone()
    }
}

impl IndexerControl for FakeIndexer {
    fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    fn indexed_contract_count(&self) -> u64 {
        self.count.load(Ordering::SeqCst)
    }

    fn last_indexed_height(&self) -> u64 {
        self.local.load(Ordering::SeqCst)
    }

    fn chain_height(&self) -> u64 {
        self.remote.load(Ordering::SeqCst)
    }

    fn set_endpoint(&self, endpoint: &str) {
        self.endpoints
            .lock()
            .expect("endpoints poisoned")
            .push(endpoint.to_string());
    }

    fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
        self.stops.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Default)]
pub struct FakePersister {
    pub calls: AtomicUsize,
    pub fail: AtomicBool,
}

impl StatePersister for FakePersister {
    fn persist(&self) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            bail!("disk full");
        }
        Ok(())
    }
}

/// Fakes for every collaborator, kept as concrete handles so tests can steer them.
pub struct Harness {
    pub status: Arc<FakeStatus>,
    pub connectivity: Arc<FakeConnectivity>,
    pub indexer: Arc<FakeIndexer>,
    pub persister: Arc<FakePersister>,
}

impl Harness {
    pub fn new(indexer: FakeIndexer) -> Self {
        Self {
            status: Arc::new(FakeStatus::default()),
            connectivity: Arc::new(FakeConnectivity::connected()),
            indexer: Arc::new(indexer),
            persister: Arc::new(FakePersister::default()),
        }
    }

    pub fn collaborators(&self) -> Collaborators {
        Collaborators::new(
            self.status.clone(),
            self.connectivity.clone(),
            self.indexer.clone(),
        )
        .with_persister(self.persister.clone())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Branch {
    Work,
    Disconnected,
}

#[derive(Default)]
pub struct ProtocolLog {
    pub initialized: usize,
    pub calls: Vec<(u64, Branch)>,
    pub finalized: usize,
}

/// Records every hook invocation. With `hang` set, `work` never returns.
#[derive(Clone, Default)]
pub struct SharedRecordingProtocol {
    log: Arc<Mutex<ProtocolLog>>,
    hang: Option<Arc<Notify>>,
}

impl SharedRecordingProtocol {
    pub fn new() -> (Self, Arc<Mutex<ProtocolLog>>) {
        let protocol = Self::default();
        let log = protocol.log.clone();
        (protocol, log)
    }

    pub fn hanging() -> (Self, Arc<Mutex<ProtocolLog>>) {
        let protocol = Self {
            hang: Some(Arc::new(Notify::new())),
            ..Self::default()
        };
        let log = protocol.log.clone();
        (protocol, log)
    }

    fn record(&self, tick: u64, branch: Branch) {
        self.log
            .lock()
            .expect("protocol log poisoned")
            .calls
            .push((tick, branch));
    }
}

impl AppProtocol for SharedRecordingProtocol {
    fn initialize<'a>(&'a mut self) -> ProtocolFuture<'a> {
        Box::pin(async move {
            self.log.lock().expect("protocol log poisoned").initialized += 1;
            Ok(())
        })
    }

    fn work<'a>(&'a mut self, context: &'a TickContext) -> ProtocolFuture<'a> {
        Box::pin(async move {
            self.record(context.tick, Branch::Work);
            if let Some(hang) = &self.hang {
                hang.notified().await;
            }
            Ok(())
        })
    }

    fn on_disconnected<'a>(&'a mut self, context: &'a TickContext) -> ProtocolFuture<'a> {
        Box::pin(async move {
            self.record(context.tick, Branch::Disconnected);
            Ok(())
        })
    }

    fn finalize<'a>(&'a mut self) -> ProtocolFuture<'a> {
        Box::pin(async move {
            self.log.lock().expect("protocol log poisoned").finalized += 1;
            Ok(())
        })
    }
}

pub fn calls(log: &Arc<Mutex<ProtocolLog>>) -> Vec<(u64, Branch)> {
    log.lock().expect("protocol log poisoned").calls.clone()
}
