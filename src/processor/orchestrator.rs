//! Fixed-interval tick loop and the shutdown sequence.

use super::sync::{SyncState, SyncTracker};
use super::tick::{OffsetCounter, TickContext};
use super::worker_pool::{collect_acks, WorkerPool};
use crate::probe::{ConnectionProbe, ConnectionState};
use crate::runtime::collaborators::Collaborators;
use crate::runtime::config::OrchestratorConfig;
use crate::runtime::protocol::AppProtocol;
use crate::runtime::shutdown::{ShutdownReason, ShutdownTrigger};
use crate::runtime::telemetry::Telemetry;
use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{interval_at, sleep, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Drives connectivity checks, sync evaluation, and worker dispatch on a fixed period,
/// and owns the shutdown protocol.
///
/// The orchestrator is the only writer of [`ConnectionState`] and [`SyncState`]; workers
/// receive copies through the [`TickContext`] attached to each work signal.
pub struct Orchestrator {
    config: OrchestratorConfig,
    collaborators: Collaborators,
    probe: ConnectionProbe,
    sync: SyncTracker,
    offset: OffsetCounter,
    pool: WorkerPool,
    telemetry: Arc<Telemetry>,
    shutdown: ShutdownTrigger,
    done_tx: watch::Sender<bool>,
    tick: u64,
    connection: ConnectionState,
    ready: bool,
    last_endpoint: Option<String>,
    closed: bool,
}

impl Orchestrator {
    pub fn new(config: OrchestratorConfig, collaborators: Collaborators) -> Self {
        Self::with_shutdown_trigger(config, collaborators, ShutdownTrigger::new())
    }

    /// Builds an orchestrator that stops when `shutdown` is requested, so a window-close
    /// intercept created before the orchestrator can share the same trigger.
    pub fn with_shutdown_trigger(
        config: OrchestratorConfig,
        collaborators: Collaborators,
        shutdown: ShutdownTrigger,
    ) -> Self {
        let telemetry = Arc::new(Telemetry::default());
        let probe = ConnectionProbe::new(
            collaborators.connectivity.clone(),
            config.probe_timeout(),
            telemetry.clone(),
        );
        let sync = SyncTracker::new(config.allowed_lag(), config.check_threshold());
        let offset = OffsetCounter::new(config.offset_period());
        let pool = WorkerPool::new(config.worker_channel_capacity(), telemetry.clone());
        let (done_tx, _) = watch::channel(false);

        Self {
            config,
            collaborators,
            probe,
            sync,
            offset,
            pool,
            telemetry,
            shutdown,
            done_tx,
            tick: 0,
            connection: ConnectionState::default(),
            ready: false,
            last_endpoint: None,
            closed: false,
        }
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Handle for the window-close intercept and the OS signal listener.
    pub fn shutdown_trigger(&self) -> ShutdownTrigger {
        self.shutdown.clone()
    }

    /// Flips to `true` exactly once, after every worker stopped or the grace period expired.
    pub fn done_signal(&self) -> watch::Receiver<bool> {
        self.done_tx.subscribe()
    }

    pub fn telemetry(&self) -> Arc<Telemetry> {
        self.telemetry.clone()
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.connection
    }

    pub fn sync_state(&self) -> SyncState {
        self.sync.state()
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    /// Number of workers spawned so far.
    pub fn workers(&self) -> usize {
        self.pool.len()
    }

    /// Spawns a worker task driving `protocol`. Must be called from within a tokio runtime.
    pub fn spawn_worker<P: AppProtocol>(&mut self, protocol: P) -> usize {
        let worker_id = self.pool.spawn(protocol);
        tracing::debug!(worker = worker_id, "worker spawned");
        worker_id
    }

    /// Runs the tick loop until shutdown is requested, then performs the shutdown sequence.
    pub async fn run(mut self) -> Result<()> {
        tracing::info!(
            app = self.config.app_name(),
            version = env!("CARGO_PKG_VERSION"),
            os = std::env::consts::OS,
            arch = std::env::consts::ARCH,
            workers = self.pool.len(),
            "orchestrator starting"
        );

        let stop = self.shutdown.token();
        if sleep_with_cancellation(self.config.startup_delay(), &stop).await {
            let tick_interval = self.config.tick_interval();
            let mut ticker = interval_at(Instant::now() + tick_interval, tick_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    biased;
                    _ = stop.cancelled() => break,
                    _ = ticker.tick() => {
                        self.tick().await;
                    }
                }
            }
        }

        self.close().await;
        tracing::info!(app = self.config.app_name(), "orchestrator closed");
        Ok(())
    }

    /// Runs one tick: probe, balance refresh, endpoint re-resolve, ready indicator,
    /// sync evaluation, offset action, then worker dispatch.
    pub async fn tick(&mut self) -> TickContext {
        self.tick += 1;
        self.telemetry.record_tick();
        let status = self.collaborators.status.clone();

        let connection = self.probe.probe().await;
        self.log_connection_change(connection);
        self.connection = connection;

        if connection.wallet_connected {
            status.refresh_balance_display();
        }

        self.refresh_indexer_endpoint();

        let indexer_initialized = self.collaborators.indexer.is_initialized();
        self.ready = connection.daemon_connected && indexer_initialized;
        status.set_ready(self.ready);

        let sync = self.evaluate_sync(connection, indexer_initialized);
        status.set_synced(sync.synced);
        status.set_checked(sync.checked);

        let offset_due = self.offset.advance();
        if offset_due {
            self.telemetry.snapshot().log(self.config.app_name());
        }

        let context = TickContext {
            tick: self.tick,
            connection,
            sync,
            ready: self.ready,
            offset_due,
        };
        self.dispatch(&context).await;
        context
    }

    /// Shutdown sequence: persist external state, stop the indexer, broadcast the close
    /// signal, wait out the grace period, emit the done signal. Safe to call repeatedly;
    /// only the first call does any work.
    pub async fn close(&mut self) {
        if self.closed {
            tracing::debug!("orchestrator already closed");
            return;
        }
        self.closed = true;
        self.shutdown.request(ShutdownReason::Requested);

        tracing::info!(
            app = self.config.app_name(),
            reason = %self.shutdown.reason().unwrap_or(ShutdownReason::Requested),
            "closing"
        );

        if let Err(err) = self.collaborators.persister.persist() {
            tracing::warn!(error = %err, "failed to persist state before teardown");
        }
        self.collaborators.indexer.stop();

        self.pool.close();
        if !self.pool.wait_for_workers(self.config.shutdown_grace()).await {
            tracing::warn!(
                app = self.config.app_name(),
                "proceeding with teardown while workers are still running"
            );
        }

        self.done_tx.send_if_modified(|done| {
            if *done {
                return false;
            }
            *done = true;
            true
        });
    }

    fn log_connection_change(&self, next: ConnectionState) {
        if next.daemon_connected != self.connection.daemon_connected {
            tracing::info!(connected = next.daemon_connected, "daemon connectivity changed");
        }
        if next.wallet_connected != self.connection.wallet_connected {
            tracing::info!(connected = next.wallet_connected, "wallet connectivity changed");
        }
    }

    fn refresh_indexer_endpoint(&mut self) {
        let endpoint = self.collaborators.connectivity.daemon_endpoint();
        if self.last_endpoint.as_deref() == Some(endpoint.as_str()) {
            return;
        }

        tracing::info!(endpoint = %endpoint, "daemon endpoint changed; updating indexer");
        self.collaborators.indexer.set_endpoint(&endpoint);
        self.last_endpoint = Some(endpoint);
    }

    fn evaluate_sync(&mut self, connection: ConnectionState, indexer_initialized: bool) -> SyncState {
        if !connection.daemon_connected || !indexer_initialized {
            return self.sync.reset();
        }

        let indexer = &self.collaborators.indexer;
        let running = indexer.is_running();
        let local = indexer.last_indexed_height();
        let remote = indexer.chain_height();
        let indexed_count = if running {
            indexer.indexed_contract_count()
        } else {
            self.sync.state().indexed_count
        };

        let state = self.sync.update(local, remote, indexed_count, running);
        if running {
            self.collaborators
                .status
                .update_height_displays(local, remote, indexed_count);
        }
        state
    }

    async fn dispatch(&self, context: &TickContext) {
        let pending = self.pool.dispatch(context);
        if pending.is_empty() {
            return;
        }

        if !self.config.await_acks() {
            let telemetry = self.telemetry.clone();
            tokio::spawn(async move { collect_acks(pending, &telemetry).await });
            return;
        }

        let stop = self.shutdown.token();
        tokio::select! {
            biased;
            _ = stop.cancelled() => {
                tracing::debug!(tick = context.tick, "shutdown requested while awaiting acknowledgments");
            }
            _ = collect_acks(pending, &self.telemetry) => {}
        }
    }
}

/// Sleeps for `delay` unless `token` fires first. Returns `false` when cancelled.
async fn sleep_with_cancellation(delay: Duration, token: &CancellationToken) -> bool {
    if delay.is_zero() {
        return !token.is_cancelled();
    }

    tokio::select! {
        _ = token.cancelled() => false,
        _ = sleep(delay) => true,
    }
}
