use crate::worker::WorkOutcome;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::OnceLock;
use tracing_subscriber::EnvFilter;

static TRACING_INIT: OnceLock<()> = OnceLock::new();

/// Installs a basic tracing subscriber (if one is not already active).
///
/// The subscriber honours `RUST_LOG` if it is present, otherwise it falls back to `info`.
/// Calling this function multiple times is harmless.
pub fn init_tracing() {
    if TRACING_INIT.get().is_some() {
        return;
    }

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .try_init();

    let _ = TRACING_INIT.set(());
}

/// Lightweight rolling counters describing the orchestrator's behaviour.
#[derive(Default, Debug)]
pub struct Telemetry {
    ticks: AtomicU64,
    probe_failures: AtomicU64,
    balance_refresh_failures: AtomicU64,
    work_completed: AtomicU64,
    work_disconnected: AtomicU64,
    work_failed: AtomicU64,
    missed_acks: AtomicU64,
    skipped_dispatches: AtomicU64,
    hung_shutdowns: AtomicU64,
}

impl Telemetry {
    pub fn record_tick(&self) {
        self.ticks.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_probe_failure(&self) {
        self.probe_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_balance_refresh_failure(&self) {
        self.balance_refresh_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_ack(&self, outcome: WorkOutcome) {
        let counter = match outcome {
            WorkOutcome::Completed => &self.work_completed,
            WorkOutcome::Disconnected => &self.work_disconnected,
            WorkOutcome::Failed => &self.work_failed,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_missed_ack(&self) {
        self.missed_acks.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_skipped_dispatch(&self) {
        self.skipped_dispatches.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_hung_shutdown(&self) {
        self.hung_shutdowns.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> TelemetrySnapshot {
        TelemetrySnapshot {
            ticks: self.ticks.load(Ordering::Relaxed),
            probe_failures: self.probe_failures.load(Ordering::Relaxed),
            balance_refresh_failures: self.balance_refresh_failures.load(Ordering::Relaxed),
            work_completed: self.work_completed.load(Ordering::Relaxed),
            work_disconnected: self.work_disconnected.load(Ordering::Relaxed),
            work_failed: self.work_failed.load(Ordering::Relaxed),
            missed_acks: self.missed_acks.load(Ordering::Relaxed),
            skipped_dispatches: self.skipped_dispatches.load(Ordering::Relaxed),
            hung_shutdowns: self.hung_shutdowns.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct TelemetrySnapshot {
    pub ticks: u64,
    pub probe_failures: u64,
    pub balance_refresh_failures: u64,
    pub work_completed: u64,
    pub work_disconnected: u64,
    pub work_failed: u64,
    pub missed_acks: u64,
    pub skipped_dispatches: u64,
    pub hung_shutdowns: u64,
}

impl TelemetrySnapshot {
    /// Total acknowledgments observed, regardless of outcome.
    pub fn acks(&self) -> u64 {
        self.work_completed + self.work_disconnected + self.work_failed
    }

    pub fn log(&self, app_name: &str) {
        tracing::info!(
            target: "appvisor::metrics",
            app = app_name,
            ticks = self.ticks,
            probe_failures = self.probe_failures,
            balance_refresh_failures = self.balance_refresh_failures,
            work_completed = self.work_completed,
            work_disconnected = self.work_disconnected,
            work_failed = self.work_failed,
            missed_acks = self.missed_acks,
            skipped_dispatches = self.skipped_dispatches,
            hung_shutdowns = self.hung_shutdowns,
            "runtime metrics snapshot"
        );
    }
}
