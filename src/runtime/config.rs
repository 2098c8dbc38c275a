use anyhow::{bail, Context, Result};
use std::time::Duration;

const DEFAULT_TICK_INTERVAL_SECS: u64 = 3;
const DEFAULT_STARTUP_DELAY_SECS: u64 = 3;
const DEFAULT_SHUTDOWN_GRACE_SECS: u64 = 1;
const DEFAULT_OFFSET_PERIOD: u64 = 10;
const DEFAULT_ALLOWED_LAG: u64 = 3;
const DEFAULT_CHECK_THRESHOLD: u64 = 100;
const DEFAULT_WORKER_CHANNEL_CAPACITY: usize = 1;

/// Runtime configuration for the orchestrator tick loop.
///
/// All instances must be constructed via [`OrchestratorConfig::builder`] or
/// [`OrchestratorConfig::new`] so invariants are validated before any consumer observes the
/// values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrchestratorConfig {
    app_name: String,
    tick_interval: Duration,
    startup_delay: Duration,
    shutdown_grace: Duration,
    offset_period: u64,
    allowed_lag: u64,
    check_threshold: u64,
    probe_timeout: Duration,
    await_acks: bool,
    worker_channel_capacity: usize,
}

pub struct OrchestratorConfigParams {
    pub app_name: String,
    pub tick_interval: Duration,
    pub startup_delay: Duration,
    pub shutdown_grace: Duration,
    pub offset_period: u64,
    pub allowed_lag: u64,
    pub check_threshold: u64,
    pub probe_timeout: Duration,
    pub await_acks: bool,
    pub worker_channel_capacity: usize,
}

impl OrchestratorConfig {
    /// Returns a builder to incrementally construct and validate a configuration.
    pub fn builder() -> OrchestratorConfigBuilder {
        OrchestratorConfigBuilder::default()
    }

    /// Constructs a configuration directly from the provided values.
    pub fn new(params: OrchestratorConfigParams) -> Result<Self> {
        let OrchestratorConfigParams {
            app_name,
            tick_interval,
            startup_delay,
            shutdown_grace,
            offset_period,
            allowed_lag,
            check_threshold,
            probe_timeout,
            await_acks,
            worker_channel_capacity,
        } = params;

        let config = Self {
            app_name: app_name.trim().to_owned(),
            tick_interval,
            startup_delay,
            shutdown_grace,
            offset_period,
            allowed_lag,
            check_threshold,
            probe_timeout,
            await_acks,
            worker_channel_capacity,
        };

        config.validate()?;
        Ok(config)
    }

    /// Name used in log lines and handed to collaborators (e.g. wallet echo).
    pub fn app_name(&self) -> &str {
        &self.app_name
    }

    /// Base period of the orchestrator timer.
    pub fn tick_interval(&self) -> Duration {
        self.tick_interval
    }

    /// Delay before the first tick so collaborators can finish initializing.
    pub fn startup_delay(&self) -> Duration {
        self.startup_delay
    }

    /// Upper bound spent waiting for workers to stop during shutdown.
    pub fn shutdown_grace(&self) -> Duration {
        self.shutdown_grace
    }

    /// Every `offset_period`-th tick runs the low-frequency offset action.
    pub fn offset_period(&self) -> u64 {
        self.offset_period
    }

    /// Number of blocks the indexer may trail the daemon and still count as synced.
    pub fn allowed_lag(&self) -> u64 {
        self.allowed_lag
    }

    /// Indexed contract count required before the indexer counts as checked.
    pub fn check_threshold(&self) -> u64 {
        self.check_threshold
    }

    /// Bound on each connectivity ping.
    pub fn probe_timeout(&self) -> Duration {
        self.probe_timeout
    }

    /// Whether a tick waits for every worker acknowledgment before the next tick.
    pub fn await_acks(&self) -> bool {
        self.await_acks
    }

    /// Buffered work signals per worker.
    pub fn worker_channel_capacity(&self) -> usize {
        self.worker_channel_capacity
    }

    /// Performs validation on an existing configuration instance.
    pub fn validate(&self) -> Result<()> {
        if self.app_name.is_empty() {
            bail!("app_name cannot be empty");
        }

        if self.tick_interval.is_zero() {
            bail!("tick_interval must be greater than 0");
        }

        if self.offset_period == 0 {
            bail!("offset_period must be greater than 0");
        }

        if self.check_threshold == 0 {
            bail!("check_threshold must be greater than 0");
        }

        if self.probe_timeout.is_zero() {
            bail!("probe_timeout must be greater than 0");
        }

        if self.probe_timeout > self.tick_interval {
            bail!(
                "probe_timeout ({:?}) must not exceed tick_interval ({:?})",
                self.probe_timeout,
                self.tick_interval
            );
        }

        if self.worker_channel_capacity == 0 {
            bail!("worker_channel_capacity must be greater than 0");
        }

        Ok(())
    }
}

#[derive(Debug, Default, Clone)]
pub struct OrchestratorConfigBuilder {
    app_name: Option<String>,
    tick_interval: Option<Duration>,
    startup_delay: Option<Duration>,
    shutdown_grace: Option<Duration>,
    offset_period: Option<u64>,
    allowed_lag: Option<u64>,
    check_threshold: Option<u64>,
    probe_timeout: Option<Duration>,
    await_acks: Option<bool>,
    worker_channel_capacity: Option<usize>,
}

impl OrchestratorConfigBuilder {
    pub fn app_name(mut self, name: impl Into<String>) -> Self {
        self.app_name = Some(name.into());
        self
    }

    pub fn tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = Some(interval);
        self
    }

    pub fn startup_delay(mut self, delay: Duration) -> Self {
        self.startup_delay = Some(delay);
        self
    }

    pub fn shutdown_grace(mut self, grace: Duration) -> Self {
        self.shutdown_grace = Some(grace);
        self
    }

    pub fn offset_period(mut self, period: u64) -> Self {
        self.offset_period = Some(period);
        self
    }

    pub fn allowed_lag(mut self, lag: u64) -> Self {
        self.allowed_lag = Some(lag);
        self
    }

    pub fn check_threshold(mut self, threshold: u64) -> Self {
        self.check_threshold = Some(threshold);
        self
    }

    pub fn probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = Some(timeout);
        self
    }

    pub fn await_acks(mut self, await_acks: bool) -> Self {
        self.await_acks = Some(await_acks);
        self
    }

    pub fn worker_channel_capacity(mut self, capacity: usize) -> Self {
        self.worker_channel_capacity = Some(capacity);
        self
    }

    pub fn build(self) -> Result<OrchestratorConfig> {
        let tick_interval = self
            .tick_interval
            .unwrap_or_else(|| Duration::from_secs(DEFAULT_TICK_INTERVAL_SECS));
        let params = OrchestratorConfigParams {
            app_name: self.app_name.context("app_name is required")?,
            tick_interval,
            startup_delay: self
                .startup_delay
                .unwrap_or_else(|| Duration::from_secs(DEFAULT_STARTUP_DELAY_SECS)),
            shutdown_grace: self
                .shutdown_grace
                .unwrap_or_else(|| Duration::from_secs(DEFAULT_SHUTDOWN_GRACE_SECS)),
            offset_period: self.offset_period.unwrap_or(DEFAULT_OFFSET_PERIOD),
            allowed_lag: self.allowed_lag.unwrap_or(DEFAULT_ALLOWED_LAG),
            check_threshold: self.check_threshold.unwrap_or(DEFAULT_CHECK_THRESHOLD),
            probe_timeout: self.probe_timeout.unwrap_or(tick_interval),
            await_acks: self.await_acks.unwrap_or(true),
            worker_channel_capacity: self
                .worker_channel_capacity
                .unwrap_or(DEFAULT_WORKER_CHANNEL_CAPACITY),
        };

        OrchestratorConfig::new(params)
    }
}
