//! Connectivity probing for the daemon and wallet endpoints.

use crate::runtime::collaborators::ConnectivitySource;
use crate::runtime::telemetry::Telemetry;
use anyhow::{anyhow, Result};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{timeout_at, Instant};

/// Point-in-time connectivity of both endpoints.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConnectionState {
    pub daemon_connected: bool,
    pub wallet_connected: bool,
}

impl ConnectionState {
    /// Both endpoints are reachable.
    pub fn is_connected(&self) -> bool {
        self.daemon_connected && self.wallet_connected
    }
}

/// Runs the per-tick liveness checks. Connectivity loss is an expected condition: a
/// failed or slow check only clears the matching flag.
pub struct ConnectionProbe {
    source: Arc<dyn ConnectivitySource>,
    timeout: Duration,
    telemetry: Arc<Telemetry>,
}

impl ConnectionProbe {
    pub fn new(
        source: Arc<dyn ConnectivitySource>,
        timeout: Duration,
        telemetry: Arc<Telemetry>,
    ) -> Self {
        Self {
            source,
            timeout,
            telemetry,
        }
    }

    /// Pings both endpoints and, if the wallet answered, refreshes its balance. All three
    /// calls share one deadline of `timeout`, so a probe never outlasts a tick.
    pub async fn probe(&self) -> ConnectionState {
        let deadline = Instant::now() + self.timeout;
        let (daemon, wallet) = tokio::join!(
            self.bounded("daemon", deadline, self.source.ping_daemon()),
            self.bounded("wallet", deadline, self.source.ping_wallet()),
        );

        for (check, result) in [("daemon", &daemon), ("wallet", &wallet)] {
            if let Err(err) = result {
                self.telemetry.record_probe_failure();
                tracing::debug!(check, error = %err, "connectivity check failed");
            }
        }

        let state = ConnectionState {
            daemon_connected: daemon.is_ok() && self.source.is_daemon_connected(),
            wallet_connected: wallet.is_ok() && self.source.is_wallet_connected(),
        };

        if state.wallet_connected {
            if let Err(err) = self
                .bounded("balance", deadline, self.source.refresh_balance())
                .await
            {
                self.telemetry.record_balance_refresh_failure();
                tracing::debug!(error = %err, "balance refresh failed");
            }
        }

        state
    }

    async fn bounded<F>(&self, check: &'static str, deadline: Instant, operation: F) -> Result<()>
    where
        F: Future<Output = Result<()>>,
    {
        match timeout_at(deadline, operation).await {
            Ok(result) => result,
            Err(_) => Err(anyhow!(
                "{check} check exceeded the {}ms probe budget",
                self.timeout.as_millis()
            )),
        }
    }
}
