//! Shutdown entry point shared by the window-close intercept and the OS
//! interrupt listener. Both paths cancel the same token, so the orchestrator
//! runs one identical teardown sequence whichever fires first.

use anyhow::{Context, Result};
use std::fmt;
use std::sync::{Arc, OnceLock};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownReason {
    /// The host window intercepted a close request.
    WindowClose,
    /// SIGINT / SIGTERM (or Ctrl-C on platforms without signals).
    Interrupt,
    /// Programmatic stop, e.g. from an embedding application.
    Requested,
}

impl fmt::Display for ShutdownReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ShutdownReason::WindowClose => "window close",
            ShutdownReason::Interrupt => "interrupt signal",
            ShutdownReason::Requested => "stop requested",
        };
        f.write_str(label)
    }
}

/// Cloneable handle used to request orchestrator shutdown. Requests are idempotent;
/// the first reason wins.
#[derive(Debug, Clone, Default)]
pub struct ShutdownTrigger {
    token: CancellationToken,
    reason: Arc<OnceLock<ShutdownReason>>,
}

impl ShutdownTrigger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests shutdown. Returns `true` only for the request that initiated it.
    pub fn request(&self, reason: ShutdownReason) -> bool {
        let first = self.reason.set(reason).is_ok();
        if first {
            tracing::info!(%reason, "shutdown requested");
        } else {
            tracing::debug!(%reason, "shutdown already requested");
        }
        self.token.cancel();
        first
    }

    pub fn is_requested(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn reason(&self) -> Option<ShutdownReason> {
        self.reason.get().copied()
    }

    /// Resolves once shutdown has been requested through any path.
    pub async fn requested(&self) -> ShutdownReason {
        self.token.cancelled().await;
        self.reason().unwrap_or(ShutdownReason::Requested)
    }

    pub(crate) fn token(&self) -> CancellationToken {
        self.token.clone()
    }
}

/// Spawns a task that converts SIGINT/SIGTERM into a shutdown request. The task exits
/// on its own once shutdown is requested through another path.
pub fn spawn_signal_listener(trigger: ShutdownTrigger) -> JoinHandle<()> {
    tokio::spawn(async move {
        let token = trigger.token();
        tokio::select! {
            _ = token.cancelled() => {
                tracing::debug!("signal listener exiting; shutdown already requested");
            }
            result = wait_for_os_signal() => {
                match result {
                    Ok(()) => {
                        trigger.request(ShutdownReason::Interrupt);
                    }
                    Err(err) => {
                        tracing::warn!(error = %err, "failed to listen for OS signals");
                    }
                }
            }
        }
    })
}

#[cfg(unix)]
async fn wait_for_os_signal() -> Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate =
        signal(SignalKind::terminate()).context("failed to install SIGTERM handler")?;

    tokio::select! {
        result = tokio::signal::ctrl_c() => result.context("failed to listen for SIGINT"),
        _ = terminate.recv() => Ok(()),
    }
}

#[cfg(not(unix))]
async fn wait_for_os_signal() -> Result<()> {
    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for Ctrl-C")
}
