use crate::processor::orchestrator::Orchestrator;
use crate::runtime::shutdown::{spawn_signal_listener, ShutdownReason, ShutdownTrigger};
use anyhow::{Context, Result};
use tokio::sync::watch;

/// Couples an [`Orchestrator`] with the OS interrupt listener so the process owner only
/// has to await one future.
pub struct Runner {
    orchestrator: Orchestrator,
    shutdown: ShutdownTrigger,
    done: watch::Receiver<bool>,
}

impl Runner {
    pub fn new(orchestrator: Orchestrator) -> Self {
        let shutdown = orchestrator.shutdown_trigger();
        let done = orchestrator.done_signal();
        Self {
            orchestrator,
            shutdown,
            done,
        }
    }

    /// Returns the shutdown handle so a host window can route its close request into the
    /// same teardown path as SIGINT/SIGTERM.
    pub fn shutdown_trigger(&self) -> ShutdownTrigger {
        self.shutdown.clone()
    }

    /// Receiver that flips to `true` once teardown may proceed.
    pub fn done_signal(&self) -> watch::Receiver<bool> {
        self.done.clone()
    }

    pub fn orchestrator_mut(&mut self) -> &mut Orchestrator {
        &mut self.orchestrator
    }

    /// Runs the orchestrator until SIGINT/SIGTERM or any shutdown request, then waits for
    /// the signal listener to exit.
    pub async fn run_until_shutdown(self) -> Result<()> {
        let listener = spawn_signal_listener(self.shutdown.clone());
        tracing::info!("runner started; waiting for interrupt or window close to initiate shutdown");

        let result = self.orchestrator.run().await;

        self.shutdown.request(ShutdownReason::Requested);
        listener.await.context("signal listener task failed")?;
        result
    }
}
