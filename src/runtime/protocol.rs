use crate::processor::tick::TickContext;
use anyhow::Error as AnyError;
use core::future::Future;
use core::pin::Pin;

pub type ProtocolFuture<'a> = Pin<Box<dyn Future<Output = Result<(), ProtocolError>> + Send + 'a>>;

/// Enumerates the execution stages of the [`AppProtocol`] hooks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolStage {
    Initialize,
    Work,
    Disconnected,
    Finalize,
}

/// Error surfaced by protocol hooks. Hook failures are logged and never stop the worker.
#[derive(Debug)]
pub struct ProtocolError {
    stage: ProtocolStage,
    source: AnyError,
}

impl ProtocolError {
    pub fn new(stage: ProtocolStage, source: AnyError) -> Self {
        Self { stage, source }
    }

    pub fn stage(&self) -> ProtocolStage {
        self.stage
    }

    pub fn into_source(self) -> AnyError {
        self.source
    }
}

impl core::fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{:?} protocol error: {}", self.stage, self.source)
    }
}

impl std::error::Error for ProtocolError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(self.source.as_ref())
    }
}

/// Application-specific work driven by a [`crate::worker::WorkerTask`].
pub trait AppProtocol: Send + 'static {
    /// Runs once before the worker starts waiting for work signals.
    fn initialize<'a>(&'a mut self) -> ProtocolFuture<'a> {
        Box::pin(async { Ok(()) })
    }

    /// One unit of work for a tick where both daemon and wallet are connected.
    fn work<'a>(&'a mut self, context: &'a TickContext) -> ProtocolFuture<'a>;

    /// Reset bookkeeping for a tick where either endpoint is disconnected.
    fn on_disconnected<'a>(&'a mut self, context: &'a TickContext) -> ProtocolFuture<'a>;

    /// Called exactly once when the worker stops (e.g. emit a completion notification).
    fn finalize<'a>(&'a mut self) -> ProtocolFuture<'a>;
}
