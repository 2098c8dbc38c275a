use crate::processor::tick::TickContext;
use crate::runtime::protocol::{AppProtocol, ProtocolError, ProtocolStage};
use anyhow::Result;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use tokio_util::sync::CancellationToken;

use super::types::{panic_message, WorkAck, WorkOutcome, WorkReceiver, WorkSignal};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Idle,
    Working,
    Stopped,
}

/// Long-lived task that runs one [`AppProtocol`] unit of work per received work signal.
///
/// The close signal is only observed while idle, so an in-flight unit of work always
/// finishes and acknowledges before the task stops.
pub struct WorkerTask<P: AppProtocol> {
    pub id: usize,
    protocol: P,
    work_rx: WorkReceiver,
    close: CancellationToken,
    state: WorkerState,
}

impl<P: AppProtocol> WorkerTask<P> {
    pub fn new(id: usize, protocol: P, work_rx: WorkReceiver, close: CancellationToken) -> Self {
        Self {
            id,
            protocol,
            work_rx,
            close,
            state: WorkerState::Idle,
        }
    }

    pub fn state(&self) -> WorkerState {
        self.state
    }

    /// Runs until the close signal fires. A worker whose senders are all dropped idles
    /// until then. Returns the protocol so owners can inspect it after shutdown.
    #[tracing::instrument(name = "worker", skip_all, fields(worker = self.id))]
    pub async fn run(mut self) -> Result<P> {
        tracing::info!(worker = self.id, "worker task started");

        if let Err(err) = self.protocol.initialize().await {
            tracing::warn!(worker = self.id, error = %err, "worker initialization failed");
        }

        loop {
            self.transition(WorkerState::Idle);

            let signal = tokio::select! {
                biased;
                _ = self.close.cancelled() => {
                    tracing::debug!(worker = self.id, "close signal received");
                    break;
                }
                signal = self.work_rx.recv() => match signal {
                    Some(signal) => signal,
                    None => {
                        tracing::debug!(worker = self.id, "work channel closed; waiting for close signal");
                        self.close.cancelled().await;
                        break;
                    }
                },
            };

            self.transition(WorkerState::Working);
            self.handle(signal).await;
        }

        self.transition(WorkerState::Stopped);
        if let Err(err) = self.protocol.finalize().await {
            tracing::warn!(worker = self.id, error = %err, "worker finalization failed");
        }
        tracing::info!(worker = self.id, "worker task stopped");

        Ok(self.protocol)
    }

    async fn handle(&mut self, signal: WorkSignal) {
        let WorkSignal { context, ack } = signal;
        let outcome = self.perform(&context).await;

        let ack_message = WorkAck {
            worker_id: self.id,
            tick: context.tick,
            outcome,
        };
        if ack.send(ack_message).is_err() {
            tracing::debug!(
                worker = self.id,
                tick = context.tick,
                "acknowledgment receiver dropped"
            );
        }
    }

    async fn perform(&mut self, context: &TickContext) -> WorkOutcome {
        let (stage, hook) = if context.connection.is_connected() {
            (ProtocolStage::Work, self.protocol.work(context))
        } else {
            (
                ProtocolStage::Disconnected,
                self.protocol.on_disconnected(context),
            )
        };

        match AssertUnwindSafe(hook).catch_unwind().await {
            Ok(Ok(())) if stage == ProtocolStage::Work => WorkOutcome::Completed,
            Ok(Ok(())) => WorkOutcome::Disconnected,
            Ok(Err(err)) => {
                log_hook_error(self.id, context.tick, &err);
                WorkOutcome::Failed
            }
            Err(panic_payload) => {
                tracing::error!(
                    worker = self.id,
                    tick = context.tick,
                    stage = ?stage,
                    panic = %panic_message(panic_payload.as_ref()),
                    "worker hook panicked"
                );
                WorkOutcome::Failed
            }
        }
    }

    fn transition(&mut self, next: WorkerState) {
        if self.state != next {
            tracing::trace!(worker = self.id, from = ?self.state, to = ?next, "worker state");
            self.state = next;
        }
    }
}

fn log_hook_error(worker: usize, tick: u64, err: &ProtocolError) {
    tracing::warn!(
        worker,
        tick,
        stage = ?err.stage(),
        error = %err,
        "worker hook failed"
    );
}
