//! Worker pool orchestration for the `Orchestrator`.
//!
//! This module owns worker creation, work-signal fan-out, acknowledgment
//! collection, the close broadcast, and the bounded wait for workers to stop.

use crate::processor::tick::TickContext;
use crate::runtime::protocol::AppProtocol;
use crate::runtime::telemetry::Telemetry;
use crate::worker::{
    panic_message, work_channel, WorkAckReceiver, WorkSender, WorkSignal, WorkerTask,
};
use futures::future::join_all;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

struct WorkerSlot {
    id: usize,
    work_tx: WorkSender,
    handle: JoinHandle<()>,
}

/// Acknowledgment still owed by a worker for a dispatched work signal.
pub(crate) struct PendingAck {
    worker_id: usize,
    tick: u64,
    rx: WorkAckReceiver,
}

pub(crate) struct WorkerPool {
    channel_capacity: usize,
    close: CancellationToken,
    telemetry: Arc<Telemetry>,
    workers: Vec<WorkerSlot>,
    running_tx: Arc<watch::Sender<usize>>,
}

impl WorkerPool {
    pub(crate) fn new(channel_capacity: usize, telemetry: Arc<Telemetry>) -> Self {
        let (running_tx, _) = watch::channel(0);
        Self {
            channel_capacity,
            close: CancellationToken::new(),
            telemetry,
            workers: Vec::new(),
            running_tx: Arc::new(running_tx),
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.workers.len()
    }

    pub(crate) fn running(&self) -> usize {
        *self.running_tx.borrow()
    }

    pub(crate) fn spawn<P: AppProtocol>(&mut self, protocol: P) -> usize {
        let worker_id = self.workers.len();
        let (work_tx, work_rx) = work_channel(self.channel_capacity);
        let task = WorkerTask::new(worker_id, protocol, work_rx, self.close.clone());

        self.running_tx.send_modify(|running| *running += 1);
        let running_tx = Arc::clone(&self.running_tx);

        let handle = tokio::spawn(async move {
            let result = AssertUnwindSafe(task.run()).catch_unwind().await;

            match result {
                Ok(Ok(_)) => {}
                Ok(Err(err)) => {
                    tracing::error!(
                        worker = worker_id,
                        error = %err,
                        "worker task exited with error"
                    );
                }
                Err(panic_payload) => {
                    tracing::error!(
                        worker = worker_id,
                        panic = %panic_message(panic_payload.as_ref()),
                        "worker task panicked"
                    );
                }
            }

            running_tx.send_modify(|running| *running = running.saturating_sub(1));
        });

        self.workers.push(WorkerSlot {
            id: worker_id,
            work_tx,
            handle,
        });
        worker_id
    }

    /// Sends one work signal per worker. A worker whose queue is still full from earlier
    /// ticks is skipped so no worker ever holds more than `channel_capacity` signals.
    pub(crate) fn dispatch(&self, context: &TickContext) -> Vec<PendingAck> {
        let mut pending = Vec::with_capacity(self.workers.len());

        for slot in &self.workers {
            let (signal, rx) = WorkSignal::new(*context);
            match slot.work_tx.try_send(signal) {
                Ok(()) => pending.push(PendingAck {
                    worker_id: slot.id,
                    tick: context.tick,
                    rx,
                }),
                Err(TrySendError::Full(_)) => {
                    self.telemetry.record_skipped_dispatch();
                    tracing::debug!(
                        worker = slot.id,
                        tick = context.tick,
                        "worker busy; skipping work signal"
                    );
                }
                Err(TrySendError::Closed(_)) => {
                    tracing::debug!(
                        worker = slot.id,
                        tick = context.tick,
                        "worker stopped; skipping work signal"
                    );
                }
            }
        }

        pending
    }

    /// Broadcasts the close signal to every worker. Idempotent.
    pub(crate) fn close(&self) {
        if !self.close.is_cancelled() {
            tracing::info!(workers = self.workers.len(), "broadcasting close signal");
        }
        self.close.cancel();
    }

    /// Waits up to `grace` for all workers to stop. Returns `false` if some worker is still
    /// running when the grace period expires; such workers are detached.
    pub(crate) async fn wait_for_workers(&mut self, grace: Duration) -> bool {
        let mut running_rx = self.running_tx.subscribe();
        let stopped = matches!(
            timeout(grace, running_rx.wait_for(|running| *running == 0)).await,
            Ok(Ok(_))
        );

        let workers = std::mem::take(&mut self.workers);
        if !stopped {
            self.telemetry.record_hung_shutdown();
            tracing::warn!(
                running = self.running(),
                grace_ms = grace.as_millis() as u64,
                "workers still running after grace period; continuing teardown"
            );
            return false;
        }

        for slot in workers {
            if let Err(err) = slot.handle.await {
                tracing::warn!(worker = slot.id, error = %err, "worker task join failed");
            }
        }
        true
    }
}

/// Awaits every pending acknowledgment and records its outcome.
pub(crate) async fn collect_acks(pending: Vec<PendingAck>, telemetry: &Telemetry) {
    let results = join_all(pending.into_iter().map(|ack| async move {
        let PendingAck {
            worker_id,
            tick,
            rx,
        } = ack;
        (worker_id, tick, rx.await)
    }))
    .await;

    for (worker_id, tick, result) in results {
        match result {
            Ok(ack) => telemetry.record_ack(ack.outcome),
            Err(_) => {
                telemetry.record_missed_ack();
                tracing::warn!(
                    worker = worker_id,
                    tick,
                    "worker dropped work signal without acknowledging"
                );
            }
        }
    }
}
