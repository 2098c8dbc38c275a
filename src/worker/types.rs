use crate::processor::tick::TickContext;
use std::any::Any;
use tokio::sync::{mpsc, oneshot};

/// "Do a unit of work now". Carries the tick snapshot and the one-shot channel the
/// worker must answer on; consuming the sender makes a duplicate acknowledgment impossible.
#[derive(Debug)]
pub struct WorkSignal {
    pub context: TickContext,
    pub ack: oneshot::Sender<WorkAck>,
}

impl WorkSignal {
    pub fn new(context: TickContext) -> (Self, WorkAckReceiver) {
        let (ack, rx) = oneshot::channel();
        (Self { context, ack }, rx)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkOutcome {
    /// The work body ran to completion.
    Completed,
    /// An endpoint was disconnected; only the reset hook ran.
    Disconnected,
    /// The hook returned an error or panicked.
    Failed,
}

/// "Unit of work finished".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkAck {
    pub worker_id: usize,
    pub tick: u64,
    pub outcome: WorkOutcome,
}

pub type WorkSender = mpsc::Sender<WorkSignal>;
pub type WorkReceiver = mpsc::Receiver<WorkSignal>;
pub type WorkAckReceiver = oneshot::Receiver<WorkAck>;

pub fn work_channel(capacity: usize) -> (WorkSender, WorkReceiver) {
    mpsc::channel(capacity.max(1))
}

pub(crate) fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
