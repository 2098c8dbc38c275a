//! Worker module split across focused submodules:
//! - `types`: work/ack signal types and channel aliases
//! - `process`: the `WorkerTask` state machine
//! - `tests`: worker unit tests

mod process;
mod types;


pub use process::{WorkerState, WorkerTask};
pub(crate) use types::panic_message;
pub use types::{
    work_channel, WorkAck, WorkAckReceiver, WorkOutcome, WorkReceiver, WorkSender, WorkSignal,
};
