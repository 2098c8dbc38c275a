//! Tick processing: sync evaluation, per-tick context, worker pool plumbing, and the
//! orchestrator that ties them together.

pub mod orchestrator;
pub mod sync;
pub mod tick;
pub(crate) mod worker_pool;
