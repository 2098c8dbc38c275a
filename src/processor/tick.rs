use crate::probe::ConnectionState;
use crate::processor::sync::SyncState;

/// Immutable snapshot of orchestrator state handed to workers with every work signal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickContext {
    pub tick: u64,
    pub connection: ConnectionState,
    pub sync: SyncState,
    pub ready: bool,
    /// Set on every `offset_period`-th tick for low-frequency work.
    pub offset_due: bool,
}

/// Decimates the base tick: [`OffsetCounter::advance`] returns `true` once every `period` calls.
#[derive(Debug, Clone)]
pub struct OffsetCounter {
    period: u64,
    offset: u64,
}

impl OffsetCounter {
    pub fn new(period: u64) -> Self {
        Self {
            period: period.max(1),
            offset: 0,
        }
    }

    pub fn advance(&mut self) -> bool {
        self.offset += 1;
        if self.offset % self.period == 0 {
            self.offset = 0;
            return true;
        }
        false
    }
}
