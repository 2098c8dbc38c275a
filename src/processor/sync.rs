//! Synced/checked tracking for the contract indexer.
//!
//! The `(synced, checked)` pair is modelled as a three-phase state machine so
//! every reset condition lives in [`SyncPhase::next`]:
//!
//! | heights within lag | indexer running | count >= threshold | next phase |
//! |--------------------|-----------------|--------------------|------------|
//! | no                 | any             | any                | `Behind`   |
//! | yes                | no              | any                | `Synced`   |
//! | yes                | yes             | no                 | `Synced`, or `Checked` if already checked |
//! | yes                | yes             | yes                | `Checked`  |
//!
//! A disconnect moves to `Behind` through [`SyncTracker::reset`].

/// Derived sync status of the indexer for one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncState {
    pub local_height: u64,
    pub remote_height: u64,
    pub indexed_count: u64,
    pub synced: bool,
    pub checked: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SyncPhase {
    /// Disconnected, or the indexer trails the chain by more than the allowed lag.
    #[default]
    Behind,
    /// Within the allowed lag but not (or no longer) checked.
    Synced,
    /// Within the allowed lag with enough contracts indexed while running. Sticky until reset.
    Checked,
}

impl SyncPhase {
    pub fn next(self, within_lag: bool, indexer_running: bool, threshold_met: bool) -> Self {
        match (within_lag, indexer_running, threshold_met) {
            (false, _, _) => SyncPhase::Behind,
            (true, false, _) => SyncPhase::Synced,
            (true, true, true) => SyncPhase::Checked,
            (true, true, false) => match self {
                SyncPhase::Checked => SyncPhase::Checked,
                _ => SyncPhase::Synced,
            },
        }
    }

    pub fn synced(self) -> bool {
        matches!(self, SyncPhase::Synced | SyncPhase::Checked)
    }

    pub fn checked(self) -> bool {
        matches!(self, SyncPhase::Checked)
    }
}

/// Compares the indexer's height against the daemon's and tracks the sticky `checked` flag.
#[derive(Debug, Clone)]
pub struct SyncTracker {
    allowed_lag: u64,
    check_threshold: u64,
    phase: SyncPhase,
    state: SyncState,
}

impl SyncTracker {
    pub fn new(allowed_lag: u64, check_threshold: u64) -> Self {
        Self {
            allowed_lag,
            check_threshold,
            phase: SyncPhase::Behind,
            state: SyncState::default(),
        }
    }

    pub fn phase(&self) -> SyncPhase {
        self.phase
    }

    pub fn state(&self) -> SyncState {
        self.state
    }

    /// Recomputes the state from fresh indexer metrics. A remote height below the local
    /// height (reorg) counts as synced.
    pub fn update(
        &mut self,
        local_height: u64,
        remote_height: u64,
        indexed_count: u64,
        indexer_running: bool,
    ) -> SyncState {
        let within_lag = local_height >= remote_height.saturating_sub(self.allowed_lag);
        let threshold_met = indexed_count >= self.check_threshold;
        let next = self.phase.next(within_lag, indexer_running, threshold_met);

        if next != self.phase {
            tracing::debug!(
                from = ?self.phase,
                to = ?next,
                local_height,
                remote_height,
                indexed_count,
                "sync phase changed"
            );
        }

        self.phase = next;
        self.state = SyncState {
            local_height,
            remote_height,
            indexed_count,
            synced: next.synced(),
            checked: next.checked(),
        };
        self.state
    }

    /// Clears `synced` and `checked`, e.g. after the daemon disconnects. Heights are kept
    /// so displays keep their last known values.
    pub fn reset(&mut self) -> SyncState {
        if self.phase != SyncPhase::Behind {
            tracing::info!(from = ?self.phase, "sync state reset");
        }
        self.phase = SyncPhase::Behind;
        self.state.synced = false;
        self.state.checked = false;
        self.state
    }
}
