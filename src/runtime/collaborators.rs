//! Narrow interfaces the orchestrator calls into. Implementations live outside
//! this crate (UI widgets, wallet/daemon clients, the indexer); the only
//! in-crate connectivity source is [`crate::rpc::RpcConnectivity`].

use anyhow::Result;
use futures::future::BoxFuture;
use std::sync::Arc;

/// Fire-and-forget status displays. Calls must return promptly and never block the tick.
pub trait StatusSink: Send + Sync {
    fn set_ready(&self, ready: bool);

    fn set_synced(&self, synced: bool);

    fn set_checked(&self, checked: bool);

    fn refresh_balance_display(&self);

    fn update_height_displays(&self, local: u64, remote: u64, indexed_count: u64);
}

/// Liveness of the daemon and wallet services.
///
/// `ping_*` refreshes the connection flag reported by `is_*_connected`; an `Err` means the
/// endpoint is unreachable and is treated as disconnected by the probe.
pub trait ConnectivitySource: Send + Sync {
    fn ping_daemon(&self) -> BoxFuture<'_, Result<()>>;

    fn ping_wallet(&self) -> BoxFuture<'_, Result<()>>;

    fn is_daemon_connected(&self) -> bool;

    fn is_wallet_connected(&self) -> bool;

    /// Refreshes cached wallet balances. Only invoked while the wallet is connected.
    fn refresh_balance(&self) -> BoxFuture<'_, Result<()>> {
        Box::pin(async { Ok(()) })
    }

    /// Currently configured daemon endpoint, used to detect endpoint changes between ticks.
    fn daemon_endpoint(&self) -> String;
}

/// Control surface of the contract indexer.
pub trait IndexerControl: Send + Sync {
    fn is_initialized(&self) -> bool;

    fn is_running(&self) -> bool;

    fn indexed_contract_count(&self) -> u64;

    fn last_indexed_height(&self) -> u64;

    fn chain_height(&self) -> u64;

    /// Points the indexer at a new upstream daemon endpoint.
    fn set_endpoint(&self, endpoint: &str);

    fn stop(&self);
}

/// Persists external state (skin, daemon endpoint, ...) before teardown.
pub trait StatePersister: Send + Sync {
    fn persist(&self) -> Result<()>;
}

/// Persister for applications without state to save.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopPersister;

impl StatePersister for NoopPersister {
    fn persist(&self) -> Result<()> {
        Ok(())
    }
}

/// The set of collaborators an orchestrator drives each tick.
#[derive(Clone)]
pub struct Collaborators {
    pub status: Arc<dyn StatusSink>,
    pub connectivity: Arc<dyn ConnectivitySource>,
    pub indexer: Arc<dyn IndexerControl>,
    pub persister: Arc<dyn StatePersister>,
}

impl Collaborators {
    pub fn new(
        status: Arc<dyn StatusSink>,
        connectivity: Arc<dyn ConnectivitySource>,
        indexer: Arc<dyn IndexerControl>,
    ) -> Self {
        Self {
            status,
            connectivity,
            indexer,
            persister: Arc::new(NoopPersister),
        }
    }

    pub fn with_persister(mut self, persister: Arc<dyn StatePersister>) -> Self {
        self.persister = persister;
        self
    }
}
