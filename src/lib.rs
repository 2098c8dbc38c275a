pub mod loader;
pub mod probe;
pub mod processor;
pub mod rpc;
pub mod runtime;
pub mod worker;

pub use loader::{EntryPoint, LoadError, ModuleExports, ModuleLoader, ModulePath, ModuleRegistry};
pub use probe::{ConnectionProbe, ConnectionState};
pub use processor::orchestrator::Orchestrator;
pub use processor::sync::{SyncPhase, SyncState, SyncTracker};
pub use processor::tick::{OffsetCounter, TickContext};
pub use rpc::{RpcClientOptions, RpcConnectivity, RpcEndpointConfig, RpcError, WalletBalance};
pub use runtime::collaborators::{
    Collaborators, ConnectivitySource, IndexerControl, NoopPersister, StatePersister, StatusSink,
};
pub use runtime::config::{
    OrchestratorConfig, OrchestratorConfigBuilder, OrchestratorConfigParams,
};
pub use runtime::protocol::{AppProtocol, ProtocolError, ProtocolFuture, ProtocolStage};
pub use runtime::runner::Runner;
pub use runtime::shutdown::{spawn_signal_listener, ShutdownReason, ShutdownTrigger};
pub use runtime::telemetry::{init_tracing, Telemetry, TelemetrySnapshot};
pub use worker::{WorkAck, WorkOutcome, WorkerState, WorkerTask};
