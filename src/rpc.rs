//! JSON-RPC connectivity for a daemon and wallet pair: authentication,
//! transport options, and the `ConnectivitySource` implementation.

pub mod auth;
pub mod client;
pub mod options;

pub use client::{RpcConnectivity, RpcError, WalletBalance};
pub use options::{RpcClientOptions, RpcEndpointConfig};
