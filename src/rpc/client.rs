//! `ConnectivitySource` backed by JSON-RPC over HTTP: a daemon answering `DERO.Ping`
//! and a wallet answering `Echo` and `GetBalance`.

use crate::rpc::auth::build_auth_headers;
use crate::rpc::options::{RpcClientOptions, RpcEndpointConfig};
use crate::runtime::collaborators::ConnectivitySource;
use anyhow::{anyhow, Result};
use futures::future::BoxFuture;
use jsonrpsee::core::client::ClientT;
use jsonrpsee::core::params::ArrayParams;
use jsonrpsee::http_client::{HttpClient, HttpClientBuilder};
use jsonrpsee::rpc_params;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use tokio::time::timeout;

pub const DAEMON_PING_METHOD: &str = "DERO.Ping";
pub const WALLET_ECHO_METHOD: &str = "Echo";
pub const WALLET_BALANCE_METHOD: &str = "GetBalance";

const PONG: &str = "Pong";

#[derive(Debug, thiserror::Error)]
pub enum RpcError {
    #[error("rpc method {method} timed out")]
    Timeout { method: &'static str },
    #[error("rpc method {method} returned unexpected reply {reply:?}")]
    UnexpectedReply { method: &'static str, reply: String },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct WalletBalance {
    pub balance: u64,
    pub unlocked_balance: u64,
}

#[derive(Debug, Clone)]
struct Endpoint {
    url: String,
    client: Arc<HttpClient>,
}

impl Endpoint {
    fn connect(config: &RpcEndpointConfig, options: &RpcClientOptions) -> Result<Self> {
        config.validate()?;
        let headers = build_auth_headers(&config.user, &config.password)?;

        let client = HttpClientBuilder::default()
            .set_headers(headers)
            .request_timeout(options.request_timeout)
            .max_concurrent_requests(options.max_concurrent_requests)
            .build(&config.url)
            .map_err(|err| anyhow!("failed to build RPC client for {}: {err}", config.url))?;

        Ok(Self {
            url: config.url.clone(),
            client: Arc::new(client),
        })
    }
}

/// Tracks daemon and wallet liveness for the connection probe.
///
/// Connection flags are refreshed by every ping; the daemon endpoint can be swapped at
/// runtime and is reported through [`ConnectivitySource::daemon_endpoint`].
pub struct RpcConnectivity {
    app_name: String,
    options: RpcClientOptions,
    daemon: RwLock<Endpoint>,
    wallet: Endpoint,
    daemon_connected: AtomicBool,
    wallet_connected: AtomicBool,
    balance: AtomicU64,
    unlocked_balance: AtomicU64,
}

impl RpcConnectivity {
    pub fn new(
        app_name: impl Into<String>,
        daemon: RpcEndpointConfig,
        wallet: RpcEndpointConfig,
    ) -> Result<Self> {
        Self::with_options(app_name, daemon, wallet, RpcClientOptions::default())
    }

    pub fn with_options(
        app_name: impl Into<String>,
        daemon: RpcEndpointConfig,
        wallet: RpcEndpointConfig,
        options: RpcClientOptions,
    ) -> Result<Self> {
        options.validate()?;
        let daemon = Endpoint::connect(&daemon, &options)?;
        let wallet = Endpoint::connect(&wallet, &options)?;

        Ok(Self {
            app_name: app_name.into(),
            options,
            daemon: RwLock::new(daemon),
            wallet,
            daemon_connected: AtomicBool::new(false),
            wallet_connected: AtomicBool::new(false),
            balance: AtomicU64::new(0),
            unlocked_balance: AtomicU64::new(0),
        })
    }

    /// Points the daemon client at a new endpoint. The connected flag is cleared until
    /// the next successful ping.
    pub fn set_daemon_endpoint(&self, config: RpcEndpointConfig) -> Result<()> {
        let endpoint = Endpoint::connect(&config, &self.options)?;
        tracing::info!(endpoint = %endpoint.url, "daemon endpoint replaced");

        let mut guard = self
            .daemon
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = endpoint;
        self.daemon_connected.store(false, Ordering::SeqCst);
        Ok(())
    }

    pub fn wallet_endpoint(&self) -> &str {
        &self.wallet.url
    }

    /// Last balance reported by the wallet.
    pub fn balance(&self) -> WalletBalance {
        WalletBalance {
            balance: self.balance.load(Ordering::Relaxed),
            unlocked_balance: self.unlocked_balance.load(Ordering::Relaxed),
        }
    }

    fn daemon(&self) -> Endpoint {
        self.daemon
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    async fn call<R: DeserializeOwned>(
        &self,
        endpoint: &Endpoint,
        method: &'static str,
        params: ArrayParams,
    ) -> Result<R> {
        timeout(
            self.options.request_timeout,
            endpoint.client.request(method, params),
        )
        .await
        .map_err(|_| RpcError::Timeout { method })?
        .map_err(|err| anyhow!("rpc {method} call to {} failed: {err}", endpoint.url))
    }

    async fn ping_daemon_once(&self) -> Result<()> {
        let endpoint = self.daemon();
        let reply: String = self
            .call(&endpoint, DAEMON_PING_METHOD, rpc_params![])
            .await?;
        if !reply.trim().starts_with(PONG) {
            return Err(RpcError::UnexpectedReply {
                method: DAEMON_PING_METHOD,
                reply,
            }
            .into());
        }
        Ok(())
    }

    async fn echo_wallet_once(&self) -> Result<()> {
        let reply: String = self
            .call(
                &self.wallet,
                WALLET_ECHO_METHOD,
                rpc_params!["Hello", "World", "from", self.app_name.as_str()],
            )
            .await?;
        tracing::trace!(reply = %reply, "wallet echo");
        Ok(())
    }
}

impl ConnectivitySource for RpcConnectivity {
    fn ping_daemon(&self) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            let result = self.ping_daemon_once().await;
            self.daemon_connected.store(result.is_ok(), Ordering::SeqCst);
            result
        })
    }

    fn ping_wallet(&self) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            let result = self.echo_wallet_once().await;
            self.wallet_connected.store(result.is_ok(), Ordering::SeqCst);
            result
        })
    }

    fn is_daemon_connected(&self) -> bool {
        self.daemon_connected.load(Ordering::SeqCst)
    }

    fn is_wallet_connected(&self) -> bool {
        self.wallet_connected.load(Ordering::SeqCst)
    }

    fn refresh_balance(&self) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            let reply: WalletBalance = self
                .call(&self.wallet, WALLET_BALANCE_METHOD, rpc_params![])
                .await?;
            self.balance.store(reply.balance, Ordering::Relaxed);
            self.unlocked_balance
                .store(reply.unlocked_balance, Ordering::Relaxed);
            tracing::debug!(
                balance = reply.balance,
                unlocked = reply.unlocked_balance,
                "wallet balance refreshed"
            );
            Ok(())
        })
    }

    fn daemon_endpoint(&self) -> String {
        self.daemon().url
    }
}
