//! Endpoint and transport settings for the RPC connectivity source.

use anyhow::{bail, Result};
use std::time::Duration;

const DEFAULT_MAX_CONCURRENT_REQUESTS: usize = 8;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 3;

#[derive(Debug, Clone)]
pub struct RpcClientOptions {
    pub request_timeout: Duration,
    pub max_concurrent_requests: usize,
}

impl Default for RpcClientOptions {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            max_concurrent_requests: DEFAULT_MAX_CONCURRENT_REQUESTS,
        }
    }
}

impl RpcClientOptions {
    pub(crate) fn validate(&self) -> Result<()> {
        if self.request_timeout.is_zero() {
            bail!("request_timeout must be greater than 0");
        }
        if self.max_concurrent_requests == 0 {
            bail!("max_concurrent_requests must be greater than 0");
        }
        Ok(())
    }
}

/// Address and credentials of one JSON-RPC endpoint. Empty credentials disable basic auth.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RpcEndpointConfig {
    pub url: String,
    pub user: String,
    pub password: String,
}

impl RpcEndpointConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into().trim().to_string(),
            user: String::new(),
            password: String::new(),
        }
    }

    pub fn with_credentials(mut self, user: impl Into<String>, password: impl Into<String>) -> Self {
        self.user = user.into();
        self.password = password.into();
        self
    }

    pub(crate) fn validate(&self) -> Result<()> {
        let url = self.url.trim();
        if url.is_empty() {
            bail!("rpc url must be provided");
        }
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            bail!("rpc url must start with http:// or https://");
        }
        Ok(())
    }
}
