//! JSON-RPC node connection and the read-only calls the rest of the crate makes through it.

use crate::errors::SwapdeckError;
use alloy::{
    network::TransactionBuilder as _,
    primitives::{Address, Bytes, U256},
    providers::{Provider as _, RootProvider},
    rpc::types::TransactionRequest,
};
use eyre::Context as _;
use reqwest::Client;
use std::{future::Future, time::Duration};
use tracing::{debug, info};

pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(8);

/// Read-only node access needed by the balance loader and the pair reader.
///
/// Implementations are cheap to clone and shared by concurrent fetches.
pub trait NodeReader: Clone + Send + Sync + 'static {
    fn native_balance(&self, owner: Address) -> impl Future<Output = eyre::Result<U256>> + Send;

    fn eth_call(&self, to: Address, data: Bytes)
        -> impl Future<Output = eyre::Result<Bytes>> + Send;
}

/// An established JSON-RPC connection. Never mutated; reconnecting builds a new one.
#[derive(Clone)]
pub struct NodeConnection {
    url: String,
    chain_id: u64,
    provider: RootProvider,
}

impl std::fmt::Debug for NodeConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeConnection")
            .field("url", &self.url)
            .field("chain_id", &self.chain_id)
            .finish_non_exhaustive()
    }
}

impl NodeConnection {
    pub fn url(&self) -> &str {
        &self.url
    }

    pub const fn chain_id(&self) -> u64 {
        self.chain_id
    }
}

fn is_ws_url(url: &str) -> bool {
    let u = url.trim().to_ascii_lowercase();
    u.starts_with("ws://") || u.starts_with("wss://")
}

async fn provider_for_url(url: &str, timeout: Duration) -> eyre::Result<RootProvider> {
    if is_ws_url(url) {
        return RootProvider::connect(url.trim())
            .await
            .with_context(|| format!("open websocket {url}"));
    }
    let u: reqwest::Url = url
        .trim()
        .parse()
        .with_context(|| format!("invalid rpc url: {url}"))?;
    let client = Client::builder()
        .timeout(timeout)
        .connect_timeout(timeout)
        .build()
        .context("build rpc http client")?;
    let http = alloy::transports::http::Http::with_client(client, u);
    let rpc_client = alloy::rpc::client::RpcClient::new(http, false);
    Ok(RootProvider::new(rpc_client))
}

/// Open a connection to `url` and prove it is alive with `eth_chainId`.
///
/// The whole attempt (transport setup + probe) is bounded by `timeout`. There is no retry.
pub async fn connect(url: &str, timeout: Duration) -> Result<NodeConnection, SwapdeckError> {
    let attempt = async {
        let provider = provider_for_url(url, timeout).await?;
        let chain_id = provider.get_chain_id().await.context("eth_chainId")?;
        Ok::<_, eyre::Report>(NodeConnection {
            url: url.trim().to_owned(),
            chain_id,
            provider,
        })
    };

    match tokio::time::timeout(timeout, attempt).await {
        Ok(Ok(conn)) => {
            info!(url = conn.url(), chain_id = conn.chain_id(), "rpc connected");
            Ok(conn)
        }
        Ok(Err(e)) => Err(SwapdeckError::Connection {
            url: url.to_owned(),
            cause: format!("{e:#}"),
        }),
        Err(_) => Err(SwapdeckError::Connection {
            url: url.to_owned(),
            cause: format!("timed out after {}s", timeout.as_secs()),
        }),
    }
}

impl NodeReader for NodeConnection {
    async fn native_balance(&self, owner: Address) -> eyre::Result<U256> {
        let v = self
            .provider
            .get_balance(owner)
            .await
            .context("eth_getBalance")?;
        Ok(v)
    }

    async fn eth_call(&self, to: Address, data: Bytes) -> eyre::Result<Bytes> {
        debug!(to = %to, selector = %hex::encode(data.get(..4).unwrap_or_default()), "eth_call");
        let tx = TransactionRequest::default().with_to(to).with_input(data);
        let out = self.provider.call(tx).await.context("eth_call")?;
        Ok(out)
    }
}
