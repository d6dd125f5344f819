//! Wallet balance loading.
//!
//! The native balance must succeed. Watched tokens are queried concurrently under one
//! deadline and any that fail or hold nothing are left out.

use crate::{errors::SwapdeckError, node::NodeReader, registry::WatchedToken};
use alloy::{
    primitives::{Address, Bytes, U256},
    sol,
    sol_types::SolCall as _,
};
use chrono::{DateTime, Utc};
use std::time::Duration;
use tokio::{task::JoinSet, time::Instant};
use tracing::{debug, info, warn};

pub const DEFAULT_BALANCES_TIMEOUT: Duration = Duration::from_secs(12);
pub const NO_RPC_CLIENT: &str = "no RPC client";

sol! {
    contract IERC20 {
        function balanceOf(address account) external view returns (uint256);
    }
}

pub const BALANCE_OF_SELECTOR: [u8; 4] = IERC20::balanceOfCall::SELECTOR;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenBalance {
    pub symbol: String,
    pub decimals: u8,
    pub balance: U256,
}

/// One balance snapshot for an address. A fresh value is produced on every load.
///
/// Either `error_message` is set (total failure, `tokens` empty) or `tokens` holds the
/// successful non-zero balances. Individual token failures never surface here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalletDetails {
    pub address: Address,
    pub native_balance: U256,
    pub tokens: Vec<TokenBalance>,
    pub loaded_at: DateTime<Utc>,
    pub error_message: Option<String>,
}

impl WalletDetails {
    fn failed(address: Address, msg: impl Into<String>) -> Self {
        Self {
            address,
            native_balance: U256::ZERO,
            tokens: vec![],
            loaded_at: Utc::now(),
            error_message: Some(msg.into()),
        }
    }
}

/// `balanceOf(owner)` calldata: selector followed by the left-padded address word.
pub fn balance_of_calldata(owner: Address) -> Bytes {
    Bytes::from(IERC20::balanceOfCall { account: owner }.abi_encode())
}

async fn token_balance<N: NodeReader>(
    node: N,
    owner: Address,
    token: WatchedToken,
) -> eyre::Result<TokenBalance> {
    let out = node
        .eth_call(token.contract_address, balance_of_calldata(owner))
        .await?;
    let word = out
        .get(..32)
        .ok_or_else(|| eyre::eyre!("short balanceOf response ({} bytes)", out.len()))?;
    Ok(TokenBalance {
        symbol: token.symbol,
        decimals: token.decimals,
        balance: U256::from_be_slice(word),
    })
}

/// Load the native balance and every watched token balance for `address`.
///
/// All calls share one deadline. The native balance is all-or-nothing; each token is
/// independent, and tokens still in flight at the deadline are dropped.
pub async fn load_details<N: NodeReader>(
    node: Option<N>,
    address: Address,
    watchlist: &[WatchedToken],
    timeout: Duration,
) -> WalletDetails {
    let Some(node) = node else {
        return WalletDetails::failed(address, NO_RPC_CLIENT);
    };
    let deadline = Instant::now() + timeout;

    let native = match tokio::time::timeout_at(deadline, node.native_balance(address)).await {
        Ok(Ok(v)) => v,
        Ok(Err(e)) => {
            warn!(address = %address, error = %format!("{e:#}"), "native balance failed");
            let err = SwapdeckError::BalanceFetch(format!("native balance: {e:#}"));
            return WalletDetails::failed(address, err.to_string());
        }
        Err(_) => {
            warn!(address = %address, "native balance timed out");
            let err = SwapdeckError::BalanceFetch(format!(
                "native balance: timed out after {}s",
                timeout.as_secs()
            ));
            return WalletDetails::failed(address, err.to_string());
        }
    };

    let mut set = JoinSet::new();
    for token in watchlist {
        set.spawn(token_balance(node.clone(), address, token.clone()));
    }

    let mut tokens = Vec::with_capacity(watchlist.len());
    loop {
        match tokio::time::timeout_at(deadline, set.join_next()).await {
            Ok(Some(Ok(Ok(tb)))) => {
                if tb.balance.is_zero() {
                    continue;
                }
                tokens.push(tb);
            }
            Ok(Some(Ok(Err(e)))) => {
                debug!(error = %format!("{e:#}"), "token balance skipped");
            }
            Ok(Some(Err(join_err))) => {
                debug!(error = %join_err, "token balance task failed");
            }
            Ok(None) => break,
            Err(_) => {
                warn!(pending = set.len(), "balance deadline reached; abandoning tokens");
                set.abort_all();
                break;
            }
        }
    }

    tokens.sort_by_cached_key(|t| t.symbol.to_lowercase());
    info!(
        address = %address,
        tokens = tokens.len(),
        watched = watchlist.len(),
        "wallet details loaded"
    );
    WalletDetails {
        address,
        native_balance: native,
        tokens,
        loaded_at: Utc::now(),
        error_message: None,
    }
}
