//! Static token and pool tables for Ethereum mainnet.

use alloy::primitives::{address, Address};
use serde::{Deserialize, Serialize};

pub const NATIVE_SYMBOL: &str = "ETH";
pub const NATIVE_DECIMALS: u8 = 18;
pub const MAINNET_CHAIN_ID: u64 = 1;

pub const WETH: Address = address!("C02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2");
pub const USDC: Address = address!("A0b86991c6218b36c1d19d4a2e9eb0ce3606eb48");
pub const DAI: Address = address!("6B175474E89094C44Da98b954EedeAC495271d0F");
pub const UNISWAP_V2_ROUTER: Address = address!("7a250d5630B4cF539739dF2C5dAcb4c659F2488D");
/// Uniswap V2 USDC/WETH pair (token0 = USDC, token1 = WETH).
pub const UNISWAP_V2_USDC_WETH: Address = address!("B4e16d0168e52d35CaCD2c6185b44281Ec28C9Dc");

/// A token tracked by the balance loader.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchedToken {
    pub symbol: String,
    pub decimals: u8,
    pub contract_address: Address,
}

/// A token selectable on either side of a swap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapToken {
    pub symbol: &'static str,
    pub decimals: u8,
    /// ERC-20 contract; for the native asset this is the wrapped token the pool holds.
    pub address: Address,
    pub native: bool,
}

impl SwapToken {
    pub fn at(index: usize) -> Option<&'static Self> {
        SWAP_TOKENS.get(index)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KnownPair {
    pub a: &'static str,
    pub b: &'static str,
    pub pair_address: Address,
}

pub const SWAP_TOKENS: &[SwapToken] = &[
    SwapToken {
        symbol: NATIVE_SYMBOL,
        decimals: NATIVE_DECIMALS,
        address: WETH,
        native: true,
    },
    SwapToken {
        symbol: "USDC",
        decimals: 6,
        address: USDC,
        native: false,
    },
    SwapToken {
        symbol: "DAI",
        decimals: 18,
        address: DAI,
        native: false,
    },
];

/// Only these symbol combinations resolve to an on-chain pool.
pub const KNOWN_PAIRS: &[KnownPair] = &[KnownPair {
    a: NATIVE_SYMBOL,
    b: "USDC",
    pair_address: UNISWAP_V2_USDC_WETH,
}];

struct WatchDef {
    symbol: &'static str,
    decimals: u8,
    address: Address,
}

const MAINNET_WATCHLIST: &[WatchDef] = &[
    WatchDef {
        symbol: "USDC",
        decimals: 6,
        address: USDC,
    },
    WatchDef {
        symbol: "USDT",
        decimals: 6,
        address: address!("dAC17F958D2ee523a2206206994597C13D831ec7"),
    },
    WatchDef {
        symbol: "DAI",
        decimals: 18,
        address: DAI,
    },
    WatchDef {
        symbol: "WBTC",
        decimals: 8,
        address: address!("2260FAC5E5542a773Aa44fBCfeDf7C193bc2C599"),
    },
    WatchDef {
        symbol: "LINK",
        decimals: 18,
        address: address!("514910771AF9Ca656af840dff83E8264EcF986CA"),
    },
    WatchDef {
        symbol: "UNI",
        decimals: 18,
        address: address!("1f9840a85d5aF5bf1D1762F925BDADdC4201F984"),
    },
];

pub fn default_watchlist() -> Vec<WatchedToken> {
    MAINNET_WATCHLIST
        .iter()
        .map(|d| WatchedToken {
            symbol: d.symbol.to_owned(),
            decimals: d.decimals,
            contract_address: d.address,
        })
        .collect()
}

pub fn swap_token_index(symbol: &str) -> Option<usize> {
    let s = symbol.trim();
    SWAP_TOKENS
        .iter()
        .position(|t| t.symbol.eq_ignore_ascii_case(s))
}

/// Look up the pool for a symbol pair, in either order.
pub fn known_pair_for(from: &str, to: &str) -> Option<&'static KnownPair> {
    KNOWN_PAIRS.iter().find(|p| {
        (p.a.eq_ignore_ascii_case(from) && p.b.eq_ignore_ascii_case(to))
            || (p.a.eq_ignore_ascii_case(to) && p.b.eq_ignore_ascii_case(from))
    })
}
