//! Unsigned transaction descriptors for out-of-band signing.
//!
//! Nothing here is signed or broadcast. A transfer becomes an EIP-681 URI; a swap
//! becomes a readable JSON description of the router call a wallet would make.

use crate::{
    amount::{format_base_to_ui, parse_amount_ui_to_base},
    errors::SwapdeckError,
    node::NodeConnection,
    registry::{
        swap_token_index, SwapToken, MAINNET_CHAIN_ID, NATIVE_DECIMALS, UNISWAP_V2_ROUTER, WETH,
    },
};
use alloy::primitives::{Address, U256};
use chrono::Utc;
use serde::Serialize;
use serde_json::json;

const DEADLINE_MINUTES: i64 = 20;
pub const APPROVAL_WARNING: &str =
    "ERC-20 approval required: approve the router to spend the input token before swapping";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PackageFormat {
    #[serde(rename = "EIP-681")]
    Eip681,
    #[serde(rename = "EIP-4527-like")]
    Eip4527Like,
}

impl PackageFormat {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Eip681 => "EIP-681",
            Self::Eip4527Like => "EIP-4527-like",
        }
    }
}

/// Where the packaged transaction is meant to land.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainTarget {
    pub rpc_url: String,
    pub chain_id: u64,
}

impl ChainTarget {
    pub fn mainnet(rpc_url: &str) -> Self {
        Self {
            rpc_url: rpc_url.to_owned(),
            chain_id: MAINNET_CHAIN_ID,
        }
    }
}

impl From<&NodeConnection> for ChainTarget {
    fn from(conn: &NodeConnection) -> Self {
        Self {
            rpc_url: conn.url().to_owned(),
            chain_id: conn.chain_id(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransactionPackage {
    pub display_text: String,
    pub qr_payload: String,
    pub format: PackageFormat,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TransactionPackage {
    fn failed(format: PackageFormat, e: &SwapdeckError) -> Self {
        Self {
            display_text: String::new(),
            qr_payload: String::new(),
            format,
            error: Some(e.to_string()),
        }
    }
}

fn parse_address(label: &str, s: &str) -> Result<Address, SwapdeckError> {
    s.trim()
        .parse::<Address>()
        .map_err(|e| SwapdeckError::Packaging(format!("invalid {label} address {s:?}: {e}")))
}

fn parse_amount(label: &str, s: &str, decimals: u8) -> Result<U256, SwapdeckError> {
    parse_amount_ui_to_base(s, decimals)
        .map_err(|e| SwapdeckError::Packaging(format!("invalid {label} {s:?}: {e:#}")))
}

fn lower_hex(a: Address) -> String {
    format!("0x{}", hex::encode(a.as_slice()))
}

/// `ethereum:<to>@<chain_id>?value=<wei>`
pub fn eip681_uri(to: Address, chain_id: u64, wei: U256) -> String {
    format!("ethereum:{}@{chain_id}?value={wei}", lower_hex(to))
}

/// Package a native-asset transfer. `amount` is a decimal string in whole ETH.
pub fn package_transfer(
    from: &str,
    to: &str,
    amount: &str,
    target: &ChainTarget,
) -> TransactionPackage {
    build_transfer(from, to, amount, target)
        .unwrap_or_else(|e| TransactionPackage::failed(PackageFormat::Eip681, &e))
}

fn build_transfer(
    from: &str,
    to: &str,
    amount: &str,
    target: &ChainTarget,
) -> Result<TransactionPackage, SwapdeckError> {
    let from = parse_address("sender", from)?;
    let to = parse_address("recipient", to)?;
    let wei = parse_amount("amount", amount, NATIVE_DECIMALS)?;

    let descriptor = json!({
        "from": lower_hex(from),
        "to": lower_hex(to),
        "value": format!("0x{wei:x}"),
        "chainId": format!("0x{:x}", target.chain_id),
        "data": "0x",
        "rpc": target.rpc_url,
    });
    let display_text = serde_json::to_string_pretty(&descriptor)
        .map_err(|e| SwapdeckError::Packaging(format!("encode descriptor: {e}")))?;
    Ok(TransactionPackage {
        display_text,
        qr_payload: eip681_uri(to, target.chain_id, wei),
        format: PackageFormat::Eip681,
        error: None,
    })
}

fn resolve_token(label: &str, symbol: &str) -> Result<&'static SwapToken, SwapdeckError> {
    swap_token_index(symbol)
        .and_then(SwapToken::at)
        .ok_or_else(|| SwapdeckError::Packaging(format!("unknown {label} token {symbol:?}")))
}

/// Describe a Uniswap V2 router swap.
///
/// `min_amount_out` is validated and re-rendered with the destination token's decimals.
/// Token inputs carry [`APPROVAL_WARNING`].
pub fn package_swap(
    from: &str,
    from_token: &str,
    to_token: &str,
    amount_in: &str,
    min_amount_out: &str,
    target: &ChainTarget,
) -> TransactionPackage {
    build_swap(from, from_token, to_token, amount_in, min_amount_out, target)
        .unwrap_or_else(|e| TransactionPackage::failed(PackageFormat::Eip4527Like, &e))
}

fn build_swap(
    from: &str,
    from_token: &str,
    to_token: &str,
    amount_in: &str,
    min_amount_out: &str,
    target: &ChainTarget,
) -> Result<TransactionPackage, SwapdeckError> {
    let sender = parse_address("sender", from)?;
    let tin = resolve_token("input", from_token)?;
    let tout = resolve_token("output", to_token)?;
    if tin.symbol == tout.symbol {
        return Err(SwapdeckError::Packaging(format!(
            "cannot swap {} for itself",
            tin.symbol
        )));
    }
    let amount = parse_amount("input amount", amount_in, tin.decimals)?;
    let min_out = parse_amount("minimum output", min_amount_out, tout.decimals)?;

    let (method, path, value, warning) = match (tin.native, tout.native) {
        (true, false) => (
            "swapExactETHForTokens",
            vec![WETH, tout.address],
            amount,
            None,
        ),
        (false, true) => (
            "swapExactTokensForETH",
            vec![tin.address, WETH],
            U256::ZERO,
            Some(APPROVAL_WARNING),
        ),
        (false, false) => (
            "swapExactTokensForTokens",
            vec![tin.address, tout.address],
            U256::ZERO,
            Some(APPROVAL_WARNING),
        ),
        (true, true) => {
            return Err(SwapdeckError::Packaging(
                "native to native is not a swap".to_owned(),
            ))
        }
    };

    let deadline = Utc::now().timestamp() + DEADLINE_MINUTES * 60;
    let mut descriptor = json!({
        "type": "uniswap_v2_swap",
        "router": lower_hex(UNISWAP_V2_ROUTER),
        "method": method,
        "from": lower_hex(sender),
        "path": path.into_iter().map(lower_hex).collect::<Vec<_>>(),
        "amount_in": format!("{} {}", format_base_to_ui(amount, tin.decimals), tin.symbol),
        "amount_in_base": amount.to_string(),
        "min_amount_out": format!("{} {}", format_base_to_ui(min_out, tout.decimals), tout.symbol),
        "min_amount_out_base": min_out.to_string(),
        "value": value.to_string(),
        "deadline_hint": deadline,
        "chain_id": target.chain_id,
        "rpc": target.rpc_url,
    });
    if let (Some(w), Some(obj)) = (warning, descriptor.as_object_mut()) {
        obj.insert("warning".to_owned(), json!(w));
    }

    let encode = |pretty: bool| {
        let out = if pretty {
            serde_json::to_string_pretty(&descriptor)
        } else {
            serde_json::to_string(&descriptor)
        };
        out.map_err(|e| SwapdeckError::Packaging(format!("encode descriptor: {e}")))
    };
    Ok(TransactionPackage {
        display_text: encode(true)?,
        qr_payload: encode(false)?,
        format: PackageFormat::Eip4527Like,
        error: None,
    })
}
