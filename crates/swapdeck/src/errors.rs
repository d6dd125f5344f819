use alloy::primitives::{Address, U256};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// A structured error suitable for printing as machine-readable CLI output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Value::is_null", default)]
    pub data: Value,
}

impl ErrorBody {
    pub fn new(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: Value::Null,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SwapdeckError {
    #[error("connect {url}: {cause}")]
    Connection { url: String, cause: String },

    #[error("balance fetch failed: {0}")]
    BalanceFetch(String),

    #[error("pair read failed: {0}")]
    PairRead(String),

    #[error("reserves read failed: {0}")]
    Reserves(String),

    #[error("insufficient liquidity: wanted {amount_out}, pool holds {reserve_out}")]
    InsufficientLiquidity { amount_out: U256, reserve_out: U256 },

    #[error("token {token:#x} is not part of pair {pair:#x}")]
    TokenNotInPair { token: Address, pair: Address },

    #[error("no known pool for {from}/{to}")]
    UnsupportedPair { from: String, to: String },

    #[error("cannot package transaction: {0}")]
    Packaging(String),

    #[error("arithmetic overflow in {0}")]
    Overflow(&'static str),
}

impl SwapdeckError {
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Connection { .. } => "connection_error",
            Self::BalanceFetch(_) => "balance_fetch_error",
            Self::PairRead(_) => "pair_read_error",
            Self::Reserves(_) => "reserves_error",
            Self::InsufficientLiquidity { .. } => "insufficient_liquidity",
            Self::TokenNotInPair { .. } => "token_not_in_pair",
            Self::UnsupportedPair { .. } => "unsupported_pair",
            Self::Packaging(_) => "packaging_error",
            Self::Overflow(_) => "overflow",
        }
    }
}

impl From<&SwapdeckError> for ErrorBody {
    fn from(e: &SwapdeckError) -> Self {
        let mut body = Self::new(e.code(), e.to_string());
        match e {
            SwapdeckError::Connection { url, .. } => {
                body.data = serde_json::json!({ "url": url });
            }
            SwapdeckError::InsufficientLiquidity {
                amount_out,
                reserve_out,
            } => {
                body.data = serde_json::json!({
                  "amount_out": amount_out.to_string(),
                  "reserve_out": reserve_out.to_string(),
                });
            }
            SwapdeckError::UnsupportedPair { from, to } => {
                body.data = serde_json::json!({ "from": from, "to": to });
            }
            SwapdeckError::BalanceFetch(_)
            | SwapdeckError::PairRead(_)
            | SwapdeckError::Reserves(_)
            | SwapdeckError::TokenNotInPair { .. }
            | SwapdeckError::Packaging(_)
            | SwapdeckError::Overflow(_) => {}
        }
        body
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_body_carries_stable_code_and_data() {
        let e = SwapdeckError::InsufficientLiquidity {
            amount_out: U256::from(10_u64),
            reserve_out: U256::from(5_u64),
        };
        let body = ErrorBody::from(&e);
        assert_eq!(body.code, "insufficient_liquidity");
        assert_eq!(
            body.data.get("reserve_out").and_then(Value::as_str),
            Some("5")
        );

        let plain = ErrorBody::from(&SwapdeckError::Packaging("bad amount".into()));
        assert!(plain.data.is_null(), "packaging errors carry no data");
        assert!(plain.message.contains("bad amount"));
    }
}
