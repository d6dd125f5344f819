//! Uniswap V2 pair reads: `token0`, `token1` and `getReserves`, each under its own timeout.

use crate::{errors::SwapdeckError, node::NodeReader};
use alloy::{
    primitives::{Address, Bytes, U256},
    sol,
    sol_types::SolCall as _,
};
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(10);

sol! {
    contract IUniswapV2Pair {
        function token0() external view returns (address);
        function token1() external view returns (address);
        function getReserves() external view returns (uint112 reserve0, uint112 reserve1, uint32 blockTimestampLast);
    }
}

pub const TOKEN0_SELECTOR: [u8; 4] = IUniswapV2Pair::token0Call::SELECTOR;
pub const TOKEN1_SELECTOR: [u8; 4] = IUniswapV2Pair::token1Call::SELECTOR;
pub const GET_RESERVES_SELECTOR: [u8; 4] = IUniswapV2Pair::getReservesCall::SELECTOR;

const WORD: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PairInfo {
    pub pair_address: Address,
    pub token0: Address,
    pub token1: Address,
}

/// Both reserves as returned by a single `getReserves()` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReservesSnapshot {
    pub reserve0: U256,
    pub reserve1: U256,
}

async fn call_with_timeout<N: NodeReader>(
    node: &N,
    to: Address,
    data: Vec<u8>,
    timeout: Duration,
) -> eyre::Result<Bytes> {
    match tokio::time::timeout(timeout, node.eth_call(to, Bytes::from(data))).await {
        Ok(r) => r,
        Err(_) => eyre::bail!("timed out after {}s", timeout.as_secs()),
    }
}

fn decode_address_word(out: &[u8]) -> Option<Address> {
    out.get(WORD - 20..WORD).map(Address::from_slice)
}

fn decode_uint_word(out: &[u8], index: usize) -> Option<U256> {
    let start = index.checked_mul(WORD)?;
    out.get(start..start + WORD).map(U256::from_be_slice)
}

async fn read_token<N: NodeReader>(
    node: &N,
    pair: Address,
    data: Vec<u8>,
    label: &str,
    timeout: Duration,
) -> Result<Address, SwapdeckError> {
    let out = call_with_timeout(node, pair, data, timeout)
        .await
        .map_err(|e| SwapdeckError::PairRead(format!("{label}(): {e:#}")))?;
    decode_address_word(&out).ok_or_else(|| {
        SwapdeckError::PairRead(format!(
            "{label}(): short response ({} bytes): 0x{}",
            out.len(),
            hex::encode(&out)
        ))
    })
}

pub async fn get_pair<N: NodeReader>(
    node: &N,
    pair_address: Address,
    timeout: Duration,
) -> Result<PairInfo, SwapdeckError> {
    let (t0, t1) = tokio::join!(
        read_token(
            node,
            pair_address,
            IUniswapV2Pair::token0Call {}.abi_encode(),
            "token0",
            timeout
        ),
        read_token(
            node,
            pair_address,
            IUniswapV2Pair::token1Call {}.abi_encode(),
            "token1",
            timeout
        ),
    );
    let info = PairInfo {
        pair_address,
        token0: t0?,
        token1: t1?,
    };
    debug!(pair = %pair_address, token0 = %info.token0, token1 = %info.token1, "pair tokens");
    Ok(info)
}

/// Read both reserves in one call.
///
/// With `tolerate_single`, a response holding only the first word yields `reserve1 = 0`;
/// otherwise anything shorter than two words is an error.
pub async fn get_reserves<N: NodeReader>(
    node: &N,
    pair_address: Address,
    tolerate_single: bool,
    timeout: Duration,
) -> Result<ReservesSnapshot, SwapdeckError> {
    let out = call_with_timeout(
        node,
        pair_address,
        IUniswapV2Pair::getReservesCall {}.abi_encode(),
        timeout,
    )
    .await
    .map_err(|e| SwapdeckError::Reserves(format!("getReserves(): {e:#}")))?;
    decode_reserves(&out, tolerate_single)
}

fn decode_reserves(out: &[u8], tolerate_single: bool) -> Result<ReservesSnapshot, SwapdeckError> {
    let short = || {
        SwapdeckError::Reserves(format!(
            "getReserves(): expected at least {} bytes, got {}",
            2 * WORD,
            out.len()
        ))
    };
    let reserve0 = decode_uint_word(out, 0).ok_or_else(short)?;
    let reserve1 = match decode_uint_word(out, 1) {
        Some(v) => v,
        None if tolerate_single => U256::ZERO,
        None => return Err(short()),
    };
    Ok(ReservesSnapshot { reserve0, reserve1 })
}

#[cfg(test)]
pub(crate) fn word_u256(v: U256) -> Vec<u8> {
    v.to_be_bytes::<32>().to_vec()
}

#[cfg(test)]
pub(crate) fn word_address(a: Address) -> Vec<u8> {
    let mut w = vec![0_u8; 12];
    w.extend_from_slice(a.as_slice());
    w
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::testing::MockNode;
    use alloy::primitives::address;

    const PAIR: Address = address!("B4e16d0168e52d35CaCD2c6185b44281Ec28C9Dc");
    const A: Address = address!("A0b86991c6218b36c1d19d4a2e9eb0ce3606eb48");
    const B: Address = address!("C02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2");

    #[test]
    fn selectors_match_the_pair_abi() {
        assert_eq!(TOKEN0_SELECTOR, [0x0d, 0xfe, 0x16, 0x81]);
        assert_eq!(TOKEN1_SELECTOR, [0xd2, 0x12, 0x20, 0xa7]);
        assert_eq!(GET_RESERVES_SELECTOR, [0x09, 0x02, 0xf1, 0xac]);
    }

    #[tokio::test]
    async fn reads_pair_tokens_in_contract_order() -> eyre::Result<()> {
        let node = MockNode::new()
            .with_reply(PAIR, TOKEN0_SELECTOR, word_address(A))
            .with_reply(PAIR, TOKEN1_SELECTOR, word_address(B));
        let info = get_pair(&node, PAIR, DEFAULT_CALL_TIMEOUT).await?;
        assert_eq!(info.token0, A);
        assert_eq!(info.token1, B);
        assert_eq!(info.pair_address, PAIR);
        Ok(())
    }

    #[tokio::test]
    async fn short_token_word_is_a_pair_read_error() {
        let node = MockNode::new()
            .with_reply(PAIR, TOKEN0_SELECTOR, vec![0_u8; 12])
            .with_reply(PAIR, TOKEN1_SELECTOR, word_address(B));
        let r = get_pair(&node, PAIR, DEFAULT_CALL_TIMEOUT).await;
        assert!(matches!(r, Err(SwapdeckError::PairRead(_))), "got {r:?}");
    }

    #[tokio::test]
    async fn reserves_need_two_words() -> eyre::Result<()> {
        let mut full = word_u256(U256::from(5_u64));
        full.extend(word_u256(U256::from(7_u64)));
        full.extend(word_u256(U256::from(1_700_000_000_u64)));
        let node = MockNode::new().with_reply(PAIR, GET_RESERVES_SELECTOR, full);
        let snap = get_reserves(&node, PAIR, false, DEFAULT_CALL_TIMEOUT).await?;
        assert_eq!(snap.reserve0, U256::from(5_u64));
        assert_eq!(snap.reserve1, U256::from(7_u64));

        let single = MockNode::new().with_reply(
            PAIR,
            GET_RESERVES_SELECTOR,
            word_u256(U256::from(5_u64)),
        );
        let strict = get_reserves(&single, PAIR, false, DEFAULT_CALL_TIMEOUT).await;
        assert!(
            matches!(strict, Err(SwapdeckError::Reserves(_))),
            "32-byte response must be rejected: {strict:?}"
        );
        let tolerant = get_reserves(&single, PAIR, true, DEFAULT_CALL_TIMEOUT).await?;
        assert_eq!(tolerant.reserve1, U256::ZERO);
        Ok(())
    }

    #[test]
    fn empty_reserves_are_rejected_even_when_tolerant() {
        assert!(decode_reserves(&[], true).is_err());
        assert!(decode_reserves(&[0_u8; 31], true).is_err());
    }

    #[tokio::test]
    async fn slow_node_hits_the_call_timeout() {
        let node = MockNode::new()
            .with_reply(PAIR, GET_RESERVES_SELECTOR, vec![0_u8; 64])
            .with_delay(PAIR, Duration::from_secs(5));
        let r = get_reserves(&node, PAIR, false, Duration::from_millis(20)).await;
        assert!(
            r.as_ref()
                .is_err_and(|e| e.to_string().contains("timed out")),
            "got {r:?}"
        );
    }
}
