//! Constant-product (x*y=k) quote math for Uniswap-V2-style pools with a 0.3% fee.
//!
//! Amounts are exact integers in smallest units. Products are taken in 512 bits so that
//! `uint112` reserves combined with any `uint256` amount cannot wrap; the result is
//! narrowed back to 256 bits and reported as [`SwapdeckError::Overflow`] if it does not fit.
//! Decimal values ([`PriceImpact`]) are for display only.

use crate::{
    errors::SwapdeckError,
    pair::{PairInfo, ReservesSnapshot},
};
use alloy::primitives::{Address, U256, U512};
use rust_decimal::Decimal;

const FEE_NUMERATOR: u64 = 997;
const FEE_DENOMINATOR: u64 = 1000;
/// Fractional digits kept when turning an exact ratio into a `Decimal`.
const RATIO_SCALE: u32 = 18;

pub const HIGH_IMPACT_PERCENT: Decimal = Decimal::ONE;
pub const MODERATE_IMPACT_PERCENT: Decimal = Decimal::from_parts(5, 0, 0, false, 1);

fn wide(v: U256) -> U512 {
    U512::from(v)
}

fn narrow(v: U512, op: &'static str) -> Result<U256, SwapdeckError> {
    U256::checked_from_limbs_slice(v.as_limbs()).ok_or(SwapdeckError::Overflow(op))
}

fn mul(a: U512, b: U512, op: &'static str) -> Result<U512, SwapdeckError> {
    a.checked_mul(b).ok_or(SwapdeckError::Overflow(op))
}

/// Output amount for an exact input.
///
/// `floor(amount_in*997*reserve_out / (reserve_in*1000 + amount_in*997))`; zero when the
/// denominator is zero.
pub fn quote_forward(
    amount_in: U256,
    reserve_in: U256,
    reserve_out: U256,
) -> Result<U256, SwapdeckError> {
    let op = "forward quote";
    let amount_in_with_fee = mul(wide(amount_in), U512::from(FEE_NUMERATOR), op)?;
    let numerator = mul(amount_in_with_fee, wide(reserve_out), op)?;
    let denominator = mul(wide(reserve_in), U512::from(FEE_DENOMINATOR), op)?
        .checked_add(amount_in_with_fee)
        .ok_or(SwapdeckError::Overflow(op))?;
    if denominator.is_zero() {
        return Ok(U256::ZERO);
    }
    narrow(numerator / denominator, op)
}

/// Input amount needed to receive at least `amount_out`.
///
/// Inverse of [`quote_forward`], rounded up by one unit so that feeding the result back
/// through the forward formula never yields less than `amount_out`.
pub fn quote_reverse(
    amount_out: U256,
    reserve_in: U256,
    reserve_out: U256,
) -> Result<U256, SwapdeckError> {
    let op = "reverse quote";
    if amount_out >= reserve_out {
        return Err(SwapdeckError::InsufficientLiquidity {
            amount_out,
            reserve_out,
        });
    }
    let numerator = mul(
        mul(wide(reserve_in), wide(amount_out), op)?,
        U512::from(FEE_DENOMINATOR),
        op,
    )?;
    let denominator = mul(
        wide(reserve_out - amount_out),
        U512::from(FEE_NUMERATOR),
        op,
    )?;
    let floor = narrow(numerator / denominator, op)?;
    floor
        .checked_add(U256::from(1_u64))
        .ok_or(SwapdeckError::Overflow(op))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ImpactSeverity {
    Low,
    Moderate,
    High,
}

impl ImpactSeverity {
    pub fn classify(percent: Decimal) -> Self {
        if percent > HIGH_IMPACT_PERCENT {
            Self::High
        } else if percent > MODERATE_IMPACT_PERCENT {
            Self::Moderate
        } else {
            Self::Low
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Moderate => "moderate",
            Self::High => "high",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriceImpact {
    /// `amount_out / amount_in`, in smallest units.
    pub effective_price: Decimal,
    /// Signed: negative when the trade executes better than spot.
    pub percent: Decimal,
}

/// Exact `num / den` as a `Decimal`, dropping fractional digits until it fits.
pub fn ratio_decimal(num: U256, den: U256) -> Option<Decimal> {
    if den.is_zero() {
        return None;
    }
    for scale in (0..=RATIO_SCALE).rev() {
        let Some(factor) = U512::from(10_u64).checked_pow(U512::from(scale)) else {
            continue;
        };
        let Some(scaled) = wide(num).checked_mul(factor) else {
            continue;
        };
        let q = scaled / wide(den);
        let Ok(q) = u128::try_from(q) else {
            continue;
        };
        let Ok(q) = i128::try_from(q) else {
            continue;
        };
        if let Ok(d) = Decimal::try_from_i128_with_scale(q, scale) {
            return Some(d.normalize());
        }
    }
    None
}

/// Effective price and price impact against the pre-trade spot price
/// `reserve_out / reserve_in`.
///
/// The impact `(spot - effective) / spot * 100` is evaluated exactly as
/// `(amount_in*reserve_out - amount_out*reserve_in) * 100 / (amount_in*reserve_out)`
/// and only then converted to a decimal. It is zero when either reserve is zero.
pub fn price_impact(
    amount_in: U256,
    amount_out: U256,
    reserve_in: U256,
    reserve_out: U256,
) -> PriceImpact {
    let effective_price = ratio_decimal(amount_out, amount_in).unwrap_or(Decimal::ZERO);
    if reserve_in.is_zero() || reserve_out.is_zero() || amount_in.is_zero() {
        return PriceImpact {
            effective_price,
            percent: Decimal::ZERO,
        };
    }

    let spot_side = wide(amount_in) * wide(reserve_out);
    let exec_side = wide(amount_out) * wide(reserve_in);
    let (diff, negative) = if spot_side >= exec_side {
        (spot_side - exec_side, false)
    } else {
        (exec_side - spot_side, true)
    };

    let percent = percent_of(diff, spot_side).map_or(Decimal::ZERO, |p| {
        if negative {
            -p
        } else {
            p
        }
    });
    PriceImpact {
        effective_price,
        percent,
    }
}

fn percent_of(part: U512, whole: U512) -> Option<Decimal> {
    const PERCENT_SCALE: u32 = 8;
    let factor = U512::from(100_u64) * U512::from(10_u64).pow(U512::from(PERCENT_SCALE));
    let q = part.checked_mul(factor)? / whole;
    let q = i128::try_from(u128::try_from(q).ok()?).ok()?;
    Decimal::try_from_i128_with_scale(q, PERCENT_SCALE)
        .ok()
        .map(|d| d.normalize())
}

/// Pick `(reserve_in, reserve_out)` for `token_in` by address, never by position.
pub fn resolve_sides(
    token_in: Address,
    pair: &PairInfo,
    reserves: &ReservesSnapshot,
) -> Result<(U256, U256), SwapdeckError> {
    if token_in == pair.token0 {
        Ok((reserves.reserve0, reserves.reserve1))
    } else if token_in == pair.token1 {
        Ok((reserves.reserve1, reserves.reserve0))
    } else {
        Err(SwapdeckError::TokenNotInPair {
            token: token_in,
            pair: pair.pair_address,
        })
    }
}

/// A fully resolved quote. Replaced wholesale, never updated in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapQuote {
    pub amount_in: U256,
    pub amount_out: U256,
    pub reserve0: U256,
    pub reserve1: U256,
    pub price_impact_percent: Decimal,
    pub effective_price: Decimal,
}

impl SwapQuote {
    pub fn severity(&self) -> ImpactSeverity {
        ImpactSeverity::classify(self.price_impact_percent)
    }
}

fn build_quote(
    amount_in: U256,
    amount_out: U256,
    reserve_in: U256,
    reserve_out: U256,
    reserves: &ReservesSnapshot,
) -> SwapQuote {
    let impact = price_impact(amount_in, amount_out, reserve_in, reserve_out);
    SwapQuote {
        amount_in,
        amount_out,
        reserve0: reserves.reserve0,
        reserve1: reserves.reserve1,
        price_impact_percent: impact.percent,
        effective_price: impact.effective_price,
    }
}

/// Quote an exact input of `token_in` against a pair snapshot.
pub fn quote_exact_in(
    token_in: Address,
    amount_in: U256,
    pair: &PairInfo,
    reserves: &ReservesSnapshot,
) -> Result<SwapQuote, SwapdeckError> {
    let (reserve_in, reserve_out) = resolve_sides(token_in, pair, reserves)?;
    let amount_out = quote_forward(amount_in, reserve_in, reserve_out)?;
    Ok(build_quote(
        amount_in,
        amount_out,
        reserve_in,
        reserve_out,
        reserves,
    ))
}

/// Quote the input of `token_in` needed for an exact output of the other token.
pub fn quote_exact_out(
    token_in: Address,
    amount_out: U256,
    pair: &PairInfo,
    reserves: &ReservesSnapshot,
) -> Result<SwapQuote, SwapdeckError> {
    let (reserve_in, reserve_out) = resolve_sides(token_in, pair, reserves)?;
    let amount_in = quote_reverse(amount_out, reserve_in, reserve_out)?;
    Ok(build_quote(
        amount_in,
        amount_out,
        reserve_in,
        reserve_out,
        reserves,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::address;

    const A: Address = address!("A0b86991c6218b36c1d19d4a2e9eb0ce3606eb48");
    const B: Address = address!("C02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2");
    const PAIR: Address = address!("B4e16d0168e52d35CaCD2c6185b44281Ec28C9Dc");

    fn u(v: u128) -> U256 {
        U256::from(v)
    }

    fn pair() -> PairInfo {
        PairInfo {
            pair_address: PAIR,
            token0: A,
            token1: B,
        }
    }

    fn usdc_weth_reserves() -> ReservesSnapshot {
        ReservesSnapshot {
            reserve0: u(1_000_000_000_000),
            reserve1: u(500_000_000_000_000_000_000),
        }
    }

    #[test]
    fn forward_matches_the_usdc_weth_scenario() -> eyre::Result<()> {
        let r = usdc_weth_reserves();
        let amount_in = u(1_000_000_000);
        let expected = amount_in * u(997) * r.reserve1
            / (r.reserve0 * u(1000) + amount_in * u(997));
        let q = quote_exact_in(A, amount_in, &pair(), &r)?;
        assert_eq!(q.amount_out, expected);
        assert_eq!(q.amount_out, u(498_003_490_519_951_608));
        assert_eq!(q.reserve0, r.reserve0, "quote records observed reserves");
        Ok(())
    }

    #[test]
    fn forward_never_drains_the_pool_and_is_monotonic() -> eyre::Result<()> {
        let cases = [(u(1), u(1)), (u(1_000), u(7)), (u(3), u(1_000_000_000_000))];
        for (reserve_in, reserve_out) in cases {
            let mut prev = U256::ZERO;
            for amount_in in [0_u128, 1, 2, 10, 999, 1_000_000, u128::MAX] {
                let out = quote_forward(u(amount_in), reserve_in, reserve_out)?;
                assert!(out <= reserve_out, "drained pool: {out} > {reserve_out}");
                assert!(out >= prev, "not monotonic at amount_in={amount_in}");
                prev = out;
            }
        }
        Ok(())
    }

    #[test]
    fn forward_handles_huge_inputs_without_wrapping() -> eyre::Result<()> {
        let out = quote_forward(U256::MAX, u(1), u(1_000))?;
        assert!(out < u(1_000), "got {out}");
        Ok(())
    }

    #[test]
    fn forward_with_empty_pool_is_zero() -> eyre::Result<()> {
        assert_eq!(quote_forward(U256::ZERO, U256::ZERO, u(5))?, U256::ZERO);
        Ok(())
    }

    #[test]
    fn reverse_round_trips_to_at_least_the_target() -> eyre::Result<()> {
        let r = usdc_weth_reserves();
        let targets = [
            u(1),
            u(1_000_000),
            u(498_003_490_519_951_608),
            r.reserve1 - u(1),
        ];
        for want in targets {
            let amount_in = quote_reverse(want, r.reserve0, r.reserve1)?;
            let got = quote_forward(amount_in, r.reserve0, r.reserve1)?;
            assert!(got >= want, "round trip gave {got} < {want}");
        }
        Ok(())
    }

    #[test]
    fn reverse_rejects_outputs_at_or_above_the_reserve() {
        for want in [u(500), u(501), U256::MAX] {
            let r = quote_reverse(want, u(1_000), u(500));
            assert!(
                matches!(r, Err(SwapdeckError::InsufficientLiquidity { .. })),
                "want={want} got {r:?}"
            );
        }
    }

    #[test]
    fn sides_are_resolved_by_address() -> eyre::Result<()> {
        let r = usdc_weth_reserves();
        assert_eq!(resolve_sides(A, &pair(), &r)?, (r.reserve0, r.reserve1));
        assert_eq!(resolve_sides(B, &pair(), &r)?, (r.reserve1, r.reserve0));
        let other = address!("dAC17F958D2ee523a2206206994597C13D831ec7");
        assert!(matches!(
            resolve_sides(other, &pair(), &r),
            Err(SwapdeckError::TokenNotInPair { .. })
        ));
        Ok(())
    }

    #[test]
    fn price_impact_is_signed_and_tiered() {
        // 10% of the pool: large positive impact.
        let big = price_impact(u(100), u(90), u(1_000), u(1_000));
        assert_eq!(big.percent, Decimal::from(10));
        assert_eq!(ImpactSeverity::classify(big.percent), ImpactSeverity::High);

        let mid = price_impact(u(10_000), u(9_930), u(1_000_000), u(1_000_000));
        assert_eq!(mid.percent, Decimal::new(7, 1));
        assert_eq!(
            ImpactSeverity::classify(mid.percent),
            ImpactSeverity::Moderate
        );

        // Better than spot: negative impact survives.
        let better = price_impact(u(100), u(110), u(1_000), u(1_000));
        assert!(better.percent.is_sign_negative(), "{}", better.percent);
        assert_eq!(
            ImpactSeverity::classify(better.percent),
            ImpactSeverity::Low
        );

        assert_eq!(
            ImpactSeverity::classify(Decimal::new(5, 1)),
            ImpactSeverity::Low,
            "exactly 0.5% is not moderate"
        );
    }

    #[test]
    fn price_impact_is_zero_for_empty_reserves() {
        let p = price_impact(u(100), u(90), U256::ZERO, u(1_000));
        assert_eq!(p.percent, Decimal::ZERO);
        assert_eq!(p.effective_price, Decimal::new(9, 1));
    }

    #[test]
    fn ratio_decimal_degrades_precision_instead_of_failing() {
        assert_eq!(
            ratio_decimal(u(1), u(3)).map(|d| d.round_dp(4)),
            Some(Decimal::new(3333, 4))
        );
        let huge = ratio_decimal(u(10).pow(u(40)), u(1));
        assert!(huge.is_none(), "10^40 exceeds Decimal range");
        let big = ratio_decimal(u(10).pow(u(27)), u(1));
        assert_eq!(big, Some(Decimal::from_i128_with_scale(10_i128.pow(27), 0)));
        assert_eq!(ratio_decimal(u(1), U256::ZERO), None);
    }
}
