use alloy::primitives::U256;
use eyre::Context as _;

fn pow10(decimals: u8) -> eyre::Result<U256> {
    U256::from(10_u64)
        .checked_pow(U256::from(decimals))
        .ok_or_else(|| eyre::eyre!("decimals too large"))
}

/// Parse a user-entered decimal amount (e.g. `"1.5"`) into base units.
///
/// Exact: no floats are involved, and more fractional digits than `decimals` is an
/// error rather than a silent truncation.
pub fn parse_amount_ui_to_base(s: &str, decimals: u8) -> eyre::Result<U256> {
    let s = s.trim();
    if s.is_empty() {
        eyre::bail!("empty amount");
    }

    let (whole, frac) = match s.split_once('.') {
        Some((a, b)) => (a, b),
        None => (s, ""),
    };

    if whole.starts_with('-') {
        eyre::bail!("amount must be non-negative");
    }
    if whole.is_empty() && frac.is_empty() {
        eyre::bail!("amount has no digits");
    }
    if !whole.bytes().all(|b| b.is_ascii_digit()) || !frac.bytes().all(|b| b.is_ascii_digit())
    {
        eyre::bail!("invalid amount: {s}");
    }

    let whole_v = if whole.is_empty() {
        U256::ZERO
    } else {
        U256::from_str_radix(whole, 10).context("parse whole")?
    };

    if frac.len() > usize::from(decimals) {
        eyre::bail!("too many decimal places for token (decimals={decimals})");
    }

    let mut frac_s = frac.to_owned();
    while frac_s.len() < usize::from(decimals) {
        frac_s.push('0');
    }
    let frac_v = if frac_s.is_empty() {
        U256::ZERO
    } else {
        U256::from_str_radix(&frac_s, 10).context("parse fractional")?
    };

    whole_v
        .checked_mul(pow10(decimals)?)
        .and_then(|x| x.checked_add(frac_v))
        .ok_or_else(|| eyre::eyre!("amount overflow"))
}

/// Format a base-unit integer amount into a UI decimal string without using floats.
///
/// Examples:
/// - base=1500000, decimals=6 => "1.5"
/// - base=1, decimals=6 => "0.000001"
pub fn format_base_to_ui(base: U256, decimals: u8) -> String {
    if decimals == 0 {
        return base.to_string();
    }
    let Ok(scale) = pow10(decimals) else {
        return base.to_string();
    };
    let whole = base / scale;
    let frac = base % scale;
    if frac.is_zero() {
        return whole.to_string();
    }
    let mut frac_s = format!("{:0>width$}", frac.to_string(), width = usize::from(decimals));
    while frac_s.ends_with('0') {
        frac_s.pop();
    }
    format!("{whole}.{frac_s}")
}

/// True for an empty field or one that parses to zero base units.
pub fn is_blank_or_zero(s: &str) -> bool {
    let t = s.trim();
    if t.is_empty() || t == "0" {
        return true;
    }
    let digits_ok = t.bytes().filter(|b| *b == b'.').count() <= 1
        && t.bytes().any(|b| b.is_ascii_digit())
        && t.bytes().all(|b| b.is_ascii_digit() || b == b'.');
    digits_ok && t.bytes().all(|b| b == b'0' || b == b'.')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_ui_amount_basic() -> eyre::Result<()> {
        assert_eq!(parse_amount_ui_to_base("1", 6)?, U256::from(1_000_000_u64));
        assert_eq!(parse_amount_ui_to_base("1.5", 6)?, U256::from(1_500_000_u64));
        assert_eq!(parse_amount_ui_to_base("0.000001", 6)?, U256::from(1_u64));
        assert_eq!(parse_amount_ui_to_base(".5", 1)?, U256::from(5_u64));
        assert_eq!(
            parse_amount_ui_to_base("1.0", 18)?,
            U256::from(1_000_000_000_000_000_000_u128)
        );
        Ok(())
    }

    #[test]
    fn parse_ui_amount_exceeds_u128() -> eyre::Result<()> {
        let v = parse_amount_ui_to_base("1000000000000000000000", 18)?;
        assert_eq!(v.to_string(), "1000000000000000000000000000000000000000");
        Ok(())
    }

    #[test]
    fn parse_ui_rejects_garbage() {
        for bad in ["", "abc", "1.2.3", "-1", "1e18", ".", "0x10"] {
            assert!(
                parse_amount_ui_to_base(bad, 18).is_err(),
                "expected error for {bad:?}"
            );
        }
        let r = parse_amount_ui_to_base("1.0000001", 6);
        assert!(
            r.is_err_and(|e| e.to_string().contains("too many decimal places")),
            "expected precision error"
        );
    }

    #[test]
    fn format_base_to_ui_strips_trailing_zeros() {
        assert_eq!(format_base_to_ui(U256::from(1_500_000_u64), 6), "1.5");
        assert_eq!(format_base_to_ui(U256::from(1_u64), 6), "0.000001");
        assert_eq!(format_base_to_ui(U256::from(10_000_000_u64), 6), "10");
        assert_eq!(format_base_to_ui(U256::from(42_u64), 0), "42");
    }

    #[test]
    fn blank_or_zero_detection() {
        assert!(is_blank_or_zero(""));
        assert!(is_blank_or_zero("  "));
        assert!(is_blank_or_zero("0"));
        assert!(is_blank_or_zero("0.000"));
        assert!(!is_blank_or_zero("0.01"));
        assert!(!is_blank_or_zero("abc"), "garbage is not zero");
    }
}
