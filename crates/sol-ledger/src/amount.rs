//! Decimal amount scaling.
//!
//! User-entered amounts are decimal text ("1.5"). The ledger only deals in
//! integer base units (lamports for SOL, `10^-decimals` of a token), so the
//! text is scaled by `10^decimals` and truncated toward zero. Parsing is done
//! on the digits directly; going through `f64` would mis-scale values such as
//! `0.1 * 10^9`.

use crate::error::SolError;

/// Convert decimal text to integer base units.
///
/// Accepts an optional integer part and an optional fractional part
/// (`"2"`, `"1.5"`, `".25"`, `"3."`), with surrounding whitespace ignored.
/// Fractional digits beyond `decimals` are dropped. Negative numbers,
/// exponents, signs, and anything that overflows `u64` are rejected with
/// [`SolError::InvalidAmount`].
pub fn parse_amount(text: &str, decimals: u8) -> Result<u64, SolError> {
    let text = text.trim();

    if text.is_empty() {
        return Err(SolError::InvalidAmount("amount is empty".into()));
    }
    if text.starts_with('-') {
        return Err(SolError::InvalidAmount(format!(
            "amount must not be negative: {text}"
        )));
    }

    let (int_part, frac_part) = match text.split_once('.') {
        Some((int_part, frac_part)) => (int_part, frac_part),
        None => (text, ""),
    };

    if int_part.is_empty() && frac_part.is_empty() {
        return Err(SolError::InvalidAmount(format!("not a number: {text}")));
    }
    if !int_part.bytes().all(|b| b.is_ascii_digit())
        || !frac_part.bytes().all(|b| b.is_ascii_digit())
    {
        return Err(SolError::InvalidAmount(format!("not a number: {text}")));
    }

    let scale = 10u128
        .checked_pow(u32::from(decimals))
        .ok_or_else(|| SolError::InvalidAmount(format!("unsupported decimals: {decimals}")))?;

    let whole = parse_digits(int_part)?
        .checked_mul(scale)
        .ok_or_else(|| overflow(text))?;

    // Keep at most `decimals` fractional digits, then right-pad to `decimals`.
    let kept = &frac_part[..frac_part.len().min(usize::from(decimals))];
    let padding = u32::from(decimals) - kept.len() as u32;
    let fraction = parse_digits(kept)?
        .checked_mul(10u128.pow(padding))
        .ok_or_else(|| overflow(text))?;

    let total = whole.checked_add(fraction).ok_or_else(|| overflow(text))?;
    u64::try_from(total).map_err(|_| overflow(text))
}

/// Render base units as decimal text, trimming trailing fractional zeros.
pub fn format_amount(base_units: u64, decimals: u8) -> String {
    if decimals == 0 {
        return base_units.to_string();
    }

    let digits = format!("{:0>width$}", base_units, width = usize::from(decimals) + 1);
    let (int_part, frac_part) = digits.split_at(digits.len() - usize::from(decimals));
    let frac_part = frac_part.trim_end_matches('0');

    if frac_part.is_empty() {
        int_part.to_string()
    } else {
        format!("{int_part}.{frac_part}")
    }
}

fn parse_digits(digits: &str) -> Result<u128, SolError> {
    if digits.is_empty() {
        return Ok(0);
    }
    // Leading zeros are harmless but can push a short value past u128's
    // digit budget, so strip them first.
    let significant = digits.trim_start_matches('0');
    if significant.is_empty() {
        return Ok(0);
    }
    significant.parse::<u128>().map_err(|_| overflow(digits))
}

fn overflow(text: &str) -> SolError {
    SolError::InvalidAmount(format!("amount does not fit in u64 base units: {text}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_and_a_half_sol() {
        assert_eq!(parse_amount("1.5", 9).unwrap(), 1_500_000_000);
    }

    #[test]
    fn whole_number() {
        assert_eq!(parse_amount("2", 6).unwrap(), 2_000_000);
    }

    #[test]
    fn tenth_is_exact() {
        // 0.1 * 1e9 in floating point is 100000000.00000001.
        assert_eq!(parse_amount("0.1", 9).unwrap(), 100_000_000);
    }

    #[test]
    fn leading_dot_and_trailing_dot() {
        assert_eq!(parse_amount(".25", 6).unwrap(), 250_000);
        assert_eq!(parse_amount("3.", 6).unwrap(), 3_000_000);
    }

    #[test]
    fn excess_fraction_truncates_toward_zero() {
        assert_eq!(parse_amount("1.2345678", 6).unwrap(), 1_234_567);
        assert_eq!(parse_amount("0.0000009", 6).unwrap(), 0);
    }

    #[test]
    fn whitespace_is_trimmed() {
        assert_eq!(parse_amount("  4.2 ", 1).unwrap(), 42);
    }

    #[test]
    fn zero_decimals() {
        assert_eq!(parse_amount("17.9", 0).unwrap(), 17);
    }

    #[test]
    fn zero_is_accepted() {
        assert_eq!(parse_amount("0", 9).unwrap(), 0);
        assert_eq!(parse_amount("0.000", 9).unwrap(), 0);
    }

    #[test]
    fn leading_zeros_are_ignored() {
        assert_eq!(parse_amount("000000000000000000000000000000000000000001", 2).unwrap(), 100);
    }

    #[test]
    fn negative_is_rejected() {
        let err = parse_amount("-1", 9).unwrap_err();
        assert!(matches!(err, SolError::InvalidAmount(_)));
        assert!(err.to_string().contains("negative"));
    }

    #[test]
    fn non_numeric_is_rejected() {
        for text in ["abc", "1.2.3", "1,5", "1e9", "+1", ".", "", "   ", "0x10", "NaN"] {
            assert!(
                matches!(parse_amount(text, 9), Err(SolError::InvalidAmount(_))),
                "{text:?} should be rejected"
            );
        }
    }

    #[test]
    fn u64_max_lamports_fits() {
        assert_eq!(parse_amount("18446744073.709551615", 9).unwrap(), u64::MAX);
    }

    #[test]
    fn overflow_is_rejected() {
        assert!(parse_amount("18446744073.709551616", 9).is_err());
        assert!(parse_amount("99999999999999999999999999999999999999999", 9).is_err());
    }

    #[test]
    fn absurd_decimals_are_rejected() {
        assert!(parse_amount("1", 40).is_err());
    }

    #[test]
    fn format_trims_trailing_zeros() {
        assert_eq!(format_amount(1_500_000_000, 9), "1.5");
        assert_eq!(format_amount(2_000_000, 6), "2");
        assert_eq!(format_amount(1, 6), "0.000001");
        assert_eq!(format_amount(42, 0), "42");
    }
}
