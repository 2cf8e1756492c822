//! Fixed-point arithmetic for prices, quantities and money
//!
//! Every price and quantity in the engine is an `i64` scaled by 10^8
//! (one unit = 1e-8). Arithmetic stays in integers on the hot path;
//! products widen to `i128` before the scale division so notional values
//! cannot overflow. Conversions to and from floating point or decimal
//! strings only happen at adapter and config boundaries.
//!
//! Rounding is banker's rounding (half-to-even) everywhere a fraction is
//! dropped, so repeated round-trips through conversions do not drift.

use crate::core::errors::ConversionError;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use std::str::FromStr;

/// Scale factor for 8 decimal places: 1.0 == 100_000_000
pub const SCALE: i64 = 100_000_000;

/// Fixed-point representation of 1.0
pub const ONE: i64 = SCALE;

/// Basis-point denominator (1 bp = 0.01%)
pub const BPS_DENOM: i64 = 10_000;

/// Largest f64 that converts without overflowing i64
pub const MAX_SAFE_F64: f64 = (i64::MAX / SCALE) as f64;

/// Smallest f64 that converts without overflowing i64
pub const MIN_SAFE_F64: f64 = (i64::MIN / SCALE) as f64;

/// Divide with banker's rounding (round half to even)
///
/// `d` must be positive. Works for negative numerators: -1.5 rounds to -2,
/// -0.5 rounds to 0.
#[inline(always)]
pub fn div_round_half_even(n: i128, d: i128) -> i128 {
    debug_assert!(d > 0);
    let q = n.div_euclid(d);
    let r = n.rem_euclid(d);
    let twice = r * 2;
    if twice > d || (twice == d && q & 1 != 0) {
        q + 1
    } else {
        q
    }
}

/// Multiply two fixed-point values: `a * b / SCALE`
///
/// The product is computed in i128 so it cannot overflow for any pair of
/// representable inputs. The result is rounded half-to-even.
#[inline(always)]
pub fn mul_fixed(a: i64, b: i64) -> i64 {
    div_round_half_even(a as i128 * b as i128, SCALE as i128) as i64
}

/// Multiply with overflow detection on the final narrowing
#[inline(always)]
pub fn mul_fixed_checked(a: i64, b: i64) -> Result<i64, ConversionError> {
    let wide = div_round_half_even(a as i128 * b as i128, SCALE as i128);
    i64::try_from(wide).map_err(|_| ConversionError::OutOfRange {
        value: wide as f64 / SCALE as f64,
    })
}

/// Divide two fixed-point values: `a * SCALE / b`
///
/// Returns None when `b == 0`.
#[inline(always)]
pub fn div_fixed(a: i64, b: i64) -> Option<i64> {
    if b == 0 {
        return None;
    }
    let (n, d) = if b > 0 {
        (a as i128 * SCALE as i128, b as i128)
    } else {
        (-(a as i128) * SCALE as i128, -(b as i128))
    };
    Some(div_round_half_even(n, d) as i64)
}

/// Notional value of `qty` at `price`: `price * qty / SCALE` in i128
///
/// Kept wide so position-value limit checks never truncate.
#[inline(always)]
pub fn notional(price: i64, qty: i64) -> i128 {
    div_round_half_even(price as i128 * qty as i128, SCALE as i128)
}

/// Fraction of `value` expressed in basis points
#[inline(always)]
pub fn bps_of(value: i64, bps: i64) -> i64 {
    div_round_half_even(value as i128 * bps as i128, BPS_DENOM as i128) as i64
}

/// Convert f64 to fixed-point with banker's rounding
///
/// Rejects NaN, infinities and values outside the representable range.
#[inline]
pub fn from_f64(value: f64) -> Result<i64, ConversionError> {
    if value.is_nan() {
        return Err(ConversionError::NotANumber);
    }
    if value.is_infinite() {
        return Err(ConversionError::Infinite {
            positive: value > 0.0,
        });
    }
    if !(MIN_SAFE_F64..=MAX_SAFE_F64).contains(&value) {
        return Err(ConversionError::OutOfRange { value });
    }
    Ok((value * SCALE as f64).round_ties_even() as i64)
}

/// Convert fixed-point to f64
#[inline(always)]
pub fn to_f64(value: i64) -> f64 {
    value as f64 / SCALE as f64
}

/// Parse a decimal string ("50000.25") into fixed-point
///
/// Uses `rust_decimal` so "0.1"-style inputs convert exactly; anything
/// below 1e-8 resolution is banker's-rounded.
pub fn from_decimal_str(s: &str) -> Result<i64, ConversionError> {
    let d = Decimal::from_str(s.trim()).map_err(|_| ConversionError::Unparseable {
        input: s.to_string(),
    })?;
    from_decimal(d)
}

/// Convert a `Decimal` into fixed-point with banker's rounding
pub fn from_decimal(d: Decimal) -> Result<i64, ConversionError> {
    let scaled = d
        .checked_mul(Decimal::from(SCALE))
        .ok_or(ConversionError::OutOfRange {
            value: d.to_f64().unwrap_or(f64::MAX),
        })?
        .round_dp_with_strategy(0, RoundingStrategy::MidpointNearestEven);
    scaled.to_i64().ok_or(ConversionError::OutOfRange {
        value: d.to_f64().unwrap_or(f64::MAX),
    })
}

/// Render with exactly 8 fractional digits ("100.25000000")
///
/// This is the canonical wire/log form; round-trips exactly through
/// `from_decimal_str`.
pub fn format_fixed(value: i64) -> String {
    let sign = if value < 0 { "-" } else { "" };
    let abs = value.unsigned_abs();
    format!(
        "{}{}.{:08}",
        sign,
        abs / SCALE as u64,
        abs % SCALE as u64
    )
}

/// Render for humans: trailing zeros trimmed, at least one fractional digit
/// removed entirely when the value is integral
pub fn format_trimmed(value: i64) -> String {
    let full = format_fixed(value);
    let trimmed = full.trim_end_matches('0');
    let trimmed = trimmed.strip_suffix('.').unwrap_or(trimmed);
    trimmed.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mul_widens_through_i128() {
        // 90,000 * 90,000 overflows i64 without widening
        let price = 90_000 * SCALE;
        let qty = 90_000 * SCALE;
        assert_eq!(notional(price, qty), 8_100_000_000i128 * SCALE as i128);
    }

    #[test]
    fn mul_rounds_half_to_even() {
        // 0.000000015 * 1.0 = 0.000000015 -> ties at x.5 units go to even
        assert_eq!(mul_fixed(3, SCALE / 2), 2); // 1.5 units -> 2
        assert_eq!(mul_fixed(1, SCALE / 2), 0); // 0.5 units -> 0
        assert_eq!(mul_fixed(5, SCALE / 2), 2); // 2.5 units -> 2
        assert_eq!(mul_fixed(-3, SCALE / 2), -2); // -1.5 -> -2
        assert_eq!(mul_fixed(-1, SCALE / 2), 0); // -0.5 -> 0
    }

    #[test]
    fn div_fixed_basic() {
        assert_eq!(div_fixed(ONE, 2 * ONE), Some(ONE / 2));
        assert_eq!(div_fixed(ONE, 0), None);
        assert_eq!(div_fixed(-ONE, 2 * ONE), Some(-ONE / 2));
        assert_eq!(div_fixed(ONE, -2 * ONE), Some(-ONE / 2));
    }

    #[test]
    fn f64_round_trip() {
        for v in [0.0, 1.0, 0.1, 50_000.12345678, -2.5e-8, 1234.00000001] {
            let fixed = from_f64(v).unwrap();
            assert!((to_f64(fixed) - v).abs() < 1e-8, "round trip of {}", v);
        }
    }

    #[test]
    fn f64_rejects_non_finite() {
        assert!(matches!(from_f64(f64::NAN), Err(ConversionError::NotANumber)));
        assert!(matches!(
            from_f64(f64::INFINITY),
            Err(ConversionError::Infinite { positive: true })
        ));
        assert!(from_f64(1e15).is_err());
    }

    #[test]
    fn decimal_str_is_exact() {
        assert_eq!(from_decimal_str("0.1").unwrap(), 10_000_000);
        assert_eq!(from_decimal_str("100.25").unwrap(), 100_25_000_000);
        assert_eq!(from_decimal_str("-3.00000001").unwrap(), -300_000_001);
        // half-to-even on the 9th digit
        assert_eq!(from_decimal_str("0.000000015").unwrap(), 2);
        assert_eq!(from_decimal_str("0.000000025").unwrap(), 2);
        assert!(from_decimal_str("not a number").is_err());
    }

    #[test]
    fn decimal_boundary_conversion() {
        use rust_decimal_macros::dec;
        assert_eq!(from_decimal(dec!(50000.25)).unwrap(), 50_000 * SCALE + SCALE / 4);
        assert_eq!(from_decimal(dec!(-0.00000001)).unwrap(), -1);
        // Sub-resolution digits round half-to-even
        assert_eq!(from_decimal(dec!(1.000000005)).unwrap(), SCALE);
        assert!(from_decimal(Decimal::MAX).is_err());
    }

    #[test]
    fn format_has_eight_digits() {
        assert_eq!(format_fixed(100_25_000_000), "100.25000000");
        assert_eq!(format_fixed(-1), "-0.00000001");
        assert_eq!(format_fixed(0), "0.00000000");
    }

    #[test]
    fn format_round_trips() {
        for v in [0, 1, -1, 100_25_000_000, i64::MAX, i64::MIN + 1] {
            assert_eq!(from_decimal_str(&format_fixed(v)).unwrap(), v);
        }
    }

    #[test]
    fn trimmed_output() {
        assert_eq!(format_trimmed(100_25_000_000), "100.25");
        assert_eq!(format_trimmed(3 * SCALE), "3");
        assert_eq!(format_trimmed(-1), "-0.00000001");
    }
}
