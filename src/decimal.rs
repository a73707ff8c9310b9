use rust_decimal::prelude::FromPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Div, Mul, Neg, Sub, SubAssign};
use std::str::FromStr;

use crate::errors::{LedgerError, Result};

/// number of decimal places every monetary value is kept at
pub const CENT_SCALE: u32 = 2;

/// round half-away-from-zero to cents
pub fn round_to_cents(d: Decimal) -> Money {
    Money(d.round_dp_with_strategy(CENT_SCALE, RoundingStrategy::MidpointAwayFromZero))
}

/// sum after per-term rounding, then round again
pub fn sum_cents<I>(terms: I) -> Money
where
    I: IntoIterator<Item = Decimal>,
{
    let total: Decimal = terms
        .into_iter()
        .map(|t| round_to_cents(t).as_decimal())
        .sum();
    round_to_cents(total)
}

/// Money type held at cent precision
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
pub struct Money(Decimal);

impl Money {
    pub const ZERO: Money = Money(Decimal::ZERO);
    pub const CENT: Money = Money(Decimal::from_parts(1, 0, 0, false, 2));

    /// create from decimal, rounding to cents
    pub fn from_decimal(d: Decimal) -> Self {
        round_to_cents(d)
    }

    /// create from string with exact parsing
    pub fn from_str_exact(s: &str) -> std::result::Result<Self, rust_decimal::Error> {
        Ok(round_to_cents(Decimal::from_str(s)?))
    }

    /// create from a binary float received at the api boundary
    ///
    /// Goes through the shortest round-trip representation of the float, so
    /// `0.1 + 0.2` becomes `0.30` rather than picking up the binary error.
    pub fn from_f64(value: f64) -> Result<Self> {
        if !value.is_finite() {
            return Err(LedgerError::InvalidAmount {
                message: format!("non-finite amount {}", value),
            });
        }

        let parsed = Decimal::from_str(&value.to_string())
            .ok()
            .or_else(|| Decimal::from_f64(value))
            .ok_or_else(|| LedgerError::InvalidAmount {
                message: format!("amount {} out of range", value),
            })?;

        Ok(round_to_cents(parsed))
    }

    /// create from integer amount (euros)
    pub fn from_major(amount: i64) -> Self {
        Money(Decimal::from(amount))
    }

    /// create from cents
    pub fn from_minor(cents: i64) -> Self {
        Money(Decimal::new(cents, CENT_SCALE))
    }

    /// get underlying decimal
    pub fn as_decimal(&self) -> Decimal {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// strictly greater than zero
    pub fn is_positive(&self) -> bool {
        self.0 > Decimal::ZERO
    }

    /// strictly less than zero
    pub fn is_negative(&self) -> bool {
        self.0 < Decimal::ZERO
    }

    pub fn abs(&self) -> Self {
        Money(self.0.abs())
    }

    pub fn min(self, other: Self) -> Self {
        Money(self.0.min(other.0))
    }

    pub fn max(self, other: Self) -> Self {
        Money(self.0.max(other.0))
    }

    /// floor at zero
    pub fn clamp_non_negative(self) -> Self {
        self.max(Money::ZERO)
    }

    /// equal within tolerance (inclusive)
    pub fn approx_eq(&self, other: Money, tolerance: Money) -> bool {
        (*self - other).abs() <= tolerance
    }

    /// share of this amount proportional to `part / whole`
    pub fn prorate(&self, part: Decimal, whole: Decimal) -> Option<Self> {
        if whole.is_zero() {
            return None;
        }
        Some(round_to_cents(self.0 * part / whole))
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

impl FromStr for Money {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Money::from_str_exact(s)
    }
}

impl From<Decimal> for Money {
    fn from(d: Decimal) -> Self {
        Money::from_decimal(d)
    }
}

impl From<i32> for Money {
    fn from(i: i32) -> Self {
        Money::from_major(i as i64)
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, other: Money) -> Money {
        round_to_cents(self.0 + other.0)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, other: Money) {
        *self = *self + other;
    }
}

impl Sub for Money {
    type Output = Money;

    fn sub(self, other: Money) -> Money {
        round_to_cents(self.0 - other.0)
    }
}

impl SubAssign for Money {
    fn sub_assign(&mut self, other: Money) {
        *self = *self - other;
    }
}

impl Neg for Money {
    type Output = Money;

    fn neg(self) -> Money {
        Money(-self.0)
    }
}

impl Mul<Decimal> for Money {
    type Output = Money;

    fn mul(self, other: Decimal) -> Money {
        round_to_cents(self.0 * other)
    }
}

impl Div<Decimal> for Money {
    type Output = Money;

    fn div(self, other: Decimal) -> Money {
        round_to_cents(self.0 / other)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        sum_cents(iter.map(|m| m.0))
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Money {
        sum_cents(iter.map(|m| m.0))
    }
}

/// rate type for percentages and ratios
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub struct Rate(Decimal);

impl Rate {
    pub const ZERO: Rate = Rate(Decimal::ZERO);
    pub const ONE: Rate = Rate(Decimal::ONE);

    /// create from decimal (e.g., 0.30 for 30%)
    pub fn from_decimal(d: Decimal) -> Self {
        Rate(d)
    }

    /// create from percentage (e.g., 30 for 30%)
    pub fn from_percentage(p: u32) -> Self {
        Rate(Decimal::from(p) / Decimal::from(100))
    }

    pub fn as_decimal(&self) -> Decimal {
        self.0
    }

    pub fn as_percentage(&self) -> Decimal {
        self.0 * Decimal::from(100)
    }

    /// 1 - rate
    pub fn complement(&self) -> Rate {
        Rate(Decimal::ONE - self.0)
    }

    /// within [0, 1]
    pub fn is_unit_interval(&self) -> bool {
        self.0 >= Decimal::ZERO && self.0 <= Decimal::ONE
    }
}

impl fmt::Display for Rate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.as_percentage().normalize())
    }
}

impl From<Decimal> for Rate {
    fn from(d: Decimal) -> Self {
        Rate::from_decimal(d)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_float_drift_is_removed() {
        let m = Money::from_f64(0.1 + 0.2).unwrap();
        assert_eq!(m, Money::from_str_exact("0.30").unwrap());
        assert_eq!(m.to_string(), "0.30");
    }

    #[test]
    fn test_half_away_from_zero() {
        assert_eq!(round_to_cents(dec!(2.345)), Money::from_minor(235));
        assert_eq!(round_to_cents(dec!(-2.345)), Money::from_minor(-235));
        assert_eq!(round_to_cents(dec!(2.344)), Money::from_minor(234));
        // banker's rounding would give 0.12 here
        assert_eq!(round_to_cents(dec!(0.125)), Money::from_minor(13));
        assert_eq!(Money::from_f64(1.005).unwrap(), Money::from_minor(101));
    }

    #[test]
    fn test_non_finite_float_rejected() {
        assert!(Money::from_f64(f64::NAN).is_err());
        assert!(Money::from_f64(f64::INFINITY).is_err());
    }

    #[test]
    fn test_sum_cents_rounds_each_term() {
        // 3 x 0.004 would sum to 0.01 without per-term rounding
        let total = sum_cents(vec![dec!(0.004), dec!(0.004), dec!(0.004)]);
        assert_eq!(total, Money::ZERO);

        let total = sum_cents(vec![dec!(10.005), dec!(20.005)]);
        assert_eq!(total, Money::from_minor(3002));
    }

    #[test]
    fn test_prorate() {
        let amount = Money::from_major(1000);
        assert_eq!(amount.prorate(dec!(125), dec!(1000)), Some(Money::from_major(125)));
        assert_eq!(amount.prorate(dec!(1), dec!(3)), Some(Money::from_minor(33333)));
        assert_eq!(amount.prorate(dec!(1), Decimal::ZERO), None);
    }

    #[test]
    fn test_approx_eq_and_clamp() {
        let a = Money::from_minor(1000);
        assert!(a.approx_eq(Money::from_minor(1001), Money::CENT));
        assert!(!a.approx_eq(Money::from_minor(1002), Money::CENT));
        assert_eq!(Money::from_minor(-5).clamp_non_negative(), Money::ZERO);
    }

    #[test]
    fn test_rate_complement() {
        let fixed = Rate::from_percentage(30);
        assert_eq!(fixed.complement().as_decimal(), dec!(0.70));
        assert!(fixed.is_unit_interval());
        assert!(!Rate::from_decimal(dec!(1.2)).is_unit_interval());
        assert_eq!(fixed.to_string(), "30%");
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn rounding_is_idempotent(x in -1.0e9f64..1.0e9f64) {
            let once = Money::from_f64(x).unwrap();
            let twice = round_to_cents(once.as_decimal());
            prop_assert_eq!(once, twice);
        }

        #[test]
        fn decimal_rounding_is_idempotent(mantissa in -1_000_000_000_000i64..1_000_000_000_000i64, scale in 0u32..8u32) {
            let d = Decimal::new(mantissa, scale);
            prop_assert_eq!(round_to_cents(round_to_cents(d).as_decimal()), round_to_cents(d));
        }
    }
}
