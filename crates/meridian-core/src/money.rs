//! # Money Module
//!
//! Provides the `Money` and `Rate` types for handling monetary values and
//! percentages safely.
//!
//! ## Why Decimal Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  In JavaScript/floating point:                                          │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌ WRONG!                           │
//! │                                                                         │
//! │  In a B2B quote with 40 lines, each unrounded:                          │
//! │    Σ line totals drifts by a cent  → grand total disagrees with PDF     │
//! │                                                                         │
//! │  OUR SOLUTION: base-10 Decimal + explicit rounding                      │
//! │    Quantities can be fractional (2.5 kg), so integer cents are not      │
//! │    enough. Every monetary boundary calls `round_dp(precision)` with     │
//! │    half-up rounding, and nothing else rounds implicitly.                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use meridian_core::money::{Money, Rate};
//! use rust_decimal::Decimal;
//!
//! let list = Money::from_major(100);
//! let unit = list.apply_percentage_discount(Rate::from_percent(Decimal::TEN));
//! assert_eq!(unit, Money::from_major(90));
//!
//! let total = unit.times(Decimal::from(10)).round_dp(2);
//! assert_eq!(total, Money::from_major(900));
//! ```

use rust_decimal::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};
use tracing::warn;
use ts_rs::TS;

/// Rounding used at every monetary boundary (half-up, away from zero).
pub const ROUNDING: RoundingStrategy = RoundingStrategy::MidpointAwayFromZero;

/// Guard digits kept when converting from `f64`.
///
/// `f64` carries binary noise past ~15 significant digits; nothing in the
/// storefront is priced finer than this.
const F64_GUARD_DP: u32 = 9;

/// Rounds a raw decimal half-up to `precision` places.
#[inline]
pub fn round_half_up(value: Decimal, precision: u32) -> Decimal {
    value.round_dp_with_strategy(precision, ROUNDING)
}

/// Product of two decimals, or zero when it does not fit in a `Decimal`.
///
/// Prices and quantities come from the storefront unchecked; an amount
/// too large to represent degrades like any other bad value.
fn mul_or_zero(a: Decimal, b: Decimal) -> Decimal {
    a.checked_mul(b).unwrap_or_else(|| {
        warn!(%a, %b, "Decimal multiplication overflowed, using 0");
        Decimal::ZERO
    })
}

/// Quotient of two decimals, or zero on a zero divisor or overflow.
fn div_or_zero(a: Decimal, b: Decimal) -> Decimal {
    a.checked_div(b).unwrap_or_else(|| {
        if !b.is_zero() {
            warn!(%a, %b, "Decimal division overflowed, using 0");
        }
        Decimal::ZERO
    })
}

/// Converts an `f64` to `Decimal`, mapping NaN/Infinity to zero.
pub fn decimal_from_f64(value: f64) -> Decimal {
    if !value.is_finite() {
        return Decimal::ZERO;
    }
    Decimal::from_f64(value)
        .map(|d| d.round_dp(F64_GUARD_DP).normalize())
        .unwrap_or_default()
}

// =============================================================================
// Money Type
// =============================================================================

/// A monetary amount in the quote currency.
///
/// ## Design Decisions
/// - **Decimal (signed)**: negative values appear as rounding adjustments
///   and volume-discount savings
/// - **Single field tuple struct**: zero-cost wrapper over `Decimal`
/// - **JSON number on the wire**: the order API rejects strings and NaN
///
/// ## Where Money is Used
/// ```text
/// LineItem.unit_list_price ──► unit_price ──► total_price ──► pf_rate
///                                                 │
///                                                 ▼
///                             PricingResult / VdDetails ──► QuotationPayload
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize, TS,
)]
#[serde(transparent)]
#[ts(export)]
pub struct Money(
    #[serde(serialize_with = "rust_decimal::serde::float::serialize")]
    #[ts(type = "number")]
    Decimal,
);

impl Money {
    /// Zero in any currency.
    pub const ZERO: Money = Money(Decimal::ZERO);

    /// Wraps an exact decimal amount.
    #[inline]
    pub const fn new(amount: Decimal) -> Self {
        Money(amount)
    }

    /// Creates a whole-unit amount.
    ///
    /// ```rust
    /// use meridian_core::money::Money;
    ///
    /// assert_eq!(Money::from_major(90).to_f64(), 90.0);
    /// ```
    #[inline]
    pub fn from_major(units: i64) -> Self {
        Money(Decimal::from(units))
    }

    /// Creates money from a float coming off the wire.
    ///
    /// Non-finite input becomes zero instead of poisoning later sums.
    ///
    /// ```rust
    /// use meridian_core::money::Money;
    ///
    /// assert!(Money::from_f64(f64::NAN).is_zero());
    /// assert_eq!(Money::from_f64(12.5).to_f64(), 12.5);
    /// ```
    pub fn from_f64(value: f64) -> Self {
        Money(decimal_from_f64(value))
    }

    /// Returns zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money::ZERO
    }

    /// Returns the exact decimal amount.
    #[inline]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Returns the amount as `f64` for display layers. Always finite.
    pub fn to_f64(&self) -> f64 {
        self.0.to_f64().unwrap_or_default()
    }

    /// Checks if the value is zero.
    #[inline]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Checks if the value is positive (greater than zero).
    #[inline]
    pub fn is_positive(&self) -> bool {
        self.0 > Decimal::ZERO
    }

    /// Checks if the value is negative (less than zero).
    #[inline]
    pub fn is_negative(&self) -> bool {
        self.0 < Decimal::ZERO
    }

    /// Returns the absolute value.
    #[inline]
    pub fn abs(&self) -> Self {
        Money(self.0.abs())
    }

    /// Rounds half-up to `precision` decimal places.
    ///
    /// ```rust
    /// use meridian_core::money::Money;
    ///
    /// assert_eq!(Money::from_f64(10.005).round_dp(2), Money::from_f64(10.01));
    /// assert_eq!(Money::from_f64(-10.005).round_dp(2), Money::from_f64(-10.01));
    /// ```
    #[inline]
    pub fn round_dp(&self, precision: u32) -> Self {
        Money(round_half_up(self.0, precision))
    }

    /// Rounds half-up to the nearest whole currency unit.
    #[inline]
    pub fn round_whole(&self) -> Self {
        self.round_dp(0)
    }

    /// Multiplies by a (possibly fractional) quantity. Not rounded.
    ///
    /// A product too large for `Decimal` is zero.
    #[inline]
    pub fn times(&self, quantity: Decimal) -> Self {
        Money(mul_or_zero(self.0, quantity))
    }

    /// Divides by a quantity, returning zero when the quantity is zero.
    ///
    /// Used for spreading line charges back onto a unit.
    pub fn per(&self, quantity: Decimal) -> Self {
        Money(div_or_zero(self.0, quantity))
    }

    /// Returns `rate` percent of this amount. Not rounded.
    ///
    /// ```rust
    /// use meridian_core::money::{Money, Rate};
    /// use rust_decimal::Decimal;
    ///
    /// let pf = Money::from_major(900).percent(Rate::from_percent(Decimal::from(5)));
    /// assert_eq!(pf, Money::from_major(45));
    /// ```
    #[inline]
    pub fn percent(&self, rate: Rate) -> Self {
        Money(mul_or_zero(self.0, rate.fraction()))
    }

    /// Subtracts `rate` percent from this amount. Not rounded.
    #[inline]
    pub fn apply_percentage_discount(&self, rate: Rate) -> Self {
        *self - self.percent(rate)
    }

    /// Removes an included tax: `gross / (1 + rate/100)`. Not rounded.
    pub fn exclude_tax(&self, rate: Rate) -> Self {
        let divisor = Decimal::ONE.saturating_add(rate.fraction());
        if divisor.is_zero() {
            return *self;
        }
        Money(div_or_zero(self.0, divisor))
    }

    /// Expresses this amount as a percentage of `whole`.
    ///
    /// Returns `None` when `whole` is zero or the ratio does not fit.
    pub fn share_of(&self, whole: Money) -> Option<Decimal> {
        if whole.is_zero() {
            return None;
        }
        let ratio = self.0.checked_div(whole.0)?;
        ratio.checked_mul(Decimal::ONE_HUNDRED)
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Plain decimal rendering for logs. Use [`crate::format`] for the UI.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Decimal> for Money {
    fn from(amount: Decimal) -> Self {
        Money(amount)
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0.saturating_add(other.0))
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 = self.0.saturating_add(other.0);
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0.saturating_sub(other.0))
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 = self.0.saturating_sub(other.0);
    }
}

impl Neg for Money {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Money(-self.0)
    }
}

/// Multiplication by a quantity.
impl Mul<Decimal> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, quantity: Decimal) -> Self {
        self.times(quantity)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::ZERO, |acc, m| acc + m)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        iter.fold(Money::ZERO, |acc, m| acc + *m)
    }
}

// =============================================================================
// Rate Type
// =============================================================================

/// A percentage such as a tax rate, discount or P&F surcharge.
///
/// Stored as the percent value itself: `18` means 18%.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize, TS,
)]
#[serde(transparent)]
#[ts(export)]
pub struct Rate(
    #[serde(serialize_with = "rust_decimal::serde::float::serialize")]
    #[ts(type = "number")]
    Decimal,
);

impl Rate {
    /// 0%.
    pub const ZERO: Rate = Rate(Decimal::ZERO);

    /// 100%.
    pub const HUNDRED: Rate = Rate(Decimal::ONE_HUNDRED);

    /// Creates a rate from a percent value.
    #[inline]
    pub const fn from_percent(percent: Decimal) -> Self {
        Rate(percent)
    }

    /// Creates a rate from a float percent. Non-finite input becomes 0%.
    pub fn from_f64(percent: f64) -> Self {
        Rate(decimal_from_f64(percent))
    }

    /// Zero tax rate.
    #[inline]
    pub const fn zero() -> Self {
        Rate::ZERO
    }

    /// Returns the percent value.
    #[inline]
    pub const fn percent(&self) -> Decimal {
        self.0
    }

    /// Returns the rate as a fraction (`18%` → `0.18`).
    #[inline]
    pub fn fraction(&self) -> Decimal {
        self.0 / Decimal::ONE_HUNDRED
    }

    /// Checks if the rate is zero.
    #[inline]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Checks if the rate is strictly positive.
    #[inline]
    pub fn is_positive(&self) -> bool {
        self.0 > Decimal::ZERO
    }

    /// Rounds half-up to `precision` decimal places.
    #[inline]
    pub fn round_dp(&self, precision: u32) -> Self {
        Rate(round_half_up(self.0, precision))
    }
}

impl fmt::Display for Rate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0.normalize())
    }
}

impl Add for Rate {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Rate(self.0.saturating_add(other.0))
    }
}

impl Sum for Rate {
    fn sum<I: Iterator<Item = Rate>>(iter: I) -> Self {
        iter.fold(Rate::ZERO, |acc, r| acc + r)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn test_from_f64_precision() {
        // Classic floating point problem: 0.1 + 0.2 != 0.3
        let sum = Money::from_f64(0.1) + Money::from_f64(0.2);
        assert_eq!(sum, Money::new(dec("0.3")));
    }

    #[test]
    fn test_from_f64_non_finite_is_zero() {
        assert!(Money::from_f64(f64::NAN).is_zero());
        assert!(Money::from_f64(f64::INFINITY).is_zero());
        assert!(Rate::from_f64(f64::NEG_INFINITY).is_zero());
    }

    #[test]
    fn test_round_half_up() {
        assert_eq!(Money::new(dec("2.345")).round_dp(2), Money::new(dec("2.35")));
        assert_eq!(Money::new(dec("2.344")).round_dp(2), Money::new(dec("2.34")));
        assert_eq!(Money::new(dec("0.5")).round_whole(), Money::from_major(1));
        assert_eq!(Money::new(dec("-0.5")).round_whole(), Money::from_major(-1));
    }

    #[test]
    fn test_accumulation_stays_exact() {
        let total: Money = (0..1000).map(|_| Money::new(dec("0.01"))).sum();
        assert_eq!(total, Money::from_major(10));
    }

    #[test]
    fn test_percent_and_discount() {
        let list = Money::from_major(100);
        let ten = Rate::from_percent(Decimal::TEN);
        assert_eq!(list.percent(ten), Money::from_major(10));
        assert_eq!(list.apply_percentage_discount(ten), Money::from_major(90));
    }

    #[test]
    fn test_exclude_tax() {
        let gross = Money::from_major(118);
        let net = gross.exclude_tax(Rate::from_percent(Decimal::from(18)));
        assert_eq!(net.round_dp(2), Money::from_major(100));
    }

    #[test]
    fn test_per_zero_quantity() {
        assert!(Money::from_major(45).per(Decimal::ZERO).is_zero());
        assert_eq!(
            Money::from_major(45).per(Decimal::from(10)),
            Money::new(dec("4.5"))
        );
    }

    #[test]
    fn test_share_of() {
        let cost = Money::from_major(60);
        assert_eq!(cost.share_of(Money::from_major(80)), Some(dec("75")));
        assert_eq!(cost.share_of(Money::ZERO), None);
    }

    #[test]
    fn test_overflow_degrades_to_zero() {
        let huge = Money::new(dec("100000000000000000000"));
        let quantity = dec("1000000000");
        assert!(huge.times(quantity).is_zero());
        assert!((huge * quantity).is_zero());
        assert!(Money::new(Decimal::MAX).percent(Rate::from_percent(dec("200"))).is_zero());
        assert!(Money::new(Decimal::MAX).per(dec("0.0000001")).is_zero());
        assert_eq!(Money::new(Decimal::MAX).share_of(Money::new(dec("0.0000001"))), None);
    }

    #[test]
    fn test_addition_saturates() {
        let max = Money::new(Decimal::MAX);
        assert_eq!(max + max, max);
        let mut acc = max;
        acc += Money::from_major(1);
        assert_eq!(acc, max);
        assert_eq!(Money::new(Decimal::MIN) - max, Money::new(Decimal::MIN));
    }

    #[test]
    fn test_serializes_as_number() {
        let json = serde_json::to_string(&Money::new(dec("12.5"))).unwrap();
        assert_eq!(json, "12.5");
        let back: Money = serde_json::from_str("12.5").unwrap();
        assert_eq!(back, Money::new(dec("12.5")));
        let from_text: Money = serde_json::from_str("\"12.50\"").unwrap();
        assert_eq!(from_text, back);
    }

    #[test]
    fn test_rate_display() {
        assert_eq!(Rate::from_percent(dec("18.00")).to_string(), "18%");
    }
}
