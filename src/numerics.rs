//! Fixed-precision numerics: [`Price`], [`Quantity`], and [`Money`] (spec §4.1).
//!
//! All three store a raw signed (or, for `Quantity`, non-negative) integer scaled by
//! `10^9` — the internal resolution is always full 9-digit precision regardless of the
//! `precision` a value was constructed with. `precision` only governs how a value rounds
//! when displayed or converted to a [`rust_decimal::Decimal`]. Arithmetic between two
//! fixed-point values operates directly on the raw `i128` (both are already at the same
//! internal scale) and the result takes the larger of the two precisions.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::currency::Currency;
use crate::error::{SimError, SimResult, ValidationError};

/// Internal fixed-point resolution: every `Price`/`Quantity`/`Money` raw value is scaled
/// by this factor, independent of the value's reported `precision`.
pub const FIXED_SCALAR: i128 = 1_000_000_000;
/// Maximum precision a `Price`/`Quantity`/`Money` may report (spec §4.1).
pub const MAX_PRECISION: u8 = 9;

fn check_precision(precision: u8) -> SimResult<()> {
    if precision > MAX_PRECISION {
        return Err(SimError::Validation(ValidationError::PrecisionExceeded {
            precision,
            max: MAX_PRECISION,
        }));
    }
    Ok(())
}

fn decimal_to_raw(value: Decimal, precision: u8) -> SimResult<i128> {
    check_precision(precision)?;
    let scaled = value
        .round_dp(precision as u32)
        .checked_mul(Decimal::from(FIXED_SCALAR))
        .ok_or_else(|| SimError::Validation(ValidationError::Other(format!("overflow scaling {value}"))))?;
    scaled
        .trunc()
        .to_string()
        .parse::<i128>()
        .map_err(|_| SimError::Validation(ValidationError::Other(format!("cannot represent {value} as raw i128"))))
}

fn raw_to_decimal(raw: i128, precision: u8) -> Decimal {
    let full = Decimal::from_i128_with_scale(raw, 9);
    full.round_dp(precision as u32)
}

/// A signed fixed-point price, spec §4.1.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Price {
    raw: i128,
    precision: u8,
}

impl Price {
    pub fn new(value: Decimal, precision: u8) -> SimResult<Self> {
        let raw = decimal_to_raw(value, precision)?;
        Ok(Self { raw, precision })
    }

    pub fn from_raw(raw: i128, precision: u8) -> SimResult<Self> {
        check_precision(precision)?;
        Ok(Self { raw, precision })
    }

    pub fn zero(precision: u8) -> Self {
        Self { raw: 0, precision }
    }

    pub fn raw(&self) -> i128 {
        self.raw
    }

    pub fn precision(&self) -> u8 {
        self.precision
    }

    pub fn as_decimal(&self) -> Decimal {
        raw_to_decimal(self.raw, self.precision)
    }

    pub fn is_positive(&self) -> bool {
        self.raw > 0
    }

    /// Widens `self` to the larger of `self.precision` and `other`, leaving `raw` (the
    /// exact value) unchanged — only the reporting precision changes.
    fn widened(mut self, other: u8) -> Self {
        self.precision = self.precision.max(other);
        self
    }

    pub fn checked_add(self, rhs: Self) -> Self {
        Self {
            raw: self.raw + rhs.raw,
            precision: self.precision.max(rhs.precision),
        }
    }

    pub fn checked_sub(self, rhs: Self) -> Self {
        Self {
            raw: self.raw - rhs.raw,
            precision: self.precision.max(rhs.precision),
        }
    }

    /// Multiplies this price by a quantity, producing a notional `Money` value in the
    /// given currency (spec §4.1 cross-type arithmetic: `price * quantity -> notional`).
    pub fn mul_quantity(&self, qty: Quantity, currency: Currency) -> Money {
        let raw = (self.raw * qty.raw) / FIXED_SCALAR;
        Money {
            raw,
            precision: self.precision.max(qty.precision).min(currency.precision),
            currency,
        }
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_decimal())
    }
}

impl FromStr for Price {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let decimal = Decimal::from_str(s).map_err(|_| {
            SimError::Validation(ValidationError::Other(format!("cannot parse price from '{s}'")))
        })?;
        let precision = decimal.scale().min(MAX_PRECISION as u32) as u8;
        Self::new(decimal, precision)
    }
}

impl PartialEq for Price {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}
impl Eq for Price {}

impl PartialOrd for Price {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for Price {
    fn cmp(&self, other: &Self) -> Ordering {
        self.raw.cmp(&other.raw)
    }
}

impl std::ops::Add for Price {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        self.checked_add(rhs)
    }
}
impl std::ops::Sub for Price {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        self.checked_sub(rhs)
    }
}
impl std::ops::Neg for Price {
    type Output = Self;
    fn neg(self) -> Self {
        Self { raw: -self.raw, precision: self.precision }
    }
}

/// A non-negative fixed-point quantity, spec §4.1. Underflow below zero is forbidden and
/// raises a [`ValidationError`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Quantity {
    raw: i128,
    precision: u8,
}

impl Quantity {
    pub fn new(value: Decimal, precision: u8) -> SimResult<Self> {
        if value.is_sign_negative() {
            return Err(SimError::Validation(ValidationError::NegativeQuantity(value.to_string())));
        }
        let raw = decimal_to_raw(value, precision)?;
        Ok(Self { raw, precision })
    }

    pub fn from_raw(raw: i128, precision: u8) -> SimResult<Self> {
        check_precision(precision)?;
        if raw < 0 {
            return Err(SimError::Validation(ValidationError::NegativeQuantity(raw.to_string())));
        }
        Ok(Self { raw, precision })
    }

    pub fn zero(precision: u8) -> Self {
        Self { raw: 0, precision }
    }

    pub fn raw(&self) -> i128 {
        self.raw
    }

    pub fn precision(&self) -> u8 {
        self.precision
    }

    pub fn as_decimal(&self) -> Decimal {
        raw_to_decimal(self.raw, self.precision)
    }

    pub fn is_zero(&self) -> bool {
        self.raw == 0
    }

    pub fn checked_add(self, rhs: Self) -> Self {
        Self {
            raw: self.raw + rhs.raw,
            precision: self.precision.max(rhs.precision),
        }
    }

    /// Subtracts `rhs` from `self`, raising if the result would be negative (spec §4.1:
    /// "Underflow of `Quantity` below zero is forbidden and must raise").
    pub fn checked_sub(self, rhs: Self) -> SimResult<Self> {
        let raw = self.raw - rhs.raw;
        if raw < 0 {
            return Err(SimError::Validation(ValidationError::NegativeQuantity(format!(
                "{} - {}",
                self.as_decimal(),
                rhs.as_decimal()
            ))));
        }
        Ok(Self { raw, precision: self.precision.max(rhs.precision) })
    }

    pub fn is_multiple_of(&self, increment: Quantity) -> bool {
        increment.raw != 0 && self.raw % increment.raw == 0
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_decimal())
    }
}

impl FromStr for Quantity {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let decimal = Decimal::from_str(s).map_err(|_| {
            SimError::Validation(ValidationError::Other(format!("cannot parse quantity from '{s}'")))
        })?;
        let precision = decimal.scale().min(MAX_PRECISION as u32) as u8;
        Self::new(decimal, precision)
    }
}

impl PartialEq for Quantity {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}
impl Eq for Quantity {}

impl PartialOrd for Quantity {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for Quantity {
    fn cmp(&self, other: &Self) -> Ordering {
        self.raw.cmp(&other.raw)
    }
}

/// A fixed-point monetary amount denominated in a [`Currency`] (spec §4.1).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Money {
    raw: i128,
    precision: u8,
    currency: Currency,
}

impl Money {
    pub fn new(value: Decimal, currency: Currency) -> SimResult<Self> {
        let precision = currency.precision;
        let raw = decimal_to_raw(value, precision)?;
        Ok(Self { raw, precision, currency })
    }

    pub fn zero(currency: Currency) -> Self {
        Self { raw: 0, precision: currency.precision, currency }
    }

    pub fn raw(&self) -> i128 {
        self.raw
    }

    pub fn currency(&self) -> Currency {
        self.currency
    }

    pub fn as_decimal(&self) -> Decimal {
        raw_to_decimal(self.raw, self.precision)
    }

    pub fn is_negative(&self) -> bool {
        self.raw < 0
    }

    /// Adds two `Money` values; panics-free but returns a validation error on currency
    /// mismatch, since mixing currencies without conversion is always a programming bug
    /// here (no FX conversion is modeled, spec Non-goals).
    pub fn checked_add(self, rhs: Self) -> SimResult<Self> {
        if self.currency != rhs.currency {
            return Err(SimError::Validation(ValidationError::Other(format!(
                "cannot add {} to {}: currency mismatch",
                rhs.currency.code, self.currency.code
            ))));
        }
        Ok(Self {
            raw: self.raw + rhs.raw,
            precision: self.precision.max(rhs.precision),
            currency: self.currency,
        })
    }

    pub fn checked_sub(self, rhs: Self) -> SimResult<Self> {
        if self.currency != rhs.currency {
            return Err(SimError::Validation(ValidationError::Other(format!(
                "cannot subtract {} from {}: currency mismatch",
                rhs.currency.code, self.currency.code
            ))));
        }
        Ok(Self {
            raw: self.raw - rhs.raw,
            precision: self.precision.max(rhs.precision),
            currency: self.currency,
        })
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.as_decimal(), self.currency.code)
    }
}

impl PartialEq for Money {
    fn eq(&self, other: &Self) -> bool {
        self.currency == other.currency && self.raw == other.raw
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::currency::Currency;
    use std::str::FromStr;

    #[test]
    fn price_exact_equality_and_ordering() {
        let a = Price::from_str("100.50").unwrap();
        let b = Price::from_str("100.500").unwrap();
        assert_eq!(a, b);
        let c = Price::from_str("100.51").unwrap();
        assert!(c > a);
    }

    #[test]
    fn arithmetic_preserves_larger_precision() {
        let a = Price::new(Decimal::from_str("1.1").unwrap(), 1).unwrap();
        let b = Price::new(Decimal::from_str("2.22").unwrap(), 2).unwrap();
        let sum = a + b;
        assert_eq!(sum.precision(), 2);
        assert_eq!(sum.as_decimal(), Decimal::from_str("3.32").unwrap());
    }

    #[test]
    fn quantity_underflow_forbidden() {
        let a = Quantity::from_str("1").unwrap();
        let b = Quantity::from_str("2").unwrap();
        assert!(a.checked_sub(b).is_err());
    }

    #[test]
    fn money_requires_matching_currency() {
        let usd = Currency::usd();
        let eur = Currency::eur();
        let a = Money::new(Decimal::from_str("10").unwrap(), usd).unwrap();
        let b = Money::new(Decimal::from_str("5").unwrap(), eur).unwrap();
        assert!(a.checked_add(b).is_err());
    }

    #[test]
    fn price_times_quantity_is_notional_money() {
        let price = Price::from_str("50.00").unwrap();
        let qty = Quantity::from_str("3").unwrap();
        let notional = price.mul_quantity(qty, Currency::usd());
        assert_eq!(notional.as_decimal(), Decimal::from_str("150.00").unwrap());
    }
}
