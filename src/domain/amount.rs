//! Fixed-point amounts used by the ledger.
//!
//! Monetary values are integers scaled by 10^10 and area aggregates are scaled
//! by 10^5. Both scales are part of the storage contract and must not change.
//! Conversions to display values go through `rust_decimal` so no float ever
//! touches a balance.

use rust_decimal::Decimal as RustDecimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Number of fractional digits carried by [`Amount`].
pub const AMOUNT_SCALE: u32 = 10;

/// Number of fractional digits carried by [`AreaAmount`].
pub const AREA_SCALE: u32 = 5;

/// Divisor turning an [`Amount`] into an [`AreaAmount`].
pub const AREA_DIVISOR: i64 = 100_000;

/// Monetary amount scaled by 10^10.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Amount(pub i64);

/// Down-line aggregate amount scaled by 10^5.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct AreaAmount(pub i64);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AmountParseError {
    #[error("invalid decimal amount: {0}")]
    Invalid(String),
    #[error("amount out of range: {0}")]
    OutOfRange(String),
}

impl Amount {
    pub const ZERO: Amount = Amount(0);

    /// Wrap an already scaled integer.
    pub fn from_scaled(raw: i64) -> Self {
        Amount(raw)
    }

    /// Build from whole display units (e.g. `50` → `50 * 10^10`).
    pub fn from_units(units: i64) -> Self {
        Amount(units.saturating_mul(10i64.pow(AMOUNT_SCALE)))
    }

    /// Parse a display decimal such as `"12.5"`, truncating beyond 10 digits.
    pub fn parse_display(s: &str) -> Result<Self, AmountParseError> {
        let value = RustDecimal::from_str(s.trim())
            .map_err(|_| AmountParseError::Invalid(s.to_string()))?;
        let scaled = (value * RustDecimal::from(10i64.pow(AMOUNT_SCALE))).trunc();
        i64::try_from(scaled)
            .map(Amount)
            .map_err(|_| AmountParseError::OutOfRange(s.to_string()))
    }

    pub fn raw(&self) -> i64 {
        self.0
    }

    pub fn is_positive(&self) -> bool {
        self.0 > 0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// `self * num / den` with a 128-bit intermediate and integer truncation.
    ///
    /// Returns zero when `den` is zero so a missing config key cannot panic.
    pub fn mul_div(&self, num: i64, den: i64) -> Amount {
        if den == 0 {
            return Amount::ZERO;
        }
        let value = (self.0 as i128) * (num as i128) / (den as i128);
        Amount(value.clamp(i64::MIN as i128, i64::MAX as i128) as i64)
    }

    /// `self * rate / 100`.
    pub fn percent(&self, rate: i64) -> Amount {
        self.mul_div(rate, 100)
    }

    /// Integer division by a count, zero when the count is zero.
    pub fn div_count(&self, count: usize) -> Amount {
        if count == 0 {
            return Amount::ZERO;
        }
        Amount(self.0 / count as i64)
    }

    /// Truncate to the area scale, dropping the five least significant digits.
    pub fn to_area(&self) -> AreaAmount {
        AreaAmount(self.0 / AREA_DIVISOR)
    }

    pub fn min(self, other: Amount) -> Amount {
        if self <= other {
            self
        } else {
            other
        }
    }

    /// Display value as a decimal with trailing zeros removed.
    pub fn to_decimal(&self) -> RustDecimal {
        RustDecimal::new(self.0, AMOUNT_SCALE).normalize()
    }
}

impl AreaAmount {
    pub const ZERO: AreaAmount = AreaAmount(0);

    /// Threshold configured in display units, lifted to the area scale.
    pub fn from_units(units: i64) -> Self {
        AreaAmount(units.saturating_mul(10i64.pow(AREA_SCALE)))
    }

    pub fn raw(&self) -> i64 {
        self.0
    }

    pub fn to_decimal(&self) -> RustDecimal {
        RustDecimal::new(self.0, AREA_SCALE).normalize()
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_decimal())
    }
}

impl fmt::Display for AreaAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_decimal())
    }
}

impl std::ops::Add for Amount {
    type Output = Amount;

    fn add(self, rhs: Amount) -> Amount {
        Amount(self.0.saturating_add(rhs.0))
    }
}

impl std::ops::AddAssign for Amount {
    fn add_assign(&mut self, rhs: Amount) {
        self.0 = self.0.saturating_add(rhs.0);
    }
}

impl std::ops::Sub for Amount {
    type Output = Amount;

    fn sub(self, rhs: Amount) -> Amount {
        Amount(self.0.saturating_sub(rhs.0))
    }
}

impl std::iter::Sum for Amount {
    fn sum<I: Iterator<Item = Amount>>(iter: I) -> Self {
        iter.fold(Amount::ZERO, |acc, a| acc + a)
    }
}

impl std::ops::Add for AreaAmount {
    type Output = AreaAmount;

    fn add(self, rhs: AreaAmount) -> AreaAmount {
        AreaAmount(self.0.saturating_add(rhs.0))
    }
}

impl std::ops::Sub for AreaAmount {
    type Output = AreaAmount;

    fn sub(self, rhs: AreaAmount) -> AreaAmount {
        AreaAmount(self.0.saturating_sub(rhs.0))
    }
}

impl std::iter::Sum for AreaAmount {
    fn sum<I: Iterator<Item = AreaAmount>>(iter: I) -> Self {
        iter.fold(AreaAmount::ZERO, |acc, a| acc + a)
    }
}
