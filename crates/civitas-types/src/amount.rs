//! Money amounts
//!
//! Civitas uses fixed-point decimal arithmetic for all balances and dues.
//! Ledger balances are invariantly non-negative; the type itself still
//! represents negative values so that validation can reject them with a
//! typed error instead of silently clamping.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Sub};

/// A fixed-point money amount
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct Amount(pub Decimal);

impl Amount {
    /// Create from a raw decimal
    pub fn new(value: Decimal) -> Self {
        Self(value)
    }

    /// The zero amount
    pub fn zero() -> Self {
        Self(Decimal::ZERO)
    }

    /// Create from an `f64`, e.g. a computed tax liability
    ///
    /// Returns `None` when the float is not representable (NaN, infinite).
    pub fn from_f64(value: f64) -> Option<Self> {
        Decimal::from_f64_retain(value).map(Self)
    }

    /// The inner decimal value
    pub fn value(&self) -> Decimal {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Strictly greater than zero
    pub fn is_positive(&self) -> bool {
        self.0 > Decimal::ZERO
    }

    /// Checked addition
    pub fn checked_add(&self, other: Amount) -> Option<Amount> {
        self.0.checked_add(other.0).map(Amount)
    }

    /// Checked subtraction
    pub fn checked_sub(&self, other: Amount) -> Option<Amount> {
        self.0.checked_sub(other.0).map(Amount)
    }
}

impl Add for Amount {
    type Output = Amount;

    fn add(self, rhs: Amount) -> Amount {
        Amount(self.0 + rhs.0)
    }
}

impl Sub for Amount {
    type Output = Amount;

    fn sub(self, rhs: Amount) -> Amount {
        Amount(self.0 - rhs.0)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Decimal> for Amount {
    fn from(value: Decimal) -> Self {
        Self(value)
    }
}
