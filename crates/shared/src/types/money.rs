//! Money in integer minor units.
//!
//! CRITICAL: Never use floating-point for money. Amounts are stored and
//! summed as `i64` minor units (fen/cents, 100 per major unit); conversion
//! to and from decimal strings happens only at presentation boundaries and
//! goes through `rust_decimal::Decimal`.

use std::fmt;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Minor units per major unit.
pub const MINOR_PER_MAJOR: i64 = 100;

/// A signed amount in minor units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(pub i64);

impl Money {
    /// Zero.
    pub const ZERO: Self = Self(0);

    /// Wraps a minor-unit amount.
    #[must_use]
    pub const fn from_minor(minor: i64) -> Self {
        Self(minor)
    }

    /// Returns the minor-unit amount.
    #[must_use]
    pub const fn minor(self) -> i64 {
        self.0
    }

    /// Converts a major-unit decimal (e.g. `35.5` yuan) to minor units,
    /// rounding half away from zero. Returns `None` on overflow.
    #[must_use]
    pub fn from_major(major: Decimal) -> Option<Self> {
        major
            .checked_mul(Decimal::from(MINOR_PER_MAJOR))?
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
            .to_i64()
            .map(Self)
    }

    /// Parses a major-unit decimal string such as `"12.30"`.
    #[must_use]
    pub fn parse_major(s: &str) -> Option<Self> {
        s.trim().parse::<Decimal>().ok().and_then(Self::from_major)
    }

    /// The amount as a major-unit decimal with two fraction digits.
    #[must_use]
    pub fn to_major(self) -> Decimal {
        Decimal::new(self.0, 2)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_major())
    }
}
