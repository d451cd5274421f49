//! Fixed-point money arithmetic
//!
//! All balances and stakes are carried as unsigned minor units (cents)
//! wrapped in [`Amount`]; deltas are signed minor units. Every operation
//! is checked — overflow and negative balances are errors, never wraps.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A non-negative monetary amount in minor units (cents).
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Amount(u64);

impl Amount {
    pub const ZERO: Amount = Amount(0);

    /// Construct from minor units.
    pub const fn from_cents(cents: u64) -> Self {
        Amount(cents)
    }

    /// The raw minor-unit value.
    pub const fn cents(self) -> u64 {
        self.0
    }

    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Checked addition of two amounts.
    pub fn checked_add(self, other: Amount) -> Option<Amount> {
        self.0.checked_add(other.0).map(Amount)
    }

    /// Checked subtraction; `None` when the result would be negative.
    pub fn checked_sub(self, other: Amount) -> Option<Amount> {
        self.0.checked_sub(other.0).map(Amount)
    }

    /// Apply a signed delta. `None` when the result would be negative
    /// (a debit exceeding the amount) or overflow `u64`.
    pub fn checked_apply(self, delta: i64) -> Option<Amount> {
        if delta >= 0 {
            self.0.checked_add(delta as u64).map(Amount)
        } else {
            self.0.checked_sub(delta.unsigned_abs()).map(Amount)
        }
    }

    /// The amount as a signed delta, for credit/debit computation.
    /// `None` when the value does not fit `i64` minor units.
    pub fn signed(self) -> Option<i64> {
        i64::try_from(self.0).ok()
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.0 / 100, self.0 % 100)
    }
}
