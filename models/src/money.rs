
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Sub};

use serde::{Deserialize, Serialize};

/// Share of every settled consultation that goes to the provider, in percent.
pub const PROVIDER_SHARE_PERCENT: i64 = 80;

/// An amount of money kept as whole cents so commission math stays exact.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    pub const ZERO: Money = Money(0);

    pub fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Builds an amount from whole currency units, e.g. `from_major(65)` is $65.00.
    pub fn from_major(units: i64) -> Self {
        Money(units * 100)
    }

    pub fn cents(&self) -> i64 {
        self.0
    }

    pub fn is_positive(&self) -> bool {
        self.0 > 0
    }
}

impl Add for Money {
    type Output = Money;
    fn add(self, rhs: Money) -> Money {
        Money(self.0 + rhs.0)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Money) {
        self.0 += rhs.0;
    }
}

impl Sub for Money {
    type Output = Money;
    fn sub(self, rhs: Money) -> Money {
        Money(self.0 - rhs.0)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        iter.fold(Money::ZERO, Add::add)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let cents = self.0.abs();
        write!(f, "{}${}.{:02}", sign, cents / 100, cents % 100)
    }
}

/// Outcome of dividing a settled amount between the provider and the platform.
///
/// The two shares always add back up to the settled amount.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommissionSplit {
    pub provider_share: Money,
    pub platform_share: Money,
}

/// Splits an amount 80/20, rounding the provider share half-up to the cent.
/// The platform keeps the remainder, so no cent is created or lost.
pub fn split_commission(amount: Money) -> CommissionSplit {
    let provider_cents = (amount.cents() * PROVIDER_SHARE_PERCENT + 50) / 100;
    let provider_share = Money::from_cents(provider_cents);
    CommissionSplit {
        provider_share,
        platform_share: amount - provider_share,
    }
}
