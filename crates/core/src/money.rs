use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, Neg, Sub};

/// A signed monetary value, kept at the precision the statement gave it.
/// Only [`Money::cents`] and `Display` round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Money(Decimal);

impl Money {
    pub fn from_decimal(decimal: Decimal) -> Self {
        Money(decimal)
    }

    /// Rounded to two decimal places, half away from zero.
    pub fn cents(self) -> Decimal {
        self.0
            .round_dp_with_strategy(2, rust_decimal::RoundingStrategy::MidpointAwayFromZero)
    }

    pub fn zero() -> Self {
        Money(Decimal::ZERO)
    }

    pub fn amount(self) -> Decimal {
        self.0
    }

    /// Unsigned value; direction is carried elsewhere once the sign is dropped.
    pub fn magnitude(self) -> Decimal {
        self.0.abs()
    }

    pub fn is_zero(self) -> bool {
        self.0.is_zero()
    }

    /// Strictly greater than zero.
    pub fn is_positive(self) -> bool {
        self.0 > Decimal::ZERO
    }
}

impl From<Decimal> for Money {
    fn from(decimal: Decimal) -> Self {
        Money::from_decimal(decimal)
    }
}

/// Brazilian real formatting: `R$ 1.234,56`, `-R$ 50,00`.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cents = self.cents();
        let sign = if cents < Decimal::ZERO { "-" } else { "" };
        let plain = format!("{:.2}", cents.abs());
        let (int_part, frac_part) = plain.split_once('.').unwrap_or((plain.as_str(), "00"));

        let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
        for (i, ch) in int_part.chars().enumerate() {
            if i > 0 && (int_part.len() - i) % 3 == 0 {
                grouped.push('.');
            }
            grouped.push(ch);
        }

        write!(f, "{sign}R$ {grouped},{frac_part}")
    }
}

impl Add for Money {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Money(self.0 + rhs.0)
    }
}

impl Sub for Money {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Money(self.0 - rhs.0)
    }
}

impl Neg for Money {
    type Output = Self;
    fn neg(self) -> Self {
        Money(-self.0)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |a, b| a + b)
    }
}
