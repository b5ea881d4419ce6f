//! Fixed-precision monetary amounts.
//!
//! A `Money` is a `Decimal` always held at two fractional digits, rounded
//! half-up (midpoint away from zero) when it is created.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::ops::Add;
use std::str::FromStr;

const SCALE: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Money(Decimal);

impl Money {
    pub const ZERO: Money = Money(Decimal::from_parts(0, 0, 0, false, SCALE));

    pub const fn from_cents(cents: i64) -> Self {
        let abs = cents.unsigned_abs();
        Money(Decimal::from_parts(
            abs as u32,
            (abs >> 32) as u32,
            0,
            cents < 0,
            SCALE,
        ))
    }

    pub fn from_decimal(value: Decimal) -> Self {
        let mut rounded = value.round_dp_with_strategy(SCALE, RoundingStrategy::MidpointAwayFromZero);
        rounded.rescale(SCALE);
        Money(rounded)
    }

    pub fn as_decimal(&self) -> Decimal {
        self.0
    }

    pub fn cents(&self) -> i64 {
        i64::try_from(self.0.mantissa()).unwrap_or(if self.is_negative() {
            i64::MIN
        } else {
            i64::MAX
        })
    }

    /// Parses a plain decimal such as `"19.995"`: optional `-`, digits and
    /// at most one `.`. No exponents, signs other than `-`, or separators.
    pub fn parse_decimal(input: &str) -> Option<Money> {
        let s = input.trim();
        let unsigned = s.strip_prefix('-').unwrap_or(s);
        if !unsigned.bytes().any(|b| b.is_ascii_digit())
            || !unsigned.bytes().all(|b| b.is_ascii_digit() || b == b'.')
        {
            return None;
        }
        Decimal::from_str(s).ok().map(Money::from_decimal)
    }

    /// Parses provider display strings like `"$1,299.99"` or `"USD 15.00"`.
    pub fn parse_display_amount(input: &str) -> Option<Money> {
        let cleaned: String = input
            .chars()
            .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
            .collect();
        Self::parse_decimal(&cleaned)
    }

    /// Converts through the shortest decimal form of the float, so `1.005`
    /// rounds to `1.01` instead of inheriting binary representation error.
    pub fn from_f64(value: f64) -> Option<Money> {
        if !value.is_finite() {
            return None;
        }
        Self::parse_decimal(&value.to_string())
    }

    pub fn is_negative(&self) -> bool {
        self.0 < Decimal::ZERO
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::ZERO
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, other: Money) -> Money {
        Money::from_decimal(self.0 + other.0)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        rust_decimal::serde::float::serialize(&self.0, serializer)
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = f64::deserialize(deserializer)?;
        Money::from_f64(value)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid amount: {value}")))
    }
}
