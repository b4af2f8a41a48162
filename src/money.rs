//! Exact dollar amounts.
//!
//! Penalties are summed across tens of thousands of rows, so they are kept
//! as integer cents rather than `f64`.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign};
use std::str::FromStr;

/// A US dollar amount stored as whole cents.
///
/// Addition saturates at the `i64` range rather than overflowing.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Usd(i64);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("not a dollar amount: `{0}`")]
pub struct ParseUsdError(String);

impl Usd {
    pub const ZERO: Usd = Usd(0);

    /// Largest magnitude accepted when parsing: ten trillion dollars.
    pub const MAX_PARSED: Usd = Usd(1_000_000_000_000_000);

    pub fn from_cents(cents: i64) -> Self {
        Usd(cents)
    }

    pub fn cents(self) -> i64 {
        self.0
    }

    pub fn as_f64(self) -> f64 {
        self.0 as f64 / 100.0
    }
}

impl FromStr for Usd {
    type Err = ParseUsdError;

    /// Accepts `1234`, `1234.5`, `$1,234.50`, `-75.00` and `.5`. Fractions
    /// beyond cents are rounded half away from zero. Exponents and amounts
    /// past [`Usd::MAX_PARSED`] are rejected.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseUsdError(s.to_string());

        let cleaned: String = s.chars().filter(|c| *c != '$' && *c != ',').collect();
        let cleaned = cleaned.trim();

        let (negative, digits) = match cleaned.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, cleaned.strip_prefix('+').unwrap_or(cleaned)),
        };
        let (whole, frac) = digits.split_once('.').unwrap_or((digits, ""));

        if whole.is_empty() && frac.is_empty() {
            return Err(err());
        }
        if !whole.bytes().chain(frac.bytes()).all(|b| b.is_ascii_digit()) {
            return Err(err());
        }

        let push = |acc: i64, digit: u8| -> Option<i64> {
            acc.checked_mul(10)?.checked_add(i64::from(digit - b'0'))
        };

        let mut cents = whole.bytes().try_fold(0i64, push).ok_or_else(err)?;
        let mut frac_digits = frac.bytes();
        for _ in 0..2 {
            cents = push(cents, frac_digits.next().unwrap_or(b'0')).ok_or_else(err)?;
        }
        if frac_digits.next().is_some_and(|d| d >= b'5') {
            cents = cents.checked_add(1).ok_or_else(err)?;
        }

        if cents > Self::MAX_PARSED.0 {
            return Err(err());
        }
        Ok(Usd(if negative { -cents } else { cents }))
    }
}

impl fmt::Display for Usd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{}{}.{:02}", sign, abs / 100, abs % 100)
    }
}

impl Add for Usd {
    type Output = Usd;

    fn add(self, rhs: Usd) -> Usd {
        Usd(self.0.saturating_add(rhs.0))
    }
}

impl AddAssign for Usd {
    fn add_assign(&mut self, rhs: Usd) {
        self.0 = self.0.saturating_add(rhs.0);
    }
}

impl Sum for Usd {
    fn sum<I: Iterator<Item = Usd>>(iter: I) -> Usd {
        iter.fold(Usd::ZERO, Add::add)
    }
}

impl Serialize for Usd {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Usd {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
