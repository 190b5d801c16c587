//! Amount type for handling monetary values.
//!
//! `Amount` wraps `Decimal`. Input may carry a rupee sign, an `Rs.`/`INR` prefix and thousands
//! separators in either Indian (`1,00,000`) or Western (`100,000`) grouping. Display is always in
//! whole currency units; see `crate::format` for the rendering rules.

use crate::format::{self, AmountFormat};
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::fmt::{Display, Formatter};
use std::iter::Sum;
use std::ops::{Add, AddAssign, Sub};
use std::str::FromStr;

/// Prefixes that may precede the digits of an amount. Longer prefixes come first so that `Rs.`
/// is stripped before `Rs`.
const CURRENCY_PREFIXES: &[&str] = &["₹", "INR", "Rs.", "Rs"];

/// Represents a quantity of money.
///
/// Equality and ordering are numeric: `Amount::from(50)` equals the amount parsed from `"₹50.00"`.
///
/// # Examples
///
/// ```
/// # use taxmate::model::Amount;
/// # use std::str::FromStr;
/// let amount = Amount::from_str("₹1,00,000").unwrap();
/// assert_eq!(amount, Amount::from(100_000));
/// assert_eq!(amount.to_string(), "₹1,00,000");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Amount {
    value: Decimal,
}

impl Amount {
    pub const ZERO: Amount = Amount::new(Decimal::ZERO);

    pub const fn new(value: Decimal) -> Self {
        Self { value }
    }

    /// Returns the underlying Decimal value.
    pub fn value(&self) -> Decimal {
        self.value
    }

    pub fn is_zero(&self) -> bool {
        self.value.is_zero()
    }

    /// Returns true if the amount is greater than zero.
    pub fn is_positive(&self) -> bool {
        !self.is_zero() && self.value.is_sign_positive()
    }

    pub fn is_negative(&self) -> bool {
        !self.is_zero() && self.value.is_sign_negative()
    }

    /// Parses `s`, treating anything that is not a number as zero.
    ///
    /// This mirrors how numeric form fields behave: an empty or mistyped field counts as `0`.
    pub fn parse_or_zero(s: &str) -> Self {
        Amount::from_str(s).unwrap_or_default()
    }

    /// Rounds to whole currency units, with midpoints rounded away from zero.
    pub fn round_whole(&self) -> Self {
        self.round_dp(0)
    }

    /// Rounds to `dp` decimal places, with midpoints rounded away from zero.
    pub fn round_dp(&self, dp: u32) -> Self {
        Self::new(
            self.value
                .round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero),
        )
    }

    /// Replaces a negative amount with zero.
    pub fn non_negative(&self) -> Self {
        if self.is_negative() {
            Self::ZERO
        } else {
            *self
        }
    }

    /// Renders the amount using `format` instead of the default rupee format.
    pub fn formatted(&self, format: AmountFormat) -> String {
        format::format_amount(self.value, format)
    }

    pub fn to_f64(&self) -> f64 {
        self.value.to_f64().unwrap_or_default()
    }
}

/// An error that can occur when parsing strings into `Amount` values.
#[derive(Debug)]
pub enum AmountError {
    /// Nothing but whitespace and currency markers was given.
    Empty,
    /// The remaining characters are not a decimal number.
    Invalid(rust_decimal::Error),
}

impl Display for AmountError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            AmountError::Empty => write!(f, "no amount was given"),
            AmountError::Invalid(e) => write!(f, "not a valid amount: {e}"),
        }
    }
}

impl std::error::Error for AmountError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AmountError::Empty => None,
            AmountError::Invalid(e) => Some(e),
        }
    }
}

impl FromStr for Amount {
    type Err = AmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let (negative, rest) = match trimmed.strip_prefix('-') {
            Some(rest) => (true, rest.trim_start()),
            None => (false, trimmed),
        };

        let digits = CURRENCY_PREFIXES
            .iter()
            .find_map(|prefix| rest.strip_prefix(*prefix))
            .unwrap_or(rest)
            .trim()
            .replace(',', "");

        if digits.is_empty() {
            return Err(AmountError::Empty);
        }

        let value = Decimal::from_str(&digits).map_err(AmountError::Invalid)?;
        Ok(Amount::new(if negative { -value } else { value }))
    }
}

impl Display for Amount {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&format::format_amount(self.value, AmountFormat::default()))
    }
}

impl Serialize for Amount {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        // The API exchanges amounts as JSON numbers.
        rust_decimal::serde::float::serialize(&self.value, serializer)
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(f64),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Number(n) => Decimal::from_f64(n)
                .map(Amount::new)
                .ok_or_else(|| serde::de::Error::custom(format!("{n} is not a valid amount"))),
            Raw::Text(s) => Amount::from_str(&s).map_err(serde::de::Error::custom),
        }
    }
}

impl From<Decimal> for Amount {
    fn from(value: Decimal) -> Self {
        Amount::new(value)
    }
}

impl From<i64> for Amount {
    fn from(value: i64) -> Self {
        Amount::new(Decimal::from(value))
    }
}

impl From<Amount> for Decimal {
    fn from(amount: Amount) -> Self {
        amount.value()
    }
}

// Arithmetic saturates at `Decimal::MAX`/`Decimal::MIN` instead of panicking.
impl Add for Amount {
    type Output = Amount;

    fn add(self, rhs: Self) -> Self::Output {
        Amount::new(self.value.saturating_add(rhs.value))
    }
}

impl Sub for Amount {
    type Output = Amount;

    fn sub(self, rhs: Self) -> Self::Output {
        Amount::new(self.value.saturating_sub(rhs.value))
    }
}

impl AddAssign for Amount {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Sum for Amount {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Amount::ZERO, Add::add)
    }
}
