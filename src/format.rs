//! Display formatting for amounts and dates.
//!
//! Amounts are shown in whole rupees with Indian digit grouping (`₹12,34,567`), which is what the
//! `en-IN` locale produces for INR with no fraction digits. Dates are shown as `05 Jan 2024` and
//! exchanged as `2024-01-05`.

use chrono::NaiveDate;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

const RUPEE: &str = "₹";

/// How digits are grouped when rendering an amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Grouping {
    /// Last three digits, then pairs: `12,34,567`.
    #[default]
    Indian,
    /// Groups of three: `1,234,567`.
    Western,
    /// No separators: `1234567`.
    None,
}

/// Represents how amounts should be written to a `String`.
///
/// # Examples
///  - `AmountFormat { symbol: true, grouping: Grouping::Indian }` -> `-₹12,34,567`
///  - `AmountFormat { symbol: false, grouping: Grouping::Western }` -> `-1,234,567`
///  - `AmountFormat { symbol: false, grouping: Grouping::None }` -> `-1234567`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AmountFormat {
    /// Whether the rupee sign is written.
    pub symbol: bool,
    /// How thousands are separated.
    pub grouping: Grouping,
}

impl AmountFormat {
    /// Bare digits, suitable for CSV output.
    pub const PLAIN: AmountFormat = AmountFormat {
        symbol: false,
        grouping: Grouping::None,
    };

    pub const fn new(symbol: bool, grouping: Grouping) -> Self {
        Self { symbol, grouping }
    }
}

impl Default for AmountFormat {
    fn default() -> Self {
        Self::new(true, Grouping::Indian)
    }
}

/// Formats `amount` as rupees with Indian grouping and no fraction digits.
pub fn format_currency(amount: crate::Amount) -> String {
    format_amount(amount.value(), AmountFormat::default())
}

/// Formats `value` in whole units according to `format`. Fractions are rounded half away from
/// zero.
pub fn format_amount(value: Decimal, format: AmountFormat) -> String {
    let rounded = value.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
    let sign = if rounded.is_sign_negative() && !rounded.is_zero() {
        "-"
    } else {
        ""
    };
    let magnitude = rounded.abs();
    let digits = magnitude.trunc().normalize().to_string();

    let grouped = match format.grouping {
        Grouping::Indian => group_indian(&digits),
        Grouping::Western => group_western(&digits),
        Grouping::None => digits,
    };

    let symbol = if format.symbol { RUPEE } else { "" };
    format!("{sign}{symbol}{grouped}")
}

/// Inserts a separator between every group of three digits, counting from the right.
fn group_western(digits: &str) -> String {
    let mut groups = Vec::new();
    let mut end = digits.len();
    while end > 0 {
        let start = end.saturating_sub(3);
        groups.push(&digits[start..end]);
        end = start;
    }
    groups.reverse();
    groups.join(",")
}

/// Inserts Indian-style separators into a string of ASCII digits.
fn group_indian(digits: &str) -> String {
    if digits.len() <= 3 {
        return digits.to_string();
    }
    let (head, tail) = digits.split_at(digits.len() - 3);

    let mut pairs = Vec::new();
    let mut end = head.len();
    while end > 0 {
        let start = end.saturating_sub(2);
        pairs.push(&head[start..end]);
        end = start;
    }
    pairs.reverse();

    format!("{},{tail}", pairs.join(","))
}

/// Formats a percentage with two fraction digits, e.g. `56.49%`.
pub fn format_percent(value: Decimal) -> String {
    format!(
        "{}%",
        format_num::format_num!(".2f", value.to_f64().unwrap_or_default())
    )
}

/// Formats a date for display, e.g. `05 Jan 2024`.
pub fn format_date(date: NaiveDate) -> String {
    date.format("%d %b %Y").to_string()
}

/// Formats a date the way date inputs and the API expect it, e.g. `2024-01-05`.
pub fn format_date_input(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}
