//! Named reporting periods and the date ranges they resolve to.
//!
//! All resolution is a pure function of the period, the optional custom dates and `today`. The
//! financial year runs from April 1 to March 31.

use crate::format::format_date_input;
use chrono::{Datelike, Local, NaiveDate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::sync::OnceLock;

/// The month in which the financial year starts.
const FY_START_MONTH: u32 = 4;

/// A symbolic reporting period.
///
/// The serialized names are the identifiers the TaxMate API accepts as its `period` parameter.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Period {
    /// The calendar month containing today, first to last day.
    #[default]
    #[serde(rename = "month")]
    CurrentMonth,
    /// The whole calendar month before the current one.
    #[serde(rename = "prev_month")]
    PreviousMonth,
    /// The April to March financial year containing today.
    #[serde(rename = "fy")]
    FinancialYear,
    /// January 1 of this year through today.
    #[serde(rename = "ytd")]
    YearToDate,
    /// An explicit range supplied by the caller.
    #[serde(rename = "custom")]
    Custom,
    /// Any unrecognized identifier. Resolves to the first of this month through today.
    #[serde(rename = "other", other)]
    Other,
}

serde_plain::derive_display_from_serialize!(Period);
serde_plain::derive_fromstr_from_deserialize!(Period);

impl Period {
    /// The periods offered to users, in display order.
    pub const ALL: [Period; 5] = [
        Period::CurrentMonth,
        Period::PreviousMonth,
        Period::FinancialYear,
        Period::YearToDate,
        Period::Custom,
    ];

    /// A human readable label.
    pub fn label(&self) -> &'static str {
        match self {
            Period::CurrentMonth => "This Month",
            Period::PreviousMonth => "Previous Month",
            Period::FinancialYear => "Financial Year",
            Period::YearToDate => "Year to Date",
            Period::Custom => "Custom Range",
            Period::Other => "Month to Date",
        }
    }

    /// See `resolve_period`.
    pub fn resolve(self, custom: Option<&CustomRange>, today: NaiveDate) -> Option<DateRange> {
        resolve_period(self, custom, today)
    }

    /// Resolves against the local calendar date.
    pub fn resolve_today(self, custom: Option<&CustomRange>) -> Option<DateRange> {
        resolve_period(self, custom, Local::now().date_naive())
    }
}

/// An inclusive range of calendar dates where `start <= end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    /// Returns `None` if `start` is after `end`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Option<Self> {
        if start > end {
            return None;
        }
        Some(Self { start, end })
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// True if `date` falls within the range, both ends included.
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// The number of days in the range, counting both ends.
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }
}

impl Display for DateRange {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} to {}",
            format_date_input(self.start),
            format_date_input(self.end)
        )
    }
}

/// The raw start and end values a user typed for a custom period.
///
/// Either value may be empty or malformed while the user is still editing. Nothing that depends
/// on the range should be requested until `resolve` returns `Some`.
#[derive(Debug, Default, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CustomRange {
    start: String,
    end: String,
}

impl CustomRange {
    pub fn new(start: impl Into<String>, end: impl Into<String>) -> Self {
        Self {
            start: start.into(),
            end: end.into(),
        }
    }

    pub fn start(&self) -> &str {
        &self.start
    }

    pub fn end(&self) -> &str {
        &self.end
    }

    /// Both values must be `YYYY-MM-DD` calendar dates and `start` must not be after `end`.
    pub fn resolve(&self) -> Option<DateRange> {
        let start = parse_iso_date(&self.start)?;
        let end = parse_iso_date(&self.end)?;
        DateRange::new(start, end)
    }

    /// Starting a new range clears the end date, as the end must be chosen again.
    pub fn set_start(&mut self, start: impl Into<String>) {
        self.start = start.into();
        self.end.clear();
    }

    pub fn set_end(&mut self, end: impl Into<String>) {
        self.end = end.into();
    }
}

fn iso_date_shape() -> &'static Regex {
    static SHAPE: OnceLock<Regex> = OnceLock::new();
    SHAPE.get_or_init(|| {
        // The pattern is a literal; failing to compile it is a programming error.
        Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("valid ISO date pattern")
    })
}

/// True if `s` looks like `YYYY-MM-DD`. This does not check that the date exists.
pub fn is_iso_date(s: &str) -> bool {
    iso_date_shape().is_match(s)
}

/// Parses a `YYYY-MM-DD` string into a date, rejecting other shapes and impossible dates such as
/// `2023-02-29`.
pub fn parse_iso_date(s: &str) -> Option<NaiveDate> {
    if !is_iso_date(s) {
        return None;
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()
}

/// Maps `period` to a concrete inclusive date range.
///
/// Returns `None` only for `Period::Custom` when `custom` is missing, malformed, names a date that
/// does not exist, or runs backwards.
pub fn resolve_period(
    period: Period,
    custom: Option<&CustomRange>,
    today: NaiveDate,
) -> Option<DateRange> {
    let (year, month) = (today.year(), today.month());
    match period {
        Period::CurrentMonth => DateRange::new(
            first_of_month(year, month)?,
            last_of_month(year, month)?,
        ),
        Period::PreviousMonth => {
            let (year, month) = if month == 1 {
                (year - 1, 12)
            } else {
                (year, month - 1)
            };
            DateRange::new(first_of_month(year, month)?, last_of_month(year, month)?)
        }
        Period::FinancialYear => {
            let fy_start = if month >= FY_START_MONTH {
                year
            } else {
                year - 1
            };
            DateRange::new(
                NaiveDate::from_ymd_opt(fy_start, FY_START_MONTH, 1)?,
                NaiveDate::from_ymd_opt(fy_start + 1, 3, 31)?,
            )
        }
        Period::YearToDate => DateRange::new(NaiveDate::from_ymd_opt(year, 1, 1)?, today),
        Period::Custom => custom?.resolve(),
        Period::Other => DateRange::new(first_of_month(year, month)?, today),
    }
}

fn first_of_month(year: i32, month: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, 1)
}

fn last_of_month(year: i32, month: u32) -> Option<NaiveDate> {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    first_of_month(next_year, next_month)?.pred_opt()
}
