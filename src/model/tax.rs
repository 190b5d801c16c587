//! GST-style tax calculation.
//!
//! Tax is `base * rate / 100` rounded to whole rupees, with midpoints rounded away from zero. For
//! the non-negative bases and rates this crate accepts, that is ordinary round-half-up:
//! `compute_tax(333, 18)` is `60` (from `59.94`) and `compute_tax(25, 18)` is `5` (from `4.5`).

use crate::model::Amount;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

const HUNDRED: Decimal = Decimal::ONE_HUNDRED;

/// The rate applied to GST records that do not carry an explicit rate.
const DEFAULT_GST_RATE: i64 = 18;

/// The slab choices offered when entering a record. The serialized names are the option values
/// used by the record form.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SlabOption {
    #[serde(rename = "GST_5")]
    Gst5,
    #[serde(rename = "GST_12")]
    Gst12,
    #[default]
    #[serde(rename = "GST_18")]
    Gst18,
    #[serde(rename = "GST_28")]
    Gst28,
    #[serde(rename = "NONE")]
    Exempt,
    #[serde(rename = "CUSTOM")]
    Custom,
}

serde_plain::derive_display_from_serialize!(SlabOption);
serde_plain::derive_fromstr_from_deserialize!(SlabOption);

impl SlabOption {
    pub const ALL: [SlabOption; 6] = [
        SlabOption::Gst5,
        SlabOption::Gst12,
        SlabOption::Gst18,
        SlabOption::Gst28,
        SlabOption::Exempt,
        SlabOption::Custom,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            SlabOption::Gst5 => "GST (5%)",
            SlabOption::Gst12 => "GST (12%)",
            SlabOption::Gst18 => "GST (18%)",
            SlabOption::Gst28 => "GST (28%)",
            SlabOption::Exempt => "Exempt (0%)",
            SlabOption::Custom => "Custom Rate",
        }
    }
}

/// A tax tier. Every slab reduces to a single percentage via `rate_percent`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaxSlab {
    Gst5,
    Gst12,
    Gst18,
    Gst28,
    Exempt,
    /// A caller-supplied percentage, already clamped to `0..=100`.
    Custom(Decimal),
}

impl TaxSlab {
    /// Builds the slab for a form selection. `custom_rate` is only read for `SlabOption::Custom`.
    pub fn from_selection(option: SlabOption, custom_rate: &str) -> Self {
        match option {
            SlabOption::Gst5 => TaxSlab::Gst5,
            SlabOption::Gst12 => TaxSlab::Gst12,
            SlabOption::Gst18 => TaxSlab::Gst18,
            SlabOption::Gst28 => TaxSlab::Gst28,
            SlabOption::Exempt => TaxSlab::Exempt,
            SlabOption::Custom => TaxSlab::custom(custom_rate),
        }
    }

    /// A custom slab from free text. Text that is not a number is treated as `0`, and the result is
    /// clamped to `0..=100`.
    pub fn custom(rate_input: &str) -> Self {
        TaxSlab::Custom(parse_rate(rate_input))
    }

    pub fn rate_percent(&self) -> Decimal {
        match self {
            TaxSlab::Gst5 => Decimal::from(5),
            TaxSlab::Gst12 => Decimal::from(12),
            TaxSlab::Gst18 => Decimal::from(18),
            TaxSlab::Gst28 => Decimal::from(28),
            TaxSlab::Exempt => Decimal::ZERO,
            TaxSlab::Custom(rate) => clamp_rate(*rate),
        }
    }

    /// The legacy type label stored alongside the rate. Custom rates are recorded as GST.
    pub fn tax_type(&self) -> TaxType {
        match self {
            TaxSlab::Exempt => TaxType::Exempt,
            _ => TaxType::Gst,
        }
    }

    pub fn option(&self) -> SlabOption {
        match self {
            TaxSlab::Gst5 => SlabOption::Gst5,
            TaxSlab::Gst12 => SlabOption::Gst12,
            TaxSlab::Gst18 => SlabOption::Gst18,
            TaxSlab::Gst28 => SlabOption::Gst28,
            TaxSlab::Exempt => SlabOption::Exempt,
            TaxSlab::Custom(_) => SlabOption::Custom,
        }
    }
}

impl Display for TaxSlab {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            TaxSlab::Exempt => write!(f, "Exempt (0%)"),
            TaxSlab::Custom(rate) => write!(f, "Custom ({}%)", clamp_rate(*rate).normalize()),
            other => write!(f, "GST ({}%)", other.rate_percent()),
        }
    }
}

/// The legacy tax label carried on records.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaxType {
    #[serde(rename = "GST")]
    Gst,
    #[default]
    #[serde(rename = "NONE")]
    Exempt,
}

serde_plain::derive_display_from_serialize!(TaxType);
serde_plain::derive_fromstr_from_deserialize!(TaxType);

impl TaxType {
    /// The rate assumed for a record of this type that has no explicit rate.
    pub fn default_rate(&self) -> Decimal {
        match self {
            TaxType::Gst => Decimal::from(DEFAULT_GST_RATE),
            TaxType::Exempt => Decimal::ZERO,
        }
    }
}

/// The explicit rate wins; without one the record's type decides.
pub fn effective_rate(tax_rate: Option<Decimal>, tax_type: TaxType) -> Decimal {
    tax_rate
        .map(clamp_rate)
        .unwrap_or_else(|| tax_type.default_rate())
}

/// Parses a percentage typed by a user. Anything unparseable is `0`; the result is clamped to
/// `0..=100`.
pub fn parse_rate(input: &str) -> Decimal {
    let rate = Decimal::from_str(input.trim().trim_end_matches('%').trim()).unwrap_or_default();
    clamp_rate(rate)
}

/// Restricts a rate to `0..=100`.
pub fn clamp_rate(rate: Decimal) -> Decimal {
    rate.clamp(Decimal::ZERO, HUNDRED)
}

/// Computes the tax on `base` at `rate_percent`, rounded to whole units.
///
/// Negative bases and rates are treated as zero; rates above 100 are treated as 100. The rate is
/// applied as a fraction of at most one, so the tax never exceeds the base and cannot overflow.
pub fn compute_tax(base: Amount, rate_percent: Decimal) -> Amount {
    let base = base.non_negative().value();
    let fraction = clamp_rate(rate_percent)
        .checked_div(HUNDRED)
        .unwrap_or(Decimal::ZERO);
    Amount::new(
        base.saturating_mul(fraction)
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero),
    )
}

/// The amount payable: base plus tax. Saturates at `Decimal::MAX`.
pub fn compute_total(base: Amount, tax: Amount) -> Amount {
    Amount::new(base.value().saturating_add(tax.value()))
}

/// A live preview of the tax on a record being entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TaxPreview {
    pub taxable: Amount,
    #[serde(with = "rust_decimal::serde::float")]
    pub rate_percent: Decimal,
    pub tax: Amount,
    pub total: Amount,
}

impl TaxPreview {
    pub fn new(taxable: Amount, slab: &TaxSlab) -> Self {
        Self::with_rate(taxable, slab.rate_percent())
    }

    pub fn with_rate(taxable: Amount, rate_percent: Decimal) -> Self {
        let rate_percent = clamp_rate(rate_percent);
        let tax = compute_tax(taxable, rate_percent);
        Self {
            taxable,
            rate_percent,
            tax,
            total: compute_total(taxable, tax),
        }
    }
}

impl Display for TaxPreview {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Taxable {} + Tax {} ({}%) = Total {}",
            self.taxable,
            self.tax,
            self.rate_percent.normalize(),
            self.total
        )
    }
}

/// Simplified individual income tax slabs: `(upper limit, rate percent)`. The last slab has no
/// upper limit.
const INCOME_TAX_SLABS: [(Option<i64>, i64); 4] = [
    (Some(250_000), 0),
    (Some(500_000), 5),
    (Some(1_000_000), 20),
    (None, 30),
];

/// Estimates income tax on `total_income` using progressive slabs, rounded to 2 decimal places.
pub fn compute_income_tax(total_income: Amount) -> Amount {
    let income = total_income.non_negative().value();
    let mut tax = Decimal::ZERO;
    let mut previous_limit = Decimal::ZERO;

    for (limit, rate) in INCOME_TAX_SLABS {
        if income <= previous_limit {
            break;
        }
        let upper = match limit {
            Some(limit) => income.min(Decimal::from(limit)),
            None => income,
        };
        // `rate` is a whole percentage, so `Decimal::new(rate, 2)` is the exact fraction.
        let band = (upper - previous_limit).saturating_mul(Decimal::new(rate, 2));
        tax = tax.saturating_add(band);
        match limit {
            Some(limit) => previous_limit = Decimal::from(limit),
            None => break,
        }
    }

    Amount::new(tax).round_dp(2)
}
