use crate::model::tax::{compute_tax, compute_total, TaxPreview, TaxSlab, TaxType};
use crate::model::Amount;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

/// The category used when none is given.
pub const DEFAULT_CATEGORY: &str = "Misc";

/// The largest `taxable_amount` a record may carry (one thousand trillion). Bounding the base
/// keeps tax, totals and summaries over many records well inside `Decimal` range.
pub const MAX_TAXABLE_AMOUNT: i64 = 1_000_000_000_000_000;

/// Whether money came in or went out.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    #[default]
    Income,
    Expense,
}

serde_plain::derive_display_from_serialize!(TransactionType);
serde_plain::derive_fromstr_from_deserialize!(TransactionType);

/// Where a record was entered.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    #[default]
    Manual,
    Csv,
}

serde_plain::derive_display_from_serialize!(Source);
serde_plain::derive_fromstr_from_deserialize!(Source);

/// A single income or expense entry as it is submitted to the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinancialRecord {
    pub source: Source,
    pub date: NaiveDate,
    pub description: String,
    pub category: String,
    pub transaction_type: TransactionType,
    pub taxable_amount: Amount,
    pub tax_type: TaxType,
    #[serde(with = "rust_decimal::serde::float")]
    pub tax_rate: Decimal,
}

impl FinancialRecord {
    /// Creates a manually entered record taxed according to `slab`.
    pub fn new(
        date: NaiveDate,
        description: impl Into<String>,
        category: impl Into<String>,
        transaction_type: TransactionType,
        taxable_amount: Amount,
        slab: &TaxSlab,
    ) -> Self {
        Self {
            source: Source::Manual,
            date,
            description: description.into(),
            category: category.into(),
            transaction_type,
            taxable_amount,
            tax_type: slab.tax_type(),
            tax_rate: slab.rate_percent(),
        }
    }

    /// Checks what must hold before a record may be submitted.
    pub fn validate(&self) -> Result<(), RecordError> {
        if self.description.trim().is_empty() {
            return Err(RecordError::MissingDescription);
        }
        if !self.taxable_amount.is_positive() {
            return Err(RecordError::NonPositiveAmount(self.taxable_amount));
        }
        if self.taxable_amount.value() > Decimal::from(MAX_TAXABLE_AMOUNT) {
            return Err(RecordError::AmountTooLarge(self.taxable_amount));
        }
        if self.tax_rate < Decimal::ZERO || self.tax_rate > Decimal::ONE_HUNDRED {
            return Err(RecordError::RateOutOfRange(self.tax_rate));
        }
        Ok(())
    }

    pub fn tax_amount(&self) -> Amount {
        compute_tax(self.taxable_amount, self.tax_rate)
    }

    pub fn total_amount(&self) -> Amount {
        compute_total(self.taxable_amount, self.tax_amount())
    }

    pub fn preview(&self) -> TaxPreview {
        TaxPreview::with_rate(self.taxable_amount, self.tax_rate)
    }
}

/// Why a record cannot be submitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordError {
    MissingDescription,
    NonPositiveAmount(Amount),
    AmountTooLarge(Amount),
    RateOutOfRange(Decimal),
}

impl Display for RecordError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            RecordError::MissingDescription => write!(f, "Description is required"),
            RecordError::NonPositiveAmount(a) => {
                write!(f, "taxable_amount must be greater than 0, got {}", a.value())
            }
            RecordError::AmountTooLarge(a) => write!(
                f,
                "taxable_amount must be at most {MAX_TAXABLE_AMOUNT}, got {}",
                a.value()
            ),
            RecordError::RateOutOfRange(r) => {
                write!(f, "tax_rate must be between 0 and 100, got {r}")
            }
        }
    }
}

impl std::error::Error for RecordError {}

/// Totals over a set of records.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub total_income: Amount,
    pub total_expense: Amount,
    pub estimated_tax: Amount,
}

impl Summary {
    /// Income minus expense.
    pub fn net(&self) -> Amount {
        self.total_income - self.total_expense
    }

    pub fn add(&mut self, transaction_type: TransactionType, taxable: Amount, tax: Amount) {
        match transaction_type {
            TransactionType::Income => self.total_income += taxable,
            TransactionType::Expense => self.total_expense += taxable,
        }
        self.estimated_tax += tax;
    }

    fn rounded(self) -> Self {
        Self {
            total_income: self.total_income.round_dp(2),
            total_expense: self.total_expense.round_dp(2),
            estimated_tax: self.estimated_tax.round_dp(2),
        }
    }
}

/// Sums taxable income, taxable expense and tax across `records`.
pub fn summarize<'a>(records: impl IntoIterator<Item = &'a FinancialRecord>) -> Summary {
    let mut summary = Summary::default();
    for r in records {
        summary.add(r.transaction_type, r.taxable_amount, r.tax_amount());
    }
    summary.rounded()
}

/// Taxable amounts per category, split by transaction type.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryBreakdown {
    #[serde(default)]
    pub income: BTreeMap<String, Amount>,
    #[serde(default)]
    pub expense: BTreeMap<String, Amount>,
}

impl CategoryBreakdown {
    pub fn add(&mut self, transaction_type: TransactionType, category: &str, taxable: Amount) {
        let map = match transaction_type {
            TransactionType::Income => &mut self.income,
            TransactionType::Expense => &mut self.expense,
        };
        *map.entry(category.to_string()).or_default() += taxable;
    }
}
