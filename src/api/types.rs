//! Request and response shapes exchanged with the TaxMate API.

use crate::format::format_date_input;
use crate::model::{
    Amount, CategoryBreakdown, CustomRange, DateRange, FinancialRecord, Period, Summary,
    TransactionType,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

/// The totals returned by `GET /reports/summary`.
pub type ReportSummary = Summary;

/// The query sent to the summary, records and export endpoints.
///
/// A `Custom` query always carries a resolved range; it cannot be built from an unresolved one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SummaryQuery {
    period: Period,
    range: Option<DateRange>,
}

impl SummaryQuery {
    /// Returns `None` when `period` is `Custom` and `custom` does not resolve. Callers should treat
    /// that as "not ready" and not issue the request.
    pub fn new(period: Period, custom: Option<&CustomRange>) -> Option<Self> {
        let range = match period {
            Period::Custom => Some(custom?.resolve()?),
            _ => None,
        };
        Some(Self { period, range })
    }

    /// A query for an explicit range.
    pub fn range(range: DateRange) -> Self {
        Self {
            period: Period::Custom,
            range: Some(range),
        }
    }

    pub fn period(&self) -> Period {
        self.period
    }

    /// The concrete range this query covers on `today`.
    pub fn resolve(&self, today: NaiveDate) -> Option<DateRange> {
        match self.range {
            Some(range) => Some(range),
            None => self.period.resolve(None, today),
        }
    }

    /// The query parameters in the order they are sent.
    pub fn pairs(&self) -> Vec<(&'static str, String)> {
        // The API's `month` already ends today, which is what an unrecognized period means.
        let period = match self.period {
            Period::Other => Period::CurrentMonth,
            p => p,
        };
        let mut pairs = vec![("period", period.to_string())];
        if let Some(range) = &self.range {
            pairs.push(("start_date", format_date_input(range.start())));
            pairs.push(("end_date", format_date_input(range.end())));
        }
        pairs
    }

    /// `period=...&start_date=...&end_date=...`
    pub fn query_string(&self) -> String {
        url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.pairs())
            .finish()
    }
}

impl Display for SummaryQuery {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.range {
            Some(range) => write!(f, "{range}"),
            None => write!(f, "{}", self.period.label()),
        }
    }
}

/// A record as the API returns it after it has been stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredRecord {
    pub id: u64,
    #[serde(flatten)]
    pub record: FinancialRecord,
    pub tax_amount: Amount,
    pub total_amount: Amount,
}

impl StoredRecord {
    /// Stores `record` under `id`, computing its tax and total.
    pub fn new(id: u64, record: FinancialRecord) -> Self {
        let tax_amount = record.tax_amount();
        let total_amount = record.total_amount();
        Self {
            id,
            record,
            tax_amount,
            total_amount,
        }
    }
}

/// One month of the dashboard trend, keyed `YYYY-MM`.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlyTrendPoint {
    pub month: String,
    pub income: Amount,
    pub expense: Amount,
    pub tax: Amount,
}

/// The payload of `GET /dashboard/`.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardData {
    #[serde(default)]
    pub summary: Summary,
    #[serde(default)]
    pub categories: CategoryBreakdown,
    #[serde(default)]
    pub monthly_trend: Vec<MonthlyTrendPoint>,
}

impl DashboardData {
    /// Builds the dashboard for `records`. Trend points are sorted by month.
    pub fn build<'a>(records: impl IntoIterator<Item = &'a StoredRecord>) -> Self {
        let mut summary = Summary::default();
        let mut categories = CategoryBreakdown::default();
        let mut monthly: BTreeMap<String, MonthlyTrendPoint> = BTreeMap::new();

        for stored in records {
            let r = &stored.record;
            summary.add(r.transaction_type, r.taxable_amount, stored.tax_amount);
            categories.add(r.transaction_type, &r.category, r.taxable_amount);

            let month = r.date.format("%Y-%m").to_string();
            let point = monthly
                .entry(month.clone())
                .or_insert_with(|| MonthlyTrendPoint {
                    month,
                    ..MonthlyTrendPoint::default()
                });
            match r.transaction_type {
                TransactionType::Income => point.income += r.taxable_amount,
                TransactionType::Expense => point.expense += r.taxable_amount,
            }
            point.tax += stored.tax_amount;
        }

        Self {
            summary,
            categories,
            monthly_trend: monthly.into_values().collect(),
        }
    }
}

/// What the API said about a batch insert.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportStatus {
    /// The rows were queued for background processing.
    Accepted,
    /// The rows were inserted before the response was sent.
    Completed,
    #[default]
    #[serde(other)]
    Unknown,
}

serde_plain::derive_display_from_serialize!(ImportStatus);
serde_plain::derive_fromstr_from_deserialize!(ImportStatus);

/// The payload of `POST /uploads/csv/insert`. Every field is optional on the wire.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportResult {
    pub imported_count: usize,
    pub failed_count: usize,
    pub status: ImportStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_rows: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ImportResult {
    /// The server's `total_rows` when it agrees with its own counts, otherwise `local`.
    pub fn normalized_total(&self, local: usize) -> usize {
        match self.total_rows {
            Some(total) if total == self.imported_count + self.failed_count => total,
            _ => local,
        }
    }
}

/// The payload of `POST /auth/login`.
#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
pub struct AuthResponse {
    #[serde(default)]
    pub access_token: String,
}

/// The JSON body of `POST /auth/register`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegisterRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

/// The account created by `POST /auth/register`. Fields the server leaves out are defaulted.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisteredUser {
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default)]
    pub email: String,
}
