//! Handlers for `taxmate summary`, `taxmate dashboard` and `taxmate export`.

use crate::api::{Api, DashboardData, ReportSummary};
use crate::args::{PeriodArgs, RangeArgs};
use crate::commands::{summary_query, Out, CUSTOM_RANGE_NOT_READY};
use crate::error::{ErrorType, IntoResult};
use crate::format::{format_currency, format_date, format_date_input};
use crate::model::tax::compute_income_tax;
use crate::model::{Amount, DateRange, Period};
use crate::{utils, Result};
use anyhow::Context;
use chrono::NaiveDate;
use serde::Serialize;
use std::fmt::Write;
use std::path::{Path, PathBuf};

/// The totals for a period along with the range they cover.
#[derive(Debug, Clone, Serialize)]
pub struct SummaryReport {
    pub period: Period,
    pub range: Option<DateRange>,
    #[serde(flatten)]
    pub summary: ReportSummary,
    pub net: Amount,
    /// Slab-based income tax on `total_income`.
    pub income_tax: Amount,
}

/// Fetches income, expense and estimated tax totals for the selected period.
pub async fn summary(api: &dyn Api, args: &PeriodArgs, today: NaiveDate) -> Result<Out<SummaryReport>> {
    let Some(query) = summary_query(args.period(), &args.custom()) else {
        return Ok(CUSTOM_RANGE_NOT_READY.into());
    };
    let summary = api
        .summary(&query)
        .await
        .with_context(|| format!("Unable to fetch the summary for {query}"))
        .pub_result(ErrorType::Request)?;

    let report = SummaryReport {
        period: query.period(),
        range: query.resolve(today),
        summary,
        net: summary.net(),
        income_tax: compute_income_tax(summary.total_income),
    };

    let heading = match report.range {
        Some(range) => format!(
            "{}: {} to {}",
            report.period.label(),
            format_date(range.start()),
            format_date(range.end())
        ),
        None => report.period.label().to_string(),
    };
    let message = format!(
        "{heading}\n  Income: {}\n  Expense: {}\n  Net: {}\n  Estimated GST: {}\n  Estimated income tax: {}",
        format_currency(summary.total_income),
        format_currency(summary.total_expense),
        format_currency(report.net),
        format_currency(summary.estimated_tax),
        format_currency(report.income_tax),
    );
    Ok(Out::new(message, report))
}

/// Fetches the dashboard, optionally restricted to an explicit range.
pub async fn dashboard(api: &dyn Api, args: &RangeArgs) -> Result<Out<DashboardData>> {
    let range = match args.custom() {
        None => None,
        Some(custom) => match custom.resolve() {
            Some(range) => Some(range),
            None => return Ok(CUSTOM_RANGE_NOT_READY.into()),
        },
    };
    let data = api
        .dashboard(range)
        .await
        .context("Unable to fetch the dashboard")
        .pub_result(ErrorType::Request)?;

    let mut message = match range {
        Some(range) => format!(
            "Dashboard for {} to {}",
            format_date(range.start()),
            format_date(range.end())
        ),
        None => "Dashboard for all records".to_string(),
    };
    let s = &data.summary;
    // Writing to a String cannot fail.
    let _ = write!(
        message,
        "\n  Income: {}\n  Expense: {}\n  Net: {}\n  Estimated GST: {}",
        format_currency(s.total_income),
        format_currency(s.total_expense),
        format_currency(s.net()),
        format_currency(s.estimated_tax),
    );
    for (label, categories) in [
        ("Income", &data.categories.income),
        ("Expense", &data.categories.expense),
    ] {
        if categories.is_empty() {
            continue;
        }
        let _ = write!(message, "\n  {label} by category:");
        for (name, amount) in categories {
            let _ = write!(message, "\n    {name}: {}", format_currency(*amount));
        }
    }
    if !data.monthly_trend.is_empty() {
        let _ = write!(message, "\n  Monthly trend:");
        for point in &data.monthly_trend {
            let _ = write!(
                message,
                "\n    {}: income {}, expense {}, tax {}",
                point.month,
                format_currency(point.income),
                format_currency(point.expense),
                format_currency(point.tax),
            );
        }
    }
    Ok(Out::new(message, data))
}

/// Downloads the CSV report for the selected period and writes it to `output`, or to
/// `financial_report_<start>_<end>.csv` inside `default_dir`.
pub async fn export(
    api: &dyn Api,
    args: &PeriodArgs,
    output: Option<&Path>,
    default_dir: &Path,
    today: NaiveDate,
) -> Result<Out<PathBuf>> {
    let Some(query) = summary_query(args.period(), &args.custom()) else {
        return Ok(CUSTOM_RANGE_NOT_READY.into());
    };
    let csv = api
        .export_report(&query)
        .await
        .with_context(|| format!("Unable to export the report for {query}"))
        .pub_result(ErrorType::Request)?;

    let path = match output {
        Some(p) => p.to_path_buf(),
        None => default_dir.join(report_file_name(query.resolve(today), today)),
    };
    utils::write(&path, csv)
        .await
        .with_context(|| format!("Unable to write the report to {}", path.display()))
        .pub_result(ErrorType::Input)?;

    Ok(Out::new(
        format!("Saved the report to {}", path.display()),
        path,
    ))
}

fn report_file_name(range: Option<DateRange>, today: NaiveDate) -> String {
    let (start, end) = range
        .map(|r| (r.start(), r.end()))
        .unwrap_or((today, today));
    format!(
        "financial_report_{}_{}.csv",
        format_date_input(start),
        format_date_input(end)
    )
}
