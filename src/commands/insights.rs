//! Handlers for `taxmate insights` and `taxmate tax-summary`.

use crate::api::Api;
use crate::commands::Out;
use crate::error::{ErrorType, IntoResult};
use crate::format::{format_currency, format_percent};
use crate::model::{ErlInsights, TaxSummary};
use crate::Result;
use anyhow::Context;
use std::fmt::Write;

/// Fetches savings, tax burden and spending indicators over all records.
pub async fn insights(api: &dyn Api) -> Result<Out<ErlInsights>> {
    let i = api
        .insights()
        .await
        .context("Unable to fetch the economic insights")
        .pub_result(ErrorType::Request)?;

    let mut message = format!(
        "Financial health score: {}/100\n  Income: {}\n  Expenses: {}\n  Net savings: {}\n  \
         Savings rate: {}\n  Tax efficiency: {}\n  Projected tax: {}\n  Monthly burn rate: {}",
        i.financial_health_score,
        format_currency(i.total_income),
        format_currency(i.total_expenses),
        format_currency(i.net_savings),
        format_percent(i.savings_rate),
        format_percent(i.tax_efficiency),
        format_currency(i.projected_tax),
        format_currency(i.monthly_burn_rate),
    );
    if !i.top_expense_categories.is_empty() {
        // Writing to a String cannot fail.
        let _ = write!(message, "\n  Top expense categories:");
        for c in &i.top_expense_categories {
            let _ = write!(
                message,
                "\n    {}: {} ({})",
                c.category,
                format_currency(c.amount),
                format_percent(c.percentage)
            );
        }
    }
    Ok(Out::new(message, i))
}

/// Fetches GST paid and the income tax estimate over all records.
pub async fn tax_summary(api: &dyn Api) -> Result<Out<TaxSummary>> {
    let s = api
        .tax_summary()
        .await
        .context("Unable to fetch the tax summary")
        .pub_result(ErrorType::Request)?;
    let message = format!(
        "Tax summary for all records\n  Income: {}\n  Expense: {}\n  GST paid: {}\n  \
         Estimated income tax: {}\n  Estimated total tax: {}",
        format_currency(s.total_income),
        format_currency(s.total_expense),
        format_currency(s.gst_paid),
        format_currency(s.estimated_income_tax),
        format_currency(s.estimated_total_tax),
    );
    Ok(Out::new(message, s))
}
