//! Whole-history indicators computed from every record a user holds: the economic insights shown
//! on the ERL page and the simple tax summary.

use crate::model::tax::{compute_income_tax, TaxType};
use crate::model::{Amount, FinancialRecord, TransactionType};
use chrono::Datelike;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// The category expenses are filed under when they carry none.
pub const UNCATEGORIZED: &str = "Uncategorized";

/// How many expense categories `ErlInsights::top_expense_categories` lists.
pub const TOP_CATEGORIES: usize = 5;

/// One of the largest expense categories.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryExpense {
    pub category: String,
    pub amount: Amount,
    /// Share of all expenses, in percent.
    #[serde(with = "rust_decimal::serde::float")]
    pub percentage: Decimal,
}

/// Savings, tax burden and spending indicators over all records.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErlInsights {
    pub total_income: Amount,
    pub total_expenses: Amount,
    /// Income less expenses less all tax.
    pub net_savings: Amount,
    #[serde(with = "rust_decimal::serde::float")]
    pub savings_rate: Decimal,
    /// Tax as a percentage of income.
    #[serde(with = "rust_decimal::serde::float")]
    pub tax_efficiency: Decimal,
    pub projected_tax: Amount,
    #[serde(default)]
    pub top_expense_categories: Vec<CategoryExpense>,
    /// Expenses averaged over the distinct months that have records.
    pub monthly_burn_rate: Amount,
    /// A rule-based score in `0..=100`.
    pub financial_health_score: u8,
}

/// Computes `ErlInsights` over `records`.
///
/// The health score adds:
/// - 40 for a savings rate above 20%, or 20 for one above 10%
/// - 20 for tax below 30% of income
/// - 40 when the monthly burn is below the monthly income, or 10 when it is below 110% of it
pub fn economic_insights<'a>(records: impl IntoIterator<Item = &'a FinancialRecord>) -> ErlInsights {
    let mut income = Amount::ZERO;
    let mut expenses = Amount::ZERO;
    let mut tax = Amount::ZERO;
    let mut categories: BTreeMap<String, Amount> = BTreeMap::new();
    let mut months = BTreeSet::new();

    for r in records {
        match r.transaction_type {
            TransactionType::Income => income += r.taxable_amount,
            TransactionType::Expense => {
                expenses += r.taxable_amount;
                let category = match r.category.trim() {
                    "" => UNCATEGORIZED,
                    c => c,
                };
                *categories.entry(category.to_string()).or_default() += r.taxable_amount;
            }
        }
        tax += r.tax_amount();
        months.insert((r.date.year(), r.date.month()));
    }

    let net_savings = income - expenses - tax;
    let savings_rate = percent_of(net_savings.value(), income.value());
    let tax_efficiency = percent_of(tax.value(), income.value());

    // Stable sort, so equal amounts stay in name order.
    let mut ranked: Vec<(String, Amount)> = categories.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1));
    let top_expense_categories = ranked
        .into_iter()
        .take(TOP_CATEGORIES)
        .map(|(category, amount)| CategoryExpense {
            percentage: percent_of(amount.value(), expenses.value()),
            category,
            amount,
        })
        .collect();

    let month_count = Decimal::from(months.len().max(1));
    let burn = per_month(expenses.value(), month_count);
    let monthly_income = per_month(income.value(), month_count);

    let mut score: u8 = 0;
    if savings_rate > Decimal::from(20) {
        score += 40;
    } else if savings_rate > Decimal::from(10) {
        score += 20;
    }
    if tax_efficiency < Decimal::from(30) {
        score += 20;
    }
    if burn < monthly_income {
        score += 40;
    } else if burn < monthly_income.saturating_mul(Decimal::new(11, 1)) {
        score += 10;
    }

    ErlInsights {
        total_income: income.round_dp(2),
        total_expenses: expenses.round_dp(2),
        net_savings: net_savings.round_dp(2),
        savings_rate,
        tax_efficiency,
        projected_tax: tax.round_dp(2),
        top_expense_categories,
        monthly_burn_rate: Amount::new(burn).round_dp(2),
        financial_health_score: score.min(100),
    }
}

/// Income, expense and GST totals with an income tax estimate.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxSummary {
    pub total_income: Amount,
    pub total_expense: Amount,
    /// Tax on records of type GST, income and expense alike.
    pub gst_paid: Amount,
    pub estimated_income_tax: Amount,
    pub estimated_total_tax: Amount,
}

/// Computes the `TaxSummary` over `records`.
pub fn tax_summary<'a>(records: impl IntoIterator<Item = &'a FinancialRecord>) -> TaxSummary {
    let mut income = Amount::ZERO;
    let mut expense = Amount::ZERO;
    let mut gst_paid = Amount::ZERO;
    for r in records {
        match r.transaction_type {
            TransactionType::Income => income += r.taxable_amount,
            TransactionType::Expense => expense += r.taxable_amount,
        }
        if r.tax_type == TaxType::Gst {
            gst_paid += r.tax_amount();
        }
    }
    let income_tax = compute_income_tax(income);
    TaxSummary {
        total_income: income.round_dp(2),
        total_expense: expense.round_dp(2),
        gst_paid: gst_paid.round_dp(2),
        estimated_income_tax: income_tax,
        estimated_total_tax: (gst_paid + income_tax).round_dp(2),
    }
}

/// `part` as a percentage of `whole`, to 2 decimal places. Zero when `whole` is not positive.
fn percent_of(part: Decimal, whole: Decimal) -> Decimal {
    if whole <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    part.checked_div(whole)
        .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
        .unwrap_or_default()
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

fn per_month(total: Decimal, months: Decimal) -> Decimal {
    total.checked_div(months).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TaxSlab;
    use chrono::NaiveDate;

    fn record(
        month: u32,
        kind: TransactionType,
        category: &str,
        amount: i64,
        slab: TaxSlab,
    ) -> FinancialRecord {
        FinancialRecord::new(
            NaiveDate::from_ymd_opt(2024, month, 10).unwrap(),
            "entry",
            category,
            kind,
            Amount::from(amount),
            &slab,
        )
    }

    fn sample() -> Vec<FinancialRecord> {
        use TransactionType::{Expense, Income};
        vec![
            record(4, Income, "Services", 50000, TaxSlab::Gst18),
            record(4, Expense, "Rent", 15000, TaxSlab::Gst18),
            record(5, Income, "Sales", 12000, TaxSlab::Gst12),
            record(5, Expense, "Office", 800, TaxSlab::Exempt),
            record(6, Income, "Services", 25000, TaxSlab::Gst18),
            record(6, Expense, "Travel", 4200, TaxSlab::Gst5),
        ]
    }

    #[test]
    fn test_insights() {
        let i = economic_insights(&sample());
        assert_eq!(i.total_income, Amount::from(87000));
        assert_eq!(i.total_expenses, Amount::from(20000));
        assert_eq!(i.projected_tax, Amount::from(17850));
        assert_eq!(i.net_savings, Amount::from(49150));
        assert_eq!(i.savings_rate, Decimal::new(5649, 2));
        assert_eq!(i.tax_efficiency, Decimal::new(2052, 2));
        assert_eq!(i.monthly_burn_rate, Amount::new(Decimal::new(666667, 2)));
        assert_eq!(i.financial_health_score, 100);

        let names: Vec<&str> = i
            .top_expense_categories
            .iter()
            .map(|c| c.category.as_str())
            .collect();
        assert_eq!(names, vec!["Rent", "Travel", "Office"]);
        assert_eq!(i.top_expense_categories[0].percentage, Decimal::from(75));
        assert_eq!(i.top_expense_categories[2].percentage, Decimal::from(4));
    }

    #[test]
    fn test_insights_empty() {
        let i = economic_insights(&[]);
        assert_eq!(i.total_income, Amount::ZERO);
        assert_eq!(i.savings_rate, Decimal::ZERO);
        assert!(i.top_expense_categories.is_empty());
        // Only the tax rule holds with no income at all.
        assert_eq!(i.financial_health_score, 20);
    }

    #[test]
    fn test_insights_overspending() {
        use TransactionType::{Expense, Income};
        let records = vec![
            record(1, Income, "Sales", 1000, TaxSlab::Exempt),
            record(1, Expense, "", 1050, TaxSlab::Exempt),
        ];
        let i = economic_insights(&records);
        assert!(i.net_savings.is_negative());
        assert_eq!(i.savings_rate, Decimal::from(-5));
        assert_eq!(i.top_expense_categories[0].category, UNCATEGORIZED);
        // Tax rule plus burn within 110% of income.
        assert_eq!(i.financial_health_score, 30);
    }

    #[test]
    fn test_top_categories_are_capped() {
        let records: Vec<FinancialRecord> = (1..=7)
            .map(|n| {
                record(
                    1,
                    TransactionType::Expense,
                    &format!("C{n}"),
                    n * 100,
                    TaxSlab::Exempt,
                )
            })
            .collect();
        let i = economic_insights(&records);
        assert_eq!(i.top_expense_categories.len(), TOP_CATEGORIES);
        assert_eq!(i.top_expense_categories[0].category, "C7");
    }

    #[test]
    fn test_insights_serialized_shape() {
        let json = serde_json::to_value(economic_insights(&sample())).unwrap();
        assert_eq!(json["savings_rate"], 56.49);
        assert_eq!(json["financial_health_score"], 100);
        assert_eq!(json["top_expense_categories"][0]["category"], "Rent");
        assert_eq!(json["top_expense_categories"][0]["percentage"], 75.0);
    }

    #[test]
    fn test_tax_summary() {
        let s = tax_summary(&sample());
        assert_eq!(s.total_income, Amount::from(87000));
        assert_eq!(s.total_expense, Amount::from(20000));
        assert_eq!(s.gst_paid, Amount::from(17850));
        assert_eq!(s.estimated_income_tax, Amount::ZERO);
        assert_eq!(s.estimated_total_tax, Amount::from(17850));
    }

    #[test]
    fn test_tax_summary_with_income_tax() {
        let records = vec![record(
            1,
            TransactionType::Income,
            "Salary",
            600_000,
            TaxSlab::Exempt,
        )];
        let s = tax_summary(&records);
        assert_eq!(s.gst_paid, Amount::ZERO);
        // 12,500 + 20% of 1 lakh
        assert_eq!(s.estimated_income_tax, Amount::from(32_500));
        assert_eq!(s.estimated_total_tax, Amount::from(32_500));
    }
}
