//! Handlers for `taxmate add` and `taxmate records`.

use crate::api::{Api, StoredRecord};
use crate::args::{AddArgs, PeriodArgs};
use crate::commands::{summary_query, Out, CUSTOM_RANGE_NOT_READY};
use crate::error::{ErrorType, IntoResult};
use crate::format::{format_currency, format_date};
use crate::model::FinancialRecord;
use crate::Result;
use anyhow::Context;
use chrono::NaiveDate;
use tracing::debug;

/// Validates and submits one manually entered record. `today` is used when no date was given.
///
/// # Errors
/// - `ErrorType::Input` when the record fails validation. Nothing is sent in that case.
/// - `ErrorType::Request` when the API rejects the record.
pub async fn add(api: &dyn Api, args: &AddArgs, today: NaiveDate) -> Result<Out<StoredRecord>> {
    let record = FinancialRecord::new(
        args.date().unwrap_or(today),
        args.description().trim(),
        args.category().trim(),
        args.transaction_type(),
        args.amount(),
        &args.tax_slab(),
    );
    record
        .validate()
        .context("The record is not valid")
        .pub_result(ErrorType::Input)?;

    debug!("Submitting {record:?}");
    let stored = api
        .create_record(&record)
        .await
        .context("Unable to save the record")
        .pub_result(ErrorType::Request)?;

    Ok(Out::new(
        format!("Saved record {}: {}", stored.id, describe(&stored)),
        stored,
    ))
}

/// Lists the records in the selected period, oldest first.
pub async fn records(api: &dyn Api, args: &PeriodArgs) -> Result<Out<Vec<StoredRecord>>> {
    let Some(query) = summary_query(args.period(), &args.custom()) else {
        return Ok(CUSTOM_RANGE_NOT_READY.into());
    };
    let records = api
        .records(&query)
        .await
        .with_context(|| format!("Unable to fetch records for {query}"))
        .pub_result(ErrorType::Request)?;

    if records.is_empty() {
        return Ok(Out::new("No records found for this period", records));
    }

    let mut message = format!("{} record(s):", records.len());
    for r in &records {
        message.push_str(&format!("\n  {}", describe(r)));
    }
    Ok(Out::new(message, records))
}

fn describe(stored: &StoredRecord) -> String {
    let r = &stored.record;
    format!(
        "{} {} {} [{}] {} + {} = {}",
        format_date(r.date),
        r.transaction_type,
        r.description,
        r.category,
        format_currency(r.taxable_amount),
        format_currency(stored.tax_amount),
        format_currency(stored.total_amount),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args::SlabArgs;
    use crate::error::error_type;
    use crate::model::{Amount, Period, SlabOption, Source, TransactionType};
    use crate::test::TestEnv;

    fn add_args(description: &str, amount: i64) -> AddArgs {
        AddArgs::new(
            None,
            description,
            "Services",
            TransactionType::Income,
            Amount::from(amount),
            SlabArgs::new(SlabOption::Gst12, ""),
        )
    }

    #[tokio::test]
    async fn test_add_stores_manual_record() {
        let env = TestEnv::new().await;
        let before = env.api().stored().await.len();
        let out = add(env.api(), &add_args("Design work", 5000), env.today())
            .await
            .unwrap();
        let stored = out.structure().unwrap();
        assert_eq!(stored.record.source, Source::Manual);
        assert_eq!(stored.record.date, env.today());
        assert_eq!(stored.tax_amount, Amount::from(600));
        assert_eq!(stored.total_amount, Amount::from(5600));
        assert!(out.message().contains("₹5,600"));
        assert_eq!(env.api().stored().await.len(), before + 1);
    }

    #[tokio::test]
    async fn test_add_rejects_invalid_before_sending() {
        let env = TestEnv::new().await;
        let before = env.api().stored().await.len();

        let err = add(env.api(), &add_args("  ", 5000), env.today())
            .await
            .unwrap_err();
        assert_eq!(error_type(&err), Some(ErrorType::Input));

        let err = add(env.api(), &add_args("Refund", 0), env.today())
            .await
            .unwrap_err();
        assert_eq!(error_type(&err), Some(ErrorType::Input));
        assert!(format!("{err:#}").contains("greater than 0"));

        assert_eq!(env.api().stored().await.len(), before);
    }

    #[tokio::test]
    async fn test_add_requires_login() {
        let env = TestEnv::anonymous().await;
        let err = add(env.api(), &add_args("Design work", 5000), env.today())
            .await
            .unwrap_err();
        assert_eq!(error_type(&err), Some(ErrorType::Request));
        assert!(format!("{err:#}").contains("Not authenticated"));
    }

    #[tokio::test]
    async fn test_records_for_month() {
        let env = TestEnv::new().await;
        let out = records(env.api(), &PeriodArgs::new(Period::CurrentMonth, None, None))
            .await
            .unwrap();
        let list = out.structure().unwrap();
        assert_eq!(list.len(), 2);
        assert!(list[0].record.date <= list[1].record.date);
        assert!(out.message().starts_with("2 record(s):"));
    }

    #[tokio::test]
    async fn test_records_custom_not_ready_sends_nothing() {
        let env = TestEnv::anonymous().await;
        // An anonymous TestApi fails every request, so success here means nothing was sent.
        let args = PeriodArgs::new(Period::Custom, Some("2024-13-01".into()), Some("2024-12-31".into()));
        let out = records(env.api(), &args).await.unwrap();
        assert_eq!(out.message(), CUSTOM_RANGE_NOT_READY);
    }

    #[tokio::test]
    async fn test_records_empty_period() {
        let env = TestEnv::new().await;
        let args = PeriodArgs::new(
            Period::Custom,
            Some("2020-01-01".into()),
            Some("2020-01-31".into()),
        );
        let out = records(env.api(), &args).await.unwrap();
        assert_eq!(out.message(), "No records found for this period");
        assert!(out.structure().unwrap().is_empty());
    }
}
