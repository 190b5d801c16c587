//! Handler for `taxmate import`.

use crate::api::{Api, ImportStatus};
use crate::commands::Out;
use crate::error::{ErrorType, IntoResult};
use crate::format::format_currency;
use crate::model::Summary;
use crate::upload::{classify_csv, ErrorRow, UploadFlow};
use crate::{utils, Result};
use anyhow::Context;
use serde::Serialize;
use std::path::Path;
use tracing::{debug, warn};

/// How many error rows are listed in the message. All of them are in the structured output.
const SHOWN_ERRORS: usize = 10;

/// The outcome of an import, or of a dry run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ImportReport {
    pub total_rows: usize,
    pub valid_rows: usize,
    pub error_rows: Vec<ErrorRow>,
    /// Totals over the valid rows.
    pub summary: Summary,
    /// `None` for a dry run.
    pub status: Option<ImportStatus>,
    pub imported_count: usize,
    pub failed_count: usize,
}

/// Reads `file`, classifies its rows and, unless `dry_run` is set, inserts the valid rows.
///
/// # Errors
/// - `ErrorType::Import` when the file cannot be read, is over the row limit, has too many invalid
///   rows or has no valid rows at all.
/// - `ErrorType::Request` when the insert call fails.
pub async fn import(api: &dyn Api, file: &Path, dry_run: bool) -> Result<Out<ImportReport>> {
    let text = utils::read(file).await.pub_result(ErrorType::Import)?;
    let classification = classify_csv(text.as_bytes())
        .with_context(|| format!("Unable to read {}", file.display()))
        .pub_result(ErrorType::Import)?;
    classification
        .check_limits()
        .pub_result(ErrorType::Import)?;

    for e in &classification.error_rows {
        warn!("Row {}: {}", e.row_number, e.error);
    }

    let mut report = ImportReport {
        total_rows: classification.total_rows,
        valid_rows: classification.valid_rows.len(),
        error_rows: classification.error_rows.clone(),
        summary: classification.summary(),
        ..ImportReport::default()
    };

    let mut flow = UploadFlow::default();
    flow.preview(classification)?;

    if dry_run {
        flow.cancel()?;
        let message = format!("Dry run, nothing was imported.\n{}", describe(&report));
        return Ok(Out::new(message, report));
    }

    let records = flow.start_import().pub_result(ErrorType::Import)?;
    debug!("Inserting {} records", records.len());
    let result = match api.insert_records(&records).await {
        Ok(result) => result,
        Err(e) => {
            flow.fail(format!("{e:#}"))?;
            return Err(e)
                .context("The import failed, no rows were reported as imported")
                .pub_result(ErrorType::Request);
        }
    };
    flow.complete(result.clone())?;

    report.status = Some(result.status);
    let message = match result.status {
        ImportStatus::Accepted => {
            report.imported_count = records.len();
            format!(
                "{} row(s) were accepted for import{}\n{}",
                records.len(),
                result
                    .message
                    .as_deref()
                    .map(|m| format!(": {m}"))
                    .unwrap_or_default(),
                describe(&report)
            )
        }
        ImportStatus::Completed | ImportStatus::Unknown => {
            report.imported_count = result.imported_count;
            report.failed_count = result.failed_count;
            format!(
                "Imported {} of {} row(s) sent, {} failed on the server\n{}",
                result.imported_count,
                result.normalized_total(records.len()),
                result.failed_count,
                describe(&report)
            )
        }
    };
    Ok(Out::new(message, report))
}

fn describe(report: &ImportReport) -> String {
    let mut s = format!(
        "  Rows: {} total, {} valid, {} invalid\n  Income: {}\n  Expense: {}\n  Estimated GST: {}",
        report.total_rows,
        report.valid_rows,
        report.error_rows.len(),
        format_currency(report.summary.total_income),
        format_currency(report.summary.total_expense),
        format_currency(report.summary.estimated_tax),
    );
    for e in report.error_rows.iter().take(SHOWN_ERRORS) {
        s.push_str(&format!("\n  Row {}: {}", e.row_number, e.error));
    }
    if report.error_rows.len() > SHOWN_ERRORS {
        s.push_str(&format!(
            "\n  ... and {} more",
            report.error_rows.len() - SHOWN_ERRORS
        ));
    }
    s
}
