use crate::model::record::DEFAULT_CATEGORY;
use crate::model::tax::{effective_rate, TaxType};
use crate::model::{summarize, Amount, FinancialRecord, Source, Summary, TransactionType};
use crate::Result;
use anyhow::{bail, Context};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;
use std::io::Read;
use std::str::FromStr;
use tracing::{debug, trace};

/// The largest batch the backend accepts in one import.
pub const MAX_ROWS: usize = 1000;

/// The largest share of error rows, in percent, a batch may carry and still be imported.
pub const MAX_ERROR_PERCENT: usize = 20;

/// Date layouts accepted in the `date` column, tried in order.
pub const DATE_FORMATS: [&str; 4] = ["%Y-%m-%d", "%d-%m-%Y", "%m/%d/%Y", "%d/%m/%Y"];

/// One row of uploaded data keyed by normalized header name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRow {
    row_number: usize,
    fields: BTreeMap<String, String>,
}

impl RawRow {
    /// Creates a row. Header names are trimmed and lower-cased.
    pub fn new<K, V>(row_number: usize, fields: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: AsRef<str>,
        V: Into<String>,
    {
        Self {
            row_number,
            fields: fields
                .into_iter()
                .map(|(k, v)| (normalize_header(k.as_ref()), v.into()))
                .collect(),
        }
    }

    /// The 1-based position of the row among the data rows.
    pub fn row_number(&self) -> usize {
        self.row_number
    }

    /// The trimmed value of `name`, or an empty string when the column is absent.
    pub fn get(&self, name: &str) -> &str {
        self.fields.get(name).map(|s| s.trim()).unwrap_or_default()
    }

    pub fn fields(&self) -> &BTreeMap<String, String> {
        &self.fields
    }
}

fn normalize_header(s: &str) -> String {
    s.trim().to_lowercase()
}

/// A row that could not be turned into a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorRow {
    pub row_number: usize,
    pub data: BTreeMap<String, String>,
    pub error: String,
}

/// The result of splitting a batch into insertable and rejected rows.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Classification {
    pub valid_rows: Vec<FinancialRecord>,
    pub error_rows: Vec<ErrorRow>,
    pub total_rows: usize,
}

impl Classification {
    fn push_valid(&mut self, record: FinancialRecord) {
        self.valid_rows.push(record);
        self.total_rows += 1;
    }

    fn push_error(&mut self, row: ErrorRow) {
        self.error_rows.push(row);
        self.total_rows += 1;
    }

    pub fn is_empty(&self) -> bool {
        self.total_rows == 0
    }

    /// Totals over the valid rows only.
    pub fn summary(&self) -> Summary {
        summarize(&self.valid_rows)
    }

    /// Fails when the batch is larger than `MAX_ROWS` or more than `MAX_ERROR_PERCENT` of its
    /// rows are errors.
    pub fn check_limits(&self) -> Result<()> {
        if self.total_rows > MAX_ROWS {
            bail!("CSV exceeds max limit of {MAX_ROWS} rows");
        }
        if self.error_rows.len() * 100 > self.total_rows * MAX_ERROR_PERCENT {
            let first = self
                .error_rows
                .first()
                .map(|e| e.error.as_str())
                .unwrap_or("Unknown");
            bail!("Too many invalid rows. First error: {first}");
        }
        Ok(())
    }
}

/// Splits `rows` into records and error rows. Every input row lands in exactly one of the two.
pub fn classify_rows(rows: impl IntoIterator<Item = RawRow>) -> Classification {
    let mut classification = Classification::default();
    for row in rows {
        match parse_row(&row) {
            Ok(record) => classification.push_valid(record),
            Err(error) => {
                debug!("Row {} rejected: {error}", row.row_number);
                classification.push_error(ErrorRow {
                    row_number: row.row_number,
                    data: row.fields,
                    error,
                });
            }
        }
    }
    classification
}

/// Turns one row into a record, or explains why it cannot be.
pub fn parse_row(row: &RawRow) -> std::result::Result<FinancialRecord, String> {
    let date = parse_date(row.get("date"))?;

    let amount_text = row.get("taxable_amount");
    let taxable_amount = Amount::from_str(amount_text)
        .map_err(|_| format!("taxable_amount '{amount_text}' is not a number"))?;

    let type_text = row.get("transaction_type");
    let transaction_type = TransactionType::from_str(&type_text.to_lowercase())
        .map_err(|_| format!("transaction_type '{type_text}' must be income or expense"))?;

    let tax_type_text = row.get("tax_type");
    let tax_type = if tax_type_text.is_empty() {
        TaxType::default()
    } else {
        TaxType::from_str(&tax_type_text.to_uppercase())
            .map_err(|_| format!("tax_type '{tax_type_text}' must be GST or NONE"))?
    };

    let rate_text = row.get("tax_rate");
    let tax_rate = if rate_text.is_empty() {
        effective_rate(None, tax_type)
    } else {
        Decimal::from_str(rate_text)
            .map_err(|_| format!("tax_rate '{rate_text}' is not a number"))?
    };

    let category = match row.get("category") {
        "" => DEFAULT_CATEGORY,
        c => c,
    };

    let record = FinancialRecord {
        source: Source::Csv,
        date,
        description: row.get("description").to_string(),
        category: category.to_string(),
        transaction_type,
        taxable_amount,
        tax_type,
        tax_rate,
    };
    record.validate().map_err(|e| e.to_string())?;
    Ok(record)
}

/// Parses `s` with the first of `DATE_FORMATS` that fits.
pub fn parse_date(s: &str) -> std::result::Result<NaiveDate, String> {
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
        .ok_or_else(|| format!("Invalid date format: {s}. Expected YYYY-MM-DD or DD-MM-YYYY"))
}

/// The rows of a CSV document, split into those the CSV parser accepted and those it rejected.
#[derive(Debug, Clone, Default)]
pub struct CsvRows {
    pub rows: Vec<RawRow>,
    pub rejected: Vec<ErrorRow>,
}

/// Reads a CSV document with a header row. Short or long rows are tolerated; missing columns read
/// as empty.
pub fn read_rows<R: Read>(reader: R) -> Result<CsvRows> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_reader(reader);
    let headers: Vec<String> = rdr
        .headers()
        .context("Unable to read the CSV header row")?
        .iter()
        .map(normalize_header)
        .collect();
    trace!("CSV headers: {headers:?}");

    let mut out = CsvRows::default();
    for (ix, result) in rdr.records().enumerate() {
        let row_number = ix + 1;
        match result {
            Ok(record) => out.rows.push(RawRow::new(
                row_number,
                headers.iter().zip(record.iter()),
            )),
            Err(e) => out.rejected.push(ErrorRow {
                row_number,
                data: BTreeMap::new(),
                error: format!("Unreadable CSV row: {e}"),
            }),
        }
    }
    Ok(out)
}

/// Reads and classifies a CSV document. Rows the CSV parser rejects become error rows.
pub fn classify_csv<R: Read>(reader: R) -> Result<Classification> {
    let CsvRows { rows, rejected } = read_rows(reader)?;
    let mut classification = classify_rows(rows);
    for row in rejected {
        classification.push_error(row);
    }
    classification.error_rows.sort_by_key(|e| e.row_number);
    debug!(
        "Classified {} rows: {} valid, {} errors",
        classification.total_rows,
        classification.valid_rows.len(),
        classification.error_rows.len()
    );
    Ok(classification)
}
