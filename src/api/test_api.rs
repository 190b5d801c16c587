//! Implements the `Api` trait using in-memory data for testing purposes.
//!
//! Note: this is compiled even in the "production" version of this app so that we can run the whole
//! app, top-to-bottom, without a TaxMate server. State lives only as long as the `TestApi` does.

use crate::api::{
    Api, AuthContext, AuthResponse, DashboardData, ImportResult, ImportStatus, RegisteredUser,
    ReportSummary, StoredRecord, SummaryQuery,
};
use crate::format::format_date_input;
use crate::model::{
    economic_insights, summarize, tax_summary, Amount, DateRange, ErlInsights, FinancialRecord,
    TaxSlab, TaxSummary, TransactionType,
};
use crate::Result;
use anyhow::{anyhow, bail, ensure, Context};
use chrono::{Local, NaiveDate, Utc};
use tokio::sync::Mutex;
use tracing::debug;

const MIN_PASSWORD_LEN: usize = 6;

/// An implementation of the `Api` trait that does not use a server. It holds its records in
/// memory and, by default, is seeded with some existing data.
#[derive(Debug)]
pub struct TestApi {
    auth: AuthContext,
    today: NaiveDate,
    state: Mutex<State>,
}

#[derive(Debug, Default)]
struct State {
    next_id: u64,
    records: Vec<StoredRecord>,
    /// Registered emails, lower-cased.
    users: Vec<String>,
}

impl State {
    fn store(&mut self, record: FinancialRecord) -> StoredRecord {
        self.next_id += 1;
        let stored = StoredRecord::new(self.next_id, record);
        self.records.push(stored.clone());
        stored
    }
}

impl TestApi {
    /// Creates a `TestApi` holding `records`.
    pub fn new(auth: AuthContext, records: Vec<FinancialRecord>) -> Self {
        let mut state = State::default();
        for r in records {
            state.store(r);
        }
        Self {
            auth,
            today: Local::now().date_naive(),
            state: Mutex::new(state),
        }
    }

    /// Creates a `TestApi` holding the seed records from this module.
    pub fn seeded(auth: AuthContext) -> Self {
        Self::new(auth, seed_records())
    }

    /// Fixes the date that named periods are resolved against.
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = today;
        self
    }

    /// A copy of everything stored so far.
    pub async fn stored(&self) -> Vec<StoredRecord> {
        self.state.lock().await.records.clone()
    }

    /// Every stored record, in storage order.
    async fn all_records(&self) -> Vec<FinancialRecord> {
        let state = self.state.lock().await;
        state.records.iter().map(|s| s.record.clone()).collect()
    }

    fn require_auth(&self) -> Result<()> {
        if !self.auth.is_authenticated() {
            bail!("Not authenticated");
        }
        Ok(())
    }

    async fn select(&self, range: Option<DateRange>) -> Vec<StoredRecord> {
        let state = self.state.lock().await;
        let mut out: Vec<StoredRecord> = state
            .records
            .iter()
            .filter(|s| range.map(|r| r.contains(s.record.date)).unwrap_or(true))
            .cloned()
            .collect();
        out.sort_by_key(|s| (s.record.date, s.id));
        out
    }

    async fn select_query(&self, query: &SummaryQuery) -> Result<Vec<StoredRecord>> {
        let range = query
            .resolve(self.today)
            .with_context(|| format!("Invalid period '{}'", query.period()))?;
        Ok(self.select(Some(range)).await)
    }
}

#[async_trait::async_trait]
impl Api for TestApi {
    async fn login(&self, username: &str, password: &str) -> Result<AuthResponse> {
        check_credentials(username, password)?;
        debug!("Test login for {username}");
        Ok(AuthResponse {
            access_token: format!("mock_token_{}", Utc::now().timestamp_millis()),
        })
    }

    async fn register(&self, email: &str, password: &str) -> Result<RegisteredUser> {
        let email = email.trim();
        check_credentials(email, password)?;
        ensure!(email.contains('@'), "Invalid email format");
        let mut state = self.state.lock().await;
        let key = email.to_lowercase();
        ensure!(!state.users.contains(&key), "Email already exists");
        state.users.push(key);
        debug!("Test registration for {email}");
        Ok(RegisteredUser {
            id: Some(state.users.len() as u64),
            email: email.to_string(),
        })
    }

    async fn summary(&self, query: &SummaryQuery) -> Result<ReportSummary> {
        self.require_auth()?;
        let records = self.select_query(query).await?;
        Ok(summarize(records.iter().map(|s| &s.record)))
    }

    async fn dashboard(&self, range: Option<DateRange>) -> Result<DashboardData> {
        self.require_auth()?;
        let records = self.select(range).await;
        Ok(DashboardData::build(&records))
    }

    async fn records(&self, query: &SummaryQuery) -> Result<Vec<StoredRecord>> {
        self.require_auth()?;
        self.select_query(query).await
    }

    async fn create_record(&self, record: &FinancialRecord) -> Result<StoredRecord> {
        self.require_auth()?;
        record.validate()?;
        Ok(self.state.lock().await.store(record.clone()))
    }

    async fn insert_records(&self, records: &[FinancialRecord]) -> Result<ImportResult> {
        self.require_auth()?;
        let mut state = self.state.lock().await;
        let mut result = ImportResult {
            status: ImportStatus::Completed,
            total_rows: Some(records.len()),
            ..ImportResult::default()
        };
        for r in records {
            match r.validate() {
                Ok(()) => {
                    state.store(r.clone());
                    result.imported_count += 1;
                }
                Err(e) => {
                    debug!("Test insert rejected a record: {e}");
                    result.failed_count += 1;
                }
            }
        }
        Ok(result)
    }

    async fn export_report(&self, query: &SummaryQuery) -> Result<String> {
        self.require_auth()?;
        let records = self.select_query(query).await?;
        export_csv(&records)
    }

    async fn insights(&self) -> Result<ErlInsights> {
        self.require_auth()?;
        Ok(economic_insights(&self.all_records().await))
    }

    async fn tax_summary(&self) -> Result<TaxSummary> {
        self.require_auth()?;
        Ok(tax_summary(&self.all_records().await))
    }
}

/// The rules the login and registration forms apply before anything is sent.
fn check_credentials(email: &str, password: &str) -> Result<()> {
    ensure!(
        !email.trim().is_empty() && !password.is_empty(),
        "Email and password are required"
    );
    ensure!(
        password.len() >= MIN_PASSWORD_LEN,
        "Password must be at least {MIN_PASSWORD_LEN} characters"
    );
    Ok(())
}

/// Renders records the way `GET /reports/export` does, with a closing `TOTAL` row.
fn export_csv(records: &[StoredRecord]) -> Result<String> {
    let money = |a: Amount| format!("{:.2}", a.value().round_dp(2));
    let mut wtr = csv::Writer::from_writer(Vec::new());
    wtr.write_record([
        "Date",
        "Description",
        "Category",
        "Type",
        "Taxable Amount",
        "Tax Amount",
        "Total Amount",
    ])?;

    let mut taxable = Amount::ZERO;
    let mut tax = Amount::ZERO;
    let mut total = Amount::ZERO;
    for s in records {
        let r = &s.record;
        let kind = match r.transaction_type {
            TransactionType::Income => "Income",
            TransactionType::Expense => "Expense",
        };
        wtr.write_record([
            format_date_input(r.date),
            r.description.clone(),
            r.category.clone(),
            kind.to_string(),
            money(r.taxable_amount),
            money(s.tax_amount),
            money(s.total_amount),
        ])?;
        taxable += r.taxable_amount;
        tax += s.tax_amount;
        total += s.total_amount;
    }
    wtr.write_record([
        "TOTAL".to_string(),
        String::new(),
        String::new(),
        String::new(),
        money(taxable),
        money(tax),
        money(total),
    ])?;

    let bytes = wtr
        .into_inner()
        .map_err(|e| anyhow!("Unable to finish the CSV export: {}", e.error()))?;
    String::from_utf8(bytes).context("The CSV export is not UTF-8")
}

/// Seed records spanning April to June 2024.
fn seed_records() -> Vec<FinancialRecord> {
    let rows: [(i32, u32, u32, &str, &str, TransactionType, i64, TaxSlab); 6] = [
        (2024, 4, 5, "Consulting retainer", "Services", TransactionType::Income, 50000, TaxSlab::Gst18),
        (2024, 4, 18, "Office rent", "Rent", TransactionType::Expense, 15000, TaxSlab::Gst18),
        (2024, 5, 2, "Product sale", "Sales", TransactionType::Income, 12000, TaxSlab::Gst12),
        (2024, 5, 20, "Stationery", "Office", TransactionType::Expense, 800, TaxSlab::Exempt),
        (2024, 6, 10, "Training workshop", "Services", TransactionType::Income, 25000, TaxSlab::Gst18),
        (2024, 6, 12, "Client travel", "Travel", TransactionType::Expense, 4200, TaxSlab::Gst5),
    ];
    rows.into_iter()
        .filter_map(|(y, m, d, description, category, kind, amount, slab)| {
            let date = NaiveDate::from_ymd_opt(y, m, d)?;
            Some(FinancialRecord::new(
                date,
                description,
                category,
                kind,
                Amount::from(amount),
                &slab,
            ))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CustomRange, Period, TaxType};

    fn api() -> TestApi {
        TestApi::seeded(AuthContext::with_token("tok"))
            .with_today(NaiveDate::from_ymd_opt(2024, 6, 15).unwrap())
    }

    fn query(period: Period) -> SummaryQuery {
        SummaryQuery::new(period, None).unwrap()
    }

    #[tokio::test]
    async fn test_login_rules() {
        let api = TestApi::seeded(AuthContext::anonymous());
        assert!(api.login("", "secret1").await.is_err());
        assert!(api.login("me@example.com", "short").await.is_err());
        let resp = api.login("me@example.com", "secret1").await.unwrap();
        assert!(resp.access_token.starts_with("mock_token_"));
    }

    #[tokio::test]
    async fn test_register_rejects_duplicates() {
        let api = TestApi::seeded(AuthContext::anonymous());
        let user = api.register("me@example.com", "secret1").await.unwrap();
        assert_eq!(user.email, "me@example.com");
        assert_eq!(user.id, Some(1));

        let err = api.register(" ME@example.com ", "secret2").await.unwrap_err();
        assert_eq!(err.to_string(), "Email already exists");
        let err = api.register("not-an-email", "secret1").await.unwrap_err();
        assert_eq!(err.to_string(), "Invalid email format");
        assert!(api.register("you@example.com", "short").await.is_err());

        let other = api.register("you@example.com", "secret1").await.unwrap();
        assert_eq!(other.id, Some(2));
    }

    #[tokio::test]
    async fn test_insights_cover_all_records() {
        let i = api().insights().await.unwrap();
        assert_eq!(i.total_income, Amount::from(87000));
        assert_eq!(i.projected_tax, Amount::from(17850));
        assert_eq!(i.financial_health_score, 100);

        let s = api().tax_summary().await.unwrap();
        assert_eq!(s.gst_paid, Amount::from(17850));
        assert_eq!(s.estimated_total_tax, Amount::from(17850));

        let anon = TestApi::seeded(AuthContext::anonymous());
        assert!(anon.insights().await.is_err());
        assert!(anon.tax_summary().await.is_err());
    }

    #[tokio::test]
    async fn test_requires_token() {
        let api = TestApi::seeded(AuthContext::anonymous());
        let err = api.summary(&query(Period::CurrentMonth)).await.unwrap_err();
        assert_eq!(err.to_string(), "Not authenticated");
    }

    #[tokio::test]
    async fn test_summary_current_month() {
        let s = api().summary(&query(Period::CurrentMonth)).await.unwrap();
        assert_eq!(s.total_income, Amount::from(25000));
        assert_eq!(s.total_expense, Amount::from(4200));
        assert_eq!(s.estimated_tax, Amount::from(4500 + 210));
    }

    #[tokio::test]
    async fn test_summary_financial_year() {
        let s = api().summary(&query(Period::FinancialYear)).await.unwrap();
        assert_eq!(s.total_income, Amount::from(87000));
        assert_eq!(s.total_expense, Amount::from(20000));
    }

    #[tokio::test]
    async fn test_records_custom_range() {
        let custom = CustomRange::new("2024-05-01", "2024-05-31");
        let q = SummaryQuery::new(Period::Custom, Some(&custom)).unwrap();
        let records = api().records(&q).await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].record.description, "Product sale");
        assert_eq!(records[0].tax_amount, Amount::from(1440));
    }

    #[tokio::test]
    async fn test_create_record() {
        let api = api();
        let record = FinancialRecord::new(
            NaiveDate::from_ymd_opt(2024, 6, 14).unwrap(),
            "Design work",
            "Services",
            TransactionType::Income,
            Amount::from(1000),
            &TaxSlab::Gst28,
        );
        let stored = api.create_record(&record).await.unwrap();
        assert_eq!(stored.id, 7);
        assert_eq!(stored.tax_amount, Amount::from(280));
        assert_eq!(stored.total_amount, Amount::from(1280));
        assert_eq!(api.stored().await.len(), 7);

        let mut bad = record.clone();
        bad.taxable_amount = Amount::ZERO;
        assert!(api.create_record(&bad).await.is_err());
    }

    #[tokio::test]
    async fn test_insert_records_counts() {
        let api = api();
        let good = FinancialRecord::new(
            NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            "a",
            "b",
            TransactionType::Expense,
            Amount::from(10),
            &TaxSlab::Exempt,
        );
        let mut bad = good.clone();
        bad.description.clear();
        let result = api.insert_records(&[good.clone(), bad, good]).await.unwrap();
        assert_eq!(result.imported_count, 2);
        assert_eq!(result.failed_count, 1);
        assert_eq!(result.normalized_total(3), 3);
        assert_eq!(result.status, ImportStatus::Completed);
    }

    #[tokio::test]
    async fn test_dashboard_all() {
        let d = api().dashboard(None).await.unwrap();
        assert_eq!(d.monthly_trend.len(), 3);
        assert_eq!(d.categories.income["Services"], Amount::from(75000));
        assert_eq!(d.categories.expense["Office"], Amount::from(800));
    }

    #[tokio::test]
    async fn test_export() {
        let csv = api()
            .export_report(&query(Period::PreviousMonth))
            .await
            .unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(
            lines[0],
            "Date,Description,Category,Type,Taxable Amount,Tax Amount,Total Amount"
        );
        assert_eq!(lines[1], "2024-05-02,Product sale,Sales,Income,12000.00,1440.00,13440.00");
        assert_eq!(lines[2], "2024-05-20,Stationery,Office,Expense,800.00,0.00,800.00");
        assert_eq!(lines[3], "TOTAL,,,,12800.00,1440.00,14240.00");
    }

    #[test]
    fn test_seed_records_are_valid() {
        let seed = seed_records();
        assert_eq!(seed.len(), 6);
        assert!(seed.iter().all(|r| r.validate().is_ok()));
        assert!(seed.iter().any(|r| r.tax_type == TaxType::Exempt));
    }
}
