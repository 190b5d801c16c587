//! The boundary between this program and the TaxMate API.
//!
//! Everything the commands need from the server goes through the `Api` trait. `HttpApi` talks to a
//! real server with `reqwest`; `TestApi` answers from memory so the whole program can be run
//! top-to-bottom without a server.

mod auth;
mod http;
mod test_api;
mod types;

pub use auth::{AuthContext, TokenFile};
pub use http::HttpApi;
pub use test_api::TestApi;
pub use types::{
    AuthResponse, DashboardData, ImportResult, ImportStatus, MonthlyTrendPoint, RegisterRequest,
    RegisteredUser, ReportSummary, StoredRecord, SummaryQuery,
};

use crate::model::{DateRange, ErlInsights, FinancialRecord, TaxSummary};
use crate::{Config, Result};
use tracing::debug;

/// Set this to any non-empty value to use `TestApi` instead of a server.
pub const TEST_MODE_ENV: &str = "TAXMATE_IN_TEST_MODE";

/// Selects which `Api` implementation `connect` returns.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    #[default]
    Http,
    Test,
}

impl Mode {
    /// `Mode::Test` when `TAXMATE_IN_TEST_MODE` is set and non-empty, otherwise `Mode::Http`.
    pub fn from_env() -> Self {
        match std::env::var(TEST_MODE_ENV) {
            Ok(v) if !v.is_empty() => Mode::Test,
            _ => Mode::Http,
        }
    }
}

/// The operations the TaxMate API offers. Each call is a single attempt; failures are returned to
/// the caller as they are.
#[async_trait::async_trait]
pub trait Api: Send + Sync {
    /// `POST /auth/login`
    async fn login(&self, username: &str, password: &str) -> Result<AuthResponse>;

    /// `POST /auth/register`
    async fn register(&self, email: &str, password: &str) -> Result<RegisteredUser>;

    /// `GET /reports/summary`
    async fn summary(&self, query: &SummaryQuery) -> Result<ReportSummary>;

    /// `GET /dashboard/`. `None` covers all records.
    async fn dashboard(&self, range: Option<DateRange>) -> Result<DashboardData>;

    /// `GET /records`
    async fn records(&self, query: &SummaryQuery) -> Result<Vec<StoredRecord>>;

    /// `POST /records`
    async fn create_record(&self, record: &FinancialRecord) -> Result<StoredRecord>;

    /// `POST /uploads/csv/insert`
    async fn insert_records(&self, records: &[FinancialRecord]) -> Result<ImportResult>;

    /// `GET /reports/export`, returning the CSV body.
    async fn export_report(&self, query: &SummaryQuery) -> Result<String>;

    /// `GET /erl/insights`, computed over all records.
    async fn insights(&self) -> Result<ErlInsights>;

    /// `GET /tax/summary/`, computed over all records.
    async fn tax_summary(&self) -> Result<TaxSummary>;
}

/// Creates the `Api` for `mode`, sending requests with the credential in `auth`.
pub fn connect(config: &Config, mode: Mode, auth: AuthContext) -> Result<Box<dyn Api>> {
    debug!("Connecting to the API in {mode:?} mode");
    match mode {
        Mode::Http => Ok(Box::new(HttpApi::new(config.api_url().clone(), auth)?)),
        Mode::Test => Ok(Box::new(TestApi::seeded(auth))),
    }
}
