//! Implements the `Api` trait with `reqwest`.

use crate::api::{
    Api, AuthContext, AuthResponse, DashboardData, ImportResult, RegisterRequest, RegisteredUser,
    ReportSummary, StoredRecord, SummaryQuery,
};
use crate::format::format_date_input;
use crate::model::{DateRange, ErlInsights, FinancialRecord, TaxSummary};
use crate::Result;
use anyhow::{bail, Context};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, trace};
use url::Url;

const TIMEOUT: Duration = Duration::from_secs(30);
const REQUEST_FAILED: &str = "Request failed";

/// Talks to a TaxMate server at `base`.
#[derive(Debug, Clone)]
pub struct HttpApi {
    client: Client,
    base: Url,
    auth: AuthContext,
}

impl HttpApi {
    /// `base` must end with `/`; `Config` guarantees that.
    pub fn new(base: Url, auth: AuthContext) -> Result<Self> {
        let client = Client::builder()
            .timeout(TIMEOUT)
            .build()
            .context("Unable to build the HTTP client")?;
        Ok(Self { client, base, auth })
    }

    fn url(&self, path: &str) -> Result<Url> {
        self.base
            .join(path)
            .with_context(|| format!("Unable to build a URL for '{path}'"))
    }

    fn authorize(&self, req: RequestBuilder) -> RequestBuilder {
        match self.auth.bearer() {
            Some(bearer) => req.header(AUTHORIZATION, bearer),
            None => req,
        }
    }

    /// Sends `req` and returns the response if it was successful. A failed response becomes an
    /// error carrying the body text.
    async fn execute(&self, req: RequestBuilder) -> Result<Response> {
        let req = self.authorize(req).build().context("Unable to build request")?;
        let endpoint = format!("{} {}", req.method(), req.url().path());
        debug!("Sending {endpoint}");
        let resp = self
            .client
            .execute(req)
            .await
            .with_context(|| format!("{REQUEST_FAILED}: {endpoint}"))?;

        let status = resp.status();
        trace!("{endpoint} returned {status}");
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            debug!("{endpoint} failed with {status}");
            if body.trim().is_empty() {
                bail!(REQUEST_FAILED);
            }
            bail!(body);
        }
        Ok(resp)
    }

    /// Sends `req` and decodes a JSON body. A successful response that is not JSON decodes as
    /// `T::default()`.
    async fn send<T>(&self, req: RequestBuilder) -> Result<T>
    where
        T: DeserializeOwned + Default,
    {
        let resp = self.execute(req).await?;
        if !is_json(&resp) {
            return Ok(T::default());
        }
        resp.json::<T>()
            .await
            .context("Unable to decode the response")
    }

    async fn send_text(&self, req: RequestBuilder) -> Result<String> {
        let resp = self.execute(req).await?;
        resp.text().await.context("Unable to read the response")
    }
}

fn is_json(resp: &Response) -> bool {
    resp.headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.contains("application/json"))
        .unwrap_or(false)
}

#[async_trait::async_trait]
impl Api for HttpApi {
    async fn login(&self, username: &str, password: &str) -> Result<AuthResponse> {
        let body = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("username", username)
            .append_pair("password", password)
            .finish();
        let req = self
            .client
            .post(self.url("auth/login")?)
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(body);
        self.send(req).await
    }

    async fn register(&self, email: &str, password: &str) -> Result<RegisteredUser> {
        let req = self
            .client
            .post(self.url("auth/register")?)
            .json(&RegisterRequest { email, password });
        self.send(req).await
    }

    async fn summary(&self, query: &SummaryQuery) -> Result<ReportSummary> {
        let req = self
            .client
            .get(self.url("reports/summary")?)
            .query(&query.pairs());
        self.send(req).await
    }

    async fn dashboard(&self, range: Option<DateRange>) -> Result<DashboardData> {
        let mut req = self.client.get(self.url("dashboard/")?);
        if let Some(range) = range {
            req = req.query(&[
                ("start_date", format_date_input(range.start())),
                ("end_date", format_date_input(range.end())),
            ]);
        }
        self.send(req).await
    }

    async fn records(&self, query: &SummaryQuery) -> Result<Vec<StoredRecord>> {
        let req = self.client.get(self.url("records")?).query(&query.pairs());
        self.send(req).await
    }

    async fn create_record(&self, record: &FinancialRecord) -> Result<StoredRecord> {
        let req = self.client.post(self.url("records")?).json(record);
        let resp = self.execute(req).await?;
        resp.json::<StoredRecord>()
            .await
            .context("Unable to decode the stored record")
    }

    async fn insert_records(&self, records: &[FinancialRecord]) -> Result<ImportResult> {
        let req = self
            .client
            .post(self.url("uploads/csv/insert")?)
            .json(records);
        self.send(req).await
    }

    async fn export_report(&self, query: &SummaryQuery) -> Result<String> {
        let req = self
            .client
            .get(self.url("reports/export")?)
            .query(&query.pairs());
        self.send_text(req).await
    }

    async fn insights(&self) -> Result<ErlInsights> {
        self.send(self.client.get(self.url("erl/insights")?)).await
    }

    async fn tax_summary(&self) -> Result<TaxSummary> {
        self.send(self.client.get(self.url("tax/summary/")?)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api(base: &str) -> HttpApi {
        HttpApi::new(Url::parse(base).unwrap(), AuthContext::with_token("tok")).unwrap()
    }

    #[test]
    fn test_url_joins_under_base_path() {
        let a = api("https://tax.example.com/v1/");
        assert_eq!(
            a.url("reports/summary").unwrap().as_str(),
            "https://tax.example.com/v1/reports/summary"
        );
        assert_eq!(
            a.url("dashboard/").unwrap().as_str(),
            "https://tax.example.com/v1/dashboard/"
        );
    }

    #[test]
    fn test_register_body_is_json() {
        let a = api("http://127.0.0.1:8000/");
        let req = a
            .client
            .post(a.url("auth/register").unwrap())
            .json(&RegisterRequest {
                email: "me@example.com",
                password: "secret1",
            })
            .build()
            .unwrap();
        assert_eq!(req.url().path(), "/auth/register");
        assert_eq!(req.headers()[CONTENT_TYPE], "application/json");
        let body = req.body().and_then(|b| b.as_bytes()).unwrap();
        assert_eq!(body, br#"{"email":"me@example.com","password":"secret1"}"#);
    }

    #[test]
    fn test_insight_urls() {
        let a = api("https://tax.example.com/v1/");
        assert_eq!(
            a.url("erl/insights").unwrap().as_str(),
            "https://tax.example.com/v1/erl/insights"
        );
        assert_eq!(
            a.url("tax/summary/").unwrap().as_str(),
            "https://tax.example.com/v1/tax/summary/"
        );
    }

    #[test]
    fn test_authorize_adds_bearer_only_with_token() {
        let a = api("http://127.0.0.1:8000/");
        let req = a
            .authorize(a.client.get("http://127.0.0.1:8000/records"))
            .build()
            .unwrap();
        assert_eq!(req.headers()[AUTHORIZATION], "Bearer tok");

        let anon = HttpApi::new(
            Url::parse("http://127.0.0.1:8000/").unwrap(),
            AuthContext::anonymous(),
        )
        .unwrap();
        let req = anon
            .authorize(anon.client.get("http://127.0.0.1:8000/records"))
            .build()
            .unwrap();
        assert!(req.headers().get(AUTHORIZATION).is_none());
    }

    #[test]
    fn test_summary_query_params() {
        let a = api("http://127.0.0.1:8000/");
        let custom = crate::model::CustomRange::new("2024-01-01", "2024-01-31");
        let q = SummaryQuery::new(crate::model::Period::Custom, Some(&custom)).unwrap();
        let req = a
            .client
            .get(a.url("reports/summary").unwrap())
            .query(&q.pairs())
            .build()
            .unwrap();
        assert_eq!(
            req.url().query(),
            Some("period=custom&start_date=2024-01-01&end_date=2024-01-31")
        );
    }
}
