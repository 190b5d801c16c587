//! These structs provide the CLI interface for the taxmate CLI.

use crate::model::{Amount, CustomRange, Period, SlabOption, TaxSlab, TransactionType};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::convert::Infallible;
use std::fmt::{Display, Formatter};
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::error;
use tracing::level_filters::LevelFilter;

/// taxmate: A command-line client for TaxMate, a GST bookkeeping service.
///
/// It resolves reporting periods, previews GST on an amount before you record it, checks CSV files
/// before they are imported, and fetches summaries, dashboards and exports from the TaxMate API.
///
/// Run `taxmate init` once to create the home directory, then `taxmate login`.
#[derive(Debug, Parser, Clone)]
pub struct Args {
    #[clap(flatten)]
    common: Common,

    #[command(subcommand)]
    command: Command,
}

impl Args {
    pub fn new(common: Common, command: Command) -> Self {
        Self { common, command }
    }

    pub fn common(&self) -> &Common {
        &self.common
    }

    pub fn command(&self) -> &Command {
        &self.command
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Create the data directory and the configuration file.
    ///
    /// By default the directory is $HOME/taxmate; pass --taxmate-home or set TAXMATE_HOME to put
    /// it somewhere else.
    Init(InitArgs),
    /// Create an account on the TaxMate API.
    Register(RegisterArgs),
    /// Log in to the TaxMate API and save the access token.
    Login(LoginArgs),
    /// Forget the saved access token.
    Logout,
    /// Show the date range a reporting period covers today.
    Period(PeriodArgs),
    /// Preview the GST on an amount without recording anything.
    Tax(TaxArgs),
    /// Record a single income or expense entry.
    Add(AddArgs),
    /// List recorded entries for a period.
    Records(PeriodArgs),
    /// Show income, expense and estimated tax totals for a period.
    Summary(PeriodArgs),
    /// Show totals, category breakdowns and the monthly trend.
    Dashboard(RangeArgs),
    /// Check a CSV file and insert its valid rows.
    Import(ImportArgs),
    /// Download a CSV report for a period.
    Export(ExportArgs),
    /// Show savings, tax burden, spending and a health score over all records.
    Insights,
    /// Show GST paid and the estimated income tax over all records.
    TaxSummary,
}

/// Arguments common to all subcommands.
#[derive(Debug, Parser, Clone)]
pub struct Common {
    /// The logging verbosity. One of, from least to most verbose:
    /// off, error, warn, info, debug, trace
    ///
    /// This can be overridden by RUST_LOG.
    #[arg(long, default_value_t = LevelFilter::INFO)]
    log_level: LevelFilter,

    /// The directory where taxmate data and configuration is held. Defaults to ~/taxmate
    #[arg(long, env = "TAXMATE_HOME", default_value_t = default_taxmate_home())]
    taxmate_home: DisplayPath,
}

impl Common {
    pub fn new(log_level: LevelFilter, taxmate_home: PathBuf) -> Self {
        Self {
            log_level,
            taxmate_home: taxmate_home.into(),
        }
    }

    pub fn log_level(&self) -> LevelFilter {
        self.log_level
    }

    pub fn taxmate_home(&self) -> &DisplayPath {
        &self.taxmate_home
    }
}

/// (Not shown): Args for the `taxmate init` command.
#[derive(Debug, Parser, Clone)]
pub struct InitArgs {
    /// The base URL of the TaxMate API.
    #[arg(long, default_value = crate::config::DEFAULT_API_URL)]
    api_url: String,
}

impl InitArgs {
    pub fn new(api_url: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
        }
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }
}

/// (Not shown): Args for the `taxmate login` command.
#[derive(Debug, Parser, Clone)]
pub struct LoginArgs {
    /// The email address you registered with.
    #[arg(long, env = "TAXMATE_USERNAME")]
    username: String,

    /// Your password. Prefer the environment variable to keep it out of shell history.
    #[arg(long, env = "TAXMATE_PASSWORD", hide_env_values = true)]
    password: String,
}

impl LoginArgs {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn password(&self) -> &str {
        &self.password
    }
}

/// (Not shown): Args for the `taxmate register` command.
#[derive(Debug, Parser, Clone)]
pub struct RegisterArgs {
    /// The email address to register.
    #[arg(long, env = "TAXMATE_USERNAME")]
    email: String,

    /// At least 6 characters. Prefer the environment variable to keep it out of shell history.
    #[arg(long, env = "TAXMATE_PASSWORD", hide_env_values = true)]
    password: String,
}

impl RegisterArgs {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn password(&self) -> &str {
        &self.password
    }
}

/// Selects a reporting period.
#[derive(Debug, Parser, Clone, Default)]
pub struct PeriodArgs {
    /// One of: month, prev_month, fy, ytd, custom
    #[arg(long, default_value_t = Period::CurrentMonth)]
    period: Period,

    /// The first day of a custom period, YYYY-MM-DD.
    #[arg(long)]
    start: Option<String>,

    /// The last day of a custom period, YYYY-MM-DD.
    #[arg(long)]
    end: Option<String>,
}

impl PeriodArgs {
    pub fn new(period: Period, start: Option<String>, end: Option<String>) -> Self {
        Self { period, start, end }
    }

    pub fn period(&self) -> Period {
        self.period
    }

    /// The custom dates as typed. Missing values are empty.
    pub fn custom(&self) -> CustomRange {
        CustomRange::new(
            self.start.clone().unwrap_or_default(),
            self.end.clone().unwrap_or_default(),
        )
    }
}

/// An optional explicit date range.
#[derive(Debug, Parser, Clone, Default)]
pub struct RangeArgs {
    /// The first day to include, YYYY-MM-DD. Requires --end.
    #[arg(long, requires = "end")]
    start: Option<String>,

    /// The last day to include, YYYY-MM-DD. Requires --start.
    #[arg(long, requires = "start")]
    end: Option<String>,
}

impl RangeArgs {
    pub fn new(start: Option<String>, end: Option<String>) -> Self {
        Self { start, end }
    }

    /// `None` when no range was given.
    pub fn custom(&self) -> Option<CustomRange> {
        match (&self.start, &self.end) {
            (None, None) => None,
            (start, end) => Some(CustomRange::new(
                start.clone().unwrap_or_default(),
                end.clone().unwrap_or_default(),
            )),
        }
    }
}

/// Selects a tax slab.
#[derive(Debug, Parser, Clone, Default)]
pub struct SlabArgs {
    /// One of: GST_5, GST_12, GST_18, GST_28, NONE, CUSTOM
    #[arg(long, default_value_t = SlabOption::Gst18)]
    slab: SlabOption,

    /// The percentage for a CUSTOM slab. Anything that is not a number counts as 0.
    #[arg(long, default_value = "")]
    rate: String,
}

impl SlabArgs {
    pub fn new(slab: SlabOption, rate: impl Into<String>) -> Self {
        Self {
            slab,
            rate: rate.into(),
        }
    }

    pub fn tax_slab(&self) -> TaxSlab {
        TaxSlab::from_selection(self.slab, &self.rate)
    }
}

/// (Not shown): Args for the `taxmate tax` command.
#[derive(Debug, Parser, Clone)]
pub struct TaxArgs {
    /// The taxable amount, e.g. 2500 or ₹2,500
    #[arg(long, allow_hyphen_values = true)]
    amount: Amount,

    #[clap(flatten)]
    slab: SlabArgs,
}

impl TaxArgs {
    pub fn new(amount: Amount, slab: SlabArgs) -> Self {
        Self { amount, slab }
    }

    pub fn amount(&self) -> Amount {
        self.amount
    }

    pub fn tax_slab(&self) -> TaxSlab {
        self.slab.tax_slab()
    }
}

/// (Not shown): Args for the `taxmate add` command.
#[derive(Debug, Parser, Clone)]
pub struct AddArgs {
    /// The date of the entry, YYYY-MM-DD. Defaults to today.
    #[arg(long)]
    date: Option<NaiveDate>,

    /// What the entry is for.
    #[arg(long)]
    description: String,

    /// A free-form category.
    #[arg(long, default_value = crate::model::record::DEFAULT_CATEGORY)]
    category: String,

    /// income or expense
    #[arg(long = "type", default_value_t = TransactionType::Income)]
    transaction_type: TransactionType,

    /// The taxable amount. Must be greater than zero.
    #[arg(long, allow_hyphen_values = true)]
    amount: Amount,

    #[clap(flatten)]
    slab: SlabArgs,
}

impl AddArgs {
    pub fn new(
        date: Option<NaiveDate>,
        description: impl Into<String>,
        category: impl Into<String>,
        transaction_type: TransactionType,
        amount: Amount,
        slab: SlabArgs,
    ) -> Self {
        Self {
            date,
            description: description.into(),
            category: category.into(),
            transaction_type,
            amount,
            slab,
        }
    }

    pub fn date(&self) -> Option<NaiveDate> {
        self.date
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn transaction_type(&self) -> TransactionType {
        self.transaction_type
    }

    pub fn amount(&self) -> Amount {
        self.amount
    }

    pub fn tax_slab(&self) -> TaxSlab {
        self.slab.tax_slab()
    }
}

/// (Not shown): Args for the `taxmate import` command.
#[derive(Debug, Parser, Clone)]
pub struct ImportArgs {
    /// The CSV file to import. Expected columns: date, description, category, transaction_type,
    /// taxable_amount, and optionally tax_type and tax_rate.
    #[arg(long, short = 'f')]
    file: PathBuf,

    /// Classify the rows and report on them without inserting anything.
    #[arg(long)]
    dry_run: bool,
}

impl ImportArgs {
    pub fn new(file: impl Into<PathBuf>, dry_run: bool) -> Self {
        Self {
            file: file.into(),
            dry_run,
        }
    }

    pub fn file(&self) -> &Path {
        &self.file
    }

    pub fn dry_run(&self) -> bool {
        self.dry_run
    }
}

/// (Not shown): Args for the `taxmate export` command.
#[derive(Debug, Parser, Clone)]
pub struct ExportArgs {
    #[clap(flatten)]
    period: PeriodArgs,

    /// Where to write the CSV. Defaults to financial_report_<start>_<end>.csv in the current
    /// directory.
    #[arg(long, short = 'o')]
    output: Option<PathBuf>,
}

impl ExportArgs {
    pub fn new(period: PeriodArgs, output: Option<PathBuf>) -> Self {
        Self { period, output }
    }

    pub fn period(&self) -> &PeriodArgs {
        &self.period
    }

    pub fn output(&self) -> Option<&Path> {
        self.output.as_deref()
    }
}

fn default_taxmate_home() -> DisplayPath {
    DisplayPath(match dirs::home_dir() {
        Some(home) => home.join("taxmate"),
        None => {
            error!(
                "There was an error when trying to get your home directory. You can get around \
                this by providing --taxmate-home or TAXMATE_HOME instead of relying on the default \
                taxmate home directory. If you continue using the program right now, you may have \
                problems!",
            );
            PathBuf::from("taxmate")
        }
    })
}

#[derive(Debug, Default, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct DisplayPath(PathBuf);

impl From<PathBuf> for DisplayPath {
    fn from(value: PathBuf) -> Self {
        DisplayPath(value)
    }
}

impl Deref for DisplayPath {
    type Target = Path;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<Path> for DisplayPath {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

impl Display for DisplayPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_string_lossy())
    }
}

impl FromStr for DisplayPath {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(PathBuf::from(s)))
    }
}

impl DisplayPath {
    pub fn new(path: PathBuf) -> Self {
        Self(path)
    }

    pub fn path(&self) -> &Path {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn parse(args: &[&str]) -> Args {
        let mut argv = vec!["taxmate", "--taxmate-home", "/tmp/taxmate-test"];
        argv.extend_from_slice(args);
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_cli_is_well_formed() {
        <Args as CommandFactory>::command().debug_assert();
    }

    #[test]
    fn test_summary_custom() {
        let args = parse(&[
            "summary",
            "--period",
            "custom",
            "--start",
            "2024-01-01",
            "--end",
            "2024-01-31",
        ]);
        match args.command() {
            Command::Summary(p) => {
                assert_eq!(p.period(), Period::Custom);
                assert!(p.custom().resolve().is_some());
            }
            other => panic!("unexpected command {other:?}"),
        }
        assert_eq!(args.common().taxmate_home().path(), Path::new("/tmp/taxmate-test"));
    }

    #[test]
    fn test_period_defaults_to_month() {
        match parse(&["records"]).command() {
            Command::Records(p) => assert_eq!(p.period(), Period::CurrentMonth),
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_tax_args() {
        match parse(&["tax", "--amount", "₹2,500", "--slab", "GST_28"]).command() {
            Command::Tax(t) => {
                assert_eq!(t.amount(), Amount::from(2500));
                assert_eq!(t.tax_slab(), TaxSlab::Gst28);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_custom_rate_garbage_is_zero() {
        match parse(&["tax", "--amount", "100", "--slab", "CUSTOM", "--rate", "abc"]).command() {
            Command::Tax(t) => assert_eq!(t.tax_slab().rate_percent(), rust_decimal::Decimal::ZERO),
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_add_args() {
        let args = parse(&[
            "add",
            "--date",
            "2024-05-01",
            "--description",
            "Consulting",
            "--type",
            "expense",
            "--amount",
            "1000",
        ]);
        match args.command() {
            Command::Add(a) => {
                assert_eq!(a.date(), NaiveDate::from_ymd_opt(2024, 5, 1));
                assert_eq!(a.transaction_type(), TransactionType::Expense);
                assert_eq!(a.category(), "Misc");
                assert_eq!(a.tax_slab(), TaxSlab::Gst18);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_dashboard_range_requires_both() {
        let argv = [
            "taxmate",
            "--taxmate-home",
            "/tmp/x",
            "dashboard",
            "--start",
            "2024-01-01",
        ];
        assert!(Args::try_parse_from(argv).is_err());
        match parse(&["dashboard"]).command() {
            Command::Dashboard(r) => assert!(r.custom().is_none()),
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_unknown_period_parses_as_other() {
        match parse(&["summary", "--period", "quarter"]).command() {
            Command::Summary(p) => assert_eq!(p.period(), Period::Other),
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_register_and_report_commands() {
        match parse(&["register", "--email", "me@example.com", "--password", "secret1"]).command() {
            Command::Register(r) => {
                assert_eq!(r.email(), "me@example.com");
                assert_eq!(r.password(), "secret1");
            }
            other => panic!("unexpected command {other:?}"),
        }
        assert!(matches!(parse(&["insights"]).command(), Command::Insights));
        assert!(matches!(parse(&["tax-summary"]).command(), Command::TaxSummary));
    }
}
