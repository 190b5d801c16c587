use chrono::Local;
use clap::Parser;
use std::process::ExitCode;
use taxmate::api::{self, AuthContext};
use taxmate::args::{Args, Command};
use taxmate::{commands, Config, Mode, Result};
use tracing::{debug, error, trace};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    let log_level = args.common().log_level();
    init_logger(log_level);
    debug!("Log level set to {}", log_level.to_string().to_lowercase());

    match main_inner(args).await {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Exiting with error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

pub async fn main_inner(args: Args) -> Result<()> {
    trace!("{args:?}");
    let home = args.common().taxmate_home().path();
    let today = Local::now().date_naive();

    // This allows for running the program without a server. When TAXMATE_IN_TEST_MODE is set and
    // non-zero in length, then the mode will be Mode::Test, otherwise it will be Mode::Http.
    let mode = Mode::from_env();

    // These commands do not need the home directory.
    match args.command() {
        Command::Init(init_args) => {
            commands::init(home, init_args.api_url()).await?.print();
            return Ok(());
        }
        Command::Period(period_args) => {
            commands::period(period_args, today).print();
            return Ok(());
        }
        Command::Tax(tax_args) => {
            commands::tax(tax_args.amount(), &tax_args.tax_slab()).print();
            return Ok(());
        }
        _ => {}
    }

    let config = Config::load(home).await?;
    if let Command::Logout = args.command() {
        commands::logout(&config).await?.print();
        return Ok(());
    }

    let auth = match args.command() {
        Command::Login(_) | Command::Register(_) => AuthContext::anonymous(),
        _ => AuthContext::load(&config.token_path()).await?,
    };
    let api = api::connect(&config, mode, auth)?;
    let api = api.as_ref();

    // Route to appropriate command handler
    let _: () = match args.command() {
        Command::Login(login_args) => {
            commands::login(&config, api, login_args.username(), login_args.password())
                .await?
                .print()
        }
        Command::Register(register_args) => {
            commands::register(api, register_args.email(), register_args.password())
                .await?
                .print()
        }
        Command::Add(add_args) => commands::add(api, add_args, today).await?.print(),
        Command::Records(period_args) => commands::records(api, period_args).await?.print(),
        Command::Summary(period_args) => {
            commands::summary(api, period_args, today).await?.print()
        }
        Command::Dashboard(range_args) => commands::dashboard(api, range_args).await?.print(),
        Command::Import(import_args) => {
            commands::import(api, import_args.file(), import_args.dry_run())
                .await?
                .print()
        }
        Command::Export(export_args) => {
            let cwd = std::env::current_dir()?;
            commands::export(
                api,
                export_args.period(),
                export_args.output(),
                &cwd,
                today,
            )
            .await?
            .print()
        }
        Command::Insights => commands::insights(api).await?.print(),
        Command::TaxSummary => commands::tax_summary(api).await?.print(),
        Command::Init(_) | Command::Period(_) | Command::Tax(_) | Command::Logout => {}
    };
    Ok(())
}

/// Initializes the tracing subscriber.
pub fn init_logger(level: LevelFilter) {
    let filter = match std::env::var("RUST_LOG").ok() {
        Some(_) => {
            // RUST_LOG exists; use it.
            EnvFilter::from_default_env()
        }
        None => {
            // RUST_LOG does not exist; use default log level for this crate only.
            EnvFilter::new(format!(
                "{}={},{}={}",
                env!("CARGO_CRATE_NAME"),
                level,
                env!("CARGO_BIN_NAME"),
                level
            ))
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
