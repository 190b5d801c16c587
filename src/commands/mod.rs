//! Command handlers for the taxmate CLI.
//!
//! This module contains implementations for all CLI subcommands. Handlers that need the server
//! take an `&dyn Api` so that they run the same against `HttpApi` and `TestApi`.

mod auth;
mod import;
mod init;
mod insights;
mod period;
mod records;
mod reports;
mod tax;

use crate::api::SummaryQuery;
use crate::model::{CustomRange, Period};
use serde::Serialize;
use std::fmt::Debug;
use tracing::{debug, info};

pub use auth::{login, logout, register};
pub use import::{import, ImportReport};
pub use init::init;
pub use insights::{insights, tax_summary};
pub use period::period;
pub use records::{add, records};
pub use reports::{dashboard, export, summary, SummaryReport};
pub use tax::tax;

/// The message shown when a custom period is selected but its dates do not form a valid range.
pub const CUSTOM_RANGE_NOT_READY: &str =
    "Enter a start and end date as YYYY-MM-DD, with the start on or before the end";

/// The output type for a command. This allows the command to return a consistent message and,
/// optionally, structured data.
#[derive(Debug, Clone, Serialize)]
pub struct Out<T>
where
    T: Serialize + Clone + Debug,
{
    /// A message that can be printed to the user regarding the outcome of the command execution.
    message: String,

    /// Any structured data that needs to be output from the call.
    structure: Option<T>,
}

impl<T, S> From<S> for Out<T>
where
    T: Debug + Clone + Serialize,
    S: Into<String>,
{
    fn from(value: S) -> Self {
        Out::new_message(value)
    }
}

impl<T> Out<T>
where
    T: Serialize + Clone + Debug,
{
    /// Create a new `Out` object that has `Some(structure)`.
    pub fn new<S>(message: S, structure: T) -> Self
    where
        S: Into<String>,
    {
        Self {
            message: message.into(),
            structure: Some(structure),
        }
    }

    /// Create a new `Out` object that has `None` for `structure`.
    pub fn new_message<S>(message: S) -> Self
    where
        S: Into<String>,
    {
        Self {
            message: message.into(),
            structure: None,
        }
    }

    /// Get the `message`.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Get the structured data stored in `structure`.
    pub fn structure(&self) -> Option<&T> {
        self.structure.as_ref()
    }

    /// Print the message to `info!` and the structured data (if it exists) as JSON to `debug!`.
    pub fn print(&self) {
        info!("{}", self.message);
        if let Some(structure) = self.structure() {
            if let Ok(json) = serde_json::to_string_pretty(structure) {
                debug!("Command output:\n\n{json}\n\n");
            }
        }
    }
}

/// Builds the query for a period selection. `None` means the custom dates are not ready yet and
/// no request should be sent.
fn summary_query(period: Period, custom: &CustomRange) -> Option<SummaryQuery> {
    let query = SummaryQuery::new(period, Some(custom));
    if query.is_none() {
        debug!("Custom range '{}' to '{}' does not resolve", custom.start(), custom.end());
    }
    query
}
