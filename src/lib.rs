//! TaxMate: reporting periods, GST arithmetic, CSV upload checks and a client for the TaxMate API.

pub mod api;
pub mod args;
pub mod commands;
mod config;
mod error;
pub mod format;
pub mod model;
pub mod upload;
mod utils;


pub use api::Mode;
pub use config::{Config, DEFAULT_API_URL};
pub use error::{error_type, Error, ErrorType, IntoResult, PublicError, Result};
pub use model::Amount;
