//! Error handling for the crate.
//!
//! Internally everything is an `anyhow::Error`. When an error leaves a command it is tagged with
//! an `ErrorType` using `IntoResult::pub_result` so that the user sees what kind of thing failed.

use serde::{Deserialize, Serialize};
use std::fmt::{Debug, Display, Formatter};

pub type Error = anyhow::Error;
pub type Result<T> = std::result::Result<T, Error>;

/// The broad category of a failure that is reported to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorType {
    /// The home directory or its config file is missing or invalid.
    Config,
    /// The stored credential is missing, invalid or could not be saved.
    Auth,
    /// A call to the TaxMate API failed.
    Request,
    /// A CSV upload could not be read or was rejected as a whole.
    Import,
    /// User-supplied values did not pass validation.
    Input,
}

serde_plain::derive_display_from_serialize!(ErrorType);
serde_plain::derive_fromstr_from_deserialize!(ErrorType);

/// An error that has been categorized for presentation.
pub struct PublicError {
    error_type: ErrorType,
    source: Error,
}

impl PublicError {
    pub fn new(error_type: ErrorType, source: Error) -> Self {
        Self { error_type, source }
    }

    pub fn error_type(&self) -> ErrorType {
        self.error_type
    }
}

impl Debug for PublicError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} error: {:?}", self.error_type, self.source)
    }
}

impl Display for PublicError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} error: {:#}", self.error_type, self.source)
    }
}

impl std::error::Error for PublicError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&*self.source)
    }
}

/// Tags the error side of a `Result` with an `ErrorType`.
pub trait IntoResult<T> {
    fn pub_result(self, error_type: ErrorType) -> Result<T>;
}

impl<T> IntoResult<T> for Result<T> {
    fn pub_result(self, error_type: ErrorType) -> Result<T> {
        self.map_err(|e| {
            // Already categorized errors keep their original type.
            if e.downcast_ref::<PublicError>().is_some() {
                e
            } else {
                PublicError::new(error_type, e).into()
            }
        })
    }
}

/// Returns the `ErrorType` of `e` if it was produced by `pub_result`.
pub fn error_type(e: &Error) -> Option<ErrorType> {
    e.downcast_ref::<PublicError>().map(|p| p.error_type())
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[test]
    fn test_pub_result_tags_error() {
        let r: Result<()> = Err(anyhow!("boom"));
        let e = r.pub_result(ErrorType::Request).unwrap_err();
        assert_eq!(error_type(&e), Some(ErrorType::Request));
        assert_eq!(e.to_string(), "request error: boom");
    }

    #[test]
    fn test_pub_result_keeps_first_type() {
        let r: Result<()> = Err(anyhow!("bad date"));
        let e = r
            .pub_result(ErrorType::Input)
            .pub_result(ErrorType::Request)
            .unwrap_err();
        assert_eq!(error_type(&e), Some(ErrorType::Input));
    }

    #[test]
    fn test_untagged_error_has_no_type() {
        let e = anyhow!("plain");
        assert!(error_type(&e).is_none());
    }
}
