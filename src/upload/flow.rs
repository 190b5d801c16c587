//! The states a caller moves through while importing a CSV file.
//!
//! ```text
//! Idle -> Preview -> Importing -> Complete
//!          |  ^          |
//!          v  +----------+ (insert failed, retry from Preview)
//!         Idle (cancel)
//! ```

use crate::api::ImportResult;
use crate::model::FinancialRecord;
use crate::upload::Classification;
use crate::Result;
use anyhow::bail;
use std::mem;
use tracing::debug;

/// An upload in progress.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum UploadFlow {
    #[default]
    Idle,
    /// Rows have been classified and are waiting for confirmation. `last_error` holds the message
    /// of a failed insert when the flow returned here from `Importing`.
    Preview {
        classification: Classification,
        last_error: Option<String>,
    },
    /// The valid rows have been handed to the remote insert.
    Importing { classification: Classification },
    /// The remote insert answered.
    Complete {
        classification: Classification,
        result: ImportResult,
    },
}

impl UploadFlow {
    pub fn name(&self) -> &'static str {
        match self {
            UploadFlow::Idle => "idle",
            UploadFlow::Preview { .. } => "preview",
            UploadFlow::Importing { .. } => "importing",
            UploadFlow::Complete { .. } => "complete",
        }
    }

    /// The classified rows, if any have been loaded.
    pub fn classification(&self) -> Option<&Classification> {
        match self {
            UploadFlow::Idle => None,
            UploadFlow::Preview { classification, .. }
            | UploadFlow::Importing { classification }
            | UploadFlow::Complete { classification, .. } => Some(classification),
        }
    }

    /// `Idle -> Preview`.
    pub fn preview(&mut self, classification: Classification) -> Result<()> {
        self.transition("preview", |state| match state {
            UploadFlow::Idle => Ok(UploadFlow::Preview {
                classification,
                last_error: None,
            }),
            other => Err(other),
        })
    }

    /// `Preview -> Idle`, discarding the classified rows.
    pub fn cancel(&mut self) -> Result<()> {
        self.transition("cancel", |state| match state {
            UploadFlow::Preview { .. } => Ok(UploadFlow::Idle),
            other => Err(other),
        })
    }

    /// `Preview -> Importing`. Returns the records to send. Fails when there is nothing valid to
    /// import.
    pub fn start_import(&mut self) -> Result<Vec<FinancialRecord>> {
        if let UploadFlow::Preview { classification, .. } = self {
            if classification.valid_rows.is_empty() {
                bail!("There are no valid rows to import");
            }
        }
        self.transition("start", |state| match state {
            UploadFlow::Preview { classification, .. } => {
                Ok(UploadFlow::Importing { classification })
            }
            other => Err(other),
        })?;
        Ok(self
            .classification()
            .map(|c| c.valid_rows.clone())
            .unwrap_or_default())
    }

    /// `Importing -> Preview` after the remote insert failed.
    pub fn fail(&mut self, message: impl Into<String>) -> Result<()> {
        let message = message.into();
        self.transition("fail", |state| match state {
            UploadFlow::Importing { classification } => Ok(UploadFlow::Preview {
                classification,
                last_error: Some(message),
            }),
            other => Err(other),
        })
    }

    /// `Importing -> Complete`.
    pub fn complete(&mut self, result: ImportResult) -> Result<()> {
        self.transition("complete", |state| match state {
            UploadFlow::Importing { classification } => Ok(UploadFlow::Complete {
                classification,
                result,
            }),
            other => Err(other),
        })
    }

    /// Returns to `Idle` from any state.
    pub fn reset(&mut self) {
        debug!("Upload flow: {} -> idle", self.name());
        *self = UploadFlow::Idle;
    }

    /// Applies `f` to the current state. When `f` hands the state back unchanged the transition
    /// is illegal and the flow is left as it was.
    fn transition<F>(&mut self, action: &str, f: F) -> Result<()>
    where
        F: FnOnce(UploadFlow) -> std::result::Result<UploadFlow, UploadFlow>,
    {
        let from = self.name();
        match f(mem::take(self)) {
            Ok(next) => {
                debug!("Upload flow: {from} -> {}", next.name());
                *self = next;
                Ok(())
            }
            Err(unchanged) => {
                *self = unchanged;
                bail!("Cannot {action} an upload while {from}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ImportStatus;
    use crate::upload::{classify_rows, RawRow};

    fn classification(valid: usize) -> Classification {
        let rows = (1..=valid).map(|n| {
            RawRow::new(
                n,
                [
                    ("date", "2024-05-01"),
                    ("description", "Sale"),
                    ("transaction_type", "income"),
                    ("taxable_amount", "100"),
                ],
            )
        });
        classify_rows(rows)
    }

    fn result() -> ImportResult {
        ImportResult {
            imported_count: 2,
            failed_count: 0,
            status: ImportStatus::Completed,
            total_rows: Some(2),
            message: None,
        }
    }

    #[test]
    fn test_happy_path() {
        let mut flow = UploadFlow::default();
        assert_eq!(flow.name(), "idle");
        flow.preview(classification(2)).unwrap();
        assert_eq!(flow.name(), "preview");
        let rows = flow.start_import().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(flow.name(), "importing");
        flow.complete(result()).unwrap();
        assert_eq!(flow.name(), "complete");
        assert_eq!(flow.classification().unwrap().total_rows, 2);
    }

    #[test]
    fn test_cancel_from_preview() {
        let mut flow = UploadFlow::default();
        flow.preview(classification(1)).unwrap();
        flow.cancel().unwrap();
        assert_eq!(flow, UploadFlow::Idle);
        assert!(flow.classification().is_none());
    }

    #[test]
    fn test_failure_returns_to_preview_and_retry_is_allowed() {
        let mut flow = UploadFlow::default();
        flow.preview(classification(1)).unwrap();
        flow.start_import().unwrap();
        flow.fail("Request failed").unwrap();
        match &flow {
            UploadFlow::Preview { last_error, .. } => {
                assert_eq!(last_error.as_deref(), Some("Request failed"))
            }
            other => panic!("unexpected state {other:?}"),
        }
        flow.start_import().unwrap();
        flow.complete(result()).unwrap();
    }

    #[test]
    fn test_illegal_transitions_leave_state_alone() {
        let mut flow = UploadFlow::default();
        assert!(flow.cancel().is_err());
        assert!(flow.start_import().is_err());
        assert!(flow.complete(result()).is_err());
        assert!(flow.fail("x").is_err());
        assert_eq!(flow, UploadFlow::Idle);

        flow.preview(classification(1)).unwrap();
        assert!(flow.preview(classification(1)).is_err());
        assert!(flow.complete(result()).is_err());
        assert_eq!(flow.name(), "preview");

        flow.start_import().unwrap();
        assert!(flow.cancel().is_err());
        assert_eq!(flow.name(), "importing");
    }

    #[test]
    fn test_nothing_to_import() {
        let mut flow = UploadFlow::default();
        flow.preview(classification(0)).unwrap();
        let err = flow.start_import().unwrap_err();
        assert!(err.to_string().contains("no valid rows"));
        assert_eq!(flow.name(), "preview");
    }

    #[test]
    fn test_reset() {
        let mut flow = UploadFlow::default();
        flow.preview(classification(1)).unwrap();
        flow.start_import().unwrap();
        flow.complete(result()).unwrap();
        flow.reset();
        assert_eq!(flow, UploadFlow::Idle);
    }
}
