//! Error types.
//!
//! Two layers:
//!
//! - `PipelineError`: the typed failure taxonomy raised by stages, loaders and
//!   the finalizer. Every variant is fatal to the current run.
//! - `AppError`: what the binary reports. It carries the process exit code so
//!   `main` stays a one-liner.

use std::path::PathBuf;

use chrono::NaiveDate;
use thiserror::Error;

use crate::reference::MasterName;

/// Failures raised while loading, deriving, or finalizing a table.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("reference data `{0}` was not populated")]
    MissingReferenceData(MasterName),

    #[error("data load failed: {0}")]
    DataLoad(String),

    #[error("unregistered {table} categories: {}", .categories.join(", "))]
    UnregisteredCategory {
        table: &'static str,
        categories: Vec<String>,
    },

    #[error("aggregated data ends {aggregated}, but raw data only reaches {raw}; refusing to reprocess")]
    StaleData { aggregated: NaiveDate, raw: NaiveDate },

    #[error("invalid plan parameter `{name}`: {value:?}")]
    InvalidParameter { name: &'static str, value: String },

    #[error("{table} has {} missing day(s) in {start}..={end}, first {}", .missing.len(), first_date(.missing))]
    CalendarGap {
        table: &'static str,
        start: NaiveDate,
        end: NaiveDate,
        missing: Vec<NaiveDate>,
    },

    #[error("I/O error on '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error in '{}': {source}", .path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

impl PipelineError {
    pub fn data_load(message: impl Into<String>) -> Self {
        PipelineError::DataLoad(message.into())
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        PipelineError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn csv(path: impl Into<PathBuf>, source: csv::Error) -> Self {
        PipelineError::Csv {
            path: path.into(),
            source,
        }
    }

    /// Process exit code for this failure class.
    pub fn exit_code(&self) -> u8 {
        match self {
            PipelineError::DataLoad(_) | PipelineError::Io { .. } | PipelineError::Csv { .. } => 2,
            PipelineError::UnregisteredCategory { .. } => 3,
            PipelineError::StaleData { .. } => 4,
            PipelineError::InvalidParameter { .. } => 5,
            PipelineError::MissingReferenceData(_) => 6,
            PipelineError::CalendarGap { .. } => 7,
        }
    }
}

fn first_date(dates: &[NaiveDate]) -> String {
    dates.first().map(NaiveDate::to_string).unwrap_or_default()
}

/// A stage failure tagged with the stage that raised it.
#[derive(Debug, Error)]
#[error("stage `{stage}` failed: {source}")]
pub struct StageError {
    pub stage: &'static str,
    #[source]
    pub source: PipelineError,
}

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl From<PipelineError> for AppError {
    fn from(err: PipelineError) -> Self {
        AppError::new(err.exit_code(), err.to_string())
    }
}

impl From<StageError> for AppError {
    fn from(err: StageError) -> Self {
        AppError::new(err.source.exit_code(), err.to_string())
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_error_keeps_exit_code_of_source() {
        let err = StageError {
            stage: "collect_balance",
            source: PipelineError::StaleData {
                aggregated: NaiveDate::from_ymd_opt(2025, 3, 2).unwrap(),
                raw: NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
            },
        };
        let msg = err.to_string();
        assert!(msg.contains("collect_balance"), "{msg}");

        let app: AppError = err.into();
        assert_eq!(app.exit_code(), 4);
    }

    #[test]
    fn unregistered_lists_categories() {
        let err = PipelineError::UnregisteredCategory {
            table: "ledger",
            categories: vec!["bonus".into(), "gift".into()],
        };
        assert_eq!(err.to_string(), "unregistered ledger categories: bonus, gift");
        assert_eq!(err.exit_code(), 3);
    }
}
