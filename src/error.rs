//! Error kinds for report generation
//!
//! Every failure is fatal for the run; `main` reports it and exits.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while loading inputs or producing a report
#[derive(Error, Debug)]
pub enum ReportError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to parse records file {path}: {reason}")]
    InputParse { path: PathBuf, reason: String },

    #[error("Malformed description in record #{index}: {reason}")]
    Description { index: usize, reason: String },

    #[error("Usage error: {0}")]
    Usage(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ReportError {
    pub(crate) fn input_parse(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::InputParse {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Process exit code for this error
    ///
    /// Usage errors share clap's exit code so that a bad command line looks the
    /// same whether clap or the report pipeline rejected it.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Usage(_) => 2,
            _ => 1,
        }
    }
}

/// Result type for report operations
pub type Result<T> = std::result::Result<T, ReportError>;
