//! Error types for bank-merge

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur reading or writing a question bank
#[derive(Error, Debug)]
pub enum BankError {
    /// Filesystem failure
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// File exists but is not valid JSON
    #[error("Invalid bank JSON in {path}: {source}")]
    InvalidJson {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A record could not be converted to a bank entry
    #[error("Invalid bank entry: {0}")]
    Entry(#[from] serde_json::Error),
}

impl BankError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        BankError::Io {
            path: path.into(),
            source,
        }
    }
}
