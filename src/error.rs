use std::path::PathBuf;

use thiserror::Error;

/// Convenient alias for fallible results returned throughout the crate.
pub type Result<T> = std::result::Result<T, ToolError>;

/// Error type covering the different failure cases that can occur when the
/// tool discovers, loads, merges, or writes spreadsheets.
#[derive(Debug, Error)]
pub enum ToolError {
    /// Wrapper for IO failures that are not tied to a specific spreadsheet.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Raised when a JSON configuration file cannot be parsed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Raised when a spreadsheet is missing, unreadable, or not a valid workbook.
    #[error("failed to load '{path}': {reason}")]
    Load { path: PathBuf, reason: String },

    /// Raised when a table lacks one or more of the key columns.
    #[error("'{path}' is missing key column(s): {}", missing.join(", "))]
    SchemaMismatch { path: PathBuf, missing: Vec<String> },

    /// Raised when there is nothing to merge: no table was supplied, or no
    /// eligible spreadsheet could be loaded from the input folder.
    #[error(
        "no spreadsheets to merge{}",
        root.as_ref().map(|root| format!(" under {}", root.display())).unwrap_or_default()
    )]
    NoInput { root: Option<PathBuf> },

    /// Raised when the merged workbook cannot be persisted.
    #[error("failed to write '{path}': {reason}")]
    Write { path: PathBuf, reason: String },

    /// Raised when the key column set is empty or contains duplicates.
    #[error("invalid key columns: {0}")]
    InvalidKeys(String),

    /// Raised when the user provides a path that does not exist.
    #[error("input path not found: {0}")]
    MissingInput(PathBuf),

    /// Raised when the tracing subscriber fails to initialise.
    #[error("failed to initialise logging: {0}")]
    Logging(String),
}

impl ToolError {
    pub(crate) fn load(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        ToolError::Load {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn write(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        ToolError::Write {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}
