use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

// ---------------------------------------------------------------------------
// Workflow errors
// ---------------------------------------------------------------------------

/// Everything that can stop a run. All variants are terminal: the workflow
/// has no retry policy and no partial-success mode.
#[derive(Error, Debug)]
pub enum Error {
    /// An input spreadsheet (or converted table) does not exist.
    #[error("file not found: {}", path.display())]
    FileNotFound { path: PathBuf },

    /// The spreadsheet exists but cannot be read as an OOXML workbook.
    #[error("{} is not a readable spreadsheet: {reason}", path.display())]
    FileFormat { path: PathBuf, reason: String },

    /// The converted table lacks the columns or rows needed for a chart.
    #[error("dataset '{dataset}' has an unusable table: {reason}")]
    DataShape { dataset: String, reason: ShapeError },

    #[error("download of {url} failed: {reason}")]
    Http { url: String, reason: String },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Why a table could not be turned into a chartable series.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ShapeError {
    #[error("header row containing '{0}' not found")]
    HeaderNotFound(String),

    #[error("no row has the {needed} columns the layout needs (widest row has {widest})")]
    MissingColumns { needed: usize, widest: usize },

    #[error("no data points could be extracted")]
    NoDataPoints,

    #[error("value for period {0} is not finite")]
    NonFiniteValue(i32),
}

impl Error {
    pub(crate) fn format(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Error::FileFormat {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn shape(dataset: &str, reason: ShapeError) -> Self {
        Error::DataShape {
            dataset: dataset.to_string(),
            reason,
        }
    }
}
