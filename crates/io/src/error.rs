use std::path::PathBuf;

use thiserror::Error;
use zonetool_engine::ZoneError;

#[derive(Debug, Error)]
pub enum IoError {
    #[error("{}: {}", .path.display(), .source)]
    File {
        path: PathBuf,
        #[source]
        source: Box<IoError>,
    },

    #[error(transparent)]
    Os(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("missing column '{0}'")]
    MissingColumn(String),

    #[error("column '{0}' appears more than once in the header")]
    DuplicateColumn(String),

    #[error("line {line}, column '{column}': cannot parse number '{value}'")]
    Number {
        line: usize,
        column: String,
        value: String,
    },

    #[error("line {line}, column '{column}': '{value}' is not an integer zone ID")]
    ZoneId {
        line: usize,
        column: String,
        value: String,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Table(#[from] ZoneError),
}

impl IoError {
    /// Attach the file the error came from.
    pub fn in_file(self, path: impl Into<PathBuf>) -> Self {
        match self {
            already @ Self::File { .. } => already,
            other => Self::File {
                path: path.into(),
                source: Box::new(other),
            },
        }
    }
}

pub type Result<T> = std::result::Result<T, IoError>;
