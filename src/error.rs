//! Error types for symlinkerr

use std::path::PathBuf;

/// Result type for library operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while indexing, checking or replacing files
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Invalid exclusion pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("Requested to add a suffix, but the suffix to add is empty")]
    EmptySuffix,

    #[error("Suffix '{suffix}' collides with the temporary suffix used while staging symlinks")]
    SuffixCollision { suffix: String },

    #[error("Invalid configuration at {path}: {message}")]
    Config { path: PathBuf, message: String },

    #[error("Failed to read confirmation: {0}")]
    Prompt(#[source] dialoguer::Error),
}

impl Error {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether this error must abort the whole pass instead of skipping one file
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::Database(_)
                | Error::InvalidPattern { .. }
                | Error::EmptySuffix
                | Error::SuffixCollision { .. }
                | Error::Config { .. }
                | Error::Prompt(_)
        )
    }
}
