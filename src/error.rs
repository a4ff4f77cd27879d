//! Error type shared by every stage of the tool.
//!
//! Nothing in the crate recovers from these internally: each variant aborts
//! the current operation and is surfaced to the CLI (printed to stderr, exit
//! status 1) or to the browser UI (rendered in place of an answer).

use std::{io, path::PathBuf};

use thiserror::Error;

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, NutshellError>;

#[derive(Error, Debug)]
pub enum NutshellError {
    /// The topic document does not have the expected shape.
    #[error("malformed topic document at `{path}`: {detail}")]
    MalformedDocument { path: String, detail: String },

    /// A `created_at` value could not be parsed as an ISO-8601 timestamp.
    #[error("invalid timestamp: {value:?}")]
    InvalidTimestamp { value: String },

    /// Reading or writing a file failed.
    #[error("file system error at {}: {source}", path.display())]
    FileSystem {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The forum or the answer-generation service failed.
    #[error("upstream error: {0}")]
    Upstream(String),

    /// A required credential or setting is missing.
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("database error: {0}")]
    Database(#[from] diesel::result::Error),

    #[error("database connection error: {0}")]
    DatabaseConnection(#[from] diesel::ConnectionError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Writing to the terminal or starting the runtime failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl NutshellError {
    pub fn malformed(path: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::MalformedDocument {
            path: path.into(),
            detail: detail.into(),
        }
    }

    pub fn invalid_timestamp(value: impl Into<String>) -> Self {
        Self::InvalidTimestamp {
            value: value.into(),
        }
    }

    /// Wrap an I/O error together with the path it happened on.
    pub fn file_system(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::FileSystem {
            path: path.into(),
            source,
        }
    }

    pub fn upstream(message: impl std::fmt::Display) -> Self {
        Self::Upstream(message.to_string())
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// `true` for failures caused by something outside this process
    /// (remote services or missing credentials).
    pub fn is_external(&self) -> bool {
        matches!(self, Self::Upstream(_) | Self::Configuration(_))
    }
}
