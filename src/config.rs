//! This module provides functionality for loading and handling the application's configuration.
//!
//! It defines the `NutshellConfig` struct, which holds the configuration parameters,
//! and a `load_config` function to load the configuration from a YAML file.
//!
//! Every field has a default, so a partial file (or no file at all) is valid.
//! Credentials are *not* validated here: the forum fetcher and the answer
//! generator check for the keys they need when they are constructed.
//!
//! # Examples
//!
//! Loading the configuration from a file:
//!
//! ```no_run
//! use discuss_nutshell::config::load_config;
//!
//! let config = load_config(std::path::Path::new("/path/to/config.yaml")).unwrap();
//! println!("{:?}", config.db_path());
//! ```

use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use diesel::{connection::SimpleConnection, prelude::*};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{NutshellError, Result};

/// Base URL of Gemini's OpenAI-compatible endpoint.
pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/openai";
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_FORUM_BASE_URL: &str = "https://discuss.python.org";
pub const DEFAULT_DB_FILE: &str = "posts_qa_logs.db";
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 64 * 1024 * 1024;

/// How long a connection waits on a locked database before giving up.
const BUSY_TIMEOUT_MS: u32 = 5_000;

/// Represents the application's configuration.
#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
#[serde(default)]
pub struct NutshellConfig {
    /// API key for the answer-generation service.
    pub api_key: Option<String>,

    /// Base URL of the OpenAI-compatible answer-generation API.
    pub api_base: String,

    /// Model used when a command does not name one.
    pub model: String,

    /// Root URL of the Discourse forum.
    pub forum_base_url: String,

    /// Bearer token sent with topic requests.
    pub forum_api_key: Option<String>,

    /// Directory holding downloaded topics, exports and the interaction log.
    pub data_dir: PathBuf,

    /// File name of the interaction log inside `data_dir`.
    pub db_file: String,

    /// Timeout applied to forum requests.
    pub request_timeout_secs: u64,

    /// Listen address of the browser UI.
    pub bind: String,

    /// Largest request body the browser UI accepts, in bytes.
    pub max_upload_bytes: usize,
}

impl Default for NutshellConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_base: DEFAULT_API_BASE.to_string(),
            model: DEFAULT_MODEL.to_string(),
            forum_base_url: DEFAULT_FORUM_BASE_URL.to_string(),
            forum_api_key: None,
            data_dir: PathBuf::from("data"),
            db_file: DEFAULT_DB_FILE.to_string(),
            request_timeout_secs: 30,
            bind: "127.0.0.1:7860".to_string(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

impl NutshellConfig {
    /// Location of the interaction log.
    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join(&self.db_file)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// The answer-service key, or a configuration error naming where to set it.
    pub fn require_api_key(&self) -> Result<&str> {
        non_empty(self.api_key.as_deref()).ok_or_else(|| {
            NutshellError::configuration(
                "no answer-service API key: set `api_key` in config.yaml, pass --api-key or export GEMINI_API_KEY",
            )
        })
    }

    /// The forum token, or a configuration error naming where to set it.
    pub fn require_forum_api_key(&self) -> Result<&str> {
        non_empty(self.forum_api_key.as_deref()).ok_or_else(|| {
            NutshellError::configuration(
                "no forum API key: set `forum_api_key` in config.yaml, pass --forum-api-key or export DISCOURSE_API_KEY",
            )
        })
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Loads the application's configuration from a YAML file.
///
/// # Errors
/// - [`NutshellError::FileSystem`] if the file cannot be read.
/// - [`NutshellError::Yaml`] if it is not a valid configuration document.
pub fn load_config(file: &Path) -> Result<NutshellConfig> {
    debug!("Loading config from: {}", file.display());
    let content = fs::read_to_string(file).map_err(|e| NutshellError::file_system(file, e))?;
    let config: NutshellConfig = serde_yaml::from_str(&content)?;
    Ok(config)
}

/// Load `explicit` if given; otherwise `default_path` when it exists, else
/// built-in defaults.
///
/// An explicitly requested file must exist; the default one is optional.
pub fn resolve_config(explicit: Option<&Path>, default_path: Option<&Path>) -> Result<NutshellConfig> {
    match (explicit, default_path) {
        (Some(path), _) => load_config(path),
        (None, Some(path)) if path.exists() => load_config(path),
        _ => {
            debug!("No config file found, using defaults");
            Ok(NutshellConfig::default())
        }
    }
}

/// Write `config` as YAML, creating parent directories.
pub fn save_config(config: &NutshellConfig, file: &Path) -> Result<()> {
    if let Some(parent) = file.parent() {
        fs::create_dir_all(parent).map_err(|e| NutshellError::file_system(parent, e))?;
    }
    let yaml = serde_yaml::to_string(config)?;
    fs::write(file, yaml).map_err(|e| NutshellError::file_system(file, e))
}

/// Open the SQLite database at `db_path`, creating it (and its directory) if needed.
///
/// The connection waits up to five seconds on a locked database instead of
/// failing immediately.
pub fn establish_connection(db_path: &Path) -> Result<SqliteConnection> {
    if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| NutshellError::file_system(parent, e))?;
    }
    let url = db_path.to_string_lossy();
    let mut connection = SqliteConnection::establish(&url)?;
    connection.batch_execute(&format!("PRAGMA busy_timeout = {BUSY_TIMEOUT_MS};"))?;
    Ok(connection)
}
