//! # discuss_nutshell (library root)
//!
//! Download a Discourse topic, flatten its posts into plain-text files, and
//! ask an LLM questions about those files while keeping a log of every
//! exchange.
//!
//! ## Pipeline
//! 1. [`fetch`] downloads `<forum>/t/<id>.json`.
//! 2. [`table`] turns `post_stream.posts` into a column table.
//! 3. [`pipeline`] drops noisy columns, normalizes `created_at` and strips
//!    HTML from `cooked` (helpers in [`normalize`]).
//! 4. [`export`] writes one text file per post, a combined JSON file and a
//!    combined text file.
//!
//! [`loader`] ties the steps together for the `load` and `process` commands.
//!
//! ## Questions
//! [`api`] sends a file and a question to an OpenAI-compatible endpoint and
//! records the exchange through [`interactions`] (SQLite via [`models`] and
//! [`schema`]). The CLI ([`commands`]) and the browser UI ([`ui`]) are the
//! two ways in.
//!
//! Configuration lives in [`config`]; every fallible call returns
//! [`error::Result`].

use std::path::PathBuf;

use directories::ProjectDirs;

pub mod api;
pub mod commands;
pub mod config;
pub mod error;
pub mod export;
pub mod fetch;
pub mod interactions;
pub mod loader;
pub mod models;
pub mod normalize;
pub mod pipeline;
pub mod schema;
pub mod table;
pub mod ui;

use crate::error::{NutshellError, Result};

/// Return the per-platform configuration directory.
///
/// This uses [`directories::ProjectDirs`] with the application triple
/// `("org", "discuss-nutshell", "nutshell")`, e.g. `~/.config/nutshell` on Linux.
///
/// The directory is **not** created by this function.
///
/// # Examples
/// ```rust
/// let cfg = discuss_nutshell::config_dir().expect("has a config dir");
/// println!("config at {}", cfg.display());
/// ```
pub fn config_dir() -> Result<PathBuf> {
    let proj_dirs = ProjectDirs::from("org", "discuss-nutshell", "nutshell")
        .ok_or_else(|| NutshellError::configuration("Unable to determine config directory"))?;
    Ok(proj_dirs.config_dir().to_path_buf())
}
