//! This module defines the command-line interface for the application using `clap`.
//!
//! It provides a `Cli` struct that represents the parsed command-line arguments,
//! and a `Commands` enum that represents the available subcommands and their
//! options. Global flags override values from `config.yaml`; the two API keys
//! can also come from the environment.
//!
//! # Examples
//!
//! ```no_run
//! use clap::Parser;
//! use discuss_nutshell::commands::{Cli, Commands};
//!
//! let cli = Cli::parse();
//! if let Commands::Load { topic_id, .. } = cli.command {
//!     println!("loading topic {topic_id}");
//! }
//! ```

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::NutshellConfig;

/// Represents the parsed command-line arguments.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None, propagate_version = true, color = clap::ColorChoice::Always)]
pub struct Cli {
    /// Configuration file (defaults to `config.yaml` in the user config directory).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Directory for downloads, exports and the interaction log.
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Key for the answer-generation service.
    #[arg(long, global = true, env = "GEMINI_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Bearer token for the Discourse forum.
    #[arg(long, global = true, env = "DISCOURSE_API_KEY", hide_env_values = true)]
    pub forum_api_key: Option<String>,

    /// Debug logging, plus a table preview when loading.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// The parsed subcommand and its options.
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Apply global flags on top of a loaded configuration.
    pub fn apply_overrides(&self, config: &mut NutshellConfig) {
        if let Some(dir) = &self.data_dir {
            config.data_dir = dir.clone();
        }
        if let Some(key) = &self.api_key {
            config.api_key = Some(key.clone());
        }
        if let Some(key) = &self.forum_api_key {
            config.forum_api_key = Some(key.clone());
        }
    }
}

/// Represents the available subcommands and their options.
#[derive(Subcommand, Debug, PartialEq)]
#[command(about, long_about = None, color = clap::ColorChoice::Always)]
pub enum Commands {
    /// Write a default `config.yaml` to the user config directory.
    Init,

    /// Download a topic and optionally export its posts.
    #[clap(name = "load", alias = "l")]
    Load {
        topic_id: u64,

        /// Output directory (defaults to the data directory).
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Run the pipeline and write per-post, JSON and combined text files.
        #[arg(short, long)]
        process: bool,

        /// Append to `all_posts.txt` instead of replacing it.
        #[arg(long)]
        append: bool,
    },

    /// Export a topic file saved by `load`.
    Process {
        file: PathBuf,

        #[arg(long)]
        topic_id: u64,

        #[arg(short, long)]
        output: Option<PathBuf>,

        #[arg(long)]
        append: bool,
    },

    /// Ask a question about a text file.
    #[clap(name = "query", alias = "q")]
    Query {
        file: PathBuf,
        question: String,

        /// Model to use instead of the configured one.
        #[arg(short, long)]
        model: Option<String>,
    },

    /// Show logged interactions, newest first.
    History {
        #[arg(short = 'n', long, default_value_t = 10, value_parser = clap::value_parser!(u32).range(1..))]
        limit: u32,
    },

    /// Start the browser UI.
    Serve {
        /// Listen address (defaults to `bind` from the configuration).
        #[arg(short, long)]
        bind: Option<String>,
    },
}
