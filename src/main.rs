//! Main module for the `nutshell` CLI.
//!
//! Parses the command line, resolves the configuration, and dispatches to the
//! library. Output meant for the user goes to stdout; logs go to stderr.
//!
//! # Examples
//!
//! ```sh
//! nutshell init
//! nutshell load 104906 --process
//! nutshell query data/post_11.txt "Who is the author?"
//! nutshell serve --bind 127.0.0.1:7860
//! ```

use std::{
    io::{Write, stdout},
    path::PathBuf,
    process,
};

use clap::Parser;
use crossterm::{
    ExecutableCommand,
    style::{Color, Print, SetForegroundColor},
};
use once_cell::sync::OnceCell;
use tracing::{Level, debug, info};

use discuss_nutshell::{
    api,
    commands::{Cli, Commands},
    config::{self, NutshellConfig},
    config_dir,
    error::{NutshellError, Result},
    export::{CombinedTextMode, ExportSummary},
    interactions::InteractionLog,
    loader::{self, LoadOptions},
    ui,
};

static TRACING: OnceCell<()> = OnceCell::new();

/// Rows shown by `load --verbose`.
const PREVIEW_ROWS: usize = 5;

fn main() {
    let cli = Cli::parse();
    TRACING.get_or_init(|| {
        let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
        tracing_subscriber::fmt()
            .with_max_level(level)
            .with_writer(std::io::stderr)
            .init();
    });

    let result = tokio::runtime::Runtime::new()
        .map_err(NutshellError::from)
        .and_then(|runtime| runtime.block_on(run(cli)));

    if let Err(e) = result {
        eprintln!("error: {e}");
        process::exit(1);
    }
}

/// Execute the chosen command.
async fn run(cli: Cli) -> Result<()> {
    match &cli.command {
        Commands::Init => init(&cli)?,
        Commands::Load {
            topic_id,
            output,
            process,
            append,
        } => {
            let config = load_config(&cli)?;
            let options = LoadOptions {
                topic_id: *topic_id,
                output_dir: output_dir(output, &config),
                process: *process,
                text_mode: text_mode(*append),
            };
            let outcome = loader::load_topic(&config, &options).await?;
            println!("Saved {}", outcome.raw_file.display());

            if cli.verbose {
                if let Some(topic) = &outcome.processed {
                    print!("{}", topic.table.preview(PREVIEW_ROWS));
                }
            }
            if let Some(summary) = &outcome.exports {
                print_summary(summary);
            }
        }
        Commands::Process {
            file,
            topic_id,
            output,
            append,
        } => {
            let config = load_config(&cli)?;
            let (_, summary) = loader::process_saved_topic(
                file,
                *topic_id,
                &output_dir(output, &config),
                text_mode(*append),
            )?;
            print_summary(&summary);
        }
        Commands::Query {
            file,
            question,
            model,
        } => {
            let config = load_config(&cli)?;
            let answer = api::query_file(&config, file, question, model.as_deref()).await?;
            print_answer(&answer)?;
        }
        Commands::History { limit } => {
            let config = load_config(&cli)?;
            let log = InteractionLog::from_config(&config);
            for row in log.recent(i64::from(*limit))? {
                println!("[{}] {} :: {}", row.timestamp, row.post_name, row.query);
                println!("    {}", row.response.replace('\n', "\n    "));
            }
        }
        Commands::Serve { bind } => {
            let mut config = load_config(&cli)?;
            if let Some(bind) = bind {
                config.bind = bind.clone();
            }
            ui::run_server(&config).await?;
        }
    }

    Ok(())
}

/// `--config`, else `config.yaml` in the user config directory, else
/// defaults; global flags are applied on top.
fn load_config(cli: &Cli) -> Result<NutshellConfig> {
    let default_path = config_dir()?.join("config.yaml");
    let mut config = config::resolve_config(cli.config.as_deref(), Some(&default_path))?;
    cli.apply_overrides(&mut config);
    debug!("Config loaded: data_dir={}", config.data_dir.display());
    Ok(config)
}

fn output_dir(output: &Option<PathBuf>, config: &NutshellConfig) -> PathBuf {
    output.clone().unwrap_or_else(|| config.data_dir.clone())
}

fn text_mode(append: bool) -> CombinedTextMode {
    if append {
        CombinedTextMode::Append
    } else {
        CombinedTextMode::Truncate
    }
}

fn print_summary(summary: &ExportSummary) {
    println!("Wrote {} post files", summary.post_files.len());
    println!("Wrote {}", summary.json_file.display());
    println!("Wrote {}", summary.text_file.display());
}

fn print_answer(answer: &str) -> Result<()> {
    let mut stdout = stdout();
    stdout.execute(SetForegroundColor(Color::Blue))?;
    stdout.execute(Print(answer))?;
    stdout.execute(SetForegroundColor(Color::Reset))?;
    writeln!(stdout)?;
    Ok(())
}

/// Write a default `config.yaml`, leaving an existing one untouched.
fn init(cli: &Cli) -> Result<()> {
    let config_path: PathBuf = match &cli.config {
        Some(path) => path.clone(),
        None => config_dir()?.join("config.yaml"),
    };
    if config_path.exists() {
        info!("Config already exists: {}", config_path.display());
        return Ok(());
    }

    let mut config = NutshellConfig::default();
    if let Some(dir) = &cli.data_dir {
        config.data_dir = dir.clone();
    }
    info!("Creating config file: {}", config_path.display());
    config::save_config(&config, &config_path)?;
    println!("Wrote {}", config_path.display());
    Ok(())
}
