//! Topic loading: download, process and export in one go.
//!
//! Everything that can fail without touching the disk (fetch, JSON parse,
//! pipeline, projection) runs before the first file is written, so a bad
//! topic leaves the output directory as it was.

use std::{
    fs,
    path::{Path, PathBuf},
};

use tracing::info;

use crate::{
    config::NutshellConfig,
    error::{NutshellError, Result},
    export::{CombinedTextMode, ExportSummary, Exporter},
    fetch::{TopicFetcher, parse_topic},
    pipeline::{ProcessedTopic, process_topic, read_topic_file},
};

/// What `load_topic` should do.
#[derive(Debug, Clone)]
pub struct LoadOptions {
    pub topic_id: u64,
    pub output_dir: PathBuf,
    /// Run the pipeline and write the derived files.
    pub process: bool,
    pub text_mode: CombinedTextMode,
}

/// Result of a load.
#[derive(Debug)]
pub struct LoadOutcome {
    /// Raw topic JSON as returned by the forum.
    pub raw_file: PathBuf,
    pub processed: Option<ProcessedTopic>,
    pub exports: Option<ExportSummary>,
}

/// Download a topic into `<output>/topic_<id>.json` and optionally export it.
pub async fn load_topic(config: &NutshellConfig, options: &LoadOptions) -> Result<LoadOutcome> {
    let fetcher = TopicFetcher::new(config)?;
    let body = fetcher.fetch_raw(options.topic_id).await?;
    let document = parse_topic(&body)?;

    let processed = if options.process {
        let processed = process_topic(options.topic_id, &document)?;
        // Surface projection errors before anything is written.
        processed.posts()?;
        Some(processed)
    } else {
        None
    };

    let raw_file = write_raw_topic(&options.output_dir, options.topic_id, &body)?;
    info!(topic_id = options.topic_id, file = %raw_file.display(), "Saved topic");

    let exports = match &processed {
        Some(topic) => Some(
            Exporter::new(&options.output_dir)
                .with_text_mode(options.text_mode)
                .export_all(topic)?,
        ),
        None => None,
    };

    Ok(LoadOutcome {
        raw_file,
        processed,
        exports,
    })
}

/// Run the pipeline over a topic file saved by an earlier `load`.
pub fn process_saved_topic(
    path: &Path,
    topic_id: u64,
    output_dir: &Path,
    text_mode: CombinedTextMode,
) -> Result<(ProcessedTopic, ExportSummary)> {
    let document = read_topic_file(path)?;
    let processed = process_topic(topic_id, &document)?;
    let summary = Exporter::new(output_dir)
        .with_text_mode(text_mode)
        .export_all(&processed)?;
    Ok((processed, summary))
}

fn write_raw_topic(output_dir: &Path, topic_id: u64, body: &str) -> Result<PathBuf> {
    fs::create_dir_all(output_dir).map_err(|e| NutshellError::file_system(output_dir, e))?;
    let path = output_dir.join(format!("topic_{topic_id}.json"));
    fs::write(&path, body).map_err(|e| NutshellError::file_system(&path, e))?;
    Ok(path)
}
