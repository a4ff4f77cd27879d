//! # Exporters
//!
//! Three independent sinks over a processed topic:
//!
//! | File | Content |
//! |------|---------|
//! | `post_<id>.txt` | one file per post: author, date, number, clean content |
//! | `<topic_id>_all_posts.json` | every post as a JSON array (2-space indent) |
//! | `all_posts.txt` | every post as five labelled lines, one block per post |
//!
//! Each writer surfaces the first I/O failure as
//! [`NutshellError::FileSystem`]. Writers do not roll each other back.
//!
//! `all_posts.txt` is truncated on every run unless the exporter is built
//! with [`CombinedTextMode::Append`].

use std::{
    fs::{self, File, OpenOptions},
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use crate::{
    error::{NutshellError, Result},
    pipeline::{CLEAN_COOKED, CREATED_AT, ProcessedTopic},
    table::PostTable,
};

/// File name of the combined text export.
pub const COMBINED_TEXT_FILE: &str = "all_posts.txt";

/// The fields written for every post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportedPost {
    pub id: i64,
    pub author: Option<String>,
    pub number: i64,
    pub created_at: String,
    pub clean_content: String,
}

impl ExportedPost {
    /// Project every row of a processed table.
    ///
    /// `id` and `post_number` must be integers; `name`, `created_at` and
    /// `clean_cooked` fall back to null/empty when absent.
    pub fn from_table(table: &PostTable) -> Result<Vec<Self>> {
        (0..table.len())
            .map(|row| {
                Ok(Self {
                    id: integer_cell(table, row, "id")?,
                    author: table
                        .cell(row, "name")
                        .and_then(Value::as_str)
                        .map(str::to_string),
                    number: integer_cell(table, row, "post_number")?,
                    created_at: text_cell(table, row, CREATED_AT),
                    clean_content: text_cell(table, row, CLEAN_COOKED),
                })
            })
            .collect()
    }

    fn author_text(&self) -> &str {
        self.author.as_deref().unwrap_or_default()
    }
}

fn integer_cell(table: &PostTable, row: usize, column: &str) -> Result<i64> {
    table
        .cell(row, column)
        .and_then(Value::as_i64)
        .ok_or_else(|| {
            NutshellError::malformed(
                format!("post_stream.posts[{row}].{column}"),
                "expected an integer",
            )
        })
}

fn text_cell(table: &PostTable, row: usize, column: &str) -> String {
    match table.cell(row, column) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

/// How `all_posts.txt` is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CombinedTextMode {
    /// Start from an empty file on every run.
    #[default]
    Truncate,
    /// Keep existing content and add this run's posts after it.
    Append,
}

/// Paths produced by [`Exporter::export_all`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSummary {
    pub post_files: Vec<PathBuf>,
    pub json_file: PathBuf,
    pub text_file: PathBuf,
}

/// Writes derived files into one output directory.
#[derive(Debug, Clone)]
pub struct Exporter {
    output_dir: PathBuf,
    text_mode: CombinedTextMode,
}

impl Exporter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            text_mode: CombinedTextMode::default(),
        }
    }

    pub fn with_text_mode(mut self, text_mode: CombinedTextMode) -> Self {
        self.text_mode = text_mode;
        self
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Run all three writers. The projection happens first, so a table that
    /// cannot be projected writes nothing.
    pub fn export_all(&self, topic: &ProcessedTopic) -> Result<ExportSummary> {
        let posts = topic.posts()?;

        let post_files = self.write_post_files(&posts)?;
        let json_file = self.write_posts_json(topic.topic_id, &posts)?;
        let text_file = self.write_posts_txt(&posts)?;

        info!(
            topic_id = topic.topic_id,
            posts = posts.len(),
            dir = %self.output_dir.display(),
            "Exported topic"
        );

        Ok(ExportSummary {
            post_files,
            json_file,
            text_file,
        })
    }

    /// Write `post_<id>.txt` for every post, replacing existing files.
    pub fn write_post_files(&self, posts: &[ExportedPost]) -> Result<Vec<PathBuf>> {
        self.ensure_output_dir()?;

        posts
            .iter()
            .map(|post| {
                let path = self.output_dir.join(format!("post_{}.txt", post.id));
                let file = File::create(&path).map_err(|e| NutshellError::file_system(&path, e))?;
                let mut writer = BufWriter::new(file);
                write!(
                    writer,
                    "Author: {}\nCreated at: {}\nNumber: {}\nClean content: {}\n",
                    post.author_text(),
                    post.created_at,
                    post.number,
                    post.clean_content
                )
                .and_then(|_| writer.flush())
                .map_err(|e| NutshellError::file_system(&path, e))?;
                Ok(path)
            })
            .collect()
    }

    /// Write `<topic_id>_all_posts.json`.
    pub fn write_posts_json(&self, topic_id: u64, posts: &[ExportedPost]) -> Result<PathBuf> {
        self.ensure_output_dir()?;

        let path = self.output_dir.join(format!("{topic_id}_all_posts.json"));
        let json = serde_json::to_string_pretty(posts)?;
        fs::write(&path, json).map_err(|e| NutshellError::file_system(&path, e))?;
        Ok(path)
    }

    /// Write the combined `all_posts.txt`, honoring the configured mode.
    pub fn write_posts_txt(&self, posts: &[ExportedPost]) -> Result<PathBuf> {
        self.ensure_output_dir()?;

        let path = self.output_dir.join(COMBINED_TEXT_FILE);
        let mut options = OpenOptions::new();
        match self.text_mode {
            CombinedTextMode::Truncate => options.write(true).create(true).truncate(true),
            CombinedTextMode::Append => options.append(true).create(true),
        };
        let file = options
            .open(&path)
            .map_err(|e| NutshellError::file_system(&path, e))?;

        let mut writer = BufWriter::new(file);
        for post in posts {
            write!(
                writer,
                "ID: {}\nAuthor: {}\nCreated at: {}\nNumber: {}\nClean content: {}\n",
                post.id,
                post.author_text(),
                post.created_at,
                post.number,
                post.clean_content
            )
            .map_err(|e| NutshellError::file_system(&path, e))?;
        }
        writer
            .flush()
            .map_err(|e| NutshellError::file_system(&path, e))?;
        Ok(path)
    }

    fn ensure_output_dir(&self) -> Result<()> {
        fs::create_dir_all(&self.output_dir)
            .map_err(|e| NutshellError::file_system(&self.output_dir, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::process_topic;
    use serde_json::json;
    use tempfile::tempdir;

    fn processed() -> ProcessedTopic {
        let doc = json!({"post_stream": {"posts": [
            {"id": 501, "name": "Ann", "post_number": 1, "created_at": "2025-11-22T18:11:23.522Z",
             "cooked": "<p>Hi <b>there</b></p>", "reads": 1},
            {"id": 502, "name": "Bob", "post_number": 2, "created_at": "2025-11-22T18:30:00.000Z",
             "cooked": null, "reads": 1},
            {"id": 503, "name": "Cid", "post_number": 3, "created_at": "2025-11-23T09:00:00.000Z",
             "cooked": "<p>Last</p>", "reads": 1}
        ]}});
        process_topic(104906, &doc).unwrap()
    }

    #[test]
    fn test_write_post_files_one_per_post() {
        let dir = tempdir().unwrap();
        let exporter = Exporter::new(dir.path());
        let posts = processed().posts().unwrap();

        let files = exporter.write_post_files(&posts).unwrap();
        assert_eq!(files.len(), 3);
        let written = fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(written, 3);

        let second = fs::read_to_string(dir.path().join("post_502.txt")).unwrap();
        assert_eq!(
            second,
            "Author: Bob\nCreated at: 2025-11-22 18:30\nNumber: 2\nClean content: \n"
        );
        let first = fs::read_to_string(dir.path().join("post_501.txt")).unwrap();
        assert!(first.ends_with("Clean content: Hi there\n"));
    }

    #[test]
    fn test_write_posts_json_round_trip() {
        let dir = tempdir().unwrap();
        let exporter = Exporter::new(dir.path());
        let posts = processed().posts().unwrap();

        let path = exporter.write_posts_json(104906, &posts).unwrap();
        assert_eq!(path, dir.path().join("104906_all_posts.json"));

        let raw = fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\n  {\n    \"id\": 501,"));

        let parsed: Vec<Value> = serde_json::from_str(&raw).unwrap();
        assert_eq!(parsed.len(), 3);
        for (value, post) in parsed.iter().zip(&posts) {
            let object = value.as_object().unwrap();
            let keys: Vec<&str> = object.keys().map(String::as_str).collect();
            assert_eq!(keys, ["id", "author", "number", "created_at", "clean_content"]);
            assert_eq!(object["id"], json!(post.id));
        }

        let back: Vec<ExportedPost> = serde_json::from_str(&raw).unwrap();
        assert_eq!(back, posts);
    }

    #[test]
    fn test_write_posts_txt_truncates_by_default() {
        let dir = tempdir().unwrap();
        let exporter = Exporter::new(dir.path());
        let posts = processed().posts().unwrap();

        exporter.write_posts_txt(&posts).unwrap();
        let path = exporter.write_posts_txt(&posts).unwrap();

        let text = fs::read_to_string(path).unwrap();
        assert_eq!(text.matches("ID: ").count(), 3);
        assert!(text.starts_with(
            "ID: 501\nAuthor: Ann\nCreated at: 2025-11-22 18:11\nNumber: 1\nClean content: Hi there\n"
        ));
    }

    #[test]
    fn test_write_posts_txt_append_accumulates() {
        let dir = tempdir().unwrap();
        let exporter = Exporter::new(dir.path()).with_text_mode(CombinedTextMode::Append);
        let posts = processed().posts().unwrap();

        exporter.write_posts_txt(&posts).unwrap();
        let path = exporter.write_posts_txt(&posts).unwrap();

        let text = fs::read_to_string(path).unwrap();
        assert_eq!(text.matches("ID: ").count(), 6);
    }

    #[test]
    fn test_export_all_creates_missing_output_dir() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("nested").join("data");
        let summary = Exporter::new(&out).export_all(&processed()).unwrap();

        assert_eq!(summary.post_files.len(), 3);
        assert!(summary.json_file.exists());
        assert!(summary.text_file.exists());
        assert_eq!(fs::read_dir(&out).unwrap().count(), 5);
    }

    #[test]
    fn test_export_all_empty_topic() {
        let dir = tempdir().unwrap();
        let topic = process_topic(42, &json!({"post_stream": {"posts": []}})).unwrap();
        let summary = Exporter::new(dir.path()).export_all(&topic).unwrap();

        assert!(summary.post_files.is_empty());
        let json = fs::read_to_string(&summary.json_file).unwrap();
        assert_eq!(serde_json::from_str::<Vec<Value>>(&json).unwrap().len(), 0);
        assert_eq!(fs::read_to_string(&summary.text_file).unwrap(), "");
    }

    #[test]
    fn test_export_all_writes_nothing_when_projection_fails() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("data");
        let doc = json!({"post_stream": {"posts": [
            {"id": 1, "post_number": 1, "created_at": "2025-01-01T00:00:00Z"},
            {"id": "two", "post_number": 2, "created_at": "2025-01-01T00:00:00Z"}
        ]}});
        let topic = process_topic(7, &doc).unwrap();

        let err = Exporter::new(&out).export_all(&topic).unwrap_err();
        assert!(matches!(err, NutshellError::MalformedDocument { ref path, .. } if path == "post_stream.posts[1].id"));
        assert!(!out.exists());
    }

    #[test]
    fn test_write_into_a_file_path_is_file_system_error() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "x").unwrap();

        let err = Exporter::new(&blocker)
            .write_posts_json(1, &processed().posts().unwrap())
            .unwrap_err();
        assert!(matches!(err, NutshellError::FileSystem { .. }));
    }

    #[test]
    fn test_null_author_renders_empty() {
        let dir = tempdir().unwrap();
        let post = ExportedPost {
            id: 9,
            author: None,
            number: 4,
            created_at: "2025-01-01 00:00".into(),
            clean_content: "text".into(),
        };
        Exporter::new(dir.path()).write_post_files(&[post]).unwrap();
        let text = fs::read_to_string(dir.path().join("post_9.txt")).unwrap();
        assert!(text.starts_with("Author: \n"));
    }
}
