//! # Post-processing pipeline
//!
//! Turns a raw topic document into the cleaned [`PostTable`] that the
//! exporters read. The stages always run in the same order:
//!
//! ```text
//! topic JSON ──▶ build table ──▶ drop columns ──▶ format created_at ──▶ clean cooked
//! ```
//!
//! The first failing stage aborts the run. Nothing here touches the file
//! system except [`read_topic_file`], so a failed run never leaves partial
//! exports behind.

use std::{fs, path::Path};

use serde_json::Value;
use tracing::debug;

use crate::{
    error::{NutshellError, Result},
    export::ExportedPost,
    normalize::{clean_html, format_date},
    table::{DROPPED_COLUMNS, PostTable},
};

/// Column rewritten in place by the date stage.
pub const CREATED_AT: &str = "created_at";
/// HTML body column read by the text stage.
pub const COOKED: &str = "cooked";
/// Column appended by the text stage.
pub const CLEAN_COOKED: &str = "clean_cooked";

/// Output of a successful pipeline run.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessedTopic {
    pub topic_id: u64,
    pub table: PostTable,
}

impl ProcessedTopic {
    /// Project the table onto the exported fields.
    pub fn posts(&self) -> Result<Vec<ExportedPost>> {
        ExportedPost::from_table(&self.table)
    }
}

/// Parse a topic document previously saved to disk.
pub fn read_topic_file(path: &Path) -> Result<Value> {
    let content = fs::read_to_string(path).map_err(|e| NutshellError::file_system(path, e))?;
    serde_json::from_str(&content)
        .map_err(|e| NutshellError::malformed("$", format!("{} is not valid JSON: {e}", path.display())))
}

/// Run every stage over `document`.
pub fn process_topic(topic_id: u64, document: &Value) -> Result<ProcessedTopic> {
    let mut table = PostTable::from_document(document)?;
    debug!(topic_id, rows = table.len(), columns = table.columns().len(), "Built post table");

    drop_columns(&mut table);
    format_created_at(&mut table)?;
    clean_cooked_posts(&mut table);

    debug!(topic_id, columns = ?table.columns(), "Pipeline finished");
    Ok(ProcessedTopic { topic_id, table })
}

/// Remove the non-content columns.
pub fn drop_columns(table: &mut PostTable) {
    table.drop_columns(DROPPED_COLUMNS);
}

/// Rewrite `created_at` as `YYYY-MM-DD HH:MM`; fails on the first bad row.
pub fn format_created_at(table: &mut PostTable) -> Result<()> {
    table.try_map_column(CREATED_AT, |cell| match cell {
        Value::String(raw) => format_date(raw).map(Value::String),
        other => Err(NutshellError::invalid_timestamp(other.to_string())),
    })
}

/// Append `clean_cooked`, the plain-text form of `cooked`.
pub fn clean_cooked_posts(table: &mut PostTable) {
    table.derive_column(COOKED, CLEAN_COOKED, |cell| {
        let text = match cell {
            Value::Null => clean_html(None),
            Value::String(html) => clean_html(Some(html)),
            other => clean_html(Some(&other.to_string())),
        };
        Value::String(text)
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn topic() -> Value {
        json!({
            "id": 104906,
            "post_stream": {
                "posts": [
                    {"id": 11, "name": "Ann", "username": "ann", "post_number": 1,
                     "created_at": "2025-11-22T18:11:23.522Z", "cooked": "<p>Hi <b>there</b></p>",
                     "reads": 10, "can_edit": false, "trust_level": 2, "actions_summary": []},
                    {"id": 12, "name": "Bob", "username": "bob", "post_number": 2,
                     "created_at": "2025-11-23T07:05:00.000Z", "cooked": null,
                     "reads": 3, "user_deleted": false},
                    {"id": 13, "name": null, "username": "cid", "post_number": 3,
                     "created_at": "2025-11-24T12:00:59+00:00", "cooked": "<p>Bye</p>"}
                ]
            }
        })
    }

    #[test]
    fn test_process_topic_runs_every_stage() {
        let processed = process_topic(104906, &topic()).unwrap();
        let table = &processed.table;

        assert_eq!(processed.topic_id, 104906);
        assert_eq!(table.len(), 3);
        assert_eq!(
            table.columns(),
            &["id", "name", "username", "post_number", "created_at", "cooked", "clean_cooked"]
        );
        assert_eq!(table.cell(0, CREATED_AT), Some(&json!("2025-11-22 18:11")));
        assert_eq!(table.cell(2, CREATED_AT), Some(&json!("2025-11-24 12:00")));
        assert_eq!(table.cell(0, CLEAN_COOKED), Some(&json!("Hi there")));
        assert_eq!(table.cell(1, CLEAN_COOKED), Some(&json!("")));
        // The source column is kept as-is.
        assert_eq!(table.cell(0, COOKED), Some(&json!("<p>Hi <b>there</b></p>")));
    }

    #[test]
    fn test_process_topic_missing_posts_is_malformed() {
        let err = process_topic(1, &json!({"post_stream": {}})).unwrap_err();
        assert!(matches!(err, NutshellError::MalformedDocument { ref path, .. } if path == "post_stream.posts"));
    }

    #[test]
    fn test_process_topic_empty_post_list() {
        let processed = process_topic(1, &json!({"post_stream": {"posts": []}})).unwrap();
        assert!(processed.table.is_empty());
        assert!(processed.posts().unwrap().is_empty());
    }

    #[test]
    fn test_process_topic_fails_fast_on_bad_date() {
        let mut doc = topic();
        doc["post_stream"]["posts"][1]["created_at"] = json!("not a date");
        let err = process_topic(1, &doc).unwrap_err();
        assert!(matches!(err, NutshellError::InvalidTimestamp { ref value } if value == "not a date"));
    }

    #[test]
    fn test_process_topic_null_date_is_invalid() {
        let doc = json!({"post_stream": {"posts": [
            {"id": 1, "post_number": 1, "created_at": "2025-01-01T00:00:00Z"},
            {"id": 2, "post_number": 2}
        ]}});
        let err = process_topic(1, &doc).unwrap_err();
        assert!(matches!(err, NutshellError::InvalidTimestamp { ref value } if value == "null"));
    }

    #[test]
    fn test_processed_posts_projection() {
        let posts = process_topic(104906, &topic()).unwrap().posts().unwrap();
        assert_eq!(posts.len(), 3);
        assert_eq!(posts[0].id, 11);
        assert_eq!(posts[0].author.as_deref(), Some("Ann"));
        assert_eq!(posts[2].author, None);
        assert_eq!(posts[1].number, 2);
        assert_eq!(posts[1].clean_content, "");
    }

    #[test]
    fn test_read_topic_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", topic()).unwrap();
        let doc = read_topic_file(file.path()).unwrap();
        assert_eq!(doc["id"], json!(104906));

        let mut junk = NamedTempFile::new().unwrap();
        write!(junk, "<html>not json</html>").unwrap();
        assert!(matches!(
            read_topic_file(junk.path()),
            Err(NutshellError::MalformedDocument { .. })
        ));

        assert!(matches!(
            read_topic_file(Path::new("does/not/exist.json")),
            Err(NutshellError::FileSystem { .. })
        ));
    }
}
