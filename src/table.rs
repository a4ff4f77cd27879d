//! # Post table
//!
//! An in-memory, column-oriented view of a topic's posts: one row per post,
//! one column per post field. Columns are the union of keys across all posts
//! in first-seen order; a post that lacks a key gets a `null` cell.
//!
//! The table only ever changes shape in three ways:
//! - columns are dropped ([`PostTable::drop_columns`]),
//! - a column is rewritten cell by cell ([`PostTable::try_map_column`]),
//! - a derived column is appended ([`PostTable::derive_column`]).
//!
//! Rows are never filtered or reordered.

use serde_json::{Map, Value};

use crate::error::{NutshellError, Result};

/// Post fields that carry nothing useful once content has been extracted:
/// permission flags, UI affordances, engagement counters and flair.
pub const DROPPED_COLUMNS: &[&str] = &[
    "avatar_template",
    "updated_at",
    "reply_count",
    "reply_to_post_number",
    "quote_count",
    "incoming_link_count",
    "reads",
    "readers_count",
    "score",
    "yours",
    "primary_group_name",
    "flair_name",
    "flair_url",
    "flair_bg_color",
    "flair_color",
    "flair_group_id",
    "badges_granted",
    "version",
    "can_edit",
    "can_delete",
    "can_recover",
    "can_see_hidden_post",
    "can_wiki",
    "link_counts",
    "read",
    "user_title",
    "title_is_group",
    "bookmarked",
    "actions_summary",
    "moderator",
    "admin",
    "staff",
    "user_id",
    "hidden",
    "trust_level",
    "deleted_at",
    "user_deleted",
    "edit_reason",
    "can_view_edit_history",
    "wiki",
    "post_url",
    "can_accept_answer",
    "can_unaccept_answer",
    "accepted_answer",
    "topic_accepted_answer",
    "can_vote",
    "reply_to_user",
];

/// Tabular view over a topic's posts.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PostTable {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl PostTable {
    /// Locate `post_stream.posts` in a topic document and tabulate it.
    ///
    /// # Errors
    /// [`NutshellError::MalformedDocument`] naming the first part of the path
    /// that is missing or has the wrong type.
    pub fn from_document(document: &Value) -> Result<Self> {
        let stream = document
            .get("post_stream")
            .ok_or_else(|| NutshellError::malformed("post_stream", "key is missing"))?;
        if !stream.is_object() {
            return Err(NutshellError::malformed("post_stream", "expected an object"));
        }

        let posts = stream
            .get("posts")
            .ok_or_else(|| NutshellError::malformed("post_stream.posts", "key is missing"))?
            .as_array()
            .ok_or_else(|| NutshellError::malformed("post_stream.posts", "expected an array"))?;

        Self::from_posts(posts)
    }

    /// Tabulate a list of post objects, preserving their order.
    pub fn from_posts(posts: &[Value]) -> Result<Self> {
        let objects: Vec<&Map<String, Value>> = posts
            .iter()
            .enumerate()
            .map(|(i, post)| {
                post.as_object().ok_or_else(|| {
                    NutshellError::malformed(format!("post_stream.posts[{i}]"), "expected an object")
                })
            })
            .collect::<Result<_>>()?;

        let mut columns: Vec<String> = Vec::new();
        for object in &objects {
            for key in object.keys() {
                if !columns.iter().any(|c| c == key) {
                    columns.push(key.clone());
                }
            }
        }

        let rows = objects
            .iter()
            .map(|object| {
                columns
                    .iter()
                    .map(|c| object.get(c).cloned().unwrap_or(Value::Null))
                    .collect()
            })
            .collect();

        Ok(Self { columns, rows })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Cell at `row` in column `name`, if both exist.
    pub fn cell(&self, row: usize, name: &str) -> Option<&Value> {
        let col = self.column_index(name)?;
        self.rows.get(row).map(|r| &r[col])
    }

    /// Remove every listed column that is present.
    ///
    /// Names that are not in the table are ignored, so the call is idempotent
    /// and never fails. Remaining columns keep their names and order.
    pub fn drop_columns(&mut self, names: &[&str]) {
        let keep: Vec<bool> = self
            .columns
            .iter()
            .map(|c| !names.contains(&c.as_str()))
            .collect();
        if keep.iter().all(|k| *k) {
            return;
        }

        let mut flags = keep.iter();
        self.columns.retain(|_| *flags.next().unwrap_or(&true));
        for row in &mut self.rows {
            let mut flags = keep.iter();
            row.retain(|_| *flags.next().unwrap_or(&true));
        }
    }

    /// Rewrite every cell of `name` in place, stopping at the first failure.
    ///
    /// The table is only modified when every cell converts, so a failure
    /// leaves all rows untouched.
    ///
    /// An empty table has no columns at all and is left as it is.
    ///
    /// # Errors
    /// [`NutshellError::MalformedDocument`] if the table has rows but not the
    /// column, otherwise whatever `f` returns.
    pub fn try_map_column<F>(&mut self, name: &str, mut f: F) -> Result<()>
    where
        F: FnMut(&Value) -> Result<Value>,
    {
        if self.rows.is_empty() {
            return Ok(());
        }
        let col = self.column_index(name).ok_or_else(|| {
            NutshellError::malformed(format!("post_stream.posts[].{name}"), "column is missing")
        })?;

        let converted = self
            .rows
            .iter()
            .map(|row| f(&row[col]))
            .collect::<Result<Vec<_>>>()?;

        for (row, value) in self.rows.iter_mut().zip(converted) {
            row[col] = value;
        }
        Ok(())
    }

    /// Compute `target` from `source` for every row.
    ///
    /// A missing source column is treated as all-null. The target column is
    /// appended, or overwritten in place if it already exists.
    pub fn derive_column<F>(&mut self, source: &str, target: &str, mut f: F)
    where
        F: FnMut(&Value) -> Value,
    {
        let source_col = self.column_index(source);
        let values: Vec<Value> = self
            .rows
            .iter()
            .map(|row| f(source_col.map_or(&Value::Null, |c| &row[c])))
            .collect();

        match self.column_index(target) {
            Some(col) => {
                for (row, value) in self.rows.iter_mut().zip(values) {
                    row[col] = value;
                }
            }
            None => {
                self.columns.push(target.to_string());
                for (row, value) in self.rows.iter_mut().zip(values) {
                    row.push(value);
                }
            }
        }
    }

    /// Short human-readable dump: the first `limit` rows and the column list.
    pub fn preview(&self, limit: usize) -> String {
        let mut out = String::new();
        for (i, row) in self.rows.iter().take(limit).enumerate() {
            let cells: Vec<String> = self
                .columns
                .iter()
                .zip(row)
                .map(|(c, v)| format!("{c}={}", preview_cell(v)))
                .collect();
            out.push_str(&format!("{i}: {}\n", cells.join(", ")));
        }
        out.push_str(&format!(
            "[{} rows x {} columns] columns: {}\n",
            self.rows.len(),
            self.columns.len(),
            self.columns.join(", ")
        ));
        out
    }
}

fn preview_cell(value: &Value) -> String {
    const WIDTH: usize = 40;
    let text = match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    if text.chars().count() > WIDTH {
        let head: String = text.chars().take(WIDTH).collect();
        format!("{head}...")
    } else {
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_document() -> Value {
        json!({
            "post_stream": {
                "posts": [
                    {"id": 1, "name": "Ann", "post_number": 1, "created_at": "2025-11-22T18:11:23.522Z",
                     "cooked": "<p>Hello</p>", "reads": 4, "can_edit": false, "avatar_template": "/a.png"},
                    {"id": 2, "name": "Bob", "post_number": 2, "created_at": "2025-11-22T19:00:00.000Z",
                     "cooked": null, "reads": 2, "score": 0.2},
                    {"id": 3, "name": "Cid", "post_number": 3, "created_at": "2025-11-23T08:30:00.000Z",
                     "cooked": "<p>Bye</p>", "staff": true}
                ]
            }
        })
    }

    #[test]
    fn test_from_document_builds_union_of_columns() {
        let table = PostTable::from_document(&sample_document()).unwrap();
        assert_eq!(table.len(), 3);
        assert_eq!(
            table.columns(),
            &[
                "id", "name", "post_number", "created_at", "cooked", "reads", "can_edit",
                "avatar_template", "score", "staff"
            ]
        );
        assert_eq!(table.cell(1, "can_edit"), Some(&Value::Null));
        assert_eq!(table.cell(2, "staff"), Some(&json!(true)));
        assert_eq!(table.cell(0, "id"), Some(&json!(1)));
    }

    #[test]
    fn test_from_document_missing_post_stream() {
        let err = PostTable::from_document(&json!({"title": "x"})).unwrap_err();
        match err {
            NutshellError::MalformedDocument { path, .. } => assert_eq!(path, "post_stream"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_from_document_missing_posts() {
        let err = PostTable::from_document(&json!({"post_stream": {"stream": [1, 2]}})).unwrap_err();
        match err {
            NutshellError::MalformedDocument { path, .. } => assert_eq!(path, "post_stream.posts"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_from_document_rejects_non_object_post() {
        let err = PostTable::from_document(&json!({"post_stream": {"posts": [{"id": 1}, 7]}}))
            .unwrap_err();
        match err {
            NutshellError::MalformedDocument { path, .. } => assert_eq!(path, "post_stream.posts[1]"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_empty_post_list_is_an_empty_table() {
        let table = PostTable::from_document(&json!({"post_stream": {"posts": []}})).unwrap();
        assert!(table.is_empty());
        assert!(table.columns().is_empty());
    }

    #[test]
    fn test_drop_columns_preserves_rows_and_order() {
        let mut table = PostTable::from_document(&sample_document()).unwrap();
        let before = table.len();
        table.drop_columns(DROPPED_COLUMNS);

        assert_eq!(table.len(), before);
        assert_eq!(
            table.columns(),
            &["id", "name", "post_number", "created_at", "cooked"]
        );
        for name in DROPPED_COLUMNS {
            assert!(!table.has_column(name), "{name} survived pruning");
        }
    }

    #[test]
    fn test_drop_columns_is_idempotent() {
        let mut once = PostTable::from_document(&sample_document()).unwrap();
        once.drop_columns(DROPPED_COLUMNS);
        let mut twice = once.clone();
        twice.drop_columns(DROPPED_COLUMNS);
        assert_eq!(once, twice);

        let mut untouched = PostTable::from_document(&json!({"post_stream": {"posts": [{"id": 9}]}}))
            .unwrap();
        untouched.drop_columns(DROPPED_COLUMNS);
        assert_eq!(untouched.columns(), &["id"]);
    }

    #[test]
    fn test_try_map_column_is_all_or_nothing() {
        let mut table = PostTable::from_document(&sample_document()).unwrap();
        let original = table.clone();

        let err = table
            .try_map_column("post_number", |v| match v.as_i64() {
                Some(3) => Err(NutshellError::invalid_timestamp("3")),
                Some(n) => Ok(json!(n * 10)),
                None => Ok(Value::Null),
            })
            .unwrap_err();
        assert!(matches!(err, NutshellError::InvalidTimestamp { .. }));
        assert_eq!(table, original);

        table
            .try_map_column("post_number", |v| Ok(json!(v.as_i64().unwrap_or(0) * 10)))
            .unwrap();
        assert_eq!(table.cell(2, "post_number"), Some(&json!(30)));
    }

    #[test]
    fn test_try_map_column_on_empty_table() {
        let mut table = PostTable::from_posts(&[]).unwrap();
        table
            .try_map_column("created_at", |_| Err(NutshellError::invalid_timestamp("x")))
            .unwrap();
        assert!(table.is_empty());
    }

    #[test]
    fn test_try_map_column_missing_column() {
        let mut table = PostTable::from_posts(&[json!({"id": 1})]).unwrap();
        let err = table.try_map_column("created_at", |v| Ok(v.clone())).unwrap_err();
        assert!(matches!(err, NutshellError::MalformedDocument { .. }));
    }

    #[test]
    fn test_derive_column_appends_and_keeps_source() {
        let mut table = PostTable::from_document(&sample_document()).unwrap();
        table.derive_column("cooked", "cooked_len", |v| {
            json!(v.as_str().map_or(0, str::len))
        });

        assert_eq!(table.columns().last().map(String::as_str), Some("cooked_len"));
        assert_eq!(table.cell(0, "cooked_len"), Some(&json!(12)));
        assert_eq!(table.cell(1, "cooked_len"), Some(&json!(0)));
        assert_eq!(table.cell(0, "cooked"), Some(&json!("<p>Hello</p>")));
    }

    #[test]
    fn test_derive_column_from_missing_source_sees_nulls() {
        let mut table = PostTable::from_posts(&[json!({"id": 1}), json!({"id": 2})]).unwrap();
        table.derive_column("cooked", "clean", |v| json!(v.is_null()));
        assert_eq!(table.cell(0, "clean"), Some(&json!(true)));
        assert_eq!(table.cell(1, "clean"), Some(&json!(true)));
    }

    #[test]
    fn test_preview_lists_columns() {
        let table = PostTable::from_document(&sample_document()).unwrap();
        let preview = table.preview(2);
        assert!(preview.starts_with("0: id=1, name=Ann"));
        assert!(!preview.contains("2: id=3"));
        assert!(preview.contains("[3 rows x 10 columns]"));
    }
}
