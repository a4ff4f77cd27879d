//! # Database models
//!
//! Data structures that map to the interaction log's SQLite schema via **Diesel**.
//!
//! - [`Interaction`]: one question/answer exchange about a file.
//!
//! ## Diesel expectations
//!
//! The `interactions` table (see [`crate::schema`]) is created on demand by
//! [`crate::interactions::InteractionLog`]; there are no migrations.
//!
//! ## Basic usage
//!
//! ```no_run
//! use diesel::prelude::*;
//! use discuss_nutshell::schema::interactions;
//! use discuss_nutshell::models::Interaction;
//!
//! # fn demo(conn: &mut SqliteConnection) -> Result<(), Box<dyn std::error::Error>> {
//! let row = Interaction::new("post_11.txt", "Who?", "Author: Ann\nWho?", "Ann.");
//! let _saved: Interaction = diesel::insert_into(interactions::table)
//!     .values(&row)
//!     .returning(Interaction::as_returning())
//!     .get_result(conn)?;
//! # Ok(()) }
//! ```

use chrono::{SecondsFormat, Utc};
use diesel::prelude::*;
use serde::Serialize;
use uuid::Uuid;

/// One logged exchange between a file, a question and the answer service.
///
/// ### Table
/// - `interactions`
///
/// ### Notes
/// - `id` is a random UUID v4 generated when the record is built.
/// - `timestamp` is UTC in RFC 3339 form with microseconds (`+00:00` suffix).
/// - `post_name` is the queried file's name, not the post author.
/// - `full_context` is the file text immediately followed by the query.
#[derive(Queryable, Insertable, Selectable, Serialize, Debug, Clone, PartialEq, Eq)]
#[diesel(table_name = crate::schema::interactions)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Interaction {
    pub id: String,
    pub timestamp: String,
    pub post_name: String,
    pub query: String,
    pub full_context: String,
    pub response: String,
}

impl Interaction {
    /// Build a new record stamped with a fresh id and the current UTC time.
    pub fn new(
        post_name: impl Into<String>,
        query: impl Into<String>,
        full_context: impl Into<String>,
        response: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Micros, false),
            post_name: post_name.into(),
            query: query.into(),
            full_context: full_context.into(),
            response: response.into(),
        }
    }
}
