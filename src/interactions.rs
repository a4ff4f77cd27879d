//! # Interaction log
//!
//! Append-only record of every question asked about a file and the answer
//! that came back, kept in a single SQLite table:
//!
//! ```text
//! interactions(id TEXT PRIMARY KEY, timestamp TEXT, post_name TEXT,
//!              query TEXT, full_context TEXT, response TEXT)
//! ```
//!
//! Each call opens its own connection, makes sure the table exists, does its
//! work and closes the connection again. Rows are never updated or deleted.
//! Concurrent writers are left to SQLite's locking (see
//! [`crate::config::establish_connection`] for the busy timeout).

use std::path::{Path, PathBuf};

use diesel::{connection::SimpleConnection, prelude::*};
use tracing::{debug, info};

use crate::{
    config::{NutshellConfig, establish_connection},
    error::Result,
    models::Interaction,
    schema::interactions,
};

const CREATE_TABLE: &str = "CREATE TABLE IF NOT EXISTS interactions (
    id TEXT PRIMARY KEY,
    timestamp TEXT,
    post_name TEXT,
    query TEXT,
    full_context TEXT,
    response TEXT)";

/// Handle on the interaction log file. Cheap to clone; holds no connection.
#[derive(Debug, Clone)]
pub struct InteractionLog {
    db_path: PathBuf,
}

impl InteractionLog {
    pub fn new(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: db_path.into(),
        }
    }

    /// The log configured by `data_dir` / `db_file`.
    pub fn from_config(config: &NutshellConfig) -> Self {
        Self::new(config.db_path())
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    /// Create the table if it does not exist yet.
    pub fn init(&self) -> Result<()> {
        self.connect()?;
        Ok(())
    }

    /// Append one exchange and return the stored row.
    pub fn log(
        &self,
        post_name: &str,
        query: &str,
        full_context: &str,
        response: &str,
    ) -> Result<Interaction> {
        let record = Interaction::new(post_name, query, full_context, response);
        let mut connection = self.connect()?;

        let saved = diesel::insert_into(interactions::table)
            .values(&record)
            .returning(Interaction::as_returning())
            .get_result(&mut connection)?;

        info!(id = %saved.id, post_name, "Logged interaction");
        Ok(saved)
    }

    /// The newest `limit` rows, most recent first.
    pub fn recent(&self, limit: i64) -> Result<Vec<Interaction>> {
        let mut connection = self.connect()?;
        let rows = interactions::table
            .order(interactions::timestamp.desc())
            .limit(limit)
            .select(Interaction::as_select())
            .load(&mut connection)?;
        Ok(rows)
    }

    fn connect(&self) -> Result<SqliteConnection> {
        debug!("Opening interaction log at {}", self.db_path.display());
        let mut connection = establish_connection(&self.db_path)?;
        connection.batch_execute(CREATE_TABLE)?;
        Ok(connection)
    }
}
