//! The communication store: connection bootstrap and schema ownership.
//!
//! # Responsibility
//! - Hand out connections to the SchoolComms SQLite file with foreign keys
//!   enforced and a busy timeout set.
//! - Bring the file up to the current schema before any repository runs.
//!
//! # Errors
//! - [`DbError::StoreDir`]: the directory holding the store file cannot be
//!   created.
//! - [`DbError::SchemaTooNew`]: the file was migrated by a newer build and is
//!   left untouched.
//! - [`DbError::Sqlite`]: everything SQLite itself reports.

use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

pub mod migrations;
mod open;

pub use open::{open_db, open_db_in_memory};
pub use rusqlite::Connection;

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
    SchemaTooNew { found: u32, supported: u32 },
    StoreDir { dir: PathBuf, source: std::io::Error },
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "store error: {err}"),
            Self::SchemaTooNew { found, supported } => write!(
                f,
                "store schema v{found} was written by a newer release (this one supports up to v{supported})"
            ),
            Self::StoreDir { dir, source } => {
                write!(f, "cannot create store directory `{}`: {source}", dir.display())
            }
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::StoreDir { source, .. } => Some(source),
            Self::SchemaTooNew { .. } => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}
