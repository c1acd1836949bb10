//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define use-case oriented data access contracts.
//! - Isolate SQLite query details from service orchestration.
//!
//! # Invariants
//! - Setting writes coerce values to the declared type before persistence.
//! - Repository APIs return semantic errors (`NotFound`, `ReadOnly`) in
//!   addition to DB transport errors.

use crate::db::DbError;
use crate::model::setting::SettingValueError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod members_repo;
pub mod settings_repo;

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error shared by all SQLite repositories.
#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    /// No row for the given key or id.
    NotFound(String),
    /// The setting is `RO` and the caller is not internal.
    ReadOnly(String),
    Validation {
        key: String,
        source: SettingValueError,
    },
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(key) => write!(f, "not found: {key}"),
            Self::ReadOnly(key) => write!(f, "setting `{key}` is read-only"),
            Self::Validation { key, source } => {
                write!(f, "invalid value for setting `{key}`: {source}")
            }
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Validation { source, .. } => Some(source),
            Self::NotFound(_) | Self::ReadOnly(_) | Self::InvalidData(_) => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}
