//! Error type for `cohort-store-sqlite`.

use rusqlite::ffi;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] cohort_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  /// A stored value that does not decode into its domain type.
  #[error("corrupt row: {0}")]
  Corrupt(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Error {
  fn constraint_code(&self) -> Option<i32> {
    match self {
      Self::Database(tokio_rusqlite::Error::Rusqlite(
        rusqlite::Error::SqliteFailure(failure, _),
      )) if failure.code == rusqlite::ErrorCode::ConstraintViolation => {
        Some(failure.extended_code)
      }
      _ => None,
    }
  }
}

impl From<Error> for cohort_core::Error {
  fn from(err: Error) -> Self {
    match err.constraint_code() {
      Some(ffi::SQLITE_CONSTRAINT_UNIQUE | ffi::SQLITE_CONSTRAINT_PRIMARYKEY) => {
        return Self::Conflict(err.to_string());
      }
      Some(ffi::SQLITE_CONSTRAINT_FOREIGNKEY) => {
        return Self::NotFound(format!("referenced group ({err})"));
      }
      _ => {}
    }
    match err {
      Error::Core(e) => e,
      Error::Uuid(e) => Self::StructureInvalid(format!("stored uuid: {e}")),
      Error::Corrupt(msg) => Self::StructureInvalid(msg),
      other => Self::transport(other),
    }
  }
}
