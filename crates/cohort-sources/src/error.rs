//! Error type for `cohort-sources`.

use std::fmt;

use reqwest::{Method, StatusCode};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] cohort_core::Error),

  #[error("http error: {0}")]
  Http(#[from] reqwest::Error),

  #[error("{method} {path} returned {status}")]
  Status {
    method: Method,
    path:   String,
    status: StatusCode,
  },

  #[error("invalid base url {0:?}")]
  BaseUrl(String),

  /// The platform answered with data that does not fit the domain.
  #[error("invalid platform data: {0}")]
  Invalid(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Error {
  pub(crate) fn invalid(what: &str, err: impl fmt::Display) -> Self {
    Self::Invalid(format!("{what}: {err}"))
  }
}

impl From<Error> for cohort_core::Error {
  fn from(err: Error) -> Self {
    match err {
      Error::Core(e) => e,
      Error::Invalid(msg) => Self::StructureInvalid(msg),
      Error::Http(e) if e.is_decode() => Self::StructureInvalid(e.to_string()),
      Error::Status { method, path, status } if status == StatusCode::NOT_FOUND => {
        Self::NotFound(format!("{method} {path}"))
      }
      other => Self::transport(other),
    }
  }
}
