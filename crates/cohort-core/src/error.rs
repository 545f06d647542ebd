//! Error types for `cohort-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// The caller supplied something malformed: an unknown identifier kind, a
  /// value that does not parse for its kind, a candidate of the wrong variant.
  #[error("invalid request: {0}")]
  RequestInvalid(String),

  #[error("identifier kind {kind:?} is not supported by {repository}")]
  UnsupportedIdentifier {
    repository: &'static str,
    kind:       String,
  },

  #[error("not found: {0}")]
  NotFound(String),

  /// A create was attempted for something that already exists.
  #[error("conflict: {0}")]
  Conflict(String),

  /// Data read from a store or a platform does not match its declared shape.
  #[error("invalid structure: {0}")]
  StructureInvalid(String),

  #[error("scan of {label} stopped after {pages} pages without reaching the end")]
  ScanLimitExceeded { label: String, pages: u32 },

  #[error("transport error: {0}")]
  Transport(#[source] Box<dyn std::error::Error + Send + Sync>),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Coarse classification of [`Error`], used by callers that only need to
/// branch on the category (exit codes, HTTP status mapping).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
  Validation,
  NotFound,
  Conflict,
  StructureInvalid,
  Transport,
}

impl Error {
  pub fn kind(&self) -> ErrorKind {
    match self {
      Self::RequestInvalid(_) | Self::UnsupportedIdentifier { .. } => {
        ErrorKind::Validation
      }
      Self::NotFound(_) => ErrorKind::NotFound,
      Self::Conflict(_) => ErrorKind::Conflict,
      Self::StructureInvalid(_) | Self::ScanLimitExceeded { .. } => {
        ErrorKind::StructureInvalid
      }
      Self::Transport(_) => ErrorKind::Transport,
    }
  }

  pub fn is_not_found(&self) -> bool { matches!(self, Self::NotFound(_)) }

  pub fn transport(
    err: impl Into<Box<dyn std::error::Error + Send + Sync>>,
  ) -> Self {
    Self::Transport(err.into())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn kinds_follow_variants() {
    let cases = [
      (Error::RequestInvalid("x".into()), ErrorKind::Validation),
      (
        Error::UnsupportedIdentifier {
          repository: "groups",
          kind:       "nickname".into(),
        },
        ErrorKind::Validation,
      ),
      (Error::NotFound("x".into()), ErrorKind::NotFound),
      (Error::Conflict("x".into()), ErrorKind::Conflict),
      (Error::StructureInvalid("x".into()), ErrorKind::StructureInvalid),
      (
        Error::ScanLimitExceeded {
          label: "members".into(),
          pages: 3,
        },
        ErrorKind::StructureInvalid,
      ),
      (Error::transport("connection reset"), ErrorKind::Transport),
    ];
    for (err, kind) in cases {
      assert_eq!(err.kind(), kind, "{err}");
    }
  }
}
