//! What a write path did.

use serde::Serialize;

/// Result of an update path. `NotRequired` carries the stored entity
/// unchanged; nothing was written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "entity", rename_all = "camelCase")]
pub enum UpdateOutcome<T> {
  Updated(T),
  NotRequired(T),
}

/// Result of a find-then-create-or-update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "entity", rename_all = "camelCase")]
pub enum UpsertOutcome<T> {
  Created(T),
  Updated(T),
  NotRequired(T),
}

impl<T> UpdateOutcome<T> {
  pub fn into_inner(self) -> T {
    match self {
      Self::Updated(t) | Self::NotRequired(t) => t,
    }
  }

  pub fn is_written(&self) -> bool { matches!(self, Self::Updated(_)) }
}

impl<T> UpsertOutcome<T> {
  pub fn into_inner(self) -> T {
    match self {
      Self::Created(t) | Self::Updated(t) | Self::NotRequired(t) => t,
    }
  }

  pub fn as_inner(&self) -> &T {
    match self {
      Self::Created(t) | Self::Updated(t) | Self::NotRequired(t) => t,
    }
  }

  pub fn is_written(&self) -> bool { !matches!(self, Self::NotRequired(_)) }
}

impl<T> From<UpdateOutcome<T>> for UpsertOutcome<T> {
  fn from(outcome: UpdateOutcome<T>) -> Self {
    match outcome {
      UpdateOutcome::Updated(t) => Self::Updated(t),
      UpdateOutcome::NotRequired(t) => Self::NotRequired(t),
    }
  }
}
