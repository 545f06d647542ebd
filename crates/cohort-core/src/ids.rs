//! Identifier and value newtypes shared by groups, members and sources.
//!
//! Every type here validates on construction, and serde goes through the
//! same constructors, so a value that exists is a value that is valid.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result, external_id::SEPARATOR};

// ─── Uuid-backed ids ─────────────────────────────────────────────────────────

macro_rules! uuid_id {
  ($(#[$meta:meta])* $name:ident, $label:literal) => {
    $(#[$meta])*
    #[derive(
      Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
    )]
    #[serde(transparent)]
    pub struct $name(Uuid);

    impl $name {
      pub fn new() -> Self { Self(Uuid::new_v4()) }

      pub fn as_uuid(&self) -> Uuid { self.0 }
    }

    impl Default for $name {
      fn default() -> Self { Self::new() }
    }

    impl From<Uuid> for $name {
      fn from(id: Uuid) -> Self { Self(id) }
    }

    impl fmt::Display for $name {
      fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0.hyphenated(), f)
      }
    }

    impl FromStr for $name {
      type Err = Error;

      fn from_str(s: &str) -> Result<Self> {
        Uuid::parse_str(s.trim()).map(Self).map_err(|e| {
          Error::RequestInvalid(format!("invalid {}: {s:?} ({e})", $label))
        })
      }
    }
  };
}

uuid_id!(
  /// Internal id of a group.
  GroupId,
  "group id"
);
uuid_id!(
  /// Internal id of a group membership.
  GroupMemberId,
  "group member id"
);
uuid_id!(
  /// Id of a person in the members service.
  MemberId,
  "member id"
);
uuid_id!(
  /// Id of the course a course group mirrors.
  CourseId,
  "course id"
);
uuid_id!(
  /// Id of a course participant; one per member per course.
  ParticipantId,
  "participant id"
);

// ─── String-backed values ────────────────────────────────────────────────────

macro_rules! string_value {
  ($(#[$meta:meta])* $name:ident, $check:path) => {
    $(#[$meta])*
    #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
    #[serde(try_from = "String", into = "String")]
    pub struct $name(String);

    impl $name {
      pub fn new(value: impl Into<String>) -> Result<Self> {
        let value = value.into();
        $check(&value)?;
        Ok(Self(value))
      }

      pub fn as_str(&self) -> &str { &self.0 }
    }

    impl fmt::Display for $name {
      fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
    }

    impl FromStr for $name {
      type Err = Error;

      fn from_str(s: &str) -> Result<Self> { Self::new(s) }
    }

    impl TryFrom<String> for $name {
      type Error = Error;

      fn try_from(value: String) -> Result<Self> { Self::new(value) }
    }

    impl From<$name> for String {
      fn from(value: $name) -> Self { value.0 }
    }

    impl AsRef<str> for $name {
      fn as_ref(&self) -> &str { &self.0 }
    }
  };
}

string_value!(
  /// A raw identifier as issued by an external platform.
  SourceId,
  check_source_id
);
string_value!(
  /// URL-safe handle of a group: lowercase ASCII letters, digits and single
  /// hyphens, not starting or ending with a hyphen.
  GroupSlug,
  check_slug
);
string_value!(
  /// Slug of the account that owns a group or membership.
  AccountSlug,
  check_slug
);
string_value!(GroupName, check_name);
string_value!(Email, check_email);

impl GroupSlug {
  /// Derive a slug from a display name, for platforms that do not issue one.
  pub fn from_name(name: &GroupName) -> Result<Self> {
    let mut slug = String::with_capacity(name.as_str().len());
    for ch in name.as_str().chars() {
      if ch.is_ascii_alphanumeric() {
        slug.push(ch.to_ascii_lowercase());
      } else if !slug.is_empty() && !slug.ends_with('-') {
        slug.push('-');
      }
    }
    while slug.ends_with('-') {
      slug.pop();
    }
    Self::new(slug)
      .map_err(|_| Error::StructureInvalid(format!("cannot derive a slug from {name:?}")))
  }
}

fn check_source_id(value: &str) -> Result<()> {
  if value.is_empty() {
    return Err(Error::RequestInvalid("source id is empty".into()));
  }
  if value.trim() != value {
    return Err(Error::RequestInvalid(format!(
      "source id {value:?} has surrounding whitespace"
    )));
  }
  if value.contains(SEPARATOR) {
    return Err(Error::RequestInvalid(format!(
      "source id {value:?} contains the reserved separator {SEPARATOR:?}"
    )));
  }
  Ok(())
}

fn check_slug(value: &str) -> Result<()> {
  let well_formed = !value.is_empty()
    && !value.starts_with('-')
    && !value.ends_with('-')
    && !value.contains("--")
    && value
      .chars()
      .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
  if well_formed {
    Ok(())
  } else {
    Err(Error::RequestInvalid(format!("invalid slug: {value:?}")))
  }
}

fn check_name(value: &str) -> Result<()> {
  if value.trim().is_empty() {
    Err(Error::RequestInvalid("name is empty".into()))
  } else {
    Ok(())
  }
}

fn check_email(value: &str) -> Result<()> {
  match value.split_once('@') {
    Some((local, domain))
      if !local.is_empty()
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !value.chars().any(char::is_whitespace) =>
    {
      Ok(())
    }
    _ => Err(Error::RequestInvalid(format!("invalid email: {value:?}"))),
  }
}
