//! [`SourceTag`]: the closed set of external platforms.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

/// An external system that holds its own copy of groups or members.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  PartialOrd,
  Ord,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  EnumIter,
  IntoStaticStr,
)]
pub enum SourceTag {
  /// The CRM that owns courses and accounts; the primary account source.
  #[serde(rename = "COURSE")]
  #[strum(serialize = "COURSE")]
  Course,
  /// The community platform.
  #[serde(rename = "COMMUNITY")]
  #[strum(serialize = "COMMUNITY")]
  Community,
  /// The micro-learning platform.
  #[serde(rename = "MICRO-COURSE")]
  #[strum(serialize = "MICRO-COURSE")]
  MicroCourse,
  /// The identity provider.
  #[serde(rename = "AUTH0")]
  #[strum(serialize = "AUTH0")]
  Auth0,
}

impl SourceTag {
  pub fn as_str(self) -> &'static str { self.into() }
}
