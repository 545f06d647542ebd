//! Group: the authoritative internal record of a cohort.
//!
//! A group is either *standard* (created from a platform's group) or a
//! *course* group that mirrors one course. The variant carries the fields
//! only it has; everything else is common.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::{
  external_id::SourceIds,
  ids::{AccountSlug, CourseId, GroupId, GroupName, GroupSlug},
  record::GroupRecord,
};

#[derive(
  Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum GroupStatus {
  #[default]
  Pending,
  Active,
  Closed,
}

/// Data only a course group has.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CourseDetails {
  pub course_id: CourseId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupVariant {
  Standard,
  Course(CourseDetails),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "GroupRecord", into = "GroupRecord")]
pub struct Group {
  pub id:            GroupId,
  pub source_ids:    SourceIds,
  pub slug:          GroupSlug,
  pub status:        GroupStatus,
  pub name:          GroupName,
  pub account_owner: AccountSlug,
  pub variant:       GroupVariant,
}

impl Group {
  /// Narrow to the course variant.
  pub fn as_course(&self) -> Option<&CourseDetails> {
    match &self.variant {
      GroupVariant::Course(details) => Some(details),
      GroupVariant::Standard => None,
    }
  }

  pub fn course_id(&self) -> Option<CourseId> {
    self.as_course().map(|c| c.course_id)
  }
}

/// The one place that decides whether a group is a course group.
pub fn is_course_group(group: &Group) -> bool { group.as_course().is_some() }
