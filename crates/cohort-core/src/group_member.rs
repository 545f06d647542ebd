//! GroupMember: one person's membership of one group.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::{
  external_id::SourceIds,
  ids::{AccountSlug, CourseId, Email, GroupId, GroupMemberId, MemberId, ParticipantId},
  record::GroupMemberRecord,
};

#[derive(
  Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum GroupMemberStatus {
  #[default]
  Pending,
  Active,
  Disabled,
}

/// Data only a course membership has.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CourseMembership {
  pub course_id:      CourseId,
  pub participant_id: ParticipantId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupMemberVariant {
  Standard,
  Course(CourseMembership),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "GroupMemberRecord", into = "GroupMemberRecord")]
pub struct GroupMember {
  pub id:                GroupMemberId,
  pub group_id:          GroupId,
  pub member_id:         MemberId,
  pub source_ids:        SourceIds,
  pub status:            GroupMemberStatus,
  pub name:              String,
  pub email:             Email,
  pub organisation_name: Option<String>,
  pub account_owner:     AccountSlug,
  pub variant:           GroupMemberVariant,
}

impl GroupMember {
  /// Narrow to the course variant.
  pub fn as_course(&self) -> Option<&CourseMembership> {
    match &self.variant {
      GroupMemberVariant::Course(membership) => Some(membership),
      GroupMemberVariant::Standard => None,
    }
  }

  pub fn participant_id(&self) -> Option<ParticipantId> {
    self.as_course().map(|c| c.participant_id)
  }
}

/// The one place that decides whether a membership is a course membership.
pub fn is_course_group_member(member: &GroupMember) -> bool {
  member.as_course().is_some()
}
