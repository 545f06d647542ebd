//! Candidates: incoming data the upsert paths reconcile against the store.

use serde::{Deserialize, Serialize};

use crate::{
  external_id::SourceIds,
  group::GroupStatus,
  group_member::GroupMemberStatus,
  ids::{AccountSlug, CourseId, Email, GroupName, GroupSlug, MemberId, ParticipantId},
  source_repository::{GroupMemberSource, GroupSource},
};

/// A course, as the course system describes it. Becomes a course group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseCandidate {
  pub course_id:     CourseId,
  pub slug:          GroupSlug,
  pub name:          GroupName,
  #[serde(default)]
  pub status:        GroupStatus,
  pub account_owner: AccountSlug,
  #[serde(default)]
  pub source_ids:    SourceIds,
}

/// A course participant. Becomes a course membership of the course's group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantCandidate {
  pub participant_id:    ParticipantId,
  pub course_id:         CourseId,
  pub member_id:         MemberId,
  #[serde(default)]
  pub status:            GroupMemberStatus,
  pub name:              String,
  pub email:             Email,
  #[serde(default)]
  pub organisation_name: Option<String>,
  pub account_owner:     AccountSlug,
  #[serde(default)]
  pub source_ids:        SourceIds,
}

/// A platform membership, with the internal member it belongs to already
/// resolved by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceMemberCandidate {
  pub member:    GroupMemberSource,
  pub member_id: MemberId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "from", rename_all = "camelCase")]
pub enum GroupCandidate {
  Course(CourseCandidate),
  Source(GroupSource),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "from", rename_all = "camelCase")]
pub enum GroupMemberCandidate {
  Participant(ParticipantCandidate),
  Source(SourceMemberCandidate),
}

/// A partial update for every membership of one group. Absent fields are
/// left as stored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct GroupMemberPatch {
  pub status:            Option<GroupMemberStatus>,
  pub name:              Option<String>,
  pub organisation_name: Option<String>,
  pub account_owner:     Option<AccountSlug>,
}
