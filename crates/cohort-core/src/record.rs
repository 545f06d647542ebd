//! Flat, tagged wire shapes for groups and members, and the discriminator
//! that turns them into typed entities.
//!
//! Every path that brings an entity in from outside (JSON, a database row)
//! goes through [`Group::try_from`] / [`GroupMember::try_from`]. The tag
//! picks the variant; the variant then insists on exactly its own fields.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::{
  Error, Result,
  external_id::SourceIds,
  group::{CourseDetails, Group, GroupStatus, GroupVariant},
  group_member::{CourseMembership, GroupMember, GroupMemberStatus, GroupMemberVariant},
  ids::{AccountSlug, CourseId, Email, GroupId, GroupMemberId, GroupName, GroupSlug, MemberId, ParticipantId},
};

/// Discriminator shared by both entity families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum VariantTag {
  Standard,
  Course,
}

// ─── Group ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupRecord {
  #[serde(rename = "type")]
  pub variant:       VariantTag,
  pub id:            GroupId,
  #[serde(default)]
  pub source_ids:    SourceIds,
  pub slug:          GroupSlug,
  #[serde(default)]
  pub status:        GroupStatus,
  pub name:          GroupName,
  pub account_owner: AccountSlug,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub course_id:     Option<CourseId>,
}

impl TryFrom<GroupRecord> for Group {
  type Error = Error;

  fn try_from(record: GroupRecord) -> Result<Self> {
    let variant = match record.variant {
      VariantTag::Standard => {
        if record.course_id.is_some() {
          return Err(variant_mismatch("group", record.id, "standard", "courseId"));
        }
        GroupVariant::Standard
      }
      VariantTag::Course => {
        let course_id = record
          .course_id
          .ok_or_else(|| missing_field("group", record.id, "course", "courseId"))?;
        GroupVariant::Course(CourseDetails { course_id })
      }
    };

    Ok(Group {
      id: record.id,
      source_ids: record.source_ids,
      slug: record.slug,
      status: record.status,
      name: record.name,
      account_owner: record.account_owner,
      variant,
    })
  }
}

impl From<Group> for GroupRecord {
  fn from(group: Group) -> Self {
    let (variant, course_id) = match group.variant {
      GroupVariant::Standard => (VariantTag::Standard, None),
      GroupVariant::Course(details) => (VariantTag::Course, Some(details.course_id)),
    };
    Self {
      variant,
      id: group.id,
      source_ids: group.source_ids,
      slug: group.slug,
      status: group.status,
      name: group.name,
      account_owner: group.account_owner,
      course_id,
    }
  }
}

// ─── GroupMember ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupMemberRecord {
  #[serde(rename = "type")]
  pub variant:           VariantTag,
  pub id:                GroupMemberId,
  pub group_id:          GroupId,
  pub member_id:         MemberId,
  #[serde(default)]
  pub source_ids:        SourceIds,
  #[serde(default)]
  pub status:            GroupMemberStatus,
  pub name:              String,
  pub email:             Email,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub organisation_name: Option<String>,
  pub account_owner:     AccountSlug,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub course_id:         Option<CourseId>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub participant_id:    Option<ParticipantId>,
}

impl TryFrom<GroupMemberRecord> for GroupMember {
  type Error = Error;

  fn try_from(record: GroupMemberRecord) -> Result<Self> {
    let variant = match record.variant {
      VariantTag::Standard => {
        if record.course_id.is_some() {
          return Err(variant_mismatch("group member", record.id, "standard", "courseId"));
        }
        if record.participant_id.is_some() {
          return Err(variant_mismatch(
            "group member",
            record.id,
            "standard",
            "participantId",
          ));
        }
        GroupMemberVariant::Standard
      }
      VariantTag::Course => {
        let course_id = record
          .course_id
          .ok_or_else(|| missing_field("group member", record.id, "course", "courseId"))?;
        let participant_id = record.participant_id.ok_or_else(|| {
          missing_field("group member", record.id, "course", "participantId")
        })?;
        GroupMemberVariant::Course(CourseMembership { course_id, participant_id })
      }
    };

    if record.name.trim().is_empty() {
      return Err(Error::StructureInvalid(format!(
        "group member {} has an empty name",
        record.id
      )));
    }

    Ok(GroupMember {
      id: record.id,
      group_id: record.group_id,
      member_id: record.member_id,
      source_ids: record.source_ids,
      status: record.status,
      name: record.name,
      email: record.email,
      organisation_name: record.organisation_name,
      account_owner: record.account_owner,
      variant,
    })
  }
}

impl From<GroupMember> for GroupMemberRecord {
  fn from(member: GroupMember) -> Self {
    let (variant, course_id, participant_id) = match member.variant {
      GroupMemberVariant::Standard => (VariantTag::Standard, None, None),
      GroupMemberVariant::Course(m) => {
        (VariantTag::Course, Some(m.course_id), Some(m.participant_id))
      }
    };
    Self {
      variant,
      id: member.id,
      group_id: member.group_id,
      member_id: member.member_id,
      source_ids: member.source_ids,
      status: member.status,
      name: member.name,
      email: member.email,
      organisation_name: member.organisation_name,
      account_owner: member.account_owner,
      course_id,
      participant_id,
    }
  }
}

fn variant_mismatch(
  family: &str,
  id: impl std::fmt::Display,
  variant: &str,
  field: &str,
) -> Error {
  Error::StructureInvalid(format!(
    "{family} {id} is tagged {variant} but carries {field}"
  ))
}

fn missing_field(
  family: &str,
  id: impl std::fmt::Display,
  variant: &str,
  field: &str,
) -> Error {
  Error::StructureInvalid(format!(
    "{family} {id} is tagged {variant} but has no {field}"
  ))
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;
  use crate::{group::is_course_group, group_member::is_course_group_member};

  fn group_json(variant: &str) -> serde_json::Value {
    json!({
      "type": variant,
      "id": GroupId::new(),
      "sourceIds": [{ "id": "abc123", "source": "COMMUNITY" }],
      "slug": "brown-group",
      "status": "active",
      "name": "Brown Group",
      "accountOwner": "apf",
    })
  }

  #[test]
  fn standard_group_parses() {
    let group: Group = serde_json::from_value(group_json("standard")).unwrap();
    assert!(!is_course_group(&group));
    assert_eq!(group.status, GroupStatus::Active);
    assert_eq!(group.source_ids.len(), 1);
  }

  #[test]
  fn course_group_requires_course_id() {
    let err = Group::try_from(
      serde_json::from_value::<GroupRecord>(group_json("course")).unwrap(),
    )
    .unwrap_err();
    assert!(matches!(err, Error::StructureInvalid(_)));

    let mut value = group_json("course");
    value["courseId"] = json!(CourseId::new());
    let group: Group = serde_json::from_value(value).unwrap();
    assert!(is_course_group(&group));
  }

  #[test]
  fn standard_group_rejects_course_fields() {
    let mut value = group_json("standard");
    value["courseId"] = json!(CourseId::new());
    let record: GroupRecord = serde_json::from_value(value).unwrap();
    assert!(matches!(
      Group::try_from(record),
      Err(Error::StructureInvalid(_))
    ));
  }

  #[test]
  fn unknown_tag_is_rejected() {
    assert!(serde_json::from_value::<Group>(group_json("cohort")).is_err());
  }

  #[test]
  fn group_serialises_through_record() {
    let mut value = group_json("course");
    let course_id = CourseId::new();
    value["courseId"] = json!(course_id);
    let group: Group = serde_json::from_value(value).unwrap();

    let out = serde_json::to_value(&group).unwrap();
    assert_eq!(out["type"], "course");
    assert_eq!(out["courseId"], json!(course_id));
    assert_eq!(out["sourceIds"][0]["source"], "COMMUNITY");
  }

  fn member_json(variant: &str) -> serde_json::Value {
    json!({
      "type": variant,
      "id": GroupMemberId::new(),
      "groupId": GroupId::new(),
      "memberId": MemberId::new(),
      "name": "Ada Lovelace",
      "email": "ada@example.org",
      "accountOwner": "apf",
    })
  }

  #[test]
  fn course_member_requires_both_fields() {
    let mut value = member_json("course");
    value["courseId"] = json!(CourseId::new());
    assert!(serde_json::from_value::<GroupMember>(value.clone()).is_err());

    value["participantId"] = json!(ParticipantId::new());
    let member: GroupMember = serde_json::from_value(value).unwrap();
    assert!(is_course_group_member(&member));
    assert_eq!(member.status, GroupMemberStatus::Pending);
  }

  #[test]
  fn standard_member_rejects_participant_id() {
    let mut value = member_json("standard");
    value["participantId"] = json!(ParticipantId::new());
    let record: GroupMemberRecord = serde_json::from_value(value).unwrap();
    assert!(matches!(
      GroupMember::try_from(record),
      Err(Error::StructureInvalid(_))
    ));
  }
}
