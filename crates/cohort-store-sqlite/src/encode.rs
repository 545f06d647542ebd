//! Encoding and decoding helpers between domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Rows are decoded into the flat [`GroupRecord`] / [`GroupMemberRecord`]
//! shapes first and then discriminated, exactly like JSON input.

use std::{fmt, str::FromStr};

use cohort_core::{
  external_id::{ExternalId, SourceIds},
  group::Group,
  group_member::GroupMember,
  ids::{CourseId, GroupId, GroupMemberId, ParticipantId},
  record::{GroupMemberRecord, GroupRecord},
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Scalars ─────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

/// Parse a stored column through the domain type's own validation.
fn decode_column<T>(column: &str, s: &str) -> Result<T>
where
  T: FromStr,
  T::Err: fmt::Display,
{
  s.parse()
    .map_err(|e| Error::Corrupt(format!("{column} {s:?}: {e}")))
}

// ─── Source ids ──────────────────────────────────────────────────────────────

pub struct RawSourceId {
  pub source:    String,
  pub source_id: String,
}

impl RawSourceId {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      source:    row.get(0)?,
      source_id: row.get(1)?,
    })
  }
}

/// `(source, source_id)` pairs ready to bind.
pub fn encode_source_ids(ids: &SourceIds) -> Vec<(String, String)> {
  ids
    .iter()
    .map(|ext| (ext.source.to_string(), ext.id.to_string()))
    .collect()
}

pub fn decode_source_ids(rows: Vec<RawSourceId>) -> Result<SourceIds> {
  let list = rows
    .into_iter()
    .map(|row| {
      Ok(ExternalId::new(
        decode_column("source_id", &row.source_id)?,
        decode_column("source", &row.source)?,
      ))
    })
    .collect::<Result<Vec<_>>>()?;
  Ok(SourceIds::try_from(list)?)
}

// ─── Groups ──────────────────────────────────────────────────────────────────

pub const GROUP_COLUMNS: &str =
  "group_id, group_type, slug, status, name, account_owner, course_id";

pub struct RawGroup {
  pub group_id:      String,
  pub group_type:    String,
  pub slug:          String,
  pub status:        String,
  pub name:          String,
  pub account_owner: String,
  pub course_id:     Option<String>,
}

impl RawGroup {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      group_id:      row.get(0)?,
      group_type:    row.get(1)?,
      slug:          row.get(2)?,
      status:        row.get(3)?,
      name:          row.get(4)?,
      account_owner: row.get(5)?,
      course_id:     row.get(6)?,
    })
  }

  pub fn from_group(group: Group) -> (Self, Vec<(String, String)>) {
    let record = GroupRecord::from(group);
    let source_ids = encode_source_ids(&record.source_ids);
    let raw = Self {
      group_id:      encode_uuid(record.id.as_uuid()),
      group_type:    record.variant.to_string(),
      slug:          record.slug.to_string(),
      status:        record.status.to_string(),
      name:          record.name.to_string(),
      account_owner: record.account_owner.to_string(),
      course_id:     record.course_id.map(|id| encode_uuid(id.as_uuid())),
    };
    (raw, source_ids)
  }

  pub fn into_group(self, source_ids: Vec<RawSourceId>) -> Result<Group> {
    let record = GroupRecord {
      variant:       decode_column("group_type", &self.group_type)?,
      id:            GroupId::from(decode_uuid(&self.group_id)?),
      source_ids:    decode_source_ids(source_ids)?,
      slug:          decode_column("slug", &self.slug)?,
      status:        decode_column("status", &self.status)?,
      name:          decode_column("name", &self.name)?,
      account_owner: decode_column("account_owner", &self.account_owner)?,
      course_id:     self
        .course_id
        .as_deref()
        .map(decode_uuid)
        .transpose()?
        .map(CourseId::from),
    };
    Ok(Group::try_from(record)?)
  }
}

// ─── Group members ───────────────────────────────────────────────────────────

pub const MEMBER_COLUMNS: &str = "group_member_id, group_id, member_id, member_type, status, \
                                  name, email, organisation_name, account_owner, course_id, \
                                  participant_id";

pub struct RawGroupMember {
  pub group_member_id:   String,
  pub group_id:          String,
  pub member_id:         String,
  pub member_type:       String,
  pub status:            String,
  pub name:              String,
  pub email:             String,
  pub organisation_name: Option<String>,
  pub account_owner:     String,
  pub course_id:         Option<String>,
  pub participant_id:    Option<String>,
}

impl RawGroupMember {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      group_member_id:   row.get(0)?,
      group_id:          row.get(1)?,
      member_id:         row.get(2)?,
      member_type:       row.get(3)?,
      status:            row.get(4)?,
      name:              row.get(5)?,
      email:             row.get(6)?,
      organisation_name: row.get(7)?,
      account_owner:     row.get(8)?,
      course_id:         row.get(9)?,
      participant_id:    row.get(10)?,
    })
  }

  pub fn from_member(member: GroupMember) -> (Self, Vec<(String, String)>) {
    let record = GroupMemberRecord::from(member);
    let source_ids = encode_source_ids(&record.source_ids);
    let raw = Self {
      group_member_id:   encode_uuid(record.id.as_uuid()),
      group_id:          encode_uuid(record.group_id.as_uuid()),
      member_id:         encode_uuid(record.member_id.as_uuid()),
      member_type:       record.variant.to_string(),
      status:            record.status.to_string(),
      name:              record.name,
      email:             record.email.to_string(),
      organisation_name: record.organisation_name,
      account_owner:     record.account_owner.to_string(),
      course_id:         record.course_id.map(|id| encode_uuid(id.as_uuid())),
      participant_id:    record.participant_id.map(|id| encode_uuid(id.as_uuid())),
    };
    (raw, source_ids)
  }

  pub fn into_member(self, source_ids: Vec<RawSourceId>) -> Result<GroupMember> {
    let optional_uuid = |s: Option<String>| s.as_deref().map(decode_uuid).transpose();
    let record = GroupMemberRecord {
      variant:           decode_column("member_type", &self.member_type)?,
      id:                GroupMemberId::from(decode_uuid(&self.group_member_id)?),
      group_id:          GroupId::from(decode_uuid(&self.group_id)?),
      member_id:         decode_uuid(&self.member_id)?.into(),
      source_ids:        decode_source_ids(source_ids)?,
      status:            decode_column("status", &self.status)?,
      name:              self.name,
      email:             decode_column("email", &self.email)?,
      organisation_name: self.organisation_name,
      account_owner:     decode_column("account_owner", &self.account_owner)?,
      course_id:         optional_uuid(self.course_id)?.map(CourseId::from),
      participant_id:    optional_uuid(self.participant_id)?.map(ParticipantId::from),
    };
    Ok(GroupMember::try_from(record)?)
  }
}
