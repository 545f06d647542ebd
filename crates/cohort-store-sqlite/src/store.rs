//! [`SqliteStore`]: the SQLite implementation of [`GroupRepository`] and
//! [`GroupMemberRepository`].

use std::path::Path;

use rusqlite::{OptionalExtension as _, params, params_from_iter};
use tracing::debug;

use cohort_core::{
  external_id::IdSourceValue,
  group::Group,
  group_member::GroupMember,
  ids::{CourseId, GroupId, GroupMemberId, GroupSlug, MemberId, ParticipantId},
  repository::{GroupMemberRepository, GroupRepository},
};

use crate::{
  Result,
  encode::{
    GROUP_COLUMNS, MEMBER_COLUMNS, RawGroup, RawGroupMember, RawSourceId, encode_uuid,
  },
  schema::SCHEMA,
};

type CoreResult<T> = cohort_core::Result<T>;

// ─── Lookup clauses ──────────────────────────────────────────────────────────

const GROUP_BY_ID: &str = "group_id = ?1";
const GROUP_BY_SOURCE: &str = "group_id = (SELECT group_id FROM group_source_ids \
                               WHERE source = ?1 AND source_id = ?2)";
const GROUP_BY_SLUG: &str = "slug = ?1";
const GROUP_BY_COURSE: &str = "course_id = ?1 AND group_type = 'course'";

const MEMBER_BY_ID: &str = "group_member_id = ?1";
const MEMBER_BY_SOURCE: &str = "group_member_id = (SELECT group_member_id \
                                FROM group_member_source_ids \
                                WHERE group_id = ?1 AND source = ?2 AND source_id = ?3)";
const MEMBER_BY_MEMBER_ID: &str = "group_id = ?1 AND member_id = ?2";
const MEMBER_BY_PARTICIPANT: &str = "participant_id = ?1 AND member_type = 'course'";

fn source_args(value: &IdSourceValue) -> [String; 2] {
  let ext = value.external_id();
  [ext.source.to_string(), ext.id.to_string()]
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Cohort group store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  #[cfg(test)]
  pub(crate) fn connection(&self) -> &tokio_rusqlite::Connection { &self.conn }

  // ── Groups ────────────────────────────────────────────────────────────────

  async fn load_group(&self, clause: &'static str, args: Vec<String>) -> Result<Option<Group>> {
    let row = self
      .conn
      .call(move |conn| {
        let sql = format!("SELECT {GROUP_COLUMNS} FROM groups WHERE {clause}");
        let Some(raw) = conn
          .query_row(&sql, params_from_iter(args.iter()), RawGroup::from_row)
          .optional()?
        else {
          return Ok(None);
        };
        let refs = group_source_ids(conn, &raw.group_id)?;
        Ok(Some((raw, refs)))
      })
      .await?;

    row.map(|(raw, refs)| raw.into_group(refs)).transpose()
  }

  async fn require_group(
    &self,
    clause: &'static str,
    args: Vec<String>,
    what: String,
  ) -> CoreResult<Group> {
    self
      .load_group(clause, args)
      .await?
      .ok_or(cohort_core::Error::NotFound(what))
  }

  async fn group_row_exists(&self, clause: &'static str, args: Vec<String>) -> Result<bool> {
    let exists = self
      .conn
      .call(move |conn| {
        let sql = format!("SELECT EXISTS (SELECT 1 FROM groups WHERE {clause})");
        Ok(conn.query_row(&sql, params_from_iter(args.iter()), |r| r.get(0))?)
      })
      .await?;
    Ok(exists)
  }

  async fn store_group(&self, group: Group) -> Result<Group> {
    let (raw, refs) = RawGroup::from_group(group.clone());

    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        tx.execute(
          "INSERT INTO groups (
             group_id, group_type, slug, status, name, account_owner, course_id
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
           ON CONFLICT (group_id) DO UPDATE SET
             group_type    = excluded.group_type,
             slug          = excluded.slug,
             status        = excluded.status,
             name          = excluded.name,
             account_owner = excluded.account_owner,
             course_id     = excluded.course_id",
          params![
            raw.group_id,
            raw.group_type,
            raw.slug,
            raw.status,
            raw.name,
            raw.account_owner,
            raw.course_id,
          ],
        )?;
        tx.execute(
          "DELETE FROM group_source_ids WHERE group_id = ?1",
          params![raw.group_id],
        )?;
        for (source, source_id) in &refs {
          tx.execute(
            "INSERT INTO group_source_ids (group_id, source, source_id)
             VALUES (?1, ?2, ?3)",
            params![raw.group_id, source, source_id],
          )?;
        }
        tx.commit()?;
        Ok(())
      })
      .await?;

    debug!(group_id = %group.id, slug = %group.slug, "saved group");
    Ok(group)
  }

  async fn load_all_groups(&self) -> Result<Vec<Group>> {
    let rows = self
      .conn
      .call(|conn| {
        let sql = format!("SELECT {GROUP_COLUMNS} FROM groups ORDER BY slug");
        let mut stmt = conn.prepare(&sql)?;
        let raws = stmt
          .query_map([], RawGroup::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut rows = Vec::with_capacity(raws.len());
        for raw in raws {
          let refs = group_source_ids(conn, &raw.group_id)?;
          rows.push((raw, refs));
        }
        Ok(rows)
      })
      .await?;

    rows
      .into_iter()
      .map(|(raw, refs)| raw.into_group(refs))
      .collect()
  }

  // ── Group members ─────────────────────────────────────────────────────────

  async fn load_member(
    &self,
    clause: &'static str,
    args: Vec<String>,
  ) -> Result<Option<GroupMember>> {
    let row = self
      .conn
      .call(move |conn| {
        let sql = format!("SELECT {MEMBER_COLUMNS} FROM group_members WHERE {clause}");
        let Some(raw) = conn
          .query_row(&sql, params_from_iter(args.iter()), RawGroupMember::from_row)
          .optional()?
        else {
          return Ok(None);
        };
        let refs = member_source_ids(conn, &raw.group_member_id)?;
        Ok(Some((raw, refs)))
      })
      .await?;

    row.map(|(raw, refs)| raw.into_member(refs)).transpose()
  }

  async fn require_member(
    &self,
    clause: &'static str,
    args: Vec<String>,
    what: String,
  ) -> CoreResult<GroupMember> {
    self
      .load_member(clause, args)
      .await?
      .ok_or(cohort_core::Error::NotFound(what))
  }

  async fn member_row_exists(&self, clause: &'static str, args: Vec<String>) -> Result<bool> {
    let exists = self
      .conn
      .call(move |conn| {
        let sql = format!("SELECT EXISTS (SELECT 1 FROM group_members WHERE {clause})");
        Ok(conn.query_row(&sql, params_from_iter(args.iter()), |r| r.get(0))?)
      })
      .await?;
    Ok(exists)
  }

  async fn store_member(&self, member: GroupMember) -> Result<GroupMember> {
    let (raw, refs) = RawGroupMember::from_member(member.clone());

    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        tx.execute(
          "INSERT INTO group_members (
             group_member_id, group_id, member_id, member_type, status, name, email,
             organisation_name, account_owner, course_id, participant_id
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
           ON CONFLICT (group_member_id) DO UPDATE SET
             group_id          = excluded.group_id,
             member_id         = excluded.member_id,
             member_type       = excluded.member_type,
             status            = excluded.status,
             name              = excluded.name,
             email             = excluded.email,
             organisation_name = excluded.organisation_name,
             account_owner     = excluded.account_owner,
             course_id         = excluded.course_id,
             participant_id    = excluded.participant_id",
          params![
            raw.group_member_id,
            raw.group_id,
            raw.member_id,
            raw.member_type,
            raw.status,
            raw.name,
            raw.email,
            raw.organisation_name,
            raw.account_owner,
            raw.course_id,
            raw.participant_id,
          ],
        )?;
        tx.execute(
          "DELETE FROM group_member_source_ids WHERE group_member_id = ?1",
          params![raw.group_member_id],
        )?;
        for (source, source_id) in &refs {
          tx.execute(
            "INSERT INTO group_member_source_ids (group_member_id, group_id, source, source_id)
             VALUES (?1, ?2, ?3, ?4)",
            params![raw.group_member_id, raw.group_id, source, source_id],
          )?;
        }
        tx.commit()?;
        Ok(())
      })
      .await?;

    debug!(group_member_id = %member.id, group_id = %member.group_id, "saved group member");
    Ok(member)
  }

  async fn load_group_members(&self, group_id: GroupId) -> Result<Vec<GroupMember>> {
    let group_id = encode_uuid(group_id.as_uuid());
    let rows = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "SELECT {MEMBER_COLUMNS} FROM group_members WHERE group_id = ?1 ORDER BY email"
        );
        let mut stmt = conn.prepare(&sql)?;
        let raws = stmt
          .query_map(params![group_id], RawGroupMember::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut rows = Vec::with_capacity(raws.len());
        for raw in raws {
          let refs = member_source_ids(conn, &raw.group_member_id)?;
          rows.push((raw, refs));
        }
        Ok(rows)
      })
      .await?;

    rows
      .into_iter()
      .map(|(raw, refs)| raw.into_member(refs))
      .collect()
  }
}

fn group_source_ids(
  conn: &rusqlite::Connection,
  group_id: &str,
) -> rusqlite::Result<Vec<RawSourceId>> {
  let mut stmt = conn.prepare_cached(
    "SELECT source, source_id FROM group_source_ids WHERE group_id = ?1 ORDER BY source",
  )?;
  let rows = stmt.query_map(params![group_id], RawSourceId::from_row)?;
  rows.collect()
}

fn member_source_ids(
  conn: &rusqlite::Connection,
  group_member_id: &str,
) -> rusqlite::Result<Vec<RawSourceId>> {
  let mut stmt = conn.prepare_cached(
    "SELECT source, source_id FROM group_member_source_ids
     WHERE group_member_id = ?1 ORDER BY source",
  )?;
  let rows = stmt.query_map(params![group_member_id], RawSourceId::from_row)?;
  rows.collect()
}

// ─── GroupRepository impl ────────────────────────────────────────────────────

impl GroupRepository for SqliteStore {
  async fn group_by_id(&self, id: GroupId) -> CoreResult<Group> {
    let args = vec![encode_uuid(id.as_uuid())];
    self.require_group(GROUP_BY_ID, args, format!("group {id}")).await
  }

  async fn group_by_id_source_value(&self, value: IdSourceValue) -> CoreResult<Group> {
    let args = source_args(&value).to_vec();
    self.require_group(GROUP_BY_SOURCE, args, format!("group {value}")).await
  }

  async fn group_by_slug(&self, slug: GroupSlug) -> CoreResult<Group> {
    let args = vec![slug.to_string()];
    self.require_group(GROUP_BY_SLUG, args, format!("group {slug}")).await
  }

  async fn group_by_course_id(&self, course_id: CourseId) -> CoreResult<Group> {
    let args = vec![encode_uuid(course_id.as_uuid())];
    self
      .require_group(GROUP_BY_COURSE, args, format!("course group {course_id}"))
      .await
  }

  async fn save_group(&self, group: Group) -> CoreResult<Group> {
    Ok(self.store_group(group).await?)
  }

  async fn list_groups(&self) -> CoreResult<Vec<Group>> { Ok(self.load_all_groups().await?) }

  async fn group_exists_by_id(&self, id: GroupId) -> CoreResult<bool> {
    let args = vec![encode_uuid(id.as_uuid())];
    Ok(self.group_row_exists(GROUP_BY_ID, args).await?)
  }

  async fn group_exists_by_id_source_value(&self, value: IdSourceValue) -> CoreResult<bool> {
    let args = source_args(&value).to_vec();
    Ok(self.group_row_exists(GROUP_BY_SOURCE, args).await?)
  }

  async fn group_exists_by_slug(&self, slug: GroupSlug) -> CoreResult<bool> {
    Ok(self.group_row_exists(GROUP_BY_SLUG, vec![slug.to_string()]).await?)
  }

  async fn group_exists_by_course_id(&self, course_id: CourseId) -> CoreResult<bool> {
    let args = vec![encode_uuid(course_id.as_uuid())];
    Ok(self.group_row_exists(GROUP_BY_COURSE, args).await?)
  }
}

// ─── GroupMemberRepository impl ──────────────────────────────────────────────

impl GroupMemberRepository for SqliteStore {
  async fn member_by_id(&self, id: GroupMemberId) -> CoreResult<GroupMember> {
    let args = vec![encode_uuid(id.as_uuid())];
    self
      .require_member(MEMBER_BY_ID, args, format!("group member {id}"))
      .await
  }

  async fn member_by_id_source_value(
    &self,
    group_id: GroupId,
    value: IdSourceValue,
  ) -> CoreResult<GroupMember> {
    let [source, source_id] = source_args(&value);
    let args = vec![encode_uuid(group_id.as_uuid()), source, source_id];
    self
      .require_member(MEMBER_BY_SOURCE, args, format!("group member {value} in group {group_id}"))
      .await
  }

  async fn member_by_member_id(
    &self,
    group_id: GroupId,
    member_id: MemberId,
  ) -> CoreResult<GroupMember> {
    let args = vec![encode_uuid(group_id.as_uuid()), encode_uuid(member_id.as_uuid())];
    self
      .require_member(
        MEMBER_BY_MEMBER_ID,
        args,
        format!("member {member_id} in group {group_id}"),
      )
      .await
  }

  async fn member_by_participant_id(
    &self,
    participant_id: ParticipantId,
  ) -> CoreResult<GroupMember> {
    let args = vec![encode_uuid(participant_id.as_uuid())];
    self
      .require_member(MEMBER_BY_PARTICIPANT, args, format!("participant {participant_id}"))
      .await
  }

  async fn save_member(&self, member: GroupMember) -> CoreResult<GroupMember> {
    Ok(self.store_member(member).await?)
  }

  async fn list_members(&self, group_id: GroupId) -> CoreResult<Vec<GroupMember>> {
    Ok(self.load_group_members(group_id).await?)
  }

  async fn member_exists_by_id(&self, id: GroupMemberId) -> CoreResult<bool> {
    let args = vec![encode_uuid(id.as_uuid())];
    Ok(self.member_row_exists(MEMBER_BY_ID, args).await?)
  }

  async fn member_exists_by_id_source_value(
    &self,
    group_id: GroupId,
    value: IdSourceValue,
  ) -> CoreResult<bool> {
    let [source, source_id] = source_args(&value);
    let args = vec![encode_uuid(group_id.as_uuid()), source, source_id];
    Ok(self.member_row_exists(MEMBER_BY_SOURCE, args).await?)
  }

  async fn member_exists_by_member_id(
    &self,
    group_id: GroupId,
    member_id: MemberId,
  ) -> CoreResult<bool> {
    let args = vec![encode_uuid(group_id.as_uuid()), encode_uuid(member_id.as_uuid())];
    Ok(self.member_row_exists(MEMBER_BY_MEMBER_ID, args).await?)
  }

  async fn member_exists_by_participant_id(
    &self,
    participant_id: ParticipantId,
  ) -> CoreResult<bool> {
    let args = vec![encode_uuid(participant_id.as_uuid())];
    Ok(self.member_row_exists(MEMBER_BY_PARTICIPANT, args).await?)
  }
}
