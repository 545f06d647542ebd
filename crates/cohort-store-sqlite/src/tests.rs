//! Integration tests for `SqliteStore` against an in-memory database.

use cohort_core::{
  Error,
  candidate::{CourseCandidate, GroupCandidate, GroupMemberCandidate, ParticipantCandidate},
  external_id::{ExternalId, SourceIds},
  group::{CourseDetails, Group, GroupStatus, GroupVariant},
  group_member::{CourseMembership, GroupMember, GroupMemberStatus, GroupMemberVariant},
  ids::{
    AccountSlug, CourseId, Email, GroupId, GroupMemberId, GroupName, GroupSlug, MemberId,
    ParticipantId, SourceId,
  },
  outcome::UpsertOutcome,
  repository::{GroupMemberRepository, GroupRepository},
  selector::{GroupMemberSelector, GroupSelector},
  source::SourceTag,
  upsert::{UpsertConfig, Upserter},
};

use crate::SqliteStore;

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn ext(source: SourceTag, raw: &str) -> ExternalId {
  ExternalId::new(SourceId::new(raw).unwrap(), source)
}

fn standard_group(slug: &str) -> Group {
  Group {
    id:            GroupId::new(),
    source_ids:    SourceIds::new(),
    slug:          GroupSlug::new(slug).unwrap(),
    status:        GroupStatus::Active,
    name:          GroupName::new("Reading Circle").unwrap(),
    account_owner: AccountSlug::new("acme").unwrap(),
    variant:       GroupVariant::Standard,
  }
}

fn course_group(slug: &str, course_id: CourseId) -> Group {
  Group {
    variant: GroupVariant::Course(CourseDetails { course_id }),
    ..standard_group(slug)
  }
}

fn member_of(group: &Group, email: &str) -> GroupMember {
  GroupMember {
    id:                GroupMemberId::new(),
    group_id:          group.id,
    member_id:         MemberId::new(),
    source_ids:        SourceIds::new(),
    status:            GroupMemberStatus::Pending,
    name:              "Grace Hopper".into(),
    email:             Email::new(email).unwrap(),
    organisation_name: Some("Navy".into()),
    account_owner:     AccountSlug::new("acme").unwrap(),
    variant:           GroupMemberVariant::Standard,
  }
}

// ─── Groups ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn save_and_find_group_by_every_identifier() {
  let s = store().await;
  let course_id = CourseId::new();
  let mut group = course_group("intro-to-rust", course_id);
  group.source_ids.set(ext(SourceTag::Community, "abc123"));
  group.source_ids.set(ext(SourceTag::Course, "a0B5g00000XyZ"));
  s.save_group(group.clone()).await.unwrap();

  let selectors = [
    GroupSelector::Id(group.id),
    GroupSelector::source(&ext(SourceTag::Community, "abc123")),
    GroupSelector::source(&ext(SourceTag::Course, "a0B5g00000XyZ")),
    GroupSelector::Slug(group.slug.clone()),
    GroupSelector::CourseId(course_id),
  ];
  for selector in selectors {
    let found = s.find_group(selector.clone()).await.unwrap();
    assert_eq!(found, group, "{selector}");
    assert!(s.group_exists(selector).await.unwrap());
  }
}

#[tokio::test]
async fn missing_group_is_not_found() {
  let s = store().await;
  let err = s.group_by_slug(GroupSlug::new("nope").unwrap()).await.unwrap_err();
  assert!(err.is_not_found());
  assert!(!s.group_exists_by_id(GroupId::new()).await.unwrap());
  assert!(
    !s.group_exists_by_id_source_value(ext(SourceTag::Community, "x").encode())
      .await
      .unwrap()
  );
}

#[tokio::test]
async fn course_id_lookup_ignores_standard_groups() {
  let s = store().await;
  s.save_group(standard_group("plain")).await.unwrap();
  let err = s.group_by_course_id(CourseId::new()).await.unwrap_err();
  assert!(matches!(err, Error::NotFound(_)));
}

#[tokio::test]
async fn save_replaces_fields_and_source_ids() {
  let s = store().await;
  let mut group = standard_group("reading-circle");
  group.source_ids.set(ext(SourceTag::Community, "old"));
  s.save_group(group.clone()).await.unwrap();

  group.status = GroupStatus::Closed;
  group.source_ids.remove(SourceTag::Community);
  group.source_ids.set(ext(SourceTag::MicroCourse, "42"));
  s.save_group(group.clone()).await.unwrap();

  let found = s.group_by_id(group.id).await.unwrap();
  assert_eq!(found.status, GroupStatus::Closed);
  assert_eq!(found.source_ids, group.source_ids);
  assert!(
    !s.group_exists_by_id_source_value(ext(SourceTag::Community, "old").encode())
      .await
      .unwrap()
  );
  assert_eq!(s.list_groups().await.unwrap().len(), 1);
}

#[tokio::test]
async fn unique_keys_conflict_across_groups() {
  let s = store().await;
  let mut first = standard_group("taken");
  first.source_ids.set(ext(SourceTag::Community, "abc"));
  s.save_group(first).await.unwrap();

  let err = s.save_group(standard_group("taken")).await.unwrap_err();
  assert!(matches!(err, Error::Conflict(_)), "{err}");

  let mut second = standard_group("other");
  second.source_ids.set(ext(SourceTag::Community, "abc"));
  let err = s.save_group(second.clone()).await.unwrap_err();
  assert!(matches!(err, Error::Conflict(_)), "{err}");

  // The failed save is rolled back as a whole.
  assert!(!s.group_exists_by_id(second.id).await.unwrap());
}

#[tokio::test]
async fn list_groups_is_ordered_by_slug() {
  let s = store().await;
  for slug in ["charlie", "alpha", "bravo"] {
    s.save_group(standard_group(slug)).await.unwrap();
  }
  let slugs: Vec<_> = s
    .list_groups()
    .await
    .unwrap()
    .into_iter()
    .map(|g| g.slug.to_string())
    .collect();
  assert_eq!(slugs, ["alpha", "bravo", "charlie"]);
}

#[tokio::test]
async fn malformed_row_is_structure_invalid() {
  let s = store().await;
  let id = GroupId::new().to_string();
  s.connection()
    .call(move |conn| {
      conn.execute(
        "INSERT INTO groups (group_id, group_type, slug, status, name, account_owner)
         VALUES (?1, 'course', 'broken', 'active', 'Broken', 'acme')",
        [id],
      )?;
      Ok(())
    })
    .await
    .unwrap();

  let err = s
    .group_by_slug(GroupSlug::new("broken").unwrap())
    .await
    .unwrap_err();
  assert!(matches!(err, Error::StructureInvalid(_)), "{err}");
}

// ─── Group members ───────────────────────────────────────────────────────────

#[tokio::test]
async fn member_requires_existing_group() {
  let s = store().await;
  let orphan = member_of(&standard_group("ghost"), "grace@example.org");
  let err = s.save_member(orphan).await.unwrap_err();
  assert!(err.is_not_found(), "{err}");
}

#[tokio::test]
async fn save_and_find_member_by_every_identifier() {
  let s = store().await;
  let course_id = CourseId::new();
  let group = course_group("intro-to-rust", course_id);
  s.save_group(group.clone()).await.unwrap();

  let participant_id = ParticipantId::new();
  let mut member = member_of(&group, "grace@example.org");
  member.variant = GroupMemberVariant::Course(CourseMembership { course_id, participant_id });
  member.source_ids.set(ext(SourceTag::Community, "m-1"));
  s.save_member(member.clone()).await.unwrap();

  let selectors = [
    GroupMemberSelector::Id(member.id),
    GroupMemberSelector::IdSourceValue {
      group_id: group.id,
      value:    ext(SourceTag::Community, "m-1").encode(),
    },
    GroupMemberSelector::MemberId {
      group_id:  group.id,
      member_id: member.member_id,
    },
    GroupMemberSelector::ParticipantId(participant_id),
  ];
  for selector in selectors {
    let found = s.find_member(selector.clone()).await.unwrap();
    assert_eq!(found, member, "{selector}");
    assert!(s.member_exists(selector).await.unwrap());
  }
}

#[tokio::test]
async fn member_platform_ids_are_scoped_per_group() {
  let s = store().await;
  let a = standard_group("group-a");
  let b = standard_group("group-b");
  s.save_group(a.clone()).await.unwrap();
  s.save_group(b.clone()).await.unwrap();

  let mut in_a = member_of(&a, "grace@example.org");
  in_a.source_ids.set(ext(SourceTag::MicroCourse, "7"));
  let mut in_b = member_of(&b, "grace@example.org");
  in_b.source_ids.set(ext(SourceTag::MicroCourse, "7"));
  s.save_member(in_a.clone()).await.unwrap();
  s.save_member(in_b.clone()).await.unwrap();

  let value = ext(SourceTag::MicroCourse, "7").encode();
  let found = s.member_by_id_source_value(b.id, value.clone()).await.unwrap();
  assert_eq!(found.id, in_b.id);

  let mut clash = member_of(&a, "other@example.org");
  clash.source_ids.set(ext(SourceTag::MicroCourse, "7"));
  let err = s.save_member(clash).await.unwrap_err();
  assert!(matches!(err, Error::Conflict(_)), "{err}");
}

#[tokio::test]
async fn one_membership_per_member_per_group() {
  let s = store().await;
  let group = standard_group("group-a");
  s.save_group(group.clone()).await.unwrap();

  let member = member_of(&group, "grace@example.org");
  s.save_member(member.clone()).await.unwrap();

  let duplicate = GroupMember {
    id: GroupMemberId::new(),
    ..member.clone()
  };
  let err = s.save_member(duplicate).await.unwrap_err();
  assert!(matches!(err, Error::Conflict(_)), "{err}");

  let listed = s.list_members(group.id).await.unwrap();
  assert_eq!(listed, vec![member]);
}

// ─── Reconciliation against the real store ───────────────────────────────────

#[tokio::test]
async fn upsert_course_and_participant_round_trip() {
  let upserter = Upserter::new(
    store().await,
    UpsertConfig::new(AccountSlug::new("apf").unwrap()),
  );
  let course_id = CourseId::new();
  let course = GroupCandidate::Course(CourseCandidate {
    course_id,
    slug: GroupSlug::new("intro-to-rust").unwrap(),
    name: GroupName::new("Intro to Rust").unwrap(),
    status: GroupStatus::Active,
    account_owner: AccountSlug::new("acme").unwrap(),
    source_ids: SourceIds::single(ext(SourceTag::Course, "a0B5g00000XyZ")),
  });

  let created = upserter.upsert_group(course.clone()).await.unwrap();
  assert!(matches!(created, UpsertOutcome::Created(_)));
  let again = upserter.upsert_group(course).await.unwrap();
  assert!(matches!(again, UpsertOutcome::NotRequired(_)));

  let participant = GroupMemberCandidate::Participant(ParticipantCandidate {
    participant_id: ParticipantId::new(),
    course_id,
    member_id: MemberId::new(),
    status: GroupMemberStatus::Active,
    name: "Ada Lovelace".into(),
    email: Email::new("ada@example.org").unwrap(),
    organisation_name: None,
    account_owner: AccountSlug::new("acme").unwrap(),
    source_ids: SourceIds::new(),
  });
  let member = upserter
    .upsert_group_member(participant.clone())
    .await
    .unwrap()
    .into_inner();
  assert_eq!(member.group_id, created.into_inner().id);
  let again = upserter.upsert_group_member(participant).await.unwrap();
  assert!(matches!(again, UpsertOutcome::NotRequired(_)));
}
