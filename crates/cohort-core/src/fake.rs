//! In-memory repositories for the core tests.

use std::sync::{
  Arc, Mutex,
  atomic::{AtomicUsize, Ordering},
};

use futures_util::{FutureExt as _, future::BoxFuture};

use crate::{
  Error, Result,
  dispatch::{DispatchTable, FindTable},
  external_id::IdSourceValue,
  group::Group,
  group_member::GroupMember,
  ids::{CourseId, GroupId, GroupMemberId, GroupSlug, MemberId, ParticipantId, SourceId},
  repository::{GroupMemberRepository, GroupRepository},
  scan::{self, ScanLimits},
  selector::{
    GroupMemberSourceIdentifier, GroupMemberSourceSelector, GroupSourceIdentifier,
    GroupSourceSelector,
  },
  source::SourceTag,
  source_repository::{
    GroupMemberSource, GroupMemberSourceFindFn, GroupMemberSourceForCreate,
    GroupMemberSourceRepository, GroupSource, GroupSourceFindFn, GroupSourceForCreate,
    GroupSourceRepository, Page, PageRequest, ensure_source,
  },
};

// ─── Internal store ──────────────────────────────────────────────────────────

#[derive(Default)]
pub struct MemoryStore {
  groups:  Mutex<Vec<Group>>,
  members: Mutex<Vec<GroupMember>>,
  saves:   AtomicUsize,
}

impl MemoryStore {
  pub fn saves(&self) -> usize { self.saves.load(Ordering::SeqCst) }

  fn group_where(&self, what: String, pred: impl Fn(&Group) -> bool) -> Result<Group> {
    let groups = self.groups.lock().unwrap();
    groups
      .iter()
      .find(|g| pred(g))
      .cloned()
      .ok_or(Error::NotFound(what))
  }

  fn member_where(
    &self,
    what: String,
    pred: impl Fn(&GroupMember) -> bool,
  ) -> Result<GroupMember> {
    let members = self.members.lock().unwrap();
    members
      .iter()
      .find(|m| pred(m))
      .cloned()
      .ok_or(Error::NotFound(what))
  }
}

impl GroupRepository for MemoryStore {
  async fn group_by_id(&self, id: GroupId) -> Result<Group> {
    self.group_where(format!("group {id}"), |g| g.id == id)
  }

  async fn group_by_id_source_value(&self, value: IdSourceValue) -> Result<Group> {
    let ext = value.external_id();
    self.group_where(format!("group {value}"), |g| g.source_ids.contains(ext))
  }

  async fn group_by_slug(&self, slug: GroupSlug) -> Result<Group> {
    self.group_where(format!("group {slug}"), |g| g.slug == slug)
  }

  async fn group_by_course_id(&self, course_id: CourseId) -> Result<Group> {
    self.group_where(format!("course group {course_id}"), |g| {
      g.course_id() == Some(course_id)
    })
  }

  async fn save_group(&self, group: Group) -> Result<Group> {
    let mut groups = self.groups.lock().unwrap();
    let clash = groups.iter().filter(|g| g.id != group.id).any(|g| {
      g.slug == group.slug
        || (g.course_id().is_some() && g.course_id() == group.course_id())
        || group.source_ids.iter().any(|ext| g.source_ids.contains(&ext))
    });
    if clash {
      return Err(Error::Conflict(format!("group {}", group.slug)));
    }
    groups.retain(|g| g.id != group.id);
    groups.push(group.clone());
    self.saves.fetch_add(1, Ordering::SeqCst);
    Ok(group)
  }

  async fn list_groups(&self) -> Result<Vec<Group>> { Ok(self.groups.lock().unwrap().clone()) }
}

impl GroupMemberRepository for MemoryStore {
  async fn member_by_id(&self, id: GroupMemberId) -> Result<GroupMember> {
    self.member_where(format!("group member {id}"), |m| m.id == id)
  }

  async fn member_by_id_source_value(
    &self,
    group_id: GroupId,
    value: IdSourceValue,
  ) -> Result<GroupMember> {
    let ext = value.external_id();
    self.member_where(format!("group member {value}"), |m| {
      m.group_id == group_id && m.source_ids.contains(ext)
    })
  }

  async fn member_by_member_id(
    &self,
    group_id: GroupId,
    member_id: MemberId,
  ) -> Result<GroupMember> {
    self.member_where(format!("group member {member_id}"), |m| {
      m.group_id == group_id && m.member_id == member_id
    })
  }

  async fn member_by_participant_id(&self, participant_id: ParticipantId) -> Result<GroupMember> {
    self.member_where(format!("participant {participant_id}"), |m| {
      m.participant_id() == Some(participant_id)
    })
  }

  async fn save_member(&self, member: GroupMember) -> Result<GroupMember> {
    let mut members = self.members.lock().unwrap();
    let clash = members.iter().filter(|m| m.id != member.id).any(|m| {
      (m.group_id == member.group_id && m.member_id == member.member_id)
        || (m.participant_id().is_some() && m.participant_id() == member.participant_id())
    });
    if clash {
      return Err(Error::Conflict(format!("group member {}", member.member_id)));
    }
    members.retain(|m| m.id != member.id);
    members.push(member.clone());
    self.saves.fetch_add(1, Ordering::SeqCst);
    Ok(member)
  }

  async fn list_members(&self, group_id: GroupId) -> Result<Vec<GroupMember>> {
    let members = self.members.lock().unwrap();
    Ok(members.iter().filter(|m| m.group_id == group_id).cloned().collect())
  }
}

// ─── Platform ────────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct PlatformState {
  pub groups:  Vec<GroupSource>,
  pub members: Vec<GroupMemberSource>,
  pub writes:  usize,
  /// Accept updates without applying them.
  pub frozen:  bool,
  next_id:     u32,
}

impl PlatformState {
  fn next_id(&mut self) -> SourceId {
    self.next_id += 1;
    SourceId::new(format!("p{}", self.next_id)).unwrap()
  }
}

/// A platform that can look groups up by id and name, and members only by
/// scanning pages of `page_size`.
#[derive(Clone)]
pub struct MemoryPlatform {
  pub source: SourceTag,
  pub state:  Arc<Mutex<PlatformState>>,
  pub limits: ScanLimits,
}

impl MemoryPlatform {
  pub fn new(source: SourceTag) -> Self {
    Self {
      source,
      state: Arc::default(),
      limits: ScanLimits {
        page_size: 2,
        max_pages: 10,
      },
    }
  }

  fn group_by_id_source<'a>(
    &'a self,
    selector: GroupSourceSelector,
  ) -> BoxFuture<'a, Result<GroupSource>> {
    async move {
      let GroupSourceSelector::IdSource(ext) = selector else {
        return Err(Error::RequestInvalid("expected idSource".into()));
      };
      ensure_source(self.source, &ext)?;
      let state = self.state.lock().unwrap();
      state
        .groups
        .iter()
        .find(|g| g.id == ext.id)
        .cloned()
        .ok_or_else(|| Error::NotFound(ext.to_string()))
    }
    .boxed()
  }

  fn group_by_name<'a>(
    &'a self,
    selector: GroupSourceSelector,
  ) -> BoxFuture<'a, Result<GroupSource>> {
    async move {
      let GroupSourceSelector::Name(name) = selector else {
        return Err(Error::RequestInvalid("expected name".into()));
      };
      let state = self.state.lock().unwrap();
      state
        .groups
        .iter()
        .find(|g| g.name == name)
        .cloned()
        .ok_or_else(|| Error::NotFound(name.to_string()))
    }
    .boxed()
  }

  fn member_by_scan<'a>(
    &'a self,
    selector: GroupMemberSourceSelector,
  ) -> BoxFuture<'a, Result<GroupMemberSource>> {
    async move {
      let group_id = selector.group_id().clone();
      scan::find_one_from_all(
        "platform members",
        self.limits,
        |page| GroupMemberSourceRepository::find_all(self, group_id.clone(), page),
        |m: &GroupMemberSource| match &selector {
          GroupMemberSourceSelector::MemberId { member_id, .. } => &m.member_id == member_id,
          GroupMemberSourceSelector::MemberEmail { email, .. } => &m.email == email,
        },
      )
      .await
    }
    .boxed()
  }
}

impl GroupSourceRepository for MemoryPlatform {
  fn source(&self) -> SourceTag { self.source }

  fn find_one_by() -> FindTable<Self, GroupSourceSelector, GroupSource> {
    DispatchTable::new("memory platform groups")
      .with(
        GroupSourceIdentifier::IdSource,
        Self::group_by_id_source as GroupSourceFindFn<Self>,
      )
      .with(GroupSourceIdentifier::Name, Self::group_by_name)
  }

  async fn find_all(&self, page: PageRequest) -> Result<Page<GroupSource>> {
    let state = self.state.lock().unwrap();
    Ok(paginate(&state.groups, page))
  }

  async fn create(&self, group: GroupSourceForCreate) -> Result<GroupSource> {
    let mut state = self.state.lock().unwrap();
    let created = GroupSource {
      id:     state.next_id(),
      source: group.source,
      status: group.status,
      name:   group.name,
      slug:   group.slug,
    };
    state.groups.push(created.clone());
    state.writes += 1;
    Ok(created)
  }

  async fn update(&self, group: GroupSource) -> Result<GroupSource> {
    let mut state = self.state.lock().unwrap();
    let frozen = state.frozen;
    let slot = state
      .groups
      .iter_mut()
      .find(|g| g.id == group.id)
      .ok_or_else(|| Error::NotFound(group.id.to_string()))?;
    if frozen {
      return Ok(slot.clone());
    }
    *slot = group.clone();
    state.writes += 1;
    Ok(group)
  }

  async fn delete(&self, group: GroupSource) -> Result<()> {
    let mut state = self.state.lock().unwrap();
    state.groups.retain(|g| g.id != group.id);
    state.writes += 1;
    Ok(())
  }
}

impl GroupMemberSourceRepository for MemoryPlatform {
  fn source(&self) -> SourceTag { self.source }

  fn find_one_by() -> FindTable<Self, GroupMemberSourceSelector, GroupMemberSource> {
    DispatchTable::new("memory platform members")
      .with(
        GroupMemberSourceIdentifier::MemberId,
        Self::member_by_scan as GroupMemberSourceFindFn<Self>,
      )
      .with(GroupMemberSourceIdentifier::MemberEmail, Self::member_by_scan)
  }

  async fn find_all(
    &self,
    group_id: SourceId,
    page: PageRequest,
  ) -> Result<Page<GroupMemberSource>> {
    let state = self.state.lock().unwrap();
    let in_group: Vec<_> = state
      .members
      .iter()
      .filter(|m| m.group_id == group_id)
      .cloned()
      .collect();
    Ok(paginate(&in_group, page))
  }

  async fn create(&self, member: GroupMemberSourceForCreate) -> Result<GroupMemberSource> {
    let mut state = self.state.lock().unwrap();
    let created = GroupMemberSource {
      member_id: state.next_id(),
      group_id:  member.group_id,
      source:    member.source,
      status:    member.status,
      name:      member.name,
      email:     member.email,
    };
    state.members.push(created.clone());
    state.writes += 1;
    Ok(created)
  }

  async fn update(&self, member: GroupMemberSource) -> Result<GroupMemberSource> {
    let mut state = self.state.lock().unwrap();
    let frozen = state.frozen;
    let slot = state
      .members
      .iter_mut()
      .find(|m| m.group_id == member.group_id && m.member_id == member.member_id)
      .ok_or_else(|| Error::NotFound(member.member_id.to_string()))?;
    if frozen {
      return Ok(slot.clone());
    }
    *slot = member.clone();
    state.writes += 1;
    Ok(member)
  }

  async fn delete(&self, member: GroupMemberSource) -> Result<()> {
    let mut state = self.state.lock().unwrap();
    state
      .members
      .retain(|m| !(m.group_id == member.group_id && m.member_id == member.member_id));
    state.writes += 1;
    Ok(())
  }
}

fn paginate<T: Clone>(items: &[T], page: PageRequest) -> Page<T> {
  let start = ((page.page - 1) * page.limit) as usize;
  let end = (start + page.limit as usize).min(items.len());
  Page {
    items:    items.get(start..end).map(<[T]>::to_vec).unwrap_or_default(),
    has_next: end < items.len(),
  }
}
