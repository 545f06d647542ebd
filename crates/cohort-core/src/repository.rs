//! Internal store traits for groups and group members.
//!
//! A backend implements one method per identifier kind plus `save`; the
//! provided methods build the dispatch tables from those and route every
//! selector-based lookup through them. Backends with a cheaper existence
//! query override the `*_exists_by_*` methods; the defaults run the finder
//! and map not-found to `false`.

use std::future::Future;

use futures_util::{FutureExt as _, future::BoxFuture};

use crate::{
  Error, Result,
  dispatch::{self, CheckFn, CheckTable, DispatchTable, FindFn, FindTable},
  external_id::IdSourceValue,
  group::Group,
  group_member::GroupMember,
  ids::{CourseId, GroupId, GroupMemberId, GroupSlug, MemberId, ParticipantId},
  selector::{GroupIdentifier, GroupMemberIdentifier, GroupMemberSelector, GroupSelector, Selector},
};

pub type GroupFindFn<R> = FindFn<R, GroupSelector, Group>;
pub type GroupCheckFn<R> = CheckFn<R, GroupSelector>;
pub type GroupMemberFindFn<R> = FindFn<R, GroupMemberSelector, GroupMember>;
pub type GroupMemberCheckFn<R> = CheckFn<R, GroupMemberSelector>;

// ─── Groups ──────────────────────────────────────────────────────────────────

pub trait GroupRepository: Send + Sync + Sized {
  fn group_by_id(&self, id: GroupId) -> impl Future<Output = Result<Group>> + Send + '_;

  fn group_by_id_source_value(
    &self,
    value: IdSourceValue,
  ) -> impl Future<Output = Result<Group>> + Send + '_;

  fn group_by_slug(&self, slug: GroupSlug) -> impl Future<Output = Result<Group>> + Send + '_;

  /// Only ever returns a course group.
  fn group_by_course_id(
    &self,
    course_id: CourseId,
  ) -> impl Future<Output = Result<Group>> + Send + '_;

  /// Insert or replace by id. Unique-key collisions with another group are
  /// [`Error::Conflict`].
  fn save_group(&self, group: Group) -> impl Future<Output = Result<Group>> + Send + '_;

  fn list_groups(&self) -> impl Future<Output = Result<Vec<Group>>> + Send + '_;

  // ── Existence ─────────────────────────────────────────────────────────────

  fn group_exists_by_id(&self, id: GroupId) -> impl Future<Output = Result<bool>> + Send + '_ {
    async move { dispatch::exists(self.group_by_id(id).await) }
  }

  fn group_exists_by_id_source_value(
    &self,
    value: IdSourceValue,
  ) -> impl Future<Output = Result<bool>> + Send + '_ {
    async move { dispatch::exists(self.group_by_id_source_value(value).await) }
  }

  fn group_exists_by_slug(
    &self,
    slug: GroupSlug,
  ) -> impl Future<Output = Result<bool>> + Send + '_ {
    async move { dispatch::exists(self.group_by_slug(slug).await) }
  }

  fn group_exists_by_course_id(
    &self,
    course_id: CourseId,
  ) -> impl Future<Output = Result<bool>> + Send + '_ {
    async move { dispatch::exists(self.group_by_course_id(course_id).await) }
  }

  // ── Dispatch ──────────────────────────────────────────────────────────────

  fn group_finders() -> FindTable<Self, GroupSelector, Group> {
    DispatchTable::new("groups")
      .with(GroupIdentifier::Id, find_group_by_id::<Self> as GroupFindFn<Self>)
      .with(GroupIdentifier::IdSourceValue, find_group_by_id_source_value::<Self>)
      .with(GroupIdentifier::Slug, find_group_by_slug::<Self>)
      .with(GroupIdentifier::CourseId, find_group_by_course_id::<Self>)
  }

  fn group_checkers() -> CheckTable<Self, GroupSelector> {
    DispatchTable::new("groups")
      .with(GroupIdentifier::Id, check_group_by_id::<Self> as GroupCheckFn<Self>)
      .with(GroupIdentifier::IdSourceValue, check_group_by_id_source_value::<Self>)
      .with(GroupIdentifier::Slug, check_group_by_slug::<Self>)
      .with(GroupIdentifier::CourseId, check_group_by_course_id::<Self>)
  }

  fn group_finder(&self, kind: GroupIdentifier) -> Result<GroupFindFn<Self>> {
    Self::group_finders().get(kind)
  }

  fn group_checker(&self, kind: GroupIdentifier) -> Result<GroupCheckFn<Self>> {
    Self::group_checkers().get(kind)
  }

  fn find_group(
    &self,
    selector: GroupSelector,
  ) -> impl Future<Output = Result<Group>> + Send + '_ {
    async move { dispatch::find_with(&Self::group_finders(), self, selector).await }
  }

  fn group_exists(
    &self,
    selector: GroupSelector,
  ) -> impl Future<Output = Result<bool>> + Send + '_ {
    async move { dispatch::check_with(&Self::group_checkers(), self, selector).await }
  }
}

fn selector_mismatch(expected: impl std::fmt::Display, got: &impl Selector) -> Error {
  Error::RequestInvalid(format!(
    "{expected} lookup called with a {} selector",
    got.kind()
  ))
}

fn find_group_by_id<R: GroupRepository>(
  repo: &R,
  selector: GroupSelector,
) -> BoxFuture<'_, Result<Group>> {
  async move {
    match selector {
      GroupSelector::Id(id) => repo.group_by_id(id).await,
      other => Err(selector_mismatch(GroupIdentifier::Id, &other)),
    }
  }
  .boxed()
}

fn find_group_by_id_source_value<R: GroupRepository>(
  repo: &R,
  selector: GroupSelector,
) -> BoxFuture<'_, Result<Group>> {
  async move {
    match selector {
      GroupSelector::IdSourceValue(value) => repo.group_by_id_source_value(value).await,
      other => Err(selector_mismatch(GroupIdentifier::IdSourceValue, &other)),
    }
  }
  .boxed()
}

fn find_group_by_slug<R: GroupRepository>(
  repo: &R,
  selector: GroupSelector,
) -> BoxFuture<'_, Result<Group>> {
  async move {
    match selector {
      GroupSelector::Slug(slug) => repo.group_by_slug(slug).await,
      other => Err(selector_mismatch(GroupIdentifier::Slug, &other)),
    }
  }
  .boxed()
}

fn find_group_by_course_id<R: GroupRepository>(
  repo: &R,
  selector: GroupSelector,
) -> BoxFuture<'_, Result<Group>> {
  async move {
    match selector {
      GroupSelector::CourseId(id) => repo.group_by_course_id(id).await,
      other => Err(selector_mismatch(GroupIdentifier::CourseId, &other)),
    }
  }
  .boxed()
}

fn check_group_by_id<R: GroupRepository>(
  repo: &R,
  selector: GroupSelector,
) -> BoxFuture<'_, Result<bool>> {
  async move {
    match selector {
      GroupSelector::Id(id) => repo.group_exists_by_id(id).await,
      other => Err(selector_mismatch(GroupIdentifier::Id, &other)),
    }
  }
  .boxed()
}

fn check_group_by_id_source_value<R: GroupRepository>(
  repo: &R,
  selector: GroupSelector,
) -> BoxFuture<'_, Result<bool>> {
  async move {
    match selector {
      GroupSelector::IdSourceValue(value) => {
        repo.group_exists_by_id_source_value(value).await
      }
      other => Err(selector_mismatch(GroupIdentifier::IdSourceValue, &other)),
    }
  }
  .boxed()
}

fn check_group_by_slug<R: GroupRepository>(
  repo: &R,
  selector: GroupSelector,
) -> BoxFuture<'_, Result<bool>> {
  async move {
    match selector {
      GroupSelector::Slug(slug) => repo.group_exists_by_slug(slug).await,
      other => Err(selector_mismatch(GroupIdentifier::Slug, &other)),
    }
  }
  .boxed()
}

fn check_group_by_course_id<R: GroupRepository>(
  repo: &R,
  selector: GroupSelector,
) -> BoxFuture<'_, Result<bool>> {
  async move {
    match selector {
      GroupSelector::CourseId(id) => repo.group_exists_by_course_id(id).await,
      other => Err(selector_mismatch(GroupIdentifier::CourseId, &other)),
    }
  }
  .boxed()
}

// ─── Group members ───────────────────────────────────────────────────────────

pub trait GroupMemberRepository: Send + Sync + Sized {
  fn member_by_id(
    &self,
    id: GroupMemberId,
  ) -> impl Future<Output = Result<GroupMember>> + Send + '_;

  fn member_by_id_source_value(
    &self,
    group_id: GroupId,
    value: IdSourceValue,
  ) -> impl Future<Output = Result<GroupMember>> + Send + '_;

  fn member_by_member_id(
    &self,
    group_id: GroupId,
    member_id: MemberId,
  ) -> impl Future<Output = Result<GroupMember>> + Send + '_;

  /// Only ever returns a course membership.
  fn member_by_participant_id(
    &self,
    participant_id: ParticipantId,
  ) -> impl Future<Output = Result<GroupMember>> + Send + '_;

  /// Insert or replace by id. Unique-key collisions with another membership
  /// are [`Error::Conflict`]; an unknown `group_id` is [`Error::NotFound`].
  fn save_member(
    &self,
    member: GroupMember,
  ) -> impl Future<Output = Result<GroupMember>> + Send + '_;

  fn list_members(
    &self,
    group_id: GroupId,
  ) -> impl Future<Output = Result<Vec<GroupMember>>> + Send + '_;

  // ── Existence ─────────────────────────────────────────────────────────────

  fn member_exists_by_id(
    &self,
    id: GroupMemberId,
  ) -> impl Future<Output = Result<bool>> + Send + '_ {
    async move { dispatch::exists(self.member_by_id(id).await) }
  }

  fn member_exists_by_id_source_value(
    &self,
    group_id: GroupId,
    value: IdSourceValue,
  ) -> impl Future<Output = Result<bool>> + Send + '_ {
    async move { dispatch::exists(self.member_by_id_source_value(group_id, value).await) }
  }

  fn member_exists_by_member_id(
    &self,
    group_id: GroupId,
    member_id: MemberId,
  ) -> impl Future<Output = Result<bool>> + Send + '_ {
    async move { dispatch::exists(self.member_by_member_id(group_id, member_id).await) }
  }

  fn member_exists_by_participant_id(
    &self,
    participant_id: ParticipantId,
  ) -> impl Future<Output = Result<bool>> + Send + '_ {
    async move { dispatch::exists(self.member_by_participant_id(participant_id).await) }
  }

  // ── Dispatch ──────────────────────────────────────────────────────────────

  fn member_finders() -> FindTable<Self, GroupMemberSelector, GroupMember> {
    DispatchTable::new("group members")
      .with(
        GroupMemberIdentifier::Id,
        find_member_by_id::<Self> as GroupMemberFindFn<Self>,
      )
      .with(
        GroupMemberIdentifier::IdSourceValue,
        find_member_by_id_source_value::<Self>,
      )
      .with(GroupMemberIdentifier::MemberId, find_member_by_member_id::<Self>)
      .with(
        GroupMemberIdentifier::ParticipantId,
        find_member_by_participant_id::<Self>,
      )
  }

  fn member_checkers() -> CheckTable<Self, GroupMemberSelector> {
    DispatchTable::new("group members")
      .with(
        GroupMemberIdentifier::Id,
        check_member_by_id::<Self> as GroupMemberCheckFn<Self>,
      )
      .with(
        GroupMemberIdentifier::IdSourceValue,
        check_member_by_id_source_value::<Self>,
      )
      .with(GroupMemberIdentifier::MemberId, check_member_by_member_id::<Self>)
      .with(
        GroupMemberIdentifier::ParticipantId,
        check_member_by_participant_id::<Self>,
      )
  }

  fn member_finder(&self, kind: GroupMemberIdentifier) -> Result<GroupMemberFindFn<Self>> {
    Self::member_finders().get(kind)
  }

  fn member_checker(&self, kind: GroupMemberIdentifier) -> Result<GroupMemberCheckFn<Self>> {
    Self::member_checkers().get(kind)
  }

  fn find_member(
    &self,
    selector: GroupMemberSelector,
  ) -> impl Future<Output = Result<GroupMember>> + Send + '_ {
    async move { dispatch::find_with(&Self::member_finders(), self, selector).await }
  }

  fn member_exists(
    &self,
    selector: GroupMemberSelector,
  ) -> impl Future<Output = Result<bool>> + Send + '_ {
    async move { dispatch::check_with(&Self::member_checkers(), self, selector).await }
  }
}

fn find_member_by_id<R: GroupMemberRepository>(
  repo: &R,
  selector: GroupMemberSelector,
) -> BoxFuture<'_, Result<GroupMember>> {
  async move {
    match selector {
      GroupMemberSelector::Id(id) => repo.member_by_id(id).await,
      other => Err(selector_mismatch(GroupMemberIdentifier::Id, &other)),
    }
  }
  .boxed()
}

fn find_member_by_id_source_value<R: GroupMemberRepository>(
  repo: &R,
  selector: GroupMemberSelector,
) -> BoxFuture<'_, Result<GroupMember>> {
  async move {
    match selector {
      GroupMemberSelector::IdSourceValue { group_id, value } => {
        repo.member_by_id_source_value(group_id, value).await
      }
      other => Err(selector_mismatch(GroupMemberIdentifier::IdSourceValue, &other)),
    }
  }
  .boxed()
}

fn find_member_by_member_id<R: GroupMemberRepository>(
  repo: &R,
  selector: GroupMemberSelector,
) -> BoxFuture<'_, Result<GroupMember>> {
  async move {
    match selector {
      GroupMemberSelector::MemberId { group_id, member_id } => {
        repo.member_by_member_id(group_id, member_id).await
      }
      other => Err(selector_mismatch(GroupMemberIdentifier::MemberId, &other)),
    }
  }
  .boxed()
}

fn find_member_by_participant_id<R: GroupMemberRepository>(
  repo: &R,
  selector: GroupMemberSelector,
) -> BoxFuture<'_, Result<GroupMember>> {
  async move {
    match selector {
      GroupMemberSelector::ParticipantId(id) => repo.member_by_participant_id(id).await,
      other => Err(selector_mismatch(GroupMemberIdentifier::ParticipantId, &other)),
    }
  }
  .boxed()
}

fn check_member_by_id<R: GroupMemberRepository>(
  repo: &R,
  selector: GroupMemberSelector,
) -> BoxFuture<'_, Result<bool>> {
  async move {
    match selector {
      GroupMemberSelector::Id(id) => repo.member_exists_by_id(id).await,
      other => Err(selector_mismatch(GroupMemberIdentifier::Id, &other)),
    }
  }
  .boxed()
}

fn check_member_by_id_source_value<R: GroupMemberRepository>(
  repo: &R,
  selector: GroupMemberSelector,
) -> BoxFuture<'_, Result<bool>> {
  async move {
    match selector {
      GroupMemberSelector::IdSourceValue { group_id, value } => {
        repo.member_exists_by_id_source_value(group_id, value).await
      }
      other => Err(selector_mismatch(GroupMemberIdentifier::IdSourceValue, &other)),
    }
  }
  .boxed()
}

fn check_member_by_member_id<R: GroupMemberRepository>(
  repo: &R,
  selector: GroupMemberSelector,
) -> BoxFuture<'_, Result<bool>> {
  async move {
    match selector {
      GroupMemberSelector::MemberId { group_id, member_id } => {
        repo.member_exists_by_member_id(group_id, member_id).await
      }
      other => Err(selector_mismatch(GroupMemberIdentifier::MemberId, &other)),
    }
  }
  .boxed()
}

fn check_member_by_participant_id<R: GroupMemberRepository>(
  repo: &R,
  selector: GroupMemberSelector,
) -> BoxFuture<'_, Result<bool>> {
  async move {
    match selector {
      GroupMemberSelector::ParticipantId(id) => {
        repo.member_exists_by_participant_id(id).await
      }
      other => Err(selector_mismatch(GroupMemberIdentifier::ParticipantId, &other)),
    }
  }
  .boxed()
}
