//! Platform-side entities and the repository traits platform adapters
//! implement.
//!
//! Unlike the internal store, platforms differ in which lookups they can
//! serve, so every adapter declares its own find table. Lookups a platform
//! cannot answer directly are usually served by the linear scan in
//! [`crate::scan`].

use std::{
  collections::{BTreeMap, BTreeSet},
  future::Future,
  sync::Arc,
};

use futures_util::{FutureExt as _, future::BoxFuture};
use serde::{Deserialize, Serialize};

use crate::{
  Error, Result,
  dispatch::{self, CheckFn, CheckTable, DispatchTable, FindFn, FindTable},
  external_id::ExternalId,
  group::GroupStatus,
  group_member::GroupMemberStatus,
  ids::{Email, GroupName, GroupSlug, SourceId},
  selector::{
    GroupMemberSourceIdentifier, GroupMemberSourceSelector, GroupSourceIdentifier,
    GroupSourceSelector,
  },
  source::SourceTag,
};

// ─── Entities ────────────────────────────────────────────────────────────────

/// A group as one platform sees it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupSource {
  pub id:     SourceId,
  pub source: SourceTag,
  pub status: GroupStatus,
  pub name:   GroupName,
  pub slug:   GroupSlug,
}

impl GroupSource {
  pub fn external_id(&self) -> ExternalId { ExternalId::new(self.id.clone(), self.source) }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupSourceForCreate {
  pub source: SourceTag,
  pub status: GroupStatus,
  pub name:   GroupName,
  pub slug:   GroupSlug,
}

/// A membership as one platform sees it: a platform user in a platform group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupMemberSource {
  pub member_id: SourceId,
  pub group_id:  SourceId,
  pub source:    SourceTag,
  pub status:    GroupMemberStatus,
  pub name:      String,
  pub email:     Email,
}

impl GroupMemberSource {
  pub fn external_id(&self) -> ExternalId {
    ExternalId::new(self.member_id.clone(), self.source)
  }
}

/// The platform resolves (or invites) the user by email.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupMemberSourceForCreate {
  pub group_id: SourceId,
  pub source:   SourceTag,
  pub status:   GroupMemberStatus,
  pub name:     String,
  pub email:    Email,
}

// ─── Paging ──────────────────────────────────────────────────────────────────

/// A 1-based page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
  pub page:  u32,
  pub limit: u32,
}

impl PageRequest {
  pub fn first(limit: u32) -> Self { Self { page: 1, limit } }

  pub fn next(self) -> Self {
    Self {
      page: self.page + 1,
      ..self
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
  pub items:    Vec<T>,
  pub has_next: bool,
}

/// Reject an external id issued by a platform other than `expected`.
pub fn ensure_source(expected: SourceTag, ext: &ExternalId) -> Result<()> {
  if ext.source == expected {
    Ok(())
  } else {
    Err(Error::RequestInvalid(format!(
      "{ext} does not belong to the {expected} platform"
    )))
  }
}

// ─── Traits ──────────────────────────────────────────────────────────────────

pub type GroupSourceFindFn<R> = FindFn<R, GroupSourceSelector, GroupSource>;
pub type GroupSourceCheckFn<R> = CheckFn<R, GroupSourceSelector>;
pub type GroupMemberSourceFindFn<R> = FindFn<R, GroupMemberSourceSelector, GroupMemberSource>;
pub type GroupMemberSourceCheckFn<R> = CheckFn<R, GroupMemberSourceSelector>;

pub trait GroupSourceRepository: Send + Sync + Sized {
  /// The platform this repository talks to.
  fn source(&self) -> SourceTag;

  /// The lookups this platform supports.
  fn find_one_by() -> FindTable<Self, GroupSourceSelector, GroupSource>;

  /// Existence checks; by default one per finder, built on the finder.
  fn check_by() -> CheckTable<Self, GroupSourceSelector> {
    let finders = Self::find_one_by();
    finders.kinds().fold(
      DispatchTable::new(finders.repository()),
      |table, kind| table.with(kind, check_group_source::<Self> as GroupSourceCheckFn<Self>),
    )
  }

  fn find_one(&self, kind: GroupSourceIdentifier) -> Result<GroupSourceFindFn<Self>> {
    Self::find_one_by().get(kind)
  }

  fn check(&self, kind: GroupSourceIdentifier) -> Result<GroupSourceCheckFn<Self>> {
    Self::check_by().get(kind)
  }

  fn find(
    &self,
    selector: GroupSourceSelector,
  ) -> impl Future<Output = Result<GroupSource>> + Send + '_ {
    async move { dispatch::find_with(&Self::find_one_by(), self, selector).await }
  }

  fn exists(
    &self,
    selector: GroupSourceSelector,
  ) -> impl Future<Output = Result<bool>> + Send + '_ {
    async move { dispatch::check_with(&Self::check_by(), self, selector).await }
  }

  fn find_all(
    &self,
    page: PageRequest,
  ) -> impl Future<Output = Result<Page<GroupSource>>> + Send + '_;

  fn create(
    &self,
    group: GroupSourceForCreate,
  ) -> impl Future<Output = Result<GroupSource>> + Send + '_;

  fn update(&self, group: GroupSource)
  -> impl Future<Output = Result<GroupSource>> + Send + '_;

  /// What the platform would hold after `update(desired)`: `desired` as it
  /// reads back, with any field the platform cannot store left as in
  /// `current`. Every field is storable by default.
  fn representable(&self, current: &GroupSource, desired: GroupSource) -> GroupSource {
    let _ = current;
    desired
  }

  fn delete(&self, group: GroupSource) -> impl Future<Output = Result<()>> + Send + '_;
}

fn check_group_source<R: GroupSourceRepository>(
  repo: &R,
  selector: GroupSourceSelector,
) -> BoxFuture<'_, Result<bool>> {
  async move { dispatch::exists(repo.find(selector).await) }.boxed()
}

pub trait GroupMemberSourceRepository: Send + Sync + Sized {
  fn source(&self) -> SourceTag;

  fn find_one_by() -> FindTable<Self, GroupMemberSourceSelector, GroupMemberSource>;

  fn check_by() -> CheckTable<Self, GroupMemberSourceSelector> {
    let finders = Self::find_one_by();
    finders.kinds().fold(
      DispatchTable::new(finders.repository()),
      |table, kind| {
        table.with(kind, check_member_source::<Self> as GroupMemberSourceCheckFn<Self>)
      },
    )
  }

  fn find_one(
    &self,
    kind: GroupMemberSourceIdentifier,
  ) -> Result<GroupMemberSourceFindFn<Self>> {
    Self::find_one_by().get(kind)
  }

  fn check(&self, kind: GroupMemberSourceIdentifier) -> Result<GroupMemberSourceCheckFn<Self>> {
    Self::check_by().get(kind)
  }

  fn find(
    &self,
    selector: GroupMemberSourceSelector,
  ) -> impl Future<Output = Result<GroupMemberSource>> + Send + '_ {
    async move { dispatch::find_with(&Self::find_one_by(), self, selector).await }
  }

  fn exists(
    &self,
    selector: GroupMemberSourceSelector,
  ) -> impl Future<Output = Result<bool>> + Send + '_ {
    async move { dispatch::check_with(&Self::check_by(), self, selector).await }
  }

  /// One page of the members of the platform group `group_id`.
  fn find_all(
    &self,
    group_id: SourceId,
    page: PageRequest,
  ) -> impl Future<Output = Result<Page<GroupMemberSource>>> + Send + '_;

  fn create(
    &self,
    member: GroupMemberSourceForCreate,
  ) -> impl Future<Output = Result<GroupMemberSource>> + Send + '_;

  fn update(
    &self,
    member: GroupMemberSource,
  ) -> impl Future<Output = Result<GroupMemberSource>> + Send + '_;

  /// See [`GroupSourceRepository::representable`].
  fn representable(
    &self,
    current: &GroupMemberSource,
    desired: GroupMemberSource,
  ) -> GroupMemberSource {
    let _ = current;
    desired
  }

  fn delete(&self, member: GroupMemberSource) -> impl Future<Output = Result<()>> + Send + '_;
}

fn check_member_source<R: GroupMemberSourceRepository>(
  repo: &R,
  selector: GroupMemberSourceSelector,
) -> BoxFuture<'_, Result<bool>> {
  async move { dispatch::exists(repo.find(selector).await) }.boxed()
}

// ─── Registry ────────────────────────────────────────────────────────────────

/// Object-safe view of a [`GroupSourceRepository`], for the per-platform map.
pub trait DynGroupSourceRepository: Send + Sync {
  fn source(&self) -> SourceTag;

  fn find(&self, selector: GroupSourceSelector) -> BoxFuture<'_, Result<GroupSource>>;

  fn create(&self, group: GroupSourceForCreate) -> BoxFuture<'_, Result<GroupSource>>;

  fn update(&self, group: GroupSource) -> BoxFuture<'_, Result<GroupSource>>;

  fn representable(&self, current: &GroupSource, desired: GroupSource) -> GroupSource;

  fn delete(&self, group: GroupSource) -> BoxFuture<'_, Result<()>>;
}

/// Object-safe view of a [`GroupMemberSourceRepository`].
pub trait DynGroupMemberSourceRepository: Send + Sync {
  fn source(&self) -> SourceTag;

  fn find(
    &self,
    selector: GroupMemberSourceSelector,
  ) -> BoxFuture<'_, Result<GroupMemberSource>>;

  fn create(
    &self,
    member: GroupMemberSourceForCreate,
  ) -> BoxFuture<'_, Result<GroupMemberSource>>;

  fn update(&self, member: GroupMemberSource) -> BoxFuture<'_, Result<GroupMemberSource>>;

  fn representable(
    &self,
    current: &GroupMemberSource,
    desired: GroupMemberSource,
  ) -> GroupMemberSource;

  fn delete(&self, member: GroupMemberSource) -> BoxFuture<'_, Result<()>>;
}

struct Erased<R>(R);

impl<R: GroupSourceRepository> DynGroupSourceRepository for Erased<R> {
  fn source(&self) -> SourceTag { GroupSourceRepository::source(&self.0) }

  fn find(&self, selector: GroupSourceSelector) -> BoxFuture<'_, Result<GroupSource>> {
    GroupSourceRepository::find(&self.0, selector).boxed()
  }

  fn create(&self, group: GroupSourceForCreate) -> BoxFuture<'_, Result<GroupSource>> {
    GroupSourceRepository::create(&self.0, group).boxed()
  }

  fn update(&self, group: GroupSource) -> BoxFuture<'_, Result<GroupSource>> {
    GroupSourceRepository::update(&self.0, group).boxed()
  }

  fn representable(&self, current: &GroupSource, desired: GroupSource) -> GroupSource {
    GroupSourceRepository::representable(&self.0, current, desired)
  }

  fn delete(&self, group: GroupSource) -> BoxFuture<'_, Result<()>> {
    GroupSourceRepository::delete(&self.0, group).boxed()
  }
}

struct ErasedMembers<R>(R);

impl<R: GroupMemberSourceRepository> DynGroupMemberSourceRepository for ErasedMembers<R> {
  fn source(&self) -> SourceTag { GroupMemberSourceRepository::source(&self.0) }

  fn find(
    &self,
    selector: GroupMemberSourceSelector,
  ) -> BoxFuture<'_, Result<GroupMemberSource>> {
    GroupMemberSourceRepository::find(&self.0, selector).boxed()
  }

  fn create(
    &self,
    member: GroupMemberSourceForCreate,
  ) -> BoxFuture<'_, Result<GroupMemberSource>> {
    GroupMemberSourceRepository::create(&self.0, member).boxed()
  }

  fn update(&self, member: GroupMemberSource) -> BoxFuture<'_, Result<GroupMemberSource>> {
    GroupMemberSourceRepository::update(&self.0, member).boxed()
  }

  fn representable(
    &self,
    current: &GroupMemberSource,
    desired: GroupMemberSource,
  ) -> GroupMemberSource {
    GroupMemberSourceRepository::representable(&self.0, current, desired)
  }

  fn delete(&self, member: GroupMemberSource) -> BoxFuture<'_, Result<()>> {
    GroupMemberSourceRepository::delete(&self.0, member).boxed()
  }
}

/// Platform repositories keyed by the tag they serve.
#[derive(Clone, Default)]
pub struct SourceRegistry {
  groups:  BTreeMap<SourceTag, Arc<dyn DynGroupSourceRepository>>,
  members: BTreeMap<SourceTag, Arc<dyn DynGroupMemberSourceRepository>>,
}

impl SourceRegistry {
  pub fn new() -> Self { Self::default() }

  pub fn with_groups<R: GroupSourceRepository + 'static>(mut self, repo: R) -> Self {
    let source = GroupSourceRepository::source(&repo);
    self.groups.insert(source, Arc::new(Erased(repo)));
    self
  }

  pub fn with_members<R: GroupMemberSourceRepository + 'static>(mut self, repo: R) -> Self {
    let source = GroupMemberSourceRepository::source(&repo);
    self.members.insert(source, Arc::new(ErasedMembers(repo)));
    self
  }

  pub fn groups(&self, source: SourceTag) -> Result<&dyn DynGroupSourceRepository> {
    self.groups.get(&source).map(|r| r.as_ref()).ok_or_else(|| {
      Error::RequestInvalid(format!("no group repository registered for {source}"))
    })
  }

  pub fn members(&self, source: SourceTag) -> Result<&dyn DynGroupMemberSourceRepository> {
    self.members.get(&source).map(|r| r.as_ref()).ok_or_else(|| {
      Error::RequestInvalid(format!("no member repository registered for {source}"))
    })
  }

  /// Every tag with at least one registered family, in tag order.
  pub fn sources(&self) -> impl Iterator<Item = SourceTag> + use<> {
    let tags: BTreeSet<_> = self.groups.keys().chain(self.members.keys()).copied().collect();
    tags.into_iter()
  }
}

impl std::fmt::Debug for SourceRegistry {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("SourceRegistry")
      .field("groups", &self.groups.keys().collect::<Vec<_>>())
      .field("members", &self.members.keys().collect::<Vec<_>>())
      .finish()
  }
}
