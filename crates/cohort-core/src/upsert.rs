//! Create / update / upsert of groups and memberships from candidates.
//!
//! Each entry point derives a selector from the candidate and resolves it
//! through the repository's dispatch tables:
//!
//! - **create** checks first and fails with [`Error::Conflict`] if the
//!   entity exists; nothing is written in that case.
//! - **update** finds first (not-found propagates), merges the candidate
//!   onto the stored entity and writes only when a compared field changed.
//! - **upsert** finds, then takes the create path on not-found and the update
//!   path otherwise.
//!
//! Memberships resolve their parent group before anything else.

use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::{
  Error, Result,
  candidate::{GroupCandidate, GroupMemberCandidate, GroupMemberPatch},
  external_id::{ExternalId, SourceIds},
  group::{CourseDetails, Group, GroupVariant},
  group_member::{CourseMembership, GroupMember, GroupMemberVariant},
  ids::{AccountSlug, GroupId, GroupMemberId},
  outcome::{UpdateOutcome, UpsertOutcome},
  repository::{GroupMemberRepository, GroupRepository},
  selector::{GroupMemberSelector, GroupSelector},
  source::SourceTag,
};

// ─── Configuration ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UpsertConfig {
  /// The platform whose id identifies course-derived candidates.
  #[serde(default = "default_primary_source")]
  pub primary_source: SourceTag,
  /// Owner given to groups and memberships created from platform data,
  /// which carries no owner of its own.
  pub account_owner:  AccountSlug,
}

fn default_primary_source() -> SourceTag { SourceTag::Course }

impl UpsertConfig {
  pub fn new(account_owner: AccountSlug) -> Self {
    Self {
      primary_source: default_primary_source(),
      account_owner,
    }
  }
}

// ─── Requires-update ─────────────────────────────────────────────────────────

/// Fields compared when deciding whether a group write is needed. Identity,
/// variant data and relationships are never compared; merging preserves them.
pub fn group_requires_update(current: &Group, desired: &Group) -> bool {
  current.name != desired.name
    || current.slug != desired.slug
    || current.status != desired.status
    || current.account_owner != desired.account_owner
    || current.source_ids != desired.source_ids
}

pub fn group_member_requires_update(current: &GroupMember, desired: &GroupMember) -> bool {
  current.status != desired.status
    || current.name != desired.name
    || current.email != desired.email
    || current.organisation_name != desired.organisation_name
    || current.account_owner != desired.account_owner
    || current.source_ids != desired.source_ids
}

// ─── Upserter ────────────────────────────────────────────────────────────────

pub struct Upserter<R> {
  repo:   R,
  config: UpsertConfig,
}

impl<R> Upserter<R> {
  pub fn new(repo: R, config: UpsertConfig) -> Self { Self { repo, config } }

  pub fn repo(&self) -> &R { &self.repo }

  pub fn config(&self) -> &UpsertConfig { &self.config }

  /// The selector a group candidate is identified by: the candidate's own
  /// platform id, else its primary-source id, else its course id.
  pub fn group_selector(&self, candidate: &GroupCandidate) -> GroupSelector {
    match candidate {
      GroupCandidate::Source(source) => GroupSelector::source(&source.external_id()),
      GroupCandidate::Course(course) => {
        match course.source_ids.get(self.config.primary_source) {
          Some(ext) => GroupSelector::source(&ext),
          None => GroupSelector::CourseId(course.course_id),
        }
      }
    }
  }

  /// The selector a membership candidate is identified by, within `parent`.
  pub fn member_selector(
    &self,
    parent: &Group,
    candidate: &GroupMemberCandidate,
  ) -> GroupMemberSelector {
    let scoped = |ext: &ExternalId| GroupMemberSelector::IdSourceValue {
      group_id: parent.id,
      value:    ext.encode(),
    };
    match candidate {
      GroupMemberCandidate::Source(source) => scoped(&source.member.external_id()),
      GroupMemberCandidate::Participant(participant) => {
        match participant.source_ids.get(self.config.primary_source) {
          Some(ext) => scoped(&ext),
          None => GroupMemberSelector::ParticipantId(participant.participant_id),
        }
      }
    }
  }

  fn new_group(&self, candidate: GroupCandidate) -> Group {
    match candidate {
      GroupCandidate::Course(course) => Group {
        id:            GroupId::new(),
        source_ids:    course.source_ids,
        slug:          course.slug,
        status:        course.status,
        name:          course.name,
        account_owner: course.account_owner,
        variant:       GroupVariant::Course(CourseDetails {
          course_id: course.course_id,
        }),
      },
      GroupCandidate::Source(source) => Group {
        id:            GroupId::new(),
        source_ids:    SourceIds::single(source.external_id()),
        slug:          source.slug,
        status:        source.status,
        name:          source.name,
        account_owner: self.config.account_owner.clone(),
        variant:       GroupVariant::Standard,
      },
    }
  }

  fn new_member(&self, parent: &Group, candidate: GroupMemberCandidate) -> Result<GroupMember> {
    match candidate {
      GroupMemberCandidate::Participant(participant) => {
        if parent.course_id() != Some(participant.course_id) {
          return Err(Error::RequestInvalid(format!(
            "participant {} of course {} cannot join group {}",
            participant.participant_id, participant.course_id, parent.id
          )));
        }
        Ok(GroupMember {
          id:                GroupMemberId::new(),
          group_id:          parent.id,
          member_id:         participant.member_id,
          source_ids:        participant.source_ids,
          status:            participant.status,
          name:              participant.name,
          email:             participant.email,
          organisation_name: participant.organisation_name,
          account_owner:     participant.account_owner,
          variant:           GroupMemberVariant::Course(CourseMembership {
            course_id:      participant.course_id,
            participant_id: participant.participant_id,
          }),
        })
      }
      GroupMemberCandidate::Source(source) => Ok(GroupMember {
        id:                GroupMemberId::new(),
        group_id:          parent.id,
        member_id:         source.member_id,
        source_ids:        SourceIds::single(source.member.external_id()),
        status:            source.member.status,
        name:              source.member.name,
        email:             source.member.email,
        organisation_name: None,
        account_owner:     self.config.account_owner.clone(),
        variant:           GroupMemberVariant::Standard,
      }),
    }
  }
}

/// Overlay a group candidate onto the stored group.
fn merge_group(current: &Group, candidate: &GroupCandidate) -> Result<Group> {
  let mut desired = current.clone();
  match candidate {
    GroupCandidate::Course(course) => {
      if current.course_id() != Some(course.course_id) {
        return Err(Error::RequestInvalid(format!(
          "course {} does not match group {}",
          course.course_id, current.id
        )));
      }
      desired.name = course.name.clone();
      desired.slug = course.slug.clone();
      desired.status = course.status;
      desired.account_owner = course.account_owner.clone();
      desired.source_ids.merge(&course.source_ids);
    }
    // Platforms do not own the slug or the owner.
    GroupCandidate::Source(source) => {
      desired.name = source.name.clone();
      desired.status = source.status;
      desired.source_ids.set(source.external_id());
    }
  }
  Ok(desired)
}

/// Overlay a membership candidate onto the stored membership.
fn merge_member(current: &GroupMember, candidate: &GroupMemberCandidate) -> Result<GroupMember> {
  let mut desired = current.clone();
  match candidate {
    GroupMemberCandidate::Participant(participant) => {
      if current.participant_id() != Some(participant.participant_id) {
        return Err(Error::RequestInvalid(format!(
          "participant {} does not match group member {}",
          participant.participant_id, current.id
        )));
      }
      desired.status = participant.status;
      desired.name = participant.name.clone();
      desired.email = participant.email.clone();
      desired.organisation_name = participant.organisation_name.clone();
      desired.account_owner = participant.account_owner.clone();
      desired.source_ids.merge(&participant.source_ids);
    }
    // Member identity belongs to the members service; a platform only
    // reports the state of the membership.
    GroupMemberCandidate::Source(source) => {
      desired.status = source.member.status;
      desired.source_ids.set(source.member.external_id());
    }
  }
  Ok(desired)
}

/// Overlay a patch onto the stored membership.
fn patch_member(current: &GroupMember, patch: &GroupMemberPatch) -> Result<GroupMember> {
  let mut desired = current.clone();
  if let Some(status) = patch.status {
    desired.status = status;
  }
  if let Some(name) = &patch.name {
    if name.trim().is_empty() {
      return Err(Error::RequestInvalid("group member name is blank".into()));
    }
    desired.name = name.clone();
  }
  if let Some(organisation_name) = &patch.organisation_name {
    desired.organisation_name = Some(organisation_name.clone());
  }
  if let Some(account_owner) = &patch.account_owner {
    desired.account_owner = account_owner.clone();
  }
  Ok(desired)
}

// ─── Groups ──────────────────────────────────────────────────────────────────

impl<R: GroupRepository> Upserter<R> {
  pub async fn create_group(&self, candidate: GroupCandidate) -> Result<Group> {
    let selector = self.group_selector(&candidate);
    self.create_group_at(selector, candidate).await
  }

  pub async fn update_group(&self, candidate: GroupCandidate) -> Result<UpdateOutcome<Group>> {
    let selector = self.group_selector(&candidate);
    let current = self.repo.find_group(selector).await?;
    self.update_found_group(current, &candidate).await
  }

  pub async fn upsert_group(&self, candidate: GroupCandidate) -> Result<UpsertOutcome<Group>> {
    let selector = self.group_selector(&candidate);
    match self.repo.find_group(selector.clone()).await {
      Ok(current) => Ok(self.update_found_group(current, &candidate).await?.into()),
      Err(Error::NotFound(_)) => {
        debug!(%selector, "no stored group; creating");
        let created = self.create_group_at(selector, candidate).await?;
        Ok(UpsertOutcome::Created(created))
      }
      Err(e) => Err(e),
    }
  }

  async fn create_group_at(
    &self,
    selector: GroupSelector,
    candidate: GroupCandidate,
  ) -> Result<Group> {
    if self.repo.group_exists(selector.clone()).await? {
      warn!(%selector, "refusing to create a group that already exists");
      return Err(Error::Conflict(selector.to_string()));
    }

    let group = self.new_group(candidate);
    info!(group_id = %group.id, slug = %group.slug, %selector, "creating group");
    self.repo.save_group(group).await
  }

  async fn update_found_group(
    &self,
    current: Group,
    candidate: &GroupCandidate,
  ) -> Result<UpdateOutcome<Group>> {
    let desired = merge_group(&current, candidate)?;
    if !group_requires_update(&current, &desired) {
      info!(group_id = %current.id, "group does not need to be updated");
      return Ok(UpdateOutcome::NotRequired(current));
    }

    info!(group_id = %desired.id, "updating group");
    let saved = self.repo.save_group(desired).await?;
    Ok(UpdateOutcome::Updated(saved))
  }
}

// ─── Group members ───────────────────────────────────────────────────────────

impl<R: GroupRepository + GroupMemberRepository> Upserter<R> {
  /// The group a membership candidate belongs to: the course group for a
  /// participant, the group linked to the platform group for a platform
  /// membership.
  pub async fn parent_group(&self, candidate: &GroupMemberCandidate) -> Result<Group> {
    let selector = match candidate {
      GroupMemberCandidate::Participant(participant) => {
        GroupSelector::CourseId(participant.course_id)
      }
      GroupMemberCandidate::Source(source) => GroupSelector::source(&ExternalId::new(
        source.member.group_id.clone(),
        source.member.source,
      )),
    };
    self.repo.find_group(selector).await
  }

  pub async fn create_group_member(
    &self,
    candidate: GroupMemberCandidate,
  ) -> Result<GroupMember> {
    let parent = self.parent_group(&candidate).await?;
    let selector = self.member_selector(&parent, &candidate);
    self.create_member_at(&parent, selector, candidate).await
  }

  pub async fn update_group_member(
    &self,
    candidate: GroupMemberCandidate,
  ) -> Result<UpdateOutcome<GroupMember>> {
    let parent = self.parent_group(&candidate).await?;
    let selector = self.member_selector(&parent, &candidate);
    let current = self.repo.find_member(selector).await?;
    self.update_found_member(current, &candidate).await
  }

  pub async fn upsert_group_member(
    &self,
    candidate: GroupMemberCandidate,
  ) -> Result<UpsertOutcome<GroupMember>> {
    let parent = self.parent_group(&candidate).await?;
    let selector = self.member_selector(&parent, &candidate);
    match self.repo.find_member(selector.clone()).await {
      Ok(current) => Ok(self.update_found_member(current, &candidate).await?.into()),
      Err(Error::NotFound(_)) => {
        debug!(%selector, "no stored group member; creating");
        let created = self.create_member_at(&parent, selector, candidate).await?;
        Ok(UpsertOutcome::Created(created))
      }
      Err(e) => Err(e),
    }
  }

  async fn create_member_at(
    &self,
    parent: &Group,
    selector: GroupMemberSelector,
    candidate: GroupMemberCandidate,
  ) -> Result<GroupMember> {
    if self.repo.member_exists(selector.clone()).await? {
      warn!(%selector, "refusing to create a group member that already exists");
      return Err(Error::Conflict(selector.to_string()));
    }

    let member = self.new_member(parent, candidate)?;
    info!(
      group_id = %parent.id,
      group_member_id = %member.id,
      %selector,
      "creating group member"
    );
    self.repo.save_member(member).await
  }

  /// Apply `patch` to every membership of the group, one at a time in
  /// listing order. The first failure stops the run; memberships already
  /// written stay written.
  pub async fn update_group_members(
    &self,
    group_id: GroupId,
    patch: &GroupMemberPatch,
  ) -> Result<Vec<UpdateOutcome<GroupMember>>> {
    let group = self.repo.group_by_id(group_id).await?;
    let members = self.repo.list_members(group.id).await?;
    info!(group_id = %group.id, members = members.len(), "updating every group member");

    let mut outcomes = Vec::with_capacity(members.len());
    for current in members {
      let desired = patch_member(&current, patch)?;
      outcomes.push(self.write_member(current, desired).await?);
    }
    Ok(outcomes)
  }

  async fn update_found_member(
    &self,
    current: GroupMember,
    candidate: &GroupMemberCandidate,
  ) -> Result<UpdateOutcome<GroupMember>> {
    let desired = merge_member(&current, candidate)?;
    self.write_member(current, desired).await
  }

  async fn write_member(
    &self,
    current: GroupMember,
    desired: GroupMember,
  ) -> Result<UpdateOutcome<GroupMember>> {
    if !group_member_requires_update(&current, &desired) {
      info!(group_member_id = %current.id, "group member does not need to be updated");
      return Ok(UpdateOutcome::NotRequired(current));
    }

    info!(group_member_id = %desired.id, "updating group member");
    let saved = self.repo.save_member(desired).await?;
    Ok(UpdateOutcome::Updated(saved))
  }
}
