//! Mirror internal groups and memberships onto platforms.
//!
//! Writes go to one platform at a time, in order, and are not rolled back:
//! a platform create whose internal link-back fails leaves the platform copy
//! in place, and the error is returned.

use tracing::{info, warn};

use crate::{
  Error, Result,
  external_id::ExternalId,
  group::Group,
  group_member::GroupMember,
  ids::{GroupId, GroupMemberId},
  outcome::UpsertOutcome,
  repository::{GroupMemberRepository, GroupRepository},
  selector::{GroupMemberSourceSelector, GroupSourceSelector},
  source::SourceTag,
  source_repository::{
    GroupMemberSource, GroupMemberSourceForCreate, GroupSource, GroupSourceForCreate,
    SourceRegistry,
  },
};

pub fn group_source_requires_update(current: &GroupSource, desired: &GroupSource) -> bool {
  current.name != desired.name || current.slug != desired.slug || current.status != desired.status
}

pub fn group_member_source_requires_update(
  current: &GroupMemberSource,
  desired: &GroupMemberSource,
) -> bool {
  current.status != desired.status || current.name != desired.name
}

#[derive(Debug, Clone)]
pub struct SourceSync {
  registry: SourceRegistry,
}

impl SourceSync {
  pub fn new(registry: SourceRegistry) -> Self { Self { registry } }

  pub fn registry(&self) -> &SourceRegistry { &self.registry }

  /// Bring the `source` copy of `group` in line with it, creating the copy
  /// (and recording its id on the group) when the group has none yet.
  pub async fn sync_group<R: GroupRepository>(
    &self,
    repo: &R,
    group: &Group,
    source: SourceTag,
  ) -> Result<UpsertOutcome<GroupSource>> {
    let platform = self.registry.groups(source)?;

    let Some(ext) = group.source_ids.get(source) else {
      let created = platform
        .create(GroupSourceForCreate {
          source,
          status: group.status,
          name: group.name.clone(),
          slug: group.slug.clone(),
        })
        .await?;
      info!(group_id = %group.id, source_id = %created.id, %source, "created group at platform");

      link_group(repo, group.id, created.external_id()).await?;
      return Ok(UpsertOutcome::Created(created));
    };

    let current = platform.find(GroupSourceSelector::IdSource(ext)).await?;
    let desired = platform.representable(&current, GroupSource {
      status: group.status,
      name: group.name.clone(),
      slug: group.slug.clone(),
      ..current.clone()
    });
    if !group_source_requires_update(&current, &desired) {
      info!(group_id = %group.id, %source, "group source does not need to be updated");
      return Ok(UpsertOutcome::NotRequired(current));
    }

    let updated = platform.update(desired).await?;
    if !group_source_requires_update(&current, &updated) {
      warn!(
        group_id = %group.id,
        %source,
        "platform accepted the group update but changed nothing"
      );
      return Ok(UpsertOutcome::NotRequired(updated));
    }
    info!(group_id = %group.id, source_id = %updated.id, %source, "updated group at platform");
    Ok(UpsertOutcome::Updated(updated))
  }

  /// Bring the `source` copy of `member` in line with it. The member's group
  /// must already exist at the platform. A platform membership found by
  /// email is linked to `member` before it is compared.
  pub async fn sync_group_member<R: GroupMemberRepository>(
    &self,
    repo: &R,
    member: &GroupMember,
    group: &Group,
    source: SourceTag,
  ) -> Result<UpsertOutcome<GroupMemberSource>> {
    let selector = self.member_source_selector(member, group, source)?;
    let platform = self.registry.members(source)?;

    let current = match platform.find(selector.clone()).await {
      Ok(current) => current,
      Err(Error::NotFound(_)) => {
        let created = platform
          .create(GroupMemberSourceForCreate {
            group_id: selector.group_id().clone(),
            source,
            status: member.status,
            name: member.name.clone(),
            email: member.email.clone(),
          })
          .await?;
        info!(
          group_member_id = %member.id,
          source_id = %created.member_id,
          %source,
          "created group member at platform"
        );

        link_member(repo, member.id, created.external_id()).await?;
        return Ok(UpsertOutcome::Created(created));
      }
      Err(e) => return Err(e),
    };

    if member.source_ids.get(source).is_none() {
      info!(
        group_member_id = %member.id,
        source_id = %current.member_id,
        %source,
        "linking existing platform group member"
      );
      link_member(repo, member.id, current.external_id()).await?;
    }

    let desired = platform.representable(&current, GroupMemberSource {
      status: member.status,
      name: member.name.clone(),
      ..current.clone()
    });
    if !group_member_source_requires_update(&current, &desired) {
      info!(group_member_id = %member.id, %source, "group member source does not need to be updated");
      return Ok(UpsertOutcome::NotRequired(current));
    }

    let updated = platform.update(desired).await?;
    if !group_member_source_requires_update(&current, &updated) {
      warn!(
        group_member_id = %member.id,
        %source,
        "platform accepted the group member update but changed nothing"
      );
      return Ok(UpsertOutcome::NotRequired(updated));
    }
    info!(group_member_id = %member.id, %source, "updated group member at platform");
    Ok(UpsertOutcome::Updated(updated))
  }

  /// Remove the `source` copy of `member` and drop the member's reference to
  /// it.
  pub async fn remove_group_member<R: GroupMemberRepository>(
    &self,
    repo: &R,
    member: &GroupMember,
    group: &Group,
    source: SourceTag,
  ) -> Result<GroupMemberSource> {
    let selector = self.member_source_selector(member, group, source)?;
    let platform = self.registry.members(source)?;

    let current = platform.find(selector).await?;
    platform.delete(current.clone()).await?;
    info!(group_member_id = %member.id, source_id = %current.member_id, %source, "removed group member at platform");

    let mut stored = repo.member_by_id(member.id).await?;
    if stored.source_ids.remove(source).is_some() {
      repo.save_member(stored).await?;
    }
    Ok(current)
  }

  /// By platform member id when the membership has one, else by email.
  fn member_source_selector(
    &self,
    member: &GroupMember,
    group: &Group,
    source: SourceTag,
  ) -> Result<GroupMemberSourceSelector> {
    if member.group_id != group.id {
      return Err(Error::RequestInvalid(format!(
        "group member {} does not belong to group {}",
        member.id, group.id
      )));
    }
    let Some(group_ext) = group.source_ids.get(source) else {
      warn!(group_id = %group.id, %source, "group has not been synced to platform");
      return Err(Error::RequestInvalid(format!(
        "group {} has no {source} id; sync the group first",
        group.id
      )));
    };

    Ok(match member.source_ids.get(source) {
      Some(ext) => GroupMemberSourceSelector::MemberId {
        group_id:  group_ext.id,
        member_id: ext.id,
      },
      None => GroupMemberSourceSelector::MemberEmail {
        group_id: group_ext.id,
        email:    member.email.clone(),
      },
    })
  }
}

/// Record `ext` on the stored group. Re-read first: the caller's copy may be
/// stale after the platform round trip.
async fn link_group<R: GroupRepository>(repo: &R, id: GroupId, ext: ExternalId) -> Result<Group> {
  let mut group = repo.group_by_id(id).await?;
  group.source_ids.set(ext);
  repo.save_group(group).await
}

async fn link_member<R: GroupMemberRepository>(
  repo: &R,
  id: GroupMemberId,
  ext: ExternalId,
) -> Result<GroupMember> {
  let mut member = repo.member_by_id(id).await?;
  member.source_ids.set(ext);
  repo.save_member(member).await
}
