//! Community platform adapter.
//!
//! Groups can be fetched by id and searched by name server-side. Memberships
//! are only listed per group, so both member lookups scan.

use cohort_core::{
  dispatch::{DispatchTable, FindTable},
  group::GroupStatus,
  group_member::GroupMemberStatus,
  ids::{Email, GroupName, GroupSlug, SourceId},
  scan,
  selector::{
    GroupMemberSourceIdentifier, GroupMemberSourceSelector, GroupSourceIdentifier,
    GroupSourceSelector, Selector as _,
  },
  source::SourceTag,
  source_repository::{
    GroupMemberSource, GroupMemberSourceFindFn, GroupMemberSourceForCreate,
    GroupMemberSourceRepository, GroupSource, GroupSourceFindFn, GroupSourceForCreate,
    GroupSourceRepository, Page, PageRequest, SourceRegistry, ensure_source,
  },
};
use futures_util::{FutureExt as _, future::BoxFuture};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
  Error, PlatformClient, Result, ensure_platform, member_matches, unexpected_selector,
};

type CoreResult<T> = cohort_core::Result<T>;

const SOURCE: SourceTag = SourceTag::Community;

/// Register both community repositories under [`SourceTag::Community`].
pub fn register(registry: SourceRegistry, client: PlatformClient) -> SourceRegistry {
  registry
    .with_groups(CommunityGroups::new(client.clone()))
    .with_members(CommunityMembers::new(client))
}

// ─── Wire shapes ─────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct WireGroup {
  id:     String,
  name:   String,
  #[serde(default)]
  slug:   Option<String>,
  status: String,
}

#[derive(Debug, Serialize)]
struct WireGroupWrite<'a> {
  name:   &'a str,
  slug:   &'a str,
  status: &'static str,
}

#[derive(Debug, Deserialize)]
struct WireMember {
  id:     String,
  name:   String,
  email:  String,
  status: String,
}

#[derive(Debug, Serialize)]
struct WireMemberCreate<'a> {
  name:   &'a str,
  email:  &'a str,
  status: &'static str,
}

fn decode_group_status(status: &str) -> Result<GroupStatus> {
  match status {
    "pending" => Ok(GroupStatus::Pending),
    "active" => Ok(GroupStatus::Active),
    "archived" => Ok(GroupStatus::Closed),
    other => Err(Error::invalid("community group status", format!("{other:?}"))),
  }
}

fn encode_group_status(status: GroupStatus) -> &'static str {
  match status {
    GroupStatus::Pending => "pending",
    GroupStatus::Active => "active",
    GroupStatus::Closed => "archived",
  }
}

fn decode_member_status(status: &str) -> Result<GroupMemberStatus> {
  match status {
    "invited" => Ok(GroupMemberStatus::Pending),
    "active" => Ok(GroupMemberStatus::Active),
    "blocked" => Ok(GroupMemberStatus::Disabled),
    other => Err(Error::invalid("community member status", format!("{other:?}"))),
  }
}

fn encode_member_status(status: GroupMemberStatus) -> &'static str {
  match status {
    GroupMemberStatus::Pending => "invited",
    GroupMemberStatus::Active => "active",
    GroupMemberStatus::Disabled => "blocked",
  }
}

impl WireGroup {
  fn into_domain(self) -> Result<GroupSource> {
    let name = GroupName::new(self.name).map_err(|e| Error::invalid("community group name", e))?;
    let slug = match self.slug.filter(|s| !s.is_empty()) {
      Some(slug) => GroupSlug::new(slug),
      None => GroupSlug::from_name(&name),
    }
    .map_err(|e| Error::invalid("community group slug", e))?;

    Ok(GroupSource {
      id: SourceId::new(self.id).map_err(|e| Error::invalid("community group id", e))?,
      source: SOURCE,
      status: decode_group_status(&self.status)?,
      name,
      slug,
    })
  }
}

impl WireMember {
  fn into_domain(self, group_id: &SourceId) -> Result<GroupMemberSource> {
    if self.name.trim().is_empty() {
      return Err(Error::invalid("community member name", "blank"));
    }
    Ok(GroupMemberSource {
      member_id: SourceId::new(self.id).map_err(|e| Error::invalid("community member id", e))?,
      group_id:  group_id.clone(),
      source:    SOURCE,
      status:    decode_member_status(&self.status)?,
      name:      self.name,
      email:     Email::new(self.email).map_err(|e| Error::invalid("community member email", e))?,
    })
  }
}

// ─── Groups ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct CommunityGroups {
  client: PlatformClient,
}

impl CommunityGroups {
  pub fn new(client: PlatformClient) -> Self { Self { client } }

  fn by_id_source(&self, selector: GroupSourceSelector) -> BoxFuture<'_, CoreResult<GroupSource>> {
    async move {
      let ext = match selector {
        GroupSourceSelector::IdSource(ext) => ext,
        other => return Err(unexpected_selector("idSource", other)),
      };
      ensure_source(SOURCE, &ext)?;
      let group: WireGroup = self.client.get(&["groups", ext.id.as_str()], &[]).await?;
      Ok(group.into_domain()?)
    }
    .boxed()
  }

  fn by_name(&self, selector: GroupSourceSelector) -> BoxFuture<'_, CoreResult<GroupSource>> {
    async move {
      let name = match selector {
        GroupSourceSelector::Name(name) => name,
        other => return Err(unexpected_selector("name", other)),
      };
      // The search is fuzzy; only an exact name counts as a match.
      let hits: Vec<WireGroup> = self
        .client
        .get(&["groups"], &[("query", name.to_string())])
        .await?;
      let hit = hits
        .into_iter()
        .find(|g| g.name == name.as_str())
        .ok_or_else(|| cohort_core::Error::NotFound(format!("community group named {name:?}")))?;
      Ok(hit.into_domain()?)
    }
    .boxed()
  }
}

impl GroupSourceRepository for CommunityGroups {
  fn source(&self) -> SourceTag { SOURCE }

  fn find_one_by() -> FindTable<Self, GroupSourceSelector, GroupSource> {
    DispatchTable::new("community groups")
      .with(GroupSourceIdentifier::IdSource, Self::by_id_source as GroupSourceFindFn<Self>)
      .with(GroupSourceIdentifier::Name, Self::by_name)
  }

  async fn find_all(&self, page: PageRequest) -> CoreResult<Page<GroupSource>> {
    let groups: Vec<WireGroup> = self
      .client
      .get(&["groups"], &[
        ("page", page.page.to_string()),
        ("limit", page.limit.to_string()),
      ])
      .await?;
    // No total is reported; a full page means there may be another.
    let has_next = groups.len() >= page.limit as usize;
    let items = groups
      .into_iter()
      .map(WireGroup::into_domain)
      .collect::<Result<Vec<_>>>()?;
    Ok(Page { items, has_next })
  }

  async fn create(&self, group: GroupSourceForCreate) -> CoreResult<GroupSource> {
    ensure_platform(SOURCE, group.source)?;
    let body = WireGroupWrite {
      name:   group.name.as_str(),
      slug:   group.slug.as_str(),
      status: encode_group_status(group.status),
    };
    let created: WireGroup = self.client.post(&["groups"], &body).await?;
    Ok(created.into_domain()?)
  }

  async fn update(&self, group: GroupSource) -> CoreResult<GroupSource> {
    ensure_source(SOURCE, &group.external_id())?;
    let body = WireGroupWrite {
      name:   group.name.as_str(),
      slug:   group.slug.as_str(),
      status: encode_group_status(group.status),
    };
    let updated: WireGroup = self.client.put(&["groups", group.id.as_str()], &body).await?;
    Ok(updated.into_domain()?)
  }

  async fn delete(&self, group: GroupSource) -> CoreResult<()> {
    ensure_source(SOURCE, &group.external_id())?;
    Ok(self.client.delete(&["groups", group.id.as_str()]).await?)
  }
}

// ─── Members ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct CommunityMembers {
  client: PlatformClient,
}

impl CommunityMembers {
  pub fn new(client: PlatformClient) -> Self { Self { client } }

  fn by_scan(
    &self,
    selector: GroupMemberSourceSelector,
  ) -> BoxFuture<'_, CoreResult<GroupMemberSource>> {
    async move {
      let group_id = selector.group_id().clone();
      let label = format!("community members of {group_id} by {}", selector.kind());
      scan::find_one_from_all(
        &label,
        self.client.limits(),
        |page| GroupMemberSourceRepository::find_all(self, group_id.clone(), page),
        |member: &GroupMemberSource| member_matches(&selector, member),
      )
      .await
    }
    .boxed()
  }
}

impl GroupMemberSourceRepository for CommunityMembers {
  fn source(&self) -> SourceTag { SOURCE }

  fn find_one_by() -> FindTable<Self, GroupMemberSourceSelector, GroupMemberSource> {
    DispatchTable::new("community members")
      .with(
        GroupMemberSourceIdentifier::MemberId,
        Self::by_scan as GroupMemberSourceFindFn<Self>,
      )
      .with(GroupMemberSourceIdentifier::MemberEmail, Self::by_scan)
  }

  async fn find_all(
    &self,
    group_id: SourceId,
    page: PageRequest,
  ) -> CoreResult<Page<GroupMemberSource>> {
    let members: Vec<WireMember> = self
      .client
      .get(&["groups", group_id.as_str(), "members"], &[
        ("page", page.page.to_string()),
        ("limit", page.limit.to_string()),
      ])
      .await?;
    let has_next = members.len() >= page.limit as usize;
    let items = members
      .into_iter()
      .map(|m| m.into_domain(&group_id))
      .collect::<Result<Vec<_>>>()?;
    Ok(Page { items, has_next })
  }

  async fn create(&self, member: GroupMemberSourceForCreate) -> CoreResult<GroupMemberSource> {
    ensure_platform(SOURCE, member.source)?;
    let body = WireMemberCreate {
      name:   &member.name,
      email:  member.email.as_str(),
      status: encode_member_status(member.status),
    };
    let created: WireMember = self
      .client
      .post(&["groups", member.group_id.as_str(), "members"], &body)
      .await?;
    Ok(created.into_domain(&member.group_id)?)
  }

  /// Memberships carry nothing the community lets us change.
  async fn update(&self, member: GroupMemberSource) -> CoreResult<GroupMemberSource> {
    debug!(member_id = %member.member_id, "community membership update is a no-op");
    Ok(member)
  }

  fn representable(
    &self,
    current: &GroupMemberSource,
    _desired: GroupMemberSource,
  ) -> GroupMemberSource {
    current.clone()
  }

  async fn delete(&self, member: GroupMemberSource) -> CoreResult<()> {
    let path = ["groups", member.group_id.as_str(), "members", member.member_id.as_str()];
    Ok(self.client.delete(&path).await?)
  }
}
