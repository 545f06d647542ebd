//! Micro-course platform adapter.
//!
//! Only fetch-by-id is served directly; every other lookup scans the
//! paginated listings. Listings come wrapped in an `{items, totalCount}`
//! envelope. Usergroups carry no slug, so one is derived from the name.

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

const SOURCE: SourceTag = SourceTag::MicroCourse;

/// Register both micro-course repositories under [`SourceTag::MicroCourse`].
pub fn register(registry: SourceRegistry, client: PlatformClient) -> SourceRegistry {
  registry
    .with_groups(MicroCourseGroups::new(client.clone()))
    .with_members(MicroCourseMembers::new(client))
}

// ─── Wire shapes ─────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Envelope<T> {
  items:       Vec<T>,
  total_count: u64,
}

impl<T> Envelope<T> {
  fn has_next(&self, page: PageRequest) -> bool {
    self.total_count > u64::from(page.page) * u64::from(page.limit)
  }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireUsergroup {
  id:          String,
  name:        String,
  #[serde(default)]
  is_archived: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WireUsergroupWrite<'a> {
  name:        &'a str,
  is_archived: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireUser {
  id:         String,
  username:   String,
  #[serde(default)]
  first_name: String,
  #[serde(default)]
  last_name:  String,
  #[serde(default)]
  is_active:  bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WireUserCreate<'a> {
  username:   &'a str,
  first_name: &'a str,
  last_name:  &'a str,
  is_active:  bool,
}

impl WireUsergroup {
  fn into_domain(self) -> Result<GroupSource> {
    let name =
      GroupName::new(self.name).map_err(|e| Error::invalid("micro-course usergroup name", e))?;
    let slug =
      GroupSlug::from_name(&name).map_err(|e| Error::invalid("micro-course usergroup name", e))?;
    Ok(GroupSource {
      id: SourceId::new(self.id).map_err(|e| Error::invalid("micro-course usergroup id", e))?,
      source: SOURCE,
      // The platform only knows archived or not.
      status: if self.is_archived { GroupStatus::Closed } else { GroupStatus::Active },
      name,
      slug,
    })
  }
}

impl WireUser {
  fn into_domain(self, group_id: &SourceId) -> Result<GroupMemberSource> {
    let name = [self.first_name.trim(), self.last_name.trim()]
      .into_iter()
      .filter(|part| !part.is_empty())
      .collect::<Vec<_>>()
      .join(" ");
    if name.is_empty() {
      return Err(Error::invalid("micro-course user name", "blank"));
    }
    Ok(GroupMemberSource {
      member_id: SourceId::new(self.id).map_err(|e| Error::invalid("micro-course user id", e))?,
      group_id: group_id.clone(),
      source: SOURCE,
      status: if self.is_active {
        GroupMemberStatus::Active
      } else {
        GroupMemberStatus::Disabled
      },
      name,
      email: Email::new(self.username)
        .map_err(|e| Error::invalid("micro-course username", e))?,
    })
  }
}

/// First word is the first name; the rest, if any, the last name.
fn split_name(name: &str) -> (&str, &str) {
  let name = name.trim();
  name
    .split_once(char::is_whitespace)
    .map(|(first, last)| (first, last.trim()))
    .unwrap_or((name, ""))
}

fn page_query(page: PageRequest) -> [(&'static str, String); 2] {
  [("page", page.page.to_string()), ("pagesize", page.limit.to_string())]
}

// ─── Usergroups ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct MicroCourseGroups {
  client: PlatformClient,
}

impl MicroCourseGroups {
  pub fn new(client: PlatformClient) -> Self { Self { client } }

  fn by_id_source(&self, selector: GroupSourceSelector) -> BoxFuture<'_, CoreResult<GroupSource>> {
    async move {
      let ext = match selector {
        GroupSourceSelector::IdSource(ext) => ext,
        other => return Err(unexpected_selector("idSource", other)),
      };
      ensure_source(SOURCE, &ext)?;
      let group: WireUsergroup = self.client.get(&["usergroups", ext.id.as_str()], &[]).await?;
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
      scan::find_one_from_all(
        &format!("micro-course usergroups named {name:?}"),
        self.client.limits(),
        |page| GroupSourceRepository::find_all(self, page),
        |group: &GroupSource| group.name == name,
      )
      .await
    }
    .boxed()
  }
}

impl GroupSourceRepository for MicroCourseGroups {
  fn source(&self) -> SourceTag { SOURCE }

  fn find_one_by() -> FindTable<Self, GroupSourceSelector, GroupSource> {
    DispatchTable::new("micro-course usergroups")
      .with(GroupSourceIdentifier::IdSource, Self::by_id_source as GroupSourceFindFn<Self>)
      .with(GroupSourceIdentifier::Name, Self::by_name)
  }

  async fn find_all(&self, page: PageRequest) -> CoreResult<Page<GroupSource>> {
    let envelope: Envelope<WireUsergroup> =
      self.client.get(&["usergroups"], &page_query(page)).await?;
    let has_next = envelope.has_next(page);
    let items = envelope
      .items
      .into_iter()
      .map(WireUsergroup::into_domain)
      .collect::<Result<Vec<_>>>()?;
    Ok(Page { items, has_next })
  }

  async fn create(&self, group: GroupSourceForCreate) -> CoreResult<GroupSource> {
    ensure_platform(SOURCE, group.source)?;
    let body = WireUsergroupWrite {
      name:        group.name.as_str(),
      is_archived: group.status == GroupStatus::Closed,
    };
    let created: WireUsergroup = self.client.post(&["usergroups"], &body).await?;
    Ok(created.into_domain()?)
  }

  async fn update(&self, group: GroupSource) -> CoreResult<GroupSource> {
    ensure_source(SOURCE, &group.external_id())?;
    let body = WireUsergroupWrite {
      name:        group.name.as_str(),
      is_archived: group.status == GroupStatus::Closed,
    };
    let updated: WireUsergroup =
      self.client.put(&["usergroups", group.id.as_str()], &body).await?;
    Ok(updated.into_domain()?)
  }

  /// Only the name and the archived flag are stored; status and slug read
  /// back through them.
  fn representable(&self, _current: &GroupSource, desired: GroupSource) -> GroupSource {
    let stored = WireUsergroup {
      id:          desired.id.as_str().to_owned(),
      name:        desired.name.as_str().to_owned(),
      is_archived: desired.status == GroupStatus::Closed,
    };
    stored.into_domain().unwrap_or(desired)
  }

  async fn delete(&self, group: GroupSource) -> CoreResult<()> {
    ensure_source(SOURCE, &group.external_id())?;
    Ok(self.client.delete(&["usergroups", group.id.as_str()]).await?)
  }
}

// ─── Usergroup members ───────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct MicroCourseMembers {
  client: PlatformClient,
}

impl MicroCourseMembers {
  pub fn new(client: PlatformClient) -> Self { Self { client } }

  fn by_scan(
    &self,
    selector: GroupMemberSourceSelector,
  ) -> BoxFuture<'_, CoreResult<GroupMemberSource>> {
    async move {
      let group_id = selector.group_id().clone();
      let label = format!("micro-course users of {group_id} by {}", selector.kind());
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

impl GroupMemberSourceRepository for MicroCourseMembers {
  fn source(&self) -> SourceTag { SOURCE }

  fn find_one_by() -> FindTable<Self, GroupMemberSourceSelector, GroupMemberSource> {
    DispatchTable::new("micro-course usergroup members")
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
    let envelope: Envelope<WireUser> = self
      .client
      .get(&["usergroups", group_id.as_str(), "users"], &page_query(page))
      .await?;
    let has_next = envelope.has_next(page);
    let items = envelope
      .items
      .into_iter()
      .map(|u| u.into_domain(&group_id))
      .collect::<Result<Vec<_>>>()?;
    Ok(Page { items, has_next })
  }

  async fn create(&self, member: GroupMemberSourceForCreate) -> CoreResult<GroupMemberSource> {
    ensure_platform(SOURCE, member.source)?;
    let (first_name, last_name) = split_name(&member.name);
    let body = WireUserCreate {
      username: member.email.as_str(),
      first_name,
      last_name,
      is_active: member.status != GroupMemberStatus::Disabled,
    };
    let created: WireUser = self
      .client
      .post(&["usergroups", member.group_id.as_str(), "users"], &body)
      .await?;
    Ok(created.into_domain(&member.group_id)?)
  }

  /// A usergroup membership has no attributes of its own.
  async fn update(&self, member: GroupMemberSource) -> CoreResult<GroupMemberSource> {
    debug!(member_id = %member.member_id, "micro-course membership update is a no-op");
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
    let path = ["usergroups", member.group_id.as_str(), "users", member.member_id.as_str()];
    Ok(self.client.delete(&path).await?)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::PlatformConfig;

  #[test]
  fn splits_names_on_first_whitespace() {
    assert_eq!(split_name("Ada Lovelace"), ("Ada", "Lovelace"));
    assert_eq!(split_name(" Grace  Brewster Hopper "), ("Grace", "Brewster Hopper"));
    assert_eq!(split_name("Plato"), ("Plato", ""));
  }

  #[test]
  fn usergroups_store_neither_pending_nor_slug() {
    let client = PlatformClient::new(PlatformConfig::new("http://localhost/api")).unwrap();
    let groups = MicroCourseGroups::new(client);
    let current = GroupSource {
      id:     SourceId::new("7").unwrap(),
      source: SOURCE,
      status: GroupStatus::Active,
      name:   GroupName::new("Red Group").unwrap(),
      slug:   GroupSlug::new("red-group").unwrap(),
    };
    let desired = GroupSource {
      status: GroupStatus::Pending,
      slug: GroupSlug::new("red-2024").unwrap(),
      ..current.clone()
    };
    assert_eq!(groups.representable(&current, desired), current);

    let closed = GroupSource {
      status: GroupStatus::Closed,
      ..current.clone()
    };
    assert_eq!(groups.representable(&current, closed.clone()), closed);
  }

  #[test]
  fn envelope_reports_remaining_pages() {
    let envelope = Envelope::<()> {
      items:       vec![],
      total_count: 5,
    };
    assert!(envelope.has_next(PageRequest { page: 2, limit: 2 }));
    assert!(!envelope.has_next(PageRequest { page: 3, limit: 2 }));
  }
}
