//! Identifier kinds and the typed selectors built from them.
//!
//! A selector is the `(kind, value)` pair a lookup is made with. Each family
//! has a closed enum of kinds and a selector enum whose variants carry the
//! value type that kind needs. [`FindRequest`] is the flat shape selectors
//! arrive in; every family parses it in exactly one place.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

use crate::{
  Error, Result,
  external_id::{self, ExternalId, IdSourceValue},
  ids::{CourseId, Email, GroupId, GroupMemberId, GroupName, GroupSlug, MemberId, ParticipantId, SourceId},
};

// ─── Traits ──────────────────────────────────────────────────────────────────

/// A closed enumeration of identifier kinds; the key of a dispatch table.
pub trait IdentifierKind:
  Copy + Ord + fmt::Debug + fmt::Display + Send + Sync + 'static
{
}

/// A typed lookup value that knows its own kind.
pub trait Selector: Clone + fmt::Display + Send + Sync + 'static {
  type Kind: IdentifierKind;

  fn kind(&self) -> Self::Kind;
}

// ─── Boundary shape ──────────────────────────────────────────────────────────

/// A lookup as it arrives from outside: strings only.
///
/// `parent_id` scopes child lookups (members within a group, members within
/// a platform group).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FindRequest {
  pub kind:      String,
  pub value:     String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub parent_id: Option<String>,
}

impl FindRequest {
  pub fn new(kind: impl Into<String>, value: impl Into<String>) -> Self {
    Self {
      kind:      kind.into(),
      value:     value.into(),
      parent_id: None,
    }
  }

  pub fn with_parent(mut self, parent_id: impl Into<String>) -> Self {
    self.parent_id = Some(parent_id.into());
    self
  }

  fn kind<K: FromStr>(&self, family: &str) -> Result<K> {
    K::from_str(&self.kind).map_err(|_| {
      Error::RequestInvalid(format!("unknown {family} identifier: {:?}", self.kind))
    })
  }

  fn parent<P: FromStr<Err = Error>>(&self, kind: impl fmt::Display) -> Result<P> {
    self
      .parent_id
      .as_deref()
      .ok_or_else(|| Error::RequestInvalid(format!("{kind} lookups need a parent id")))?
      .parse()
  }
}

macro_rules! identifier_kind {
  ($(#[$meta:meta])* $name:ident { $($variant:ident),+ $(,)? }) => {
    $(#[$meta])*
    #[derive(
      Debug,
      Clone,
      Copy,
      PartialEq,
      Eq,
      Hash,
      PartialOrd,
      Ord,
      Serialize,
      Deserialize,
      Display,
      EnumString,
      EnumIter,
      IntoStaticStr,
    )]
    #[serde(rename_all = "camelCase")]
    #[strum(serialize_all = "camelCase")]
    pub enum $name {
      $($variant),+
    }

    impl IdentifierKind for $name {}
  };
}

// ─── Group ───────────────────────────────────────────────────────────────────

identifier_kind!(
  /// The ways a group can be looked up.
  GroupIdentifier { Id, IdSourceValue, Slug, CourseId }
);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupSelector {
  Id(GroupId),
  IdSourceValue(IdSourceValue),
  Slug(GroupSlug),
  CourseId(CourseId),
}

impl GroupSelector {
  pub fn parse(request: &FindRequest) -> Result<Self> {
    let kind: GroupIdentifier = request.kind("group")?;
    let value = request.value.as_str();
    Ok(match kind {
      GroupIdentifier::Id => Self::Id(value.parse()?),
      GroupIdentifier::IdSourceValue => Self::IdSourceValue(value.parse()?),
      GroupIdentifier::Slug => Self::Slug(value.parse()?),
      GroupIdentifier::CourseId => Self::CourseId(value.parse()?),
    })
  }

  pub fn source(ext: &ExternalId) -> Self { Self::IdSourceValue(ext.encode()) }
}

impl Selector for GroupSelector {
  type Kind = GroupIdentifier;

  fn kind(&self) -> GroupIdentifier {
    match self {
      Self::Id(_) => GroupIdentifier::Id,
      Self::IdSourceValue(_) => GroupIdentifier::IdSourceValue,
      Self::Slug(_) => GroupIdentifier::Slug,
      Self::CourseId(_) => GroupIdentifier::CourseId,
    }
  }
}

impl fmt::Display for GroupSelector {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "group {}=", self.kind())?;
    match self {
      Self::Id(id) => write!(f, "{id}"),
      Self::IdSourceValue(value) => write!(f, "{value}"),
      Self::Slug(slug) => write!(f, "{slug}"),
      Self::CourseId(id) => write!(f, "{id}"),
    }
  }
}

// ─── GroupMember ─────────────────────────────────────────────────────────────

identifier_kind!(
  /// The ways a group membership can be looked up.
  GroupMemberIdentifier { Id, IdSourceValue, MemberId, ParticipantId }
);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupMemberSelector {
  Id(GroupMemberId),
  IdSourceValue { group_id: GroupId, value: IdSourceValue },
  MemberId { group_id: GroupId, member_id: MemberId },
  ParticipantId(ParticipantId),
}

impl GroupMemberSelector {
  pub fn parse(request: &FindRequest) -> Result<Self> {
    let kind: GroupMemberIdentifier = request.kind("group member")?;
    let value = request.value.as_str();
    Ok(match kind {
      GroupMemberIdentifier::Id => Self::Id(value.parse()?),
      GroupMemberIdentifier::IdSourceValue => Self::IdSourceValue {
        group_id: request.parent(kind)?,
        value:    value.parse()?,
      },
      GroupMemberIdentifier::MemberId => Self::MemberId {
        group_id:  request.parent(kind)?,
        member_id: value.parse()?,
      },
      GroupMemberIdentifier::ParticipantId => Self::ParticipantId(value.parse()?),
    })
  }

  /// The parent group the lookup is scoped to, when it is scoped.
  pub fn group_id(&self) -> Option<GroupId> {
    match self {
      Self::IdSourceValue { group_id, .. } | Self::MemberId { group_id, .. } => {
        Some(*group_id)
      }
      Self::Id(_) | Self::ParticipantId(_) => None,
    }
  }
}

impl Selector for GroupMemberSelector {
  type Kind = GroupMemberIdentifier;

  fn kind(&self) -> GroupMemberIdentifier {
    match self {
      Self::Id(_) => GroupMemberIdentifier::Id,
      Self::IdSourceValue { .. } => GroupMemberIdentifier::IdSourceValue,
      Self::MemberId { .. } => GroupMemberIdentifier::MemberId,
      Self::ParticipantId(_) => GroupMemberIdentifier::ParticipantId,
    }
  }
}

impl fmt::Display for GroupMemberSelector {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if let Some(group_id) = self.group_id() {
      write!(f, "group {group_id} ")?;
    }
    write!(f, "member {}=", self.kind())?;
    match self {
      Self::Id(id) => write!(f, "{id}"),
      Self::IdSourceValue { value, .. } => write!(f, "{value}"),
      Self::MemberId { member_id, .. } => write!(f, "{member_id}"),
      Self::ParticipantId(id) => write!(f, "{id}"),
    }
  }
}

// ─── GroupSource ─────────────────────────────────────────────────────────────

identifier_kind!(
  /// The ways a platform group can be looked up.
  GroupSourceIdentifier { IdSource, Name }
);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupSourceSelector {
  IdSource(ExternalId),
  Name(GroupName),
}

impl GroupSourceSelector {
  pub fn parse(request: &FindRequest) -> Result<Self> {
    let kind: GroupSourceIdentifier = request.kind("group source")?;
    let value = request.value.as_str();
    Ok(match kind {
      GroupSourceIdentifier::IdSource => Self::IdSource(external_id::decode(value)?),
      GroupSourceIdentifier::Name => Self::Name(value.parse()?),
    })
  }
}

impl Selector for GroupSourceSelector {
  type Kind = GroupSourceIdentifier;

  fn kind(&self) -> GroupSourceIdentifier {
    match self {
      Self::IdSource(_) => GroupSourceIdentifier::IdSource,
      Self::Name(_) => GroupSourceIdentifier::Name,
    }
  }
}

impl fmt::Display for GroupSourceSelector {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "group source {}=", self.kind())?;
    match self {
      Self::IdSource(ext) => write!(f, "{ext}"),
      Self::Name(name) => write!(f, "{name}"),
    }
  }
}

// ─── GroupMemberSource ───────────────────────────────────────────────────────

identifier_kind!(
  /// The ways a platform membership can be looked up. Always scoped to the
  /// platform's group.
  GroupMemberSourceIdentifier { MemberId, MemberEmail }
);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupMemberSourceSelector {
  MemberId { group_id: SourceId, member_id: SourceId },
  MemberEmail { group_id: SourceId, email: Email },
}

impl GroupMemberSourceSelector {
  pub fn parse(request: &FindRequest) -> Result<Self> {
    let kind: GroupMemberSourceIdentifier = request.kind("group member source")?;
    let group_id: SourceId = request.parent(kind)?;
    let value = request.value.as_str();
    Ok(match kind {
      GroupMemberSourceIdentifier::MemberId => Self::MemberId {
        group_id,
        member_id: value.parse()?,
      },
      GroupMemberSourceIdentifier::MemberEmail => Self::MemberEmail {
        group_id,
        email: value.parse()?,
      },
    })
  }

  pub fn group_id(&self) -> &SourceId {
    match self {
      Self::MemberId { group_id, .. } | Self::MemberEmail { group_id, .. } => group_id,
    }
  }
}

impl Selector for GroupMemberSourceSelector {
  type Kind = GroupMemberSourceIdentifier;

  fn kind(&self) -> GroupMemberSourceIdentifier {
    match self {
      Self::MemberId { .. } => GroupMemberSourceIdentifier::MemberId,
      Self::MemberEmail { .. } => GroupMemberSourceIdentifier::MemberEmail,
    }
  }
}

impl fmt::Display for GroupMemberSourceSelector {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "group source {} member {}=", self.group_id(), self.kind())?;
    match self {
      Self::MemberId { member_id, .. } => write!(f, "{member_id}"),
      Self::MemberEmail { email, .. } => write!(f, "{email}"),
    }
  }
}

#[cfg(test)]
mod tests {
  use strum::IntoEnumIterator;

  use super::*;
  use crate::source::SourceTag;

  #[test]
  fn kind_names_are_camel_case() {
    let names: Vec<&str> = GroupIdentifier::iter().map(Into::into).collect();
    assert_eq!(names, ["id", "idSourceValue", "slug", "courseId"]);
    let names: Vec<&str> = GroupMemberIdentifier::iter().map(Into::into).collect();
    assert_eq!(names, ["id", "idSourceValue", "memberId", "participantId"]);
  }

  #[test]
  fn parses_each_group_kind() {
    let id = GroupId::new();
    assert_eq!(
      GroupSelector::parse(&FindRequest::new("id", id.to_string())).unwrap(),
      GroupSelector::Id(id)
    );

    let selector =
      GroupSelector::parse(&FindRequest::new("idSourceValue", "COMMUNITY#abc123"))
        .unwrap();
    let GroupSelector::IdSourceValue(value) = &selector else {
      panic!("wrong variant: {selector:?}");
    };
    assert_eq!(value.external_id().source, SourceTag::Community);
    assert_eq!(selector.to_string(), "group idSourceValue=COMMUNITY#abc123");

    assert!(matches!(
      GroupSelector::parse(&FindRequest::new("slug", "brown-group")).unwrap(),
      GroupSelector::Slug(_)
    ));
  }

  #[test]
  fn unknown_kind_and_bad_value_are_request_errors() {
    for request in [
      FindRequest::new("email", "ada@example.org"),
      FindRequest::new("slug", "Not A Slug"),
      FindRequest::new("courseId", "123"),
      FindRequest::new("idSourceValue", "abc123"),
    ] {
      assert!(
        matches!(GroupSelector::parse(&request), Err(Error::RequestInvalid(_))),
        "{request:?} should be rejected"
      );
    }
  }

  #[test]
  fn scoped_member_kinds_need_a_parent() {
    let member_id = MemberId::new();
    let request = FindRequest::new("memberId", member_id.to_string());
    assert!(matches!(
      GroupMemberSelector::parse(&request),
      Err(Error::RequestInvalid(_))
    ));

    let group_id = GroupId::new();
    let selector =
      GroupMemberSelector::parse(&request.with_parent(group_id.to_string())).unwrap();
    assert_eq!(selector, GroupMemberSelector::MemberId { group_id, member_id });
    assert_eq!(selector.group_id(), Some(group_id));
  }

  #[test]
  fn member_source_selectors_are_scoped() {
    let request = FindRequest::new("memberEmail", "ada@example.org").with_parent("g-1");
    let selector = GroupMemberSourceSelector::parse(&request).unwrap();
    assert_eq!(selector.group_id().as_str(), "g-1");
    assert_eq!(selector.kind(), GroupMemberSourceIdentifier::MemberEmail);

    let request = FindRequest::new("memberEmail", "ada@example.org");
    assert!(GroupMemberSourceSelector::parse(&request).is_err());
  }
}
