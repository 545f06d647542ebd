//! HTTP adapters for the external platforms Cohort mirrors groups onto.
//!
//! Each platform module exposes one repository per entity family
//! ([`community::CommunityGroups`], [`community::CommunityMembers`], ...)
//! sharing a [`PlatformClient`]. Lookups a platform cannot serve directly go
//! through [`cohort_core::scan`].

pub mod community;
pub mod config;
pub mod error;
pub mod http;
pub mod micro_course;

pub use config::PlatformConfig;
pub use error::{Error, Result};
pub use http::PlatformClient;

use cohort_core::{
  selector::GroupMemberSourceSelector, source::SourceTag, source_repository::GroupMemberSource,
};

/// The scan predicate for the member lookups both platforms lack.
pub(crate) fn member_matches(
  selector: &GroupMemberSourceSelector,
  member: &GroupMemberSource,
) -> bool {
  match selector {
    GroupMemberSourceSelector::MemberId { group_id, member_id } => {
      &member.group_id == group_id && &member.member_id == member_id
    }
    GroupMemberSourceSelector::MemberEmail { group_id, email } => {
      &member.group_id == group_id && member.email.as_str().eq_ignore_ascii_case(email.as_str())
    }
  }
}

pub(crate) fn unexpected_selector(expected: &str, got: impl std::fmt::Display) -> cohort_core::Error {
  cohort_core::Error::RequestInvalid(format!("expected a {expected} selector, got {got}"))
}

/// Reject a create aimed at another platform.
pub(crate) fn ensure_platform(expected: SourceTag, got: SourceTag) -> cohort_core::Result<()> {
  if expected == got {
    Ok(())
  } else {
    Err(cohort_core::Error::RequestInvalid(format!(
      "{got} entity sent to the {expected} platform"
    )))
  }
}
