//! Dispatch tables: identifier kind → finder function.
//!
//! Every repository, internal or platform, exposes its lookups as a table
//! keyed by its family's identifier kind. Callers never branch on the kind
//! themselves; they ask the table for the finder and call it. A kind missing
//! from a table is an [`Error::UnsupportedIdentifier`], never a silent
//! fallback.

use std::{collections::BTreeMap, fmt};

use futures_util::future::BoxFuture;

use crate::{
  Error, Result,
  selector::{IdentifierKind, Selector},
};

/// A lookup that yields the entity or [`Error::NotFound`].
pub type FindFn<R, S, T> = for<'a> fn(&'a R, S) -> BoxFuture<'a, Result<T>>;

/// A lookup that yields whether the entity exists.
pub type CheckFn<R, S> = for<'a> fn(&'a R, S) -> BoxFuture<'a, Result<bool>>;

pub type FindTable<R, S, T> = DispatchTable<<S as Selector>::Kind, FindFn<R, S, T>>;

pub type CheckTable<R, S> = DispatchTable<<S as Selector>::Kind, CheckFn<R, S>>;

#[derive(Clone)]
pub struct DispatchTable<K, F> {
  repository: &'static str,
  entries:    BTreeMap<K, F>,
}

impl<K: IdentifierKind, F: Copy> DispatchTable<K, F> {
  /// An empty table; `repository` names the owner in error messages.
  pub fn new(repository: &'static str) -> Self {
    Self {
      repository,
      entries: BTreeMap::new(),
    }
  }

  pub fn with(mut self, kind: K, f: F) -> Self {
    self.entries.insert(kind, f);
    self
  }

  pub fn get(&self, kind: K) -> Result<F> {
    self
      .entries
      .get(&kind)
      .copied()
      .ok_or_else(|| Error::UnsupportedIdentifier {
        repository: self.repository,
        kind:       kind.to_string(),
      })
  }

  pub fn supports(&self, kind: K) -> bool { self.entries.contains_key(&kind) }

  pub fn kinds(&self) -> impl Iterator<Item = K> + '_ {
    self.entries.keys().copied()
  }

  pub fn repository(&self) -> &'static str { self.repository }
}

impl<K: IdentifierKind, F> fmt::Debug for DispatchTable<K, F> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("DispatchTable")
      .field("repository", &self.repository)
      .field("kinds", &self.entries.keys().collect::<Vec<_>>())
      .finish()
  }
}

/// Resolve `selector.kind()` in `table` and run the finder.
pub async fn find_with<R, S, T>(
  table: &FindTable<R, S, T>,
  repo: &R,
  selector: S,
) -> Result<T>
where
  S: Selector,
{
  let finder = table.get(selector.kind())?;
  tracing::debug!(repository = table.repository(), %selector, "find");
  finder(repo, selector).await
}

/// Resolve `selector.kind()` in `table` and run the checker.
pub async fn check_with<R, S>(
  table: &CheckTable<R, S>,
  repo: &R,
  selector: S,
) -> Result<bool>
where
  S: Selector,
{
  let checker = table.get(selector.kind())?;
  tracing::debug!(repository = table.repository(), %selector, "check");
  checker(repo, selector).await
}

/// Turn a not-found into `false`, for checkers built on top of finders.
pub fn exists<T>(found: Result<T>) -> Result<bool> {
  match found {
    Ok(_) => Ok(true),
    Err(Error::NotFound(_)) => Ok(false),
    Err(e) => Err(e),
  }
}

#[cfg(test)]
mod tests {
  use futures_util::FutureExt as _;

  use super::*;
  use crate::selector::{GroupIdentifier, GroupSelector};

  struct Names;

  fn by_slug<'a>(_: &'a Names, selector: GroupSelector) -> BoxFuture<'a, Result<String>> {
    async move {
      match selector {
        GroupSelector::Slug(slug) => Ok(slug.to_string()),
        other => Err(Error::NotFound(other.to_string())),
      }
    }
    .boxed()
  }

  fn table() -> FindTable<Names, GroupSelector, String> {
    DispatchTable::new("names").with(GroupIdentifier::Slug, by_slug as FindFn<_, _, _>)
  }

  #[tokio::test]
  async fn dispatches_on_kind() {
    let selector = GroupSelector::Slug("brown-group".parse().unwrap());
    let found = find_with(&table(), &Names, selector).await.unwrap();
    assert_eq!(found, "brown-group");
  }

  #[tokio::test]
  async fn missing_kind_is_unsupported() {
    let selector = GroupSelector::CourseId(Default::default());
    let err = find_with(&table(), &Names, selector).await.unwrap_err();
    assert!(matches!(
      err,
      Error::UnsupportedIdentifier { repository: "names", .. }
    ));
    assert!(!table().supports(GroupIdentifier::Id));
  }

  #[test]
  fn exists_maps_only_not_found() {
    assert!(exists(Ok(())).unwrap());
    assert!(!exists::<()>(Err(Error::NotFound("x".into()))).unwrap());
    assert!(exists::<()>(Err(Error::Conflict("x".into()))).is_err());
  }
}
