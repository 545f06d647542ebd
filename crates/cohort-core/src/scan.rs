//! Linear-scan lookup over a paginated listing.
//!
//! Used when a platform cannot filter server-side by the identifier being
//! looked up. Pages are fetched one at a time, in order, until a match is
//! found or the platform reports there are no more pages.

use std::future::Future;

use crate::{
  Error, Result,
  source_repository::{Page, PageRequest},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanLimits {
  pub page_size: u32,
  /// Hard stop for platforms that never report the last page.
  pub max_pages: u32,
}

impl Default for ScanLimits {
  fn default() -> Self {
    Self {
      page_size: 100,
      max_pages: 100,
    }
  }
}

/// Return the first item across all pages for which `predicate` holds.
///
/// Not-found is only reported after a page with `has_next == false` has been
/// fetched; reaching `max_pages` first is [`Error::ScanLimitExceeded`].
pub async fn find_one_from_all<T, F, Fut, P>(
  label: &str,
  limits: ScanLimits,
  mut fetch_page: F,
  predicate: P,
) -> Result<T>
where
  F: FnMut(PageRequest) -> Fut,
  Fut: Future<Output = Result<Page<T>>>,
  P: Fn(&T) -> bool,
{
  let mut request = PageRequest::first(limits.page_size);

  while request.page <= limits.max_pages {
    tracing::debug!(label, page = request.page, "scanning page");
    let page = fetch_page(request).await?;

    if let Some(found) = page.items.into_iter().find(|item| predicate(item)) {
      return Ok(found);
    }
    if !page.has_next {
      return Err(Error::NotFound(format!(
        "{label} (scanned {} pages)",
        request.page
      )));
    }
    request = request.next();
  }

  tracing::warn!(label, pages = limits.max_pages, "scan limit reached");
  Err(Error::ScanLimitExceeded {
    label: label.to_owned(),
    pages: limits.max_pages,
  })
}

#[cfg(test)]
mod tests {
  use std::sync::{
    Arc,
    atomic::{AtomicU32, Ordering},
  };

  use super::*;

  /// Serves `pages` pages of `per_page` consecutive numbers.
  fn pages(
    pages: u32,
    per_page: u32,
    calls: Arc<AtomicU32>,
  ) -> impl FnMut(PageRequest) -> std::future::Ready<Result<Page<u32>>> {
    move |request| {
      calls.fetch_add(1, Ordering::SeqCst);
      let start = (request.page - 1) * per_page;
      std::future::ready(Ok(Page {
        items:    (start..start + per_page).collect(),
        has_next: request.page < pages,
      }))
    }
  }

  #[tokio::test]
  async fn stops_at_the_matching_page() {
    let calls = Arc::new(AtomicU32::new(0));
    let found = find_one_from_all(
      "numbers",
      ScanLimits::default(),
      pages(5, 10, calls.clone()),
      |n| *n == 23,
    )
    .await
    .unwrap();
    assert_eq!(found, 23);
    assert_eq!(calls.load(Ordering::SeqCst), 3);
  }

  #[tokio::test]
  async fn not_found_only_after_last_page() {
    let calls = Arc::new(AtomicU32::new(0));
    let err = find_one_from_all(
      "numbers",
      ScanLimits::default(),
      pages(4, 10, calls.clone()),
      |n| *n == 1000,
    )
    .await
    .unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
    assert_eq!(calls.load(Ordering::SeqCst), 4);
  }

  #[tokio::test]
  async fn endless_listing_hits_the_cap() {
    let calls = Arc::new(AtomicU32::new(0));
    let limits = ScanLimits {
      page_size: 10,
      max_pages: 7,
    };
    let err = find_one_from_all(
      "numbers",
      limits,
      pages(u32::MAX, 10, calls.clone()),
      |_| false,
    )
    .await
    .unwrap_err();
    assert!(matches!(err, Error::ScanLimitExceeded { pages: 7, .. }));
    assert_eq!(calls.load(Ordering::SeqCst), 7);
  }

  #[tokio::test]
  async fn fetch_errors_propagate() {
    let err = find_one_from_all(
      "numbers",
      ScanLimits::default(),
      |_| std::future::ready(Err::<Page<u32>, _>(Error::transport("boom"))),
      |_| true,
    )
    .await
    .unwrap_err();
    assert!(matches!(err, Error::Transport(_)));
  }
}
