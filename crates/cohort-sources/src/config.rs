//! Connection settings for one platform.

use cohort_core::scan::ScanLimits;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct PlatformConfig {
  /// Root of the platform's REST API, e.g. `https://community.example.org/api`.
  pub base_url:  String,
  /// Bearer token; requests are sent unauthenticated when empty.
  #[serde(default)]
  pub token:     String,
  #[serde(default = "default_page_size")]
  pub page_size: u32,
  #[serde(default = "default_max_pages")]
  pub max_pages: u32,
}

fn default_page_size() -> u32 { ScanLimits::default().page_size }

fn default_max_pages() -> u32 { ScanLimits::default().max_pages }

impl PlatformConfig {
  pub fn new(base_url: impl Into<String>) -> Self {
    Self {
      base_url:  base_url.into(),
      token:     String::new(),
      page_size: default_page_size(),
      max_pages: default_max_pages(),
    }
  }

  pub fn limits(&self) -> ScanLimits {
    ScanLimits {
      page_size: self.page_size.max(1),
      max_pages: self.max_pages.max(1),
    }
  }
}
