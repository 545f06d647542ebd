//! `cohort.toml` and `COHORT_*` environment settings.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use cohort_core::{source_repository::SourceRegistry, upsert::UpsertConfig};
use cohort_sources::{PlatformClient, PlatformConfig, community, micro_course};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
  #[serde(default = "default_store_path")]
  pub store_path:   PathBuf,
  #[serde(flatten)]
  pub upsert:       UpsertConfig,
  #[serde(default)]
  pub community:    Option<PlatformConfig>,
  #[serde(default)]
  pub micro_course: Option<PlatformConfig>,
}

fn default_store_path() -> PathBuf { PathBuf::from("cohort.db") }

impl Settings {
  /// Layer the optional TOML file at `path` under `COHORT_*` variables.
  /// Nested keys use a double underscore: `COHORT_COMMUNITY__TOKEN`.
  pub fn load(path: &Path) -> anyhow::Result<Self> {
    Self::from_builder(
      config::Config::builder()
        .add_source(config::File::from(path).required(false))
        .add_source(config::Environment::with_prefix("COHORT").separator("__")),
    )
  }

  fn from_builder(
    builder: config::ConfigBuilder<config::builder::DefaultState>,
  ) -> anyhow::Result<Self> {
    let settings = builder.build().context("failed to read config file")?;
    let mut settings: Self = settings
      .try_deserialize()
      .context("failed to deserialise Settings")?;
    settings.store_path = expand_tilde(&settings.store_path);
    Ok(settings)
  }

  /// Every configured platform, registered under its tag.
  pub fn registry(&self) -> anyhow::Result<SourceRegistry> {
    let mut registry = SourceRegistry::new();
    if let Some(cfg) = &self.community {
      let client = PlatformClient::new(cfg.clone()).context("community client")?;
      registry = community::register(registry, client);
    }
    if let Some(cfg) = &self.micro_course {
      let client = PlatformClient::new(cfg.clone()).context("micro-course client")?;
      registry = micro_course::register(registry, client);
    }
    Ok(registry)
  }
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

#[cfg(test)]
mod tests {
  use cohort_core::source::SourceTag;

  use super::*;

  fn parse(toml: &str) -> anyhow::Result<Settings> {
    Settings::from_builder(
      config::Config::builder().add_source(config::File::from_str(toml, config::FileFormat::Toml)),
    )
  }

  #[test]
  fn minimal_settings_take_defaults() {
    let settings = parse(r#"account_owner = "acme""#).unwrap();
    assert_eq!(settings.store_path, PathBuf::from("cohort.db"));
    assert_eq!(settings.upsert.primary_source, SourceTag::Course);
    assert_eq!(settings.upsert.account_owner.as_str(), "acme");
    assert!(settings.community.is_none());
    assert_eq!(settings.registry().unwrap().sources().count(), 0);
  }

  #[test]
  fn platforms_are_registered_when_configured() {
    let settings = parse(
      r#"
        account_owner  = "acme"
        primary_source = "MICRO-COURSE"

        [community]
        base_url  = "https://community.example.org/api"
        token     = "t"
        page_size = 50

        [micro_course]
        base_url = "https://micro.example.org/v2"
      "#,
    )
    .unwrap();
    assert_eq!(settings.upsert.primary_source, SourceTag::MicroCourse);
    let community = settings.community.as_ref().unwrap();
    assert_eq!(community.page_size, 50);
    assert_eq!(community.max_pages, 100);

    let sources: Vec<_> = settings.registry().unwrap().sources().collect();
    assert!(sources.contains(&SourceTag::Community));
    assert!(sources.contains(&SourceTag::MicroCourse));
  }

  #[test]
  fn invalid_account_owner_is_rejected() {
    assert!(parse(r#"account_owner = "Not A Slug""#).is_err());
  }
}
