//! Async JSON client shared by the platform adapters.

use std::time::Duration;

use cohort_core::scan::ScanLimits;
use reqwest::{Client, Method, RequestBuilder, Response, Url};
use serde::{Serialize, de::DeserializeOwned};
use tracing::debug;

use crate::{Error, PlatformConfig, Result};

/// HTTP client for one platform's REST API.
///
/// Cheap to clone; the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Debug, Clone)]
pub struct PlatformClient {
  client:   Client,
  base_url: Url,
  token:    String,
  limits:   ScanLimits,
}

impl PlatformClient {
  pub fn new(config: PlatformConfig) -> Result<Self> {
    let base_url =
      Url::parse(&config.base_url).map_err(|_| Error::BaseUrl(config.base_url.clone()))?;
    if base_url.cannot_be_a_base() {
      return Err(Error::BaseUrl(config.base_url));
    }
    let client = Client::builder().timeout(Duration::from_secs(30)).build()?;
    Ok(Self {
      client,
      limits: config.limits(),
      base_url,
      token: config.token,
    })
  }

  pub fn limits(&self) -> ScanLimits { self.limits }

  /// Append `segments` to the base url, percent-encoding each one.
  fn url(&self, segments: &[&str]) -> Result<Url> {
    let mut url = self.base_url.clone();
    url
      .path_segments_mut()
      .map_err(|()| Error::BaseUrl(self.base_url.to_string()))?
      .pop_if_empty()
      .extend(segments);
    Ok(url)
  }

  async fn send(
    &self,
    method: Method,
    segments: &[&str],
    build: impl FnOnce(RequestBuilder) -> RequestBuilder,
  ) -> Result<Response> {
    let url = self.url(segments)?;
    debug!(%method, %url, "platform request");

    let mut req = self.client.request(method.clone(), url.clone());
    if !self.token.is_empty() {
      req = req.bearer_auth(&self.token);
    }
    let resp = build(req).send().await?;

    let status = resp.status();
    if !status.is_success() {
      return Err(Error::Status {
        method,
        path: url.path().to_owned(),
        status,
      });
    }
    Ok(resp)
  }

  pub async fn get<T: DeserializeOwned>(
    &self,
    segments: &[&str],
    query: &[(&str, String)],
  ) -> Result<T> {
    let resp = self.send(Method::GET, segments, |r| r.query(query)).await?;
    Ok(resp.json().await?)
  }

  pub async fn post<B, T>(&self, segments: &[&str], body: &B) -> Result<T>
  where
    B: Serialize + Sync,
    T: DeserializeOwned,
  {
    let resp = self.send(Method::POST, segments, |r| r.json(body)).await?;
    Ok(resp.json().await?)
  }

  pub async fn put<B, T>(&self, segments: &[&str], body: &B) -> Result<T>
  where
    B: Serialize + Sync,
    T: DeserializeOwned,
  {
    let resp = self.send(Method::PUT, segments, |r| r.json(body)).await?;
    Ok(resp.json().await?)
  }

  pub async fn delete(&self, segments: &[&str]) -> Result<()> {
    self.send(Method::DELETE, segments, |r| r).await?;
    Ok(())
  }
}
