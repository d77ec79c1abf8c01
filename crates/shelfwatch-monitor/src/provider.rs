//! [`HttpProvider`]: an [`AvailabilityProvider`] backed by a store metadata
//! gateway speaking JSON over HTTP.

use std::time::Duration;

use reqwest::{Client, StatusCode, Url};
use shelfwatch_core::{
  observation::{ExternalAppMetadata, ProviderError},
  store::AvailabilityProvider,
};

use crate::{Error, Result, config::ProviderConfig};

/// Cheap to clone; the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct HttpProvider {
  client: Client,
  base:   Url,
  config: ProviderConfig,
}

impl HttpProvider {
  pub fn new(config: ProviderConfig) -> Result<Self> {
    let base = Url::parse(&config.base_url)
      .map_err(|e| Error::Configuration(format!("invalid provider base_url: {e}")))?;
    if base.cannot_be_a_base() {
      return Err(Error::Configuration(format!(
        "provider base_url cannot carry a path: {}",
        config.base_url
      )));
    }

    let client = Client::builder()
      .timeout(Duration::from_secs(config.timeout_secs))
      .build()
      .map_err(|e| Error::Configuration(format!("failed to build HTTP client: {e}")))?;
    Ok(Self { client, base, config })
  }

  /// `{base}/apps/{package_key}`, with the key percent-encoded as a single
  /// path segment.
  fn url(&self, package_key: &str) -> Url {
    let mut url = self.base.clone();
    // Always Ok: `new` rejects cannot-be-a-base URLs.
    if let Ok(mut segments) = url.path_segments_mut() {
      segments.pop_if_empty().push("apps").push(package_key);
    }
    url
  }
}

/// Map a non-success status to a provider failure.
fn classify_status(status: StatusCode) -> ProviderError {
  match status {
    StatusCode::NOT_FOUND | StatusCode::GONE => ProviderError::NotFound,
    other => ProviderError::Transient(format!("HTTP {other}")),
  }
}

impl AvailabilityProvider for HttpProvider {
  async fn query(&self, package_key: &str) -> Result<ExternalAppMetadata, ProviderError> {
    let resp = self
      .client
      .get(self.url(package_key))
      .query(&[
        ("country", self.config.country.as_str()),
        ("lang", self.config.lang.as_str()),
      ])
      .send()
      .await
      .map_err(|e| ProviderError::Transient(e.to_string()))?;

    let status = resp.status();
    if !status.is_success() {
      return Err(classify_status(status));
    }

    resp
      .json::<ExternalAppMetadata>()
      .await
      .map_err(|e| ProviderError::Transient(format!("malformed response: {e}")))
  }
}
