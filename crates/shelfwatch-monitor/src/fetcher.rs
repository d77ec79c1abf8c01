//! The Fetcher: one throttled provider query, normalised into an observation.

use std::time::Duration;

use shelfwatch_core::{
  observation::{Observation, ProviderError},
  store::AvailabilityProvider,
};

/// Result of a single fetch attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
  /// The store gave a definitive answer (listed or gone).
  Resolved(Observation),
  /// The query failed for a reason that says nothing about availability.
  Transient(String),
}

/// Wraps an [`AvailabilityProvider`] with a fixed pre-query delay.
pub struct Fetcher<P> {
  provider: P,
  throttle: Duration,
}

impl<P: AvailabilityProvider> Fetcher<P> {
  pub fn new(provider: P, throttle: Duration) -> Self { Self { provider, throttle } }

  pub fn provider(&self) -> &P { &self.provider }

  pub async fn fetch(&self, package_key: &str) -> FetchOutcome {
    if !self.throttle.is_zero() {
      tokio::time::sleep(self.throttle).await;
    }

    match self.provider.query(package_key).await {
      Ok(meta) => {
        let observation = Observation::from_metadata(&meta);
        tracing::debug!(package_key, ?observation, "item listed");
        FetchOutcome::Resolved(observation)
      }
      Err(ProviderError::NotFound) => {
        tracing::debug!(package_key, "item not found");
        FetchOutcome::Resolved(Observation::Banned)
      }
      Err(ProviderError::Transient(reason)) => {
        tracing::debug!(package_key, %reason, "transient fetch failure");
        FetchOutcome::Transient(reason)
      }
    }
  }
}
