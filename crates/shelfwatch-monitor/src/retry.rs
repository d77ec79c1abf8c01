//! The Retry Coordinator: drives the [`Fetcher`] over a batch of keys with a
//! bounded worker pool, retrying transient failures in rounds.

use std::{
  collections::{HashMap, HashSet},
  time::Duration,
};

use futures::{StreamExt as _, stream};
use shelfwatch_core::{observation::Observation, store::AvailabilityProvider};

use crate::fetcher::{FetchOutcome, Fetcher};

/// How many rounds to run, how wide, and how long to wait between them.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
  pub max_attempts: u32,
  pub concurrency:  usize,
  pub backoff:      Duration,
}

/// Exactly one observation per requested key.
#[derive(Debug, Default)]
pub struct Resolution {
  pub observations: HashMap<String, Observation>,
  /// Keys that never produced a definitive answer and were forced to
  /// `Banned`.
  pub exhausted:    Vec<String>,
  pub rounds:       u32,
}

impl Resolution {
  pub fn get(&self, package_key: &str) -> Option<&Observation> {
    self.observations.get(package_key)
  }
}

/// Resolve every key in `keys`.
///
/// Definitive answers (listed or not found) settle a key immediately; keys
/// that only fail transiently stay pending until `max_attempts` rounds have
/// run, after which they resolve to [`Observation::Banned`].
pub async fn resolve_all<P: AvailabilityProvider>(
  fetcher: &Fetcher<P>,
  keys: impl IntoIterator<Item = String>,
  policy: &RetryPolicy,
) -> Resolution {
  let mut seen = HashSet::new();
  let mut pending: Vec<String> =
    keys.into_iter().filter(|k| seen.insert(k.clone())).collect();
  let mut resolution = Resolution::default();

  while !pending.is_empty() && resolution.rounds < policy.max_attempts {
    if resolution.rounds > 0 {
      tracing::info!(
        pending = pending.len(),
        round = resolution.rounds + 1,
        backoff = ?policy.backoff,
        "retrying transient failures"
      );
      tokio::time::sleep(policy.backoff).await;
    }
    resolution.rounds += 1;

    let outcomes: Vec<(String, FetchOutcome)> = stream::iter(pending.drain(..))
      .map(|key| async move {
        let outcome = fetcher.fetch(&key).await;
        (key, outcome)
      })
      .buffer_unordered(policy.concurrency.max(1))
      .collect()
      .await;

    for (key, outcome) in outcomes {
      match outcome {
        FetchOutcome::Resolved(observation) => {
          resolution.observations.insert(key, observation);
        }
        FetchOutcome::Transient(_) => pending.push(key),
      }
    }
  }

  for key in pending {
    tracing::warn!(
      package_key = %key,
      attempts = resolution.rounds,
      "retries exhausted, treating item as banned"
    );
    resolution.observations.insert(key.clone(), Observation::Banned);
    resolution.exhausted.push(key);
  }

  resolution
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::testing::ScriptedProvider;

  fn policy(max_attempts: u32) -> RetryPolicy {
    RetryPolicy { max_attempts, concurrency: 3, backoff: Duration::ZERO }
  }

  fn keys(ks: &[&str]) -> Vec<String> { ks.iter().map(|k| k.to_string()).collect() }

  #[tokio::test]
  async fn definitive_answers_are_not_retried() {
    let fetcher = Fetcher::new(ScriptedProvider::new(), Duration::ZERO);
    fetcher.provider().ready("com.a", Some("2024-01-01"));
    fetcher.provider().not_found("com.b");

    let res = resolve_all(&fetcher, keys(&["com.a", "com.b"]), &policy(4)).await;

    assert_eq!(res.rounds, 1);
    assert_eq!(res.get("com.a").unwrap().status(), shelfwatch_core::item::Status::Ready);
    assert_eq!(res.get("com.b"), Some(&Observation::Banned));
    assert_eq!(fetcher.provider().calls("com.b"), 1);
    assert!(res.exhausted.is_empty());
  }

  #[tokio::test]
  async fn transient_then_success_resolves_on_retry() {
    let fetcher = Fetcher::new(ScriptedProvider::new(), Duration::ZERO);
    fetcher
      .provider()
      .transient("com.a")
      .transient("com.a")
      .ready("com.a", None);

    let res = resolve_all(&fetcher, keys(&["com.a"]), &policy(4)).await;

    assert_eq!(res.rounds, 3);
    assert_eq!(fetcher.provider().calls("com.a"), 3);
    assert!(matches!(res.get("com.a"), Some(Observation::Ready { .. })));
  }

  #[tokio::test]
  async fn exhausted_keys_resolve_banned() {
    let fetcher = Fetcher::new(ScriptedProvider::new(), Duration::ZERO);
    fetcher.provider().transient("com.flaky");
    fetcher.provider().ready("com.ok", None);

    let res = resolve_all(&fetcher, keys(&["com.flaky", "com.ok"]), &policy(3)).await;

    assert_eq!(fetcher.provider().calls("com.flaky"), 3);
    assert_eq!(fetcher.provider().calls("com.ok"), 1);
    assert_eq!(res.get("com.flaky"), Some(&Observation::Banned));
    assert_eq!(res.exhausted, vec!["com.flaky".to_string()]);
    assert_eq!(res.observations.len(), 2);
  }

  #[tokio::test]
  async fn duplicate_keys_probe_once() {
    let fetcher = Fetcher::new(ScriptedProvider::new(), Duration::ZERO);
    fetcher.provider().ready("com.a", None);

    let res = resolve_all(&fetcher, keys(&["com.a", "com.a"]), &policy(2)).await;
    assert_eq!(fetcher.provider().calls("com.a"), 1);
    assert_eq!(res.observations.len(), 1);
  }
}
