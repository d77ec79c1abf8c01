//! Test doubles shared by the engine's unit tests.

use std::{
  collections::{HashMap, VecDeque},
  sync::{
    Mutex,
    atomic::{AtomicBool, Ordering},
  },
};

use chrono::NaiveDate;
use shelfwatch_core::{
  event::ChangeEvent,
  observation::{ExternalAppMetadata, ProviderError, RawDate},
  store::{AvailabilityProvider, ChangeLogStore},
};
use shelfwatch_store_sqlite::SqliteStore;

type Response = Result<ExternalAppMetadata, ProviderError>;

/// An [`AvailabilityProvider`] that replays scripted responses per key.
///
/// The last scripted response for a key repeats forever. Unscripted keys
/// answer `NotFound`.
#[derive(Default)]
pub struct ScriptedProvider {
  script: Mutex<HashMap<String, VecDeque<Response>>>,
  calls:  Mutex<HashMap<String, usize>>,
}

impl ScriptedProvider {
  pub fn new() -> Self { Self::default() }

  pub fn push(&self, key: &str, response: Response) -> &Self {
    self
      .script
      .lock()
      .unwrap()
      .entry(key.to_owned())
      .or_default()
      .push_back(response);
    self
  }

  pub fn ready(&self, key: &str, released: Option<&str>) -> &Self {
    self.push(key, Ok(listing(released)))
  }

  pub fn not_found(&self, key: &str) -> &Self {
    self.push(key, Err(ProviderError::NotFound))
  }

  pub fn transient(&self, key: &str) -> &Self {
    self.push(key, Err(ProviderError::Transient("HTTP 429".into())))
  }

  pub fn calls(&self, key: &str) -> usize {
    self.calls.lock().unwrap().get(key).copied().unwrap_or(0)
  }
}

impl AvailabilityProvider for ScriptedProvider {
  async fn query(&self, package_key: &str) -> Response {
    *self
      .calls
      .lock()
      .unwrap()
      .entry(package_key.to_owned())
      .or_default() += 1;

    let mut script = self.script.lock().unwrap();
    match script.get_mut(package_key) {
      Some(queue) if queue.len() > 1 => queue.pop_front().unwrap(),
      Some(queue) => queue.front().cloned().unwrap(),
      None => Err(ProviderError::NotFound),
    }
  }
}

/// Store metadata for a listed item.
pub fn listing(released: Option<&str>) -> ExternalAppMetadata {
  ExternalAppMetadata {
    released:  released.map(|r| RawDate::Text(r.to_owned())),
    updated:   None,
    developer: Some("Acme Labs".to_owned()),
  }
}

pub fn date(s: &str) -> NaiveDate { s.parse().unwrap() }

// ─── Failing change log ──────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum FlakyError {
  #[error("injected write failure")]
  Injected,
  #[error(transparent)]
  Store(#[from] shelfwatch_store_sqlite::Error),
}

/// A [`ChangeLogStore`] whose writes can be switched to fail.
pub struct FlakyLog {
  inner:       SqliteStore,
  fail_writes: AtomicBool,
}

impl FlakyLog {
  pub fn new(inner: SqliteStore) -> Self {
    Self { inner, fail_writes: AtomicBool::new(false) }
  }

  pub fn set_failing(&self, failing: bool) {
    self.fail_writes.store(failing, Ordering::SeqCst);
  }

  fn check(&self) -> Result<(), FlakyError> {
    if self.fail_writes.load(Ordering::SeqCst) {
      Err(FlakyError::Injected)
    } else {
      Ok(())
    }
  }
}

impl ChangeLogStore for FlakyLog {
  type Error = FlakyError;

  async fn append_batch(&self, events: Vec<ChangeEvent>) -> Result<(), FlakyError> {
    self.check()?;
    Ok(self.inner.append_batch(events).await?)
  }

  async fn list_all(&self) -> Result<Vec<ChangeEvent>, FlakyError> {
    Ok(self.inner.list_all().await?)
  }

  async fn replace_all(&self, events: Vec<ChangeEvent>) -> Result<(), FlakyError> {
    self.check()?;
    Ok(self.inner.replace_all(events).await?)
  }
}
