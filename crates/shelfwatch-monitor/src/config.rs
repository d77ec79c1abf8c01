//! Runtime configuration, deserialised from `shelfwatch.toml` and
//! `SHELFWATCH__*` environment variables.

use std::{path::PathBuf, time::Duration};

use serde::Deserialize;

use crate::{Error, Result, archive::ArchivePolicy, retry::RetryPolicy};

#[derive(Debug, Clone, Deserialize)]
pub struct MonitorConfig {
  pub store_path: PathBuf,
  pub provider:   ProviderConfig,
  #[serde(default)]
  pub policy:     PolicyConfig,
}

/// Where and how to query the store metadata gateway.
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderConfig {
  pub base_url:     String,
  #[serde(default = "default_country")]
  pub country:      String,
  #[serde(default = "default_lang")]
  pub lang:         String,
  #[serde(default = "default_timeout_secs")]
  pub timeout_secs: u64,
}

/// Retry, throttling and archive tuning knobs.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
  pub max_attempts:   u32,
  pub concurrency:    usize,
  pub backoff_secs:   u64,
  /// Delay before every outbound query.
  pub throttle_ms:    u64,
  pub staleness_days: i64,
  pub reprobe_days:   i64,
}

impl Default for PolicyConfig {
  fn default() -> Self {
    Self {
      max_attempts:   4,
      concurrency:    5,
      backoff_secs:   10,
      throttle_ms:    500,
      staleness_days: 45,
      reprobe_days:   7,
    }
  }
}

fn default_country() -> String { "us".to_string() }
fn default_lang() -> String { "en".to_string() }
fn default_timeout_secs() -> u64 { 30 }

impl MonitorConfig {
  /// Reject settings the engine cannot run with.
  pub fn validate(&self) -> Result<()> {
    if self.provider.base_url.trim().is_empty() {
      return Err(Error::Configuration("provider.base_url is empty".into()));
    }
    self.policy.validate()
  }
}

impl PolicyConfig {
  pub fn validate(&self) -> Result<()> {
    if !(1..=10).contains(&self.max_attempts) {
      return Err(Error::Configuration(format!(
        "policy.max_attempts must be between 1 and 10, got {}",
        self.max_attempts
      )));
    }
    if self.concurrency == 0 {
      return Err(Error::Configuration("policy.concurrency must be at least 1".into()));
    }
    if self.staleness_days <= 0 || self.reprobe_days <= 0 {
      return Err(Error::Configuration(
        "policy.staleness_days and policy.reprobe_days must be positive".into(),
      ));
    }
    Ok(())
  }

  pub fn retry(&self) -> RetryPolicy {
    RetryPolicy {
      max_attempts: self.max_attempts,
      concurrency:  self.concurrency,
      backoff:      Duration::from_secs(self.backoff_secs),
    }
  }

  pub fn throttle(&self) -> Duration { Duration::from_millis(self.throttle_ms) }

  pub fn archive(&self) -> ArchivePolicy {
    ArchivePolicy {
      staleness_days: self.staleness_days,
      reprobe_days:   self.reprobe_days,
    }
  }
}
