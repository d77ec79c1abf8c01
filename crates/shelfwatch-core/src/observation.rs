//! Provider responses and the canonical observations derived from them.

use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::item::Status;

/// Integers above this are interpreted as Unix timestamps (seconds).
const TIMESTAMP_FLOOR: i64 = 1_000_000_000;

/// Textual date layouts seen in store listings.
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%b %d, %Y", "%B %d, %Y", "%d %b %Y"];

// ─── Raw provider payload ────────────────────────────────────────────────────

/// A date as reported by the store: either epoch seconds or free text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawDate {
  Timestamp(i64),
  Text(String),
}

impl RawDate {
  /// Normalise to a calendar date. Unrecognised values yield `None`.
  pub fn to_date(&self) -> Option<NaiveDate> {
    match self {
      Self::Timestamp(secs) if *secs > TIMESTAMP_FLOOR => {
        DateTime::from_timestamp(*secs, 0).map(|dt| dt.date_naive())
      }
      Self::Timestamp(_) => None,
      Self::Text(text) => {
        let text = text.trim();
        DATE_FORMATS
          .iter()
          .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
      }
    }
  }
}

/// Metadata returned by an [`AvailabilityProvider`] for a listed item.
///
/// [`AvailabilityProvider`]: crate::store::AvailabilityProvider
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalAppMetadata {
  #[serde(default)]
  pub released:  Option<RawDate>,
  #[serde(default)]
  pub updated:   Option<RawDate>,
  #[serde(default)]
  pub developer: Option<String>,
}

impl ExternalAppMetadata {
  /// The release date, falling back to the last-updated date. `None` stands
  /// for "not found".
  pub fn release_date(&self) -> Option<NaiveDate> {
    self
      .released
      .as_ref()
      .and_then(RawDate::to_date)
      .or_else(|| self.updated.as_ref().and_then(RawDate::to_date))
  }
}

/// Failure modes of a single provider query.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
  /// The store reports that the item does not exist.
  #[error("item not found in store")]
  NotFound,

  /// The query failed for a reason unrelated to the item's availability.
  #[error("transient provider failure: {0}")]
  Transient(String),
}

// ─── Observation ─────────────────────────────────────────────────────────────

/// A resolved availability observation for one item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Observation {
  Ready {
    release_date: Option<NaiveDate>,
    developer:    Option<String>,
  },
  Banned,
}

impl Observation {
  pub fn status(&self) -> Status {
    match self {
      Self::Ready { .. } => Status::Ready,
      Self::Banned => Status::Banned,
    }
  }

  /// Build a `Ready` observation from provider metadata.
  pub fn from_metadata(meta: &ExternalAppMetadata) -> Self {
    Self::Ready {
      release_date: meta.release_date(),
      developer:    meta
        .developer
        .as_deref()
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(str::to_owned),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn date(s: &str) -> NaiveDate { s.parse().unwrap() }

  #[test]
  fn timestamp_converts_to_utc_date() {
    // 2024-01-01T00:00:00Z
    assert_eq!(RawDate::Timestamp(1_704_067_200).to_date(), Some(date("2024-01-01")));
    assert_eq!(RawDate::Timestamp(42).to_date(), None);
  }

  #[test]
  fn textual_dates_in_store_layouts() {
    assert_eq!(RawDate::Text("Mar 5, 2021".into()).to_date(), Some(date("2021-03-05")));
    assert_eq!(
      RawDate::Text("September 12, 2019".into()).to_date(),
      Some(date("2019-09-12"))
    );
    assert_eq!(RawDate::Text("2020-05-01".into()).to_date(), Some(date("2020-05-01")));
    assert_eq!(RawDate::Text("soon".into()).to_date(), None);
  }

  #[test]
  fn release_date_falls_back_to_updated() {
    let meta = ExternalAppMetadata {
      released:  Some(RawDate::Text("unknown".into())),
      updated:   Some(RawDate::Timestamp(1_704_067_200)),
      developer: None,
    };
    assert_eq!(meta.release_date(), Some(date("2024-01-01")));

    let neither = ExternalAppMetadata::default();
    assert_eq!(neither.release_date(), None);
  }

  #[test]
  fn metadata_deserializes_mixed_date_shapes() {
    let meta: ExternalAppMetadata = serde_json::from_str(
      r#"{"released":"Jan 2, 2022","updated":1704067200,"developer":" Acme "}"#,
    )
    .unwrap();
    let obs = Observation::from_metadata(&meta);
    assert_eq!(
      obs,
      Observation::Ready {
        release_date: Some(date("2022-01-02")),
        developer:    Some("Acme".into()),
      }
    );
    assert_eq!(obs.status(), Status::Ready);
  }
}
