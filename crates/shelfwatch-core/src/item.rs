//! Catalog items, their archived form, and field-level updates.

use std::{fmt, str::FromStr};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Externally assigned item number. Stable across package-key edits.
pub type ItemId = i64;

// ─── Status ──────────────────────────────────────────────────────────────────

/// Availability of an item as last observed in the store.
///
/// `Unknown` only exists before the first observation.
#[derive(
  Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Status {
  #[default]
  Unknown,
  Ready,
  Banned,
}

impl Status {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Unknown => "unknown",
      Self::Ready => "ready",
      Self::Banned => "banned",
    }
  }
}

impl fmt::Display for Status {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for Status {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> {
    match s {
      "" | "unknown" => Ok(Self::Unknown),
      "ready" => Ok(Self::Ready),
      "banned" => Ok(Self::Banned),
      other => Err(Error::UnknownStatus(other.to_owned())),
    }
  }
}

// ─── ItemRecord ──────────────────────────────────────────────────────────────

/// One catalog entry in the active set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemRecord {
  pub id:              ItemId,
  /// Identifier used to query the store. Unique within the active set.
  pub package_key:     String,
  pub status:          Status,
  /// First known public release, or last-updated date as a fallback.
  /// Never cleared once set.
  pub release_date:    Option<NaiveDate>,
  /// First day of the current unavailability streak.
  pub not_found_since: Option<NaiveDate>,
  pub developer:       Option<String>,
}

impl ItemRecord {
  /// A freshly catalogued item that has never been observed.
  pub fn new(id: ItemId, package_key: impl Into<String>) -> Self {
    Self {
      id,
      package_key: package_key.into(),
      status: Status::Unknown,
      release_date: None,
      not_found_since: None,
      developer: None,
    }
  }

  /// Apply a single field change in place.
  pub fn apply(&mut self, change: &FieldChange) {
    match change {
      FieldChange::Status(s) => self.status = *s,
      FieldChange::ReleaseDate(d) => self.release_date = Some(*d),
      FieldChange::NotFoundSince(d) => self.not_found_since = *d,
      FieldChange::Developer(d) => self.developer = Some(d.clone()),
    }
  }

  /// Whether this item has been unavailable for strictly more than
  /// `threshold_days` as of `today`.
  pub fn is_stale(&self, today: NaiveDate, threshold_days: i64) -> bool {
    self.status == Status::Banned
      && self
        .not_found_since
        .is_some_and(|since| (today - since).num_days() > threshold_days)
  }
}

// ─── ArchivedItem ────────────────────────────────────────────────────────────

/// An item moved out of the active set after a long ban.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchivedItem {
  #[serde(flatten)]
  pub record:       ItemRecord,
  /// Last day the item was probed while archived.
  pub last_checked: NaiveDate,
}

impl ArchivedItem {
  pub fn new(record: ItemRecord, last_checked: NaiveDate) -> Self {
    Self { record, last_checked }
  }

  /// Whether the re-probe interval has elapsed since `last_checked`.
  pub fn is_due(&self, today: NaiveDate, interval_days: i64) -> bool {
    (today - self.last_checked).num_days() > interval_days
  }
}

// ─── Field changes ───────────────────────────────────────────────────────────

/// A single column-level change to an active item.
///
/// `ReleaseDate` and `Developer` carry a concrete value: neither field is
/// ever cleared by reconciliation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldChange {
  Status(Status),
  ReleaseDate(NaiveDate),
  NotFoundSince(Option<NaiveDate>),
  Developer(String),
}

/// All changes computed for one item in one cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemUpdate {
  pub id:      ItemId,
  pub changes: Vec<FieldChange>,
}

#[cfg(test)]
mod tests {
  use super::*;

  fn date(s: &str) -> NaiveDate { s.parse().unwrap() }

  #[test]
  fn status_parses_blank_as_unknown() {
    assert_eq!("".parse::<Status>().unwrap(), Status::Unknown);
    assert_eq!("banned".parse::<Status>().unwrap(), Status::Banned);
    assert!("deleted".parse::<Status>().is_err());
  }

  #[test]
  fn staleness_is_strictly_after_threshold() {
    let mut item = ItemRecord::new(1, "com.example.app");
    item.status = Status::Banned;
    item.not_found_since = Some(date("2024-01-01"));

    assert!(!item.is_stale(date("2024-02-15"), 45));
    assert!(item.is_stale(date("2024-02-16"), 45));
  }

  #[test]
  fn ready_item_is_never_stale() {
    let mut item = ItemRecord::new(1, "com.example.app");
    item.status = Status::Ready;
    item.not_found_since = Some(date("2020-01-01"));
    assert!(!item.is_stale(date("2024-01-01"), 45));
  }

  #[test]
  fn archived_item_due_after_interval() {
    let archived =
      ArchivedItem::new(ItemRecord::new(7, "com.example.gone"), date("2024-03-01"));
    assert!(!archived.is_due(date("2024-03-08"), 7));
    assert!(archived.is_due(date("2024-03-09"), 7));
  }

  #[test]
  fn apply_never_clears_release_date() {
    let mut item = ItemRecord::new(1, "com.example.app");
    item.apply(&FieldChange::ReleaseDate(date("2021-06-01")));
    item.apply(&FieldChange::Status(Status::Banned));
    item.apply(&FieldChange::NotFoundSince(Some(date("2024-01-01"))));
    assert_eq!(item.release_date, Some(date("2021-06-01")));
    assert_eq!(item.status, Status::Banned);
  }
}
