//! Change events recorded in the append-only change log.

use std::{fmt, str::FromStr};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{Error, Result, item::ItemId};

/// The semantic classification of an availability change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
  /// First observation of a newly catalogued item.
  NewItemLoaded,
  /// A banned item without release history became available.
  AppearedInStore,
  /// A banned item that had been released before became available again.
  ReturnedToStore,
  /// A previously available item disappeared from the store.
  Banned,
}

impl ChangeKind {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::NewItemLoaded => "new_item_loaded",
      Self::AppearedInStore => "appeared_in_store",
      Self::ReturnedToStore => "returned_to_store",
      Self::Banned => "banned",
    }
  }
}

impl fmt::Display for ChangeKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for ChangeKind {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> {
    match s {
      "new_item_loaded" => Ok(Self::NewItemLoaded),
      "appeared_in_store" => Ok(Self::AppearedInStore),
      "returned_to_store" => Ok(Self::ReturnedToStore),
      "banned" => Ok(Self::Banned),
      other => Err(Error::UnknownChangeKind(other.to_owned())),
    }
  }
}

/// An immutable change-log entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEvent {
  pub date:        NaiveDate,
  pub kind:        ChangeKind,
  pub item_id:     ItemId,
  pub package_key: String,
}

impl ChangeEvent {
  pub fn new(
    date: NaiveDate,
    kind: ChangeKind,
    item_id: ItemId,
    package_key: impl Into<String>,
  ) -> Self {
    Self { date, kind, item_id, package_key: package_key.into() }
  }

  /// The key under which the log keeps at most one live entry.
  pub fn identity(&self) -> IdentityKey {
    IdentityKey {
      kind:        self.kind,
      item_id:     self.item_id,
      package_key: self.package_key.clone(),
    }
  }

  /// Whether recording `self` retracts `existing`: a return to the store
  /// removes the ban entry for the same item.
  pub fn supersedes(&self, existing: &ChangeEvent) -> bool {
    self.kind == ChangeKind::ReturnedToStore
      && existing.kind == ChangeKind::Banned
      && existing.item_id == self.item_id
      && existing.package_key == self.package_key
  }
}

/// `(kind, item_id, package_key)`; the date is deliberately excluded.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IdentityKey {
  pub kind:        ChangeKind,
  pub item_id:     ItemId,
  pub package_key: String,
}

#[cfg(test)]
mod tests {
  use super::*;

  fn date(s: &str) -> NaiveDate { s.parse().unwrap() }

  #[test]
  fn identity_ignores_date() {
    let a = ChangeEvent::new(date("2024-01-01"), ChangeKind::Banned, 3, "com.a");
    let b = ChangeEvent::new(date("2024-06-01"), ChangeKind::Banned, 3, "com.a");
    assert_eq!(a.identity(), b.identity());
  }

  #[test]
  fn return_supersedes_only_matching_ban() {
    let ret = ChangeEvent::new(date("2024-02-01"), ChangeKind::ReturnedToStore, 3, "com.a");
    let ban = ChangeEvent::new(date("2024-01-01"), ChangeKind::Banned, 3, "com.a");
    let other_item = ChangeEvent::new(date("2024-01-01"), ChangeKind::Banned, 4, "com.a");
    let new_item = ChangeEvent::new(date("2024-01-01"), ChangeKind::NewItemLoaded, 3, "com.a");

    assert!(ret.supersedes(&ban));
    assert!(!ret.supersedes(&other_item));
    assert!(!ret.supersedes(&new_item));
    assert!(!ban.supersedes(&ret));
  }

  #[test]
  fn kind_round_trips_through_text() {
    for kind in [
      ChangeKind::NewItemLoaded,
      ChangeKind::AppearedInStore,
      ChangeKind::ReturnedToStore,
      ChangeKind::Banned,
    ] {
      assert_eq!(kind.as_str().parse::<ChangeKind>().unwrap(), kind);
    }
  }
}
