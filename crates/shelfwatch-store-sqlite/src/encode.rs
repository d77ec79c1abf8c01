//! Encoding and decoding helpers between domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Dates are stored as `YYYY-MM-DD`. Enums are stored as their lowercase
//! names.

use chrono::NaiveDate;
use shelfwatch_core::{
  event::{ChangeEvent, ChangeKind},
  item::{ArchivedItem, ItemRecord, Status},
};

use crate::{Error, Result};

const DATE_FORMAT: &str = "%Y-%m-%d";

// ─── NaiveDate ───────────────────────────────────────────────────────────────

pub fn encode_date(d: NaiveDate) -> String { d.format(DATE_FORMAT).to_string() }

pub fn decode_date(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s, DATE_FORMAT)
    .map_err(|e| Error::DateParse(format!("{s:?}: {e}")))
}

fn decode_opt_date(s: Option<&str>) -> Result<Option<NaiveDate>> {
  s.filter(|s| !s.is_empty()).map(decode_date).transpose()
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Column list shared by `items` and `archived_items`.
pub const ITEM_COLUMNS: &str =
  "id, package_key, status, release_date, not_found_since, developer";

/// Raw values read directly from an `items` row.
pub struct RawItem {
  pub id:              i64,
  pub package_key:     String,
  pub status:          String,
  pub release_date:    Option<String>,
  pub not_found_since: Option<String>,
  pub developer:       Option<String>,
}

impl RawItem {
  /// Read the [`ITEM_COLUMNS`] starting at column 0.
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:              row.get(0)?,
      package_key:     row.get(1)?,
      status:          row.get(2)?,
      release_date:    row.get(3)?,
      not_found_since: row.get(4)?,
      developer:       row.get(5)?,
    })
  }

  pub fn from_record(item: &ItemRecord) -> Self {
    Self {
      id:              item.id,
      package_key:     item.package_key.clone(),
      status:          item.status.as_str().to_owned(),
      release_date:    item.release_date.map(encode_date),
      not_found_since: item.not_found_since.map(encode_date),
      developer:       item.developer.clone(),
    }
  }

  pub fn into_record(self) -> Result<ItemRecord> {
    Ok(ItemRecord {
      id:              self.id,
      package_key:     self.package_key,
      status:          self.status.parse::<Status>()?,
      release_date:    decode_opt_date(self.release_date.as_deref())?,
      not_found_since: decode_opt_date(self.not_found_since.as_deref())?,
      developer:       self.developer.filter(|d| !d.is_empty()),
    })
  }
}

/// Raw values read from an `archived_items` row.
pub struct RawArchived {
  pub item:         RawItem,
  pub last_checked: String,
}

impl RawArchived {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self { item: RawItem::from_row(row)?, last_checked: row.get(6)? })
  }

  pub fn into_archived(self) -> Result<ArchivedItem> {
    Ok(ArchivedItem {
      record:       self.item.into_record()?,
      last_checked: decode_date(&self.last_checked)?,
    })
  }
}

/// Raw values read from a `change_log` row.
pub struct RawEvent {
  pub date:        String,
  pub kind:        String,
  pub item_id:     i64,
  pub package_key: String,
}

impl RawEvent {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      date:        row.get(0)?,
      kind:        row.get(1)?,
      item_id:     row.get(2)?,
      package_key: row.get(3)?,
    })
  }

  pub fn from_event(event: &ChangeEvent) -> Self {
    Self {
      date:        encode_date(event.date),
      kind:        event.kind.as_str().to_owned(),
      item_id:     event.item_id,
      package_key: event.package_key.clone(),
    }
  }

  pub fn into_event(self) -> Result<ChangeEvent> {
    Ok(ChangeEvent {
      date:        decode_date(&self.date)?,
      kind:        self.kind.parse::<ChangeKind>()?,
      item_id:     self.item_id,
      package_key: self.package_key,
    })
  }
}
