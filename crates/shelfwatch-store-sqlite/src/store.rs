//! [`SqliteStore`]: the SQLite implementation of the shelfwatch stores.

use std::path::Path;

use chrono::NaiveDate;
use shelfwatch_core::{
  event::ChangeEvent,
  item::{ArchivedItem, FieldChange, ItemId, ItemRecord, ItemUpdate},
  store::{ArchiveStore, CatalogStore, ChangeLogStore},
};

use crate::{
  Result,
  encode::{ITEM_COLUMNS, RawArchived, RawEvent, RawItem, encode_date},
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// The active set, archive set and change log in a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

/// Map a field change to its column and encoded value.
fn change_column(change: &FieldChange) -> (&'static str, Option<String>) {
  match change {
    FieldChange::Status(s) => ("status", Some(s.as_str().to_owned())),
    FieldChange::ReleaseDate(d) => ("release_date", Some(encode_date(*d))),
    FieldChange::NotFoundSince(d) => ("not_found_since", d.map(encode_date)),
    FieldChange::Developer(d) => ("developer", Some(d.clone())),
  }
}

fn insert_events(
  tx: &rusqlite::Transaction<'_>,
  rows: &[RawEvent],
) -> rusqlite::Result<()> {
  let mut stmt = tx.prepare(
    "INSERT INTO change_log (date, kind, item_id, package_key)
     VALUES (?1, ?2, ?3, ?4)",
  )?;
  for row in rows {
    stmt.execute(rusqlite::params![
      row.date,
      row.kind,
      row.item_id,
      row.package_key,
    ])?;
  }
  Ok(())
}

// ─── CatalogStore impl ───────────────────────────────────────────────────────

impl CatalogStore for SqliteStore {
  type Error = crate::Error;

  async fn list_active_items(&self) -> Result<Vec<ItemRecord>> {
    let raws: Vec<RawItem> = self
      .conn
      .call(|conn| {
        let mut stmt = conn
          .prepare(&format!("SELECT {ITEM_COLUMNS} FROM items ORDER BY id"))?;
        let rows = stmt
          .query_map([], RawItem::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawItem::into_record).collect()
  }

  async fn apply_updates(&self, updates: Vec<ItemUpdate>) -> Result<()> {
    if updates.is_empty() {
      return Ok(());
    }

    let rows: Vec<(ItemId, &'static str, Option<String>)> = updates
      .iter()
      .flat_map(|u| {
        u.changes.iter().map(move |c| {
          let (column, value) = change_column(c);
          (u.id, column, value)
        })
      })
      .collect();

    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        for (id, column, value) in &rows {
          // `column` is always one of the static names from `change_column`.
          tx.execute(
            &format!("UPDATE items SET {column} = ?1 WHERE id = ?2"),
            rusqlite::params![value, id],
          )?;
        }
        tx.commit()?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn append_item(&self, item: ItemRecord) -> Result<()> {
    let raw = RawItem::from_record(&item);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          &format!("INSERT INTO items ({ITEM_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6)"),
          rusqlite::params![
            raw.id,
            raw.package_key,
            raw.status,
            raw.release_date,
            raw.not_found_since,
            raw.developer,
          ],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn remove_items(&self, ids: Vec<ItemId>) -> Result<()> {
    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        for id in &ids {
          tx.execute("DELETE FROM items WHERE id = ?1", rusqlite::params![id])?;
        }
        tx.commit()?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

// ─── ArchiveStore impl ───────────────────────────────────────────────────────

impl ArchiveStore for SqliteStore {
  type Error = crate::Error;

  async fn list_archived_items(&self) -> Result<Vec<ArchivedItem>> {
    let raws: Vec<RawArchived> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {ITEM_COLUMNS}, last_checked FROM archived_items ORDER BY id"
        ))?;
        let rows = stmt
          .query_map([], RawArchived::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawArchived::into_archived).collect()
  }

  async fn append_archived(&self, item: ArchivedItem) -> Result<()> {
    let raw = RawItem::from_record(&item.record);
    let last_checked = encode_date(item.last_checked);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          &format!(
            "INSERT INTO archived_items ({ITEM_COLUMNS}, last_checked)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"
          ),
          rusqlite::params![
            raw.id,
            raw.package_key,
            raw.status,
            raw.release_date,
            raw.not_found_since,
            raw.developer,
            last_checked,
          ],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn mark_checked(&self, ids: Vec<ItemId>, checked_on: NaiveDate) -> Result<()> {
    let checked = encode_date(checked_on);

    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        for id in &ids {
          tx.execute(
            "UPDATE archived_items SET last_checked = ?1 WHERE id = ?2",
            rusqlite::params![checked, id],
          )?;
        }
        tx.commit()?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn remove_archived(&self, ids: Vec<ItemId>) -> Result<()> {
    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        for id in &ids {
          tx.execute("DELETE FROM archived_items WHERE id = ?1", rusqlite::params![id])?;
        }
        tx.commit()?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

// ─── ChangeLogStore impl ─────────────────────────────────────────────────────

impl ChangeLogStore for SqliteStore {
  type Error = crate::Error;

  async fn append_batch(&self, events: Vec<ChangeEvent>) -> Result<()> {
    if events.is_empty() {
      return Ok(());
    }
    let rows: Vec<RawEvent> = events.iter().map(RawEvent::from_event).collect();

    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        insert_events(&tx, &rows)?;
        tx.commit()?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn list_all(&self) -> Result<Vec<ChangeEvent>> {
    let raws: Vec<RawEvent> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(
          "SELECT date, kind, item_id, package_key FROM change_log ORDER BY seq",
        )?;
        let rows = stmt
          .query_map([], RawEvent::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawEvent::into_event).collect()
  }

  async fn replace_all(&self, events: Vec<ChangeEvent>) -> Result<()> {
    let rows: Vec<RawEvent> = events.iter().map(RawEvent::from_event).collect();

    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM change_log", [])?;
        insert_events(&tx, &rows)?;
        tx.commit()?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}
