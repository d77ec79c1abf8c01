//! Integration tests for `SqliteStore` against an in-memory database.

use chrono::NaiveDate;
use shelfwatch_core::{
  event::{ChangeEvent, ChangeKind},
  item::{ArchivedItem, FieldChange, ItemRecord, ItemUpdate, Status},
  store::{ArchiveStore, CatalogStore, ChangeLogStore},
};

use crate::SqliteStore;

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn date(s: &str) -> NaiveDate { s.parse().unwrap() }

fn event(kind: ChangeKind, item_id: i64, package: &str) -> ChangeEvent {
  ChangeEvent::new(date("2024-01-01"), kind, item_id, package)
}

// ─── Catalog ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn append_and_list_items() {
  let s = store().await;
  s.append_item(ItemRecord::new(2, "com.example.b")).await.unwrap();
  s.append_item(ItemRecord::new(1, "com.example.a")).await.unwrap();

  let items = s.list_active_items().await.unwrap();
  assert_eq!(items.len(), 2);
  assert_eq!(items[0].id, 1);
  assert_eq!(items[0].status, Status::Unknown);
  assert_eq!(items[1].package_key, "com.example.b");
}

#[tokio::test]
async fn duplicate_package_key_rejected() {
  let s = store().await;
  s.append_item(ItemRecord::new(1, "com.example.a")).await.unwrap();
  let result = s.append_item(ItemRecord::new(2, "com.example.a")).await;
  assert!(result.is_err());
}

#[tokio::test]
async fn apply_updates_writes_each_field() {
  let s = store().await;
  s.append_item(ItemRecord::new(1, "com.example.a")).await.unwrap();

  s.apply_updates(vec![ItemUpdate {
    id:      1,
    changes: vec![
      FieldChange::Status(Status::Banned),
      FieldChange::ReleaseDate(date("2020-05-01")),
      FieldChange::NotFoundSince(Some(date("2024-01-01"))),
      FieldChange::Developer("Acme".into()),
    ],
  }])
  .await
  .unwrap();

  let item = &s.list_active_items().await.unwrap()[0];
  assert_eq!(item.status, Status::Banned);
  assert_eq!(item.release_date, Some(date("2020-05-01")));
  assert_eq!(item.not_found_since, Some(date("2024-01-01")));
  assert_eq!(item.developer.as_deref(), Some("Acme"));

  s.apply_updates(vec![ItemUpdate {
    id:      1,
    changes: vec![FieldChange::NotFoundSince(None)],
  }])
  .await
  .unwrap();
  let item = &s.list_active_items().await.unwrap()[0];
  assert_eq!(item.not_found_since, None);
}

#[tokio::test]
async fn remove_items_only_touches_given_ids() {
  let s = store().await;
  s.append_item(ItemRecord::new(1, "com.example.a")).await.unwrap();
  s.append_item(ItemRecord::new(2, "com.example.b")).await.unwrap();

  s.remove_items(vec![1]).await.unwrap();
  let items = s.list_active_items().await.unwrap();
  assert_eq!(items.len(), 1);
  assert_eq!(items[0].id, 2);
}

// ─── Archive ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn archive_roundtrip_and_mark_checked() {
  let s = store().await;
  let mut record = ItemRecord::new(9, "com.example.gone");
  record.status = Status::Banned;
  record.release_date = Some(date("2019-02-03"));
  record.not_found_since = Some(date("2023-11-01"));

  s.append_archived(ArchivedItem::new(record.clone(), date("2024-01-01")))
    .await
    .unwrap();
  s.mark_checked(vec![9], date("2024-01-09")).await.unwrap();

  let archived = s.list_archived_items().await.unwrap();
  assert_eq!(archived.len(), 1);
  assert_eq!(archived[0].record, record);
  assert_eq!(archived[0].last_checked, date("2024-01-09"));

  s.remove_archived(vec![9]).await.unwrap();
  assert!(s.list_archived_items().await.unwrap().is_empty());
}

// ─── Change log ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn append_batch_preserves_order() {
  let s = store().await;
  s.append_batch(vec![
    event(ChangeKind::NewItemLoaded, 1, "com.a"),
    event(ChangeKind::Banned, 2, "com.b"),
  ])
  .await
  .unwrap();
  s.append_batch(vec![]).await.unwrap();

  let all = s.list_all().await.unwrap();
  assert_eq!(all.len(), 2);
  assert_eq!(all[0].kind, ChangeKind::NewItemLoaded);
  assert_eq!(all[1].kind, ChangeKind::Banned);
}

#[tokio::test]
async fn replace_all_rewrites_log() {
  let s = store().await;
  s.append_batch(vec![
    event(ChangeKind::Banned, 1, "com.a"),
    event(ChangeKind::Banned, 1, "com.a"),
    event(ChangeKind::NewItemLoaded, 2, "com.b"),
  ])
  .await
  .unwrap();

  s.replace_all(vec![event(ChangeKind::NewItemLoaded, 2, "com.b")])
    .await
    .unwrap();

  let all = s.list_all().await.unwrap();
  assert_eq!(all, vec![event(ChangeKind::NewItemLoaded, 2, "com.b")]);
}
