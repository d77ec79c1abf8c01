//! Collaborator traits consumed by the reconciliation engine.
//!
//! Storage backends (e.g. `shelfwatch-store-sqlite`) implement the three
//! store traits; the availability provider wraps the external app store.
//! The engine depends only on these abstractions.

use std::future::Future;

use chrono::NaiveDate;

use crate::{
  event::ChangeEvent,
  item::{ArchivedItem, ItemId, ItemRecord, ItemUpdate},
  observation::{ExternalAppMetadata, ProviderError},
};

/// Persistence for the active set.
///
/// All methods return `Send` futures so the trait can be used from a
/// multi-threaded tokio runtime.
pub trait CatalogStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// List every item in the active set, in catalog order.
  fn list_active_items(
    &self,
  ) -> impl Future<Output = Result<Vec<ItemRecord>, Self::Error>> + Send + '_;

  /// Apply a batch of field updates. Items not present are ignored.
  fn apply_updates(
    &self,
    updates: Vec<ItemUpdate>,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Insert a new item. Fails if the id or package key is already taken.
  fn append_item(
    &self,
    item: ItemRecord,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Remove items from the active set by id.
  fn remove_items(
    &self,
    ids: Vec<ItemId>,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;
}

/// Persistence for the archive set (cold storage for long-dead items).
pub trait ArchiveStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  fn list_archived_items(
    &self,
  ) -> impl Future<Output = Result<Vec<ArchivedItem>, Self::Error>> + Send + '_;

  /// Insert an archived record. Fails if the id is already archived.
  fn append_archived(
    &self,
    item: ArchivedItem,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Set `last_checked` for the given archived items.
  fn mark_checked(
    &self,
    ids: Vec<ItemId>,
    checked_on: NaiveDate,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn remove_archived(
    &self,
    ids: Vec<ItemId>,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;
}

/// The durable change log.
///
/// Each write is all-or-nothing: a failed batch leaves the log unchanged.
pub trait ChangeLogStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Append events in one batch, preserving their order.
  fn append_batch(
    &self,
    events: Vec<ChangeEvent>,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Every entry, oldest first.
  fn list_all(
    &self,
  ) -> impl Future<Output = Result<Vec<ChangeEvent>, Self::Error>> + Send + '_;

  /// Atomically replace the whole log. Used for supersession and dedup
  /// rewrites.
  fn replace_all(
    &self,
    events: Vec<ChangeEvent>,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;
}

/// The external source of truth for item availability.
pub trait AvailabilityProvider: Send + Sync {
  /// Look up one item by package key.
  fn query<'a>(
    &'a self,
    package_key: &'a str,
  ) -> impl Future<Output = Result<ExternalAppMetadata, ProviderError>> + Send + 'a;
}
