//! The Change Log: an append-only, deduplicated ledger of change events.
//!
//! [`ChangeLog`] owns the per-run write buffer and an in-memory identity
//! index mirroring the durable log. The index is rebuilt when the log is
//! opened and kept in sync on every append, supersession and dedup pass.
//!
//! Appends touch memory only. Retractions of superseded entries are held
//! back and written together with the buffered events by [`ChangeLog::flush`],
//! so a failed flush leaves the durable log exactly as it was.

use std::collections::HashSet;

use shelfwatch_core::{
  event::{ChangeEvent, IdentityKey},
  store::ChangeLogStore,
};

use crate::{Error, Result};

pub struct ChangeLog<'a, L> {
  store:     &'a L,
  /// Mirror of the durable log, oldest first.
  durable:   Vec<ChangeEvent>,
  /// Events accepted this run but not yet flushed.
  buffer:    Vec<ChangeEvent>,
  /// Identities of durable entries to drop at the next flush.
  retracted: HashSet<IdentityKey>,
  index:     HashSet<IdentityKey>,
}

impl<'a, L: ChangeLogStore> ChangeLog<'a, L> {
  /// Load the durable log and build the identity index.
  pub async fn open(store: &'a L) -> Result<Self> {
    let durable = store
      .list_all()
      .await
      .map_err(Error::persistence("list change log"))?;

    let mut log = Self {
      store,
      durable,
      buffer: Vec::new(),
      retracted: HashSet::new(),
      index: HashSet::new(),
    };
    log.rebuild_index();
    Ok(log)
  }

  /// Record `event` unless an entry with the same identity key already exists.
  ///
  /// A `ReturnedToStore` event first retracts any `Banned` entry for the same
  /// item: buffered ones are dropped at once, durable ones at the next flush.
  /// Returns whether the event was buffered.
  pub fn append(&mut self, event: ChangeEvent) -> bool {
    let buffered_before = self.buffer.len();
    self.buffer.retain(|e| !event.supersedes(e));
    let mut superseded = self.buffer.len() != buffered_before;

    for entry in self.durable.iter().filter(|e| event.supersedes(e)) {
      superseded |= self.retracted.insert(entry.identity());
    }

    if superseded {
      tracing::debug!(
        item_id = event.item_id,
        package_key = %event.package_key,
        "retracted earlier ban entry"
      );
      self.rebuild_index();
    }

    if !self.index.insert(event.identity()) {
      tracing::trace!(
        item_id = event.item_id,
        kind = %event.kind,
        "event already recorded, skipping"
      );
      return false;
    }

    tracing::info!(
      item_id = event.item_id,
      package_key = %event.package_key,
      kind = %event.kind,
      "recording change"
    );
    self.buffer.push(event);
    true
  }

  /// Persist the buffered events, and any pending retractions, in one write.
  /// A no-op when there is nothing pending. Returns the number of events
  /// written.
  ///
  /// On failure the buffer and the retractions are kept, so a later flush in
  /// the same run can retry.
  pub async fn flush(&mut self) -> Result<usize> {
    if self.buffer.is_empty() && self.retracted.is_empty() {
      return Ok(0);
    }

    let written = self.buffer.len();
    if self.retracted.is_empty() {
      self
        .store
        .append_batch(self.buffer.clone())
        .await
        .map_err(Error::persistence("append change log batch"))?;
      self.durable.append(&mut self.buffer);
    } else {
      let rewritten: Vec<ChangeEvent> = self
        .durable
        .iter()
        .filter(|e| !self.retracted.contains(&e.identity()))
        .chain(&self.buffer)
        .cloned()
        .collect();
      self
        .store
        .replace_all(rewritten.clone())
        .await
        .map_err(Error::persistence("rewrite change log"))?;
      self.durable = rewritten;
      self.buffer.clear();
      self.retracted.clear();
    }

    tracing::info!(written, "change log flushed");
    Ok(written)
  }

  /// Drop every buffered event and pending retraction.
  pub fn discard_pending(&mut self) {
    if self.buffer.is_empty() && self.retracted.is_empty() {
      return;
    }
    tracing::warn!(events = self.buffer.len(), "discarding unflushed change log entries");
    self.buffer.clear();
    self.retracted.clear();
    self.rebuild_index();
  }

  /// Remove duplicate identity keys from the durable log, keeping the oldest
  /// entry for each. Returns the number of rows removed. Pending events and
  /// retractions are left for the next flush.
  pub async fn deduplicate(&mut self) -> Result<usize> {
    let all = self
      .store
      .list_all()
      .await
      .map_err(Error::persistence("list change log"))?;

    let mut seen = HashSet::new();
    let survivors: Vec<ChangeEvent> =
      all.iter().filter(|e| seen.insert(e.identity())).cloned().collect();
    let removed = all.len() - survivors.len();

    if removed > 0 {
      self
        .store
        .replace_all(survivors.clone())
        .await
        .map_err(Error::persistence("rewrite deduplicated change log"))?;
      tracing::info!(removed, "removed duplicate change log entries");
    }

    self.durable = survivors;
    self.rebuild_index();
    Ok(removed)
  }

  /// Whether an event with this identity is recorded or buffered.
  pub fn contains(&self, key: &IdentityKey) -> bool { self.index.contains(key) }

  /// Events accepted this run but not yet flushed.
  pub fn pending(&self) -> &[ChangeEvent] { &self.buffer }

  fn rebuild_index(&mut self) {
    self.index = self
      .durable
      .iter()
      .map(ChangeEvent::identity)
      .filter(|key| !self.retracted.contains(key))
      .chain(self.buffer.iter().map(ChangeEvent::identity))
      .collect();
  }
}
