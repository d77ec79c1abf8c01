//! The Archive Lifecycle Manager.
//!
//! Moves items banned past the staleness threshold out of the active set,
//! re-probes archived items once the re-probe interval has elapsed, and
//! reinstates those that are listed again.

use chrono::NaiveDate;
use shelfwatch_core::{
  event::{ChangeEvent, ChangeKind},
  item::{ArchivedItem, ItemId},
  observation::Observation,
  store::{ArchiveStore, AvailabilityProvider, CatalogStore, ChangeLogStore},
};

use crate::{
  Error, Result,
  changelog::ChangeLog,
  fetcher::Fetcher,
  reconcile::diff_fields,
  retry::{RetryPolicy, resolve_all},
};

#[derive(Debug, Clone)]
pub struct ArchivePolicy {
  /// Days an item may stay banned before it is archived.
  pub staleness_days: i64,
  /// Days between re-probes of an archived item.
  pub reprobe_days:   i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArchiveReport {
  pub archived: usize,
  pub reprobed: usize,
  /// Items moved back into the active set this cycle.
  pub revived:  Vec<ItemId>,
  /// Return events made durable before the revival moves.
  pub recorded: usize,
  /// Per-item persistence failures that were logged and skipped.
  pub failures: usize,
}

pub struct ArchiveManager<'a, C, A> {
  catalog: &'a C,
  archive: &'a A,
  policy:  &'a ArchivePolicy,
}

impl<'a, C, A> ArchiveManager<'a, C, A>
where
  C: CatalogStore,
  A: ArchiveStore,
{
  pub fn new(catalog: &'a C, archive: &'a A, policy: &'a ArchivePolicy) -> Self {
    Self { catalog, archive, policy }
  }

  /// Run the whole archive phase: aging first, then re-probing.
  pub async fn run<P, L>(
    &self,
    fetcher: &Fetcher<P>,
    retry: &RetryPolicy,
    changelog: &mut ChangeLog<'_, L>,
    today: NaiveDate,
  ) -> Result<ArchiveReport>
  where
    P: AvailabilityProvider,
    L: ChangeLogStore,
  {
    let mut report = ArchiveReport::default();
    self.archive_stale(today, &mut report).await?;
    self.reprobe_due(fetcher, retry, changelog, today, &mut report).await?;
    Ok(report)
  }

  /// Move every active item banned for longer than the staleness threshold
  /// into the archive set.
  async fn archive_stale(&self, today: NaiveDate, report: &mut ArchiveReport) -> Result<()> {
    let stale: Vec<_> = self
      .catalog
      .list_active_items()
      .await
      .map_err(Error::persistence("list active items"))?
      .into_iter()
      .filter(|item| item.is_stale(today, self.policy.staleness_days))
      .collect();

    for item in stale {
      let id = item.id;
      let package_key = item.package_key.clone();

      if let Err(e) = self.archive.append_archived(ArchivedItem::new(item, today)).await {
        tracing::error!(item_id = id, %package_key, error = %e, "failed to archive item");
        report.failures += 1;
        continue;
      }

      if let Err(e) = self.catalog.remove_items(vec![id]).await {
        tracing::error!(item_id = id, %package_key, error = %e, "failed to remove archived item from catalog");
        // Keep the item in exactly one set.
        if let Err(e) = self.archive.remove_archived(vec![id]).await {
          tracing::error!(item_id = id, error = %e, "item left in both active and archive sets");
        }
        report.failures += 1;
        continue;
      }

      tracing::info!(item_id = id, %package_key, "archived stale item");
      report.archived += 1;
    }

    Ok(())
  }

  /// Probe archived items whose re-probe interval has elapsed; revive the
  /// ones listed again and touch `last_checked` on the rest.
  async fn reprobe_due<P, L>(
    &self,
    fetcher: &Fetcher<P>,
    retry: &RetryPolicy,
    changelog: &mut ChangeLog<'_, L>,
    today: NaiveDate,
    report: &mut ArchiveReport,
  ) -> Result<()>
  where
    P: AvailabilityProvider,
    L: ChangeLogStore,
  {
    let due: Vec<ArchivedItem> = self
      .archive
      .list_archived_items()
      .await
      .map_err(Error::persistence("list archived items"))?
      .into_iter()
      .filter(|a| a.is_due(today, self.policy.reprobe_days))
      .collect();

    if due.is_empty() {
      return Ok(());
    }
    report.reprobed = due.len();

    let keys = due.iter().map(|a| a.record.package_key.clone());
    let resolution = resolve_all(fetcher, keys, retry).await;

    let mut still_banned: Vec<ItemId> = Vec::new();
    let mut returning: Vec<(ArchivedItem, &Observation)> = Vec::new();
    for archived in due {
      match resolution.get(&archived.record.package_key) {
        Some(observation @ Observation::Ready { .. }) => {
          let record = &archived.record;
          changelog.append(ChangeEvent::new(
            today,
            ChangeKind::ReturnedToStore,
            record.id,
            record.package_key.clone(),
          ));
          returning.push((archived, observation));
        }
        _ => still_banned.push(archived.record.id),
      }
    }

    if !still_banned.is_empty()
      && let Err(e) = self.archive.mark_checked(still_banned, today).await
    {
      tracing::error!(error = %e, "failed to update last_checked for archived items");
      report.failures += 1;
    }

    if returning.is_empty() {
      return Ok(());
    }

    // The return events must be durable before any item moves. Otherwise the
    // items stay archived and due, and are retried next cycle.
    match changelog.flush().await {
      Ok(written) => report.recorded += written,
      Err(e) => {
        tracing::error!(error = %e, items = returning.len(), "failed to record returns, leaving items archived");
        changelog.discard_pending();
        report.failures += 1;
        return Ok(());
      }
    }

    for (archived, observation) in returning {
      let id = archived.record.id;
      match self.revive(archived, observation, today).await {
        Ok(()) => report.revived.push(id),
        Err(e) => {
          tracing::error!(item_id = id, error = %e, "failed to revive archived item");
          report.failures += 1;
        }
      }
    }

    Ok(())
  }

  /// Move one archived item back into the active set.
  async fn revive(
    &self,
    archived: ArchivedItem,
    observation: &Observation,
    today: NaiveDate,
  ) -> Result<()> {
    let mut record = archived.record;
    for change in diff_fields(&record, observation, today) {
      record.apply(&change);
    }
    let id = record.id;
    let package_key = record.package_key.clone();

    self
      .catalog
      .append_item(record)
      .await
      .map_err(Error::persistence("reinstate archived item"))?;

    if let Err(e) = self.archive.remove_archived(vec![id]).await {
      if let Err(rollback) = self.catalog.remove_items(vec![id]).await {
        tracing::error!(item_id = id, error = %rollback, "item left in both active and archive sets");
      }
      return Err(Error::persistence("remove revived item from archive")(e));
    }

    tracing::info!(item_id = id, %package_key, "revived archived item");
    Ok(())
  }
}
