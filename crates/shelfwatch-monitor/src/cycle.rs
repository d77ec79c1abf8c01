//! [`Monitor`]: one full reconciliation cycle over the catalog.

use std::collections::HashSet;

use chrono::NaiveDate;
use shelfwatch_core::{
  item::{ItemId, ItemUpdate, Status},
  store::{ArchiveStore, AvailabilityProvider, CatalogStore, ChangeLogStore},
};

use crate::{
  Error, Result,
  archive::{ArchiveManager, ArchivePolicy, ArchiveReport},
  changelog::ChangeLog,
  config::PolicyConfig,
  fetcher::Fetcher,
  reconcile::reconcile,
  retry::{RetryPolicy, resolve_all},
};

/// Counts describing a finished cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
  pub archive:            ArchiveReport,
  pub probed:             usize,
  pub ready:              usize,
  /// Items whose fetches failed transiently in every round.
  pub exhausted:          usize,
  pub events_recorded:    usize,
  pub items_updated:      usize,
  pub duplicates_removed: usize,
  /// Persistence failures that were logged and isolated.
  pub failures:           usize,
}

/// The reconciliation engine, wired to its collaborators.
pub struct Monitor<C, A, L, P> {
  catalog:   C,
  archive:   A,
  log:       L,
  fetcher:   Fetcher<P>,
  retry:     RetryPolicy,
  lifecycle: ArchivePolicy,
}

impl<C, A, L, P> Monitor<C, A, L, P>
where
  C: CatalogStore,
  A: ArchiveStore,
  L: ChangeLogStore,
  P: AvailabilityProvider,
{
  pub fn new(catalog: C, archive: A, log: L, provider: P, policy: &PolicyConfig) -> Self {
    Self {
      catalog,
      archive,
      log,
      fetcher: Fetcher::new(provider, policy.throttle()),
      retry: policy.retry(),
      lifecycle: policy.archive(),
    }
  }

  pub fn catalog(&self) -> &C { &self.catalog }

  pub fn archive(&self) -> &A { &self.archive }

  pub fn log(&self) -> &L { &self.log }

  pub fn provider(&self) -> &P { self.fetcher.provider() }

  /// Run one cycle as of `today`: archive phase, active-set reconciliation,
  /// then a dedup pass over the change log.
  pub async fn run_cycle(&self, today: NaiveDate) -> Result<CycleReport> {
    let mut report = CycleReport::default();
    let mut changelog = ChangeLog::open(&self.log).await?;

    // Archive aging and revival must settle before the active set is read.
    let manager = ArchiveManager::new(&self.catalog, &self.archive, &self.lifecycle);
    match manager.run(&self.fetcher, &self.retry, &mut changelog, today).await {
      Ok(archive) => {
        report.events_recorded += archive.recorded;
        report.archive = archive;
      }
      Err(e) => {
        tracing::error!(error = %e, "archive phase failed");
        report.failures += 1;
      }
    }

    self.reconcile_active(&mut changelog, today, &mut report).await?;

    match changelog.deduplicate().await {
      Ok(removed) => report.duplicates_removed = removed,
      Err(e) => {
        tracing::warn!(error = %e, "change log dedup pass failed");
        report.failures += 1;
      }
    }

    tracing::info!(
      probed = report.probed,
      ready = report.ready,
      exhausted = report.exhausted,
      events = report.events_recorded,
      updated = report.items_updated,
      archived = report.archive.archived,
      revived = report.archive.revived.len(),
      duplicates_removed = report.duplicates_removed,
      failures = report.failures + report.archive.failures,
      "cycle complete"
    );
    Ok(report)
  }

  /// Run only the change-log dedup pass.
  pub async fn deduplicate(&self) -> Result<usize> {
    ChangeLog::open(&self.log).await?.deduplicate().await
  }

  async fn reconcile_active(
    &self,
    changelog: &mut ChangeLog<'_, L>,
    today: NaiveDate,
    report: &mut CycleReport,
  ) -> Result<()> {
    // Items revived this cycle were already probed and recorded.
    let revived: HashSet<ItemId> = report.archive.revived.iter().copied().collect();
    let items: Vec<_> = self
      .catalog
      .list_active_items()
      .await
      .map_err(Error::persistence("list active items"))?
      .into_iter()
      .filter(|item| !revived.contains(&item.id))
      .filter(|item| {
        let keep = !item.package_key.trim().is_empty();
        if !keep {
          tracing::debug!(item_id = item.id, "skipping item without package key");
        }
        keep
      })
      .collect();

    tracing::info!(items = items.len(), "probing active items");
    let keys = items.iter().map(|item| item.package_key.clone());
    let resolution = resolve_all(&self.fetcher, keys, &self.retry).await;
    report.probed = items.len();
    report.exhausted = resolution.exhausted.len();

    let mut updates: Vec<ItemUpdate> = Vec::new();
    for item in &items {
      let Some(observation) = resolution.get(&item.package_key) else {
        continue;
      };
      if observation.status() == Status::Ready {
        report.ready += 1;
      }

      let outcome = reconcile(item, observation, today);
      if let Some(event) = outcome.event {
        changelog.append(event);
      }
      updates.extend(outcome.update);
    }

    // Events and retractions are made durable before the state they
    // describe. A failed flush leaves every item as it was, so the next cycle
    // derives the same events again.
    match changelog.flush().await {
      Ok(written) => report.events_recorded += written,
      Err(e) => {
        tracing::error!(error = %e, "failed to flush change log, leaving catalog untouched");
        report.failures += 1;
        return Ok(());
      }
    }

    let count = updates.len();
    match self.catalog.apply_updates(updates).await {
      Ok(()) => report.items_updated = count,
      Err(e) => {
        tracing::error!(error = %e, "failed to write catalog updates");
        report.failures += 1;
      }
    }
    Ok(())
  }
}
