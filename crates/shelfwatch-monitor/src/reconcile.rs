//! The Reconciler: old stored state + fresh observation → field changes and
//! at most one change event.

use chrono::NaiveDate;
use shelfwatch_core::{
  event::{ChangeEvent, ChangeKind},
  item::{FieldChange, ItemRecord, ItemUpdate, Status},
  observation::Observation,
};

/// The outcome of reconciling one item for one cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciliation {
  pub update: Option<ItemUpdate>,
  pub event:  Option<ChangeEvent>,
}

/// Classify the transition from `old` to `observation`.
///
/// A banned item that becomes available is a return when it carried a
/// release date before going dark, and an appearance otherwise.
pub fn classify(old: &ItemRecord, observation: &Observation) -> Option<ChangeKind> {
  match (old.status, observation) {
    (Status::Unknown, _) => Some(ChangeKind::NewItemLoaded),
    (Status::Banned, Observation::Ready { .. }) => {
      if old.release_date.is_some() {
        Some(ChangeKind::ReturnedToStore)
      } else {
        Some(ChangeKind::AppearedInStore)
      }
    }
    (Status::Ready, Observation::Banned) => Some(ChangeKind::Banned),
    (Status::Ready, Observation::Ready { .. })
    | (Status::Banned, Observation::Banned) => None,
  }
}

/// Field-level changes needed to bring `old` in line with `observation`.
///
/// `release_date` is only ever filled in, never replaced or cleared.
/// `developer` only changes on a `Ready` observation that reports one.
pub fn diff_fields(
  old: &ItemRecord,
  observation: &Observation,
  today: NaiveDate,
) -> Vec<FieldChange> {
  let mut changes = Vec::new();

  let status = observation.status();
  if status != old.status {
    changes.push(FieldChange::Status(status));
  }

  let not_found_since = match observation {
    Observation::Ready { .. } => None,
    Observation::Banned => old.not_found_since.or(Some(today)),
  };
  if not_found_since != old.not_found_since {
    changes.push(FieldChange::NotFoundSince(not_found_since));
  }

  if let Observation::Ready { release_date, developer } = observation {
    if old.release_date.is_none()
      && let Some(date) = release_date
    {
      changes.push(FieldChange::ReleaseDate(*date));
    }
    if let Some(dev) = developer
      && old.developer.as_ref() != Some(dev)
    {
      changes.push(FieldChange::Developer(dev.clone()));
    }
  }

  changes
}

/// Reconcile one item: compute its update and classify its event.
pub fn reconcile(
  old: &ItemRecord,
  observation: &Observation,
  today: NaiveDate,
) -> Reconciliation {
  let changes = diff_fields(old, observation, today);
  let event = classify(old, observation)
    .map(|kind| ChangeEvent::new(today, kind, old.id, old.package_key.clone()));

  if let Some(ev) = &event {
    tracing::debug!(
      item_id = old.id,
      package_key = %old.package_key,
      kind = %ev.kind,
      from = %old.status,
      to = %observation.status(),
      "availability changed"
    );
  }

  Reconciliation {
    update: (!changes.is_empty()).then(|| ItemUpdate { id: old.id, changes }),
    event,
  }
}
