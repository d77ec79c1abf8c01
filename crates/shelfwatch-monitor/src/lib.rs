//! The shelfwatch reconciliation engine.
//!
//! Probes every catalogued item against the store, reconciles the result with
//! stored state, and records availability changes in a deduplicated change
//! log. Long-dead items are archived and periodically re-probed.
//!
//! Persistence and the store itself are reached through the traits in
//! [`shelfwatch_core::store`].

pub mod archive;
pub mod changelog;
pub mod config;
pub mod cycle;
pub mod error;
pub mod fetcher;
pub mod provider;
pub mod reconcile;
pub mod retry;

#[cfg(test)]
mod testing;

pub use config::MonitorConfig;
pub use cycle::{CycleReport, Monitor};
pub use error::{Error, Result};
pub use provider::HttpProvider;
