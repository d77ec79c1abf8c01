//! Error types for the reconciliation engine.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// Missing or invalid setup. Fatal before any mutation happens.
  #[error("configuration error: {0}")]
  Configuration(String),

  /// A catalog, archive or change-log operation failed.
  #[error("{op} failed: {source}")]
  Persistence {
    op:     &'static str,
    #[source]
    source: Box<dyn std::error::Error + Send + Sync>,
  },
}

impl Error {
  /// Returns a closure that wraps a store error for use with `map_err`.
  pub fn persistence<E>(op: &'static str) -> impl FnOnce(E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    move |e| Self::Persistence { op, source: Box::new(e) }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
