//! Error types for `shelfwatch-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("unknown item status: {0:?}")]
  UnknownStatus(String),

  #[error("unknown change kind: {0:?}")]
  UnknownChangeKind(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
