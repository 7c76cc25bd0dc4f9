//! Error types for `coop-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("unknown organization field: {0:?}")]
  UnknownField(String),

  #[error("unknown foreign record kind: {0:?}")]
  UnknownForeignKind(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
