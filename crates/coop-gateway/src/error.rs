//! Error type for `coop-gateway`.

use coop_core::foreign::ForeignKind;
use reqwest::StatusCode;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] coop_core::Error),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),

  #[error("{kind} not found: {uuid}")]
  NotFound { kind: ForeignKind, uuid: Uuid },

  /// Transport failure, timeout, or undecodable body.
  #[error("{context}: {source}")]
  Http {
    context: String,
    #[source]
    source:  reqwest::Error,
  },

  #[error("{context} → {status}")]
  Status { context: String, status: StatusCode },

  #[error("malformed response to {context}: {reason}")]
  MalformedResponse { context: String, reason: String },

  /// An engagement's role has no counterpart in the role directory.
  #[error("role {0:?} is not known to the role directory")]
  UnmatchedRole(String),

  #[error("remote is not configured: PES_HOST and PES_API_KEY are required")]
  RemoteNotConfigured,

  #[error("configuration error: {0}")]
  Config(#[from] config::ConfigError),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),
}

impl Error {
  /// Box a backend error.
  pub fn store<E>(e: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Store(Box::new(e))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
