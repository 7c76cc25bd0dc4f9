//! Error type for `coop-store-sqlite`.

use coop_core::foreign::ForeignKind;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] coop_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date parse error: {0}")]
  DateParse(String),

  #[error("invalid row: {0}")]
  InvalidRow(String),

  #[error("organization not found: {0}")]
  OrganizationNotFound(Uuid),

  #[error("person not found: {0}")]
  PersonNotFound(Uuid),

  /// A preferred contact must be one of the record's own contacts.
  #[error("contact {contact_id} does not belong to {owner}")]
  ContactNotOwned { contact_id: i64, owner: Uuid },

  /// The local side of a link does not exist.
  #[error("{0} not found: {1}")]
  LocalNotFound(ForeignKind, Uuid),

  #[error("{kind} {local_uuid} is already linked to {existing:?}")]
  AlreadyLinked {
    kind:       ForeignKind,
    local_uuid: Uuid,
    existing:   String,
  },

  #[error("foreign {kind} {foreign_id:?} is already linked to another record")]
  ForeignTaken {
    kind:       ForeignKind,
    foreign_id: String,
  },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
