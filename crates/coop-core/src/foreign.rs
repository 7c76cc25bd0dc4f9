//! Foreign links: identity translation between this instance and a peer.
//!
//! A foreign link pairs a local record with the identifier the peer knows it
//! by. Foreign identifiers are opaque strings: PES hands out short UUIDs for
//! roles, and nothing here parses them. Each kind has its own one-to-one
//! table: a local record has at most one foreign counterpart and a foreign
//! identifier belongs to at most one local record. Links are created lazily,
//! never updated, and disappear with the local record.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};
use uuid::Uuid;

use crate::Error;

/// The kind of record a link translates.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  AsRefStr,
  Display,
  EnumIter,
  EnumString,
  Serialize,
  Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ForeignKind {
  Organization,
  Person,
  Role,
}

impl ForeignKind {
  pub fn parse(s: &str) -> crate::Result<Self> {
    Self::from_str(s).map_err(|_| Error::UnknownForeignKind(s.to_string()))
  }
}

/// One row of a foreign-link table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignLink {
  pub kind:       ForeignKind,
  pub local_uuid: Uuid,
  pub foreign_id: String,
  pub linked_at:  DateTime<Utc>,
}
