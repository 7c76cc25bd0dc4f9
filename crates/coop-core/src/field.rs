//! Requestable organisation fields.
//!
//! The serialiser projects an organisation onto an allow-list of these
//! fields. `uuid` is not one of them: it is always emitted.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString, IntoEnumIterator};

use crate::{Error, Result};

/// Name of the identity key present in every payload.
pub const UUID_KEY: &str = "uuid";

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
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum OrganizationField {
  // ── Scalars ─────────────────────────────────────────────────────────────
  Title,
  Acronym,
  Description,
  Web,
  Birth,

  // ── References ──────────────────────────────────────────────────────────
  LegalStatus,
  TransverseThemes,
  PrefPhone,
  PrefEmail,

  // ── Collections ─────────────────────────────────────────────────────────
  Contacts,
  /// Resolved against the external role directory.
  Members,
}

impl OrganizationField {
  /// The output key for this field.
  pub fn key(self) -> &'static str {
    match self {
      Self::Title => "title",
      Self::Acronym => "acronym",
      Self::Description => "description",
      Self::Web => "web",
      Self::Birth => "birth",
      Self::LegalStatus => "legal_status",
      Self::TransverseThemes => "transverse_themes",
      Self::PrefPhone => "pref_phone",
      Self::PrefEmail => "pref_email",
      Self::Contacts => "contacts",
      Self::Members => "members",
    }
  }

  /// Every field, in declaration order.
  pub fn all() -> Vec<Self> { Self::iter().collect() }

  /// Parse a list of field names. `uuid` is accepted and skipped; duplicates
  /// are kept once, in first-seen order.
  pub fn parse_list<I, T>(names: I) -> Result<Vec<Self>>
  where
    I: IntoIterator<Item = T>,
    T: AsRef<str>,
  {
    let mut fields = Vec::new();
    for name in names {
      let name = name.as_ref().trim();
      if name == UUID_KEY {
        continue;
      }
      let field = Self::from_str(name)
        .map_err(|_| Error::UnknownField(name.to_string()))?;
      if !fields.contains(&field) {
        fields.push(field);
      }
    }
    Ok(fields)
  }
}
