//! Directory records as read by the gateway.
//!
//! Every record carries two identities: a local `id` assigned by the owning
//! database, and (for the records that travel between instances) a `uuid`
//! that stays stable across instances. Only the latter may appear in
//! serialised payloads.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ─── Reference records ───────────────────────────────────────────────────────

/// A legal form an organisation can take. Referenced externally by slug.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegalStatus {
  pub id:    i64,
  pub label: String,
  pub slug:  String,
}

/// A cross-cutting theme an organisation can be tagged with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransverseTheme {
  pub id:   i64,
  pub name: String,
}

/// A role a person can hold within an organisation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
  pub id:    i64,
  pub uuid:  Uuid,
  pub label: String,
  /// Derived from `label`; used to match against the external role directory.
  pub slug:  String,
}

// ─── Contacts ────────────────────────────────────────────────────────────────

/// The record a contact is attached to. Exactly one owner per contact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum ContactOwner {
  Organization(i64),
  Person(i64),
}

/// A free-text contact method: phone number, email address, etc.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
  pub id:      i64,
  pub uuid:    Uuid,
  pub content: String,
  pub owner:   ContactOwner,
}

/// Input to [`crate::store::DirectoryStore::add_contact`].
#[derive(Debug, Clone)]
pub struct NewContact {
  pub owner:   ContactOwner,
  pub content: String,
}

// ─── Organizations ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Organization {
  pub id:              i64,
  pub uuid:            Uuid,
  pub title:           String,
  pub acronym:         Option<String>,
  pub description:     Option<String>,
  pub web:             Option<String>,
  /// Founding date.
  pub birth:           Option<NaiveDate>,
  pub legal_status_id: Option<i64>,
  /// Local id of a [`Contact`] owned by this organisation.
  pub pref_phone_id:   Option<i64>,
  pub pref_email_id:   Option<i64>,
}

impl Organization {
  pub fn owner(&self) -> ContactOwner { ContactOwner::Organization(self.id) }
}

/// Input to [`crate::store::DirectoryStore::add_organization`].
/// Preferred contacts are set afterwards, once the contacts exist.
#[derive(Debug, Clone, Default)]
pub struct NewOrganization {
  pub title:           String,
  pub acronym:         Option<String>,
  pub description:     Option<String>,
  pub web:             Option<String>,
  pub birth:           Option<NaiveDate>,
  pub legal_status_id: Option<i64>,
}

impl NewOrganization {
  pub fn new(title: impl Into<String>) -> Self {
    Self { title: title.into(), ..Self::default() }
  }
}

// ─── People ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
  pub id:            i64,
  pub uuid:          Uuid,
  pub first_name:    String,
  pub last_name:     String,
  pub pref_email_id: Option<i64>,
}

impl Person {
  pub fn owner(&self) -> ContactOwner { ContactOwner::Person(self.id) }
}

/// Input to [`crate::store::DirectoryStore::add_person`].
#[derive(Debug, Clone)]
pub struct NewPerson {
  pub first_name: String,
  pub last_name:  String,
}

impl NewPerson {
  pub fn new(first_name: impl Into<String>, last_name: impl Into<String>) -> Self {
    Self { first_name: first_name.into(), last_name: last_name.into() }
  }
}

// ─── Engagements ─────────────────────────────────────────────────────────────

/// One role assignment of a person within an organisation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Engagement {
  pub id:              i64,
  pub organization_id: i64,
  pub person_id:       i64,
  pub role_id:         i64,
}

/// An engagement joined with the person and role it references.
#[derive(Debug, Clone)]
pub struct Member {
  pub engagement: Engagement,
  pub person:     Person,
  pub role:       Role,
}
