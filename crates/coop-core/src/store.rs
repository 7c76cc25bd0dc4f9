//! The `DirectoryStore` and `ForeignRegistry` traits.
//!
//! Both are implemented by storage backends (e.g. `coop-store-sqlite`). The
//! gateway depends on these abstractions, not on any concrete backend.

use std::future::Future;

use uuid::Uuid;

use crate::{
  foreign::{ForeignKind, ForeignLink},
  record::{
    Contact, ContactOwner, Engagement, LegalStatus, Member, NewContact,
    NewOrganization, NewPerson, Organization, Person, Role, TransverseTheme,
  },
};

// ─── Directory ───────────────────────────────────────────────────────────────

/// Read and write access to the directory records.
///
/// Reads are what the serialiser needs; writes are what the surrounding
/// application performs when it saves a record.
///
/// All methods return `Send` futures so the trait can be used from spawned
/// tokio tasks.
pub trait DirectoryStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Organizations ─────────────────────────────────────────────────────

  /// Create and persist a new organisation with a fresh UUID.
  fn add_organization(
    &self,
    input: NewOrganization,
  ) -> impl Future<Output = Result<Organization, Self::Error>> + Send + '_;

  /// Retrieve an organisation by UUID. Returns `None` if not found.
  fn get_organization(
    &self,
    uuid: Uuid,
  ) -> impl Future<Output = Result<Option<Organization>, Self::Error>> + Send + '_;

  /// Overwrite every mutable column of an existing organisation.
  /// `id` and `uuid` identify the row and are never changed. Preferred
  /// contacts must belong to this organisation.
  fn update_organization(
    &self,
    organization: Organization,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Delete an organisation together with its contacts, engagements and
  /// foreign link. Returns `false` if it did not exist.
  fn delete_organization(
    &self,
    uuid: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Themes attached to an organisation, by ascending id.
  fn organization_themes(
    &self,
    organization_id: i64,
  ) -> impl Future<Output = Result<Vec<TransverseTheme>, Self::Error>> + Send + '_;

  /// Engagements of an organisation joined with their person and role, in
  /// insertion order.
  fn organization_members(
    &self,
    organization_id: i64,
  ) -> impl Future<Output = Result<Vec<Member>, Self::Error>> + Send + '_;

  // ── People ────────────────────────────────────────────────────────────

  fn add_person(
    &self,
    input: NewPerson,
  ) -> impl Future<Output = Result<Person, Self::Error>> + Send + '_;

  fn get_person(
    &self,
    uuid: Uuid,
  ) -> impl Future<Output = Result<Option<Person>, Self::Error>> + Send + '_;

  /// Preferred email must be one of the person's own contacts.
  fn update_person(
    &self,
    person: Person,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn delete_person(
    &self,
    uuid: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  // ── Contacts ──────────────────────────────────────────────────────────

  fn add_contact(
    &self,
    input: NewContact,
  ) -> impl Future<Output = Result<Contact, Self::Error>> + Send + '_;

  fn get_contact(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<Option<Contact>, Self::Error>> + Send + '_;

  /// Every contact attached to `owner`, in insertion order.
  fn list_contacts(
    &self,
    owner: ContactOwner,
  ) -> impl Future<Output = Result<Vec<Contact>, Self::Error>> + Send + '_;

  /// Delete a contact. Preferred-contact references to it are cleared.
  /// Returns `false` if it did not exist.
  fn delete_contact(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  // ── Reference records ─────────────────────────────────────────────────

  /// Create a legal status; its slug is derived from `label` and made
  /// unique.
  fn add_legal_status(
    &self,
    label: String,
  ) -> impl Future<Output = Result<LegalStatus, Self::Error>> + Send + '_;

  fn get_legal_status(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<Option<LegalStatus>, Self::Error>> + Send + '_;

  fn add_theme(
    &self,
    name: String,
  ) -> impl Future<Output = Result<TransverseTheme, Self::Error>> + Send + '_;

  /// Attach a theme to an organisation. Attaching twice is a no-op.
  fn add_organization_theme(
    &self,
    organization_id: i64,
    theme_id: i64,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Create a role; its slug is derived from `label` and made unique.
  fn add_role(
    &self,
    label: String,
  ) -> impl Future<Output = Result<Role, Self::Error>> + Send + '_;

  fn get_role(
    &self,
    uuid: Uuid,
  ) -> impl Future<Output = Result<Option<Role>, Self::Error>> + Send + '_;

  /// Every role, by ascending id.
  fn list_roles(&self) -> impl Future<Output = Result<Vec<Role>, Self::Error>> + Send + '_;

  fn add_engagement(
    &self,
    organization_id: i64,
    person_id: i64,
    role_id: i64,
  ) -> impl Future<Output = Result<Engagement, Self::Error>> + Send + '_;
}

// ─── Foreign registry ────────────────────────────────────────────────────────

/// One-to-one links between local records and their peer counterparts.
pub trait ForeignRegistry: DirectoryStore {
  /// Link a local record to a foreign identifier.
  ///
  /// Linking the same pair again returns the existing link. Linking a record
  /// that already has a different counterpart, or a foreign identifier that
  /// already belongs to another record, is an error.
  fn link(
    &self,
    kind: ForeignKind,
    local_uuid: Uuid,
    foreign_id: String,
  ) -> impl Future<Output = Result<ForeignLink, Self::Error>> + Send + '_;

  /// The foreign identifier linked to a local record, if any.
  fn foreign_for(
    &self,
    kind: ForeignKind,
    local_uuid: Uuid,
  ) -> impl Future<Output = Result<Option<String>, Self::Error>> + Send + '_;

  /// The local record UUID linked to a foreign identifier, if any.
  fn local_for(
    &self,
    kind: ForeignKind,
    foreign_id: String,
  ) -> impl Future<Output = Result<Option<Uuid>, Self::Error>> + Send + '_;

  /// Every link of one kind, oldest first.
  fn links(
    &self,
    kind: ForeignKind,
  ) -> impl Future<Output = Result<Vec<ForeignLink>, Self::Error>> + Send + '_;
}
