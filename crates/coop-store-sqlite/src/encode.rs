//! Encoding and decoding helpers between Rust records and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 strings, calendar dates as `YYYY-MM-DD`,
//! UUIDs as hyphenated lowercase strings. Local ids are plain integers.

use chrono::{DateTime, NaiveDate, Utc};
use coop_core::{
  foreign::{ForeignKind, ForeignLink},
  record::{Contact, ContactOwner, Engagement, Member, Organization, Person, Role},
};
use rusqlite::Row;
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ────────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── NaiveDate ────────────────────────────────────────────────────────────────

const DATE_FORMAT: &str = "%Y-%m-%d";

pub fn encode_date(d: NaiveDate) -> String { d.format(DATE_FORMAT).to_string() }

pub fn decode_date(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s, DATE_FORMAT)
    .map_err(|e| Error::DateParse(format!("{s:?}: {e}")))
}

// ─── ContactOwner ─────────────────────────────────────────────────────────────

/// Split an owner into the `(organization_id, person_id)` column pair.
pub fn encode_owner(owner: ContactOwner) -> (Option<i64>, Option<i64>) {
  match owner {
    ContactOwner::Organization(id) => (Some(id), None),
    ContactOwner::Person(id) => (None, Some(id)),
  }
}

pub fn decode_owner(
  organization_id: Option<i64>,
  person_id: Option<i64>,
) -> Result<ContactOwner> {
  match (organization_id, person_id) {
    (Some(id), None) => Ok(ContactOwner::Organization(id)),
    (None, Some(id)) => Ok(ContactOwner::Person(id)),
    other => Err(Error::InvalidRow(format!("contact owner columns {other:?}"))),
  }
}

// ─── Row types ───────────────────────────────────────────────────────────────

pub const ORGANIZATION_COLUMNS: &str = "id, uuid, title, acronym, description, \
  web, birth, legal_status_id, pref_phone_id, pref_email_id";

/// Raw values read directly from an `organizations` row.
pub struct RawOrganization {
  pub id:              i64,
  pub uuid:            String,
  pub title:           String,
  pub acronym:         Option<String>,
  pub description:     Option<String>,
  pub web:             Option<String>,
  pub birth:           Option<String>,
  pub legal_status_id: Option<i64>,
  pub pref_phone_id:   Option<i64>,
  pub pref_email_id:   Option<i64>,
}

impl RawOrganization {
  pub fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:              row.get(0)?,
      uuid:            row.get(1)?,
      title:           row.get(2)?,
      acronym:         row.get(3)?,
      description:     row.get(4)?,
      web:             row.get(5)?,
      birth:           row.get(6)?,
      legal_status_id: row.get(7)?,
      pref_phone_id:   row.get(8)?,
      pref_email_id:   row.get(9)?,
    })
  }

  pub fn into_organization(self) -> Result<Organization> {
    Ok(Organization {
      id:              self.id,
      uuid:            decode_uuid(&self.uuid)?,
      title:           self.title,
      acronym:         self.acronym,
      description:     self.description,
      web:             self.web,
      birth:           self.birth.as_deref().map(decode_date).transpose()?,
      legal_status_id: self.legal_status_id,
      pref_phone_id:   self.pref_phone_id,
      pref_email_id:   self.pref_email_id,
    })
  }
}

pub const PERSON_COLUMNS: &str = "id, uuid, first_name, last_name, pref_email_id";

/// Raw values read from a `persons` row, starting at column `at`.
pub struct RawPerson {
  pub id:            i64,
  pub uuid:          String,
  pub first_name:    String,
  pub last_name:     String,
  pub pref_email_id: Option<i64>,
}

impl RawPerson {
  pub fn read(row: &Row<'_>, at: usize) -> rusqlite::Result<Self> {
    Ok(Self {
      id:            row.get(at)?,
      uuid:          row.get(at + 1)?,
      first_name:    row.get(at + 2)?,
      last_name:     row.get(at + 3)?,
      pref_email_id: row.get(at + 4)?,
    })
  }

  pub fn into_person(self) -> Result<Person> {
    Ok(Person {
      id:            self.id,
      uuid:          decode_uuid(&self.uuid)?,
      first_name:    self.first_name,
      last_name:     self.last_name,
      pref_email_id: self.pref_email_id,
    })
  }
}

pub const ROLE_COLUMNS: &str = "id, uuid, label, slug";

pub struct RawRole {
  pub id:    i64,
  pub uuid:  String,
  pub label: String,
  pub slug:  String,
}

impl RawRole {
  pub fn read(row: &Row<'_>, at: usize) -> rusqlite::Result<Self> {
    Ok(Self {
      id:    row.get(at)?,
      uuid:  row.get(at + 1)?,
      label: row.get(at + 2)?,
      slug:  row.get(at + 3)?,
    })
  }

  pub fn into_role(self) -> Result<Role> {
    Ok(Role {
      id:    self.id,
      uuid:  decode_uuid(&self.uuid)?,
      label: self.label,
      slug:  self.slug,
    })
  }
}

pub const CONTACT_COLUMNS: &str = "id, uuid, content, organization_id, person_id";

pub struct RawContact {
  pub id:              i64,
  pub uuid:            String,
  pub content:         String,
  pub organization_id: Option<i64>,
  pub person_id:       Option<i64>,
}

impl RawContact {
  pub fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:              row.get(0)?,
      uuid:            row.get(1)?,
      content:         row.get(2)?,
      organization_id: row.get(3)?,
      person_id:       row.get(4)?,
    })
  }

  pub fn into_contact(self) -> Result<Contact> {
    Ok(Contact {
      id:      self.id,
      uuid:    decode_uuid(&self.uuid)?,
      content: self.content,
      owner:   decode_owner(self.organization_id, self.person_id)?,
    })
  }
}

/// An `engagements` row joined with its person and role.
pub struct RawMember {
  pub engagement: Engagement,
  pub person:     RawPerson,
  pub role:       RawRole,
}

impl RawMember {
  pub fn into_member(self) -> Result<Member> {
    Ok(Member {
      engagement: self.engagement,
      person:     self.person.into_person()?,
      role:       self.role.into_role()?,
    })
  }
}

/// A link row joined with the local record's UUID.
pub struct RawLink {
  pub local_uuid: String,
  pub foreign_id: String,
  pub linked_at:  String,
}

impl RawLink {
  pub fn into_link(self, kind: ForeignKind) -> Result<ForeignLink> {
    Ok(ForeignLink {
      kind,
      local_uuid: decode_uuid(&self.local_uuid)?,
      foreign_id: self.foreign_id,
      linked_at:  decode_dt(&self.linked_at)?,
    })
  }
}
