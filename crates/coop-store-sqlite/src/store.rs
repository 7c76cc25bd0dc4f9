//! [`SqliteStore`], the SQLite implementation of [`DirectoryStore`] and
//! [`ForeignRegistry`].

use std::path::Path;

use chrono::Utc;
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use coop_core::{
  foreign::{ForeignKind, ForeignLink},
  record::{
    Contact, ContactOwner, Engagement, LegalStatus, Member, NewContact,
    NewOrganization, NewPerson, Organization, Person, Role, TransverseTheme,
  },
  slug::{slugify, with_suffix},
  store::{DirectoryStore, ForeignRegistry},
};

use crate::{
  encode::{
    CONTACT_COLUMNS, ORGANIZATION_COLUMNS, PERSON_COLUMNS, ROLE_COLUMNS,
    RawContact, RawLink, RawMember, RawOrganization, RawPerson, RawRole,
    decode_dt, decode_uuid, encode_date, encode_dt, encode_owner, encode_uuid,
  },
  schema::SCHEMA,
  Error, Result,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A coop directory backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, used by the tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Insert a labelled row whose slug must be unique within `table`.
  /// Returns the new row id and the slug actually used.
  async fn insert_slugged(
    &self,
    table: &'static str,
    uuid: Option<Uuid>,
    label: String,
  ) -> Result<(i64, String)> {
    let base     = slugify(&label);
    let uuid_str = uuid.map(encode_uuid);

    let inserted = self
      .conn
      .call(move |conn| {
        let tx   = conn.transaction()?;
        let slug = unique_slug(&tx, table, &base)?;
        match uuid_str {
          Some(u) => tx.execute(
            &format!("INSERT INTO {table} (uuid, label, slug) VALUES (?1, ?2, ?3)"),
            rusqlite::params![u, label, slug],
          )?,
          None => tx.execute(
            &format!("INSERT INTO {table} (label, slug) VALUES (?1, ?2)"),
            rusqlite::params![label, slug],
          )?,
        };
        let id = tx.last_insert_rowid();
        tx.commit()?;
        Ok((id, slug))
      })
      .await?;

    Ok(inserted)
  }

  async fn delete_by_uuid(&self, table: &'static str, uuid: Uuid) -> Result<bool> {
    let uuid_str = encode_uuid(uuid);
    let deleted = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          &format!("DELETE FROM {table} WHERE uuid = ?1"),
          rusqlite::params![uuid_str],
        )?)
      })
      .await?;
    Ok(deleted > 0)
  }
}

/// First free slug in `table` for `base`: `base`, `base-2`, `base-3`, ….
fn unique_slug(
  conn: &rusqlite::Connection,
  table: &str,
  base: &str,
) -> rusqlite::Result<String> {
  let sql = format!("SELECT 1 FROM {table} WHERE slug = ?1");
  let mut n = 1;
  loop {
    let candidate = with_suffix(base, n);
    let taken = conn
      .query_row(&sql, rusqlite::params![candidate], |_| Ok(()))
      .optional()?
      .is_some();
    if !taken {
      return Ok(candidate);
    }
    n += 1;
  }
}

/// `(link table, local table)` for a foreign kind.
fn link_tables(kind: ForeignKind) -> (&'static str, &'static str) {
  match kind {
    ForeignKind::Organization => ("foreign_organizations", "organizations"),
    ForeignKind::Person => ("foreign_persons", "persons"),
    ForeignKind::Role => ("foreign_roles", "roles"),
  }
}

/// Whether the contact `contact_id` is attached to the owner row `owner_id`
/// through `column` (`organization_id` or `person_id`).
fn owns_contact(
  conn: &rusqlite::Connection,
  column: &str,
  owner_id: i64,
  contact_id: i64,
) -> rusqlite::Result<bool> {
  Ok(
    conn
      .query_row(
        &format!("SELECT 1 FROM contacts WHERE id = ?1 AND {column} = ?2"),
        rusqlite::params![contact_id, owner_id],
        |_| Ok(()),
      )
      .optional()?
      .is_some(),
  )
}

/// What an organisation or person update found inside its transaction.
enum UpdateOutcome {
  Missing,
  Updated,
  ContactNotOwned(i64),
}

/// What [`ForeignRegistry::link`] found inside its transaction.
enum LinkOutcome {
  LocalMissing,
  Created,
  Existing { linked_at: String },
  LocalTaken { existing: String },
  ForeignTaken,
}

// ─── DirectoryStore impl ─────────────────────────────────────────────────────

impl DirectoryStore for SqliteStore {
  type Error = Error;

  // ── Organizations ─────────────────────────────────────────────────────────

  async fn add_organization(&self, input: NewOrganization) -> Result<Organization> {
    let uuid      = Uuid::new_v4();
    let uuid_str  = encode_uuid(uuid);
    let birth_str = input.birth.map(encode_date);
    let row       = input.clone();

    let id = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO organizations (
             uuid, title, acronym, description, web, birth, legal_status_id
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
          rusqlite::params![
            uuid_str,
            row.title,
            row.acronym,
            row.description,
            row.web,
            birth_str,
            row.legal_status_id,
          ],
        )?;
        Ok(conn.last_insert_rowid())
      })
      .await?;

    Ok(Organization {
      id,
      uuid,
      title:           input.title,
      acronym:         input.acronym,
      description:     input.description,
      web:             input.web,
      birth:           input.birth,
      legal_status_id: input.legal_status_id,
      pref_phone_id:   None,
      pref_email_id:   None,
    })
  }

  async fn get_organization(&self, uuid: Uuid) -> Result<Option<Organization>> {
    let uuid_str = encode_uuid(uuid);

    let raw: Option<RawOrganization> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("SELECT {ORGANIZATION_COLUMNS} FROM organizations WHERE uuid = ?1"),
            rusqlite::params![uuid_str],
            RawOrganization::read,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawOrganization::into_organization).transpose()
  }

  async fn update_organization(&self, organization: Organization) -> Result<()> {
    let uuid      = organization.uuid;
    let uuid_str  = encode_uuid(uuid);
    let birth_str = organization.birth.map(encode_date);

    let outcome = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let id: Option<i64> = tx
          .query_row(
            "SELECT id FROM organizations WHERE uuid = ?1",
            rusqlite::params![uuid_str],
            |row| row.get(0),
          )
          .optional()?;
        let Some(id) = id else {
          return Ok(UpdateOutcome::Missing);
        };

        let preferred = [organization.pref_phone_id, organization.pref_email_id];
        for contact_id in preferred.into_iter().flatten() {
          if !owns_contact(&tx, "organization_id", id, contact_id)? {
            return Ok(UpdateOutcome::ContactNotOwned(contact_id));
          }
        }

        tx.execute(
          "UPDATE organizations SET
             title = ?2, acronym = ?3, description = ?4, web = ?5, birth = ?6,
             legal_status_id = ?7, pref_phone_id = ?8, pref_email_id = ?9
           WHERE id = ?1",
          rusqlite::params![
            id,
            organization.title,
            organization.acronym,
            organization.description,
            organization.web,
            birth_str,
            organization.legal_status_id,
            organization.pref_phone_id,
            organization.pref_email_id,
          ],
        )?;
        tx.commit()?;
        Ok(UpdateOutcome::Updated)
      })
      .await?;

    match outcome {
      UpdateOutcome::Updated => Ok(()),
      UpdateOutcome::Missing => Err(Error::OrganizationNotFound(uuid)),
      UpdateOutcome::ContactNotOwned(contact_id) => {
        Err(Error::ContactNotOwned { contact_id, owner: uuid })
      }
    }
  }

  async fn delete_organization(&self, uuid: Uuid) -> Result<bool> {
    self.delete_by_uuid("organizations", uuid).await
  }

  async fn organization_themes(&self, organization_id: i64) -> Result<Vec<TransverseTheme>> {
    let themes = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT t.id, t.name
           FROM transverse_themes t
           JOIN organization_themes ot ON ot.theme_id = t.id
           WHERE ot.organization_id = ?1
           ORDER BY t.id",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![organization_id], |row| {
            Ok(TransverseTheme { id: row.get(0)?, name: row.get(1)? })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    Ok(themes)
  }

  async fn organization_members(&self, organization_id: i64) -> Result<Vec<Member>> {
    let raws: Vec<RawMember> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT
             e.id, e.organization_id, e.person_id, e.role_id,
             p.id, p.uuid, p.first_name, p.last_name, p.pref_email_id,
             r.id, r.uuid, r.label, r.slug
           FROM engagements e
           JOIN persons p ON p.id = e.person_id
           JOIN roles   r ON r.id = e.role_id
           WHERE e.organization_id = ?1
           ORDER BY e.id",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![organization_id], |row| {
            Ok(RawMember {
              engagement: Engagement {
                id:              row.get(0)?,
                organization_id: row.get(1)?,
                person_id:       row.get(2)?,
                role_id:         row.get(3)?,
              },
              person: RawPerson::read(row, 4)?,
              role:   RawRole::read(row, 9)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawMember::into_member).collect()
  }

  // ── People ────────────────────────────────────────────────────────────────

  async fn add_person(&self, input: NewPerson) -> Result<Person> {
    let uuid     = Uuid::new_v4();
    let uuid_str = encode_uuid(uuid);
    let row      = input.clone();

    let id = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO persons (uuid, first_name, last_name) VALUES (?1, ?2, ?3)",
          rusqlite::params![uuid_str, row.first_name, row.last_name],
        )?;
        Ok(conn.last_insert_rowid())
      })
      .await?;

    Ok(Person {
      id,
      uuid,
      first_name:    input.first_name,
      last_name:     input.last_name,
      pref_email_id: None,
    })
  }

  async fn get_person(&self, uuid: Uuid) -> Result<Option<Person>> {
    let uuid_str = encode_uuid(uuid);

    let raw: Option<RawPerson> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("SELECT {PERSON_COLUMNS} FROM persons WHERE uuid = ?1"),
            rusqlite::params![uuid_str],
            |row| RawPerson::read(row, 0),
          )
          .optional()?)
      })
      .await?;

    raw.map(RawPerson::into_person).transpose()
  }

  async fn update_person(&self, person: Person) -> Result<()> {
    let uuid     = person.uuid;
    let uuid_str = encode_uuid(uuid);

    let outcome = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let id: Option<i64> = tx
          .query_row(
            "SELECT id FROM persons WHERE uuid = ?1",
            rusqlite::params![uuid_str],
            |row| row.get(0),
          )
          .optional()?;
        let Some(id) = id else {
          return Ok(UpdateOutcome::Missing);
        };

        if let Some(contact_id) = person.pref_email_id {
          if !owns_contact(&tx, "person_id", id, contact_id)? {
            return Ok(UpdateOutcome::ContactNotOwned(contact_id));
          }
        }

        tx.execute(
          "UPDATE persons SET first_name = ?2, last_name = ?3, pref_email_id = ?4
           WHERE id = ?1",
          rusqlite::params![id, person.first_name, person.last_name, person.pref_email_id],
        )?;
        tx.commit()?;
        Ok(UpdateOutcome::Updated)
      })
      .await?;

    match outcome {
      UpdateOutcome::Updated => Ok(()),
      UpdateOutcome::Missing => Err(Error::PersonNotFound(uuid)),
      UpdateOutcome::ContactNotOwned(contact_id) => {
        Err(Error::ContactNotOwned { contact_id, owner: uuid })
      }
    }
  }

  async fn delete_person(&self, uuid: Uuid) -> Result<bool> {
    self.delete_by_uuid("persons", uuid).await
  }

  // ── Contacts ──────────────────────────────────────────────────────────────

  async fn add_contact(&self, input: NewContact) -> Result<Contact> {
    let uuid     = Uuid::new_v4();
    let uuid_str = encode_uuid(uuid);
    let content  = input.content.clone();
    let (organization_id, person_id) = encode_owner(input.owner);

    let id = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO contacts (uuid, content, organization_id, person_id)
           VALUES (?1, ?2, ?3, ?4)",
          rusqlite::params![uuid_str, content, organization_id, person_id],
        )?;
        Ok(conn.last_insert_rowid())
      })
      .await?;

    Ok(Contact { id, uuid, content: input.content, owner: input.owner })
  }

  async fn get_contact(&self, id: i64) -> Result<Option<Contact>> {
    let raw: Option<RawContact> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("SELECT {CONTACT_COLUMNS} FROM contacts WHERE id = ?1"),
            rusqlite::params![id],
            RawContact::read,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawContact::into_contact).transpose()
  }

  async fn list_contacts(&self, owner: ContactOwner) -> Result<Vec<Contact>> {
    let (column, owner_id) = match owner {
      ContactOwner::Organization(id) => ("organization_id", id),
      ContactOwner::Person(id) => ("person_id", id),
    };

    let raws: Vec<RawContact> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {CONTACT_COLUMNS} FROM contacts WHERE {column} = ?1 ORDER BY id"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![owner_id], RawContact::read)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawContact::into_contact).collect()
  }

  async fn delete_contact(&self, id: i64) -> Result<bool> {
    let deleted = self
      .conn
      .call(move |conn| {
        Ok(conn.execute("DELETE FROM contacts WHERE id = ?1", rusqlite::params![id])?)
      })
      .await?;
    Ok(deleted > 0)
  }

  // ── Reference records ─────────────────────────────────────────────────────

  async fn add_legal_status(&self, label: String) -> Result<LegalStatus> {
    let (id, slug) = self
      .insert_slugged("legal_statuses", None, label.clone())
      .await?;
    Ok(LegalStatus { id, label, slug })
  }

  async fn get_legal_status(&self, id: i64) -> Result<Option<LegalStatus>> {
    let status = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            "SELECT id, label, slug FROM legal_statuses WHERE id = ?1",
            rusqlite::params![id],
            |row| {
              Ok(LegalStatus {
                id:    row.get(0)?,
                label: row.get(1)?,
                slug:  row.get(2)?,
              })
            },
          )
          .optional()?)
      })
      .await?;

    Ok(status)
  }

  async fn add_theme(&self, name: String) -> Result<TransverseTheme> {
    let row = name.clone();
    let id = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO transverse_themes (name) VALUES (?1)",
          rusqlite::params![row],
        )?;
        Ok(conn.last_insert_rowid())
      })
      .await?;

    Ok(TransverseTheme { id, name })
  }

  async fn add_organization_theme(&self, organization_id: i64, theme_id: i64) -> Result<()> {
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT OR IGNORE INTO organization_themes (organization_id, theme_id)
           VALUES (?1, ?2)",
          rusqlite::params![organization_id, theme_id],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn add_role(&self, label: String) -> Result<Role> {
    let uuid = Uuid::new_v4();
    let (id, slug) = self
      .insert_slugged("roles", Some(uuid), label.clone())
      .await?;
    Ok(Role { id, uuid, label, slug })
  }

  async fn get_role(&self, uuid: Uuid) -> Result<Option<Role>> {
    let uuid_str = encode_uuid(uuid);

    let raw: Option<RawRole> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("SELECT {ROLE_COLUMNS} FROM roles WHERE uuid = ?1"),
            rusqlite::params![uuid_str],
            |row| RawRole::read(row, 0),
          )
          .optional()?)
      })
      .await?;

    raw.map(RawRole::into_role).transpose()
  }

  async fn list_roles(&self) -> Result<Vec<Role>> {
    let raws: Vec<RawRole> = self
      .conn
      .call(|conn| {
        let mut stmt =
          conn.prepare(&format!("SELECT {ROLE_COLUMNS} FROM roles ORDER BY id"))?;
        let rows = stmt
          .query_map([], |row| RawRole::read(row, 0))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawRole::into_role).collect()
  }

  async fn add_engagement(
    &self,
    organization_id: i64,
    person_id:       i64,
    role_id:         i64,
  ) -> Result<Engagement> {
    let id = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO engagements (organization_id, person_id, role_id)
           VALUES (?1, ?2, ?3)",
          rusqlite::params![organization_id, person_id, role_id],
        )?;
        Ok(conn.last_insert_rowid())
      })
      .await?;

    Ok(Engagement { id, organization_id, person_id, role_id })
  }
}

// ─── ForeignRegistry impl ────────────────────────────────────────────────────

impl ForeignRegistry for SqliteStore {
  async fn link(
    &self,
    kind:       ForeignKind,
    local_uuid: Uuid,
    foreign_id: String,
  ) -> Result<ForeignLink> {
    let (link_table, local_table) = link_tables(kind);
    let local_str   = encode_uuid(local_uuid);
    let foreign_str = foreign_id.clone();
    let now         = Utc::now();
    let now_str     = encode_dt(now);

    let outcome = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let local_id: Option<i64> = tx
          .query_row(
            &format!("SELECT id FROM {local_table} WHERE uuid = ?1"),
            rusqlite::params![local_str],
            |r| r.get(0),
          )
          .optional()?;
        let Some(local_id) = local_id else {
          return Ok(LinkOutcome::LocalMissing);
        };

        let by_local: Option<(String, String)> = tx
          .query_row(
            &format!("SELECT foreign_id, linked_at FROM {link_table} WHERE local_id = ?1"),
            rusqlite::params![local_id],
            |r| Ok((r.get(0)?, r.get(1)?)),
          )
          .optional()?;
        if let Some((existing, linked_at)) = by_local {
          return Ok(if existing == foreign_str {
            LinkOutcome::Existing { linked_at }
          } else {
            LinkOutcome::LocalTaken { existing }
          });
        }

        let foreign_taken = tx
          .query_row(
            &format!("SELECT 1 FROM {link_table} WHERE foreign_id = ?1"),
            rusqlite::params![foreign_str],
            |_| Ok(()),
          )
          .optional()?
          .is_some();
        if foreign_taken {
          return Ok(LinkOutcome::ForeignTaken);
        }

        tx.execute(
          &format!(
            "INSERT INTO {link_table} (local_id, foreign_id, linked_at) VALUES (?1, ?2, ?3)"
          ),
          rusqlite::params![local_id, foreign_str, now_str],
        )?;
        tx.commit()?;
        Ok(LinkOutcome::Created)
      })
      .await?;

    let linked_at = match outcome {
      LinkOutcome::Created => now,
      LinkOutcome::Existing { linked_at } => decode_dt(&linked_at)?,
      LinkOutcome::LocalMissing => return Err(Error::LocalNotFound(kind, local_uuid)),
      LinkOutcome::LocalTaken { existing } => {
        return Err(Error::AlreadyLinked { kind, local_uuid, existing });
      }
      LinkOutcome::ForeignTaken => {
        return Err(Error::ForeignTaken { kind, foreign_id });
      }
    };

    Ok(ForeignLink { kind, local_uuid, foreign_id, linked_at })
  }

  async fn foreign_for(&self, kind: ForeignKind, local_uuid: Uuid) -> Result<Option<String>> {
    let (link_table, local_table) = link_tables(kind);
    let local_str = encode_uuid(local_uuid);

    let found: Option<String> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!(
              "SELECT f.foreign_id
               FROM {link_table} f
               JOIN {local_table} l ON l.id = f.local_id
               WHERE l.uuid = ?1"
            ),
            rusqlite::params![local_str],
            |r| r.get(0),
          )
          .optional()?)
      })
      .await?;

    Ok(found)
  }

  async fn local_for(&self, kind: ForeignKind, foreign_id: String) -> Result<Option<Uuid>> {
    let (link_table, local_table) = link_tables(kind);

    let found: Option<String> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!(
              "SELECT l.uuid
               FROM {link_table} f
               JOIN {local_table} l ON l.id = f.local_id
               WHERE f.foreign_id = ?1"
            ),
            rusqlite::params![foreign_id],
            |r| r.get(0),
          )
          .optional()?)
      })
      .await?;

    found.as_deref().map(decode_uuid).transpose()
  }

  async fn links(&self, kind: ForeignKind) -> Result<Vec<ForeignLink>> {
    let (link_table, local_table) = link_tables(kind);

    let raws: Vec<RawLink> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT l.uuid, f.foreign_id, f.linked_at
           FROM {link_table} f
           JOIN {local_table} l ON l.id = f.local_id
           ORDER BY f.id"
        ))?;
        let rows = stmt
          .query_map([], |row| {
            Ok(RawLink {
              local_uuid: row.get(0)?,
              foreign_id: row.get(1)?,
              linked_at:  row.get(2)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(|raw| raw.into_link(kind)).collect()
  }
}
