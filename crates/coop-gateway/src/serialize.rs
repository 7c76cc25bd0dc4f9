//! Projection of directory records onto portable JSON payloads.
//!
//! Every reference that leaves this instance is expressed by UUID or slug,
//! with one exception: `transverse_themes` carries local theme ids.

use std::collections::HashMap;

use coop_core::{
  field::{OrganizationField, UUID_KEY},
  record::{Contact, ContactOwner, Organization, Person},
  store::DirectoryStore,
};
use serde_json::{Map, Value, json};

use crate::{Error, Result, pes::RoleDirectory};

/// A serialised record.
pub type Payload = Map<String, Value>;

/// Serialises records read from `store`, resolving roles through `roles`.
pub struct Serializer<'a, S, R> {
  store: &'a S,
  roles: &'a R,
}

impl<'a, S, R> Serializer<'a, S, R>
where
  S: DirectoryStore,
  R: RoleDirectory,
{
  pub fn new(store: &'a S, roles: &'a R) -> Self { Self { store, roles } }

  /// Serialise `organization` restricted to `fields`. `uuid` is always
  /// present; a field requested twice is emitted once.
  pub async fn serialize_organization(
    &self,
    organization: &Organization,
    fields: &[OrganizationField],
  ) -> Result<Payload> {
    let mut payload = Payload::new();
    payload.insert(UUID_KEY.to_string(), json!(organization.uuid));

    for &field in fields {
      if payload.contains_key(field.key()) {
        continue;
      }
      let value = self.organization_field(organization, field).await?;
      payload.insert(field.key().to_string(), value);
    }
    Ok(payload)
  }

  /// Serialise `person` with its fixed field set.
  pub async fn serialize_person(&self, person: &Person) -> Result<Payload> {
    let mut payload = Payload::new();
    payload.insert(UUID_KEY.to_string(), json!(person.uuid));
    payload.insert("first_name".to_string(), json!(person.first_name));
    payload.insert("last_name".to_string(), json!(person.last_name));
    payload.insert("pref_email".to_string(), self.contact_uuid(person.pref_email_id).await?);
    payload.insert("contacts".to_string(), self.contacts(person.owner()).await?);
    Ok(payload)
  }

  async fn organization_field(
    &self,
    org: &Organization,
    field: OrganizationField,
  ) -> Result<Value> {
    use OrganizationField as F;

    Ok(match field {
      F::Title => json!(org.title),
      F::Acronym => json!(org.acronym),
      F::Description => json!(org.description),
      F::Web => json!(org.web),
      F::Birth => json!(org.birth),
      F::LegalStatus => match org.legal_status_id {
        Some(id) => {
          let status = self.store.get_legal_status(id).await.map_err(Error::store)?;
          json!(status.map(|s| s.slug))
        }
        None => Value::Null,
      },
      F::TransverseThemes => {
        let themes = self.store.organization_themes(org.id).await.map_err(Error::store)?;
        Value::Array(themes.into_iter().map(|t| json!(t.id)).collect())
      }
      F::PrefPhone => self.contact_uuid(org.pref_phone_id).await?,
      F::PrefEmail => self.contact_uuid(org.pref_email_id).await?,
      F::Contacts => self.contacts(org.owner()).await?,
      F::Members => self.members(org.id).await?,
    })
  }

  /// UUID of the referenced contact, or null.
  async fn contact_uuid(&self, id: Option<i64>) -> Result<Value> {
    let Some(id) = id else {
      return Ok(Value::Null);
    };
    let contact = self.store.get_contact(id).await.map_err(Error::store)?;
    Ok(json!(contact.map(|c| c.uuid)))
  }

  async fn contacts(&self, owner: ContactOwner) -> Result<Value> {
    let contacts = self.store.list_contacts(owner).await.map_err(Error::store)?;
    Ok(Value::Array(contacts.iter().map(contact_entry).collect()))
  }

  /// `[{person, role}]`, one per engagement. The role directory is fetched
  /// once per call, whatever the number of engagements.
  async fn members(&self, organization_id: i64) -> Result<Value> {
    let directory: HashMap<String, String> = self
      .roles
      .roles()
      .await?
      .into_iter()
      .map(|r| (r.slug, r.uuid))
      .collect();

    let members = self
      .store
      .organization_members(organization_id)
      .await
      .map_err(Error::store)?;

    members
      .into_iter()
      .map(|m| -> Result<Value> {
        let role = directory
          .get(&m.role.slug)
          .ok_or_else(|| Error::UnmatchedRole(m.role.slug.clone()))?;
        Ok(json!({ "person": m.person.uuid, "role": role }))
      })
      .collect::<Result<Vec<_>>>()
      .map(Value::Array)
  }
}

fn contact_entry(contact: &Contact) -> Value {
  json!({ "uuid": contact.uuid, "content": contact.content })
}
