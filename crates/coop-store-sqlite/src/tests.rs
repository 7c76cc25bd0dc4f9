//! Integration tests for `SqliteStore` against an in-memory database.

use chrono::NaiveDate;
use coop_core::{
  foreign::ForeignKind,
  record::{ContactOwner, NewContact, NewOrganization, NewPerson},
  store::{DirectoryStore, ForeignRegistry},
};
use uuid::Uuid;

use crate::{Error, SqliteStore};

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

// ─── Organizations ───────────────────────────────────────────────────────────

#[tokio::test]
async fn add_and_get_organization() {
  let s = store().await;

  let mut input = NewOrganization::new("Les Amis du Vélo");
  input.acronym = Some("AV".into());
  input.birth = NaiveDate::from_ymd_opt(1998, 3, 14);
  let org = s.add_organization(input).await.unwrap();

  let fetched = s.get_organization(org.uuid).await.unwrap().unwrap();
  assert_eq!(fetched, org);
  assert_eq!(fetched.birth, NaiveDate::from_ymd_opt(1998, 3, 14));
  assert!(fetched.pref_phone_id.is_none());
}

#[tokio::test]
async fn get_organization_missing_returns_none() {
  let s = store().await;
  assert!(s.get_organization(Uuid::new_v4()).await.unwrap().is_none());
}

#[tokio::test]
async fn organizations_get_distinct_uuids() {
  let s = store().await;
  let a = s.add_organization(NewOrganization::new("A")).await.unwrap();
  let b = s.add_organization(NewOrganization::new("B")).await.unwrap();
  assert_ne!(a.uuid, b.uuid);
  assert_ne!(a.id, b.id);
}

#[tokio::test]
async fn update_organization_sets_preferred_contacts() {
  let s = store().await;
  let mut org = s.add_organization(NewOrganization::new("Coop")).await.unwrap();
  let phone = s
    .add_contact(NewContact { owner: org.owner(), content: "+33 1 23 45 67 89".into() })
    .await
    .unwrap();

  org.pref_phone_id = Some(phone.id);
  org.title = "Coop renamed".into();
  s.update_organization(org.clone()).await.unwrap();

  let fetched = s.get_organization(org.uuid).await.unwrap().unwrap();
  assert_eq!(fetched.pref_phone_id, Some(phone.id));
  assert_eq!(fetched.title, "Coop renamed");
}

#[tokio::test]
async fn update_missing_organization_fails() {
  let s = store().await;
  let mut org = s.add_organization(NewOrganization::new("Ghost")).await.unwrap();
  org.uuid = Uuid::new_v4();

  let err = s.update_organization(org.clone()).await.unwrap_err();
  assert!(matches!(err, Error::OrganizationNotFound(u) if u == org.uuid));
}

#[tokio::test]
async fn delete_organization_cascades_to_contacts() {
  let s = store().await;
  let org = s.add_organization(NewOrganization::new("Short-lived")).await.unwrap();
  let contact = s
    .add_contact(NewContact { owner: org.owner(), content: "hello@example.org".into() })
    .await
    .unwrap();

  assert!(s.delete_organization(org.uuid).await.unwrap());
  assert!(s.get_contact(contact.id).await.unwrap().is_none());
  assert!(!s.delete_organization(org.uuid).await.unwrap());
}

#[tokio::test]
async fn organization_cannot_prefer_another_records_contact() {
  let s = store().await;
  let mut org = s.add_organization(NewOrganization::new("Coop")).await.unwrap();
  let other = s.add_organization(NewOrganization::new("Other")).await.unwrap();
  let person = s.add_person(NewPerson::new("Ada", "Lovelace")).await.unwrap();
  let foreign_phone = s
    .add_contact(NewContact { owner: other.owner(), content: "01 00 00 00 00".into() })
    .await
    .unwrap();
  let persons_email = s
    .add_contact(NewContact { owner: person.owner(), content: "ada@example.org".into() })
    .await
    .unwrap();

  org.pref_phone_id = Some(foreign_phone.id);
  let err = s.update_organization(org.clone()).await.unwrap_err();
  assert!(matches!(
    err,
    Error::ContactNotOwned { contact_id, owner } if contact_id == foreign_phone.id && owner == org.uuid
  ));

  org.pref_phone_id = None;
  org.pref_email_id = Some(persons_email.id);
  org.title = "Renamed".into();
  let err = s.update_organization(org.clone()).await.unwrap_err();
  assert!(matches!(err, Error::ContactNotOwned { contact_id, .. } if contact_id == persons_email.id));

  let fetched = s.get_organization(org.uuid).await.unwrap().unwrap();
  assert_eq!(fetched.title, "Coop");
  assert!(fetched.pref_phone_id.is_none());
  assert!(fetched.pref_email_id.is_none());
}

#[tokio::test]
async fn person_cannot_prefer_another_persons_email() {
  let s = store().await;
  let mut person = s.add_person(NewPerson::new("Grace", "Hopper")).await.unwrap();
  let other = s.add_person(NewPerson::new("Ada", "Lovelace")).await.unwrap();
  let email = s
    .add_contact(NewContact { owner: other.owner(), content: "ada@example.org".into() })
    .await
    .unwrap();

  person.pref_email_id = Some(email.id);
  let err = s.update_person(person.clone()).await.unwrap_err();
  assert!(matches!(err, Error::ContactNotOwned { contact_id, .. } if contact_id == email.id));
  assert!(s.get_person(person.uuid).await.unwrap().unwrap().pref_email_id.is_none());
}

#[tokio::test]
async fn unknown_preferred_contact_is_rejected() {
  let s = store().await;
  let mut person = s.add_person(NewPerson::new("Grace", "Hopper")).await.unwrap();
  person.pref_email_id = Some(4242);
  let err = s.update_person(person).await.unwrap_err();
  assert!(matches!(err, Error::ContactNotOwned { contact_id: 4242, .. }));
}

// ─── Contacts ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn contacts_are_listed_per_owner_in_insertion_order() {
  let s = store().await;
  let org = s.add_organization(NewOrganization::new("Org")).await.unwrap();
  let person = s.add_person(NewPerson::new("Ada", "Lovelace")).await.unwrap();

  let first = s
    .add_contact(NewContact { owner: org.owner(), content: "01 00 00 00 00".into() })
    .await
    .unwrap();
  s.add_contact(NewContact { owner: person.owner(), content: "ada@example.org".into() })
    .await
    .unwrap();
  let second = s
    .add_contact(NewContact { owner: org.owner(), content: "org@example.org".into() })
    .await
    .unwrap();

  let listed = s.list_contacts(org.owner()).await.unwrap();
  assert_eq!(listed, vec![first, second]);

  let person_contacts = s.list_contacts(person.owner()).await.unwrap();
  assert_eq!(person_contacts.len(), 1);
  assert_eq!(person_contacts[0].owner, ContactOwner::Person(person.id));
}

#[tokio::test]
async fn contact_for_missing_owner_is_rejected() {
  let s = store().await;
  let result = s
    .add_contact(NewContact { owner: ContactOwner::Person(4242), content: "x".into() })
    .await;
  assert!(matches!(result, Err(Error::Database(_))));
}

#[tokio::test]
async fn person_keeps_preferred_email_and_cascades_on_delete() {
  let s = store().await;
  let mut person = s.add_person(NewPerson::new("Grace", "Hopper")).await.unwrap();
  let email = s
    .add_contact(NewContact { owner: person.owner(), content: "grace@example.org".into() })
    .await
    .unwrap();
  person.pref_email_id = Some(email.id);
  s.update_person(person.clone()).await.unwrap();

  let fetched = s.get_person(person.uuid).await.unwrap().unwrap();
  assert_eq!(fetched.pref_email_id, Some(email.id));

  assert!(s.delete_person(person.uuid).await.unwrap());
  assert!(s.get_contact(email.id).await.unwrap().is_none());
}

#[tokio::test]
async fn deleting_contact_clears_preferred_references() {
  let s = store().await;
  let mut org = s.add_organization(NewOrganization::new("Coop")).await.unwrap();
  let mut person = s.add_person(NewPerson::new("Grace", "Hopper")).await.unwrap();
  let phone = s
    .add_contact(NewContact { owner: org.owner(), content: "01 00 00 00 00".into() })
    .await
    .unwrap();
  let org_email = s
    .add_contact(NewContact { owner: org.owner(), content: "coop@example.org".into() })
    .await
    .unwrap();
  let email = s
    .add_contact(NewContact { owner: person.owner(), content: "grace@example.org".into() })
    .await
    .unwrap();
  org.pref_phone_id = Some(phone.id);
  org.pref_email_id = Some(org_email.id);
  s.update_organization(org.clone()).await.unwrap();
  person.pref_email_id = Some(email.id);
  s.update_person(person.clone()).await.unwrap();

  assert!(s.delete_contact(phone.id).await.unwrap());
  assert!(s.delete_contact(email.id).await.unwrap());
  assert!(!s.delete_contact(email.id).await.unwrap());

  let org = s.get_organization(org.uuid).await.unwrap().unwrap();
  assert!(org.pref_phone_id.is_none());
  assert_eq!(org.pref_email_id, Some(org_email.id));
  assert!(s.get_person(person.uuid).await.unwrap().unwrap().pref_email_id.is_none());
}

// ─── Reference records ───────────────────────────────────────────────────────

#[tokio::test]
async fn legal_status_slug_is_derived_and_unique() {
  let s = store().await;
  let a = s.add_legal_status("Association loi 1901".into()).await.unwrap();
  let b = s.add_legal_status("Association Loi 1901".into()).await.unwrap();
  let c = s.add_legal_status("association -- loi 1901".into()).await.unwrap();

  assert_eq!(a.slug, "association-loi-1901");
  assert_eq!(b.slug, "association-loi-1901-2");
  assert_eq!(c.slug, "association-loi-1901-3");

  let fetched = s.get_legal_status(b.id).await.unwrap().unwrap();
  assert_eq!(fetched, b);
}

#[tokio::test]
async fn themes_are_attached_once() {
  let s = store().await;
  let org = s.add_organization(NewOrganization::new("Org")).await.unwrap();
  let ecology = s.add_theme("Ecology".into()).await.unwrap();
  let housing = s.add_theme("Housing".into()).await.unwrap();

  s.add_organization_theme(org.id, housing.id).await.unwrap();
  s.add_organization_theme(org.id, ecology.id).await.unwrap();
  s.add_organization_theme(org.id, ecology.id).await.unwrap();

  let themes = s.organization_themes(org.id).await.unwrap();
  assert_eq!(themes, vec![ecology, housing]);
}

#[tokio::test]
async fn roles_get_uuid_and_slug() {
  let s = store().await;
  let role = s.add_role("Co-President".into()).await.unwrap();
  assert_eq!(role.slug, "co-president");

  let fetched = s.get_role(role.uuid).await.unwrap().unwrap();
  assert_eq!(fetched, role);
}

#[tokio::test]
async fn roles_are_listed_by_id() {
  let s = store().await;
  let treasurer = s.add_role("Trésorière".into()).await.unwrap();
  let chair = s.add_role("Chair".into()).await.unwrap();

  let roles = s.list_roles().await.unwrap();
  assert_eq!(roles, vec![treasurer, chair]);
  assert_eq!(roles[0].slug, "tresoriere");
}

#[tokio::test]
async fn members_join_person_and_role() {
  let s = store().await;
  let org = s.add_organization(NewOrganization::new("Org")).await.unwrap();
  let other = s.add_organization(NewOrganization::new("Other")).await.unwrap();
  let alice = s.add_person(NewPerson::new("Alice", "Martin")).await.unwrap();
  let bob = s.add_person(NewPerson::new("Bob", "Durand")).await.unwrap();
  let chair = s.add_role("Chair".into()).await.unwrap();
  let treasurer = s.add_role("Treasurer".into()).await.unwrap();

  s.add_engagement(org.id, alice.id, chair.id).await.unwrap();
  s.add_engagement(other.id, alice.id, treasurer.id).await.unwrap();
  s.add_engagement(org.id, bob.id, treasurer.id).await.unwrap();

  let members = s.organization_members(org.id).await.unwrap();
  assert_eq!(members.len(), 2);
  assert_eq!(members[0].person, alice);
  assert_eq!(members[0].role, chair);
  assert_eq!(members[1].person, bob);
  assert_eq!(members[1].role, treasurer);
  assert!(members.iter().all(|m| m.engagement.organization_id == org.id));
}

// ─── Foreign registry ────────────────────────────────────────────────────────

/// A fresh foreign identifier, shaped like the ones PES assigns to records.
fn foreign_id() -> String { Uuid::new_v4().to_string() }

#[tokio::test]
async fn link_is_visible_from_both_sides() {
  let s = store().await;
  let org = s.add_organization(NewOrganization::new("Org")).await.unwrap();
  let remote = foreign_id();

  let link = s.link(ForeignKind::Organization, org.uuid, remote.clone()).await.unwrap();
  assert_eq!(link.local_uuid, org.uuid);
  assert_eq!(link.foreign_id, remote);

  assert_eq!(
    s.foreign_for(ForeignKind::Organization, org.uuid).await.unwrap(),
    Some(remote.clone())
  );
  assert_eq!(
    s.local_for(ForeignKind::Organization, remote).await.unwrap(),
    Some(org.uuid)
  );
}

#[tokio::test]
async fn role_links_accept_short_uuids() {
  let s = store().await;
  let role = s.add_role("Chair".into()).await.unwrap();

  s.link(ForeignKind::Role, role.uuid, "BhAwqvJ2ZHqHqR5gWHvLpy".into())
    .await
    .unwrap();

  assert_eq!(
    s.foreign_for(ForeignKind::Role, role.uuid).await.unwrap().as_deref(),
    Some("BhAwqvJ2ZHqHqR5gWHvLpy")
  );
  assert_eq!(
    s.local_for(ForeignKind::Role, "BhAwqvJ2ZHqHqR5gWHvLpy".into()).await.unwrap(),
    Some(role.uuid)
  );
}

#[tokio::test]
async fn unlinked_records_resolve_to_none() {
  let s = store().await;
  let person = s.add_person(NewPerson::new("A", "B")).await.unwrap();
  assert!(s.foreign_for(ForeignKind::Person, person.uuid).await.unwrap().is_none());
  assert!(s.local_for(ForeignKind::Person, foreign_id()).await.unwrap().is_none());
}

#[tokio::test]
async fn kinds_are_independent() {
  let s = store().await;
  let person = s.add_person(NewPerson::new("A", "B")).await.unwrap();
  let remote = foreign_id();
  s.link(ForeignKind::Person, person.uuid, remote.clone()).await.unwrap();

  assert!(s.local_for(ForeignKind::Organization, remote.clone()).await.unwrap().is_none());
  assert!(s.local_for(ForeignKind::Role, remote).await.unwrap().is_none());
}

#[tokio::test]
async fn relinking_same_pair_returns_existing_link() {
  let s = store().await;
  let role = s.add_role("Chair".into()).await.unwrap();
  let remote = foreign_id();

  let first = s.link(ForeignKind::Role, role.uuid, remote.clone()).await.unwrap();
  let second = s.link(ForeignKind::Role, role.uuid, remote).await.unwrap();
  assert_eq!(first.linked_at.timestamp_micros(), second.linked_at.timestamp_micros());
  assert_eq!(s.links(ForeignKind::Role).await.unwrap().len(), 1);
}

#[tokio::test]
async fn local_record_links_at_most_once() {
  let s = store().await;
  let org = s.add_organization(NewOrganization::new("Org")).await.unwrap();
  let first = foreign_id();
  s.link(ForeignKind::Organization, org.uuid, first.clone()).await.unwrap();

  let err = s
    .link(ForeignKind::Organization, org.uuid, foreign_id())
    .await
    .unwrap_err();
  assert!(matches!(err, Error::AlreadyLinked { existing, .. } if existing == first));
}

#[tokio::test]
async fn foreign_id_links_at_most_once() {
  let s = store().await;
  let a = s.add_organization(NewOrganization::new("A")).await.unwrap();
  let b = s.add_organization(NewOrganization::new("B")).await.unwrap();
  let remote = foreign_id();
  s.link(ForeignKind::Organization, a.uuid, remote.clone()).await.unwrap();

  let err = s
    .link(ForeignKind::Organization, b.uuid, remote.clone())
    .await
    .unwrap_err();
  assert!(matches!(err, Error::ForeignTaken { foreign_id, .. } if foreign_id == remote));
  assert!(s.foreign_for(ForeignKind::Organization, b.uuid).await.unwrap().is_none());
}

#[tokio::test]
async fn linking_missing_local_record_fails() {
  let s = store().await;
  let missing = Uuid::new_v4();
  let err = s
    .link(ForeignKind::Person, missing, foreign_id())
    .await
    .unwrap_err();
  assert!(matches!(err, Error::LocalNotFound(ForeignKind::Person, u) if u == missing));
}

#[tokio::test]
async fn link_is_destroyed_with_local_record() {
  let s = store().await;
  let person = s.add_person(NewPerson::new("A", "B")).await.unwrap();
  let remote = foreign_id();
  s.link(ForeignKind::Person, person.uuid, remote.clone()).await.unwrap();

  s.delete_person(person.uuid).await.unwrap();
  assert!(s.local_for(ForeignKind::Person, remote).await.unwrap().is_none());
  assert!(s.links(ForeignKind::Person).await.unwrap().is_empty());
}

#[tokio::test]
async fn links_are_listed_oldest_first() {
  let s = store().await;
  let a = s.add_person(NewPerson::new("A", "A")).await.unwrap();
  let b = s.add_person(NewPerson::new("B", "B")).await.unwrap();
  s.link(ForeignKind::Person, b.uuid, foreign_id()).await.unwrap();
  s.link(ForeignKind::Person, a.uuid, foreign_id()).await.unwrap();

  let links = s.links(ForeignKind::Person).await.unwrap();
  let order: Vec<_> = links.iter().map(|l| l.local_uuid).collect();
  assert_eq!(order, vec![b.uuid, a.uuid]);
  assert!(links.iter().all(|l| l.kind == ForeignKind::Person));
}
