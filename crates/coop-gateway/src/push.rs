//! Pushing saved records to the peer instance.
//!
//! The application calls [`PushHandle::on_commit`] once its save has
//! committed. The event is queued for a background [`Pusher`] task, so the
//! save never waits on the network and never sees a push failure.
//!
//! A record's first successful push is a `POST`; the identifier the peer
//! answers with is recorded as the record's foreign link, and every later
//! push is a `PUT` to that identifier.
//!
//! Roles are never pushed. [`Pusher::link_roles`] links local roles to the
//! PES role directory by slug instead.

use std::sync::Arc;

use coop_core::{
  field::OrganizationField,
  foreign::{ForeignKind, ForeignLink},
  store::{DirectoryStore, ForeignRegistry},
};
use serde::Serialize;
use tokio::{sync::mpsc, task::JoinHandle};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
  Error, Result,
  config::GatewayConfig,
  pes::{PesClient, PushTarget, RoleDirectory},
  serialize::Serializer,
};

/// A committed save of a pushable record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveEvent {
  Organization(Uuid),
  Person(Uuid),
}

impl SaveEvent {
  pub fn kind(self) -> ForeignKind {
    match self {
      Self::Organization(_) => ForeignKind::Organization,
      Self::Person(_) => ForeignKind::Person,
    }
  }

  pub fn uuid(self) -> Uuid {
    match self {
      Self::Organization(uuid) | Self::Person(uuid) => uuid,
    }
  }
}

/// Result of one successful push.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PushOutcome {
  pub kind:       ForeignKind,
  pub local_uuid: Uuid,
  pub foreign_id: String,
  /// `true` when this push created the foreign link.
  pub linked:     bool,
}

// ─── Pusher ──────────────────────────────────────────────────────────────────

pub struct Pusher<S, C> {
  store:               Arc<S>,
  remote:              Arc<C>,
  organization_fields: Vec<OrganizationField>,
}

impl<S> Pusher<S, PesClient>
where
  S: ForeignRegistry + 'static,
{
  /// A pusher talking to the configured PES host.
  pub fn from_config(store: Arc<S>, config: &GatewayConfig) -> Result<Self> {
    let remote = config.remote().ok_or(Error::RemoteNotConfigured)?;
    Ok(Self::new(
      store,
      Arc::new(PesClient::new(remote)?),
      config.organization_fields.clone(),
    ))
  }
}

impl<S, C> Pusher<S, C>
where
  S: ForeignRegistry + 'static,
  C: RoleDirectory + PushTarget + 'static,
{
  pub fn new(
    store: Arc<S>,
    remote: Arc<C>,
    organization_fields: Vec<OrganizationField>,
  ) -> Self {
    Self { store, remote, organization_fields }
  }

  /// Serialise the saved record and send it to the peer.
  ///
  /// Only a successful first push writes to the store, and only to add the
  /// foreign link.
  pub async fn push(&self, event: SaveEvent) -> Result<PushOutcome> {
    let kind       = event.kind();
    let local_uuid = event.uuid();
    let serializer = Serializer::new(&*self.store, &*self.remote);

    let payload = match event {
      SaveEvent::Organization(uuid) => {
        let org = self
          .store
          .get_organization(uuid)
          .await
          .map_err(Error::store)?
          .ok_or(Error::NotFound { kind, uuid })?;
        serializer
          .serialize_organization(&org, &self.organization_fields)
          .await?
      }
      SaveEvent::Person(uuid) => {
        let person = self
          .store
          .get_person(uuid)
          .await
          .map_err(Error::store)?
          .ok_or(Error::NotFound { kind, uuid })?;
        serializer.serialize_person(&person).await?
      }
    };

    let existing = self
      .store
      .foreign_for(kind, local_uuid)
      .await
      .map_err(Error::store)?;
    let linked = existing.is_none();
    let foreign_id = self.remote.push(kind, existing, payload).await?;

    if linked {
      self
        .store
        .link(kind, local_uuid, foreign_id.clone())
        .await
        .map_err(Error::store)?;
    }

    info!(%kind, %local_uuid, %foreign_id, linked, "pushed record");
    Ok(PushOutcome { kind, local_uuid, foreign_id, linked })
  }

  /// Link every local role to the directory entry with the same slug.
  ///
  /// Roles the directory doesn't know are skipped. Running it again is a
  /// no-op for roles that are already linked to the same entry. Returns the
  /// links of every matched role.
  pub async fn link_roles(&self) -> Result<Vec<ForeignLink>> {
    let directory = self.remote.roles().await?;
    let local     = self.store.list_roles().await.map_err(Error::store)?;

    let mut links = Vec::new();
    for role in local {
      let Some(entry) = directory.iter().find(|r| r.slug == role.slug) else {
        debug!(slug = %role.slug, "role absent from directory");
        continue;
      };
      let link = self
        .store
        .link(ForeignKind::Role, role.uuid, entry.uuid.clone())
        .await
        .map_err(Error::store)?;
      links.push(link);
    }

    info!(linked = links.len(), "linked roles to directory");
    Ok(links)
  }

  /// Move the pusher onto a background task fed by the returned handle.
  /// Events are pushed one at a time, in order. The task ends once every
  /// handle clone is dropped.
  pub fn spawn(self) -> (PushHandle, JoinHandle<()>) {
    let (tx, mut rx) = mpsc::unbounded_channel::<SaveEvent>();
    let task = tokio::spawn(async move {
      while let Some(event) = rx.recv().await {
        if let Err(e) = self.push(event).await {
          warn!(?event, error = %e, "push failed");
        }
      }
      debug!("push worker stopped");
    });
    (PushHandle { tx: Some(tx) }, task)
  }
}

// ─── Handle ──────────────────────────────────────────────────────────────────

/// Enqueues save events for the push worker. Cheap to clone.
#[derive(Debug, Clone, Default)]
pub struct PushHandle {
  tx: Option<mpsc::UnboundedSender<SaveEvent>>,
}

impl PushHandle {
  /// A handle that drops every event.
  pub fn disabled() -> Self { Self { tx: None } }

  /// Start a push worker when the remote is configured, otherwise return a
  /// disabled handle and no task.
  ///
  /// The worker is spawned with [`tokio::spawn`], so this must be called
  /// from within a tokio runtime. The returned task finishes once every
  /// clone of the handle is dropped and the queue is drained.
  pub fn from_config<S>(
    store: Arc<S>,
    config: &GatewayConfig,
  ) -> Result<(Self, Option<JoinHandle<()>>)>
  where
    S: ForeignRegistry + 'static,
  {
    if config.remote().is_none() {
      debug!("PES remote not configured; pushes disabled");
      return Ok((Self::disabled(), None));
    }
    let (handle, task) = Pusher::<S, PesClient>::from_config(store, config)?.spawn();
    Ok((handle, Some(task)))
  }

  pub fn is_enabled(&self) -> bool { self.tx.is_some() }

  /// Queue `event`. Never blocks and never fails.
  pub fn on_commit(&self, event: SaveEvent) {
    match &self.tx {
      Some(tx) => {
        if tx.send(event).is_err() {
          warn!(?event, "push worker has stopped; event dropped");
        }
      }
      None => debug!(?event, "pushes disabled; event dropped"),
    }
  }
}
