//! Client for the PES directory service.
//!
//! PES plays two parts: it is the role directory that maps role slugs to
//! stable UUIDs, and it is the peer that receives pushed records.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/api/roles/` | `[{"slug": …, "uuid": …}]` |
//! | `POST` | `/api/{organizations\|persons}/` | First push; response carries `{"uuid": …}` |
//! | `PUT`  | `/api/{organizations\|persons}/{id}/` | Later pushes of a linked record |
//!
//! Identifiers handed out by PES are opaque strings: roles use short UUIDs,
//! records use whatever the peer assigns.

use std::future::Future;

use coop_core::foreign::ForeignKind;
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{Error, Result, config::RemoteConfig, serialize::Payload};

// ─── Traits ──────────────────────────────────────────────────────────────────

/// One entry of the external role directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PesRole {
  pub slug: String,
  /// Opaque identifier assigned by the directory.
  pub uuid: String,
}

/// Source of the slug → UUID role mapping.
pub trait RoleDirectory: Send + Sync {
  /// Fetch the whole directory. One call is one outbound request.
  fn roles(&self) -> impl Future<Output = Result<Vec<PesRole>>> + Send + '_;
}

/// Receiver of pushed records.
pub trait PushTarget: Send + Sync {
  /// Send `payload` to the peer. `foreign` is the peer's identifier for the
  /// record when a link already exists. Returns the peer's identifier.
  fn push(
    &self,
    kind: ForeignKind,
    foreign: Option<String>,
    payload: Payload,
  ) -> impl Future<Output = Result<String>> + Send + '_;
}

/// URL segment for a pushed record kind.
pub fn collection(kind: ForeignKind) -> &'static str {
  match kind {
    ForeignKind::Organization => "organizations",
    ForeignKind::Person => "persons",
    ForeignKind::Role => "roles",
  }
}

// ─── HTTP client ─────────────────────────────────────────────────────────────

/// HTTP client for the PES API.
///
/// Cheap to clone: the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct PesClient {
  client: Client,
  remote: RemoteConfig,
}

#[derive(Deserialize)]
struct Created {
  uuid: String,
}

impl PesClient {
  pub fn new(remote: RemoteConfig) -> Result<Self> {
    let client = Client::builder()
      .timeout(remote.timeout)
      .build()
      .map_err(|source| Error::Http {
        context: "building HTTP client".to_string(),
        source,
      })?;
    Ok(Self { client, remote })
  }

  fn url(&self, path: &str) -> String {
    format!(
      "{}/api/{}",
      self.remote.host.trim_end_matches('/'),
      path.trim_start_matches('/')
    )
  }

  fn auth(&self, req: RequestBuilder) -> RequestBuilder {
    req.bearer_auth(&self.remote.api_key)
  }
}

impl RoleDirectory for PesClient {
  /// `GET /api/roles/`
  async fn roles(&self) -> Result<Vec<PesRole>> {
    let url     = self.url("roles/");
    let context = format!("GET {url}");
    debug!(%url, "fetching role directory");

    let resp = self
      .auth(self.client.get(&url))
      .send()
      .await
      .map_err(|source| Error::Http { context: context.clone(), source })?;

    if !resp.status().is_success() {
      return Err(Error::Status { context, status: resp.status() });
    }
    resp
      .json()
      .await
      .map_err(|e| Error::MalformedResponse { context, reason: e.to_string() })
  }
}

impl PushTarget for PesClient {
  /// `POST /api/{collection}/` or `PUT /api/{collection}/{foreign}/`
  async fn push(
    &self,
    kind:    ForeignKind,
    foreign: Option<String>,
    payload: Payload,
  ) -> Result<String> {
    let collection = collection(kind);
    let (req, context) = match &foreign {
      Some(f) => {
        let url = self.url(&format!("{collection}/{f}/"));
        (self.client.put(&url), format!("PUT {url}"))
      }
      None => {
        let url = self.url(&format!("{collection}/"));
        (self.client.post(&url), format!("POST {url}"))
      }
    };
    debug!(%context, "pushing record");

    let resp = self
      .auth(req)
      .json(&payload)
      .send()
      .await
      .map_err(|source| Error::Http { context: context.clone(), source })?;

    if !resp.status().is_success() {
      return Err(Error::Status { context, status: resp.status() });
    }
    if let Some(f) = foreign {
      return Ok(f);
    }

    let created: Created = resp
      .json()
      .await
      .map_err(|e| Error::MalformedResponse { context, reason: e.to_string() })?;
    Ok(created.uuid)
  }
}
