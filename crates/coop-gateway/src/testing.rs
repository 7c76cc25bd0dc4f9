//! Test doubles for the PES service.
//!
//! [`FakeRemote`] implements the client traits in-process and records every
//! call. [`FakePes`] is a real HTTP server on a loopback port for exercising
//! [`crate::PesClient`] end to end.

use std::{
  sync::{
    Arc, Mutex,
    atomic::{AtomicBool, AtomicUsize, Ordering},
  },
  time::Duration,
};

use axum::{
  Json, Router,
  extract::{Path, State},
  http::{HeaderMap, Method, StatusCode, Uri, header},
  response::{IntoResponse, Response},
  routing::{get, post, put},
};
use coop_core::foreign::ForeignKind;
use serde_json::{Value, json};
use tokio::{net::TcpListener, sync::oneshot, task::JoinHandle};
use uuid::Uuid;

use crate::{
  Error, Result,
  pes::{PesRole, PushTarget, RoleDirectory},
  serialize::Payload,
};

// ─── In-process fake ─────────────────────────────────────────────────────────

/// A push received by [`FakeRemote`].
#[derive(Debug, Clone)]
pub struct RecordedPush {
  pub kind:     ForeignKind,
  pub foreign:  Option<String>,
  pub payload:  Payload,
  /// The identifier the fake answered with.
  pub assigned: String,
}

#[derive(Default)]
pub struct FakeRemote {
  roles:        Vec<PesRole>,
  role_fetches: AtomicUsize,
  pushes:       Mutex<Vec<RecordedPush>>,
  fail_roles:   AtomicBool,
  fail_pushes:  AtomicBool,
}

impl FakeRemote {
  pub fn with_roles(roles: Vec<PesRole>) -> Self {
    Self { roles, ..Self::default() }
  }

  pub fn role_fetches(&self) -> usize { self.role_fetches.load(Ordering::SeqCst) }

  pub fn pushes(&self) -> Vec<RecordedPush> {
    self.pushes.lock().expect("pushes lock").clone()
  }

  pub fn set_fail_roles(&self, fail: bool) { self.fail_roles.store(fail, Ordering::SeqCst); }

  pub fn set_fail_pushes(&self, fail: bool) { self.fail_pushes.store(fail, Ordering::SeqCst); }
}

fn unavailable(context: &str) -> Error {
  Error::Status {
    context: context.to_string(),
    status:  StatusCode::SERVICE_UNAVAILABLE,
  }
}

impl RoleDirectory for FakeRemote {
  async fn roles(&self) -> Result<Vec<PesRole>> {
    self.role_fetches.fetch_add(1, Ordering::SeqCst);
    if self.fail_roles.load(Ordering::SeqCst) {
      return Err(unavailable("GET fake roles"));
    }
    Ok(self.roles.clone())
  }
}

impl PushTarget for FakeRemote {
  async fn push(
    &self,
    kind:    ForeignKind,
    foreign: Option<String>,
    payload: Payload,
  ) -> Result<String> {
    if self.fail_pushes.load(Ordering::SeqCst) {
      return Err(unavailable("fake push"));
    }
    let assigned = foreign.clone().unwrap_or_else(|| Uuid::new_v4().to_string());
    self.pushes.lock().expect("pushes lock").push(RecordedPush {
      kind,
      foreign,
      payload,
      assigned: assigned.clone(),
    });
    Ok(assigned)
  }
}

// ─── HTTP fake ───────────────────────────────────────────────────────────────

/// A request received by [`FakePes`].
#[derive(Debug, Clone)]
pub struct RecordedRequest {
  pub method:        String,
  pub path:          String,
  pub authorization: Option<String>,
  pub body:          Option<Value>,
}

#[derive(Default)]
struct PesState {
  roles:             Vec<PesRole>,
  requests:          Mutex<Vec<RecordedRequest>>,
  created:           Mutex<Vec<String>>,
  fail_with:         Mutex<Option<StatusCode>>,
  delay:             Mutex<Option<Duration>>,
  omit_created_uuid: AtomicBool,
  malformed_roles:   AtomicBool,
}

impl PesState {
  fn record(&self, method: &Method, uri: &Uri, headers: &HeaderMap, body: Option<Value>) {
    let authorization = headers
      .get(header::AUTHORIZATION)
      .and_then(|v| v.to_str().ok())
      .map(str::to_string);
    self.requests.lock().expect("requests lock").push(RecordedRequest {
      method: method.to_string(),
      path: uri.path().to_string(),
      authorization,
      body,
    });
  }

  /// Apply the configured delay, auth check and forced failure.
  async fn gate(&self, headers: &HeaderMap) -> Option<Response> {
    let delay = *self.delay.lock().expect("delay lock");
    if let Some(delay) = delay {
      tokio::time::sleep(delay).await;
    }

    let expected = format!("Bearer {}", FakePes::API_KEY);
    let authorized = headers
      .get(header::AUTHORIZATION)
      .and_then(|v| v.to_str().ok())
      .is_some_and(|v| v == expected);
    if !authorized {
      return Some((StatusCode::UNAUTHORIZED, "bad api key").into_response());
    }

    let forced = *self.fail_with.lock().expect("fail lock");
    forced.map(|status| (status, "forced failure").into_response())
  }
}

async fn list_roles(
  State(state): State<Arc<PesState>>,
  method: Method,
  uri: Uri,
  headers: HeaderMap,
) -> Response {
  state.record(&method, &uri, &headers, None);
  if let Some(resp) = state.gate(&headers).await {
    return resp;
  }
  if state.malformed_roles.load(Ordering::SeqCst) {
    return Json(json!({ "not": "a list" })).into_response();
  }
  Json(state.roles.clone()).into_response()
}

async fn create(
  State(state): State<Arc<PesState>>,
  Path(_collection): Path<String>,
  method: Method,
  uri: Uri,
  headers: HeaderMap,
  Json(body): Json<Value>,
) -> Response {
  state.record(&method, &uri, &headers, Some(body));
  if let Some(resp) = state.gate(&headers).await {
    return resp;
  }
  let uuid = Uuid::new_v4().to_string();
  state.created.lock().expect("created lock").push(uuid.clone());
  if state.omit_created_uuid.load(Ordering::SeqCst) {
    return (StatusCode::CREATED, Json(json!({ "status": "ok" }))).into_response();
  }
  (StatusCode::CREATED, Json(json!({ "uuid": uuid }))).into_response()
}

async fn update(
  State(state): State<Arc<PesState>>,
  Path((_collection, id)): Path<(String, String)>,
  method: Method,
  uri: Uri,
  headers: HeaderMap,
  Json(body): Json<Value>,
) -> Response {
  state.record(&method, &uri, &headers, Some(body));
  if let Some(resp) = state.gate(&headers).await {
    return resp;
  }
  Json(json!({ "uuid": id })).into_response()
}

/// A PES stand-in listening on `127.0.0.1`.
pub struct FakePes {
  pub base_url: String,
  state:        Arc<PesState>,
  shutdown:     oneshot::Sender<()>,
  task:         JoinHandle<()>,
}

impl FakePes {
  pub const API_KEY: &'static str = "test-api-key";

  pub async fn start(roles: Vec<PesRole>) -> Self {
    let state = Arc::new(PesState { roles, ..PesState::default() });
    let app = Router::new()
      .route("/api/roles/", get(list_roles))
      .route("/api/{collection}/", post(create))
      .route("/api/{collection}/{id}/", put(update))
      .with_state(state.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind fake PES");
    let addr = listener.local_addr().expect("fake PES address");
    let (shutdown, signal) = oneshot::channel::<()>();
    let task = tokio::spawn(async move {
      axum::serve(listener, app)
        .with_graceful_shutdown(async move {
          signal.await.ok();
        })
        .await
        .expect("fake PES server");
    });

    Self { base_url: format!("http://{addr}"), state, shutdown, task }
  }

  pub fn requests(&self) -> Vec<RecordedRequest> {
    self.state.requests.lock().expect("requests lock").clone()
  }

  /// Identifiers handed out by `POST`, in order.
  pub fn created(&self) -> Vec<String> {
    self.state.created.lock().expect("created lock").clone()
  }

  pub fn fail_with(&self, status: StatusCode) {
    *self.state.fail_with.lock().expect("fail lock") = Some(status);
  }

  pub fn delay_by(&self, delay: Duration) {
    *self.state.delay.lock().expect("delay lock") = Some(delay);
  }

  pub fn omit_created_uuid(&self) {
    self.state.omit_created_uuid.store(true, Ordering::SeqCst);
  }

  /// Answer `GET /api/roles/` with an object instead of a list.
  pub fn serve_malformed_roles(&self) {
    self.state.malformed_roles.store(true, Ordering::SeqCst);
  }

  /// Stop listening; later connections are refused.
  pub async fn shutdown(self) {
    self.shutdown.send(()).ok();
    self.task.await.ok();
  }
}
