//! Gateway between two coop directory instances.
//!
//! Serialises local directory records into a portable JSON payload keyed by
//! stable UUIDs and slugs, resolves roles against the PES role directory, and
//! pushes saved records to the peer instance.
//!
//! All collaborators are passed in explicitly: a [`coop_core::store`]
//! backend, a [`RoleDirectory`] / [`PushTarget`] (normally a [`PesClient`]),
//! and a [`GatewayConfig`].

pub mod config;
pub mod error;
pub mod pes;
pub mod push;
pub mod serialize;

pub use config::{GatewayConfig, RemoteConfig};
pub use error::{Error, Result};
pub use pes::{PesClient, PesRole, PushTarget, RoleDirectory};
pub use push::{PushHandle, PushOutcome, Pusher, SaveEvent};
pub use serialize::{Payload, Serializer};

#[cfg(test)]
mod testing;
