//! `coop-gateway`: inspect and push directory records from the shell.
//!
//! # Usage
//!
//! ```
//! coop-gateway serialize organization <UUID> --fields title,members
//! coop-gateway serialize person <UUID>
//! PES_HOST=https://pes.example.org PES_API_KEY=… coop-gateway push organization <UUID>
//! coop-gateway sync-roles
//! coop-gateway links role
//! ```
//!
//! Payloads and outcomes are printed to stdout as JSON; logs go to stderr.

use std::{path::PathBuf, sync::Arc};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use coop_core::{
  field::OrganizationField,
  foreign::ForeignKind,
  store::{DirectoryStore, ForeignRegistry},
};
use coop_gateway::{
  Error, GatewayConfig, PesClient, PesRole, Pusher, RoleDirectory, SaveEvent,
  Serializer,
};
use coop_store_sqlite::SqliteStore;
use serde::Serialize;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(author, version, about = "Coop directory gateway")]
struct Cli {
  /// Path to a TOML configuration file.
  #[arg(short, long, value_name = "FILE", env = "COOP_CONFIG")]
  config: Option<PathBuf>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Print the payload a record would be pushed with.
  Serialize {
    #[command(subcommand)]
    record: SerializeTarget,
  },
  /// Push one record to the PES host and wait for the result.
  Push {
    #[command(subcommand)]
    record: RecordRef,
  },
  /// Link local roles to the PES role directory by slug.
  SyncRoles,
  /// List the foreign links of one kind.
  Links {
    #[arg(value_parser = parse_kind)]
    kind: ForeignKind,
  },
}

#[derive(Subcommand)]
enum SerializeTarget {
  Organization {
    uuid:   Uuid,
    /// Comma-separated field names (default: the configured list).
    #[arg(long, value_delimiter = ',')]
    fields: Option<Vec<String>>,
  },
  Person {
    uuid: Uuid,
  },
}

#[derive(Subcommand)]
enum RecordRef {
  Organization { uuid: Uuid },
  Person { uuid: Uuid },
}

impl From<RecordRef> for SaveEvent {
  fn from(record: RecordRef) -> Self {
    match record {
      RecordRef::Organization { uuid } => SaveEvent::Organization(uuid),
      RecordRef::Person { uuid } => SaveEvent::Person(uuid),
    }
  }
}

fn parse_kind(s: &str) -> Result<ForeignKind, String> {
  ForeignKind::parse(s).map_err(|e| e.to_string())
}

// ─── Role directory ───────────────────────────────────────────────────────────

/// Serialisation works without a remote as long as `members` isn't asked for.
enum Roles {
  Remote(PesClient),
  Unconfigured,
}

impl Roles {
  fn from_config(config: &GatewayConfig) -> coop_gateway::Result<Self> {
    match config.remote() {
      Some(remote) => Ok(Self::Remote(PesClient::new(remote)?)),
      None => Ok(Self::Unconfigured),
    }
  }
}

impl RoleDirectory for Roles {
  async fn roles(&self) -> coop_gateway::Result<Vec<PesRole>> {
    match self {
      Self::Remote(client) => client.roles().await,
      Self::Unconfigured => Err(Error::RemoteNotConfigured),
    }
  }
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_writer(std::io::stderr)
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  let config = GatewayConfig::load(cli.config.as_deref())
    .context("failed to load configuration")?;

  let store = SqliteStore::open(&config.store_path)
    .await
    .with_context(|| format!("failed to open store at {:?}", config.store_path))?;
  tracing::debug!(path = ?config.store_path, "opened store");

  match cli.command {
    Command::Serialize { record } => {
      let roles = Roles::from_config(&config)?;
      let serializer = Serializer::new(&store, &roles);
      let payload = match record {
        SerializeTarget::Organization { uuid, fields } => {
          let fields = match fields {
            Some(names) => OrganizationField::parse_list(names)?,
            None => config.organization_fields.clone(),
          };
          let org = store
            .get_organization(uuid)
            .await?
            .ok_or(Error::NotFound { kind: ForeignKind::Organization, uuid })?;
          serializer.serialize_organization(&org, &fields).await?
        }
        SerializeTarget::Person { uuid } => {
          let person = store
            .get_person(uuid)
            .await?
            .ok_or(Error::NotFound { kind: ForeignKind::Person, uuid })?;
          serializer.serialize_person(&person).await?
        }
      };
      print_json(&payload)?;
    }

    Command::Push { record } => {
      let pusher =
        Pusher::<SqliteStore, PesClient>::from_config(Arc::new(store), &config)?;
      let outcome = pusher.push(record.into()).await?;
      print_json(&outcome)?;
    }

    Command::SyncRoles => {
      let pusher =
        Pusher::<SqliteStore, PesClient>::from_config(Arc::new(store), &config)?;
      let links = pusher.link_roles().await?;
      print_json(&links)?;
    }

    Command::Links { kind } => {
      let links = store.links(kind).await?;
      print_json(&links)?;
    }
  }

  Ok(())
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
  println!("{}", serde_json::to_string_pretty(value)?);
  Ok(())
}
