//! Gateway configuration.
//!
//! Layered with the `config` crate: an optional TOML file, then `COOP_*`
//! environment variables, then the `PES_HOST` / `PES_API_KEY` variables the
//! directory application already exports.

use std::{fmt, path::{Path, PathBuf}, time::Duration};

use coop_core::field::OrganizationField;
use serde::Deserialize;

use crate::Result;

pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

fn default_store_path() -> PathBuf { PathBuf::from("coop.sqlite3") }

fn default_timeout_secs() -> u64 { DEFAULT_TIMEOUT_SECS }

/// Runtime configuration, deserialised from the layered sources.
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
  #[serde(default = "default_store_path")]
  pub store_path:          PathBuf,
  /// Base URL of the remote directory service.
  #[serde(default)]
  pub pes_host:            Option<String>,
  #[serde(default)]
  pub pes_api_key:         Option<String>,
  /// Timeout applied to every outbound request.
  #[serde(default = "default_timeout_secs")]
  pub timeout_secs:        u64,
  /// Fields pushed for an organisation on save.
  #[serde(default = "OrganizationField::all")]
  pub organization_fields: Vec<OrganizationField>,
}

impl GatewayConfig {
  /// Load from `path` (if given) and the process environment.
  pub fn load(path: Option<&Path>) -> Result<Self> {
    Self::from_sources(
      path,
      std::env::var("PES_HOST").ok(),
      std::env::var("PES_API_KEY").ok(),
    )
  }

  fn from_sources(
    path: Option<&Path>,
    pes_host: Option<String>,
    pes_api_key: Option<String>,
  ) -> Result<Self> {
    let mut builder = config::Config::builder();
    if let Some(path) = path {
      builder = builder.add_source(config::File::from(path).required(true));
    }
    let settings = builder
      .add_source(config::Environment::with_prefix("COOP"))
      .set_override_option("pes_host", pes_host)?
      .set_override_option("pes_api_key", pes_api_key)?
      .build()?;

    Ok(settings.try_deserialize()?)
  }

  /// Remote settings, present only when both host and key are set and
  /// non-empty.
  pub fn remote(&self) -> Option<RemoteConfig> {
    let host    = non_empty(self.pes_host.as_deref())?;
    let api_key = non_empty(self.pes_api_key.as_deref())?;
    Some(RemoteConfig {
      host:    host.to_string(),
      api_key: api_key.to_string(),
      timeout: Duration::from_secs(self.timeout_secs),
    })
  }
}

fn non_empty(s: Option<&str>) -> Option<&str> {
  s.map(str::trim).filter(|s| !s.is_empty())
}

// ─── Remote ──────────────────────────────────────────────────────────────────

/// Connection settings for the PES service.
#[derive(Clone)]
pub struct RemoteConfig {
  pub host:    String,
  pub api_key: String,
  pub timeout: Duration,
}

impl RemoteConfig {
  pub fn new(host: impl Into<String>, api_key: impl Into<String>) -> Self {
    Self {
      host:    host.into(),
      api_key: api_key.into(),
      timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
    }
  }
}

impl fmt::Debug for RemoteConfig {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("RemoteConfig")
      .field("host", &self.host)
      .field("api_key", &"[REDACTED]")
      .field("timeout", &self.timeout)
      .finish()
  }
}

#[cfg(test)]
mod tests {
  use std::io::Write as _;

  use super::*;

  fn write_config(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new()
      .suffix(".toml")
      .tempfile()
      .expect("temp config");
    file.write_all(contents.as_bytes()).expect("write config");
    file
  }

  #[test]
  fn defaults_apply_without_file() {
    let cfg = GatewayConfig::from_sources(None, None, None).unwrap();
    assert_eq!(cfg.timeout_secs, DEFAULT_TIMEOUT_SECS);
    assert_eq!(cfg.organization_fields, OrganizationField::all());
    assert!(cfg.remote().is_none());
  }

  #[test]
  fn file_values_are_read() {
    let file = write_config(
      r#"
store_path = "/var/lib/coop/directory.sqlite3"
pes_host = "https://pes.example.org"
pes_api_key = "from-file"
timeout_secs = 3
organization_fields = ["title", "members"]
"#,
    );

    let cfg = GatewayConfig::from_sources(Some(file.path()), None, None).unwrap();
    assert_eq!(cfg.store_path, PathBuf::from("/var/lib/coop/directory.sqlite3"));
    assert_eq!(cfg.organization_fields, vec![
      OrganizationField::Title,
      OrganizationField::Members,
    ]);

    let remote = cfg.remote().unwrap();
    assert_eq!(remote.host, "https://pes.example.org");
    assert_eq!(remote.api_key, "from-file");
    assert_eq!(remote.timeout, Duration::from_secs(3));
  }

  #[test]
  fn pes_variables_override_file() {
    let file = write_config("pes_host = \"http://file\"\npes_api_key = \"file\"\n");
    let cfg = GatewayConfig::from_sources(
      Some(file.path()),
      Some("http://env".into()),
      Some("env-key".into()),
    )
    .unwrap();

    let remote = cfg.remote().unwrap();
    assert_eq!(remote.host, "http://env");
    assert_eq!(remote.api_key, "env-key");
  }

  #[test]
  fn remote_requires_both_host_and_key() {
    let only_host =
      GatewayConfig::from_sources(None, Some("http://localhost".into()), None).unwrap();
    assert!(only_host.remote().is_none());

    let blank_key = GatewayConfig::from_sources(
      None,
      Some("http://localhost".into()),
      Some("  ".into()),
    )
    .unwrap();
    assert!(blank_key.remote().is_none());
  }

  #[test]
  fn unknown_field_name_is_rejected() {
    let file = write_config("organization_fields = [\"title\", \"pk\"]\n");
    assert!(GatewayConfig::from_sources(Some(file.path()), None, None).is_err());
  }

  #[test]
  fn debug_redacts_api_key() {
    let remote = RemoteConfig::new("http://localhost", "s3cret");
    let shown = format!("{remote:?}");
    assert!(!shown.contains("s3cret"));
    assert!(shown.contains("REDACTED"));
  }
}
