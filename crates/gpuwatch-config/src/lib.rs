//! Configuration for the gpuwatch reader.
//!
//! TOML file + `GPUWATCH_` environment layering, field-name resolution,
//! TLS credential loading, and translation to
//! `gpuwatch_core::ReaderConfig`. The binary applies its flags on top of
//! a loaded [`Config`] before translating.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use gpuwatch_core::config::{DEFAULT_ADDRESS, DEFAULT_DEVICE_GROUP_NAME, DEFAULT_FIELD_GROUP_NAME};
use gpuwatch_core::{
    Endpoint, FieldId, OperationMode, ReaderConfig, TlsCredentials, UnitConversionTable,
    default_fields,
};

/// Address value that selects an in-process engine instead of a daemon.
pub const EMBEDDED_ADDRESS: &str = "embedded";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("incomplete TLS credentials: missing {}", missing.join(", "))]
    IncompleteCredentials { missing: Vec<&'static str> },

    #[error("cannot read {}: {source}", path.display())]
    Credential {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub service: ServiceSection,

    #[serde(default)]
    pub credentials: CredentialSection,

    #[serde(default)]
    pub watch: WatchSection,

    #[serde(default)]
    pub groups: GroupSection,

    #[serde(default)]
    pub unit_conversion: ConversionSection,
}

/// Where the telemetry service runs.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceSection {
    /// `host:port` of the daemon, or `"embedded"`.
    #[serde(default = "default_address")]
    pub address: String,

    /// Start an in-process engine regardless of `address`.
    #[serde(default)]
    pub embedded: bool,

    /// Scheduling mode of an embedded engine.
    #[serde(default)]
    pub mode: OperationMode,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

impl Default for ServiceSection {
    fn default() -> Self {
        Self {
            address: default_address(),
            embedded: false,
            mode: OperationMode::default(),
            timeout: default_timeout(),
        }
    }
}

fn default_address() -> String {
    DEFAULT_ADDRESS.into()
}
fn default_timeout() -> u64 {
    30
}

/// PEM file paths for mutual TLS. All three or none.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CredentialSection {
    /// Ignore any configured paths and connect without TLS.
    #[serde(default)]
    pub unauthenticated: bool,

    pub root_ca: Option<PathBuf>,
    pub client_cert: Option<PathBuf>,
    pub client_key: Option<PathBuf>,
}

/// What to watch and how long the service keeps it.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct WatchSection {
    /// Device indices. Unset = every device the service reports.
    pub devices: Option<Vec<u32>>,

    /// Field names (`RDC_FI_GPU_TEMP`) or raw ids. Wins over `fields_file`.
    pub fields: Option<Vec<String>>,

    /// File with one field name per line.
    pub fields_file: Option<PathBuf>,

    /// Service sampling interval in seconds.
    #[serde(default = "default_update_interval")]
    pub update_interval: u64,

    /// Retention age in seconds.
    #[serde(default = "default_max_keep_age")]
    pub max_keep_age: u64,

    #[serde(default = "default_max_keep_samples")]
    pub max_keep_samples: u32,
}

impl Default for WatchSection {
    fn default() -> Self {
        Self {
            devices: None,
            fields: None,
            fields_file: None,
            update_interval: default_update_interval(),
            max_keep_age: default_max_keep_age(),
            max_keep_samples: default_max_keep_samples(),
        }
    }
}

fn default_update_interval() -> u64 {
    10
}
fn default_max_keep_age() -> u64 {
    3600
}
fn default_max_keep_samples() -> u32 {
    1000
}

/// Names of the groups this reader owns on the service.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GroupSection {
    #[serde(default = "default_device_group")]
    pub device_group: String,

    #[serde(default = "default_field_group")]
    pub field_group: String,
}

impl Default for GroupSection {
    fn default() -> Self {
        Self {
            device_group: default_device_group(),
            field_group: default_field_group(),
        }
    }
}

fn default_device_group() -> String {
    DEFAULT_DEVICE_GROUP_NAME.into()
}
fn default_field_group() -> String {
    DEFAULT_FIELD_GROUP_NAME.into()
}

/// Unit conversion overrides on top of the curated factors.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ConversionSection {
    /// Deliver raw service units; `factors` still apply.
    #[serde(default)]
    pub raw: bool,

    /// Field name -> multiplicative factor.
    #[serde(default)]
    pub factors: BTreeMap<String, f64>,
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "gpuwatch", "gpuwatch").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("gpuwatch");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the config from the default path + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load the config from `path` + environment. A missing file is not an
/// error; defaults apply.
///
/// Nested keys come from `GPUWATCH_<SECTION>__<KEY>`, e.g.
/// `GPUWATCH_SERVICE__ADDRESS=gpu-node:50051`.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("GPUWATCH_").split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

impl Config {
    /// Render as TOML, e.g. to seed a config file.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn endpoint(&self) -> Endpoint {
        if self.service.embedded || self.service.address.eq_ignore_ascii_case(EMBEDDED_ADDRESS) {
            Endpoint::Embedded {
                mode: self.service.mode,
            }
        } else {
            Endpoint::Remote {
                address: self.service.address.clone(),
            }
        }
    }

    /// Translate into a validated `ReaderConfig`, reading any PEM and
    /// field-list files it references.
    pub fn to_reader_config(&self) -> Result<ReaderConfig, ConfigError> {
        let endpoint = self.endpoint();
        let credentials = if endpoint.is_standalone() {
            load_credentials(&self.credentials)?
        } else {
            None
        };

        if self.watch.update_interval == 0 {
            return Err(ConfigError::Validation {
                field: "watch.update_interval".into(),
                reason: "must be at least 1 second".into(),
            });
        }

        let config = ReaderConfig {
            endpoint,
            credentials,
            devices: self.watch.devices.clone(),
            fields: resolve_fields(&self.watch)?,
            unit_conversion: resolve_conversion(&self.unit_conversion)?,
            update_interval: Duration::from_secs(self.watch.update_interval),
            max_keep_age: Duration::from_secs(self.watch.max_keep_age),
            max_keep_samples: self.watch.max_keep_samples,
            device_group_name: self.groups.device_group.clone(),
            field_group_name: self.groups.field_group.clone(),
            timeout: Duration::from_secs(self.service.timeout),
        };

        config.validate().map_err(|e| ConfigError::Validation {
            field: "reader".into(),
            reason: e.to_string(),
        })?;
        Ok(config)
    }
}

// ── Field resolution ────────────────────────────────────────────────

/// Resolve field names into ids.
///
/// An explicit list wins over a file; with neither, the default fields
/// apply. Unknown names are reported and skipped.
pub fn resolve_fields(watch: &WatchSection) -> Result<Vec<FieldId>, ConfigError> {
    let names: Vec<String> = if let Some(ref names) = watch.fields {
        names.clone()
    } else if let Some(ref path) = watch.fields_file {
        read_fields_file(path)?
    } else {
        return Ok(default_fields());
    };

    Ok(parse_field_names(&names))
}

/// Parse names (or raw ids), warning about and dropping unknown ones.
pub fn parse_field_names<S: AsRef<str>>(names: &[S]) -> Vec<FieldId> {
    names
        .iter()
        .filter_map(|name| match name.as_ref().parse::<FieldId>() {
            Ok(id) => Some(id),
            Err(e) => {
                warn!("{e}, ignoring it");
                None
            }
        })
        .collect()
}

/// One field name per line; blank lines and `#` comments are skipped.
pub fn read_fields_file(path: &Path) -> Result<Vec<String>, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_owned)
        .collect())
}

fn resolve_conversion(section: &ConversionSection) -> Result<UnitConversionTable, ConfigError> {
    let mut table = if section.raw {
        UnitConversionTable::empty()
    } else {
        UnitConversionTable::curated()
    };
    for (name, factor) in &section.factors {
        let field = name
            .parse::<FieldId>()
            .map_err(|e| ConfigError::Validation {
                field: "unit_conversion.factors".into(),
                reason: e.to_string(),
            })?;
        table.insert(field, *factor);
    }
    Ok(table)
}

// ── Credential loading ──────────────────────────────────────────────

/// Read the three PEM files, or none.
///
/// `unauthenticated` wins over configured paths. Some-but-not-all paths
/// is an error rather than a silent downgrade to plain HTTP.
pub fn load_credentials(section: &CredentialSection) -> Result<Option<TlsCredentials>, ConfigError> {
    if section.unauthenticated {
        return Ok(None);
    }

    let (root_ca, client_cert, client_key) =
        match (&section.root_ca, &section.client_cert, &section.client_key) {
            (None, None, None) => return Ok(None),
            (Some(ca), Some(cert), Some(key)) => (ca, cert, key),
            (ca, cert, key) => {
                let missing = [
                    ("root_ca", ca.is_none()),
                    ("client_cert", cert.is_none()),
                    ("client_key", key.is_none()),
                ]
                .into_iter()
                .filter_map(|(name, absent)| absent.then_some(name))
                .collect();
                return Err(ConfigError::IncompleteCredentials { missing });
            }
        };

    Ok(Some(TlsCredentials {
        root_ca: read_pem(root_ca)?,
        client_cert: read_pem(client_cert)?,
        client_key: SecretString::from(read_pem(client_key)?),
    }))
}

fn read_pem(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|source| ConfigError::Credential {
        path: path.to_path_buf(),
        source,
    })
}
