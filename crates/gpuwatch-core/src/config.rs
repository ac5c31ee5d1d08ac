// ── Reader configuration ──
//
// Describes *what* the reader watches and *where* the service lives.
// Carries credential material but never touches disk; `gpuwatch-config`
// (or any embedding host) builds a `ReaderConfig` and hands it in.

use std::collections::HashSet;
use std::fmt;
use std::time::Duration;

use gpuwatch_api::embedded::{MAX_DEVICES_PER_GROUP, MAX_FIELDS_PER_GROUP};
use gpuwatch_api::{FieldId, OperationMode, TlsCredentials, TransportConfig, WatchPolicy};

use crate::error::CoreError;
use crate::fields::{UnitConversionTable, default_fields};

pub const DEFAULT_ADDRESS: &str = "localhost:50051";
pub const DEFAULT_DEVICE_GROUP_NAME: &str = "gpuwatch_reader_gpu_group";
pub const DEFAULT_FIELD_GROUP_NAME: &str = "gpuwatch_reader_field_group";

/// Where the telemetry service runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    /// A standalone daemon at `host:port` (or a full URL).
    Remote { address: String },
    /// An engine started inside this process.
    Embedded { mode: OperationMode },
}

impl Default for Endpoint {
    fn default() -> Self {
        Self::Remote {
            address: DEFAULT_ADDRESS.into(),
        }
    }
}

impl Endpoint {
    /// `true` when the service can restart independently of this process,
    /// which is the only case where recovery makes sense.
    pub fn is_standalone(&self) -> bool {
        matches!(self, Self::Remote { .. })
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Remote { address } => f.write_str(address),
            Self::Embedded { mode } => write!(f, "embedded ({mode})"),
        }
    }
}

/// Everything a [`Reader`](crate::Reader) needs to come up.
#[derive(Debug, Clone)]
pub struct ReaderConfig {
    pub endpoint: Endpoint,
    /// Mutual TLS material for a remote endpoint. `None` = plain HTTP.
    pub credentials: Option<TlsCredentials>,
    /// Device subset to watch. `None` = every device the service reports.
    pub devices: Option<Vec<u32>>,
    pub fields: Vec<FieldId>,
    pub unit_conversion: UnitConversionTable,
    /// Service-side sampling cadence.
    pub update_interval: Duration,
    pub max_keep_age: Duration,
    pub max_keep_samples: u32,
    pub device_group_name: String,
    pub field_group_name: String,
    /// Per-request timeout against a remote endpoint.
    pub timeout: Duration,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        let policy = WatchPolicy::default();
        Self {
            endpoint: Endpoint::default(),
            credentials: None,
            devices: None,
            fields: default_fields(),
            unit_conversion: UnitConversionTable::curated(),
            update_interval: policy.update_interval,
            max_keep_age: policy.max_keep_age,
            max_keep_samples: policy.max_keep_samples,
            device_group_name: DEFAULT_DEVICE_GROUP_NAME.into(),
            field_group_name: DEFAULT_FIELD_GROUP_NAME.into(),
            timeout: Duration::from_secs(30),
        }
    }
}

impl ReaderConfig {
    /// Reject option combinations the service would refuse later.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.device_group_name.trim().is_empty() {
            return Err(CoreError::config("device group name must not be empty"));
        }
        if self.field_group_name.trim().is_empty() {
            return Err(CoreError::config("field group name must not be empty"));
        }
        if self.update_interval.is_zero() {
            return Err(CoreError::config("update interval must be greater than zero"));
        }
        if self.fields.len() > MAX_FIELDS_PER_GROUP {
            return Err(CoreError::config(format!(
                "{} fields requested, a field group holds at most {MAX_FIELDS_PER_GROUP}",
                self.fields.len()
            )));
        }
        if let Some(invalid) = self.fields.iter().find(|f| **f == FieldId::INVALID) {
            return Err(CoreError::config(format!("field {invalid} is not a valid field id")));
        }
        let mut seen = HashSet::with_capacity(self.fields.len());
        if let Some(dup) = self.fields.iter().find(|f| !seen.insert(**f)) {
            return Err(CoreError::config(format!("field {dup} is listed more than once")));
        }
        if let Some(devices) = &self.devices {
            if devices.len() > MAX_DEVICES_PER_GROUP {
                return Err(CoreError::config(format!(
                    "{} devices requested, a device group holds at most {MAX_DEVICES_PER_GROUP}",
                    devices.len()
                )));
            }
            let mut seen = HashSet::with_capacity(devices.len());
            if let Some(dup) = devices.iter().find(|d| !seen.insert(**d)) {
                return Err(CoreError::config(format!("device {dup} is listed more than once")));
            }
        }
        if let Some((field, factor)) = self.unit_conversion.iter().find(|(_, f)| !f.is_finite()) {
            return Err(CoreError::config(format!(
                "conversion factor {factor} for field {field} is not a finite number"
            )));
        }
        if self.credentials.is_some() && !self.endpoint.is_standalone() {
            return Err(CoreError::config(
                "credentials only apply to a remote endpoint",
            ));
        }
        Ok(())
    }

    pub fn watch_policy(&self) -> WatchPolicy {
        WatchPolicy {
            update_interval: self.update_interval,
            max_keep_age: self.max_keep_age,
            max_keep_samples: self.max_keep_samples,
        }
    }

    pub fn transport(&self) -> TransportConfig {
        TransportConfig {
            credentials: self.credentials.clone(),
            timeout: self.timeout,
        }
    }
}
