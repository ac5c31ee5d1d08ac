// ── Telemetry service model ──
//
// Types exchanged with the telemetry service. Both session kinds speak in
// these terms; the JSON shapes double as the gateway wire format.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ── Identifiers ──────────────────────────────────────────────────────

/// Service-assigned identifier of a device group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceGroupId(pub u32);

impl fmt::Display for DeviceGroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Service-assigned identifier of a field group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldGroupId(pub u32);

impl fmt::Display for FieldGroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

// ── Fields ───────────────────────────────────────────────────────────

/// Enumerated metric identifier understood by the service.
///
/// Carries the raw numeric id so that fields unknown to this build still
/// round-trip through group listings unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldId(u32);

/// Catalog entry for a known field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDescriptor {
    pub id: FieldId,
    /// Service-side enum name, e.g. `RDC_FI_GPU_TEMP`.
    pub name: &'static str,
    pub description: &'static str,
}

impl FieldId {
    pub const INVALID: Self = Self(0);
    pub const GPU_COUNT: Self = Self(1);
    pub const DEV_NAME: Self = Self(2);
    pub const GPU_CLOCK: Self = Self(100);
    pub const MEM_CLOCK: Self = Self(101);
    pub const MEMORY_TEMP: Self = Self(200);
    pub const GPU_TEMP: Self = Self(201);
    pub const POWER_USAGE: Self = Self(300);
    pub const PCIE_TX: Self = Self(400);
    pub const PCIE_RX: Self = Self(401);
    pub const GPU_UTIL: Self = Self(500);
    pub const GPU_MEMORY_USAGE: Self = Self(501);
    pub const GPU_MEMORY_TOTAL: Self = Self(502);
    pub const ECC_CORRECT_TOTAL: Self = Self(600);
    pub const ECC_UNCORRECT_TOTAL: Self = Self(601);

    pub const fn from_raw(id: u32) -> Self {
        Self(id)
    }

    pub const fn raw(self) -> u32 {
        self.0
    }

    /// All fields this build knows by name.
    pub fn catalog() -> &'static [FieldDescriptor] {
        FIELD_CATALOG
    }

    pub fn descriptor(self) -> Option<&'static FieldDescriptor> {
        FIELD_CATALOG.iter().find(|d| d.id == self)
    }

    /// Service enum name (`RDC_FI_*`), if the field is in the catalog.
    pub fn name(self) -> Option<&'static str> {
        self.descriptor().map(|d| d.name)
    }

    /// Look a field up by its service enum name. Exact match only.
    pub fn from_name(name: &str) -> Option<Self> {
        FIELD_CATALOG.iter().find(|d| d.name == name).map(|d| d.id)
    }

    /// Lowercase name suitable for a metric/gauge identifier.
    pub fn metric_name(self) -> String {
        match self.name() {
            Some(name) => name.to_ascii_lowercase(),
            None => format!("rdc_fi_{}", self.0),
        }
    }
}

impl fmt::Display for FieldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => f.write_str(name),
            None => write!(f, "FIELD_{}", self.0),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown field '{0}'")]
pub struct UnknownFieldError(pub String);

impl FromStr for FieldId {
    type Err = UnknownFieldError;

    /// Accepts a catalog name (`RDC_FI_GPU_TEMP`) or a raw numeric id.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some(id) = Self::from_name(s) {
            return Ok(id);
        }
        match s.parse::<u32>() {
            Ok(0) | Err(_) => Err(UnknownFieldError(s.to_owned())),
            Ok(raw) => Ok(Self(raw)),
        }
    }
}

const FIELD_CATALOG: &[FieldDescriptor] = &[
    FieldDescriptor {
        id: FieldId::GPU_COUNT,
        name: "RDC_FI_GPU_COUNT",
        description: "GPU count in the system",
    },
    FieldDescriptor {
        id: FieldId::DEV_NAME,
        name: "RDC_FI_DEV_NAME",
        description: "Name of the device",
    },
    FieldDescriptor {
        id: FieldId::GPU_CLOCK,
        name: "RDC_FI_GPU_CLOCK",
        description: "Current GPU clock (Hz)",
    },
    FieldDescriptor {
        id: FieldId::MEM_CLOCK,
        name: "RDC_FI_MEM_CLOCK",
        description: "Current memory clock (Hz)",
    },
    FieldDescriptor {
        id: FieldId::MEMORY_TEMP,
        name: "RDC_FI_MEMORY_TEMP",
        description: "Memory temperature (millidegrees C)",
    },
    FieldDescriptor {
        id: FieldId::GPU_TEMP,
        name: "RDC_FI_GPU_TEMP",
        description: "GPU temperature (millidegrees C)",
    },
    FieldDescriptor {
        id: FieldId::POWER_USAGE,
        name: "RDC_FI_POWER_USAGE",
        description: "Power usage (microwatts)",
    },
    FieldDescriptor {
        id: FieldId::PCIE_TX,
        name: "RDC_FI_PCIE_TX",
        description: "PCIe Tx utilization",
    },
    FieldDescriptor {
        id: FieldId::PCIE_RX,
        name: "RDC_FI_PCIE_RX",
        description: "PCIe Rx utilization",
    },
    FieldDescriptor {
        id: FieldId::GPU_UTIL,
        name: "RDC_FI_GPU_UTIL",
        description: "GPU busy percentage",
    },
    FieldDescriptor {
        id: FieldId::GPU_MEMORY_USAGE,
        name: "RDC_FI_GPU_MEMORY_USAGE",
        description: "VRAM used (bytes)",
    },
    FieldDescriptor {
        id: FieldId::GPU_MEMORY_TOTAL,
        name: "RDC_FI_GPU_MEMORY_TOTAL",
        description: "VRAM total (bytes)",
    },
    FieldDescriptor {
        id: FieldId::ECC_CORRECT_TOTAL,
        name: "RDC_FI_ECC_CORRECT_TOTAL",
        description: "Accumulated correctable ECC errors",
    },
    FieldDescriptor {
        id: FieldId::ECC_UNCORRECT_TOTAL,
        name: "RDC_FI_ECC_UNCORRECT_TOTAL",
        description: "Accumulated uncorrectable ECC errors",
    },
];

// ── Values ───────────────────────────────────────────────────────────

/// Kind tag of a sampled value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum FieldType {
    Integer,
    Double,
    String,
    Blob,
}

/// A typed sampled value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum FieldValue {
    Integer(i64),
    Double(f64),
    String(String),
    Blob(Vec<u8>),
}

impl FieldValue {
    pub fn kind(&self) -> FieldType {
        match self {
            Self::Integer(_) => FieldType::Integer,
            Self::Double(_) => FieldType::Double,
            Self::String(_) => FieldType::String,
            Self::Blob(_) => FieldType::Blob,
        }
    }

    /// Numeric view of the value; `None` for text and binary kinds.
    #[allow(clippy::cast_precision_loss, clippy::as_conversions)]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Integer(v) => Some(*v as f64),
            Self::Double(v) => Some(*v),
            Self::String(_) | Self::Blob(_) => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(v) => write!(f, "{v}"),
            Self::Double(v) => write!(f, "{v}"),
            Self::String(s) => f.write_str(s),
            Self::Blob(b) => write!(f, "<{} bytes>", b.len()),
        }
    }
}

/// One timestamped observation of a field on a device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub field_id: FieldId,
    /// Filled in by the session from the request when the service omits it.
    #[serde(default)]
    pub device_index: u32,
    #[serde(default)]
    pub status: ServiceStatus,
    /// Microseconds since the Unix epoch on the wire.
    #[serde(rename = "ts", with = "chrono::serde::ts_microseconds")]
    pub timestamp: DateTime<Utc>,
    pub value: FieldValue,
}

// ── Groups ───────────────────────────────────────────────────────────

/// A named, ordered set of device indices registered with the service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceGroupInfo {
    pub id: DeviceGroupId,
    pub name: String,
    #[serde(default)]
    pub devices: Vec<u32>,
}

/// A named, ordered set of field ids registered with the service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldGroupInfo {
    pub id: FieldGroupId,
    pub name: String,
    #[serde(default)]
    pub fields: Vec<FieldId>,
}

// ── Watch policy ─────────────────────────────────────────────────────

/// Sampling cadence and retention bounds the service applies to a watch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchPolicy {
    /// How often the service samples each watched field.
    pub update_interval: Duration,
    /// Oldest sample the service keeps per field per device.
    pub max_keep_age: Duration,
    /// Most samples the service keeps per field per device.
    pub max_keep_samples: u32,
}

impl Default for WatchPolicy {
    fn default() -> Self {
        Self {
            update_interval: Duration::from_secs(10),
            max_keep_age: Duration::from_secs(3600),
            max_keep_samples: 1000,
        }
    }
}

// ── Service status ───────────────────────────────────────────────────

/// Status codes reported by the telemetry service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "i32", into = "i32")]
pub enum ServiceStatus {
    #[default]
    Ok,
    NotSupported,
    LibraryError,
    ModuleLoadFailed,
    InvalidHandle,
    BadParameter,
    NotFound,
    Conflict,
    ClientError,
    AlreadyExists,
    MaxLimit,
    Unknown(i32),
}

impl ServiceStatus {
    pub fn is_ok(self) -> bool {
        self == Self::Ok
    }

    pub fn code(self) -> i32 {
        match self {
            Self::Ok => 0,
            Self::NotSupported => 1,
            Self::LibraryError => 2,
            Self::ModuleLoadFailed => 3,
            Self::InvalidHandle => 4,
            Self::BadParameter => 5,
            Self::NotFound => 6,
            Self::Conflict => 7,
            Self::ClientError => 8,
            Self::AlreadyExists => 9,
            Self::MaxLimit => 10,
            Self::Unknown(code) => code,
        }
    }
}

impl From<i32> for ServiceStatus {
    fn from(code: i32) -> Self {
        match code {
            0 => Self::Ok,
            1 => Self::NotSupported,
            2 => Self::LibraryError,
            3 => Self::ModuleLoadFailed,
            4 => Self::InvalidHandle,
            5 => Self::BadParameter,
            6 => Self::NotFound,
            7 => Self::Conflict,
            8 => Self::ClientError,
            9 => Self::AlreadyExists,
            10 => Self::MaxLimit,
            other => Self::Unknown(other),
        }
    }
}

impl From<ServiceStatus> for i32 {
    fn from(status: ServiceStatus) -> Self {
        status.code()
    }
}

impl fmt::Display for ServiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ok => f.write_str("ok"),
            Self::NotSupported => f.write_str("not supported"),
            Self::LibraryError => f.write_str("hardware library error"),
            Self::ModuleLoadFailed => f.write_str("failed to load module"),
            Self::InvalidHandle => f.write_str("invalid handle"),
            Self::BadParameter => f.write_str("bad parameter"),
            Self::NotFound => f.write_str("not found"),
            Self::Conflict => f.write_str("conflict with current state"),
            Self::ClientError => f.write_str("client error"),
            Self::AlreadyExists => f.write_str("already exists"),
            Self::MaxLimit => f.write_str("max limit reached"),
            Self::Unknown(code) => write!(f, "unknown status {code}"),
        }
    }
}

// ── Embedded operation mode ──────────────────────────────────────────

/// How an embedded engine schedules sampling.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Default,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum OperationMode {
    /// The engine samples watched fields on its own schedule.
    #[default]
    Auto,
    /// The host drives every update explicitly.
    Manual,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn field_name_lookup_round_trips() {
        for desc in FieldId::catalog() {
            assert_eq!(FieldId::from_name(desc.name), Some(desc.id));
        }
        assert_eq!(FieldId::from_name("RDC_FI_INVALID"), None);
        assert_eq!(FieldId::from_name("rdc_fi_gpu_temp"), None);
    }

    #[test]
    fn field_from_str_accepts_names_and_raw_ids() {
        assert_eq!("RDC_FI_POWER_USAGE".parse::<FieldId>().unwrap(), FieldId::POWER_USAGE);
        assert_eq!("777".parse::<FieldId>().unwrap(), FieldId::from_raw(777));
        assert!("0".parse::<FieldId>().is_err());
        assert!("RDC_FI_NOPE".parse::<FieldId>().is_err());
    }

    #[test]
    fn metric_name_is_lowercase() {
        assert_eq!(FieldId::GPU_TEMP.metric_name(), "rdc_fi_gpu_temp");
        assert_eq!(FieldId::from_raw(9999).metric_name(), "rdc_fi_9999");
        assert_eq!(FieldId::from_raw(9999).to_string(), "FIELD_9999");
    }

    #[test]
    fn sample_deserializes_from_wire_shape() {
        let sample: Sample = serde_json::from_value(serde_json::json!({
            "field_id": 201,
            "status": 0,
            "ts": 1_700_000_000_000_000_i64,
            "value": { "type": "integer", "value": 45000 }
        }))
        .unwrap();

        assert_eq!(sample.field_id, FieldId::GPU_TEMP);
        assert_eq!(sample.device_index, 0);
        assert!(sample.status.is_ok());
        assert_eq!(sample.value, FieldValue::Integer(45000));
        assert_eq!(sample.timestamp.timestamp(), 1_700_000_000);
    }

    #[test]
    fn unknown_status_codes_are_preserved() {
        let status = ServiceStatus::from(42);
        assert_eq!(status, ServiceStatus::Unknown(42));
        assert_eq!(status.code(), 42);
        assert_eq!(ServiceStatus::from(6), ServiceStatus::NotFound);
    }

    #[test]
    fn operation_mode_parses_lowercase() {
        assert_eq!("manual".parse::<OperationMode>().unwrap(), OperationMode::Manual);
        assert_eq!(OperationMode::Auto.to_string(), "auto");
    }
}
