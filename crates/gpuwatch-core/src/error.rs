// ── Core error types ──
//
// Lifecycle errors raised while bringing a reader up. Each variant names
// the step that failed and keeps the service error as its source. Nothing
// here is produced by the steady-state polling loop: per-pair fetch
// failures are skipped and a totally failed pass is a `PassOutcome`.

use gpuwatch_api::{DeviceGroupId, FieldGroupId};
use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot connect to telemetry service at {endpoint}")]
    ConnectionFailed {
        endpoint: String,
        #[source]
        source: gpuwatch_api::Error,
    },

    #[error("Cannot list devices reported by the telemetry service")]
    DeviceDiscovery {
        #[source]
        source: gpuwatch_api::Error,
    },

    // ── Group / watch errors ─────────────────────────────────────────
    #[error("Group '{group}': cannot {operation}")]
    GroupOperation {
        group: String,
        operation: &'static str,
        #[source]
        source: gpuwatch_api::Error,
    },

    #[error("Cannot watch field group {field_group} on device group {device_group}")]
    Watch {
        device_group: DeviceGroupId,
        field_group: FieldGroupId,
        #[source]
        source: gpuwatch_api::Error,
    },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl CoreError {
    pub(crate) fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// The service error underneath, if any.
    pub fn api_error(&self) -> Option<&gpuwatch_api::Error> {
        match self {
            Self::ConnectionFailed { source, .. }
            | Self::DeviceDiscovery { source }
            | Self::GroupOperation { source, .. }
            | Self::Watch { source, .. } => Some(source),
            Self::Config { .. } => None,
        }
    }

    /// `true` for errors caused by TLS material rather than the service.
    pub fn is_credentials(&self) -> bool {
        matches!(
            self.api_error(),
            Some(gpuwatch_api::Error::Credentials(_) | gpuwatch_api::Error::Tls(_))
        )
    }
}
