//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text and a process exit code.

use miette::Diagnostic;
use thiserror::Error;

use gpuwatch_config::ConfigError;
use gpuwatch_core::CoreError;

pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const CREDENTIALS: i32 = 3;
    pub const CONNECTION: i32 = 7;
    pub const CONFIG: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not connect to telemetry service at {endpoint}")]
    #[diagnostic(
        code(gpuwatch::connection_failed),
        help(
            "Check that the service is running and reachable.\n\
             Try: gpuwatch watch --embedded"
        )
    )]
    ConnectionFailed {
        endpoint: String,
        #[source]
        source: CoreError,
    },

    // ── Credentials ──────────────────────────────────────────────────
    #[error("TLS credentials are unusable: {message}")]
    #[diagnostic(
        code(gpuwatch::credentials),
        help(
            "Configure root_ca, client_cert and client_key together,\n\
             or pass --unauth to connect without TLS."
        )
    )]
    Credentials { message: String },

    // ── Reader lifecycle ─────────────────────────────────────────────
    #[error("Could not start watching")]
    #[diagnostic(
        code(gpuwatch::reader),
        help("The service rejected a group or watch request. Run with -vv for details.")
    )]
    Reader(#[source] CoreError),

    // ── Configuration ────────────────────────────────────────────────
    #[error("Invalid configuration: {message}")]
    #[diagnostic(
        code(gpuwatch::config),
        help("Check {path}, GPUWATCH_* variables, and the flags passed.")
    )]
    Config { message: String, path: String },

    #[error("Configuration file not found: {path}")]
    #[diagnostic(
        code(gpuwatch::no_config),
        help("Write a starting point with: gpuwatch config show > {path}")
    )]
    NoConfig { path: String },

    // ── Usage ────────────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(gpuwatch::validation))]
    Validation { field: String, reason: String },

    // ── IO ───────────────────────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::Credentials { .. } => exit_code::CREDENTIALS,
            Self::Config { .. } | Self::NoConfig { .. } => exit_code::CONFIG,
            Self::Validation { .. } => exit_code::USAGE,
            Self::Reader(_) | Self::Io(_) => exit_code::GENERAL,
        }
    }

    /// Attach the config file path to a `ConfigError`.
    pub fn from_config(err: ConfigError, path: &std::path::Path) -> Self {
        match err {
            ConfigError::IncompleteCredentials { .. } | ConfigError::Credential { .. } => {
                Self::Credentials {
                    message: err.to_string(),
                }
            }
            other => Self::Config {
                message: other.to_string(),
                path: path.display().to_string(),
            },
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        if err.is_credentials() {
            let message = err
                .api_error()
                .map_or_else(|| err.to_string(), ToString::to_string);
            return Self::Credentials { message };
        }
        match err {
            CoreError::ConnectionFailed { ref endpoint, .. } => Self::ConnectionFailed {
                endpoint: endpoint.clone(),
                source: err,
            },
            CoreError::Config { message } => Self::Config {
                message,
                path: "the reader options".into(),
            },
            other => Self::Reader(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use gpuwatch_core::{ApiError, FieldId};

    use super::*;

    #[test]
    fn credential_failures_exit_with_auth_code() {
        let err = CliError::from(CoreError::ConnectionFailed {
            endpoint: "gpu-node:50051".into(),
            source: ApiError::Credentials("bad PEM".into()),
        });
        assert!(matches!(&err, CliError::Credentials { message } if message.contains("bad PEM")));
        assert_eq!(err.exit_code(), exit_code::CREDENTIALS);
    }

    #[test]
    fn unreachable_service_exits_with_connection_code() {
        let err = CliError::from(CoreError::ConnectionFailed {
            endpoint: "127.0.0.1:9".into(),
            source: ApiError::Http {
                status: 503,
                message: "unavailable".into(),
            },
        });
        assert_eq!(err.exit_code(), exit_code::CONNECTION);
        assert_eq!(
            err.to_string(),
            "Could not connect to telemetry service at 127.0.0.1:9"
        );
    }

    #[test]
    fn config_errors_exit_with_config_code() {
        let err = CliError::from_config(
            ConfigError::Validation {
                field: "watch.fields".into(),
                reason: format!("{} listed twice", FieldId::GPU_TEMP),
            },
            std::path::Path::new("/etc/gpuwatch.toml"),
        );
        assert_eq!(err.exit_code(), exit_code::CONFIG);

        let err = CliError::from_config(
            ConfigError::IncompleteCredentials {
                missing: vec!["client_key"],
            },
            std::path::Path::new("/etc/gpuwatch.toml"),
        );
        assert_eq!(err.exit_code(), exit_code::CREDENTIALS);
    }
}
