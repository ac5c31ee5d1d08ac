use thiserror::Error;

use crate::model::ServiceStatus;

/// Top-level error type for the `gpuwatch-api` crate.
///
/// Covers every failure mode across both session kinds: transport,
/// TLS material, service status codes, and payload decoding.
/// `gpuwatch-core` wraps these into lifecycle-specific errors.
#[derive(Debug, Error)]
pub enum Error {
    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Service address could not be turned into a URL.
    #[error("Invalid service address: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// TLS client construction failed.
    #[error("TLS error: {0}")]
    Tls(String),

    /// Credential material was present but unusable (bad PEM, etc.)
    #[error("Invalid credentials: {0}")]
    Credentials(String),

    /// Non-success HTTP status without a decodable status envelope.
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    // ── Service ─────────────────────────────────────────────────────
    /// The service processed the request and rejected it.
    #[error("{operation} failed: {status}")]
    Service {
        operation: &'static str,
        status: ServiceStatus,
    },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    /// Shorthand for a service-side rejection.
    pub fn service(operation: &'static str, status: ServiceStatus) -> Self {
        Self::Service { operation, status }
    }

    /// The service status code carried by this error, if any.
    pub fn status(&self) -> Option<ServiceStatus> {
        match self {
            Self::Service { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Returns `true` if the service reported the target as missing.
    ///
    /// Latest-value fetches report this for pairs that are not watched or
    /// not supported on the device.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::Service { status, .. } => *status == ServiceStatus::NotFound,
            Self::Http { status, .. } => *status == 404,
            _ => false,
        }
    }

    /// Returns `true` if this is a transient error worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            Self::Http { status, .. } => *status >= 500,
            _ => false,
        }
    }
}
