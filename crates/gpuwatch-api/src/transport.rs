// Transport configuration for building the gateway `reqwest::Client`.
//
// Mutual TLS needs all three PEM items; without them the session talks
// plain HTTP to the gateway.

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};

use crate::error::Error;

/// PEM material for an authenticated (mutual TLS) connection.
#[derive(Debug, Clone)]
pub struct TlsCredentials {
    /// CA certificate the service certificate must chain to.
    pub root_ca: String,
    /// Client certificate presented to the service.
    pub client_cert: String,
    /// Private key for `client_cert`.
    pub client_key: SecretString,
}

/// Shared transport configuration for building HTTP clients.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub credentials: Option<TlsCredentials>,
    pub timeout: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            credentials: None,
            timeout: Duration::from_secs(30),
        }
    }
}

impl TransportConfig {
    /// `true` when requests go over mutual TLS.
    pub fn is_authenticated(&self) -> bool {
        self.credentials.is_some()
    }

    /// URL scheme matching the credential mode.
    pub fn scheme(&self) -> &'static str {
        if self.is_authenticated() { "https" } else { "http" }
    }

    /// Build a `reqwest::Client` from this config.
    pub fn build_client(&self) -> Result<reqwest::Client, Error> {
        let mut builder = reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(concat!("gpuwatch/", env!("CARGO_PKG_VERSION")));

        if let Some(ref creds) = self.credentials {
            let ca = reqwest::Certificate::from_pem(creds.root_ca.as_bytes())
                .map_err(|e| Error::Credentials(format!("invalid root CA: {e}")))?;

            let mut identity_pem = creds.client_cert.clone().into_bytes();
            if !identity_pem.ends_with(b"\n") {
                identity_pem.push(b'\n');
            }
            identity_pem.extend_from_slice(creds.client_key.expose_secret().as_bytes());
            let identity = reqwest::Identity::from_pem(&identity_pem)
                .map_err(|e| Error::Credentials(format!("invalid client certificate/key: {e}")))?;

            builder = builder
                .use_rustls_tls()
                .tls_built_in_root_certs(false)
                .add_root_certificate(ca)
                .identity(identity);
        }

        builder
            .build()
            .map_err(|e| Error::Tls(format!("failed to build HTTP client: {e}")))
    }
}
