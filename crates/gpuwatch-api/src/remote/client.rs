// Gateway HTTP client
//
// Wraps `reqwest::Client` with address-to-URL resolution and unwrapping of
// the `{ status, data }` envelope every gateway response carries. Endpoint
// methods live in sibling modules as inherent impls.

use serde::Deserialize;
use serde::de::{DeserializeOwned, IgnoredAny};
use tracing::{debug, info};
use url::Url;

use crate::error::Error;
use crate::model::ServiceStatus;
use crate::session::Session;
use crate::transport::TransportConfig;

/// Status envelope wrapped around every gateway payload.
#[derive(Deserialize)]
struct Envelope<T> {
    #[serde(default)]
    status: ServiceStatus,
    #[serde(default = "Option::default")]
    data: Option<T>,
}

/// Session against a standalone telemetry daemon, via its JSON gateway.
///
/// All methods return unwrapped `data` payloads; a non-zero envelope
/// status becomes [`Error::Service`].
pub struct RemoteSession {
    http: reqwest::Client,
    base_url: Url,
    authenticated: bool,
}

impl std::fmt::Debug for RemoteSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteSession")
            .field("base_url", &self.base_url.as_str())
            .field("authenticated", &self.authenticated)
            .finish_non_exhaustive()
    }
}

impl RemoteSession {
    /// Connect to the service at `address` (`host:port` or a full URL).
    ///
    /// Builds the HTTP client from `transport` (mutual TLS when credentials
    /// are present, plain HTTP otherwise) and lists devices once so an
    /// unreachable or rejecting service fails here rather than on first use.
    pub async fn connect(address: &str, transport: &TransportConfig) -> Result<Self, Error> {
        let base_url = resolve_address(address, transport.scheme())?;
        let session = Self {
            http: transport.build_client()?,
            base_url,
            authenticated: transport.is_authenticated(),
        };

        let devices = session.list_devices().await?;
        info!(
            url = %session.base_url,
            authenticated = session.authenticated,
            devices = devices.len(),
            "connected to telemetry service"
        );
        Ok(session)
    }

    /// Create a session with a pre-built `reqwest::Client`, skipping the initial device listing.
    pub fn with_client(http: reqwest::Client, base_url: Url) -> Self {
        Self {
            http,
            base_url,
            authenticated: false,
        }
    }

    /// The gateway base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    // ── URL builders ─────────────────────────────────────────────────

    /// `{base}/v1/{path}`
    pub(crate) fn api_url(&self, path: &str) -> Result<Url, Error> {
        let base = self.base_url.as_str().trim_end_matches('/');
        Ok(Url::parse(&format!("{base}/v1/{path}"))?)
    }

    // ── Request helpers ──────────────────────────────────────────────

    pub(crate) async fn get<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        url: Url,
    ) -> Result<T, Error> {
        debug!("GET {}", url);
        let resp = self.http.get(url).send().await?;
        Self::require_data(operation, Self::parse_envelope(operation, resp).await?)
    }

    pub(crate) async fn post<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        url: Url,
        body: &(impl serde::Serialize + Sync),
    ) -> Result<T, Error> {
        debug!("POST {}", url);
        let resp = self.http.post(url).json(body).send().await?;
        Self::require_data(operation, Self::parse_envelope(operation, resp).await?)
    }

    /// POST where only the status matters.
    pub(crate) async fn post_unit(
        &self,
        operation: &'static str,
        url: Url,
        body: &(impl serde::Serialize + Sync),
    ) -> Result<(), Error> {
        debug!("POST {}", url);
        let resp = self.http.post(url).json(body).send().await?;
        Self::parse_envelope::<IgnoredAny>(operation, resp).await?;
        Ok(())
    }

    pub(crate) async fn delete(&self, operation: &'static str, url: Url) -> Result<(), Error> {
        debug!("DELETE {}", url);
        let resp = self.http.delete(url).send().await?;
        Self::parse_envelope::<IgnoredAny>(operation, resp).await?;
        Ok(())
    }

    fn require_data<T>(operation: &'static str, data: Option<T>) -> Result<T, Error> {
        data.ok_or_else(|| Error::Deserialization {
            message: format!("{operation}: response carried no data"),
            body: String::new(),
        })
    }

    /// Parse the `{ status, data }` envelope.
    ///
    /// The gateway reports service rejections with a non-zero `status`,
    /// sometimes alongside a 4xx HTTP code; the envelope status wins when
    /// it can be decoded.
    async fn parse_envelope<T: DeserializeOwned>(
        operation: &'static str,
        resp: reqwest::Response,
    ) -> Result<Option<T>, Error> {
        let status = resp.status();
        let body = resp.text().await?;

        if let Ok(envelope) = serde_json::from_str::<Envelope<IgnoredAny>>(&body) {
            if !envelope.status.is_ok() {
                return Err(Error::service(operation, envelope.status));
            }
        }

        if !status.is_success() {
            return Err(Error::Http {
                status: status.as_u16(),
                message: body.chars().take(200).collect(),
            });
        }

        let envelope: Envelope<T> = serde_json::from_str(&body).map_err(|e| {
            let preview: String = body.chars().take(200).collect();
            Error::Deserialization {
                message: format!("{e} (body preview: {preview:?})"),
                body: body.clone(),
            }
        })?;

        Ok(envelope.data)
    }
}

/// Turn `host:port` (or a full URL) into the gateway base URL.
fn resolve_address(address: &str, scheme: &str) -> Result<Url, Error> {
    let address = address.trim();
    if address.contains("://") {
        return Ok(Url::parse(address)?);
    }
    Ok(Url::parse(&format!("{scheme}://{address}"))?)
}
