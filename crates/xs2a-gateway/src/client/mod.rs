//! Bank API transport.
//!
//! Provides an async HTTP client that presents a static TLS client
//! certificate on every connection. There is no retry layer: each call is
//! a single round trip and failures are returned to the caller.

use async_trait::async_trait;
use reqwest::{Client, Identity};

use crate::config::{Config, TlsIdentity};
use crate::error::{ClientError, ClientResult};

/// Raw bank response. The body is kept verbatim (JSON or XML).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: String,
}

impl ApiResponse {
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }

    /// Turn a non-success status into a [`ClientError`] carrying the body.
    pub fn error_for_status(self) -> ClientResult<Self> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(ClientError::from_status(self.status, self.body))
        }
    }

    /// Decode a JSON body.
    pub fn json<T>(&self) -> ClientResult<T>
    where
        T: serde::de::DeserializeOwned,
    {
        serde_json::from_str(&self.body).map_err(ClientError::from)
    }
}

/// Outbound calls to the bank.
///
/// Headers and query parameters are name/value pairs. `post` sets
/// `Content-Type` itself, so callers must not pass it again.
#[async_trait]
pub trait BankTransport: Send + Sync {
    /// Issue a GET with optional headers and URL-encoded query parameters.
    async fn get(
        &self,
        url: &str,
        headers: &[(String, String)],
        query: &[(String, String)],
    ) -> ClientResult<ApiResponse>;

    /// Issue a POST with a raw body.
    async fn post(
        &self,
        url: &str,
        content_type: &str,
        body: String,
        headers: &[(String, String)],
    ) -> ClientResult<ApiResponse>;
}

/// HTTPS client authenticated with the TPP certificate.
#[derive(Clone)]
pub struct BankClient {
    client: Client,
    has_identity: bool,
}

impl BankClient {
    /// Create a new client with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Certificate`] if the certificate or key cannot be
    /// read or parsed, or [`ClientError::Http`] if the client cannot be built.
    pub fn new(config: &Config) -> ClientResult<Self> {
        let mut builder = Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(config.connect_timeout)
            .gzip(true);

        let has_identity = config.identity.is_some();
        if let Some(ref identity) = config.identity {
            builder = builder.identity(load_identity(identity)?);
            tracing::info!(cert = %identity.cert_path.display(), "Loaded TLS client identity");
        } else {
            tracing::warn!("No TLS client identity configured; bank calls are not mutually authenticated");
        }

        Ok(Self { client: builder.build()?, has_identity })
    }

    /// Whether a client certificate is presented.
    #[must_use]
    pub const fn has_identity(&self) -> bool {
        self.has_identity
    }

    async fn read(response: reqwest::Response) -> ClientResult<ApiResponse> {
        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(ToString::to_string);
        let body = response.text().await?;

        Ok(ApiResponse { status, content_type, body })
    }
}

#[async_trait]
impl BankTransport for BankClient {
    async fn get(
        &self,
        url: &str,
        headers: &[(String, String)],
        query: &[(String, String)],
    ) -> ClientResult<ApiResponse> {
        let mut request = self.client.get(url);
        for (name, value) in headers {
            request = request.header(name.as_str(), value.as_str());
        }
        if !query.is_empty() {
            request = request.query(query);
        }

        let response = request.send().await?;
        let response = Self::read(response).await?;
        tracing::debug!(url, status = response.status, "GET");
        Ok(response)
    }

    async fn post(
        &self,
        url: &str,
        content_type: &str,
        body: String,
        headers: &[(String, String)],
    ) -> ClientResult<ApiResponse> {
        let mut request =
            self.client.post(url).header(reqwest::header::CONTENT_TYPE, content_type).body(body);
        for (name, value) in headers {
            request = request.header(name.as_str(), value.as_str());
        }

        let response = request.send().await?;
        let response = Self::read(response).await?;
        tracing::debug!(url, status = response.status, "POST");
        Ok(response)
    }
}

impl std::fmt::Debug for BankClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BankClient").field("has_identity", &self.has_identity).finish()
    }
}

/// Read the PEM certificate and key and combine them into one identity.
fn load_identity(identity: &TlsIdentity) -> ClientResult<Identity> {
    let mut pem = std::fs::read(&identity.cert_path)
        .map_err(|e| ClientError::certificate(&identity.cert_path, e.to_string()))?;
    let key = std::fs::read(&identity.key_path)
        .map_err(|e| ClientError::certificate(&identity.key_path, e.to_string()))?;

    if !pem.ends_with(b"\n") {
        pem.push(b'\n');
    }
    pem.extend_from_slice(&key);

    Identity::from_pem(&pem).map_err(|e| ClientError::certificate(&identity.cert_path, e.to_string()))
}
