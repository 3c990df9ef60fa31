//! Configuration for the XS2A gateway.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use url::Url;

use crate::error::ClientResult;
use crate::oauth::store::SessionPolicy;

/// API configuration constants.
pub mod api {
    use std::time::Duration;

    /// OAuth client id registered with the bank sandbox.
    pub const CLIENT_ID: &str = "openxs2a";

    /// Default API version segment.
    pub const API_VERSION: &str = "v1";

    /// Default `dateFrom` for transaction queries.
    pub const TRANSACTIONS_DATE_FROM: &str = "2019-01-01";

    /// Consent usage allowed per day.
    pub const FREQUENCY_PER_DAY: u32 = 4;

    /// Request timeout.
    pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

    /// Connection timeout.
    pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

    /// Default port for the inbound HTTP server.
    pub const LISTEN_PORT: u16 = 8080;

    /// Default env file, relative to the working directory.
    pub const ENV_FILE: &str = "secrets/sandbox.env";
}

/// Environment variable names.
pub mod env {
    pub const HOST: &str = "XS2A_HOST";
    pub const PORT: &str = "XS2A_PORT";
    pub const BASE_PATH: &str = "XS2A_BASE_PATH";
    pub const API_VERSION: &str = "XS2A_API_VERSION";
    pub const WELL_KNOWN_URL: &str = "XS2A_WELL_KNOWN_URL";
    pub const TPP_REDIRECT_URI: &str = "XS2A_TPP_REDIRECT_URI";
    pub const APP_REDIRECT_URI: &str = "XS2A_APP_REDIRECT_URI";
    pub const IBAN: &str = "XS2A_IBAN";
    pub const CERT_FILE: &str = "XS2A_CERT_FILE";
    pub const KEY_FILE: &str = "XS2A_KEY_FILE";
    pub const CLIENT_ID: &str = "XS2A_CLIENT_ID";
    pub const TRANSACTIONS_DATE_FROM: &str = "XS2A_TRANSACTIONS_DATE_FROM";
    pub const SESSION_TTL_SECS: &str = "XS2A_SESSION_TTL_SECS";
    pub const MAX_SESSIONS: &str = "XS2A_MAX_SESSIONS";
}

/// PEM files presented to the bank as the TLS client identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsIdentity {
    pub cert_path: PathBuf,
    pub key_path: PathBuf,
}

/// Gateway configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// URL scheme of the bank API (`https` outside of tests).
    pub scheme: String,

    /// Bank API host.
    pub host: String,

    /// Bank API port.
    pub port: u16,

    /// Path prefix in front of the API version.
    pub base_path: String,

    /// API version segment.
    pub api_version: String,

    /// Well-known document listing the OAuth endpoints.
    pub well_known_url: String,

    /// Where the bank sends the user after SCA.
    pub tpp_redirect_uri: String,

    /// Front-end application that receives the session token after the callback.
    pub app_redirect_uri: String,

    /// The single account covered by the consent.
    pub iban: String,

    /// OAuth client id.
    pub client_id: String,

    /// `dateFrom` sent with transaction queries.
    pub transactions_date_from: String,

    /// Client certificate and key; `None` until the command line supplies them, or in tests.
    pub identity: Option<TlsIdentity>,

    /// Request timeout.
    pub request_timeout: Duration,

    /// Connection timeout.
    pub connect_timeout: Duration,

    /// Session eviction policy.
    pub session_policy: SessionPolicy,
}

impl Config {
    /// Create a test configuration pointing every URL at a mock server.
    #[must_use]
    pub fn for_testing(base_url: &str) -> Self {
        let base_url = base_url.trim_end_matches('/');
        let parsed = Url::parse(base_url).ok();
        let scheme = parsed.as_ref().map_or("http", Url::scheme).to_string();
        let host = parsed.as_ref().and_then(Url::host_str).unwrap_or("localhost").to_string();
        let port = parsed.as_ref().and_then(Url::port_or_known_default).unwrap_or(80);

        Self {
            scheme,
            host,
            port,
            base_path: "xs2a".to_string(),
            api_version: api::API_VERSION.to_string(),
            well_known_url: format!("{base_url}/.well-known/openid-configuration"),
            tpp_redirect_uri: format!("{base_url}/oauth/redirect"),
            app_redirect_uri: "http://app.localhost/accounts".to_string(),
            iban: "DE89370400440532013000".to_string(),
            client_id: api::CLIENT_ID.to_string(),
            transactions_date_from: api::TRANSACTIONS_DATE_FROM.to_string(),
            identity: None,
            request_timeout: Duration::from_secs(5),
            connect_timeout: Duration::from_secs(2),
            session_policy: SessionPolicy::default(),
        }
    }

    /// Create configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns error if a required variable is missing or malformed.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Create configuration from an arbitrary variable source.
    ///
    /// # Errors
    ///
    /// Returns error if a required variable is missing or malformed.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &str| -> anyhow::Result<String> {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .with_context(|| format!("{name} is not set"))
        };
        let url = |name: &str| -> anyhow::Result<String> {
            let value = required(name)?;
            Url::parse(&value).with_context(|| format!("{name} is not a valid URL: {value}"))?;
            Ok(value)
        };

        let port = required(env::PORT)?;
        let port = port
            .parse::<u16>()
            .with_context(|| format!("{} is not a valid port: {port}", env::PORT))?;

        let ttl = lookup(env::SESSION_TTL_SECS)
            .map(|v| {
                v.trim()
                    .parse::<u64>()
                    .with_context(|| format!("{} must be a number of seconds", env::SESSION_TTL_SECS))
            })
            .transpose()?
            .map(Duration::from_secs);
        let max_sessions = lookup(env::MAX_SESSIONS)
            .map(|v| {
                v.trim()
                    .parse::<usize>()
                    .ok()
                    .filter(|max| *max > 0)
                    .with_context(|| format!("{} must be a positive integer", env::MAX_SESSIONS))
            })
            .transpose()?;

        // The certificate and key may also come from the command line.
        let optional =
            |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let identity = match (optional(env::CERT_FILE), optional(env::KEY_FILE)) {
            (Some(cert_path), Some(key_path)) => {
                Some(TlsIdentity { cert_path: cert_path.into(), key_path: key_path.into() })
            }
            (None, None) => None,
            _ => anyhow::bail!("{} and {} must be set together", env::CERT_FILE, env::KEY_FILE),
        };

        let date_from = lookup(env::TRANSACTIONS_DATE_FROM)
            .map(|v| v.trim().to_string())
            .unwrap_or_else(|| api::TRANSACTIONS_DATE_FROM.to_string());
        chrono::NaiveDate::parse_from_str(&date_from, "%Y-%m-%d").with_context(|| {
            format!("{} must be a YYYY-MM-DD date: {date_from}", env::TRANSACTIONS_DATE_FROM)
        })?;

        Ok(Self {
            scheme: "https".to_string(),
            host: required(env::HOST)?,
            port,
            base_path: lookup(env::BASE_PATH).unwrap_or_default(),
            api_version: lookup(env::API_VERSION)
                .unwrap_or_else(|| api::API_VERSION.to_string()),
            well_known_url: url(env::WELL_KNOWN_URL)?,
            tpp_redirect_uri: url(env::TPP_REDIRECT_URI)?,
            app_redirect_uri: url(env::APP_REDIRECT_URI)?,
            iban: required(env::IBAN)?,
            client_id: lookup(env::CLIENT_ID).unwrap_or_else(|| api::CLIENT_ID.to_string()),
            transactions_date_from: date_from,
            identity,
            request_timeout: api::REQUEST_TIMEOUT,
            connect_timeout: api::CONNECT_TIMEOUT,
            session_policy: SessionPolicy { ttl, max_sessions },
        })
    }

    /// Replace the client identity (CLI flags take precedence over the environment).
    #[must_use]
    pub fn with_identity(mut self, cert_path: Option<PathBuf>, key_path: Option<PathBuf>) -> Self {
        if let Some(identity) = self.identity.as_mut() {
            if let Some(cert_path) = cert_path {
                identity.cert_path = cert_path;
            }
            if let Some(key_path) = key_path {
                identity.key_path = key_path;
            }
        } else if let (Some(cert_path), Some(key_path)) = (cert_path, key_path) {
            self.identity = Some(TlsIdentity { cert_path, key_path });
        }
        self
    }

    /// Fail unless a client certificate and key are configured.
    ///
    /// # Errors
    ///
    /// Returns error when neither the environment nor the command line named both files.
    pub fn require_identity(self) -> anyhow::Result<Self> {
        if self.identity.is_none() {
            anyhow::bail!(
                "No client certificate: pass --cert and --key or set {} and {}",
                env::CERT_FILE,
                env::KEY_FILE
            );
        }
        Ok(self)
    }

    /// Compose `{scheme}://{host}:{port}/{base_path}/{api_version}{suffix}`.
    ///
    /// The suffix must already be a valid path; characters that cannot appear
    /// in a path (`?`, `#`, spaces) are percent-encoded rather than interpreted.
    pub fn build_url(&self, suffix: &str) -> ClientResult<Url> {
        let mut url = Url::parse(&format!("{}://{}:{}", self.scheme, self.host, self.port))?;

        let base = self.base_path.trim_matches('/');
        let version = self.api_version.trim_matches('/');
        let path = if base.is_empty() {
            format!("/{version}{suffix}")
        } else {
            format!("/{base}/{version}{suffix}")
        };
        url.set_path(&path);

        Ok(url)
    }
}
