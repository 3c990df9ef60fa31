//! The gateway ties discovery, consent, PKCE and the session store together.

use std::sync::Arc;

use url::Url;

use crate::accounts::{self, AccountDetail};
use crate::client::{ApiResponse, BankTransport};
use crate::config::Config;
use crate::error::{AisError, AisResult};
use crate::oauth::{Endpoints, Session, SessionStore, consent, discovery, pkce, token};

/// Result of starting an authorization.
#[derive(Debug, Clone)]
pub struct Authorization {
    /// Opaque session token, echoed back by the bank as `state`.
    pub session_token: String,
    /// Bank authorization page.
    pub auth_url: Url,
}

/// Shared service injected into the HTTP handlers.
pub struct AisGateway {
    transport: Arc<dyn BankTransport>,
    config: Config,
    endpoints: Endpoints,
    sessions: SessionStore,
}

impl AisGateway {
    /// Create a gateway from already discovered endpoints.
    #[must_use]
    pub fn new(config: Config, transport: Arc<dyn BankTransport>, endpoints: Endpoints) -> Self {
        let sessions = SessionStore::with_policy(config.session_policy);
        Self { transport, config, endpoints, sessions }
    }

    /// Discover the bank endpoints and create a gateway.
    pub async fn connect(config: Config, transport: Arc<dyn BankTransport>) -> AisResult<Self> {
        let endpoints = discovery::discover(transport.as_ref(), &config.well_known_url).await?;
        Ok(Self::new(config, transport, endpoints))
    }

    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    #[must_use]
    pub const fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    #[must_use]
    pub const fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// Create a consent and a session, and return the bank authorization link.
    pub async fn start_authorization(&self) -> AisResult<Authorization> {
        let code_verifier = pkce::generate_code_verifier();
        let consent = consent::start_consent(self.transport.as_ref(), &self.config).await?;
        let consent_id = consent.id.clone();

        let session_token = self.sessions.create(consent, code_verifier.clone()).await;
        let auth_url = token::build_authorization_link(
            &self.endpoints,
            &self.config.client_id,
            &consent_id,
            &session_token,
            &code_verifier,
        )?;

        tracing::info!(consent_id = %consent_id, "Started authorization");
        Ok(Authorization { session_token, auth_url })
    }

    /// Handle the bank redirect: exchange `code` and attach the tokens to the session.
    pub async fn complete_authorization(&self, session_token: &str, code: &str) -> AisResult<()> {
        let session = self.session(session_token).await?;
        if code.is_empty() {
            return Err(AisError::invalid_request("code is required"));
        }

        let tokens = token::exchange_token(
            self.transport.as_ref(),
            &self.endpoints,
            &self.config.client_id,
            code,
            &session.code_verifier,
        )
        .await?;
        self.sessions.attach_tokens(session_token, tokens).await?;

        tracing::info!(consent_id = %session.consent.id, "Session authorized");
        Ok(())
    }

    /// Front-end URL the user lands on after a completed callback.
    pub fn application_redirect(&self, session_token: &str) -> AisResult<Url> {
        let mut url = Url::parse(&self.config.app_redirect_uri).map_err(|e| {
            AisError::configuration(format!(
                "application redirect {} is not a valid URL: {e}",
                self.config.app_redirect_uri
            ))
        })?;
        url.query_pairs_mut().append_pair("state", session_token);
        Ok(url)
    }

    /// Account list for a session.
    pub async fn list_accounts(&self, session_token: &str) -> AisResult<ApiResponse> {
        let session = self.session(session_token).await?;
        accounts::list_accounts(self.transport.as_ref(), &self.config, &session).await
    }

    /// Balances or transactions for one account of a session.
    pub async fn account_detail(
        &self,
        session_token: &str,
        resource_id: &str,
        detail: AccountDetail,
    ) -> AisResult<ApiResponse> {
        let session = self.session(session_token).await?;
        accounts::get_account_detail(
            self.transport.as_ref(),
            &self.config,
            &session,
            resource_id,
            detail,
            &[],
        )
        .await
    }

    async fn session(&self, session_token: &str) -> AisResult<Session> {
        if session_token.is_empty() {
            return Err(AisError::InvalidState);
        }
        self.sessions.get(session_token).await.ok_or(AisError::InvalidState)
    }
}

impl std::fmt::Debug for AisGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AisGateway")
            .field("endpoints", &self.endpoints)
            .field("sessions", &self.sessions)
            .finish_non_exhaustive()
    }
}
