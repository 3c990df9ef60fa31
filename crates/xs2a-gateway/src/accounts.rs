//! Account information queries on behalf of an authorized session.

use crate::client::{ApiResponse, BankTransport};
use crate::config::Config;
use crate::error::{AisError, AisResult};
use crate::oauth::Session;

/// Per-account resource below `/accounts/{resourceId}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountDetail {
    Balances,
    Transactions,
}

impl AccountDetail {
    #[must_use]
    pub const fn path(self) -> &'static str {
        match self {
            Self::Balances => "balances",
            Self::Transactions => "transactions",
        }
    }

    /// Fixed query parameters for this resource.
    #[must_use]
    pub fn default_params(self, config: &Config) -> Vec<(String, String)> {
        match self {
            Self::Balances => Vec::new(),
            Self::Transactions => vec![
                ("dateFrom".to_string(), config.transactions_date_from.clone()),
                ("bookingStatus".to_string(), "both".to_string()),
            ],
        }
    }
}

/// Headers identifying the consent and bearer token of a session.
///
/// Fails with [`AisError::Unauthorized`] when the session has no tokens yet.
fn session_headers(session: &Session) -> AisResult<Vec<(String, String)>> {
    let tokens = session.tokens.as_ref().ok_or(AisError::Unauthorized)?;

    Ok(vec![
        ("X-Request-ID".to_string(), uuid::Uuid::new_v4().to_string()),
        ("Consent-ID".to_string(), session.consent.id.clone()),
        ("Authorization".to_string(), tokens.authorization_header()),
    ])
}

/// A resource id must stay one path segment below `/accounts`.
///
/// `%` is refused too, since percent-encoded dots are resolved like `..`.
fn check_resource_id(resource_id: &str) -> AisResult<()> {
    if resource_id.trim().is_empty() {
        return Err(AisError::invalid_request("resourceId is required"));
    }
    if matches!(resource_id, "." | "..")
        || resource_id.contains(['/', '\\', '%', '?', '#'])
    {
        return Err(AisError::invalid_request(format!("Invalid resourceId: {resource_id}")));
    }
    Ok(())
}

/// List the accounts covered by the session's consent.
pub async fn list_accounts(
    transport: &dyn BankTransport,
    config: &Config,
    session: &Session,
) -> AisResult<ApiResponse> {
    let headers = session_headers(session)?;
    let url = config.build_url("/accounts")?;

    let response = transport.get(url.as_str(), &headers, &[]).await?.error_for_status()?;
    tracing::debug!(consent_id = %session.consent.id, "Fetched account list");
    Ok(response)
}

/// Fetch balances or transactions of one account.
///
/// `extra_params` are appended after the resource's fixed parameters.
pub async fn get_account_detail(
    transport: &dyn BankTransport,
    config: &Config,
    session: &Session,
    resource_id: &str,
    detail: AccountDetail,
    extra_params: &[(String, String)],
) -> AisResult<ApiResponse> {
    let headers = session_headers(session)?;

    check_resource_id(resource_id)?;

    let url = config.build_url(&format!("/accounts/{resource_id}/{}", detail.path()))?;
    let mut params = detail.default_params(config);
    params.extend_from_slice(extra_params);

    let response = transport.get(url.as_str(), &headers, &params).await?.error_for_status()?;
    tracing::debug!(
        consent_id = %session.consent.id,
        resource = detail.path(),
        "Fetched account detail"
    );
    Ok(response)
}
