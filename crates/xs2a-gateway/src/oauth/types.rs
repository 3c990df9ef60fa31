//! Wire types for the bank's OAuth and consent endpoints.

use serde::{Deserialize, Serialize};

/// OAuth endpoints advertised by the bank's well-known document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoints {
    #[serde(rename = "authorization_endpoint")]
    pub authorization: String,
    #[serde(rename = "token_endpoint")]
    pub token: String,
    #[serde(rename = "jwks_uri", default, skip_serializing_if = "Option::is_none")]
    pub jwks_uri: Option<String>,
}

/// Account reference inside a consent request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountReference {
    pub iban: String,
}

/// Accounts covered by a consent, per access type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsentAccess {
    pub balances: Vec<AccountReference>,
    pub transactions: Vec<AccountReference>,
}

/// Body of `POST /consents`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsentRequest {
    pub access: ConsentAccess,
    pub recurring_indicator: bool,
    /// `YYYY-MM-DD`
    pub valid_until: String,
    pub frequency_per_day: u32,
    pub combined_service_indicator: bool,
}

/// Message attached to a bank response for the third party provider.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TppMessage {
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
}

/// Consent resource created by the bank.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Consent {
    #[serde(rename = "consentId")]
    pub id: String,
    #[serde(rename = "consentStatus", default)]
    pub status: String,
    #[serde(rename = "tppMessages", default, skip_serializing_if = "Vec::is_empty")]
    pub messages: Vec<TppMessage>,
}

impl Consent {
    /// All TPP message texts joined into one line.
    #[must_use]
    pub fn message(&self) -> String {
        self.messages
            .iter()
            .filter_map(|m| m.text.as_deref().or(m.code.as_deref()))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// Token endpoint response.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tokens {
    pub token_type: String,
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

impl Tokens {
    /// Value for the `Authorization` header, e.g. `Bearer abc`.
    #[must_use]
    pub fn authorization_header(&self) -> String {
        format!("{} {}", self.token_type, self.access_token)
    }
}

impl std::fmt::Debug for Tokens {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tokens")
            .field("token_type", &self.token_type)
            .field("has_refresh_token", &self.refresh_token.is_some())
            .field("expires_in", &self.expires_in)
            .finish_non_exhaustive()
    }
}
