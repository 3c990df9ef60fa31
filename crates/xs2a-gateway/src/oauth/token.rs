//! Authorization link and authorization-code exchange.

use url::Url;
use url::form_urlencoded;

use super::pkce;
use super::types::{Endpoints, Tokens};
use crate::client::BankTransport;
use crate::error::{AisError, AisResult};

/// Build the link that sends the user to the bank's authorization page.
///
/// The bank expects `responseType` and `clientId` in camel case.
pub fn build_authorization_link(
    endpoints: &Endpoints,
    client_id: &str,
    consent_id: &str,
    session_token: &str,
    code_verifier: &str,
) -> AisResult<Url> {
    let mut url = Url::parse(&endpoints.authorization).map_err(|e| {
        AisError::configuration(format!(
            "authorization endpoint {} is not a valid URL: {e}",
            endpoints.authorization
        ))
    })?;

    let challenge = pkce::code_challenge(code_verifier);
    url.query_pairs_mut()
        .append_pair("responseType", "code")
        .append_pair("clientId", client_id)
        .append_pair("scope", &format!("AIS: {consent_id}"))
        .append_pair("state", session_token)
        .append_pair("code_challenge_method", "S256")
        .append_pair("code_challenge", &challenge);

    Ok(url)
}

/// Exchange an authorization code and its verifier for tokens.
pub async fn exchange_token(
    transport: &dyn BankTransport,
    endpoints: &Endpoints,
    client_id: &str,
    code: &str,
    code_verifier: &str,
) -> AisResult<Tokens> {
    let form = form_urlencoded::Serializer::new(String::new())
        .append_pair("code", code)
        .append_pair("client_id", client_id)
        .append_pair("code_verifier", code_verifier)
        .append_pair("grant_type", "authorization_code")
        .finish();

    let response = transport
        .post(&endpoints.token, "application/x-www-form-urlencoded", form, &[])
        .await?
        .error_for_status()?;
    let tokens: Tokens = response.json()?;

    tracing::info!(token_type = %tokens.token_type, "Exchanged authorization code for tokens");

    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn endpoints(authorization: &str) -> Endpoints {
        Endpoints {
            authorization: authorization.into(),
            token: "https://bank/token".into(),
            jwks_uri: None,
        }
    }

    #[test]
    fn test_link_query() {
        let url =
            build_authorization_link(&endpoints("https://bank/auth"), "openxs2a", "C1", "S1", "V")
                .unwrap();

        assert_eq!(url.host_str(), Some("bank"));
        assert_eq!(url.path(), "/auth");

        let query: HashMap<_, _> = url.query_pairs().into_owned().collect();
        assert_eq!(query["responseType"], "code");
        assert_eq!(query["clientId"], "openxs2a");
        assert_eq!(query["scope"], "AIS: C1");
        assert_eq!(query["state"], "S1");
        assert_eq!(query["code_challenge_method"], "S256");
        assert_eq!(query["code_challenge"], pkce::code_challenge("V"));
    }

    #[test]
    fn test_link_keeps_existing_query() {
        let url = build_authorization_link(
            &endpoints("https://bank/auth?realm=psd2"),
            "openxs2a",
            "C1",
            "S1",
            "V",
        )
        .unwrap();
        let query: HashMap<_, _> = url.query_pairs().into_owned().collect();
        assert_eq!(query["realm"], "psd2");
        assert_eq!(query["state"], "S1");
    }

    #[test]
    fn test_link_rejects_relative_endpoint() {
        let err = build_authorization_link(&endpoints("/auth"), "openxs2a", "C1", "S1", "V")
            .unwrap_err();
        assert!(matches!(err, AisError::Configuration(_)));
    }
}
