//! HTTP handlers for the browser-facing routes.
//!
//! Every route identifies the authorization attempt by the `state` query
//! parameter, which is the session token handed out by `/oauth/start`.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Query, State},
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;

use crate::accounts::AccountDetail;
use crate::client::ApiResponse;
use crate::error::AisError;
use crate::gateway::AisGateway;

/// Query for routes that only need the session token.
#[derive(Debug, Deserialize)]
pub struct StateQuery {
    pub state: Option<String>,
}

/// Query for per-account routes.
#[derive(Debug, Deserialize)]
pub struct DetailQuery {
    pub state: Option<String>,
    #[serde(rename = "resourceId")]
    pub resource_id: Option<String>,
}

/// Query sent by the bank on the redirect back.
#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

/// `GET /`
pub async fn handle_root() -> Redirect {
    Redirect::permanent("/oauth/start")
}

/// `GET /health`
pub async fn handle_health(State(gateway): State<Arc<AisGateway>>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "xs2a-gateway",
        "version": env!("CARGO_PKG_VERSION"),
        "sessions": gateway.sessions().len().await
    }))
}

/// `GET /oauth/start`
///
/// Creates a consent and a session and returns the bank authorization link.
pub async fn handle_start(State(gateway): State<Arc<AisGateway>>) -> Response {
    match gateway.start_authorization().await {
        Ok(authorization) => {
            let mut response =
                Json(serde_json::json!({ "authUrl": authorization.auth_url.as_str() }))
                    .into_response();
            response.headers_mut().insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
            response
        }
        Err(err) => error_response(&err),
    }
}

/// `GET /oauth/redirect`
///
/// Exchanges the authorization code and sends the user on to the application.
pub async fn handle_callback(
    State(gateway): State<Arc<AisGateway>>,
    Query(query): Query<CallbackQuery>,
) -> Response {
    if let Some(ref error) = query.error {
        tracing::warn!(
            error = %error,
            description = query.error_description.as_deref().unwrap_or_default(),
            "Bank reported authorization failure"
        );
        return json_error(StatusCode::UNAUTHORIZED, format!("Authorization failed: {error}"));
    }

    let state = query.state.as_deref().unwrap_or_default();
    let code = query.code.as_deref().unwrap_or_default();

    match gateway.complete_authorization(state, code).await {
        Ok(()) => {}
        Err(AisError::InvalidState) => {
            return json_error(StatusCode::UNAUTHORIZED, "Authorization failed".to_string());
        }
        Err(err) => return error_response(&err),
    }

    match gateway.application_redirect(state) {
        Ok(url) => Redirect::to(url.as_str()).into_response(),
        Err(err) => error_response(&err),
    }
}

/// `GET /accounts`
pub async fn handle_accounts(
    State(gateway): State<Arc<AisGateway>>,
    Query(query): Query<StateQuery>,
) -> Response {
    let state = query.state.as_deref().unwrap_or_default();
    match gateway.list_accounts(state).await {
        Ok(upstream) => passthrough(upstream),
        Err(err) => error_response(&err),
    }
}

/// `GET /accounts/balances`
pub async fn handle_balances(
    State(gateway): State<Arc<AisGateway>>,
    Query(query): Query<DetailQuery>,
) -> Response {
    account_detail(&gateway, &query, AccountDetail::Balances).await
}

/// `GET /accounts/transactions`
pub async fn handle_transactions(
    State(gateway): State<Arc<AisGateway>>,
    Query(query): Query<DetailQuery>,
) -> Response {
    account_detail(&gateway, &query, AccountDetail::Transactions).await
}

async fn account_detail(gateway: &AisGateway, query: &DetailQuery, detail: AccountDetail) -> Response {
    let state = query.state.as_deref().unwrap_or_default();
    let resource_id = query.resource_id.as_deref().unwrap_or_default();

    match gateway.account_detail(state, resource_id, detail).await {
        Ok(upstream) => passthrough(upstream),
        Err(err) => error_response(&err),
    }
}

/// Forward the bank body unchanged with its content type.
fn passthrough(upstream: ApiResponse) -> Response {
    let content_type = upstream
        .content_type
        .as_deref()
        .and_then(|v| HeaderValue::from_str(v).ok())
        .unwrap_or_else(|| HeaderValue::from_static("application/json"));

    (StatusCode::OK, [(header::CONTENT_TYPE, content_type)], upstream.body).into_response()
}

/// Map a flow error to a status code and a JSON body.
pub fn error_response(err: &AisError) -> Response {
    let status = if err.is_session_error() {
        StatusCode::UNAUTHORIZED
    } else {
        match err {
            AisError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            AisError::Upstream(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    };

    if let AisError::Upstream(upstream) = err {
        tracing::warn!(error = %upstream, bank_status = ?upstream.status(), "Bank request failed");
    } else if status.is_server_error() {
        tracing::error!(error = %err, "Request failed");
    } else {
        tracing::debug!(error = %err, "Request rejected");
    }

    json_error(status, err.to_user_message())
}

fn json_error(status: StatusCode, message: String) -> Response {
    (status, Json(serde_json::json!({ "error": message }))).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ClientError;

    #[test]
    fn test_error_status_mapping() {
        assert_eq!(error_response(&AisError::InvalidState).status(), StatusCode::UNAUTHORIZED);
        assert_eq!(error_response(&AisError::Unauthorized).status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            error_response(&AisError::invalid_request("resourceId is required")).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            error_response(&AisError::from(ClientError::from_status(500, "down"))).status(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            error_response(&AisError::configuration("bad")).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_passthrough_keeps_content_type() {
        let response = passthrough(ApiResponse {
            status: 200,
            content_type: Some("text/xml".into()),
            body: "<Document/>".into(),
        });
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "text/xml");
    }

    #[test]
    fn test_passthrough_defaults_to_json() {
        let response = passthrough(ApiResponse { status: 200, content_type: None, body: "{}".into() });
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/json");
    }
}
