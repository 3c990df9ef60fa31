//! Bank endpoint discovery.

use super::types::Endpoints;
use crate::client::BankTransport;
use crate::error::{AisError, AisResult};

/// Fetch the well-known configuration document.
///
/// Must succeed before any consent or token operation; the gateway is only
/// constructible from its result.
pub async fn discover(transport: &dyn BankTransport, well_known_url: &str) -> AisResult<Endpoints> {
    let response = transport.get(well_known_url, &[], &[]).await?.error_for_status()?;
    let endpoints: Endpoints = response.json()?;

    if endpoints.authorization.is_empty() || endpoints.token.is_empty() {
        return Err(AisError::configuration(format!(
            "{well_known_url} does not advertise authorization and token endpoints"
        )));
    }

    tracing::info!(
        authorization = %endpoints.authorization,
        token = %endpoints.token,
        "Discovered bank OAuth endpoints"
    );

    Ok(endpoints)
}
