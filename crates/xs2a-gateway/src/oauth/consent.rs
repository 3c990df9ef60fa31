//! AIS consent creation.

use chrono::{Months, NaiveDate, Utc};

use super::types::{AccountReference, Consent, ConsentAccess, ConsentRequest};
use crate::client::BankTransport;
use crate::config::{Config, api};
use crate::error::{AisError, AisResult};

/// Build the consent body for one account, valid for one calendar month from `today`.
pub fn consent_request(iban: &str, today: NaiveDate) -> AisResult<ConsentRequest> {
    let valid_until = today
        .checked_add_months(Months::new(1))
        .ok_or_else(|| AisError::invalid_request(format!("cannot add a month to {today}")))?;

    let accounts = vec![AccountReference { iban: iban.to_string() }];

    Ok(ConsentRequest {
        access: ConsentAccess { balances: accounts.clone(), transactions: accounts },
        recurring_indicator: true,
        valid_until: valid_until.format("%Y-%m-%d").to_string(),
        frequency_per_day: api::FREQUENCY_PER_DAY,
        combined_service_indicator: false,
    })
}

/// Create a consent for the configured account.
pub async fn start_consent(transport: &dyn BankTransport, config: &Config) -> AisResult<Consent> {
    let request = consent_request(&config.iban, Utc::now().date_naive())?;
    let body = serde_json::to_string(&request)?;
    let url = config.build_url("/consents")?;
    let request_id = uuid::Uuid::new_v4().to_string();

    let headers = vec![
        ("X-Request-ID".to_string(), request_id.clone()),
        ("TPP-Redirect-URI".to_string(), config.tpp_redirect_uri.clone()),
        ("TPP-Redirect-Preferred".to_string(), "true".to_string()),
    ];

    let response = transport
        .post(url.as_str(), "application/json", body, &headers)
        .await?
        .error_for_status()?;
    let consent: Consent = response.json()?;

    tracing::info!(
        request_id = %request_id,
        consent_id = %consent.id,
        status = %consent.status,
        "Created consent"
    );
    if !consent.messages.is_empty() {
        tracing::warn!(consent_id = %consent.id, messages = %consent.message(), "Consent has TPP messages");
    }

    Ok(consent)
}
