use actix_web::{Error, HttpResponse, error::InternalError, http::StatusCode, post, web};
use common::parse_payment_reference;
use serde::Deserialize;
use serde_json::json;

use crate::reconciler::ProposedOutcome;
use crate::state::AppState;

use super::ledger_failure;

/// Provider status tokens we accept, matched exactly. Anything else is
/// unrecognized and deliberately does not touch the ledger; it must not
/// default to a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderStatus {
    Settled,
    Unrecognized,
}

impl ProviderStatus {
    pub fn parse(token: &str) -> Self {
        match token {
            "OK" | "SUCCESS" => ProviderStatus::Settled,
            _ => ProviderStatus::Unrecognized,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct WebhookNotification {
    #[serde(rename = "ref")]
    pub reference: Option<String>,
    pub status: Option<String>,
    #[serde(default)]
    pub transaction_id: Option<String>,
}

/// Provider webhook. Unauthenticated: the provider offers no credential we
/// control, only the correlation reference it echoes back. A forged call can
/// therefore complete a payment; signature verification is a provider-side
/// gap tracked outside this service.
#[post("/webhook")]
pub async fn webhook(
    body: web::Json<WebhookNotification>,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let body = body.into_inner();
    log::info!("Provider webhook received: {:?}", body);

    let Some(reference) = body.reference.as_deref() else {
        return Err(InternalError::new(
            "Missing required field: ref",
            StatusCode::BAD_REQUEST,
        )
        .into());
    };
    let (identity, _issued_at) = parse_payment_reference(reference).map_err(|e| {
        log::warn!("Webhook carried an unparseable reference: {e:#}");
        InternalError::new("Malformed payment reference", StatusCode::BAD_REQUEST)
    })?;

    let token = body.status.as_deref().unwrap_or_default();
    match ProviderStatus::parse(token) {
        ProviderStatus::Unrecognized => {
            log::warn!(
                "Webhook for {} carried unrecognized provider status `{}`; nothing recorded",
                identity,
                token
            );
            Ok(HttpResponse::Ok().json(json!({
                "received": true,
                "outcome": "unrecognized",
            })))
        }
        ProviderStatus::Settled => {
            let result = app_state
                .reconciler
                .reconcile(
                    &identity,
                    ProposedOutcome::Completed,
                    body.transaction_id,
                    None,
                )
                .await
                .map_err(ledger_failure)?;

            Ok(HttpResponse::Ok().json(json!({
                "received": true,
                "outcome": result.disposition,
                "applied": result.applied,
                "status": result.status,
            })))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_exact_success_tokens_settle() {
        assert_eq!(ProviderStatus::parse("OK"), ProviderStatus::Settled);
        assert_eq!(ProviderStatus::parse("SUCCESS"), ProviderStatus::Settled);

        for token in ["ok", "success", "Ok", "FAILED", "CANCELLED", "", "OKAY"] {
            assert_eq!(ProviderStatus::parse(token), ProviderStatus::Unrecognized);
        }
    }
}
