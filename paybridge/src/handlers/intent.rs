use actix_web::{
    Error, HttpRequest, HttpResponse, error::InternalError, http::StatusCode, post, web,
};
use common::{NewTransaction, PaymentIdentity, format_payment_reference};
use serde::Deserialize;
use serde_json::json;

use crate::state::AppState;

use super::{ledger_failure, require_bearer};

#[derive(Debug, Deserialize)]
pub struct CreateIntentRequest {
    pub errand_id: String,
    pub payment_type: String,
    pub amount: f64,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub customer_id: Option<String>,
    #[serde(default)]
    pub return_url: Option<String>,
}

/// Opens a new pending transaction and issues the correlation reference the
/// provider will echo back through the webhook. Rendering of the payment
/// page itself is the caller's concern.
#[post("/create-intent")]
pub async fn create_intent(
    req: HttpRequest,
    body: web::Json<CreateIntentRequest>,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    require_bearer(&req, &app_state.client_api_key)?;

    let body = body.into_inner();
    if body.errand_id.is_empty() || body.payment_type.is_empty() {
        return Err(InternalError::new(
            "Missing required fields: errand_id, payment_type",
            StatusCode::BAD_REQUEST,
        )
        .into());
    }
    if body.amount <= 0.0 {
        return Err(InternalError::new(
            "Field `amount` must be a positive number",
            StatusCode::BAD_REQUEST,
        )
        .into());
    }
    if body.amount > 1_000_000.0 {
        log::warn!(
            "Amount {} for {}/{} seems unusually large; the provider expects dollars, not cents",
            body.amount,
            body.errand_id,
            body.payment_type
        );
    }

    let identity = PaymentIdentity::new(body.errand_id, body.payment_type);
    let payment_reference =
        format_payment_reference(&identity, chrono::Utc::now().timestamp_millis());

    let record = app_state
        .ledger
        .create(NewTransaction {
            identity: identity.clone(),
            payment_reference: payment_reference.clone(),
            amount: body.amount,
            currency: body.currency.unwrap_or_else(|| "NAD".to_string()),
            customer_id: body.customer_id,
            return_url: body.return_url.clone(),
        })
        .await
        .map_err(ledger_failure)?;

    log::info!(
        "Created payment intent {} for {} ({} {})",
        payment_reference,
        identity,
        record.amount,
        record.currency
    );

    Ok(HttpResponse::Ok().json(json!({
        "payment_reference": payment_reference,
        "status": record.status,
        "intent": {
            "invoice_number": payment_reference,
            "amount": record.amount,
            "currency": record.currency,
            "shop_handle": app_state.shop_handle,
            "return_url": body.return_url,
        },
    })))
}
