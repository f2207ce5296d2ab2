use actix_web::{
    Error, HttpRequest, HttpResponse, error::InternalError, http::StatusCode, post, web,
};
use common::PaymentIdentity;
use serde::Deserialize;
use serde_json::json;

use crate::reconciler::{Disposition, ProposedOutcome};
use crate::state::AppState;

use super::{ledger_failure, require_bearer};

#[derive(Debug, Deserialize)]
pub struct CompleteReturnRequest {
    pub errand_id: String,
    pub payment_type: String,
    #[serde(default)]
    pub transaction_id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

/// Browser return-redirect completion, called service-to-service from the
/// payment-return page backend. Anything the redirect reports other than an
/// explicit success is treated as a failed attempt.
#[post("/complete-return")]
pub async fn complete_return(
    req: HttpRequest,
    body: web::Json<CompleteReturnRequest>,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    require_bearer(&req, &app_state.service_key)?;

    let body = body.into_inner();
    if body.errand_id.is_empty() || body.payment_type.is_empty() {
        return Err(InternalError::new(
            "Missing errand_id or payment_type",
            StatusCode::BAD_REQUEST,
        )
        .into());
    }

    let is_success = matches!(body.status.as_deref(), Some("completed") | Some("success"));
    let (outcome, detail) = if is_success {
        (ProposedOutcome::Completed, None)
    } else {
        (
            ProposedOutcome::Failed,
            Some("Payment cancelled or failed".to_string()),
        )
    };

    let identity = PaymentIdentity::new(body.errand_id, body.payment_type);
    let result = app_state
        .reconciler
        .reconcile(&identity, outcome, body.transaction_id, detail)
        .await
        .map_err(ledger_failure)?;

    let response = match result.disposition {
        Disposition::Applied | Disposition::AlreadySettled => json!({
            "updated": result.applied,
            "status": result.status,
        }),
        Disposition::NotFound => json!({
            "updated": false,
            "message": "No pending transaction found for this errand and payment type",
        }),
    };
    Ok(HttpResponse::Ok().json(response))
}
