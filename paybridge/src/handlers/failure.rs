use actix_web::{Error, HttpRequest, HttpResponse, post, web};
use common::PaymentIdentity;
use serde::Deserialize;
use serde_json::json;

use crate::reconciler::ProposedOutcome;
use crate::state::AppState;

use super::{ledger_failure, require_bearer};

#[derive(Debug, Deserialize)]
pub struct ReportFailureRequest {
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub errand_id: Option<String>,
    #[serde(default)]
    pub payment_type: Option<String>,
    #[serde(default)]
    pub details: Option<serde_json::Value>,
}

/// Client failure report. Always answers `{success:true}`: a report that
/// matches no record, or arrives after the payment already settled, is
/// logged and dropped rather than bounced back at a client that cannot do
/// anything about it.
#[post("/report-failure")]
pub async fn report_failure(
    req: HttpRequest,
    body: web::Json<ReportFailureRequest>,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    require_bearer(&req, &app_state.client_api_key)?;

    let body = body.into_inner();
    log::warn!(
        "Payment failure reported: {:?} (errand_id={:?}, payment_type={:?}, details={:?})",
        body.error_message,
        body.errand_id,
        body.payment_type,
        body.details
    );

    match (body.errand_id.as_deref(), body.payment_type.as_deref()) {
        (Some(errand_id), Some(payment_type))
            if !errand_id.is_empty() && !payment_type.is_empty() =>
        {
            let identity = PaymentIdentity::new(errand_id, payment_type);
            app_state
                .reconciler
                .reconcile(&identity, ProposedOutcome::Failed, None, body.error_message)
                .await
                .map_err(ledger_failure)?;
        }
        _ => {
            // Logging-only fallback when the report carries no usable identity.
            log::warn!("Failure report carried no identity; nothing recorded");
        }
    }

    Ok(HttpResponse::Ok().json(json!({ "success": true })))
}
