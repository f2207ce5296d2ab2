use actix_web::{
    Error, HttpRequest, HttpResponse, error::InternalError, get, http::StatusCode, web,
};
use common::PaymentIdentity;
use serde::Deserialize;

use crate::state::AppState;

use super::{ledger_failure, require_bearer};

#[derive(Debug, Deserialize)]
pub struct TransactionQuery {
    pub errand_id: String,
    pub payment_type: String,
}

/// Point status lookup for the backend: the latest attempt for an identity,
/// settled or not.
#[get("/transactions")]
pub async fn get_transaction(
    req: HttpRequest,
    query: web::Query<TransactionQuery>,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    require_bearer(&req, &app_state.service_key)?;

    if query.errand_id.is_empty() || query.payment_type.is_empty() {
        return Err(InternalError::new(
            "Missing errand_id or payment_type",
            StatusCode::BAD_REQUEST,
        )
        .into());
    }

    let identity = PaymentIdentity::new(query.errand_id.clone(), query.payment_type.clone());
    let record = app_state
        .ledger
        .read(&identity)
        .await
        .map_err(ledger_failure)?;

    match record {
        Some(record) => Ok(HttpResponse::Ok().json(record)),
        None => Err(InternalError::new(
            "No transaction found for this errand and payment type",
            StatusCode::NOT_FOUND,
        )
        .into()),
    }
}
