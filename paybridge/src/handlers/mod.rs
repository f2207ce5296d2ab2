mod complete_return;
mod failure;
mod intent;
mod transactions;
mod verify;
mod webhook;

use actix_web::{
    Error, HttpRequest, HttpResponse, Responder, error::InternalError, get, http::StatusCode,
    http::header,
};
use common::LedgerError;

pub use complete_return::*;
pub use failure::*;
pub use intent::*;
pub use transactions::*;
pub use verify::*;
pub use webhook::*;

#[get("/")]
pub async fn index() -> impl Responder {
    HttpResponse::Ok().body("Welcome to the PayBridge payment service!")
}

/// Checks the request against one expected bearer key. Nothing reaches the
/// ledger before this passes.
pub(crate) fn require_bearer(req: &HttpRequest, expected: &str) -> Result<(), Error> {
    let provided = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "));

    match provided {
        Some(token) if constant_time_eq(token, expected) => Ok(()),
        _ => {
            log::warn!(
                "Rejected request to {}: missing or invalid bearer credential",
                req.path()
            );
            Err(InternalError::new(
                "Missing or invalid bearer credential",
                StatusCode::UNAUTHORIZED,
            )
            .into())
        }
    }
}

/// Comparison time must not depend on how many leading bytes of the
/// presented key match. Key length is not a secret.
fn constant_time_eq(a: &str, b: &str) -> bool {
    use subtle::ConstantTimeEq;

    a.as_bytes().ct_eq(b.as_bytes()).into()
}

pub(crate) fn ledger_failure(e: LedgerError) -> Error {
    log::error!("Ledger failure: {e}");
    InternalError::new(
        "Payment store unavailable. Please try again later.",
        StatusCode::INTERNAL_SERVER_ERROR,
    )
    .into()
}

#[cfg(test)]
mod tests {
    use super::constant_time_eq;

    #[test]
    fn key_comparison_accepts_only_the_exact_key() {
        assert!(constant_time_eq("service-test-key", "service-test-key"));
        assert!(!constant_time_eq("service-test-kez", "service-test-key"));
        assert!(!constant_time_eq("service-test-key-extra", "service-test-key"));
        assert!(!constant_time_eq("service", "service-test-key"));
        assert!(!constant_time_eq("", "service-test-key"));
    }
}
