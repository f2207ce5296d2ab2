use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Lifecycle of a payment transaction. `Completed` and `Failed` are terminal;
/// a record that reached either of them never changes again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
}

impl PaymentStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, PaymentStatus::Completed | PaymentStatus::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Completed => "completed",
            PaymentStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Business identity of a purchasable unit: an errand plus which part of it
/// is being paid for. Both parts are opaque strings owned by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PaymentIdentity {
    pub errand_id: String,
    pub payment_type: String,
}

impl PaymentIdentity {
    pub fn new(errand_id: impl Into<String>, payment_type: impl Into<String>) -> Self {
        PaymentIdentity {
            errand_id: errand_id.into(),
            payment_type: payment_type.into(),
        }
    }
}

impl fmt::Display for PaymentIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.errand_id, self.payment_type)
    }
}

/// One row of the payment ledger. Rows are never deleted; settled rows are
/// kept indefinitely for idempotent status reporting and audit.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct TransactionRecord {
    pub id: i64,
    pub errand_id: String,
    pub payment_type: String,
    pub status: PaymentStatus,
    pub payment_reference: String,
    /// Provider-issued transaction id, unknown until the payment settles.
    pub transaction_id: Option<String>,
    /// Set only when `status` is `failed`.
    pub error_message: Option<String>,
    pub amount: f64,
    pub currency: String,
    pub customer_id: Option<String>,
    pub return_url: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: Option<NaiveDateTime>,
    pub completed_at: Option<NaiveDateTime>,
}

impl TransactionRecord {
    pub fn identity(&self) -> PaymentIdentity {
        PaymentIdentity::new(self.errand_id.clone(), self.payment_type.clone())
    }
}

/// Everything required to open a new `pending` row.
#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub identity: PaymentIdentity,
    pub payment_reference: String,
    pub amount: f64,
    pub currency: String,
    pub customer_id: Option<String>,
    pub return_url: Option<String>,
}
