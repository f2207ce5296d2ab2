use async_trait::async_trait;
use chrono::NaiveDateTime;

use crate::{LedgerError, NewTransaction, PaymentIdentity, PaymentStatus, TransactionRecord};

/// Fields written together with a status transition.
#[derive(Debug, Clone, Default)]
pub struct TransitionFields {
    /// Provider transaction id, kept if already set and the proposal has none.
    pub transaction_id: Option<String>,
    pub error_message: Option<String>,
    pub updated_at: Option<NaiveDateTime>,
    pub completed_at: Option<NaiveDateTime>,
}

/// Contract for atomic conditional reads and writes of transaction records.
///
/// `try_transition` is the sole correctness mechanism under concurrent
/// callers: it must be one indivisible compare-and-swap at the storage
/// layer. Implementations must never decompose it into a read followed by a
/// write.
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Insert a new `pending` row for the identity. A prior pending attempt
    /// for the same identity is failed with a "superseded" detail in the
    /// same storage transaction, so at most one row per identity is pending
    /// at any time.
    async fn create(&self, new: NewTransaction) -> Result<TransactionRecord, LedgerError>;

    /// Atomically move the pending row for `identity` to `to`, writing
    /// `fields`. Returns the updated row, or `None` when no pending row
    /// matched (already settled, or never created).
    async fn try_transition(
        &self,
        identity: &PaymentIdentity,
        to: PaymentStatus,
        fields: TransitionFields,
    ) -> Result<Option<TransactionRecord>, LedgerError>;

    /// Latest row for the identity, superseded attempts included in the
    /// ordering but shadowed by newer ones. No locking.
    async fn read(&self, identity: &PaymentIdentity)
    -> Result<Option<TransactionRecord>, LedgerError>;
}

/// Detail text written to a pending row that a newer attempt replaces.
pub const SUPERSEDED_DETAIL: &str = "Superseded by a newer payment attempt";
