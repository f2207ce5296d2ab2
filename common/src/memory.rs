use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{
    Ledger, LedgerError, NewTransaction, PaymentIdentity, PaymentStatus, SUPERSEDED_DETAIL,
    TransactionRecord, TransitionFields,
};

/// In-memory ledger for tests and local runs, append-only per identity.
///
/// The write lock spans the whole match-and-mutate of `try_transition`, so
/// it gives the same compare-and-swap guarantee the database provides with
/// a single conditional statement.
#[derive(Default, Clone)]
pub struct InMemoryLedger {
    inner: Arc<RwLock<Inner>>,
}

#[derive(Default)]
struct Inner {
    rows: HashMap<(String, String), Vec<TransactionRecord>>,
    next_id: i64,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(identity: &PaymentIdentity) -> (String, String) {
        (identity.errand_id.clone(), identity.payment_type.clone())
    }
}

#[async_trait]
impl Ledger for InMemoryLedger {
    async fn create(&self, new: NewTransaction) -> Result<TransactionRecord, LedgerError> {
        let now = chrono::Utc::now().naive_utc();
        let mut inner = self.inner.write().await;

        inner.next_id += 1;
        let id = inner.next_id;
        let rows = inner.rows.entry(Self::key(&new.identity)).or_default();

        // Latest pending wins lookups; the older attempt is closed out.
        if let Some(prior) = rows.iter_mut().rev().find(|r| r.status == PaymentStatus::Pending) {
            prior.status = PaymentStatus::Failed;
            prior.error_message = Some(SUPERSEDED_DETAIL.to_string());
            prior.updated_at = Some(now);
        }

        let record = TransactionRecord {
            id,
            errand_id: new.identity.errand_id,
            payment_type: new.identity.payment_type,
            status: PaymentStatus::Pending,
            payment_reference: new.payment_reference,
            transaction_id: None,
            error_message: None,
            amount: new.amount,
            currency: new.currency,
            customer_id: new.customer_id,
            return_url: new.return_url,
            created_at: now,
            updated_at: None,
            completed_at: None,
        };
        rows.push(record.clone());
        Ok(record)
    }

    async fn try_transition(
        &self,
        identity: &PaymentIdentity,
        to: PaymentStatus,
        fields: TransitionFields,
    ) -> Result<Option<TransactionRecord>, LedgerError> {
        let mut inner = self.inner.write().await;
        let Some(rows) = inner.rows.get_mut(&Self::key(identity)) else {
            return Ok(None);
        };
        let Some(row) = rows.iter_mut().rev().find(|r| r.status == PaymentStatus::Pending)
        else {
            return Ok(None);
        };

        row.status = to;
        if fields.transaction_id.is_some() {
            row.transaction_id = fields.transaction_id;
        }
        row.error_message = fields.error_message;
        row.updated_at = fields.updated_at;
        row.completed_at = fields.completed_at;
        Ok(Some(row.clone()))
    }

    async fn read(
        &self,
        identity: &PaymentIdentity,
    ) -> Result<Option<TransactionRecord>, LedgerError> {
        let inner = self.inner.read().await;
        Ok(inner
            .rows
            .get(&Self::key(identity))
            .and_then(|rows| rows.last())
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_tx(errand: &str, payment_type: &str) -> NewTransaction {
        NewTransaction {
            identity: PaymentIdentity::new(errand, payment_type),
            payment_reference: format!("{errand}_{payment_type}_1700000000"),
            amount: 99.5,
            currency: "NAD".to_string(),
            customer_id: Some("customer-7".to_string()),
            return_url: None,
        }
    }

    #[tokio::test]
    async fn transition_is_claimed_once() {
        let ledger = InMemoryLedger::new();
        let identity = PaymentIdentity::new("E1", "first_half");
        ledger.create(new_tx("E1", "first_half")).await.unwrap();

        let now = chrono::Utc::now().naive_utc();
        let first = ledger
            .try_transition(
                &identity,
                PaymentStatus::Failed,
                TransitionFields {
                    error_message: Some("card declined".to_string()),
                    updated_at: Some(now),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(first.unwrap().status, PaymentStatus::Failed);

        let second = ledger
            .try_transition(&identity, PaymentStatus::Completed, TransitionFields::default())
            .await
            .unwrap();
        assert!(second.is_none());

        let record = ledger.read(&identity).await.unwrap().unwrap();
        assert_eq!(record.status, PaymentStatus::Failed);
        assert_eq!(record.error_message.as_deref(), Some("card declined"));
    }

    #[tokio::test]
    async fn create_supersedes_older_pending() {
        let ledger = InMemoryLedger::new();
        let identity = PaymentIdentity::new("E2", "final");

        ledger.create(new_tx("E2", "final")).await.unwrap();
        let second = ledger.create(new_tx("E2", "final")).await.unwrap();

        let latest = ledger.read(&identity).await.unwrap().unwrap();
        assert_eq!(latest.id, second.id);
        assert_eq!(latest.status, PaymentStatus::Pending);

        // Only the newest attempt is claimable.
        let won = ledger
            .try_transition(&identity, PaymentStatus::Completed, TransitionFields::default())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(won.id, second.id);
    }
}
