use std::sync::Arc;

use common::{Ledger, LedgerError, PaymentIdentity, PaymentStatus, TransactionRecord, TransitionFields};
use serde::Serialize;

/// Final outcome an entry adapter proposes for a payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProposedOutcome {
    Completed,
    Failed,
}

impl ProposedOutcome {
    fn status(self) -> PaymentStatus {
        match self {
            ProposedOutcome::Completed => PaymentStatus::Completed,
            ProposedOutcome::Failed => PaymentStatus::Failed,
        }
    }
}

/// How a reconcile call resolved. `AlreadySettled` and `NotFound` are
/// successful no-ops, not errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Disposition {
    Applied,
    AlreadySettled,
    NotFound,
}

#[derive(Debug, Clone)]
pub struct Reconciliation {
    pub applied: bool,
    pub disposition: Disposition,
    pub status: Option<PaymentStatus>,
    pub record: Option<TransactionRecord>,
}

/// The state machine that admits at most one terminal transition per
/// identity. All concurrency safety comes from the ledger's atomic
/// `try_transition`; the reconciler itself holds no state between calls.
pub struct Reconciler {
    ledger: Arc<dyn Ledger>,
}

impl Reconciler {
    pub fn new(ledger: Arc<dyn Ledger>) -> Self {
        Reconciler { ledger }
    }

    /// Proposes a terminal outcome for the identity. First successful atomic
    /// write wins; every later call, with any outcome, is an idempotent
    /// no-op that reports the settled status. A delayed failure report never
    /// reverts a completed payment.
    pub async fn reconcile(
        &self,
        identity: &PaymentIdentity,
        outcome: ProposedOutcome,
        external_reference: Option<String>,
        detail: Option<String>,
    ) -> Result<Reconciliation, LedgerError> {
        let to = outcome.status();

        // A create can land between a missed transition and the read-back,
        // leaving a fresh pending row. Re-attempt a bounded number of times
        // so that window does not surface as a spurious not-found.
        for _ in 0..3 {
            let now = chrono::Utc::now().naive_utc();
            let fields = TransitionFields {
                transaction_id: external_reference.clone(),
                error_message: match outcome {
                    ProposedOutcome::Failed => {
                        Some(detail.clone().unwrap_or_else(|| "Payment failed".to_string()))
                    }
                    ProposedOutcome::Completed => None,
                },
                updated_at: Some(now),
                completed_at: match outcome {
                    ProposedOutcome::Completed => Some(now),
                    ProposedOutcome::Failed => None,
                },
            };

            if let Some(record) = self.ledger.try_transition(identity, to, fields).await? {
                log::info!(
                    "Reconciled {}: proposed {}, applied, now {}",
                    identity,
                    to,
                    record.status
                );
                return Ok(Reconciliation {
                    applied: true,
                    disposition: Disposition::Applied,
                    status: Some(record.status),
                    record: Some(record),
                });
            }

            match self.ledger.read(identity).await? {
                Some(record) if record.status.is_terminal() => {
                    log::info!(
                        "Reconcile no-op for {}: proposed {}, already settled as {}",
                        identity,
                        to,
                        record.status
                    );
                    return Ok(Reconciliation {
                        applied: false,
                        disposition: Disposition::AlreadySettled,
                        status: Some(record.status),
                        record: Some(record),
                    });
                }
                Some(_) => continue,
                None => {
                    log::warn!(
                        "Reconcile no-op for {}: proposed {}, no transaction on record",
                        identity,
                        to
                    );
                    return Ok(Reconciliation {
                        applied: false,
                        disposition: Disposition::NotFound,
                        status: None,
                        record: None,
                    });
                }
            }
        }

        log::warn!(
            "Reconcile gave up for {}: pending row kept reappearing between attempts",
            identity
        );
        Ok(Reconciliation {
            applied: false,
            disposition: Disposition::NotFound,
            status: None,
            record: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::{InMemoryLedger, NewTransaction};

    fn new_tx(errand: &str, payment_type: &str) -> NewTransaction {
        NewTransaction {
            identity: PaymentIdentity::new(errand, payment_type),
            payment_reference: format!("{errand}_{payment_type}_1700000000"),
            amount: 200.0,
            currency: "NAD".to_string(),
            customer_id: None,
            return_url: None,
        }
    }

    fn reconciler() -> (Reconciler, Arc<InMemoryLedger>) {
        let ledger = Arc::new(InMemoryLedger::new());
        (Reconciler::new(ledger.clone()), ledger)
    }

    #[tokio::test]
    async fn first_writer_wins_and_replays_are_noops() {
        let (reconciler, ledger) = reconciler();
        let identity = PaymentIdentity::new("E1", "first_half");
        ledger.create(new_tx("E1", "first_half")).await.unwrap();

        let won = reconciler
            .reconcile(
                &identity,
                ProposedOutcome::Completed,
                Some("PT-42".to_string()),
                None,
            )
            .await
            .unwrap();
        assert!(won.applied);
        assert_eq!(won.status, Some(PaymentStatus::Completed));

        // A delayed conflicting report does not revert the payment.
        let late = reconciler
            .reconcile(
                &identity,
                ProposedOutcome::Failed,
                None,
                Some("user pressed cancel".to_string()),
            )
            .await
            .unwrap();
        assert!(!late.applied);
        assert_eq!(late.disposition, Disposition::AlreadySettled);
        assert_eq!(late.status, Some(PaymentStatus::Completed));

        let record = ledger.read(&identity).await.unwrap().unwrap();
        assert_eq!(record.status, PaymentStatus::Completed);
        assert_eq!(record.transaction_id.as_deref(), Some("PT-42"));
        assert!(record.error_message.is_none());
    }

    #[tokio::test]
    async fn order_independence() {
        for outcomes in [
            [ProposedOutcome::Completed, ProposedOutcome::Failed],
            [ProposedOutcome::Failed, ProposedOutcome::Completed],
        ] {
            let (reconciler, ledger) = reconciler();
            let identity = PaymentIdentity::new("E2", "final");
            ledger.create(new_tx("E2", "final")).await.unwrap();

            let first = reconciler
                .reconcile(&identity, outcomes[0], None, None)
                .await
                .unwrap();
            let second = reconciler
                .reconcile(&identity, outcomes[1], None, None)
                .await
                .unwrap();

            assert!(first.applied);
            assert!(!second.applied);
            // Whatever arrived first stands; the loser is told the same status.
            assert_eq!(first.status, second.status);
            assert_eq!(
                ledger.read(&identity).await.unwrap().unwrap().status,
                outcomes[0].status()
            );
        }
    }

    #[tokio::test]
    async fn unknown_identity_is_a_successful_noop() {
        let (reconciler, _ledger) = reconciler();
        let result = reconciler
            .reconcile(
                &PaymentIdentity::new("E3", "full"),
                ProposedOutcome::Completed,
                None,
                None,
            )
            .await
            .unwrap();
        assert!(!result.applied);
        assert_eq!(result.disposition, Disposition::NotFound);
        assert_eq!(result.status, None);
    }

    #[tokio::test]
    async fn concurrent_conflicting_proposals_settle_exactly_once() {
        let (reconciler, ledger) = reconciler();
        let reconciler = Arc::new(reconciler);
        let identity = PaymentIdentity::new("E2", "final");
        ledger.create(new_tx("E2", "final")).await.unwrap();

        let mut handles = Vec::new();
        for i in 0..16 {
            let reconciler = reconciler.clone();
            let identity = identity.clone();
            let outcome = if i % 2 == 0 {
                ProposedOutcome::Completed
            } else {
                ProposedOutcome::Failed
            };
            handles.push(tokio::spawn(async move {
                reconciler
                    .reconcile(&identity, outcome, Some(format!("PT-{i}")), None)
                    .await
                    .unwrap()
            }));
        }

        let mut results = Vec::new();
        for handle in handles {
            results.push(handle.await.unwrap());
        }

        let winners = results.iter().filter(|r| r.applied).count();
        assert_eq!(winners, 1);

        let settled = ledger.read(&identity).await.unwrap().unwrap().status;
        assert!(settled.is_terminal());
        // Every caller, winner or not, reports the same persisted status.
        for result in &results {
            assert_eq!(result.status, Some(settled));
        }
    }
}
