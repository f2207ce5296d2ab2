use std::str::FromStr;

use anyhow::Context;
use async_trait::async_trait;
use sqlx::{SqlitePool, sqlite::SqliteConnectOptions};

use crate::{
    Ledger, LedgerError, NewTransaction, PaymentIdentity, PaymentStatus, SUPERSEDED_DETAIL,
    TransactionRecord, TransitionFields,
};

/// Sqlite-backed ledger. All conditional updates go through single
/// statements so concurrent writers cannot interleave between the status
/// check and the mutation.
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    pub async fn new(database_url: &str) -> anyhow::Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)
            .context("Failed to create SQLite connect options")?
            .create_if_missing(true);
        let pool = SqlitePool::connect_with(options).await?;
        sqlx::migrate!()
            .run(&pool)
            .await
            .context("Database migration error")?;
        Ok(Self { pool })
    }

    // A pooled `:memory:` database is one database per connection, so the
    // test pool is pinned to a single connection.
    #[cfg(test)]
    async fn connect_in_memory() -> anyhow::Result<Self> {
        use sqlx::sqlite::SqlitePoolOptions;

        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .context("Failed to create SQLite connect options")?;
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;
        sqlx::migrate!()
            .run(&pool)
            .await
            .context("Database migration error")?;
        Ok(Self { pool })
    }
}

#[async_trait]
impl Ledger for Database {
    async fn create(&self, new: NewTransaction) -> Result<TransactionRecord, LedgerError> {
        let now = chrono::Utc::now().naive_utc();

        let mut tx = self.pool.begin().await?;

        // Latest pending wins lookups; the older attempt is closed out, not
        // deleted, so the audit trail keeps every attempt.
        sqlx::query(
            r#"
            UPDATE payment_transactions
            SET status = 'failed', error_message = ?3, updated_at = ?4
            WHERE errand_id = ?1 AND payment_type = ?2 AND status = 'pending'
            "#,
        )
        .bind(&new.identity.errand_id)
        .bind(&new.identity.payment_type)
        .bind(SUPERSEDED_DETAIL)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        let record = sqlx::query_as::<_, TransactionRecord>(
            r#"
            INSERT INTO payment_transactions (
                errand_id, payment_type, status, payment_reference,
                amount, currency, customer_id, return_url, created_at
            ) VALUES (?1, ?2, 'pending', ?3, ?4, ?5, ?6, ?7, ?8)
            RETURNING *
            "#,
        )
        .bind(&new.identity.errand_id)
        .bind(&new.identity.payment_type)
        .bind(&new.payment_reference)
        .bind(new.amount)
        .bind(&new.currency)
        .bind(&new.customer_id)
        .bind(&new.return_url)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        log::debug!("Created pending transaction: {:?}", record);
        Ok(record)
    }

    async fn try_transition(
        &self,
        identity: &PaymentIdentity,
        to: PaymentStatus,
        fields: TransitionFields,
    ) -> Result<Option<TransactionRecord>, LedgerError> {
        // One statement: the `status = 'pending'` condition and the update
        // are a single compare-and-swap inside sqlite's write lock.
        let record = sqlx::query_as::<_, TransactionRecord>(
            r#"
            UPDATE payment_transactions
            SET status = ?3,
                transaction_id = COALESCE(?4, transaction_id),
                error_message = ?5,
                updated_at = ?6,
                completed_at = ?7
            WHERE id = (
                SELECT id FROM payment_transactions
                WHERE errand_id = ?1 AND payment_type = ?2 AND status = 'pending'
                ORDER BY id DESC
                LIMIT 1
            )
            RETURNING *
            "#,
        )
        .bind(&identity.errand_id)
        .bind(&identity.payment_type)
        .bind(to)
        .bind(&fields.transaction_id)
        .bind(&fields.error_message)
        .bind(fields.updated_at)
        .bind(fields.completed_at)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    async fn read(
        &self,
        identity: &PaymentIdentity,
    ) -> Result<Option<TransactionRecord>, LedgerError> {
        let record = sqlx::query_as::<_, TransactionRecord>(
            r#"
            SELECT * FROM payment_transactions
            WHERE errand_id = ?1 AND payment_type = ?2
            ORDER BY id DESC
            LIMIT 1
            "#,
        )
        .bind(&identity.errand_id)
        .bind(&identity.payment_type)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_tx(errand: &str, payment_type: &str) -> NewTransaction {
        NewTransaction {
            identity: PaymentIdentity::new(errand, payment_type),
            payment_reference: format!("{errand}_{payment_type}_1700000000"),
            amount: 150.0,
            currency: "NAD".to_string(),
            customer_id: None,
            return_url: None,
        }
    }

    #[tokio::test]
    async fn transition_claims_pending_row_exactly_once() {
        let db = Database::connect_in_memory().await.unwrap();
        let identity = PaymentIdentity::new("E1", "first_half");
        db.create(new_tx("E1", "first_half")).await.unwrap();

        let now = chrono::Utc::now().naive_utc();
        let won = db
            .try_transition(
                &identity,
                PaymentStatus::Completed,
                TransitionFields {
                    transaction_id: Some("PT-1".to_string()),
                    updated_at: Some(now),
                    completed_at: Some(now),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(won.unwrap().status, PaymentStatus::Completed);

        // Second writer finds no pending row.
        let lost = db
            .try_transition(
                &identity,
                PaymentStatus::Failed,
                TransitionFields {
                    error_message: Some("too late".to_string()),
                    updated_at: Some(now),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(lost.is_none());

        let record = db.read(&identity).await.unwrap().unwrap();
        assert_eq!(record.status, PaymentStatus::Completed);
        assert_eq!(record.transaction_id.as_deref(), Some("PT-1"));
        assert!(record.completed_at.is_some());
    }

    #[tokio::test]
    async fn create_supersedes_prior_pending_attempt() {
        let db = Database::connect_in_memory().await.unwrap();
        let identity = PaymentIdentity::new("E2", "final");

        let first = db.create(new_tx("E2", "final")).await.unwrap();
        let second = db.create(new_tx("E2", "final")).await.unwrap();
        assert_ne!(first.id, second.id);

        // Lookups see the newest attempt, still pending.
        let latest = db.read(&identity).await.unwrap().unwrap();
        assert_eq!(latest.id, second.id);
        assert_eq!(latest.status, PaymentStatus::Pending);
    }

    #[tokio::test]
    async fn read_unknown_identity_is_none() {
        let db = Database::connect_in_memory().await.unwrap();
        let record = db
            .read(&PaymentIdentity::new("nope", "full"))
            .await
            .unwrap();
        assert!(record.is_none());
    }
}
