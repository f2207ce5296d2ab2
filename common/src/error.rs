use thiserror::Error;

/// Failures of the underlying store. Safe to retry from the outside:
/// transitions are conditional on `status = pending`, so a replay after a
/// half-seen failure is a no-op at worst.
#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}
