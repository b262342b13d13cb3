//! Error taxonomy for the catalog, workflow, ledger, and withdrawal layers.
//!
//! Front-end code turns these into user-facing text; nothing here is
//! retried automatically.

use rust_decimal::Decimal;
use thiserror::Error;

/// Failure of the underlying persistence layer. Any partial write inside
/// the atomic unit that produced it has been rolled back.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("store lock poisoned")]
    Poisoned,
}

/// Errors surfaced by the task catalog, submission workflow, and balance ledger.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("invalid input: {0}")]
    Validation(String),
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },
    #[error("insufficient balance: requested {requested}, available {available}")]
    InsufficientBalance {
        requested: Decimal,
        available: Decimal,
    },
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl LedgerError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}

impl From<rusqlite::Error> for LedgerError {
    fn from(e: rusqlite::Error) -> Self {
        Self::Store(StoreError::Sqlite(e))
    }
}

/// Why a withdrawal request was refused.
#[derive(Debug, Error)]
pub enum WithdrawalError {
    #[error("below minimum withdrawal of {minimum}")]
    BelowMinimum { minimum: Decimal, requested: Decimal },
    #[error("insufficient balance: requested {requested}, available {available}")]
    InsufficientBalance {
        requested: Decimal,
        available: Decimal,
    },
    #[error("user {0} not found")]
    UserNotFound(i64),
    #[error("invalid withdrawal: {0}")]
    Invalid(String),
    #[error("settlement failed: {0}")]
    SettlementFailed(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl WithdrawalError {
    /// Map a ledger error raised while reserving funds for `user_id`.
    pub(crate) fn from_ledger(user_id: i64, err: LedgerError) -> Self {
        match err {
            LedgerError::InsufficientBalance {
                requested,
                available,
            } => Self::InsufficientBalance {
                requested,
                available,
            },
            LedgerError::NotFound { .. } => Self::UserNotFound(user_id),
            LedgerError::Store(e) => Self::Store(e),
            LedgerError::Validation(msg) => Self::Invalid(msg),
        }
    }
}

pub type LedgerResult<T> = std::result::Result<T, LedgerError>;
