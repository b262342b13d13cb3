//! Balance ledger.
//!
//! Every balance change is written together with its transaction row inside
//! one [`Store::atomic`] unit: read balance, validate, write balance and
//! ledger row, commit. Once nothing is pending, a user's balance equals the
//! sum of completed credits minus completed debits.
//!
//! Debits come in two flavours. [`Ledger::debit`] records a completed debit
//! in one step. [`Ledger::reserve`] records a pending debit and takes the
//! funds out of the balance immediately; the caller later calls
//! [`Ledger::settle`] or [`Ledger::fail`], and failing a reserved debit
//! releases the funds again.

use std::sync::Arc;

use chrono::Utc;
use rand::RngExt;
use rusqlite::{Connection, OptionalExtension, params};
use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use crate::consts::{CREDIT_PREFIX, DEBIT_PREFIX};
use crate::error::{LedgerError, LedgerResult};
use crate::events::{Event, EventBus};
use crate::models::{Transaction, TransactionKind, TransactionStatus};
use crate::store::Store;
use crate::users::query_by_id;

/// Balance cross-check for one user, built from the ledger rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Audit {
    pub balance: Decimal,
    pub completed_credits: Decimal,
    pub completed_debits: Decimal,
    /// Reserved but not yet settled.
    pub pending_debits: Decimal,
}

impl Audit {
    /// Whether the stored balance matches what the ledger implies.
    pub fn is_consistent(&self) -> bool {
        self.balance == self.completed_credits - self.completed_debits - self.pending_debits
    }
}

pub struct Ledger {
    store: Arc<Store>,
    events: EventBus,
}

impl Ledger {
    pub fn new(store: Arc<Store>, events: EventBus) -> Self {
        Self { store, events }
    }

    /// Add `amount` to the user's balance with a completed credit.
    pub fn credit(
        &self,
        user_id: i64,
        amount: Decimal,
        reason: &str,
    ) -> LedgerResult<(Transaction, Decimal)> {
        let (tx, balance) = self
            .store
            .atomic(|conn| apply_credit(conn, user_id, amount, reason))?;
        self.events.emit(Event::BalanceCredited {
            user_id,
            amount,
            balance,
        });
        Ok((tx, balance))
    }

    /// Take `amount` from the user's balance with a completed debit.
    pub fn debit(
        &self,
        user_id: i64,
        amount: Decimal,
        reason: &str,
    ) -> LedgerResult<(Transaction, Decimal)> {
        self.store.atomic(|conn| {
            apply_debit(
                conn,
                user_id,
                amount,
                reason,
                DEBIT_PREFIX,
                TransactionStatus::Completed,
            )
        })
    }

    /// Take `amount` from the balance now, recorded as a pending debit
    /// under a reference starting with `prefix`.
    pub fn reserve(
        &self,
        user_id: i64,
        amount: Decimal,
        reason: &str,
        prefix: &str,
    ) -> LedgerResult<(Transaction, Decimal)> {
        self.store.atomic(|conn| {
            apply_debit(
                conn,
                user_id,
                amount,
                reason,
                prefix,
                TransactionStatus::Pending,
            )
        })
    }

    /// Mark a pending transaction completed.
    pub fn settle(&self, transaction_id: i64) -> LedgerResult<Transaction> {
        self.store.atomic(|conn| {
            let tx = pending_transaction(conn, transaction_id)?;
            set_status(conn, transaction_id, TransactionStatus::Completed)?;
            info!(transaction_id, user_id = tx.user_id, amount = %tx.amount, "transaction settled");
            Ok(Transaction {
                status: TransactionStatus::Completed,
                ..tx
            })
        })
    }

    /// Mark a pending transaction failed. A failed debit gives the reserved
    /// amount back to the user in the same unit.
    pub fn fail(&self, transaction_id: i64) -> LedgerResult<Transaction> {
        self.store.atomic(|conn| {
            let tx = pending_transaction(conn, transaction_id)?;
            set_status(conn, transaction_id, TransactionStatus::Failed)?;
            if tx.kind == TransactionKind::Debit {
                let balance = add_amount(current_balance(conn, tx.user_id)?, tx.amount)?;
                write_balance(conn, tx.user_id, balance)?;
            }
            warn!(transaction_id, user_id = tx.user_id, amount = %tx.amount, "transaction failed");
            Ok(Transaction {
                status: TransactionStatus::Failed,
                ..tx
            })
        })
    }

    pub fn balance(&self, user_id: i64) -> LedgerResult<Decimal> {
        self.store.with_conn(|conn| current_balance(conn, user_id))
    }

    pub fn transaction(&self, transaction_id: i64) -> LedgerResult<Transaction> {
        self.store.with_conn(|conn| {
            query_transaction(conn, transaction_id)?
                .ok_or_else(|| LedgerError::not_found("transaction", transaction_id))
        })
    }

    /// All ledger rows for a user, newest first.
    pub fn transactions(&self, user_id: i64) -> LedgerResult<Vec<Transaction>> {
        self.store.with_conn(|conn| {
            current_balance(conn, user_id)?;
            query_transactions(conn, user_id)
        })
    }

    /// Recompute the user's position from the ledger rows. Balance and rows
    /// are read under the same lock.
    pub fn audit(&self, user_id: i64) -> LedgerResult<Audit> {
        self.store.with_conn(|conn| {
            let mut audit = Audit {
                balance: current_balance(conn, user_id)?,
                completed_credits: Decimal::ZERO,
                completed_debits: Decimal::ZERO,
                pending_debits: Decimal::ZERO,
            };
            for tx in query_transactions(conn, user_id)? {
                let total = match (tx.kind, tx.status) {
                    (TransactionKind::Credit, TransactionStatus::Completed) => {
                        &mut audit.completed_credits
                    }
                    (TransactionKind::Debit, TransactionStatus::Completed) => {
                        &mut audit.completed_debits
                    }
                    (TransactionKind::Debit, TransactionStatus::Pending) => {
                        &mut audit.pending_debits
                    }
                    _ => continue,
                };
                *total = add_amount(*total, tx.amount)?;
            }
            Ok(audit)
        })
    }
}

fn require_positive(amount: Decimal) -> LedgerResult<()> {
    if amount <= Decimal::ZERO {
        return Err(LedgerError::validation(format!(
            "amount must be positive, got {amount}"
        )));
    }
    Ok(())
}

/// `Decimal`'s `+` panics on overflow, which would poison the store lock.
fn add_amount(total: Decimal, amount: Decimal) -> LedgerResult<Decimal> {
    total
        .checked_add(amount)
        .ok_or_else(|| LedgerError::validation("balance overflow"))
}

fn current_balance(conn: &Connection, user_id: i64) -> LedgerResult<Decimal> {
    query_by_id(conn, user_id)?
        .map(|user| user.balance)
        .ok_or_else(|| LedgerError::not_found("user", user_id))
}

fn write_balance(conn: &Connection, user_id: i64, balance: Decimal) -> LedgerResult<()> {
    conn.execute(
        "UPDATE users SET balance = ?1 WHERE id = ?2",
        params![balance.normalize().to_string(), user_id],
    )?;
    Ok(())
}

fn set_status(conn: &Connection, transaction_id: i64, status: TransactionStatus) -> LedgerResult<()> {
    conn.execute(
        "UPDATE transactions SET status = ?1 WHERE id = ?2",
        params![status, transaction_id],
    )?;
    Ok(())
}

fn pending_transaction(conn: &Connection, transaction_id: i64) -> LedgerResult<Transaction> {
    let tx = query_transaction(conn, transaction_id)?
        .ok_or_else(|| LedgerError::not_found("transaction", transaction_id))?;
    if tx.status != TransactionStatus::Pending {
        return Err(LedgerError::validation(format!(
            "transaction {transaction_id} is already {}",
            tx.status
        )));
    }
    Ok(tx)
}

fn query_transactions(conn: &Connection, user_id: i64) -> LedgerResult<Vec<Transaction>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM transactions WHERE user_id = ?1 ORDER BY id DESC",
        Transaction::COLUMNS
    ))?;
    let rows = stmt
        .query_map([user_id], Transaction::from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    debug!(user_id, count = rows.len(), "loaded transactions");
    Ok(rows)
}

fn query_transaction(conn: &Connection, id: i64) -> LedgerResult<Option<Transaction>> {
    let tx = conn
        .query_row(
            &format!("SELECT {} FROM transactions WHERE id = ?1", Transaction::COLUMNS),
            [id],
            Transaction::from_row,
        )
        .optional()?;
    Ok(tx)
}

/// `PREFIX-<millis>-<random>`; the random tail keeps references unique
/// when two rows land in the same millisecond.
fn new_reference(prefix: &str) -> String {
    let suffix: u32 = rand::rng().random();
    format!("{prefix}-{}-{suffix:08X}", Utc::now().timestamp_millis())
}

fn insert_transaction(
    conn: &Connection,
    user_id: i64,
    amount: Decimal,
    kind: TransactionKind,
    status: TransactionStatus,
    prefix: &str,
    description: &str,
) -> LedgerResult<Transaction> {
    conn.execute(
        "INSERT INTO transactions (user_id, amount, kind, status, created_at, reference, description)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            user_id,
            amount.normalize().to_string(),
            kind,
            status,
            Utc::now(),
            new_reference(prefix),
            description,
        ],
    )?;
    let id = conn.last_insert_rowid();
    query_transaction(conn, id)?.ok_or_else(|| LedgerError::not_found("transaction", id))
}

/// Credit inside an already-open atomic unit.
pub(crate) fn apply_credit(
    conn: &Connection,
    user_id: i64,
    amount: Decimal,
    reason: &str,
) -> LedgerResult<(Transaction, Decimal)> {
    require_positive(amount)?;
    let balance = add_amount(current_balance(conn, user_id)?, amount)?;
    write_balance(conn, user_id, balance)?;
    let tx = insert_transaction(
        conn,
        user_id,
        amount,
        TransactionKind::Credit,
        TransactionStatus::Completed,
        CREDIT_PREFIX,
        reason,
    )?;
    info!(user_id, %amount, %balance, reference = %tx.reference, "balance credited");
    Ok((tx, balance))
}

/// Debit inside an already-open atomic unit.
pub(crate) fn apply_debit(
    conn: &Connection,
    user_id: i64,
    amount: Decimal,
    reason: &str,
    prefix: &str,
    status: TransactionStatus,
) -> LedgerResult<(Transaction, Decimal)> {
    require_positive(amount)?;
    let available = current_balance(conn, user_id)?;
    if amount > available {
        return Err(LedgerError::InsufficientBalance {
            requested: amount,
            available,
        });
    }
    let balance = available - amount;
    write_balance(conn, user_id, balance)?;
    let tx = insert_transaction(
        conn,
        user_id,
        amount,
        TransactionKind::Debit,
        status,
        prefix,
        reason,
    )?;
    info!(user_id, %amount, %balance, %status, reference = %tx.reference, "balance debited");
    Ok((tx, balance))
}
