//! User registration and lookup.
//!
//! Users are keyed by the messaging platform's stable identity
//! (`external_id`). Registration is idempotent; first contact creates the
//! row with a zero balance and a fresh referral code.

use std::sync::Arc;

use chrono::Utc;
use rand::RngExt;
use rusqlite::{Connection, OptionalExtension, params};
use rust_decimal::Decimal;
use tracing::info;

use crate::consts::REFERRAL_CODE_LEN;
use crate::error::{LedgerError, LedgerResult};
use crate::models::User;
use crate::store::Store;

const REFERRAL_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

/// Name fields reported by the messaging platform.
#[derive(Debug, Clone, Default)]
pub struct Profile {
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

/// Result of [`UserRegistry::register`].
#[derive(Debug, Clone)]
pub struct Registration {
    pub user: User,
    /// `false` when the identity was already known.
    pub created: bool,
}

pub struct UserRegistry {
    store: Arc<Store>,
}

impl UserRegistry {
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }

    /// Register `external_id`, or return the existing user. A referral code
    /// that matches another user links the new account to them; unknown
    /// codes are ignored.
    pub fn register(
        &self,
        external_id: i64,
        profile: Profile,
        referral_code: Option<&str>,
    ) -> LedgerResult<Registration> {
        self.store.atomic(|tx| {
            if let Some(user) = query_by_external_id(tx, external_id)? {
                return Ok(Registration {
                    user,
                    created: false,
                });
            }

            let referred_by = match referral_code.map(str::trim).filter(|c| !c.is_empty()) {
                Some(code) => tx
                    .query_row(
                        "SELECT id FROM users WHERE referral_code = ?1",
                        [code.to_uppercase()],
                        |row| row.get::<_, i64>(0),
                    )
                    .optional()?,
                None => None,
            };

            let code = unique_referral_code(tx)?;
            tx.execute(
                "INSERT INTO users (external_id, username, first_name, last_name, balance,
                                    is_active, registered_at, referral_code, referred_by)
                 VALUES (?1, ?2, ?3, ?4, ?5, 1, ?6, ?7, ?8)",
                params![
                    external_id,
                    profile.username,
                    profile.first_name,
                    profile.last_name,
                    Decimal::ZERO.to_string(),
                    Utc::now(),
                    code,
                    referred_by,
                ],
            )?;
            let id = tx.last_insert_rowid();
            info!(user_id = id, external_id, ?referred_by, "user registered");

            let user = query_by_id(tx, id)?.ok_or_else(|| LedgerError::not_found("user", id))?;
            Ok(Registration {
                user,
                created: true,
            })
        })
    }

    pub fn get(&self, user_id: i64) -> LedgerResult<User> {
        self.store.with_conn(|conn| {
            query_by_id(conn, user_id)?.ok_or_else(|| LedgerError::not_found("user", user_id))
        })
    }

    pub fn find_by_external_id(&self, external_id: i64) -> LedgerResult<Option<User>> {
        self.store
            .with_conn(|conn| query_by_external_id(conn, external_id))
    }

    /// Users who registered with `user_id`'s referral code, oldest first.
    pub fn referrals(&self, user_id: i64) -> LedgerResult<Vec<User>> {
        self.store.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM users WHERE referred_by = ?1 ORDER BY id ASC",
                User::COLUMNS
            ))?;
            let users = stmt
                .query_map([user_id], User::from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(users)
        })
    }
}

pub(crate) fn query_by_id(conn: &Connection, id: i64) -> LedgerResult<Option<User>> {
    let user = conn
        .query_row(
            &format!("SELECT {} FROM users WHERE id = ?1", User::COLUMNS),
            [id],
            User::from_row,
        )
        .optional()?;
    Ok(user)
}

fn query_by_external_id(conn: &Connection, external_id: i64) -> LedgerResult<Option<User>> {
    let user = conn
        .query_row(
            &format!("SELECT {} FROM users WHERE external_id = ?1", User::COLUMNS),
            [external_id],
            User::from_row,
        )
        .optional()?;
    Ok(user)
}

fn random_referral_code() -> String {
    let mut rng = rand::rng();
    (0..REFERRAL_CODE_LEN)
        .map(|_| REFERRAL_ALPHABET[rng.random_range(0..REFERRAL_ALPHABET.len())] as char)
        .collect()
}

fn unique_referral_code(conn: &Connection) -> LedgerResult<String> {
    loop {
        let code = random_referral_code();
        let taken: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM users WHERE referral_code = ?1)",
            [&code],
            |row| row.get(0),
        )?;
        if !taken {
            return Ok(code);
        }
    }
}
