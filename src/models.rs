//! Persistent records: users, tasks, assignments, and ledger transactions.
//!
//! Money is [`Decimal`] and is stored as canonical TEXT so SQLite never
//! rounds it through a float.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rusqlite::Row;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, Type, ValueRef};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Read a TEXT column holding a decimal amount.
pub(crate) fn decimal_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<Decimal> {
    let raw: String = row.get(idx)?;
    Decimal::from_str(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// Implements string round-tripping plus rusqlite column conversions for a
/// status-like enum.
macro_rules! text_enum {
    ($ty:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $ty {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text,)+
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.pad(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok(Self::$variant),)+
                    other => Err(format!("unknown {}: {other}", stringify!($ty))),
                }
            }
        }

        impl ToSql for $ty {
            fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
                Ok(ToSqlOutput::from(self.as_str()))
            }
        }

        impl FromSql for $ty {
            fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
                value
                    .as_str()?
                    .parse()
                    .map_err(|e: String| FromSqlError::Other(e.into()))
            }
        }
    };
}

/// Review state of a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssignmentStatus {
    Pending,
    Completed,
    Rejected,
}

text_enum!(AssignmentStatus {
    Pending => "pending",
    Completed => "completed",
    Rejected => "rejected",
});

/// Outcome an admin can give a pending submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewDecision {
    Approve,
    Reject,
}

impl ReviewDecision {
    pub fn status(self) -> AssignmentStatus {
        match self {
            Self::Approve => AssignmentStatus::Completed,
            Self::Reject => AssignmentStatus::Rejected,
        }
    }
}

/// Direction of a balance change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Credit,
    Debit,
}

text_enum!(TransactionKind {
    Credit => "credit",
    Debit => "debit",
});

/// Settlement state of a ledger row. Only `Pending` may move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Pending,
    Completed,
    Failed,
}

text_enum!(TransactionStatus {
    Pending => "pending",
    Completed => "completed",
    Failed => "failed",
});

/// Proof of completion attached to a submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Proof {
    Text { content: String },
    Media {
        file_id: String,
        caption: Option<String>,
    },
}

impl Proof {
    pub fn text(content: impl Into<String>) -> Self {
        Self::Text {
            content: content.into(),
        }
    }

    pub fn media(file_id: impl Into<String>, caption: Option<String>) -> Self {
        Self::Media {
            file_id: file_id.into(),
            caption,
        }
    }

    /// A proof with nothing in it cannot be reviewed.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Text { content } => content.trim().is_empty(),
            Self::Media { file_id, .. } => file_id.trim().is_empty(),
        }
    }
}

impl fmt::Display for Proof {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text { content } => f.write_str(content),
            Self::Media {
                file_id,
                caption: Some(caption),
            } => write!(f, "[media {file_id}] {caption}"),
            Self::Media { file_id, .. } => write!(f, "[media {file_id}]"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct User {
    pub id: i64,
    pub external_id: i64,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub balance: Decimal,
    pub is_active: bool,
    pub registered_at: DateTime<Utc>,
    pub referral_code: String,
    pub referred_by: Option<i64>,
}

impl User {
    pub(crate) const COLUMNS: &'static str = "id, external_id, username, first_name, last_name, \
         balance, is_active, registered_at, referral_code, referred_by";

    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            external_id: row.get(1)?,
            username: row.get(2)?,
            first_name: row.get(3)?,
            last_name: row.get(4)?,
            balance: decimal_at(row, 5)?,
            is_active: row.get(6)?,
            registered_at: row.get(7)?,
            referral_code: row.get(8)?,
            referred_by: row.get(9)?,
        })
    }

    /// Best human-facing name: first name, then username, then the external id.
    pub fn display_name(&self) -> String {
        self.first_name
            .clone()
            .or_else(|| self.username.clone())
            .unwrap_or_else(|| self.external_id.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Task {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub reward: Decimal,
    pub task_type: String,
    pub requirements: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl Task {
    pub(crate) const COLUMNS: &'static str =
        "id, title, description, reward, task_type, requirements, is_active, created_at";

    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            title: row.get(1)?,
            description: row.get(2)?,
            reward: decimal_at(row, 3)?,
            task_type: row.get(4)?,
            requirements: row.get(5)?,
            is_active: row.get(6)?,
            created_at: row.get(7)?,
        })
    }
}

/// One user's attempt at one task.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Assignment {
    pub id: i64,
    pub user_id: i64,
    pub task_id: i64,
    pub status: AssignmentStatus,
    pub submitted_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub review_note: Option<String>,
    pub proof: Proof,
}

impl Assignment {
    pub(crate) const COLUMNS: &'static str = "id, user_id, task_id, status, submitted_at, \
         completed_at, reviewed_at, review_note, proof";

    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let proof_json: String = row.get(8)?;
        let proof = serde_json::from_str(&proof_json)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(8, Type::Text, Box::new(e)))?;
        Ok(Self {
            id: row.get(0)?,
            user_id: row.get(1)?,
            task_id: row.get(2)?,
            status: row.get(3)?,
            submitted_at: row.get(4)?,
            completed_at: row.get(5)?,
            reviewed_at: row.get(6)?,
            review_note: row.get(7)?,
            proof,
        })
    }
}

/// Immutable record of one balance change. `amount` is always the positive
/// magnitude; `kind` carries the direction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Transaction {
    pub id: i64,
    pub user_id: i64,
    pub amount: Decimal,
    pub kind: TransactionKind,
    pub status: TransactionStatus,
    pub created_at: DateTime<Utc>,
    pub reference: String,
    pub description: String,
}

impl Transaction {
    pub(crate) const COLUMNS: &'static str =
        "id, user_id, amount, kind, status, created_at, reference, description";

    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            user_id: row.get(1)?,
            amount: decimal_at(row, 2)?,
            kind: row.get(3)?,
            status: row.get(4)?,
            created_at: row.get(5)?,
            reference: row.get(6)?,
            description: row.get(7)?,
        })
    }

    /// Amount with the sign of its effect on the balance.
    pub fn signed_amount(&self) -> Decimal {
        match self.kind {
            TransactionKind::Credit => self.amount,
            TransactionKind::Debit => -self.amount,
        }
    }
}
