//! Decoupled event bus for marketplace notifications.
//!
//! Components emit events via [`EventBus::emit`] and the front-end
//! subscribes via [`EventBus::subscribe`] to tell users what happened
//! (e.g. "your submission was approved"). Built on
//! [`tokio::sync::broadcast`] so multiple listeners can react independently.
//! Emission is fire-and-forget: nobody listening is not an error.

use rust_decimal::Decimal;
use tokio::sync::broadcast;

use crate::models::AssignmentStatus;

/// Events that flow through the system.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    TaskCreated { task_id: i64, title: String },
    TaskDeactivated { task_id: i64 },
    ProofSubmitted {
        assignment_id: i64,
        user_id: i64,
        task_id: i64,
    },
    AssignmentReviewed {
        assignment_id: i64,
        user_id: i64,
        status: AssignmentStatus,
    },
    BalanceCredited {
        user_id: i64,
        amount: Decimal,
        balance: Decimal,
    },
    WithdrawalSettled {
        user_id: i64,
        transaction_id: i64,
        amount: Decimal,
    },
    WithdrawalFailed {
        user_id: i64,
        transaction_id: i64,
        reason: String,
    },
}

impl Event {
    /// The user this event concerns, if it is addressed to one.
    pub fn recipient(&self) -> Option<i64> {
        match self {
            Self::TaskCreated { .. } | Self::TaskDeactivated { .. } => None,
            Self::ProofSubmitted { user_id, .. }
            | Self::AssignmentReviewed { user_id, .. }
            | Self::BalanceCredited { user_id, .. }
            | Self::WithdrawalSettled { user_id, .. }
            | Self::WithdrawalFailed { user_id, .. } => Some(*user_id),
        }
    }
}

/// A broadcast channel that any component can emit to or subscribe from.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<Event>,
}

impl EventBus {
    /// Create a new event bus with the given channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Emit an event to all current subscribers.
    /// Returns the number of receivers that will see it.
    pub fn emit(&self, event: Event) -> usize {
        self.tx.send(event).unwrap_or(0)
    }

    /// Subscribe to events. Returns a receiver that yields all
    /// future events (does not replay past ones).
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(64)
    }
}
