//! Withdrawal processing.
//!
//! ```text
//! requested ─ amount < minimum ───────────────▶ BelowMinimum
//!     │
//!     ├─ balance < amount ────────────────────▶ InsufficientBalance
//!     ▼
//! pending debit (funds reserved)
//!     │
//!     ├─ settlement ok ───▶ debit completed ──▶ accepted
//!     └─ settlement err ──▶ debit failed, funds released ──▶ SettlementFailed
//! ```
//!
//! The store lock is never held while the settlement call is in flight:
//! reserving and finalising are two separate atomic units.

use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::{info, warn};

use crate::config::Settings;
use crate::consts::WITHDRAWAL_PREFIX;
use crate::error::WithdrawalError;
use crate::events::{Event, EventBus};
use crate::ledger::Ledger;
use crate::models::Transaction;
use crate::settlement::{Payout, PayoutMethod, Settlement};

pub struct WithdrawalProcessor {
    ledger: Arc<Ledger>,
    settlement: Arc<dyn Settlement>,
    settings: Settings,
    events: EventBus,
}

impl WithdrawalProcessor {
    pub fn new(
        ledger: Arc<Ledger>,
        settlement: Arc<dyn Settlement>,
        settings: Settings,
        events: EventBus,
    ) -> Self {
        Self {
            ledger,
            settlement,
            settings,
            events,
        }
    }

    /// Pay `amount` out of the user's balance. Returns the completed debit.
    pub async fn withdraw(
        &self,
        user_id: i64,
        amount: Decimal,
        method: PayoutMethod,
    ) -> Result<Transaction, WithdrawalError> {
        if amount < self.settings.min_withdrawal {
            warn!(user_id, %amount, minimum = %self.settings.min_withdrawal, "withdrawal below minimum");
            return Err(WithdrawalError::BelowMinimum {
                minimum: self.settings.min_withdrawal,
                requested: amount,
            });
        }

        let reason = format!("Withdrawal via {}", method.label());
        let (pending, _) = self
            .ledger
            .reserve(user_id, amount, &reason, WITHDRAWAL_PREFIX)
            .map_err(|e| {
                warn!(user_id, %amount, error = %e, "withdrawal rejected");
                WithdrawalError::from_ledger(user_id, e)
            })?;

        let payout = Payout {
            user_id,
            transaction_id: pending.id,
            reference: pending.reference.clone(),
            amount,
            currency: self.settings.currency.clone(),
            method,
        };

        match self.settlement.settle(&payout).await {
            Ok(receipt) => {
                let settled = self
                    .ledger
                    .settle(pending.id)
                    .map_err(|e| WithdrawalError::from_ledger(user_id, e))?;
                info!(
                    user_id,
                    %amount,
                    reference = %settled.reference,
                    provider = %receipt.provider,
                    provider_reference = %receipt.provider_reference,
                    "withdrawal settled"
                );
                self.events.emit(Event::WithdrawalSettled {
                    user_id,
                    transaction_id: settled.id,
                    amount,
                });
                Ok(settled)
            }
            Err(e) => {
                let reason = e.to_string();
                warn!(user_id, %amount, provider = self.settlement.name(), error = %reason, "settlement failed");
                self.ledger
                    .fail(pending.id)
                    .map_err(|e| WithdrawalError::from_ledger(user_id, e))?;
                self.events.emit(Event::WithdrawalFailed {
                    user_id,
                    transaction_id: pending.id,
                    reason: reason.clone(),
                });
                Err(WithdrawalError::SettlementFailed(reason))
            }
        }
    }
}
