//! The payout step of a withdrawal.
//!
//! Validation and bookkeeping live in [`crate::withdrawal`]; this module
//! only answers "did the money leave?". Swapping the simulated
//! implementation for a real payment gateway means adding another
//! [`Settlement`] impl, nothing else.

pub mod mock;
pub mod simulated;

use std::fmt;
use std::str::FromStr;

use anyhow::Result;
use async_trait::async_trait;
use rust_decimal::Decimal;

/// How the user wants to be paid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayoutMethod {
    PayPal,
    Bank,
}

impl PayoutMethod {
    pub const ALL: [PayoutMethod; 2] = [PayoutMethod::PayPal, PayoutMethod::Bank];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PayPal => "paypal",
            Self::Bank => "bank",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::PayPal => "PayPal",
            Self::Bank => "Bank Transfer",
        }
    }
}

impl fmt::Display for PayoutMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PayoutMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "paypal" => Ok(Self::PayPal),
            "bank" | "bank_transfer" => Ok(Self::Bank),
            other => Err(format!("unknown payout method: {other}")),
        }
    }
}

/// A reserved debit waiting to be paid out.
#[derive(Debug, Clone, PartialEq)]
pub struct Payout {
    pub user_id: i64,
    pub transaction_id: i64,
    pub reference: String,
    pub amount: Decimal,
    pub currency: String,
    pub method: PayoutMethod,
}

/// Proof that a payout went through.
#[derive(Debug, Clone, PartialEq)]
pub struct Receipt {
    pub provider: String,
    pub provider_reference: String,
}

/// Sends money out of the system. Errors mean the payout did not happen.
#[async_trait]
pub trait Settlement: Send + Sync {
    fn name(&self) -> &str;
    async fn settle(&self, payout: &Payout) -> Result<Receipt>;
}
