use anyhow::Result;
use async_trait::async_trait;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::{Payout, Receipt, Settlement};

/// A scripted settlement for tests. Returns pre-defined outcomes in order
/// and records every payout it was asked to make.
pub struct ScriptedSettlement {
    outcomes: Vec<Result<(), String>>,
    index: AtomicUsize,
    seen: Mutex<Vec<Payout>>,
}

impl ScriptedSettlement {
    pub fn new(outcomes: Vec<Result<(), String>>) -> Self {
        Self {
            outcomes,
            index: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        }
    }

    /// Fails every call with `reason`.
    pub fn failing(reason: &str) -> Self {
        Self::new(vec![Err(reason.to_string())])
    }

    /// Payouts received so far.
    pub fn payouts(&self) -> Vec<Payout> {
        self.seen.lock().map(|seen| seen.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Settlement for ScriptedSettlement {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn settle(&self, payout: &Payout) -> Result<Receipt> {
        if let Ok(mut seen) = self.seen.lock() {
            seen.push(payout.clone());
        }
        let i = self.index.fetch_add(1, Ordering::SeqCst);
        // The last scripted outcome repeats once the script runs out.
        let outcome = self
            .outcomes
            .get(i)
            .or_else(|| self.outcomes.last())
            .ok_or_else(|| anyhow::anyhow!("ScriptedSettlement: no outcomes scripted"))?;
        match outcome {
            Ok(()) => Ok(Receipt {
                provider: self.name().to_string(),
                provider_reference: format!("SCRIPT-{}", i + 1),
            }),
            Err(reason) => Err(anyhow::anyhow!("{reason}")),
        }
    }
}
