use anyhow::Result;
use async_trait::async_trait;
use tracing::info;

use super::{Payout, Receipt, Settlement};

/// Pretends every payout succeeds. For development and tests until a real
/// gateway is wired in.
pub struct AlwaysSucceeds;

#[async_trait]
impl Settlement for AlwaysSucceeds {
    fn name(&self) -> &str {
        "simulated"
    }

    async fn settle(&self, payout: &Payout) -> Result<Receipt> {
        info!(
            reference = %payout.reference,
            amount = %payout.amount,
            method = %payout.method,
            "simulated payout"
        );
        Ok(Receipt {
            provider: self.name().to_string(),
            provider_reference: format!("SIM-{}", payout.reference),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settlement::PayoutMethod;
    use rust_decimal::Decimal;

    #[tokio::test]
    async fn always_returns_receipt() {
        let payout = Payout {
            user_id: 1,
            transaction_id: 1,
            reference: "WDR-1".into(),
            amount: Decimal::new(15, 0),
            currency: "USD".into(),
            method: PayoutMethod::Bank,
        };
        let receipt = AlwaysSucceeds.settle(&payout).await.unwrap();
        assert_eq!(receipt.provider, "simulated");
        assert_eq!(receipt.provider_reference, "SIM-WDR-1");
    }
}
