//! Runtime settings shared by the marketplace components.
//!
//! Built once in `main` from CLI flags / environment and handed to
//! [`Market::new`](crate::market::Market::new). Nothing reads the
//! environment after that, so tests can pass fixtures directly.

use anyhow::{Result, bail};
use rust_decimal::Decimal;

use crate::consts::{DEFAULT_CURRENCY, DEFAULT_MAX_PENDING_PER_USER, DEFAULT_MIN_WITHDRAWAL};

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// Smallest amount a single withdrawal may request.
    pub min_withdrawal: Decimal,
    /// Currency code shown next to amounts. No conversion happens.
    pub currency: String,
    /// External identities allowed to run admin commands.
    pub admin_ids: Vec<i64>,
    /// Pending submissions a user may have at once. 0 disables the cap.
    pub max_pending_per_user: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            min_withdrawal: DEFAULT_MIN_WITHDRAWAL,
            currency: DEFAULT_CURRENCY.to_string(),
            admin_ids: Vec::new(),
            max_pending_per_user: DEFAULT_MAX_PENDING_PER_USER,
        }
    }
}

impl Settings {
    pub fn validate(&self) -> Result<()> {
        if self.min_withdrawal <= Decimal::ZERO {
            bail!("minimum withdrawal must be positive, got {}", self.min_withdrawal);
        }
        if self.currency.trim().is_empty() {
            bail!("currency code must not be empty");
        }
        Ok(())
    }

    pub fn is_admin(&self, external_id: i64) -> bool {
        self.admin_ids.contains(&external_id)
    }

    /// Render an amount with two decimals and the configured currency.
    pub fn format_amount(&self, amount: Decimal) -> String {
        format!("{:.2} {}", amount, self.currency)
    }
}

/// Parse a comma-separated admin allow-list, skipping empty entries.
pub fn parse_admin_ids(raw: &str) -> Result<Vec<i64>> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<i64>()
                .map_err(|e| anyhow::anyhow!("invalid admin id {s:?}: {e}"))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let settings = Settings::default();
        settings.validate().unwrap();
        assert_eq!(settings.min_withdrawal, Decimal::new(1000, 2));
        assert_eq!(settings.currency, "USD");
    }

    #[test]
    fn zero_minimum_is_rejected() {
        let settings = Settings {
            min_withdrawal: Decimal::ZERO,
            ..Settings::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn admin_ids_parse_and_skip_blanks() {
        assert_eq!(parse_admin_ids("1, 2,,3").unwrap(), vec![1, 2, 3]);
        assert!(parse_admin_ids("").unwrap().is_empty());
    }

    #[test]
    fn admin_ids_reject_garbage() {
        assert!(parse_admin_ids("1,abc").is_err());
    }

    #[test]
    fn is_admin_checks_allow_list() {
        let settings = Settings {
            admin_ids: vec![42],
            ..Settings::default()
        };
        assert!(settings.is_admin(42));
        assert!(!settings.is_admin(7));
    }

    #[test]
    fn format_amount_uses_two_decimals() {
        let settings = Settings::default();
        assert_eq!(settings.format_amount(Decimal::new(5, 0)), "5.00 USD");
        assert_eq!(settings.format_amount(Decimal::new(250, 2)), "2.50 USD");
    }
}
