//! Project-wide constants.

use std::path::PathBuf;

use rust_decimal::Decimal;

pub const AUTHOR: &str = env!("CARGO_PKG_AUTHORS");
pub const HOMEPAGE: &str = env!("CARGO_PKG_HOMEPAGE");
pub const REPO: &str = env!("CARGO_PKG_REPOSITORY");

/// Default minimum withdrawal (10.00).
pub const DEFAULT_MIN_WITHDRAWAL: Decimal = Decimal::from_parts(1000, 0, 0, false, 2);

pub const DEFAULT_CURRENCY: &str = "USD";

/// Default cap on simultaneously pending submissions per user.
pub const DEFAULT_MAX_PENDING_PER_USER: usize = 10;

/// Transaction reference prefixes.
pub const WITHDRAWAL_PREFIX: &str = "WDR";
pub const CREDIT_PREFIX: &str = "CRD";
pub const DEBIT_PREFIX: &str = "DBT";

/// Length of generated referral codes.
pub const REFERRAL_CODE_LEN: usize = 8;

/// Default database path: `~/.taskearn/taskearn.db`.
/// Falls back to the working directory when no home directory is known.
pub fn default_db_path() -> PathBuf {
    dirs::home_dir()
        .map(|home| home.join(".taskearn"))
        .unwrap_or_default()
        .join("taskearn.db")
}
