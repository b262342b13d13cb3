//! Startup banner and session summary display.

use crate::consts::{AUTHOR, HOMEPAGE, REPO};

/// Session configuration for display in the startup banner.
pub struct BannerInfo<'a> {
    pub database: &'a str,
    pub currency: &'a str,
    pub min_withdrawal: &'a str,
    pub settlement: &'a str,
    pub caller: &'a str,
    pub role: &'a str,
}

/// Print the startup banner with session info.
pub fn print_banner(info: &BannerInfo) {
    println!(
        r#"
   ╔═══════════════════════════════════════╗
   ║           T A S K E A R N             ║
   ║      small tasks, real rewards        ║
   ╚═══════════════════════════════════════╝

   version   {}
   by        {}
   home      {}
   repo      {}
   database  {}
   currency  {} (min withdrawal {})
   payouts   {}
   caller    {} ({})

   type /start to register, /help for commands
"#,
        env!("CARGO_PKG_VERSION"),
        AUTHOR,
        HOMEPAGE,
        REPO,
        info.database,
        info.currency,
        info.min_withdrawal,
        info.settlement,
        info.caller,
        info.role,
    );
}

/// What happened during one REPL session.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct SessionSummary {
    pub commands: usize,
    pub notifications: usize,
    /// Formatted closing balance, when the caller is registered.
    pub balance: Option<String>,
}

impl SessionSummary {
    fn line(&self) -> Option<String> {
        if self.commands == 0 {
            return None;
        }
        let mut line = format!(
            "session: {} messages, {} notifications",
            self.commands, self.notifications
        );
        if let Some(balance) = &self.balance {
            line.push_str(&format!(", balance {balance}"));
        }
        Some(line)
    }
}

/// Print the session summary and farewell.
pub fn print_session_summary(summary: &SessionSummary) {
    if let Some(line) = summary.line() {
        println!("{line}");
    }
    println!("goodbye.");
}
