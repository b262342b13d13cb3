use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use rust_decimal::Decimal;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast;
use tracing_subscriber::EnvFilter;

use taskearn::banner::{BannerInfo, SessionSummary, print_banner, print_session_summary};
use taskearn::commands::{Caller, CommandResult, Conversation};
use taskearn::config::{Settings, parse_admin_ids};
use taskearn::consts::{
    DEFAULT_CURRENCY, DEFAULT_MAX_PENDING_PER_USER, DEFAULT_MIN_WITHDRAWAL, default_db_path,
};
use taskearn::events::Event;
use taskearn::market::Market;
use taskearn::settlement::Settlement;
use taskearn::settlement::simulated::AlwaysSucceeds;
use taskearn::store::Store;
use taskearn::users::Profile;

#[derive(Parser)]
#[command(
    name = "taskearn",
    version,
    about = "Small tasks, real rewards. A chat-style task marketplace in your terminal."
)]
struct Cli {
    /// SQLite database path (use :memory: for ephemeral)
    #[arg(short, long, env = "TASKEARN_DB")]
    db: Option<String>,

    /// Smallest amount a single withdrawal may request
    #[arg(long, env = "MIN_WITHDRAWAL", default_value_t = DEFAULT_MIN_WITHDRAWAL)]
    min_withdrawal: Decimal,

    /// Currency code shown next to amounts
    #[arg(long, env = "CURRENCY", default_value = DEFAULT_CURRENCY)]
    currency: String,

    /// Comma-separated external ids allowed to run admin commands
    #[arg(long, env = "ADMIN_IDS", default_value = "")]
    admin_ids: String,

    /// Pending submissions a user may have at once (0 = unlimited)
    #[arg(long, env = "MAX_PENDING_PER_USER", default_value_t = DEFAULT_MAX_PENDING_PER_USER)]
    max_pending: usize,

    /// External id to act as
    #[arg(long = "as", default_value_t = 1)]
    external_id: i64,

    /// Username reported for the caller
    #[arg(long)]
    username: Option<String>,

    /// First name reported for the caller
    #[arg(long)]
    first_name: Option<String>,

    /// Log filter, e.g. "taskearn=debug" (overrides RUST_LOG)
    #[arg(long)]
    log_level: Option<String>,

    /// Handle a single message and exit (non-interactive)
    #[arg(short, long)]
    run: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = match &cli.log_level {
        Some(level) => EnvFilter::try_new(level).context("invalid --log-level")?,
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| "taskearn=info".into()),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    let settings = Settings {
        min_withdrawal: cli.min_withdrawal,
        currency: cli.currency.clone(),
        admin_ids: parse_admin_ids(&cli.admin_ids)?,
        max_pending_per_user: cli.max_pending,
    };
    settings.validate()?;

    let db = match cli.db.clone() {
        Some(db) => db,
        None => default_db_path().to_string_lossy().into_owned(),
    };
    if db != ":memory:" {
        if let Some(parent) = PathBuf::from(&db).parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
    }
    let store = Arc::new(Store::open(&db).with_context(|| format!("failed to open {db}"))?);

    let settlement: Arc<dyn Settlement> = Arc::new(AlwaysSucceeds);
    let settlement_name = settlement.name().to_string();
    let market = Market::new(store, settings.clone(), settlement);

    let caller = Caller {
        external_id: cli.external_id,
        profile: Profile {
            username: cli.username,
            first_name: cli.first_name,
            last_name: None,
        },
    };
    let mut notifications = market.events.subscribe();
    let mut conversation = Conversation::new(caller);
    let mut summary = SessionSummary::default();

    // Single message mode
    if let Some(message) = cli.run {
        let result = conversation.handle(&market, &message).await;
        if let Some(text) = result.text() {
            println!("{text}");
        }
        drain_notifications(&market, &conversation, &mut notifications);
        return Ok(());
    }

    let database_label = if db == ":memory:" { "ephemeral" } else { &db };
    let min_label = settings.format_amount(settings.min_withdrawal);
    let caller_label = cli.external_id.to_string();
    print_banner(&BannerInfo {
        database: database_label,
        currency: &settings.currency,
        min_withdrawal: &min_label,
        settlement: &settlement_name,
        caller: &caller_label,
        role: if settings.is_admin(cli.external_id) {
            "admin"
        } else {
            "user"
        },
    });

    // Async stdin so Ctrl+C is caught at the prompt too
    let stdin = BufReader::new(tokio::io::stdin());
    let mut lines = stdin.lines();

    loop {
        print!("\ntaskearn> ");
        io::stdout().flush()?;

        let line = tokio::select! {
            result = lines.next_line() => {
                match result {
                    Ok(Some(line)) => line,
                    Ok(None) => {
                        // Ctrl+D (EOF)
                        println!();
                        break;
                    }
                    Err(e) => {
                        eprintln!("input error: {}", e);
                        break;
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                println!();
                break;
            }
        };

        let input = line.trim();
        if input.is_empty() {
            continue;
        }

        summary.commands += 1;
        let result = conversation.handle(&market, input).await;
        if let Some(text) = result.text() {
            println!("{text}");
        }
        summary.notifications += drain_notifications(&market, &conversation, &mut notifications);
        if result == CommandResult::Quit {
            break;
        }
    }

    if let Ok(Some(user)) = market.users.find_by_external_id(cli.external_id) {
        summary.balance = Some(settings.format_amount(user.balance));
    }
    print_session_summary(&summary);
    Ok(())
}

/// Print events addressed to the caller. Returns how many were shown.
fn drain_notifications(
    market: &Market,
    conversation: &Conversation,
    rx: &mut broadcast::Receiver<Event>,
) -> usize {
    let user_id = match market
        .users
        .find_by_external_id(conversation.caller().external_id)
    {
        Ok(Some(user)) => user.id,
        _ => return 0,
    };

    let mut shown = 0;
    loop {
        match rx.try_recv() {
            Ok(event) if event.recipient() == Some(user_id) => {
                if let Some(text) = notification(&market.settings, &event) {
                    println!("  * {text}");
                    shown += 1;
                }
            }
            Ok(_) => {}
            Err(broadcast::error::TryRecvError::Lagged(missed)) => {
                eprintln!("  ({missed} notifications dropped)");
            }
            Err(_) => break,
        }
    }
    shown
}

fn notification(settings: &Settings, event: &Event) -> Option<String> {
    match event {
        Event::AssignmentReviewed {
            assignment_id,
            status,
            ..
        } => Some(format!("Your submission #{assignment_id} was {status}.")),
        Event::BalanceCredited { amount, balance, .. } => Some(format!(
            "{} credited. New balance: {}",
            settings.format_amount(*amount),
            settings.format_amount(*balance)
        )),
        Event::WithdrawalFailed { reason, .. } => Some(format!("Payout failed: {reason}")),
        _ => None,
    }
}
