//! Chat commands prefixed with `/`.
//!
//! Commands implement the [`Command`] trait and are registered in a
//! [`CommandRegistry`]. The registry handles dispatch, alias resolution,
//! admin gating, and dynamic help generation. [`Conversation`] holds the
//! per-caller state (the selected task) and routes plain text to proof
//! submission while a task is selected.

mod admin;
mod balance;
mod cancel;
mod help;
mod history;
mod proof;
mod quit;
mod select;
mod start;
mod submissions;
mod tasks;
mod whoami;
mod withdraw;

use async_trait::async_trait;
use std::sync::Arc;

use crate::error::LedgerError;
use crate::market::Market;
use crate::models::{Proof, User};
use crate::users::Profile;

/// Who is talking to the bot, as reported by the messaging platform.
#[derive(Debug, Clone)]
pub struct Caller {
    pub external_id: i64,
    pub profile: Profile,
}

/// Everything a command may look at while it runs.
pub struct CommandContext<'a> {
    pub market: &'a Market,
    pub caller: &'a Caller,
    /// Task picked with `/select`, waiting for proof.
    pub selected_task: Option<i64>,
}

impl CommandContext<'_> {
    /// The caller's account, or the reply telling them to register first.
    pub fn user(&self) -> Result<User, String> {
        match self.market.users.find_by_external_id(self.caller.external_id) {
            Ok(Some(user)) => Ok(user),
            Ok(None) => Err("Please /start the bot first.".to_string()),
            Err(e) => Err(describe_error(&e)),
        }
    }

    pub fn is_admin(&self) -> bool {
        self.market.settings.is_admin(self.caller.external_id)
    }

    pub fn money(&self, amount: rust_decimal::Decimal) -> String {
        self.market.settings.format_amount(amount)
    }
}

/// A state change the conversation needs to apply after a command runs.
#[derive(Debug, Clone, PartialEq)]
pub enum StateChange {
    /// A task was selected; plain text now counts as proof for it.
    Selected(i64),
    /// Selection finished or abandoned.
    Cleared,
}

/// What the conversation should do after a command runs.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandResult {
    /// Plain text, not a command.
    NotACommand,
    /// Command handled; send this reply.
    Reply(String),
    /// Command produced a state change plus a reply.
    StateChanged { change: StateChange, reply: String },
    /// End the session.
    Quit,
}

impl CommandResult {
    pub fn reply(text: impl Into<String>) -> Self {
        Self::Reply(text.into())
    }

    /// The text to send back, if any.
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Reply(text) | Self::StateChanged { reply: text, .. } => Some(text),
            Self::NotACommand | Self::Quit => None,
        }
    }
}

/// A chat command. Implement this trait to add new commands.
#[async_trait]
pub trait Command: Send + Sync {
    /// Primary name, e.g. `"/balance"`.
    fn name(&self) -> &str;

    /// Alternative names, e.g. `&["/h", "/?"]`.
    fn aliases(&self) -> &[&str] {
        &[]
    }

    /// Argument synopsis shown in help, e.g. `"<amount> <method>"`.
    fn usage(&self) -> &str {
        ""
    }

    /// One-line description for `/help`.
    fn description(&self) -> &str;

    /// Only callers on the admin allow-list may run it.
    fn admin_only(&self) -> bool {
        false
    }

    /// Run the command with everything after the command word.
    async fn execute(&self, args: &str, ctx: &CommandContext<'_>) -> CommandResult;
}

/// Holds registered commands. Supports runtime registration.
pub struct CommandRegistry {
    commands: Vec<Arc<dyn Command>>,
}

impl CommandRegistry {
    /// Create a registry with all built-in commands.
    pub fn new() -> Self {
        let commands: Vec<Arc<dyn Command>> = vec![
            Arc::new(help::HelpCommand),
            Arc::new(start::StartCommand),
            Arc::new(whoami::WhoamiCommand),
            Arc::new(tasks::TasksCommand),
            Arc::new(select::SelectCommand),
            Arc::new(proof::ProofCommand),
            Arc::new(proof::PhotoCommand),
            Arc::new(cancel::CancelCommand),
            Arc::new(submissions::SubmissionsCommand),
            Arc::new(balance::BalanceCommand),
            Arc::new(history::HistoryCommand),
            Arc::new(withdraw::WithdrawCommand),
            Arc::new(admin::AddTaskCommand),
            Arc::new(admin::DeactivateCommand),
            Arc::new(admin::ReviewQueueCommand),
            Arc::new(admin::ApproveCommand),
            Arc::new(admin::RejectCommand),
            Arc::new(quit::QuitCommand),
        ];
        Self { commands }
    }

    /// Register an additional command.
    pub fn register(&mut self, command: Arc<dyn Command>) {
        self.commands.push(command);
    }

    /// Dispatch input to a matching command, or return `NotACommand`.
    pub async fn dispatch(&self, input: &str, ctx: &CommandContext<'_>) -> CommandResult {
        let input = input.trim();
        let (word, args) = input
            .split_once(char::is_whitespace)
            .map(|(w, a)| (w, a.trim()))
            .unwrap_or((input, ""));

        for command in &self.commands {
            if word == command.name() || command.aliases().contains(&word) {
                if command.admin_only() && !ctx.is_admin() {
                    return CommandResult::reply("This command is for admins only.");
                }
                // /help needs the registry to list all commands
                if command.name() == "/help" {
                    return CommandResult::Reply(self.help_text(ctx.is_admin()));
                }
                return command.execute(args, ctx).await;
            }
        }

        if word.starts_with('/') {
            return CommandResult::Reply(format!(
                "unknown command: {word}\ntype /help for available commands"
            ));
        }

        CommandResult::NotACommand
    }

    /// Generate help text from registered commands visible to the caller.
    pub fn help_text(&self, admin: bool) -> String {
        let entries: Vec<(String, &str)> = self
            .commands
            .iter()
            .filter(|c| admin || !c.admin_only())
            .map(|c| (format_label(c.name(), c.aliases(), c.usage()), c.description()))
            .collect();

        let max_width = entries
            .iter()
            .map(|(label, _)| label.len())
            .max()
            .unwrap_or(10);

        let mut out = String::new();
        for (label, desc) in &entries {
            out.push_str(&format!("  {label:<max_width$}  {desc}\n"));
        }
        out
    }

    /// All registered command names (for testing).
    pub fn names(&self) -> Vec<&str> {
        self.commands.iter().map(|c| c.name()).collect()
    }

    /// All registered names and aliases (for duplicate detection).
    pub fn all_triggers(&self) -> Vec<&str> {
        let mut triggers = Vec::new();
        for cmd in &self.commands {
            triggers.push(cmd.name());
            triggers.extend_from_slice(cmd.aliases());
        }
        triggers
    }
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// One caller's session with the bot.
pub struct Conversation {
    caller: Caller,
    selected_task: Option<i64>,
    registry: CommandRegistry,
}

impl Conversation {
    pub fn new(caller: Caller) -> Self {
        Self {
            caller,
            selected_task: None,
            registry: CommandRegistry::new(),
        }
    }

    pub fn caller(&self) -> &Caller {
        &self.caller
    }

    pub fn selected_task(&self) -> Option<i64> {
        self.selected_task
    }

    /// Handle one inbound message. Plain text while a task is selected is
    /// submitted as proof.
    pub async fn handle(&mut self, market: &Market, input: &str) -> CommandResult {
        let ctx = CommandContext {
            market,
            caller: &self.caller,
            selected_task: self.selected_task,
        };
        let mut result = self.registry.dispatch(input, &ctx).await;
        if matches!(result, CommandResult::NotACommand) && !input.trim().is_empty() {
            result = match self.selected_task {
                Some(task_id) => proof::submit(&ctx, task_id, Proof::text(input.trim())),
                None => CommandResult::reply("Type /help for available commands."),
            };
        }
        if let CommandResult::StateChanged { change, .. } = &result {
            self.selected_task = match change {
                StateChange::Selected(task_id) => Some(*task_id),
                StateChange::Cleared => None,
            };
        }
        result
    }
}

/// Turn a domain error into text for the user.
pub fn describe_error(err: &LedgerError) -> String {
    match err {
        LedgerError::NotFound { entity: "task", .. } => {
            "This task is no longer available.".to_string()
        }
        LedgerError::NotFound { entity: "user", .. } => "Please /start the bot first.".to_string(),
        LedgerError::NotFound { entity, id } => format!("No {entity} with id {id}."),
        LedgerError::Validation(msg) => format!("Invalid input: {msg}"),
        LedgerError::InsufficientBalance { .. } => "Insufficient balance.".to_string(),
        LedgerError::Store(_) => "Database error occurred".to_string(),
    }
}

/// Parse a numeric id argument.
fn parse_id(args: &str, usage: &str) -> Result<i64, String> {
    args.split_whitespace()
        .next()
        .and_then(|s| s.trim_start_matches('#').parse().ok())
        .ok_or_else(|| format!("Usage: {usage}"))
}

fn format_label(name: &str, aliases: &[&str], usage: &str) -> String {
    let mut label = name.to_string();
    if !usage.is_empty() {
        label.push(' ');
        label.push_str(usage);
    }
    if !aliases.is_empty() {
        label.push_str(&format!(" ({})", aliases.join(", ")));
    }
    label
}
