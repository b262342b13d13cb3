use async_trait::async_trait;

use super::{Command, CommandContext, CommandResult, describe_error};

/// How many ledger rows `/history` shows.
const HISTORY_LIMIT: usize = 20;

pub struct HistoryCommand;

#[async_trait]
impl Command for HistoryCommand {
    fn name(&self) -> &str {
        "/history"
    }

    fn description(&self) -> &str {
        "show your recent transactions"
    }

    async fn execute(&self, _args: &str, ctx: &CommandContext<'_>) -> CommandResult {
        let user = match ctx.user() {
            Ok(user) => user,
            Err(reply) => return CommandResult::Reply(reply),
        };
        let rows = match ctx.market.ledger.transactions(user.id) {
            Ok(rows) => rows,
            Err(e) => return CommandResult::Reply(describe_error(&e)),
        };
        if rows.is_empty() {
            return CommandResult::reply("No transactions yet.");
        }

        let mut out = String::from("Recent transactions:\n");
        for tx in rows.iter().take(HISTORY_LIMIT) {
            let sign = if tx.signed_amount().is_sign_negative() { "-" } else { "+" };
            out.push_str(&format!(
                "  {} {sign}{:<14} {:<9} {}  {}\n",
                tx.created_at.format("%Y-%m-%d"),
                ctx.money(tx.amount),
                tx.status,
                tx.reference,
                tx.description
            ));
        }
        CommandResult::Reply(out)
    }
}
