use async_trait::async_trait;

use super::{Command, CommandContext, CommandResult};

/// Placeholder entry so `/help` shows up in listings; the registry renders
/// the actual text because it needs to see every command.
pub struct HelpCommand;

#[async_trait]
impl Command for HelpCommand {
    fn name(&self) -> &str {
        "/help"
    }

    fn aliases(&self) -> &[&str] {
        &["/h", "/?"]
    }

    fn description(&self) -> &str {
        "show this help"
    }

    async fn execute(&self, _args: &str, _ctx: &CommandContext<'_>) -> CommandResult {
        CommandResult::reply("type /help for available commands")
    }
}

#[cfg(test)]
mod tests {
    use crate::commands::CommandRegistry;
    use crate::commands::tests::{caller, ctx, test_market, USER};

    #[tokio::test]
    async fn dispatch_lists_commands() {
        let market = test_market();
        let caller = caller(USER);
        let result = CommandRegistry::new().dispatch("/?", &ctx(&market, &caller)).await;
        let text = result.text().unwrap();
        assert!(text.contains("/tasks"));
        assert!(text.contains("/balance"));
    }
}
