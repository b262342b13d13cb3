use async_trait::async_trait;

use super::{Command, CommandContext, CommandResult, StateChange};

pub struct CancelCommand;

#[async_trait]
impl Command for CancelCommand {
    fn name(&self) -> &str {
        "/cancel"
    }

    fn description(&self) -> &str {
        "abandon the selected task"
    }

    async fn execute(&self, _args: &str, _ctx: &CommandContext<'_>) -> CommandResult {
        CommandResult::StateChanged {
            change: StateChange::Cleared,
            reply: "Operation cancelled.".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::tests::{caller, ctx, test_market, USER};

    #[tokio::test]
    async fn clears_selection() {
        let market = test_market();
        let caller = caller(USER);
        let result = CancelCommand.execute("", &ctx(&market, &caller)).await;
        assert!(matches!(
            result,
            CommandResult::StateChanged {
                change: StateChange::Cleared,
                ..
            }
        ));
    }
}
