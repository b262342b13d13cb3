use async_trait::async_trait;

use super::{Command, CommandContext, CommandResult, describe_error};

pub struct TasksCommand;

#[async_trait]
impl Command for TasksCommand {
    fn name(&self) -> &str {
        "/tasks"
    }

    fn description(&self) -> &str {
        "browse available tasks"
    }

    async fn execute(&self, _args: &str, ctx: &CommandContext<'_>) -> CommandResult {
        let tasks = match ctx.market.catalog.list_active_tasks() {
            Ok(tasks) => tasks,
            Err(e) => return CommandResult::Reply(describe_error(&e)),
        };
        if tasks.is_empty() {
            return CommandResult::reply("No tasks available at the moment. Check back later!");
        }

        let mut out = String::from("Available Tasks:\n");
        for task in &tasks {
            out.push_str(&format!(
                "  #{:<4} {} ({}) [{}]\n",
                task.id,
                task.title,
                ctx.money(task.reward),
                task.task_type
            ));
        }
        out.push_str("\nPick one with /select <id>");
        CommandResult::Reply(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::NewTask;
    use crate::commands::tests::{caller, ctx, test_market, USER};
    use rust_decimal::Decimal;

    #[tokio::test]
    async fn empty_catalog_says_so() {
        let market = test_market();
        let caller = caller(USER);
        let result = TasksCommand.execute("", &ctx(&market, &caller)).await;
        assert!(result.text().unwrap().starts_with("No tasks available"));
    }

    #[tokio::test]
    async fn lists_active_tasks_with_reward() {
        let market = test_market();
        let caller = caller(USER);
        market
            .catalog
            .create_task(NewTask::new("Survey", "Fill form", Decimal::new(250, 2), "survey"))
            .unwrap();
        let result = TasksCommand.execute("", &ctx(&market, &caller)).await;
        let text = result.text().unwrap();
        assert!(text.contains("Survey (2.50 USD) [survey]"));
    }
}
