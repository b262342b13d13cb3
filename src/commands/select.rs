use async_trait::async_trait;

use super::{Command, CommandContext, CommandResult, StateChange, describe_error, parse_id};

pub struct SelectCommand;

#[async_trait]
impl Command for SelectCommand {
    fn name(&self) -> &str {
        "/select"
    }

    fn usage(&self) -> &str {
        "<task-id>"
    }

    fn description(&self) -> &str {
        "pick a task to work on"
    }

    async fn execute(&self, args: &str, ctx: &CommandContext<'_>) -> CommandResult {
        let task_id = match parse_id(args, "/select <task-id>") {
            Ok(id) => id,
            Err(reply) => return CommandResult::Reply(reply),
        };
        let user = match ctx.user() {
            Ok(user) => user,
            Err(reply) => return CommandResult::Reply(reply),
        };
        let task = match ctx.market.workflow.select_task(user.id, task_id) {
            Ok(task) => task,
            Err(e) => return CommandResult::Reply(describe_error(&e)),
        };

        let mut reply = format!(
            "Task: {}\nReward: {}\n\nDescription: {}\n",
            task.title,
            ctx.money(task.reward),
            task.description
        );
        if let Some(requirements) = &task.requirements {
            reply.push_str(&format!("Requirements: {requirements}\n"));
        }
        reply.push_str(
            "\nPlease submit your proof of completion (text description, or /photo <file-id>):",
        );
        CommandResult::StateChanged {
            change: StateChange::Selected(task.id),
            reply,
        }
    }
}
