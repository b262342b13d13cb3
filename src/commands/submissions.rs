use async_trait::async_trait;

use super::{Command, CommandContext, CommandResult, describe_error};

pub struct SubmissionsCommand;

#[async_trait]
impl Command for SubmissionsCommand {
    fn name(&self) -> &str {
        "/submissions"
    }

    fn description(&self) -> &str {
        "list your submissions and their review status"
    }

    async fn execute(&self, _args: &str, ctx: &CommandContext<'_>) -> CommandResult {
        let user = match ctx.user() {
            Ok(user) => user,
            Err(reply) => return CommandResult::Reply(reply),
        };
        let assignments = match ctx.market.workflow.assignments_for_user(user.id) {
            Ok(a) => a,
            Err(e) => return CommandResult::Reply(describe_error(&e)),
        };
        if assignments.is_empty() {
            return CommandResult::reply("You have not submitted anything yet. Try /tasks");
        }

        let mut out = String::from("Your submissions:\n");
        for a in &assignments {
            let title = ctx
                .market
                .catalog
                .get_task(a.task_id)
                .map(|t| t.title)
                .unwrap_or_else(|_| format!("task #{}", a.task_id));
            out.push_str(&format!(
                "  #{:<4} {:<10} {} ({})\n",
                a.id,
                a.status,
                title,
                a.submitted_at.format("%Y-%m-%d %H:%M")
            ));
        }
        CommandResult::Reply(out)
    }
}
