use async_trait::async_trait;

use super::{Command, CommandContext, CommandResult, StateChange, describe_error};
use crate::models::Proof;

const NO_SELECTION: &str = "No task selected. Start over with /tasks";

/// Submit `proof` for `task_id` on behalf of the caller. Shared by the
/// proof commands and plain-text messages sent while a task is selected.
pub(super) fn submit(ctx: &CommandContext<'_>, task_id: i64, proof: Proof) -> CommandResult {
    let user = match ctx.user() {
        Ok(user) => user,
        Err(reply) => return CommandResult::Reply(reply),
    };
    match ctx.market.workflow.submit_proof(user.id, task_id, proof) {
        Ok(assignment) => CommandResult::StateChanged {
            change: StateChange::Cleared,
            reply: format!(
                "Your submission #{} has been received and is under review.\n\
                 You'll be notified when it's approved.",
                assignment.id
            ),
        },
        Err(e) => CommandResult::Reply(describe_error(&e)),
    }
}

pub struct ProofCommand;

#[async_trait]
impl Command for ProofCommand {
    fn name(&self) -> &str {
        "/proof"
    }

    fn usage(&self) -> &str {
        "<text>"
    }

    fn description(&self) -> &str {
        "submit a text proof for the selected task"
    }

    async fn execute(&self, args: &str, ctx: &CommandContext<'_>) -> CommandResult {
        let Some(task_id) = ctx.selected_task else {
            return CommandResult::reply(NO_SELECTION);
        };
        submit(ctx, task_id, Proof::text(args))
    }
}

pub struct PhotoCommand;

#[async_trait]
impl Command for PhotoCommand {
    fn name(&self) -> &str {
        "/photo"
    }

    fn usage(&self) -> &str {
        "<file-id> [caption]"
    }

    fn description(&self) -> &str {
        "submit a photo proof for the selected task"
    }

    async fn execute(&self, args: &str, ctx: &CommandContext<'_>) -> CommandResult {
        let Some(task_id) = ctx.selected_task else {
            return CommandResult::reply(NO_SELECTION);
        };
        let (file_id, caption) = args
            .split_once(char::is_whitespace)
            .map(|(f, c)| (f, Some(c.trim().to_string())))
            .unwrap_or((args, None));
        submit(ctx, task_id, Proof::media(file_id, caption))
    }
}
