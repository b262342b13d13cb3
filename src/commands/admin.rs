//! Commands for callers on the admin allow-list: catalog upkeep and the
//! review queue.

use async_trait::async_trait;

use super::{Command, CommandContext, CommandResult, describe_error, parse_id};
use crate::catalog::NewTask;
use crate::models::ReviewDecision;

const ADDTASK_USAGE: &str = "/addtask <title>|<description>|<reward>|<type>";

pub struct AddTaskCommand;

#[async_trait]
impl Command for AddTaskCommand {
    fn name(&self) -> &str {
        "/addtask"
    }

    fn usage(&self) -> &str {
        "<title>|<description>|<reward>|<type>"
    }

    fn description(&self) -> &str {
        "publish a new task"
    }

    fn admin_only(&self) -> bool {
        true
    }

    async fn execute(&self, args: &str, ctx: &CommandContext<'_>) -> CommandResult {
        if args.is_empty() {
            return CommandResult::Reply(format!("Usage: {ADDTASK_USAGE}"));
        }
        let new = match NewTask::parse_admin_payload(args) {
            Ok(new) => new,
            Err(e) => {
                return CommandResult::Reply(format!("{}\nUsage: {ADDTASK_USAGE}", describe_error(&e)));
            }
        };
        match ctx.market.catalog.create_task(new) {
            Ok(task) => CommandResult::Reply(format!(
                "New task added successfully! #{} {} ({})",
                task.id,
                task.title,
                ctx.money(task.reward)
            )),
            Err(e) => CommandResult::Reply(describe_error(&e)),
        }
    }
}

pub struct DeactivateCommand;

#[async_trait]
impl Command for DeactivateCommand {
    fn name(&self) -> &str {
        "/deactivate"
    }

    fn usage(&self) -> &str {
        "<task id>"
    }

    fn description(&self) -> &str {
        "withdraw a task from the catalog"
    }

    fn admin_only(&self) -> bool {
        true
    }

    async fn execute(&self, args: &str, ctx: &CommandContext<'_>) -> CommandResult {
        let task_id = match parse_id(args, "/deactivate <task id>") {
            Ok(id) => id,
            Err(reply) => return CommandResult::Reply(reply),
        };
        match ctx.market.catalog.deactivate_task(task_id) {
            Ok(task) => CommandResult::Reply(format!("Task #{} deactivated: {}", task.id, task.title)),
            Err(e) => CommandResult::Reply(describe_error(&e)),
        }
    }
}

pub struct ReviewQueueCommand;

#[async_trait]
impl Command for ReviewQueueCommand {
    fn name(&self) -> &str {
        "/review"
    }

    fn aliases(&self) -> &[&str] {
        &["/pending"]
    }

    fn description(&self) -> &str {
        "list submissions waiting for review"
    }

    fn admin_only(&self) -> bool {
        true
    }

    async fn execute(&self, _args: &str, ctx: &CommandContext<'_>) -> CommandResult {
        let pending = match ctx.market.workflow.pending_assignments() {
            Ok(pending) => pending,
            Err(e) => return CommandResult::Reply(describe_error(&e)),
        };
        if pending.is_empty() {
            return CommandResult::reply("No submissions waiting for review.");
        }

        let mut out = String::from("Pending submissions:\n");
        for a in &pending {
            out.push_str(&format!(
                "  #{:<4} user {} task {} at {}\n        {}\n",
                a.id,
                a.user_id,
                a.task_id,
                a.submitted_at.format("%Y-%m-%d %H:%M"),
                a.proof
            ));
        }
        out.push_str("\nUse /approve <id> or /reject <id> [note].");
        CommandResult::Reply(out)
    }
}

/// Shared body of `/approve` and `/reject`.
fn review(args: &str, usage: &str, decision: ReviewDecision, ctx: &CommandContext<'_>) -> CommandResult {
    let assignment_id = match parse_id(args, usage) {
        Ok(id) => id,
        Err(reply) => return CommandResult::Reply(reply),
    };
    let note = args
        .split_once(char::is_whitespace)
        .map(|(_, rest)| rest.trim())
        .filter(|rest| !rest.is_empty());

    match ctx.market.workflow.review_assignment(assignment_id, decision, note) {
        Ok(review) => match review.credit {
            Some(credit) => CommandResult::Reply(format!(
                "Submission #{} approved. Credited {} to user {}.",
                assignment_id,
                ctx.money(credit.amount),
                credit.user_id
            )),
            None => CommandResult::Reply(format!(
                "Submission #{assignment_id} {}.",
                review.assignment.status
            )),
        },
        Err(e) => CommandResult::Reply(describe_error(&e)),
    }
}

pub struct ApproveCommand;

#[async_trait]
impl Command for ApproveCommand {
    fn name(&self) -> &str {
        "/approve"
    }

    fn usage(&self) -> &str {
        "<id> [note]"
    }

    fn description(&self) -> &str {
        "approve a submission and pay its reward"
    }

    fn admin_only(&self) -> bool {
        true
    }

    async fn execute(&self, args: &str, ctx: &CommandContext<'_>) -> CommandResult {
        review(args, "/approve <id> [note]", ReviewDecision::Approve, ctx)
    }
}

pub struct RejectCommand;

#[async_trait]
impl Command for RejectCommand {
    fn name(&self) -> &str {
        "/reject"
    }

    fn usage(&self) -> &str {
        "<id> [note]"
    }

    fn description(&self) -> &str {
        "reject a submission"
    }

    fn admin_only(&self) -> bool {
        true
    }

    async fn execute(&self, args: &str, ctx: &CommandContext<'_>) -> CommandResult {
        review(args, "/reject <id> [note]", ReviewDecision::Reject, ctx)
    }
}
