use async_trait::async_trait;

use super::{Command, CommandContext, CommandResult, describe_error};

pub struct StartCommand;

#[async_trait]
impl Command for StartCommand {
    fn name(&self) -> &str {
        "/start"
    }

    fn usage(&self) -> &str {
        "[referral-code]"
    }

    fn description(&self) -> &str {
        "register, or say hello again"
    }

    async fn execute(&self, args: &str, ctx: &CommandContext<'_>) -> CommandResult {
        let referral = args.split_whitespace().next();
        let registration = match ctx.market.users.register(
            ctx.caller.external_id,
            ctx.caller.profile.clone(),
            referral,
        ) {
            Ok(r) => r,
            Err(e) => return CommandResult::Reply(describe_error(&e)),
        };

        let welcome = if registration.created {
            "Welcome to TaskEarn! You've been registered.".to_string()
        } else {
            format!("Welcome back, {}!", registration.user.display_name())
        };
        CommandResult::Reply(format!(
            "{welcome}\n\n\
             Available commands:\n\
             /tasks - Browse available tasks\n\
             /balance - Check your earnings\n\
             /withdraw - Request a payout\n\n\
             Your referral code: {}",
            registration.user.referral_code
        ))
    }
}
