use async_trait::async_trait;

use super::{Command, CommandContext, CommandResult};

pub struct WhoamiCommand;

#[async_trait]
impl Command for WhoamiCommand {
    fn name(&self) -> &str {
        "/whoami"
    }

    fn description(&self) -> &str {
        "show your account, referral code, and role"
    }

    async fn execute(&self, _args: &str, ctx: &CommandContext<'_>) -> CommandResult {
        let user = match ctx.user() {
            Ok(user) => user,
            Err(reply) => return CommandResult::Reply(reply),
        };
        let referrals = ctx
            .market
            .users
            .referrals(user.id)
            .map(|r| r.len())
            .unwrap_or(0);
        let role = if ctx.is_admin() { "admin" } else { "member" };
        CommandResult::Reply(format!(
            "  name      {}\n  id        {}\n  role      {role}\n  joined    {}\n  referral  {} ({referrals} joined)",
            user.display_name(),
            user.external_id,
            user.registered_at.format("%Y-%m-%d"),
            user.referral_code,
        ))
    }
}
