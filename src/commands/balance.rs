use async_trait::async_trait;

use super::{Command, CommandContext, CommandResult};

pub struct BalanceCommand;

#[async_trait]
impl Command for BalanceCommand {
    fn name(&self) -> &str {
        "/balance"
    }

    fn description(&self) -> &str {
        "check your earnings"
    }

    async fn execute(&self, _args: &str, ctx: &CommandContext<'_>) -> CommandResult {
        match ctx.user() {
            Ok(user) => CommandResult::Reply(format!(
                "Your current balance: {}\nMinimum withdrawal: {}",
                ctx.money(user.balance),
                ctx.money(ctx.market.settings.min_withdrawal)
            )),
            Err(reply) => CommandResult::Reply(reply),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::tests::{caller, ctx, test_market, USER};
    use crate::users::Profile;
    use rust_decimal::Decimal;

    #[tokio::test]
    async fn shows_balance_and_minimum() {
        let market = test_market();
        let caller = caller(USER);
        let user = market.users.register(USER, Profile::default(), None).unwrap().user;
        market.ledger.credit(user.id, Decimal::new(5, 0), "bonus").unwrap();
        let result = BalanceCommand.execute("", &ctx(&market, &caller)).await;
        assert_eq!(
            result.text(),
            Some("Your current balance: 5.00 USD\nMinimum withdrawal: 10.00 USD")
        );
    }
}
