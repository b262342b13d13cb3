use std::str::FromStr;

use async_trait::async_trait;
use rust_decimal::Decimal;

use super::{Command, CommandContext, CommandResult};
use crate::error::WithdrawalError;
use crate::settlement::PayoutMethod;

pub struct WithdrawCommand;

impl WithdrawCommand {
    fn methods_hint() -> String {
        let methods: Vec<String> = PayoutMethod::ALL
            .iter()
            .map(|m| format!("  {} - {}", m.as_str(), m.label()))
            .collect();
        format!(
            "Select withdrawal method:\n{}\n\nUsage: /withdraw <amount|all> <method>",
            methods.join("\n")
        )
    }
}

#[async_trait]
impl Command for WithdrawCommand {
    fn name(&self) -> &str {
        "/withdraw"
    }

    fn usage(&self) -> &str {
        "<amount|all> <method>"
    }

    fn description(&self) -> &str {
        "request a payout"
    }

    async fn execute(&self, args: &str, ctx: &CommandContext<'_>) -> CommandResult {
        let user = match ctx.user() {
            Ok(user) => user,
            Err(reply) => return CommandResult::Reply(reply),
        };
        let minimum = ctx.market.settings.min_withdrawal;

        let mut parts = args.split_whitespace();
        let (Some(amount), Some(method)) = (parts.next(), parts.next()) else {
            if user.balance < minimum {
                return CommandResult::Reply(format!(
                    "Your balance ({}) is below the minimum withdrawal amount ({})",
                    ctx.money(user.balance),
                    ctx.money(minimum)
                ));
            }
            return CommandResult::Reply(Self::methods_hint());
        };

        let amount = if amount.eq_ignore_ascii_case("all") {
            user.balance
        } else {
            match Decimal::from_str(amount) {
                Ok(a) => a,
                Err(_) => return CommandResult::Reply(format!("Invalid amount: {amount}")),
            }
        };
        let method = match PayoutMethod::from_str(method) {
            Ok(m) => m,
            Err(e) => return CommandResult::Reply(format!("{e}\n\n{}", Self::methods_hint())),
        };

        match ctx.market.withdrawals.withdraw(user.id, amount, method).await {
            Ok(tx) => CommandResult::Reply(format!(
                "Withdrawal of {} processed (ref {}).",
                ctx.money(tx.amount),
                tx.reference
            )),
            Err(WithdrawalError::BelowMinimum { minimum, .. }) => {
                CommandResult::Reply(format!("Minimum withdrawal is {}", ctx.money(minimum)))
            }
            Err(WithdrawalError::InsufficientBalance { .. }) => {
                CommandResult::reply("Insufficient balance")
            }
            Err(WithdrawalError::UserNotFound(_)) => CommandResult::reply("User not found"),
            Err(WithdrawalError::Invalid(msg)) => {
                CommandResult::Reply(format!("Invalid withdrawal: {msg}"))
            }
            Err(WithdrawalError::SettlementFailed(_)) => CommandResult::reply(
                "The payout could not be completed. Your balance has not been charged.",
            ),
            Err(WithdrawalError::Store(_)) => CommandResult::reply("Database error occurred"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::tests::{caller, ctx, test_market, USER};
    use crate::users::Profile;

    fn funded(balance: i64) -> crate::market::Market {
        let market = test_market();
        let user = market.users.register(USER, Profile::default(), None).unwrap().user;
        if balance > 0 {
            market
                .ledger
                .credit(user.id, Decimal::new(balance, 0), "seed")
                .unwrap();
        }
        market
    }

    #[tokio::test]
    async fn low_balance_without_args_explains_minimum() {
        let market = funded(5);
        let caller = caller(USER);
        let result = WithdrawCommand.execute("", &ctx(&market, &caller)).await;
        assert!(result.text().unwrap().contains("below the minimum"));
    }

    #[tokio::test]
    async fn no_args_lists_methods() {
        let market = funded(20);
        let caller = caller(USER);
        let result = WithdrawCommand.execute("", &ctx(&market, &caller)).await;
        assert!(result.text().unwrap().contains("Bank Transfer"));
    }

    #[tokio::test]
    async fn withdraw_all_empties_balance() {
        let market = funded(20);
        let caller = caller(USER);
        let result = WithdrawCommand.execute("all paypal", &ctx(&market, &caller)).await;
        assert!(result.text().unwrap().starts_with("Withdrawal of 20.00 USD processed"));
        let user = market.users.find_by_external_id(USER).unwrap().unwrap();
        assert_eq!(user.balance, Decimal::ZERO);
    }

    #[tokio::test]
    async fn below_minimum_is_reported() {
        let market = funded(20);
        let caller = caller(USER);
        let result = WithdrawCommand.execute("5 paypal", &ctx(&market, &caller)).await;
        assert_eq!(result.text(), Some("Minimum withdrawal is 10.00 USD"));
    }

    #[tokio::test]
    async fn unknown_method_is_rejected() {
        let market = funded(20);
        let caller = caller(USER);
        let result = WithdrawCommand.execute("15 crypto", &ctx(&market, &caller)).await;
        assert!(result.text().unwrap().starts_with("unknown payout method"));
        let user = market.users.find_by_external_id(USER).unwrap().unwrap();
        assert_eq!(user.balance, Decimal::new(20, 0));
    }
}
