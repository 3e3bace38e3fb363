//! # Emergency Withdrawal Scenarios
//!
//! Rolling global and per-user budgets, pause gating and custody failures.

use super::*;
use pv_diamond::abi::{decode, ParamType, Token};
use pv_diamond::errors::{AuthError, CustodyError, ProtocolStateError, RateLimitError};

fn user() -> Address {
    Address::repeat_byte(0x51)
}

fn account() -> Address {
    Address::repeat_byte(0x5A)
}

fn limits(global: u64, per_user: u64) -> DiamondConfig {
    DiamondConfig {
        global_daily_limit: U256::from(global),
        user_daily_limit: U256::from(per_user),
        ..DiamondConfig::for_testing()
    }
}

/// Owner plus B, with `user()` linked to `account()`.
async fn linked(config: &DiamondConfig) -> Harness {
    let harness = Harness::with_config(&[admin_b()], config);
    harness
        .call(
            admin_b(),
            GENESIS,
            admin::Function::link_custody_account(user(), account()),
        )
        .await
        .expect("link custody account");
    harness
}

async fn withdraw(harness: &Harness, timestamp: u64) -> Result<U256, DiamondError> {
    let receipt = harness
        .call(owner(), timestamp, admin::Function::emergency_withdraw(user()))
        .await?;
    let mut tokens = decode(&[ParamType::Uint(256)], receipt.output.as_slice())?;
    Ok(tokens.remove(0).into_uint()?)
}

async fn window(harness: &Harness, timestamp: u64, data: Bytes) -> WindowSnapshot {
    let output = harness.view(timestamp, data).await.expect("window view");
    admin::decode_window(output.as_slice()).expect("window")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_global_budget_rolls_over() {
        init_tracing();
        let harness = linked(&limits(100, 1_000)).await;

        harness.custody.fund(account(), U256::from(60));
        assert_eq!(withdraw(&harness, GENESIS + 10).await, Ok(U256::from(60)));
        assert_eq!(harness.custody.balance(user()), U256::from(60));

        harness.custody.fund(account(), U256::from(50));
        let result = withdraw(&harness, GENESIS + 20).await;
        assert_eq!(
            result,
            Err(DiamondError::RateLimit(RateLimitError::GlobalLimitExceeded {
                requested: U256::from(50),
                remaining: U256::from(40)
            }))
        );
        assert_eq!(harness.custody.balance(account()), U256::from(50));

        assert_eq!(withdraw(&harness, GENESIS + DAY).await, Ok(U256::from(50)));
        assert_eq!(harness.custody.balance(user()), U256::from(110));
        assert_eq!(harness.custody.balance(account()), U256::zero());

        let global = window(
            &harness,
            GENESIS + DAY,
            admin::Function::GetGlobalWithdrawalLimit.no_args(),
        )
        .await;
        assert_eq!(global.limit, U256::from(100));
        assert_eq!(global.withdrawn, U256::from(50));
    }

    #[tokio::test]
    async fn test_user_budget_exceeded_then_exhausted() {
        let harness = linked(&limits(100, 30)).await;

        harness.custody.fund(account(), U256::from(40));
        let result = withdraw(&harness, GENESIS + 1).await;
        assert_eq!(
            result,
            Err(DiamondError::RateLimit(RateLimitError::UserLimitExceeded {
                user: user(),
                requested: U256::from(40),
                remaining: U256::from(30)
            }))
        );

        // Drain down to exactly the budget.
        harness
            .custody
            .transfer(account(), Address::repeat_byte(0x99), U256::from(10))
            .unwrap();
        assert_eq!(withdraw(&harness, GENESIS + 2).await, Ok(U256::from(30)));

        harness.custody.fund(account(), U256::from(1));
        let result = withdraw(&harness, GENESIS + 3).await;
        assert_eq!(
            result,
            Err(DiamondError::RateLimit(RateLimitError::UserLimitReached { user: user() }))
        );

        let per_user = window(
            &harness,
            GENESIS + 3,
            admin::Function::get_user_withdrawal_limit(user()),
        )
        .await;
        assert_eq!(per_user.limit, U256::from(30));
        assert_eq!(per_user.withdrawn, U256::from(30));
    }

    #[tokio::test]
    async fn test_failed_transfer_rolls_back_budgets_and_events() {
        let harness = linked(&limits(100, 100)).await;
        harness.custody.fund(account(), U256::from(25));
        harness.custody.set_failing(account(), true);
        let events_before = harness.service.events().await.len();

        let result = withdraw(&harness, GENESIS + 5).await;
        assert!(matches!(
            result,
            Err(DiamondError::Custody(CustodyError::TransferFailed { .. }))
        ));

        let global = window(
            &harness,
            GENESIS + 5,
            admin::Function::GetGlobalWithdrawalLimit.no_args(),
        )
        .await;
        assert_eq!(global.withdrawn, U256::zero());
        let per_user = window(
            &harness,
            GENESIS + 5,
            admin::Function::get_user_withdrawal_limit(user()),
        )
        .await;
        assert_eq!(per_user.withdrawn, U256::zero());
        assert_eq!(harness.service.events().await.len(), events_before);
        assert_eq!(harness.custody.balance(account()), U256::from(25));

        harness.custody.set_failing(account(), false);
        assert_eq!(withdraw(&harness, GENESIS + 6).await, Ok(U256::from(25)));
    }

    #[tokio::test]
    async fn test_withdrawal_preconditions() {
        let harness = Harness::two_admins();

        let result = withdraw(&harness, GENESIS).await;
        assert_eq!(
            result,
            Err(DiamondError::Custody(CustodyError::NoCustodyAccount { user: user() }))
        );

        let result = harness
            .call(
                owner(),
                GENESIS,
                admin::Function::link_custody_account(user(), Address::ZERO),
            )
            .await;
        assert_eq!(result, Err(DiamondError::Custody(CustodyError::ZeroAccount)));

        harness
            .call(
                owner(),
                GENESIS,
                admin::Function::link_custody_account(user(), account()),
            )
            .await
            .unwrap();
        let result = withdraw(&harness, GENESIS).await;
        assert_eq!(
            result,
            Err(DiamondError::Custody(CustodyError::EmptyBalance { account: account() }))
        );

        let result = harness
            .call(
                outsider(),
                GENESIS,
                admin::Function::emergency_withdraw(user()),
            )
            .await;
        assert_eq!(
            result,
            Err(DiamondError::Auth(AuthError::NotAdmin { caller: outsider() }))
        );
    }

    #[tokio::test]
    async fn test_pause_gates_withdrawal_until_shutdown() {
        let harness = linked(&limits(100, 100)).await;
        harness.custody.fund(account(), U256::from(10));

        harness
            .call(
                owner(),
                GENESIS + 1,
                admin::Function::set_pause_state(PauseLevel::DepositsOnly as u8),
            )
            .await
            .unwrap();
        let result = withdraw(&harness, GENESIS + 2).await;
        assert_eq!(
            result,
            Err(DiamondError::ProtocolState(ProtocolStateError::ActionNotAllowed {
                action: ProtocolAction::EmergencyWithdraw,
                level: PauseLevel::DepositsOnly
            }))
        );

        let id = harness
            .propose(
                owner(),
                GENESIS + 3,
                &OperationParams::Emergency(EmergencyAction::Shutdown),
            )
            .await
            .unwrap();
        harness
            .call(admin_b(), GENESIS + 4, admin::Function::sign(id))
            .await
            .unwrap();
        harness
            .call(admin_b(), GENESIS + 3 + HOUR, admin::Function::execute(id))
            .await
            .unwrap();

        assert_eq!(withdraw(&harness, GENESIS + 3 + HOUR).await, Ok(U256::from(10)));
        assert!(
            harness
                .view_bool(
                    GENESIS + 3 + HOUR,
                    admin::Function::is_action_allowed(ProtocolAction::EmergencyWithdraw as u8)
                )
                .await
        );
    }

    #[tokio::test]
    async fn test_withdrawal_event_names_admin() {
        let harness = linked(&limits(100, 100)).await;
        harness.custody.fund(account(), U256::from(7));

        let receipt = harness
            .call(admin_b(), GENESIS + 1, admin::Function::emergency_withdraw(user()))
            .await
            .unwrap();
        assert_eq!(
            receipt.events,
            vec![DiamondEvent::EmergencyWithdrawal {
                user: user(),
                account: account(),
                amount: U256::from(7),
                admin: admin_b()
            }]
        );
        assert_eq!(
            decode(&[ParamType::Uint(256)], receipt.output.as_slice()).unwrap(),
            vec![Token::Uint(U256::from(7))]
        );
    }
}
