//! # Governance Scenarios
//!
//! Multi-signature timelock operations, from proposal to their effect on
//! the admin set, the limits, the pause state and the routing table.

use super::*;
use pv_diamond::abi::Token;
use pv_diamond::errors::{AuthError, GovernanceError, ProtocolStateError};

fn shutdown() -> OperationParams {
    OperationParams::Emergency(EmergencyAction::Shutdown)
}

async fn sign(harness: &Harness, signer: Address, timestamp: u64, id: Hash) -> Result<CallReceipt, DiamondError> {
    harness
        .call(signer, timestamp, admin::Function::sign(id))
        .await
}

async fn transfer_ownership(
    harness: &Harness,
    caller: Address,
    timestamp: u64,
    new_owner: Address,
) -> Result<CallReceipt, DiamondError> {
    harness
        .call(
            caller,
            timestamp,
            ownership::Function::TransferOwnership.encode_call(&[Token::Address(new_owner)]),
        )
        .await
}

async fn is_admin(harness: &Harness, timestamp: u64, account: Address) -> bool {
    harness
        .view_bool(timestamp, admin::Function::is_admin(account))
        .await
}

async fn execute(harness: &Harness, caller: Address, timestamp: u64, id: Hash) -> Result<CallReceipt, DiamondError> {
    harness
        .call(caller, timestamp, admin::Function::execute(id))
        .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_execute_without_quorum_fails() {
        init_tracing();
        let harness = Harness::two_admins();
        let id = harness.propose(owner(), GENESIS, &shutdown()).await.unwrap();

        let result = execute(&harness, owner(), GENESIS + HOUR, id).await;

        assert_eq!(
            result,
            Err(DiamondError::Governance(GovernanceError::InsufficientSignatures {
                id,
                received: 1,
                required: 2
            }))
        );
        assert!(!harness.operation(GENESIS + HOUR, id).await.executed);
    }

    #[tokio::test]
    async fn test_shutdown_scenario_with_three_admins() {
        let harness = Harness::three_admins();
        let t = GENESIS + 10;

        let id = harness.propose(owner(), t, &shutdown()).await.unwrap();
        sign(&harness, admin_b(), t + 1, id).await.unwrap();

        let early = execute(&harness, admin_c(), t + HOUR - 1, id).await;
        assert_eq!(
            early,
            Err(DiamondError::Governance(GovernanceError::NotUnlocked {
                id,
                unlock_time: t + HOUR,
                now: t + HOUR - 1
            }))
        );

        let receipt = execute(&harness, admin_c(), t + HOUR, id).await.unwrap();
        let names: Vec<_> = receipt.events.iter().map(DiamondEvent::name).collect();
        assert_eq!(names, vec!["EmergencyActionApplied", "OperationExecuted"]);

        let state = harness.pause_state(t + HOUR).await;
        assert!(state.shutdown);
        assert_eq!(state.level, PauseLevel::FullyPaused as u8);
        assert_eq!(state.changed_at, t + HOUR);
        assert!(
            harness
                .view_bool(
                    t + HOUR,
                    admin::Function::is_action_allowed(ProtocolAction::Withdraw as u8)
                )
                .await
        );
        assert!(
            !harness
                .view_bool(
                    t + HOUR,
                    admin::Function::is_action_allowed(ProtocolAction::Deposit as u8)
                )
                .await
        );

        // Terminal: no pause change and no second shutdown.
        let result = harness
            .call(owner(), t + HOUR + 1, admin::Function::set_pause_state(0))
            .await;
        assert_eq!(
            result,
            Err(DiamondError::ProtocolState(ProtocolStateError::Shutdown))
        );

        let again = harness.propose(owner(), t + HOUR + 2, &shutdown()).await.unwrap();
        sign(&harness, admin_b(), t + HOUR + 2, again).await.unwrap();
        let result = execute(&harness, owner(), t + 2 * HOUR + 2, again).await;
        assert_eq!(
            result,
            Err(DiamondError::ProtocolState(ProtocolStateError::Shutdown))
        );
        assert!(harness.pause_state(t + 3 * HOUR).await.shutdown);
    }

    #[tokio::test]
    async fn test_duplicate_and_late_signatures_fail() {
        let harness = Harness::three_admins();
        let id = harness.propose(owner(), GENESIS, &shutdown()).await.unwrap();

        let result = sign(&harness, owner(), GENESIS + 1, id).await;
        assert_eq!(
            result,
            Err(DiamondError::Governance(GovernanceError::AlreadySigned {
                id,
                signer: owner()
            }))
        );

        sign(&harness, admin_b(), GENESIS + 1, id).await.unwrap();
        let result = sign(&harness, admin_b(), GENESIS + 2, id).await;
        assert!(matches!(
            result,
            Err(DiamondError::Governance(GovernanceError::AlreadySigned { .. }))
        ));

        execute(&harness, owner(), GENESIS + HOUR, id).await.unwrap();

        let result = sign(&harness, admin_c(), GENESIS + HOUR, id).await;
        assert_eq!(
            result,
            Err(DiamondError::Governance(GovernanceError::AlreadyExecuted(id)))
        );
        let result = execute(&harness, owner(), GENESIS + HOUR, id).await;
        assert_eq!(
            result,
            Err(DiamondError::Governance(GovernanceError::AlreadyExecuted(id)))
        );
    }

    #[tokio::test]
    async fn test_only_admins_govern() {
        let harness = Harness::two_admins();

        let result = harness.propose(outsider(), GENESIS, &shutdown()).await;
        assert_eq!(
            result,
            Err(DiamondError::Auth(AuthError::NotAdmin { caller: outsider() }))
        );

        let id = harness.propose(admin_b(), GENESIS, &shutdown()).await.unwrap();
        let result = sign(&harness, outsider(), GENESIS, id).await;
        assert!(matches!(result, Err(DiamondError::Auth(_))));
        assert!(
            !harness
                .view_bool(GENESIS, admin::Function::has_signed(id, outsider()))
                .await
        );
        assert!(
            harness
                .view_bool(GENESIS, admin::Function::has_signed(id, admin_b()))
                .await
        );
    }

    #[tokio::test]
    async fn test_malformed_proposals_never_enter_pending_set() {
        let harness = Harness::two_admins();

        let result = harness
            .call(owner(), GENESIS, admin::Function::propose_raw(9, &[]))
            .await;
        assert_eq!(
            result,
            Err(DiamondError::Governance(GovernanceError::InvalidClass(9)))
        );

        let zero_quorum = OperationParams::LimitsUpdate {
            global_daily_limit: U256::from(1),
            min_signatures: 0,
        };
        let result = harness.propose(owner(), GENESIS, &zero_quorum).await;
        assert_eq!(
            result,
            Err(DiamondError::Governance(GovernanceError::ZeroQuorum))
        );

        let remove_owner = OperationParams::AdminChange {
            account: owner(),
            add: false,
        };
        let result = harness.propose(admin_b(), GENESIS, &remove_owner).await;
        assert_eq!(
            result,
            Err(DiamondError::Governance(GovernanceError::OwnerIsAdmin(owner())))
        );
        assert!(harness.service.events().await.is_empty());
    }

    #[tokio::test]
    async fn test_admin_change_keeps_quorum_reachable() {
        let harness = Harness::three_admins();
        let t = GENESIS;

        let remove_b = harness
            .propose(
                owner(),
                t,
                &OperationParams::AdminChange {
                    account: admin_b(),
                    add: false,
                },
            )
            .await
            .unwrap();
        let remove_c = harness
            .propose(
                owner(),
                t + 1,
                &OperationParams::AdminChange {
                    account: admin_c(),
                    add: false,
                },
            )
            .await
            .unwrap();
        sign(&harness, admin_c(), t + 2, remove_b).await.unwrap();
        sign(&harness, admin_b(), t + 2, remove_c).await.unwrap();

        execute(&harness, owner(), t + DAY, remove_b).await.unwrap();
        assert!(
            !harness
                .view_bool(t + DAY, admin::Function::is_admin(admin_b()))
                .await
        );

        // Owner alone cannot meet a quorum of 2.
        let result = execute(&harness, owner(), t + DAY + 1, remove_c).await;
        assert_eq!(
            result,
            Err(DiamondError::Governance(GovernanceError::QuorumUnreachable {
                required: 2,
                admins: 1
            }))
        );
        assert!(!harness.operation(t + DAY + 1, remove_c).await.executed);
        assert!(
            harness
                .view_bool(t + DAY + 1, admin::Function::is_admin(admin_c()))
                .await
        );
    }

    #[tokio::test]
    async fn test_limits_update_applies_after_standard_delay() {
        let harness = Harness::three_admins();
        let params = OperationParams::LimitsUpdate {
            global_daily_limit: U256::from(500),
            min_signatures: 3,
        };
        let id = harness.propose(admin_b(), GENESIS, &params).await.unwrap();
        sign(&harness, admin_c(), GENESIS + 5, id).await.unwrap();

        let view = harness.operation(GENESIS + 5, id).await;
        assert_eq!(view.class, OperationClass::LimitsUpdate as u8);
        assert_eq!(view.unlock_time, GENESIS + DAY);
        assert_eq!(view.signatures, 2);
        assert_eq!(view.proposer, admin_b());
        assert_eq!(view.params, params.encode());

        let result = execute(&harness, owner(), GENESIS + HOUR, id).await;
        assert!(matches!(
            result,
            Err(DiamondError::Governance(GovernanceError::NotUnlocked { .. }))
        ));
        execute(&harness, owner(), GENESIS + DAY, id).await.unwrap();

        let output = harness
            .view(GENESIS + DAY, admin::Function::GetGlobalWithdrawalLimit.no_args())
            .await
            .unwrap();
        let window = admin::decode_window(output.as_slice()).unwrap();
        assert_eq!(window.limit, U256::from(500));

        let output = harness
            .view(GENESIS + DAY, admin::Function::MinSignatures.no_args())
            .await
            .unwrap();
        assert_eq!(
            pv_diamond::abi::decode(&[pv_diamond::abi::ParamType::Uint(256)], output.as_slice())
                .unwrap(),
            vec![Token::uint(3u64)]
        );
    }

    #[tokio::test]
    async fn test_quorum_is_snapshotted_at_proposal() {
        let harness = Harness::three_admins();

        let raise = harness
            .propose(
                owner(),
                GENESIS,
                &OperationParams::LimitsUpdate {
                    global_daily_limit: U256::from(100),
                    min_signatures: 3,
                },
            )
            .await
            .unwrap();
        let freeze = harness
            .propose(
                owner(),
                GENESIS + 1,
                &OperationParams::Emergency(EmergencyAction::Freeze),
            )
            .await
            .unwrap();
        sign(&harness, admin_b(), GENESIS + 2, raise).await.unwrap();
        sign(&harness, admin_b(), GENESIS + 2, freeze).await.unwrap();
        execute(&harness, owner(), GENESIS + DAY, raise).await.unwrap();

        // Proposed under quorum 2; two signatures still suffice.
        execute(&harness, owner(), GENESIS + DAY, freeze).await.unwrap();
        let state = harness.pause_state(GENESIS + DAY).await;
        assert_eq!(state.level, PauseLevel::FullyPaused as u8);
        assert!(!state.shutdown);

        // Frozen, not shut down: the pause level can still move.
        harness
            .call(admin_c(), GENESIS + DAY + 1, admin::Function::set_pause_state(0))
            .await
            .unwrap();
        assert_eq!(harness.pause_state(GENESIS + DAY + 1).await.level, 0);
    }

    #[tokio::test]
    async fn test_protocol_upgrade_through_governance() {
        let harness = Harness::two_admins();
        let transfer = ownership::Function::TransferOwnership.selector();
        let upgrade =
            OperationParams::ProtocolUpgrade(DiamondCutArgs::new(vec![FacetCut::remove(vec![
                transfer,
            ])]));

        let id = harness.propose(admin_b(), GENESIS, &upgrade).await.unwrap();
        sign(&harness, owner(), GENESIS + 1, id).await.unwrap();
        let receipt = execute(&harness, admin_b(), GENESIS + DAY, id).await.unwrap();

        let names: Vec<_> = receipt.events.iter().map(DiamondEvent::name).collect();
        assert_eq!(names, vec!["DiamondCut", "OperationExecuted"]);
        assert_eq!(harness.service.inspect(|d| d.resolve(transfer)).await, None);

        let result = harness
            .call(
                owner(),
                GENESIS + DAY,
                ownership::Function::TransferOwnership.encode_call(&[Token::Address(admin_b())]),
            )
            .await;
        assert!(matches!(
            result,
            Err(DiamondError::Routing(
                pv_diamond::errors::RoutingError::FunctionNotFound(_)
            ))
        ));
    }

    #[tokio::test]
    async fn test_set_pause_state_emits_transition() {
        let harness = Harness::two_admins();

        let receipt = harness
            .call(
                admin_b(),
                GENESIS + 7,
                admin::Function::set_pause_state(PauseLevel::WithdrawalsOnly as u8),
            )
            .await
            .unwrap();
        assert_eq!(
            receipt.events,
            vec![DiamondEvent::PauseStateChanged {
                previous: PauseLevel::FullyActive,
                level: PauseLevel::WithdrawalsOnly,
                timestamp: GENESIS + 7
            }]
        );

        let result = harness
            .call(
                admin_b(),
                GENESIS + 8,
                admin::Function::set_pause_state(PauseLevel::WithdrawalsOnly as u8),
            )
            .await;
        assert_eq!(
            result,
            Err(DiamondError::ProtocolState(ProtocolStateError::Unchanged(
                PauseLevel::WithdrawalsOnly
            )))
        );

        let result = harness
            .call(outsider(), GENESIS + 9, admin::Function::set_pause_state(0))
            .await;
        assert!(matches!(result, Err(DiamondError::Auth(_))));
    }

    #[tokio::test]
    async fn test_owner_is_always_an_admin() {
        let harness = Harness::two_admins();
        assert!(is_admin(&harness, GENESIS, owner()).await);
        assert!(!is_admin(&harness, GENESIS, outsider()).await);

        let receipt = transfer_ownership(&harness, owner(), GENESIS + 1, outsider())
            .await
            .unwrap();
        assert_eq!(
            receipt.events,
            vec![DiamondEvent::OwnershipTransferred {
                previous: owner(),
                new: outsider()
            }]
        );

        // The role follows ownership; the old owner was never listed.
        assert!(is_admin(&harness, GENESIS + 1, outsider()).await);
        assert!(!is_admin(&harness, GENESIS + 1, owner()).await);
        let id = harness.propose(outsider(), GENESIS + 2, &shutdown()).await.unwrap();
        sign(&harness, admin_b(), GENESIS + 3, id).await.unwrap();
        execute(&harness, admin_b(), GENESIS + 2 + HOUR, id).await.unwrap();
        assert!(harness.pause_state(GENESIS + 2 + HOUR).await.shutdown);
    }

    #[tokio::test]
    async fn test_ownership_transfer_to_listed_admin_keeps_quorum() {
        let harness = Harness::two_admins();

        let result = transfer_ownership(&harness, owner(), GENESIS, admin_b()).await;
        assert_eq!(
            result,
            Err(DiamondError::Governance(GovernanceError::QuorumUnreachable {
                required: 2,
                admins: 1
            }))
        );
        assert_eq!(harness.service.inspect(|d| d.storage().owner()).await, owner());

        // Governance still works with the original pair.
        let add_c = OperationParams::AdminChange {
            account: admin_c(),
            add: true,
        };
        let id = harness.propose(owner(), GENESIS + 1, &add_c).await.unwrap();
        sign(&harness, admin_b(), GENESIS + 2, id).await.unwrap();
        execute(&harness, owner(), GENESIS + 1 + DAY, id).await.unwrap();

        // With C listed, B can take over and the quorum stays reachable.
        transfer_ownership(&harness, owner(), GENESIS + DAY + 2, admin_b())
            .await
            .unwrap();
        assert_eq!(
            harness.service.inspect(|d| d.storage().admin_count()).await,
            2
        );
        assert!(!is_admin(&harness, GENESIS + DAY + 2, owner()).await);
    }

    #[tokio::test]
    async fn test_ownership_cannot_go_to_zero_address() {
        let harness = Harness::two_admins();

        let result = transfer_ownership(&harness, owner(), GENESIS, Address::ZERO).await;
        assert_eq!(
            result,
            Err(DiamondError::Governance(GovernanceError::ZeroOwner))
        );
        assert_eq!(harness.service.inspect(|d| d.storage().owner()).await, owner());
        assert!(!is_admin(&harness, GENESIS, Address::ZERO).await);

        let result = harness
            .call(Address::ZERO, GENESIS + 1, admin::Function::set_pause_state(1))
            .await;
        assert_eq!(
            result,
            Err(DiamondError::Auth(AuthError::NotAdmin {
                caller: Address::ZERO
            }))
        );
    }

    #[tokio::test]
    async fn test_freeze_rejected_after_shutdown() {
        let harness = Harness::three_admins();

        let stop = harness.propose(owner(), GENESIS, &shutdown()).await.unwrap();
        let freeze = harness
            .propose(
                owner(),
                GENESIS + 1,
                &OperationParams::Emergency(EmergencyAction::Freeze),
            )
            .await
            .unwrap();
        sign(&harness, admin_b(), GENESIS + 2, stop).await.unwrap();
        sign(&harness, admin_c(), GENESIS + 2, freeze).await.unwrap();
        execute(&harness, owner(), GENESIS + HOUR, stop).await.unwrap();

        let result = execute(&harness, owner(), GENESIS + 1 + HOUR, freeze).await;
        assert_eq!(
            result,
            Err(DiamondError::ProtocolState(ProtocolStateError::Shutdown))
        );
        assert!(!harness.operation(GENESIS + 1 + HOUR, freeze).await.executed);

        let state = harness.pause_state(GENESIS + 1 + HOUR).await;
        assert!(state.shutdown);
        assert_eq!(state.changed_at, GENESIS + HOUR);
    }
}
