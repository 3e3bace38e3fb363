//! # Routing Scenarios
//!
//! Facet cuts through `diamondCut`, compaction after removal, and the loupe
//! views that expose the routing table.

use super::*;
use pv_diamond::abi::{decode, ParamType, Token};
use pv_diamond::errors::{AuthError, RoutingError};

/// Second ownership deployment, the "module M" of the scenarios.
fn module_m() -> Address {
    Address::repeat_byte(0x4D)
}

/// Second loupe deployment, the "module N" of the scenarios.
fn module_n() -> Address {
    Address::repeat_byte(0x4E)
}

/// A diamond that routes only `diamondCut`, with M and N deployed.
fn bare_harness() -> Harness {
    let custody = Arc::new(InMemoryCustody::new());
    let mut deployments = FacetDeployments::standard();
    deployments.deploy(module_m(), FacetKind::Ownership);
    deployments.deploy(module_n(), FacetKind::DiamondLoupe);

    let diamond = Diamond::new(
        Address::repeat_byte(0xD1),
        owner(),
        FacetKind::DiamondCut.default_address(),
        deployments,
        custody.clone(),
        &DiamondConfig::for_testing(),
        GENESIS,
    )
    .expect("bare diamond");

    Harness {
        service: DiamondService::new(diamond, ServiceConfig::default()),
        custody,
    }
}

async fn cut(harness: &Harness, args: &DiamondCutArgs) -> Result<CallReceipt, DiamondError> {
    harness
        .call(owner(), GENESIS, diamond_cut::Function::call(args))
        .await
}

async fn resolve(harness: &Harness, selector: Selector) -> Option<Address> {
    harness.service.inspect(|d| d.resolve(selector)).await
}

async fn selectors_of(harness: &Harness, facet: Address) -> Vec<Selector> {
    let output = harness
        .view(
            GENESIS,
            loupe::Function::FacetFunctionSelectors.encode_call(&[Token::Address(facet)]),
        )
        .await
        .expect("facetFunctionSelectors");
    let mut tokens = decode(&[ParamType::selector_array()], output.as_slice()).expect("selectors");
    tokens
        .remove(0)
        .into_array()
        .expect("array")
        .into_iter()
        .map(|t| t.into_selector().expect("selector"))
        .collect()
}

async fn facet_addresses(harness: &Harness) -> Vec<Address> {
    let output = harness
        .view(GENESIS, loupe::Function::FacetAddresses.encode_call(&[]))
        .await
        .expect("facetAddresses");
    let mut tokens = decode(
        &[ParamType::Array(Box::new(ParamType::Address))],
        output.as_slice(),
    )
    .expect("addresses");
    tokens
        .remove(0)
        .into_array()
        .expect("array")
        .into_iter()
        .map(|t| t.into_address().expect("address"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn x() -> Selector {
        ownership::Function::Owner.selector()
    }

    fn y() -> Selector {
        ownership::Function::TransferOwnership.selector()
    }

    #[tokio::test]
    async fn test_register_then_unregister_resolution() {
        init_tracing();
        let harness = bare_harness();

        cut(&harness, &DiamondCutArgs::new(vec![FacetCut::add(module_m(), vec![x()])]))
            .await
            .unwrap();
        assert_eq!(resolve(&harness, x()).await, Some(module_m()));

        cut(&harness, &DiamondCutArgs::new(vec![FacetCut::remove(vec![x()])]))
            .await
            .unwrap();
        assert_eq!(resolve(&harness, x()).await, None);

        let result = harness
            .call(outsider(), GENESIS, ownership::Function::Owner.encode_call(&[]))
            .await;
        assert_eq!(
            result,
            Err(DiamondError::Routing(RoutingError::FunctionNotFound(x())))
        );
    }

    #[tokio::test]
    async fn test_unregister_compacts_remaining_selectors() {
        let harness = bare_harness();

        cut(
            &harness,
            &DiamondCutArgs::new(vec![FacetCut::add(module_m(), vec![x(), y()])]),
        )
        .await
        .unwrap();
        cut(
            &harness,
            &DiamondCutArgs::new(vec![FacetCut::add(
                module_n(),
                FacetKind::DiamondLoupe.selectors(),
            )]),
        )
        .await
        .unwrap();
        assert_eq!(selectors_of(&harness, module_m()).await, vec![x(), y()]);

        cut(&harness, &DiamondCutArgs::new(vec![FacetCut::remove(vec![x()])]))
            .await
            .unwrap();

        assert_eq!(resolve(&harness, y()).await, Some(module_m()));
        assert_eq!(selectors_of(&harness, module_m()).await, vec![y()]);

        let (binding, consistent) = harness
            .service
            .inspect(|d| {
                let registry = &d.storage().diamond.registry;
                (registry.binding(y()), registry.verify_indices())
            })
            .await;
        assert_eq!(binding.map(|b| b.position), Some(0));
        assert!(consistent.is_ok());

        let output = harness
            .view(GENESIS, ownership::Function::Owner.encode_call(&[]))
            .await;
        assert!(matches!(
            output,
            Err(DiamondError::Routing(RoutingError::FunctionNotFound(_)))
        ));

        // Y still executes on M at its compacted position.
        harness
            .call(
                owner(),
                GENESIS,
                ownership::Function::TransferOwnership.encode_call(&[Token::Address(admin_b())]),
            )
            .await
            .unwrap();
        assert_eq!(
            harness.service.inspect(|d| d.storage().owner()).await,
            admin_b()
        );
    }

    #[tokio::test]
    async fn test_removing_last_selector_drops_facet_and_reorders() {
        let harness = bare_harness();
        let cut_facet = FacetKind::DiamondCut.default_address();

        cut(
            &harness,
            &DiamondCutArgs::new(vec![
                FacetCut::add(module_m(), vec![x(), y()]),
                FacetCut::add(module_n(), FacetKind::DiamondLoupe.selectors()),
            ]),
        )
        .await
        .unwrap();
        assert_eq!(
            facet_addresses(&harness).await,
            vec![cut_facet, module_m(), module_n()]
        );

        cut(&harness, &DiamondCutArgs::new(vec![FacetCut::remove(vec![y(), x()])]))
            .await
            .unwrap();

        assert_eq!(facet_addresses(&harness).await, vec![cut_facet, module_n()]);
        assert!(selectors_of(&harness, module_m()).await.is_empty());
    }

    #[tokio::test]
    async fn test_failing_cut_in_batch_rolls_back_whole_batch() {
        let harness = bare_harness();

        let result = cut(
            &harness,
            &DiamondCutArgs::new(vec![
                FacetCut::add(module_m(), vec![x()]),
                FacetCut::add(module_n(), vec![x()]),
            ]),
        )
        .await;

        assert_eq!(
            result,
            Err(DiamondError::Routing(RoutingError::SelectorAlreadyBound {
                selector: x(),
                facet: module_m()
            }))
        );
        assert_eq!(resolve(&harness, x()).await, None);
    }

    #[tokio::test]
    async fn test_cut_rejects_address_without_code() {
        let harness = bare_harness();
        let nowhere = Address::repeat_byte(0x77);

        let result = cut(&harness, &DiamondCutArgs::new(vec![FacetCut::add(nowhere, vec![x()])])).await;
        assert_eq!(
            result,
            Err(DiamondError::Routing(RoutingError::NoFacetCode { facet: nowhere }))
        );
    }

    #[tokio::test]
    async fn test_only_owner_cuts() {
        let harness = bare_harness();
        let args = DiamondCutArgs::new(vec![FacetCut::add(module_m(), vec![x()])]);

        let result = harness
            .call(outsider(), GENESIS, diamond_cut::Function::call(&args))
            .await;
        assert_eq!(
            result,
            Err(DiamondError::Auth(AuthError::NotOwner { caller: outsider() }))
        );
    }

    #[tokio::test]
    async fn test_initializer_runs_with_caller_and_storage() {
        let harness = bare_harness();
        let args = DiamondCutArgs::new(vec![FacetCut::add(module_m(), vec![x()])]).with_init(
            module_m(),
            ownership::Function::TransferOwnership.encode_call(&[Token::Address(admin_c())]),
        );

        let receipt = cut(&harness, &args).await.unwrap();

        assert_eq!(
            harness.service.inspect(|d| d.storage().owner()).await,
            admin_c()
        );
        let names: Vec<_> = receipt.events.iter().map(DiamondEvent::name).collect();
        assert_eq!(names, vec!["OwnershipTransferred", "DiamondCut"]);
    }

    #[tokio::test]
    async fn test_failing_initializer_reverts_cut() {
        let harness = bare_harness();
        let args = DiamondCutArgs::new(vec![FacetCut::add(module_m(), vec![x()])])
            .with_init(module_m(), Bytes(vec![0xde, 0xad, 0xbe, 0xef]));

        let result = cut(&harness, &args).await;

        assert!(matches!(
            result,
            Err(DiamondError::Routing(RoutingError::FunctionNotFound(_)))
        ));
        assert_eq!(resolve(&harness, x()).await, None);
        assert!(harness.service.events().await.is_empty());
    }

    #[tokio::test]
    async fn test_standard_diamond_supports_interfaces() {
        let harness = Harness::two_admins();
        let supports = |id: [u8; 4]| {
            loupe::Function::SupportsInterface.encode_call(&[Token::selector(Selector::new(id))])
        };

        assert!(harness.view_bool(GENESIS, supports([0x01, 0xff, 0xc9, 0xa7])).await);
        assert!(harness.view_bool(GENESIS, supports([0x48, 0xe2, 0xb0, 0x93])).await);
        assert!(harness.view_bool(GENESIS, supports([0x7f, 0x58, 0x28, 0xd0])).await);
        assert!(!harness.view_bool(GENESIS, supports([0xff, 0xff, 0xff, 0xff])).await);
    }
}
