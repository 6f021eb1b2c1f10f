//! Integration test: router macros against a funded pool.
//!
//! 1. Create a vault, fund it from the depositor and stake in one call
//! 2. Reject a stake batch that would exceed the per-position lot cap
//! 3. Roll back a withdraw batch whose second step is invalid
//! 4. Settle a valid withdraw batch

use geyser_integration_tests::{World, BASE_TIME, DAY};
use geyser_router::batch::{self, StakeRequest, WithdrawRequest};
use geyser_router::RouterError;
use geyser_types::MAX_LOTS_PER_POSITION;
use geyser_vault::permission::{Permission, PermissionOp};
use geyser_vault::vault::Vault;
use geyser_vault::VaultError;

#[test]
fn test_router_flow() {
    let mut w = World::new(33, 100, 10 * DAY);
    w.fund(1_000, 20 * DAY, 0);

    let owner = geyser_crypto::ed25519::KeyPair::from_bytes(&[0x42; 32]);
    let depositor = owner.address();
    w.ledger
        .mint(&depositor, &w.staking, 1_000)
        .expect("mint");

    // 1. one-call vault creation and stake
    let vault_id = Vault::derive_id(&owner.verifying_key, b"main");
    let first = Permission::sign(
        &owner.signing_key,
        PermissionOp::Lock,
        vault_id,
        w.pool.id,
        w.staking,
        200,
        0,
    );
    let (mut vault, _) = batch::create_vault_and_stake(
        &mut w.pool,
        &mut w.ledger,
        owner.verifying_key.clone(),
        b"main",
        &depositor,
        &first,
        200,
        BASE_TIME,
    )
    .expect("create and stake");
    assert_eq!(w.pool.total_stake, 200);
    assert_eq!(w.ledger.balance_of(&depositor, &w.staking), 800);

    // 2. lot cap
    w.ledger
        .transfer(&depositor, &vault.id, &w.staking, 100)
        .expect("top up");
    let pool_id = w.pool.id;
    let staking = w.staking;
    let requests: Vec<StakeRequest> = (0..MAX_LOTS_PER_POSITION as u64)
        .map(|i| StakeRequest {
            permission: Permission::sign(
                &owner.signing_key,
                PermissionOp::Lock,
                vault.id,
                pool_id,
                staking,
                1,
                1 + i,
            ),
            amount: 1,
        })
        .collect();
    let before = w.pool.clone();
    let err = batch::stake_multi(&mut w.pool, &w.ledger, &mut vault, &requests, BASE_TIME + DAY)
        .expect_err("lot cap");
    assert!(matches!(
        err,
        RouterError::Engine(geyser_engine::EngineError::Vault(VaultError::TooManyLots { .. }))
    ));
    assert_eq!(w.pool, before);
    assert_eq!(vault.nonce, 1);

    // 3. failing batch rolls back
    let bad = vec![
        WithdrawRequest {
            permission: Permission::sign(
                &owner.signing_key,
                PermissionOp::Unlock,
                vault.id,
                pool_id,
                staking,
                150,
                1,
            ),
            recipient: [0x99; 32],
            amount: 150,
        },
        WithdrawRequest {
            permission: Permission::sign(
                &owner.signing_key,
                PermissionOp::Unlock,
                vault.id,
                pool_id,
                staking,
                100,
                2,
            ),
            recipient: [0x99; 32],
            amount: 100,
        },
    ];
    let ledger_before = w.ledger.clone();
    assert!(batch::withdraw_multi(
        &mut w.pool,
        &mut w.ledger,
        &mut vault,
        &bad,
        BASE_TIME + 20 * DAY
    )
    .is_err());
    assert_eq!(w.ledger, ledger_before);
    assert_eq!(w.pool.total_stake, 200);

    // 4. valid batch settles everything
    let good = vec![
        WithdrawRequest {
            permission: Permission::sign(
                &owner.signing_key,
                PermissionOp::Unlock,
                vault.id,
                pool_id,
                staking,
                150,
                1,
            ),
            recipient: [0x99; 32],
            amount: 150,
        },
        WithdrawRequest {
            permission: Permission::sign(
                &owner.signing_key,
                PermissionOp::Unlock,
                vault.id,
                pool_id,
                staking,
                50,
                2,
            ),
            recipient: [0x99; 32],
            amount: 50,
        },
    ];
    let records = batch::withdraw_multi(
        &mut w.pool,
        &mut w.ledger,
        &mut vault,
        &good,
        BASE_TIME + 20 * DAY,
    )
    .expect("withdraw batch");
    assert_eq!(records.len(), 2);
    assert_eq!(w.pool.total_stake, 0);
    assert_eq!(w.reward_of(&[0x99; 32]), 1_000);
    assert_eq!(w.ledger.balance_of(&[0x99; 32], &w.staking), 200);
}
