//! Atomic stake and withdraw macros.
//!
//! Each macro clones the pool, vault and token ledger, runs every step on
//! the clones, and writes them back only when the last step succeeds.

use geyser_crypto::ed25519::VerifyingKey;
use geyser_engine::Pool;
use geyser_types::events::SettlementRecord;
use geyser_types::Address;
use geyser_vault::ledger::TokenLedger;
use geyser_vault::permission::Permission;
use geyser_vault::vault::Vault;

use crate::{Result, RouterError};

/// One stake step: a lock permission and its amount.
#[derive(Clone, Debug)]
pub struct StakeRequest {
    pub permission: Permission,
    pub amount: u128,
}

/// One withdraw step.
#[derive(Clone, Debug)]
pub struct WithdrawRequest {
    pub permission: Permission,
    pub recipient: Address,
    pub amount: u128,
}

/// Create a vault for `owner`, move `amount` staking tokens from
/// `depositor` into it, and stake them.
///
/// The lock permission must be signed over the derived vault id and nonce 0.
#[allow(clippy::too_many_arguments)]
pub fn create_vault_and_stake(
    pool: &mut Pool,
    ledger: &mut TokenLedger,
    owner: VerifyingKey,
    salt: &[u8],
    depositor: &Address,
    permission: &Permission,
    amount: u128,
    now: u64,
) -> Result<(Vault, SettlementRecord)> {
    let mut vault = Vault::create(owner, salt);
    let record = deposit_and_stake(
        pool,
        ledger,
        &mut vault,
        depositor,
        permission,
        amount,
        now,
    )?;
    Ok((vault, record))
}

/// Move `amount` staking tokens from `depositor` into an existing vault and
/// stake them.
pub fn deposit_and_stake(
    pool: &mut Pool,
    ledger: &mut TokenLedger,
    vault: &mut Vault,
    depositor: &Address,
    permission: &Permission,
    amount: u128,
    now: u64,
) -> Result<SettlementRecord> {
    let mut staged_ledger = ledger.clone();
    let mut staged_pool = pool.clone();
    let mut staged_vault = vault.clone();

    staged_ledger.transfer(depositor, &staged_vault.id, &staged_pool.staking_asset, amount)?;
    let record = staged_pool.deposit(
        &mut staged_vault,
        &staged_ledger,
        permission,
        amount,
        now,
    )?;

    tracing::info!(amount, "router: deposit and stake");
    *ledger = staged_ledger;
    *pool = staged_pool;
    *vault = staged_vault;
    Ok(record)
}

/// Apply several stakes against one vault, all or nothing.
///
/// Permissions must carry consecutive nonces in request order.
pub fn stake_multi(
    pool: &mut Pool,
    ledger: &TokenLedger,
    vault: &mut Vault,
    requests: &[StakeRequest],
    now: u64,
) -> Result<Vec<SettlementRecord>> {
    if requests.is_empty() {
        return Err(RouterError::EmptyBatch);
    }
    let mut staged_pool = pool.clone();
    let mut staged_vault = vault.clone();

    let mut records = Vec::with_capacity(requests.len());
    for (step, request) in requests.iter().enumerate() {
        let record = staged_pool
            .deposit(
                &mut staged_vault,
                ledger,
                &request.permission,
                request.amount,
                now,
            )
            .inspect_err(|e| tracing::warn!(step, error = %e, "router: stake batch aborted"))?;
        records.push(record);
    }

    tracing::info!(steps = records.len(), "router: stake batch committed");
    *pool = staged_pool;
    *vault = staged_vault;
    Ok(records)
}

/// Apply several withdrawals against one vault, all or nothing.
pub fn withdraw_multi(
    pool: &mut Pool,
    ledger: &mut TokenLedger,
    vault: &mut Vault,
    requests: &[WithdrawRequest],
    now: u64,
) -> Result<Vec<SettlementRecord>> {
    if requests.is_empty() {
        return Err(RouterError::EmptyBatch);
    }
    let mut staged_ledger = ledger.clone();
    let mut staged_pool = pool.clone();
    let mut staged_vault = vault.clone();

    let mut records = Vec::with_capacity(requests.len());
    for (step, request) in requests.iter().enumerate() {
        let record = staged_pool
            .withdraw(
                &mut staged_vault,
                &mut staged_ledger,
                &request.permission,
                request.recipient,
                request.amount,
                now,
            )
            .inspect_err(|e| tracing::warn!(step, error = %e, "router: withdraw batch aborted"))?;
        records.push(record);
    }

    tracing::info!(steps = records.len(), "router: withdraw batch committed");
    *ledger = staged_ledger;
    *pool = staged_pool;
    *vault = staged_vault;
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use geyser_crypto::ed25519::KeyPair;
    use geyser_engine::{PoolConfig, ScalingParams};
    use geyser_vault::ledger::asset_id;
    use geyser_vault::permission::PermissionOp;

    const ADMIN: Address = [0xAD; 32];

    struct Setup {
        pool: Pool,
        ledger: TokenLedger,
        owner: KeyPair,
    }

    fn setup() -> Setup {
        let mut pool = Pool::create(
            PoolConfig {
                admin: ADMIN,
                staking_asset: asset_id("UNI-V2"),
                reward_asset: asset_id("AMPL"),
                scaling: ScalingParams::new(33, 100, 100).expect("scaling"),
            },
            0,
        )
        .expect("pool");
        let owner = KeyPair::from_bytes(&[0x11; 32]);
        let mut ledger = TokenLedger::new();
        ledger
            .mint(&owner.address(), &pool.staking_asset, 1_000)
            .expect("mint stake");
        ledger
            .mint(&ADMIN, &pool.reward_asset, 1_000)
            .expect("mint reward");
        pool.fund(&ADMIN, &mut ledger, 1_000, 100, 0).expect("fund");
        Setup {
            pool,
            ledger,
            owner,
        }
    }

    fn sign(s: &Setup, vault: &Vault, op: PermissionOp, amount: u128, nonce: u64) -> Permission {
        Permission::sign(
            &s.owner.signing_key,
            op,
            vault.id,
            s.pool.id,
            s.pool.staking_asset,
            amount,
            nonce,
        )
    }

    #[test]
    fn test_create_vault_and_stake() {
        let mut s = setup();
        let vault_id = Vault::derive_id(&s.owner.verifying_key, b"v1");
        let permission = Permission::sign(
            &s.owner.signing_key,
            PermissionOp::Lock,
            vault_id,
            s.pool.id,
            s.pool.staking_asset,
            400,
            0,
        );
        let depositor = s.owner.address();
        let (vault, _) = create_vault_and_stake(
            &mut s.pool,
            &mut s.ledger,
            s.owner.verifying_key.clone(),
            b"v1",
            &depositor,
            &permission,
            400,
            5,
        )
        .expect("macro");

        assert_eq!(vault.id, vault_id);
        assert_eq!(vault.staked(&s.pool.id, &s.pool.staking_asset), 400);
        assert_eq!(s.pool.total_stake, 400);
        assert_eq!(
            s.ledger.balance_of(&depositor, &s.pool.staking_asset),
            600
        );
    }

    #[test]
    fn test_bad_permission_undoes_token_move() {
        let mut s = setup();
        let mut vault = Vault::create(s.owner.verifying_key.clone(), b"v1");
        let permission = sign(&s, &vault, PermissionOp::Lock, 400, 7);
        let depositor = s.owner.address();
        let ledger_before = s.ledger.clone();
        let pool_before = s.pool.clone();

        assert!(deposit_and_stake(
            &mut s.pool,
            &mut s.ledger,
            &mut vault,
            &depositor,
            &permission,
            400,
            5
        )
        .is_err());
        assert_eq!(s.ledger, ledger_before);
        assert_eq!(s.pool, pool_before);
    }

    #[test]
    fn test_stake_multi_all_or_nothing() {
        let mut s = setup();
        let mut vault = Vault::create(s.owner.verifying_key.clone(), b"v1");
        let depositor = s.owner.address();
        let staking = s.pool.staking_asset;
        s.ledger
            .transfer(&depositor, &vault.id, &staking, 100)
            .expect("fund vault");

        let requests = vec![
            StakeRequest {
                permission: sign(&s, &vault, PermissionOp::Lock, 60, 0),
                amount: 60,
            },
            StakeRequest {
                permission: sign(&s, &vault, PermissionOp::Lock, 60, 1),
                amount: 60,
            },
        ];
        assert!(stake_multi(&mut s.pool, &s.ledger, &mut vault, &requests, 1).is_err());
        assert_eq!(s.pool.total_stake, 0);
        assert_eq!(vault.nonce, 0);

        let requests = vec![
            StakeRequest {
                permission: sign(&s, &vault, PermissionOp::Lock, 60, 0),
                amount: 60,
            },
            StakeRequest {
                permission: sign(&s, &vault, PermissionOp::Lock, 40, 1),
                amount: 40,
            },
        ];
        let records =
            stake_multi(&mut s.pool, &s.ledger, &mut vault, &requests, 1).expect("batch");
        assert_eq!(records.len(), 2);
        assert_eq!(s.pool.total_stake, 100);
        assert_eq!(vault.nonce, 2);
    }

    #[test]
    fn test_withdraw_multi_all_or_nothing() {
        let mut s = setup();
        let mut vault = Vault::create(s.owner.verifying_key.clone(), b"v1");
        let depositor = s.owner.address();
        let permission = sign(&s, &vault, PermissionOp::Lock, 100, 0);
        deposit_and_stake(
            &mut s.pool,
            &mut s.ledger,
            &mut vault,
            &depositor,
            &permission,
            100,
            0,
        )
        .expect("stake");

        let recipient = [0x99; 32];
        let bad = vec![
            WithdrawRequest {
                permission: sign(&s, &vault, PermissionOp::Unlock, 50, 1),
                recipient,
                amount: 50,
            },
            WithdrawRequest {
                permission: sign(&s, &vault, PermissionOp::Unlock, 60, 2),
                recipient,
                amount: 60,
            },
        ];
        let ledger_before = s.ledger.clone();
        assert!(withdraw_multi(&mut s.pool, &mut s.ledger, &mut vault, &bad, 100).is_err());
        assert_eq!(s.ledger, ledger_before);
        assert_eq!(s.pool.total_stake, 100);

        let good = vec![
            WithdrawRequest {
                permission: sign(&s, &vault, PermissionOp::Unlock, 50, 1),
                recipient,
                amount: 50,
            },
            WithdrawRequest {
                permission: sign(&s, &vault, PermissionOp::Unlock, 50, 2),
                recipient,
                amount: 50,
            },
        ];
        withdraw_multi(&mut s.pool, &mut s.ledger, &mut vault, &good, 100).expect("batch");
        assert_eq!(s.pool.total_stake, 0);
        assert_eq!(s.ledger.balance_of(&recipient, &s.pool.staking_asset), 100);
        assert_eq!(s.ledger.balance_of(&recipient, &s.pool.reward_asset), 1_000);
    }

    #[test]
    fn test_empty_batch_rejected() {
        let mut s = setup();
        let mut vault = Vault::create(s.owner.verifying_key.clone(), b"v1");
        assert!(matches!(
            stake_multi(&mut s.pool, &s.ledger, &mut vault, &[], 0),
            Err(RouterError::EmptyBatch)
        ));
    }
}
