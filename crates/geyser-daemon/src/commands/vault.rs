//! Vault command handlers.
//!
//! Deposit and withdraw accept either one step inline or a `steps` array
//! applied all or nothing. Each step carries the owner's signature over the
//! permission digest for the vault's next nonce; the delegate is always
//! this pool and the asset its staking token.

use std::sync::Arc;

use geyser_crypto::ed25519::{Signature, VerifyingKey};
use geyser_router::batch::{StakeRequest, WithdrawRequest};
use geyser_types::{PoolId, VaultId};
use geyser_vault::permission::{Permission, PermissionOp};
use serde_json::Value;

use super::{amount_param, id_param, str_param, to_json, u64_param, Result};
use crate::rpc::RpcError;
use crate::service::unix_now;
use crate::DaemonState;

/// Register an empty vault for `owner` (hex public key).
pub async fn create_vault(state: &Arc<DaemonState>, params: &Value) -> Result {
    let owner = VerifyingKey::from_hex(str_param(params, "owner")?)
        .map_err(|_| RpcError::invalid_params("owner must be a hex Ed25519 public key"))?;
    let salt = params.get("salt").and_then(|v| v.as_str()).unwrap_or("");
    let vault = state
        .service
        .create_vault(owner, salt.as_bytes(), unix_now())
        .await?;
    Ok(serde_json::json!({
        "vault_id": hex::encode(vault.id),
        "owner_address": hex::encode(vault.owner_address()),
        "nonce": vault.nonce,
    }))
}

/// Vault snapshot plus its indexed history.
pub async fn vault_status(state: &Arc<DaemonState>, params: &Value) -> Result {
    let id = id_param(params, "vault")?;
    let vault = state.service.vault(&id).await?;
    let pool = state.service.pool().await;
    let free = state.service.balance_of(&id, &pool.staking_asset).await;
    let summary = state.indexer.read().await.vault(&id).cloned();
    Ok(serde_json::json!({
        "vault": to_json(&vault)?,
        "staked": vault.staked(&pool.id, &pool.staking_asset).to_string(),
        "balance": free.to_string(),
        "history": to_json(&summary)?,
    }))
}

pub async fn deposit(state: &Arc<DaemonState>, params: &Value) -> Result {
    let vault = id_param(params, "vault")?;
    let pool = state.service.pool().await;
    let requests = steps(params)?
        .iter()
        .map(|step| {
            let amount = amount_param(step, "amount")?;
            Ok(StakeRequest {
                permission: permission(
                    step,
                    PermissionOp::Lock,
                    vault,
                    pool.id,
                    pool.staking_asset,
                    amount,
                )?,
                amount,
            })
        })
        .collect::<Result<Vec<_>>>()?;
    let records = state.service.deposit(&vault, &requests, unix_now()).await?;
    to_json(&records)
}

pub async fn withdraw(state: &Arc<DaemonState>, params: &Value) -> Result {
    let vault = id_param(params, "vault")?;
    let pool = state.service.pool().await;
    let requests = steps(params)?
        .iter()
        .map(|step| {
            let amount = amount_param(step, "amount")?;
            Ok(WithdrawRequest {
                permission: permission(
                    step,
                    PermissionOp::Unlock,
                    vault,
                    pool.id,
                    pool.staking_asset,
                    amount,
                )?,
                recipient: id_param(step, "recipient")?,
                amount,
            })
        })
        .collect::<Result<Vec<_>>>()?;
    let records = state.service.withdraw(&vault, &requests, unix_now()).await?;
    to_json(&records)
}

/// Owner-forced release without reward.
pub async fn rage_quit(state: &Arc<DaemonState>, params: &Value) -> Result {
    let vault = id_param(params, "vault")?;
    let caller = id_param(params, "caller")?;
    let record = state.service.rage_quit(&vault, &caller, unix_now()).await?;
    to_json(&record)
}

/// The `steps` array, or the params object itself as a single step.
fn steps(params: &Value) -> Result<Vec<Value>> {
    match params.get("steps") {
        Some(Value::Array(steps)) => Ok(steps.clone()),
        Some(_) => Err(RpcError::invalid_params("steps must be an array")),
        None => Ok(vec![params.clone()]),
    }
}

fn permission(
    step: &Value,
    op: PermissionOp,
    vault: VaultId,
    delegate: PoolId,
    asset: [u8; 32],
    amount: u128,
) -> Result<Permission> {
    let nonce = u64_param(step, "nonce")?;
    let signature = Signature::from_hex(str_param(step, "signature")?)
        .map_err(|_| RpcError::invalid_params("signature must be 64 bytes of hex"))?;
    Ok(Permission {
        op,
        vault,
        delegate,
        asset,
        amount,
        nonce,
        signature,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_step_form() {
        let params = serde_json::json!({ "vault": "00", "amount": 5, "nonce": 0 });
        let s = steps(&params).expect("steps");
        assert_eq!(s.len(), 1);
        assert_eq!(amount_param(&s[0], "amount").expect("amount"), 5);
    }

    #[test]
    fn test_steps_must_be_array() {
        assert!(steps(&serde_json::json!({ "steps": 3 })).is_err());
        let s = steps(&serde_json::json!({ "steps": [{}, {}] })).expect("steps");
        assert_eq!(s.len(), 2);
    }

    #[test]
    fn test_permission_requires_signature() {
        let step = serde_json::json!({ "nonce": 0, "signature": "zz" });
        assert!(permission(&step, PermissionOp::Lock, [0; 32], [1; 32], [2; 32], 1).is_err());
        let step = serde_json::json!({ "nonce": 0, "signature": "00".repeat(64) });
        let p = permission(&step, PermissionOp::Lock, [0; 32], [1; 32], [2; 32], 1)
            .expect("permission");
        assert_eq!(p.delegate, [1; 32]);
        assert_eq!(p.nonce, 0);
    }
}
