//! Dev-only commands, enabled by `advanced.dev_commands`.

use std::sync::Arc;

use geyser_crypto::ed25519::KeyPair;
use geyser_vault::ledger::asset_id;
use serde_json::Value;

use super::{amount_param, id_param, str_param, Result};
use crate::rpc::RpcError;
use crate::DaemonState;

fn require_dev(state: &DaemonState) -> Result<()> {
    if state.config.advanced.dev_commands {
        Ok(())
    } else {
        Err(RpcError::dev_disabled())
    }
}

/// Credit tokens to any holder.
pub async fn dev_mint(state: &Arc<DaemonState>, params: &Value) -> Result {
    require_dev(state)?;
    let holder = id_param(params, "holder")?;
    let asset = asset_id(str_param(params, "asset")?);
    let amount = amount_param(params, "amount")?;
    state.service.mint(&holder, &asset, amount).await?;
    let balance = state.service.balance_of(&holder, &asset).await;
    Ok(serde_json::json!({ "balance": balance.to_string() }))
}

/// Simulate an elastic-supply adjustment of one asset.
pub async fn dev_rebase(state: &Arc<DaemonState>, params: &Value) -> Result {
    require_dev(state)?;
    let asset = asset_id(str_param(params, "asset")?);
    let numerator = amount_param(params, "numerator")?;
    let denominator = amount_param(params, "denominator")?;
    state
        .service
        .rebase(&asset, numerator, denominator)
        .await?;
    tracing::info!(asset = %hex::encode(&asset[..4]), numerator, denominator, "dev rebase");
    Ok(serde_json::json!({ "status": "rebased" }))
}

/// Generate a fresh owner keypair for test clients.
///
/// The secret key is returned in the clear, so this stays behind the dev
/// switch.
pub async fn dev_keygen(state: &Arc<DaemonState>) -> Result {
    require_dev(state)?;
    let keypair = KeyPair::generate();
    tracing::debug!(address = %hex::encode(&keypair.address()[..4]), "dev keypair generated");
    Ok(serde_json::json!({
        "secret_key": hex::encode(keypair.signing_key.to_bytes()),
        "public_key": hex::encode(keypair.verifying_key.to_bytes()),
        "address": hex::encode(keypair.address()),
    }))
}
