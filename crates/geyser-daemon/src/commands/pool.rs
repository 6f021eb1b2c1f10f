//! Pool command handlers.

use std::sync::Arc;

use geyser_types::LifecycleState;
use geyser_vault::ledger::asset_id;
use serde_json::Value;

use super::{amount_param, id_param, str_param, time_param, to_json, u64_param, Result};
use crate::rpc::RpcError;
use crate::service::unix_now;
use crate::DaemonState;

/// Pool-wide stats at `at` (default now).
pub async fn pool_status(state: &Arc<DaemonState>, params: &Value) -> Result {
    let stats = state.service.stats(time_param(params)).await?;
    let pool = state.service.pool().await;
    Ok(serde_json::json!({
        "stats": to_json(&stats)?,
        "staking_asset": hex::encode(pool.staking_asset),
        "reward_asset": hex::encode(pool.reward_asset),
        "bonus_assets": pool.bonus_assets.iter().map(hex::encode).collect::<Vec<_>>(),
        "scaling": to_json(&pool.scaling)?,
    }))
}

/// Append a reward schedule.
pub async fn fund(state: &Arc<DaemonState>, params: &Value) -> Result {
    let caller = id_param(params, "caller")?;
    let amount = amount_param(params, "amount")?;
    let duration = u64_param(params, "duration_secs")?;
    let record = state
        .service
        .fund(&caller, amount, duration, unix_now())
        .await?;
    to_json(&record)
}

pub async fn set_lifecycle(state: &Arc<DaemonState>, params: &Value) -> Result {
    let caller = id_param(params, "caller")?;
    let target = str_param(params, "state")?;
    let target = LifecycleState::parse(target)
        .ok_or_else(|| RpcError::invalid_params("state must be online/offline/shutdown"))?;
    let record = state
        .service
        .set_lifecycle(&caller, target, unix_now())
        .await?;
    to_json(&record)
}

/// Register a bonus asset by label.
pub async fn register_bonus(state: &Arc<DaemonState>, params: &Value) -> Result {
    let caller = id_param(params, "caller")?;
    let asset = asset_id(str_param(params, "asset")?);
    let record = state
        .service
        .register_bonus(&caller, asset, unix_now())
        .await?;
    to_json(&record)
}

/// Return stray tokens held by the pool.
pub async fn rescue_tokens(state: &Arc<DaemonState>, params: &Value) -> Result {
    let caller = id_param(params, "caller")?;
    let asset = asset_id(str_param(params, "asset")?);
    let recipient = id_param(params, "recipient")?;
    let amount = amount_param(params, "amount")?;
    let record = state
        .service
        .rescue_tokens(&caller, asset, recipient, amount, unix_now())
        .await?;
    to_json(&record)
}
