//! Projection and history handlers. All read-only.

use std::sync::Arc;

use serde_json::Value;

use super::{amount_param, id_param, time_param, to_json, u64_param, Result};
use crate::events::EventFilter;
use crate::rpc::RpcError;
use crate::service::unix_now;
use crate::DaemonState;

const DEFAULT_HISTORY_LIMIT: u32 = 100;

pub async fn multiplier_at(state: &Arc<DaemonState>, params: &Value) -> Result {
    let duration = u64_param(params, "duration_secs")?;
    let bps = state.service.multiplier_at(duration).await?;
    Ok(serde_json::json!({ "multiplier_bps": bps }))
}

/// Reward of a hypothetical new deposit held for `duration_secs`.
pub async fn projected_reward(state: &Arc<DaemonState>, params: &Value) -> Result {
    let amount = amount_param(params, "amount")?;
    let duration = u64_param(params, "duration_secs")?;
    let projection = state
        .service
        .projected_reward(amount, duration, unix_now())
        .await?;
    to_json(&projection)
}

/// Reward a full withdrawal of the vault would pay at `at`.
pub async fn vault_reward(state: &Arc<DaemonState>, params: &Value) -> Result {
    let vault = id_param(params, "vault")?;
    let projection = state
        .service
        .vault_reward(&vault, time_param(params))
        .await?;
    to_json(&projection)
}

/// Optional `kinds` (record kind names) and `vault` filters.
fn filter_param(params: &Value) -> Result<EventFilter> {
    let kinds = match params.get("kinds") {
        None | Some(Value::Null) => None,
        Some(v) => Some(
            serde_json::from_value::<Vec<String>>(v.clone())
                .map_err(|_| RpcError::invalid_params("kinds must be an array of strings"))?,
        ),
    };
    let vault = match params.get("vault") {
        None | Some(Value::Null) => None,
        Some(_) => Some(id_param(params, "vault")?),
    };
    Ok(EventFilter { kinds, vault })
}

/// Newest records first, optionally filtered by kind or vault.
pub async fn recent_settlements(state: &Arc<DaemonState>, params: &Value) -> Result {
    let limit = params
        .get("limit")
        .and_then(|v| v.as_u64())
        .and_then(|v| u32::try_from(v).ok())
        .unwrap_or(DEFAULT_HISTORY_LIMIT);
    let filter = filter_param(params)?;
    let records = if filter.is_empty() {
        state.service.recent_settlements(limit).await?
    } else {
        state
            .service
            .settlement_log()
            .await?
            .into_iter()
            .rev()
            .filter(|r| filter.matches(r))
            .take(limit as usize)
            .collect()
    };
    to_json(&records)
}

/// Pool-wide totals from the read model.
pub async fn index_summary(state: &Arc<DaemonState>) -> Result {
    let indexer = state.indexer.read().await;
    let mut value = to_json(indexer.summary())?;
    value["event_sequence"] = serde_json::json!(state.event_bus.sequence());
    Ok(value)
}
