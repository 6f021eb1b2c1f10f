//! IPC command handlers.
//!
//! Each submodule implements the commands for one IPC category. Ids,
//! addresses and signatures travel as hex strings; token amounts as
//! decimal strings or plain integers.

pub mod dev;
pub mod pool;
pub mod stats;
pub mod vault;

use serde::Serialize;
use serde_json::Value;

use crate::rpc::RpcError;

type Result<T = Value> = std::result::Result<T, RpcError>;

/// Read a 32-byte hex id.
fn id_param(params: &Value, key: &str) -> Result<[u8; 32]> {
    let text = params
        .get(key)
        .and_then(|v| v.as_str())
        .ok_or_else(|| RpcError::invalid_params(&format!("{key} required")))?;
    let bytes =
        hex::decode(text).map_err(|_| RpcError::invalid_params(&format!("{key} must be hex")))?;
    bytes
        .try_into()
        .map_err(|_| RpcError::invalid_params(&format!("{key} must be 32 bytes")))
}

/// Read a token amount given as a decimal string or an integer.
fn amount_param(params: &Value, key: &str) -> Result<u128> {
    match params.get(key) {
        Some(Value::String(s)) => s
            .parse::<u128>()
            .map_err(|_| RpcError::invalid_params(&format!("{key} must be a decimal amount"))),
        Some(v) => v
            .as_u64()
            .map(u128::from)
            .ok_or_else(|| RpcError::invalid_params(&format!("{key} must be a non-negative integer"))),
        None => Err(RpcError::invalid_params(&format!("{key} required"))),
    }
}

fn u64_param(params: &Value, key: &str) -> Result<u64> {
    params
        .get(key)
        .and_then(|v| v.as_u64())
        .ok_or_else(|| RpcError::invalid_params(&format!("{key} required")))
}

fn str_param<'a>(params: &'a Value, key: &str) -> Result<&'a str> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .ok_or_else(|| RpcError::invalid_params(&format!("{key} required")))
}

/// Evaluation time: the `at` parameter if given, otherwise the wall clock.
fn time_param(params: &Value) -> u64 {
    params
        .get("at")
        .and_then(|v| v.as_u64())
        .unwrap_or_else(crate::service::unix_now)
}

fn to_json<T: Serialize>(value: &T) -> Result {
    serde_json::to_value(value)
        .map_err(|e| RpcError::internal_error(&format!("serialization error: {e}")))
}
