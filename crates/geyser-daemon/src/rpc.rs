//! JSON-RPC 2.0 server over a Unix socket.
//!
//! One request per line, one response per line. Requests are dispatched to
//! the command handlers; each handler maps service failures onto the error
//! codes below.

use std::path::PathBuf;
use std::sync::Arc;

use geyser_engine::EngineError;
use geyser_router::RouterError;
use geyser_vault::VaultError;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixListener;
use tracing::{debug, error, info, warn};

use crate::commands;
use crate::service::ServiceError;
use crate::DaemonState;

/// JSON-RPC request.
#[derive(Debug, Deserialize)]
pub struct RpcRequest {
    /// JSON-RPC version (must be "2.0").
    pub jsonrpc: String,
    /// Request ID.
    pub id: serde_json::Value,
    /// Method name.
    pub method: String,
    /// Parameters.
    #[serde(default)]
    pub params: serde_json::Value,
}

/// JSON-RPC response.
#[derive(Debug, Serialize)]
pub struct RpcResponse {
    /// JSON-RPC version.
    pub jsonrpc: String,
    /// Request ID.
    pub id: serde_json::Value,
    /// Result or error.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

/// JSON-RPC error object.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RpcError {
    pub code: i32,
    /// Error name.
    pub message: String,
    /// Optional structured data.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl RpcResponse {
    /// Create a success response.
    pub fn success(id: serde_json::Value, result: serde_json::Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    /// Create an error response.
    pub fn error(id: serde_json::Value, error: RpcError) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: None,
            error: Some(error),
        }
    }
}

impl RpcError {
    fn new(code: i32, message: &str, detail: Option<String>) -> Self {
        Self {
            code,
            message: message.to_string(),
            data: detail.map(|d| serde_json::json!({ "detail": d })),
        }
    }

    // Standard JSON-RPC errors

    /// Parse error (-32700).
    pub fn parse_error() -> Self {
        Self::new(-32700, "PARSE_ERROR", None)
    }

    /// Invalid request (-32600).
    pub fn invalid_request() -> Self {
        Self::new(-32600, "INVALID_REQUEST", None)
    }

    /// Method not found (-32601).
    pub fn method_not_found(method: &str) -> Self {
        Self {
            code: -32601,
            message: "METHOD_NOT_FOUND".to_string(),
            data: Some(serde_json::json!({"method": method})),
        }
    }

    /// Invalid params (-32602).
    pub fn invalid_params(detail: &str) -> Self {
        Self::new(-32602, "INVALID_PARAMS", Some(detail.to_string()))
    }

    /// Internal error (-32603).
    pub fn internal_error(detail: &str) -> Self {
        Self::new(-32603, "INTERNAL_ERROR", Some(detail.to_string()))
    }

    // Pool errors

    /// Authorization failure (-32020).
    pub fn unauthorized(detail: String) -> Self {
        Self::new(-32020, "UNAUTHORIZED", Some(detail))
    }

    /// Pool not accepting the operation (-32030).
    pub fn pool_state(detail: String) -> Self {
        Self::new(-32030, "POOL_STATE", Some(detail))
    }

    /// Insufficient balance or stake (-32040).
    pub fn insufficient_balance(detail: String) -> Self {
        Self::new(-32040, "INSUFFICIENT_BALANCE", Some(detail))
    }

    /// Rejected request (-32041).
    pub fn rejected(detail: String) -> Self {
        Self::new(-32041, "REJECTED", Some(detail))
    }

    /// Arithmetic failure (-32050).
    pub fn arithmetic(detail: String) -> Self {
        Self::new(-32050, "ARITHMETIC", Some(detail))
    }

    /// Accounting inconsistency (-32051).
    pub fn insolvent(detail: String) -> Self {
        Self::new(-32051, "INSOLVENT", Some(detail))
    }

    /// Unknown vault (-32060).
    pub fn unknown_vault(detail: String) -> Self {
        Self::new(-32060, "UNKNOWN_VAULT", Some(detail))
    }

    /// Dev commands disabled (-32070).
    pub fn dev_disabled() -> Self {
        Self::new(-32070, "DEV_COMMANDS_DISABLED", None)
    }
}

impl From<VaultError> for RpcError {
    fn from(e: VaultError) -> Self {
        let detail = e.to_string();
        match e {
            VaultError::InvalidSignature
            | VaultError::StaleNonce { .. }
            | VaultError::PermissionMismatch(_)
            | VaultError::NotOwner
            | VaultError::NotLockHolder => Self::unauthorized(detail),
            VaultError::InsufficientBalance { .. }
            | VaultError::InsufficientFreeBalance { .. }
            | VaultError::InsufficientStake { .. } => Self::insufficient_balance(detail),
            VaultError::Overflow | VaultError::Accrual(_) => Self::arithmetic(detail),
            VaultError::ZeroAmount | VaultError::TooManyLots { .. } | VaultError::InvalidRebase { .. } => {
                Self::rejected(detail)
            }
        }
    }
}

impl From<EngineError> for RpcError {
    fn from(e: EngineError) -> Self {
        let detail = e.to_string();
        match e {
            EngineError::Vault(inner) => inner.into(),
            EngineError::NotAdmin => Self::unauthorized(detail),
            EngineError::NotOnline(_) | EngineError::InvalidTransition { .. } => {
                Self::pool_state(detail)
            }
            EngineError::ZeroAmount
            | EngineError::ZeroDuration
            | EngineError::InvalidScaling(_)
            | EngineError::DuplicateBonus
            | EngineError::ProtectedAsset => Self::rejected(detail),
            EngineError::Overflow
            | EngineError::Underflow
            | EngineError::DivisionByZero
            | EngineError::Accrual(_) => Self::arithmetic(detail),
            EngineError::Insolvent { .. } => Self::insolvent(detail),
        }
    }
}

impl From<ServiceError> for RpcError {
    fn from(e: ServiceError) -> Self {
        match e {
            ServiceError::Engine(inner) | ServiceError::Router(RouterError::Engine(inner)) => {
                inner.into()
            }
            ServiceError::Vault(inner) | ServiceError::Router(RouterError::Vault(inner)) => {
                inner.into()
            }
            ServiceError::Router(RouterError::EmptyBatch) => {
                Self::invalid_params("at least one step required")
            }
            ServiceError::UnknownVault(id) => Self::unknown_vault(id),
            ServiceError::VaultExists(id) => Self::rejected(format!("vault {id} already exists")),
            ServiceError::Db(inner) => {
                error!("database error: {inner}");
                Self::internal_error(&format!("db error: {inner}"))
            }
        }
    }
}

/// The RPC server.
pub struct RpcServer {
    state: Arc<DaemonState>,
    socket_path: PathBuf,
}

impl RpcServer {
    /// Create a new RPC server.
    pub fn new(state: Arc<DaemonState>, socket_path: PathBuf) -> Self {
        Self { state, socket_path }
    }

    /// Run the server, accepting connections.
    pub async fn run(&self) -> anyhow::Result<()> {
        // Remove stale socket file
        let _ = std::fs::remove_file(&self.socket_path);

        let listener = UnixListener::bind(&self.socket_path)?;
        info!("IPC server listening on {:?}", self.socket_path);

        loop {
            match listener.accept().await {
                Ok((stream, _addr)) => {
                    let state = self.state.clone();
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(state, stream).await {
                            warn!("Connection error: {}", e);
                        }
                    });
                }
                Err(e) => {
                    error!("Accept error: {}", e);
                }
            }
        }
    }
}

/// Handle a single client connection.
async fn handle_connection(
    state: Arc<DaemonState>,
    stream: tokio::net::UnixStream,
) -> anyhow::Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);
    let mut line = String::new();

    loop {
        line.clear();
        let bytes_read = reader.read_line(&mut line).await?;
        if bytes_read == 0 {
            break; // EOF
        }

        let response = handle_line(&state, &line).await;
        let mut response_json = serde_json::to_string(&response)?;
        response_json.push('\n');
        writer.write_all(response_json.as_bytes()).await?;
        writer.flush().await?;
    }

    Ok(())
}

/// Parse and dispatch one request line.
pub async fn handle_line(state: &Arc<DaemonState>, line: &str) -> RpcResponse {
    match serde_json::from_str::<RpcRequest>(line) {
        Ok(request) if request.jsonrpc == "2.0" => dispatch_request(state, request).await,
        Ok(request) => RpcResponse::error(request.id, RpcError::invalid_request()),
        Err(_) => RpcResponse::error(serde_json::Value::Null, RpcError::parse_error()),
    }
}

/// Dispatch a JSON-RPC request to the appropriate command handler.
async fn dispatch_request(state: &Arc<DaemonState>, request: RpcRequest) -> RpcResponse {
    let id = request.id.clone();
    let method = request.method.as_str();
    let params = &request.params;

    debug!("Dispatching RPC method: {}", method);

    let result = match method {
        // Pool
        "pool_status" => commands::pool::pool_status(state, params).await,
        "fund" => commands::pool::fund(state, params).await,
        "set_lifecycle" => commands::pool::set_lifecycle(state, params).await,
        "register_bonus" => commands::pool::register_bonus(state, params).await,
        "rescue_tokens" => commands::pool::rescue_tokens(state, params).await,

        // Vaults
        "create_vault" => commands::vault::create_vault(state, params).await,
        "vault_status" => commands::vault::vault_status(state, params).await,
        "deposit" => commands::vault::deposit(state, params).await,
        "withdraw" => commands::vault::withdraw(state, params).await,
        "rage_quit" => commands::vault::rage_quit(state, params).await,

        // Projections and history
        "multiplier_at" => commands::stats::multiplier_at(state, params).await,
        "projected_reward" => commands::stats::projected_reward(state, params).await,
        "vault_reward" => commands::stats::vault_reward(state, params).await,
        "recent_settlements" => commands::stats::recent_settlements(state, params).await,
        "index_summary" => commands::stats::index_summary(state).await,

        // Dev-only commands
        "dev_mint" => commands::dev::dev_mint(state, params).await,
        "dev_rebase" => commands::dev::dev_rebase(state, params).await,
        "dev_keygen" => commands::dev::dev_keygen(state).await,

        _ => Err(RpcError::method_not_found(method)),
    };

    match result {
        Ok(value) => RpcResponse::success(id, value),
        Err(err) => RpcResponse::error(id, err),
    }
}
