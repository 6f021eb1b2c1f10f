//! geyserd: the Geyser pool daemon.

use tracing::{error, info};

use geyser_daemon::config::DaemonConfig;
use geyser_daemon::rpc::RpcServer;
use geyser_daemon::service::unix_now;
use geyser_daemon::DaemonState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Load config
    let config = DaemonConfig::load()?;

    // 2. Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(format!("geyser={}", config.advanced.log_level).parse()?),
        )
        .init();

    info!("Geyser daemon starting");

    let data_dir = config.data_dir();
    std::fs::create_dir_all(&data_dir)?;

    // 3. Open database and restore the pool
    let db = geyser_db::open(&data_dir.join("geyser.db"))?;
    let socket_path = config.socket_path();
    let state = DaemonState::start(config, db, unix_now()).await?;

    if state.config.advanced.dev_commands {
        info!("dev commands enabled");
    }

    // 4. Serve RPC until shutdown
    let rpc_server = RpcServer::new(state.clone(), socket_path.clone());
    info!("Starting JSON-RPC server on {:?}", socket_path);

    let mut shutdown_rx = state.shutdown_tx.subscribe();
    tokio::select! {
        result = rpc_server.run() => {
            if let Err(e) = result {
                error!("RPC server error: {}", e);
            }
        }
        _ = shutdown_rx.recv() => {
            info!("Shutdown signal received");
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Ctrl-C received, shutting down");
        }
    }

    let _ = std::fs::remove_file(&socket_path);
    info!("Daemon stopped");
    Ok(())
}
