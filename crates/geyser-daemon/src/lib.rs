//! geyser-daemon: serves one Geyser pool.
//!
//! A single Tokio process owns the pool, its vaults and the token book
//! behind a [`service::PoolService`]. Clients talk to it with JSON-RPC over
//! a Unix socket. Committed settlement records are persisted, broadcast on
//! the [`events::EventBus`] and folded into the [`indexer::Indexer`] read
//! model.

pub mod commands;
pub mod config;
pub mod events;
pub mod indexer;
pub mod rpc;
pub mod service;

use std::sync::Arc;

use tokio::sync::{broadcast, RwLock};

use crate::config::DaemonConfig;
use crate::events::EventBus;
use crate::indexer::Indexer;
use crate::service::PoolService;

/// Daemon-wide shared state.
pub struct DaemonState {
    /// The pool and everything staked in it.
    pub service: Arc<PoolService>,
    /// Configuration.
    pub config: DaemonConfig,
    /// Event bus for pushing settlement records to subscribers.
    pub event_bus: EventBus,
    /// Non-authoritative read model.
    pub indexer: Arc<RwLock<Indexer>>,
    /// Shutdown signal sender.
    pub shutdown_tx: broadcast::Sender<()>,
}

impl DaemonState {
    /// Open the pool from `db`, rebuild the read model from the stored log
    /// and start following the event bus.
    ///
    /// Must be called inside a Tokio runtime.
    pub async fn start(
        config: DaemonConfig,
        db: rusqlite::Connection,
        now: u64,
    ) -> anyhow::Result<Arc<Self>> {
        let admin = config.pool.admin_address()?;
        let event_bus = EventBus::new(config.rpc.event_capacity);
        let rx = event_bus.subscribe();

        let service = Arc::new(PoolService::open(
            db,
            &config.pool,
            admin,
            event_bus.clone(),
            now,
        )?);
        let log = service.settlement_log().await?;
        let indexer = Arc::new(RwLock::new(Indexer::replay(&log)));
        tracing::info!(records = log.len(), "read model rebuilt");
        tokio::spawn(crate::indexer::run(indexer.clone(), rx, service.clone()));

        let (shutdown_tx, _) = broadcast::channel(1);
        Ok(Arc::new(Self {
            service,
            config,
            event_bus,
            indexer,
            shutdown_tx,
        }))
    }
}
