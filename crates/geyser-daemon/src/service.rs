//! Serialized pool service.
//!
//! One [`PoolService`] owns one pool together with the vaults staked in it
//! and the token book. A single async mutex guards all of it, so every
//! operation, read or write, sees a consistent snapshot and writes are
//! applied one at a time.
//!
//! Every mutation runs against staged copies. The staged state is written
//! to the database in one transaction and only then swapped in, so memory
//! and disk never disagree. Committed settlement records are then emitted
//! on the event bus.

use std::collections::BTreeMap;

use geyser_crypto::ed25519::VerifyingKey;
use geyser_db::queries;
use geyser_engine::{EngineError, Pool, PoolConfig, ScalingParams};
use geyser_router::batch::{self, StakeRequest, WithdrawRequest};
use geyser_router::RouterError;
use geyser_types::events::{SettlementKind, SettlementRecord};
use geyser_types::stats::{PoolStats, RewardProjection};
use geyser_types::{Address, AssetId, LifecycleState, PoolId, VaultId};
use geyser_vault::ledger::{asset_id, TokenLedger};
use geyser_vault::vault::Vault;
use geyser_vault::VaultError;
use rusqlite::Connection;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::config::PoolSettings;
use crate::events::EventBus;

/// Error types for service operations.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Vault(#[from] VaultError),

    #[error(transparent)]
    Router(#[from] RouterError),

    #[error(transparent)]
    Db(#[from] geyser_db::DbError),

    #[error("unknown vault {0}")]
    UnknownVault(String),

    #[error("vault {0} already exists")]
    VaultExists(String),
}

pub type Result<T> = std::result::Result<T, ServiceError>;

/// Seconds since the Unix epoch.
pub fn unix_now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

struct ServiceState {
    pool: Pool,
    vaults: BTreeMap<VaultId, Vault>,
    ledger: TokenLedger,
    db: Connection,
}

/// Staged result of one mutation.
struct Staged {
    pool: Pool,
    vault: Option<Vault>,
    ledger: TokenLedger,
    records: Vec<SettlementRecord>,
}

impl ServiceState {
    fn vault(&self, id: &VaultId) -> Result<&Vault> {
        self.vaults
            .get(id)
            .ok_or_else(|| ServiceError::UnknownVault(hex::encode(id)))
    }

    /// Persist `staged` in one transaction, then swap it in.
    fn commit(&mut self, staged: Staged, now: u64) -> Result<Vec<SettlementRecord>> {
        persist(&mut self.db, &staged, now)?;
        self.pool = staged.pool;
        self.ledger = staged.ledger;
        if let Some(vault) = staged.vault {
            self.vaults.insert(vault.id, vault);
        }
        Ok(staged.records)
    }
}

fn persist(db: &mut Connection, staged: &Staged, now: u64) -> geyser_db::Result<()> {
    let tx = db.transaction()?;
    queries::pools::save_pool(&tx, &staged.pool, now)?;
    if let Some(vault) = &staged.vault {
        queries::vaults::save_vault(&tx, vault, now)?;
    }
    queries::balances::save_ledger(&tx, &staged.ledger)?;

    let funded = staged
        .records
        .iter()
        .filter(|r| matches!(r.kind, SettlementKind::Funded { .. }))
        .count();
    let schedules = staged.pool.funding.schedules();
    for schedule in &schedules[schedules.len().saturating_sub(funded)..] {
        queries::schedules::append_schedule(&tx, &staged.pool.id, schedule)?;
    }
    for record in &staged.records {
        queries::settlements::append_settlement(&tx, record)?;
    }
    tx.commit()?;
    Ok(())
}

/// One pool and its vaults behind a single writer.
pub struct PoolService {
    state: Mutex<ServiceState>,
    events: EventBus,
}

impl PoolService {
    /// Restore the pool from `db`, or create it from `settings` if the
    /// database holds none.
    pub fn open(
        mut db: Connection,
        settings: &PoolSettings,
        admin: Address,
        events: EventBus,
        now: u64,
    ) -> Result<Self> {
        let pools = queries::pools::load_pools(&db)?;
        let ledger = queries::balances::load_ledger(&db)?;
        if pools.len() > 1 {
            warn!(pools = pools.len(), "database holds several pools, serving the newest");
        }

        let (pool, ledger) = if let Some(pool) = pools.into_iter().next() {
            info!(
                pool = %hex::encode(&pool.id[..4]),
                lifecycle = %pool.lifecycle,
                total_stake = pool.total_stake,
                "pool restored"
            );
            (pool, ledger)
        } else {
            let scaling = ScalingParams::new(
                settings.floor_pct,
                settings.ceiling_pct,
                settings.ramp_duration_secs,
            )?;
            let mut pool = Pool::create(
                PoolConfig {
                    admin,
                    staking_asset: asset_id(&settings.staking_asset),
                    reward_asset: asset_id(&settings.reward_asset),
                    scaling,
                },
                now,
            )?;
            let mut records = Vec::with_capacity(settings.bonus_assets.len());
            for label in &settings.bonus_assets {
                records.push(pool.register_bonus_asset(&admin, asset_id(label), now)?);
            }
            let staged = Staged {
                pool,
                vault: None,
                ledger,
                records,
            };
            persist(&mut db, &staged, now)?;
            info!(
                pool = %hex::encode(&staged.pool.id[..4]),
                staking = %settings.staking_asset,
                reward = %settings.reward_asset,
                bonus_assets = settings.bonus_assets.len(),
                "pool created"
            );
            (staged.pool, staged.ledger)
        };

        let vaults = queries::vaults::load_vaults(&db)?
            .into_iter()
            .map(|v| (v.id, v))
            .collect::<BTreeMap<_, _>>();
        info!(vaults = vaults.len(), "vaults restored");

        Ok(Self {
            state: Mutex::new(ServiceState {
                pool,
                vaults,
                ledger,
                db,
            }),
            events,
        })
    }

    fn publish(&self, records: &[SettlementRecord]) {
        for record in records {
            self.events.emit(record.clone());
        }
    }

    // ---- Reads ----

    pub async fn pool_id(&self) -> PoolId {
        self.state.lock().await.pool.id
    }

    pub async fn pool(&self) -> Pool {
        self.state.lock().await.pool.clone()
    }

    pub async fn stats(&self, t: u64) -> Result<PoolStats> {
        let state = self.state.lock().await;
        Ok(state.pool.pool_stats(&state.ledger, t)?)
    }

    pub async fn vault(&self, id: &VaultId) -> Result<Vault> {
        Ok(self.state.lock().await.vault(id)?.clone())
    }

    pub async fn balance_of(&self, holder: &Address, asset: &AssetId) -> u128 {
        self.state.lock().await.ledger.balance_of(holder, asset)
    }

    pub async fn multiplier_at(&self, duration: u64) -> Result<u32> {
        Ok(self.state.lock().await.pool.multiplier_at(duration)?)
    }

    pub async fn projected_reward(
        &self,
        amount: u128,
        duration: u64,
        now: u64,
    ) -> Result<RewardProjection> {
        let state = self.state.lock().await;
        Ok(state
            .pool
            .projected_reward(&state.ledger, amount, duration, now)?)
    }

    pub async fn vault_reward(&self, id: &VaultId, t: u64) -> Result<RewardProjection> {
        let state = self.state.lock().await;
        let vault = state.vault(id)?;
        Ok(state.pool.current_vault_reward(vault, &state.ledger, t)?)
    }

    pub async fn recent_settlements(&self, limit: u32) -> Result<Vec<SettlementRecord>> {
        let state = self.state.lock().await;
        Ok(queries::settlements::recent_settlements(
            &state.db,
            &state.pool.id,
            limit,
        )?)
    }

    /// The whole stored log, oldest first.
    pub async fn settlement_log(&self) -> Result<Vec<SettlementRecord>> {
        let state = self.state.lock().await;
        Ok(queries::settlements::all_settlements(&state.db, &state.pool.id)?)
    }

    // ---- Custody ----

    /// Register a new empty vault.
    pub async fn create_vault(&self, owner: VerifyingKey, salt: &[u8], now: u64) -> Result<Vault> {
        let mut state = self.state.lock().await;
        let vault = Vault::create(owner, salt);
        if state.vaults.contains_key(&vault.id) {
            return Err(ServiceError::VaultExists(hex::encode(vault.id)));
        }
        queries::vaults::save_vault(&state.db, &vault, now)?;
        state.vaults.insert(vault.id, vault.clone());
        info!(vault = %hex::encode(&vault.id[..4]), "vault created");
        Ok(vault)
    }

    // ---- Pool operations ----

    pub async fn fund(
        &self,
        caller: &Address,
        amount: u128,
        duration: u64,
        now: u64,
    ) -> Result<SettlementRecord> {
        let mut state = self.state.lock().await;
        let mut pool = state.pool.clone();
        let mut ledger = state.ledger.clone();
        let record = pool.fund(caller, &mut ledger, amount, duration, now)?;
        let records = state.commit(
            Staged {
                pool,
                vault: None,
                ledger,
                records: vec![record.clone()],
            },
            now,
        )?;
        drop(state);
        self.publish(&records);
        Ok(record)
    }

    /// Stake into `vault_id`. Several requests are applied all or nothing.
    pub async fn deposit(
        &self,
        vault_id: &VaultId,
        requests: &[StakeRequest],
        now: u64,
    ) -> Result<Vec<SettlementRecord>> {
        let mut state = self.state.lock().await;
        let mut pool = state.pool.clone();
        let mut vault = state.vault(vault_id)?.clone();
        let records = batch::stake_multi(&mut pool, &state.ledger, &mut vault, requests, now)?;
        let ledger = state.ledger.clone();
        let records = state.commit(
            Staged {
                pool,
                vault: Some(vault),
                ledger,
                records,
            },
            now,
        )?;
        drop(state);
        self.publish(&records);
        Ok(records)
    }

    /// Withdraw from `vault_id`. Several requests are applied all or nothing.
    pub async fn withdraw(
        &self,
        vault_id: &VaultId,
        requests: &[WithdrawRequest],
        now: u64,
    ) -> Result<Vec<SettlementRecord>> {
        let mut state = self.state.lock().await;
        let mut pool = state.pool.clone();
        let mut vault = state.vault(vault_id)?.clone();
        let mut ledger = state.ledger.clone();
        let records = batch::withdraw_multi(&mut pool, &mut ledger, &mut vault, requests, now)?;
        let records = state.commit(
            Staged {
                pool,
                vault: Some(vault),
                ledger,
                records,
            },
            now,
        )?;
        drop(state);
        self.publish(&records);
        Ok(records)
    }

    pub async fn rage_quit(
        &self,
        vault_id: &VaultId,
        caller: &Address,
        now: u64,
    ) -> Result<SettlementRecord> {
        let mut state = self.state.lock().await;
        let mut pool = state.pool.clone();
        let mut vault = state.vault(vault_id)?.clone();
        let record = pool.rage_quit(&mut vault, caller, now)?;
        let ledger = state.ledger.clone();
        state.commit(
            Staged {
                pool,
                vault: Some(vault),
                ledger,
                records: vec![record.clone()],
            },
            now,
        )?;
        drop(state);
        self.publish(std::slice::from_ref(&record));
        Ok(record)
    }

    pub async fn set_lifecycle(
        &self,
        caller: &Address,
        target: LifecycleState,
        now: u64,
    ) -> Result<SettlementRecord> {
        self.admin_op(now, |pool, _| pool.set_lifecycle(caller, target, now))
            .await
    }

    pub async fn register_bonus(
        &self,
        caller: &Address,
        asset: AssetId,
        now: u64,
    ) -> Result<SettlementRecord> {
        self.admin_op(now, |pool, _| pool.register_bonus_asset(caller, asset, now))
            .await
    }

    pub async fn rescue_tokens(
        &self,
        caller: &Address,
        asset: AssetId,
        recipient: Address,
        amount: u128,
        now: u64,
    ) -> Result<SettlementRecord> {
        self.admin_op(now, |pool, ledger| {
            pool.rescue_tokens(caller, ledger, asset, recipient, amount, now)
        })
        .await
    }

    async fn admin_op<F>(&self, now: u64, op: F) -> Result<SettlementRecord>
    where
        F: FnOnce(&mut Pool, &mut TokenLedger) -> geyser_engine::Result<SettlementRecord>,
    {
        let mut state = self.state.lock().await;
        let mut pool = state.pool.clone();
        let mut ledger = state.ledger.clone();
        let record = op(&mut pool, &mut ledger)?;
        state.commit(
            Staged {
                pool,
                vault: None,
                ledger,
                records: vec![record.clone()],
            },
            now,
        )?;
        drop(state);
        self.publish(std::slice::from_ref(&record));
        Ok(record)
    }

    // ---- Token book ----

    /// Credit `amount` of `asset` to `holder` out of thin air.
    pub async fn mint(&self, holder: &Address, asset: &AssetId, amount: u128) -> Result<()> {
        self.update_ledger(|ledger| ledger.mint(holder, asset, amount))
            .await
    }

    /// Scale every balance of `asset` by `numerator / denominator`.
    pub async fn rebase(&self, asset: &AssetId, numerator: u128, denominator: u128) -> Result<()> {
        self.update_ledger(|ledger| ledger.rebase(asset, numerator, denominator))
            .await
    }

    async fn update_ledger<F>(&self, op: F) -> Result<()>
    where
        F: FnOnce(&mut TokenLedger) -> geyser_vault::Result<()>,
    {
        let mut state = self.state.lock().await;
        let mut ledger = state.ledger.clone();
        op(&mut ledger)?;
        queries::balances::save_ledger(&state.db, &ledger)?;
        state.ledger = ledger;
        Ok(())
    }
}
