//! Read model built from the settlement log.
//!
//! The indexer is not authoritative: it only folds settlement records into
//! per-vault and pool-wide totals for dashboards. Engine state always wins.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use geyser_types::events::{SettlementKind, SettlementRecord};
use geyser_types::{Hash, LifecycleState, VaultId};
use serde::Serialize;
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, info, warn};

use crate::events::Event;
use crate::service::PoolService;

/// Per-vault totals.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VaultSummary {
    pub staked: u128,
    pub deposited: u128,
    pub withdrawn: u128,
    pub rewards_paid: u128,
    pub forfeited: u128,
    pub rage_quits: u32,
    pub last_activity: u64,
}

/// Pool-wide totals.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IndexSummary {
    pub records: u64,
    pub total_funded: u128,
    pub total_rewards_paid: u128,
    pub total_forfeited: u128,
    pub total_staked: u128,
    pub active_vaults: usize,
    pub lifecycle: LifecycleState,
}

/// Folded view of the settlement log.
#[derive(Debug, Default)]
pub struct Indexer {
    vaults: BTreeMap<VaultId, VaultSummary>,
    seen: HashSet<Hash>,
    summary: IndexSummary,
}

impl Indexer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an index from a stored log, oldest record first.
    pub fn replay<'a>(records: impl IntoIterator<Item = &'a SettlementRecord>) -> Self {
        let mut indexer = Self::new();
        for record in records {
            indexer.apply(record);
        }
        indexer
    }

    /// Fold one record. Returns false if it was already applied.
    pub fn apply(&mut self, record: &SettlementRecord) -> bool {
        if !self.seen.insert(record.id) {
            return false;
        }
        self.summary.records += 1;

        match &record.kind {
            SettlementKind::Funded { amount, .. } => {
                self.summary.total_funded = self.summary.total_funded.saturating_add(*amount);
            }
            SettlementKind::Deposited { vault, amount } => {
                let v = self.vaults.entry(*vault).or_default();
                v.staked = v.staked.saturating_add(*amount);
                v.deposited = v.deposited.saturating_add(*amount);
                v.last_activity = record.timestamp;
                self.summary.total_staked = self.summary.total_staked.saturating_add(*amount);
            }
            SettlementKind::Withdrawn {
                vault,
                amount,
                reward,
                forfeited,
                ..
            } => {
                let v = self.vaults.entry(*vault).or_default();
                v.staked = v.staked.saturating_sub(*amount);
                v.withdrawn = v.withdrawn.saturating_add(*amount);
                v.rewards_paid = v.rewards_paid.saturating_add(*reward);
                v.forfeited = v.forfeited.saturating_add(*forfeited);
                v.last_activity = record.timestamp;
                self.summary.total_staked = self.summary.total_staked.saturating_sub(*amount);
                self.summary.total_rewards_paid =
                    self.summary.total_rewards_paid.saturating_add(*reward);
                self.summary.total_forfeited = self.summary.total_forfeited.saturating_add(*forfeited);
            }
            SettlementKind::RageQuit { vault, amount } => {
                let v = self.vaults.entry(*vault).or_default();
                v.staked = v.staked.saturating_sub(*amount);
                v.rage_quits += 1;
                v.last_activity = record.timestamp;
                self.summary.total_staked = self.summary.total_staked.saturating_sub(*amount);
            }
            SettlementKind::LifecycleChanged { to, .. } => {
                self.summary.lifecycle = *to;
            }
            SettlementKind::BonusAssetRegistered { .. } | SettlementKind::TokensRescued { .. } => {}
        }

        self.summary.active_vaults = self.vaults.values().filter(|v| v.staked > 0).count();
        debug!(kind = record.kind.name(), records = self.summary.records, "indexed");
        true
    }

    pub fn vault(&self, id: &VaultId) -> Option<&VaultSummary> {
        self.vaults.get(id)
    }

    pub fn summary(&self) -> &IndexSummary {
        &self.summary
    }
}

/// Keep `indexer` current from the event bus until the bus closes.
///
/// Records dropped by a lagging receiver are recovered by rebuilding the
/// index from `service`'s stored log. Buffered events that the log already
/// covers are then skipped as duplicates.
pub async fn run(
    indexer: Arc<RwLock<Indexer>>,
    mut rx: broadcast::Receiver<Event>,
    service: Arc<PoolService>,
) {
    loop {
        match rx.recv().await {
            Ok(event) => {
                indexer.write().await.apply(&event.record);
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!(skipped, "indexer lagged behind the event bus, resyncing");
                match service.settlement_log().await {
                    Ok(log) => {
                        *indexer.write().await = Indexer::replay(&log);
                        info!(records = log.len(), "read model resynced");
                    }
                    Err(e) => warn!(error = %e, "indexer resync failed"),
                }
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PoolSettings;
    use crate::events::EventBus;

    fn record(n: u8, timestamp: u64, kind: SettlementKind) -> SettlementRecord {
        SettlementRecord {
            id: [n; 32],
            pool: [0; 32],
            timestamp,
            kind,
        }
    }

    #[test]
    fn test_fold_vault_lifecycle() {
        let vault = [7; 32];
        let log = vec![
            record(
                1,
                0,
                SettlementKind::Funded {
                    amount: 1_000,
                    duration: 10,
                    shares: 1,
                },
            ),
            record(2, 1, SettlementKind::Deposited { vault, amount: 100 }),
            record(
                3,
                5,
                SettlementKind::Withdrawn {
                    vault,
                    recipient: [9; 32],
                    amount: 40,
                    reward: 187,
                    forfeited: 13,
                    bonus: Vec::new(),
                },
            ),
            record(4, 6, SettlementKind::RageQuit { vault, amount: 60 }),
        ];
        let indexer = Indexer::replay(&log);

        let v = indexer.vault(&vault).expect("vault indexed");
        assert_eq!(v.staked, 0);
        assert_eq!(v.deposited, 100);
        assert_eq!(v.withdrawn, 40);
        assert_eq!(v.rewards_paid, 187);
        assert_eq!(v.rage_quits, 1);
        assert_eq!(v.last_activity, 6);

        let s = indexer.summary();
        assert_eq!(s.records, 4);
        assert_eq!(s.total_funded, 1_000);
        assert_eq!(s.total_forfeited, 13);
        assert_eq!(s.active_vaults, 0);
    }

    #[test]
    fn test_duplicate_record_ignored() {
        let mut indexer = Indexer::new();
        let r = record(1, 0, SettlementKind::Deposited { vault: [1; 32], amount: 5 });
        assert!(indexer.apply(&r));
        assert!(!indexer.apply(&r));
        assert_eq!(indexer.summary().total_staked, 5);
        assert_eq!(indexer.summary().active_vaults, 1);
    }

    #[test]
    fn test_lifecycle_tracked() {
        let mut indexer = Indexer::new();
        indexer.apply(&record(
            1,
            0,
            SettlementKind::LifecycleChanged {
                from: LifecycleState::Online,
                to: LifecycleState::Shutdown,
            },
        ));
        assert_eq!(indexer.summary().lifecycle, LifecycleState::Shutdown);
    }

    const ADMIN: [u8; 32] = [0xAD; 32];

    fn service(bus: &EventBus) -> Arc<PoolService> {
        let db = geyser_db::open_memory().expect("db");
        Arc::new(
            PoolService::open(db, &PoolSettings::default(), ADMIN, bus.clone(), 0)
                .expect("service"),
        )
    }

    async fn wait_for_funded(indexer: &RwLock<Indexer>, expected: u128) -> IndexSummary {
        for _ in 0..200 {
            let summary = indexer.read().await.summary().clone();
            if summary.total_funded == expected {
                return summary;
            }
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
        indexer.read().await.summary().clone()
    }

    #[tokio::test]
    async fn test_run_follows_bus() {
        let bus = EventBus::new(8);
        let svc = service(&bus);
        let reward = svc.pool().await.reward_asset;
        svc.mint(&ADMIN, &reward, 100).await.expect("mint");

        let indexer = Arc::new(RwLock::new(Indexer::new()));
        let task = tokio::spawn(run(indexer.clone(), bus.subscribe(), svc.clone()));
        svc.fund(&ADMIN, 100, 10, 1).await.expect("fund");

        let summary = wait_for_funded(&indexer, 100).await;
        task.abort();
        assert_eq!(summary.total_funded, 100);
        assert_eq!(summary.records, 1);
    }

    #[tokio::test]
    async fn test_lagged_receiver_resyncs_from_log() {
        let bus = EventBus::new(1);
        let rx = bus.subscribe();
        let svc = service(&bus);
        let reward = svc.pool().await.reward_asset;
        svc.mint(&ADMIN, &reward, 300).await.expect("mint");
        for t in 1..=3 {
            svc.fund(&ADMIN, 100, 10, t).await.expect("fund");
        }

        let indexer = Arc::new(RwLock::new(Indexer::new()));
        let task = tokio::spawn(run(indexer.clone(), rx, svc.clone()));

        let summary = wait_for_funded(&indexer, 300).await;
        task.abort();
        let log = svc.settlement_log().await.expect("log");
        assert_eq!(summary.total_funded, 300);
        assert_eq!(summary.records, log.len() as u64);
    }
}
