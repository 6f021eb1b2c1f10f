//! Shared fixtures for the Geyser end-to-end tests.
//!
//! Run all integration tests:
//! ```sh
//! cargo test -p geyser-integration-tests
//! ```

use geyser_crypto::ed25519::KeyPair;
use geyser_engine::{EngineError, Pool, PoolConfig, ScalingParams};
use geyser_types::events::SettlementRecord;
use geyser_types::{Address, AssetId, SECONDS_PER_DAY};
use geyser_vault::ledger::{asset_id, TokenLedger};
use geyser_vault::permission::{Permission, PermissionOp};
use geyser_vault::vault::Vault;

/// Deterministic start of every test world.
pub const BASE_TIME: u64 = 1_700_000_000;
pub const DAY: u64 = SECONDS_PER_DAY;
pub const ADMIN: Address = [0xAD; 32];
/// Reward tokens minted to the admin in a fresh world.
pub const ADMIN_REWARD_SUPPLY: u128 = 1_000_000_000;

/// A staker: key plus one vault.
pub struct Staker {
    pub key: KeyPair,
    pub vault: Vault,
}

impl Staker {
    pub fn address(&self) -> Address {
        self.key.address()
    }
}

/// One pool with its token book.
pub struct World {
    pub pool: Pool,
    pub ledger: TokenLedger,
    pub staking: AssetId,
    pub reward: AssetId,
}

impl World {
    /// A pool created at `BASE_TIME` with the given ramp.
    pub fn new(floor_pct: u32, ceiling_pct: u32, ramp: u64) -> Self {
        let staking = asset_id("UNI-V2");
        let reward = asset_id("AMPL");
        let pool = Pool::create(
            PoolConfig {
                admin: ADMIN,
                staking_asset: staking,
                reward_asset: reward,
                scaling: ScalingParams::new(floor_pct, ceiling_pct, ramp).expect("scaling"),
            },
            BASE_TIME,
        )
        .expect("pool");
        let mut ledger = TokenLedger::new();
        ledger
            .mint(&ADMIN, &reward, ADMIN_REWARD_SUPPLY)
            .expect("mint reward");
        Self {
            pool,
            ledger,
            staking,
            reward,
        }
    }

    /// A staker whose vault holds `balance` staking tokens.
    pub fn staker(&mut self, seed: u8, balance: u128) -> Staker {
        let key = KeyPair::from_bytes(&[seed; 32]);
        let vault = Vault::create(key.verifying_key.clone(), b"integration");
        if balance > 0 {
            self.ledger
                .mint(&vault.id, &self.staking, balance)
                .expect("mint stake");
        }
        Staker { key, vault }
    }

    /// Fund from the admin at `BASE_TIME + offset`.
    pub fn fund(&mut self, amount: u128, duration: u64, offset: u64) -> SettlementRecord {
        self.pool
            .fund(&ADMIN, &mut self.ledger, amount, duration, BASE_TIME + offset)
            .expect("fund")
    }

    /// A permission for the staker's next nonce.
    pub fn permission(&self, staker: &Staker, op: PermissionOp, amount: u128) -> Permission {
        Permission::sign(
            &staker.key.signing_key,
            op,
            staker.vault.id,
            self.pool.id,
            self.staking,
            amount,
            staker.vault.nonce,
        )
    }

    pub fn deposit(
        &mut self,
        staker: &mut Staker,
        amount: u128,
        offset: u64,
    ) -> Result<SettlementRecord, EngineError> {
        let permission = self.permission(staker, PermissionOp::Lock, amount);
        self.pool.deposit(
            &mut staker.vault,
            &self.ledger,
            &permission,
            amount,
            BASE_TIME + offset,
        )
    }

    pub fn withdraw(
        &mut self,
        staker: &mut Staker,
        recipient: Address,
        amount: u128,
        offset: u64,
    ) -> Result<SettlementRecord, EngineError> {
        let permission = self.permission(staker, PermissionOp::Unlock, amount);
        self.pool.withdraw(
            &mut staker.vault,
            &mut self.ledger,
            &permission,
            recipient,
            amount,
            BASE_TIME + offset,
        )
    }

    pub fn reward_of(&self, holder: &Address) -> u128 {
        self.ledger.balance_of(holder, &self.reward)
    }

    pub fn pool_reward_balance(&self) -> u128 {
        self.pool.reward_balance(&self.ledger)
    }
}
