//! Shared fixtures for engine unit tests.

use geyser_crypto::ed25519::KeyPair;
use geyser_types::events::SettlementRecord;
use geyser_types::{Address, AssetId};
use geyser_vault::ledger::{asset_id, TokenLedger};
use geyser_vault::permission::{Permission, PermissionOp};
use geyser_vault::vault::Vault;

use crate::pool::{Pool, PoolConfig};
use crate::scaling::ScalingParams;
use crate::Result;

pub const ADMIN: Address = [0xAD; 32];
pub const DAY: u64 = geyser_types::SECONDS_PER_DAY;

pub struct Staker {
    pub key: KeyPair,
    pub vault: Vault,
}

impl Staker {
    pub fn address(&self) -> Address {
        self.key.address()
    }
}

pub struct Harness {
    pub pool: Pool,
    pub ledger: TokenLedger,
    pub staking: AssetId,
    pub reward: AssetId,
}

impl Harness {
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
            0,
        )
        .expect("create pool");
        let mut ledger = TokenLedger::new();
        ledger
            .mint(&ADMIN, &reward, 1_000_000_000)
            .expect("mint admin rewards");
        Self {
            pool,
            ledger,
            staking,
            reward,
        }
    }

    pub fn staker(&mut self, seed: u8, balance: u128) -> Staker {
        let key = KeyPair::from_bytes(&[seed; 32]);
        let vault = Vault::create(key.verifying_key.clone(), b"test");
        self.ledger
            .mint(&vault.id, &self.staking, balance)
            .expect("mint stake");
        Staker { key, vault }
    }

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

    pub fn fund(&mut self, amount: u128, duration: u64, now: u64) -> SettlementRecord {
        self.pool
            .fund(&ADMIN, &mut self.ledger, amount, duration, now)
            .expect("fund")
    }

    pub fn deposit(
        &mut self,
        staker: &mut Staker,
        amount: u128,
        now: u64,
    ) -> Result<SettlementRecord> {
        let permission = self.permission(staker, PermissionOp::Lock, amount);
        self.pool
            .deposit(&mut staker.vault, &self.ledger, &permission, amount, now)
    }

    pub fn withdraw(
        &mut self,
        staker: &mut Staker,
        recipient: Address,
        amount: u128,
        now: u64,
    ) -> Result<SettlementRecord> {
        let permission = self.permission(staker, PermissionOp::Unlock, amount);
        self.pool.withdraw(
            &mut staker.vault,
            &mut self.ledger,
            &permission,
            recipient,
            amount,
            now,
        )
    }

    pub fn reward_of(&self, holder: &Address) -> u128 {
        self.ledger.balance_of(holder, &self.reward)
    }
}
