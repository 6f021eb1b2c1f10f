//! Withdrawals and reward settlement.
//!
//! A withdrawal releases stake newest-lot-first, measures the released
//! stake-seconds against the whole pool's stake-time, and pays the scaled
//! pro-rata share of the currently unlocked reward value. Only the shares
//! backing the paid reward are redeemed; the forfeited remainder stays
//! outstanding and raises the value of every remaining share.
//!
//! The stake units settled are the exact stake-seconds released by the
//! vault (`amount * effective_duration` before flooring), so a full
//! withdrawal removes the vault's whole contribution to the pool's
//! stake-time with no dust.

use geyser_types::events::{SettlementKind, SettlementRecord};
use geyser_types::Address;
use geyser_vault::ledger::{TokenLedger, Transfer};
use geyser_vault::permission::{Permission, PermissionOp};
use geyser_vault::vault::Vault;
use geyser_vault::VaultError;

use crate::lifecycle::require_online;
use crate::pool::Pool;
use crate::settlement::{self, Withdrawal};
use crate::{EngineError, Result};

impl Pool {
    /// Withdraw `amount` of stake from `vault` and settle its reward.
    ///
    /// Staked tokens move from the vault to `recipient`; the reward and every
    /// bonus payout move from the pool to `recipient`. All movements are one
    /// atomic ledger batch, and pool and vault state are only committed after
    /// it lands.
    ///
    /// # Errors
    ///
    /// - [`EngineError::NotOnline`] unless the pool is Online
    /// - [`EngineError::ZeroAmount`] if `amount` is zero
    /// - [`EngineError::Vault`] on permission failures or if `amount` exceeds
    ///   the vault's stake
    /// - [`EngineError::Insolvent`] if a payout exceeds the pool's balance
    pub fn withdraw(
        &mut self,
        vault: &mut Vault,
        ledger: &mut TokenLedger,
        permission: &Permission,
        recipient: Address,
        amount: u128,
        now: u64,
    ) -> Result<SettlementRecord> {
        require_online(self.lifecycle)?;
        if amount == 0 {
            return Err(EngineError::ZeroAmount);
        }
        let staked = vault.staked(&self.id, &self.staking_asset);
        if amount > staked {
            return Err(VaultError::InsufficientStake {
                staked,
                requested: amount,
            }
            .into());
        }

        let mut staged_vault = vault.clone();
        let auth = staged_vault.verify_permission(
            permission,
            PermissionOp::Unlock,
            &self.id,
            &self.staking_asset,
            amount,
        )?;

        let mut staged = self.clone().advance(now)?;
        let total_stake_time = staged.stake_time.accumulated;
        let release = staged_vault.unlock(auth, now)?;

        let withdrawal = Withdrawal {
            amount: release.amount,
            units: release.weighted_stake_seconds,
            effective_duration: release.effective_duration(),
        };
        let quote = settlement::quote(&staged, ledger, withdrawal, total_stake_time, now)?;

        staged.funding.redeem(quote.redeemed_shares)?;
        staged.total_stake = staged
            .total_stake
            .checked_sub(amount)
            .ok_or(EngineError::Underflow)?;
        staged.stake_time.remove(withdrawal.units)?;

        let mut transfers = Vec::with_capacity(2 + quote.bonus.len());
        transfers.push(release.transfer_to(recipient));
        transfers.push(Transfer {
            from: staged.id,
            to: recipient,
            asset: staged.reward_asset,
            amount: quote.reward,
        });
        for payout in &quote.bonus {
            transfers.push(Transfer {
                from: staged.id,
                to: recipient,
                asset: payout.asset,
                amount: payout.amount,
            });
        }

        let record = staged.record(
            now,
            SettlementKind::Withdrawn {
                vault: staged_vault.id,
                recipient,
                amount,
                reward: quote.reward,
                forfeited: quote.forfeited(),
                bonus: quote.bonus.clone(),
            },
        )?;

        ledger.apply(&transfers)?;

        tracing::info!(
            pool = %hex::encode(&staged.id[..4]),
            vault = %hex::encode(&staged_vault.id[..4]),
            amount,
            effective_duration = withdrawal.effective_duration,
            reward = quote.reward,
            redeemed_shares = quote.redeemed_shares,
            "withdraw"
        );
        if quote.forfeited() > 0 {
            tracing::warn!(
                pool = %hex::encode(&staged.id[..4]),
                forfeited = quote.forfeited(),
                multiplier_bps = quote.multiplier_bps,
                "early withdrawal forfeited reward"
            );
        }

        *self = staged;
        *vault = staged_vault;
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use crate::testkit::{Harness, DAY};
    use crate::EngineError;
    use geyser_types::events::SettlementKind;
    use geyser_vault::permission::PermissionOp;
    use geyser_vault::VaultError;

    const RECIPIENT: [u8; 32] = [0x99; 32];

    #[test]
    fn test_full_duration_pays_full_share() {
        let mut h = Harness::new(33, 100, 60 * DAY);
        h.fund(1_000, 100 * DAY, 0);
        let mut alice = h.staker(1, 100);
        h.deposit(&mut alice, 100, 0).expect("deposit");

        let record = h
            .withdraw(&mut alice, RECIPIENT, 100, 100 * DAY)
            .expect("withdraw");

        assert_eq!(h.reward_of(&RECIPIENT), 1_000);
        assert_eq!(h.ledger.balance_of(&RECIPIENT, &h.staking), 100);
        assert_eq!(h.pool.total_stake, 0);
        assert_eq!(h.pool.funding.outstanding_shares(), 0);
        assert!(matches!(
            record.kind,
            SettlementKind::Withdrawn {
                reward: 1_000,
                forfeited: 0,
                ..
            }
        ));
    }

    #[test]
    fn test_flash_stake_earns_nothing() {
        let mut h = Harness::new(33, 100, 60 * DAY);
        h.fund(1_000, 100 * DAY, 0);
        let mut alice = h.staker(1, 100);
        h.deposit(&mut alice, 100, 50).expect("deposit");
        h.withdraw(&mut alice, RECIPIENT, 100, 50).expect("withdraw");

        assert_eq!(h.reward_of(&RECIPIENT), 0);
        assert_eq!(h.ledger.balance_of(&RECIPIENT, &h.staking), 100);
        assert_eq!(h.pool.funding.outstanding_shares(), 1_000 * 1_000_000);
    }

    #[test]
    fn test_equal_stakers_split_evenly() {
        let mut h = Harness::new(33, 100, 60 * DAY);
        h.fund(1_000, 100 * DAY, 0);
        let mut alice = h.staker(1, 100);
        let mut bob = h.staker(2, 100);
        h.deposit(&mut alice, 100, 0).expect("alice");
        h.deposit(&mut bob, 100, 0).expect("bob");

        h.withdraw(&mut alice, [0xA0; 32], 100, 100 * DAY)
            .expect("alice out");
        h.withdraw(&mut bob, [0xB0; 32], 100, 100 * DAY)
            .expect("bob out");

        assert_eq!(h.reward_of(&[0xA0; 32]), 500);
        assert_eq!(h.reward_of(&[0xB0; 32]), 500);
    }

    #[test]
    fn test_forfeit_accrues_to_remaining_stakers() {
        let mut h = Harness::new(50, 100, 100 * DAY);
        h.fund(1_000, 100 * DAY, 0);
        let mut alice = h.staker(1, 100);
        let mut bob = h.staker(2, 100);
        h.deposit(&mut alice, 100, 0).expect("alice");
        h.deposit(&mut bob, 100, 0).expect("bob");

        // value 500, alice's half 250, multiplier 75%
        h.withdraw(&mut alice, [0xA0; 32], 100, 50 * DAY)
            .expect("alice out");
        assert_eq!(h.reward_of(&[0xA0; 32]), 187);

        h.withdraw(&mut bob, [0xB0; 32], 100, 100 * DAY)
            .expect("bob out");
        assert_eq!(h.reward_of(&[0xB0; 32]), 813);
        assert_eq!(h.pool.reward_balance(&h.ledger), 0);
    }

    #[test]
    fn test_rebase_scales_reward() {
        let mut h = Harness::new(33, 100, 60 * DAY);
        h.fund(1_000, 100 * DAY, 0);
        let mut alice = h.staker(1, 100);
        h.deposit(&mut alice, 100, 0).expect("deposit");

        let reward = h.reward;
        h.ledger.rebase(&reward, 2, 1).expect("rebase");
        h.withdraw(&mut alice, RECIPIENT, 100, 100 * DAY)
            .expect("withdraw");

        assert_eq!(h.reward_of(&RECIPIENT), 2_000);
    }

    #[test]
    fn test_partial_withdrawal_keeps_older_lots() {
        let mut h = Harness::new(0, 100, 100);
        h.fund(1_000, 100, 0);
        let mut alice = h.staker(1, 100);
        h.deposit(&mut alice, 60, 0).expect("old lot");
        h.deposit(&mut alice, 40, 50).expect("new lot");

        h.withdraw(&mut alice, RECIPIENT, 40, 100).expect("withdraw");
        let position = alice
            .vault
            .position(&h.pool.id, &h.staking)
            .expect("position");
        assert_eq!(position.staked(), 60);
        assert_eq!(position.lots.iter().next().map(|l| l.timestamp), Some(0));

        // pool stake-time stays equal to the remaining vault stake-time
        for t in [100, 150, 400] {
            assert_eq!(
                h.pool.total_stake_time(t).expect("pool"),
                alice
                    .vault
                    .stake_time_at(&h.pool.id, &h.staking, t)
                    .expect("vault")
            );
        }
    }

    #[test]
    fn test_full_withdrawal_zeroes_contribution() {
        let mut h = Harness::new(33, 100, 100);
        h.fund(1_000, 1_000, 0);
        let mut alice = h.staker(1, 100);
        let mut bob = h.staker(2, 100);
        h.deposit(&mut alice, 70, 3).expect("alice");
        h.deposit(&mut alice, 30, 17).expect("alice");
        h.deposit(&mut bob, 100, 5).expect("bob");

        h.withdraw(&mut alice, RECIPIENT, 100, 250).expect("alice out");

        let bob_st = |t| {
            bob.vault
                .stake_time_at(&h.pool.id, &h.staking, t)
                .expect("bob")
        };
        for t in [250, 500, 10_000] {
            assert_eq!(h.pool.total_stake_time(t).expect("pool"), bob_st(t));
        }
        assert!(alice.vault.position(&h.pool.id, &h.staking).is_none());
    }

    #[test]
    fn test_withdraw_more_than_staked_rejected() {
        let mut h = Harness::new(33, 100, 100);
        let mut alice = h.staker(1, 100);
        h.deposit(&mut alice, 10, 0).expect("deposit");
        assert!(matches!(
            h.withdraw(&mut alice, RECIPIENT, 11, 5),
            Err(EngineError::Vault(VaultError::InsufficientStake {
                staked: 10,
                requested: 11
            }))
        ));
    }

    #[test]
    fn test_failed_transfer_rolls_back() {
        let mut h = Harness::new(33, 100, 100);
        h.fund(1_000, 100, 0);
        let mut alice = h.staker(1, 100);
        h.deposit(&mut alice, 100, 0).expect("deposit");

        // staking token contracts so the vault no longer covers its lock
        let staking = h.staking;
        h.ledger.rebase(&staking, 1, 2).expect("rebase");

        let pool_before = h.pool.clone();
        let vault_before = alice.vault.clone();
        let ledger_before = h.ledger.clone();
        assert!(h.withdraw(&mut alice, RECIPIENT, 100, 100).is_err());
        assert_eq!(h.pool, pool_before);
        assert_eq!(alice.vault, vault_before);
        assert_eq!(h.ledger, ledger_before);
    }

    #[test]
    fn test_bonus_assets_paid_pro_rata() {
        let mut h = Harness::new(33, 100, 100);
        h.fund(1_000, 100, 0);
        let bonus = geyser_vault::ledger::asset_id("BONUS");
        h.pool
            .register_bonus_asset(&crate::testkit::ADMIN, bonus, 0)
            .expect("register");
        let pool_id = h.pool.id;
        h.ledger.mint(&pool_id, &bonus, 600).expect("mint bonus");

        let mut alice = h.staker(1, 100);
        let mut bob = h.staker(2, 100);
        h.deposit(&mut alice, 100, 0).expect("alice");
        h.deposit(&mut bob, 100, 0).expect("bob");
        h.withdraw(&mut alice, RECIPIENT, 100, 100).expect("withdraw");

        assert_eq!(h.ledger.balance_of(&RECIPIENT, &bonus), 300);
        assert_eq!(h.ledger.balance_of(&pool_id, &bonus), 300);
    }

    #[test]
    fn test_replayed_unlock_rejected() {
        let mut h = Harness::new(33, 100, 100);
        let mut alice = h.staker(1, 100);
        h.deposit(&mut alice, 100, 0).expect("deposit");

        let permission = h.permission(&alice, PermissionOp::Unlock, 10);
        h.pool
            .withdraw(
                &mut alice.vault,
                &mut h.ledger,
                &permission,
                RECIPIENT,
                10,
                1,
            )
            .expect("first");
        assert!(matches!(
            h.pool.withdraw(
                &mut alice.vault,
                &mut h.ledger,
                &permission,
                RECIPIENT,
                10,
                2
            ),
            Err(EngineError::Vault(VaultError::StaleNonce { .. }))
        ));
    }
}
