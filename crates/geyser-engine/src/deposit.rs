//! Stake deposits.

use geyser_types::events::{SettlementKind, SettlementRecord};
use geyser_vault::ledger::TokenLedger;
use geyser_vault::permission::{Permission, PermissionOp};
use geyser_vault::vault::Vault;

use crate::lifecycle::require_online;
use crate::pool::Pool;
use crate::{EngineError, Result};

impl Pool {
    /// Lock `amount` of the vault's free staking balance into this pool.
    ///
    /// The vault owner's lock permission is verified and consumed, both
    /// accumulators are advanced to `now`, and a new lot is pushed. The
    /// tokens stay in the vault.
    ///
    /// # Errors
    ///
    /// - [`EngineError::NotOnline`] unless the pool is Online
    /// - [`EngineError::ZeroAmount`] if `amount` is zero
    /// - [`EngineError::Vault`] on permission, balance or lot-cap failures
    pub fn deposit(
        &mut self,
        vault: &mut Vault,
        ledger: &TokenLedger,
        permission: &Permission,
        amount: u128,
        now: u64,
    ) -> Result<SettlementRecord> {
        require_online(self.lifecycle)?;
        if amount == 0 {
            return Err(EngineError::ZeroAmount);
        }

        let mut staged_vault = vault.clone();
        let auth = staged_vault.verify_permission(
            permission,
            PermissionOp::Lock,
            &self.id,
            &self.staking_asset,
            amount,
        )?;

        let mut staged = self.clone().advance(now)?;
        staged_vault.lock(auth, ledger, now)?;
        staged.total_stake = staged
            .total_stake
            .checked_add(amount)
            .ok_or(EngineError::Overflow)?;

        let record = staged.record(
            now,
            SettlementKind::Deposited {
                vault: staged_vault.id,
                amount,
            },
        )?;

        tracing::info!(
            pool = %hex::encode(&staged.id[..4]),
            vault = %hex::encode(&staged_vault.id[..4]),
            amount,
            total_stake = staged.total_stake,
            "deposit"
        );

        *self = staged;
        *vault = staged_vault;
        Ok(record)
    }
}
