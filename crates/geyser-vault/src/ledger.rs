//! Token balance book.
//!
//! Models the external token system in-process: every holder (owner account,
//! vault, pool custody, recipient) has one balance per asset. Elastic-supply
//! assets are simulated with [`TokenLedger::rebase`], which scales every
//! holder's balance without any transfer.
//!
//! Batches of transfers are applied atomically: either every transfer in the
//! batch lands or the book is left unchanged.

use std::collections::BTreeMap;

use geyser_crypto::blake3;
use geyser_types::{Address, AssetId};

use crate::{Result, VaultError};

/// Derive an asset identifier from a human-readable label.
///
/// `asset_id = BLAKE3::derive_key("Geyser v1 asset-id", label)`
pub fn asset_id(label: &str) -> AssetId {
    blake3::derive_key(blake3::contexts::ASSET_ID, label.as_bytes())
}

/// A single token movement.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transfer {
    pub from: Address,
    pub to: Address,
    pub asset: AssetId,
    pub amount: u128,
}

/// Balances keyed by `(asset, holder)`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TokenLedger {
    balances: BTreeMap<(AssetId, Address), u128>,
}

impl TokenLedger {
    /// Create an empty balance book.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a balance book from persisted `(asset, holder, amount)` rows.
    pub fn from_entries(entries: impl IntoIterator<Item = (AssetId, Address, u128)>) -> Self {
        let balances = entries
            .into_iter()
            .filter(|(_, _, amount)| *amount > 0)
            .map(|(asset, holder, amount)| ((asset, holder), amount))
            .collect();
        Self { balances }
    }

    /// Iterate non-zero balances as `(asset, holder, amount)`.
    pub fn entries(&self) -> impl Iterator<Item = (AssetId, Address, u128)> + '_ {
        self.balances
            .iter()
            .map(|((asset, holder), amount)| (*asset, *holder, *amount))
    }

    /// Balance of `holder` in `asset`.
    pub fn balance_of(&self, holder: &Address, asset: &AssetId) -> u128 {
        self.balances
            .get(&(*asset, *holder))
            .copied()
            .unwrap_or_default()
    }

    /// Sum of every holder's balance in `asset`.
    pub fn total_supply(&self, asset: &AssetId) -> u128 {
        self.balances
            .iter()
            .filter(|((a, _), _)| a == asset)
            .fold(0u128, |acc, (_, amount)| acc.saturating_add(*amount))
    }

    /// Credit newly issued tokens to `to`.
    pub fn mint(&mut self, to: &Address, asset: &AssetId, amount: u128) -> Result<()> {
        let current = self.balance_of(to, asset);
        let next = current.checked_add(amount).ok_or(VaultError::Overflow)?;
        self.set(asset, to, next);
        tracing::trace!(amount, "ledger: minted");
        Ok(())
    }

    /// Destroy tokens held by `from`.
    pub fn burn(&mut self, from: &Address, asset: &AssetId, amount: u128) -> Result<()> {
        let current = self.balance_of(from, asset);
        let next = current
            .checked_sub(amount)
            .ok_or(VaultError::InsufficientBalance {
                available: current,
                required: amount,
            })?;
        self.set(asset, from, next);
        Ok(())
    }

    /// Move `amount` of `asset` from one holder to another.
    pub fn transfer(
        &mut self,
        from: &Address,
        to: &Address,
        asset: &AssetId,
        amount: u128,
    ) -> Result<()> {
        self.apply(&[Transfer {
            from: *from,
            to: *to,
            asset: *asset,
            amount,
        }])
    }

    /// Apply a batch of transfers atomically.
    ///
    /// Transfers are validated in order against a scratch copy of the touched
    /// balances; the book is only written once every transfer has succeeded.
    ///
    /// # Errors
    ///
    /// - [`VaultError::InsufficientBalance`] if any sender is overdrawn
    /// - [`VaultError::Overflow`] if any receiver balance overflows
    pub fn apply(&mut self, transfers: &[Transfer]) -> Result<()> {
        let mut scratch: BTreeMap<(AssetId, Address), u128> = BTreeMap::new();

        for t in transfers {
            if t.amount == 0 {
                continue;
            }
            let from_key = (t.asset, t.from);
            let from_balance = *scratch
                .entry(from_key)
                .or_insert_with(|| self.balance_of(&t.from, &t.asset));
            let debited = from_balance
                .checked_sub(t.amount)
                .ok_or(VaultError::InsufficientBalance {
                    available: from_balance,
                    required: t.amount,
                })?;
            scratch.insert(from_key, debited);

            let to_key = (t.asset, t.to);
            let to_balance = *scratch
                .entry(to_key)
                .or_insert_with(|| self.balance_of(&t.to, &t.asset));
            let credited = to_balance
                .checked_add(t.amount)
                .ok_or(VaultError::Overflow)?;
            scratch.insert(to_key, credited);
        }

        for ((asset, holder), amount) in scratch {
            self.set(&asset, &holder, amount);
        }
        Ok(())
    }

    /// Scale every balance of `asset` by `numerator / denominator`.
    ///
    /// Simulates an out-of-band supply adjustment of an elastic token.
    /// Results are floored per holder.
    pub fn rebase(&mut self, asset: &AssetId, numerator: u128, denominator: u128) -> Result<()> {
        if denominator == 0 {
            return Err(VaultError::InvalidRebase {
                numerator,
                denominator,
            });
        }

        let mut rebased = Vec::new();
        for ((a, holder), amount) in &self.balances {
            if a != asset {
                continue;
            }
            let scaled = amount
                .checked_mul(numerator)
                .ok_or(VaultError::Overflow)?
                / denominator;
            rebased.push((*holder, scaled));
        }

        for (holder, amount) in rebased {
            self.set(asset, &holder, amount);
        }

        tracing::info!(numerator, denominator, "ledger: rebased elastic asset");
        Ok(())
    }

    fn set(&mut self, asset: &AssetId, holder: &Address, amount: u128) {
        if amount == 0 {
            self.balances.remove(&(*asset, *holder));
        } else {
            self.balances.insert((*asset, *holder), amount);
        }
    }
}
