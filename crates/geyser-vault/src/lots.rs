//! LIFO stack of deposit lots.
//!
//! Each deposit pushes a `(amount, timestamp)` lot. Withdrawals consume the
//! most recently added lots first; a partially consumed lot keeps its
//! original timestamp so its staking age is preserved.

use std::collections::VecDeque;

use geyser_types::{AccrualError, MAX_LOTS_PER_POSITION};
use serde::{Deserialize, Serialize};

use crate::{Result, VaultError};

/// A single unexpired deposit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lot {
    pub amount: u128,
    pub timestamp: u64,
}

/// Result of consuming lots for a withdrawal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Consumption {
    /// Amount consumed.
    pub amount: u128,
    /// `sum(consumed_i * (now - lot_i.timestamp))`.
    pub weighted_stake_seconds: u128,
    /// Lots fully removed from the stack.
    pub lots_removed: usize,
}

/// Deposit lots ordered oldest to newest.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LotStack {
    lots: VecDeque<Lot>,
    total: u128,
}

impl LotStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.lots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lots.is_empty()
    }

    /// Sum of all lot amounts.
    pub fn total(&self) -> u128 {
        self.total
    }

    /// Lots from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &Lot> {
        self.lots.iter()
    }

    /// Push a new lot.
    ///
    /// # Errors
    ///
    /// - [`VaultError::ZeroAmount`] if `amount` is zero
    /// - [`VaultError::TooManyLots`] if the stack is full
    /// - [`VaultError::Overflow`] if the total overflows
    pub fn push(&mut self, amount: u128, timestamp: u64) -> Result<()> {
        if amount == 0 {
            return Err(VaultError::ZeroAmount);
        }
        if self.lots.len() >= MAX_LOTS_PER_POSITION {
            return Err(VaultError::TooManyLots {
                max: MAX_LOTS_PER_POSITION,
            });
        }
        let total = self.total.checked_add(amount).ok_or(VaultError::Overflow)?;
        self.lots.push_back(Lot { amount, timestamp });
        self.total = total;
        Ok(())
    }

    /// `sum(lot.amount * (now - lot.timestamp))` over every lot.
    pub fn stake_time_at(&self, now: u64) -> Result<u128> {
        self.lots.iter().try_fold(0u128, |acc, lot| {
            let units = lot_units(lot, lot.amount, now)?;
            acc.checked_add(units).ok_or(VaultError::Overflow)
        })
    }

    /// Consume `amount` from the newest lots.
    ///
    /// The consumption is computed before the stack is touched, so a failed
    /// call leaves the stack unchanged.
    ///
    /// # Errors
    ///
    /// - [`VaultError::ZeroAmount`] if `amount` is zero
    /// - [`VaultError::InsufficientStake`] if `amount` exceeds the total
    pub fn consume_latest(&mut self, amount: u128, now: u64) -> Result<Consumption> {
        if amount == 0 {
            return Err(VaultError::ZeroAmount);
        }
        if amount > self.total {
            return Err(VaultError::InsufficientStake {
                staked: self.total,
                requested: amount,
            });
        }

        let mut remaining = amount;
        let mut weighted: u128 = 0;
        let mut lots_removed = 0usize;
        let mut residual: Option<u128> = None;

        for lot in self.lots.iter().rev() {
            if remaining == 0 {
                break;
            }
            let take = remaining.min(lot.amount);
            let units = lot_units(lot, take, now)?;
            weighted = weighted.checked_add(units).ok_or(VaultError::Overflow)?;
            remaining -= take;
            if take == lot.amount {
                lots_removed += 1;
            } else {
                residual = Some(lot.amount - take);
            }
        }

        for _ in 0..lots_removed {
            self.lots.pop_back();
        }
        if let Some(rest) = residual {
            if let Some(lot) = self.lots.pop_back() {
                self.lots.push_back(Lot {
                    amount: rest,
                    timestamp: lot.timestamp,
                });
            }
        }
        self.total -= amount;

        tracing::trace!(
            amount,
            weighted,
            lots_removed,
            remaining_lots = self.lots.len(),
            "lots: consumed newest first"
        );

        Ok(Consumption {
            amount,
            weighted_stake_seconds: weighted,
            lots_removed,
        })
    }
}

fn lot_units(lot: &Lot, amount: u128, now: u64) -> Result<u128> {
    let age = now.checked_sub(lot.timestamp).ok_or(AccrualError::TimeReversed {
        last_update: lot.timestamp,
        now,
    })?;
    amount
        .checked_mul(u128::from(age))
        .ok_or(VaultError::Overflow)
}
