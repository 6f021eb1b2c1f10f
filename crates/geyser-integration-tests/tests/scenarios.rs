//! Integration test: end-to-end reward payouts.
//!
//! Every test funds 1000 reward tokens over 100 days with a 33%..100%
//! ramp of 30 days, then deposits and withdraws against the pool.

use geyser_integration_tests::{World, DAY};
use geyser_types::events::SettlementKind;

const RECIPIENT: [u8; 32] = [0xEE; 32];

fn world() -> World {
    let mut w = World::new(33, 100, 30 * DAY);
    w.fund(1_000, 100 * DAY, 0);
    w
}

/// A lone staker through the whole schedule earns everything.
#[test]
fn test_lone_full_duration_staker_earns_everything() {
    let mut w = world();
    let mut alice = w.staker(1, 100);
    w.deposit(&mut alice, 100, 0).expect("deposit");

    let record = w
        .withdraw(&mut alice, RECIPIENT, 100, 100 * DAY)
        .expect("withdraw");

    assert_eq!(w.reward_of(&RECIPIENT), 1_000);
    assert_eq!(w.pool_reward_balance(), 0);
    assert_eq!(w.ledger.balance_of(&RECIPIENT, &w.staking), 100);
    assert!(matches!(
        record.kind,
        SettlementKind::Withdrawn {
            reward: 1_000,
            forfeited: 0,
            ..
        }
    ));
}

/// Withdrawing in the deposit block earns nothing.
#[test]
fn test_same_block_withdrawal_earns_nothing() {
    let mut w = world();
    let mut alice = w.staker(1, 100);
    w.deposit(&mut alice, 100, 0).expect("deposit");

    assert_eq!(w.pool.multiplier_at(0).expect("multiplier"), 3_300);
    w.withdraw(&mut alice, RECIPIENT, 100, 0).expect("withdraw");

    assert_eq!(w.reward_of(&RECIPIENT), 0);
    assert_eq!(w.pool_reward_balance(), 1_000);
    assert_eq!(w.ledger.balance_of(&RECIPIENT, &w.staking), 100);
}

/// Equal stakers split the unlocked value evenly.
#[test]
fn test_equal_stakers_split_evenly() {
    let mut w = world();
    let mut alice = w.staker(1, 100);
    let mut bob = w.staker(2, 100);
    w.deposit(&mut alice, 100, 0).expect("alice");
    w.deposit(&mut bob, 100, 0).expect("bob");

    w.withdraw(&mut alice, [0xA0; 32], 100, 100 * DAY)
        .expect("alice withdraw");
    w.withdraw(&mut bob, [0xB0; 32], 100, 100 * DAY)
        .expect("bob withdraw");

    assert_eq!(w.reward_of(&[0xA0; 32]), 500);
    assert_eq!(w.reward_of(&[0xB0; 32]), 500);
    assert_eq!(w.pool_reward_balance(), 0);
}

/// A supply expansion of the reward token flows to stakers.
#[test]
fn test_reward_expansion_flows_to_stakers() {
    let mut w = world();
    let mut alice = w.staker(1, 100);
    w.deposit(&mut alice, 100, 0).expect("deposit");

    let reward = w.reward;
    w.ledger.rebase(&reward, 2, 1).expect("rebase");
    assert_eq!(w.pool_reward_balance(), 2_000);

    w.withdraw(&mut alice, RECIPIENT, 100, 100 * DAY)
        .expect("withdraw");
    assert_eq!(w.reward_of(&RECIPIENT), 2_000);
}

/// A contraction of the reward token halves the payout.
#[test]
fn test_reward_contraction_halves_payout() {
    let mut w = world();
    let mut alice = w.staker(1, 100);
    w.deposit(&mut alice, 100, 0).expect("deposit");

    let reward = w.reward;
    w.ledger.rebase(&reward, 1, 2).expect("rebase");
    w.withdraw(&mut alice, RECIPIENT, 100, 100 * DAY)
        .expect("withdraw");
    assert_eq!(w.reward_of(&RECIPIENT), 500);
}

/// A withdrawal half-way up the ramp forfeits part of the base reward,
/// which stays in the pool for the remaining stakers.
#[test]
fn test_early_exit_forfeits_to_remaining_stakers() {
    let mut w = world();
    let mut alice = w.staker(1, 100);
    let mut bob = w.staker(2, 100);
    w.deposit(&mut alice, 100, 0).expect("alice");
    w.deposit(&mut bob, 100, 0).expect("bob");

    // 15 days in: 150 unlocked, base 75, multiplier 66.5%
    w.withdraw(&mut alice, [0xA0; 32], 100, 15 * DAY)
        .expect("alice withdraw");
    let alice_reward = w.reward_of(&[0xA0; 32]);
    assert_eq!(alice_reward, 49);

    w.withdraw(&mut bob, [0xB0; 32], 100, 100 * DAY)
        .expect("bob withdraw");
    assert_eq!(w.reward_of(&[0xB0; 32]), 1_000 - alice_reward);
}
