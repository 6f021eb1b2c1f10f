//! Append-only reward schedule log.

use geyser_engine::RewardSchedule;
use geyser_types::PoolId;
use rusqlite::Connection;

use crate::{parse_amount, Result};

/// Append a funding schedule.
pub fn append_schedule(conn: &Connection, pool_id: &PoolId, schedule: &RewardSchedule) -> Result<()> {
    conn.execute(
        "INSERT INTO reward_schedules (pool_id, start, duration, shares)
         VALUES (?1, ?2, ?3, ?4)",
        rusqlite::params![
            pool_id.as_slice(),
            schedule.start as i64,
            schedule.duration as i64,
            schedule.shares.to_string(),
        ],
    )?;
    Ok(())
}

/// Schedules of a pool in funding order.
pub fn list_schedules(conn: &Connection, pool_id: &PoolId) -> Result<Vec<RewardSchedule>> {
    let mut stmt = conn.prepare(
        "SELECT start, duration, shares FROM reward_schedules
         WHERE pool_id = ?1 ORDER BY id ASC",
    )?;
    let rows = stmt
        .query_map([pool_id.as_slice()], |row| {
            Ok((
                row.get::<_, i64>(0)? as u64,
                row.get::<_, i64>(1)? as u64,
                row.get::<_, String>(2)?,
            ))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    rows.into_iter()
        .map(|(start, duration, shares)| {
            Ok(RewardSchedule {
                start,
                duration,
                shares: parse_amount(&shares)?,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::pools::save_pool;
    use geyser_engine::{Pool, PoolConfig, ScalingParams};

    #[test]
    fn test_append_and_list_in_order() {
        let conn = crate::open_memory().expect("open");
        let pool = Pool::create(
            PoolConfig {
                admin: [0xAD; 32],
                staking_asset: [1; 32],
                reward_asset: [2; 32],
                scaling: ScalingParams::new(0, 100, 10).expect("scaling"),
            },
            0,
        )
        .expect("pool");
        save_pool(&conn, &pool, 0).expect("save pool");

        let a = RewardSchedule {
            start: 0,
            duration: 10,
            shares: 1_000_000,
        };
        let b = RewardSchedule {
            start: 5,
            duration: 20,
            shares: u128::MAX,
        };
        append_schedule(&conn, &pool.id, &a).expect("a");
        append_schedule(&conn, &pool.id, &b).expect("b");

        assert_eq!(list_schedules(&conn, &pool.id).expect("list"), vec![a, b]);
    }

    #[test]
    fn test_unknown_pool_rejected() {
        let conn = crate::open_memory().expect("open");
        let schedule = RewardSchedule {
            start: 0,
            duration: 1,
            shares: 1,
        };
        assert!(append_schedule(&conn, &[9; 32], &schedule).is_err());
    }
}
