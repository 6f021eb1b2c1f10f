//! Duration multiplier ramp.
//!
//! ```text
//! multiplier(d) = floor% + (ceiling% - floor%) * min(d, ramp) / ramp
//! ```
//!
//! The multiplier is carried as an exact ratio `num / den` with
//! `den = 100 * ramp`, so scaling a reward floors exactly once.

use serde::{Deserialize, Serialize};

use geyser_types::PERCENT;

use crate::math::mul_div;
use crate::{EngineError, Result};

/// Parameters of the withdrawal multiplier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScalingParams {
    pub floor_pct: u32,
    pub ceiling_pct: u32,
    /// Seconds of stake age to reach `ceiling_pct`.
    pub ramp_duration: u64,
}

impl ScalingParams {
    /// Validate and build scaling parameters.
    ///
    /// # Errors
    ///
    /// - [`EngineError::InvalidScaling`] unless
    ///   `floor_pct <= ceiling_pct <= 100` and `ramp_duration > 0`
    pub fn new(floor_pct: u32, ceiling_pct: u32, ramp_duration: u64) -> Result<Self> {
        let params = Self {
            floor_pct,
            ceiling_pct,
            ramp_duration,
        };
        params.validate()?;
        Ok(params)
    }

    pub fn validate(&self) -> Result<()> {
        if self.floor_pct > self.ceiling_pct {
            return Err(EngineError::InvalidScaling(format!(
                "floor {}% above ceiling {}%",
                self.floor_pct, self.ceiling_pct
            )));
        }
        if u128::from(self.ceiling_pct) > PERCENT {
            return Err(EngineError::InvalidScaling(format!(
                "ceiling {}% above 100%",
                self.ceiling_pct
            )));
        }
        if self.ramp_duration == 0 {
            return Err(EngineError::InvalidScaling(
                "ramp duration is zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Multiplier at `duration` as `(numerator, denominator)`.
    ///
    /// An inverted range from an unvalidated snapshot degrades to a flat
    /// `floor_pct` multiplier.
    pub fn ratio(&self, duration: u64) -> (u128, u128) {
        let ramp = u128::from(self.ramp_duration);
        let held = u128::from(duration.min(self.ramp_duration));
        let floor = u128::from(self.floor_pct);
        let spread = u128::from(self.ceiling_pct.saturating_sub(self.floor_pct));
        // Bounded by 100 * u64::MAX, far inside u128.
        (floor * ramp + spread * held, PERCENT * ramp)
    }

    /// Scale `base` by the multiplier at `duration`.
    pub fn apply(&self, base: u128, duration: u64) -> Result<u128> {
        let (num, den) = self.ratio(duration);
        mul_div(base, num, den)
    }

    /// Multiplier at `duration` in basis points, floored.
    pub fn multiplier_bps(&self, duration: u64) -> Result<u32> {
        let (num, den) = self.ratio(duration);
        let bps = mul_div(10_000, num, den)?;
        u32::try_from(bps).map_err(|_| EngineError::Overflow)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> ScalingParams {
        ScalingParams::new(33, 100, 60 * geyser_types::SECONDS_PER_DAY).expect("params")
    }

    #[test]
    fn test_floor_at_zero_duration() {
        assert_eq!(params().multiplier_bps(0).expect("bps"), 3_300);
        assert_eq!(params().apply(1_000, 0).expect("apply"), 330);
    }

    #[test]
    fn test_ceiling_at_and_after_ramp() {
        let p = params();
        assert_eq!(p.multiplier_bps(p.ramp_duration).expect("bps"), 10_000);
        assert_eq!(p.multiplier_bps(u64::MAX).expect("bps"), 10_000);
        assert_eq!(p.apply(1_000, p.ramp_duration * 3).expect("apply"), 1_000);
    }

    #[test]
    fn test_linear_midpoint() {
        let p = ScalingParams::new(20, 80, 100).expect("params");
        assert_eq!(p.multiplier_bps(50).expect("bps"), 5_000);
        assert_eq!(p.apply(1_000, 50).expect("apply"), 500);
    }

    #[test]
    fn test_bounds_hold_for_all_durations() {
        let p = params();
        let mut previous = 0;
        for d in (0..p.ramp_duration * 2).step_by(3_607) {
            let bps = p.multiplier_bps(d).expect("bps");
            assert!((3_300..=10_000).contains(&bps));
            assert!(bps >= previous);
            previous = bps;
        }
    }

    #[test]
    fn test_inverted_snapshot_is_flat() {
        let p: ScalingParams =
            serde_json::from_str(r#"{"floor_pct":60,"ceiling_pct":40,"ramp_duration":10}"#)
                .expect("deserialize");
        assert!(p.validate().is_err());
        assert_eq!(p.multiplier_bps(0).expect("bps"), 6_000);
        assert_eq!(p.multiplier_bps(10).expect("bps"), 6_000);
    }

    #[test]
    fn test_invalid_params_rejected() {
        assert!(ScalingParams::new(50, 40, 10).is_err());
        assert!(ScalingParams::new(50, 101, 10).is_err());
        assert!(ScalingParams::new(50, 60, 0).is_err());
        assert!(ScalingParams::new(100, 100, 1).is_ok());
    }
}
