//! XP thresholds and levels.
//!
//! Levels run from 0 (no progress) to [`MAX_LEVEL`]. The table is a fixed,
//! strictly increasing lookup (`25 * level²`), and [`level_from_xp`] is its
//! floor inverse: the highest level whose threshold does not exceed the XP.

use serde::{Deserialize, Serialize};

/// Highest reachable level.
pub const MAX_LEVEL: u8 = 10;

/// XP required to reach each level, indexed by level.
pub const XP_THRESHOLDS: [u32; MAX_LEVEL as usize + 1] =
    [0, 25, 100, 225, 400, 625, 900, 1225, 1600, 2025, 2500];

/// XP required to reach `level`. Out-of-range levels fall back to 0.
pub fn xp_threshold_for_level(level: u8) -> u32 {
    XP_THRESHOLDS.get(level as usize).copied().unwrap_or(0)
}

/// Highest level whose threshold is at or below `xp`.
pub fn level_from_xp(xp: u32) -> u8 {
    XP_THRESHOLDS
        .iter()
        .rposition(|&threshold| threshold <= xp)
        .map(|idx| idx as u8)
        .unwrap_or(0)
}

/// Where a cumulative XP total sits between two levels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelProgress {
    pub level: u8,
    pub xp: u32,
    /// Threshold of the current level
    pub current_threshold: u32,
    /// Threshold of the next level, `None` at max level
    pub next_threshold: Option<u32>,
    /// Percentage of the way to the next level (0-100)
    pub pct_to_next: u8,
}

/// Compute level progress for display.
pub fn level_progress(xp: u32) -> LevelProgress {
    let level = level_from_xp(xp);
    let current_threshold = xp_threshold_for_level(level);
    let next_threshold = (level < MAX_LEVEL).then(|| xp_threshold_for_level(level + 1));

    let pct_to_next = match next_threshold {
        Some(next) => {
            let span = (next - current_threshold) as f64;
            (((xp - current_threshold) as f64 / span) * 100.0).round() as u8
        }
        None => 100,
    };

    LevelProgress {
        level,
        xp,
        current_threshold,
        next_threshold,
        pct_to_next,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thresholds_strictly_increasing() {
        for pair in XP_THRESHOLDS.windows(2) {
            assert!(pair[0] < pair[1]);
        }
        assert_eq!(XP_THRESHOLDS[0], 0);
    }

    #[test]
    fn test_level_from_threshold_roundtrip() {
        for level in 0..=MAX_LEVEL {
            assert_eq!(level_from_xp(xp_threshold_for_level(level)), level);
        }
    }

    #[test]
    fn test_level_from_xp_is_monotonic() {
        let mut previous = 0;
        for xp in 0..3000 {
            let level = level_from_xp(xp);
            assert!(level >= previous, "level dropped at xp {}", xp);
            previous = level;
        }
    }

    #[test]
    fn test_level_from_xp_floors_between_thresholds() {
        assert_eq!(level_from_xp(0), 0);
        assert_eq!(level_from_xp(24), 0);
        assert_eq!(level_from_xp(25), 1);
        assert_eq!(level_from_xp(399), 3);
        assert_eq!(level_from_xp(400), 4);
        assert_eq!(level_from_xp(u32::MAX), MAX_LEVEL);
    }

    #[test]
    fn test_out_of_range_level_threshold_is_zero() {
        assert_eq!(xp_threshold_for_level(11), 0);
        assert_eq!(xp_threshold_for_level(255), 0);
    }

    #[test]
    fn test_level_progress() {
        let progress = level_progress(250);
        assert_eq!(progress.level, 3);
        assert_eq!(progress.current_threshold, 225);
        assert_eq!(progress.next_threshold, Some(400));
        // 25 of 175
        assert_eq!(progress.pct_to_next, 14);

        let maxed = level_progress(9999);
        assert_eq!(maxed.level, MAX_LEVEL);
        assert_eq!(maxed.next_threshold, None);
        assert_eq!(maxed.pct_to_next, 100);
    }
}
