//! XP award calculation.
//!
//! A suggested award is `round(base * modifier * anti_exploit)` where:
//! - `base` comes from the work item's difficulty
//! - `modifier` starts at 1.0, gains [`NOVICE_BONUS`] for novices plus the
//!   caller's challenge and quality deltas, and is clamped into
//!   [`MODIFIER_MIN`]..=[`MODIFIER_MAX`]
//! - `anti_exploit` is the quota-based [`diminishing_returns`] factor for
//!   the repetition count
//!
//! Awards are only suggestions until a reviewer approves them.

use serde::{Deserialize, Serialize};

use crate::models::{MAX_DIFFICULTY, MIN_DIFFICULTY};

/// Base XP by difficulty 1..=5.
pub const BASE_XP_BY_DIFFICULTY: [u32; 5] = [5, 10, 15, 20, 25];

/// Modifier bonus for fighters at level 1 or below in the skill.
pub const NOVICE_BONUS: f64 = 0.2;

/// Bounds of the combined modifier.
pub const MODIFIER_MIN: f64 = 0.7;
pub const MODIFIER_MAX: f64 = 1.4;

/// Highest level still considered a novice.
pub const NOVICE_MAX_LEVEL: u8 = 1;

/// Base XP for a difficulty. Out-of-range difficulties are clamped into 1..=5.
pub fn base_xp_for_difficulty(difficulty: u8) -> u32 {
    let d = difficulty.clamp(MIN_DIFFICULTY, MAX_DIFFICULTY);
    BASE_XP_BY_DIFFICULTY[(d - 1) as usize]
}

/// Returns true if a fighter at `level` gets the novice bonus.
pub fn is_novice(level: u8) -> bool {
    level <= NOVICE_MAX_LEVEL
}

/// Clamp a modifier into [`MODIFIER_MIN`]..=[`MODIFIER_MAX`]. Non-finite values become 1.0.
pub fn clamp_modifier(modifier: f64) -> f64 {
    if !modifier.is_finite() {
        return 1.0;
    }
    modifier.clamp(MODIFIER_MIN, MODIFIER_MAX)
}

/// Normalize an XP amount: non-finite → 0, otherwise rounded and floored at 0.
pub fn normalize_xp(value: f64) -> u32 {
    if !value.is_finite() {
        return 0;
    }
    value.round().clamp(0.0, u32::MAX as f64) as u32
}

/// Quota-based diminishing returns.
///
/// Factor is 1.0 while `count <= free_quota`, then decays linearly by
/// `step` per extra repetition, floored at `min_factor`. The result always
/// lies in `0.0..=1.0`; a negative or non-finite `step` counts as 0 and a
/// non-finite `min_factor` as 0.
pub fn diminishing_returns(count: u32, free_quota: u32, step: f64, min_factor: f64) -> f64 {
    if count <= free_quota {
        return 1.0;
    }
    let step = if step.is_finite() { step.max(0.0) } else { 0.0 };
    let min_factor = if min_factor.is_finite() { min_factor } else { 0.0 };
    let extra = (count - free_quota) as f64;
    (1.0 - extra * step).max(min_factor).clamp(0.0, 1.0)
}

/// Tunable diminishing-returns curve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiminishingReturns {
    /// Repetitions allowed before decay starts
    pub free_quota: u32,
    /// Factor lost per repetition beyond the quota
    pub step: f64,
    /// Lowest factor the curve can reach
    pub min_factor: f64,
}

impl Default for DiminishingReturns {
    fn default() -> Self {
        Self {
            free_quota: 3,
            step: 0.1,
            min_factor: 0.5,
        }
    }
}

impl DiminishingReturns {
    /// Factor for a repetition count.
    pub fn factor(&self, count: u32) -> f64 {
        diminishing_returns(count, self.free_quota, self.step, self.min_factor)
    }
}

/// Inputs for one (fighter, skill) award.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct XpInput {
    pub difficulty: u8,
    pub is_novice: bool,
    /// Modifier delta for unusually demanding work
    #[serde(default)]
    pub challenge: f64,
    /// Modifier delta from the reviewer's quality assessment
    #[serde(default)]
    pub quality_adj: f64,
    /// Similar recent work items for the same line
    #[serde(default)]
    pub repetition_count: u32,
}

impl XpInput {
    /// Input with no challenge/quality deltas.
    pub fn new(difficulty: u8, is_novice: bool, repetition_count: u32) -> Self {
        Self {
            difficulty,
            is_novice,
            challenge: 0.0,
            quality_adj: 0.0,
            repetition_count,
        }
    }
}

/// Combined, clamped modifier for an input.
pub fn modifier_for(input: &XpInput) -> f64 {
    let mut modifier = 1.0;
    if input.is_novice {
        modifier += NOVICE_BONUS;
    }
    // Non-finite deltas are ignored rather than poisoning the award.
    if input.challenge.is_finite() {
        modifier += input.challenge;
    }
    if input.quality_adj.is_finite() {
        modifier += input.quality_adj;
    }
    clamp_modifier(modifier)
}

/// Suggested XP with the default diminishing-returns curve.
pub fn compute_suggested_xp(input: &XpInput) -> u32 {
    compute_suggested_xp_with(input, &DiminishingReturns::default())
}

/// Suggested XP with a caller-supplied diminishing-returns curve.
pub fn compute_suggested_xp_with(input: &XpInput, curve: &DiminishingReturns) -> u32 {
    let base = base_xp_for_difficulty(input.difficulty) as f64;
    let anti_exploit = curve.factor(input.repetition_count);
    normalize_xp(base * modifier_for(input) * anti_exploit)
}
