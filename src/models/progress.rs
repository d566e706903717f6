//! Checklist progress rollups for skills and categories.
//!
//! Progress counts template checklist items (`SkillLevel::items`), not
//! work items. Archived skills are left out of category rollups entirely.

use serde::{Deserialize, Serialize};

use crate::models::{Category, Skill};

/// Checklist completion statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    /// Total checklist items
    pub total: usize,
    /// Items marked done
    pub done: usize,
    /// Completion percentage (0-100), 0 when there are no items
    pub pct: u8,
}

impl Progress {
    /// Create progress stats from counts.
    pub fn new(total: usize, done: usize) -> Self {
        let pct = if total > 0 {
            ((done as f64 / total as f64) * 100.0).round() as u8
        } else {
            0
        };
        Self { total, done, pct }
    }

    fn counts(skill: &Skill) -> (usize, usize) {
        skill.levels.iter().fold((0, 0), |(total, done), level| {
            (
                total + level.items.len(),
                done + level.items.iter().filter(|i| i.done).count(),
            )
        })
    }
}

/// Progress across every template level of a skill.
pub fn skill_progress(skill: &Skill) -> Progress {
    let (total, done) = Progress::counts(skill);
    Progress::new(total, done)
}

/// Progress across the non-archived skills of a category.
pub fn category_progress(category: &Category) -> Progress {
    let (total, done) = category
        .active_skills()
        .map(Progress::counts)
        .fold((0, 0), |(t, d), (st, sd)| (t + st, d + sd));
    Progress::new(total, done)
}

/// Progress across the whole tree.
pub fn tree_progress(categories: &[Category]) -> Progress {
    let (total, done) = categories
        .iter()
        .flat_map(|c| c.active_skills())
        .map(Progress::counts)
        .fold((0, 0), |(t, d), (st, sd)| (t + st, d + sd));
    Progress::new(total, done)
}
