//! Repetition penalty against XP farming.
//!
//! Counts how many recent, credited work items look like the same work for
//! the same (fighter, skill) line, and turns that count into a
//! diminishing-returns factor. A work item counts as similar when all hold:
//!
//! 1. its status is `done` or `validation`
//! 2. its effective timestamp (approved, else submitted, else created) is
//!    no older than `window_days` before `now`
//! 3. its difficulty is within 1 of the queried difficulty
//! 4. a single assignee record matches both the fighter and the skill
//! 5. its title meets the Jaccard threshold ([`SIMILARITY_THRESHOLD`] by default)

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::models::WorkItem;
use crate::models::similarity::{SIMILARITY_THRESHOLD, jaccard, tokenize};
use crate::models::xp::DiminishingReturns;

/// Default trailing window for repetition counting.
pub const DEFAULT_WINDOW_DAYS: u32 = 7;

/// The (fighter, skill) line being composed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TaskLineQuery<'a> {
    pub fighter_id: &'a str,
    pub skill_id: &'a str,
    pub difficulty: u8,
    pub title: &'a str,
    pub window_days: u32,
    pub similarity_threshold: f64,
    /// Work item being edited; never counts against itself
    pub exclude_task_id: Option<&'a str>,
}

impl<'a> TaskLineQuery<'a> {
    pub fn new(fighter_id: &'a str, skill_id: &'a str, difficulty: u8, title: &'a str) -> Self {
        Self {
            fighter_id,
            skill_id,
            difficulty,
            title,
            window_days: DEFAULT_WINDOW_DAYS,
            similarity_threshold: SIMILARITY_THRESHOLD,
            exclude_task_id: None,
        }
    }

    pub fn with_window_days(mut self, window_days: u32) -> Self {
        self.window_days = window_days;
        self
    }

    pub fn with_similarity_threshold(mut self, threshold: f64) -> Self {
        self.similarity_threshold = threshold;
        self
    }

    pub fn excluding(mut self, task_id: &'a str) -> Self {
        self.exclude_task_id = Some(task_id);
        self
    }
}

/// Timestamp used for windowing: approved, else submitted, else created.
pub fn effective_timestamp(item: &WorkItem) -> DateTime<Utc> {
    item.approved_at
        .or(item.submitted_at)
        .unwrap_or(item.created_at)
}

fn is_similar(
    item: &WorkItem,
    query: &TaskLineQuery<'_>,
    title_tokens: &HashSet<String>,
    cutoff: DateTime<Utc>,
) -> bool {
    if query.exclude_task_id == Some(item.id.as_str()) {
        return false;
    }
    if !item.status.is_credited() {
        return false;
    }
    if effective_timestamp(item) < cutoff {
        return false;
    }
    if item.difficulty.abs_diff(query.difficulty) > 1 {
        return false;
    }
    if !item.has_line(query.fighter_id, query.skill_id) {
        return false;
    }
    jaccard(&tokenize(&item.title), title_tokens) >= query.similarity_threshold
}

/// Count similar work items for a line in the trailing window before `now`.
pub fn count_similar_for_task_line(
    history: &[WorkItem],
    query: &TaskLineQuery<'_>,
    now: DateTime<Utc>,
) -> u32 {
    let cutoff = Duration::try_days(i64::from(query.window_days))
        .and_then(|window| now.checked_sub_signed(window))
        .unwrap_or(DateTime::<Utc>::MIN_UTC);
    let title_tokens = tokenize(query.title);

    history
        .iter()
        .filter(|item| is_similar(item, query, &title_tokens, cutoff))
        .count() as u32
}

/// Repetition count and the factor derived from it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepetitionFactor {
    pub count: u32,
    pub factor: f64,
}

/// Count similar work and run the count through a diminishing-returns curve.
pub fn repetition_factor_from_tasks(
    history: &[WorkItem],
    query: &TaskLineQuery<'_>,
    now: DateTime<Utc>,
    curve: &DiminishingReturns,
) -> RepetitionFactor {
    let count = count_similar_for_task_line(history, query, now);
    RepetitionFactor {
        count,
        factor: curve.factor(count),
    }
}
