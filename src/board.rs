//! Task-board operations on work items.
//!
//! Composing a work item asks the XP calculator, for each assigned
//! (fighter, skill) line, to suggest XP using the repetition penalty and the
//! fighter's current level. Approval promotes suggested XP to approved XP
//! and hands back an [`XpAward`] to merge into the roster ledger.
//!
//! Deleting a work item never retracts XP it already awarded.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::models::repetition::{
    DEFAULT_WINDOW_DAYS, RepetitionFactor, TaskLineQuery, repetition_factor_from_tasks,
};
use crate::models::similarity::SIMILARITY_THRESHOLD;
use crate::models::xp::{
    DiminishingReturns, XpInput, base_xp_for_difficulty, compute_suggested_xp_with, is_novice,
    modifier_for, normalize_xp,
};
use crate::models::{
    Assignee, Comment, MAX_DIFFICULTY, MIN_DIFFICULTY, StatusChange, WorkItem, WorkItemStatus,
};
use crate::storage::generate_unique_id;
use crate::sync::{AssignmentHook, RosterState, StrippedAssignment, SyncReport, XpAward};
use crate::{Error, Result};

/// How suggestions are computed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct XpPolicy {
    /// Trailing window for repetition counting
    pub window_days: u32,
    /// Diminishing-returns curve shared by both anti-exploit layers
    pub curve: DiminishingReturns,
    /// Jaccard score at which titles count as repeated work
    pub similarity_threshold: f64,
    /// Multiply the window factor on top of the quota layer
    pub stack_repetition_factor: bool,
}

impl Default for XpPolicy {
    fn default() -> Self {
        Self {
            window_days: DEFAULT_WINDOW_DAYS,
            curve: DiminishingReturns::default(),
            similarity_threshold: SIMILARITY_THRESHOLD,
            stack_repetition_factor: false,
        }
    }
}

/// Reviewer-supplied modifier deltas.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct XpAdjustments {
    pub challenge: f64,
    pub quality_adj: f64,
}

/// Suggested XP for one (fighter, skill) line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineSuggestion {
    pub fighter_id: String,
    pub skill_id: String,
    pub level: u8,
    pub is_novice: bool,
    pub repetition: RepetitionFactor,
    pub suggested_xp: u32,
}

/// Suggest XP for a single line against the work history.
pub fn suggest_line(
    history: &[WorkItem],
    roster: &RosterState,
    policy: &XpPolicy,
    query: &TaskLineQuery<'_>,
    adjustments: XpAdjustments,
    now: DateTime<Utc>,
) -> LineSuggestion {
    let level = roster.level(query.fighter_id, query.skill_id);
    let novice = is_novice(level);
    let query = query
        .with_window_days(policy.window_days)
        .with_similarity_threshold(policy.similarity_threshold);
    let repetition = repetition_factor_from_tasks(history, &query, now, &policy.curve);

    let input = XpInput {
        difficulty: query.difficulty,
        is_novice: novice,
        challenge: adjustments.challenge,
        quality_adj: adjustments.quality_adj,
        repetition_count: repetition.count,
    };

    let suggested_xp = if policy.stack_repetition_factor {
        let raw = base_xp_for_difficulty(input.difficulty) as f64
            * modifier_for(&input)
            * policy.curve.factor(repetition.count)
            * repetition.factor;
        normalize_xp(raw)
    } else {
        compute_suggested_xp_with(&input, &policy.curve)
    };

    LineSuggestion {
        fighter_id: query.fighter_id.to_string(),
        skill_id: query.skill_id.to_string(),
        level,
        is_novice: novice,
        repetition,
        suggested_xp,
    }
}

/// Recompute suggested XP for every line of a work item, writing it back.
pub fn refresh_suggestions(
    item: &mut WorkItem,
    history: &[WorkItem],
    roster: &RosterState,
    policy: &XpPolicy,
    adjustments: XpAdjustments,
    now: DateTime<Utc>,
) -> Vec<LineSuggestion> {
    let mut suggestions = Vec::new();
    let (title, difficulty, id) = (item.title.clone(), item.difficulty, item.id.clone());

    for assignee in &mut item.assignees {
        for line in &mut assignee.skills {
            let query =
                TaskLineQuery::new(&assignee.fighter_id, &line.skill_id, difficulty, &title)
                    .excluding(&id);
            let suggestion = suggest_line(history, roster, policy, &query, adjustments, now);
            line.suggested_xp = suggestion.suggested_xp;
            suggestions.push(suggestion);
        }
    }
    suggestions
}

/// Input for a new work item.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkItemDraft {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub difficulty: u8,
    #[serde(default)]
    pub priority: bool,
    #[serde(default)]
    pub assignees: Vec<Assignee>,
    #[serde(default)]
    pub adjustments: XpAdjustments,
}

/// Create a work item in `todo` with suggested XP on every line.
pub fn create_work_item(
    draft: WorkItemDraft,
    history: &[WorkItem],
    roster: &RosterState,
    policy: &XpPolicy,
    now: DateTime<Utc>,
) -> Result<(WorkItem, Vec<LineSuggestion>)> {
    if draft.title.trim().is_empty() {
        return Err(Error::InvalidInput("work item title is required".to_string()));
    }
    if !(MIN_DIFFICULTY..=MAX_DIFFICULTY).contains(&draft.difficulty) {
        return Err(Error::InvalidInput(format!(
            "difficulty must be {}-{}, got {}",
            MIN_DIFFICULTY, MAX_DIFFICULTY, draft.difficulty
        )));
    }

    let id = generate_unique_id("wi", &draft.title, history.iter().map(|i| i.id.as_str()));
    let mut item = WorkItem::new(id, draft.title, draft.difficulty);
    item.description = draft.description;
    item.priority = draft.priority;
    item.assignees = draft.assignees;
    item.created_at = now;

    let suggestions = refresh_suggestions(&mut item, history, roster, policy, draft.adjustments, now);
    Ok((item, suggestions))
}

impl WorkItem {
    /// Move to another status, recording the change.
    ///
    /// Any move between todo, in_progress, validation and done is allowed,
    /// including regressions. `archived` is reachable from `done` only and
    /// is left via [`WorkItem::restore`]. Returns false for a same-status move.
    pub fn transition(&mut self, to: WorkItemStatus, now: DateTime<Utc>) -> Result<bool> {
        let from = self.status;
        if from == to {
            return Ok(false);
        }
        let allowed = match (from, to) {
            (WorkItemStatus::Archived, _) => false,
            (WorkItemStatus::Done, WorkItemStatus::Archived) => true,
            (_, WorkItemStatus::Archived) => false,
            _ => true,
        };
        if !allowed {
            return Err(Error::InvalidTransition { from, to });
        }

        if to == WorkItemStatus::Validation {
            self.submitted_at = Some(now);
        }
        self.record_change(from, to, now);
        Ok(true)
    }

    /// Bring an archived work item back to `done`.
    pub fn restore(&mut self, now: DateTime<Utc>) -> Result<()> {
        if self.status != WorkItemStatus::Archived {
            return Err(Error::InvalidTransition {
                from: self.status,
                to: WorkItemStatus::Done,
            });
        }
        self.record_change(WorkItemStatus::Archived, WorkItemStatus::Done, now);
        Ok(())
    }

    fn record_change(&mut self, from: WorkItemStatus, to: WorkItemStatus, now: DateTime<Utc>) {
        self.status = to;
        self.history.status_changes.push(StatusChange {
            from_status: from,
            to_status: to,
            changed_at: now,
        });
    }

    /// Append a comment.
    pub fn add_comment(
        &mut self,
        author: impl Into<String>,
        message: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Result<&Comment> {
        let message = message.into();
        if message.trim().is_empty() {
            return Err(Error::InvalidInput("comment message is empty".to_string()));
        }
        let id = generate_unique_id(
            "cmt",
            &format!("{}{}", self.id, message),
            self.history.comments.iter().map(|c| c.id.as_str()),
        );
        self.history.comments.push(Comment {
            id,
            author: author.into(),
            message,
            created_at: now,
        });
        Ok(&self.history.comments[self.history.comments.len() - 1])
    }

    /// Override the XP a line will receive on approval.
    pub fn set_approved_xp(&mut self, fighter_id: &str, skill_id: &str, xp: f64) -> Result<()> {
        if self.approved_at.is_some() {
            return Err(Error::AlreadyApproved(self.id.clone()));
        }
        let line = self
            .assignees
            .iter_mut()
            .filter(|a| a.fighter_id == fighter_id)
            .flat_map(|a| a.skills.iter_mut())
            .find(|l| l.skill_id == skill_id)
            .ok_or_else(|| {
                Error::NotFound(format!("line {}/{} on {}", fighter_id, skill_id, self.id))
            })?;
        line.approved_xp = Some(normalize_xp(xp));
        Ok(())
    }

    /// Approve: promote suggested XP to approved XP and move to `done`.
    ///
    /// Lines that already carry an approved override keep it.
    pub fn approve(&mut self, now: DateTime<Utc>) -> Result<XpAward> {
        if self.approved_at.is_some() {
            return Err(Error::AlreadyApproved(self.id.clone()));
        }
        if self.status == WorkItemStatus::Archived {
            return Err(Error::InvalidTransition {
                from: self.status,
                to: WorkItemStatus::Done,
            });
        }

        let mut award = XpAward::new();
        for assignee in &mut self.assignees {
            for line in &mut assignee.skills {
                let xp = *line.approved_xp.get_or_insert(line.suggested_xp);
                let entry = award
                    .entry(assignee.fighter_id.clone())
                    .or_insert_with(BTreeMap::new)
                    .entry(line.skill_id.clone())
                    .or_insert(0);
                *entry = entry.saturating_add(xp);
            }
        }

        self.approved_at = Some(now);
        if self.status != WorkItemStatus::Done {
            let from = self.status;
            self.record_change(from, WorkItemStatus::Done, now);
        }

        tracing::info!(
            work_item = %self.id,
            fighters = award.len(),
            xp = award.values().flat_map(|m| m.values()).sum::<u32>(),
            "work item approved"
        );
        Ok(award)
    }
}

/// Remove a fighter from every assignee list. Returns the records removed
/// with their positions.
pub fn strip_fighter(items: &mut [WorkItem], fighter_id: &str) -> Vec<StrippedAssignment> {
    let mut stripped = Vec::new();
    for item in items.iter_mut() {
        let assignees = std::mem::take(&mut item.assignees);
        for (index, assignee) in assignees.into_iter().enumerate() {
            if assignee.fighter_id == fighter_id {
                stripped.push(StrippedAssignment {
                    work_item_id: item.id.clone(),
                    index,
                    assignee,
                });
            } else {
                item.assignees.push(assignee);
            }
        }
    }
    stripped
}

/// Re-insert stripped assignee records at their captured positions.
///
/// Records for work items that no longer exist are skipped. Returns how
/// many were re-inserted.
pub fn restore_assignees(items: &mut [WorkItem], stripped: &[StrippedAssignment]) -> usize {
    let mut restored = 0;
    for entry in stripped {
        let Some(item) = items.iter_mut().find(|i| i.id == entry.work_item_id) else {
            continue;
        };
        let index = entry.index.min(item.assignees.len());
        item.assignees.insert(index, entry.assignee.clone());
        restored += 1;
    }
    restored
}

impl AssignmentHook for Vec<WorkItem> {
    fn fighter_removed(&mut self, fighter_id: &str) -> Vec<StrippedAssignment> {
        strip_fighter(self, fighter_id)
    }

    fn fighter_restored(&mut self, stripped: &[StrippedAssignment]) -> usize {
        restore_assignees(self, stripped)
    }
}

/// Find a work item by id.
pub fn find_mut<'a>(items: &'a mut [WorkItem], id: &str) -> Result<&'a mut WorkItem> {
    items
        .iter_mut()
        .find(|i| i.id == id)
        .ok_or_else(|| Error::NotFound(format!("Work item not found: {}", id)))
}

/// Approve a work item and merge its award into the roster.
pub fn approve_work_item(
    items: &mut [WorkItem],
    roster: &mut RosterState,
    id: &str,
    now: DateTime<Utc>,
) -> Result<(XpAward, SyncReport)> {
    let award = find_mut(items, id)?.approve(now)?;
    let report = roster.apply_award(&award);
    Ok((award, report))
}

/// Delete a work item. XP it already awarded stays in the ledger.
pub fn delete_work_item(items: &mut Vec<WorkItem>, id: &str) -> Result<WorkItem> {
    let pos = items
        .iter()
        .position(|i| i.id == id)
        .ok_or_else(|| Error::NotFound(format!("Work item not found: {}", id)))?;
    let item = items.remove(pos);
    if item.approved_at.is_some() {
        tracing::debug!(work_item = %item.id, "deleted approved work item; awarded XP is kept");
    }
    Ok(item)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SkillLine;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 5, 1, 9, 0, 0).unwrap()
    }

    fn draft(title: &str, difficulty: u8) -> WorkItemDraft {
        WorkItemDraft {
            title: title.to_string(),
            difficulty,
            assignees: vec![Assignee::new("ftr-a", vec![SkillLine::new("sk-recon", "cat-field")])],
            ..Default::default()
        }
    }

    fn roster_with_level(level: u8) -> RosterState {
        let mut roster = RosterState::default();
        roster.set_level("ftr-a", "sk-recon", level);
        roster
    }

    fn approved_history(title: &str, count: usize) -> Vec<WorkItem> {
        (0..count)
            .map(|i| {
                let mut item = WorkItem::new(format!("wi-h{}", i), title, 3);
                item.status = WorkItemStatus::Done;
                item.approved_at = Some(now() - Duration::days(1));
                item.assignees = draft(title, 3).assignees;
                item
            })
            .collect()
    }

    #[test]
    fn test_create_suggests_novice_xp() {
        let roster = roster_with_level(1);
        let (item, suggestions) =
            create_work_item(draft("Night recon patrol", 3), &[], &roster, &XpPolicy::default(), now())
                .unwrap();

        assert_eq!(item.status, WorkItemStatus::Todo);
        assert_eq!(item.created_at, now());
        assert!(item.id.starts_with("wi-"));
        assert_eq!(suggestions.len(), 1);
        assert!(suggestions[0].is_novice);
        assert_eq!(suggestions[0].repetition.count, 0);
        assert_eq!(item.assignees[0].skills[0].suggested_xp, 18);
    }

    #[test]
    fn test_out_of_range_policy_stays_total() {
        let roster = roster_with_level(1);
        let policy = XpPolicy {
            window_days: u32::MAX,
            curve: DiminishingReturns {
                free_quota: 0,
                step: -1.0,
                min_factor: 5.0,
            },
            ..Default::default()
        };
        let query = TaskLineQuery::new("ftr-a", "sk-recon", 3, "Night recon patrol");
        let suggestion =
            suggest_line(&[], &roster, &policy, &query, XpAdjustments::default(), now());
        assert_eq!(suggestion.repetition.count, 0);
        assert_eq!(suggestion.suggested_xp, 18);
    }

    #[test]
    fn test_create_rejects_bad_input() {
        let roster = RosterState::default();
        let policy = XpPolicy::default();
        assert!(matches!(
            create_work_item(draft("  ", 3), &[], &roster, &policy, now()),
            Err(Error::InvalidInput(_))
        ));
        assert!(matches!(
            create_work_item(draft("Drill", 6), &[], &roster, &policy, now()),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn test_quota_layer_only_by_default() {
        let roster = roster_with_level(4);
        let history = approved_history("Night recon patrol", 5);
        let (item, suggestions) =
            create_work_item(draft("Night recon patrol", 3), &history, &roster, &XpPolicy::default(), now())
                .unwrap();

        assert_eq!(suggestions[0].repetition.count, 5);
        // 15 * 1.0 * 0.8
        assert_eq!(item.assignees[0].skills[0].suggested_xp, 12);
    }

    #[test]
    fn test_stacked_layers() {
        let roster = roster_with_level(4);
        let history = approved_history("Night recon patrol", 5);
        let policy = XpPolicy {
            stack_repetition_factor: true,
            ..Default::default()
        };
        let (item, _) =
            create_work_item(draft("Night recon patrol", 3), &history, &roster, &policy, now()).unwrap();

        // 15 * 0.8 * 0.8 = 9.6
        assert_eq!(item.assignees[0].skills[0].suggested_xp, 10);
    }

    #[test]
    fn test_transitions_record_history() {
        let mut item = WorkItem::new("wi-1", "Drill", 2);
        assert!(item.transition(WorkItemStatus::InProgress, now()).unwrap());
        assert!(item.transition(WorkItemStatus::Validation, now()).unwrap());
        assert_eq!(item.submitted_at, Some(now()));
        // manual regression is tolerated
        assert!(item.transition(WorkItemStatus::InProgress, now()).unwrap());
        assert!(!item.transition(WorkItemStatus::InProgress, now()).unwrap());

        assert_eq!(item.history.status_changes.len(), 3);
        assert_eq!(item.history.status_changes[2].from_status, WorkItemStatus::Validation);
    }

    #[test]
    fn test_archive_only_from_done() {
        let mut item = WorkItem::new("wi-1", "Drill", 2);
        assert!(matches!(
            item.transition(WorkItemStatus::Archived, now()),
            Err(Error::InvalidTransition { .. })
        ));

        item.transition(WorkItemStatus::Done, now()).unwrap();
        item.transition(WorkItemStatus::Archived, now()).unwrap();
        assert!(item.transition(WorkItemStatus::Todo, now()).is_err());

        item.restore(now()).unwrap();
        assert_eq!(item.status, WorkItemStatus::Done);
        assert!(item.restore(now()).is_err());
    }

    #[test]
    fn test_approve_promotes_and_merges() {
        let mut roster = roster_with_level(1);
        let (mut item, _) =
            create_work_item(draft("Night recon patrol", 3), &[], &roster, &XpPolicy::default(), now())
                .unwrap();
        item.transition(WorkItemStatus::Validation, now()).unwrap();
        let id = item.id.clone();
        let mut items = vec![item];

        let (award, report) = approve_work_item(&mut items, &mut roster, &id, now()).unwrap();
        assert_eq!(award["ftr-a"]["sk-recon"], 18);
        assert_eq!(roster.xp("ftr-a", "sk-recon"), 25 + 18);
        assert_eq!(report.xp_written, 1);

        let item = &items[0];
        assert_eq!(item.status, WorkItemStatus::Done);
        assert_eq!(item.approved_at, Some(now()));
        assert_eq!(item.assignees[0].skills[0].approved_xp, Some(18));

        assert!(matches!(
            approve_work_item(&mut items, &mut roster, &id, now()),
            Err(Error::AlreadyApproved(_))
        ));
    }

    #[test]
    fn test_approved_override_is_kept() {
        let mut item = WorkItem::new("wi-1", "Drill", 2);
        item.assignees = draft("Drill", 2).assignees;
        item.assignees[0].skills[0].suggested_xp = 10;
        item.set_approved_xp("ftr-a", "sk-recon", 6.6).unwrap();
        assert!(matches!(
            item.set_approved_xp("ftr-a", "sk-none", 1.0),
            Err(Error::NotFound(_))
        ));

        let award = item.approve(now()).unwrap();
        assert_eq!(award["ftr-a"]["sk-recon"], 7);
    }

    #[test]
    fn test_delete_keeps_awarded_xp() {
        let mut roster = roster_with_level(0);
        let mut item = WorkItem::new("wi-1", "Drill", 5);
        item.assignees = draft("Drill", 5).assignees;
        item.assignees[0].skills[0].suggested_xp = 25;
        let mut items = vec![item];

        approve_work_item(&mut items, &mut roster, "wi-1", now()).unwrap();
        let deleted = delete_work_item(&mut items, "wi-1").unwrap();

        assert_eq!(deleted.id, "wi-1");
        assert!(items.is_empty());
        assert_eq!(roster.xp("ftr-a", "sk-recon"), 25);
        assert_eq!(roster.level("ftr-a", "sk-recon"), 1);
        assert!(delete_work_item(&mut items, "wi-1").is_err());
    }

    #[test]
    fn test_strip_fighter_via_hook() {
        let mut items = vec![WorkItem::new("wi-1", "Drill", 2), WorkItem::new("wi-2", "Run", 1)];
        items[0].assignees = vec![
            Assignee::new("ftr-a", vec![]),
            Assignee::new("ftr-b", vec![]),
        ];
        items[1].assignees = vec![Assignee::new("ftr-a", vec![])];

        let mut roster = RosterState::default();
        roster.set_level("ftr-a", "sk-1", 1);
        let removed = roster.remove_fighter("ftr-a", &mut items);

        assert_eq!(removed.stripped_assignments.len(), 2);
        assert_eq!(removed.stripped_assignments[0].work_item_id, "wi-1");
        assert_eq!(removed.stripped_assignments[0].index, 0);
        assert_eq!(items[0].assignees.len(), 1);
        assert!(items[1].assignees.is_empty());
    }

    #[test]
    fn test_restore_assignees_keeps_order() {
        let mut items = vec![WorkItem::new("wi-1", "Drill", 2), WorkItem::new("wi-2", "Run", 1)];
        items[0].assignees = vec![
            Assignee::new("ftr-b", vec![]),
            Assignee::new("ftr-a", vec![SkillLine::new("sk-1", "cat-1")]),
            Assignee::new("ftr-c", vec![]),
        ];
        items[1].assignees = vec![Assignee::new("ftr-a", vec![])];
        let before = items.clone();

        let stripped = strip_fighter(&mut items, "ftr-a");
        assert_eq!(stripped.len(), 2);
        assert_eq!(stripped[0].index, 1);

        // wi-2 was deleted in the meantime
        let mut remaining = vec![items[0].clone()];
        assert_eq!(restore_assignees(&mut remaining, &stripped), 1);
        assert_eq!(remaining[0], before[0]);

        assert_eq!(restore_assignees(&mut items, &stripped), 2);
        assert_eq!(items, before);
    }

    #[test]
    fn test_comments() {
        let mut item = WorkItem::new("wi-1", "Drill", 2);
        let comment = item.add_comment("sgt", "Good pace", now()).unwrap();
        assert!(comment.id.starts_with("cmt-"));
        assert!(item.add_comment("sgt", "   ", now()).is_err());
        assert_eq!(item.history.comments.len(), 1);
    }
}
