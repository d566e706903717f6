//! Fighter skill-level synchronizer.
//!
//! Keeps three roster maps consistent: per-fighter skill levels, the XP
//! ledger and assignment flags. It is a small deterministic reducer: every
//! mutation goes through a [`RosterState`] method that reports how many
//! writes it made, and the two reconciliation passes alternate until one of
//! them writes nothing.
//!
//! - XP → level: `level = level_from_xp(xp)`, written only when it differs.
//! - level → XP floor: for level `L > 0`, XP is raised to
//!   `xp_threshold_for_level(L)` when below it, never lowered.
//!
//! Each pass is idempotent once consistent, so any change converges in at
//! most two passes. Entries for skills missing from the tree are tolerated;
//! the passes never prune them, only an explicit skill removal does.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::models::leveling::{MAX_LEVEL, level_from_xp, xp_threshold_for_level};
use crate::models::{Assignee, FighterSkillLevels, FighterSkills, FighterXpLedger};

/// Approved XP keyed by fighter, then skill.
pub type XpAward = BTreeMap<String, BTreeMap<String, u32>>;

/// Upper bound on alternating passes; two always suffice.
const MAX_PASSES: usize = 4;

/// Notified when a fighter is removed so it can be stripped from work item
/// assignees, and again when that removal is undone.
pub trait AssignmentHook {
    /// Remove the fighter from every assignee list, returning the removed records.
    fn fighter_removed(&mut self, fighter_id: &str) -> Vec<StrippedAssignment>;

    /// Put back records returned by [`AssignmentHook::fighter_removed`].
    /// Returns how many were re-inserted.
    fn fighter_restored(&mut self, stripped: &[StrippedAssignment]) -> usize;
}

/// An assignee record taken off a work item when its fighter was removed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StrippedAssignment {
    pub work_item_id: String,
    /// Position in the work item's assignee list
    pub index: usize,
    pub assignee: Assignee,
}

/// Which (fighter, skill) entries a pass looks at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    All,
    Fighter(String),
    Pairs(Vec<(String, String)>),
}

/// A change observed on one of the maps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RosterChange {
    /// Ledger entries changed; re-derive levels
    XpChanged(Scope),
    /// Levels changed directly; enforce the XP floor
    LevelChanged(Scope),
}

/// Writes performed while applying a change.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Default entries inserted for new skills or fighters
    pub entries_added: usize,
    /// Level entries rewritten
    pub levels_written: usize,
    /// Ledger entries rewritten
    pub xp_written: usize,
    /// Reconciliation passes run
    pub passes: usize,
}

impl SyncReport {
    /// Total writes to any map.
    pub fn writes(&self) -> usize {
        self.entries_added + self.levels_written + self.xp_written
    }

    /// Returns true if nothing was written.
    pub fn is_noop(&self) -> bool {
        self.writes() == 0
    }

    fn absorb(&mut self, other: SyncReport) {
        self.entries_added += other.entries_added;
        self.levels_written += other.levels_written;
        self.xp_written += other.xp_written;
        self.passes += other.passes;
    }
}

/// Roster data removed with a fighter, kept for undo capture.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemovedFighter {
    pub fighter_id: String,
    pub levels: BTreeMap<String, u8>,
    pub ledger: BTreeMap<String, u32>,
    pub assigned: BTreeMap<String, bool>,
    /// Assignee records stripped from work items, in list order
    #[serde(default)]
    pub stripped_assignments: Vec<StrippedAssignment>,
}

/// Per-fighter values for one skill.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillSlice {
    pub skill_id: String,
    pub levels: BTreeMap<String, u8>,
    pub ledger: BTreeMap<String, u32>,
    pub assigned: BTreeMap<String, bool>,
}

/// Union-merge approved XP into an existing per-skill ledger.
pub fn merge_xp(
    existing: &BTreeMap<String, u32>,
    approved: &BTreeMap<String, u32>,
) -> BTreeMap<String, u32> {
    let mut merged = existing.clone();
    for (skill_id, xp) in approved {
        let entry = merged.entry(skill_id.clone()).or_insert(0);
        *entry = entry.saturating_add(*xp);
    }
    merged
}

/// The three roster maps.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterState {
    #[serde(default)]
    pub levels: FighterSkillLevels,
    #[serde(default)]
    pub ledger: FighterXpLedger,
    #[serde(default)]
    pub assigned: FighterSkills,
}

impl RosterState {
    pub fn new(levels: FighterSkillLevels, ledger: FighterXpLedger, assigned: FighterSkills) -> Self {
        Self {
            levels,
            ledger,
            assigned,
        }
    }

    /// Stored level, 0 when absent.
    pub fn level(&self, fighter_id: &str, skill_id: &str) -> u8 {
        self.levels
            .get(fighter_id)
            .and_then(|m| m.get(skill_id))
            .copied()
            .unwrap_or(0)
    }

    /// Ledger XP, 0 when absent.
    pub fn xp(&self, fighter_id: &str, skill_id: &str) -> u32 {
        self.ledger
            .get(fighter_id)
            .and_then(|m| m.get(skill_id))
            .copied()
            .unwrap_or(0)
    }

    pub fn is_assigned(&self, fighter_id: &str, skill_id: &str) -> bool {
        self.assigned
            .get(fighter_id)
            .and_then(|m| m.get(skill_id))
            .copied()
            .unwrap_or(false)
    }

    /// Fighters present in any map.
    pub fn fighter_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .levels
            .keys()
            .chain(self.ledger.keys())
            .chain(self.assigned.keys())
            .cloned()
            .collect();
        ids.sort();
        ids.dedup();
        ids
    }

    /// XP → level pass. Returns the entries whose level was written.
    pub fn levels_from_xp(&mut self, scope: &Scope) -> Vec<(String, String)> {
        let candidates: Vec<(String, String, u32)> = match scope {
            Scope::All => self
                .ledger
                .iter()
                .flat_map(|(f, skills)| skills.iter().map(move |(s, xp)| (f.clone(), s.clone(), *xp)))
                .collect(),
            Scope::Fighter(f) => self
                .ledger
                .get(f)
                .map(|skills| skills.iter().map(|(s, xp)| (f.clone(), s.clone(), *xp)).collect())
                .unwrap_or_default(),
            Scope::Pairs(pairs) => pairs
                .iter()
                .filter_map(|(f, s)| {
                    self.ledger
                        .get(f)
                        .and_then(|m| m.get(s))
                        .map(|xp| (f.clone(), s.clone(), *xp))
                })
                .collect(),
        };

        let mut written = Vec::new();
        for (fighter_id, skill_id, xp) in candidates {
            let derived = level_from_xp(xp);
            let levels = self.levels.entry(fighter_id.clone()).or_default();
            if levels.get(&skill_id) != Some(&derived) {
                levels.insert(skill_id.clone(), derived);
                written.push((fighter_id, skill_id));
            }
        }
        written
    }

    /// Level → XP floor pass. Returns the entries whose XP was raised.
    pub fn enforce_xp_floor(&mut self, scope: &Scope) -> Vec<(String, String)> {
        let candidates: Vec<(String, String, u8)> = match scope {
            Scope::All => self
                .levels
                .iter()
                .flat_map(|(f, skills)| skills.iter().map(move |(s, l)| (f.clone(), s.clone(), *l)))
                .collect(),
            Scope::Fighter(f) => self
                .levels
                .get(f)
                .map(|skills| skills.iter().map(|(s, l)| (f.clone(), s.clone(), *l)).collect())
                .unwrap_or_default(),
            Scope::Pairs(pairs) => pairs
                .iter()
                .filter_map(|(f, s)| {
                    self.levels
                        .get(f)
                        .and_then(|m| m.get(s))
                        .map(|l| (f.clone(), s.clone(), *l))
                })
                .collect(),
        };

        let mut written = Vec::new();
        for (fighter_id, skill_id, level) in candidates {
            if level == 0 {
                continue;
            }
            let floor = xp_threshold_for_level(level);
            let ledger = self.ledger.entry(fighter_id.clone()).or_default();
            let current = ledger.get(&skill_id).copied().unwrap_or(0);
            if current < floor {
                ledger.insert(skill_id.clone(), floor);
                written.push((fighter_id, skill_id));
            }
        }
        written
    }

    /// Reconcile after a change, alternating passes until one writes nothing.
    pub fn apply(&mut self, change: RosterChange) -> SyncReport {
        let mut report = SyncReport::default();
        let (mut xp_pass, mut scope) = match change {
            RosterChange::XpChanged(scope) => (true, scope),
            RosterChange::LevelChanged(scope) => (false, scope),
        };

        for _ in 0..MAX_PASSES {
            report.passes += 1;
            let touched = if xp_pass {
                let touched = self.levels_from_xp(&scope);
                report.levels_written += touched.len();
                touched
            } else {
                let touched = self.enforce_xp_floor(&scope);
                report.xp_written += touched.len();
                touched
            };

            if touched.is_empty() {
                tracing::debug!(
                    passes = report.passes,
                    levels = report.levels_written,
                    xp = report.xp_written,
                    "roster reconciled"
                );
                return report;
            }
            scope = Scope::Pairs(touched);
            xp_pass = !xp_pass;
        }

        tracing::warn!(passes = report.passes, "roster did not converge");
        report
    }

    /// Re-derive every level from XP, then enforce floors everywhere.
    pub fn reconcile_all(&mut self) -> SyncReport {
        let mut report = self.apply(RosterChange::XpChanged(Scope::All));
        report.absorb(self.apply(RosterChange::LevelChanged(Scope::All)));
        report
    }

    /// Give every listed fighter a level-0 / XP-0 entry for each new skill.
    pub fn ensure_skill_entries(&mut self, fighter_ids: &[String], skill_ids: &[String]) -> SyncReport {
        let mut report = SyncReport::default();
        for fighter_id in fighter_ids {
            let levels = self.levels.entry(fighter_id.clone()).or_default();
            for skill_id in skill_ids {
                if !levels.contains_key(skill_id) {
                    levels.insert(skill_id.clone(), 0);
                    report.entries_added += 1;
                }
            }
            let ledger = self.ledger.entry(fighter_id.clone()).or_default();
            for skill_id in skill_ids {
                if !ledger.contains_key(skill_id) {
                    ledger.insert(skill_id.clone(), 0);
                    report.entries_added += 1;
                }
            }
        }
        report
    }

    /// Initialize a fighter over the full skill set.
    ///
    /// Initial levels seed the ledger at their threshold and mark the skill
    /// assigned. Re-adding an existing fighter never lowers anything.
    pub fn add_fighter(
        &mut self,
        fighter_id: &str,
        skill_ids: &[String],
        initial_levels: &BTreeMap<String, u8>,
    ) -> SyncReport {
        let mut report = self.ensure_skill_entries(&[fighter_id.to_string()], skill_ids);
        self.assigned.entry(fighter_id.to_string()).or_default();

        let mut pairs = Vec::new();
        for (skill_id, level) in initial_levels {
            let level = (*level).min(MAX_LEVEL);
            let levels = self.levels.entry(fighter_id.to_string()).or_default();
            let stored = levels.entry(skill_id.clone()).or_insert(0);
            if *stored < level {
                *stored = level;
                report.levels_written += 1;
            }
            if level > 0 {
                let flags = self.assigned.entry(fighter_id.to_string()).or_default();
                if flags.insert(skill_id.clone(), true) != Some(true) {
                    report.entries_added += 1;
                }
            }
            pairs.push((fighter_id.to_string(), skill_id.clone()));
        }

        report.absorb(self.apply(RosterChange::LevelChanged(Scope::Pairs(pairs))));
        tracing::debug!(fighter = fighter_id, writes = report.writes(), "fighter added");
        report
    }

    /// Cascade-delete a fighter from all three maps and notify the hook.
    pub fn remove_fighter(&mut self, fighter_id: &str, hook: &mut dyn AssignmentHook) -> RemovedFighter {
        let removed = RemovedFighter {
            fighter_id: fighter_id.to_string(),
            levels: self.levels.remove(fighter_id).unwrap_or_default(),
            ledger: self.ledger.remove(fighter_id).unwrap_or_default(),
            assigned: self.assigned.remove(fighter_id).unwrap_or_default(),
            stripped_assignments: hook.fighter_removed(fighter_id),
        };
        tracing::debug!(
            fighter = fighter_id,
            stripped = removed.stripped_assignments.len(),
            "fighter removed"
        );
        removed
    }

    /// Put back a fighter captured by [`RosterState::remove_fighter`] and
    /// hand its stripped assignee records back to the hook.
    ///
    /// Values are written as captured, without a reconciliation pass.
    pub fn restore_fighter(&mut self, removed: &RemovedFighter, hook: &mut dyn AssignmentHook) -> SyncReport {
        let id = removed.fighter_id.clone();
        let report = SyncReport {
            entries_added: removed.levels.len() + removed.ledger.len(),
            ..Default::default()
        };
        self.levels.insert(id.clone(), removed.levels.clone());
        self.ledger.insert(id.clone(), removed.ledger.clone());
        self.assigned.insert(id, removed.assigned.clone());
        let restored = hook.fighter_restored(&removed.stripped_assignments);
        tracing::debug!(fighter = %removed.fighter_id, restored, "fighter restored");
        report
    }

    /// Drop every entry for a skill, returning what was stored.
    pub fn remove_skill(&mut self, skill_id: &str) -> SkillSlice {
        let slice = self.skill_slice(skill_id);
        for skills in self.levels.values_mut() {
            skills.remove(skill_id);
        }
        for skills in self.ledger.values_mut() {
            skills.remove(skill_id);
        }
        for skills in self.assigned.values_mut() {
            skills.remove(skill_id);
        }
        slice
    }

    /// Write a captured skill slice back. Fighters no longer present are skipped.
    pub fn restore_skill(&mut self, slice: &SkillSlice) -> SyncReport {
        let mut report = SyncReport::default();
        for (fighter_id, level) in &slice.levels {
            if let Some(levels) = self.levels.get_mut(fighter_id) {
                levels.insert(slice.skill_id.clone(), *level);
                report.entries_added += 1;
            }
        }
        for (fighter_id, xp) in &slice.ledger {
            if let Some(ledger) = self.ledger.get_mut(fighter_id) {
                ledger.insert(slice.skill_id.clone(), *xp);
                report.entries_added += 1;
            }
        }
        for (fighter_id, flag) in &slice.assigned {
            if let Some(flags) = self.assigned.get_mut(fighter_id) {
                flags.insert(slice.skill_id.clone(), *flag);
            }
        }
        report
    }

    /// Manually set a level (clamped to 0..=10) and enforce the XP floor.
    pub fn set_level(&mut self, fighter_id: &str, skill_id: &str, level: u8) -> SyncReport {
        let level = level.min(MAX_LEVEL);
        let mut report = SyncReport::default();
        let levels = self.levels.entry(fighter_id.to_string()).or_default();
        if levels.get(skill_id) != Some(&level) {
            levels.insert(skill_id.to_string(), level);
            report.levels_written += 1;
        }
        report.absorb(self.apply(RosterChange::LevelChanged(Scope::Pairs(vec![(
            fighter_id.to_string(),
            skill_id.to_string(),
        )]))));
        report
    }

    /// Overwrite a ledger entry and re-derive its level.
    pub fn set_xp(&mut self, fighter_id: &str, skill_id: &str, xp: u32) -> SyncReport {
        let mut report = SyncReport::default();
        let ledger = self.ledger.entry(fighter_id.to_string()).or_default();
        if ledger.get(skill_id) != Some(&xp) {
            ledger.insert(skill_id.to_string(), xp);
            report.xp_written += 1;
        }
        report.absorb(self.apply(RosterChange::XpChanged(Scope::Pairs(vec![(
            fighter_id.to_string(),
            skill_id.to_string(),
        )]))));
        report
    }

    /// Merge approved XP into the ledger and re-derive the affected levels.
    pub fn apply_award(&mut self, award: &XpAward) -> SyncReport {
        let mut report = SyncReport::default();
        let mut pairs = Vec::new();
        for (fighter_id, approved) in award {
            let existing = self.ledger.get(fighter_id).cloned().unwrap_or_default();
            let merged = merge_xp(&existing, approved);
            report.xp_written += approved.values().filter(|xp| **xp > 0).count();
            self.ledger.insert(fighter_id.clone(), merged);
            pairs.extend(approved.keys().map(|s| (fighter_id.clone(), s.clone())));
        }
        report.absorb(self.apply(RosterChange::XpChanged(Scope::Pairs(pairs))));
        report
    }

    /// Set an assignment flag. Returns true if it changed.
    pub fn set_assigned(&mut self, fighter_id: &str, skill_id: &str, assigned: bool) -> bool {
        let flags = self.assigned.entry(fighter_id.to_string()).or_default();
        flags.insert(skill_id.to_string(), assigned) != Some(assigned)
    }

    /// Per-fighter values stored for one skill.
    pub fn skill_slice(&self, skill_id: &str) -> SkillSlice {
        fn column<T: Copy>(map: &BTreeMap<String, BTreeMap<String, T>>, skill_id: &str) -> BTreeMap<String, T> {
            map.iter()
                .filter_map(|(f, skills)| skills.get(skill_id).map(|v| (f.clone(), *v)))
                .collect()
        }

        SkillSlice {
            skill_id: skill_id.to_string(),
            levels: column(&self.levels, skill_id),
            ledger: column(&self.ledger, skill_id),
            assigned: column(&self.assigned, skill_id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[derive(Default)]
    struct CountingHook {
        removed: Vec<String>,
        restored: usize,
    }

    impl AssignmentHook for CountingHook {
        fn fighter_removed(&mut self, fighter_id: &str) -> Vec<StrippedAssignment> {
            self.removed.push(fighter_id.to_string());
            (0..2)
                .map(|i| StrippedAssignment {
                    work_item_id: format!("wi-{}", i),
                    index: 0,
                    assignee: Assignee::new(fighter_id, vec![]),
                })
                .collect()
        }

        fn fighter_restored(&mut self, stripped: &[StrippedAssignment]) -> usize {
            self.restored += stripped.len();
            stripped.len()
        }
    }

    #[test]
    fn test_manual_level_raises_xp_to_floor() {
        let mut roster = RosterState::default();
        roster.set_xp("ftr-a", "sk-1", 50);
        roster.set_level("ftr-a", "sk-1", 4);

        assert_eq!(roster.xp("ftr-a", "sk-1"), 400);
        assert_eq!(roster.level("ftr-a", "sk-1"), 4);
    }

    #[test]
    fn test_manual_level_keeps_higher_xp() {
        let mut roster = RosterState::default();
        roster.ledger.entry("ftr-a".into()).or_default().insert("sk-1".into(), 500);
        let report = roster.set_level("ftr-a", "sk-1", 4);

        assert_eq!(roster.xp("ftr-a", "sk-1"), 500);
        assert_eq!(roster.level("ftr-a", "sk-1"), 4);
        assert_eq!(report.xp_written, 0);
    }

    #[test]
    fn test_xp_change_rederives_level() {
        let mut roster = RosterState::default();
        let report = roster.set_xp("ftr-a", "sk-1", 230);

        assert_eq!(roster.level("ftr-a", "sk-1"), 3);
        assert_eq!(report.levels_written, 1);
        assert!(report.passes <= 2);
    }

    #[test]
    fn test_reapplying_is_a_noop() {
        let mut roster = RosterState::default();
        roster.add_fighter("ftr-a", &ids(&["sk-1", "sk-2"]), &BTreeMap::from([("sk-1".to_string(), 3)]));
        roster.set_xp("ftr-a", "sk-2", 130);

        let before = roster.clone();
        let report = roster.reconcile_all();
        assert!(report.is_noop(), "{:?}", report);
        assert_eq!(roster, before);

        assert!(roster.apply(RosterChange::XpChanged(Scope::All)).is_noop());
        assert!(roster.apply(RosterChange::LevelChanged(Scope::All)).is_noop());
    }

    #[test]
    fn test_converges_within_two_passes() {
        let mut roster = RosterState::default();
        for (i, skill) in ["a", "b", "c"].iter().enumerate() {
            roster.levels.entry("ftr-a".into()).or_default().insert(skill.to_string(), (i as u8) * 3 + 1);
        }
        let report = roster.apply(RosterChange::LevelChanged(Scope::All));
        assert_eq!(report.xp_written, 3);
        assert_eq!(report.levels_written, 0);
        assert_eq!(report.passes, 2);
    }

    #[test]
    fn test_new_skill_adds_zero_entries() {
        let mut roster = RosterState::default();
        roster.add_fighter("ftr-a", &ids(&["sk-1"]), &BTreeMap::new());
        roster.add_fighter("ftr-b", &ids(&["sk-1"]), &BTreeMap::new());

        let report = roster.ensure_skill_entries(&ids(&["ftr-a", "ftr-b"]), &ids(&["sk-2"]));
        assert_eq!(report.entries_added, 4);
        assert_eq!(roster.levels["ftr-b"]["sk-2"], 0);
        assert_eq!(roster.ledger["ftr-a"]["sk-2"], 0);

        let again = roster.ensure_skill_entries(&ids(&["ftr-a", "ftr-b"]), &ids(&["sk-2"]));
        assert!(again.is_noop());
    }

    #[test]
    fn test_add_fighter_seeds_ledger_from_initial_levels() {
        let mut roster = RosterState::default();
        let initial = BTreeMap::from([("sk-1".to_string(), 2), ("sk-2".to_string(), 0)]);
        roster.add_fighter("ftr-a", &ids(&["sk-1", "sk-2", "sk-3"]), &initial);

        assert_eq!(roster.level("ftr-a", "sk-1"), 2);
        assert_eq!(roster.xp("ftr-a", "sk-1"), 100);
        assert_eq!(roster.xp("ftr-a", "sk-3"), 0);
        assert!(roster.is_assigned("ftr-a", "sk-1"));
        assert!(!roster.is_assigned("ftr-a", "sk-2"));
        assert_eq!(roster.levels["ftr-a"].len(), 3);
    }

    #[test]
    fn test_remove_fighter_cascades() {
        let mut roster = RosterState::default();
        roster.add_fighter("ftr-a", &ids(&["sk-1"]), &BTreeMap::from([("sk-1".to_string(), 1)]));
        roster.add_fighter("ftr-b", &ids(&["sk-1"]), &BTreeMap::new());

        let mut hook = CountingHook::default();
        let removed = roster.remove_fighter("ftr-a", &mut hook);

        assert_eq!(removed.levels["sk-1"], 1);
        assert_eq!(removed.ledger["sk-1"], 25);
        assert_eq!(removed.stripped_assignments.len(), 2);
        assert_eq!(hook.removed, vec!["ftr-a"]);
        assert_eq!(roster.fighter_ids(), vec!["ftr-b"]);
    }

    #[test]
    fn test_apply_award_merges_and_levels_up() {
        let mut roster = RosterState::default();
        roster.add_fighter("ftr-a", &ids(&["sk-1"]), &BTreeMap::from([("sk-1".to_string(), 1)]));

        let award = XpAward::from([(
            "ftr-a".to_string(),
            BTreeMap::from([("sk-1".to_string(), 80), ("sk-orphan".to_string(), 10)]),
        )]);
        roster.apply_award(&award);

        assert_eq!(roster.xp("ftr-a", "sk-1"), 105);
        assert_eq!(roster.level("ftr-a", "sk-1"), 2);
        assert_eq!(roster.xp("ftr-a", "sk-orphan"), 10);
    }

    #[test]
    fn test_merge_xp_is_union() {
        let existing = BTreeMap::from([("a".to_string(), 5), ("b".to_string(), 7)]);
        let approved = BTreeMap::from([("b".to_string(), 3), ("c".to_string(), 1)]);
        let merged = merge_xp(&existing, &approved);
        assert_eq!(merged, BTreeMap::from([
            ("a".to_string(), 5),
            ("b".to_string(), 10),
            ("c".to_string(), 1),
        ]));
    }

    #[test]
    fn test_level_out_of_range_is_clamped() {
        let mut roster = RosterState::default();
        roster.set_level("ftr-a", "sk-1", 42);
        assert_eq!(roster.level("ftr-a", "sk-1"), MAX_LEVEL);
        assert_eq!(roster.xp("ftr-a", "sk-1"), 2500);
    }

    #[test]
    fn test_manual_decrease_survives_until_xp_changes() {
        let mut roster = RosterState::default();
        roster.set_xp("ftr-a", "sk-1", 400);
        roster.set_level("ftr-a", "sk-1", 2);
        assert_eq!(roster.level("ftr-a", "sk-1"), 2);
        assert_eq!(roster.xp("ftr-a", "sk-1"), 400);

        roster.set_xp("ftr-a", "sk-1", 410);
        assert_eq!(roster.level("ftr-a", "sk-1"), 4);
    }

    #[test]
    fn test_skill_slice_and_assignment_flags() {
        let mut roster = RosterState::default();
        roster.add_fighter("ftr-a", &ids(&["sk-1"]), &BTreeMap::from([("sk-1".to_string(), 2)]));
        assert!(roster.set_assigned("ftr-a", "sk-2", true));
        assert!(!roster.set_assigned("ftr-a", "sk-2", true));

        let slice = roster.skill_slice("sk-1");
        assert_eq!(slice.levels["ftr-a"], 2);
        assert_eq!(slice.ledger["ftr-a"], 100);
        assert!(slice.assigned["ftr-a"]);
    }

    #[test]
    fn test_remove_and_restore_skill() {
        let mut roster = RosterState::default();
        roster.add_fighter("ftr-a", &ids(&["sk-1", "sk-2"]), &BTreeMap::from([("sk-1".to_string(), 3)]));
        roster.add_fighter("ftr-b", &ids(&["sk-1", "sk-2"]), &BTreeMap::new());

        let slice = roster.remove_skill("sk-1");
        assert_eq!(slice.levels.len(), 2);
        assert_eq!(slice.ledger["ftr-a"], 225);
        assert!(!roster.levels["ftr-a"].contains_key("sk-1"));
        assert!(!roster.ledger["ftr-b"].contains_key("sk-1"));
        assert!(roster.levels["ftr-a"].contains_key("sk-2"));

        let report = roster.restore_skill(&slice);
        assert_eq!(report.entries_added, 4);
        assert_eq!(roster.level("ftr-a", "sk-1"), 3);
        assert_eq!(roster.xp("ftr-a", "sk-1"), 225);
        assert!(roster.is_assigned("ftr-a", "sk-1"));
    }

    #[test]
    fn test_restore_fighter_puts_back_captured_values() {
        let mut roster = RosterState::default();
        roster.add_fighter("ftr-a", &ids(&["sk-1"]), &BTreeMap::from([("sk-1".to_string(), 2)]));
        let before = roster.clone();

        let mut hook = CountingHook::default();
        let removed = roster.remove_fighter("ftr-a", &mut hook);
        assert!(roster.fighter_ids().is_empty());

        roster.restore_fighter(&removed, &mut hook);
        assert_eq!(roster, before);
        assert_eq!(hook.restored, 2);
    }
}
