//! Whole-profile snapshot: everything a session works on, loaded and saved
//! in one call, plus the tree and roster edits that must keep the roster
//! maps in step with the skill tree.

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

use super::{ProfileStore, generate_unique_id, keys, validators};
use crate::models::{Category, Fighter, Skill, WorkItem, all_skill_ids};
use crate::sync::{RosterState, SyncReport};
use crate::undo::{ActionRecord, ActionType, CategoryDeletion, FighterDeletion, SkillDeletion};
use crate::{Error, Result};

/// Fighters, roster maps, skill tree and work items of one profile.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfileSnapshot {
    pub fighters: Vec<Fighter>,
    pub roster: RosterState,
    pub skill_tree: Vec<Category>,
    pub work_items: Vec<WorkItem>,
}

impl ProfileSnapshot {
    /// Load every key, falling back to empty values for anything unusable.
    pub fn load(store: &ProfileStore) -> Self {
        let snapshot = Self {
            fighters: store.load_or_default(
                keys::FIGHTERS,
                Vec::new(),
                Some(validators::is_array_of_records),
            ),
            roster: RosterState::new(
                store.load_skill_levels(),
                store.load_xp_ledger(),
                store.load_assignments(),
            ),
            skill_tree: store.load_or_default(
                keys::SKILL_TREE,
                Vec::new(),
                Some(validators::is_array_of_records),
            ),
            work_items: store.load_or_default(
                keys::WORK_ITEMS,
                Vec::new(),
                Some(validators::is_array_of_records),
            ),
        };
        tracing::debug!(
            profile = store.profile(),
            fighters = snapshot.fighters.len(),
            categories = snapshot.skill_tree.len(),
            work_items = snapshot.work_items.len(),
            "profile loaded"
        );
        snapshot
    }

    /// Write every key back.
    pub fn save(&self, store: &mut ProfileStore) -> Result<()> {
        store.save(keys::FIGHTERS, &self.fighters)?;
        store.save(keys::SKILL_LEVELS, &self.roster.levels)?;
        store.save(keys::XP_LEDGER, &self.roster.ledger)?;
        store.save(keys::FIGHTER_SKILLS, &self.roster.assigned)?;
        store.save(keys::SKILL_TREE, &self.skill_tree)?;
        store.save(keys::WORK_ITEMS, &self.work_items)?;
        Ok(())
    }

    fn fighter_ids(&self) -> Vec<String> {
        self.fighters.iter().map(|f| f.id.clone()).collect()
    }

    /// Bring the roster in line with the tree and itself.
    ///
    /// Every fighter gets an entry for every skill, then both passes run
    /// over all entries.
    pub fn reconcile(&mut self) -> SyncReport {
        let mut report = self
            .roster
            .ensure_skill_entries(&self.fighter_ids(), &all_skill_ids(&self.skill_tree));
        let passes = self.roster.reconcile_all();
        report.levels_written += passes.levels_written;
        report.xp_written += passes.xp_written;
        report.passes += passes.passes;
        if !report.is_noop() {
            tracing::debug!(writes = report.writes(), passes = report.passes, "roster reconciled");
        }
        report
    }

    pub fn category(&self, category_id: &str) -> Result<&Category> {
        self.skill_tree
            .iter()
            .find(|c| c.id == category_id)
            .ok_or_else(|| Error::NotFound(format!("Category not found: {}", category_id)))
    }

    pub fn fighter(&self, fighter_id: &str) -> Result<&Fighter> {
        self.fighters
            .iter()
            .find(|f| f.id == fighter_id)
            .ok_or_else(|| Error::NotFound(format!("Fighter not found: {}", fighter_id)))
    }

    /// Add an empty category. Returns its id.
    pub fn add_category(&mut self, name: &str) -> Result<String> {
        let name = required_name(name, "category")?;
        let id = generate_unique_id("cat", name, self.skill_tree.iter().map(|c| c.id.as_str()));
        self.skill_tree.push(Category::new(id.clone(), name));
        Ok(id)
    }

    /// Add a skill with empty template levels and give every fighter an
    /// entry for it. Returns the skill id.
    pub fn add_skill(&mut self, category_id: &str, name: &str) -> Result<String> {
        let name = required_name(name, "skill")?;
        let existing = all_skill_ids(&self.skill_tree);
        let id = generate_unique_id("sk", name, existing.iter().map(String::as_str));

        let category = self
            .skill_tree
            .iter_mut()
            .find(|c| c.id == category_id)
            .ok_or_else(|| Error::NotFound(format!("Category not found: {}", category_id)))?;
        category.skills.push(Skill::new(id.clone(), name));

        self.roster
            .ensure_skill_entries(&self.fighter_ids(), std::slice::from_ref(&id));
        Ok(id)
    }

    /// Add a fighter over the full skill set with optional initial levels.
    /// Returns the fighter id.
    pub fn add_fighter(&mut self, name: &str, initial_levels: &BTreeMap<String, u8>) -> Result<String> {
        let name = required_name(name, "fighter")?;
        let id = generate_unique_id("ftr", name, self.fighters.iter().map(|f| f.id.as_str()));
        self.fighters.push(Fighter::new(id.clone(), name));
        self.roster
            .add_fighter(&id, &all_skill_ids(&self.skill_tree), initial_levels);
        Ok(id)
    }

    /// Delete a fighter, cascading through the roster maps and work item
    /// assignees. Returns the undo record.
    pub fn delete_fighter(&mut self, fighter_id: &str, now: DateTime<Utc>) -> Result<ActionRecord> {
        let index = self
            .fighters
            .iter()
            .position(|f| f.id == fighter_id)
            .ok_or_else(|| Error::NotFound(format!("Fighter not found: {}", fighter_id)))?;
        let fighter = self.fighters.remove(index);
        let roster = self.roster.remove_fighter(fighter_id, &mut self.work_items);
        ActionRecord::fighter_deleted(
            &FighterDeletion {
                fighter,
                index,
                roster,
            },
            now,
        )
    }

    /// Delete a skill and its roster entries. Returns the undo record.
    pub fn delete_skill(&mut self, skill_id: &str, now: DateTime<Utc>) -> Result<ActionRecord> {
        let (category, index) = self
            .skill_tree
            .iter_mut()
            .find_map(|c| {
                let index = c.skills.iter().position(|s| s.id == skill_id)?;
                Some((c, index))
            })
            .ok_or_else(|| Error::NotFound(format!("Skill not found: {}", skill_id)))?;
        let skill = category.skills.remove(index);
        let category_id = category.id.clone();
        let roster = self.roster.remove_skill(skill_id);
        ActionRecord::skill_deleted(
            &SkillDeletion {
                skill,
                category_id,
                index,
                roster,
            },
            now,
        )
    }

    /// Delete a category with all of its skills. Returns the undo record.
    pub fn delete_category(&mut self, category_id: &str, now: DateTime<Utc>) -> Result<ActionRecord> {
        let index = self
            .skill_tree
            .iter()
            .position(|c| c.id == category_id)
            .ok_or_else(|| Error::NotFound(format!("Category not found: {}", category_id)))?;
        let category = self.skill_tree.remove(index);
        let roster = category
            .skills
            .iter()
            .map(|s| self.roster.remove_skill(&s.id))
            .collect();
        ActionRecord::category_deleted(
            &CategoryDeletion {
                category,
                index,
                roster,
            },
            now,
        )
    }

    /// Rebuild the state an undo record captured.
    pub fn undo(&mut self, record: &ActionRecord) -> Result<()> {
        match record.action_type {
            ActionType::DeleteFighter => {
                let deletion: FighterDeletion = record.payload()?;
                if self.fighters.iter().any(|f| f.id == deletion.fighter.id) {
                    return Err(Error::InvalidInput(format!(
                        "fighter {} already exists",
                        deletion.fighter.id
                    )));
                }
                let index = deletion.index.min(self.fighters.len());
                self.fighters.insert(index, deletion.fighter);
                self.roster
                    .restore_fighter(&deletion.roster, &mut self.work_items);
            }
            ActionType::DeleteSkill => {
                let deletion: SkillDeletion = record.payload()?;
                if all_skill_ids(&self.skill_tree).contains(&deletion.skill.id) {
                    return Err(Error::InvalidInput(format!(
                        "skill {} already exists",
                        deletion.skill.id
                    )));
                }
                let category = self
                    .skill_tree
                    .iter_mut()
                    .find(|c| c.id == deletion.category_id)
                    .ok_or_else(|| {
                        Error::NotFound(format!("Category not found: {}", deletion.category_id))
                    })?;
                let index = deletion.index.min(category.skills.len());
                category.skills.insert(index, deletion.skill);
                self.roster.restore_skill(&deletion.roster);
            }
            ActionType::DeleteCategory => {
                let deletion: CategoryDeletion = record.payload()?;
                if self.skill_tree.iter().any(|c| c.id == deletion.category.id) {
                    return Err(Error::InvalidInput(format!(
                        "category {} already exists",
                        deletion.category.id
                    )));
                }
                let index = deletion.index.min(self.skill_tree.len());
                self.skill_tree.insert(index, deletion.category);
                for slice in &deletion.roster {
                    self.roster.restore_skill(slice);
                }
            }
        }
        // Fighters added since the deletion have no entries for restored skills.
        self.roster
            .ensure_skill_entries(&self.fighter_ids(), &all_skill_ids(&self.skill_tree));
        tracing::info!(action = %record.action_type, description = %record.description, "undo applied");
        Ok(())
    }

    /// Replace the skill tree and give every fighter entries for its skills.
    pub fn replace_tree(&mut self, categories: Vec<Category>) -> SyncReport {
        self.skill_tree = categories;
        self.roster
            .ensure_skill_entries(&self.fighter_ids(), &all_skill_ids(&self.skill_tree))
    }
}

fn required_name<'a>(name: &'a str, what: &str) -> Result<&'a str> {
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::InvalidInput(format!("{} name is required", what)));
    }
    Ok(name)
}
