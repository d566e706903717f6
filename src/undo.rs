//! Undo capture for destructive operations.
//!
//! Deleting a fighter, skill or category produces an [`ActionRecord`]
//! carrying enough data to rebuild the prior state. Applying undo is up to
//! the caller; this module only builds the payloads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::models::{Category, Fighter, Skill};
use crate::sync::{RemovedFighter, SkillSlice};

/// Kind of destructive action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    DeleteFighter,
    DeleteSkill,
    DeleteCategory,
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ActionType::DeleteFighter => "delete_fighter",
            ActionType::DeleteSkill => "delete_skill",
            ActionType::DeleteCategory => "delete_category",
        };
        write!(f, "{}", s)
    }
}

/// An undoable action as handed to the undo manager.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionRecord {
    /// Unique identifier (UUID v4)
    pub id: String,

    #[serde(rename = "type")]
    pub action_type: ActionType,

    /// Human-readable summary
    pub description: String,

    /// Everything needed to restore the prior state
    pub data: serde_json::Value,

    pub timestamp: DateTime<Utc>,
}

/// Payload of a fighter deletion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FighterDeletion {
    pub fighter: Fighter,
    /// Position in the fighter list
    pub index: usize,
    pub roster: RemovedFighter,
}

/// Payload of a skill deletion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillDeletion {
    pub skill: Skill,
    pub category_id: String,
    /// Position within the category
    pub index: usize,
    pub roster: SkillSlice,
}

/// Payload of a category deletion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryDeletion {
    pub category: Category,
    /// Position in the tree
    pub index: usize,
    pub roster: Vec<SkillSlice>,
}

impl ActionRecord {
    fn new(
        action_type: ActionType,
        description: String,
        data: serde_json::Value,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            action_type,
            description,
            data,
            timestamp: now,
        }
    }

    pub fn fighter_deleted(deletion: &FighterDeletion, now: DateTime<Utc>) -> crate::Result<Self> {
        Ok(Self::new(
            ActionType::DeleteFighter,
            format!("Delete fighter \"{}\"", deletion.fighter.name),
            serde_json::to_value(deletion)?,
            now,
        ))
    }

    pub fn skill_deleted(deletion: &SkillDeletion, now: DateTime<Utc>) -> crate::Result<Self> {
        Ok(Self::new(
            ActionType::DeleteSkill,
            format!("Delete skill \"{}\"", deletion.skill.name),
            serde_json::to_value(deletion)?,
            now,
        ))
    }

    pub fn category_deleted(deletion: &CategoryDeletion, now: DateTime<Utc>) -> crate::Result<Self> {
        Ok(Self::new(
            ActionType::DeleteCategory,
            format!(
                "Delete category \"{}\" ({} skills)",
                deletion.category.name,
                deletion.category.skills.len()
            ),
            serde_json::to_value(deletion)?,
            now,
        ))
    }

    /// Decode the payload back into its typed form.
    pub fn payload<T: serde::de::DeserializeOwned>(&self) -> crate::Result<T> {
        Ok(serde_json::from_value(self.data.clone())?)
    }
}
