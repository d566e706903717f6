//! Data models for Skillforge entities.
//!
//! This module defines the core data structures:
//! - `Category` / `Skill` - The skill tree, with checklist-style template levels
//! - `ChecklistItem` - A template checklist entry inside a skill level
//! - `Fighter` - A tracked person whose skills and XP are managed
//! - `WorkItem` - Assignable work linked to (fighter, skill) lines carrying XP
//! - Roster maps (`FighterSkillLevels`, `FighterXpLedger`, `FighterSkills`)
//!
//! Checklist items and work items are two unrelated "task" concepts. The
//! first drives skill/category progress, the second drives XP.
//!
//! The pure engine lives in the submodules: [`leveling`], [`similarity`],
//! [`repetition`], [`xp`] and [`progress`].

pub mod leveling;
pub mod progress;
pub mod repetition;
pub mod similarity;
pub mod xp;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Fighter id → (skill id → level 0..=10). 0 means "not assigned".
pub type FighterSkillLevels = BTreeMap<String, BTreeMap<String, u8>>;

/// Fighter id → (skill id → cumulative XP).
pub type FighterXpLedger = BTreeMap<String, BTreeMap<String, u32>>;

/// Fighter id → (skill id → assigned flag).
pub type FighterSkills = BTreeMap<String, BTreeMap<String, bool>>;

/// A template checklist entry inside a skill level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChecklistItem {
    /// Item identifier (unique within the level)
    #[serde(default)]
    pub id: String,

    /// Item text
    #[serde(alias = "name", alias = "text")]
    pub title: String,

    /// Whether the item has been ticked off
    #[serde(default)]
    pub done: bool,
}

impl ChecklistItem {
    /// Create a new, unticked checklist item.
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            done: false,
        }
    }
}

/// A template proficiency level (1..=5) of a skill.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillLevel {
    /// Level number (1-5)
    pub level: u8,

    /// Level title
    #[serde(default)]
    pub title: String,

    /// Ordered checklist items
    #[serde(rename = "tasks", default)]
    pub items: Vec<ChecklistItem>,
}

impl SkillLevel {
    /// Create an empty level.
    pub fn new(level: u8, title: impl Into<String>) -> Self {
        Self {
            level,
            title: title.into(),
            items: Vec::new(),
        }
    }
}

/// Number of template levels a new skill starts with.
pub const TEMPLATE_LEVELS: u8 = 5;

/// A named capability in the skill tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Skill {
    /// Unique identifier (e.g., "sk-a1b2")
    pub id: String,

    /// Skill name
    pub name: String,

    /// Detailed description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Tags for categorization
    #[serde(default)]
    pub tags: Vec<String>,

    /// Archived skills are hidden and excluded from category progress
    #[serde(default)]
    pub archived: bool,

    /// Ordered template levels
    #[serde(default)]
    pub levels: Vec<SkillLevel>,
}

impl Skill {
    /// Create a new skill with empty template levels 1 through 5.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: None,
            tags: Vec::new(),
            archived: false,
            levels: (1..=TEMPLATE_LEVELS)
                .map(|n| SkillLevel::new(n, format!("Level {}", n)))
                .collect(),
        }
    }

    /// Get a template level by its number.
    pub fn level(&self, level: u8) -> Option<&SkillLevel> {
        self.levels.iter().find(|l| l.level == level)
    }
}

/// A group of skills.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    /// Unique identifier (e.g., "cat-a1b2")
    pub id: String,

    /// Category name
    pub name: String,

    /// Ordered skills (order matters for display only)
    #[serde(default)]
    pub skills: Vec<Skill>,
}

impl Category {
    /// Create an empty category.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            skills: Vec::new(),
        }
    }

    /// Find a skill in this category.
    pub fn skill(&self, skill_id: &str) -> Option<&Skill> {
        self.skills.iter().find(|s| s.id == skill_id)
    }

    /// Skills that are not archived.
    pub fn active_skills(&self) -> impl Iterator<Item = &Skill> {
        self.skills.iter().filter(|s| !s.archived)
    }
}

/// Every skill id in the tree, archived ones included.
pub fn all_skill_ids(categories: &[Category]) -> Vec<String> {
    categories
        .iter()
        .flat_map(|c| c.skills.iter().map(|s| s.id.clone()))
        .collect()
}

/// Find the category owning a skill.
pub fn category_of_skill<'a>(categories: &'a [Category], skill_id: &str) -> Option<&'a Category> {
    categories.iter().find(|c| c.skill(skill_id).is_some())
}

/// A tracked person.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fighter {
    /// Unique identifier (e.g., "ftr-a1b2")
    pub id: String,

    /// Display name
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub callsign: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

impl Fighter {
    /// Create a new fighter with the given ID and display name.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            callsign: None,
            full_name: None,
            unit: None,
            status: None,
        }
    }
}

/// Work item lifecycle status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkItemStatus {
    #[default]
    Todo,
    InProgress,
    /// Submitted and waiting for XP approval
    Validation,
    Done,
    /// Terminal side-branch, reachable from done only
    Archived,
}

impl WorkItemStatus {
    /// Returns true for work that is credited or pending credit.
    pub fn is_credited(&self) -> bool {
        matches!(self, WorkItemStatus::Done | WorkItemStatus::Validation)
    }

    /// Get all statuses in pipeline order.
    pub fn all() -> &'static [WorkItemStatus] {
        &[
            WorkItemStatus::Todo,
            WorkItemStatus::InProgress,
            WorkItemStatus::Validation,
            WorkItemStatus::Done,
            WorkItemStatus::Archived,
        ]
    }
}

impl fmt::Display for WorkItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            WorkItemStatus::Todo => "todo",
            WorkItemStatus::InProgress => "in_progress",
            WorkItemStatus::Validation => "validation",
            WorkItemStatus::Done => "done",
            WorkItemStatus::Archived => "archived",
        };
        write!(f, "{}", s)
    }
}

impl std::str::FromStr for WorkItemStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "todo" => Ok(WorkItemStatus::Todo),
            "in_progress" => Ok(WorkItemStatus::InProgress),
            "validation" => Ok(WorkItemStatus::Validation),
            "done" => Ok(WorkItemStatus::Done),
            "archived" => Ok(WorkItemStatus::Archived),
            _ => Err(format!("Unknown work item status: {}", s)),
        }
    }
}

/// One (skill, category) line of an assignee, carrying XP.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillLine {
    pub skill_id: String,

    pub category_id: String,

    /// XP computed at composition time
    #[serde(default)]
    pub suggested_xp: u32,

    /// XP committed at approval (or a reviewer override before approval)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approved_xp: Option<u32>,
}

impl SkillLine {
    /// Create a line with no XP yet.
    pub fn new(skill_id: impl Into<String>, category_id: impl Into<String>) -> Self {
        Self {
            skill_id: skill_id.into(),
            category_id: category_id.into(),
            suggested_xp: 0,
            approved_xp: None,
        }
    }
}

/// A fighter assigned to a work item, with the skills the work trains.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assignee {
    pub fighter_id: String,

    #[serde(default)]
    pub skills: Vec<SkillLine>,
}

impl Assignee {
    pub fn new(fighter_id: impl Into<String>, skills: Vec<SkillLine>) -> Self {
        Self {
            fighter_id: fighter_id.into(),
            skills,
        }
    }

    /// Returns true if this assignee trains the given skill.
    pub fn has_skill(&self, skill_id: &str) -> bool {
        self.skills.iter().any(|l| l.skill_id == skill_id)
    }
}

/// A recorded status transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusChange {
    pub from_status: WorkItemStatus,
    pub to_status: WorkItemStatus,
    pub changed_at: DateTime<Utc>,
}

/// A comment left on a work item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: String,
    pub author: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

/// Ordered status log and comments of a work item.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkItemHistory {
    #[serde(default)]
    pub status_changes: Vec<StatusChange>,

    #[serde(default)]
    pub comments: Vec<Comment>,
}

/// Lowest and highest work item difficulty.
pub const MIN_DIFFICULTY: u8 = 1;
pub const MAX_DIFFICULTY: u8 = 5;

/// An assignable unit of work carrying suggested and approved XP.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkItem {
    /// Unique identifier (e.g., "wi-a1b2")
    pub id: String,

    pub title: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Difficulty (1-5)
    pub difficulty: u8,

    /// Priority flag
    #[serde(default)]
    pub priority: bool,

    #[serde(default)]
    pub status: WorkItemStatus,

    /// Ordered assignees
    #[serde(default)]
    pub assignees: Vec<Assignee>,

    pub created_at: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submitted_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approved_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub history: WorkItemHistory,
}

impl WorkItem {
    /// Create a new work item in `todo`. Difficulty is clamped into 1..=5.
    pub fn new(id: impl Into<String>, title: impl Into<String>, difficulty: u8) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: None,
            difficulty: difficulty.clamp(MIN_DIFFICULTY, MAX_DIFFICULTY),
            priority: false,
            status: WorkItemStatus::default(),
            assignees: Vec::new(),
            created_at: Utc::now(),
            submitted_at: None,
            approved_at: None,
            history: WorkItemHistory::default(),
        }
    }

    /// Find an assignee entry by fighter.
    pub fn assignee(&self, fighter_id: &str) -> Option<&Assignee> {
        self.assignees.iter().find(|a| a.fighter_id == fighter_id)
    }

    /// Returns true if a single assignee record matches both fighter and skill.
    pub fn has_line(&self, fighter_id: &str, skill_id: &str) -> bool {
        self.assignees
            .iter()
            .any(|a| a.fighter_id == fighter_id && a.has_skill(skill_id))
    }
}
