//! Whole-tree JSON export and import.
//!
//! Exports are wrapped in an envelope:
//!
//! ```json
//! {"format": "skillforge-tree", "version": 1, "exportedAt": "...", "generator": "...", "categories": [...]}
//! ```
//!
//! Imports accept that envelope or a bare category array, and re-validate
//! the tree before handing it back.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;

use crate::models::{Category, TEMPLATE_LEVELS};
use crate::{Error, Result};

/// Envelope format tag.
pub const FORMAT_NAME: &str = "skillforge-tree";

/// Current envelope version.
pub const FORMAT_VERSION: u32 = 1;

/// Exported skill tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeExport {
    pub format: String,
    pub version: u32,
    pub exported_at: DateTime<Utc>,
    /// Library version that wrote the file
    #[serde(default)]
    pub generator: String,
    pub categories: Vec<Category>,
}

/// Serialize a skill tree into a pretty-printed export document.
pub fn export_tree(categories: &[Category], now: DateTime<Utc>) -> Result<String> {
    let export = TreeExport {
        format: FORMAT_NAME.to_string(),
        version: FORMAT_VERSION,
        exported_at: now,
        generator: crate::build_info(),
        categories: categories.to_vec(),
    };
    Ok(serde_json::to_string_pretty(&export)?)
}

/// Parse and validate an export document or bare category array.
pub fn import_tree(json: &str) -> Result<Vec<Category>> {
    let value: Value = serde_json::from_str(json)
        .map_err(|e| Error::InvalidInput(format!("import is not valid JSON: {}", e)))?;

    let categories = match value {
        Value::Array(items) => Value::Array(items),
        Value::Object(mut envelope) => {
            match envelope.get("format").and_then(Value::as_str) {
                Some(FORMAT_NAME) => {}
                Some(other) => {
                    return Err(Error::InvalidInput(format!("unknown export format: {}", other)));
                }
                None => return Err(Error::InvalidInput("missing export format".to_string())),
            }
            let version = envelope.get("version").and_then(Value::as_u64).unwrap_or(0);
            if version == 0 || version > u64::from(FORMAT_VERSION) {
                return Err(Error::InvalidInput(format!(
                    "unsupported export version: {}",
                    version
                )));
            }
            envelope
                .remove("categories")
                .ok_or_else(|| Error::InvalidInput("export has no categories".to_string()))?
        }
        _ => {
            return Err(Error::InvalidInput(
                "import must be an export object or a category array".to_string(),
            ));
        }
    };

    let categories: Vec<Category> = serde_json::from_value(categories)
        .map_err(|e| Error::InvalidInput(format!("malformed skill tree: {}", e)))?;
    validate_tree(&categories)?;
    tracing::info!(categories = categories.len(), "skill tree imported");
    Ok(categories)
}

/// Check ids, names and template levels of a skill tree.
pub fn validate_tree(categories: &[Category]) -> Result<()> {
    let mut category_ids = HashSet::new();
    let mut skill_ids = HashSet::new();

    for category in categories {
        if category.id.trim().is_empty() {
            return Err(Error::InvalidInput(format!(
                "category \"{}\" has an empty id",
                category.name
            )));
        }
        if !category_ids.insert(category.id.as_str()) {
            return Err(Error::InvalidInput(format!("duplicate category id: {}", category.id)));
        }
        if category.name.trim().is_empty() {
            return Err(Error::InvalidInput(format!("category {} has no name", category.id)));
        }

        for skill in &category.skills {
            if skill.id.trim().is_empty() {
                return Err(Error::InvalidInput(format!(
                    "skill \"{}\" in {} has an empty id",
                    skill.name, category.id
                )));
            }
            if !skill_ids.insert(skill.id.as_str()) {
                return Err(Error::InvalidInput(format!("duplicate skill id: {}", skill.id)));
            }
            if skill.name.trim().is_empty() {
                return Err(Error::InvalidInput(format!("skill {} has no name", skill.id)));
            }

            let mut levels = HashSet::new();
            for level in &skill.levels {
                if !(1..=TEMPLATE_LEVELS).contains(&level.level) {
                    return Err(Error::InvalidInput(format!(
                        "skill {} has level {} outside 1-{}",
                        skill.id, level.level, TEMPLATE_LEVELS
                    )));
                }
                if !levels.insert(level.level) {
                    return Err(Error::InvalidInput(format!(
                        "skill {} repeats level {}",
                        skill.id, level.level
                    )));
                }
            }
        }
    }
    Ok(())
}
