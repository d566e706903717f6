//! KDL schema for config.kdl.
//!
//! This module provides:
//! - The Rust struct representing the KDL schema
//! - Serialization/deserialization to/from KDL format
//! - Validation and file helpers

use kdl::{KdlDocument, KdlEntry, KdlNode, KdlValue};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::{Error, Result};

/// File name of the config document, both system-wide and per profile.
pub const CONFIG_FILE_NAME: &str = "config.kdl";

/// Bounds for `repetition-window-days`.
pub const WINDOW_DAYS_RANGE: std::ops::RangeInclusive<u32> = 1..=365;

/// Engine tunables stored in config.kdl.
///
/// Every field is optional; unset fields fall through to the next layer
/// during resolution.
///
/// # KDL Schema
///
/// ```kdl
/// repetition-window-days 7
/// free-quota 3
/// repetition-step 0.1
/// min-factor 0.5
/// similarity-threshold 0.5
/// stack-repetition-factor #false
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SkillforgeConfig {
    /// Trailing window (days) for repetition counting
    pub repetition_window_days: Option<u32>,

    /// Repetitions allowed before XP diminishes
    pub free_quota: Option<u32>,

    /// Factor lost per repetition past the quota
    pub repetition_step: Option<f64>,

    /// Floor of the diminishing-returns factor
    pub min_factor: Option<f64>,

    /// Jaccard score at which two titles count as the same work
    pub similarity_threshold: Option<f64>,

    /// Multiply the window factor on top of the quota layer
    pub stack_repetition_factor: Option<bool>,
}

fn first_value<'a>(doc: &'a KdlDocument, name: &str) -> Option<&'a KdlValue> {
    doc.get(name)
        .and_then(|node| node.entries().first())
        .map(|entry| entry.value())
}

fn as_number(value: &KdlValue) -> Option<f64> {
    value
        .as_float()
        .or_else(|| value.as_integer().map(|i| i as f64))
}

fn number_field(doc: &KdlDocument, name: &str) -> Option<f64> {
    let value = first_value(doc, name)?;
    let number = as_number(value);
    if number.is_none() {
        tracing::warn!(value = %value, "ignoring {}", name);
    }
    number
}

fn push_node(doc: &mut KdlDocument, name: &str, value: KdlValue) {
    let mut node = KdlNode::new(name);
    node.push(KdlEntry::new(value));
    doc.nodes_mut().push(node);
}

impl SkillforgeConfig {
    /// Create an empty config with no values set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate the config values.
    pub fn validate(&self) -> Result<()> {
        if let Some(days) = self.repetition_window_days {
            if !WINDOW_DAYS_RANGE.contains(&days) {
                return Err(Error::Config(format!(
                    "repetition-window-days must be 1-365, got {}",
                    days
                )));
            }
        }
        if let Some(step) = self.repetition_step {
            if !(step > 0.0 && step <= 1.0) {
                return Err(Error::Config(format!(
                    "repetition-step must be in (0, 1], got {}",
                    step
                )));
            }
        }
        if let Some(min) = self.min_factor {
            if !(0.0..=1.0).contains(&min) {
                return Err(Error::Config(format!(
                    "min-factor must be in [0, 1], got {}",
                    min
                )));
            }
        }
        if let Some(threshold) = self.similarity_threshold {
            if !(0.0..=1.0).contains(&threshold) {
                return Err(Error::Config(format!(
                    "similarity-threshold must be in [0, 1], got {}",
                    threshold
                )));
            }
        }
        Ok(())
    }

    /// Parse config from a KDL document.
    ///
    /// Values of the wrong type are skipped with a warning; range checks
    /// are left to [`SkillforgeConfig::validate`].
    pub fn from_kdl(doc: &KdlDocument) -> Self {
        let mut config = Self::new();

        if let Some(value) = first_value(doc, "repetition-window-days") {
            config.repetition_window_days = value.as_integer().and_then(|i| u32::try_from(i).ok());
            if config.repetition_window_days.is_none() {
                tracing::warn!(value = %value, "ignoring repetition-window-days");
            }
        }

        if let Some(value) = first_value(doc, "free-quota") {
            config.free_quota = value.as_integer().and_then(|i| u32::try_from(i).ok());
            if config.free_quota.is_none() {
                tracing::warn!(value = %value, "ignoring free-quota");
            }
        }

        // Floats also accept integer literals ("min-factor 1")
        config.repetition_step = number_field(doc, "repetition-step");
        config.min_factor = number_field(doc, "min-factor");
        config.similarity_threshold = number_field(doc, "similarity-threshold");

        if let Some(value) = first_value(doc, "stack-repetition-factor") {
            config.stack_repetition_factor = value.as_bool();
            if config.stack_repetition_factor.is_none() {
                tracing::warn!(value = %value, "ignoring stack-repetition-factor");
            }
        }

        config
    }

    /// Convert config to a KDL document.
    pub fn to_kdl(&self) -> KdlDocument {
        let mut doc = KdlDocument::new();

        if let Some(days) = self.repetition_window_days {
            push_node(&mut doc, "repetition-window-days", KdlValue::Integer(days as i128));
        }
        if let Some(quota) = self.free_quota {
            push_node(&mut doc, "free-quota", KdlValue::Integer(quota as i128));
        }
        if let Some(step) = self.repetition_step {
            push_node(&mut doc, "repetition-step", KdlValue::Float(step));
        }
        if let Some(min) = self.min_factor {
            push_node(&mut doc, "min-factor", KdlValue::Float(min));
        }
        if let Some(threshold) = self.similarity_threshold {
            push_node(&mut doc, "similarity-threshold", KdlValue::Float(threshold));
        }
        if let Some(stack) = self.stack_repetition_factor {
            push_node(&mut doc, "stack-repetition-factor", KdlValue::Bool(stack));
        }

        doc
    }

    /// Merge another config into this one.
    /// Values from `other` override values in `self` if they are Some.
    pub fn merge(&mut self, other: &SkillforgeConfig) {
        if other.repetition_window_days.is_some() {
            self.repetition_window_days = other.repetition_window_days;
        }
        if other.free_quota.is_some() {
            self.free_quota = other.free_quota;
        }
        if other.repetition_step.is_some() {
            self.repetition_step = other.repetition_step;
        }
        if other.min_factor.is_some() {
            self.min_factor = other.min_factor;
        }
        if other.similarity_threshold.is_some() {
            self.similarity_threshold = other.similarity_threshold;
        }
        if other.stack_repetition_factor.is_some() {
            self.stack_repetition_factor = other.stack_repetition_factor;
        }
    }

    /// Parse and validate KDL text.
    pub fn parse(text: &str) -> Result<Self> {
        let doc: KdlDocument = text
            .parse()
            .map_err(|e| Error::Config(format!("invalid KDL: {}", e)))?;
        let config = Self::from_kdl(&doc);
        config.validate()?;
        Ok(config)
    }

    /// Read a config file. A missing file is an empty config.
    pub fn read_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = fs::read_to_string(path)?;
        Self::parse(&text).map_err(|e| match e {
            Error::Config(msg) => Error::Config(format!("{}: {}", path.display(), msg)),
            other => other,
        })
    }

    /// Validate and write a config file, creating parent directories.
    pub fn write_file(&self, path: &Path) -> Result<()> {
        self.validate()?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, self.to_kdl().to_string())?;
        Ok(())
    }
}
