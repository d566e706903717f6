//! Precedence resolution for engine configuration.
//!
//! ## Precedence (highest to lowest)
//!
//! 1. Explicit overrides (passed at runtime)
//! 2. Profile config.kdl (`<data dir>/profiles/<profile-hash>/config.kdl`)
//! 3. System config.kdl (`~/.config/skillforge/config.kdl`)
//! 4. Built-in defaults

use std::path::{Path, PathBuf};

use crate::Result;
use crate::board::XpPolicy;
use crate::config::schema::{CONFIG_FILE_NAME, SkillforgeConfig};
use crate::models::repetition::DEFAULT_WINDOW_DAYS;
use crate::models::similarity::SIMILARITY_THRESHOLD;
use crate::models::xp::DiminishingReturns;
use crate::storage::ProfileStore;

/// Tracks where a resolved value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueSource {
    /// Value passed explicitly by the caller
    Override,
    /// Value from the profile's config.kdl
    Profile,
    /// Value from the system config.kdl
    System,
    /// Built-in default value
    Default,
}

impl std::fmt::Display for ValueSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValueSource::Override => write!(f, "override"),
            ValueSource::Profile => write!(f, "profile"),
            ValueSource::System => write!(f, "system"),
            ValueSource::Default => write!(f, "default"),
        }
    }
}

/// A resolved value with its source.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Resolved<T> {
    /// The resolved value
    pub value: T,
    /// Where the value came from
    pub source: ValueSource,
}

impl<T> Resolved<T> {
    /// Create a new resolved value.
    pub fn new(value: T, source: ValueSource) -> Self {
        Self { value, source }
    }
}

/// Fully resolved configuration with source tracking.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedConfig {
    pub repetition_window_days: Resolved<u32>,
    pub free_quota: Resolved<u32>,
    pub repetition_step: Resolved<f64>,
    pub min_factor: Resolved<f64>,
    pub similarity_threshold: Resolved<f64>,
    pub stack_repetition_factor: Resolved<bool>,
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        let curve = DiminishingReturns::default();
        Self {
            repetition_window_days: Resolved::new(DEFAULT_WINDOW_DAYS, ValueSource::Default),
            free_quota: Resolved::new(curve.free_quota, ValueSource::Default),
            repetition_step: Resolved::new(curve.step, ValueSource::Default),
            min_factor: Resolved::new(curve.min_factor, ValueSource::Default),
            similarity_threshold: Resolved::new(SIMILARITY_THRESHOLD, ValueSource::Default),
            stack_repetition_factor: Resolved::new(false, ValueSource::Default),
        }
    }
}

impl ResolvedConfig {
    /// The XP policy these values describe.
    pub fn xp_policy(&self) -> XpPolicy {
        XpPolicy {
            window_days: self.repetition_window_days.value,
            curve: DiminishingReturns {
                free_quota: self.free_quota.value,
                step: self.repetition_step.value,
                min_factor: self.min_factor.value,
            },
            similarity_threshold: self.similarity_threshold.value,
            stack_repetition_factor: self.stack_repetition_factor.value,
        }
    }
}

/// Runtime overrides for configuration resolution.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigOverrides {
    config: SkillforgeConfig,
}

impl ConfigOverrides {
    /// Create empty overrides.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_window_days(mut self, days: u32) -> Self {
        self.config.repetition_window_days = Some(days);
        self
    }

    pub fn with_free_quota(mut self, quota: u32) -> Self {
        self.config.free_quota = Some(quota);
        self
    }

    pub fn with_repetition_step(mut self, step: f64) -> Self {
        self.config.repetition_step = Some(step);
        self
    }

    pub fn with_min_factor(mut self, min: f64) -> Self {
        self.config.min_factor = Some(min);
        self
    }

    pub fn with_similarity_threshold(mut self, threshold: f64) -> Self {
        self.config.similarity_threshold = Some(threshold);
        self
    }

    pub fn with_stack_repetition_factor(mut self, stack: bool) -> Self {
        self.config.stack_repetition_factor = Some(stack);
        self
    }
}

/// Path of the system-wide config file.
pub fn system_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("skillforge").join(CONFIG_FILE_NAME))
}

/// Path of a profile's config file, `None` for stores without a directory.
pub fn profile_config_path(store: &ProfileStore) -> Option<PathBuf> {
    store.root().map(|root| root.join(CONFIG_FILE_NAME))
}

fn read_optional(path: Option<&Path>) -> Result<SkillforgeConfig> {
    match path {
        Some(path) => SkillforgeConfig::read_file(path),
        None => Ok(SkillforgeConfig::default()),
    }
}

/// Pick the highest-precedence layer that sets a value.
fn pick<T: Copy>(
    current: Resolved<T>,
    layers: [(&SkillforgeConfig, ValueSource); 3],
    field: impl Fn(&SkillforgeConfig) -> Option<T>,
) -> Resolved<T> {
    layers
        .into_iter()
        .find_map(|(config, source)| field(config).map(|v| Resolved::new(v, source)))
        .unwrap_or(current)
}

/// Resolve configuration from explicit layers.
pub fn resolve_layers(
    system: &SkillforgeConfig,
    profile: &SkillforgeConfig,
    overrides: &ConfigOverrides,
) -> Result<ResolvedConfig> {
    overrides.config.validate()?;
    let layers = [
        (&overrides.config, ValueSource::Override),
        (profile, ValueSource::Profile),
        (system, ValueSource::System),
    ];
    let defaults = ResolvedConfig::default();

    Ok(ResolvedConfig {
        repetition_window_days: pick(defaults.repetition_window_days, layers, |c| {
            c.repetition_window_days
        }),
        free_quota: pick(defaults.free_quota, layers, |c| c.free_quota),
        repetition_step: pick(defaults.repetition_step, layers, |c| c.repetition_step),
        min_factor: pick(defaults.min_factor, layers, |c| c.min_factor),
        similarity_threshold: pick(defaults.similarity_threshold, layers, |c| {
            c.similarity_threshold
        }),
        stack_repetition_factor: pick(defaults.stack_repetition_factor, layers, |c| {
            c.stack_repetition_factor
        }),
    })
}

/// Resolve configuration with full precedence chain.
///
/// Precedence (highest to lowest):
/// 1. Explicit overrides
/// 2. Profile config.kdl
/// 3. System config.kdl
/// 4. Built-in defaults
pub fn resolve_config(store: &ProfileStore, overrides: &ConfigOverrides) -> Result<ResolvedConfig> {
    let system = read_optional(system_config_path().as_deref())?;
    let profile = read_optional(profile_config_path(store).as_deref())?;
    let resolved = resolve_layers(&system, &profile, overrides)?;
    tracing::debug!(
        profile = store.profile(),
        window_days = resolved.repetition_window_days.value,
        window_days_source = %resolved.repetition_window_days.source,
        stack = resolved.stack_repetition_factor.value,
        "config resolved"
    );
    Ok(resolved)
}
