//! Configuration for Skillforge.
//!
//! Engine tunables live in `config.kdl`, found at:
//! - System: `~/.config/skillforge/config.kdl`
//! - Profile: `<data dir>/profiles/<profile-hash>/config.kdl`
//!
//! Contains:
//! - `repetition-window-days` - Trailing window for repetition counting (1-365)
//! - `free-quota` - Repetitions before XP diminishes
//! - `repetition-step` - Factor lost per extra repetition (0 < step <= 1)
//! - `min-factor` - Floor of the diminishing factor (0-1)
//! - `similarity-threshold` - Jaccard score for "same work" (0-1)
//! - `stack-repetition-factor` - Apply the window factor on top of the quota layer
//!
//! ## Precedence
//!
//! overrides > profile config > system config > defaults
//!
//! Unlike profile JSON state, a config file that fails to parse or validate
//! is an error.
//!
//! Use the [`resolver`] module for precedence resolution.

pub mod resolver;
pub mod schema;

pub use resolver::{
    ConfigOverrides, Resolved, ResolvedConfig, ValueSource, profile_config_path, resolve_config,
    resolve_layers, system_config_path,
};
pub use schema::{CONFIG_FILE_NAME, SkillforgeConfig};
