//! Storage layer for Skillforge data.
//!
//! Each named profile is a key-value store of whole JSON values (fighters,
//! XP ledger, skill levels, assignment flags, skill tree, work items, undo
//! history). Values are read and written whole; there is no partial update.
//!
//! ## Layout
//!
//! - Data root: `$SKILLFORGE_DATA_DIR`, else `~/.local/share/skillforge/`
//! - Profile: `<data root>/profiles/<12 hex chars of sha256(profile name)>/`
//! - One `<key>.json` file per logical key, plus `config.kdl`
//!
//! ## Loading
//!
//! Loaded data is never trusted blindly: [`ProfileStore::load_or_default`]
//! runs an optional shape validator and silently falls back to the caller's
//! default when a value is missing, unparsable or rejected.

pub mod backend;
pub mod snapshot;

pub use backend::{BackendType, FileBackend, KeyValueBackend, MemoryBackend};
pub use snapshot::ProfileSnapshot;

use crate::models::leveling::MAX_LEVEL;
use crate::models::xp::normalize_xp;
use crate::models::{FighterSkillLevels, FighterSkills, FighterXpLedger};
use crate::undo::ActionRecord;
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable overriding the data root.
pub const DATA_DIR_ENV: &str = "SKILLFORGE_DATA_DIR";

/// Undo records kept per profile.
pub const UNDO_HISTORY_LIMIT: usize = 50;

/// Logical keys of the profile store.
pub mod keys {
    pub const PROFILE: &str = "profile";
    pub const FIGHTERS: &str = "fighters";
    pub const XP_LEDGER: &str = "fighterXp";
    pub const SKILL_LEVELS: &str = "fighterSkillLevels";
    pub const FIGHTER_SKILLS: &str = "fighterSkills";
    pub const SKILL_TREE: &str = "skillTree";
    pub const WORK_ITEMS: &str = "tasksV2";
    pub const UNDO_HISTORY: &str = "undoHistory";
}

/// Shape check run on loaded JSON before it is trusted.
pub type Validator = fn(&Value) -> bool;

/// Stock validators for the persisted shapes.
pub mod validators {
    use serde_json::Value;

    pub fn is_array(value: &Value) -> bool {
        value.is_array()
    }

    /// An array whose elements are objects carrying a string `id`.
    pub fn is_array_of_records(value: &Value) -> bool {
        value.as_array().is_some_and(|items| {
            items
                .iter()
                .all(|item| item.get("id").is_some_and(Value::is_string))
        })
    }

    /// `{ outer: { inner: any } }`
    pub fn is_nested_object(value: &Value) -> bool {
        value
            .as_object()
            .is_some_and(|outer| outer.values().all(Value::is_object))
    }
}

/// Profile metadata stored under [`keys::PROFILE`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileMeta {
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// Get the data root: `$SKILLFORGE_DATA_DIR`, else the platform data dir.
pub fn get_data_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
        if !dir.is_empty() {
            return Ok(PathBuf::from(dir));
        }
    }
    let data_dir = dirs::data_dir()
        .ok_or_else(|| Error::Other("Could not determine data directory".to_string()))?;
    Ok(data_dir.join("skillforge"))
}

/// Directory of a profile under a data root.
pub fn get_profile_dir(data_dir: &Path, profile: &str) -> PathBuf {
    let mut hasher = Sha256::new();
    hasher.update(profile.as_bytes());
    let hash_hex = format!("{:x}", hasher.finalize());
    data_dir.join("profiles").join(&hash_hex[..12])
}

/// List profiles found under a data root.
pub fn list_profiles(data_dir: &Path) -> Result<Vec<ProfileMeta>> {
    let profiles_dir = data_dir.join("profiles");
    if !profiles_dir.exists() {
        return Ok(Vec::new());
    }

    let mut profiles = Vec::new();
    for entry in fs::read_dir(profiles_dir)? {
        let path = entry?.path();
        if !path.is_dir() {
            continue;
        }
        let backend = FileBackend::open(&path)?;
        match backend.get(keys::PROFILE)? {
            Some(raw) => match serde_json::from_str::<ProfileMeta>(&raw) {
                Ok(meta) => profiles.push(meta),
                Err(e) => tracing::warn!(path = %path.display(), error = %e, "unreadable profile metadata"),
            },
            None => tracing::warn!(path = %path.display(), "profile directory without metadata"),
        }
    }
    profiles.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(profiles)
}

/// Key-value store for one named profile.
pub struct ProfileStore {
    profile: String,
    /// Profile directory for file-backed stores
    root: Option<PathBuf>,
    backend: Box<dyn KeyValueBackend>,
}

impl ProfileStore {
    /// Open (or create) a profile under the default data root.
    pub fn open(profile: &str) -> Result<Self> {
        Self::open_with_data_dir(profile, &get_data_dir()?)
    }

    /// Open (or create) a profile under an explicit data root.
    pub fn open_with_data_dir(profile: &str, data_dir: &Path) -> Result<Self> {
        if profile.trim().is_empty() {
            return Err(Error::InvalidInput("profile name is empty".to_string()));
        }
        let root = get_profile_dir(data_dir, profile);
        let backend = FileBackend::open(&root)?;
        let mut store = Self {
            profile: profile.to_string(),
            root: Some(root),
            backend: Box::new(backend),
        };
        store.ensure_meta()?;
        Ok(store)
    }

    /// A profile held in memory only.
    pub fn in_memory(profile: &str) -> Self {
        Self::with_backend(profile, Box::new(MemoryBackend::new()))
    }

    /// A profile over any backend.
    pub fn with_backend(profile: &str, backend: Box<dyn KeyValueBackend>) -> Self {
        Self {
            profile: profile.to_string(),
            root: None,
            backend,
        }
    }

    fn ensure_meta(&mut self) -> Result<()> {
        if self.backend.get(keys::PROFILE)?.is_none() {
            let meta = ProfileMeta {
                name: self.profile.clone(),
                created_at: Utc::now(),
            };
            self.save(keys::PROFILE, &meta)?;
            tracing::info!(profile = %self.profile, location = %self.location(), "profile created");
        }
        Ok(())
    }

    pub fn profile(&self) -> &str {
        &self.profile
    }

    /// Profile directory, `None` for non-file backends.
    pub fn root(&self) -> Option<&Path> {
        self.root.as_deref()
    }

    pub fn location(&self) -> String {
        self.backend.location()
    }

    pub fn backend_type(&self) -> &'static str {
        self.backend.backend_type()
    }

    /// Read a value as untyped JSON. Unparsable data is an error here.
    pub fn get_value(&self, key: &str) -> Result<Option<Value>> {
        match self.backend.get(key)? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    /// Load a typed value, falling back to `default` on any problem.
    ///
    /// Missing keys, unparsable JSON, validator rejection and type
    /// mismatches are logged and answered with the default, never raised.
    pub fn load_or_default<T: DeserializeOwned>(
        &self,
        key: &str,
        default: T,
        validator: Option<Validator>,
    ) -> T {
        let Some(value) = self.load_checked(key, validator) else {
            return default;
        };
        match serde_json::from_value(value) {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!(profile = %self.profile, key, error = %e, "stored value has wrong shape, using default");
                default
            }
        }
    }

    fn load_checked(&self, key: &str, validator: Option<Validator>) -> Option<Value> {
        let value = match self.get_value(key) {
            Ok(Some(value)) => value,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!(profile = %self.profile, key, error = %e, "unreadable stored value, using default");
                return None;
            }
        };
        if let Some(validate) = validator {
            if !validate(&value) {
                tracing::warn!(profile = %self.profile, key, "stored value failed validation, using default");
                return None;
            }
        }
        Some(value)
    }

    /// Serialize and store a whole value.
    pub fn save<T: Serialize + ?Sized>(&mut self, key: &str, value: &T) -> Result<()> {
        let raw = serde_json::to_string(value)?;
        self.backend.set(key, &raw)
    }

    /// Remove a key. Returns true if it existed.
    pub fn remove(&mut self, key: &str) -> Result<bool> {
        self.backend.remove(key)
    }

    pub fn keys(&self) -> Result<Vec<String>> {
        self.backend.keys()
    }

    /// Load the XP ledger, normalizing every entry.
    ///
    /// Negative or fractional XP is rounded and floored at 0; non-numeric
    /// entries become 0.
    pub fn load_xp_ledger(&self) -> FighterXpLedger {
        self.load_nested(keys::XP_LEDGER, |v| normalize_xp(v.as_f64().unwrap_or(0.0)))
    }

    /// Load skill levels, clamping every entry into 0..=10.
    pub fn load_skill_levels(&self) -> FighterSkillLevels {
        self.load_nested(keys::SKILL_LEVELS, |v| {
            let level = v.as_f64().filter(|l| l.is_finite()).unwrap_or(0.0);
            level.round().clamp(0.0, MAX_LEVEL as f64) as u8
        })
    }

    /// Load assignment flags. Non-boolean entries become false.
    pub fn load_assignments(&self) -> FighterSkills {
        self.load_nested(keys::FIGHTER_SKILLS, |v| v.as_bool().unwrap_or(false))
    }

    fn load_nested<T>(&self, key: &str, convert: impl Fn(&Value) -> T) -> BTreeMap<String, BTreeMap<String, T>> {
        let Some(value) = self.load_checked(key, Some(validators::is_nested_object)) else {
            return BTreeMap::new();
        };
        let Value::Object(outer) = value else {
            return BTreeMap::new();
        };
        outer
            .into_iter()
            .map(|(fighter_id, inner)| {
                let entries: BTreeMap<String, T> = inner
                    .as_object()
                    .map(|m| m.iter().map(|(skill_id, v)| (skill_id.clone(), convert(v))).collect())
                    .unwrap_or_default();
                (fighter_id, entries)
            })
            .collect()
    }

    /// Undo records, oldest first.
    pub fn undo_history(&self) -> Vec<ActionRecord> {
        self.load_or_default(keys::UNDO_HISTORY, Vec::new(), Some(validators::is_array))
    }

    /// Append an undo record, keeping the newest [`UNDO_HISTORY_LIMIT`].
    ///
    /// This never fails; a write error is logged and the record dropped so
    /// the destructive operation itself still goes through.
    pub fn record_action(&mut self, record: ActionRecord) {
        let mut history = self.undo_history();
        history.push(record);
        if history.len() > UNDO_HISTORY_LIMIT {
            let excess = history.len() - UNDO_HISTORY_LIMIT;
            history.drain(..excess);
        }
        if let Err(e) = self.save(keys::UNDO_HISTORY, &history) {
            tracing::warn!(profile = %self.profile, error = %e, "failed to record undo action");
        }
    }

    /// Remove and return the newest undo record.
    pub fn pop_action(&mut self) -> Result<Option<ActionRecord>> {
        let mut history = self.undo_history();
        let record = history.pop();
        if record.is_some() {
            self.save(keys::UNDO_HISTORY, &history)?;
        }
        Ok(record)
    }
}

/// Generate a unique ID for an entity.
///
/// Format: `<prefix>-<4 hex chars>`
/// - Fighter prefix: "ftr"
/// - Skill prefix: "sk"
/// - Category prefix: "cat"
/// - Work item prefix: "wi"
/// - Comment prefix: "cmt"
pub fn generate_id(prefix: &str, seed: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(seed.as_bytes());
    hasher.update(
        chrono::Utc::now()
            .timestamp_nanos_opt()
            .unwrap_or(0)
            .to_le_bytes(),
    );
    let hash = hasher.finalize();
    let hash_hex = format!("{:x}", hash);
    format!("{}-{}", prefix, &hash_hex[..4])
}

/// Generate an ID not present in `existing`.
pub fn generate_unique_id<'a>(
    prefix: &str,
    seed: &str,
    existing: impl Iterator<Item = &'a str> + Clone,
) -> String {
    let mut attempt = 0u32;
    loop {
        let id = generate_id(prefix, &format!("{}#{}", seed, attempt));
        if !existing.clone().any(|e| e == id) {
            return id;
        }
        attempt += 1;
    }
}

/// Validate that an ID matches the expected format.
pub fn validate_id(id: &str, prefix: &str) -> Result<()> {
    if !id.starts_with(&format!("{}-", prefix)) {
        return Err(Error::InvalidId(format!(
            "ID must start with '{}-', got: {}",
            prefix, id
        )));
    }

    let suffix = &id[prefix.len() + 1..];
    if suffix.len() != 4 || !suffix.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(Error::InvalidId(format!(
            "ID suffix must be 4 hex characters, got: {}",
            suffix
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Fighter;
    use crate::test_utils::TestEnv;
    use crate::undo::{ActionType, FighterDeletion};
    use serial_test::serial;

    #[test]
    fn test_generate_id_format() {
        let id = generate_id("ftr", "test seed");
        assert!(id.starts_with("ftr-"));
        assert_eq!(id.len(), 8);
        assert!(validate_id(&id, "ftr").is_ok());
    }

    #[test]
    fn test_generate_unique_id_avoids_existing() {
        let existing: Vec<String> = (0..20).map(|i| generate_id("sk", &i.to_string())).collect();
        let id = generate_unique_id("sk", "seed", existing.iter().map(String::as_str));
        assert!(!existing.contains(&id));
    }

    #[test]
    fn test_validate_id_invalid() {
        assert!(validate_id("task-a1b2", "wi").is_err());
        assert!(validate_id("wi-a1b", "wi").is_err());
        assert!(validate_id("wi-ghij", "wi").is_err());
    }

    #[test]
    fn test_profile_dir_is_stable_and_distinct() {
        let root = Path::new("/data");
        assert_eq!(get_profile_dir(root, "alpha"), get_profile_dir(root, "alpha"));
        assert_ne!(get_profile_dir(root, "alpha"), get_profile_dir(root, "bravo"));
        assert!(get_profile_dir(root, "alpha").starts_with("/data/profiles"));
    }

    #[test]
    fn test_open_creates_profile_meta() {
        let env = TestEnv::new();
        let store = env.open_store("alpha");
        assert!(store.root().unwrap().join("profile.json").exists());
        assert_eq!(store.backend_type(), "file");

        let profiles = list_profiles(env.data_path()).unwrap();
        assert_eq!(profiles.len(), 1);
        assert_eq!(profiles[0].name, "alpha");
    }

    #[test]
    fn test_open_rejects_empty_profile() {
        let env = TestEnv::new();
        assert!(ProfileStore::open_with_data_dir(" ", env.data_path()).is_err());
    }

    #[test]
    fn test_save_and_load() {
        let env = TestEnv::new();
        let mut store = env.open_store("alpha");
        let fighters = vec![Fighter::new("ftr-0001", "Ash")];
        store.save(keys::FIGHTERS, &fighters).unwrap();

        let reopened = env.open_store("alpha");
        let loaded: Vec<Fighter> =
            reopened.load_or_default(keys::FIGHTERS, Vec::new(), Some(validators::is_array_of_records));
        assert_eq!(loaded, fighters);
    }

    #[test]
    fn test_malformed_json_falls_back() {
        let mut store = ProfileStore::in_memory("p");
        store.backend.set(keys::FIGHTERS, "{not json").unwrap();
        let loaded: Vec<Fighter> = store.load_or_default(keys::FIGHTERS, Vec::new(), None);
        assert!(loaded.is_empty());
        assert!(store.get_value(keys::FIGHTERS).is_err());
    }

    #[test]
    fn test_validator_rejection_falls_back() {
        let mut store = ProfileStore::in_memory("p");
        store.save(keys::FIGHTERS, &serde_json::json!([{"name": "no id"}])).unwrap();
        let fallback = vec![Fighter::new("ftr-dflt", "Default")];
        let loaded = store.load_or_default(
            keys::FIGHTERS,
            fallback.clone(),
            Some(validators::is_array_of_records),
        );
        assert_eq!(loaded, fallback);
    }

    #[test]
    fn test_wrong_type_falls_back() {
        let mut store = ProfileStore::in_memory("p");
        store.save(keys::FIGHTERS, &serde_json::json!([{"id": 5}])).unwrap();
        let loaded: Vec<Fighter> = store.load_or_default(keys::FIGHTERS, Vec::new(), None);
        assert!(loaded.is_empty());
    }

    #[test]
    fn test_ledger_loads_leniently() {
        let mut store = ProfileStore::in_memory("p");
        store
            .save(
                keys::XP_LEDGER,
                &serde_json::json!({"ftr-a": {"sk-1": -40, "sk-2": 12.6, "sk-3": "lots", "sk-4": 90}}),
            )
            .unwrap();
        let ledger = store.load_xp_ledger();
        assert_eq!(ledger["ftr-a"]["sk-1"], 0);
        assert_eq!(ledger["ftr-a"]["sk-2"], 13);
        assert_eq!(ledger["ftr-a"]["sk-3"], 0);
        assert_eq!(ledger["ftr-a"]["sk-4"], 90);
    }

    #[test]
    fn test_levels_are_clamped_on_load() {
        let mut store = ProfileStore::in_memory("p");
        store
            .save(keys::SKILL_LEVELS, &serde_json::json!({"ftr-a": {"sk-1": 14, "sk-2": -3, "sk-3": 4}}))
            .unwrap();
        let levels = store.load_skill_levels();
        assert_eq!(levels["ftr-a"]["sk-1"], 10);
        assert_eq!(levels["ftr-a"]["sk-2"], 0);
        assert_eq!(levels["ftr-a"]["sk-3"], 4);
    }

    #[test]
    fn test_nested_maps_with_bad_shape_are_empty() {
        let mut store = ProfileStore::in_memory("p");
        store.save(keys::FIGHTER_SKILLS, &serde_json::json!(["ftr-a"])).unwrap();
        assert!(store.load_assignments().is_empty());
    }

    #[test]
    fn test_undo_history_is_bounded() {
        let mut store = ProfileStore::in_memory("p");
        for i in 0..(UNDO_HISTORY_LIMIT + 5) {
            let deletion = FighterDeletion {
                fighter: Fighter::new(format!("ftr-{}", i), format!("F{}", i)),
                index: 0,
                roster: Default::default(),
            };
            store.record_action(ActionRecord::fighter_deleted(&deletion, Utc::now()).unwrap());
        }

        let history = store.undo_history();
        assert_eq!(history.len(), UNDO_HISTORY_LIMIT);
        assert_eq!(history[0].description, "Delete fighter \"F5\"");

        let newest = store.pop_action().unwrap().unwrap();
        assert_eq!(newest.action_type, ActionType::DeleteFighter);
        assert_eq!(store.undo_history().len(), UNDO_HISTORY_LIMIT - 1);
    }

    #[test]
    #[serial]
    fn test_data_dir_env_override() {
        let env = TestEnv::new();
        // SAFETY: serialized with every other test touching this variable.
        unsafe { std::env::set_var(DATA_DIR_ENV, env.data_path()) };
        assert_eq!(get_data_dir().unwrap(), env.data_path());

        let store = ProfileStore::open("env-profile").unwrap();
        assert!(store.root().unwrap().starts_with(env.data_path()));

        unsafe { std::env::remove_var(DATA_DIR_ENV) };
    }
}
