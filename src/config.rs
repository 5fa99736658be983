//! Preference store and the resolved settings snapshot.
//!
//! Preferences live in a flat JSON object of key/value pairs. Reads are
//! typed and fall back per key to a registered default, so one malformed
//! entry never takes the others down with it.

use crate::core::bypass::parse_bundle_id_list;
use crate::core::engine::{EngineOptions, InputMethod, OutputEncoding};
use crate::core::keys::Modifiers;
use crate::core::shortcut::Shortcut;
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Directory name used under the platform config and data dirs.
pub const APP_DIR_NAME: &str = "vitype-agent";

/// Bundle identifier the agent treats as itself when the process has none.
pub const SELF_BUNDLE_ID: &str = "com.vitype.agent";

/// Preference keys.
pub mod keys {
    pub const ENABLED: &str = "viTypeEnabled";
    pub const APP_EXCLUSION_ENABLED: &str = "enableAppExclusion";
    pub const EXCLUDED_BUNDLE_IDS: &str = "excludedBundleIDs";
    pub const SHORTCUT_KEY: &str = "shortcutKey";
    pub const SHORTCUT_COMMAND: &str = "shortcutCommand";
    pub const SHORTCUT_OPTION: &str = "shortcutOption";
    pub const SHORTCUT_CONTROL: &str = "shortcutControl";
    pub const SHORTCUT_SHIFT: &str = "shortcutShift";
    pub const AUTO_FIX_TONE: &str = "autoFixTone";
    pub const INPUT_METHOD: &str = "inputMethod";
    pub const OUTPUT_ENCODING: &str = "outputEncoding";
    pub const GHOST_SUGGESTION_GUARD: &str = "useAXGhostSuggestion";
    pub const GHOST_SUGGESTION_TIMEOUT_MS: &str = "ghostSuggestionTimeoutMs";
    pub const PLAY_SOUND_ON_TOGGLE: &str = "playSoundOnToggle";

    /// Every key with a registered default.
    pub const ALL: [&str; 14] = [
        ENABLED,
        APP_EXCLUSION_ENABLED,
        EXCLUDED_BUNDLE_IDS,
        SHORTCUT_KEY,
        SHORTCUT_COMMAND,
        SHORTCUT_OPTION,
        SHORTCUT_CONTROL,
        SHORTCUT_SHIFT,
        AUTO_FIX_TONE,
        INPUT_METHOD,
        OUTPUT_ENCODING,
        GHOST_SUGGESTION_GUARD,
        GHOST_SUGGESTION_TIMEOUT_MS,
        PLAY_SOUND_ON_TOGGLE,
    ];
}

const DEFAULT_GHOST_TIMEOUT_MS: i64 = 100;
const MAX_GHOST_TIMEOUT_MS: i64 = 1000;

/// Registered default for a key, if it has one.
pub fn registered_default(key: &str) -> Option<Value> {
    let value = match key {
        keys::ENABLED => Value::Bool(true),
        keys::APP_EXCLUSION_ENABLED => Value::Bool(true),
        keys::EXCLUDED_BUNDLE_IDS => Value::String(String::new()),
        keys::SHORTCUT_KEY => Value::String("space".into()),
        keys::SHORTCUT_COMMAND => Value::Bool(false),
        keys::SHORTCUT_OPTION => Value::Bool(false),
        keys::SHORTCUT_CONTROL => Value::Bool(true),
        keys::SHORTCUT_SHIFT => Value::Bool(false),
        keys::AUTO_FIX_TONE => Value::Bool(true),
        keys::INPUT_METHOD => Value::from(0),
        keys::OUTPUT_ENCODING => Value::from(0),
        keys::GHOST_SUGGESTION_GUARD => Value::Bool(true),
        keys::GHOST_SUGGESTION_TIMEOUT_MS => Value::from(DEFAULT_GHOST_TIMEOUT_MS),
        keys::PLAY_SOUND_ON_TOGGLE => Value::Bool(true),
        _ => return None,
    };
    Some(value)
}

/// Flat key/value preference store persisted as JSON.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PreferenceStore {
    values: Map<String, Value>,
}

impl PreferenceStore {
    /// Empty in-memory store; every read returns the registered default.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from the default location.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::config_path())
    }

    /// Load from `path`. A missing file is an empty store.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::new());
        }
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::IoError(e.to_string()))?;
        Self::from_json(&content)
    }

    /// Parse a JSON object. Anything other than an object is rejected.
    pub fn from_json(content: &str) -> Result<Self, ConfigError> {
        match serde_json::from_str::<Value>(content) {
            Ok(Value::Object(values)) => Ok(Self { values }),
            Ok(other) => Err(ConfigError::ParseError(format!(
                "expected a JSON object, found {}",
                json_type_name(&other)
            ))),
            Err(e) => Err(ConfigError::ParseError(e.to_string())),
        }
    }

    /// Save to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::IoError(e.to_string()))?;
        }
        std::fs::write(path, self.to_json_pretty()?)
            .map_err(|e| ConfigError::IoError(e.to_string()))
    }

    pub fn to_json_pretty(&self) -> Result<String, ConfigError> {
        serde_json::to_string_pretty(&self.values)
            .map_err(|e| ConfigError::SerializeError(e.to_string()))
    }

    /// Get the path to the preferences file.
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR_NAME)
            .join("preferences.json")
    }

    /// Raw stored value, without defaults.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn set(&mut self, key: &str, value: impl Into<Value>) {
        self.values.insert(key.to_string(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.values.remove(key)
    }

    pub fn values(&self) -> &Map<String, Value> {
        &self.values
    }

    /// Stored booleans; numbers count as true when non-zero.
    pub fn bool(&self, key: &str) -> bool {
        let read = |value: &Value| match value {
            Value::Bool(b) => Some(*b),
            Value::Number(n) => n.as_f64().map(|f| f != 0.0),
            _ => None,
        };
        self.typed(key, read).unwrap_or(false)
    }

    /// Stored integers; floats truncate and booleans map to 0/1.
    pub fn integer(&self, key: &str) -> i64 {
        let read = |value: &Value| match value {
            Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
            Value::Bool(b) => Some(i64::from(*b)),
            _ => None,
        };
        self.typed(key, read).unwrap_or(0)
    }

    pub fn string(&self, key: &str) -> String {
        let read = |value: &Value| value.as_str().map(str::to_owned);
        self.typed(key, read).unwrap_or_default()
    }

    /// Read with `read`, falling back to the registered default when the
    /// key is absent or holds the wrong type.
    fn typed<T>(&self, key: &str, read: impl Fn(&Value) -> Option<T>) -> Option<T> {
        if let Some(value) = self.values.get(key).and_then(&read) {
            return Some(value);
        }
        if self.values.contains_key(key) {
            tracing::debug!(key, "Stored preference has the wrong type, using default");
        }
        registered_default(key).as_ref().and_then(read)
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Parse a CLI value: JSON when it parses, a plain string otherwise.
pub fn parse_preference_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

/// Resolved, denormalized view of the preferences used per keystroke.
///
/// Always rebuilt from scratch and swapped in whole.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub enabled: bool,
    pub app_exclusion_enabled: bool,
    pub excluded_apps: BTreeSet<String>,
    pub shortcut: Shortcut,
    pub engine: EngineOptions,
    pub ghost_guard_enabled: bool,
    pub ghost_guard_timeout: Duration,
    pub play_sound_on_toggle: bool,
}

impl Settings {
    pub fn from_store(store: &PreferenceStore) -> Self {
        let mut modifiers = Modifiers::empty();
        if store.bool(keys::SHORTCUT_COMMAND) {
            modifiers.insert(Modifiers::COMMAND);
        }
        if store.bool(keys::SHORTCUT_OPTION) {
            modifiers.insert(Modifiers::OPTION);
        }
        if store.bool(keys::SHORTCUT_CONTROL) {
            modifiers.insert(Modifiers::CONTROL);
        }
        if store.bool(keys::SHORTCUT_SHIFT) {
            modifiers.insert(Modifiers::SHIFT);
        }

        let timeout_ms = match store.integer(keys::GHOST_SUGGESTION_TIMEOUT_MS) {
            ms @ 1..=MAX_GHOST_TIMEOUT_MS => ms,
            _ => DEFAULT_GHOST_TIMEOUT_MS,
        };

        Self {
            enabled: store.bool(keys::ENABLED),
            app_exclusion_enabled: store.bool(keys::APP_EXCLUSION_ENABLED),
            excluded_apps: parse_bundle_id_list(&store.string(keys::EXCLUDED_BUNDLE_IDS)),
            shortcut: Shortcut::new(&store.string(keys::SHORTCUT_KEY), modifiers),
            engine: EngineOptions {
                auto_fix_tone: store.bool(keys::AUTO_FIX_TONE),
                input_method: InputMethod::from_raw(store.integer(keys::INPUT_METHOD)),
                output_encoding: OutputEncoding::from_raw(store.integer(keys::OUTPUT_ENCODING)),
            },
            ghost_guard_enabled: store.bool(keys::GHOST_SUGGESTION_GUARD),
            ghost_guard_timeout: Duration::from_millis(timeout_ms as u64),
            play_sound_on_toggle: store.bool(keys::PLAY_SOUND_ON_TOGGLE),
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self::from_store(&PreferenceStore::new())
    }
}

/// Get the directory for stats and other runtime data.
pub fn data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR_NAME)
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),
    #[error("Parse error: {0}")]
    ParseError(String),
    #[error("Serialize error: {0}")]
    SerializeError(String),
}
