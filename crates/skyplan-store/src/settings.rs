// --- Editor settings (~/.skyplan/settings.json) ---

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use skyplan_core::{ConnectionRules, Error, Result, RuleOverrides};
use tracing::warn;

pub const DEFAULT_ARCHITECTURE_NAME: &str = "Untitled Architecture";
const LOCAL_OWNER: &str = "local";

/// Resolve the global config directory (~/.skyplan/).
pub fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".skyplan")
}

pub fn settings_path() -> PathBuf {
    config_dir().join("settings.json")
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct EditorSettings {
    /// Empty means the single local user.
    pub owner_id: String,
    pub store_dir: Option<PathBuf>,
    pub default_architecture_name: String,
    pub connection_rules: RuleOverrides,
}

impl Default for EditorSettings {
    fn default() -> Self {
        Self {
            owner_id: String::new(),
            store_dir: None,
            default_architecture_name: DEFAULT_ARCHITECTURE_NAME.to_string(),
            connection_rules: RuleOverrides::default(),
        }
    }
}

impl EditorSettings {
    pub fn owner(&self) -> &str {
        if self.owner_id.trim().is_empty() {
            LOCAL_OWNER
        } else {
            &self.owner_id
        }
    }

    pub fn store_dir(&self) -> PathBuf {
        self.store_dir
            .clone()
            .unwrap_or_else(|| config_dir().join("architectures"))
    }

    /// Default rule table with the configured overrides applied.
    pub fn connection_rules(&self) -> ConnectionRules {
        let mut rules = ConnectionRules::default();
        rules.apply_overrides(&self.connection_rules);
        rules
    }
}

pub fn read_settings() -> EditorSettings {
    read_settings_from(&settings_path())
}

/// Missing or unreadable settings fall back to defaults.
pub fn read_settings_from(path: &Path) -> EditorSettings {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(_) => return EditorSettings::default(),
    };
    serde_json::from_str(&raw).unwrap_or_else(|e| {
        warn!("ignoring corrupt settings at {}: {}", path.display(), e);
        EditorSettings::default()
    })
}

pub fn write_settings(settings: &EditorSettings) -> Result<()> {
    write_settings_to(&settings_path(), settings)
}

pub fn write_settings_to(path: &Path, settings: &EditorSettings) -> Result<()> {
    let failure =
        |e: std::io::Error| Error::PersistenceFailure(format!("{}: {}", path.display(), e));
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).map_err(failure)?;
    }
    let json = serde_json::to_string_pretty(settings)
        .map_err(|e| Error::PersistenceFailure(format!("cannot serialize settings: {}", e)))?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, json).map_err(failure)?;
    fs::rename(&tmp, path).map_err(failure)
}
