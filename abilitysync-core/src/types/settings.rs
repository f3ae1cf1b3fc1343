//! AbilitySync project settings
//!
//! Defines the `abilitysync.json` settings file.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use super::asset::AssetKind;
use crate::path_utils::normalize_base_path;

/// Settings file name looked up from the working directory upwards
pub const SETTINGS_FILE: &str = "abilitysync.json";

pub const DEFAULT_EFFECT_PATH: &str = "/Game/GameplayEffects";
pub const DEFAULT_ABILITY_PATH: &str = "/Game/Abilities/Abilities";
pub const DEFAULT_EFFECT_CLASS: &str = "/Script/GameplayAbilities.GameplayEffect";
pub const DEFAULT_ABILITY_CLASS: &str = "/Script/GameplayAbilities.GameplayAbility";

/// Errors that can occur when loading or saving settings
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Failed to read settings: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse settings: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Settings file not found at {0}")]
    NotFound(String),
}

/// The project settings file (abilitysync.json)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProjectSettings {
    /// Package directory generated effects are written to
    #[serde(default = "default_effect_path")]
    pub effect_path: String,

    /// Package directory generated abilities are written to
    #[serde(default = "default_ability_path")]
    pub ability_path: String,

    /// Class used for new effects without a parent
    #[serde(default = "default_effect_class")]
    pub effect_class: String,

    /// Class used for new abilities without a parent
    #[serde(default = "default_ability_class")]
    pub ability_class: String,

    /// Effect config table (JSON array of rows)
    #[serde(default = "default_effect_table")]
    pub effect_table: PathBuf,

    /// Ability config table (JSON array of rows)
    #[serde(default = "default_ability_table")]
    pub ability_table: PathBuf,

    /// Effect snapshot exported from the spreadsheet
    #[serde(default = "default_json_path")]
    pub json_path: PathBuf,

    /// Ability snapshot exported from the spreadsheet
    #[serde(default = "default_ability_json_path")]
    pub ability_json_path: PathBuf,

    /// Output directory for schema documents
    #[serde(default = "default_schema_path")]
    pub schema_path: PathBuf,

    /// Directory mounted as `/Game/`
    #[serde(default = "default_content_root")]
    pub content_root: PathBuf,

    /// Optional class registry extending the built-in classes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_registry: Option<PathBuf>,

    /// Struct paths exported by the `schema` command
    #[serde(default = "default_struct_types")]
    pub struct_types_to_export: Vec<String>,
}

fn default_effect_path() -> String {
    DEFAULT_EFFECT_PATH.to_string()
}

fn default_ability_path() -> String {
    DEFAULT_ABILITY_PATH.to_string()
}

fn default_effect_class() -> String {
    DEFAULT_EFFECT_CLASS.to_string()
}

fn default_ability_class() -> String {
    DEFAULT_ABILITY_CLASS.to_string()
}

fn default_effect_table() -> PathBuf {
    PathBuf::from("Data/EffectConfigs.json")
}

fn default_ability_table() -> PathBuf {
    PathBuf::from("Data/AbilityConfigs.json")
}

fn default_json_path() -> PathBuf {
    PathBuf::from("Data/EffectSnapshot.json")
}

fn default_ability_json_path() -> PathBuf {
    PathBuf::from("Data/AbilitySnapshot.json")
}

fn default_schema_path() -> PathBuf {
    PathBuf::from("Schema")
}

fn default_content_root() -> PathBuf {
    PathBuf::from("Content")
}

fn default_struct_types() -> Vec<String> {
    vec![
        "/Script/AbilitySync.GameplayEffectConfig".to_string(),
        "/Script/AbilitySync.GameplayAbilityConfig".to_string(),
    ]
}

impl Default for ProjectSettings {
    fn default() -> Self {
        Self {
            effect_path: default_effect_path(),
            ability_path: default_ability_path(),
            effect_class: default_effect_class(),
            ability_class: default_ability_class(),
            effect_table: default_effect_table(),
            ability_table: default_ability_table(),
            json_path: default_json_path(),
            ability_json_path: default_ability_json_path(),
            schema_path: default_schema_path(),
            content_root: default_content_root(),
            class_registry: None,
            struct_types_to_export: default_struct_types(),
        }
    }
}

impl ProjectSettings {
    /// Parse a settings file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(SettingsError::NotFound(path.display().to_string()));
        }
        let content = fs::read_to_string(path)?;
        let settings: ProjectSettings = serde_json::from_str(&content)?;
        Ok(settings)
    }

    /// Write settings as pretty JSON
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), SettingsError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Normalized effect base directory
    pub fn effect_base_path(&self) -> String {
        normalize_base_path(&self.effect_path, DEFAULT_EFFECT_PATH)
    }

    /// Normalized ability base directory
    pub fn ability_base_path(&self) -> String {
        normalize_base_path(&self.ability_path, DEFAULT_ABILITY_PATH)
    }

    /// Snapshot file imported for rows of `kind`
    pub fn snapshot_path(&self, kind: AssetKind) -> &Path {
        match kind {
            AssetKind::Effect => &self.json_path,
            AssetKind::Ability => &self.ability_json_path,
        }
    }
}

/// Find abilitysync.json in `start_dir` or any of its parents
pub fn find_settings_file<P: AsRef<Path>>(start_dir: P) -> Option<PathBuf> {
    start_dir
        .as_ref()
        .ancestors()
        .map(|dir| dir.join(SETTINGS_FILE))
        .find(|candidate| candidate.exists())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = ProjectSettings::default();
        assert_eq!(settings.effect_path, "/Game/GameplayEffects");
        assert_eq!(settings.ability_path, "/Game/Abilities/Abilities");
        assert_eq!(settings.struct_types_to_export.len(), 2);
        assert!(settings.class_registry.is_none());
    }

    #[test]
    fn test_partial_settings_fill_defaults() {
        let settings: ProjectSettings =
            serde_json::from_str(r#"{"effectPath": "Effects/", "contentRoot": "MyContent"}"#).unwrap();
        assert_eq!(settings.effect_base_path(), "/Game/Effects");
        assert_eq!(settings.content_root, PathBuf::from("MyContent"));
        assert_eq!(settings.ability_class, DEFAULT_ABILITY_CLASS);
    }

    #[test]
    fn test_empty_path_falls_back() {
        let settings = ProjectSettings {
            ability_path: String::new(),
            ..Default::default()
        };
        assert_eq!(settings.ability_base_path(), DEFAULT_ABILITY_PATH);
    }

    #[test]
    fn test_snapshot_path_per_kind() {
        let settings = ProjectSettings::default();
        assert_eq!(settings.snapshot_path(AssetKind::Effect), Path::new("Data/EffectSnapshot.json"));
        assert_eq!(settings.snapshot_path(AssetKind::Ability), Path::new("Data/AbilitySnapshot.json"));

        let settings: ProjectSettings =
            serde_json::from_str(r#"{"jsonPath": "fx.json", "abilityJsonPath": "ga.json"}"#).unwrap();
        assert_eq!(settings.snapshot_path(AssetKind::Effect), Path::new("fx.json"));
        assert_eq!(settings.snapshot_path(AssetKind::Ability), Path::new("ga.json"));
    }

    #[test]
    fn test_find_settings_walks_up() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a/b/c");
        fs::create_dir_all(&nested).unwrap();
        assert!(find_settings_file(&nested).is_none());

        ProjectSettings::default().save(dir.path().join(SETTINGS_FILE)).unwrap();
        let found = find_settings_file(&nested).unwrap();
        assert_eq!(found, dir.path().join(SETTINGS_FILE));

        let loaded = ProjectSettings::from_file(&found).unwrap();
        assert_eq!(loaded, ProjectSettings::default());
    }

    #[test]
    fn test_missing_file() {
        let err = ProjectSettings::from_file("/nonexistent/abilitysync.json").unwrap_err();
        assert!(matches!(err, SettingsError::NotFound(_)));
    }
}
