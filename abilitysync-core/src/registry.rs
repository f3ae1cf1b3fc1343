//! Known classes
//!
//! The registry answers "is there a class at this path, and what kind is
//! it?" for parent classes, granted abilities, cost/cooldown effects,
//! calculation classes and attribute sets. Projects extend the built-in
//! engine classes with a JSON file listing their own.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::path_utils::resolve;
use crate::types::{AssetKind, AttributeRef, DEFAULT_ABILITY_CLASS, DEFAULT_EFFECT_CLASS};

/// Errors that can occur when loading a registry file
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("Failed to read class registry: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse class registry: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Invalid class path: {0:?}")]
    InvalidPath(String),
}

/// What a class can be used for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ClassKind {
    EffectClass,
    AbilityClass,
    MagnitudeCalculation,
    ExecutionCalculation,
    AttributeSet,
}

impl From<AssetKind> for ClassKind {
    fn from(kind: AssetKind) -> Self {
        match kind {
            AssetKind::Effect => ClassKind::EffectClass,
            AssetKind::Ability => ClassKind::AbilityClass,
        }
    }
}

/// One registered class
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassInfo {
    /// Object path, e.g. `/Script/GameplayAbilities.GameplayEffect`
    pub path: String,
    pub kind: ClassKind,
    /// Attribute names, for attribute sets
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attributes: Vec<String>,
    #[serde(default, rename = "abstract")]
    pub is_abstract: bool,
}

impl ClassInfo {
    pub fn new(path: &str, kind: ClassKind) -> Self {
        Self {
            path: path.to_string(),
            kind,
            attributes: Vec::new(),
            is_abstract: false,
        }
    }

    pub fn with_attributes(mut self, attributes: &[&str]) -> Self {
        self.attributes = attributes.iter().map(|a| a.to_string()).collect();
        self
    }

    pub fn abstract_class(mut self) -> Self {
        self.is_abstract = true;
        self
    }

    /// Short class name (`GameplayEffect`)
    pub fn name(&self) -> &str {
        self.path.rsplit(['.', '/']).next().unwrap_or(&self.path)
    }
}

/// Class lookup table keyed by object path
#[derive(Debug, Clone, Default)]
pub struct ClassRegistry {
    classes: BTreeMap<String, ClassInfo>,
}

impl ClassRegistry {
    /// An empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Engine base classes and the test attribute set
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register(ClassInfo::new(DEFAULT_EFFECT_CLASS, ClassKind::EffectClass));
        registry.register(ClassInfo::new(DEFAULT_ABILITY_CLASS, ClassKind::AbilityClass));
        registry.register(
            ClassInfo::new("/Script/GameplayAbilities.GameplayModMagnitudeCalculation", ClassKind::MagnitudeCalculation)
                .abstract_class(),
        );
        registry.register(
            ClassInfo::new("/Script/GameplayAbilities.GameplayEffectExecutionCalculation", ClassKind::ExecutionCalculation)
                .abstract_class(),
        );
        registry.register(
            ClassInfo::new("/Script/GameplayAbilities.AttributeSet", ClassKind::AttributeSet).abstract_class(),
        );
        registry.register(
            ClassInfo::new("/Script/AbilitySync.TestAttributeSet", ClassKind::AttributeSet)
                .with_attributes(&["TestPropertyOne", "TestPropertyTwo"]),
        );
        registry
    }

    /// Built-in classes plus the entries of a registry file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, RegistryError> {
        let mut registry = Self::builtin();
        registry.load_file(path)?;
        Ok(registry)
    }

    /// Add every entry of a registry file (JSON array of classes)
    pub fn load_file<P: AsRef<Path>>(&mut self, path: P) -> Result<usize, RegistryError> {
        let content = fs::read_to_string(path)?;
        let entries: Vec<ClassInfo> = serde_json::from_str(&content)?;
        let count = entries.len();
        for entry in entries {
            let canonical = resolve(&entry.path)
                .map_err(|_| RegistryError::InvalidPath(entry.path.clone()))?
                .object_path;
            self.register(ClassInfo {
                path: canonical,
                ..entry
            });
        }
        Ok(count)
    }

    /// Register or replace a class
    pub fn register(&mut self, info: ClassInfo) {
        self.classes.insert(info.path.clone(), info);
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ClassInfo> {
        self.classes.values()
    }

    /// Look up a class of `kind` by any path form.
    ///
    /// Tries the object path as given, then the generated-class form
    /// (`/Game/X/GA_Y.GA_Y_C`) for asset package paths.
    pub fn find_class(&self, path: &str, kind: ClassKind) -> Option<&ClassInfo> {
        let resolved = resolve(path).ok()?;
        let generated = format!("{}.{}_C", resolved.package, resolved.asset_name);

        [resolved.object_path, generated]
            .iter()
            .filter_map(|candidate| self.classes.get(candidate))
            .find(|info| info.kind == kind)
    }

    /// Parse an attribute reference.
    ///
    /// Accepts `OwnerType.Field` and `/Script/Module.OwnerType:Field`. The
    /// owner is matched case-insensitively against non-abstract attribute
    /// sets, with or without a leading `U`.
    pub fn parse_attribute(&self, text: &str) -> Option<AttributeRef> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }

        let (owner, field) = if let Some((left, field)) = text.split_once(':') {
            let owner = left.rsplit('.').next().unwrap_or(left);
            (owner, field)
        } else {
            text.split_once('.')?
        };

        let owner = owner.trim();
        let field = field.trim();
        if owner.is_empty() || field.is_empty() {
            return None;
        }
        let prefixed = if owner.starts_with('U') {
            owner.to_string()
        } else {
            format!("U{}", owner)
        };

        let set = self.classes.values().find(|info| {
            info.kind == ClassKind::AttributeSet
                && !info.is_abstract
                && (info.name().eq_ignore_ascii_case(owner) || info.name().eq_ignore_ascii_case(&prefixed))
        })?;

        let name = set
            .attributes
            .iter()
            .find(|attribute| attribute.eq_ignore_ascii_case(field))?;

        Some(AttributeRef {
            owner: set.path.clone(),
            name: name.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_classes() {
        let registry = ClassRegistry::builtin();
        assert!(registry.find_class("/Script/GameplayAbilities.GameplayEffect", ClassKind::EffectClass).is_some());
        assert!(registry.find_class("/Script/GameplayAbilities.GameplayEffect", ClassKind::AbilityClass).is_none());
        assert!(registry.find_class("", ClassKind::EffectClass).is_none());
    }

    #[test]
    fn test_parse_attribute_short_form() {
        let registry = ClassRegistry::builtin();
        let attribute = registry.parse_attribute("TestAttributeSet.TestPropertyOne").unwrap();
        assert_eq!(attribute.owner, "/Script/AbilitySync.TestAttributeSet");
        assert_eq!(attribute.name, "TestPropertyOne");

        // Case-insensitive owner and field
        let attribute = registry.parse_attribute("testattributeset.testpropertytwo").unwrap();
        assert_eq!(attribute.name, "TestPropertyTwo");
    }

    #[test]
    fn test_parse_attribute_full_form() {
        let registry = ClassRegistry::builtin();
        let attribute = registry
            .parse_attribute("/Script/AbilitySync.TestAttributeSet:TestPropertyTwo")
            .unwrap();
        assert_eq!(attribute.name, "TestPropertyTwo");
    }

    #[test]
    fn test_parse_attribute_u_prefix() {
        let mut registry = ClassRegistry::new();
        registry.register(
            ClassInfo::new("/Script/Game.UHealthSet", ClassKind::AttributeSet).with_attributes(&["Health"]),
        );
        assert!(registry.parse_attribute("HealthSet.Health").is_some());
        assert!(registry.parse_attribute("UHealthSet.Health").is_some());
    }

    #[test]
    fn test_parse_attribute_failures() {
        let registry = ClassRegistry::builtin();
        assert!(registry.parse_attribute("Nonexistent.Field").is_none());
        assert!(registry.parse_attribute("TestAttributeSet.Missing").is_none());
        assert!(registry.parse_attribute("NoSeparator").is_none());
        assert!(registry.parse_attribute("").is_none());
        // Abstract sets never match
        assert!(registry.parse_attribute("AttributeSet.Anything").is_none());
    }

    #[test]
    fn test_load_registry_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("classes.json");
        fs::write(
            &file,
            r#"[
                {"path": "/Game/Abilities/GA_Base.GA_Base_C", "kind": "abilityClass"},
                {"path": "/Script/Game.DamageExecution", "kind": "executionCalculation"},
                {"path": "/Script/Game.CombatSet", "kind": "attributeSet", "attributes": ["Armor"]}
            ]"#,
        )
        .unwrap();

        let registry = ClassRegistry::from_file(&file).unwrap();
        assert!(registry.find_class("/Game/Abilities/GA_Base", ClassKind::AbilityClass).is_some());
        assert!(registry.find_class("Abilities/GA_Base.GA_Base_C", ClassKind::AbilityClass).is_some());
        assert!(registry
            .find_class("/Script/Game.DamageExecution", ClassKind::ExecutionCalculation)
            .is_some());
        assert!(registry.parse_attribute("CombatSet.Armor").is_some());
        assert!(registry.parse_attribute("TestAttributeSet.TestPropertyOne").is_some());
    }

    #[test]
    fn test_load_invalid_registry_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("classes.json");
        fs::write(&file, r#"{"not": "an array"}"#).unwrap();
        assert!(matches!(ClassRegistry::from_file(&file), Err(RegistryError::JsonError(_))));
    }
}
