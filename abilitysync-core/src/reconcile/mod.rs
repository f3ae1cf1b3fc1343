//! Config reconciliation
//!
//! Brings one generated asset into agreement with one config row:
//! load or create the target, rebuild it when its structural class no
//! longer matches the configured parent, apply every modelled field, run
//! the extension hooks and decide from before/after fingerprints whether
//! the asset is dirty.
//!
//! Field-level problems (an attribute or class that does not resolve) are
//! never fatal. They are logged, skipped, and returned as warnings.

mod ability;
mod effect;

use std::fmt;

use crate::fingerprint::fingerprint;
use crate::hooks::{ExtensionHooks, HookList};
use crate::path_utils::{resolve, AssetPath, PathError};
use crate::registry::{ClassInfo, ClassKind, ClassRegistry};
use crate::store::{AssetStore, StoreError};
use crate::types::{
    AbilityAsset, AbilityConfig, Asset, AssetKind, AttributeRef, ConfigRow, EffectAsset, EffectConfig,
    ProjectSettings, TargetAsset,
};

/// Errors that abort a single reconciliation
#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    #[error(transparent)]
    InvalidPath(#[from] PathError),

    #[error("Cannot create an asset in package {0}")]
    InvalidContainer(String),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Whether the reconciler may author content
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Mode {
    /// Create, rebuild and update assets
    #[default]
    Author,
    /// Only return what already exists
    LoadOnly,
}

/// A reference that could not be resolved; the field or entry was skipped
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnresolvedReference {
    /// Row the reference came from
    pub record: String,
    pub field: String,
    pub reference: String,
}

impl fmt::Display for UnresolvedReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}: unresolved reference {:?}",
            self.record, self.field, self.reference
        )
    }
}

/// Outcome of one reconciliation
#[derive(Debug, Clone)]
pub struct Reconciled {
    pub path: AssetPath,
    /// The asset after reconciliation; `None` only in load-only mode
    pub asset: Option<Asset>,
    pub created: bool,
    /// An existing asset was deleted because its class did not match
    pub rebuilt: bool,
    pub changed: bool,
    pub warnings: Vec<UnresolvedReference>,
}

/// Resolved `ParentClass` of a row
enum Parent<T> {
    /// Existing asset to clone
    Template(T),
    /// Registered class to instantiate
    Class(String),
}

impl<T: TargetAsset> Parent<T> {
    fn class(&self) -> &str {
        match self {
            Parent::Template(template) => template.class(),
            Parent::Class(class) => class.as_str(),
        }
    }
}

/// Reference resolution shared by the field appliers
pub(crate) struct FieldContext<'a> {
    registry: &'a ClassRegistry,
    store: &'a dyn AssetStore,
    record: String,
    warnings: Vec<UnresolvedReference>,
}

impl<'a> FieldContext<'a> {
    fn new(registry: &'a ClassRegistry, store: &'a dyn AssetStore, record: &str) -> Self {
        Self {
            registry,
            store,
            record: record.to_string(),
            warnings: Vec::new(),
        }
    }

    fn unresolved(&mut self, field: &str, reference: &str) {
        let warning = UnresolvedReference {
            record: self.record.clone(),
            field: field.to_string(),
            reference: reference.to_string(),
        };
        tracing::warn!("{}", warning);
        self.warnings.push(warning);
    }

    /// Resolve an attribute string, warning when it does not resolve
    fn attribute(&mut self, field: &str, text: &str) -> Option<AttributeRef> {
        let attribute = self.registry.parse_attribute(text);
        if attribute.is_none() {
            self.unresolved(field, text);
        }
        attribute
    }

    /// A concrete registered class of `kind`
    fn concrete_class(&self, path: &str, kind: ClassKind) -> Option<&'a ClassInfo> {
        self.registry
            .find_class(path, kind)
            .filter(|info| !info.is_abstract)
    }

    /// Resolve a class reference that may also name a generated asset of
    /// `asset_kind`. Returns the referenced path.
    fn class_or_asset(&mut self, field: &str, reference: &str, kind: ClassKind, asset_kind: AssetKind) -> Option<String> {
        if let Some(info) = self.concrete_class(reference, kind) {
            return Some(info.path.clone());
        }

        if let Ok(path) = resolve(reference) {
            match self.store.load(&path) {
                Ok(Some(asset)) if asset.kind() == asset_kind => return Some(path.object_path),
                Ok(_) => {}
                Err(e) => tracing::warn!("[{}] {}: failed to load {}: {}", self.record, field, path, e),
            }
        }

        self.unresolved(field, reference);
        None
    }

    /// Resolve a class reference against the registry only
    fn class(&mut self, field: &str, reference: &str, kind: ClassKind) -> Option<String> {
        match self.concrete_class(reference, kind) {
            Some(info) => Some(info.path.clone()),
            None => {
                self.unresolved(field, reference);
                None
            }
        }
    }
}

type Applier<C, T> = fn(&mut T, &C, &mut FieldContext<'_>);

/// Reconciles config rows against a store
pub struct Reconciler<'a> {
    registry: &'a ClassRegistry,
    hooks: &'a ExtensionHooks,
    effect_class: String,
    ability_class: String,
    mode: Mode,
}

impl<'a> Reconciler<'a> {
    pub fn new(registry: &'a ClassRegistry, hooks: &'a ExtensionHooks, settings: &ProjectSettings) -> Self {
        Self {
            registry,
            hooks,
            effect_class: settings.effect_class.clone(),
            ability_class: settings.ability_class.clone(),
            mode: Mode::Author,
        }
    }

    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Reconcile an effect row against the asset at `target_path`
    pub fn reconcile_effect(
        &self,
        store: &mut dyn AssetStore,
        target_path: &str,
        config: &EffectConfig,
    ) -> Result<Reconciled, ReconcileError> {
        self.reconcile::<EffectConfig, EffectAsset>(
            store,
            target_path,
            config,
            &self.hooks.effects,
            &self.effect_class,
            effect::apply,
        )
    }

    /// Reconcile an ability row against the asset at `target_path`
    pub fn reconcile_ability(
        &self,
        store: &mut dyn AssetStore,
        target_path: &str,
        config: &AbilityConfig,
    ) -> Result<Reconciled, ReconcileError> {
        self.reconcile::<AbilityConfig, AbilityAsset>(
            store,
            target_path,
            config,
            &self.hooks.abilities,
            &self.ability_class,
            ability::apply,
        )
    }

    /// Look up `ParentClass`: a template asset of the same kind first,
    /// then a registered class.
    fn resolve_parent<T: TargetAsset>(
        &self,
        store: &dyn AssetStore,
        reference: &str,
    ) -> Result<Option<Parent<T>>, ReconcileError> {
        let Ok(path) = resolve(reference) else {
            return Ok(None);
        };

        if let Some(template) = store.load(&path)?.and_then(T::from_asset) {
            return Ok(Some(Parent::Template(template)));
        }

        Ok(self
            .registry
            .find_class(reference, ClassKind::from(T::KIND))
            .map(|info| Parent::Class(info.path.clone())))
    }

    fn reconcile<C: ConfigRow, T: TargetAsset>(
        &self,
        store: &mut dyn AssetStore,
        target_path: &str,
        config: &C,
        hooks: &HookList<C, T>,
        default_class: &str,
        apply: Applier<C, T>,
    ) -> Result<Reconciled, ReconcileError> {
        let path = resolve(target_path)?;
        let record = path.asset_name.clone();

        let loaded = store.load(&path)?;

        if self.mode == Mode::LoadOnly {
            return Ok(Reconciled {
                asset: loaded.filter(|asset| asset.kind() == T::KIND),
                path,
                created: false,
                rebuilt: false,
                changed: false,
                warnings: Vec::new(),
            });
        }

        let mut warnings = Vec::new();
        let mut rebuilt = false;

        let mut existing = match loaded {
            Some(asset) if asset.kind() != T::KIND => {
                tracing::info!(
                    "{} holds an {}, replacing it with an {}",
                    path,
                    asset.kind().label(),
                    T::KIND.label()
                );
                store.delete(&path)?;
                rebuilt = true;
                None
            }
            other => other.and_then(T::from_asset),
        };

        let parent_ref = config.parent_class();
        let parent = if parent_ref.is_empty() {
            None
        } else {
            let parent = self.resolve_parent::<T>(&*store, parent_ref)?;
            if parent.is_none() {
                let warning = UnresolvedReference {
                    record: record.clone(),
                    field: "ParentClass".to_string(),
                    reference: parent_ref.to_string(),
                };
                tracing::warn!("{}", warning);
                warnings.push(warning);
            }
            parent
        };

        let stale_class = match (&existing, &parent) {
            (Some(current), Some(parent)) if current.class() != parent.class() => Some(current.class().to_string()),
            _ => None,
        };
        if let Some(stale_class) = stale_class {
            tracing::info!(
                "Class of {} changed from {} to {}, rebuilding",
                path,
                stale_class,
                parent.as_ref().map(Parent::class).unwrap_or_default()
            );
            store.delete(&path)?;
            existing = None;
            rebuilt = true;
        }

        let (mut asset, created) = match existing {
            Some(asset) => (asset, false),
            None => {
                if !store.can_host(&path.package) {
                    return Err(ReconcileError::InvalidContainer(path.package.clone()));
                }
                let asset = match parent {
                    Some(Parent::Template(mut template)) => {
                        template.rename(&path.asset_name);
                        template
                    }
                    Some(Parent::Class(class)) => T::create(&path.asset_name, &class),
                    None => T::create(&path.asset_name, default_class),
                };
                store.create(&path, asset.clone().into_asset())?;
                tracing::info!("Created {}", path);
                (asset, true)
            }
        };

        let before = if created { None } else { Some(fingerprint(&asset)) };

        let mut ctx = FieldContext::new(self.registry, &*store, &record);
        apply(&mut asset, config, &mut ctx);
        warnings.append(&mut ctx.warnings);

        let failed_hooks = hooks.notify(config, &mut asset);
        if failed_hooks > 0 {
            tracing::warn!("{} hook(s) failed while processing {}", failed_hooks, path);
        }

        let changed = match before {
            None => true,
            Some(before) => before != fingerprint(&asset),
        };

        store.update(&path, asset.into_asset())?;
        if changed {
            store.mark_dirty(&path);
            if !created {
                tracing::info!("Updated {}", path);
            }
        } else {
            tracing::debug!("{} unchanged", path);
        }

        Ok(Reconciled {
            asset: store.load(&path)?,
            path,
            created,
            rebuilt,
            changed,
            warnings,
        })
    }
}

/// Row types the reconciler knows how to apply
pub trait ReconcileRow: ConfigRow {
    fn reconcile_into(
        &self,
        reconciler: &Reconciler<'_>,
        store: &mut dyn AssetStore,
        target_path: &str,
    ) -> Result<Reconciled, ReconcileError>;
}

impl ReconcileRow for EffectConfig {
    fn reconcile_into(
        &self,
        reconciler: &Reconciler<'_>,
        store: &mut dyn AssetStore,
        target_path: &str,
    ) -> Result<Reconciled, ReconcileError> {
        reconciler.reconcile_effect(store, target_path, self)
    }
}

impl ReconcileRow for AbilityConfig {
    fn reconcile_into(
        &self,
        reconciler: &Reconciler<'_>,
        store: &mut dyn AssetStore,
        target_path: &str,
    ) -> Result<Reconciled, ReconcileError> {
        reconciler.reconcile_ability(store, target_path, self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryAssetStore;
    use crate::types::{DurationType, ModifierConfig, ModifierOp, TagsComponent};

    struct Fixture {
        registry: ClassRegistry,
        hooks: ExtensionHooks,
        settings: ProjectSettings,
        store: MemoryAssetStore,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                registry: ClassRegistry::builtin(),
                hooks: ExtensionHooks::new(),
                settings: ProjectSettings::default(),
                store: MemoryAssetStore::new(),
            }
        }

        fn effect(&mut self, path: &str, config: &EffectConfig) -> Reconciled {
            let reconciler = Reconciler::new(&self.registry, &self.hooks, &self.settings);
            reconciler.reconcile_effect(&mut self.store, path, config).unwrap()
        }
    }

    fn burn() -> EffectConfig {
        EffectConfig {
            duration_type: DurationType::HasDuration,
            duration_magnitude: 5.0,
            modifiers: vec![ModifierConfig {
                attribute: "TestAttributeSet.TestPropertyOne".to_string(),
                modifier_op: ModifierOp::Additive,
                magnitude: -2.0,
                ..Default::default()
            }],
            ..Default::default()
        }
    }

    #[test]
    fn test_create_then_noop() {
        let mut fx = Fixture::new();
        let first = fx.effect("GameplayEffects/GE_Burn", &burn());
        assert!(first.created && first.changed);
        assert!(fx.store.is_dirty(&first.path));
        assert_eq!(first.asset.as_ref().unwrap().class(), fx.settings.effect_class);

        fx.store.clear_dirty(&first.path);
        let second = fx.effect("GameplayEffects/GE_Burn", &burn());
        assert!(!second.created && !second.changed && !second.rebuilt);
        assert!(!fx.store.is_dirty(&second.path));
    }

    #[test]
    fn test_field_change_marks_dirty() {
        let mut fx = Fixture::new();
        let first = fx.effect("Fx/GE_Burn", &burn());
        fx.store.clear_dirty(&first.path);

        let mut config = burn();
        config.period = 1.0;
        let second = fx.effect("Fx/GE_Burn", &config);
        assert!(second.changed);
        assert!(fx.store.is_dirty(&second.path));
    }

    #[test]
    fn test_load_only_never_creates() {
        let fx = Fixture::new();
        let mut store = MemoryAssetStore::new();
        let reconciler = Reconciler::new(&fx.registry, &fx.hooks, &fx.settings).with_mode(Mode::LoadOnly);
        let result = reconciler.reconcile_effect(&mut store, "Fx/GE_Burn", &burn()).unwrap();
        assert!(result.asset.is_none());
        assert!(!result.changed);
        assert!(store.is_empty());
    }

    #[test]
    fn test_load_only_returns_existing_untouched() {
        let mut fx = Fixture::new();
        fx.effect("Fx/GE_Burn", &burn());

        let reconciler = Reconciler::new(&fx.registry, &fx.hooks, &fx.settings).with_mode(Mode::LoadOnly);
        let mut config = burn();
        config.period = 9.0;
        let result = reconciler.reconcile_effect(&mut fx.store, "Fx/GE_Burn", &config).unwrap();
        let effect = result.asset.unwrap();
        assert_eq!(effect.as_effect().unwrap().period, 0.0);
        assert!(!result.changed);
    }

    #[test]
    fn test_invalid_path_and_container() {
        let mut fx = Fixture::new();
        let reconciler = Reconciler::new(&fx.registry, &fx.hooks, &fx.settings);
        let err = reconciler.reconcile_effect(&mut fx.store, "  ", &burn()).unwrap_err();
        assert!(matches!(err, ReconcileError::InvalidPath(_)));

        let err = reconciler.reconcile_effect(&mut fx.store, "/GE_Root", &burn()).unwrap_err();
        assert!(matches!(err, ReconcileError::InvalidContainer(_)));
    }

    #[test]
    fn test_unresolved_parent_warns_without_rebuild() {
        let mut fx = Fixture::new();
        fx.effect("Fx/GE_Burn", &burn());

        let mut config = burn();
        config.parent_class = "/Game/Missing/GE_Nope".to_string();
        let result = fx.effect("Fx/GE_Burn", &config);
        assert!(!result.rebuilt);
        assert_eq!(result.warnings.len(), 1);
        assert_eq!(result.warnings[0].field, "ParentClass");
    }

    #[test]
    fn test_template_clone_takes_row_fields() {
        let mut fx = Fixture::new();
        let mut base = EffectConfig::default();
        base.asset_tags.add("Effect.Base");
        base.period = 4.0;
        fx.effect("Templates/GE_Base", &base);

        let mut child = burn();
        child.parent_class = "/Game/Templates/GE_Base".to_string();
        let result = fx.effect("Fx/GE_Child", &child);
        let effect = result.asset.unwrap();
        let effect = effect.as_effect().unwrap();
        assert_eq!(effect.name, "GE_Child");
        assert_eq!(effect.class, fx.settings.effect_class);
        assert_eq!(effect.period, 0.0);
        assert!(effect.components.asset_tags.is_none());
        assert_eq!(effect.modifiers.len(), 1);
    }

    #[test]
    fn test_template_extension_components_survive_clone() {
        let mut fx = Fixture::new();
        fx.effect("Templates/GE_Base", &EffectConfig::default());
        let template_path = resolve("Templates/GE_Base").unwrap();
        let mut template = fx.store.load(&template_path).unwrap().unwrap();
        if let Asset::Effect(effect) = &mut template {
            effect.components.extension_mut("TemplateOnly").set("Value", 1);
            effect.components.target_tags = Some(TagsComponent::default());
        }
        fx.store.update(&template_path, template).unwrap();

        let mut child = EffectConfig::default();
        child.parent_class = "Templates/GE_Base".to_string();
        let result = fx.effect("Fx/GE_Child", &child);
        let asset = result.asset.unwrap();
        let effect = asset.as_effect().unwrap();
        assert!(effect.components.extension("TemplateOnly").is_some());
        // Modelled groups are still pruned to match the row
        assert!(effect.components.target_tags.is_none());
    }

    #[test]
    fn test_wrong_kind_at_path_is_replaced() {
        let mut fx = Fixture::new();
        let reconciler = Reconciler::new(&fx.registry, &fx.hooks, &fx.settings);
        reconciler
            .reconcile_ability(&mut fx.store, "Shared/GX_Thing", &AbilityConfig::default())
            .unwrap();
        let result = reconciler
            .reconcile_effect(&mut fx.store, "Shared/GX_Thing", &EffectConfig::default())
            .unwrap();
        assert!(result.rebuilt && result.created);
        assert!(result.asset.unwrap().as_effect().is_some());
    }
}
