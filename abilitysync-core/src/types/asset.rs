//! Generated content assets
//!
//! An asset's `class` is its structural type and never changes after
//! creation; a different class means deleting and recreating the asset.
//! Object references (classes, other assets) are stored as path strings.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use super::enums::*;
use super::tags::{GameplayTag, TagContainer};
use crate::fingerprint::ObjectState;

/// Category of generated asset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AssetKind {
    Effect,
    Ability,
}

impl AssetKind {
    /// Name prefix of generated assets (`GE_`, `GA_`)
    pub fn prefix(self) -> &'static str {
        match self {
            AssetKind::Effect => "GE_",
            AssetKind::Ability => "GA_",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            AssetKind::Effect => "effect",
            AssetKind::Ability => "ability",
        }
    }
}

/// Required and ignored tags
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TagRequirements {
    pub require_tags: TagContainer,
    pub ignore_tags: TagContainer,
}

/// A resolved attribute: owning attribute-set class plus property name
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributeRef {
    /// Class path of the attribute set
    pub owner: String,
    pub name: String,
}

impl std::fmt::Display for AttributeRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.owner, self.name)
    }
}

/// Attribute captured for an attribute-based magnitude
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributeCapture {
    pub attribute: AttributeRef,
    pub source: CaptureSource,
    pub snapshot: bool,
}

/// How a modifier's magnitude is computed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Magnitude {
    FixedScalar {
        value: f32,
    },
    #[serde(rename_all = "camelCase")]
    AttributeBased {
        /// `None` when the configured attribute did not resolve
        backing_attribute: Option<AttributeCapture>,
        calculation_type: AttributeCalculationType,
        coefficient: f32,
        pre_multiply_additive_value: f32,
        post_multiply_additive_value: f32,
    },
    #[serde(rename_all = "camelCase")]
    SetByCaller {
        data_tag: GameplayTag,
        data_name: String,
    },
    #[serde(rename_all = "camelCase")]
    CustomCalculation {
        calculation_class: String,
    },
}

impl Default for Magnitude {
    fn default() -> Self {
        Magnitude::FixedScalar { value: 0.0 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModifierInfo {
    pub attribute: AttributeRef,
    pub modifier_op: ModifierOp,
    pub magnitude: Magnitude,
    pub source_tags: TagRequirements,
    pub target_tags: TagRequirements,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameplayCue {
    pub tags: TagContainer,
    pub min_level: f32,
    pub max_level: f32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Execution {
    pub calculation_class: String,
    pub passed_in_tags: TagContainer,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TagMatch {
    #[default]
    Any,
    All,
}

/// Tag query: tags matched by `mode`, and none of `excluded`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TagQuery {
    pub mode: TagMatch,
    pub tags: TagContainer,
    pub excluded: TagContainer,
}

impl TagQuery {
    pub fn is_empty(&self) -> bool {
        self.tags.is_empty() && self.excluded.is_empty()
    }
}

/// Query over active effects, used by immunity and removal components
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EffectQuery {
    pub owning_tag_query: TagQuery,
    pub effect_tag_query: TagQuery,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TargetTagRequirementsComponent {
    pub application: TagRequirements,
    pub ongoing: TagRequirements,
    pub removal: TagRequirements,
}

/// Component carrying one added-tag container
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TagsComponent {
    pub added: TagContainer,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AbilitiesComponent {
    /// Granted ability class paths
    pub grant_abilities: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct QueriesComponent {
    pub queries: Vec<EffectQuery>,
}

/// Project-specific component written by extension hooks
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExtensionComponent {
    pub properties: BTreeMap<String, Value>,
}

impl ExtensionComponent {
    pub fn set(&mut self, key: &str, value: impl Into<Value>) {
        self.properties.insert(key.to_string(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }
}

/// Optional sub-components of an effect, one slot per component type
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EffectComponents {
    pub target_tag_requirements: Option<TargetTagRequirementsComponent>,
    pub asset_tags: Option<TagsComponent>,
    pub target_tags: Option<TagsComponent>,
    pub block_ability_tags: Option<TagsComponent>,
    pub cancel_ability_tags: Option<TagsComponent>,
    pub abilities: Option<AbilitiesComponent>,
    pub immunity: Option<QueriesComponent>,
    pub remove_other: Option<QueriesComponent>,
    /// Extension components keyed by component name
    pub extensions: BTreeMap<String, ExtensionComponent>,
}

impl EffectComponents {
    /// Find or add an extension component
    pub fn extension_mut(&mut self, name: &str) -> &mut ExtensionComponent {
        self.extensions.entry(name.to_string()).or_default()
    }

    pub fn extension(&self, name: &str) -> Option<&ExtensionComponent> {
        self.extensions.get(name)
    }

    /// Remove an extension component; returns whether one was present
    pub fn remove_extension(&mut self, name: &str) -> bool {
        self.extensions.remove(name).is_some()
    }

    /// Number of present components, extensions included
    pub fn count(&self) -> usize {
        [
            self.target_tag_requirements.is_some(),
            self.asset_tags.is_some(),
            self.target_tags.is_some(),
            self.block_ability_tags.is_some(),
            self.cancel_ability_tags.is_some(),
            self.abilities.is_some(),
            self.immunity.is_some(),
            self.remove_other.is_some(),
        ]
        .iter()
        .filter(|present| **present)
        .count()
            + self.extensions.len()
    }
}

/// Add-or-remove: when `wanted`, find or create the slot's component and
/// hand it out for writing; otherwise clear the slot.
pub fn sync_slot<T: Default>(slot: &mut Option<T>, wanted: bool) -> Option<&mut T> {
    if wanted {
        Some(slot.get_or_insert_with(T::default))
    } else {
        *slot = None;
        None
    }
}

/// Generated gameplay effect
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EffectAsset {
    pub name: String,
    pub class: String,

    pub duration_policy: DurationType,
    pub duration_magnitude: f32,
    pub period: f32,

    pub stacking_type: StackingType,
    pub stack_limit_count: i32,
    pub stack_duration_refresh_policy: StackDurationRefreshPolicy,
    pub stack_period_reset_policy: StackPeriodResetPolicy,

    #[serde(default)]
    pub modifiers: Vec<ModifierInfo>,
    #[serde(default)]
    pub gameplay_cues: Vec<GameplayCue>,
    #[serde(default)]
    pub executions: Vec<Execution>,

    #[serde(default)]
    pub components: EffectComponents,
}

impl EffectAsset {
    pub fn new(name: &str, class: &str) -> Self {
        Self {
            name: name.to_string(),
            class: class.to_string(),
            duration_policy: DurationType::default(),
            duration_magnitude: 0.0,
            period: 0.0,
            stacking_type: StackingType::default(),
            stack_limit_count: 0,
            stack_duration_refresh_policy: StackDurationRefreshPolicy::default(),
            stack_period_reset_policy: StackPeriodResetPolicy::default(),
            modifiers: Vec::new(),
            gameplay_cues: Vec::new(),
            executions: Vec::new(),
            components: EffectComponents::default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AbilityTrigger {
    pub trigger_tag: GameplayTag,
    pub trigger_source: TriggerSource,
}

/// Generated gameplay ability
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AbilityAsset {
    pub name: String,
    pub class: String,

    /// Cost effect class path
    pub cost_gameplay_effect: Option<String>,
    /// Cooldown effect class path
    pub cooldown_gameplay_effect: Option<String>,

    #[serde(default)]
    pub ability_tags: TagContainer,
    #[serde(default)]
    pub cancel_abilities_with_tag: TagContainer,
    #[serde(default)]
    pub block_abilities_with_tag: TagContainer,
    #[serde(default)]
    pub activation_owned_tags: TagContainer,
    #[serde(default)]
    pub activation_required_tags: TagContainer,
    #[serde(default)]
    pub activation_blocked_tags: TagContainer,
    #[serde(default)]
    pub source_required_tags: TagContainer,
    #[serde(default)]
    pub source_blocked_tags: TagContainer,
    #[serde(default)]
    pub target_required_tags: TagContainer,
    #[serde(default)]
    pub target_blocked_tags: TagContainer,

    #[serde(default)]
    pub ability_triggers: Vec<AbilityTrigger>,

    pub server_respects_remote_ability_cancellation: bool,
    pub replicate_input_directly: bool,
    pub retrigger_instanced_ability: bool,
    pub net_execution_policy: NetExecutionPolicy,
    pub net_security_policy: NetSecurityPolicy,
    pub instancing_policy: InstancingPolicy,
    pub replication_policy: ReplicationPolicy,

    /// Project properties set by extension hooks
    #[serde(default)]
    pub properties: BTreeMap<String, Value>,
}

impl AbilityAsset {
    pub fn new(name: &str, class: &str) -> Self {
        Self {
            name: name.to_string(),
            class: class.to_string(),
            cost_gameplay_effect: None,
            cooldown_gameplay_effect: None,
            ability_tags: TagContainer::default(),
            cancel_abilities_with_tag: TagContainer::default(),
            block_abilities_with_tag: TagContainer::default(),
            activation_owned_tags: TagContainer::default(),
            activation_required_tags: TagContainer::default(),
            activation_blocked_tags: TagContainer::default(),
            source_required_tags: TagContainer::default(),
            source_blocked_tags: TagContainer::default(),
            target_required_tags: TagContainer::default(),
            target_blocked_tags: TagContainer::default(),
            ability_triggers: Vec::new(),
            server_respects_remote_ability_cancellation: true,
            replicate_input_directly: false,
            retrigger_instanced_ability: false,
            net_execution_policy: NetExecutionPolicy::default(),
            net_security_policy: NetSecurityPolicy::default(),
            instancing_policy: InstancingPolicy::default(),
            replication_policy: ReplicationPolicy::default(),
            properties: BTreeMap::new(),
        }
    }
}

/// Any asset held by a store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Asset {
    Effect(EffectAsset),
    Ability(AbilityAsset),
}

impl Asset {
    pub fn kind(&self) -> AssetKind {
        match self {
            Asset::Effect(_) => AssetKind::Effect,
            Asset::Ability(_) => AssetKind::Ability,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Asset::Effect(effect) => &effect.name,
            Asset::Ability(ability) => &ability.name,
        }
    }

    pub fn class(&self) -> &str {
        match self {
            Asset::Effect(effect) => &effect.class,
            Asset::Ability(ability) => &ability.class,
        }
    }

    pub fn as_effect(&self) -> Option<&EffectAsset> {
        match self {
            Asset::Effect(effect) => Some(effect),
            Asset::Ability(_) => None,
        }
    }

    pub fn as_ability(&self) -> Option<&AbilityAsset> {
        match self {
            Asset::Ability(ability) => Some(ability),
            Asset::Effect(_) => None,
        }
    }
}

/// Asset types the reconciler can produce
pub trait TargetAsset: ObjectState + Clone + Sized {
    const KIND: AssetKind;

    fn create(name: &str, class: &str) -> Self;

    fn class(&self) -> &str;

    /// Give a cloned template its new name
    fn rename(&mut self, name: &str);

    fn from_asset(asset: Asset) -> Option<Self>;

    fn into_asset(self) -> Asset;
}

impl TargetAsset for EffectAsset {
    const KIND: AssetKind = AssetKind::Effect;

    fn create(name: &str, class: &str) -> Self {
        Self::new(name, class)
    }

    fn class(&self) -> &str {
        &self.class
    }

    fn rename(&mut self, name: &str) {
        self.name = name.to_string();
    }

    fn from_asset(asset: Asset) -> Option<Self> {
        match asset {
            Asset::Effect(effect) => Some(effect),
            Asset::Ability(_) => None,
        }
    }

    fn into_asset(self) -> Asset {
        Asset::Effect(self)
    }
}

impl TargetAsset for AbilityAsset {
    const KIND: AssetKind = AssetKind::Ability;

    fn create(name: &str, class: &str) -> Self {
        Self::new(name, class)
    }

    fn class(&self) -> &str {
        &self.class
    }

    fn rename(&mut self, name: &str) {
        self.name = name.to_string();
    }

    fn from_asset(asset: Asset) -> Option<Self> {
        match asset {
            Asset::Ability(ability) => Some(ability),
            Asset::Effect(_) => None,
        }
    }

    fn into_asset(self) -> Asset {
        Asset::Ability(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sync_slot_add_and_remove() {
        let mut slot: Option<TagsComponent> = None;
        if let Some(component) = sync_slot(&mut slot, true) {
            component.added.add("State.Burning");
        }
        assert!(slot.as_ref().unwrap().added.contains("State.Burning"));

        // Existing component is reused, not recreated
        sync_slot(&mut slot, true).unwrap().added.add("State.Debuff");
        assert_eq!(slot.as_ref().unwrap().added.len(), 2);

        assert!(sync_slot(&mut slot, false).is_none());
        assert!(slot.is_none());
    }

    #[test]
    fn test_component_count() {
        let mut components = EffectComponents::default();
        assert_eq!(components.count(), 0);
        components.asset_tags = Some(TagsComponent::default());
        components.extension_mut("TestGameplayEffectComponent").set("TestIntValue", 3);
        assert_eq!(components.count(), 2);
        assert!(components.remove_extension("TestGameplayEffectComponent"));
        assert!(!components.remove_extension("TestGameplayEffectComponent"));
        assert_eq!(components.count(), 1);
    }

    #[test]
    fn test_asset_json_is_tagged_by_kind() {
        let asset = Asset::Ability(AbilityAsset::new("GA_Dash", "/Script/GameplayAbilities.GameplayAbility"));
        let json = serde_json::to_value(&asset).unwrap();
        assert_eq!(json["kind"], "ability");
        assert_eq!(json["name"], "GA_Dash");

        let back: Asset = serde_json::from_value(json).unwrap();
        assert_eq!(back.kind(), AssetKind::Ability);
        assert!(back.as_effect().is_none());
    }

    #[test]
    fn test_magnitude_json() {
        let magnitude = Magnitude::SetByCaller {
            data_tag: "Data.Damage".to_string(),
            data_name: String::new(),
        };
        let json = serde_json::to_value(&magnitude).unwrap();
        assert_eq!(json["type"], "setByCaller");
        assert_eq!(json["dataTag"], "Data.Damage");
    }
}
