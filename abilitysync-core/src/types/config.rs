//! Configuration rows
//!
//! One row of designer input per generated asset. Rows are keyed by name in
//! their table, so `Name` never appears as a field here. JSON uses the
//! PascalCase property names the spreadsheet exporter writes; keys this
//! crate does not model are kept in `extra` for extension hooks.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use super::asset::AssetKind;
use super::enums::*;
use super::tags::{GameplayTag, TagContainer};
use crate::schema::{FieldDef, FieldType, Reflect, StructDef};

const ATTRIBUTE_HINT: &str = "Format: ClassName.PropertyName (e.g. TestAttributeSet.TestPropertyOne)";

/// A row type the importer and reconciler can drive
pub trait ConfigRow: Serialize + DeserializeOwned + Clone + Default + Reflect {
    /// Kind of asset generated from rows of this type
    const KIND: AssetKind;

    /// Template asset or class reference; empty when unset
    fn parent_class(&self) -> &str;

    /// Fields not modelled by this crate
    fn extra(&self) -> &BTreeMap<String, Value>;
}

/// Accept either a JSON list or a single separator-joined cell
fn string_list<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        List(Vec<String>),
        Cell(String),
    }

    let items = match Repr::deserialize(deserializer)? {
        Repr::List(items) => items,
        Repr::Cell(cell) => cell.split(',').map(str::to_string).collect(),
    };
    Ok(items
        .into_iter()
        .map(|item| item.trim().to_string())
        .filter(|item| !item.is_empty())
        .collect())
}

/// Required and ignored tags of one requirement group
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct TagRequirementsConfig {
    pub require_tags: TagContainer,
    pub ignore_tags: TagContainer,
}

impl TagRequirementsConfig {
    pub fn is_empty(&self) -> bool {
        self.require_tags.is_empty() && self.ignore_tags.is_empty()
    }
}

/// Attribute-based magnitude parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct AttributeBasedModifierConfig {
    pub backing_attribute: String,
    pub attribute_calculation_type: AttributeCalculationType,
    pub coefficient: f32,
    pub pre_multiply_additive_value: f32,
    pub post_multiply_additive_value: f32,
}

impl Default for AttributeBasedModifierConfig {
    fn default() -> Self {
        Self {
            backing_attribute: String::new(),
            attribute_calculation_type: AttributeCalculationType::default(),
            coefficient: 1.0,
            pre_multiply_additive_value: 0.0,
            post_multiply_additive_value: 0.0,
        }
    }
}

/// Set-by-caller magnitude parameters
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct SetByCallerModifierConfig {
    pub data_tag: GameplayTag,
    pub data_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct GameplayCueConfig {
    pub gameplay_cue_tag: GameplayTag,
    pub min_level: f32,
    pub max_level: f32,
}

/// Tag-based effect query used for immunity and removal
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct EffectQueryConfig {
    pub match_any_owning_tags: TagContainer,
    pub match_all_owning_tags: TagContainer,
    pub match_no_owning_tags: TagContainer,
    pub match_any_source_tags: TagContainer,
    pub match_all_source_tags: TagContainer,
    pub match_no_source_tags: TagContainer,
}

impl EffectQueryConfig {
    pub fn is_empty(&self) -> bool {
        self.match_any_owning_tags.is_empty()
            && self.match_all_owning_tags.is_empty()
            && self.match_no_owning_tags.is_empty()
            && self.match_any_source_tags.is_empty()
            && self.match_all_source_tags.is_empty()
            && self.match_no_source_tags.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ExecutionConfig {
    pub calculation_class: String,
    pub passed_in_tags: TagContainer,
}

/// One attribute modifier
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ModifierConfig {
    pub attribute: String,
    #[serde(alias = "Op")]
    pub modifier_op: ModifierOp,
    pub magnitude_calculation_type: MagnitudeCalculationType,
    pub magnitude: f32,
    pub attribute_based_config: AttributeBasedModifierConfig,
    pub set_by_caller_config: SetByCallerModifierConfig,
    pub custom_calculation_class: String,
    pub source_tag_requirements: TagRequirementsConfig,
    pub target_tag_requirements: TagRequirementsConfig,
}

/// Gameplay effect row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct EffectConfig {
    pub description: String,
    pub parent_class: String,

    pub duration_type: DurationType,
    pub duration_magnitude: f32,
    pub period: f32,

    pub stacking_type: StackingType,
    pub stack_limit_count: i32,
    pub stack_duration_refresh_policy: StackDurationRefreshPolicy,
    pub stack_period_reset_policy: StackPeriodResetPolicy,

    pub asset_tags: TagContainer,
    pub granted_tags: TagContainer,

    pub application_tag_requirements: TagRequirementsConfig,
    pub ongoing_tag_requirements: TagRequirementsConfig,
    pub removal_tag_requirements: TagRequirementsConfig,

    pub cancel_abilities_with_tags: TagContainer,
    pub block_abilities_with_tags: TagContainer,

    #[serde(deserialize_with = "string_list")]
    pub granted_ability_classes: Vec<String>,

    pub modifiers: Vec<ModifierConfig>,
    pub gameplay_cues: Vec<GameplayCueConfig>,
    pub immunity_queries: Vec<EffectQueryConfig>,
    pub removal_queries: Vec<EffectQueryConfig>,
    pub executions: Vec<ExecutionConfig>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Default for EffectConfig {
    fn default() -> Self {
        Self {
            description: String::new(),
            parent_class: String::new(),
            duration_type: DurationType::default(),
            duration_magnitude: 0.0,
            period: 0.0,
            stacking_type: StackingType::default(),
            stack_limit_count: 1,
            stack_duration_refresh_policy: StackDurationRefreshPolicy::default(),
            stack_period_reset_policy: StackPeriodResetPolicy::default(),
            asset_tags: TagContainer::default(),
            granted_tags: TagContainer::default(),
            application_tag_requirements: TagRequirementsConfig::default(),
            ongoing_tag_requirements: TagRequirementsConfig::default(),
            removal_tag_requirements: TagRequirementsConfig::default(),
            cancel_abilities_with_tags: TagContainer::default(),
            block_abilities_with_tags: TagContainer::default(),
            granted_ability_classes: Vec::new(),
            modifiers: Vec::new(),
            gameplay_cues: Vec::new(),
            immunity_queries: Vec::new(),
            removal_queries: Vec::new(),
            executions: Vec::new(),
            extra: BTreeMap::new(),
        }
    }
}

impl ConfigRow for EffectConfig {
    const KIND: AssetKind = AssetKind::Effect;

    fn parent_class(&self) -> &str {
        self.parent_class.trim()
    }

    fn extra(&self) -> &BTreeMap<String, Value> {
        &self.extra
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct AbilityTriggerConfig {
    pub trigger_tag: GameplayTag,
    pub trigger_source: TriggerSource,
}

/// Gameplay ability row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct AbilityConfig {
    pub description: String,
    pub parent_class: String,

    pub cost_gameplay_effect_class: String,
    pub cooldown_gameplay_effect_class: String,

    pub ability_tags: TagContainer,
    pub cancel_abilities_with_tag: TagContainer,
    pub block_abilities_with_tag: TagContainer,
    pub activation_owned_tags: TagContainer,
    pub activation_required_tags: TagContainer,
    pub activation_blocked_tags: TagContainer,
    pub source_required_tags: TagContainer,
    pub source_blocked_tags: TagContainer,
    pub target_required_tags: TagContainer,
    pub target_blocked_tags: TagContainer,

    pub ability_triggers: Vec<AbilityTriggerConfig>,

    #[serde(alias = "bServerRespectsRemoteAbilityCancellation")]
    pub server_respects_remote_ability_cancellation: bool,
    #[serde(alias = "bReplicateInputDirectly")]
    pub replicate_input_directly: bool,
    pub net_execution_policy: NetExecutionPolicy,
    pub net_security_policy: NetSecurityPolicy,
    pub instancing_policy: InstancingPolicy,
    pub replication_policy: ReplicationPolicy,
    #[serde(alias = "bRetriggerInstancedAbility")]
    pub retrigger_instanced_ability: bool,

    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Default for AbilityConfig {
    fn default() -> Self {
        Self {
            description: String::new(),
            parent_class: String::new(),
            cost_gameplay_effect_class: String::new(),
            cooldown_gameplay_effect_class: String::new(),
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
            net_execution_policy: NetExecutionPolicy::default(),
            net_security_policy: NetSecurityPolicy::default(),
            instancing_policy: InstancingPolicy::default(),
            replication_policy: ReplicationPolicy::default(),
            retrigger_instanced_ability: false,
            extra: BTreeMap::new(),
        }
    }
}

impl ConfigRow for AbilityConfig {
    const KIND: AssetKind = AssetKind::Ability;

    fn parent_class(&self) -> &str {
        self.parent_class.trim()
    }

    fn extra(&self) -> &BTreeMap<String, Value> {
        &self.extra
    }
}

// Static field tables

fn tags(name: &str, category: &str) -> FieldDef {
    FieldDef::new(name, category, FieldType::tag_container())
}

fn requirements(name: &str, category: &str) -> FieldDef {
    FieldDef::new(name, category, FieldType::structure::<TagRequirementsConfig>())
}

impl Reflect for TagRequirementsConfig {
    const STRUCT_PATH: &'static str = "/Script/AbilitySync.TagRequirementsConfig";

    fn struct_def() -> StructDef {
        StructDef::new(
            Self::STRUCT_PATH,
            vec![tags("RequireTags", "TagRequirements"), tags("IgnoreTags", "TagRequirements")],
        )
    }
}

impl Reflect for AttributeBasedModifierConfig {
    const STRUCT_PATH: &'static str = "/Script/AbilitySync.AttributeBasedModifierConfig";

    fn struct_def() -> StructDef {
        StructDef::new(
            Self::STRUCT_PATH,
            vec![
                FieldDef::new("BackingAttribute", "AttributeBased", FieldType::Str).hint(ATTRIBUTE_HINT),
                FieldDef::new(
                    "AttributeCalculationType",
                    "AttributeBased",
                    FieldType::enumeration::<AttributeCalculationType>(),
                ),
                FieldDef::new("Coefficient", "AttributeBased", FieldType::Float),
                FieldDef::new("PreMultiplyAdditiveValue", "AttributeBased", FieldType::Float),
                FieldDef::new("PostMultiplyAdditiveValue", "AttributeBased", FieldType::Float),
            ],
        )
    }
}

impl Reflect for SetByCallerModifierConfig {
    const STRUCT_PATH: &'static str = "/Script/AbilitySync.SetByCallerModifierConfig";

    fn struct_def() -> StructDef {
        StructDef::new(
            Self::STRUCT_PATH,
            vec![
                FieldDef::new("DataTag", "SetByCaller", FieldType::tag()),
                FieldDef::new("DataName", "SetByCaller", FieldType::Name),
            ],
        )
    }
}

impl Reflect for GameplayCueConfig {
    const STRUCT_PATH: &'static str = "/Script/AbilitySync.GameplayCueConfig";

    fn struct_def() -> StructDef {
        StructDef::new(
            Self::STRUCT_PATH,
            vec![
                FieldDef::new("GameplayCueTag", "GameplayCue", FieldType::tag()),
                FieldDef::new("MinLevel", "GameplayCue", FieldType::Float),
                FieldDef::new("MaxLevel", "GameplayCue", FieldType::Float),
            ],
        )
    }
}

impl Reflect for EffectQueryConfig {
    const STRUCT_PATH: &'static str = "/Script/AbilitySync.EffectQueryConfig";

    fn struct_def() -> StructDef {
        StructDef::new(
            Self::STRUCT_PATH,
            [
                "MatchAnyOwningTags",
                "MatchAllOwningTags",
                "MatchNoOwningTags",
                "MatchAnySourceTags",
                "MatchAllSourceTags",
                "MatchNoSourceTags",
            ]
            .iter()
            .map(|name| tags(name, "Query"))
            .collect(),
        )
    }
}

impl Reflect for ExecutionConfig {
    const STRUCT_PATH: &'static str = "/Script/AbilitySync.ExecutionConfig";

    fn struct_def() -> StructDef {
        StructDef::new(
            Self::STRUCT_PATH,
            vec![
                FieldDef::new("CalculationClass", "Execution", FieldType::Str)
                    .hint("Asset path to execution calculation class"),
                tags("PassedInTags", "Execution"),
            ],
        )
    }
}

impl Reflect for ModifierConfig {
    const STRUCT_PATH: &'static str = "/Script/AbilitySync.GEModifierConfig";

    fn struct_def() -> StructDef {
        StructDef::new(
            Self::STRUCT_PATH,
            vec![
                FieldDef::new("Attribute", "Modifier", FieldType::Str).hint(ATTRIBUTE_HINT),
                FieldDef::new("ModifierOp", "Modifier", FieldType::enumeration::<ModifierOp>()),
                FieldDef::new(
                    "MagnitudeCalculationType",
                    "Modifier",
                    FieldType::enumeration::<MagnitudeCalculationType>(),
                ),
                FieldDef::new("Magnitude", "Modifier", FieldType::Float),
                FieldDef::new(
                    "AttributeBasedConfig",
                    "Modifier",
                    FieldType::structure::<AttributeBasedModifierConfig>(),
                ),
                FieldDef::new(
                    "SetByCallerConfig",
                    "Modifier",
                    FieldType::structure::<SetByCallerModifierConfig>(),
                ),
                FieldDef::new("CustomCalculationClass", "Modifier", FieldType::Str)
                    .hint("Asset path to calculation class"),
                requirements("SourceTagRequirements", "Modifier"),
                requirements("TargetTagRequirements", "Modifier"),
            ],
        )
    }
}

impl Reflect for EffectConfig {
    const STRUCT_PATH: &'static str = "/Script/AbilitySync.GameplayEffectConfig";

    fn struct_def() -> StructDef {
        StructDef::new(
            Self::STRUCT_PATH,
            vec![
                FieldDef::new("Description", "Basic", FieldType::Str)
                    .hint("Description of this effect for documentation"),
                FieldDef::new("ParentClass", "Basic", FieldType::Str).hint("Asset path: /Game/Effects/GE_Base"),
                FieldDef::new("DurationType", "Basic", FieldType::enumeration::<DurationType>()),
                FieldDef::new("DurationMagnitude", "Basic", FieldType::Float),
                FieldDef::new("Period", "Basic", FieldType::Float),
                FieldDef::new("StackingType", "Stacking", FieldType::enumeration::<StackingType>()),
                FieldDef::new("StackLimitCount", "Stacking", FieldType::Int),
                FieldDef::new(
                    "StackDurationRefreshPolicy",
                    "Stacking",
                    FieldType::enumeration::<StackDurationRefreshPolicy>(),
                ),
                FieldDef::new(
                    "StackPeriodResetPolicy",
                    "Stacking",
                    FieldType::enumeration::<StackPeriodResetPolicy>(),
                ),
                tags("AssetTags", "Tags"),
                tags("GrantedTags", "Tags"),
                requirements("ApplicationTagRequirements", "Application"),
                requirements("OngoingTagRequirements", "Application"),
                requirements("RemovalTagRequirements", "Application"),
                tags("CancelAbilitiesWithTags", "Tags"),
                tags("BlockAbilitiesWithTags", "Tags"),
                FieldDef::new("GrantedAbilityClasses", "Abilities", FieldType::array(FieldType::Str))
                    .hint("Comma-separated asset paths")
                    .separator(","),
                FieldDef::new(
                    "Modifiers",
                    "Modifiers",
                    FieldType::array(FieldType::structure::<ModifierConfig>()),
                )
                .sheet("Modifiers"),
                FieldDef::new(
                    "GameplayCues",
                    "GameplayCues",
                    FieldType::array(FieldType::structure::<GameplayCueConfig>()),
                ),
                FieldDef::new(
                    "ImmunityQueries",
                    "Immunity",
                    FieldType::array(FieldType::structure::<EffectQueryConfig>()),
                ),
                FieldDef::new(
                    "RemovalQueries",
                    "Removal",
                    FieldType::array(FieldType::structure::<EffectQueryConfig>()),
                ),
                FieldDef::new(
                    "Executions",
                    "Executions",
                    FieldType::array(FieldType::structure::<ExecutionConfig>()),
                ),
            ],
        )
    }
}

impl Reflect for AbilityTriggerConfig {
    const STRUCT_PATH: &'static str = "/Script/AbilitySync.AbilityTriggerConfig";

    fn struct_def() -> StructDef {
        StructDef::new(
            Self::STRUCT_PATH,
            vec![
                FieldDef::new("TriggerTag", "Trigger", FieldType::tag()),
                FieldDef::new("TriggerSource", "Trigger", FieldType::enumeration::<TriggerSource>()),
            ],
        )
    }
}

impl Reflect for AbilityConfig {
    const STRUCT_PATH: &'static str = "/Script/AbilitySync.GameplayAbilityConfig";

    fn struct_def() -> StructDef {
        let mut fields = vec![
            FieldDef::new("Description", "Basic", FieldType::Str)
                .hint("Description of this ability for documentation"),
            FieldDef::new("ParentClass", "Basic", FieldType::Str).hint("Asset path: /Game/Abilities/GA_Base"),
            FieldDef::new("CostGameplayEffectClass", "Costs", FieldType::Str).hint("Asset path to Cost GE class"),
            FieldDef::new("CooldownGameplayEffectClass", "Cooldowns", FieldType::Str)
                .hint("Asset path to Cooldown GE class"),
        ];
        fields.extend(
            [
                "AbilityTags",
                "CancelAbilitiesWithTag",
                "BlockAbilitiesWithTag",
                "ActivationOwnedTags",
                "ActivationRequiredTags",
                "ActivationBlockedTags",
                "SourceRequiredTags",
                "SourceBlockedTags",
                "TargetRequiredTags",
                "TargetBlockedTags",
            ]
            .iter()
            .map(|name| tags(name, "Tags")),
        );
        fields.extend([
            FieldDef::new(
                "AbilityTriggers",
                "Triggers",
                FieldType::array(FieldType::structure::<AbilityTriggerConfig>()),
            )
            .sheet("Triggers"),
            FieldDef::new("ServerRespectsRemoteAbilityCancellation", "Advanced", FieldType::Bool),
            FieldDef::new("ReplicateInputDirectly", "Advanced", FieldType::Bool),
            FieldDef::new(
                "NetExecutionPolicy",
                "Advanced",
                FieldType::enumeration::<NetExecutionPolicy>(),
            ),
            FieldDef::new(
                "NetSecurityPolicy",
                "Advanced",
                FieldType::enumeration::<NetSecurityPolicy>(),
            ),
            FieldDef::new("InstancingPolicy", "Advanced", FieldType::enumeration::<InstancingPolicy>()),
            FieldDef::new(
                "ReplicationPolicy",
                "Advanced",
                FieldType::enumeration::<ReplicationPolicy>(),
            ),
            FieldDef::new("RetriggerInstancedAbility", "Advanced", FieldType::Bool),
        ]);
        StructDef::new(Self::STRUCT_PATH, fields)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effect_config_from_snapshot_row() {
        let json = r#"{
            "DurationType": "Duration",
            "DurationMagnitude": 5.0,
            "GrantedAbilityClasses": "/Game/Abilities/GA_A, ,/Game/Abilities/GA_B",
            "Modifiers": [{"Attribute": "TestAttributeSet.TestPropertyOne", "Op": "Additive", "Magnitude": -2.0}],
            "TestIntValue": 7
        }"#;
        let config: EffectConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.duration_type, DurationType::HasDuration);
        assert_eq!(config.duration_magnitude, 5.0);
        assert_eq!(config.stack_limit_count, 1);
        assert_eq!(config.granted_ability_classes, vec!["/Game/Abilities/GA_A", "/Game/Abilities/GA_B"]);
        assert_eq!(config.modifiers.len(), 1);
        assert_eq!(config.modifiers[0].modifier_op, ModifierOp::Additive);
        assert_eq!(config.modifiers[0].attribute_based_config.coefficient, 1.0);
        assert_eq!(config.extra["TestIntValue"], serde_json::json!(7));
    }

    #[test]
    fn test_effect_config_serializes_pascal_case() {
        let config = EffectConfig {
            period: 2.0,
            ..Default::default()
        };
        let value = serde_json::to_value(&config).unwrap();
        assert_eq!(value["Period"], serde_json::json!(2.0));
        assert_eq!(value["StackLimitCount"], serde_json::json!(1));
        assert!(value.get("Extra").is_none());
    }

    #[test]
    fn test_ability_config_bool_aliases() {
        let config: AbilityConfig = serde_json::from_str(
            r#"{"bReplicateInputDirectly": true, "InstancingPolicy": "InstancedPerExecution"}"#,
        )
        .unwrap();
        assert!(config.replicate_input_directly);
        assert!(config.server_respects_remote_ability_cancellation);
        assert_eq!(config.instancing_policy, InstancingPolicy::InstancedPerExecution);
        assert!(config.extra.is_empty());
    }

    #[test]
    fn test_requirement_and_query_emptiness() {
        let mut req = TagRequirementsConfig::default();
        assert!(req.is_empty());
        req.ignore_tags.add("State.Dead");
        assert!(!req.is_empty());

        let mut query = EffectQueryConfig::default();
        assert!(query.is_empty());
        query.match_no_source_tags.add("Source.Boss");
        assert!(!query.is_empty());
    }

    #[test]
    fn test_field_tables_match_serialized_keys() {
        let value = serde_json::to_value(AbilityConfig::default()).unwrap();
        let object = value.as_object().unwrap();
        for field in AbilityConfig::struct_def().all_fields() {
            assert!(object.contains_key(&field.name), "missing {}", field.name);
        }
        let value = serde_json::to_value(EffectConfig::default()).unwrap();
        let object = value.as_object().unwrap();
        for field in EffectConfig::struct_def().all_fields() {
            assert!(object.contains_key(&field.name), "missing {}", field.name);
        }
    }
}
