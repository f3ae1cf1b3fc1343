//! Enumerations shared by configuration rows and generated assets
//!
//! Variant names are the engine's own spellings so spreadsheet cells can be
//! written exactly as designers see them in the editor.

use serde::{Deserialize, Serialize};

use crate::schema::{EnumDef, ReflectEnum};

macro_rules! reflect_enum {
    ($ty:ty, $path:literal, [$($name:literal),* $(,)?]) => {
        impl ReflectEnum for $ty {
            const DEF: EnumDef = EnumDef {
                path: $path,
                names: &[$($name),*],
            };
        }
    };
}

/// How long an effect stays applied
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum DurationType {
    #[default]
    Instant,
    Infinite,
    #[serde(alias = "Duration")]
    HasDuration,
}

reflect_enum!(
    DurationType,
    "/Script/GameplayAbilities.EGameplayEffectDurationType",
    ["Instant", "Infinite", "HasDuration", "EGameplayEffectDurationType_MAX"]
);

/// How stacks of the same effect aggregate
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum StackingType {
    #[default]
    None,
    AggregateBySource,
    AggregateByTarget,
}

reflect_enum!(
    StackingType,
    "/Script/GameplayAbilities.EGameplayEffectStackingType",
    ["None", "AggregateBySource", "AggregateByTarget", "EGameplayEffectStackingType_MAX"]
);

/// Whether a new stack refreshes the remaining duration
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum StackDurationRefreshPolicy {
    #[default]
    RefreshOnSuccessfulApplication,
    NeverRefresh,
}

reflect_enum!(
    StackDurationRefreshPolicy,
    "/Script/GameplayAbilities.EGameplayEffectStackingDurationPolicy",
    ["RefreshOnSuccessfulApplication", "NeverRefresh", "EGameplayEffectStackingDurationPolicy_MAX"]
);

/// Whether a new stack resets the period timer
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum StackPeriodResetPolicy {
    #[default]
    ResetOnSuccessfulApplication,
    NeverReset,
}

reflect_enum!(
    StackPeriodResetPolicy,
    "/Script/GameplayAbilities.EGameplayEffectStackingPeriodPolicy",
    ["ResetOnSuccessfulApplication", "NeverReset", "EGameplayEffectStackingPeriodPolicy_MAX"]
);

/// Operation a modifier applies to its attribute
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ModifierOp {
    #[default]
    #[serde(alias = "AddBase", alias = "Add")]
    Additive,
    #[serde(alias = "Multiplicative", alias = "Multiply")]
    Multiplicitive,
    #[serde(alias = "Divide")]
    Division,
    Override,
    Max,
}

reflect_enum!(
    ModifierOp,
    "/Script/GameplayAbilities.EGameplayModOp",
    ["Additive", "Multiplicitive", "Division", "Override", "Max", "EGameplayModOp_MAX"]
);

/// How a modifier magnitude is computed
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum MagnitudeCalculationType {
    #[default]
    #[serde(alias = "Fixed", alias = "FixedScalar")]
    ScalableFloat,
    AttributeBased,
    CustomCalculationClass,
    SetByCaller,
}

reflect_enum!(
    MagnitudeCalculationType,
    "/Script/GameplayAbilities.EGameplayEffectMagnitudeCalculation",
    ["ScalableFloat", "AttributeBased", "CustomCalculationClass", "SetByCaller"]
);

/// Which value of a captured attribute feeds an attribute-based magnitude
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum AttributeCalculationType {
    #[default]
    AttributeMagnitude,
    AttributeBaseValue,
    AttributeBonusMagnitude,
    AttributeMagnitudeEvaluatedUpToChannel,
}

reflect_enum!(
    AttributeCalculationType,
    "/Script/GameplayAbilities.EAttributeBasedFloatCalculationType",
    [
        "AttributeMagnitude",
        "AttributeBaseValue",
        "AttributeBonusMagnitude",
        "AttributeMagnitudeEvaluatedUpToChannel",
    ]
);

/// Side an attribute is captured from
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum CaptureSource {
    #[default]
    Source,
    Target,
}

/// What activates an ability trigger
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum TriggerSource {
    #[default]
    GameplayEvent,
    OwnedTagAdded,
    OwnedTagPresent,
}

reflect_enum!(
    TriggerSource,
    "/Script/GameplayAbilities.EGameplayAbilityTriggerSource",
    ["GameplayEvent", "OwnedTagAdded", "OwnedTagPresent", "EGameplayAbilityTriggerSource_MAX"]
);

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum NetExecutionPolicy {
    #[default]
    LocalPredicted,
    LocalOnly,
    ServerInitiated,
    ServerOnly,
}

reflect_enum!(
    NetExecutionPolicy,
    "/Script/GameplayAbilities.EGameplayAbilityNetExecutionPolicy",
    ["LocalPredicted", "LocalOnly", "ServerInitiated", "ServerOnly", "EGameplayAbilityNetExecutionPolicy_MAX"]
);

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum NetSecurityPolicy {
    #[default]
    ClientOrServer,
    ServerOnlyExecution,
    ServerOnlyTermination,
    ServerOnly,
}

reflect_enum!(
    NetSecurityPolicy,
    "/Script/GameplayAbilities.EGameplayAbilityNetSecurityPolicy",
    ["ClientOrServer", "ServerOnlyExecution", "ServerOnlyTermination", "ServerOnly", "EGameplayAbilityNetSecurityPolicy_MAX"]
);

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum InstancingPolicy {
    NonInstanced,
    #[default]
    InstancedPerActor,
    InstancedPerExecution,
}

reflect_enum!(
    InstancingPolicy,
    "/Script/GameplayAbilities.EGameplayAbilityInstancingPolicy",
    ["NonInstanced", "InstancedPerActor", "InstancedPerExecution", "EGameplayAbilityInstancingPolicy_MAX"]
);

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ReplicationPolicy {
    #[default]
    ReplicateNo,
    ReplicateYes,
}

reflect_enum!(
    ReplicationPolicy,
    "/Script/GameplayAbilities.EGameplayAbilityReplicationPolicy",
    ["ReplicateNo", "ReplicateYes", "EGameplayAbilityReplicationPolicy_MAX"]
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duration_alias() {
        let parsed: DurationType = serde_json::from_str(r#""Duration""#).unwrap();
        assert_eq!(parsed, DurationType::HasDuration);
        assert_eq!(serde_json::to_string(&parsed).unwrap(), r#""HasDuration""#);
    }

    #[test]
    fn test_modifier_op_aliases() {
        let parsed: ModifierOp = serde_json::from_str(r#""Multiplicative""#).unwrap();
        assert_eq!(parsed, ModifierOp::Multiplicitive);
        let parsed: ModifierOp = serde_json::from_str(r#""AddBase""#).unwrap();
        assert_eq!(parsed, ModifierOp::Additive);
    }

    #[test]
    fn test_ability_defaults() {
        assert_eq!(InstancingPolicy::default(), InstancingPolicy::InstancedPerActor);
        assert_eq!(NetExecutionPolicy::default(), NetExecutionPolicy::LocalPredicted);
    }
}
