//! Ability field application

use super::FieldContext;
use crate::registry::ClassKind;
use crate::types::{AbilityAsset, AbilityConfig, AbilityTrigger, AssetKind};

pub(super) fn apply(ability: &mut AbilityAsset, config: &AbilityConfig, ctx: &mut FieldContext<'_>) {
    ability.cost_gameplay_effect = effect_class(ctx, "CostGameplayEffectClass", &config.cost_gameplay_effect_class);
    ability.cooldown_gameplay_effect = effect_class(
        ctx,
        "CooldownGameplayEffectClass",
        &config.cooldown_gameplay_effect_class,
    );

    ability.ability_tags = config.ability_tags.clone();
    ability.cancel_abilities_with_tag = config.cancel_abilities_with_tag.clone();
    ability.block_abilities_with_tag = config.block_abilities_with_tag.clone();
    ability.activation_owned_tags = config.activation_owned_tags.clone();
    ability.activation_required_tags = config.activation_required_tags.clone();
    ability.activation_blocked_tags = config.activation_blocked_tags.clone();
    ability.source_required_tags = config.source_required_tags.clone();
    ability.source_blocked_tags = config.source_blocked_tags.clone();
    ability.target_required_tags = config.target_required_tags.clone();
    ability.target_blocked_tags = config.target_blocked_tags.clone();

    ability.ability_triggers = config
        .ability_triggers
        .iter()
        .map(|trigger| AbilityTrigger {
            trigger_tag: trigger.trigger_tag.trim().to_string(),
            trigger_source: trigger.trigger_source,
        })
        .collect();

    ability.server_respects_remote_ability_cancellation = config.server_respects_remote_ability_cancellation;
    ability.replicate_input_directly = config.replicate_input_directly;
    ability.retrigger_instanced_ability = config.retrigger_instanced_ability;
    ability.net_execution_policy = config.net_execution_policy;
    ability.net_security_policy = config.net_security_policy;
    ability.instancing_policy = config.instancing_policy;
    ability.replication_policy = config.replication_policy;
}

/// Empty clears the reference; unresolved clears it with a warning
fn effect_class(ctx: &mut FieldContext<'_>, field: &str, reference: &str) -> Option<String> {
    let reference = reference.trim();
    if reference.is_empty() {
        return None;
    }
    ctx.class_or_asset(field, reference, ClassKind::EffectClass, AssetKind::Effect)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path_utils::resolve;
    use crate::registry::ClassRegistry;
    use crate::store::{AssetStore, MemoryAssetStore};
    use crate::types::{
        AbilityTriggerConfig, Asset, EffectAsset, InstancingPolicy, TagContainer, TriggerSource,
        DEFAULT_ABILITY_CLASS, DEFAULT_EFFECT_CLASS,
    };

    #[test]
    fn test_tags_triggers_and_flags() {
        let registry = ClassRegistry::builtin();
        let store = MemoryAssetStore::new();
        let mut ability = AbilityAsset::new("GA_Dash", DEFAULT_ABILITY_CLASS);
        let config = AbilityConfig {
            ability_tags: TagContainer::parse("Ability.Dash"),
            activation_blocked_tags: TagContainer::parse("State.Stunned; State.Rooted"),
            ability_triggers: vec![AbilityTriggerConfig {
                trigger_tag: "Event.Dash".to_string(),
                trigger_source: TriggerSource::OwnedTagAdded,
            }],
            replicate_input_directly: true,
            instancing_policy: InstancingPolicy::InstancedPerExecution,
            ..Default::default()
        };

        let mut ctx = FieldContext::new(&registry, &store, "GA_Dash");
        apply(&mut ability, &config, &mut ctx);
        assert!(ctx.warnings.is_empty());
        assert!(ability.ability_tags.contains("Ability.Dash"));
        assert_eq!(ability.activation_blocked_tags.len(), 2);
        assert_eq!(ability.ability_triggers.len(), 1);
        assert_eq!(ability.ability_triggers[0].trigger_source, TriggerSource::OwnedTagAdded);
        assert!(ability.replicate_input_directly);
        assert!(ability.server_respects_remote_ability_cancellation);
        assert_eq!(ability.instancing_policy, InstancingPolicy::InstancedPerExecution);
    }

    #[test]
    fn test_cost_and_cooldown_resolution() {
        let registry = ClassRegistry::builtin();
        let mut store = MemoryAssetStore::new();
        let cooldown = resolve("GameplayEffects/GE_DashCooldown").unwrap();
        store
            .create(&cooldown, Asset::Effect(EffectAsset::new("GE_DashCooldown", DEFAULT_EFFECT_CLASS)))
            .unwrap();

        let mut ability = AbilityAsset::new("GA_Dash", DEFAULT_ABILITY_CLASS);
        ability.cost_gameplay_effect = Some("/Game/Old/GE_Cost.GE_Cost".to_string());
        let config = AbilityConfig {
            cost_gameplay_effect_class: "/Game/GameplayEffects/GE_Missing".to_string(),
            cooldown_gameplay_effect_class: "/Game/GameplayEffects/GE_DashCooldown".to_string(),
            ..Default::default()
        };

        let mut ctx = FieldContext::new(&registry, &store, "GA_Dash");
        apply(&mut ability, &config, &mut ctx);
        assert_eq!(ctx.warnings.len(), 1);
        assert_eq!(ctx.warnings[0].field, "CostGameplayEffectClass");
        assert!(ability.cost_gameplay_effect.is_none());
        assert_eq!(
            ability.cooldown_gameplay_effect.as_deref(),
            Some("/Game/GameplayEffects/GE_DashCooldown.GE_DashCooldown")
        );

        let mut ctx = FieldContext::new(&registry, &store, "GA_Dash");
        apply(&mut ability, &AbilityConfig::default(), &mut ctx);
        assert!(ctx.warnings.is_empty());
        assert!(ability.cooldown_gameplay_effect.is_none());
    }
}
