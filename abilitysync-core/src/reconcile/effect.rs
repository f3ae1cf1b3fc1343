//! Effect field application

use super::FieldContext;
use crate::registry::ClassKind;
use crate::types::{
    sync_slot, AbilitiesComponent, AssetKind, AttributeBasedModifierConfig, AttributeCapture, CaptureSource,
    EffectAsset, EffectConfig, EffectQuery, EffectQueryConfig, Execution, GameplayCue, Magnitude,
    MagnitudeCalculationType, ModifierConfig, ModifierInfo, QueriesComponent, TagContainer, TagMatch, TagQuery,
    TagRequirements, TagRequirementsConfig, TagsComponent,
};

pub(super) fn apply(effect: &mut EffectAsset, config: &EffectConfig, ctx: &mut FieldContext<'_>) {
    effect.duration_policy = config.duration_type;
    effect.duration_magnitude = config.duration_magnitude;
    effect.period = config.period;

    effect.stacking_type = config.stacking_type;
    effect.stack_limit_count = config.stack_limit_count;
    effect.stack_duration_refresh_policy = config.stack_duration_refresh_policy;
    effect.stack_period_reset_policy = config.stack_period_reset_policy;

    apply_components(effect, config, ctx);

    effect.modifiers = config
        .modifiers
        .iter()
        .filter_map(|modifier| convert_modifier(modifier, ctx))
        .collect();

    effect.gameplay_cues = config
        .gameplay_cues
        .iter()
        .map(|cue| GameplayCue {
            tags: TagContainer::from_iter([cue.gameplay_cue_tag.as_str()]),
            min_level: cue.min_level,
            max_level: cue.max_level,
        })
        .collect();

    effect.executions = config
        .executions
        .iter()
        .filter_map(|execution| {
            let class = execution.calculation_class.trim();
            if class.is_empty() {
                ctx.unresolved("Executions.CalculationClass", class);
                return None;
            }
            let calculation_class = ctx.class("Executions.CalculationClass", class, ClassKind::ExecutionCalculation)?;
            Some(Execution {
                calculation_class,
                passed_in_tags: execution.passed_in_tags.clone(),
            })
        })
        .collect();
}

/// Optional component groups. Extension components are left alone.
fn apply_components(effect: &mut EffectAsset, config: &EffectConfig, ctx: &mut FieldContext<'_>) {
    let components = &mut effect.components;

    let wants_requirements = !(config.application_tag_requirements.is_empty()
        && config.ongoing_tag_requirements.is_empty()
        && config.removal_tag_requirements.is_empty());
    if let Some(component) = sync_slot(&mut components.target_tag_requirements, wants_requirements) {
        component.application = requirements(&config.application_tag_requirements);
        component.ongoing = requirements(&config.ongoing_tag_requirements);
        component.removal = requirements(&config.removal_tag_requirements);
    }

    sync_tags(&mut components.block_ability_tags, &config.block_abilities_with_tags);
    sync_tags(&mut components.cancel_ability_tags, &config.cancel_abilities_with_tags);
    sync_tags(&mut components.target_tags, &config.granted_tags);
    sync_tags(&mut components.asset_tags, &config.asset_tags);

    let wants_abilities = !config.granted_ability_classes.is_empty();
    if let Some(component) = sync_slot::<AbilitiesComponent>(&mut components.abilities, wants_abilities) {
        component.grant_abilities = config
            .granted_ability_classes
            .iter()
            .filter_map(|class| {
                ctx.class_or_asset("GrantedAbilityClasses", class, ClassKind::AbilityClass, AssetKind::Ability)
            })
            .collect();
    }

    sync_queries(&mut components.immunity, &config.immunity_queries);
    sync_queries(&mut components.remove_other, &config.removal_queries);
}

fn sync_tags(slot: &mut Option<TagsComponent>, tags: &TagContainer) {
    if let Some(component) = sync_slot(slot, !tags.is_empty()) {
        component.added = tags.clone();
    }
}

fn sync_queries(slot: &mut Option<QueriesComponent>, configs: &[EffectQueryConfig]) {
    let queries: Vec<EffectQuery> = configs
        .iter()
        .filter(|query| !query.is_empty())
        .map(convert_query)
        .collect();
    if let Some(component) = sync_slot(slot, !queries.is_empty()) {
        component.queries = queries;
    }
}

fn requirements(config: &TagRequirementsConfig) -> TagRequirements {
    TagRequirements {
        require_tags: config.require_tags.clone(),
        ignore_tags: config.ignore_tags.clone(),
    }
}

/// Match-all wins over match-any when both are given
fn tag_query(any: &TagContainer, all: &TagContainer, none: &TagContainer) -> TagQuery {
    let (mode, tags) = if all.is_empty() {
        (TagMatch::Any, any.clone())
    } else {
        (TagMatch::All, all.clone())
    };
    TagQuery {
        mode,
        tags,
        excluded: none.clone(),
    }
}

fn convert_query(config: &EffectQueryConfig) -> EffectQuery {
    EffectQuery {
        owning_tag_query: tag_query(
            &config.match_any_owning_tags,
            &config.match_all_owning_tags,
            &config.match_no_owning_tags,
        ),
        effect_tag_query: tag_query(
            &config.match_any_source_tags,
            &config.match_all_source_tags,
            &config.match_no_source_tags,
        ),
    }
}

fn convert_modifier(config: &ModifierConfig, ctx: &mut FieldContext<'_>) -> Option<ModifierInfo> {
    let attribute = ctx.attribute("Modifiers.Attribute", &config.attribute)?;

    let magnitude = match config.magnitude_calculation_type {
        MagnitudeCalculationType::ScalableFloat => Magnitude::FixedScalar { value: config.magnitude },
        MagnitudeCalculationType::AttributeBased => attribute_based(&config.attribute_based_config, ctx),
        MagnitudeCalculationType::SetByCaller => Magnitude::SetByCaller {
            data_tag: config.set_by_caller_config.data_tag.trim().to_string(),
            data_name: config.set_by_caller_config.data_name.trim().to_string(),
        },
        MagnitudeCalculationType::CustomCalculationClass => {
            match ctx.class(
                "Modifiers.CustomCalculationClass",
                config.custom_calculation_class.trim(),
                ClassKind::MagnitudeCalculation,
            ) {
                Some(calculation_class) => Magnitude::CustomCalculation { calculation_class },
                None => Magnitude::FixedScalar { value: config.magnitude },
            }
        }
    };

    Some(ModifierInfo {
        attribute,
        modifier_op: config.modifier_op,
        magnitude,
        source_tags: requirements(&config.source_tag_requirements),
        target_tags: requirements(&config.target_tag_requirements),
    })
}

fn attribute_based(config: &AttributeBasedModifierConfig, ctx: &mut FieldContext<'_>) -> Magnitude {
    let backing_attribute = ctx
        .attribute("Modifiers.AttributeBasedConfig.BackingAttribute", &config.backing_attribute)
        .map(|attribute| AttributeCapture {
            attribute,
            source: CaptureSource::Source,
            snapshot: false,
        });

    Magnitude::AttributeBased {
        backing_attribute,
        calculation_type: config.attribute_calculation_type,
        coefficient: config.coefficient,
        pre_multiply_additive_value: config.pre_multiply_additive_value,
        post_multiply_additive_value: config.post_multiply_additive_value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path_utils::resolve;
    use crate::registry::{ClassInfo, ClassRegistry};
    use crate::store::{AssetStore, MemoryAssetStore};
    use crate::types::{
        AbilityAsset, Asset, ExecutionConfig, GameplayCueConfig, ModifierOp, DEFAULT_ABILITY_CLASS, DEFAULT_EFFECT_CLASS,
    };

    fn run(registry: &ClassRegistry, effect: &mut EffectAsset, config: &EffectConfig) -> usize {
        let store = MemoryAssetStore::new();
        let mut ctx = FieldContext::new(registry, &store, "GE_Test");
        apply(effect, config, &mut ctx);
        ctx.warnings.len()
    }

    fn modifier(attribute: &str) -> ModifierConfig {
        ModifierConfig {
            attribute: attribute.to_string(),
            modifier_op: ModifierOp::Additive,
            magnitude: 3.0,
            ..Default::default()
        }
    }

    #[test]
    fn test_scalar_fields() {
        let registry = ClassRegistry::builtin();
        let mut effect = EffectAsset::new("GE_Test", DEFAULT_EFFECT_CLASS);
        let config = EffectConfig {
            duration_magnitude: 5.0,
            period: 1.0,
            stack_limit_count: 3,
            ..Default::default()
        };
        assert_eq!(run(&registry, &mut effect, &config), 0);
        assert_eq!(effect.duration_magnitude, 5.0);
        assert_eq!(effect.period, 1.0);
        assert_eq!(effect.stack_limit_count, 3);
        assert_eq!(effect.components.count(), 0);
    }

    #[test]
    fn test_components_added_then_removed() {
        let registry = ClassRegistry::builtin();
        let mut effect = EffectAsset::new("GE_Test", DEFAULT_EFFECT_CLASS);
        let mut config = EffectConfig::default();
        config.asset_tags.add("Effect.Fire");
        config.granted_tags.add("State.Burning");
        config.ongoing_tag_requirements.ignore_tags.add("State.Wet");
        config.immunity_queries.push(EffectQueryConfig {
            match_any_owning_tags: TagContainer::parse("Effect.Ice"),
            ..Default::default()
        });
        run(&registry, &mut effect, &config);
        assert_eq!(effect.components.count(), 4);
        let requirements = effect.components.target_tag_requirements.as_ref().unwrap();
        assert!(requirements.ongoing.ignore_tags.contains("State.Wet"));
        assert!(requirements.application.require_tags.is_empty());

        effect.components.extension_mut("Custom").set("Value", 1);
        run(&registry, &mut effect, &EffectConfig::default());
        assert_eq!(effect.components.count(), 1);
        assert!(effect.components.extension("Custom").is_some());
    }

    #[test]
    fn test_query_match_all_overrides_match_any() {
        let query = convert_query(&EffectQueryConfig {
            match_any_owning_tags: TagContainer::parse("A, B"),
            match_all_owning_tags: TagContainer::parse("C"),
            match_no_owning_tags: TagContainer::parse("D"),
            match_any_source_tags: TagContainer::parse("E"),
            ..Default::default()
        });
        assert_eq!(query.owning_tag_query.mode, TagMatch::All);
        assert_eq!(query.owning_tag_query.tags, TagContainer::parse("C"));
        assert!(query.owning_tag_query.excluded.contains("D"));
        assert_eq!(query.effect_tag_query.mode, TagMatch::Any);
        assert!(query.effect_tag_query.tags.contains("E"));
    }

    #[test]
    fn test_unresolved_attribute_skips_modifier() {
        let registry = ClassRegistry::builtin();
        let mut effect = EffectAsset::new("GE_Test", DEFAULT_EFFECT_CLASS);
        let config = EffectConfig {
            modifiers: vec![modifier("Missing.Health"), modifier("TestAttributeSet.TestPropertyOne")],
            ..Default::default()
        };
        assert_eq!(run(&registry, &mut effect, &config), 1);
        assert_eq!(effect.modifiers.len(), 1);
        assert_eq!(effect.modifiers[0].attribute.name, "TestPropertyOne");
        assert_eq!(effect.modifiers[0].magnitude, Magnitude::FixedScalar { value: 3.0 });
    }

    #[test]
    fn test_attribute_based_magnitude() {
        let registry = ClassRegistry::builtin();
        let mut effect = EffectAsset::new("GE_Test", DEFAULT_EFFECT_CLASS);
        let mut resolved = modifier("TestAttributeSet.TestPropertyOne");
        resolved.magnitude_calculation_type = MagnitudeCalculationType::AttributeBased;
        resolved.attribute_based_config.backing_attribute = "TestAttributeSet.TestPropertyTwo".to_string();
        resolved.attribute_based_config.coefficient = 0.5;
        let mut unresolved = resolved.clone();
        unresolved.attribute_based_config.backing_attribute = "Nope.Nothing".to_string();

        let config = EffectConfig {
            modifiers: vec![resolved, unresolved],
            ..Default::default()
        };
        assert_eq!(run(&registry, &mut effect, &config), 1);
        assert_eq!(effect.modifiers.len(), 2);

        match &effect.modifiers[0].magnitude {
            Magnitude::AttributeBased {
                backing_attribute: Some(capture),
                coefficient,
                ..
            } => {
                assert_eq!(capture.attribute.name, "TestPropertyTwo");
                assert_eq!(capture.source, CaptureSource::Source);
                assert!(!capture.snapshot);
                assert_eq!(*coefficient, 0.5);
            }
            other => panic!("unexpected magnitude {:?}", other),
        }
        assert!(matches!(
            effect.modifiers[1].magnitude,
            Magnitude::AttributeBased { backing_attribute: None, .. }
        ));
    }

    #[test]
    fn test_custom_calculation_falls_back_to_scalar() {
        let mut registry = ClassRegistry::builtin();
        registry.register(ClassInfo::new("/Script/Game.ArmorCalc", ClassKind::MagnitudeCalculation));
        let mut effect = EffectAsset::new("GE_Test", DEFAULT_EFFECT_CLASS);

        let mut known = modifier("TestAttributeSet.TestPropertyOne");
        known.magnitude_calculation_type = MagnitudeCalculationType::CustomCalculationClass;
        known.custom_calculation_class = "/Script/Game.ArmorCalc".to_string();
        let mut unknown = known.clone();
        unknown.custom_calculation_class = "/Script/Game.Missing".to_string();

        let config = EffectConfig {
            modifiers: vec![known, unknown],
            ..Default::default()
        };
        assert_eq!(run(&registry, &mut effect, &config), 1);
        assert_eq!(
            effect.modifiers[0].magnitude,
            Magnitude::CustomCalculation {
                calculation_class: "/Script/Game.ArmorCalc".to_string()
            }
        );
        assert_eq!(effect.modifiers[1].magnitude, Magnitude::FixedScalar { value: 3.0 });
    }

    #[test]
    fn test_executions_and_cues_replaced() {
        let mut registry = ClassRegistry::builtin();
        registry.register(ClassInfo::new("/Script/Game.DamageExecution", ClassKind::ExecutionCalculation));
        let mut effect = EffectAsset::new("GE_Test", DEFAULT_EFFECT_CLASS);
        effect.gameplay_cues.push(GameplayCue::default());
        effect.gameplay_cues.push(GameplayCue::default());

        let config = EffectConfig {
            executions: vec![
                ExecutionConfig {
                    calculation_class: "/Script/Game.DamageExecution".to_string(),
                    ..Default::default()
                },
                ExecutionConfig::default(),
                ExecutionConfig {
                    // Abstract base classes never resolve
                    calculation_class: "/Script/GameplayAbilities.GameplayEffectExecutionCalculation".to_string(),
                    ..Default::default()
                },
            ],
            gameplay_cues: vec![GameplayCueConfig {
                gameplay_cue_tag: "GameplayCue.Burn".to_string(),
                min_level: 1.0,
                max_level: 5.0,
            }],
            ..Default::default()
        };
        assert_eq!(run(&registry, &mut effect, &config), 2);
        assert_eq!(effect.executions.len(), 1);
        assert_eq!(effect.gameplay_cues.len(), 1);
        assert!(effect.gameplay_cues[0].tags.contains("GameplayCue.Burn"));
        assert_eq!(effect.gameplay_cues[0].max_level, 5.0);
    }

    #[test]
    fn test_granted_abilities_resolve_classes_and_assets() {
        let registry = ClassRegistry::builtin();
        let mut store = MemoryAssetStore::new();
        let dash = resolve("Abilities/GA_Dash").unwrap();
        store
            .create(&dash, Asset::Ability(AbilityAsset::new("GA_Dash", DEFAULT_ABILITY_CLASS)))
            .unwrap();

        let mut effect = EffectAsset::new("GE_Test", DEFAULT_EFFECT_CLASS);
        let config = EffectConfig {
            granted_ability_classes: vec![
                "/Script/GameplayAbilities.GameplayAbility".to_string(),
                "/Game/Abilities/GA_Dash".to_string(),
                "/Game/Abilities/GA_Missing".to_string(),
            ],
            ..Default::default()
        };
        let mut ctx = FieldContext::new(&registry, &store, "GE_Test");
        apply(&mut effect, &config, &mut ctx);
        assert_eq!(ctx.warnings.len(), 1);
        let granted = &effect.components.abilities.as_ref().unwrap().grant_abilities;
        assert_eq!(
            granted,
            &vec![
                "/Script/GameplayAbilities.GameplayAbility".to_string(),
                "/Game/Abilities/GA_Dash.GA_Dash".to_string(),
            ]
        );
    }
}
