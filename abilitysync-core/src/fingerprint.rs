//! Object state fingerprints
//!
//! A fingerprint is the byte encoding of an asset's own fields followed by
//! its sub-components sorted by name. Every value is length framed so two
//! adjacent fields can never alias, and floats are written by bit pattern.
//! Object references are plain path strings, so two distinct assets with
//! the same state produce the same bytes.

use serde::Serialize;

use crate::types::{
    AbilitiesComponent, AbilityAsset, EffectAsset, ExtensionComponent, QueriesComponent,
    TagContainer, TagsComponent, TargetTagRequirementsComponent,
};

/// A named sub-object owned by another object
pub struct SubObject<'a> {
    pub name: String,
    pub object: &'a dyn ObjectState,
}

impl<'a> SubObject<'a> {
    pub fn new(name: &str, object: &'a dyn ObjectState) -> Self {
        Self {
            name: name.to_string(),
            object,
        }
    }
}

/// Objects that can be fingerprinted
pub trait ObjectState {
    /// Write the object's own fields
    fn write_state(&self, out: &mut StateWriter);

    /// Owned sub-objects, in any order
    fn sub_objects(&self) -> Vec<SubObject<'_>> {
        Vec::new()
    }
}

/// Framed byte writer
#[derive(Debug, Default)]
pub struct StateWriter {
    bytes: Vec<u8>,
}

impl StateWriter {
    pub fn new() -> Self {
        Self::default()
    }

    fn frame(&mut self, data: &[u8]) {
        self.bytes.extend_from_slice(&(data.len() as u32).to_le_bytes());
        self.bytes.extend_from_slice(data);
    }

    pub fn write_u32(&mut self, value: u32) {
        self.frame(&value.to_le_bytes());
    }

    pub fn write_i32(&mut self, value: i32) {
        self.frame(&value.to_le_bytes());
    }

    pub fn write_f32(&mut self, value: f32) {
        self.frame(&value.to_bits().to_le_bytes());
    }

    pub fn write_bool(&mut self, value: bool) {
        self.frame(&[value as u8]);
    }

    pub fn write_str(&mut self, value: &str) {
        self.frame(value.as_bytes());
    }

    pub fn write_opt_str(&mut self, value: Option<&str>) {
        match value {
            Some(value) => {
                self.write_bool(true);
                self.write_str(value);
            }
            None => self.write_bool(false),
        }
    }

    pub fn write_tags(&mut self, tags: &TagContainer) {
        self.write_u32(tags.len() as u32);
        for tag in tags.iter() {
            self.write_str(tag);
        }
    }

    /// Write any serializable value as compact JSON
    pub fn write_json<T: Serialize + ?Sized>(&mut self, value: &T) {
        match serde_json::to_vec(value) {
            Ok(json) => self.frame(&json),
            Err(e) => {
                tracing::warn!("Failed to encode state value: {}", e);
                self.frame(&[]);
            }
        }
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

fn write_object<T: ObjectState + ?Sized>(object: &T, out: &mut StateWriter) {
    object.write_state(out);

    let mut subs = object.sub_objects();
    subs.sort_by(|a, b| a.name.cmp(&b.name));

    out.write_u32(subs.len() as u32);
    for sub in subs {
        out.write_str(&sub.name);
        write_object(sub.object, out);
    }
}

/// Deterministic byte state of `object` and everything it owns
pub fn fingerprint<T: ObjectState + ?Sized>(object: &T) -> Vec<u8> {
    let mut out = StateWriter::new();
    write_object(object, &mut out);
    out.into_bytes()
}

macro_rules! json_state {
    ($($ty:ty),* $(,)?) => {
        $(
            impl ObjectState for $ty {
                fn write_state(&self, out: &mut StateWriter) {
                    out.write_json(self);
                }
            }
        )*
    };
}

json_state!(
    TargetTagRequirementsComponent,
    TagsComponent,
    AbilitiesComponent,
    QueriesComponent,
    ExtensionComponent,
);

impl ObjectState for EffectAsset {
    fn write_state(&self, out: &mut StateWriter) {
        out.write_str(&self.name);
        out.write_str(&self.class);
        out.write_json(&self.duration_policy);
        out.write_f32(self.duration_magnitude);
        out.write_f32(self.period);
        out.write_json(&self.stacking_type);
        out.write_i32(self.stack_limit_count);
        out.write_json(&self.stack_duration_refresh_policy);
        out.write_json(&self.stack_period_reset_policy);
        out.write_json(&self.modifiers);
        out.write_json(&self.gameplay_cues);
        out.write_json(&self.executions);
    }

    fn sub_objects(&self) -> Vec<SubObject<'_>> {
        let c = &self.components;
        let mut subs = Vec::new();

        if let Some(component) = &c.target_tag_requirements {
            subs.push(SubObject::new("TargetTagRequirementsGameplayEffectComponent", component));
        }
        if let Some(component) = &c.asset_tags {
            subs.push(SubObject::new("AssetTagsGameplayEffectComponent", component));
        }
        if let Some(component) = &c.target_tags {
            subs.push(SubObject::new("TargetTagsGameplayEffectComponent", component));
        }
        if let Some(component) = &c.block_ability_tags {
            subs.push(SubObject::new("BlockAbilityTagsGameplayEffectComponent", component));
        }
        if let Some(component) = &c.cancel_ability_tags {
            subs.push(SubObject::new("CancelAbilityTagsGameplayEffectComponent", component));
        }
        if let Some(component) = &c.abilities {
            subs.push(SubObject::new("AbilitiesGameplayEffectComponent", component));
        }
        if let Some(component) = &c.immunity {
            subs.push(SubObject::new("ImmunityGameplayEffectComponent", component));
        }
        if let Some(component) = &c.remove_other {
            subs.push(SubObject::new("RemoveOtherGameplayEffectComponent", component));
        }
        for (name, component) in &c.extensions {
            subs.push(SubObject::new(name, component));
        }

        subs
    }
}

impl ObjectState for AbilityAsset {
    fn write_state(&self, out: &mut StateWriter) {
        out.write_str(&self.name);
        out.write_str(&self.class);
        out.write_opt_str(self.cost_gameplay_effect.as_deref());
        out.write_opt_str(self.cooldown_gameplay_effect.as_deref());

        for tags in [
            &self.ability_tags,
            &self.cancel_abilities_with_tag,
            &self.block_abilities_with_tag,
            &self.activation_owned_tags,
            &self.activation_required_tags,
            &self.activation_blocked_tags,
            &self.source_required_tags,
            &self.source_blocked_tags,
            &self.target_required_tags,
            &self.target_blocked_tags,
        ] {
            out.write_tags(tags);
        }

        out.write_json(&self.ability_triggers);
        out.write_bool(self.server_respects_remote_ability_cancellation);
        out.write_bool(self.replicate_input_directly);
        out.write_bool(self.retrigger_instanced_ability);
        out.write_json(&self.net_execution_policy);
        out.write_json(&self.net_security_policy);
        out.write_json(&self.instancing_policy);
        out.write_json(&self.replication_policy);
        out.write_json(&self.properties);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DurationType, TagsComponent};

    fn effect() -> EffectAsset {
        EffectAsset::new("GE_Burn", "/Script/GameplayAbilities.GameplayEffect")
    }

    #[test]
    fn test_fingerprint_is_stable() {
        let a = effect();
        assert_eq!(fingerprint(&a), fingerprint(&a));
        assert_eq!(fingerprint(&a), fingerprint(&a.clone()));
    }

    #[test]
    fn test_fingerprint_tracks_fields() {
        let base = effect();
        let mut changed = effect();
        changed.duration_policy = DurationType::HasDuration;
        assert_ne!(fingerprint(&base), fingerprint(&changed));

        let mut changed = effect();
        changed.period = 0.5;
        assert_ne!(fingerprint(&base), fingerprint(&changed));
    }

    #[test]
    fn test_fingerprint_tracks_components() {
        let base = effect();
        let mut with_tags = effect();
        with_tags.components.asset_tags = Some(TagsComponent::default());
        assert_ne!(fingerprint(&base), fingerprint(&with_tags));

        let mut with_extension = effect();
        with_extension.components.extension_mut("TestGameplayEffectComponent");
        assert_ne!(fingerprint(&base), fingerprint(&with_extension));
        assert_ne!(fingerprint(&with_tags), fingerprint(&with_extension));
    }

    #[test]
    fn test_sub_objects_sorted_by_name() {
        let mut a = effect();
        a.components.extension_mut("Zeta").set("Value", 1);
        a.components.extension_mut("Alpha").set("Value", 2);

        let mut writer = StateWriter::new();
        write_object(&a, &mut writer);
        let bytes = writer.into_bytes();
        let alpha = bytes.windows(5).position(|w| w == b"Alpha").unwrap();
        let zeta = bytes.windows(4).position(|w| w == b"Zeta").unwrap();
        assert!(alpha < zeta);
    }

    #[test]
    fn test_framing_prevents_aliasing() {
        let mut a = StateWriter::new();
        a.write_str("ab");
        a.write_str("c");
        let mut b = StateWriter::new();
        b.write_str("a");
        b.write_str("bc");
        assert_ne!(a.into_bytes(), b.into_bytes());
    }

    #[test]
    fn test_ability_fingerprint_tracks_cost() {
        let base = AbilityAsset::new("GA_Dash", "/Script/GameplayAbilities.GameplayAbility");
        let mut with_cost = base.clone();
        with_cost.cost_gameplay_effect = Some("/Game/GameplayEffects/GE_Cost.GE_Cost_C".to_string());
        assert_ne!(fingerprint(&base), fingerprint(&with_cost));

        let mut with_empty = base.clone();
        with_empty.cost_gameplay_effect = Some(String::new());
        assert_ne!(fingerprint(&base), fingerprint(&with_empty));
    }
}
