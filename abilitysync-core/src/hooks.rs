//! Post-process hooks
//!
//! Projects that extend the config rows with their own fields register
//! listeners here. Listeners run after the built-in fields are applied and
//! before the dirty decision, so whatever they change is part of the
//! "after" fingerprint.

use std::panic::{catch_unwind, AssertUnwindSafe};

use crate::types::{AbilityAsset, AbilityConfig, EffectAsset, EffectConfig};

type Listener<C, T> = Box<dyn Fn(&C, &mut T) -> anyhow::Result<()>>;

/// Ordered list of listeners for one config/asset pair
pub struct HookList<C, T> {
    listeners: Vec<(String, Listener<C, T>)>,
}

impl<C, T> Default for HookList<C, T> {
    fn default() -> Self {
        Self {
            listeners: Vec::new(),
        }
    }
}

impl<C, T> std::fmt::Debug for HookList<C, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.listeners.iter().map(|(name, _)| name))
            .finish()
    }
}

impl<C, T> HookList<C, T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a listener; listeners run in registration order
    pub fn register<F>(&mut self, name: &str, listener: F)
    where
        F: Fn(&C, &mut T) -> anyhow::Result<()> + 'static,
    {
        self.listeners.push((name.to_string(), Box::new(listener)));
    }

    /// Remove every listener registered under `name`
    pub fn unregister(&mut self, name: &str) -> usize {
        let before = self.listeners.len();
        self.listeners.retain(|(registered, _)| registered != name);
        before - self.listeners.len()
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    /// Run every listener; returns how many failed.
    ///
    /// A listener that errors or panics is logged and skipped, the rest
    /// still run.
    pub fn notify(&self, config: &C, target: &mut T) -> usize {
        let mut failures = 0;
        for (name, listener) in &self.listeners {
            match catch_unwind(AssertUnwindSafe(|| listener(config, target))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    tracing::warn!("Hook '{}' failed: {:#}", name, e);
                    failures += 1;
                }
                Err(panic) => {
                    let message = panic
                        .downcast_ref::<&str>()
                        .map(|s| s.to_string())
                        .or_else(|| panic.downcast_ref::<String>().cloned())
                        .unwrap_or_else(|| "unknown panic".to_string());
                    tracing::error!("Hook '{}' panicked: {}", name, message);
                    failures += 1;
                }
            }
        }
        failures
    }
}

/// Hook lists for both asset kinds
#[derive(Debug, Default)]
pub struct ExtensionHooks {
    pub effects: HookList<EffectConfig, EffectAsset>,
    pub abilities: HookList<AbilityConfig, AbilityAsset>,
}

impl ExtensionHooks {
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn asset() -> EffectAsset {
        EffectAsset::new("GE_Test", "/Script/GameplayAbilities.GameplayEffect")
    }

    #[test]
    fn test_listeners_run_in_order() {
        let order = Rc::new(RefCell::new(Vec::new()));
        let mut hooks: HookList<EffectConfig, EffectAsset> = HookList::new();
        for name in ["first", "second", "third"] {
            let order = Rc::clone(&order);
            hooks.register(name, move |_, _| {
                order.borrow_mut().push(name);
                Ok(())
            });
        }

        let failures = hooks.notify(&EffectConfig::default(), &mut asset());
        assert_eq!(failures, 0);
        assert_eq!(*order.borrow(), vec!["first", "second", "third"]);
    }

    #[test]
    fn test_failures_do_not_stop_later_listeners() {
        let mut hooks: HookList<EffectConfig, EffectAsset> = HookList::new();
        hooks.register("errors", |_, _| anyhow::bail!("bad row"));
        hooks.register("panics", |_, _| panic!("listener bug"));
        hooks.register("writes", |config, target| {
            target.period = config.period;
            Ok(())
        });

        let config = EffectConfig {
            period: 3.0,
            ..Default::default()
        };
        let mut target = asset();
        assert_eq!(hooks.notify(&config, &mut target), 2);
        assert_eq!(target.period, 3.0);
    }

    #[test]
    fn test_unregister() {
        let mut hooks: HookList<AbilityConfig, AbilityAsset> = HookList::new();
        hooks.register("sample", |_, _| Ok(()));
        hooks.register("other", |_, _| Ok(()));
        hooks.register("sample", |_, _| Ok(()));
        assert_eq!(hooks.unregister("sample"), 2);
        assert_eq!(hooks.len(), 1);
        assert!(!hooks.is_empty());
    }
}
