//! [`TargetRegistry`] – name → target object resolution.
//!
//! The runtime resolves its target by name on every tick, so a host can
//! add or replace objects while a session is running.  When the name
//! does not resolve the tick simply does nothing.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::target::TargetObject;

/// Host-side lookup of target objects by name.
pub trait TargetRegistry: Send {
    /// Resolve `name` to a writable target, or `None` if no such object
    /// exists right now.
    fn resolve(&mut self, name: &str) -> Option<&mut dyn TargetObject>;
}

/// A registry shared between the host's control path and its scheduler.
pub type SharedRegistry = Arc<Mutex<dyn TargetRegistry>>;

/// In-process [`TargetRegistry`] backed by a map of boxed targets.
///
/// Construct with [`SceneRegistry::new`] and register targets, or use
/// [`SimScene`][crate::sim::SimScene] to get one pre-populated.
#[derive(Default)]
pub struct SceneRegistry {
    targets: HashMap<String, Box<dyn TargetObject>>,
}

impl SceneRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a target.  Any previously registered target with the same
    /// name is replaced.
    pub fn register_target(&mut self, target: Box<dyn TargetObject>) {
        self.targets.insert(target.name().to_string(), target);
    }

    /// Read-only access to a registered target.
    pub fn get(&self, name: &str) -> Option<&dyn TargetObject> {
        match self.targets.get(name) {
            Some(target) => Some(target.as_ref()),
            None => None,
        }
    }

    /// Names of all registered targets, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.targets.keys().cloned().collect();
        names.sort();
        names
    }
}

impl TargetRegistry for SceneRegistry {
    fn resolve(&mut self, name: &str) -> Option<&mut dyn TargetObject> {
        match self.targets.get_mut(name) {
            Some(target) => Some(target.as_mut()),
            None => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::SimTarget;
    use vmcam_types::Vec3;

    #[test]
    fn resolve_registered_target() {
        let mut registry = SceneRegistry::new();
        registry.register_target(Box::new(SimTarget::new("Camera")));

        let target = registry.resolve("Camera").expect("registered");
        target.set_position(Vec3::new(0.0, 2.0, 1.0)).unwrap();

        assert_eq!(
            registry.get("Camera").unwrap().position(),
            Vec3::new(0.0, 2.0, 1.0)
        );
    }

    #[test]
    fn resolve_unknown_name_is_none() {
        let mut registry = SceneRegistry::new();
        registry.register_target(Box::new(SimTarget::new("Camera")));
        assert!(registry.resolve("Camera.001").is_none());
        assert!(registry.get("ghost").is_none());
    }

    #[test]
    fn re_registering_replaces_old_target() {
        let mut registry = SceneRegistry::new();
        registry.register_target(Box::new(SimTarget::new("Camera")));
        registry
            .resolve("Camera")
            .unwrap()
            .set_position(Vec3::new(5.0, 5.0, 5.0))
            .unwrap();

        registry.register_target(Box::new(SimTarget::new("Camera")));
        assert_eq!(registry.get("Camera").unwrap().position(), Vec3::zero());
        assert_eq!(registry.names(), vec!["Camera".to_string()]);
    }

    #[test]
    fn scene_registry_coerces_into_shared_registry() {
        let shared: SharedRegistry = Arc::new(Mutex::new(SceneRegistry::new()));
        let mut guard = shared.lock().unwrap();
        assert!(guard.resolve("Camera").is_none());
    }
}
