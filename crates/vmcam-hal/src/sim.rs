//! In-process simulated scene for headless runs and CI.
//!
//! [`SimScene`] builds a [`SceneRegistry`] pre-populated with [`SimTarget`]s
//! that simply record the transform written onto them.  The CLI uses one as
//! its target object, and tests assert on it.
//!
//! # Example
//!
//! ```rust
//! use vmcam_hal::registry::TargetRegistry;
//! use vmcam_hal::sim::SimScene;
//! use vmcam_types::Vec3;
//!
//! let mut scene = SimScene::new().with_camera("Camera").build();
//! scene
//!     .resolve("Camera")
//!     .expect("camera registered")
//!     .set_position(Vec3::new(0.0, 2.0, 1.0))
//!     .expect("sim write must succeed");
//! ```

use vmcam_types::{Quaternion, Vec3, VmcError};

use crate::registry::SceneRegistry;
use crate::target::TargetObject;

// ────────────────────────────────────────────────────────────────────────────
// Stub target
// ────────────────────────────────────────────────────────────────────────────

/// A simulated object that records its most recent transform.  Always
/// succeeds.
#[derive(Debug)]
pub struct SimTarget {
    name: String,
    position: Vec3,
    orientation: Quaternion,
}

impl SimTarget {
    /// Create a simulated target at the origin with identity rotation.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            position: Vec3::zero(),
            orientation: Quaternion::identity(),
        }
    }
}

impl TargetObject for SimTarget {
    fn name(&self) -> &str {
        &self.name
    }

    fn set_position(&mut self, position: Vec3) -> Result<(), VmcError> {
        self.position = position;
        Ok(())
    }

    fn set_orientation(&mut self, orientation: Quaternion) -> Result<(), VmcError> {
        self.orientation = orientation;
        Ok(())
    }

    fn position(&self) -> Vec3 {
        self.position
    }

    fn orientation(&self) -> Quaternion {
        self.orientation
    }
}

// ────────────────────────────────────────────────────────────────────────────
// SimScene builder
// ────────────────────────────────────────────────────────────────────────────

/// Builder that produces a [`SceneRegistry`] populated with simulated
/// targets.
#[derive(Default)]
pub struct SimScene {
    targets: Vec<Box<dyn TargetObject>>,
}

impl SimScene {
    /// Create an empty [`SimScene`] builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a simulated camera with the given name.
    pub fn with_camera(mut self, name: impl Into<String>) -> Self {
        self.targets.push(Box::new(SimTarget::new(name)));
        self
    }

    /// Register a custom target.  Useful when a test needs a target that
    /// fails or tracks calls.
    pub fn with_target(mut self, target: Box<dyn TargetObject>) -> Self {
        self.targets.push(target);
        self
    }

    /// Consume the builder and return a fully configured [`SceneRegistry`].
    pub fn build(self) -> SceneRegistry {
        let mut registry = SceneRegistry::new();
        for t in self.targets {
            registry.register_target(t);
        }
        registry
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
