//! Generic `TargetObject` trait for anything a pose can be written onto.
//!
//! Hosts implement this trait for their scene objects and register them with
//! a [`TargetRegistry`][crate::registry::TargetRegistry].  The runtime only
//! ever talks to the trait.

use vmcam_types::{Quaternion, Vec3, VmcError};

/// A named object with a writable transform (camera, empty, rigid body, …).
pub trait TargetObject: Send {
    /// Name the object is resolved by, e.g. `"Camera"`.
    fn name(&self) -> &str;

    /// Write the object's location.
    ///
    /// # Errors
    ///
    /// Implementations may return [`VmcError::TargetNotFound`] if the object
    /// was removed from the host between resolution and the write.
    fn set_position(&mut self, position: Vec3) -> Result<(), VmcError>;

    /// Write the object's rotation.  The object is expected to switch to
    /// quaternion rotation mode if it has one.
    fn set_orientation(&mut self, orientation: Quaternion) -> Result<(), VmcError>;

    /// Most recently written location.
    fn position(&self) -> Vec3;

    /// Most recently written rotation.
    fn orientation(&self) -> Quaternion;
}
