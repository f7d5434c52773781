//! Source-to-target pose conversion.
//!
//! The conversion runs in three steps:
//!
//! ```text
//! position     = (src.x, src.z, src.y)
//! raw_rotation = (w: src.w, x: src.x, y: -src.z, z: src.y)
//! orientation  = raw_rotation * BASIS_CORRECTION
//! ```
//!
//! The transform is not self-inverse; applying it twice does not recover
//! the input.
//!
//! # Example
//!
//! ```rust
//! use vmcam_transform::convert::{convert, BASIS_CORRECTION};
//! use vmcam_types::{PoseSample, Quaternion, Vec3};
//!
//! let sample = PoseSample::new(Vec3::new(1.0, 2.0, 3.0), Quaternion::identity());
//! let pose = convert(&sample);
//!
//! assert_eq!(pose.position, Vec3::new(1.0, 3.0, 2.0));
//! assert_eq!(pose.orientation, BASIS_CORRECTION);
//! ```

use std::f32::consts::FRAC_1_SQRT_2;

use vmcam_types::{PoseSample, Quaternion, Vec3};

// ────────────────────────────────────────────────────────────────────────────
// Constants
// ────────────────────────────────────────────────────────────────────────────

/// 90° about the local X axis: `(cos 45°, sin 45°, 0, 0)`.
///
/// Stands the camera up: the source camera looks along +Z while the target
/// camera looks down its local -Z.
pub const BASIS_CORRECTION: Quaternion =
    Quaternion::new(FRAC_1_SQRT_2, FRAC_1_SQRT_2, 0.0, 0.0);

// ────────────────────────────────────────────────────────────────────────────
// Output type
// ────────────────────────────────────────────────────────────────────────────

/// A pose expressed in the target convention, ready to be written onto a
/// target object's transform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConvertedPose {
    pub position: Vec3,
    pub orientation: Quaternion,
}

// ────────────────────────────────────────────────────────────────────────────
// Conversion
// ────────────────────────────────────────────────────────────────────────────

/// Swap the second and third components (forward/up flip).
pub fn remap_position(p: Vec3) -> Vec3 {
    Vec3::new(p.x, p.z, p.y)
}

/// Handedness flip matching [`remap_position`], before basis correction.
pub fn remap_orientation(q: Quaternion) -> Quaternion {
    Quaternion::new(q.w, q.x, -q.z, q.y)
}

/// Convert a source-convention [`PoseSample`] into the target convention.
///
/// Pure and infallible: any finite quaternion is accepted, unit length or
/// not.
pub fn convert(sample: &PoseSample) -> ConvertedPose {
    ConvertedPose {
        position: remap_position(sample.position),
        orientation: remap_orientation(sample.orientation).mul(BASIS_CORRECTION),
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: Quaternion, b: Quaternion) -> bool {
        (a.w - b.w).abs() < 1e-6
            && (a.x - b.x).abs() < 1e-6
            && (a.y - b.y).abs() < 1e-6
            && (a.z - b.z).abs() < 1e-6
    }

    // ── Position ────────────────────────────────────────────────────────────

    #[test]
    fn position_swaps_second_and_third_axes() {
        let sample = PoseSample::new(Vec3::new(1.0, 2.0, 3.0), Quaternion::identity());
        assert_eq!(convert(&sample).position, Vec3::new(1.0, 3.0, 2.0));
    }

    #[test]
    fn position_of_e2e_packet() {
        let sample = PoseSample::from_components([0.0, 1.0, 2.0, 1.0, 0.0, 0.0, 0.0]);
        assert_eq!(convert(&sample).position, Vec3::new(0.0, 2.0, 1.0));
    }

    // ── Orientation ─────────────────────────────────────────────────────────

    #[test]
    fn identity_rotation_yields_basis_correction_alone() {
        let sample = PoseSample::new(Vec3::zero(), Quaternion::identity());
        assert_eq!(convert(&sample).orientation, BASIS_CORRECTION);
    }

    #[test]
    fn remap_orientation_permutes_and_negates() {
        let q = Quaternion::new(0.1, 0.2, 0.3, 0.4);
        assert_eq!(remap_orientation(q), Quaternion::new(0.1, 0.2, -0.4, 0.3));
    }

    #[test]
    fn source_yaw_becomes_target_z_rotation() {
        // 90° about the source's vertical (Y) axis remaps to a rotation about
        // the target's vertical (Z) axis, then gets the basis correction.
        let yaw = Quaternion::new(FRAC_1_SQRT_2, 0.0, FRAC_1_SQRT_2, 0.0);
        let sample = PoseSample::new(Vec3::zero(), yaw);
        let expected =
            Quaternion::new(FRAC_1_SQRT_2, 0.0, 0.0, FRAC_1_SQRT_2).mul(BASIS_CORRECTION);
        assert!(approx_eq(convert(&sample).orientation, expected));
        // (0.5, 0.5, 0.5, 0.5)
        assert!(approx_eq(
            convert(&sample).orientation,
            Quaternion::new(0.5, 0.5, 0.5, 0.5)
        ));
    }

    #[test]
    fn zero_quaternion_stays_zero() {
        let pose = convert(&PoseSample::zero());
        assert_eq!(pose.position, Vec3::zero());
        assert_eq!(pose.orientation, Quaternion::new(0.0, 0.0, 0.0, 0.0));
    }

    #[test]
    fn non_unit_quaternion_is_accepted_unnormalised() {
        let sample = PoseSample::new(Vec3::zero(), Quaternion::new(2.0, 0.0, 0.0, 0.0));
        let q = convert(&sample).orientation;
        assert!(approx_eq(
            q,
            Quaternion::new(2.0 * FRAC_1_SQRT_2, 2.0 * FRAC_1_SQRT_2, 0.0, 0.0)
        ));
    }

    // ── Purity ──────────────────────────────────────────────────────────────

    #[test]
    fn conversion_is_deterministic_bit_for_bit() {
        let sample = PoseSample::from_components([0.3, -1.7, 9.25, 0.9, 0.1, -0.3, 0.2]);
        let a = convert(&sample);
        let b = convert(&sample);
        assert_eq!(a.position.x.to_bits(), b.position.x.to_bits());
        assert_eq!(a.orientation.w.to_bits(), b.orientation.w.to_bits());
        assert_eq!(a.orientation.z.to_bits(), b.orientation.z.to_bits());
        assert_eq!(a, b);
    }

    #[test]
    fn conversion_is_not_self_inverse() {
        let sample = PoseSample::from_components([1.0, 2.0, 3.0, 1.0, 0.0, 0.0, 0.0]);
        let once = convert(&sample);
        let twice = convert(&PoseSample::new(once.position, once.orientation));
        assert_ne!(twice.orientation, sample.orientation);
    }
}
