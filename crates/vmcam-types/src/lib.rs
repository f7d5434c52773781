use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A 3-D position vector.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    /// Create a new vector.
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// The zero vector.
    pub const fn zero() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }
}

/// A rotation quaternion (w, x, y, z convention).
///
/// Unit length is expected by convention but never enforced: the tracking
/// source is trusted and normalisation is left to whoever consumes the pose.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Quaternion {
    pub w: f32,
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Quaternion {
    pub const fn new(w: f32, x: f32, y: f32, z: f32) -> Self {
        Self { w, x, y, z }
    }

    /// The identity rotation (no rotation).
    pub const fn identity() -> Self {
        Self::new(1.0, 0.0, 0.0, 0.0)
    }

    /// Hamilton product: `self` followed by `rhs` in the local frame.
    pub fn mul(self, rhs: Self) -> Self {
        Self::new(
            self.w * rhs.w - self.x * rhs.x - self.y * rhs.y - self.z * rhs.z,
            self.w * rhs.x + self.x * rhs.w + self.y * rhs.z - self.z * rhs.y,
            self.w * rhs.y - self.x * rhs.z + self.y * rhs.w + self.z * rhs.x,
            self.w * rhs.z + self.x * rhs.y - self.y * rhs.x + self.z * rhs.w,
        )
    }
}

/// Number of scalar components carried by one [`PoseSample`].
pub const POSE_COMPONENTS: usize = 7;

/// One decoded pose from the tracking source, still in the sender's
/// convention (left-handed, Z-forward).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PoseSample {
    pub position: Vec3,
    pub orientation: Quaternion,
}

impl PoseSample {
    pub const fn new(position: Vec3, orientation: Quaternion) -> Self {
        Self {
            position,
            orientation,
        }
    }

    /// All seven components zero.  Note the orientation is the zero
    /// quaternion, not the identity: this is what a consumer sees before the
    /// first packet arrives.
    pub const fn zero() -> Self {
        Self::new(Vec3::zero(), Quaternion::new(0.0, 0.0, 0.0, 0.0))
    }

    /// Build a sample from wire order
    /// `[pos_x, pos_y, pos_z, quat_w, quat_x, quat_y, quat_z]`.
    pub const fn from_components(c: [f32; POSE_COMPONENTS]) -> Self {
        Self::new(
            Vec3::new(c[0], c[1], c[2]),
            Quaternion::new(c[3], c[4], c[5], c[6]),
        )
    }

    /// Flatten back into wire order.
    pub const fn to_components(&self) -> [f32; POSE_COMPONENTS] {
        let p = self.position;
        let q = self.orientation;
        [p.x, p.y, p.z, q.w, q.x, q.y, q.z]
    }
}

/// Global error type spanning socket setup, wire decoding, and target
/// resolution failures.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum VmcError {
    #[error("Bind Error on {addr}: {details}")]
    Bind { addr: String, details: String },

    #[error("Malformed Packet: expected at least {expected} bytes, got {actual}")]
    MalformedPacket { expected: usize, actual: usize },

    #[error("Transport Error: {0}")]
    Transport(String),

    #[error("Target Not Found: {0}")]
    TargetNotFound(String),

    #[error("Configuration Error: {0}")]
    Config(String),
}
