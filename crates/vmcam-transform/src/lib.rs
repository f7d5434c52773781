//! `vmcam-transform` – coordinate-system conversion.
//!
//! The tracking source reports poses in a left-handed, Z-forward frame.  The
//! consumer works in a right-handed, Z-up frame whose cameras look down their
//! local -Z axis.  Everything needed to move a pose from one to the other
//! lives here.
//!
//! # Modules
//!
//! - [`convert`] – [`convert`][convert::convert]: axis remap of position and
//!   orientation followed by the fixed [`BASIS_CORRECTION`][convert::BASIS_CORRECTION]
//!   rotation.

pub mod convert;

pub use convert::{BASIS_CORRECTION, ConvertedPose, convert};
