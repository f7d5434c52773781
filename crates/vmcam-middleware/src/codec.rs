//! Pose wire format.
//!
//! A datagram carries seven big-endian IEEE-754 `f32` values with no header,
//! length prefix, or type tag:
//!
//! | Offset | Field |
//! |---|---|
//! | 0 | `pos_x` |
//! | 4 | `pos_y` |
//! | 8 | `pos_z` |
//! | 12 | `quat_w` |
//! | 16 | `quat_x` |
//! | 20 | `quat_y` |
//! | 24 | `quat_z` |
//!
//! Only the first [`POSE_PACKET_LEN`] bytes are read; anything after them is
//! ignored.

use vmcam_types::{POSE_COMPONENTS, PoseSample, VmcError};

/// Size of one encoded pose frame in bytes.
pub const POSE_PACKET_LEN: usize = POSE_COMPONENTS * 4;

/// Decode the leading 28 bytes of `bytes` into a [`PoseSample`].
///
/// # Errors
///
/// Returns [`VmcError::MalformedPacket`] when fewer than
/// [`POSE_PACKET_LEN`] bytes are available.  Callers drop the packet and
/// keep listening.
pub fn decode(bytes: &[u8]) -> Result<PoseSample, VmcError> {
    let frame = bytes
        .get(..POSE_PACKET_LEN)
        .ok_or(VmcError::MalformedPacket {
            expected: POSE_PACKET_LEN,
            actual: bytes.len(),
        })?;

    let mut components = [0.0f32; POSE_COMPONENTS];
    for (value, chunk) in components.iter_mut().zip(frame.chunks_exact(4)) {
        *value = f32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
    }
    Ok(PoseSample::from_components(components))
}

/// Encode `sample` as a 28-byte frame.
pub fn encode(sample: &PoseSample) -> [u8; POSE_PACKET_LEN] {
    let mut frame = [0u8; POSE_PACKET_LEN];
    for (chunk, value) in frame.chunks_exact_mut(4).zip(sample.to_components()) {
        chunk.copy_from_slice(&value.to_be_bytes());
    }
    frame
}

#[cfg(test)]
mod tests {
    use super::*;
    use vmcam_types::{Quaternion, Vec3};

    fn be_frame(values: [f32; POSE_COMPONENTS]) -> Vec<u8> {
        values.iter().flat_map(|v| v.to_be_bytes()).collect()
    }

    #[test]
    fn decode_reads_seven_big_endian_floats() {
        let bytes = be_frame([0.0, 1.0, 2.0, 1.0, 0.0, 0.0, 0.0]);
        let pose = decode(&bytes).unwrap();
        assert_eq!(pose.position, Vec3::new(0.0, 1.0, 2.0));
        assert_eq!(pose.orientation, Quaternion::identity());
    }

    #[test]
    fn decode_known_bytes() {
        // 1.0f32 big-endian is 3F 80 00 00; -2.5 is C0 20 00 00.
        let mut bytes = vec![0u8; POSE_PACKET_LEN];
        bytes[0..4].copy_from_slice(&[0x3F, 0x80, 0x00, 0x00]);
        bytes[24..28].copy_from_slice(&[0xC0, 0x20, 0x00, 0x00]);
        let pose = decode(&bytes).unwrap();
        assert_eq!(pose.position.x, 1.0);
        assert_eq!(pose.orientation.z, -2.5);
        assert_eq!(pose.position.y, 0.0);
    }

    #[test]
    fn decode_ignores_trailing_bytes() {
        let mut bytes = be_frame([1.0, 2.0, 3.0, 0.5, 0.5, 0.5, 0.5]);
        bytes.extend_from_slice(&[0xFF; 13]);
        let pose = decode(&bytes).unwrap();
        assert_eq!(pose.to_components(), [1.0, 2.0, 3.0, 0.5, 0.5, 0.5, 0.5]);
    }

    #[test]
    fn decode_rejects_short_buffers() {
        for len in [0, 1, 4, 27] {
            let bytes = vec![0u8; len];
            let err = decode(&bytes).unwrap_err();
            assert_eq!(
                err,
                VmcError::MalformedPacket {
                    expected: POSE_PACKET_LEN,
                    actual: len
                }
            );
        }
    }

    #[test]
    fn decode_preserves_nan_bit_patterns() {
        let nan_bits = 0x7FC0_0001u32;
        let mut bytes = be_frame([0.0; POSE_COMPONENTS]);
        bytes[12..16].copy_from_slice(&nan_bits.to_be_bytes());
        let pose = decode(&bytes).unwrap();
        assert_eq!(pose.orientation.w.to_bits(), nan_bits);
    }

    #[test]
    fn encode_matches_sender_layout() {
        let sample = PoseSample::from_components([0.0, 1.0, 2.0, 1.0, 0.0, 0.0, 0.0]);
        let frame = encode(&sample);
        assert_eq!(frame.len(), POSE_PACKET_LEN);
        assert_eq!(&frame[4..8], &1.0f32.to_be_bytes());
        assert_eq!(&frame[12..16], &1.0f32.to_be_bytes());
        assert_eq!(decode(&frame).unwrap(), sample);
    }
}
