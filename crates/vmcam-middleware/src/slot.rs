//! [`SharedPoseSlot`] – latest-sample hand-off between threads.
//!
//! The receive thread overwrites the slot on every decoded packet; the
//! consumer copies it out on every tick.  There is no queue: when the
//! consumer is slower than the producer, intermediate samples are lost.
//!
//! The sample is copied in and out under a short [`RwLock`] critical
//! section, so a reader always observes a whole sample from one write and
//! never a mix of fields from two.

use std::sync::{Arc, PoisonError, RwLock};

use vmcam_types::PoseSample;

/// Single-slot, last-write-wins holder for the newest [`PoseSample`].
///
/// Clone it cheaply – all clones share the same slot.
#[derive(Debug, Clone, Default)]
pub struct SharedPoseSlot {
    inner: Arc<RwLock<PoseSample>>,
}

impl SharedPoseSlot {
    /// Create a slot holding [`PoseSample::zero`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the stored sample unconditionally.
    pub fn write(&self, sample: PoseSample) {
        // A poisoned lock still guards a whole `Copy` value; keep going.
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        *guard = sample;
    }

    /// Copy out the stored sample.  Never fails.
    pub fn read(&self) -> PoseSample {
        *self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::thread;

    #[test]
    fn fresh_slot_reads_zero_pose() {
        let slot = SharedPoseSlot::new();
        assert_eq!(slot.read(), PoseSample::zero());
    }

    #[test]
    fn last_write_wins() {
        let slot = SharedPoseSlot::new();
        slot.write(PoseSample::from_components([1.0; 7]));
        slot.write(PoseSample::from_components([2.0; 7]));
        assert_eq!(slot.read(), PoseSample::from_components([2.0; 7]));
    }

    #[test]
    fn clones_share_the_same_slot() {
        let writer = SharedPoseSlot::new();
        let reader = writer.clone();
        writer.write(PoseSample::from_components([3.0; 7]));
        assert_eq!(reader.read(), PoseSample::from_components([3.0; 7]));
    }

    #[test]
    fn concurrent_reads_never_observe_torn_samples() {
        // Every write stores a sample whose seven components are identical,
        // so a torn read would show up as mixed components.
        let slot = SharedPoseSlot::new();
        let done = Arc::new(AtomicBool::new(false));

        let writer = {
            let slot = slot.clone();
            let done = done.clone();
            thread::spawn(move || {
                for i in 1..=20_000u32 {
                    slot.write(PoseSample::from_components([i as f32; 7]));
                }
                done.store(true, Ordering::SeqCst);
            })
        };

        let mut reads = 0u64;
        while !done.load(Ordering::SeqCst) || reads == 0 {
            let c = slot.read().to_components();
            assert!(
                c.iter().all(|v| v.to_bits() == c[0].to_bits()),
                "torn read: {c:?}"
            );
            assert!(c[0] >= 0.0 && c[0] <= 20_000.0);
            reads += 1;
        }

        writer.join().unwrap();
        assert_eq!(slot.read(), PoseSample::from_components([20_000.0; 7]));
    }
}
