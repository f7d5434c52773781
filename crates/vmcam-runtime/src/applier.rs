//! [`PoseApplier`] – the per-tick consumer.
//!
//! Each tick:
//!
//! 1. **Check** – if the session's is-running flag has been cleared, or the
//!    receive thread has died, ask the receiver to stop and tell the
//!    scheduler to stop ticking.
//! 2. **Read** – copy the newest sample out of the [`SharedPoseSlot`].
//! 3. **Convert** – map it into the target convention.
//! 4. **Write** – resolve the target by name and set its position and
//!    orientation.  An unresolved name makes the tick a no-op.
//!
//! Nothing in a tick blocks.  The receive thread is joined by the session
//! once it has exited.

use std::sync::Arc;

use tracing::{debug, info, warn};
use vmcam_hal::registry::TargetRegistry;
use vmcam_hal::scheduler::TickControl;
use vmcam_middleware::SharedPoseSlot;
use vmcam_transform::convert;
use vmcam_types::VmcError;

use crate::session::{ControlSurface, SessionState};

/// Applies the latest received pose to a named target once per tick.
pub struct PoseApplier {
    slot: SharedPoseSlot,
    controls: Arc<ControlSurface>,
    /// The session run this applier belongs to.
    generation: u64,
    /// Name of the target that was last reported missing, to warn once per
    /// miss streak instead of once per tick.
    missing_target: Option<String>,
}

impl PoseApplier {
    pub fn new(slot: SharedPoseSlot, controls: Arc<ControlSurface>, generation: u64) -> Self {
        Self {
            slot,
            controls,
            generation,
            missing_target: None,
        }
    }

    /// Run one tick against `registry`.
    pub fn apply(&mut self, registry: &mut dyn TargetRegistry) -> TickControl {
        if !self.should_continue() {
            return TickControl::Stop;
        }
        self.write_pose(registry);
        TickControl::Continue
    }

    /// Lifecycle half of a tick.  Returns `false` when the periodic callback
    /// must end, after asking the receiver to stop.
    pub fn should_continue(&mut self) -> bool {
        if self.controls.generation() != self.generation {
            return false;
        }

        if !self.controls.is_running() {
            self.controls.set_state(SessionState::Stopping);
            self.controls.stop_receiver();
            info!(session = %self.controls.session_id(), "applier stopped");
            return false;
        }

        if self.controls.receiver_finished() {
            warn!(session = %self.controls.session_id(), "receiver thread exited; stopping session");
            self.controls.set_running(false);
            self.controls.set_state(SessionState::Stopping);
            return false;
        }

        true
    }

    /// Convert the newest sample and write it onto the named target.
    pub fn write_pose(&mut self, registry: &mut dyn TargetRegistry) {
        let pose = convert(&self.slot.read());
        let name = self.controls.camera_name();

        let Some(target) = registry.resolve(&name) else {
            if self.missing_target.as_deref() != Some(name.as_str()) {
                let err = VmcError::TargetNotFound(name.clone());
                warn!(session = %self.controls.session_id(), error = %err, "skipping tick");
                self.missing_target = Some(name);
            }
            return;
        };
        self.missing_target = None;

        if let Err(e) = target
            .set_position(pose.position)
            .and_then(|()| target.set_orientation(pose.orientation))
        {
            debug!(target_name = %name, error = %e, "target rejected pose write");
        }
    }
}

impl Drop for PoseApplier {
    fn drop(&mut self) {
        if self.controls.generation() == self.generation && self.controls.is_running() {
            self.controls.set_running(false);
            self.controls.set_state(SessionState::Stopping);
            self.controls.stop_receiver();
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
