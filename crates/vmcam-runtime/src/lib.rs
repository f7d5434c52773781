//! `vmcam-runtime` – The Control Loop
//!
//! Wires the receiver, the conversion, and the host's target objects into a
//! start/stop-able session.
//!
//! # Modules
//!
//! - [`session`] – [`Session`]: owns one receive-and-apply pipeline, its
//!   lifecycle state, and the is-running flag that guards against double
//!   starts.  Replaces a process-wide singleton receiver with an explicit
//!   value, so independent sessions can coexist on different ports.
//! - [`applier`] – [`PoseApplier`]: the periodic callback registered with the
//!   host [`Scheduler`][vmcam_hal::Scheduler].  Every tick it reads the
//!   newest sample, converts it, and writes it onto the named target; it
//!   also asks the receiver to exit when the session stops, and ends the
//!   session when the receiver fails.
//! - [`telemetry`] – [`init_tracing`]: global `tracing` subscriber with an
//!   optional OTLP span exporter (`OTEL_EXPORTER_OTLP_ENDPOINT`).

pub mod applier;
pub mod session;
pub mod telemetry;

pub use applier::PoseApplier;
pub use session::{
    ControlSurface, DEFAULT_CAMERA_NAME, DEFAULT_PORT, DEFAULT_TICK_INTERVAL, Session,
    SessionConfig, SessionState, StartOutcome,
};
pub use telemetry::{LogFormat, TracerProviderGuard, init_tracing};
