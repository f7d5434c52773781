//! `vmcam-hal` – host collaborator interfaces.
//!
//! The receiver never talks to a concrete scene graph or event loop.  It
//! talks to the traits in this crate, and hosts (or tests) provide the
//! implementations.
//!
//! # Modules
//!
//! - [`target`] – [`TargetObject`]: anything with a writable position and
//!   orientation, typically a camera.
//! - [`registry`] – [`TargetRegistry`] name resolution plus the in-process
//!   [`SceneRegistry`].
//! - [`scheduler`] – [`Scheduler`] periodic-callback interface and the
//!   single-threaded [`LoopScheduler`].
//! - [`sim`] – [`SimTarget`] / [`SimScene`] stand-ins for headless runs.

pub mod registry;
pub mod scheduler;
pub mod sim;
pub mod target;

pub use registry::{SceneRegistry, SharedRegistry, TargetRegistry};
pub use scheduler::{LoopScheduler, Scheduler, TickCallback, TickControl, TimerHandle};
pub use sim::{SimScene, SimTarget};
pub use target::TargetObject;
