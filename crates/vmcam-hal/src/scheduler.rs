//! Host scheduler interface and a single-threaded implementation.
//!
//! The runtime never assumes a particular timing mechanism.  It registers a
//! periodic callback and relies on two guarantees: the callback is invoked at
//! roughly the requested cadence, and returning [`TickControl::Stop`] ends
//! further invocations.
//!
//! [`LoopScheduler`] provides those guarantees on the thread that drives it:
//! [`LoopScheduler::run`] sleeps until the earliest timer is due, fires every
//! due timer, and returns once no timers remain or shutdown is requested.
//!
//! # Example
//!
//! ```rust
//! use std::time::Duration;
//! use vmcam_hal::scheduler::{LoopScheduler, Scheduler, TickControl};
//!
//! let mut scheduler = LoopScheduler::new();
//! let mut remaining = 3;
//! scheduler.register_periodic(
//!     Duration::from_millis(1),
//!     Box::new(move || {
//!         remaining -= 1;
//!         if remaining == 0 { TickControl::Stop } else { TickControl::Continue }
//!     }),
//! );
//!
//! scheduler.tick_all();
//! scheduler.tick_all();
//! scheduler.tick_all();
//! assert!(scheduler.is_empty());
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use tracing::debug;

// ────────────────────────────────────────────────────────────────────────────
// Public types
// ────────────────────────────────────────────────────────────────────────────

/// What a periodic callback wants to happen next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickControl {
    /// Keep calling.
    Continue,
    /// Unregister this callback.
    Stop,
}

/// Opaque identifier of a registered periodic callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerHandle(u64);

/// A periodic callback.
pub type TickCallback = Box<dyn FnMut() -> TickControl + Send>;

/// Periodic-callback registration offered by the host.
pub trait Scheduler {
    /// Invoke `callback` every `interval` until it returns
    /// [`TickControl::Stop`] or is unregistered.
    fn register_periodic(&mut self, interval: Duration, callback: TickCallback) -> TimerHandle;

    /// Remove a callback.  Returns `false` if `handle` was not registered
    /// (already stopped or never existed).
    fn unregister(&mut self, handle: TimerHandle) -> bool;
}

// ────────────────────────────────────────────────────────────────────────────
// LoopScheduler
// ────────────────────────────────────────────────────────────────────────────

struct Timer {
    handle: TimerHandle,
    interval: Duration,
    next_due: Instant,
    callback: TickCallback,
}

/// Single-threaded [`Scheduler`] driven by the thread that owns it.
#[derive(Default)]
pub struct LoopScheduler {
    timers: Vec<Timer>,
    next_id: u64,
}

impl LoopScheduler {
    /// Create a scheduler with no timers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of registered timers.
    pub fn len(&self) -> usize {
        self.timers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }

    /// Fire every registered timer once, regardless of due time.
    ///
    /// Returns the number of callbacks invoked.
    pub fn tick_all(&mut self) -> usize {
        let now = Instant::now();
        self.fire(|_| true, now)
    }

    /// Fire every timer whose due time is at or before `now`.
    ///
    /// Returns the number of callbacks invoked.
    pub fn run_due(&mut self, now: Instant) -> usize {
        self.fire(|timer| timer.next_due <= now, now)
    }

    /// Drive timers until none remain or `shutdown` is set.
    ///
    /// Sleeps between due times, so the thread is idle when nothing is due.
    pub fn run(&mut self, shutdown: &AtomicBool) {
        while !self.timers.is_empty() && !shutdown.load(Ordering::SeqCst) {
            let now = Instant::now();
            match self.timers.iter().map(|t| t.next_due).min() {
                Some(due) if due > now => thread::sleep(due - now),
                _ => {
                    self.run_due(now);
                }
            }
        }
        debug!(remaining = self.timers.len(), "scheduler loop finished");
    }

    fn fire(&mut self, mut is_due: impl FnMut(&Timer) -> bool, now: Instant) -> usize {
        let mut fired = 0;
        self.timers.retain_mut(|timer| {
            if !is_due(timer) {
                return true;
            }
            fired += 1;
            timer.next_due = now + timer.interval;
            match (timer.callback)() {
                TickControl::Continue => true,
                TickControl::Stop => {
                    debug!(timer = timer.handle.0, "periodic callback finished");
                    false
                }
            }
        });
        fired
    }
}

impl Scheduler for LoopScheduler {
    fn register_periodic(&mut self, interval: Duration, callback: TickCallback) -> TimerHandle {
        let handle = TimerHandle(self.next_id);
        self.next_id += 1;
        self.timers.push(Timer {
            handle,
            interval,
            next_due: Instant::now() + interval,
            callback,
        });
        debug!(timer = handle.0, interval_ms = interval.as_millis() as u64, "periodic callback registered");
        handle
    }

    fn unregister(&mut self, handle: TimerHandle) -> bool {
        let before = self.timers.len();
        self.timers.retain(|t| t.handle != handle);
        before != self.timers.len()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
