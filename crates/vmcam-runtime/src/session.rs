//! [`Session`] – one receive-and-apply pipeline.
//!
//! A session owns everything one logical "start receiver" action needs: the
//! bound socket (through its receiver), the shared slot, the cancellation
//! path, and the periodic tick that writes poses onto the target.  Several
//! sessions may coexist as long as they listen on different ports.
//!
//! # State machine
//!
//! ```text
//!          start()             bind ok
//!   Idle ──────────▶ Starting ─────────▶ Running
//!    ▲                  │                   │ request_stop() / receiver failure
//!    │     bind error   │                   ▼
//!    └──────────────────┴──────────────  Stopping
//!    ▲                                      │ thread exited and joined
//!    └──────────────────────────────────────┘
//! ```
//!
//! Ticks only happen while `Running`.  The is-running flag on the
//! [`ControlSurface`] is the single gate against a second receiver being
//! started for the same session.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::{Arc, Mutex};
//! use vmcam_hal::{LoopScheduler, SimScene};
//! use vmcam_runtime::session::{Session, SessionConfig};
//!
//! let scene = Arc::new(Mutex::new(SimScene::new().with_camera("Camera").build()));
//! let mut scheduler = LoopScheduler::new();
//! let mut session = Session::new(SessionConfig::default());
//!
//! session.start(&mut scheduler, scene.clone()).expect("bind failed");
//! // Drive `scheduler` from the host loop; later:
//! session.request_stop();
//! ```

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock, TryLockError};
use std::time::Duration;

use tracing::{debug, info, warn};
use uuid::Uuid;
use vmcam_hal::registry::SharedRegistry;
use vmcam_hal::scheduler::{Scheduler, TickControl, TimerHandle};
use vmcam_middleware::{
    DEFAULT_RECV_TIMEOUT, Receiver, ReceiverExit, ReceiverHandle, ReceiverStats, SharedPoseSlot,
    StatsSource,
};
use vmcam_types::{PoseSample, VmcError};

use crate::applier::PoseApplier;

// ─────────────────────────────────────────────────────────────────────────────
// Constants
// ─────────────────────────────────────────────────────────────────────────────

/// Default port the tracking source sends to.
pub const DEFAULT_PORT: u16 = 8000;

/// Default tick cadence of the applier (100 Hz).
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(10);

/// Default name of the target object.
pub const DEFAULT_CAMERA_NAME: &str = "Camera";

// ─────────────────────────────────────────────────────────────────────────────
// Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Configuration bundle for [`Session`].
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    /// Local address to bind (`0.0.0.0` listens on every interface).
    pub bind_address: IpAddr,
    /// UDP port; `0` picks an ephemeral port.
    pub port: u16,
    /// Name of the target object to drive.
    pub camera_name: String,
    /// Applier tick cadence.
    pub tick_interval: Duration,
    /// Upper bound on one blocking receive, and so on stop latency.
    pub recv_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            bind_address: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: DEFAULT_PORT,
            camera_name: DEFAULT_CAMERA_NAME.to_string(),
            tick_interval: DEFAULT_TICK_INTERVAL,
            recv_timeout: DEFAULT_RECV_TIMEOUT,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// State
// ─────────────────────────────────────────────────────────────────────────────

/// Session lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Starting,
    Running,
    Stopping,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionState::Idle => write!(f, "idle"),
            SessionState::Starting => write!(f, "starting"),
            SessionState::Running => write!(f, "running"),
            SessionState::Stopping => write!(f, "stopping"),
        }
    }
}

/// Outcome of a successful [`Session::start`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    /// A receiver was bound and the tick registered.
    Started(SocketAddr),
    /// The session was already running; nothing was changed.
    AlreadyRunning,
}

/// State shared between the control path and the applier tick: the
/// is-running flag, the target name, the lifecycle state, and the handle of
/// the current receive thread.
#[derive(Debug)]
pub struct ControlSurface {
    session_id: Uuid,
    running: AtomicBool,
    camera_name: RwLock<String>,
    state: RwLock<SessionState>,
    /// Bumped on every start; a tick from an earlier run sees a stale value
    /// and ends itself.
    generation: AtomicU64,
    receiver: Mutex<Option<ReceiverHandle>>,
}

impl ControlSurface {
    pub fn new(camera_name: impl Into<String>) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            running: AtomicBool::new(false),
            camera_name: RwLock::new(camera_name.into()),
            state: RwLock::new(SessionState::Idle),
            generation: AtomicU64::new(0),
            receiver: Mutex::new(None),
        }
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn set_running(&self, running: bool) {
        self.running.store(running, Ordering::SeqCst);
    }

    pub fn camera_name(&self) -> String {
        self.camera_name
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn set_camera_name(&self, name: impl Into<String>) {
        *self
            .camera_name
            .write()
            .unwrap_or_else(PoisonError::into_inner) = name.into();
    }

    /// Current lifecycle state.
    ///
    /// A `Stopping` session whose receive thread has returned is moved to
    /// `Idle` here.
    pub fn state(&self) -> SessionState {
        self.reap(false);
        self.stored_state()
    }

    pub fn set_state(&self, state: SessionState) {
        *self.state.write().unwrap_or_else(PoisonError::into_inner) = state;
    }

    fn stored_state(&self) -> SessionState {
        *self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Take ownership of a freshly started receiver and return the new run's
    /// generation.
    pub(crate) fn install_receiver(&self, receiver: ReceiverHandle) -> u64 {
        *self.receiver.lock().unwrap_or_else(PoisonError::into_inner) = Some(receiver);
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub(crate) fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Ask the receive thread to exit without waiting for it.
    ///
    /// A no-op while the handle is being reaped; the reaper has already
    /// requested the stop.
    pub(crate) fn stop_receiver(&self) {
        let cell = match self.receiver.try_lock() {
            Ok(cell) => cell,
            Err(TryLockError::Poisoned(p)) => p.into_inner(),
            Err(TryLockError::WouldBlock) => return,
        };
        if let Some(receiver) = cell.as_ref() {
            receiver.request_stop();
        }
    }

    /// `true` when the current receive thread has returned on its own.
    pub(crate) fn receiver_finished(&self) -> bool {
        let cell = match self.receiver.try_lock() {
            Ok(cell) => cell,
            Err(TryLockError::Poisoned(p)) => p.into_inner(),
            Err(TryLockError::WouldBlock) => return false,
        };
        cell.as_ref().is_some_and(ReceiverHandle::is_finished)
    }

    /// Join the receive thread of a `Stopping` session and move it to `Idle`.
    ///
    /// Without `wait` this only acts once the thread has already returned, so
    /// it never blocks.  With `wait` it requests the stop itself and blocks
    /// for at most one receive timeout.
    fn reap(&self, wait: bool) {
        if self.stored_state() != SessionState::Stopping {
            return;
        }
        let mut cell = self.receiver.lock().unwrap_or_else(PoisonError::into_inner);
        if !wait && cell.as_ref().is_some_and(|r| !r.is_finished()) {
            return;
        }
        if let Some(receiver) = cell.take() {
            let stats = receiver.stats();
            match receiver.stop() {
                ReceiverExit::Cancelled => info!(
                    session = %self.session_id,
                    accepted = stats.packets_accepted,
                    dropped = stats.packets_dropped,
                    "session stopped"
                ),
                exit => warn!(session = %self.session_id, ?exit, "session stopped after receiver failure"),
            }
        }
        self.set_state(SessionState::Idle);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Session
// ─────────────────────────────────────────────────────────────────────────────

/// Explicit replacement for a process-wide singleton receiver.
///
/// The receiver handle lives on the [`ControlSurface`] shared with the
/// registered [`PoseApplier`]; the applier asks it to stop and the session
/// joins it once it has exited.
pub struct Session {
    config: SessionConfig,
    controls: Arc<ControlSurface>,
    slot: SharedPoseSlot,
    local_addr: Option<SocketAddr>,
    stats: Option<StatsSource>,
    timer: Option<TimerHandle>,
}

impl Session {
    /// Create an idle session.
    pub fn new(config: SessionConfig) -> Self {
        let controls = Arc::new(ControlSurface::new(config.camera_name.clone()));
        Self {
            config,
            controls,
            slot: SharedPoseSlot::new(),
            local_addr: None,
            stats: None,
            timer: None,
        }
    }

    /// Bind the receiver and register the applier tick with `scheduler`.
    ///
    /// Calling `start` while the session is running is a no-op that reports
    /// [`StartOutcome::AlreadyRunning`]; no second socket is bound.  A session
    /// still stopping is finished first, which waits at most one receive
    /// timeout.
    ///
    /// # Errors
    ///
    /// Returns [`VmcError::Bind`] when the port is unavailable.  The session
    /// is left `Idle`.
    pub fn start(
        &mut self,
        scheduler: &mut dyn Scheduler,
        registry: SharedRegistry,
    ) -> Result<StartOutcome, VmcError> {
        self.controls.reap(true);
        if self.controls.is_running() || self.controls.state() != SessionState::Idle {
            info!(session = %self.controls.session_id(), "receiver already running");
            return Ok(StartOutcome::AlreadyRunning);
        }

        // A tick from the previous run that has not yet seen the stop.
        if let Some(stale) = self.timer.take()
            && scheduler.unregister(stale)
        {
            debug!(session = %self.controls.session_id(), ?stale, "unregistered stale tick");
        }

        self.controls.set_state(SessionState::Starting);
        // Fresh slot per run: a restarted session starts from the zero pose.
        self.slot = SharedPoseSlot::new();

        let addr = SocketAddr::new(self.config.bind_address, self.config.port);
        let receiver = match Receiver::start(addr, self.slot.clone(), self.config.recv_timeout) {
            Ok(r) => r,
            Err(e) => {
                warn!(session = %self.controls.session_id(), error = %e, "session failed to start");
                self.controls.set_state(SessionState::Idle);
                return Err(e);
            }
        };

        let local_addr = receiver.local_addr();
        self.local_addr = Some(local_addr);
        self.stats = Some(receiver.stats_source());

        let generation = self.controls.install_receiver(receiver);
        self.controls.set_running(true);
        self.controls.set_state(SessionState::Running);

        let mut applier = PoseApplier::new(self.slot.clone(), self.controls.clone(), generation);
        let timer = scheduler.register_periodic(
            self.config.tick_interval,
            Box::new(move || {
                // The lifecycle check runs before the host's scene is locked.
                if !applier.should_continue() {
                    return TickControl::Stop;
                }
                let mut guard = registry.lock().unwrap_or_else(PoisonError::into_inner);
                applier.write_pose(&mut *guard);
                TickControl::Continue
            }),
        );
        self.timer = Some(timer);

        info!(
            session = %self.controls.session_id(),
            addr = %local_addr,
            camera = %self.controls.camera_name(),
            "session running"
        );
        Ok(StartOutcome::Started(local_addr))
    }

    /// Clear the is-running flag.  Returns immediately; the next tick asks
    /// the receiver to exit and ends the periodic callback.
    pub fn request_stop(&self) {
        if self.controls.is_running() {
            self.controls.set_running(false);
            self.controls.set_state(SessionState::Stopping);
            info!(session = %self.controls.session_id(), "stop requested");
        }
    }

    /// Block until a stopping session has released its socket.
    ///
    /// For control paths only; waits at most one receive timeout.
    pub fn wait_stopped(&self) -> SessionState {
        self.controls.reap(true);
        self.controls.state()
    }

    pub fn id(&self) -> Uuid {
        self.controls.session_id()
    }

    pub fn state(&self) -> SessionState {
        self.controls.state()
    }

    pub fn is_running(&self) -> bool {
        self.controls.is_running()
    }

    /// Change the target name.  Takes effect on the next tick.
    pub fn set_camera_name(&mut self, name: impl Into<String>) {
        let name = name.into();
        self.config.camera_name = name.clone();
        self.controls.set_camera_name(name);
    }

    /// Address of the most recently bound socket.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    /// Counters of the most recent receiver.
    pub fn stats(&self) -> Option<ReceiverStats> {
        self.stats.as_ref().map(StatsSource::snapshot)
    }

    /// The newest received sample, still in the source convention.
    pub fn latest_sample(&self) -> PoseSample {
        self.slot.read()
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        // The next tick ends itself; the receive thread is joined when the
        // last reference to the control surface goes away.
        self.controls.set_running(false);
        self.controls.stop_receiver();
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::thread;
    use std::time::Instant;
    use vmcam_hal::registry::SceneRegistry;
    use vmcam_hal::scheduler::LoopScheduler;
    use vmcam_hal::sim::SimScene;
    use vmcam_middleware::PoseSender;
    use vmcam_transform::BASIS_CORRECTION;
    use vmcam_types::Vec3;

    fn loopback_config(port: u16) -> SessionConfig {
        SessionConfig {
            bind_address: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port,
            recv_timeout: Duration::from_millis(20),
            ..SessionConfig::default()
        }
    }

    fn scene() -> Arc<Mutex<SceneRegistry>> {
        Arc::new(Mutex::new(SimScene::new().with_camera("Camera").build()))
    }

    fn wait_until(mut cond: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if cond() {
                return true;
            }
            thread::sleep(Duration::from_millis(5));
        }
        false
    }

    fn started_addr(outcome: StartOutcome) -> SocketAddr {
        match outcome {
            StartOutcome::Started(addr) => addr,
            StartOutcome::AlreadyRunning => panic!("expected a fresh start"),
        }
    }

    #[test]
    fn default_config_listens_on_8000_for_camera() {
        let config = SessionConfig::default();
        assert_eq!(config.port, 8000);
        assert_eq!(config.camera_name, "Camera");
        assert_eq!(config.bind_address, IpAddr::V4(Ipv4Addr::UNSPECIFIED));
        assert_eq!(config.tick_interval, Duration::from_millis(10));
    }

    #[test]
    fn new_session_is_idle() {
        let session = Session::new(loopback_config(0));
        assert_eq!(session.state(), SessionState::Idle);
        assert!(!session.is_running());
        assert!(session.local_addr().is_none());
        assert!(session.stats().is_none());
        assert_eq!(session.latest_sample(), PoseSample::zero());
    }

    #[test]
    fn packet_reaches_camera_after_next_tick() {
        let scene = scene();
        let mut scheduler = LoopScheduler::new();
        let mut session = Session::new(loopback_config(0));

        let addr = started_addr(session.start(&mut scheduler, scene.clone()).unwrap());
        assert_eq!(session.state(), SessionState::Running);
        assert_eq!(scheduler.len(), 1);

        let sender = PoseSender::new(addr).unwrap();
        sender
            .send(&PoseSample::from_components([0.0, 1.0, 2.0, 1.0, 0.0, 0.0, 0.0]))
            .unwrap();
        assert!(wait_until(|| session.stats().unwrap().packets_accepted == 1));

        scheduler.tick_all();
        let guard = scene.lock().unwrap();
        let cam = guard.get("Camera").unwrap();
        assert_eq!(cam.position(), Vec3::new(0.0, 2.0, 1.0));
        assert_eq!(cam.orientation(), BASIS_CORRECTION);
    }

    #[test]
    fn second_start_is_a_noop() {
        let scene = scene();
        let mut scheduler = LoopScheduler::new();
        let mut session = Session::new(loopback_config(0));

        session.start(&mut scheduler, scene.clone()).unwrap();
        assert_eq!(
            session.start(&mut scheduler, scene).unwrap(),
            StartOutcome::AlreadyRunning
        );
        assert_eq!(scheduler.len(), 1);
    }

    #[test]
    fn bind_conflict_leaves_session_idle() {
        let blocker = std::net::UdpSocket::bind("127.0.0.1:0").unwrap();
        let port = blocker.local_addr().unwrap().port();

        let mut scheduler = LoopScheduler::new();
        let mut session = Session::new(loopback_config(port));
        let err = session.start(&mut scheduler, scene()).unwrap_err();

        assert!(matches!(err, VmcError::Bind { .. }), "got {err:?}");
        assert_eq!(session.state(), SessionState::Idle);
        assert!(!session.is_running());
        assert!(scheduler.is_empty());
    }

    #[test]
    fn stop_then_restart_on_same_port() {
        let scene = scene();
        let mut scheduler = LoopScheduler::new();
        let mut first = Session::new(loopback_config(0));
        let addr = started_addr(first.start(&mut scheduler, scene.clone()).unwrap());

        first.request_stop();
        assert_eq!(first.state(), SessionState::Stopping);
        scheduler.tick_all();
        assert!(scheduler.is_empty());
        assert_eq!(first.wait_stopped(), SessionState::Idle);

        let mut second = Session::new(loopback_config(addr.port()));
        let again = started_addr(second.start(&mut scheduler, scene.clone()).unwrap());
        assert_eq!(again.port(), addr.port());

        // The stopped session can be started again too, on a fresh port.
        first.config.port = 0;
        assert!(matches!(
            first.start(&mut scheduler, scene).unwrap(),
            StartOutcome::Started(_)
        ));
        assert_eq!(scheduler.len(), 2);
    }

    #[test]
    fn stop_tick_is_fast_and_leaves_the_scene_unlocked() {
        let scene = scene();
        let mut scheduler = LoopScheduler::new();
        let mut session = Session::new(SessionConfig {
            recv_timeout: Duration::from_millis(500),
            ..loopback_config(0)
        });
        session.start(&mut scheduler, scene.clone()).unwrap();
        scheduler.tick_all();
        session.request_stop();

        // The host keeps the scene locked; the stop tick must not need it.
        let held = scene.lock().unwrap();
        let (tx, rx) = mpsc::channel();
        let ticker = thread::spawn(move || {
            let started = Instant::now();
            scheduler.tick_all();
            tx.send((started.elapsed(), scheduler.is_empty())).unwrap();
        });
        let (elapsed, finished) = rx.recv_timeout(Duration::from_secs(2)).unwrap();
        drop(held);
        ticker.join().unwrap();

        assert!(finished);
        assert!(elapsed < Duration::from_millis(100), "stop tick took {elapsed:?}");
        assert!(wait_until(|| session.state() == SessionState::Idle));
    }

    #[test]
    fn restart_before_the_stop_tick_replaces_the_old_timer() {
        let scene = scene();
        let mut scheduler = LoopScheduler::new();
        let mut session = Session::new(loopback_config(0));
        let first = started_addr(session.start(&mut scheduler, scene.clone()).unwrap());

        session.request_stop();
        session.config.port = first.port();
        let again = started_addr(session.start(&mut scheduler, scene).unwrap());

        assert_eq!(again, first);
        assert_eq!(scheduler.len(), 1);
        assert_eq!(session.state(), SessionState::Running);
        scheduler.tick_all();
        assert_eq!(scheduler.len(), 1);
    }

    #[test]
    fn wait_stopped_on_idle_session_returns_immediately() {
        let session = Session::new(loopback_config(0));
        assert_eq!(session.wait_stopped(), SessionState::Idle);
    }

    #[test]
    fn stop_without_ticks_is_harmless() {
        let session = Session::new(loopback_config(0));
        session.request_stop();
        assert_eq!(session.state(), SessionState::Idle);
    }

    #[test]
    fn renamed_camera_is_driven_on_next_tick() {
        let scene = Arc::new(Mutex::new(
            SimScene::new().with_camera("Camera").with_camera("Witness").build(),
        ));
        let mut scheduler = LoopScheduler::new();
        let mut session = Session::new(loopback_config(0));
        let addr = started_addr(session.start(&mut scheduler, scene.clone()).unwrap());

        session.set_camera_name("Witness");
        PoseSender::new(addr)
            .unwrap()
            .send(&PoseSample::from_components([4.0, 5.0, 6.0, 1.0, 0.0, 0.0, 0.0]))
            .unwrap();
        assert!(wait_until(|| session.stats().unwrap().packets_accepted == 1));
        scheduler.tick_all();

        let guard = scene.lock().unwrap();
        assert_eq!(guard.get("Witness").unwrap().position(), Vec3::new(4.0, 6.0, 5.0));
        assert_eq!(guard.get("Camera").unwrap().position(), Vec3::zero());
    }

    #[test]
    fn dropping_session_ends_its_tick() {
        let scene = scene();
        let mut scheduler = LoopScheduler::new();
        {
            let mut session = Session::new(loopback_config(0));
            session.start(&mut scheduler, scene).unwrap();
        }
        scheduler.tick_all();
        assert!(scheduler.is_empty());
    }

    #[test]
    fn session_ids_are_unique() {
        let a = Session::new(SessionConfig::default());
        let b = Session::new(SessionConfig::default());
        assert_ne!(a.id(), b.id());
    }
}
