//! [`Receiver`] – background UDP pose listener.
//!
//! [`Receiver::start`] binds a datagram socket and hands it to a dedicated
//! thread that:
//!
//! 1. blocks on `recv_from` for at most the configured timeout, so the
//!    cancellation flag is checked even when no traffic arrives;
//! 2. treats a timeout as "loop again";
//! 3. decodes every datagram and writes successful results into the
//!    [`SharedPoseSlot`], dropping malformed ones;
//! 4. exits on any other socket error.
//!
//! The socket is owned by the thread, so it is released whenever the thread
//! returns, whatever the reason.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::net::SocketAddr;
//! use vmcam_middleware::{Receiver, SharedPoseSlot, DEFAULT_RECV_TIMEOUT};
//!
//! let slot = SharedPoseSlot::new();
//! let addr: SocketAddr = "0.0.0.0:8000".parse().unwrap();
//! let handle = Receiver::start(addr, slot.clone(), DEFAULT_RECV_TIMEOUT).unwrap();
//! // ... poll slot.read() from the consumer ...
//! handle.stop();
//! ```

use std::io;
use std::net::{SocketAddr, UdpSocket};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, error, info, trace, warn};
use vmcam_types::VmcError;

use crate::codec;
use crate::slot::SharedPoseSlot;

// ────────────────────────────────────────────────────────────────────────────
// Constants
// ────────────────────────────────────────────────────────────────────────────

/// Default bound on a single blocking receive.
pub const DEFAULT_RECV_TIMEOUT: Duration = Duration::from_millis(500);

/// Largest datagram accepted without truncation.
const MAX_DATAGRAM_SIZE: usize = 65_535;

// ────────────────────────────────────────────────────────────────────────────
// Statistics
// ────────────────────────────────────────────────────────────────────────────

/// Point-in-time counters for a running receiver.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ReceiverStats {
    /// Datagrams decoded and written into the slot.
    pub packets_accepted: u64,
    /// Datagrams dropped as malformed.
    pub packets_dropped: u64,
    /// Wall-clock time of the most recent accepted datagram.
    pub last_packet_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Default)]
struct StatsCell {
    accepted: AtomicU64,
    dropped: AtomicU64,
    last_packet_at: Mutex<Option<DateTime<Utc>>>,
}

impl StatsCell {
    fn record_accepted(&self) {
        self.accepted.fetch_add(1, Ordering::Relaxed);
        *self
            .last_packet_at
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(Utc::now());
    }

    fn record_dropped(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> ReceiverStats {
        ReceiverStats {
            packets_accepted: self.accepted.load(Ordering::Relaxed),
            packets_dropped: self.dropped.load(Ordering::Relaxed),
            last_packet_at: *self
                .last_packet_at
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
        }
    }
}

/// Shareable read-only view of a receiver's counters.
///
/// Stays valid after the [`ReceiverHandle`] is moved or stopped; it then
/// reports the final counts.
#[derive(Debug, Clone)]
pub struct StatsSource(Arc<StatsCell>);

impl StatsSource {
    pub fn snapshot(&self) -> ReceiverStats {
        self.0.snapshot()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Exit reason
// ────────────────────────────────────────────────────────────────────────────

/// Why the receive thread returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReceiverExit {
    /// The cancellation flag was observed.
    Cancelled,
    /// A socket error other than a timeout ended the loop.
    TransportFailed(String),
    /// The thread panicked.
    Panicked,
}

// ────────────────────────────────────────────────────────────────────────────
// Receiver
// ────────────────────────────────────────────────────────────────────────────

/// Entry point for spawning receive loops.
pub struct Receiver;

impl Receiver {
    /// Bind `addr` and spawn the receive loop.
    ///
    /// # Errors
    ///
    /// Returns [`VmcError::Bind`] when the socket cannot be bound (port in
    /// use, address unavailable) and [`VmcError::Transport`] when the socket
    /// cannot be configured or the thread cannot be spawned.
    pub fn start(
        addr: SocketAddr,
        slot: SharedPoseSlot,
        recv_timeout: Duration,
    ) -> Result<ReceiverHandle, VmcError> {
        let socket = UdpSocket::bind(addr).map_err(|e| VmcError::Bind {
            addr: addr.to_string(),
            details: e.to_string(),
        })?;
        socket
            .set_read_timeout(Some(recv_timeout))
            .map_err(|e| VmcError::Transport(format!("set_read_timeout: {e}")))?;
        let local_addr = socket
            .local_addr()
            .map_err(|e| VmcError::Transport(format!("local_addr: {e}")))?;

        let cancel = Arc::new(AtomicBool::new(false));
        let stats = Arc::new(StatsCell::default());

        let thread = {
            let cancel = cancel.clone();
            let stats = stats.clone();
            thread::Builder::new()
                .name(format!("vmcam-rx-{}", local_addr.port()))
                .spawn(move || receive_loop(socket, slot, cancel, stats))
                .map_err(|e| VmcError::Transport(format!("spawn receiver thread: {e}")))?
        };

        info!(addr = %local_addr, timeout_ms = recv_timeout.as_millis() as u64, "pose receiver listening");

        Ok(ReceiverHandle {
            local_addr,
            cancel,
            stats,
            thread: Some(thread),
        })
    }
}

// ────────────────────────────────────────────────────────────────────────────
// ReceiverHandle
// ────────────────────────────────────────────────────────────────────────────

/// A running receive loop.
///
/// Dropping the handle requests cancellation and waits for the thread, so
/// the socket is always released.
#[derive(Debug)]
pub struct ReceiverHandle {
    local_addr: SocketAddr,
    cancel: Arc<AtomicBool>,
    stats: Arc<StatsCell>,
    thread: Option<JoinHandle<ReceiverExit>>,
}

impl ReceiverHandle {
    /// The address the socket is actually bound to (resolves port `0`).
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Snapshot of the packet counters.
    pub fn stats(&self) -> ReceiverStats {
        self.stats.snapshot()
    }

    /// A handle onto the counters that outlives this receiver handle.
    pub fn stats_source(&self) -> StatsSource {
        StatsSource(self.stats.clone())
    }

    /// Ask the loop to exit.  Returns immediately; the loop observes the
    /// request within one receive timeout.
    pub fn request_stop(&self) {
        self.cancel.store(true, Ordering::Release);
    }

    /// `true` once the receive thread has returned (cancelled or failed).
    pub fn is_finished(&self) -> bool {
        self.thread.as_ref().is_none_or(|t| t.is_finished())
    }

    /// Request cancellation and wait for the thread to release the socket.
    ///
    /// Blocks for at most roughly one receive timeout.
    pub fn stop(mut self) -> ReceiverExit {
        self.request_stop();
        self.join()
    }

    /// A handle whose receive thread has already returned `exit`.  No
    /// socket is bound.
    #[cfg(any(test, feature = "test-util"))]
    pub fn exited(exit: ReceiverExit) -> Self {
        let thread = thread::spawn(move || exit);
        while !thread.is_finished() {
            thread::yield_now();
        }
        Self {
            local_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
            cancel: Arc::new(AtomicBool::new(false)),
            stats: Arc::new(StatsCell::default()),
            thread: Some(thread),
        }
    }

    fn join(&mut self) -> ReceiverExit {
        match self.thread.take() {
            Some(thread) => thread.join().unwrap_or(ReceiverExit::Panicked),
            None => ReceiverExit::Cancelled,
        }
    }
}

impl Drop for ReceiverHandle {
    fn drop(&mut self) {
        if self.thread.is_some() {
            self.request_stop();
            let _ = self.join();
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Receive loop
// ────────────────────────────────────────────────────────────────────────────

fn receive_loop(
    socket: UdpSocket,
    slot: SharedPoseSlot,
    cancel: Arc<AtomicBool>,
    stats: Arc<StatsCell>,
) -> ReceiverExit {
    let mut buf = vec![0u8; MAX_DATAGRAM_SIZE];

    let exit = loop {
        if cancel.load(Ordering::Acquire) {
            break ReceiverExit::Cancelled;
        }

        match socket.recv_from(&mut buf) {
            Ok((len, peer)) => match codec::decode(&buf[..len]) {
                Ok(sample) => {
                    slot.write(sample);
                    stats.record_accepted();
                    trace!(peer = %peer, "pose packet accepted");
                }
                Err(e) => {
                    stats.record_dropped();
                    debug!(peer = %peer, error = %e, "dropping malformed pose packet");
                }
            },
            Err(e) if is_timeout(&e) => continue,
            Err(e) => {
                error!(error = %e, "pose receiver socket error; stopping");
                break ReceiverExit::TransportFailed(e.to_string());
            }
        }
    };

    drop(socket);
    if exit == ReceiverExit::Cancelled {
        info!("pose receiver stopped");
    } else {
        warn!(?exit, "pose receiver exited");
    }
    exit
}

/// Read timeouts surface as `WouldBlock` on Unix and `TimedOut` on Windows.
fn is_timeout(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut | io::ErrorKind::Interrupted
    )
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
