//! `vmcam-middleware` – The Nervous System
//!
//! Moves pose samples from the network into the process without caring what
//! they mean.  No back-pressure anywhere: the newest sample always wins.
//!
//! # Modules
//!
//! - [`codec`] – fixed 28-byte big-endian wire frame ([`decode`] / [`encode`]).
//! - [`slot`] – [`SharedPoseSlot`], the single-slot, last-write-wins hand-off
//!   between the receive thread and the polling consumer.
//! - [`receiver`] – [`Receiver`], a dedicated thread that blocks on a UDP
//!   socket with a bounded timeout and feeds the slot.
//! - [`sender`] – [`PoseSender`], the tracking-source side of the wire, used
//!   for diagnostics and end-to-end tests.

pub mod codec;
pub mod receiver;
pub mod sender;
pub mod slot;

pub use codec::{POSE_PACKET_LEN, decode, encode};
pub use receiver::{
    DEFAULT_RECV_TIMEOUT, Receiver, ReceiverExit, ReceiverHandle, ReceiverStats,
    StatsSource,
};
pub use sender::PoseSender;
pub use slot::SharedPoseSlot;
