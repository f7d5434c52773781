//! [`PoseSender`] – the tracking-source end of the wire.
//!
//! Sends one encoded [`PoseSample`] per call to a fixed endpoint, exactly as
//! a tracking application would once per rendered frame.  Used by the CLI's
//! `/send` diagnostic and by end-to-end tests.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, UdpSocket};

use tracing::trace;
use vmcam_types::{PoseSample, VmcError};

use crate::codec;

/// Unconnected UDP socket bound to an ephemeral port, aimed at one target.
#[derive(Debug)]
pub struct PoseSender {
    socket: UdpSocket,
    target: SocketAddr,
}

impl PoseSender {
    /// Bind an ephemeral local port of the same address family as `target`.
    ///
    /// # Errors
    ///
    /// Returns [`VmcError::Bind`] if no local socket can be bound.
    pub fn new(target: SocketAddr) -> Result<Self, VmcError> {
        let local = match target.ip() {
            IpAddr::V4(_) => SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 0),
            IpAddr::V6(_) => SocketAddr::new(IpAddr::V6(Ipv6Addr::UNSPECIFIED), 0),
        };
        let socket = UdpSocket::bind(local).map_err(|e| VmcError::Bind {
            addr: local.to_string(),
            details: e.to_string(),
        })?;
        Ok(Self { socket, target })
    }

    pub fn target(&self) -> SocketAddr {
        self.target
    }

    /// Encode and send `sample` as a single datagram.
    ///
    /// # Errors
    ///
    /// Returns [`VmcError::Transport`] if the datagram cannot be sent.
    pub fn send(&self, sample: &PoseSample) -> Result<usize, VmcError> {
        let frame = codec::encode(sample);
        let sent = self
            .socket
            .send_to(&frame, self.target)
            .map_err(|e| VmcError::Transport(format!("send to {}: {e}", self.target)))?;
        trace!(target_addr = %self.target, bytes = sent, "pose packet sent");
        Ok(sent)
    }
}
