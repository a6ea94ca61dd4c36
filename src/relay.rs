//! Fire-and-forget relay of the chosen grasp to downstream consumers.
//!
//! The payload is `translation(3) ++ rotation_flat(9)`. Relays do not wait
//! for acknowledgment and never retry; a failed publish is reported once.

use crate::grasp::GraspCandidate;
use crate::util::{GraspError, GraspResult};
use std::io::Write;
use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};

/// Number of floats in a relay payload.
pub const RELAY_PAYLOAD_LEN: usize = 12;

/// Fixed-size numeric grasp payload.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RelayPayload([f32; RELAY_PAYLOAD_LEN]);

impl RelayPayload {
    pub fn from_grasp(grasp: &GraspCandidate) -> Self {
        let mut values = [0.0f32; RELAY_PAYLOAD_LEN];
        values[..3].copy_from_slice(grasp.translation().as_slice());
        values[3..].copy_from_slice(&grasp.rotation_flat());
        Self(values)
    }

    pub fn values(&self) -> &[f32; RELAY_PAYLOAD_LEN] {
        &self.0
    }

    pub fn translation(&self) -> [f32; 3] {
        [self.0[0], self.0[1], self.0[2]]
    }

    pub fn rotation_flat(&self) -> [f32; 9] {
        let mut out = [0.0f32; 9];
        out.copy_from_slice(&self.0[3..]);
        out
    }

    /// Little-endian wire encoding, 48 bytes.
    pub fn to_le_bytes(&self) -> [u8; RELAY_PAYLOAD_LEN * 4] {
        let mut out = [0u8; RELAY_PAYLOAD_LEN * 4];
        for (chunk, value) in out.chunks_exact_mut(4).zip(self.0.iter()) {
            chunk.copy_from_slice(&value.to_le_bytes());
        }
        out
    }

    /// Decodes [`RelayPayload::to_le_bytes`] output.
    pub fn from_le_bytes(bytes: &[u8]) -> GraspResult<Self> {
        if bytes.len() != RELAY_PAYLOAD_LEN * 4 {
            return Err(GraspError::InvalidInput("relay payload must be 48 bytes"));
        }
        let mut values = [0.0f32; RELAY_PAYLOAD_LEN];
        for (value, chunk) in values.iter_mut().zip(bytes.chunks_exact(4)) {
            *value = f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        }
        Ok(Self(values))
    }
}

/// Transport collaborator for confirmed grasps.
pub trait GraspRelay {
    /// Sends the payload once. Errors are [`GraspError::RelayFailure`].
    fn publish(&mut self, payload: &RelayPayload) -> GraspResult<()>;
}

/// Sends each payload as one UDP datagram.
#[derive(Debug)]
pub struct UdpRelay {
    socket: UdpSocket,
    target: SocketAddr,
}

impl UdpRelay {
    /// Binds an ephemeral local port matching the target's address family.
    pub fn new<A: ToSocketAddrs>(target: A) -> GraspResult<Self> {
        let target = target
            .to_socket_addrs()
            .map_err(|e| GraspError::RelayFailure(e.to_string()))?
            .next()
            .ok_or_else(|| GraspError::RelayFailure("target resolved to no address".to_string()))?;
        let local = if target.is_ipv4() {
            "0.0.0.0:0"
        } else {
            "[::]:0"
        };
        let socket =
            UdpSocket::bind(local).map_err(|e| GraspError::RelayFailure(e.to_string()))?;
        Ok(Self { socket, target })
    }

    pub fn target(&self) -> SocketAddr {
        self.target
    }
}

impl GraspRelay for UdpRelay {
    fn publish(&mut self, payload: &RelayPayload) -> GraspResult<()> {
        let bytes = payload.to_le_bytes();
        let sent = self
            .socket
            .send_to(&bytes, self.target)
            .map_err(|e| GraspError::RelayFailure(e.to_string()))?;
        if sent != bytes.len() {
            return Err(GraspError::RelayFailure(format!(
                "short datagram: {sent} of {} bytes",
                bytes.len()
            )));
        }
        Ok(())
    }
}

/// Writes each payload as one line of space-separated numbers.
#[derive(Debug)]
pub struct WriterRelay<W> {
    writer: W,
}

impl<W: Write> WriterRelay<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> GraspRelay for WriterRelay<W> {
    fn publish(&mut self, payload: &RelayPayload) -> GraspResult<()> {
        let line: Vec<String> = payload.values().iter().map(|v| v.to_string()).collect();
        writeln!(self.writer, "{}", line.join(" "))
            .and_then(|_| self.writer.flush())
            .map_err(|e| GraspError::RelayFailure(e.to_string()))
    }
}
