use std::os::fd::{AsFd, OwnedFd};

use tracing::debug;

use crate::cmsg;
use crate::error::{Result, RightsError};

/// Outcome of a successful control-aware receive.
///
/// Together with [`RightsError`] this preserves the three-way distinction
/// the contract requires: descriptor received, transport failure, and
/// descriptor missing. The missing case is deliberately not an error — it
/// is how a receiver diagnoses that an fd-bearing message was consumed
/// through the plain data path (peer protocol violation), as opposed to
/// the transport breaking.
#[derive(Debug)]
pub enum RecvOutcome {
    /// A descriptor arrived with the payload. The descriptor is a new,
    /// caller-owned open reference; it closes when the `OwnedFd` drops.
    Descriptor { fd: OwnedFd, len: usize },

    /// The message carried no ancillary descriptor. If the peer attached
    /// one to these bytes and it is not here, it was dropped by an earlier
    /// plain receive and is irretrievably lost.
    Missing { len: usize },
}

impl RecvOutcome {
    /// Number of payload bytes placed in the caller's buffer.
    pub fn payload_len(&self) -> usize {
        match self {
            RecvOutcome::Descriptor { len, .. } | RecvOutcome::Missing { len } => *len,
        }
    }

    /// Whether a descriptor arrived.
    pub fn has_descriptor(&self) -> bool {
        matches!(self, RecvOutcome::Descriptor { .. })
    }

    /// Take ownership of the received descriptor, if any.
    pub fn into_descriptor(self) -> Option<OwnedFd> {
        match self {
            RecvOutcome::Descriptor { fd, .. } => Some(fd),
            RecvOutcome::Missing { .. } => None,
        }
    }
}

/// Receive one message from `socket`, filling `buf` with its payload bytes
/// and extracting the attached descriptor if one is present.
///
/// Issues exactly one underlying control-aware receive call; one call
/// corresponds to one transport message, descriptor or not. The receiver
/// never blocks waiting for a descriptor that is not there.
///
/// At most `buf.len()` payload bytes are returned. On a stream socket
/// excess bytes stay queued for the next receive; on a datagram socket the
/// rest of that datagram is discarded.
///
/// Returns [`RightsError::Closed`] when the peer has closed with no data
/// pending. A zero-length plain datagram from a foreign peer is
/// indistinguishable from that condition at this layer and maps to
/// `Closed` as well.
pub fn recv_fd<S: AsFd>(socket: &S, buf: &mut [u8]) -> Result<RecvOutcome> {
    let (len, fd) = cmsg::recv_with_rights(socket.as_fd(), buf).map_err(RightsError::Receive)?;

    match fd {
        Some(fd) => {
            debug!(len, "received fd-bearing message");
            Ok(RecvOutcome::Descriptor { fd, len })
        }
        None if len == 0 => Err(RightsError::Closed),
        None => {
            debug!(len, "received message without descriptor");
            Ok(RecvOutcome::Missing { len })
        }
    }
}
