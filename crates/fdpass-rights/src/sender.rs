use std::os::fd::AsFd;

use tracing::debug;

use crate::cmsg;
use crate::error::{Result, RightsError};

/// Send `payload` over `socket` with `descriptor` attached as ancillary
/// data.
///
/// Issues exactly one underlying transmit call and returns the number of
/// payload bytes the transport accepted — possibly fewer than requested on
/// a stream socket (short write). The descriptor is all-or-nothing: it is
/// attached to whichever bytes were accepted, never partially transferred.
/// Callers needing full-payload delivery loop and re-send the remainder
/// themselves, without re-attaching the descriptor.
///
/// An empty payload is accepted but **not delivered**: the call returns
/// `Ok(0)` and neither the bytes nor the descriptor reach the peer. The
/// local transport does not carry descriptor-only messages.
///
/// On error the descriptor was not transferred and remains owned by the
/// caller. This call never closes nor duplicates `descriptor`.
pub fn send_fd<S: AsFd, D: AsFd>(socket: &S, descriptor: &D, payload: &[u8]) -> Result<usize> {
    if payload.is_empty() {
        debug!("empty payload; message not transmitted");
        return Ok(0);
    }

    let sent = cmsg::send_with_rights(socket.as_fd(), payload, descriptor.as_fd())
        .map_err(RightsError::Transmit)?;
    debug!(requested = payload.len(), sent, "sent fd-bearing message");
    Ok(sent)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::receiver::{recv_fd, RecvOutcome};
    use fdpass_transport::PassSocket;
    use std::fs::File;

    #[test]
    fn empty_payload_is_not_delivered() {
        let (a, b) = PassSocket::stream_pair().unwrap();
        let file = File::open("/dev/null").unwrap();

        assert_eq!(send_fd(&a, &file, b"").unwrap(), 0);
        assert_eq!(send_fd(&a, &file, b"next").unwrap(), 4);

        // The receiver sees the second message, not an empty fd-bearing one.
        let mut buf = [0u8; 16];
        match recv_fd(&b, &mut buf).unwrap() {
            RecvOutcome::Descriptor { len, .. } => assert_eq!(&buf[..len], b"next"),
            RecvOutcome::Missing { .. } => panic!("descriptor should have arrived"),
        }
    }

    #[test]
    fn sender_keeps_its_descriptor_usable() {
        let (a, b) = PassSocket::stream_pair().unwrap();
        let file = File::open("/dev/null").unwrap();

        send_fd(&a, &file, b"x").unwrap();
        let mut buf = [0u8; 1];
        recv_fd(&b, &mut buf).unwrap();

        // The sender's descriptor is untouched by the transfer.
        assert!(file.metadata().is_ok());
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn transmit_failure_surfaces_as_error() {
        let (a, b) = PassSocket::stream_pair().unwrap();
        drop(b);

        let file = File::open("/dev/null").unwrap();
        let err = send_fd(&a, &file, b"x").unwrap_err();
        assert!(matches!(err, RightsError::Transmit(_)));
    }
}
