use std::io::{Read, Write};
use std::os::fd::{AsFd, AsRawFd, BorrowedFd, RawFd};
use std::os::unix::net::{UnixDatagram, UnixStream};
use std::path::Path;

use tracing::debug;

use crate::error::{Result, TransportError};

/// A connected local-domain socket endpoint.
///
/// Wraps either a `SOCK_STREAM` or a `SOCK_DGRAM` Unix socket behind one
/// type so senders and receivers can run against both transports. The
/// plain send/receive calls here move ordinary data only: receiving an
/// fd-bearing message through [`PassSocket::recv_plain`] consumes its
/// payload and leaks the attached descriptor irretrievably.
pub struct PassSocket {
    inner: SocketInner,
}

enum SocketInner {
    Stream(UnixStream),
    Datagram(UnixDatagram),
}

impl PassSocket {
    /// Create a connected pair of stream sockets (`socketpair(2)`).
    pub fn stream_pair() -> Result<(Self, Self)> {
        let (a, b) = UnixStream::pair().map_err(TransportError::Pair)?;
        Ok((Self::from_stream(a), Self::from_stream(b)))
    }

    /// Create a connected pair of datagram sockets (`socketpair(2)`).
    pub fn datagram_pair() -> Result<(Self, Self)> {
        let (a, b) = UnixDatagram::pair().map_err(TransportError::Pair)?;
        Ok((Self::from_datagram(a), Self::from_datagram(b)))
    }

    /// Connect a stream socket to a listening filesystem path.
    pub fn connect(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let stream = UnixStream::connect(path).map_err(|e| TransportError::Connect {
            path: path.to_path_buf(),
            source: e,
        })?;
        debug!(?path, "connected to unix domain socket");
        Ok(Self::from_stream(stream))
    }

    /// Wrap an already-connected stream socket.
    pub fn from_stream(stream: UnixStream) -> Self {
        Self {
            inner: SocketInner::Stream(stream),
        }
    }

    /// Wrap an already-connected datagram socket.
    pub fn from_datagram(socket: UnixDatagram) -> Self {
        Self {
            inner: SocketInner::Datagram(socket),
        }
    }

    /// Send ordinary data with no ancillary payload.
    ///
    /// Returns the number of bytes the transport accepted, which may be
    /// fewer than `buf.len()` on a stream socket (short write).
    pub fn send_plain(&self, buf: &[u8]) -> Result<usize> {
        match &self.inner {
            SocketInner::Stream(stream) => Ok((&*stream).write(buf)?),
            SocketInner::Datagram(socket) => Ok(socket.send(buf)?),
        }
    }

    /// Receive ordinary data with no ancillary inspection.
    ///
    /// Returns the number of bytes placed in `buf`; 0 means the peer
    /// closed (stream) or sent an empty datagram. If the incoming message
    /// carried a descriptor, the descriptor is silently dropped by the
    /// kernel — the control-aware receive path exists for that case.
    pub fn recv_plain(&self, buf: &mut [u8]) -> Result<usize> {
        match &self.inner {
            SocketInner::Stream(stream) => Ok((&*stream).read(buf)?),
            SocketInner::Datagram(socket) => Ok(socket.recv(buf)?),
        }
    }

    /// Set read timeout on the underlying socket.
    pub fn set_read_timeout(&self, timeout: Option<std::time::Duration>) -> Result<()> {
        match &self.inner {
            SocketInner::Stream(stream) => stream.set_read_timeout(timeout).map_err(Into::into),
            SocketInner::Datagram(socket) => socket.set_read_timeout(timeout).map_err(Into::into),
        }
    }

    /// Set write timeout on the underlying socket.
    pub fn set_write_timeout(&self, timeout: Option<std::time::Duration>) -> Result<()> {
        match &self.inner {
            SocketInner::Stream(stream) => stream.set_write_timeout(timeout).map_err(Into::into),
            SocketInner::Datagram(socket) => socket.set_write_timeout(timeout).map_err(Into::into),
        }
    }

    /// Try to clone this endpoint (creates a new file descriptor).
    pub fn try_clone(&self) -> Result<Self> {
        match &self.inner {
            SocketInner::Stream(stream) => Ok(Self::from_stream(stream.try_clone()?)),
            SocketInner::Datagram(socket) => Ok(Self::from_datagram(socket.try_clone()?)),
        }
    }

    /// Transport name for diagnostics.
    pub fn transport_name(&self) -> &'static str {
        match &self.inner {
            SocketInner::Stream(_) => "unix-stream",
            SocketInner::Datagram(_) => "unix-datagram",
        }
    }

    /// Get the credentials of the connected peer (Linux only).
    ///
    /// Returns `(uid, gid, pid)` via `SO_PEERCRED`, or `None` if unavailable.
    #[cfg(target_os = "linux")]
    pub fn peer_credentials(&self) -> Option<(u32, u32, u32)> {
        let fd = self.as_raw_fd();

        let mut cred = libc::ucred {
            pid: 0,
            uid: 0,
            gid: 0,
        };
        let mut len = std::mem::size_of::<libc::ucred>() as libc::socklen_t;

        // SAFETY: `cred` and `len` are valid writable pointers for the provided sizes,
        // and `fd` is an open Unix socket descriptor owned by this process.
        let rc = unsafe {
            libc::getsockopt(
                fd,
                libc::SOL_SOCKET,
                libc::SO_PEERCRED,
                (&mut cred as *mut libc::ucred).cast::<libc::c_void>(),
                &mut len,
            )
        };

        if rc == 0 && len as usize == std::mem::size_of::<libc::ucred>() {
            Some((cred.uid, cred.gid, cred.pid as u32))
        } else {
            None
        }
    }

    /// Get the credentials of the connected peer.
    ///
    /// Returns `None` on platforms that do not expose peer credentials.
    #[cfg(not(target_os = "linux"))]
    pub fn peer_credentials(&self) -> Option<(u32, u32, u32)> {
        None
    }
}

impl AsFd for PassSocket {
    fn as_fd(&self) -> BorrowedFd<'_> {
        match &self.inner {
            SocketInner::Stream(stream) => stream.as_fd(),
            SocketInner::Datagram(socket) => socket.as_fd(),
        }
    }
}

impl AsRawFd for PassSocket {
    fn as_raw_fd(&self) -> RawFd {
        match &self.inner {
            SocketInner::Stream(stream) => stream.as_raw_fd(),
            SocketInner::Datagram(socket) => socket.as_raw_fd(),
        }
    }
}

impl std::fmt::Debug for PassSocket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PassSocket")
            .field("type", &self.transport_name())
            .finish()
    }
}
