//! File descriptor passing over Unix domain sockets.
//!
//! fdpass transfers an open file descriptor, together with a short byte
//! payload, across a local socket connecting two processes. The payload
//! travels as ordinary data; the descriptor travels as `SCM_RIGHTS`
//! ancillary data, so the receiver ends up with its own open reference to
//! the same underlying open file description.
//!
//! # Crate Structure
//!
//! - [`transport`] — Socket endpoints: connected stream/datagram pairs,
//!   path listeners, plain data send/receive
//! - [`rights`] — The send/receive pair carrying descriptors as ancillary
//!   data, including the descriptor-loss diagnostics

#![cfg(unix)]

/// Re-export transport types.
pub mod transport {
    pub use fdpass_transport::*;
}

/// Re-export descriptor-passing types.
pub mod rights {
    pub use fdpass_rights::*;
}
