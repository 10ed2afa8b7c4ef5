//! `SCM_RIGHTS` descriptor passing over local-domain sockets.
//!
//! One message carries a payload of ordinary bytes plus at most one file
//! descriptor as ancillary control data. The receiver ends up with its own
//! open descriptor referring to the same underlying open file description
//! as the sender's (shared offset and status flags; independent close).
//!
//! The contract is deliberately thin — one `sendmsg(2)` per [`send_fd`],
//! one `recvmsg(2)` per [`recv_fd`], no retries, no internal framing:
//!
//! - Short writes and short reads are normal outcomes surfaced through
//!   byte counts, never errors.
//! - A zero-length payload is **not delivered**: [`send_fd`] accepts the
//!   request, returns `Ok(0)`, and neither the bytes nor the descriptor
//!   reach the peer. Peers must never rely on zero-length fd-carrying
//!   messages.
//! - A message that carries a descriptor must be received with
//!   [`recv_fd`]. Consuming its bytes through a plain data-only receive
//!   drops the descriptor in the kernel, permanently. The next [`recv_fd`]
//!   on that socket reports [`RecvOutcome::Missing`] — the observable
//!   symptom of that peer protocol violation, distinct from both success
//!   and transport failure.

#![cfg(unix)]

mod cmsg;
pub mod error;
pub mod receiver;
pub mod sender;

pub use error::{Result, RightsError};
pub use receiver::{recv_fd, RecvOutcome};
pub use sender::send_fd;
