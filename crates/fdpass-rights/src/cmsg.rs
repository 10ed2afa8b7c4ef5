//! Raw `sendmsg`/`recvmsg` control-message plumbing.
//!
//! All `unsafe` in this crate lives here. The control buffer is sized for
//! exactly one descriptor; peers of this protocol never attach more.

use std::io;
use std::mem;
use std::os::fd::{AsRawFd, BorrowedFd, FromRawFd, OwnedFd};

use tracing::warn;

/// Control buffer capacity in bytes. `CMSG_SPACE(sizeof(int))` is 24 on
/// 64-bit Linux; 64 leaves headroom for any supported platform. Backed by
/// `u64` words so the buffer is aligned for `cmsghdr`.
const CONTROL_CAPACITY: usize = 64;

#[cfg(target_os = "linux")]
const SEND_FLAGS: libc::c_int = libc::MSG_NOSIGNAL;
#[cfg(not(target_os = "linux"))]
const SEND_FLAGS: libc::c_int = 0;

#[cfg(target_os = "linux")]
const RECV_FLAGS: libc::c_int = libc::MSG_CMSG_CLOEXEC;
#[cfg(not(target_os = "linux"))]
const RECV_FLAGS: libc::c_int = 0;

fn control_space_one_fd() -> usize {
    // SAFETY: CMSG_SPACE is pure arithmetic on its argument.
    let space = unsafe { libc::CMSG_SPACE(mem::size_of::<libc::c_int>() as u32) as usize };
    debug_assert!(space <= CONTROL_CAPACITY);
    space
}

/// Transmit `payload` with `rights` attached as a single `SCM_RIGHTS`
/// descriptor. One `sendmsg(2)`; the returned count may be short.
pub(crate) fn send_with_rights(
    socket: BorrowedFd<'_>,
    payload: &[u8],
    rights: BorrowedFd<'_>,
) -> io::Result<usize> {
    let mut iov = libc::iovec {
        iov_base: payload.as_ptr() as *mut libc::c_void,
        iov_len: payload.len(),
    };

    let mut control = [0u64; CONTROL_CAPACITY / 8];
    let control_len = control_space_one_fd();

    // SAFETY: zero is a valid representation for every msghdr field; the
    // fields that matter are assigned below.
    let mut msg: libc::msghdr = unsafe { mem::zeroed() };
    msg.msg_iov = &mut iov;
    msg.msg_iovlen = 1;
    msg.msg_control = control.as_mut_ptr().cast::<libc::c_void>();
    msg.msg_controllen = control_len as _;

    // SAFETY: msg_control points at CONTROL_CAPACITY bytes of aligned,
    // zeroed memory and msg_controllen covers exactly one descriptor, so
    // CMSG_FIRSTHDR is non-null and CMSG_DATA stays in bounds.
    unsafe {
        let header = libc::CMSG_FIRSTHDR(&msg);
        (*header).cmsg_level = libc::SOL_SOCKET;
        (*header).cmsg_type = libc::SCM_RIGHTS;
        (*header).cmsg_len = libc::CMSG_LEN(mem::size_of::<libc::c_int>() as u32) as _;
        std::ptr::write_unaligned(
            libc::CMSG_DATA(header).cast::<libc::c_int>(),
            rights.as_raw_fd(),
        );
    }

    // SAFETY: every pointer reachable from msg is valid for the duration
    // of the call; the socket descriptor is open.
    let sent = unsafe { libc::sendmsg(socket.as_raw_fd(), &msg, SEND_FLAGS) };
    if sent < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(sent as usize)
}

/// Receive one message, filling `buf` with payload bytes and extracting an
/// attached descriptor if one is present. One `recvmsg(2)`.
pub(crate) fn recv_with_rights(
    socket: BorrowedFd<'_>,
    buf: &mut [u8],
) -> io::Result<(usize, Option<OwnedFd>)> {
    let mut iov = libc::iovec {
        iov_base: buf.as_mut_ptr().cast::<libc::c_void>(),
        iov_len: buf.len(),
    };

    let mut control = [0u64; CONTROL_CAPACITY / 8];

    // SAFETY: zero is a valid representation for every msghdr field.
    let mut msg: libc::msghdr = unsafe { mem::zeroed() };
    msg.msg_iov = &mut iov;
    msg.msg_iovlen = 1;
    msg.msg_control = control.as_mut_ptr().cast::<libc::c_void>();
    msg.msg_controllen = control_space_one_fd() as _;

    // SAFETY: every pointer reachable from msg is valid for the duration
    // of the call; the socket descriptor is open.
    let received = unsafe { libc::recvmsg(socket.as_raw_fd(), &mut msg, RECV_FLAGS) };
    if received < 0 {
        return Err(io::Error::last_os_error());
    }

    if msg.msg_flags & libc::MSG_CTRUNC != 0 {
        // More control data than fits one descriptor; the kernel discarded
        // the excess. Peers of this protocol attach at most one.
        warn!("ancillary data truncated on receive");
    }

    // SAFETY: the kernel filled msg_control/msg_controllen, so the CMSG_*
    // walk visits only initialized headers within the control buffer.
    let fd = unsafe { first_rights_fd(&msg) };
    Ok((received as usize, fd))
}

/// Walk the control headers and take ownership of the first `SCM_RIGHTS`
/// descriptor, if any.
///
/// # Safety
/// `msg` must describe a control buffer as filled in by a successful
/// `recvmsg` call.
unsafe fn first_rights_fd(msg: &libc::msghdr) -> Option<OwnedFd> {
    let min_len = libc::CMSG_LEN(mem::size_of::<libc::c_int>() as u32) as usize;

    let mut header = libc::CMSG_FIRSTHDR(msg);
    while !header.is_null() {
        if (*header).cmsg_level == libc::SOL_SOCKET
            && (*header).cmsg_type == libc::SCM_RIGHTS
            && (*header).cmsg_len as usize >= min_len
        {
            let fd = std::ptr::read_unaligned(libc::CMSG_DATA(header).cast::<libc::c_int>());
            if fd >= 0 {
                // The kernel installed this descriptor into our table for
                // this message; ownership transfers to the caller.
                return Some(OwnedFd::from_raw_fd(fd));
            }
        }
        header = libc::CMSG_NXTHDR(msg, header);
    }
    None
}
