//! End-to-end descriptor-passing matrix over both local transports.
//!
//! The sender half runs in a thread over a `socketpair`; the receiving
//! half asserts payloads, descriptor arrival, and the descriptor-loss
//! path in strict order.

#![cfg(unix)]

use std::fs::File;
use std::io::{Read, Seek, Write};
use std::thread;

use fdpass_rights::{recv_fd, send_fd, RecvOutcome, RightsError};
use fdpass_transport::PassSocket;

/// An unlinked scratch file holding `len` zero bytes, positioned at the
/// start. The open file description outlives the directory entry.
fn zeros_file(tag: &str, len: usize) -> File {
    let path = std::env::temp_dir().join(format!(
        "fdpass-zeros-{tag}-{}",
        std::process::id()
    ));
    let mut file = File::options()
        .read(true)
        .write(true)
        .create(true)
        .truncate(true)
        .open(&path)
        .unwrap();
    file.write_all(&vec![0u8; len]).unwrap();
    file.rewind().unwrap();
    let _ = std::fs::remove_file(&path);
    file
}

fn content_file(tag: &str, content: &[u8]) -> File {
    let path = std::env::temp_dir().join(format!(
        "fdpass-content-{tag}-{}",
        std::process::id()
    ));
    let mut file = File::options()
        .read(true)
        .write(true)
        .create(true)
        .truncate(true)
        .open(&path)
        .unwrap();
    file.write_all(content).unwrap();
    file.rewind().unwrap();
    let _ = std::fs::remove_file(&path);
    file
}

/// Receive one fd-bearing message, assert its payload, and prove the
/// descriptor dereferences the shared zero file.
fn expect_fd_message(socket: &PassSocket, expected: &[u8]) {
    let mut buf = [0u8; 4096];
    let outcome = recv_fd(socket, &mut buf).unwrap();
    let RecvOutcome::Descriptor { fd, len } = outcome else {
        panic!("descriptor missing for payload {expected:?}");
    };
    assert_eq!(&buf[..len], expected);

    let mut received = File::from(fd);
    let mut contents = [0u8; 512];
    received.read_exact(&mut contents).unwrap();
    assert!(contents.iter().all(|b| *b == 0), "non-zero byte read");
}

/// The send side of the matrix, mirrored by `run_matrix`'s receive side.
fn matrix_sender(socket: PassSocket, tag: &str) {
    let file = zeros_file(tag, 4096);

    // Never delivered: the transport drops empty fd-bearing messages.
    assert_eq!(send_fd(&socket, &file, b"").unwrap(), 0);
    assert_eq!(send_fd(&socket, &file, b"a").unwrap(), 1);
    assert_eq!(send_fd(&socket, &file, b"\0").unwrap(), 1);
    assert_eq!(send_fd(&socket, &file, b"full write").unwrap(), 10);
    // Caller-side truncation: only the first 10 bytes travel.
    assert_eq!(send_fd(&socket, &file, &b"short write"[..10]).unwrap(), 10);
    // The peer consumes this one through the plain path; the descriptor
    // attached here is lost.
    assert_eq!(send_fd(&socket, &file, b"mismatch").unwrap(), 8);
    assert_eq!(socket.send_plain(b"mismatch").unwrap(), 8);
}

fn run_matrix(local: PassSocket, remote: PassSocket, tag: &'static str) {
    let sender = thread::spawn(move || matrix_sender(remote, tag));

    expect_fd_message(&local, b"a");
    expect_fd_message(&local, b"\0");
    expect_fd_message(&local, b"full write");
    expect_fd_message(&local, b"short writ");

    // Consume the fd-bearing message through the plain data path. The
    // bytes arrive; the descriptor is dropped in the kernel.
    let mut buf = [0u8; 8];
    assert_eq!(local.recv_plain(&mut buf).unwrap(), 8);
    assert_eq!(&buf, b"mismatch");

    // The next control-aware receive gets the following plain message and
    // reports the missing descriptor distinctly from success and failure.
    let mut buf = [0u8; 4096];
    match recv_fd(&local, &mut buf).unwrap() {
        RecvOutcome::Missing { len } => {
            assert_eq!(len, 8);
            assert_eq!(&buf[..len], b"mismatch");
        }
        RecvOutcome::Descriptor { .. } => panic!("descriptor should have been lost"),
    }

    sender.join().unwrap();
}

#[test]
fn stream_matrix() {
    let (local, remote) = PassSocket::stream_pair().unwrap();
    run_matrix(local, remote, "stream");
}

#[test]
fn datagram_matrix() {
    let (local, remote) = PassSocket::datagram_pair().unwrap();
    run_matrix(local, remote, "dgram");
}

#[test]
fn received_descriptor_shares_file_offset() {
    let (a, b) = PassSocket::stream_pair().unwrap();
    let mut original = content_file("offset", b"abcdefghijklmnopqrstuvwxyz");

    send_fd(&a, &original, b"x").unwrap();

    let mut buf = [0u8; 4];
    let fd = recv_fd(&b, &mut buf)
        .unwrap()
        .into_descriptor()
        .expect("descriptor should arrive");
    let mut received = File::from(fd);

    // Reads through either descriptor advance the shared offset.
    let mut chunk = [0u8; 5];
    original.read_exact(&mut chunk).unwrap();
    assert_eq!(&chunk, b"abcde");
    received.read_exact(&mut chunk).unwrap();
    assert_eq!(&chunk, b"fghij");
    original.read_exact(&mut chunk).unwrap();
    assert_eq!(&chunk, b"klmno");
}

#[test]
fn undersized_buffer_leaves_stream_remainder_readable() {
    let (a, b) = PassSocket::stream_pair().unwrap();
    let file = zeros_file("resync", 512);

    assert_eq!(send_fd(&a, &file, b"long string is long").unwrap(), 19);

    let mut buf = [0u8; 11];
    let outcome = recv_fd(&b, &mut buf).unwrap();
    assert!(outcome.has_descriptor());
    assert_eq!(outcome.payload_len(), 11);
    assert_eq!(&buf, b"long string");

    // The rest of the stream bytes are still queued.
    let mut rest = [0u8; 16];
    let n = b.recv_plain(&mut rest).unwrap();
    assert_eq!(&rest[..n], b" is long");
}

#[test]
fn undersized_buffer_discards_datagram_remainder() {
    let (a, b) = PassSocket::datagram_pair().unwrap();
    let file = zeros_file("discard", 512);

    assert_eq!(send_fd(&a, &file, b"long string is long").unwrap(), 19);
    assert_eq!(send_fd(&a, &file, b"next").unwrap(), 4);

    let mut buf = [0u8; 11];
    let outcome = recv_fd(&b, &mut buf).unwrap();
    assert!(outcome.has_descriptor());
    assert_eq!(&buf[..outcome.payload_len()], b"long string");

    // The truncated datagram's tail is gone; the next receive returns the
    // next discrete message.
    let mut next = [0u8; 16];
    let outcome = recv_fd(&b, &mut next).unwrap();
    assert_eq!(&next[..outcome.payload_len()], b"next");
}

#[test]
fn zero_length_send_is_invisible_on_datagram() {
    let (a, b) = PassSocket::datagram_pair().unwrap();
    let file = zeros_file("dgram-empty", 512);

    assert_eq!(send_fd(&a, &file, b"").unwrap(), 0);
    assert_eq!(send_fd(&a, &file, b"visible").unwrap(), 7);

    let mut buf = [0u8; 16];
    let outcome = recv_fd(&b, &mut buf).unwrap();
    assert_eq!(&buf[..outcome.payload_len()], b"visible");
}

#[test]
fn end_of_stream_reports_closed() {
    let (a, b) = PassSocket::stream_pair().unwrap();
    drop(a);

    let mut buf = [0u8; 16];
    assert!(matches!(
        recv_fd(&b, &mut buf).unwrap_err(),
        RightsError::Closed
    ));
}
