//
// Copyright (c) 2024 Oracle and/or its affiliates. All rights reserved.
//
// Licensed under the Universal Permissive License v 1.0 as shown at
//  https://oss.oracle.com/licenses/upl/
//
//! Non-blocking file-descriptor read/write, per §6.3's second
//! sink/source kind.
//!
//! Setting a descriptor non-blocking (`fcntl(O_NONBLOCK)`) and
//! creating the pipe/socket itself are explicitly out of scope (§1):
//! callers hand this module an already-non-blocking fd. This module
//! only performs the `read(2)`/`write(2)` calls and translates
//! `EAGAIN`/`EWOULDBLOCK` per the spec's error taxonomy (§7.2).

use std::os::unix::io::RawFd;

/// The outcome of a single non-blocking `read`/`write` attempt.
#[derive(Debug)]
pub enum FdOutcome {
    /// `n` bytes were transferred.
    Transferred(usize),
    /// The call returned `EAGAIN`/`EWOULDBLOCK`: zero bytes, sink/
    /// source not broken.
    WouldBlock,
    /// A hard I/O error (any other errno, or end-of-file on read).
    Error(std::io::Error),
}

pub struct FdSink {
    fd: RawFd,
}

impl FdSink {
    pub fn new(fd: RawFd) -> FdSink {
        FdSink { fd }
    }

    pub fn write_some(&mut self, bytes: &[u8]) -> FdOutcome {
        if bytes.is_empty() {
            return FdOutcome::Transferred(0);
        }
        let n = unsafe {
            libc::write(
                self.fd,
                bytes.as_ptr() as *const libc::c_void,
                bytes.len(),
            )
        };
        classify_write(n)
    }
}

pub struct FdSource {
    fd: RawFd,
}

impl FdSource {
    pub fn new(fd: RawFd) -> FdSource {
        FdSource { fd }
    }

    pub fn read_some(&mut self, out: &mut [u8]) -> FdOutcome {
        if out.is_empty() {
            return FdOutcome::Transferred(0);
        }
        let n = unsafe {
            libc::read(self.fd, out.as_mut_ptr() as *mut libc::c_void, out.len())
        };
        classify_read(n)
    }
}

/// `write(2)` returning `0` for a non-empty buffer is not meaningful
/// on its own (we never ask for a zero-length write past the
/// `is_empty` short-circuit above), so treat any non-negative count
/// as a transfer.
fn classify_write(n: isize) -> FdOutcome {
    if n >= 0 {
        return FdOutcome::Transferred(n as usize);
    }
    classify_negative(n)
}

/// `read(2)` returning `0` is end-of-file, not a retryable zero-byte
/// transfer -- the peer has closed its end and no more bytes will
/// ever arrive, so this must surface as a hard error rather than let
/// a caller's retry loop spin on it forever.
fn classify_read(n: isize) -> FdOutcome {
    if n > 0 {
        return FdOutcome::Transferred(n as usize);
    }
    if n == 0 {
        return FdOutcome::Error(std::io::Error::new(
            std::io::ErrorKind::UnexpectedEof,
            "read returned 0: peer closed its end",
        ));
    }
    classify_negative(n)
}

fn classify_negative(n: isize) -> FdOutcome {
    debug_assert!(n < 0);
    let err = std::io::Error::last_os_error();
    match err.raw_os_error() {
        Some(libc::EAGAIN) | Some(libc::EWOULDBLOCK) => FdOutcome::WouldBlock,
        _ => FdOutcome::Error(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::io::FromRawFd;

    fn make_nonblocking_pipe() -> (std::fs::File, std::fs::File) {
        let mut fds = [0 as libc::c_int; 2];
        let rc = unsafe { libc::pipe(fds.as_mut_ptr()) };
        assert_eq!(rc, 0);
        for fd in fds {
            let flags = unsafe { libc::fcntl(fd, libc::F_GETFL) };
            unsafe { libc::fcntl(fd, libc::F_SETFL, flags | libc::O_NONBLOCK) };
        }
        unsafe {
            (
                std::fs::File::from_raw_fd(fds[0]),
                std::fs::File::from_raw_fd(fds[1]),
            )
        }
    }

    #[test]
    fn write_then_read_transfers_bytes() {
        use std::os::unix::io::AsRawFd;
        let (read_end, write_end) = make_nonblocking_pipe();
        let mut sink = FdSink::new(write_end.as_raw_fd());
        let mut source = FdSource::new(read_end.as_raw_fd());

        match sink.write_some(b"hello") {
            FdOutcome::Transferred(5) => {}
            other => panic!("unexpected write outcome: {:?}", other),
        }
        let mut buf = [0u8; 8];
        match source.read_some(&mut buf) {
            FdOutcome::Transferred(5) => assert_eq!(&buf[..5], b"hello"),
            other => panic!("unexpected read outcome: {:?}", other),
        }
    }

    #[test]
    fn read_on_empty_nonblocking_pipe_would_block() {
        use std::os::unix::io::AsRawFd;
        let (read_end, _write_end) = make_nonblocking_pipe();
        let mut source = FdSource::new(read_end.as_raw_fd());
        let mut buf = [0u8; 8];
        match source.read_some(&mut buf) {
            FdOutcome::WouldBlock => {}
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[test]
    fn read_after_writer_closes_is_an_error_not_would_block() {
        use std::os::unix::io::AsRawFd;
        let (read_end, write_end) = make_nonblocking_pipe();
        drop(write_end);
        let mut source = FdSource::new(read_end.as_raw_fd());
        let mut buf = [0u8; 8];
        match source.read_some(&mut buf) {
            FdOutcome::Error(e) => assert_eq!(e.kind(), std::io::ErrorKind::UnexpectedEof),
            other => panic!("unexpected outcome: {:?}", other),
        }
    }
}
