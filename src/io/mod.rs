//
// Copyright (c) 2024 Oracle and/or its affiliates. All rights reserved.
//
// Licensed under the Universal Permissive License v 1.0 as shown at
//  https://oss.oracle.com/licenses/upl/
//
//! Sink/source interfaces the core consumes (§6.3): a blocking byte
//! sink (just `std::io::Write`), a non-blocking file descriptor, and
//! a caller-supplied buffer with an explicit cursor.

mod buf;
mod fd;

pub use buf::{BufSink, BufSource};
pub use fd::{FdOutcome, FdSink, FdSource};

// The blocking byte-sink contract from §6.3 is modeled directly as
// `&mut dyn std::io::Write`: `copy_to_stream_*` is blocking by
// contract, so a short write is always retried internally rather
// than surfaced to the caller.

/// A single resumable write attempt, generic over the fd and buffer
/// sink kinds so the container-walking engine in [`crate::dson`] can
/// drive either one with the same loop.
pub enum TransferOutcome {
    Transferred(usize),
    WouldBlock,
    Error,
}

pub trait WriteTransport {
    fn write_some(&mut self, bytes: &[u8]) -> TransferOutcome;
}

impl WriteTransport for FdSink {
    fn write_some(&mut self, bytes: &[u8]) -> TransferOutcome {
        match FdSink::write_some(self, bytes) {
            FdOutcome::Transferred(n) => TransferOutcome::Transferred(n),
            FdOutcome::WouldBlock => TransferOutcome::WouldBlock,
            FdOutcome::Error(_) => TransferOutcome::Error,
        }
    }
}

impl WriteTransport for BufSink<'_> {
    fn write_some(&mut self, bytes: &[u8]) -> TransferOutcome {
        TransferOutcome::Transferred(BufSink::write_some(self, bytes))
    }
}

/// The read-side counterpart of [`WriteTransport`], driving
/// `load_from_fd`/`load_from_buf`.
pub trait ReadTransport {
    fn read_some(&mut self, out: &mut [u8]) -> TransferOutcome;
}

impl ReadTransport for FdSource {
    fn read_some(&mut self, out: &mut [u8]) -> TransferOutcome {
        match FdSource::read_some(self, out) {
            FdOutcome::Transferred(n) => TransferOutcome::Transferred(n),
            FdOutcome::WouldBlock => TransferOutcome::WouldBlock,
            FdOutcome::Error(_) => TransferOutcome::Error,
        }
    }
}

impl ReadTransport for BufSource<'_> {
    fn read_some(&mut self, out: &mut [u8]) -> TransferOutcome {
        TransferOutcome::Transferred(BufSource::read_some(self, out))
    }
}
