//
// Copyright (c) 2024 Oracle and/or its affiliates. All rights reserved.
//
// Licensed under the Universal Permissive License v 1.0 as shown at
//  https://oss.oracle.com/licenses/upl/
//
//! A caller-supplied mutable byte slice with an explicit cursor and
//! remaining length, per §6.3's third sink/source kind.

/// A resumable write target into a caller-owned buffer.
pub struct BufSink<'a> {
    buf: &'a mut [u8],
    cursor: usize,
}

impl<'a> BufSink<'a> {
    pub fn new(buf: &'a mut [u8]) -> BufSink<'a> {
        BufSink { buf, cursor: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.cursor
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Copies as much of `bytes` as fits into the remaining space,
    /// advancing the cursor, and returns how many bytes were copied.
    /// Returning less than `bytes.len()` is not an error -- the
    /// engine resumes on the next call.
    pub fn write_some(&mut self, bytes: &[u8]) -> usize {
        let n = bytes.len().min(self.remaining());
        self.buf[self.cursor..self.cursor + n].copy_from_slice(&bytes[..n]);
        self.cursor += n;
        n
    }
}

/// A resumable read source from a caller-owned buffer.
pub struct BufSource<'a> {
    buf: &'a [u8],
    cursor: usize,
}

impl<'a> BufSource<'a> {
    pub fn new(buf: &'a [u8]) -> BufSource<'a> {
        BufSource { buf, cursor: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.cursor
    }

    /// Copies up to `out.len()` bytes from the source into `out`,
    /// advancing the cursor, and returns how many bytes were copied.
    pub fn read_some(&mut self, out: &mut [u8]) -> usize {
        let n = out.len().min(self.remaining());
        out[..n].copy_from_slice(&self.buf[self.cursor..self.cursor + n]);
        self.cursor += n;
        n
    }
}
