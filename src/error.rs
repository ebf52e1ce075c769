//
// Copyright (c) 2024 Oracle and/or its affiliates. All rights reserved.
//
// Licensed under the Universal Permissive License v 1.0 as shown at
//  https://oss.oracle.com/licenses/upl/
//
use num_enum::TryFromPrimitive;

/// Error type returned by all fallible DSON operations.
#[derive(Debug, Clone)]
pub struct DsonError {
    pub code: DsonErrorCode,
    pub message: String,
}

impl std::error::Error for DsonError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        None
    }
}

impl std::fmt::Display for DsonError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "code={:?} message=\"{}\"", self.code, self.message)
    }
}

impl DsonError {
    pub fn new(code: DsonErrorCode, msg: &str) -> DsonError {
        DsonError {
            code,
            message: msg.to_string(),
        }
    }
}

macro_rules! fe_err {
    ($($t:tt)*) => {{
        let m = format!($($t)*);
        Err(crate::error::DsonError {
            code: crate::error::DsonErrorCode::FramingError,
            message: m,
        })
    }};
}

pub(crate) use fe_err;

macro_rules! io_err {
    ($($t:tt)*) => {{
        let m = format!($($t)*);
        Err(crate::error::DsonError {
            code: crate::error::DsonErrorCode::IoError,
            message: m,
        })
    }};
}

pub(crate) use io_err;

macro_rules! alloc_err {
    ($($t:tt)*) => {{
        let m = format!($($t)*);
        Err(crate::error::DsonError {
            code: crate::error::DsonErrorCode::AllocationError,
            message: m,
        })
    }};
}

pub(crate) use alloc_err;

macro_rules! misuse_err {
    ($($t:tt)*) => {{
        let m = format!($($t)*);
        debug_assert!(false, "{}", m);
        Err(crate::error::DsonError {
            code: crate::error::DsonErrorCode::MisuseError,
            message: m,
        })
    }};
}

pub(crate) use misuse_err;

impl From<std::io::Error> for DsonError {
    fn from(e: std::io::Error) -> Self {
        DsonError {
            code: DsonErrorCode::IoError,
            message: e.to_string(),
        }
    }
}

// DsonErrorCode enumerates the error taxonomy from the spec's error
// handling design: framing errors (bad header fields or leftover
// parse residue), I/O errors (hard fd/stream failures), allocation
// errors (payload over the RAM cap or allocator failure), and misuse
// errors (structural access mid-transfer, or load/copy interleaved
// without a reset). A missing converter table entry is deliberately
// not represented here: it is not an error condition.
#[derive(Debug, Clone, Copy, Eq, PartialEq, TryFromPrimitive)]
#[repr(i32)]
pub enum DsonErrorCode {
    /// A header field was out of range, or a container parse left a
    /// non-zero residue after walking its declared children.
    FramingError = 1,

    /// A non-blocking fd or blocking stream operation returned a hard
    /// error (not EAGAIN/EWOULDBLOCK).
    IoError = 2,

    /// A requested buffer exceeds `MAX_DSON_RAM_SIZE`, or the
    /// allocator failed.
    AllocationError = 3,

    /// A structural access (`map`, `insert`, `get`) was attempted
    /// while the value was mid-transfer, or `load_from_fd`/
    /// `copy_to_fd` were interleaved without an intervening
    /// `reset_state`.
    MisuseError = 4,
}
