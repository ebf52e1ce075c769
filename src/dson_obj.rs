//
// Copyright (c) 2024 Oracle and/or its affiliates. All rights reserved.
//
// Licensed under the Universal Permissive License v 1.0 as shown at
//  https://oss.oracle.com/licenses/upl/
//
//! The polymorphic value capability set (§4.1): every DSON value --
//! the hybrid `Dson` engine itself, and the opaque example object
//! types -- implements `DsonObj`.

use crate::error::DsonError;
use crate::header::Header;
use crate::io::{BufSink, FdSink};
use crate::type_marker::TypeMarker;

/// The three-valued outcome of a single resumable I/O step.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum XferResult {
    /// The sink/source accepted 0 bytes but is not broken (EAGAIN);
    /// call again later with the same value.
    InProcess,
    /// The requested transfer has fully completed.
    Ready,
    /// A hard, non-recoverable error occurred; the value is now in
    /// the `Error` state.
    Error,
}

/// The lifecycle state of a value, per the resumable I/O state
/// machine in §4.2.5.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum State {
    Ready,
    LoadingHeader,
    LoadingData,
    CopyingHeader,
    CopyingData,
    Error,
}

pub trait DsonObj {
    fn is_host_order(&self) -> bool;

    fn is_network_order(&self) -> bool {
        !self.is_host_order()
    }

    fn data_size(&self) -> i32;
    fn key(&self) -> i32;
    fn set_key(&mut self, key: i32) -> Result<(), DsonError>;
    fn data_type(&self) -> TypeMarker;

    fn header(&self) -> Header {
        Header::new(self.key(), self.data_type(), self.data_size())
    }

    fn state(&self) -> State;
    fn reset_state(&mut self) -> Result<(), DsonError>;

    /// Blocking write of the full record (header + payload) to a
    /// byte sink, in host order.
    fn copy_to_stream_host_order(
        &mut self,
        sink: &mut dyn std::io::Write,
    ) -> Result<(), DsonError>;

    /// Blocking write of the full record to a byte sink, in network
    /// order.
    fn copy_to_stream_network_order(
        &mut self,
        sink: &mut dyn std::io::Write,
    ) -> Result<(), DsonError>;

    /// Resumable write to a non-blocking file descriptor, host order.
    fn copy_to_fd_host_order(&mut self, sink: &mut FdSink) -> XferResult;

    /// Resumable write to a non-blocking file descriptor, network
    /// order.
    fn copy_to_fd_network_order(&mut self, sink: &mut FdSink) -> XferResult;

    /// Resumable write into a caller-supplied buffer, host order.
    fn copy_to_buf_host_order(&mut self, sink: &mut BufSink) -> XferResult;

    /// Resumable write into a caller-supplied buffer, network order.
    fn copy_to_buf_network_order(&mut self, sink: &mut BufSink) -> XferResult;
}
