//
// Copyright (c) 2024 Oracle and/or its affiliates. All rights reserved.
//
// Licensed under the Universal Permissive License v 1.0 as shown at
//  https://oss.oracle.com/licenses/upl/
//
//! `DsonStringObj`: a move-string payload carried out-of-line from
//! its header buffer, per §4.3. The second in-tree opaque object
//! example named by the spec.

use crate::byte_order::ByteOrder;
use crate::dson_obj::{DsonObj, State, XferResult};
use crate::error::DsonError;
use crate::header::{Header, HEADER_LEN};
use crate::io::{BufSink, FdOutcome, FdSink};
use crate::type_marker::TypeMarker;

pub struct DsonStringObj {
    header_buf: [u8; HEADER_LEN],
    object: String,
    order: ByteOrder,
    state: State,
    offset: usize,
}

impl DsonStringObj {
    pub fn new(key: i32, object: String) -> DsonStringObj {
        let header = Header::new(key, crate::type_marker::STRING, object.len() as i32);
        DsonStringObj {
            header_buf: header.encode(ByteOrder::Host),
            object,
            order: ByteOrder::Host,
            state: State::Ready,
            offset: 0,
        }
    }

    pub fn object(&self) -> &str {
        &self.object
    }

    pub fn into_string(self) -> String {
        self.object
    }

    fn flip_header(&mut self) {
        for chunk in self.header_buf.chunks_exact_mut(4) {
            crate::byte_order::flip32(chunk);
        }
    }

    fn prepare_header(&mut self, order: ByteOrder) {
        if self.order == order {
            return;
        }
        self.flip_header();
        self.order = order;
    }

    fn begin_copy(&mut self, order: ByteOrder) {
        self.prepare_header(order);
        self.state = State::CopyingHeader;
        self.offset = 0;
    }

    fn copy_to_fd_local(&mut self, sink: &mut FdSink) -> XferResult {
        loop {
            match self.state {
                State::CopyingHeader => {
                    match sink.write_some(&self.header_buf[self.offset..]) {
                        FdOutcome::Transferred(n) => {
                            self.offset += n;
                            if self.offset < HEADER_LEN {
                                return XferResult::InProcess;
                            }
                            self.state = State::CopyingData;
                            self.offset = 0;
                        }
                        FdOutcome::WouldBlock => return XferResult::InProcess,
                        FdOutcome::Error(_) => {
                            self.state = State::Error;
                            return XferResult::Error;
                        }
                    }
                }
                State::CopyingData => {
                    let bytes = self.object.as_bytes();
                    match sink.write_some(&bytes[self.offset..]) {
                        FdOutcome::Transferred(n) => {
                            self.offset += n;
                            if self.offset < bytes.len() {
                                return XferResult::InProcess;
                            }
                            self.state = State::Ready;
                            self.offset = 0;
                            return XferResult::Ready;
                        }
                        FdOutcome::WouldBlock => return XferResult::InProcess,
                        FdOutcome::Error(_) => {
                            self.state = State::Error;
                            return XferResult::Error;
                        }
                    }
                }
                _ => {
                    self.state = State::Error;
                    return XferResult::Error;
                }
            }
        }
    }

    fn copy_to_buf_local(&mut self, sink: &mut BufSink) -> XferResult {
        loop {
            match self.state {
                State::CopyingHeader => {
                    let n = sink.write_some(&self.header_buf[self.offset..]);
                    self.offset += n;
                    if self.offset < HEADER_LEN {
                        return XferResult::InProcess;
                    }
                    self.state = State::CopyingData;
                    self.offset = 0;
                    if sink.remaining() == 0 {
                        return XferResult::InProcess;
                    }
                }
                State::CopyingData => {
                    let bytes = self.object.as_bytes();
                    let n = sink.write_some(&bytes[self.offset..]);
                    self.offset += n;
                    if self.offset < bytes.len() {
                        return XferResult::InProcess;
                    }
                    self.state = State::Ready;
                    self.offset = 0;
                    return XferResult::Ready;
                }
                _ => {
                    self.state = State::Error;
                    return XferResult::Error;
                }
            }
        }
    }
}

impl DsonObj for DsonStringObj {
    fn is_host_order(&self) -> bool {
        self.order == ByteOrder::Host
    }

    fn data_size(&self) -> i32 {
        self.object.len() as i32
    }

    fn key(&self) -> i32 {
        let (header, _) = Header::decode(&self.header_buf).unwrap();
        header.key
    }

    fn set_key(&mut self, key: i32) -> Result<(), DsonError> {
        if key < 0 {
            return crate::error::fe_err!("negative key {} is not permitted", key);
        }
        let order = self.order;
        self.prepare_header(ByteOrder::Host);
        self.header_buf[8..12].copy_from_slice(&key.to_ne_bytes());
        self.prepare_header(order);
        Ok(())
    }

    fn data_type(&self) -> TypeMarker {
        crate::type_marker::STRING
    }

    fn state(&self) -> State {
        self.state
    }

    fn reset_state(&mut self) -> Result<(), DsonError> {
        self.state = State::Ready;
        self.offset = 0;
        Ok(())
    }

    fn copy_to_stream_host_order(
        &mut self,
        sink: &mut dyn std::io::Write,
    ) -> Result<(), DsonError> {
        self.prepare_header(ByteOrder::Host);
        sink.write_all(&self.header_buf)?;
        sink.write_all(self.object.as_bytes())?;
        Ok(())
    }

    fn copy_to_stream_network_order(
        &mut self,
        sink: &mut dyn std::io::Write,
    ) -> Result<(), DsonError> {
        self.prepare_header(ByteOrder::Network);
        sink.write_all(&self.header_buf)?;
        sink.write_all(self.object.as_bytes())?;
        Ok(())
    }

    fn copy_to_fd_host_order(&mut self, sink: &mut FdSink) -> XferResult {
        if self.state == State::Ready {
            self.begin_copy(ByteOrder::Host);
        }
        self.copy_to_fd_local(sink)
    }

    fn copy_to_fd_network_order(&mut self, sink: &mut FdSink) -> XferResult {
        if self.state == State::Ready {
            self.begin_copy(ByteOrder::Network);
        }
        self.copy_to_fd_local(sink)
    }

    fn copy_to_buf_host_order(&mut self, sink: &mut BufSink) -> XferResult {
        if self.state == State::Ready {
            self.begin_copy(ByteOrder::Host);
        }
        self.copy_to_buf_local(sink)
    }

    fn copy_to_buf_network_order(&mut self, sink: &mut BufSink) -> XferResult {
        if self.state == State::Ready {
            self.begin_copy(ByteOrder::Network);
        }
        self.copy_to_buf_local(sink)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_captures_len_and_key() {
        let obj = DsonStringObj::new(3, "hello".to_string());
        assert_eq!(obj.key(), 3);
        assert_eq!(obj.data_size(), 5);
        assert_eq!(obj.object(), "hello");
    }

    #[test]
    fn copy_to_stream_network_order_is_header_then_payload() {
        let mut obj = DsonStringObj::new(1, "ab".to_string());
        let mut out = Vec::new();
        obj.copy_to_stream_network_order(&mut out).unwrap();
        assert_eq!(out.len(), HEADER_LEN + 2);
        assert_eq!(&out[HEADER_LEN..], b"ab");
        let (header, order) = Header::decode(&out[..HEADER_LEN]).unwrap();
        assert_eq!(order, ByteOrder::Network);
        assert_eq!(header.key, 1);
        assert_eq!(header.data_size, 2);
    }

    #[test]
    fn copy_to_buf_resumes_across_small_chunks() {
        let mut obj = DsonStringObj::new(1, "a long-ish string value".to_string());
        let total = HEADER_LEN + obj.object.len();
        let mut out = vec![0u8; total];
        let mut done = 0;
        loop {
            let chunk_len = 3.min(out.len() - done);
            if chunk_len == 0 {
                break;
            }
            let mut sink = BufSink::new(&mut out[done..done + chunk_len]);
            match obj.copy_to_buf_host_order(&mut sink) {
                XferResult::Ready => {
                    done += chunk_len;
                    break;
                }
                XferResult::InProcess => done += chunk_len,
                XferResult::Error => panic!("unexpected error"),
            }
        }
        assert_eq!(&out[HEADER_LEN..], obj.object().as_bytes());
    }
}
