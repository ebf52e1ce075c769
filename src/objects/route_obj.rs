//
// Copyright (c) 2024 Oracle and/or its affiliates. All rights reserved.
//
// Licensed under the Universal Permissive License v 1.0 as shown at
//  https://oss.oracle.com/licenses/upl/
//
//! `DsonRouteObj`: a four-field routing address, registered under the
//! `Vec<u32>` marker so it rides the same converter as that reserved
//! type. One of the two in-tree opaque object examples named by the
//! spec (§4.3); single-payload, no child iterator.

use crate::byte_order::{self, ByteOrder};
use crate::dson_obj::{DsonObj, State, XferResult};
use crate::error::DsonError;
use crate::header::{Header, HEADER_LEN};
use crate::io::{BufSink, FdOutcome, FdSink};
use crate::type_marker::TypeMarker;

/// Who a routed message is from/to: reverse-server, reverse-client,
/// forward-server, forward-client ids. A server sees `0` in any of
/// these fields as "fill in myself".
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
#[repr(C)]
pub struct Address {
    pub from_serv_id: u32,
    pub from_cli_id: u32,
    pub to_serv_id: u32,
    pub to_cli_id: u32,
}

pub const ADDRESS_SIZE: usize = 16;
const RECORD_LEN: usize = HEADER_LEN + ADDRESS_SIZE;

pub struct DsonRouteObj {
    buf: [u8; RECORD_LEN],
    order: ByteOrder,
    state: State,
    offset: usize,
}

impl DsonRouteObj {
    pub fn new(key: i32) -> DsonRouteObj {
        let mut obj = DsonRouteObj {
            buf: [0u8; RECORD_LEN],
            order: ByteOrder::Host,
            state: State::Ready,
            offset: 0,
        };
        let header = Header::new(key, crate::type_marker::VEC_U32, ADDRESS_SIZE as i32);
        obj.buf[..HEADER_LEN].copy_from_slice(&header.encode(ByteOrder::Host));
        obj
    }

    pub fn with_reverse_address(key: i32, from: &Address) -> DsonRouteObj {
        let mut obj = DsonRouteObj::new(key);
        obj.set_address(Address {
            from_serv_id: from.to_serv_id,
            from_cli_id: from.to_cli_id,
            to_serv_id: from.from_serv_id,
            to_cli_id: from.from_cli_id,
        });
        obj
    }

    pub fn address(&mut self) -> Address {
        self.to_host_order();
        let p = &self.buf[HEADER_LEN..];
        Address {
            from_serv_id: u32::from_ne_bytes(p[0..4].try_into().unwrap()),
            from_cli_id: u32::from_ne_bytes(p[4..8].try_into().unwrap()),
            to_serv_id: u32::from_ne_bytes(p[8..12].try_into().unwrap()),
            to_cli_id: u32::from_ne_bytes(p[12..16].try_into().unwrap()),
        }
    }

    pub fn set_address(&mut self, address: Address) {
        self.to_host_order();
        let p = &mut self.buf[HEADER_LEN..];
        p[0..4].copy_from_slice(&address.from_serv_id.to_ne_bytes());
        p[4..8].copy_from_slice(&address.from_cli_id.to_ne_bytes());
        p[8..12].copy_from_slice(&address.to_serv_id.to_ne_bytes());
        p[12..16].copy_from_slice(&address.to_cli_id.to_ne_bytes());
    }

    fn to_host_order(&mut self) {
        if self.order == ByteOrder::Host {
            return;
        }
        self.flip_whole_buffer();
        self.order = ByteOrder::Host;
    }

    fn to_network_order(&mut self) {
        if self.order == ByteOrder::Network {
            return;
        }
        self.flip_whole_buffer();
        self.order = ByteOrder::Network;
    }

    fn flip_whole_buffer(&mut self) {
        for chunk in self.buf.chunks_exact_mut(4) {
            byte_order::flip32(chunk);
        }
    }

    fn begin_copy(&mut self, order: ByteOrder) {
        match order {
            ByteOrder::Host => self.to_host_order(),
            ByteOrder::Network => self.to_network_order(),
        }
        self.state = State::CopyingHeader;
        self.offset = 0;
    }

    fn copy_to_fd_local(&mut self, sink: &mut FdSink) -> XferResult {
        match self.state {
            State::CopyingHeader => {
                match sink.write_some(&self.buf[self.offset..]) {
                    FdOutcome::Transferred(n) => {
                        self.offset += n;
                        if self.offset < RECORD_LEN {
                            XferResult::InProcess
                        } else {
                            self.state = State::Ready;
                            self.offset = 0;
                            XferResult::Ready
                        }
                    }
                    FdOutcome::WouldBlock => XferResult::InProcess,
                    FdOutcome::Error(_) => {
                        self.state = State::Error;
                        XferResult::Error
                    }
                }
            }
            _ => {
                self.state = State::Error;
                XferResult::Error
            }
        }
    }

    fn copy_to_buf_local(&mut self, sink: &mut BufSink) -> XferResult {
        match self.state {
            State::CopyingHeader => {
                let n = sink.write_some(&self.buf[self.offset..]);
                self.offset += n;
                if self.offset < RECORD_LEN {
                    XferResult::InProcess
                } else {
                    self.state = State::Ready;
                    self.offset = 0;
                    XferResult::Ready
                }
            }
            _ => {
                self.state = State::Error;
                XferResult::Error
            }
        }
    }
}

impl DsonObj for DsonRouteObj {
    fn is_host_order(&self) -> bool {
        self.order == ByteOrder::Host
    }

    fn data_size(&self) -> i32 {
        ADDRESS_SIZE as i32
    }

    fn key(&self) -> i32 {
        let (header, _) = Header::decode(&self.buf[..HEADER_LEN]).unwrap();
        header.key
    }

    fn set_key(&mut self, key: i32) -> Result<(), DsonError> {
        if key < 0 {
            return crate::error::fe_err!("negative key {} is not permitted", key);
        }
        let was_host = self.order == ByteOrder::Host;
        self.to_host_order();
        self.buf[8..12].copy_from_slice(&key.to_ne_bytes());
        if !was_host {
            self.to_network_order();
        }
        Ok(())
    }

    fn data_type(&self) -> TypeMarker {
        crate::type_marker::VEC_U32
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
        self.to_host_order();
        sink.write_all(&self.buf)?;
        Ok(())
    }

    fn copy_to_stream_network_order(
        &mut self,
        sink: &mut dyn std::io::Write,
    ) -> Result<(), DsonError> {
        self.to_network_order();
        sink.write_all(&self.buf)?;
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

/// Extracts the routed reply address from a generic `DsonObj`,
/// mirroring the source's `to_address` free function: works whether
/// the value is a parsed `Dson` container field or a standalone
/// `DsonRouteObj`.
pub fn to_address(obj: &mut DsonRouteObj) -> Address {
    obj.address()
}
