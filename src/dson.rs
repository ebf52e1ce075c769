//
// Copyright (c) 2024 Oracle and/or its affiliates. All rights reserved.
//
// Licensed under the Universal Permissive License v 1.0 as shown at
//  https://oss.oracle.com/licenses/upl/
//
//! The hybrid `Dson` value/codec engine (§3.3, §4.2): every value
//! starts as one of three kinds -- `Container` (a parsed map of
//! children), `OneObjectInBuf` (a single scalar/opaque record already
//! materialized), or `DataBufNeedParse` (an unparsed buffer, walked
//! only when structural access forces it) -- and carries its own
//! resumable I/O cursor so a deeply nested value can be read or
//! written across many non-blocking calls.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::byte_order::ByteOrder;
use crate::converter;
use crate::dson_obj::{DsonObj, State, XferResult};
use crate::error::{fe_err, misuse_err, DsonError};
use crate::header::{Header, HEADER_LEN, MAX_DSON_RAM_SIZE};
use crate::io::{
    BufSink, BufSource, FdSink, FdSource, ReadTransport, TransferOutcome, WriteTransport,
};
use crate::type_marker::TypeMarker;

/// Owned bytes, or a zero-copy view into a buffer shared (via `Arc`)
/// with the rest of the tree it was parsed out of. Per the "a value
/// that currently borrows an external buffer must copy the borrowed
/// bytes into an owned allocation before any in-place mutation"
/// invariant, [`Storage::as_mut_slice`] always copies a `View` out
/// first.
#[derive(Clone)]
enum Storage {
    Owned(Vec<u8>),
    View { buf: Arc<[u8]>, start: usize, len: usize },
}

impl Storage {
    fn as_slice(&self) -> &[u8] {
        match self {
            Storage::Owned(v) => v.as_slice(),
            Storage::View { buf, start, len } => &buf[*start..*start + *len],
        }
    }

    fn as_mut_slice(&mut self) -> &mut [u8] {
        if let Storage::View { buf, start, len } = self {
            *self = Storage::Owned(buf[*start..*start + *len].to_vec());
        }
        match self {
            Storage::Owned(v) => v.as_mut_slice(),
            Storage::View { .. } => unreachable!("just copied out above"),
        }
    }

    fn len(&self) -> usize {
        match self {
            Storage::Owned(v) => v.len(),
            Storage::View { len, .. } => *len,
        }
    }
}

enum DsonData {
    Container(BTreeMap<i32, Dson>),
    OneObjectInBuf(Storage),
    DataBufNeedParse(Storage),
}

/// Per-value resumable cursor. Load and copy never run concurrently on
/// the same value, so the fields double up across both directions.
#[derive(Default)]
struct IoCursor {
    offset: usize,
    header_scratch: [u8; HEADER_LEN],
    loading_payload: Vec<u8>,
    child_keys: Vec<i32>,
    child_index: usize,
}

/// The hybrid value/codec engine described in §3.3.
pub struct Dson {
    key: i32,
    data_type: TypeMarker,
    order: ByteOrder,
    state: State,
    data: DsonData,
    io: IoCursor,
}

impl Dson {
    /// An empty container, the root most callers start from.
    pub fn empty() -> Dson {
        Dson {
            key: 0,
            data_type: crate::type_marker::CONTAINER,
            order: ByteOrder::Host,
            state: State::Ready,
            data: DsonData::Container(BTreeMap::new()),
            io: IoCursor::default(),
        }
    }

    fn new_scalar(key: i32, data_type: TypeMarker, payload: Vec<u8>) -> Result<Dson, DsonError> {
        if key < 0 {
            return fe_err!("negative key {} is not permitted", key);
        }
        Header::validate_data_size(payload.len() as i32)?;
        Ok(Dson {
            key,
            data_type,
            order: ByteOrder::Host,
            state: State::Ready,
            data: DsonData::OneObjectInBuf(Storage::Owned(payload)),
            io: IoCursor::default(),
        })
    }

    pub fn from_i32(key: i32, value: i32) -> Result<Dson, DsonError> {
        Dson::new_scalar(key, crate::type_marker::I32, value.to_ne_bytes().to_vec())
    }

    pub fn from_u32(key: i32, value: u32) -> Result<Dson, DsonError> {
        Dson::new_scalar(key, crate::type_marker::U32, value.to_ne_bytes().to_vec())
    }

    pub fn from_i64(key: i32, value: i64) -> Result<Dson, DsonError> {
        Dson::new_scalar(key, crate::type_marker::I64, value.to_ne_bytes().to_vec())
    }

    pub fn from_u64(key: i32, value: u64) -> Result<Dson, DsonError> {
        Dson::new_scalar(key, crate::type_marker::U64, value.to_ne_bytes().to_vec())
    }

    pub fn from_string(key: i32, value: impl Into<String>) -> Result<Dson, DsonError> {
        Dson::new_scalar(key, crate::type_marker::STRING, value.into().into_bytes())
    }

    /// Encodes `value` via the fixed-point open-question resolution
    /// (`SPEC_FULL.md` §9, [`crate::objects::fixed_point`]).
    pub fn from_fixed_point(key: i32, value: f64) -> Result<Dson, DsonError> {
        let scaled = crate::objects::fixed_point::encode(value)?;
        Dson::new_scalar(
            key,
            crate::type_marker::FIXED_POINT,
            scaled.to_ne_bytes().to_vec(),
        )
    }

    /// Adopts a buffer shared with the rest of the tree it came from,
    /// without copying its payload (§4.2.1, "from a raw byte pointer
    /// (view)"). Container-typed payloads become `DataBufNeedParse`
    /// and stay unwalked until a structural access forces them open;
    /// anything else becomes `OneObjectInBuf` directly, since its
    /// shape is already fully known from its own header.
    pub fn adopt_view(buf: Arc<[u8]>) -> Result<Dson, DsonError> {
        let len = buf.len();
        Dson::adopt_from_storage(Storage::View { buf, start: 0, len })
    }

    /// Adopts an owned buffer the caller no longer needs, again
    /// without copying (the bytes are already ours).
    pub fn adopt_owned(buf: Vec<u8>) -> Result<Dson, DsonError> {
        Dson::adopt_from_storage(Storage::Owned(buf))
    }

    fn adopt_from_storage(full: Storage) -> Result<Dson, DsonError> {
        let all = full.as_slice();
        if all.len() < HEADER_LEN {
            return fe_err!(
                "buffer of {} bytes is too small to hold a {}-byte header",
                all.len(),
                HEADER_LEN
            );
        }
        let (header, order) = Header::decode(&all[..HEADER_LEN])?;
        let declared_end = HEADER_LEN + header.data_size as usize;
        if all.len() < declared_end {
            return fe_err!(
                "header declares {} payload bytes but the buffer only has {}",
                header.data_size,
                all.len() - HEADER_LEN
            );
        }
        let payload = match full {
            Storage::Owned(mut v) => {
                v.truncate(declared_end);
                v.drain(0..HEADER_LEN);
                Storage::Owned(v)
            }
            Storage::View { buf, start, .. } => Storage::View {
                buf,
                start: start + HEADER_LEN,
                len: header.data_size as usize,
            },
        };
        let data = if header.data_type == crate::type_marker::CONTAINER {
            DsonData::DataBufNeedParse(payload)
        } else {
            DsonData::OneObjectInBuf(payload)
        };
        Ok(Dson {
            key: header.key,
            data_type: header.data_type,
            order,
            state: State::Ready,
            data,
            io: IoCursor::default(),
        })
    }

    fn current_header(&self) -> Header {
        Header::new(self.key, self.data_type, self.data_size())
    }

    /// Logs a transition into the `Error` state, naming the value's
    /// key/type/size so an operator can tell which record in a large
    /// tree actually failed.
    fn log_error_transition(&self, context: &str) {
        tracing::error!(
            key = self.key,
            data_type = self.data_type,
            data_size = self.data_size(),
            "{}",
            context
        );
    }

    /// Walks an unparsed container payload into a `BTreeMap` of fully
    /// independent children, each carrying its own header and byte
    /// order -- every record is self-describing, so no order needs to
    /// be threaded down from the parent (§4.2.2).
    fn parse_buf(&mut self) -> Result<(), DsonError> {
        let shared: Arc<[u8]> = match std::mem::replace(&mut self.data, DsonData::Container(BTreeMap::new())) {
            DsonData::DataBufNeedParse(Storage::Owned(v)) => Arc::from(v.into_boxed_slice()),
            DsonData::DataBufNeedParse(Storage::View { buf, start, len }) => {
                if start == 0 && len == buf.len() {
                    buf
                } else {
                    Arc::from(buf[start..start + len].to_vec().into_boxed_slice())
                }
            }
            other => {
                self.data = other;
                return misuse_err!("parse_buf called on a value that is not an unparsed container");
            }
        };

        tracing::debug!(bytes = shared.len(), "lazily parsing container payload");

        let mut map = BTreeMap::new();
        let mut pos = 0usize;
        while pos < shared.len() {
            if pos + HEADER_LEN > shared.len() {
                return fe_err!("truncated child header at offset {}", pos);
            }
            let (child_header, child_order) = Header::decode(&shared[pos..pos + HEADER_LEN])?;
            if child_header.key < 0 {
                return fe_err!("child key {} is negative", child_header.key);
            }
            let record_len = HEADER_LEN + child_header.data_size as usize;
            if pos + record_len > shared.len() {
                return fe_err!("child record at offset {} overruns its container", pos);
            }
            let payload = Storage::View {
                buf: shared.clone(),
                start: pos + HEADER_LEN,
                len: child_header.data_size as usize,
            };
            let child_data = if child_header.data_type == crate::type_marker::CONTAINER {
                DsonData::DataBufNeedParse(payload)
            } else {
                DsonData::OneObjectInBuf(payload)
            };
            map.insert(
                child_header.key,
                Dson {
                    key: child_header.key,
                    data_type: child_header.data_type,
                    order: child_order,
                    state: State::Ready,
                    data: child_data,
                    io: IoCursor::default(),
                },
            );
            pos += record_len;
        }
        if pos != shared.len() {
            return fe_err!("{} residual bytes after parsing container payload", shared.len() - pos);
        }

        self.data = DsonData::Container(map);
        self.data_type = crate::type_marker::CONTAINER;
        Ok(())
    }

    /// Wraps a single stored scalar as the sole child of a new map,
    /// keyed by its own key, promoting this value to `Container`
    /// (§4.2.3). Triggered by the first `insert` into a value that was
    /// `OneObjectInBuf`.
    fn promote_to_container(&mut self) -> Result<(), DsonError> {
        let (key, data_type, order, storage) =
            match std::mem::replace(&mut self.data, DsonData::Container(BTreeMap::new())) {
                DsonData::OneObjectInBuf(storage) => (self.key, self.data_type, self.order, storage),
                other => {
                    self.data = other;
                    return misuse_err!(
                        "promote_to_container called on a value that is not OneObjectInBuf"
                    );
                }
            };

        tracing::debug!(key, "promoting scalar value to container");

        let child = Dson {
            key,
            data_type,
            order,
            state: State::Ready,
            data: DsonData::OneObjectInBuf(storage),
            io: IoCursor::default(),
        };
        let mut map = BTreeMap::new();
        map.insert(key, child);
        self.data = DsonData::Container(map);
        self.data_type = crate::type_marker::CONTAINER;
        Ok(())
    }

    /// Forces this value into `Container` shape, whatever kind it
    /// started as. A `OneObjectInBuf` value accessed this way is
    /// treated the same as one freshly `insert`ed into: it is
    /// promoted, its sole stored record becoming the first child.
    fn ensure_container(&mut self) -> Result<(), DsonError> {
        if self.state != State::Ready {
            return misuse_err!("structural access attempted on a value mid-transfer");
        }
        match &self.data {
            DsonData::Container(_) => Ok(()),
            DsonData::DataBufNeedParse(_) => self.parse_buf(),
            DsonData::OneObjectInBuf(_) => self.promote_to_container(),
        }
    }

    /// On insert and map access, forces an immediate scalar child's
    /// header and payload to host order (§4.2, "byte-order accounting
    /// rules"). Containers and still-unparsed buffers normalize
    /// themselves lazily the next time they are themselves accessed.
    fn force_host_if_scalar(&mut self) -> Result<(), DsonError> {
        if let DsonData::OneObjectInBuf(storage) = &mut self.data {
            if self.order != ByteOrder::Host {
                flip_payload(self.data_type, ByteOrder::Host, storage.as_mut_slice());
                self.order = ByteOrder::Host;
            }
        }
        Ok(())
    }

    /// Returns this value's children, lazily parsing or promoting it
    /// into `Container` shape first if needed.
    pub fn map(&mut self) -> Result<&BTreeMap<i32, Dson>, DsonError> {
        self.ensure_container()?;
        if let DsonData::Container(map) = &mut self.data {
            for child in map.values_mut() {
                child.force_host_if_scalar()?;
            }
        }
        match &self.data {
            DsonData::Container(map) => Ok(map),
            _ => unreachable!("ensure_container guarantees Container"),
        }
    }

    /// Inserts `value` under `key`, replacing whatever was previously
    /// there (last write wins). Promotes this value to `Container`
    /// first if it wasn't already.
    pub fn insert(&mut self, key: i32, mut value: Dson) -> Result<(), DsonError> {
        if key < 0 {
            return fe_err!("negative key {} is not permitted on insert", key);
        }
        self.ensure_container()?;
        value.set_key(key)?;
        value.force_host_if_scalar()?;
        if let DsonData::Container(map) = &mut self.data {
            map.insert(key, value);
            Ok(())
        } else {
            unreachable!("ensure_container guarantees Container")
        }
    }

    pub fn get(&mut self, key: i32) -> Result<Option<&Dson>, DsonError> {
        self.map()?;
        match &self.data {
            DsonData::Container(map) => Ok(map.get(&key)),
            _ => unreachable!(),
        }
    }

    pub fn get_mut(&mut self, key: i32) -> Result<Option<&mut Dson>, DsonError> {
        self.map()?;
        match &mut self.data {
            DsonData::Container(map) => Ok(map.get_mut(&key)),
            _ => unreachable!(),
        }
    }

    /// Resets this value back to an empty container, dropping any
    /// buffers it held.
    pub fn clear(&mut self) {
        self.key = 0;
        self.data_type = crate::type_marker::CONTAINER;
        self.order = ByteOrder::Host;
        self.state = State::Ready;
        self.data = DsonData::Container(BTreeMap::new());
        self.io = IoCursor::default();
    }

    fn scalar_bytes_host_order(&self) -> Option<(TypeMarker, Vec<u8>)> {
        match &self.data {
            DsonData::OneObjectInBuf(storage) => {
                let mut bytes = storage.as_slice().to_vec();
                if self.order != ByteOrder::Host {
                    flip_payload(self.data_type, ByteOrder::Host, &mut bytes);
                }
                Some((self.data_type, bytes))
            }
            _ => None,
        }
    }

    /// Range-checked narrowing/widening getter (§4.5): returns
    /// `default` if this value isn't a scalar numeric type, or if the
    /// stored value doesn't fit in an `i32`.
    pub fn to_i32_or(&self, default: i32) -> i32 {
        self.scalar_bytes_host_order()
            .and_then(|(t, b)| numeric_as_i64(t, &b))
            .and_then(|v| i32::try_from(v).ok())
            .unwrap_or(default)
    }

    pub fn to_u32_or(&self, default: u32) -> u32 {
        self.scalar_bytes_host_order()
            .and_then(|(t, b)| numeric_as_i64(t, &b))
            .and_then(|v| u32::try_from(v).ok())
            .unwrap_or(default)
    }

    pub fn to_i64_or(&self, default: i64) -> i64 {
        self.scalar_bytes_host_order()
            .and_then(|(t, b)| numeric_as_i64(t, &b))
            .unwrap_or(default)
    }

    pub fn to_u64_or(&self, default: u64) -> u64 {
        self.scalar_bytes_host_order()
            .and_then(|(t, b)| numeric_as_i64(t, &b))
            .and_then(|v| u64::try_from(v).ok())
            .unwrap_or(default)
    }

    pub fn to_fixed_point_or(&self, default: f64) -> f64 {
        match self.scalar_bytes_host_order() {
            Some((t, b)) if t == crate::type_marker::FIXED_POINT && b.len() == 8 => {
                crate::objects::fixed_point::decode(i64::from_ne_bytes(b.try_into().unwrap()))
            }
            _ => default,
        }
    }

    /// Returns this value's string payload, decoded as UTF-8, or
    /// formats a scalar numeric value as a string. Returns `None` for
    /// containers and opaque user types.
    pub fn to_string_lossy(&self) -> Option<String> {
        if self.data_type == crate::type_marker::STRING {
            if let DsonData::OneObjectInBuf(storage) = &self.data {
                return String::from_utf8(storage.as_slice().to_vec()).ok();
            }
        }
        self.scalar_bytes_host_order()
            .and_then(|(t, b)| format_numeric(t, &b))
    }

    /// Zero-copy string view; `None` unless this value is currently a
    /// host-order string record.
    pub fn to_string_view(&self) -> Option<&str> {
        if self.data_type != crate::type_marker::STRING || self.order != ByteOrder::Host {
            return None;
        }
        match &self.data {
            DsonData::OneObjectInBuf(storage) => std::str::from_utf8(storage.as_slice()).ok(),
            _ => None,
        }
    }

    /// Brings this value (and, for containers, every immediate child
    /// lazily as it's visited) into `order`, for emission. A
    /// `DataBufNeedParse` value already in the requested order is left
    /// untouched so the caller's later emission can pass its bytes
    /// through verbatim.
    fn prepare_for_order(&mut self, order: ByteOrder) -> Result<(), DsonError> {
        match &self.data {
            DsonData::Container(_) => Ok(()),
            DsonData::OneObjectInBuf(_) => {
                if self.order != order {
                    let data_type = self.data_type;
                    if let DsonData::OneObjectInBuf(storage) = &mut self.data {
                        flip_payload(data_type, order, storage.as_mut_slice());
                    }
                    self.order = order;
                }
                Ok(())
            }
            DsonData::DataBufNeedParse(_) => {
                if self.order == order {
                    Ok(())
                } else {
                    self.parse_buf()
                }
            }
        }
    }

    fn copy_to_stream_order(
        &mut self,
        order: ByteOrder,
        sink: &mut dyn std::io::Write,
    ) -> Result<(), DsonError> {
        self.prepare_for_order(order)?;
        let header_bytes = self.current_header().encode(order);
        sink.write_all(&header_bytes)?;
        match &mut self.data {
            DsonData::Container(map) => {
                for child in map.values_mut() {
                    child.copy_to_stream_order(order, sink)?;
                }
            }
            DsonData::OneObjectInBuf(storage) | DsonData::DataBufNeedParse(storage) => {
                sink.write_all(storage.as_slice())?;
            }
        }
        self.state = State::Ready;
        Ok(())
    }

    /// Drives a single resumable copy-out step across either a
    /// non-blocking fd or a caller buffer, recursing into children
    /// (each with its own cursor) in ascending key order.
    fn copy_to_transport<T: WriteTransport>(
        &mut self,
        order: ByteOrder,
        transport: &mut T,
    ) -> XferResult {
        if self.state == State::Error {
            return XferResult::Error;
        }
        if self.state == State::Ready {
            if self.prepare_for_order(order).is_err() {
                self.log_error_transition("failed to prepare value for requested byte order");
                self.state = State::Error;
                return XferResult::Error;
            }
            self.io.header_scratch = self.current_header().encode(order);
            self.io.offset = 0;
            self.state = State::CopyingHeader;
            self.io.child_index = 0;
            if let DsonData::Container(map) = &self.data {
                self.io.child_keys = map.keys().copied().collect();
            }
        }
        loop {
            match self.state {
                State::CopyingHeader => {
                    if self.io.offset >= HEADER_LEN {
                        self.state = State::CopyingData;
                        self.io.offset = 0;
                        continue;
                    }
                    match transport.write_some(&self.io.header_scratch[self.io.offset..]) {
                        TransferOutcome::Transferred(0) => return XferResult::InProcess,
                        TransferOutcome::Transferred(n) => self.io.offset += n,
                        TransferOutcome::WouldBlock => return XferResult::InProcess,
                        TransferOutcome::Error => {
                            self.log_error_transition("transport failed while writing header");
                            self.state = State::Error;
                            return XferResult::Error;
                        }
                    }
                }
                State::CopyingData => match &mut self.data {
                    DsonData::Container(map) => {
                        if self.io.child_index >= self.io.child_keys.len() {
                            self.state = State::Ready;
                            return XferResult::Ready;
                        }
                        let key = self.io.child_keys[self.io.child_index];
                        let child = map
                            .get_mut(&key)
                            .expect("child_keys snapshot stays in sync with the map");
                        match child.copy_to_transport(order, transport) {
                            XferResult::Ready => self.io.child_index += 1,
                            XferResult::InProcess => return XferResult::InProcess,
                            XferResult::Error => {
                                self.log_error_transition("child value failed while copying out");
                                self.state = State::Error;
                                return XferResult::Error;
                            }
                        }
                    }
                    DsonData::OneObjectInBuf(storage) | DsonData::DataBufNeedParse(storage) => {
                        let bytes = storage.as_slice();
                        if self.io.offset >= bytes.len() {
                            self.state = State::Ready;
                            self.io.offset = 0;
                            return XferResult::Ready;
                        }
                        match transport.write_some(&bytes[self.io.offset..]) {
                            TransferOutcome::Transferred(0) => return XferResult::InProcess,
                            TransferOutcome::Transferred(n) => self.io.offset += n,
                            TransferOutcome::WouldBlock => return XferResult::InProcess,
                            TransferOutcome::Error => {
                                self.log_error_transition("transport failed while writing payload");
                                self.state = State::Error;
                                return XferResult::Error;
                            }
                        }
                    }
                },
                _ => {
                    self.log_error_transition("copy_to_transport resumed in an unexpected state");
                    self.state = State::Error;
                    return XferResult::Error;
                }
            }
        }
    }

    /// Reads a value off a non-blocking fd or caller buffer, one
    /// header then one bounded payload allocation (§4.2.6, bounded
    /// allocation). An empty container (`data_size == 0`) completes
    /// without ever allocating a payload buffer.
    fn load_from_source<T: ReadTransport>(&mut self, source: &mut T) -> XferResult {
        if self.state == State::Error {
            return XferResult::Error;
        }
        if self.state == State::Ready {
            self.io = IoCursor::default();
            self.state = State::LoadingHeader;
        }
        loop {
            match self.state {
                State::LoadingHeader => {
                    if self.io.offset >= HEADER_LEN {
                        let (header, order) = match Header::decode(&self.io.header_scratch) {
                            Ok(ok) => ok,
                            Err(e) => {
                                tracing::error!(
                                    key = self.key,
                                    data_type = self.data_type,
                                    "failed to decode header off the wire: {}",
                                    e
                                );
                                self.state = State::Error;
                                return XferResult::Error;
                            }
                        };
                        self.key = header.key;
                        self.data_type = header.data_type;
                        self.order = order;
                        if header.data_size == 0 {
                            self.data = DsonData::Container(BTreeMap::new());
                            self.data_type = crate::type_marker::CONTAINER;
                            self.state = State::Ready;
                            self.io = IoCursor::default();
                            return XferResult::Ready;
                        }
                        self.io.loading_payload = vec![0u8; header.data_size as usize];
                        self.io.offset = 0;
                        self.state = State::LoadingData;
                        continue;
                    }
                    match source.read_some(&mut self.io.header_scratch[self.io.offset..]) {
                        TransferOutcome::Transferred(0) => return XferResult::InProcess,
                        TransferOutcome::Transferred(n) => self.io.offset += n,
                        TransferOutcome::WouldBlock => return XferResult::InProcess,
                        TransferOutcome::Error => {
                            self.log_error_transition("transport failed while reading header");
                            self.state = State::Error;
                            return XferResult::Error;
                        }
                    }
                }
                State::LoadingData => {
                    if self.io.offset >= self.io.loading_payload.len() {
                        let payload = std::mem::take(&mut self.io.loading_payload);
                        self.data = DsonData::DataBufNeedParse(Storage::Owned(payload));
                        self.state = State::Ready;
                        self.io = IoCursor::default();
                        return XferResult::Ready;
                    }
                    let offset = self.io.offset;
                    match source.read_some(&mut self.io.loading_payload[offset..]) {
                        TransferOutcome::Transferred(0) => return XferResult::InProcess,
                        TransferOutcome::Transferred(n) => self.io.offset += n,
                        TransferOutcome::WouldBlock => return XferResult::InProcess,
                        TransferOutcome::Error => {
                            self.log_error_transition("transport failed while reading payload");
                            self.state = State::Error;
                            return XferResult::Error;
                        }
                    }
                }
                _ => {
                    self.log_error_transition("load_from_source resumed in an unexpected state");
                    self.state = State::Error;
                    return XferResult::Error;
                }
            }
        }
    }

    /// Resumable load from a non-blocking fd.
    pub fn load_from_fd(&mut self, source: &mut FdSource) -> XferResult {
        self.load_from_source(source)
    }

    /// Resumable load from a caller-supplied buffer.
    pub fn load_from_buf(&mut self, source: &mut BufSource) -> XferResult {
        self.load_from_source(source)
    }
}

fn numeric_as_i64(t: TypeMarker, bytes: &[u8]) -> Option<i64> {
    match t {
        x if x == crate::type_marker::I32 => Some(i32::from_ne_bytes(bytes.try_into().ok()?) as i64),
        x if x == crate::type_marker::U32 => Some(u32::from_ne_bytes(bytes.try_into().ok()?) as i64),
        x if x == crate::type_marker::I64 => Some(i64::from_ne_bytes(bytes.try_into().ok()?)),
        x if x == crate::type_marker::U64 => {
            i64::try_from(u64::from_ne_bytes(bytes.try_into().ok()?)).ok()
        }
        _ => None,
    }
}

fn format_numeric(t: TypeMarker, bytes: &[u8]) -> Option<String> {
    match t {
        x if x == crate::type_marker::I32 => Some(i32::from_ne_bytes(bytes.try_into().ok()?).to_string()),
        x if x == crate::type_marker::U32 => Some(u32::from_ne_bytes(bytes.try_into().ok()?).to_string()),
        x if x == crate::type_marker::I64 => Some(i64::from_ne_bytes(bytes.try_into().ok()?).to_string()),
        x if x == crate::type_marker::U64 => Some(u64::from_ne_bytes(bytes.try_into().ok()?).to_string()),
        x if x == crate::type_marker::FIXED_POINT => Some(
            crate::objects::fixed_point::decode(i64::from_ne_bytes(bytes.try_into().ok()?)).to_string(),
        ),
        _ => None,
    }
}

fn flip_payload(data_type: TypeMarker, target_order: ByteOrder, payload: &mut [u8]) {
    if let Some(pair) = converter::table().lookup(data_type) {
        let header = Header::new(0, data_type, payload.len() as i32);
        let f = match target_order {
            ByteOrder::Host => pair.to_host,
            ByteOrder::Network => pair.to_network,
        };
        f(&header, payload);
    }
}

impl DsonObj for Dson {
    fn is_host_order(&self) -> bool {
        self.order == ByteOrder::Host
    }

    fn data_size(&self) -> i32 {
        match &self.data {
            DsonData::Container(map) => map
                .values()
                .map(|c| HEADER_LEN as i32 + c.data_size())
                .sum(),
            DsonData::OneObjectInBuf(s) | DsonData::DataBufNeedParse(s) => s.len() as i32,
        }
    }

    fn key(&self) -> i32 {
        self.key
    }

    fn set_key(&mut self, key: i32) -> Result<(), DsonError> {
        if key < 0 {
            return fe_err!("negative key {} is not permitted", key);
        }
        self.key = key;
        Ok(())
    }

    fn data_type(&self) -> TypeMarker {
        self.data_type
    }

    fn state(&self) -> State {
        self.state
    }

    fn reset_state(&mut self) -> Result<(), DsonError> {
        self.state = State::Ready;
        self.io = IoCursor::default();
        Ok(())
    }

    fn copy_to_stream_host_order(
        &mut self,
        sink: &mut dyn std::io::Write,
    ) -> Result<(), DsonError> {
        self.copy_to_stream_order(ByteOrder::Host, sink)
    }

    fn copy_to_stream_network_order(
        &mut self,
        sink: &mut dyn std::io::Write,
    ) -> Result<(), DsonError> {
        self.copy_to_stream_order(ByteOrder::Network, sink)
    }

    fn copy_to_fd_host_order(&mut self, sink: &mut FdSink) -> XferResult {
        self.copy_to_transport(ByteOrder::Host, sink)
    }

    fn copy_to_fd_network_order(&mut self, sink: &mut FdSink) -> XferResult {
        self.copy_to_transport(ByteOrder::Network, sink)
    }

    fn copy_to_buf_host_order(&mut self, sink: &mut BufSink) -> XferResult {
        self.copy_to_transport(ByteOrder::Host, sink)
    }

    fn copy_to_buf_network_order(&mut self, sink: &mut BufSink) -> XferResult {
        self.copy_to_transport(ByteOrder::Network, sink)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_round_trips_through_stream_network_order() {
        let mut v = Dson::from_i32(5, -42).unwrap();
        let mut out = Vec::new();
        v.copy_to_stream_network_order(&mut out).unwrap();

        let mut back = Dson::adopt_owned(out).unwrap();
        assert_eq!(back.key(), 5);
        assert_eq!(back.to_i32_or(0), -42);
    }

    #[test]
    fn container_round_trips_through_stream_host_order() {
        let mut root = Dson::empty();
        root.insert(1, Dson::from_i32(0, 7).unwrap()).unwrap();
        root.insert(2, Dson::from_string(0, "hi").unwrap()).unwrap();

        let mut out = Vec::new();
        root.copy_to_stream_host_order(&mut out).unwrap();

        let mut back = Dson::adopt_owned(out).unwrap();
        let map = back.map().unwrap();
        assert_eq!(map.len(), 2);
        assert_eq!(map[&1].to_i32_or(-1), 7);
        assert_eq!(map[&2].to_string_lossy().as_deref(), Some("hi"));
    }

    #[test]
    fn insert_into_scalar_promotes_to_container() {
        let mut v = Dson::from_i32(3, 99).unwrap();
        v.insert(4, Dson::from_i32(0, 100).unwrap()).unwrap();
        let map = v.map().unwrap();
        assert_eq!(map.len(), 2);
        assert_eq!(map[&3].to_i32_or(0), 99);
        assert_eq!(map[&4].to_i32_or(0), 100);
    }

    #[test]
    fn insert_last_write_wins() {
        let mut root = Dson::empty();
        root.insert(1, Dson::from_i32(0, 1).unwrap()).unwrap();
        root.insert(1, Dson::from_i32(0, 2).unwrap()).unwrap();
        let map = root.map().unwrap();
        assert_eq!(map.len(), 1);
        assert_eq!(map[&1].to_i32_or(0), 2);
    }

    #[test]
    fn negative_key_rejected_on_insert_and_construction() {
        let mut root = Dson::empty();
        assert!(root.insert(-1, Dson::from_i32(0, 1).unwrap()).is_err());
        assert!(Dson::from_i32(-1, 1).is_err());
    }

    #[test]
    fn oversized_adopted_buffer_is_rejected() {
        let mut buf = Header::new(0, crate::type_marker::STRING, 0).encode(ByteOrder::Host).to_vec();
        buf[4..8].copy_from_slice(&(MAX_DSON_RAM_SIZE + 1).to_ne_bytes());
        assert!(Dson::adopt_owned(buf).is_err());
    }

    #[test]
    fn resumable_copy_to_buf_in_small_chunks_then_load_back() {
        let mut root = Dson::empty();
        root.insert(1, Dson::from_string(0, "a moderately long payload value").unwrap())
            .unwrap();
        root.insert(2, Dson::from_i64(0, -123456789).unwrap()).unwrap();

        let total = HEADER_LEN * 3 + "a moderately long payload value".len() + 8;
        let mut out = vec![0u8; total];
        let mut done = 0;
        loop {
            let chunk_len = 5.min(out.len() - done);
            let mut sink = BufSink::new(&mut out[done..done + chunk_len]);
            match root.copy_to_buf_network_order(&mut sink) {
                XferResult::Ready => {
                    done += sink.cursor();
                    break;
                }
                XferResult::InProcess => done += sink.cursor(),
                XferResult::Error => panic!("unexpected error"),
            }
        }
        out.truncate(done);

        let mut back = Dson::empty();
        let mut source = BufSource::new(&out);
        loop {
            match back.load_from_buf(&mut source) {
                XferResult::Ready => break,
                XferResult::InProcess => continue,
                XferResult::Error => panic!("unexpected load error"),
            }
        }
        let map = back.map().unwrap();
        assert_eq!(map[&1].to_string_lossy().as_deref(), Some("a moderately long payload value"));
        assert_eq!(map[&2].to_i64_or(0), -123456789);
    }

    #[test]
    fn fixed_point_round_trips_through_container() {
        let mut root = Dson::empty();
        root.insert(1, Dson::from_fixed_point(0, 3.5).unwrap()).unwrap();
        let mut out = Vec::new();
        root.copy_to_stream_network_order(&mut out).unwrap();

        let mut back = Dson::adopt_owned(out).unwrap();
        let map = back.map().unwrap();
        assert!((map[&1].to_fixed_point_or(0.0) - 3.5).abs() < 1e-6);
    }

    #[test]
    fn empty_container_round_trips() {
        let mut root = Dson::empty();
        let mut out = Vec::new();
        root.copy_to_stream_host_order(&mut out).unwrap();
        assert_eq!(out.len(), HEADER_LEN);

        let mut back = Dson::adopt_owned(out).unwrap();
        assert_eq!(back.map().unwrap().len(), 0);
    }
}
