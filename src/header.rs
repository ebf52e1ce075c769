//
// Copyright (c) 2024 Oracle and/or its affiliates. All rights reserved.
//
// Licensed under the Universal Permissive License v 1.0 as shown at
//  https://oss.oracle.com/licenses/upl/
//
//! The 16-byte record header: four 32-bit fields, always encoded
//! together in one byte order.

use std::sync::OnceLock;

use crate::byte_order::{self, ByteOrder};
use crate::error::{fe_err, misuse_err, DsonError};
use crate::type_marker::TypeMarker;

pub const HEADER_LEN: usize = 16;

/// The default cap on any single payload allocation (1 GiB), used
/// until a process installs a smaller or larger cap via
/// [`crate::ConverterTable::init`].
pub const MAX_DSON_RAM_SIZE: i32 = 1 << 30;

static MAX_RAM_SIZE_OVERRIDE: OnceLock<i32> = OnceLock::new();

/// Installs the process-wide allocation cap from a `DsonConfig`.
/// Called once, from `ConverterTable::init`, alongside the converter
/// table install so both configuration phases land together. A
/// second call is rejected: the first caller's configuration already
/// won.
pub(crate) fn install_max_ram_size(max_ram_size: i32) -> Result<(), DsonError> {
    if MAX_RAM_SIZE_OVERRIDE.set(max_ram_size).is_err() {
        return misuse_err!("max_ram_size already initialized for this process");
    }
    Ok(())
}

/// The cap currently enforced on any single payload allocation: the
/// override installed via [`crate::ConverterTable::init`], or
/// [`MAX_DSON_RAM_SIZE`] if none was ever installed.
pub fn effective_max_ram_size() -> i32 {
    *MAX_RAM_SIZE_OVERRIDE.get().unwrap_or(&MAX_DSON_RAM_SIZE)
}

/// A record's 16-byte header, always exposed to callers in host byte
/// order (per the "a value exposed through the public API is always
/// normalized to host order" invariant).
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct Header {
    pub data_size: i32,
    pub key: i32,
    pub data_type: TypeMarker,
}

impl Header {
    pub fn new(key: i32, data_type: TypeMarker, data_size: i32) -> Header {
        Header {
            data_size,
            key,
            data_type,
        }
    }

    pub fn empty() -> Header {
        Header {
            data_size: 0,
            key: 0,
            data_type: crate::type_marker::EMPTY,
        }
    }

    /// Validates `data_size` against the bounds the spec requires
    /// ("`>= 0` and `<= MAX_DSON_RAM_SIZE`"). Called on every header
    /// parsed off the wire.
    pub fn validate_data_size(data_size: i32) -> Result<(), DsonError> {
        let max = effective_max_ram_size();
        if data_size < 0 || data_size > max {
            return fe_err!("data_size {} out of range [0, {}]", data_size, max);
        }
        Ok(())
    }

    /// Encodes this header as 16 bytes in the given order.
    pub fn encode(&self, order: ByteOrder) -> [u8; HEADER_LEN] {
        let mut out = [0u8; HEADER_LEN];
        let mark = order.mark();
        out[0..4].copy_from_slice(&mark.to_ne_bytes());
        out[4..8].copy_from_slice(&self.data_size.to_ne_bytes());
        out[8..12].copy_from_slice(&self.key.to_ne_bytes());
        out[12..16].copy_from_slice(&self.data_type.to_ne_bytes());
        if order == ByteOrder::Network {
            byte_order::flip32(&mut out[4..8]);
            byte_order::flip32(&mut out[8..12]);
            byte_order::flip32(&mut out[12..16]);
        }
        out
    }

    /// Parses a 16-byte header, probing its byte-order mark and
    /// returning both the header (always normalized to host order)
    /// and the order the bytes were actually encoded in.
    pub fn decode(bytes: &[u8]) -> Result<(Header, ByteOrder), DsonError> {
        if bytes.len() < HEADER_LEN {
            return fe_err!(
                "header requires {} bytes, got {}",
                HEADER_LEN,
                bytes.len()
            );
        }
        let raw_mark = u32::from_ne_bytes(bytes[0..4].try_into().unwrap());
        let order = ByteOrder::probe(raw_mark);

        let mut size_bytes: [u8; 4] = bytes[4..8].try_into().unwrap();
        let mut key_bytes: [u8; 4] = bytes[8..12].try_into().unwrap();
        let mut type_bytes: [u8; 4] = bytes[12..16].try_into().unwrap();
        if order == ByteOrder::Network {
            byte_order::flip32(&mut size_bytes);
            byte_order::flip32(&mut key_bytes);
            byte_order::flip32(&mut type_bytes);
        }
        let data_size = i32::from_ne_bytes(size_bytes);
        let key = i32::from_ne_bytes(key_bytes);
        let data_type = i32::from_ne_bytes(type_bytes);
        Header::validate_data_size(data_size)?;

        Ok((
            Header {
                data_size,
                key,
                data_type,
            },
            order,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_decode_round_trips_host_order() {
        let h = Header::new(42, crate::type_marker::I32, 4);
        let bytes = h.encode(ByteOrder::Host);
        let (decoded, order) = Header::decode(&bytes).unwrap();
        assert_eq!(decoded, h);
        assert_eq!(order, ByteOrder::Host);
    }

    #[test]
    fn encode_decode_round_trips_network_order() {
        let h = Header::new(-7, crate::type_marker::STRING, 128);
        let bytes = h.encode(ByteOrder::Network);
        let (decoded, order) = Header::decode(&bytes).unwrap();
        assert_eq!(decoded, h);
        assert_eq!(order, ByteOrder::Network);
    }

    #[test]
    fn negative_data_size_is_rejected() {
        let mut bytes = Header::new(0, crate::type_marker::I32, 0).encode(ByteOrder::Host);
        bytes[4..8].copy_from_slice(&(-1i32).to_ne_bytes());
        let err = Header::decode(&bytes).unwrap_err();
        assert_eq!(err.code, crate::error::DsonErrorCode::FramingError);
    }

    #[test]
    fn oversized_data_size_is_rejected() {
        let mut bytes = Header::new(0, crate::type_marker::STRING, 0).encode(ByteOrder::Host);
        bytes[4..8].copy_from_slice(&(MAX_DSON_RAM_SIZE + 1).to_ne_bytes());
        let err = Header::decode(&bytes).unwrap_err();
        assert_eq!(err.code, crate::error::DsonErrorCode::FramingError);
    }
}
