//
// Copyright (c) 2024 Oracle and/or its affiliates. All rights reserved.
//
// Licensed under the Universal Permissive License v 1.0 as shown at
//  https://oss.oracle.com/licenses/upl/
//
//! The `TypeMarker` type registry: a stable 32-bit identifier for a
//! payload shape, carried in a record's `data_type` header field.
//!
//! Markers below [`USER_MARKER_FLOOR`] are reserved by this crate;
//! user-defined opaque object types must register markers at or above
//! the floor (the reference C++ examples use the 50000 range).

pub type TypeMarker = i32;

/// `data_size = 0`; used as an error/null sentinel.
pub const EMPTY: TypeMarker = 0;

/// Payload is a concatenation of complete child records.
pub const CONTAINER: TypeMarker = 1;

/// Payload is raw, UTF-8-agnostic bytes; no byte-order conversion.
pub const STRING: TypeMarker = 2;

pub const I32: TypeMarker = 3;
pub const U32: TypeMarker = 4;
pub const I64: TypeMarker = 5;
pub const U64: TypeMarker = 6;
pub const VEC_U32: TypeMarker = 7;

/// User-defined type markers must be at or above this floor.
pub const USER_MARKER_FLOOR: TypeMarker = 50000;

/// The fixed-point float encoding chosen for the "double encoding"
/// open question (see `SPEC_FULL.md` §9). The only user-range marker
/// this crate actually assigns: the two example opaque object types
/// (`DsonRouteObj`, `DsonStringObj`) ride the existing `VEC_U32`/
/// `STRING` library markers instead, matching the payload shapes the
/// original examples chose for them.
pub const FIXED_POINT: TypeMarker = 50002;

/// Returns the fixed-width byte length of a scalar marker's payload,
/// or `None` for markers whose payload length is variable
/// (container, string) or type-specific (user markers).
pub fn fixed_payload_len(marker: TypeMarker) -> Option<usize> {
    match marker {
        I32 | U32 => Some(4),
        I64 | U64 => Some(8),
        EMPTY => Some(0),
        _ => None,
    }
}
