//
// Copyright (c) 2024, 2025 Oracle and/or its affiliates. All rights reserved.
//
// Licensed under the Universal Permissive License v 1.0 as shown at
//  https://oss.oracle.com/licenses/upl/
//
//! DSON: a self-describing, key-addressed binary serialization format.
//!
//! Every value, from a single 4-byte integer up to a deeply nested
//! container, is framed by a 16-byte header carrying its own byte
//! order, key, type marker, and payload size -- so a value can be
//! read, written, and routed without any out-of-band schema. The
//! engine ([`Dson`]) is lazy: a buffer handed to it is not walked into
//! a tree until something asks for its children, and every value,
//! however nested, can be copied to or loaded from a non-blocking file
//! descriptor across as many partial reads/writes as the transport
//! needs.
//!
//! ## Quickstart
//! ```
//! use dson::{Dson, DsonObj};
//!
//! let mut root = Dson::empty();
//! root.insert(1, Dson::from_i32(0, 42).unwrap()).unwrap();
//! root.insert(2, Dson::from_string(0, "hello").unwrap()).unwrap();
//!
//! let mut wire = Vec::new();
//! root.copy_to_stream_network_order(&mut wire).unwrap();
//!
//! let mut back = Dson::adopt_owned(wire).unwrap();
//! let map = back.map().unwrap();
//! assert_eq!(map[&1].to_i32_or(0), 42);
//! assert_eq!(map[&2].to_string_lossy().as_deref(), Some("hello"));
//! ```
//!
//! ## Layout
//! - [`mod@error`] -- the error taxonomy returned by every fallible operation.
//! - [`byte_order`] -- host/network byte-order primitives and the wire mark.
//! - [`type_marker`] -- the `data_type` registry, library and user ranges.
//! - [`header`] -- the 16-byte record header shared by every value.
//! - [`converter`] -- the process-wide `data_type -> payload fixup` table.
//! - [`dson_obj`] -- the `DsonObj` capability every value type implements.
//! - [`dson`] -- the hybrid container/scalar engine itself.
//! - [`objects`] -- example opaque object types riding the same wire format.
//! - [`io`] -- the fd/buffer/stream sink and source kinds the engine drives.
//! - [`config`] -- builder for a process's converter table and allocation cap.

pub mod byte_order;
pub mod config;
pub mod converter;
mod dson;
pub mod dson_obj;
pub mod error;
pub mod header;
pub mod io;
pub mod objects;
pub mod type_marker;

pub use config::DsonConfig;
pub use converter::{ConverterPair, ConverterTable};
pub use dson::Dson;
pub use dson_obj::{DsonObj, State, XferResult};
pub use error::{DsonError, DsonErrorCode};
pub use header::Header;
pub use objects::{Address, DsonRouteObj, DsonStringObj};
pub use type_marker::TypeMarker;
