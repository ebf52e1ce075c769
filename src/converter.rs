//
// Copyright (c) 2024 Oracle and/or its affiliates. All rights reserved.
//
// Licensed under the Universal Permissive License v 1.0 as shown at
//  https://oss.oracle.com/licenses/upl/
//
//! The process-wide converter table: a `TypeMarker -> (to_host,
//! to_network)` registry of payload endian-fixup functions.
//!
//! Initialization happens in two phases -- library-defined converters
//! first, an optional user-defined phase second -- after which the
//! table is frozen and may be read from any thread without locking.
//! Absence of an entry for a marker is not an error: it means the
//! payload needs no byte-order fixup (raw bytes, strings, and any
//! user type that happens to be order-agnostic).

use std::collections::HashMap;
use std::sync::OnceLock;

use crate::config::DsonConfig;
use crate::error::DsonError;
use crate::header::Header;
use crate::type_marker::TypeMarker;

/// A payload converter flips a record's payload in place between host
/// and network order, given the record's (already host-order) header
/// for context (e.g. `data_size`).
pub type ConverterFn = fn(&Header, &mut [u8]);

#[derive(Clone, Copy)]
pub struct ConverterPair {
    pub to_host: ConverterFn,
    pub to_network: ConverterFn,
}

pub struct ConverterTable {
    table: HashMap<TypeMarker, ConverterPair>,
}

impl ConverterTable {
    pub fn lookup(&self, marker: TypeMarker) -> Option<ConverterPair> {
        self.table.get(&marker).copied()
    }
}

fn scalar_flip16(_header: &Header, payload: &mut [u8]) {
    crate::byte_order::flip16(payload);
}

fn scalar_flip32(_header: &Header, payload: &mut [u8]) {
    crate::byte_order::flip32(payload);
}

fn scalar_flip64(_header: &Header, payload: &mut [u8]) {
    crate::byte_order::flip64(payload);
}

fn library_converters() -> HashMap<TypeMarker, ConverterPair> {
    let mut table = HashMap::new();
    table.insert(
        crate::type_marker::I32,
        ConverterPair {
            to_host: scalar_flip32,
            to_network: scalar_flip32,
        },
    );
    table.insert(
        crate::type_marker::U32,
        ConverterPair {
            to_host: scalar_flip32,
            to_network: scalar_flip32,
        },
    );
    table.insert(
        crate::type_marker::I64,
        ConverterPair {
            to_host: scalar_flip64,
            to_network: scalar_flip64,
        },
    );
    table.insert(
        crate::type_marker::U64,
        ConverterPair {
            to_host: scalar_flip64,
            to_network: scalar_flip64,
        },
    );
    table.insert(
        crate::type_marker::VEC_U32,
        ConverterPair {
            to_host: flip_u32_vec,
            to_network: flip_u32_vec,
        },
    );
    table.insert(
        crate::type_marker::FIXED_POINT,
        ConverterPair {
            to_host: scalar_flip64,
            to_network: scalar_flip64,
        },
    );
    // STRING is intentionally absent: its payload is raw bytes,
    // order-irrelevant. The two example opaque object types
    // (`objects::route_obj`, `objects::string_obj`) perform their own
    // in-place flips from their emitter rather than going through
    // this table, even though one of them rides the `VEC_U32` marker
    // also used here -- a `Dson` value holding a bare `VEC_U32`
    // scalar (not one of the opaque types) still needs this entry.
    table
}

fn flip_u32_vec(_header: &Header, payload: &mut [u8]) {
    for chunk in payload.chunks_exact_mut(4) {
        crate::byte_order::flip32(chunk);
    }
}

static TABLE: OnceLock<ConverterTable> = OnceLock::new();

/// Returns the process-wide converter table: whatever
/// [`ConverterTable::init`] installed, or the library-defined-only
/// table (built lazily on first access) if `init` was never called.
pub fn table() -> &'static ConverterTable {
    TABLE.get_or_init(|| ConverterTable {
        table: library_converters(),
    })
}

impl ConverterTable {
    /// Builds a table starting from the library-defined converters
    /// and then applying a user-defined phase that may add new
    /// entries or overwrite existing ones.
    pub fn with_extra(extra: impl IntoIterator<Item = (TypeMarker, ConverterPair)>) -> Self {
        let mut table = library_converters();
        for (marker, pair) in extra {
            table.insert(marker, pair);
        }
        ConverterTable { table }
    }

    /// The process-wide, two-phase initialization: library converters
    /// first, then `config`'s user-defined phase, then installs the
    /// result -- along with `config`'s allocation cap -- as the
    /// singletons every `Dson` value consults ([`table`],
    /// [`crate::header::effective_max_ram_size`]). Must be called, at
    /// most once, before any value is converted or parsed; a second
    /// call (or a first call after `table()` already ran its lazy
    /// default init) is rejected since some configuration already
    /// won.
    pub fn init(config: DsonConfig) -> Result<(), DsonError> {
        let max_ram_size = config.max_ram_size;
        let extra_count = config.extra_converters.len();
        let installed = ConverterTable::with_extra(config.extra_converters);
        if TABLE.set(installed).is_err() {
            return crate::error::misuse_err!(
                "converter table already initialized for this process"
            );
        }
        crate::header::install_max_ram_size(max_ram_size)?;
        tracing::debug!(extra_count, max_ram_size, "converter table initialized");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_markers_have_converters() {
        let t = table();
        assert!(t.lookup(crate::type_marker::I32).is_some());
        assert!(t.lookup(crate::type_marker::U64).is_some());
    }

    #[test]
    fn string_marker_has_no_converter() {
        assert!(table().lookup(crate::type_marker::STRING).is_none());
    }

    #[test]
    fn user_phase_can_overwrite_a_library_entry() {
        fn noop(_h: &Header, _p: &mut [u8]) {}
        let custom = ConverterTable::with_extra([(
            crate::type_marker::I32,
            ConverterPair {
                to_host: noop,
                to_network: noop,
            },
        )]);
        let pair = custom.lookup(crate::type_marker::I32).unwrap();
        let mut buf = [1u8, 2, 3, 4];
        (pair.to_host)(&Header::empty(), &mut buf);
        assert_eq!(buf, [1, 2, 3, 4]);
    }
}
