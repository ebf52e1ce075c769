//
// Copyright (c) 2024 Oracle and/or its affiliates. All rights reserved.
//
// Licensed under the Universal Permissive License v 1.0 as shown at
//  https://oss.oracle.com/licenses/upl/
//
//! Builder for the process-wide converter table (§4.4), mirroring the
//! reference SDK's consuming-builder pattern (`HandleBuilder`).

use std::default::Default;

use crate::converter::{ConverterPair, ConverterTable};
use crate::error::DsonError;
use crate::header::MAX_DSON_RAM_SIZE;
use crate::type_marker::{TypeMarker, USER_MARKER_FLOOR};

/// Configuration for a [`ConverterTable`], and the cap applied to any
/// single payload allocation.
#[derive(Default, Debug, Clone)]
pub struct DsonConfig {
    pub(crate) max_ram_size: i32,
    pub(crate) extra_converters: Vec<(TypeMarker, ConverterPair)>,
}

impl DsonConfig {
    pub fn new() -> DsonConfig {
        DsonConfig {
            max_ram_size: MAX_DSON_RAM_SIZE,
            extra_converters: Vec::new(),
        }
    }

    /// Overrides the default 1 GiB allocation cap. Must remain
    /// positive and no larger than `i32::MAX`.
    pub fn max_ram_size(mut self, max_ram_size: i32) -> Result<Self, DsonError> {
        if max_ram_size <= 0 {
            return crate::error::fe_err!("max_ram_size must be positive, got {}", max_ram_size);
        }
        self.max_ram_size = max_ram_size;
        Ok(self)
    }

    /// Registers a user-defined converter pair for a type marker.
    /// Markers below [`USER_MARKER_FLOOR`] are reserved by this crate.
    pub fn register_converter(
        mut self,
        marker: TypeMarker,
        pair: ConverterPair,
    ) -> Result<Self, DsonError> {
        if marker < USER_MARKER_FLOOR {
            return crate::error::fe_err!(
                "user type marker {} is below the reserved floor {}",
                marker,
                USER_MARKER_FLOOR
            );
        }
        self.extra_converters.push((marker, pair));
        Ok(self)
    }

    /// Freezes this configuration into a standalone, read-only
    /// [`ConverterTable`] without installing it anywhere. Library
    /// converters install first, then this configuration's
    /// user-defined phase, which may overwrite library entries. Most
    /// callers want [`DsonConfig::init`] instead, which installs both
    /// this table and `max_ram_size` as the process-wide singletons
    /// `Dson` actually consults; `build` is for callers assembling a
    /// table to inspect or pass around explicitly.
    pub fn build(self) -> ConverterTable {
        ConverterTable::with_extra(self.extra_converters)
    }

    /// Installs this configuration as the process-wide converter
    /// table and allocation cap that every `Dson` value consults.
    /// Equivalent to `ConverterTable::init(self)`. May be called at
    /// most once per process, before any value is converted or
    /// parsed.
    pub fn init(self) -> Result<(), DsonError> {
        ConverterTable::init(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_positive_ram_size() {
        assert!(DsonConfig::new().max_ram_size(0).is_err());
        assert!(DsonConfig::new().max_ram_size(-1).is_err());
    }

    #[test]
    fn rejects_converter_below_user_floor() {
        fn noop(_h: &crate::header::Header, _p: &mut [u8]) {}
        let result = DsonConfig::new().register_converter(
            1,
            ConverterPair {
                to_host: noop,
                to_network: noop,
            },
        );
        assert!(result.is_err());
    }
}
