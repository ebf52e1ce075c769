//
// Copyright (c) 2024 Oracle and/or its affiliates. All rights reserved.
//
// Licensed under the Universal Permissive License v 1.0 as shown at
//  https://oss.oracle.com/licenses/upl/
//

use dson::byte_order::ByteOrder;
use dson::{ConverterPair, DsonConfig, Header};

// Kept to a single test: `ConverterTable::init` installs a process-
// wide singleton, so this only behaves deterministically as the lone
// test in its own binary.
#[test]
fn init_installs_configured_converter_and_ram_cap() {
    fn noop(_h: &Header, _p: &mut [u8]) {}

    let config = DsonConfig::new()
        .register_converter(
            60000,
            ConverterPair {
                to_host: noop,
                to_network: noop,
            },
        )
        .unwrap()
        .max_ram_size(4096)
        .unwrap();
    config.init().unwrap();

    // A second install is rejected -- the first configuration already won.
    assert!(DsonConfig::new().init().is_err());

    // The configured cap is what `Dson` actually enforces now, not
    // the 1 GiB compile-time default.
    let oversized = 5000i32;
    let mut framed = Header::new(0, dson::type_marker::STRING, oversized)
        .encode(ByteOrder::Host)
        .to_vec();
    framed.extend(std::iter::repeat(0u8).take(oversized as usize));
    assert!(dson::Dson::adopt_owned(framed).is_err());
}
