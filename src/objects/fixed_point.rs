//
// Copyright (c) 2024 Oracle and/or its affiliates. All rights reserved.
//
// Licensed under the Universal Permissive License v 1.0 as shown at
//  https://oss.oracle.com/licenses/upl/
//
//! Resolution of the "double encoding" open question (`SPEC_FULL.md`
//! §9): DSON's baseline encoding has no floating-point support. This
//! module implements the integer-scaled variant chosen here, a user
//! type registered under [`crate::type_marker::FIXED_POINT`]: an
//! `f64` is stored on the wire as `round(value * SCALE)` clamped into
//! an `i64`, riding the same 8-byte payload and converter as `i64`
//! itself.
//!
//! Non-finite values (`NaN`, `+-inf`) have no representation in this
//! scheme and are rejected at encode time rather than silently
//! coerced -- unlike the source's alternate mantissa+exponent scheme,
//! which carries a `FloatPointType` discriminator precisely to cover
//! them. That richer scheme was not chosen; see `DESIGN.md`.

use crate::error::{fe_err, DsonError};

const SCALE: f64 = 1e7;

/// Encodes `value` as a scaled, clamped `i64`. Fails on non-finite
/// input.
pub fn encode(value: f64) -> Result<i64, DsonError> {
    if !value.is_finite() {
        return fe_err!("fixed-point encoding does not support non-finite value {}", value);
    }
    let scaled = value * SCALE;
    let clamped = scaled.clamp(i64::MIN as f64, i64::MAX as f64);
    Ok(clamped.round() as i64)
}

/// Decodes a scaled `i64` back into an `f64`. The inverse of
/// [`encode`], modulo the precision lost by the `1e7` scale factor.
pub fn decode(scaled: i64) -> f64 {
    scaled as f64 / SCALE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_within_scale_precision() {
        for v in [0.0, -1.0, 1.0, -12345.56789, 12345.56789] {
            let encoded = encode(v).unwrap();
            let decoded = decode(encoded);
            assert!((decoded - v).abs() < 1e-6, "{} vs {}", v, decoded);
        }
    }

    #[test]
    fn rejects_nan_and_infinities() {
        assert!(encode(f64::NAN).is_err());
        assert!(encode(f64::INFINITY).is_err());
        assert!(encode(f64::NEG_INFINITY).is_err());
    }

    #[test]
    fn clamps_rather_than_overflows() {
        let huge = f64::MAX;
        let encoded = encode(huge).unwrap();
        assert_eq!(encoded, i64::MAX);
    }
}
