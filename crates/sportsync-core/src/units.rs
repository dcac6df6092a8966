// ABOUTME: Conversion of (value, unit exponent) pairs reported by the scale provider
// ABOUTME: value * 10^exponent using the provider-declared exponent per reading
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 SportSync Contributors

/// Largest exponent magnitude for which `10^n` is exactly representable in `f64`
const MAX_EXACT_POWER: i32 = 22;

/// Convert a raw `(value, unit_exponent)` pair to a float
///
/// Negative exponents divide by an exact power of ten instead of multiplying
/// by an inexact fraction, so `(702, -2)` yields the same `f64` as the literal
/// `7.02`.
#[must_use]
pub fn scaled_value(value: i64, unit_exponent: i32) -> f64 {
    let base = value as f64;
    let magnitude = unit_exponent.clamp(-MAX_EXACT_POWER, MAX_EXACT_POWER).abs();
    let power = 10f64.powi(magnitude);
    if unit_exponent >= 0 {
        base * power
    } else {
        base / power
    }
}
