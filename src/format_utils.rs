// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Number formatting for names and dashboard figures.

/// Format `value` with `digits` decimals, rounding ties away from zero.
///
/// `format!("{:.1}", 0.25)` gives `0.2` (ties to even); this gives `0.3`.
pub fn to_fixed(value: f64, digits: usize) -> String {
    let scale = 10f64.powi(digits as i32);
    let rounded = (value * scale).round() / scale;
    format!("{:.*}", digits, rounded)
}
