// SPDX-License-Identifier: Apache-2.0

/// Converts a probability into a binary departure decision.
///
/// The comparison is inclusive: a probability exactly at the threshold is a
/// positive. Callers must not re-derive this comparison anywhere else.
#[must_use]
pub fn decide(probability: f64, threshold: f64) -> bool {
    probability >= threshold
}
