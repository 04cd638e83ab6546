// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Serialize};

/// Result of one inference call. Created fresh per call, never mutated,
/// handed to the audit log and returned to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PredictionOutcome {
    /// Set when the prediction was resolved from a stored feature row,
    /// absent for direct payload scoring.
    pub employee_id: Option<i64>,
    /// Probability of the positive class (departure), in [0, 1].
    pub turnover_probability: f64,
    /// `turnover_probability >= threshold`, inclusive at the boundary.
    pub will_leave: bool,
}
