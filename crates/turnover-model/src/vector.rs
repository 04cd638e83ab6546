// SPDX-License-Identifier: Apache-2.0

use crate::contract::{feature_position, CONTRACT, CONTRACT_LEN};
use crate::value::FeatureValue;
use serde::Serialize;

/// Model-ready feature vector: exactly [`CONTRACT_LEN`] values, positionally
/// aligned with the contract order.
///
/// Construction is restricted to [`FeatureVector::from_contract_order`] so a
/// vector of the wrong shape cannot exist.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct FeatureVector {
    values: Vec<FeatureValue>,
}

impl FeatureVector {
    /// Wraps values already arranged in contract order.
    ///
    /// Returns `None` when the length does not match the contract; callers
    /// in the inference adapter guarantee the length by construction.
    #[must_use]
    pub fn from_contract_order(values: Vec<FeatureValue>) -> Option<Self> {
        (values.len() == CONTRACT_LEN).then_some(Self { values })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    #[must_use]
    pub fn values(&self) -> &[FeatureValue] {
        &self.values
    }

    /// Value of a contract feature by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&FeatureValue> {
        feature_position(name).map(|i| &self.values[i])
    }

    /// Iterates `(name, value)` pairs in contract order.
    pub fn iter_named(&self) -> impl Iterator<Item = (&'static str, &FeatureValue)> {
        CONTRACT.iter().map(|f| f.name).zip(self.values.iter())
    }
}
