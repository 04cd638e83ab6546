// SPDX-License-Identifier: Apache-2.0

use serde::Deserialize;
use std::collections::BTreeMap;
use turnover_model::{FeatureValue, FeatureVector};

/// Scoring backend behind the inference adapter.
///
/// Implementations must be pure with respect to the vector: the same vector
/// always yields the same probability.
pub trait Classifier: Send + Sync {
    /// Probability of the positive class (departure) for one vector.
    ///
    /// The adapter validates the returned value; implementations report
    /// internal failures as strings rather than panicking.
    fn predict_proba(&self, vector: &FeatureVector) -> Result<f64, String>;

    /// Identifier persisted with every audit record.
    fn version(&self) -> &str;
}

/// Logistic classifier deserialized from a JSON artifact.
///
/// Numeric features contribute `weight * value`; categorical features look
/// their level up in a per-feature weight map, with unseen levels scoring
/// zero. Features absent from both maps are inert.
#[derive(Debug, Clone, Deserialize)]
pub struct LogisticModel {
    pub model_version: String,
    pub intercept: f64,
    #[serde(default)]
    pub weights: BTreeMap<String, f64>,
    #[serde(default)]
    pub category_weights: BTreeMap<String, BTreeMap<String, f64>>,
}

impl Classifier for LogisticModel {
    fn predict_proba(&self, vector: &FeatureVector) -> Result<f64, String> {
        let mut z = self.intercept;
        for (name, value) in vector.iter_named() {
            if let Some(weight) = self.weights.get(name) {
                let x = value
                    .as_f64()
                    .ok_or_else(|| format!("feature {name} is not numeric: {value}"))?;
                z += weight * x;
            } else if let Some(levels) = self.category_weights.get(name) {
                let level = match value {
                    FeatureValue::Text(s) => s.clone(),
                    other => other.to_string(),
                };
                z += levels.get(&level).copied().unwrap_or(0.0);
            }
        }
        Ok(sigmoid(z))
    }

    fn version(&self) -> &str {
        &self.model_version
    }
}

fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

/// Classifier returning a constant probability, for wiring tests.
#[derive(Debug, Clone, Copy)]
pub struct FixedClassifier(pub f64);

impl Classifier for FixedClassifier {
    fn predict_proba(&self, _vector: &FeatureVector) -> Result<f64, String> {
        Ok(self.0)
    }

    fn version(&self) -> &str {
        "fixed_test"
    }
}
