// SPDX-License-Identifier: Apache-2.0

use crate::classifier::Classifier;
use crate::decision::decide;
use std::collections::BTreeMap;
use std::sync::Arc;
use turnover_model::{
    feature_names, is_contract_feature, FeatureValue, FeatureVector, PredictError,
    PredictionOutcome,
};

/// Bridges validated feature maps and the classifier.
///
/// Immutable after construction; the server shares one instance across all
/// requests. The two assembly paths deliberately differ in strictness: a
/// stored row may carry extra columns (they are dropped), while a caller
/// payload must match the contract exactly.
pub struct InferenceAdapter {
    classifier: Arc<dyn Classifier>,
    threshold: f64,
}

impl InferenceAdapter {
    #[must_use]
    pub fn new(classifier: Arc<dyn Classifier>, threshold: f64) -> Self {
        Self {
            classifier,
            threshold,
        }
    }

    #[must_use]
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    #[must_use]
    pub fn model_version(&self) -> &str {
        self.classifier.version()
    }

    /// Assembles a vector from a stored feature row.
    ///
    /// Every contract feature must be present; keys outside the contract
    /// (row id, timestamps, the label column) are ignored.
    pub fn assemble_from_row(
        &self,
        row: &BTreeMap<String, FeatureValue>,
    ) -> Result<FeatureVector, PredictError> {
        let missing: Vec<String> = feature_names()
            .filter(|name| !row.contains_key(*name))
            .map(str::to_string)
            .collect();
        if !missing.is_empty() {
            return Err(PredictError::MissingFeatures(missing));
        }
        let values = feature_names()
            .filter_map(|name| row.get(name).cloned())
            .collect();
        FeatureVector::from_contract_order(values)
            .ok_or_else(|| PredictError::Classifier("assembled vector has wrong length".to_string()))
    }

    /// Assembles a vector from a caller-supplied payload.
    ///
    /// Strict in both directions: missing contract features are reported
    /// first, then any keys outside the contract.
    pub fn assemble_from_payload(
        &self,
        payload: &BTreeMap<String, FeatureValue>,
    ) -> Result<FeatureVector, PredictError> {
        let missing: Vec<String> = feature_names()
            .filter(|name| !payload.contains_key(*name))
            .map(str::to_string)
            .collect();
        if !missing.is_empty() {
            return Err(PredictError::MissingFeatures(missing));
        }
        let unexpected: Vec<String> = payload
            .keys()
            .filter(|key| !is_contract_feature(key))
            .cloned()
            .collect();
        if !unexpected.is_empty() {
            return Err(PredictError::UnexpectedFeatures(unexpected));
        }
        self.assemble_from_row(payload)
    }

    /// Runs the classifier and validates its output.
    pub fn infer(&self, vector: &FeatureVector) -> Result<f64, PredictError> {
        let probability = self
            .classifier
            .predict_proba(vector)
            .map_err(PredictError::Classifier)?;
        if !probability.is_finite() || !(0.0..=1.0).contains(&probability) {
            return Err(PredictError::Classifier(format!(
                "probability out of range: {probability}"
            )));
        }
        Ok(probability)
    }

    /// Full interactive path for a stored row.
    pub fn predict_from_row(
        &self,
        employee_id: i64,
        row: &BTreeMap<String, FeatureValue>,
    ) -> Result<PredictionOutcome, PredictError> {
        let vector = self.assemble_from_row(row)?;
        let probability = self.infer(&vector)?;
        Ok(PredictionOutcome {
            employee_id: Some(employee_id),
            turnover_probability: probability,
            will_leave: decide(probability, self.threshold),
        })
    }

    /// Full interactive path for a caller payload.
    pub fn predict_from_payload(
        &self,
        payload: &BTreeMap<String, FeatureValue>,
    ) -> Result<PredictionOutcome, PredictError> {
        let vector = self.assemble_from_payload(payload)?;
        let probability = self.infer(&vector)?;
        Ok(PredictionOutcome {
            employee_id: None,
            turnover_probability: probability,
            will_leave: decide(probability, self.threshold),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::FixedClassifier;
    use turnover_model::CONTRACT_LEN;

    fn adapter(probability: f64, threshold: f64) -> InferenceAdapter {
        InferenceAdapter::new(Arc::new(FixedClassifier(probability)), threshold)
    }

    fn full_row() -> BTreeMap<String, FeatureValue> {
        feature_names()
            .map(|name| (name.to_string(), FeatureValue::Int(1)))
            .collect()
    }

    #[test]
    fn row_assembly_ignores_extra_columns() {
        let mut row = full_row();
        row.insert("id".to_string(), FeatureValue::Int(42));
        row.insert("created_at".to_string(), FeatureValue::Int(1_700_000_000));
        row.insert("a_quitte_l_entreprise".to_string(), FeatureValue::Int(0));
        let v = adapter(0.5, 0.5).assemble_from_row(&row).expect("superset row");
        assert_eq!(v.len(), CONTRACT_LEN);
    }

    #[test]
    fn row_assembly_names_every_missing_feature() {
        let mut row = full_row();
        row.remove("revenu_mensuel");
        row.remove("age");
        let err = adapter(0.5, 0.5)
            .assemble_from_row(&row)
            .expect_err("incomplete row");
        match err {
            PredictError::MissingFeatures(names) => {
                assert_eq!(
                    names,
                    vec!["age".to_string(), "revenu_mensuel".to_string()],
                    "missing names in contract order"
                );
            }
            other => panic!("expected MissingFeatures, got {other:?}"),
        }
    }

    #[test]
    fn payload_assembly_rejects_unexpected_keys() {
        let mut payload = full_row();
        payload.insert("foo".to_string(), FeatureValue::Int(1));
        let err = adapter(0.5, 0.5)
            .assemble_from_payload(&payload)
            .expect_err("extra key");
        match err {
            PredictError::UnexpectedFeatures(names) => {
                assert_eq!(names, vec!["foo".to_string()]);
            }
            other => panic!("expected UnexpectedFeatures, got {other:?}"),
        }
    }

    #[test]
    fn missing_is_reported_before_unexpected() {
        let mut payload = full_row();
        payload.remove("age");
        payload.insert("foo".to_string(), FeatureValue::Int(1));
        let err = adapter(0.5, 0.5)
            .assemble_from_payload(&payload)
            .expect_err("both defects");
        assert!(matches!(err, PredictError::MissingFeatures(_)));
    }

    #[test]
    fn assembly_is_insertion_order_independent() {
        let a = adapter(0.5, 0.5);
        let row = full_row();
        let mut reversed = BTreeMap::new();
        for (k, v) in row.iter().rev() {
            reversed.insert(k.clone(), v.clone());
        }
        assert_eq!(
            a.assemble_from_row(&row).expect("row"),
            a.assemble_from_row(&reversed).expect("reversed row")
        );
    }

    #[test]
    fn out_of_range_probability_is_an_internal_error() {
        let a = adapter(1.5, 0.5);
        let err = a
            .predict_from_payload(&full_row())
            .expect_err("probability above one");
        assert!(matches!(err, PredictError::Classifier(_)));
    }

    #[test]
    fn threshold_boundary_is_inclusive_end_to_end() {
        let outcome = adapter(0.5, 0.5)
            .predict_from_payload(&full_row())
            .expect("outcome");
        assert!(outcome.will_leave);
        assert_eq!(outcome.employee_id, None);

        let outcome = adapter(0.499_9, 0.5)
            .predict_from_payload(&full_row())
            .expect("outcome");
        assert!(!outcome.will_leave);
    }

    #[test]
    fn row_path_carries_the_employee_id() {
        let outcome = adapter(0.8, 0.5)
            .predict_from_row(7, &full_row())
            .expect("outcome");
        assert_eq!(outcome.employee_id, Some(7));
        assert!(outcome.will_leave);
        assert!((outcome.turnover_probability - 0.8).abs() < 1e-12);
    }
}
