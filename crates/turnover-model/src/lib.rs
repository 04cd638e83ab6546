// SPDX-License-Identifier: Apache-2.0

//! Domain types for the turnover prediction service.
//!
//! This crate is pure: no I/O, no clock, no globals. It defines the feature
//! contract the classifier was trained against, the scalar value type used on
//! every boundary (SQL rows, JSON payloads, model input), the engineered
//! feature computation shared by the batch pipeline and the interactive
//! scoring path, and the error taxonomy the HTTP boundary maps to statuses.

#![forbid(unsafe_code)]

mod contract;
mod error;
mod features;
mod outcome;
mod value;
mod vector;

pub use contract::{
    feature_names, feature_position, is_contract_feature, FeatureKind, FeatureSpec, CONTRACT,
    CONTRACT_LEN,
};
pub use error::{ErrorKind, PredictError};
pub use features::{
    compute_engineered, drop_satisfaction_fields, lenient_f64, lenient_i64, ENGINEERED_FEATURES,
    SATISFACTION_FIELDS,
};
pub use outcome::PredictionOutcome;
pub use value::FeatureValue;
pub use vector::FeatureVector;
