// SPDX-License-Identifier: Apache-2.0

//! Turns stored rows or caller payloads into scored predictions.
//!
//! The adapter owns vector assembly and validation, the classifier is a
//! trait object loaded from artifacts, and the decision step is a single
//! pure comparison kept separate so the threshold policy stays auditable.

#![forbid(unsafe_code)]

pub mod adapter;
pub mod artifacts;
pub mod classifier;
pub mod decision;

pub use adapter::InferenceAdapter;
pub use artifacts::{load_classifier, load_threshold, ArtifactConfig, ArtifactError};
pub use classifier::{Classifier, FixedClassifier, LogisticModel};
pub use decision::decide;
