// SPDX-License-Identifier: Apache-2.0

//! SQLite-backed persistence: raw HR tables, the prepared feature table the
//! interactive path reads, and the prediction audit log.

#![forbid(unsafe_code)]

pub mod pipeline;
pub mod schema;
pub mod store;

pub use pipeline::{PipelineError, PipelineReport, WriteMode};
pub use store::{AuditRecord, AuditedPrediction, FeatureStore, StoreError};
