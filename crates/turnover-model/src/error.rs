// SPDX-License-Identifier: Apache-2.0

use std::fmt::{Display, Formatter};

/// Coarse classification of a [`PredictError`], used by the HTTP boundary to
/// pick a transport status. The core never sees status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Caller-fixable payload problem (missing or unexpected features).
    Validation,
    /// No prepared feature row exists for the requested entity.
    NotFound,
    /// Storage, classifier or other internal failure.
    Internal,
}

/// Error taxonomy of the prediction core.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum PredictError {
    /// Contract features absent from a row or payload, in contract order.
    MissingFeatures(Vec<String>),
    /// Payload keys outside the contract (payload scoring only).
    UnexpectedFeatures(Vec<String>),
    /// No prepared feature row for this employee.
    NoFeatureRow { employee_id: i64 },
    /// The classifier rejected the vector or produced an invalid probability.
    Classifier(String),
    /// Feature store or audit log failure.
    Storage(String),
}

impl PredictError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MissingFeatures(_) | Self::UnexpectedFeatures(_) => ErrorKind::Validation,
            Self::NoFeatureRow { .. } => ErrorKind::NotFound,
            Self::Classifier(_) | Self::Storage(_) => ErrorKind::Internal,
        }
    }

    /// Field names this error is about, for structured error details.
    #[must_use]
    pub fn field_names(&self) -> &[String] {
        match self {
            Self::MissingFeatures(names) | Self::UnexpectedFeatures(names) => names,
            _ => &[],
        }
    }
}

impl Display for PredictError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingFeatures(names) => write!(f, "Missing features: {names:?}"),
            Self::UnexpectedFeatures(names) => write!(f, "Unexpected features: {names:?}"),
            Self::NoFeatureRow { employee_id } => {
                write!(f, "no prepared feature row for employee_id={employee_id}")
            }
            Self::Classifier(msg) => write!(f, "classifier failure: {msg}"),
            Self::Storage(msg) => write!(f, "storage failure: {msg}"),
        }
    }
}

impl std::error::Error for PredictError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_are_distinct_per_variant() {
        assert_eq!(
            PredictError::MissingFeatures(vec!["age".to_string()]).kind(),
            ErrorKind::Validation
        );
        assert_eq!(
            PredictError::UnexpectedFeatures(vec!["foo".to_string()]).kind(),
            ErrorKind::Validation
        );
        assert_eq!(
            PredictError::NoFeatureRow { employee_id: 7 }.kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            PredictError::Storage("db gone".to_string()).kind(),
            ErrorKind::Internal
        );
    }

    #[test]
    fn messages_enumerate_offending_fields() {
        let err = PredictError::MissingFeatures(vec!["revenu_mensuel".to_string()]);
        assert!(err.to_string().contains("revenu_mensuel"));
        let err = PredictError::UnexpectedFeatures(vec!["foo".to_string()]);
        assert!(err.to_string().contains("foo"));
    }
}
