// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Scalar feature value as it appears in stored rows and JSON payloads.
///
/// Integers and floats are kept distinct so that stored rows round-trip
/// without loss; category features carry their raw string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FeatureValue {
    Int(i64),
    Float(f64),
    Text(String),
}

impl FeatureValue {
    /// Numeric view of the value, if it has one. Text is parsed, not coerced.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(v) => Some(*v as f64),
            Self::Float(v) => Some(*v),
            Self::Text(s) => s.trim().parse::<f64>().ok(),
        }
    }

    /// Integer view. Finite floats truncate toward zero, matching how the
    /// batch pipeline casts float columns to integer ones.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            Self::Float(v) if v.is_finite() => Some(v.trunc() as i64),
            Self::Float(_) => None,
            Self::Text(s) => s.trim().parse::<i64>().ok(),
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }
}

impl Display for FeatureValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for FeatureValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for FeatureValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for FeatureValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for FeatureValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_views_parse_text() {
        assert_eq!(FeatureValue::Text("12".to_string()).as_i64(), Some(12));
        assert_eq!(FeatureValue::Text(" 2.5 ".to_string()).as_f64(), Some(2.5));
        assert_eq!(FeatureValue::Text("Cadre".to_string()).as_f64(), None);
    }

    #[test]
    fn integer_view_truncates_fractional_floats() {
        assert_eq!(FeatureValue::Float(2.5).as_i64(), Some(2));
        assert_eq!(FeatureValue::Float(-2.5).as_i64(), Some(-2));
        assert_eq!(FeatureValue::Float(3.0).as_i64(), Some(3));
        assert_eq!(FeatureValue::Float(f64::NAN).as_i64(), None);
        assert_eq!(FeatureValue::Float(f64::INFINITY).as_i64(), None);
    }

    #[test]
    fn untagged_serde_keeps_scalar_shape() {
        let v: FeatureValue = serde_json::from_str("41").expect("int");
        assert_eq!(v, FeatureValue::Int(41));
        let v: FeatureValue = serde_json::from_str("0.25").expect("float");
        assert_eq!(v, FeatureValue::Float(0.25));
        let v: FeatureValue = serde_json::from_str("\"Commercial\"").expect("text");
        assert_eq!(v, FeatureValue::Text("Commercial".to_string()));
    }
}
