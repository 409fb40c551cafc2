#![forbid(unsafe_code)]

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DType {
    Null,
    Bool,
    Int64,
    Float64,
    Utf8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NullKind {
    Null,
    NaN,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Scalar {
    Null(NullKind),
    Bool(bool),
    Int64(i64),
    Float64(f64),
    Utf8(String),
}

impl Scalar {
    #[must_use]
    pub fn dtype(&self) -> DType {
        match self {
            Self::Null(_) => DType::Null,
            Self::Bool(_) => DType::Bool,
            Self::Int64(_) => DType::Int64,
            Self::Float64(_) => DType::Float64,
            Self::Utf8(_) => DType::Utf8,
        }
    }

    /// Explicit nulls and NaN floats are both missing.
    #[must_use]
    pub fn is_missing(&self) -> bool {
        match self {
            Self::Null(_) => true,
            Self::Float64(v) => v.is_nan(),
            _ => false,
        }
    }

    /// Category label used when this value is counted.
    ///
    /// Returns `None` for missing values so callers decide how to bucket them.
    /// Booleans render the way a dataframe index would show them. Floats keep
    /// their debug form, so a float column labels `1` as `1.0`.
    #[must_use]
    pub fn to_label(&self) -> Option<IndexLabel> {
        match self {
            Self::Null(_) => None,
            Self::Float64(v) if v.is_nan() => None,
            Self::Int64(v) => Some(IndexLabel::Int64(*v)),
            Self::Utf8(v) => Some(IndexLabel::Utf8(v.clone())),
            Self::Bool(v) => Some(IndexLabel::Utf8(if *v {
                "True".to_owned()
            } else {
                "False".to_owned()
            })),
            Self::Float64(v) => Some(IndexLabel::Utf8(format!("{v:?}"))),
        }
    }
}

impl From<i64> for Scalar {
    fn from(value: i64) -> Self {
        Self::Int64(value)
    }
}

impl From<f64> for Scalar {
    fn from(value: f64) -> Self {
        Self::Float64(value)
    }
}

impl From<bool> for Scalar {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Self::Utf8(value.to_owned())
    }
}

impl From<String> for Scalar {
    fn from(value: String) -> Self {
        Self::Utf8(value)
    }
}

impl<T: Into<Scalar>> From<Option<T>> for Scalar {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null(NullKind::Null), Into::into)
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null(NullKind::Null) => write!(f, "<null>"),
            Self::Null(NullKind::NaN) => write!(f, "NaN"),
            Self::Bool(v) => write!(f, "{v}"),
            Self::Int64(v) => write!(f, "{v}"),
            Self::Float64(v) => write!(f, "{v}"),
            Self::Utf8(v) => write!(f, "{v}"),
        }
    }
}

/// Hashable, ordered label of a counted value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum IndexLabel {
    Int64(i64),
    Utf8(String),
}

impl From<i64> for IndexLabel {
    fn from(value: i64) -> Self {
        Self::Int64(value)
    }
}

impl From<&str> for IndexLabel {
    fn from(value: &str) -> Self {
        Self::Utf8(value.to_owned())
    }
}

impl From<String> for IndexLabel {
    fn from(value: String) -> Self {
        Self::Utf8(value)
    }
}

impl fmt::Display for IndexLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int64(v) => write!(f, "{v}"),
            Self::Utf8(v) => write!(f, "{v}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{DType, IndexLabel, NullKind, Scalar};

    #[test]
    fn nan_floats_are_missing() {
        assert!(Scalar::Float64(f64::NAN).is_missing());
        assert!(Scalar::Null(NullKind::Null).is_missing());
        assert!(!Scalar::Float64(0.0).is_missing());
        assert!(!Scalar::Utf8(String::new()).is_missing());
    }

    #[test]
    fn labels_follow_dataframe_index_rendering() {
        assert_eq!(Scalar::Int64(7).to_label(), Some(IndexLabel::Int64(7)));
        assert_eq!(Scalar::from("a").to_label(), Some(IndexLabel::from("a")));
        assert_eq!(Scalar::Bool(true).to_label(), Some(IndexLabel::from("True")));
        assert_eq!(Scalar::Float64(1.0).to_label(), Some(IndexLabel::from("1.0")));
        assert_eq!(Scalar::Null(NullKind::Null).to_label(), None);
        assert_eq!(Scalar::Float64(f64::NAN).to_label(), None);
    }

    #[test]
    fn option_converts_to_null_when_absent() {
        assert_eq!(Scalar::from(None::<&str>), Scalar::Null(NullKind::Null));
        assert_eq!(Scalar::from(Some(3_i64)), Scalar::Int64(3));
        assert_eq!(Scalar::from(Some("x")).dtype(), DType::Utf8);
    }
}
