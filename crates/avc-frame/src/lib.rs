#![forbid(unsafe_code)]

use std::collections::BTreeMap;

use avc_types::{DType, Scalar};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum FrameError {
    #[error("column '{column}' has length {column_len} but the frame has {frame_len} rows")]
    LengthMismatch {
        column: String,
        frame_len: usize,
        column_len: usize,
    },
    #[error("column '{0}' not found")]
    ColumnNotFound(String),
    #[error("duplicate column name: '{0}'")]
    DuplicateColumn(String),
    #[error("dtype coercion from {left:?} to {right:?} has no compatible common type")]
    IncompatibleDtypes { left: DType, right: DType },
}

pub fn common_dtype(left: DType, right: DType) -> Result<DType, FrameError> {
    use DType::{Bool, Float64, Int64, Null};

    let out = match (left, right) {
        (a, b) if a == b => a,
        (Null, other) | (other, Null) => other,
        (Bool, Int64) | (Int64, Bool) => Int64,
        (Int64, Float64) | (Float64, Int64) => Float64,
        _ => return Err(FrameError::IncompatibleDtypes { left, right }),
    };

    Ok(out)
}

pub fn infer_dtype(values: &[Scalar]) -> Result<DType, FrameError> {
    let mut current = DType::Null;
    for value in values {
        current = common_dtype(current, value.dtype())?;
    }
    Ok(current)
}

/// Widen `value` to `target`. Missing values pass through untouched.
pub fn cast_scalar_owned(value: Scalar, target: DType) -> Result<Scalar, FrameError> {
    let from = value.dtype();
    if from == target || value.is_missing() {
        return Ok(value);
    }
    match (value, target) {
        (Scalar::Bool(v), DType::Int64) => Ok(Scalar::Int64(i64::from(v))),
        (Scalar::Int64(v), DType::Float64) => Ok(Scalar::Float64(v as f64)),
        (Scalar::Bool(v), DType::Float64) => Ok(Scalar::Float64(f64::from(u8::from(v)))),
        _ => Err(FrameError::IncompatibleDtypes {
            left: from,
            right: target,
        }),
    }
}

/// A dtype-homogeneous run of values. Missing values are allowed anywhere.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    dtype: DType,
    values: Vec<Scalar>,
}

impl Column {
    pub fn from_values(values: Vec<Scalar>) -> Result<Self, FrameError> {
        let dtype = infer_dtype(&values)?;
        let values = values
            .into_iter()
            .map(|value| cast_scalar_owned(value, dtype))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { dtype, values })
    }

    #[must_use]
    pub fn dtype(&self) -> DType {
        self.dtype
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
    pub fn values(&self) -> &[Scalar] {
        &self.values
    }

}

/// Column-oriented in-memory table.
///
/// Columns keep their insertion order for display; lookups go through a
/// name map. Every column has exactly `len()` entries.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataFrame {
    len: usize,
    columns: BTreeMap<String, Column>,
    #[serde(skip)]
    column_order: Vec<String>,
}

impl DataFrame {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a frame from `(name, values)` pairs in display order.
    pub fn from_columns<N, I>(columns: I) -> Result<Self, FrameError>
    where
        N: Into<String>,
        I: IntoIterator<Item = (N, Vec<Scalar>)>,
    {
        let mut frame = Self::new();
        for (name, values) in columns {
            frame = frame.with_column(name, values)?;
        }
        Ok(frame)
    }

    /// Append a column. The first column fixes the row count.
    pub fn with_column(
        mut self,
        name: impl Into<String>,
        values: Vec<Scalar>,
    ) -> Result<Self, FrameError> {
        let name = name.into();
        if self.columns.contains_key(&name) {
            return Err(FrameError::DuplicateColumn(name));
        }
        if self.columns.is_empty() {
            self.len = values.len();
        } else if values.len() != self.len {
            return Err(FrameError::LengthMismatch {
                column: name,
                frame_len: self.len,
                column_len: values.len(),
            });
        }
        let column = Column::from_values(values)?;
        self.column_order.push(name.clone());
        self.columns.insert(name, column);
        Ok(self)
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[must_use]
    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    #[must_use]
    pub fn column_names(&self) -> Vec<&str> {
        if self.column_order.len() == self.columns.len() {
            self.column_order.iter().map(String::as_str).collect()
        } else {
            // Deserialized frames lose insertion order.
            self.columns.keys().map(String::as_str).collect()
        }
    }

    #[must_use]
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.get(name)
    }

    pub fn require_column(&self, name: &str) -> Result<&Column, FrameError> {
        self.columns
            .get(name)
            .ok_or_else(|| FrameError::ColumnNotFound(name.to_owned()))
    }
}
