#![forbid(unsafe_code)]

use std::path::Path;

use avc_frame::{DataFrame, FrameError, infer_dtype};
use avc_types::{NullKind, Scalar};
use csv::ReaderBuilder;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IoError {
    #[error("csv input has no headers")]
    MissingHeaders,
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Frame(#[from] FrameError),
}

pub fn read_csv_path(path: impl AsRef<Path>) -> Result<DataFrame, IoError> {
    let input = std::fs::read_to_string(path)?;
    read_csv_str(&input)
}

/// Parse CSV text into a frame, inferring one dtype per column.
///
/// Empty cells become missing. A column whose cells do not share a common
/// dtype (for example `1` next to `abc`) is kept as text.
pub fn read_csv_str(input: &str) -> Result<DataFrame, IoError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .from_reader(input.as_bytes());

    let headers = reader.headers().cloned().map_err(IoError::from)?;

    if headers.is_empty() {
        return Err(IoError::MissingHeaders);
    }

    let header_count = headers.len();
    let row_hint = input.len() / (header_count * 8).max(1);
    let mut fields: Vec<Vec<String>> = (0..header_count)
        .map(|_| Vec::with_capacity(row_hint))
        .collect();

    for row in reader.records() {
        let record = row?;
        for (idx, col) in fields.iter_mut().enumerate() {
            col.push(record.get(idx).unwrap_or_default().trim().to_owned());
        }
    }

    let columns = headers
        .iter()
        .zip(fields)
        .map(|(name, raw)| (name.to_owned(), parse_column(raw)));
    Ok(DataFrame::from_columns(columns)?)
}

fn parse_column(raw: Vec<String>) -> Vec<Scalar> {
    let parsed: Vec<Scalar> = raw.iter().map(|field| parse_scalar(field)).collect();
    if infer_dtype(&parsed).is_ok() {
        return parsed;
    }
    raw.into_iter()
        .map(|field| {
            if field.is_empty() {
                Scalar::Null(NullKind::Null)
            } else {
                Scalar::Utf8(field)
            }
        })
        .collect()
}

fn parse_scalar(field: &str) -> Scalar {
    if field.is_empty() {
        return Scalar::Null(NullKind::Null);
    }

    if let Ok(value) = field.parse::<i64>() {
        return Scalar::Int64(value);
    }
    if let Ok(value) = field.parse::<f64>() {
        return Scalar::Float64(value);
    }
    if let Ok(value) = field.parse::<bool>() {
        return Scalar::Bool(value);
    }

    Scalar::Utf8(field.to_owned())
}
