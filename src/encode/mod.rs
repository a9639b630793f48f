//! Numeric encoding of finalized runs for causal discovery
//!
//! Constraint-based discovery tools take a numeric matrix plus column names.
//! Numeric columns are kept as-is, text columns are label encoded (sorted
//! distinct labels → 0..k-1) and, optionally, every column is z-scored.

use crate::model::SyntheticRun;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;
use thiserror::Error;

/// Encoding errors
#[derive(Debug, Error, PartialEq)]
pub enum EncodeError {
    /// The run has no records or no columns left after dropping
    #[error("run has no data to encode")]
    Empty,

    /// A record lacks a column other records have, or holds null
    #[error("missing value for column '{column}' in record {row}")]
    MissingValue {
        /// Column name
        column: String,
        /// 1-based record number
        row: usize,
    },

    /// A cell still holds a mapping or list (e.g. an unresolved confounder)
    #[error("non-scalar value for column '{column}' in record {row}")]
    NonScalar {
        /// Column name
        column: String,
        /// 1-based record number
        row: usize,
    },
}

/// Encoding options
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncodeOptions {
    /// Z-score every column (population standard deviation)
    pub standardize: bool,
    /// Columns excluded from the matrix
    pub drop_columns: Vec<String>,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self {
            standardize: false,
            drop_columns: vec!["id".to_string()],
        }
    }
}

/// How a column was turned into numbers
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ColumnEncoding {
    /// Values were already numeric
    Numeric,
    /// Label codes; `labels[i]` was encoded as `i`
    Labels {
        /// Sorted distinct labels
        labels: Vec<String>,
    },
}

/// Numeric matrix with named columns
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedMatrix {
    /// Column names in first-seen record key order
    pub columns: Vec<String>,
    /// How each column was encoded
    pub encodings: Vec<ColumnEncoding>,
    /// Row-major values
    pub rows: Vec<Vec<f64>>,
}

impl EncodedMatrix {
    /// Encode every record of `run`
    pub fn from_run(run: &SyntheticRun, options: &EncodeOptions) -> Result<Self, EncodeError> {
        let mut columns: Vec<String> = Vec::new();
        for record in &run.data {
            for key in record.keys() {
                if !options.drop_columns.contains(key) && !columns.contains(key) {
                    columns.push(key.clone());
                }
            }
        }
        if run.data.is_empty() || columns.is_empty() {
            return Err(EncodeError::Empty);
        }

        let mut encodings = Vec::with_capacity(columns.len());
        let mut by_column: Vec<Vec<f64>> = Vec::with_capacity(columns.len());

        for column in &columns {
            let cells = run
                .data
                .iter()
                .enumerate()
                .map(|(i, record)| match record.get(column) {
                    None | Some(Value::Null) => Err(EncodeError::MissingValue {
                        column: column.clone(),
                        row: i + 1,
                    }),
                    Some(Value::Object(_)) | Some(Value::Array(_)) => Err(EncodeError::NonScalar {
                        column: column.clone(),
                        row: i + 1,
                    }),
                    Some(value) => Ok(value),
                })
                .collect::<Result<Vec<&Value>, _>>()?;

            let (encoding, mut values) = encode_column(&cells);
            if options.standardize {
                standardize(&mut values);
            }
            encodings.push(encoding);
            by_column.push(values);
        }

        let rows = (0..run.data.len())
            .map(|r| by_column.iter().map(|col| col[r]).collect())
            .collect();

        Ok(Self {
            columns,
            encodings,
            rows,
        })
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the matrix has no rows
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

fn numeric(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::Bool(b) => Some(f64::from(u8::from(*b))),
        _ => None,
    }
}

fn label(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn encode_column(cells: &[&Value]) -> (ColumnEncoding, Vec<f64>) {
    if let Some(values) = cells.iter().map(|v| numeric(v)).collect::<Option<Vec<f64>>>() {
        return (ColumnEncoding::Numeric, values);
    }

    let labels: Vec<String> = cells
        .iter()
        .map(|v| label(v))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let values = cells
        .iter()
        .map(|v| {
            let l = label(v);
            labels.binary_search(&l).unwrap_or_default() as f64
        })
        .collect();

    (ColumnEncoding::Labels { labels }, values)
}

/// Center and scale in place; zero-variance columns are only centered
fn standardize(values: &mut [f64]) {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;
    let std = var.sqrt();
    for x in values.iter_mut() {
        *x -= mean;
        if std > 0.0 {
            *x /= std;
        }
    }
}
