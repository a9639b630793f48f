//! Observed baseline data loaded from CSV
//!
//! The data-generation prompt conditions on real observations (e.g. the
//! Sachs protein-signalling table). Columns are selected from the CSV, renamed
//! to the hypothesis' variable names and truncated to the first rows.

use crate::model::Record;
use csv::{ReaderBuilder, StringRecord};
use serde_json::Value;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use thiserror::Error;

/// Baseline selection errors
#[derive(Debug, Error, PartialEq)]
pub enum DatasetError {
    /// A requested column is not in the header
    #[error("column '{0}' not found in dataset")]
    MissingColumn(String),

    /// Number of new names differs from the number of selected columns
    #[error("{columns} columns selected but {names} names given")]
    RenameMismatch {
        /// Selected columns
        columns: usize,
        /// Replacement names
        names: usize,
    },
}

/// A CSV table held in memory
#[derive(Debug, Clone)]
pub struct ObservedTable {
    headers: Vec<String>,
    rows: Vec<StringRecord>,
}

impl ObservedTable {
    /// Load a CSV file with a header row
    pub fn from_csv(path: &Path) -> crate::Result<Self> {
        let file = File::open(path)?;
        Self::from_reader(file)
    }

    /// Load CSV from any reader
    pub fn from_reader<R: Read>(reader: R) -> crate::Result<Self> {
        let mut rdr = ReaderBuilder::new().has_headers(true).from_reader(reader);
        let headers = rdr.headers()?.iter().map(|h| h.trim().to_string()).collect();
        let rows = rdr.records().collect::<Result<Vec<_>, _>>()?;
        Ok(Self { headers, rows })
    }

    /// Column names
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Number of data rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table has no data rows
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// First `limit` rows of `columns`, keyed by `names`
    ///
    /// `names` renames the columns positionally; pass an empty slice to keep
    /// the CSV names.
    pub fn baseline(
        &self,
        columns: &[String],
        names: &[String],
        limit: usize,
    ) -> Result<Vec<Record>, DatasetError> {
        if !names.is_empty() && names.len() != columns.len() {
            return Err(DatasetError::RenameMismatch {
                columns: columns.len(),
                names: names.len(),
            });
        }

        let indices = columns
            .iter()
            .map(|c| {
                self.headers
                    .iter()
                    .position(|h| h == c)
                    .ok_or_else(|| DatasetError::MissingColumn(c.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        let keys = if names.is_empty() { columns } else { names };

        Ok(self
            .rows
            .iter()
            .take(limit)
            .map(|row| {
                keys.iter()
                    .zip(&indices)
                    .map(|(key, &i)| (key.clone(), parse_cell(row.get(i).unwrap_or(""))))
                    .collect()
            })
            .collect())
    }
}

/// Integers and floats become JSON numbers, empty cells null, anything else a string
fn parse_cell(cell: &str) -> Value {
    let cell = cell.trim();
    if cell.is_empty() {
        return Value::Null;
    }
    if let Ok(i) = cell.parse::<i64>() {
        return Value::from(i);
    }
    match cell.parse::<f64>() {
        Ok(f) if f.is_finite() => Value::from(f),
        _ => Value::String(cell.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const SACHS: &str = "raf,mek,p38,jnk\n26.4,13.2,35.9,5.4\n35.9,16.5,12.3,-\n59.4,44.1,17.9,7\n";

    fn names(xs: &[&str]) -> Vec<String> {
        xs.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{SACHS}").unwrap();

        let table = ObservedTable::from_csv(file.path()).unwrap();
        assert_eq!(table.headers(), names(&["raf", "mek", "p38", "jnk"]).as_slice());
        assert_eq!(table.len(), 3);
    }

    #[test]
    fn test_missing_file() {
        assert!(ObservedTable::from_csv(Path::new("/nonexistent/sachs.csv")).is_err());
    }

    #[test]
    fn test_baseline_select_rename_limit() {
        let table = ObservedTable::from_reader(SACHS.as_bytes()).unwrap();
        let rows = table
            .baseline(
                &names(&["p38", "jnk"]),
                &names(&["p38 MAPK", "c-Jun N-terminal kinase"]),
                2,
            )
            .unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(
            serde_json::to_value(&rows[0]).unwrap(),
            json!({"p38 MAPK": 35.9, "c-Jun N-terminal kinase": 5.4})
        );
        assert_eq!(rows[1].get("c-Jun N-terminal kinase"), Some(&json!("-")));
    }

    #[test]
    fn test_baseline_keeps_names_and_parses_ints() {
        let table = ObservedTable::from_reader(SACHS.as_bytes()).unwrap();
        let rows = table.baseline(&names(&["jnk"]), &[], 10).unwrap();

        assert_eq!(rows.len(), 3);
        assert_eq!(rows[2].get("jnk"), Some(&json!(7)));
    }

    #[test]
    fn test_baseline_errors() {
        let table = ObservedTable::from_reader(SACHS.as_bytes()).unwrap();

        assert_eq!(
            table.baseline(&names(&["erk"]), &[], 1).unwrap_err(),
            DatasetError::MissingColumn("erk".to_string())
        );
        assert_eq!(
            table
                .baseline(&names(&["p38", "jnk"]), &names(&["only-one"]), 1)
                .unwrap_err(),
            DatasetError::RenameMismatch {
                columns: 2,
                names: 1
            }
        );
    }
}
