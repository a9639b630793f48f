//! CSV export functionality

use crate::encode::EncodedMatrix;
use crate::report::HypothesisSummary;
use crate::Result;
use csv::Writer;
use std::fs::File;
use std::path::Path;

pub struct CsvExporter;

impl CsvExporter {
    /// Export an encoded matrix with a header row of column names
    pub fn export_matrix(matrix: &EncodedMatrix, path: &Path) -> Result<()> {
        let file = File::create(path)?;
        let mut wtr = Writer::from_writer(file);

        wtr.write_record(&matrix.columns)?;
        for row in &matrix.rows {
            wtr.write_record(row.iter().map(|x| x.to_string()))?;
        }

        wtr.flush()?;
        Ok(())
    }

    /// Export string rows under the given header
    pub fn export_rows(columns: &[String], rows: &[Vec<String>], path: &Path) -> Result<()> {
        let file = File::create(path)?;
        let mut wtr = Writer::from_writer(file);

        wtr.write_record(columns)?;
        for row in rows {
            wtr.write_record(row)?;
        }

        wtr.flush()?;
        Ok(())
    }

    /// Export per-confounder tallies of a hypothesis summary
    pub fn export_summary(summary: &HypothesisSummary, path: &Path) -> Result<()> {
        let file = File::create(path)?;
        let mut wtr = Writer::from_writer(file);

        wtr.write_record(["confounder", "mentions", "top_ranked"])?;
        for (name, tally) in summary.ranked_confounders() {
            wtr.write_record([
                name.to_string(),
                tally.mentions.to_string(),
                tally.top_ranked.to_string(),
            ])?;
        }

        wtr.flush()?;
        Ok(())
    }
}
