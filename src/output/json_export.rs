//! JSON input and export

use crate::finalize::FinalizeReport;
use crate::Result;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

pub struct JsonExporter;

impl JsonExporter {
    /// Read a JSON file into `T`
    pub fn load<T: DeserializeOwned>(path: &Path) -> Result<T> {
        let file = File::open(path)?;
        Ok(serde_json::from_reader(BufReader::new(file))?)
    }

    /// Write `value` as pretty-printed UTF-8 JSON (non-ASCII kept as-is)
    pub fn export<T: Serialize + ?Sized>(value: &T, path: &Path) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(&mut writer, value)?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        Ok(())
    }

    /// Export a finalization report with a short summary block
    pub fn export_report(report: &FinalizeReport, path: &Path) -> Result<()> {
        let output = json!({
            "summary": {
                "runs_processed": report.runs_processed,
                "runs_skipped": report.runs_skipped,
                "records_resolved": report.records_resolved,
                "records_passed_through": report.records_passed_through,
                "records_unresolved": report.records_unresolved,
                "failures": report.failure_count(),
            },
            "diagnostics": report.diagnostics,
        });
        Self::export(&output, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SyntheticRun;
    use serde_json::Value;
    use tempfile::tempdir;

    #[test]
    fn test_export_then_load_keeps_unicode() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("final_data.json");
        let runs: Vec<SyntheticRun> = serde_json::from_value(json!([{
            "variables": ["吸烟", "咳嗽"],
            "confounder_variables": ["压力"],
            "data": [{"吸烟": 1, "咳嗽": 0, "压力": 0.7, "id": 1}]
        }]))
        .unwrap();

        JsonExporter::export(&runs, &path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("\"压力\": 0.7"));

        let loaded: Vec<SyntheticRun> = JsonExporter::load(&path).unwrap();
        assert_eq!(loaded, runs);
    }

    #[test]
    fn test_load_missing_file() {
        let result: Result<Value> = JsonExporter::load(Path::new("/nonexistent/data.json"));
        assert!(result.is_err());
    }

    #[test]
    fn test_export_report() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("report.json");
        let report = FinalizeReport {
            runs_processed: 1,
            records_resolved: 4,
            ..Default::default()
        };

        JsonExporter::export_report(&report, &path).unwrap();
        let value: Value = JsonExporter::load(&path).unwrap();
        assert_eq!(value["summary"]["records_resolved"], json!(4));
        assert_eq!(value["summary"]["failures"], json!(0));
        assert_eq!(value["diagnostics"], json!([]));
    }
}
