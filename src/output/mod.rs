//! Reading inputs and writing results

pub mod csv_export;
pub mod json_export;

pub use csv_export::CsvExporter;
pub use json_export::JsonExporter;
