//! Confounder Synth - synthetic data for latent-confounder hypotheses
//!
//! Language models propose hidden common causes for pairs of observed
//! variables and then describe, per individual, the distribution the
//! confounder's value is drawn from. This library turns that output into
//! concrete tabular data.
//!
//! # Architecture
//!
//! - **Providers**: HTTP clients for OpenAI-compatible chat APIs
//! - **Prompts / Pipeline**: hypothesis and data generation over a provider
//! - **Sampling**: distribution families and per-record draws
//! - **Finalize**: replaces parameter mappings with drawn values
//! - **Encode / Network**: numeric matrices and fork-network samples for causal discovery
//! - **Output / Report**: JSON and CSV exporters, hypothesis summaries
//!
//! # Example
//!
//! ```rust
//! use confounder_synth::{FinalizeConfig, Finalizer, SyntheticRun};
//! use serde_json::json;
//!
//! let runs: Vec<SyntheticRun> = serde_json::from_value(json!([{
//!     "variables": ["A", "B"],
//!     "confounder_variables": ["C"],
//!     "data": [{"A": "x", "B": "y", "C": {"mean": 0, "std": 1}, "C分布类型": "正态分布", "id": 1}]
//! }])).unwrap();
//!
//! let outcome = Finalizer::new(FinalizeConfig::default().with_seed(7)).finalize(&runs);
//! assert!(outcome.runs[0].data[0]["C"].is_f64());
//! assert!(outcome.report.is_clean());
//! ```

pub mod cli;
pub mod config;
pub mod dataset;
pub mod encode;
pub mod error;
pub mod finalize;
pub mod model;
pub mod network;
pub mod output;
pub mod pipeline;
pub mod prompts;
pub mod providers;
pub mod report;
pub mod response;
pub mod sampling;

// Re-export commonly used types
pub use config::{FinalizeConfig, GenerationConfig, ProbabilityPolicy};
pub use error::{Error, Result};
pub use finalize::{Diagnostic, FinalizeOutcome, FinalizeReport, Finalizer};
pub use model::{HypothesisRecord, SyntheticRun};
pub use output::{CsvExporter, JsonExporter};
pub use providers::Provider;
pub use sampling::{sample_from_distribution, DistributionFamily, Resolution};
