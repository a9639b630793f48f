//! Run finalization
//!
//! The finalizer walks every record of every run and replaces the primary
//! confounder's parameter mapping with one drawn value, dropping the
//! `<confounder>分布类型` key once the draw succeeds. It borrows its input and
//! returns new runs plus a [`FinalizeReport`]; failures never abort the batch,
//! they leave the record as it was and add a [`Diagnostic`].

use crate::config::FinalizeConfig;
use crate::model::{distribution_type_key, Record, SyntheticRun};
use crate::sampling::{sample_from_distribution, Correction, ResolveError, Resolution};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Serialize, Serializer};
use serde_json::Value;
use std::fmt;

/// Finalized runs together with what happened to them
#[derive(Debug, Clone)]
pub struct FinalizeOutcome {
    /// Transformed runs, same order as the input
    pub runs: Vec<SyntheticRun>,
    /// Counters and diagnostics
    pub report: FinalizeReport,
}

/// Counters and diagnostics collected during finalization
#[derive(Debug, Clone, Default, Serialize)]
pub struct FinalizeReport {
    /// Runs that named a confounder
    pub runs_processed: usize,
    /// Runs copied unchanged because they named no confounder
    pub runs_skipped: usize,
    /// Records that received a fresh draw
    pub records_resolved: usize,
    /// Records that were already final
    pub records_passed_through: usize,
    /// Records still holding a parameter mapping
    pub records_unresolved: usize,
    /// One entry per correction or failed substitution
    pub diagnostics: Vec<Diagnostic>,
}

impl FinalizeReport {
    /// Number of diagnostics that are failures rather than corrections
    pub fn failure_count(&self) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| matches!(d.kind, DiagnosticKind::Unresolved { .. }))
            .count()
    }

    /// Number of corrections applied before drawing
    pub fn correction_count(&self) -> usize {
        self.diagnostics.len() - self.failure_count()
    }

    /// Whether every record ended up with a concrete value
    pub fn is_clean(&self) -> bool {
        self.records_unresolved == 0
    }
}

/// A note about one record
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    /// Zero-based run index
    pub run: usize,
    /// Zero-based record index within the run
    pub record: usize,
    /// Confounder being resolved
    pub confounder: String,
    /// What happened
    pub kind: DiagnosticKind,
}

/// Diagnostic payload
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// Parameters were fixed up before drawing
    Corrected {
        /// The fix applied
        correction: Correction,
    },
    /// The record still holds its parameter mapping
    Unresolved {
        /// Declared family, if the record had one
        family: Option<String>,
        /// Why substitution failed
        #[serde(serialize_with = "serialize_display")]
        error: ResolveError,
        /// The original parameter mapping
        params: Value,
    },
}

fn serialize_display<T: fmt::Display, S: Serializer>(value: &T, s: S) -> Result<S::Ok, S::Error> {
    s.collect_str(value)
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "run {} record {} ({}): ",
            self.run + 1,
            self.record + 1,
            self.confounder
        )?;
        match &self.kind {
            DiagnosticKind::Corrected { correction } => write!(f, "{correction}"),
            DiagnosticKind::Unresolved {
                family,
                error,
                params,
            } => write!(
                f,
                "substitution failed: {error} [type: {}, params: {params}]",
                family.as_deref().unwrap_or("not found")
            ),
        }
    }
}

/// Sequential finalizer over synthetic data runs
#[derive(Debug, Clone, Default)]
pub struct Finalizer {
    config: FinalizeConfig,
}

impl Finalizer {
    /// Create a finalizer with the given configuration
    pub fn new(config: FinalizeConfig) -> Self {
        Self { config }
    }

    /// The active configuration
    pub fn config(&self) -> &FinalizeConfig {
        &self.config
    }

    /// RNG for one finalization pass: seeded if configured, else from entropy
    pub fn make_rng(&self) -> StdRng {
        match self.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }

    /// Finalize runs with an RNG built from the configuration
    pub fn finalize(&self, runs: &[SyntheticRun]) -> FinalizeOutcome {
        let mut rng = self.make_rng();
        self.finalize_with_rng(runs, &mut rng)
    }

    /// Finalize runs drawing from `rng`
    pub fn finalize_with_rng<R: Rng + ?Sized>(
        &self,
        runs: &[SyntheticRun],
        rng: &mut R,
    ) -> FinalizeOutcome {
        let mut report = FinalizeReport::default();
        let runs = runs
            .iter()
            .enumerate()
            .map(|(index, run)| self.finalize_run(index, run, rng, &mut report))
            .collect();

        FinalizeOutcome { runs, report }
    }

    fn finalize_run<R: Rng + ?Sized>(
        &self,
        run_index: usize,
        run: &SyntheticRun,
        rng: &mut R,
        report: &mut FinalizeReport,
    ) -> SyntheticRun {
        let Some(confounder) = run.primary_confounder() else {
            tracing::debug!("Run {} names no confounder, copying unchanged", run_index + 1);
            report.runs_skipped += 1;
            return run.clone();
        };

        tracing::debug!(
            "Finalizing run {} ({} records, confounder '{}')",
            run_index + 1,
            run.data.len(),
            confounder
        );
        report.runs_processed += 1;

        let data = run
            .data
            .iter()
            .enumerate()
            .map(|(record_index, record)| {
                self.finalize_record(run_index, record_index, record, confounder, rng, report)
            })
            .collect();

        SyntheticRun {
            data,
            ..run.clone()
        }
    }

    fn finalize_record<R: Rng + ?Sized>(
        &self,
        run_index: usize,
        record_index: usize,
        record: &Record,
        confounder: &str,
        rng: &mut R,
        report: &mut FinalizeReport,
    ) -> Record {
        let diagnostic = |kind| Diagnostic {
            run: run_index,
            record: record_index,
            confounder: confounder.to_string(),
            kind,
        };

        match sample_from_distribution(record, confounder, &self.config, rng) {
            Resolution::AlreadyResolved(Some(params @ Value::Object(_))) => {
                let d = diagnostic(DiagnosticKind::Unresolved {
                    family: None,
                    error: ResolveError::MissingDistributionType,
                    params,
                });
                tracing::error!("{d}");
                report.diagnostics.push(d);
                report.records_unresolved += 1;
                record.clone()
            }
            Resolution::AlreadyResolved(_) => {
                report.records_passed_through += 1;
                record.clone()
            }
            Resolution::Drawn { value, family, .. } if value.is_object() || value.is_array() => {
                let d = diagnostic(DiagnosticKind::Unresolved {
                    family: Some(family.to_string()),
                    error: ResolveError::NonScalarDraw(value),
                    params: record.get(confounder).cloned().unwrap_or(Value::Null),
                });
                tracing::error!("{d}");
                report.diagnostics.push(d);
                report.records_unresolved += 1;
                record.clone()
            }
            Resolution::Drawn {
                value, corrections, ..
            } => {
                for correction in corrections {
                    let d = diagnostic(DiagnosticKind::Corrected { correction });
                    tracing::warn!("{d}");
                    report.diagnostics.push(d);
                }
                report.records_resolved += 1;
                substitute(record, confounder, value)
            }
            Resolution::Unresolved { family, error } => {
                let params = record.get(confounder).cloned().unwrap_or(Value::Null);
                let d = diagnostic(DiagnosticKind::Unresolved {
                    family,
                    error,
                    params,
                });
                tracing::error!("{d}");
                report.diagnostics.push(d);
                report.records_unresolved += 1;
                record.clone()
            }
        }
    }
}

/// Copy `record` with the confounder set to `value` and its distribution-type key dropped
fn substitute(record: &Record, confounder: &str, value: Value) -> Record {
    let type_key = distribution_type_key(confounder);
    let mut value = Some(value);
    record
        .iter()
        .filter(|(key, _)| **key != type_key)
        .map(|(key, v)| {
            if key == confounder {
                (key.clone(), value.take().unwrap_or(Value::Null))
            } else {
                (key.clone(), v.clone())
            }
        })
        .collect()
}

#[cfg(test)]
mod tests;
