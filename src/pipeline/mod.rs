//! Model-driven pipelines
//!
//! Both pipelines call the provider sequentially, one unit at a time:
//! - `HypothesisPipeline` asks for latent-confounder hypotheses
//! - `DataPipeline` turns each hypothesis into synthetic data runs
//!
//! A failed call or an unparseable response is logged with the raw text and
//! that unit is skipped; the batch always continues.

use crate::config::GenerationConfig;
use crate::dataset::ObservedTable;
use crate::model::{HypothesisRecord, SyntheticRun};
use crate::prompts::{data_prompt, hypothesis_prompt, PromptStyle};
use crate::providers::{ChatRequest, Provider};
use crate::response::{parse_response, ResponseParseError};
use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, error, info, warn};

fn progress_bar(len: usize) -> ProgressBar {
    let pb = ProgressBar::new(len as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
    );
    pb
}

fn log_parse_failure(unit: &str, err: &ResponseParseError) {
    match err.raw() {
        Some(raw) => error!("{unit}: {err}\nraw response:\n{raw}"),
        None => error!("{unit}: {err}"),
    }
}

/// Collects confounder hypotheses for a pair of observed variables
pub struct HypothesisPipeline<'a, P: Provider + ?Sized> {
    provider: &'a P,
    config: GenerationConfig,
}

impl<'a, P: Provider + ?Sized> HypothesisPipeline<'a, P> {
    pub fn new(provider: &'a P, config: GenerationConfig) -> Self {
        Self { provider, config }
    }

    /// Run `num_runs` sequential calls and keep the records asserting a confounder
    ///
    /// Kept records get `id = call index + 1`.
    pub async fn run(
        &self,
        variables: &[String],
        background: &str,
        style: PromptStyle,
    ) -> Result<Vec<HypothesisRecord>> {
        self.config.validate()?;
        let prompt = hypothesis_prompt(variables, background, style)
            .context("Failed to build hypothesis prompt")?;
        debug!("hypothesis prompt:\n{prompt}");

        let num_runs = self.config.num_runs;
        let pb = progress_bar(num_runs);
        let mut records = Vec::new();

        for i in 0..num_runs {
            let unit = format!("hypothesis run {}/{}", i + 1, num_runs);
            let request = ChatRequest::user(&self.config.model, prompt.as_str())
                .with_temperature(self.config.temperature);

            match self.provider.complete(&request).await {
                Ok(completion) => match parse_response::<HypothesisRecord>(&completion.content) {
                    Ok(mut record) if record.is_confounder => {
                        record.id = Some(i as u64 + 1);
                        info!(
                            "{unit}: {} confounder(s) proposed",
                            record.confounder_variables.len()
                        );
                        records.push(record);
                    }
                    Ok(_) => info!("{unit}: no latent confounder asserted, skipping"),
                    Err(e) => log_parse_failure(&unit, &e),
                },
                Err(e) => error!("{unit}: {} request failed: {e}", self.provider.name()),
            }

            pb.inc(1);
        }

        pb.finish_with_message(format!("{} hypotheses collected", records.len()));
        Ok(records)
    }
}

/// Where baseline rows come from and how they are named
#[derive(Debug, Clone)]
pub struct BaselineSource<'t> {
    pub table: &'t ObservedTable,
    /// CSV columns to select, in the order of the hypothesis variables
    pub columns: Vec<String>,
}

/// Generates synthetic data runs from hypotheses
pub struct DataPipeline<'a, P: Provider + ?Sized> {
    provider: &'a P,
    config: GenerationConfig,
}

impl<'a, P: Provider + ?Sized> DataPipeline<'a, P> {
    pub fn new(provider: &'a P, config: GenerationConfig) -> Self {
        Self { provider, config }
    }

    /// Generate runs for every hypothesis and concatenate them
    ///
    /// Hypotheses without a confounder descriptor, with an empty response or
    /// with an unparseable response are skipped.
    pub async fn run(
        &self,
        hypotheses: &[HypothesisRecord],
        baseline: &BaselineSource<'_>,
    ) -> Result<Vec<SyntheticRun>> {
        self.config.validate()?;
        let pb = progress_bar(hypotheses.len());
        let mut runs = Vec::new();

        for (i, record) in hypotheses.iter().enumerate() {
            let unit = match record.id {
                Some(id) => format!("hypothesis {id}"),
                None => format!("hypothesis #{}", i + 1),
            };
            if let Some(generated) = self.generate_for(&unit, record, baseline).await {
                runs.extend(generated);
            }
            pb.inc(1);
        }

        pb.finish_with_message(format!("{} runs generated", runs.len()));
        Ok(runs)
    }

    /// One data call for one hypothesis; `None` when the unit is skipped
    async fn generate_for(
        &self,
        unit: &str,
        record: &HypothesisRecord,
        baseline: &BaselineSource<'_>,
    ) -> Option<Vec<SyntheticRun>> {
        let Some(descriptor) = record.probability.first() else {
            warn!("{unit}: no confounder descriptor, skipping");
            return None;
        };

        let names: &[String] = if record.variables.len() == baseline.columns.len() {
            record.variables.as_slice()
        } else {
            &[]
        };
        let rows = baseline
            .table
            .baseline(&baseline.columns, names, self.config.baseline_rows)
            .map_err(|e| error!("{unit}: cannot build baseline rows: {e}"))
            .ok()?;

        let prompt = data_prompt(&record.variables, descriptor, &rows)
            .map_err(|e| error!("{unit}: cannot build data prompt: {e}"))
            .ok()?;

        let request = ChatRequest::user(&self.config.model, prompt)
            .with_temperature(self.config.temperature);
        let completion = self
            .provider
            .complete(&request)
            .await
            .map_err(|e| error!("{unit}: {} request failed: {e}", self.provider.name()))
            .ok()?;

        match parse_response::<Vec<SyntheticRun>>(&completion.content) {
            Ok(generated) => {
                info!(
                    "{unit}: {} run(s) for confounder '{}'",
                    generated.len(),
                    descriptor.confounder
                );
                Some(generated)
            }
            Err(e) => {
                log_parse_failure(unit, &e);
                None
            }
        }
    }
}
