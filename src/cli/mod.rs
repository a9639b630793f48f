//! CLI argument parsing and command handling

use crate::config::{FinalizeConfig, GenerationConfig, ProbabilityPolicy};
use crate::dataset::ObservedTable;
use crate::encode::{EncodeOptions, EncodedMatrix};
use crate::finalize::{FinalizeReport, Finalizer};
use crate::model::{HypothesisRecord, SyntheticRun};
use crate::network::sample_hypotheses;
use crate::output::{CsvExporter, JsonExporter};
use crate::pipeline::{BaselineSource, DataPipeline, HypothesisPipeline};
use crate::prompts::PromptStyle;
use crate::providers::openai::OpenAIProvider;
use crate::report::HypothesisSummary;
use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::{Path, PathBuf};

/// Confounder Synth - synthetic data for latent-confounder hypotheses
#[derive(Parser, Debug)]
#[command(name = "confounder-synth")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Replace per-record distribution parameters with drawn values
    Finalize(FinalizeArgs),
    /// Ask a model for latent-confounder hypotheses
    Hypothesize(HypothesizeArgs),
    /// Ask a model for synthetic data runs, one call per hypothesis
    Generate(GenerateArgs),
    /// Encode finalized runs as numeric CSV matrices
    Encode(EncodeArgs),
    /// Forward-sample fork networks from prior-probability hypotheses
    Network(NetworkArgs),
    /// Summarize a hypothesis file
    Report(ReportArgs),
}

/// Connection settings for an OpenAI-compatible endpoint
#[derive(Args, Debug)]
pub struct ProviderArgs {
    /// API key for the provider
    #[arg(short = 'k', long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub api_key: String,

    /// Base URL for the API
    #[arg(short, long, env = "OPENAI_BASE_URL", default_value = "https://api.openai.com/v1")]
    pub base_url: String,

    /// Model name
    #[arg(short, long, default_value = "glm-4.5")]
    pub model: String,

    /// Temperature for sampling (0.0-2.0)
    #[arg(long)]
    pub temperature: Option<f32>,

    /// Custom User-Agent header
    #[arg(long)]
    pub user_agent: Option<String>,
}

impl ProviderArgs {
    fn provider(&self) -> OpenAIProvider {
        let provider = OpenAIProvider::new(self.api_key.clone(), self.base_url.clone());
        match &self.user_agent {
            Some(ua) => provider.with_user_agent(ua.as_str()),
            None => provider,
        }
    }

    fn generation_config(&self) -> GenerationConfig {
        let config = GenerationConfig::new(self.model.as_str());
        match self.temperature {
            Some(t) => config.with_temperature(t),
            None => config,
        }
    }
}

#[derive(Args, Debug)]
pub struct FinalizeArgs {
    /// JSON file of synthetic data runs
    pub input: PathBuf,

    /// Where to write the finalized runs
    pub output: PathBuf,

    /// JSON file with finalizer settings (flags below override it)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Seed for reproducible draws
    #[arg(long)]
    pub seed: Option<u64>,

    /// Categorical probability policy (strict or normalize)
    #[arg(long)]
    pub policy: Option<ProbabilityPolicy>,

    /// Allowed deviation of categorical probabilities from a sum of one
    #[arg(long)]
    pub tolerance: Option<f64>,

    /// Only accept canonical family names, no keyword matching
    #[arg(long)]
    pub strict_families: bool,

    /// Also write the diagnostics report as JSON
    #[arg(long)]
    pub report: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct HypothesizeArgs {
    #[command(flatten)]
    pub provider: ProviderArgs,

    /// Observed variables (at least two)
    #[arg(long = "variable", required = true, num_args = 1..)]
    pub variables: Vec<String>,

    /// Background sentence placed before the variables
    #[arg(long, default_value = "Consider the observed variables")]
    pub background: String,

    /// What to ask for per confounder
    #[arg(long, value_enum, default_value_t = PromptStyle::Distribution)]
    pub style: PromptStyle,

    /// Number of hypothesis calls
    #[arg(short, long, default_value = "1")]
    pub num_runs: usize,

    /// Where to write the collected hypotheses
    #[arg(short, long, default_value = "hypotheses.json")]
    pub output: PathBuf,
}

#[derive(Args, Debug)]
pub struct GenerateArgs {
    #[command(flatten)]
    pub provider: ProviderArgs,

    /// JSON file of hypotheses
    pub hypotheses: PathBuf,

    /// CSV file with observed data
    pub dataset: PathBuf,

    /// CSV columns to use, in the order of the hypothesis variables
    #[arg(long, required = true, value_delimiter = ',')]
    pub columns: Vec<String>,

    /// Number of baseline rows per prompt
    #[arg(long, default_value = "100")]
    pub rows: usize,

    /// Where to write the generated runs
    #[arg(short, long, default_value = "synthetic_data.json")]
    pub output: PathBuf,
}

#[derive(Args, Debug)]
pub struct EncodeArgs {
    /// JSON file of finalized runs
    pub input: PathBuf,

    /// Directory for the per-run CSV files
    #[arg(long, default_value = "encoded")]
    pub output_dir: PathBuf,

    /// Z-score standardize every column
    #[arg(long)]
    pub standardize: bool,
}

#[derive(Args, Debug)]
pub struct NetworkArgs {
    /// JSON file of prior-probability hypotheses
    pub hypotheses: PathBuf,

    /// Rows to sample per confounder
    #[arg(long, default_value = "1000")]
    pub size: usize,

    /// Seed for reproducible sampling
    #[arg(long)]
    pub seed: Option<u64>,

    /// Directory for the per-confounder CSV files
    #[arg(long, default_value = "network_data")]
    pub output_dir: PathBuf,
}

#[derive(Args, Debug)]
pub struct ReportArgs {
    /// JSON file of hypotheses
    pub hypotheses: PathBuf,

    /// Export the summary to JSON
    #[arg(long)]
    pub json: Option<PathBuf>,

    /// Export per-confounder tallies to CSV
    #[arg(long)]
    pub csv: Option<PathBuf>,
}

impl Cli {
    /// Run the selected command
    pub async fn run(&self) -> Result<()> {
        match &self.command {
            Command::Finalize(args) => args.run(),
            Command::Hypothesize(args) => args.run().await,
            Command::Generate(args) => args.run().await,
            Command::Encode(args) => args.run(),
            Command::Network(args) => args.run(),
            Command::Report(args) => args.run(),
        }
    }
}

fn print_banner(title: &str) {
    println!("\n{}", "=".repeat(70));
    println!("   {title}");
    println!("{}", "=".repeat(70));
    println!();
}

fn ensure_input(path: &Path) -> Result<()> {
    if !path.is_file() {
        anyhow::bail!("Input file not found: {}", path.display());
    }
    Ok(())
}

/// Fails when the file's parent directory does not exist
fn ensure_output_parent(path: &Path) -> Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() && !parent.is_dir() => {
            anyhow::bail!("Output directory does not exist: {}", parent.display())
        }
        _ => Ok(()),
    }
}

fn ensure_output_dir(dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create output directory: {}", dir.display()))
}

fn load_hypotheses(path: &Path) -> Result<Vec<HypothesisRecord>> {
    ensure_input(path)?;
    JsonExporter::load(path)
        .with_context(|| format!("Failed to read hypotheses from: {}", path.display()))
}

impl FinalizeArgs {
    fn build_config(&self) -> Result<FinalizeConfig> {
        let mut config = match &self.config {
            Some(path) => FinalizeConfig::from_file(path)
                .with_context(|| format!("Failed to load config from: {}", path.display()))?,
            None => FinalizeConfig::default(),
        };
        if let Some(seed) = self.seed {
            config = config.with_seed(seed);
        }
        if let Some(policy) = self.policy {
            config = config.with_probability_policy(policy);
        }
        if let Some(tolerance) = self.tolerance {
            config = config.with_probability_tolerance(tolerance);
        }
        if self.strict_families {
            config = config.with_strict_families(true);
        }
        config.validate()?;
        Ok(config)
    }

    fn run(&self) -> Result<()> {
        ensure_input(&self.input)?;
        ensure_output_parent(&self.output)?;
        if let Some(report) = &self.report {
            ensure_output_parent(report)?;
        }
        let config = self.build_config()?;

        print_banner("Confounder Synth - Finalize");
        println!("Configuration:");
        println!("  Input:           {}", self.input.display());
        println!("  Output:          {}", self.output.display());
        println!("  Policy:          {:?}", config.probability_policy);
        println!("  Tolerance:       {}", config.probability_tolerance);
        println!("  Strict families: {}", config.strict_families);
        match config.seed {
            Some(seed) => println!("  Seed:            {seed}"),
            None => println!("  Seed:            (entropy)"),
        }
        println!("{}", "=".repeat(70));
        println!();

        let runs: Vec<SyntheticRun> = JsonExporter::load(&self.input)
            .with_context(|| format!("Failed to read runs from: {}", self.input.display()))?;
        tracing::info!("Loaded {} runs", runs.len());

        let outcome = Finalizer::new(config).finalize(&runs);

        JsonExporter::export(&outcome.runs, &self.output)
            .with_context(|| format!("Failed to export JSON to: {}", self.output.display()))?;
        println!("✓ Finalized data written to: {}", self.output.display());

        if let Some(path) = &self.report {
            JsonExporter::export_report(&outcome.report, path)
                .with_context(|| format!("Failed to export report to: {}", path.display()))?;
            println!("✓ Diagnostics written to: {}", path.display());
        }

        println!();
        print_finalize_summary(&outcome.report);
        Ok(())
    }
}

fn print_finalize_summary(report: &FinalizeReport) {
    println!("{}", "=".repeat(70));
    println!("   Finalization Summary");
    println!("{}", "=".repeat(70));
    println!();
    println!("  Runs processed:       {}", report.runs_processed);
    println!("  Runs skipped:         {}", report.runs_skipped);
    println!("  Records resolved:     {}", report.records_resolved);
    println!("  Passed through:       {}", report.records_passed_through);
    println!("  Unresolved:           {}", report.records_unresolved);
    println!("  Corrections:          {}", report.correction_count());
    println!();
    if !report.is_clean() {
        println!("  Unresolved records:");
        for diagnostic in report
            .diagnostics
            .iter()
            .filter(|d| matches!(d.kind, crate::finalize::DiagnosticKind::Unresolved { .. }))
        {
            println!("    {diagnostic}");
        }
        println!();
    }
    println!("{}", "=".repeat(70));
    println!();
}

impl HypothesizeArgs {
    async fn run(&self) -> Result<()> {
        ensure_output_parent(&self.output)?;
        let config = self
            .provider
            .generation_config()
            .with_num_runs(self.num_runs);
        config.validate()?;

        print_banner("Confounder Synth - Hypotheses");
        println!("Configuration:");
        println!("  Model:        {}", config.model);
        println!("  Variables:    {}", self.variables.join(", "));
        println!("  Style:        {:?}", self.style);
        println!("  Runs:         {}", config.num_runs);
        println!("{}", "=".repeat(70));
        println!();

        let provider = self.provider.provider();
        let records = HypothesisPipeline::new(&provider, config)
            .run(&self.variables, &self.background, self.style)
            .await?;

        println!();
        if records.is_empty() {
            tracing::warn!("No hypotheses collected; nothing written");
            return Ok(());
        }

        JsonExporter::export(&records, &self.output)
            .with_context(|| format!("Failed to export JSON to: {}", self.output.display()))?;
        println!("✓ {} hypotheses written to: {}", records.len(), self.output.display());
        Ok(())
    }
}

impl GenerateArgs {
    async fn run(&self) -> Result<()> {
        ensure_input(&self.dataset)?;
        ensure_output_parent(&self.output)?;
        let hypotheses = load_hypotheses(&self.hypotheses)?;
        let table = ObservedTable::from_csv(&self.dataset)
            .with_context(|| format!("Failed to load dataset from: {}", self.dataset.display()))?;
        tracing::info!("Loaded {} hypotheses and {} observed rows", hypotheses.len(), table.len());

        let config = self.provider.generation_config().with_baseline_rows(self.rows);
        config.validate()?;

        print_banner("Confounder Synth - Data Generation");
        println!("Configuration:");
        println!("  Model:        {}", config.model);
        println!("  Hypotheses:   {}", hypotheses.len());
        println!("  Columns:      {}", self.columns.join(", "));
        println!("  Rows/prompt:  {}", config.baseline_rows);
        println!("{}", "=".repeat(70));
        println!();

        let provider = self.provider.provider();
        let baseline = BaselineSource {
            table: &table,
            columns: self.columns.clone(),
        };
        let runs = DataPipeline::new(&provider, config)
            .run(&hypotheses, &baseline)
            .await?;

        println!();
        JsonExporter::export(&runs, &self.output)
            .with_context(|| format!("Failed to export JSON to: {}", self.output.display()))?;
        println!("✓ {} runs written to: {}", runs.len(), self.output.display());
        Ok(())
    }
}

impl EncodeArgs {
    fn run(&self) -> Result<()> {
        ensure_input(&self.input)?;
        let runs: Vec<SyntheticRun> = JsonExporter::load(&self.input)
            .with_context(|| format!("Failed to read runs from: {}", self.input.display()))?;
        ensure_output_dir(&self.output_dir)?;

        let options = EncodeOptions {
            standardize: self.standardize,
            ..Default::default()
        };

        let mut written = 0;
        for (i, run) in runs.iter().enumerate() {
            let confounder = run.primary_confounder().unwrap_or("none");
            match EncodedMatrix::from_run(run, &options) {
                Ok(matrix) => {
                    let path = self
                        .output_dir
                        .join(format!("run_{}_{}.csv", i + 1, confounder));
                    CsvExporter::export_matrix(&matrix, &path)
                        .with_context(|| format!("Failed to export CSV to: {}", path.display()))?;
                    tracing::debug!("Encoded run {} ({} rows) to {}", i + 1, matrix.len(), path.display());
                    written += 1;
                }
                Err(e) => tracing::error!("Skipping run {} ({}): {}", i + 1, confounder, e),
            }
        }

        println!("✓ {written}/{} runs encoded to: {}", runs.len(), self.output_dir.display());
        Ok(())
    }
}

impl NetworkArgs {
    fn run(&self) -> Result<()> {
        if self.size == 0 {
            anyhow::bail!("Sample size must be at least 1");
        }
        let hypotheses = load_hypotheses(&self.hypotheses)?;
        ensure_output_dir(&self.output_dir)?;

        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let samples = sample_hypotheses(&hypotheses, self.size, &mut rng);

        for sample in &samples {
            let path = self.output_dir.join(sample.file_name());
            CsvExporter::export_rows(&sample.columns, &sample.rows, &path)
                .with_context(|| format!("Failed to export CSV to: {}", path.display()))?;
            println!("✓ {} rows for '{}': {}", sample.rows.len(), sample.confounder, path.display());
        }

        if samples.is_empty() {
            tracing::warn!("No valid fork networks found in {}", self.hypotheses.display());
        }
        Ok(())
    }
}

impl ReportArgs {
    fn run(&self) -> Result<()> {
        let hypotheses = load_hypotheses(&self.hypotheses)?;
        let summary = HypothesisSummary::from_records(&hypotheses);

        println!();
        summary.print();

        if let Some(path) = &self.json {
            JsonExporter::export(&summary, path)
                .with_context(|| format!("Failed to export JSON to: {}", path.display()))?;
            println!("✓ JSON exported to: {}", path.display());
        }
        if let Some(path) = &self.csv {
            CsvExporter::export_summary(&summary, path)
                .with_context(|| format!("Failed to export CSV to: {}", path.display()))?;
            println!("✓ CSV exported to: {}", path.display());
        }
        Ok(())
    }
}
