//! Finalization and generation configuration types

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// How categorical probabilities that do not sum to one are handled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbabilityPolicy {
    /// Reject the distribution when the sum is off by more than the tolerance
    #[default]
    Strict,
    /// Rescale the probabilities and record a correction
    Normalize,
}

impl std::str::FromStr for ProbabilityPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "strict" => Ok(Self::Strict),
            "normalize" => Ok(Self::Normalize),
            other => Err(ConfigError::InvalidPolicy(other.to_string())),
        }
    }
}

/// Finalizer configuration
///
/// Controls how lenient the sampler is with upstream output: whether free-text
/// family names are matched by keyword, how categorical probability slack is
/// treated, and whether draws are seeded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FinalizeConfig {
    /// Policy for categorical probabilities that do not sum to one
    pub probability_policy: ProbabilityPolicy,

    /// Allowed absolute deviation of the probability sum from one
    pub probability_tolerance: f64,

    /// Only accept canonical family constants, no keyword matching
    pub strict_families: bool,

    /// Optional RNG seed for reproducible draws
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl Default for FinalizeConfig {
    fn default() -> Self {
        Self {
            probability_policy: ProbabilityPolicy::Strict,
            probability_tolerance: 1e-8,
            strict_families: false,
            seed: None,
        }
    }
}

impl FinalizeConfig {
    /// Load a config from a JSON file; missing fields take their defaults
    pub fn from_file(path: &Path) -> crate::Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Set the categorical probability policy
    pub fn with_probability_policy(mut self, policy: ProbabilityPolicy) -> Self {
        self.probability_policy = policy;
        self
    }

    /// Set the probability sum tolerance
    pub fn with_probability_tolerance(mut self, tolerance: f64) -> Self {
        self.probability_tolerance = tolerance;
        self
    }

    /// Disable keyword matching of family names
    pub fn with_strict_families(mut self, strict: bool) -> Self {
        self.strict_families = strict;
        self
    }

    /// Seed the random number generator
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.probability_tolerance.is_finite() || self.probability_tolerance < 0.0 {
            return Err(ConfigError::InvalidTolerance(self.probability_tolerance));
        }
        Ok(())
    }
}

/// Settings shared by the model-driven pipelines
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Model identifier sent to the provider
    pub model: String,

    /// Sampling temperature, if the provider default should be overridden
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    /// Number of hypothesis calls to make
    pub num_runs: usize,

    /// Number of baseline rows merged into each data prompt
    pub baseline_rows: usize,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            model: "glm-4.5".to_string(),
            temperature: None,
            num_runs: 1,
            baseline_rows: 100,
        }
    }
}

impl GenerationConfig {
    /// Create a config for the given model
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..Default::default()
        }
    }

    /// Set the temperature
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Set the number of hypothesis runs
    pub fn with_num_runs(mut self, num_runs: usize) -> Self {
        self.num_runs = num_runs;
        self
    }

    /// Set the baseline row limit
    pub fn with_baseline_rows(mut self, rows: usize) -> Self {
        self.baseline_rows = rows;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.model.trim().is_empty() {
            return Err(ConfigError::MissingField("model"));
        }
        if self.num_runs == 0 {
            return Err(ConfigError::InvalidCount {
                field: "num_runs",
                value: 0,
            });
        }
        if self.baseline_rows == 0 {
            return Err(ConfigError::InvalidCount {
                field: "baseline_rows",
                value: 0,
            });
        }
        if let Some(t) = self.temperature {
            if !(0.0..=2.0).contains(&t) {
                return Err(ConfigError::InvalidTemperature(t));
            }
        }
        Ok(())
    }
}

/// Configuration validation errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Unknown probability policy name
    #[error("Invalid probability policy: {0} (expected strict or normalize)")]
    InvalidPolicy(String),

    /// Tolerance is negative or not finite
    #[error("Invalid probability tolerance: {0}")]
    InvalidTolerance(f64),

    /// A count that must be positive was zero
    #[error("Invalid {field}: {value} (must be at least 1)")]
    InvalidCount {
        /// Offending field
        field: &'static str,
        /// Offending value
        value: usize,
    },

    /// Temperature outside 0.0-2.0
    #[error("Invalid temperature: {0} (expected 0.0-2.0)")]
    InvalidTemperature(f32),

    /// A required field is empty
    #[error("Missing required field: {0}")]
    MissingField(&'static str),
}
