//! Drawing concrete confounder values from declared distributions
//!
//! A parameterized record stores the confounder as a parameter mapping
//! (e.g. `{"mean": 0, "std": 1}`) next to a `<confounder>分布类型` key naming
//! the family. [`sample_from_distribution`] turns that pair into one draw:
//!
//! - **Normal**: `mean`/`mu`, `std`/`sigma`
//! - **Bernoulli**: `p`
//! - **Uniform**: `low`, `high`
//! - **Categorical**: `categories`, `probabilities`
//!
//! Records without a distribution-type key pass through unchanged.

pub mod distribution;
pub mod family;

pub use distribution::ConfounderDistribution;
pub use family::{DistributionFamily, FamilyMatch};

use crate::config::FinalizeConfig;
use crate::model::{ConfounderState, Record};
use rand::Rng;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use thiserror::Error;

/// Reasons a declared distribution cannot produce a value
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ResolveError {
    /// No supported family matched the declared text
    #[error("unknown distribution type '{0}'")]
    UnknownFamily(String),

    /// The distribution-type value is not a string
    #[error("distribution type is not text: {0}")]
    FamilyNotText(Value),

    /// A distribution-type key sits next to a value that is not a parameter mapping
    #[error("parameters are not a mapping: {0}")]
    ParametersNotAMapping(Value),

    /// A parameter mapping without any distribution-type key
    #[error("parameter mapping has no distribution type")]
    MissingDistributionType,

    /// A parameter is present but not numeric
    #[error("parameter '{name}' is not numeric: {value}")]
    InvalidParameter {
        /// Parameter name
        name: &'static str,
        /// Offending value
        value: Value,
    },

    /// A parameter is infinite or NaN
    #[error("parameter '{name}' is not finite: {value}")]
    NonFiniteParameter {
        /// Parameter name
        name: &'static str,
        /// Offending value
        value: f64,
    },

    /// Bernoulli success probability outside [0, 1]
    #[error("probability {0} is outside [0, 1]")]
    ProbabilityOutOfRange(f64),

    /// Categories or probabilities missing, empty or of different lengths
    #[error("categorical parameters incomplete or mismatched ({categories} categories, {probabilities} probabilities)")]
    IncompleteCategorical {
        /// Number of categories found
        categories: usize,
        /// Number of probabilities found
        probabilities: usize,
    },

    /// Probabilities that cannot be used as weights
    #[error("invalid probabilities: {0}")]
    InvalidProbabilities(String),

    /// Probabilities off from 1 under the strict policy
    #[error("probabilities sum to {sum}, not 1 (tolerance {tolerance})")]
    ProbabilitySum {
        /// Actual sum
        sum: f64,
        /// Configured tolerance
        tolerance: f64,
    },

    /// A category label that is not a scalar
    #[error("category {0} is not a scalar label")]
    NonScalarCategory(Value),

    /// A draw overflowed to infinity or NaN
    #[error("draw is not finite: {0}")]
    NonFiniteDraw(f64),

    /// The drawn value is a mapping or list rather than a scalar
    #[error("drawn value is not a scalar: {0}")]
    NonScalarDraw(Value),

    /// The sampling backend rejected the parameters
    #[error("invalid distribution: {0}")]
    Distribution(String),
}

/// A lenient fix applied before drawing
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Correction {
    /// Negative standard deviation replaced by its absolute value
    NegativeStd {
        /// Value as declared
        original: f64,
    },
    /// Uniform bounds given in reverse order
    UniformBoundsSwapped {
        /// Declared low
        low: f64,
        /// Declared high
        high: f64,
    },
    /// Categorical probabilities rescaled to sum to one
    ProbabilitiesNormalized {
        /// Declared sum
        sum: f64,
    },
}

impl fmt::Display for Correction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NegativeStd { original } => {
                write!(f, "negative std ({original}) replaced by its absolute value")
            }
            Self::UniformBoundsSwapped { low, high } => {
                write!(f, "uniform bounds swapped (low {low} > high {high})")
            }
            Self::ProbabilitiesNormalized { sum } => {
                write!(f, "categorical probabilities summing to {sum} normalized")
            }
        }
    }
}

/// Outcome of resolving one confounder cell
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// Nothing to draw; carries the value already present, if any
    AlreadyResolved(Option<Value>),

    /// A fresh draw
    Drawn {
        /// The drawn value
        value: Value,
        /// Family the value was drawn from
        family: DistributionFamily,
        /// Lenient fixes applied to the parameters
        corrections: Vec<Correction>,
    },

    /// The declared distribution could not produce a value
    Unresolved {
        /// Declared family text, if any
        family: Option<String>,
        /// Why resolution failed
        error: ResolveError,
    },
}

impl Resolution {
    /// The value the confounder should hold after resolution
    pub fn value(&self) -> Option<&Value> {
        match self {
            Self::AlreadyResolved(value) => value.as_ref(),
            Self::Drawn { value, .. } => Some(value),
            Self::Unresolved { .. } => None,
        }
    }
}

fn family_text(family: &Value) -> String {
    match family {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Resolve the confounder of one record into a single draw
///
/// Returns [`Resolution::AlreadyResolved`] when the record has no
/// distribution-type key or no confounder key, so resolving a finalized
/// record is a no-op.
pub fn sample_from_distribution<R: Rng + ?Sized>(
    record: &Record,
    confounder: &str,
    config: &FinalizeConfig,
    rng: &mut R,
) -> Resolution {
    let (params, family) = match ConfounderState::of(record, confounder) {
        ConfounderState::Missing => return Resolution::AlreadyResolved(None),
        ConfounderState::Concrete(value) => return Resolution::AlreadyResolved(Some(value.clone())),
        ConfounderState::Inconsistent { value, family } => {
            return Resolution::Unresolved {
                family: Some(family_text(family)),
                error: ResolveError::ParametersNotAMapping(value.clone()),
            }
        }
        ConfounderState::Parameterized { params, family } => (params, family),
    };

    let Some(text) = family.as_str() else {
        return Resolution::Unresolved {
            family: Some(family_text(family)),
            error: ResolveError::FamilyNotText(family.clone()),
        };
    };

    let Some(matched) = DistributionFamily::recognize(text, config.strict_families) else {
        return Resolution::Unresolved {
            family: Some(text.to_string()),
            error: ResolveError::UnknownFamily(text.to_string()),
        };
    };

    let family = matched.family();
    match ConfounderDistribution::from_params(family, params, config) {
        Ok((distribution, corrections)) => match distribution.sample(rng) {
            Ok(value) => Resolution::Drawn {
                value,
                family,
                corrections,
            },
            Err(error) => Resolution::Unresolved {
                family: Some(text.to_string()),
                error,
            },
        },
        Err(error) => Resolution::Unresolved {
            family: Some(text.to_string()),
            error,
        },
    }
}
