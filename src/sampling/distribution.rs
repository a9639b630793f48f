//! Parameter extraction and single draws for each distribution family

use super::family::DistributionFamily;
use super::{Correction, ResolveError};
use crate::config::{FinalizeConfig, ProbabilityPolicy};
use rand::distributions::{Bernoulli, WeightedIndex};
use rand::Rng;
use rand_distr::{Distribution, Normal, Uniform};
use serde_json::{Map, Value};

/// A distribution with validated parameters, ready to draw from
#[derive(Debug, Clone)]
pub enum ConfounderDistribution {
    /// Normal distribution
    Normal(Normal<f64>),
    /// One Bernoulli trial
    Bernoulli(Bernoulli),
    /// Uniform on [low, high)
    Uniform(Uniform<f64>),
    /// Degenerate uniform where low == high
    Constant(f64),
    /// Weighted choice among labels
    Categorical {
        /// Category labels, as given upstream
        categories: Vec<Value>,
        /// Index sampler over the weights
        index: WeightedIndex<f64>,
    },
}

/// Read a numeric parameter under the first present alias, else `default`
///
/// Numbers and numeric strings are accepted; any other present value is an error.
fn param_f64(
    params: &Map<String, Value>,
    aliases: &[&'static str],
    default: f64,
) -> Result<f64, ResolveError> {
    let Some((name, value)) = aliases
        .iter()
        .find_map(|&alias| params.get(alias).map(|v| (alias, v)))
    else {
        return Ok(default);
    };

    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .ok_or_else(|| ResolveError::InvalidParameter {
        name,
        value: value.clone(),
    })?;

    if !number.is_finite() {
        return Err(ResolveError::NonFiniteParameter { name, value: number });
    }
    Ok(number)
}

impl ConfounderDistribution {
    /// Build a distribution from a record's parameter mapping
    ///
    /// Lenient fixes (negative std, swapped uniform bounds, normalized
    /// probabilities) are applied and reported as corrections.
    pub fn from_params(
        family: DistributionFamily,
        params: &Map<String, Value>,
        config: &FinalizeConfig,
    ) -> Result<(Self, Vec<Correction>), ResolveError> {
        let mut corrections = Vec::new();

        let distribution = match family {
            DistributionFamily::Normal => {
                let mean = param_f64(params, &["mean", "mu"], 0.0)?;
                let mut std = param_f64(params, &["std", "sigma"], 1.0)?;
                if std < 0.0 {
                    corrections.push(Correction::NegativeStd { original: std });
                    std = std.abs();
                }
                let normal = Normal::new(mean, std)
                    .map_err(|e| ResolveError::Distribution(e.to_string()))?;
                Self::Normal(normal)
            }
            DistributionFamily::Bernoulli => {
                let p = param_f64(params, &["p"], 0.5)?;
                let bernoulli =
                    Bernoulli::new(p).map_err(|_| ResolveError::ProbabilityOutOfRange(p))?;
                Self::Bernoulli(bernoulli)
            }
            DistributionFamily::Uniform => {
                let mut low = param_f64(params, &["low"], 0.0)?;
                let mut high = param_f64(params, &["high"], 1.0)?;
                if low > high {
                    corrections.push(Correction::UniformBoundsSwapped { low, high });
                    std::mem::swap(&mut low, &mut high);
                }
                if low == high {
                    Self::Constant(low)
                } else if (high - low).is_finite() {
                    Self::Uniform(Uniform::new(low, high))
                } else {
                    return Err(ResolveError::Distribution(format!(
                        "uniform range [{low}, {high}) is too wide"
                    )));
                }
            }
            DistributionFamily::Categorical => {
                Self::categorical(params, config, &mut corrections)?
            }
        };

        Ok((distribution, corrections))
    }

    fn categorical(
        params: &Map<String, Value>,
        config: &FinalizeConfig,
        corrections: &mut Vec<Correction>,
    ) -> Result<Self, ResolveError> {
        let categories = params
            .get("categories")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        let raw_probabilities = params
            .get("probabilities")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        if categories.is_empty()
            || raw_probabilities.is_empty()
            || categories.len() != raw_probabilities.len()
        {
            return Err(ResolveError::IncompleteCategorical {
                categories: categories.len(),
                probabilities: raw_probabilities.len(),
            });
        }

        if let Some(label) = categories
            .iter()
            .find(|c| c.is_object() || c.is_array())
        {
            return Err(ResolveError::NonScalarCategory(label.clone()));
        }

        let mut probabilities = Vec::with_capacity(raw_probabilities.len());
        for value in &raw_probabilities {
            let p = match value {
                Value::Number(n) => n.as_f64(),
                Value::String(s) => s.trim().parse::<f64>().ok(),
                _ => None,
            }
            .ok_or_else(|| ResolveError::InvalidParameter {
                name: "probabilities",
                value: value.clone(),
            })?;
            if !p.is_finite() || p < 0.0 {
                return Err(ResolveError::InvalidProbabilities(format!(
                    "probability {p} is negative or not finite"
                )));
            }
            probabilities.push(p);
        }

        let sum: f64 = probabilities.iter().sum();
        if (sum - 1.0).abs() > config.probability_tolerance {
            match config.probability_policy {
                ProbabilityPolicy::Strict => {
                    return Err(ResolveError::ProbabilitySum {
                        sum,
                        tolerance: config.probability_tolerance,
                    });
                }
                ProbabilityPolicy::Normalize => {
                    corrections.push(Correction::ProbabilitiesNormalized { sum });
                }
            }
        }

        // WeightedIndex divides by the total, so normalization is implicit
        let index = WeightedIndex::new(&probabilities)
            .map_err(|e| ResolveError::InvalidProbabilities(e.to_string()))?;

        Ok(Self::Categorical { categories, index })
    }

    /// Draw one value
    ///
    /// Normal and uniform draws are JSON floats, Bernoulli draws are the
    /// integers 0 or 1, categorical draws are the chosen label. A float draw
    /// that overflows is an error, never a JSON null.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<Value, ResolveError> {
        match self {
            Self::Normal(normal) => finite_draw(normal.sample(rng)),
            Self::Bernoulli(bernoulli) => Ok(Value::from(u8::from(bernoulli.sample(rng)))),
            Self::Uniform(uniform) => finite_draw(uniform.sample(rng)),
            Self::Constant(value) => finite_draw(*value),
            Self::Categorical { categories, index } => Ok(categories[index.sample(rng)].clone()),
        }
    }
}

fn finite_draw(x: f64) -> Result<Value, ResolveError> {
    if x.is_finite() {
        Ok(Value::from(x))
    } else {
        Err(ResolveError::NonFiniteDraw(x))
    }
}
