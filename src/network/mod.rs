//! Forward sampling from a confounder fork network
//!
//! A prior-probability hypothesis describes the smallest Bayesian network
//! with a latent common cause: a binary confounder with `P(True) = prior`
//! pointing at every observed variable, each observed variable having one
//! categorical table per confounder value.

use crate::model::HypothesisRecord;
use rand::distributions::{Bernoulli, WeightedIndex};
use rand::Rng;
use rand_distr::Distribution;
use serde_json::{Map, Value};
use thiserror::Error;

/// Allowed deviation of a table row from summing to one
pub const ROW_SUM_TOLERANCE: f64 = 1e-6;

/// Network construction errors
#[derive(Debug, Error, PartialEq)]
pub enum NetworkError {
    /// No usable prior for the confounder
    #[error("no prior probability for confounder '{0}'")]
    MissingPrior(String),

    /// Prior outside [0, 1]
    #[error("prior probability {prior} of '{confounder}' is outside [0, 1]")]
    InvalidPrior {
        /// Confounder name
        confounder: String,
        /// Declared prior
        prior: f64,
    },

    /// No conditional probability tables for the confounder
    #[error("no conditional probability tables for confounder '{0}'")]
    MissingConditionals(String),

    /// No table for one observed variable
    #[error("no conditional probability table for observed variable '{0}'")]
    MissingTable(String),

    /// The two rows of a table list different states
    #[error("states of '{0}' differ between confounder true and false")]
    StateMismatch(String),

    /// A probability that is not a number in [0, 1]
    #[error("invalid probability for state '{state}' of '{observed}'")]
    InvalidProbability {
        /// Observed variable
        observed: String,
        /// State name
        state: String,
    },

    /// A table row that does not sum to one
    #[error("probabilities of '{observed}' given confounder {given} sum to {sum}")]
    RowSum {
        /// Observed variable
        observed: String,
        /// Confounder value of the row
        given: bool,
        /// Actual sum
        sum: f64,
    },
}

/// One observed child of the confounder
#[derive(Debug, Clone)]
struct ObservedNode {
    name: String,
    states: Vec<String>,
    given_true: WeightedIndex<f64>,
    given_false: WeightedIndex<f64>,
}

/// Binary confounder → observed variables
#[derive(Debug, Clone)]
pub struct ForkNetwork {
    confounder: String,
    prior: Bernoulli,
    children: Vec<ObservedNode>,
}

fn row_weights(
    observed: &str,
    states: &[String],
    row: &Map<String, Value>,
    given: bool,
) -> Result<WeightedIndex<f64>, NetworkError> {
    let invalid = |state: &str| NetworkError::InvalidProbability {
        observed: observed.to_string(),
        state: state.to_string(),
    };

    let weights = states
        .iter()
        .map(|state| {
            row.get(state)
                .and_then(Value::as_f64)
                .filter(|p| (0.0..=1.0).contains(p))
                .ok_or_else(|| invalid(state))
        })
        .collect::<Result<Vec<f64>, _>>()?;

    let sum: f64 = weights.iter().sum();
    if (sum - 1.0).abs() > ROW_SUM_TOLERANCE {
        return Err(NetworkError::RowSum {
            observed: observed.to_string(),
            given,
            sum,
        });
    }

    WeightedIndex::new(&weights).map_err(|_| NetworkError::RowSum {
        observed: observed.to_string(),
        given,
        sum,
    })
}

impl ForkNetwork {
    /// Build and validate the network for one confounder of a hypothesis
    pub fn from_hypothesis(
        record: &HypothesisRecord,
        confounder: &str,
    ) -> Result<Self, NetworkError> {
        let prior = record
            .prior_for(confounder)
            .and_then(|p| p.prior_probability())
            .ok_or_else(|| NetworkError::MissingPrior(confounder.to_string()))?;
        let prior = Bernoulli::new(prior).map_err(|_| NetworkError::InvalidPrior {
            confounder: confounder.to_string(),
            prior,
        })?;

        let conditionals = record
            .conditionals_for(confounder)
            .ok_or_else(|| NetworkError::MissingConditionals(confounder.to_string()))?;

        let children = record
            .variables
            .iter()
            .map(|observed| {
                let cpt = conditionals
                    .table_for(observed)
                    .ok_or_else(|| NetworkError::MissingTable(observed.clone()))?;

                let states: Vec<String> = cpt.when_confounder_true.keys().cloned().collect();
                let same_states = states.len() == cpt.when_confounder_false.len()
                    && states
                        .iter()
                        .all(|s| cpt.when_confounder_false.contains_key(s));
                if states.is_empty() || !same_states {
                    return Err(NetworkError::StateMismatch(observed.clone()));
                }

                Ok(ObservedNode {
                    given_true: row_weights(observed, &states, &cpt.when_confounder_true, true)?,
                    given_false: row_weights(
                        observed,
                        &states,
                        &cpt.when_confounder_false,
                        false,
                    )?,
                    name: observed.clone(),
                    states,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            confounder: confounder.to_string(),
            prior,
            children,
        })
    }

    /// Confounder name
    pub fn confounder(&self) -> &str {
        &self.confounder
    }

    /// Column order of sampled rows: the confounder, then observed variables
    pub fn columns(&self) -> Vec<String> {
        std::iter::once(self.confounder.clone())
            .chain(self.children.iter().map(|c| c.name.clone()))
            .collect()
    }

    /// Draw `size` rows in topological order (confounder first)
    pub fn forward_sample<R: Rng + ?Sized>(&self, size: usize, rng: &mut R) -> Vec<Vec<String>> {
        (0..size)
            .map(|_| {
                let present = self.prior.sample(rng);
                let mut row = Vec::with_capacity(self.children.len() + 1);
                row.push(if present { "True" } else { "False" }.to_string());
                for child in &self.children {
                    let index = if present {
                        child.given_true.sample(rng)
                    } else {
                        child.given_false.sample(rng)
                    };
                    row.push(child.states[index].clone());
                }
                row
            })
            .collect()
    }
}

/// Rows sampled for one confounder of one hypothesis
#[derive(Debug, Clone)]
pub struct NetworkSample {
    /// Hypothesis id (0 when the record has none)
    pub run_id: u64,
    /// Confounder name
    pub confounder: String,
    /// Header row
    pub columns: Vec<String>,
    /// Sampled rows
    pub rows: Vec<Vec<String>>,
}

impl NetworkSample {
    /// Output file name, `run_{id}_{confounder}.csv`
    pub fn file_name(&self) -> String {
        let safe: String = self
            .confounder
            .chars()
            .map(|c| if c == '/' || c == '\\' { '_' } else { c })
            .collect();
        format!("run_{}_{}.csv", self.run_id, safe)
    }
}

/// Sample a network for every ranked confounder of every hypothesis
///
/// Records without a confounder and confounders whose tables fail validation
/// are skipped with a logged message.
pub fn sample_hypotheses<R: Rng + ?Sized>(
    records: &[HypothesisRecord],
    size: usize,
    rng: &mut R,
) -> Vec<NetworkSample> {
    let mut samples = Vec::new();

    for record in records {
        let run_id = record.id.unwrap_or_default();
        if !record.is_confounder {
            tracing::info!("[Run {}] no confounder asserted, skipping", run_id);
            continue;
        }

        for hypothesis in &record.confounder_hypotheses {
            let confounder = &hypothesis.confounder;
            match ForkNetwork::from_hypothesis(record, confounder) {
                Ok(network) => {
                    tracing::info!("[Run {}] sampling {} rows for '{}'", run_id, size, confounder);
                    samples.push(NetworkSample {
                        run_id,
                        confounder: confounder.clone(),
                        columns: network.columns(),
                        rows: network.forward_sample(size, rng),
                    });
                }
                Err(e) => tracing::error!("[Run {}] skipping '{}': {}", run_id, confounder, e),
            }
        }
    }

    samples
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use serde_json::json;

    fn hypothesis(prior: Value, xray_false: Value) -> HypothesisRecord {
        serde_json::from_value(json!({
            "variables": ["Xray", "Dyspnoea"],
            "is_confounder": true,
            "confounder_variables": ["Cancer"],
            "Probability": [{"confounder": "Cancer", "probability": prior}],
            "confounder_hypotheses": [{"rank": 1, "confounder": "Cancer", "reasoning": "r"}],
            "conditional_probabilities": [{
                "confounder": "Cancer",
                "probabilities": [
                    {"observed_variable": "Xray", "cpt": {
                        "when_confounder_true": {"positive": 0.9, "negative": 0.1},
                        "when_confounder_false": xray_false
                    }},
                    {"observed_variable": "Dyspnoea", "cpt": {
                        "when_confounder_true": {"True": 0.65, "False": 0.35},
                        "when_confounder_false": {"True": 0.3, "False": 0.7}
                    }}
                ]
            }],
            "id": 3
        }))
        .unwrap()
    }

    fn valid() -> HypothesisRecord {
        hypothesis(json!(0.3), json!({"positive": 0.2, "negative": 0.8}))
    }

    #[test]
    fn test_columns_and_states() {
        let network = ForkNetwork::from_hypothesis(&valid(), "Cancer").unwrap();
        assert_eq!(network.confounder(), "Cancer");
        assert_eq!(network.columns(), vec!["Cancer", "Xray", "Dyspnoea"]);

        let mut rng = StdRng::seed_from_u64(42);
        for row in network.forward_sample(200, &mut rng) {
            assert!(row[0] == "True" || row[0] == "False");
            assert!(row[1] == "positive" || row[1] == "negative");
            assert!(row[2] == "True" || row[2] == "False");
        }
    }

    #[test]
    fn test_prior_frequency() {
        let network = ForkNetwork::from_hypothesis(&valid(), "Cancer").unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        let rows = network.forward_sample(10_000, &mut rng);

        let freq = rows.iter().filter(|r| r[0] == "True").count() as f64 / rows.len() as f64;
        assert!((freq - 0.3).abs() < 0.02, "freq {freq}");
    }

    #[test]
    fn test_child_follows_parent() {
        let network = ForkNetwork::from_hypothesis(&valid(), "Cancer").unwrap();
        let mut rng = StdRng::seed_from_u64(2);
        let rows = network.forward_sample(10_000, &mut rng);

        let present: Vec<_> = rows.iter().filter(|r| r[0] == "True").collect();
        let positive =
            present.iter().filter(|r| r[1] == "positive").count() as f64 / present.len() as f64;
        assert!((positive - 0.9).abs() < 0.03, "P(positive | Cancer) {positive}");
    }

    #[test]
    fn test_invalid_prior() {
        let err = ForkNetwork::from_hypothesis(
            &hypothesis(json!(1.4), json!({"positive": 0.2, "negative": 0.8})),
            "Cancer",
        )
        .unwrap_err();
        assert!(matches!(err, NetworkError::InvalidPrior { .. }));
    }

    #[test]
    fn test_missing_prior_and_tables() {
        let err = ForkNetwork::from_hypothesis(&valid(), "Smoking").unwrap_err();
        assert_eq!(err, NetworkError::MissingPrior("Smoking".to_string()));

        let mut record = valid();
        record.conditional_probabilities.clear();
        let err = ForkNetwork::from_hypothesis(&record, "Cancer").unwrap_err();
        assert_eq!(err, NetworkError::MissingConditionals("Cancer".to_string()));
    }

    #[test]
    fn test_state_mismatch() {
        let err = ForkNetwork::from_hypothesis(
            &hypothesis(json!(0.3), json!({"pos": 0.2, "negative": 0.8})),
            "Cancer",
        )
        .unwrap_err();
        assert_eq!(err, NetworkError::StateMismatch("Xray".to_string()));
    }

    #[test]
    fn test_row_sum_checked() {
        let err = ForkNetwork::from_hypothesis(
            &hypothesis(json!(0.3), json!({"positive": 0.5, "negative": 0.8})),
            "Cancer",
        )
        .unwrap_err();
        assert!(matches!(err, NetworkError::RowSum { given: false, .. }));
    }

    #[test]
    fn test_sample_hypotheses_skips_invalid() {
        let mut no_confounder = valid();
        no_confounder.is_confounder = false;
        let broken = hypothesis(json!("n/a"), json!({"positive": 0.2, "negative": 0.8}));

        let mut rng = StdRng::seed_from_u64(5);
        let samples = sample_hypotheses(&[valid(), no_confounder, broken], 10, &mut rng);

        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].rows.len(), 10);
        assert_eq!(samples[0].file_name(), "run_3_Cancer.csv");
    }
}
