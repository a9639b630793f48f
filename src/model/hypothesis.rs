//! Hypothesis records produced by the confounder-hypothesis model call

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One model answer about a set of observed variables
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HypothesisRecord {
    /// Observed variable names
    pub variables: Vec<String>,

    /// Whether the model believes a latent confounder exists
    #[serde(default)]
    pub is_confounder: bool,

    /// Candidate latent variable names
    #[serde(default)]
    pub confounder_variables: Vec<String>,

    /// Per-confounder distribution family or prior probability
    #[serde(rename = "Probability", default)]
    pub probability: Vec<ConfounderPrior>,

    /// Ranked hypotheses with rationale
    #[serde(default)]
    pub confounder_hypotheses: Vec<RankedHypothesis>,

    /// Conditional probability tables, present for prior-probability prompts
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditional_probabilities: Vec<ConditionalProbabilities>,

    /// Call index assigned by the hypothesis pipeline (1-based)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,

    /// Keys the model added beyond the requested schema
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl HypothesisRecord {
    /// Look up the prior entry for a confounder
    pub fn prior_for(&self, confounder: &str) -> Option<&ConfounderPrior> {
        self.probability.iter().find(|p| p.confounder == confounder)
    }

    /// Look up the conditional probability tables for a confounder
    pub fn conditionals_for(&self, confounder: &str) -> Option<&ConditionalProbabilities> {
        self.conditional_probabilities
            .iter()
            .find(|c| c.confounder == confounder)
    }

    /// The hypothesis ranked first (lowest rank), if any
    pub fn top_ranked(&self) -> Option<&RankedHypothesis> {
        self.confounder_hypotheses.iter().min_by_key(|h| h.rank)
    }
}

/// A latent variable paired with its distribution descriptor or prior
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfounderPrior {
    /// Latent variable name
    pub confounder: String,

    /// Free-text distribution family
    #[serde(rename = "Distributed", default, skip_serializing_if = "Option::is_none")]
    pub distributed: Option<Value>,

    /// Prior probability of the confounder being present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub probability: Option<Value>,
}

impl ConfounderPrior {
    /// Distribution family text, when given as a string
    pub fn family(&self) -> Option<&str> {
        self.distributed.as_ref().and_then(Value::as_str)
    }

    /// Prior probability as a number (numeric strings accepted)
    pub fn prior_probability(&self) -> Option<f64> {
        match self.probability.as_ref()? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

/// A ranked confounder hypothesis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedHypothesis {
    /// 1 is the most likely
    #[serde(default)]
    pub rank: u32,

    /// Latent variable name
    pub confounder: String,

    /// Short rationale
    #[serde(default)]
    pub reasoning: String,

    /// Textual causal graph, e.g. "C -> A; C -> B"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub causal_graph: Option<String>,
}

/// Conditional probability tables of every observed variable given a confounder
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionalProbabilities {
    /// Latent variable name
    pub confounder: String,

    /// One table per observed variable
    #[serde(default)]
    pub probabilities: Vec<ObservedCpt>,
}

impl ConditionalProbabilities {
    /// Look up the table for an observed variable
    pub fn table_for(&self, observed: &str) -> Option<&Cpt> {
        self.probabilities
            .iter()
            .find(|p| p.observed_variable == observed)
            .map(|p| &p.cpt)
    }
}

/// Table for one observed variable
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservedCpt {
    /// Observed variable name
    pub observed_variable: String,

    /// State probabilities under both confounder values
    pub cpt: Cpt,
}

/// State → probability maps for a binary parent
///
/// State order is the key order of `when_confounder_true`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cpt {
    /// P(state | confounder = true)
    pub when_confounder_true: Map<String, Value>,

    /// P(state | confounder = false)
    pub when_confounder_false: Map<String, Value>,
}
