//! Prompt templates for the hypothesis and data-generation calls

use crate::model::{distribution_type_key, ConfounderPrior, Record};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// What the hypothesis prompt asks for per confounder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum PromptStyle {
    /// A distribution family per confounder (feeds the data-generation call)
    #[default]
    Distribution,
    /// A prior probability plus conditional probability tables (feeds network sampling)
    Prior,
}

/// Prompt construction errors
#[derive(Debug, Error)]
pub enum PromptError {
    /// Hypotheses need at least two observed variables
    #[error("at least two observed variables are required, got {0}")]
    TooFewVariables(usize),

    /// Baseline rows could not be rendered
    #[error("failed to render baseline rows: {0}")]
    Baseline(#[from] serde_json::Error),
}

/// Quote observed variable names for inclusion in a prompt
///
/// Two names read as `"A" and "B"`; more are comma separated.
pub fn format_variables(variables: &[String]) -> Result<String, PromptError> {
    match variables {
        [] | [_] => Err(PromptError::TooFewVariables(variables.len())),
        [a, b] => Ok(format!("\"{a}\" and \"{b}\"")),
        many => Ok(many
            .iter()
            .map(|v| format!("\"{v}\""))
            .collect::<Vec<_>>()
            .join(", ")),
    }
}

const DISTRIBUTION_EXAMPLE: &str = r#"```json
{
  "variables": ["Variable A", "Variable B"],
  "is_confounder": true,
  "confounder_variables": ["Potential cause 1", "Potential cause 2"],
  "Probability": [
    {"confounder": "Potential cause 1", "Distributed": "normal"},
    {"confounder": "Potential cause 2", "Distributed": "bernoulli"}
  ],
  "confounder_hypotheses": [
    {
      "rank": 1,
      "confounder": "Potential cause 1",
      "reasoning": "The most likely cause because ...",
      "causal_graph": "Potential cause 1 -> Variable A; Potential cause 1 -> Variable B"
    },
    {
      "rank": 2,
      "confounder": "Potential cause 2",
      "reasoning": "Less likely because ...",
      "causal_graph": "Potential cause 2 -> Variable A; Potential cause 2 -> Variable B"
    }
  ]
}
```"#;

const PRIOR_EXAMPLE: &str = r#"```json
{
  "variables": ["Variable A", "Variable B"],
  "is_confounder": true,
  "confounder_variables": ["Potential cause 1"],
  "Probability": [
    {"confounder": "Potential cause 1", "probability": 0.15}
  ],
  "confounder_hypotheses": [
    {
      "rank": 1,
      "confounder": "Potential cause 1",
      "reasoning": "The most likely cause because ...",
      "causal_graph": "Potential cause 1 -> Variable A; Potential cause 1 -> Variable B"
    }
  ],
  "conditional_probabilities": [
    {
      "confounder": "Potential cause 1",
      "probabilities": [
        {
          "observed_variable": "Variable A",
          "cpt": {
            "when_confounder_true": {"State 1": 0.8, "State 2": 0.2},
            "when_confounder_false": {"State 1": 0.05, "State 2": 0.95}
          }
        },
        {
          "observed_variable": "Variable B",
          "cpt": {
            "when_confounder_true": {"State 1": 0.7, "State 2": 0.3},
            "when_confounder_false": {"State 1": 0.02, "State 2": 0.98}
          }
        }
      ]
    }
  ]
}
```"#;

/// Prompt asking whether the observed variables share a latent confounder
pub fn hypothesis_prompt(
    variables: &[String],
    background: &str,
    style: PromptStyle,
) -> Result<String, PromptError> {
    let vars = format_variables(variables)?;

    let (per_confounder, probability_key, example) = match style {
        PromptStyle::Distribution => (
            "For every confounder you propose, give the distribution family its values follow. \
             Use exactly one of: \"normal\", \"bernoulli\", \"uniform\", \"categorical\".",
            "\"Probability\": a list of objects with keys \"confounder\" (string) and \"Distributed\" (one of the family names above).",
            DISTRIBUTION_EXAMPLE,
        ),
        PromptStyle::Prior => (
            "For every confounder you propose, give its prior probability: a number such as 0.05 \
             for the confounder being present in the general population. Then, for every observed \
             variable, define two states (e.g. \"positive\"/\"negative\") and give their \
             probabilities when the confounder is present and when it is absent.",
            "\"Probability\": a list of objects with keys \"confounder\" (string) and \"probability\" (number).\n   \
             - \"conditional_probabilities\": a list of objects with keys \"confounder\" and \"probabilities\"; \
             each probability entry has \"observed_variable\" and a \"cpt\" with \"when_confounder_true\" and \
             \"when_confounder_false\" maps from state to probability.",
            PRIOR_EXAMPLE,
        ),
    };

    Ok(format!(
        "You are an expert in causal inference.\n\n\
         **Background**: {background}: {vars}\n\n\
         **Task**:\n\
         1. Decide whether the association between {vars} is explained by a hidden common cause. \
         If there is no latent confounder, answer false and stop.\n\
         2. If there is one, propose the 3 to 5 most likely **hidden common causes** that could \
         produce {vars} together, with a short rationale for each.\n\
         3. {per_confounder}\n\
         4. Rank the confounders from most to least likely.\n\n\
         **Output**: strict JSON only, no text outside the JSON, with the keys:\n   \
         - \"variables\": the list of input variables.\n   \
         - \"is_confounder\": a boolean.\n   \
         - \"confounder_variables\": the list of proposed confounder names.\n   \
         - {probability_key}\n   \
         - \"confounder_hypotheses\": a list of objects with \"rank\" (integer, 1 = most likely), \
         \"confounder\", \"reasoning\" and \"causal_graph\" (e.g. \"C -> A; C -> B\").\n\n\
         **Example** (values are placeholders):\n{example}\n"
    ))
}

/// Prompt asking for per-individual distribution parameters of one confounder
///
/// `baseline` rows carry the observed values the model must condition on.
pub fn data_prompt(
    variables: &[String],
    descriptor: &ConfounderPrior,
    baseline: &[Record],
) -> Result<String, PromptError> {
    let vars = format_variables(variables)?;
    let descriptor_json = serde_json::to_string(descriptor)?;
    let baseline_json = serde_json::to_string_pretty(baseline)?;
    let confounder = &descriptor.confounder;
    let type_key = distribution_type_key(confounder);

    let example_row = {
        let observed: Vec<String> = variables
            .iter()
            .map(|v| format!("\"{v}\": <value>"))
            .collect();
        format!(
            "{{{}, \"{confounder}\": {{\"<parameter>\": <number>, \"<parameter>\": <number>}}, \"{type_key}\": \"<family>\", \"id\": <n>}}",
            observed.join(", ")
        )
    };

    Ok(format!(
        "You are a rigorous causal data scientist who generates synthetic data from probabilistic models.\n\n\
         **Background**: we are studying a causal hypothesis and need a dataset that reflects \
         **probabilistic** (not deterministic) causal relations.\n\n\
         **Variables and hypothesis**:\n\
         - Observed variables: {vars}\n\
         - Latent confounder and its distribution family: {descriptor_json}\n\
         - Observed values per individual:\n{baseline_json}\n\n\
         **Task**: for every individual above, produce the parameters of the confounder's \
         distribution for that individual, consistent with the causal hypothesis. For a normal \
         distribution give \"mean\" and \"std\"; for bernoulli give \"p\"; for uniform give \"low\" \
         and \"high\"; for categorical give \"categories\" and \"probabilities\" (same length, summing to 1).\n\n\
         **Output**: strict JSON only, no text outside the JSON: a list of run objects with keys\n   \
         - \"variables\": the observed variables.\n   \
         - \"confounder_variables\": [\"{confounder}\"].\n   \
         - \"data\": one object per individual holding the observed values, the confounder's \
         parameter object under \"{confounder}\", the family under \"{type_key}\", and an \"id\".\n\n\
         **Example**:\n```json\n[\n  {{\n    \"variables\": {variables_json},\n    \"confounder_variables\": [\"{confounder}\"],\n    \"data\": [\n      {example_row}\n    ]\n  }}\n]\n```\n",
        variables_json = serde_json::to_string(variables)?,
    ))
}
