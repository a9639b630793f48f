//! Synthetic data runs and per-individual records

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Suffix of the bookkeeping key holding a confounder's distribution family
pub const DISTRIBUTION_TYPE_SUFFIX: &str = "分布类型";

/// A per-individual record: variable name → value
pub type Record = Map<String, Value>;

/// Key under which a record stores the distribution family of `confounder`
pub fn distribution_type_key(confounder: &str) -> String {
    format!("{confounder}{DISTRIBUTION_TYPE_SUFFIX}")
}

/// One generated dataset for a single confounder hypothesis
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SyntheticRun {
    /// Observed variable names
    #[serde(default)]
    pub variables: Vec<String>,

    /// Latent confounder names; the first one is resolved by the finalizer
    #[serde(default)]
    pub confounder_variables: Vec<String>,

    /// Per-individual records in generation order
    #[serde(default)]
    pub data: Vec<Record>,

    /// Keys outside the run schema
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SyntheticRun {
    /// The confounder this run is finalized for
    pub fn primary_confounder(&self) -> Option<&str> {
        self.confounder_variables
            .first()
            .map(String::as_str)
            .filter(|name| !name.is_empty())
    }
}

/// Shape of a confounder cell within a record
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConfounderState<'a> {
    /// The confounder key is absent
    Missing,

    /// No distribution-type key: the value is taken as final
    Concrete(&'a Value),

    /// A parameter mapping plus its declared family
    Parameterized {
        /// Distribution parameters
        params: &'a Map<String, Value>,
        /// Declared family (normally a string)
        family: &'a Value,
    },

    /// A distribution-type key next to a value that is not a mapping
    Inconsistent {
        /// The non-mapping value
        value: &'a Value,
        /// Declared family
        family: &'a Value,
    },
}

impl<'a> ConfounderState<'a> {
    /// Classify the confounder cell of `record`
    pub fn of(record: &'a Record, confounder: &str) -> Self {
        let Some(value) = record.get(confounder) else {
            return Self::Missing;
        };
        let Some(family) = record.get(&distribution_type_key(confounder)) else {
            return Self::Concrete(value);
        };
        match value {
            Value::Object(params) => Self::Parameterized { params, family },
            other => Self::Inconsistent {
                value: other,
                family,
            },
        }
    }

    /// Whether the cell still holds a parameter mapping instead of a scalar
    pub fn is_parameter_mapping(&self) -> bool {
        match self {
            Self::Parameterized { .. } => true,
            Self::Concrete(value) => value.is_object(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> Record {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_distribution_type_key() {
        assert_eq!(distribution_type_key("C"), "C分布类型");
    }

    #[test]
    fn test_run_roundtrip_keeps_extra_keys() {
        let raw = json!({
            "variables": ["A", "B"],
            "confounder_variables": ["C"],
            "data": [{"A": 1, "B": 2, "C": 0.5, "id": 1}],
            "id": [1]
        });
        let run: SyntheticRun = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(run.primary_confounder(), Some("C"));
        assert_eq!(serde_json::to_value(&run).unwrap(), raw);
    }

    #[test]
    fn test_primary_confounder_absent() {
        let run = SyntheticRun::default();
        assert!(run.primary_confounder().is_none());

        let run = SyntheticRun {
            confounder_variables: vec![String::new()],
            ..Default::default()
        };
        assert!(run.primary_confounder().is_none());
    }

    #[test]
    fn test_state_classification() {
        let r = record(json!({"A": 1}));
        assert_eq!(ConfounderState::of(&r, "C"), ConfounderState::Missing);

        let r = record(json!({"C": 3.5}));
        assert!(matches!(ConfounderState::of(&r, "C"), ConfounderState::Concrete(_)));

        let r = record(json!({"C": {"mean": 0}, "C分布类型": "normal"}));
        let state = ConfounderState::of(&r, "C");
        assert!(matches!(state, ConfounderState::Parameterized { .. }));
        assert!(state.is_parameter_mapping());

        let r = record(json!({"C": 1.0, "C分布类型": "normal"}));
        assert!(matches!(
            ConfounderState::of(&r, "C"),
            ConfounderState::Inconsistent { .. }
        ));
    }

    #[test]
    fn test_mapping_without_family_is_flagged() {
        let r = record(json!({"C": {"mean": 0}}));
        let state = ConfounderState::of(&r, "C");
        assert!(matches!(state, ConfounderState::Concrete(_)));
        assert!(state.is_parameter_mapping());
    }
}
