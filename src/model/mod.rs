//! Data model for hypotheses and synthetic data runs
//!
//! Both types mirror the JSON shapes exchanged with the model and with the
//! research scripts, so unknown keys are carried through untouched.

pub mod hypothesis;
pub mod run;

pub use hypothesis::{
    ConditionalProbabilities, ConfounderPrior, Cpt, HypothesisRecord, ObservedCpt,
    RankedHypothesis,
};
pub use run::{distribution_type_key, ConfounderState, Record, SyntheticRun, DISTRIBUTION_TYPE_SUFFIX};
