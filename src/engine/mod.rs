//! The inference engine: rules, the fact/rule store, chaining, and the
//! confidence calculus.

pub mod confidence;
pub mod infer;
pub mod rule;

pub use confidence::{
    detect_contradiction, propagate_confidence, validate_reasoning, ConfidencePropagation,
    ContradictionResult, ValidationResult, CONTRADICTION_THRESHOLD,
};
pub use infer::{apply_rule, BackwardChainingResult, InferenceEngine};
pub use rule::{Operation, Rule, RuleBuilder, DEFAULT_NAMESPACE};
