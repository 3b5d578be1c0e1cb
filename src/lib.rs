//! Tensor logic: a weighted-relation inference engine.
//!
//! Facts are named numeric tensors (fuzzy truth values and relations), rules
//! are typed numeric operations over them, and reasoning is graph traversal:
//! forward chaining saturates the store one closure pass at a time, backward
//! chaining proves a single goal and reports the derivation path.
//!
//! # Example
//!
//! ```no_run
//! use tensor_logic::{ops, InferenceEngine, Operation, Rule};
//!
//! let mut engine = InferenceEngine::new();
//! engine.add_fact("A", ops::vector(&[1.0])?);
//! engine.add_fact("A_implies_B", ops::matrix(1, 1, &[0.98])?);
//! engine.add_rule(
//!     "r1",
//!     Rule::builder()
//!         .inputs(["A", "A_implies_B"])
//!         .output("B")
//!         .operation(Operation::ModusPonens)
//!         .build()?,
//! );
//!
//! let result = engine.backward_chain("B", None);
//! assert!(result.success());
//! # Ok::<(), tensor_logic::TlError>(())
//! ```

pub mod engine;
pub mod error;
pub mod loader;
pub mod tensor;

pub use engine::{
    apply_rule, detect_contradiction, propagate_confidence, validate_reasoning,
    BackwardChainingResult, ConfidencePropagation, ContradictionResult, InferenceEngine,
    Operation, Rule, RuleBuilder, ValidationResult, CONTRADICTION_THRESHOLD, DEFAULT_NAMESPACE,
};
pub use error::{Result, TlError};
pub use loader::{load_into, LoadSummary, RuleFile};
pub use tensor::ops;
