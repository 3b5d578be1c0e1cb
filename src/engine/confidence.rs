//! Confidence and contradiction calculus.
//!
//! Scalar operations over claim confidences, independent of the fact/rule
//! store: product propagation along a reasoning chain, a transitivity-based
//! contradiction heuristic, and tensor-level validation of a single
//! premise/conclusion step.

use crate::error::Result;
use crate::tensor::ops;
use candle_core::Tensor;

/// Contradiction score above which a claim triple is flagged.
pub const CONTRADICTION_THRESHOLD: f64 = 0.3;

/// Result of propagating confidence through a chain of reasoning steps.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfidencePropagation {
    /// Product of all step confidences (1.0 for an empty chain)
    pub final_confidence: f64,
    /// 1 - final_confidence
    pub uncertainty: f64,
    /// The step confidences the result was computed from
    pub intermediate: Vec<f64>,
}

/// Multiply step confidences along a reasoning chain.
pub fn propagate_confidence(confidences: &[f64]) -> ConfidencePropagation {
    let final_confidence: f64 = confidences.iter().product();
    ConfidencePropagation {
        final_confidence,
        uncertainty: 1.0 - final_confidence,
        intermediate: confidences.to_vec(),
    }
}

/// Result of the transitivity-violation check.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContradictionResult {
    pub has_contradiction: bool,
    /// min(expected, actual): how strongly the triple violates transitivity
    pub contradiction_score: f64,
    /// Transitive lower bound on A>C: min(A>B, B>C)
    pub expected: f64,
    /// The claimed C>A confidence
    pub actual: f64,
}

/// Check a claim triple A>B, B>C, C>A for a transitivity violation.
///
/// This is a heuristic with a fixed threshold, not a general consistency
/// solver: if both the transitive bound on A>C and the claimed C>A are
/// strong, the triple contradicts itself.
pub fn detect_contradiction(a_gt_b: f64, b_gt_c: f64, c_gt_a: f64) -> ContradictionResult {
    let expected = a_gt_b.min(b_gt_c);
    let contradiction_score = expected.min(c_gt_a);
    ContradictionResult {
        has_contradiction: contradiction_score > CONTRADICTION_THRESHOLD,
        contradiction_score,
        expected,
        actual: c_gt_a,
    }
}

/// Result of validating a claimed conclusion against its premises.
#[derive(Debug, Clone)]
pub struct ValidationResult {
    pub is_valid: bool,
    /// 1 - mean_error; may go negative for large errors, not clamped
    pub confidence: f64,
    /// premise1 composed with premise2
    pub expected: Tensor,
    /// The claimed conclusion
    pub actual: Tensor,
    /// Elementwise |expected - actual|
    pub error: Tensor,
    pub mean_error: f64,
    pub max_error: f64,
}

/// Validate that `conclusion` follows from composing the two premises.
///
/// The expected conclusion is the matrix product of the premises; the claim
/// is valid when the mean elementwise error stays under `threshold`.
pub fn validate_reasoning(
    premise1: &Tensor,
    premise2: &Tensor,
    conclusion: &Tensor,
    threshold: f64,
) -> Result<ValidationResult> {
    let expected = ops::matmul(premise1, premise2)?;
    let error = ops::abs_diff(&expected, conclusion)?;
    let mean_error = ops::mean(&error)?;
    let max_error = ops::max(&error)?;

    Ok(ValidationResult {
        is_valid: mean_error < threshold,
        confidence: 1.0 - mean_error,
        expected,
        actual: conclusion.clone(),
        error,
        mean_error,
        max_error,
    })
}
