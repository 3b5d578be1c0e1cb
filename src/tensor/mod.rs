//! Tensor operations for weighted relations.
//!
//! This module provides the shape-checked numeric operations the engine
//! applies to fact tensors.

pub mod ops;
