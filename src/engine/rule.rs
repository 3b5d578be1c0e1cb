//! Rules: named, namespaced transformations over fact tensors.

use crate::error::{Result, TlError};
use std::fmt;
use std::str::FromStr;

/// The four typed numeric operations a rule can carry.
///
/// This is a closed set: adding a kind means extending this enum and the
/// exhaustive match in rule application, never open-ended dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// A and (A -> B) derive B: premise composed with an implication tensor
    ModusPonens,
    /// Fuzzy logical AND: elementwise minimum
    Conjunction,
    /// Fuzzy logical OR: elementwise maximum
    Disjunction,
    /// Relation composition: matrix product
    Chain,
}

impl Operation {
    /// All defined operation kinds.
    pub const ALL: [Operation; 4] = [
        Operation::ModusPonens,
        Operation::Conjunction,
        Operation::Disjunction,
        Operation::Chain,
    ];

    /// The tag used in rule definition files.
    pub fn tag(&self) -> &'static str {
        match self {
            Operation::ModusPonens => "MODUS_PONENS",
            Operation::Conjunction => "CONJUNCTION",
            Operation::Disjunction => "DISJUNCTION",
            Operation::Chain => "CHAIN",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for Operation {
    type Err = TlError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "MODUS_PONENS" => Ok(Operation::ModusPonens),
            "CONJUNCTION" => Ok(Operation::Conjunction),
            "DISJUNCTION" => Ok(Operation::Disjunction),
            "CHAIN" => Ok(Operation::Chain),
            other => Err(TlError::UnknownOperation(other.to_string())),
        }
    }
}

/// Namespace assigned to rules that do not declare one.
pub const DEFAULT_NAMESPACE: &str = "default";

/// An immutable inference rule: apply `operation` to the named input facts
/// to derive the output fact.
///
/// Rules are identified externally by a rule name (the store's mapping key);
/// the rule itself only carries its namespace, inputs, output and operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    namespace: String,
    inputs: Vec<String>,
    output: String,
    operation: Operation,
}

impl Rule {
    /// Start building a rule. The namespace defaults to `"default"` and the
    /// operation to modus ponens.
    pub fn builder() -> RuleBuilder {
        RuleBuilder::default()
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn inputs(&self) -> &[String] {
        &self.inputs
    }

    pub fn output(&self) -> &str {
        &self.output
    }

    pub fn operation(&self) -> Operation {
        self.operation
    }
}

/// Builder for [`Rule`]. Validates structure at `build` time: all four
/// operation kinds take exactly two inputs, and the output must be named.
#[derive(Debug, Clone)]
pub struct RuleBuilder {
    namespace: String,
    inputs: Vec<String>,
    output: String,
    operation: Operation,
}

impl Default for RuleBuilder {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
            inputs: Vec::new(),
            output: String::new(),
            operation: Operation::ModusPonens,
        }
    }
}

impl RuleBuilder {
    /// Set the namespace. Blank or empty falls back to `"default"`.
    pub fn namespace(mut self, namespace: &str) -> Self {
        let trimmed = namespace.trim();
        self.namespace = if trimmed.is_empty() {
            DEFAULT_NAMESPACE.to_string()
        } else {
            trimmed.to_string()
        };
        self
    }

    /// Set the ordered input fact names.
    pub fn inputs<I, S>(mut self, inputs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.inputs = inputs.into_iter().map(Into::into).collect();
        self
    }

    /// Set the output fact name.
    pub fn output(mut self, output: &str) -> Self {
        self.output = output.to_string();
        self
    }

    /// Set the operation kind.
    pub fn operation(mut self, operation: Operation) -> Self {
        self.operation = operation;
        self
    }

    /// Validate and build the rule.
    pub fn build(self) -> Result<Rule> {
        if self.inputs.len() != 2 {
            return Err(TlError::InvalidRule(format!(
                "{} takes exactly 2 inputs, got {}",
                self.operation,
                self.inputs.len()
            )));
        }
        if self.output.is_empty() {
            return Err(TlError::InvalidRule("output fact name is empty".to_string()));
        }
        Ok(Rule {
            namespace: self.namespace,
            inputs: self.inputs,
            output: self.output,
            operation: self.operation,
        })
    }
}
