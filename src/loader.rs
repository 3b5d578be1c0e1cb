//! YAML rule-definition loader.
//!
//! Reads rule files into [`RuleFile`] and feeds a fresh set of base facts
//! and rules into an [`InferenceEngine`]. All validation happens here:
//! operation tags, rule arity, `enabled` filtering and `priority` ordering
//! are resolved before the engine ever sees a rule.

use crate::engine::{InferenceEngine, Operation, Rule};
use crate::error::{Result, TlError};
use crate::tensor::ops;
use candle_core::Tensor;
use serde::Deserialize;
use std::path::Path;
use tracing::{debug, info};

/// A parsed rule definition file.
#[derive(Debug, Clone, Deserialize)]
pub struct RuleFile {
    pub metadata: Option<Metadata>,
    #[serde(default)]
    pub facts: Vec<FactDef>,
    #[serde(default)]
    pub rules: Vec<RuleDef>,
    #[serde(default)]
    pub expected_results: Vec<ExpectedResult>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Metadata {
    pub name: Option<String>,
    pub version: Option<String>,
    pub description: Option<String>,
    pub author: Option<String>,
    /// Namespace applied to every rule in the file; blank means `"default"`
    pub namespace: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FactDef {
    pub name: String,
    pub description: Option<String>,
    /// Logic notation for documentation, e.g. `A -> B`
    pub notation: Option<String>,
    pub tensor: TensorSpec,
}

/// Declarative tensor literal: a scalar, vector or matrix.
#[derive(Debug, Clone, Deserialize)]
pub struct TensorSpec {
    #[serde(rename = "type")]
    pub kind: String,
    pub shape: Option<Vec<usize>>,
    pub values: Option<serde_yaml::Value>,
    /// Scalar fallback when `values` is absent
    pub confidence: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RuleDef {
    pub name: String,
    pub description: Option<String>,
    pub notation: Option<String>,
    pub inputs: Vec<String>,
    pub output: String,
    pub operation: String,
    pub priority: Option<i64>,
    pub enabled: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExpectedResult {
    pub name: String,
    pub description: Option<String>,
    pub expected_value: Option<f64>,
    pub tolerance: Option<f64>,
}

/// What a load put into the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadSummary {
    pub namespace: String,
    pub facts_loaded: usize,
    pub rules_loaded: usize,
}

impl RuleFile {
    /// Parse a rule definition from YAML text.
    pub fn parse_str(text: &str) -> Result<RuleFile> {
        Ok(serde_yaml::from_str(text)?)
    }

    /// Parse a rule definition file from disk.
    pub fn parse_file(path: impl AsRef<Path>) -> Result<RuleFile> {
        let text = std::fs::read_to_string(path)?;
        Self::parse_str(&text)
    }

    /// The effective namespace for rules in this file.
    pub fn namespace(&self) -> &str {
        self.metadata
            .as_ref()
            .and_then(|m| m.namespace.as_deref())
            .map(str::trim)
            .filter(|ns| !ns.is_empty())
            .unwrap_or(crate::engine::DEFAULT_NAMESPACE)
    }
}

fn number(value: &serde_yaml::Value) -> Option<f64> {
    match value {
        serde_yaml::Value::Number(n) => n.as_f64(),
        _ => None,
    }
}

fn invalid(msg: String) -> TlError {
    TlError::InvalidDefinition(msg)
}

/// Convert a tensor literal into an engine tensor.
pub fn tensor_from_spec(spec: &TensorSpec) -> Result<Tensor> {
    match spec.kind.to_ascii_lowercase().as_str() {
        "scalar" => {
            let value = spec
                .values
                .as_ref()
                .and_then(number)
                .or(spec.confidence)
                .ok_or_else(|| invalid("scalar needs a numeric value or confidence".into()))?;
            ops::scalar(value)
        }
        "vector" => {
            let serde_yaml::Value::Sequence(seq) = spec
                .values
                .as_ref()
                .ok_or_else(|| invalid("vector needs values".into()))?
            else {
                return Err(invalid("vector values must be a sequence of numbers".into()));
            };
            let values: Vec<f64> = seq
                .iter()
                .map(|v| number(v).ok_or_else(|| invalid("vector values must be numbers".into())))
                .collect::<Result<_>>()?;
            ops::vector(&values)
        }
        "matrix" => {
            let serde_yaml::Value::Sequence(rows) = spec
                .values
                .as_ref()
                .ok_or_else(|| invalid("matrix needs values".into()))?
            else {
                return Err(invalid("matrix values must be a sequence of rows".into()));
            };
            let row_count = rows.len();
            if row_count == 0 {
                return Err(invalid("matrix has no rows".into()));
            }
            let mut flat = Vec::new();
            let mut cols = None;
            for row in rows {
                let serde_yaml::Value::Sequence(row) = row else {
                    return Err(invalid("matrix rows must be sequences of numbers".into()));
                };
                match cols {
                    None => cols = Some(row.len()),
                    Some(c) if c != row.len() => {
                        return Err(invalid(format!(
                            "ragged matrix: row of {} values after row of {}",
                            row.len(),
                            c
                        )))
                    }
                    Some(_) => {}
                }
                for v in row {
                    flat.push(
                        number(v)
                            .ok_or_else(|| invalid("matrix values must be numbers".into()))?,
                    );
                }
            }
            ops::matrix(row_count, cols.unwrap_or(0), &flat)
        }
        other => Err(invalid(format!("unsupported tensor type: {}", other))),
    }
}

/// Load a parsed rule file into the engine: every declared fact, then every
/// enabled rule in ascending priority order (missing priority sorts last).
pub fn load_into(file: &RuleFile, engine: &mut InferenceEngine) -> Result<LoadSummary> {
    let namespace = file.namespace().to_string();
    info!(
        namespace = %namespace,
        facts = file.facts.len(),
        rules = file.rules.len(),
        "loading rule definition"
    );

    let mut facts_loaded = 0;
    for fact in &file.facts {
        if fact.name.is_empty() {
            return Err(invalid("fact with empty name".into()));
        }
        let tensor = tensor_from_spec(&fact.tensor)
            .map_err(|e| invalid(format!("fact '{}': {}", fact.name, e)))?;
        engine.add_fact(&fact.name, tensor);
        facts_loaded += 1;
    }

    let mut enabled: Vec<&RuleDef> = file
        .rules
        .iter()
        .filter(|def| def.enabled.unwrap_or(true))
        .collect();
    enabled.sort_by_key(|def| def.priority.unwrap_or(i64::MAX));

    let mut rules_loaded = 0;
    for def in enabled {
        if def.name.is_empty() {
            return Err(invalid("rule with empty name".into()));
        }
        let operation = def
            .operation
            .parse::<Operation>()
            .map_err(|e| invalid(format!("rule '{}': {}", def.name, e)))?;
        let rule = Rule::builder()
            .namespace(&namespace)
            .inputs(def.inputs.iter().cloned())
            .output(&def.output)
            .operation(operation)
            .build()
            .map_err(|e| invalid(format!("rule '{}': {}", def.name, e)))?;
        debug!(rule = %def.name, "rule loaded");
        engine.add_rule(&def.name, rule);
        rules_loaded += 1;
    }

    Ok(LoadSummary {
        namespace,
        facts_loaded,
        rules_loaded,
    })
}
