//! The inference engine: fact/rule store plus forward and backward chaining.
//!
//! Facts are named tensors, rules are named [`Rule`] values. The engine is a
//! plain owned value with no interior mutability; embedders that share one
//! instance across threads must wrap it in a lock around every mutating call.
//!
//! Both chaining modes scan rules in lexical order of rule name, so rule
//! selection among competing candidates is deterministic regardless of
//! insertion order.

use crate::engine::rule::{Operation, Rule};
use crate::error::{Result, TlError};
use crate::tensor::ops;
use candle_core::Tensor;
use indexmap::IndexMap;
use rustc_hash::FxHashSet;
use tracing::{debug, info, warn};

/// Apply a rule, resolving its inputs through `lookup`.
///
/// Pure with respect to any store: the caller decides where inputs come from.
/// Fails with [`TlError::MissingInput`] naming the first unresolved input and
/// never substitutes a default tensor; shape failures surface as
/// [`TlError::ShapeMismatch`].
pub fn apply_rule<F>(rule: &Rule, lookup: F) -> Result<Tensor>
where
    F: Fn(&str) -> Option<Tensor>,
{
    let [first, second] = rule.inputs() else {
        return Err(TlError::InvalidRule(format!(
            "{} takes exactly 2 inputs, got {}",
            rule.operation(),
            rule.inputs().len()
        )));
    };
    let a = lookup(first).ok_or_else(|| TlError::MissingInput(first.clone()))?;
    let b = lookup(second).ok_or_else(|| TlError::MissingInput(second.clone()))?;

    match rule.operation() {
        Operation::ModusPonens | Operation::Chain => ops::matmul(&a, &b),
        Operation::Conjunction => ops::minimum(&a, &b),
        Operation::Disjunction => ops::maximum(&a, &b),
    }
}

/// Outcome of a goal-directed backward-chaining search.
#[derive(Debug, Clone)]
pub struct BackwardChainingResult {
    success: bool,
    goal: String,
    reasoning_path: Vec<String>,
    required_facts: IndexMap<String, Tensor>,
}

impl BackwardChainingResult {
    pub fn success(&self) -> bool {
        self.success
    }

    pub fn goal(&self) -> &str {
        &self.goal
    }

    /// Ordered human-readable trace of the proof, one entry per fact touched.
    pub fn reasoning_path(&self) -> &[String] {
        &self.reasoning_path
    }

    /// Every fact touched in proving the goal, including the derived goal.
    pub fn required_facts(&self) -> &IndexMap<String, Tensor> {
        &self.required_facts
    }

    /// Scalar confidence of the proven goal: element 0 of a scalar or vector,
    /// element (0,0) of a matrix, 0.0 when the goal was never proven.
    pub fn goal_confidence(&self) -> f64 {
        self.required_facts
            .get(&self.goal)
            .and_then(|t| ops::leading(t).ok())
            .unwrap_or(0.0)
    }

    /// Required facts rendered as short strings, for callers that report
    /// results to humans.
    pub fn required_facts_formatted(&self) -> IndexMap<String, String> {
        self.required_facts
            .iter()
            .map(|(name, t)| (name.clone(), ops::display(t)))
            .collect()
    }
}

/// The knowledge base: two name-keyed stores and the chaining operations
/// over them.
#[derive(Debug, Default)]
pub struct InferenceEngine {
    facts: IndexMap<String, Tensor>,
    rules: IndexMap<String, Rule>,
}

impl InferenceEngine {
    /// Create an empty engine.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite a fact.
    pub fn add_fact(&mut self, name: &str, tensor: Tensor) {
        debug!(name, shape = ?tensor.dims(), "fact added");
        self.facts.insert(name.to_string(), tensor);
    }

    /// Insert or overwrite a rule under a caller-supplied rule name.
    pub fn add_rule(&mut self, name: &str, rule: Rule) {
        debug!(
            name,
            namespace = rule.namespace(),
            inputs = ?rule.inputs(),
            output = rule.output(),
            "rule added"
        );
        self.rules.insert(name.to_string(), rule);
    }

    /// Look up a fact.
    pub fn get_fact(&self, name: &str) -> Option<&Tensor> {
        self.facts.get(name)
    }

    /// Snapshot of all facts. A copy: mutating it cannot touch engine state.
    pub fn facts_snapshot(&self) -> IndexMap<String, Tensor> {
        self.facts.clone()
    }

    /// Snapshot of all rules.
    pub fn rules_snapshot(&self) -> IndexMap<String, Rule> {
        self.rules.clone()
    }

    pub fn fact_count(&self) -> usize {
        self.facts.len()
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    /// Remove all facts and rules, for a fresh reasoning session.
    pub fn clear(&mut self) {
        info!(
            facts = self.facts.len(),
            rules = self.rules.len(),
            "engine cleared"
        );
        self.facts.clear();
        self.rules.clear();
    }

    /// Rules in lexical order of rule name: the deterministic scan order for
    /// both chaining modes.
    fn rules_in_order(&self) -> Vec<(&str, &Rule)> {
        let mut ordered: Vec<(&str, &Rule)> =
            self.rules.iter().map(|(name, rule)| (name.as_str(), rule)).collect();
        ordered.sort_by(|a, b| a.0.cmp(b.0));
        ordered
    }

    /// One closure pass of forward chaining.
    ///
    /// Every rule matching the namespace filter whose inputs are all present
    /// in the current store is applied; results are staged and merged only
    /// after the whole scan, so rules in the same pass never see each other's
    /// outputs. Multi-hop saturation is the caller's loop: keep calling until
    /// the returned map is empty.
    ///
    /// The returned map holds the facts this pass actually changed: an output
    /// re-derived with a value already in the store does not count, which is
    /// what makes the saturation loop terminate.
    ///
    /// A rule that fails to apply (shape mismatch) is skipped with a warning;
    /// it never aborts the pass.
    pub fn forward_chain(&mut self, namespace: Option<&str>) -> IndexMap<String, Tensor> {
        info!(namespace = namespace.unwrap_or("*"), "forward chaining");
        let mut staged: IndexMap<String, Tensor> = IndexMap::new();

        for (name, rule) in self.rules_in_order() {
            if !namespace_matches(namespace, rule.namespace()) {
                continue;
            }
            if !rule.inputs().iter().all(|input| self.facts.contains_key(input)) {
                continue;
            }
            match apply_rule(rule, |n| self.facts.get(n).cloned()) {
                Ok(result) => {
                    debug!(rule = name, inputs = ?rule.inputs(), output = rule.output(), "derived");
                    staged.insert(rule.output().to_string(), result);
                }
                Err(e) => {
                    warn!(rule = name, error = %e, "rule skipped");
                }
            }
        }

        let mut derived = IndexMap::new();
        for (name, tensor) in staged {
            let changed = match self.facts.get(&name) {
                Some(existing) => !tensors_equal(existing, &tensor),
                None => true,
            };
            if changed {
                derived.insert(name.clone(), tensor.clone());
            }
            self.facts.insert(name, tensor);
        }
        info!(derived = derived.len(), "forward chaining done");
        derived
    }

    /// Goal-directed backward chaining: prove `goal` is derivable, applying
    /// the chain of rules needed along the way.
    ///
    /// A depth-first search with a visited-set cycle guard: a name
    /// re-encountered mid-derivation before being proven is unresolvable
    /// along that path and fails. Proven facts are memoized and returned as
    /// the result's required facts. The engine itself is not mutated.
    pub fn backward_chain(&self, goal: &str, namespace: Option<&str>) -> BackwardChainingResult {
        info!(goal, namespace = namespace.unwrap_or("*"), "backward chaining");

        let mut path = Vec::new();
        let mut visited = FxHashSet::default();
        let mut proven = IndexMap::new();
        let success = self.prove(goal, namespace, &mut path, &mut visited, &mut proven);

        if success {
            info!(goal, steps = path.len(), "goal proven");
        } else {
            warn!(goal, "goal unreachable");
        }

        BackwardChainingResult {
            success,
            goal: goal.to_string(),
            reasoning_path: path,
            required_facts: proven,
        }
    }

    fn prove(
        &self,
        goal: &str,
        namespace: Option<&str>,
        path: &mut Vec<String>,
        visited: &mut FxHashSet<String>,
        proven: &mut IndexMap<String, Tensor>,
    ) -> bool {
        if proven.contains_key(goal) {
            return true;
        }
        // Cycle guard: seen on this search but never proven means the goal
        // depends on itself along this path.
        if visited.contains(goal) {
            debug!(goal, "cycle detected");
            return false;
        }
        visited.insert(goal.to_string());

        if let Some(tensor) = self.facts.get(goal) {
            path.push(format!("{} [known]", goal));
            proven.insert(goal.to_string(), tensor.clone());
            return true;
        }

        for (rule_name, rule) in self.rules_in_order() {
            if !namespace_matches(namespace, rule.namespace()) || rule.output() != goal {
                continue;
            }
            debug!(rule = rule_name, goal, "candidate rule");

            let mut all_inputs_proven = true;
            for input in rule.inputs() {
                if !self.prove(input, namespace, path, visited, proven) {
                    all_inputs_proven = false;
                    break;
                }
            }
            if !all_inputs_proven {
                // This candidate is dead; the next rule producing the goal
                // may still succeed.
                continue;
            }

            match apply_rule(rule, |n| {
                proven.get(n).cloned().or_else(|| self.facts.get(n).cloned())
            }) {
                Ok(result) => {
                    path.push(format!(
                        "{} \u{2190} [{}] ({})",
                        goal,
                        rule.inputs().join(", "),
                        rule.namespace()
                    ));
                    proven.insert(goal.to_string(), result);
                    return true;
                }
                Err(e) => {
                    debug!(rule = rule_name, error = %e, "candidate abandoned");
                }
            }
        }

        debug!(goal, "no rule produces goal");
        false
    }
}

fn namespace_matches(filter: Option<&str>, namespace: &str) -> bool {
    match filter {
        None | Some("*") => true,
        Some(f) => f == namespace,
    }
}

fn tensors_equal(a: &Tensor, b: &Tensor) -> bool {
    if a.dims() != b.dims() {
        return false;
    }
    let flatten = |t: &Tensor| {
        t.flatten_all()
            .and_then(|f| f.to_dtype(candle_core::DType::F64))
            .and_then(|f| f.to_vec1::<f64>())
    };
    match (flatten(a), flatten(b)) {
        (Ok(va), Ok(vb)) => va == vb,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tensor::ops::{matrix, scalar, vector};

    fn modus_ponens_engine() -> InferenceEngine {
        let mut engine = InferenceEngine::new();
        engine.add_fact("A", vector(&[1.0]).unwrap());
        engine.add_fact("A_implies_B", matrix(1, 1, &[0.98]).unwrap());
        engine.add_rule(
            "r1",
            Rule::builder()
                .namespace("t")
                .inputs(["A", "A_implies_B"])
                .output("B")
                .operation(Operation::ModusPonens)
                .build()
                .unwrap(),
        );
        engine
    }

    #[test]
    fn test_forward_chain_modus_ponens() {
        let mut engine = modus_ponens_engine();

        let derived = engine.forward_chain(Some("t"));
        assert_eq!(derived.len(), 1);
        let b = derived.get("B").unwrap();
        assert!((ops::leading(b).unwrap() - 0.98).abs() < 1e-9);
        assert!(engine.get_fact("B").is_some());
    }

    #[test]
    fn test_forward_chain_idempotent_when_saturated() {
        let mut engine = modus_ponens_engine();

        let first = engine.forward_chain(Some("t"));
        assert_eq!(first.len(), 1);

        // Saturated: re-deriving B with the same value reports nothing new.
        let second = engine.forward_chain(Some("t"));
        assert!(second.is_empty());
    }

    #[test]
    fn test_forward_chain_skips_failing_rule() {
        let mut engine = InferenceEngine::new();
        engine.add_fact("P", vector(&[0.5, 0.5]).unwrap());
        engine.add_fact("Q", vector(&[0.9, 0.9, 0.9]).unwrap());
        engine.add_fact("R", vector(&[0.4, 0.6]).unwrap());
        // Shape-incompatible conjunction: skipped, not fatal.
        engine.add_rule(
            "bad",
            Rule::builder()
                .inputs(["P", "Q"])
                .output("X")
                .operation(Operation::Conjunction)
                .build()
                .unwrap(),
        );
        engine.add_rule(
            "good",
            Rule::builder()
                .inputs(["P", "R"])
                .output("Y")
                .operation(Operation::Conjunction)
                .build()
                .unwrap(),
        );

        let derived = engine.forward_chain(None);
        assert!(!derived.contains_key("X"));
        assert!(derived.contains_key("Y"));
    }

    #[test]
    fn test_forward_chain_namespace_isolation() {
        let mut engine = InferenceEngine::new();
        engine.add_fact("A", vector(&[0.5]).unwrap());
        engine.add_fact("B", vector(&[0.7]).unwrap());
        engine.add_rule(
            "ns1_rule",
            Rule::builder()
                .namespace("ns1")
                .inputs(["A", "B"])
                .output("C1")
                .operation(Operation::Conjunction)
                .build()
                .unwrap(),
        );
        engine.add_rule(
            "ns2_rule",
            Rule::builder()
                .namespace("ns2")
                .inputs(["A", "B"])
                .output("C2")
                .operation(Operation::Disjunction)
                .build()
                .unwrap(),
        );

        let derived = engine.forward_chain(Some("ns1"));
        assert!(derived.contains_key("C1"));
        assert!(!derived.contains_key("C2"));
        assert!(engine.get_fact("C2").is_none());
    }

    #[test]
    fn test_apply_rule_missing_input() {
        let rule = Rule::builder()
            .inputs(["X", "Y"])
            .output("Z")
            .operation(Operation::Chain)
            .build()
            .unwrap();

        let err = apply_rule(&rule, |_| None).unwrap_err();
        assert!(matches!(err, TlError::MissingInput(name) if name == "X"));
    }

    #[test]
    fn test_backward_chain_known_fact() {
        let mut engine = InferenceEngine::new();
        engine.add_fact("G", scalar(0.8).unwrap());

        let result = engine.backward_chain("G", None);
        assert!(result.success());
        assert_eq!(result.reasoning_path(), &["G [known]".to_string()]);
        assert_eq!(result.required_facts().len(), 1);
        assert!((result.goal_confidence() - 0.8).abs() < 1e-9);
    }

    #[test]
    fn test_backward_chain_end_to_end() {
        let engine = modus_ponens_engine();

        let result = engine.backward_chain("B", Some("t"));
        assert!(result.success());
        assert!((result.goal_confidence() - 0.98).abs() < 1e-9);

        let path = result.reasoning_path();
        assert_eq!(path.first().unwrap(), "A [known]");
        assert_eq!(path.last().unwrap(), "B \u{2190} [A, A_implies_B] (t)");
        assert!(result.required_facts().contains_key("B"));
    }

    #[test]
    fn test_backward_chain_cycle_guard() {
        let mut engine = InferenceEngine::new();
        engine.add_fact("H", scalar(0.9).unwrap());
        // G's only producing rule requires G itself.
        engine.add_rule(
            "self_ref",
            Rule::builder()
                .inputs(["G", "H"])
                .output("G")
                .operation(Operation::Conjunction)
                .build()
                .unwrap(),
        );

        let result = engine.backward_chain("G", None);
        assert!(!result.success());
        assert_eq!(result.goal_confidence(), 0.0);
    }

    #[test]
    fn test_backward_chain_namespace_isolation() {
        let mut engine = InferenceEngine::new();
        engine.add_fact("A", vector(&[0.6]).unwrap());
        engine.add_fact("B", vector(&[0.4]).unwrap());
        engine.add_rule(
            "ns1_rule",
            Rule::builder()
                .namespace("ns1")
                .inputs(["A", "B"])
                .output("Goal")
                .operation(Operation::Conjunction)
                .build()
                .unwrap(),
        );
        engine.add_rule(
            "ns2_rule",
            Rule::builder()
                .namespace("ns2")
                .inputs(["A", "B"])
                .output("Goal")
                .operation(Operation::Disjunction)
                .build()
                .unwrap(),
        );

        let result = engine.backward_chain("Goal", Some("ns1"));
        assert!(result.success());
        for entry in result.reasoning_path() {
            assert!(!entry.contains("ns2"));
        }
        // Conjunction, not disjunction: min(0.6, 0.4)
        assert!((result.goal_confidence() - 0.4).abs() < 1e-9);
    }

    #[test]
    fn test_backward_chain_tries_next_candidate() {
        let mut engine = InferenceEngine::new();
        engine.add_fact("X", vector(&[0.3]).unwrap());
        engine.add_fact("Y", vector(&[0.7]).unwrap());
        // Lexically first candidate depends on a fact that does not exist
        // and cannot be derived; the second candidate must win.
        engine.add_rule(
            "a_dead_end",
            Rule::builder()
                .inputs(["Nowhere", "X"])
                .output("Goal")
                .operation(Operation::Conjunction)
                .build()
                .unwrap(),
        );
        engine.add_rule(
            "b_works",
            Rule::builder()
                .inputs(["X", "Y"])
                .output("Goal")
                .operation(Operation::Disjunction)
                .build()
                .unwrap(),
        );

        let result = engine.backward_chain("Goal", None);
        assert!(result.success());
        assert!((result.goal_confidence() - 0.7).abs() < 1e-9);
    }

    #[test]
    fn test_multi_hop_derivation() {
        let mut engine = InferenceEngine::new();
        engine.add_fact("A", vector(&[1.0]).unwrap());
        engine.add_fact("A_implies_B", matrix(1, 1, &[0.9]).unwrap());
        engine.add_fact("B_implies_C", matrix(1, 1, &[0.8]).unwrap());
        engine.add_rule(
            "r1",
            Rule::builder()
                .inputs(["A", "A_implies_B"])
                .output("B")
                .operation(Operation::ModusPonens)
                .build()
                .unwrap(),
        );
        engine.add_rule(
            "r2",
            Rule::builder()
                .inputs(["B", "B_implies_C"])
                .output("C")
                .operation(Operation::ModusPonens)
                .build()
                .unwrap(),
        );

        // Backward chaining derives the whole chain in one call.
        let result = engine.backward_chain("C", None);
        assert!(result.success());
        assert!((result.goal_confidence() - 0.72).abs() < 1e-9);

        // Forward chaining needs one pass per hop; the store saturates.
        let mut engine2 = InferenceEngine::new();
        for (name, t) in engine.facts_snapshot() {
            if name != "B" && name != "C" {
                engine2.add_fact(&name, t);
            }
        }
        for (name, r) in engine.rules_snapshot() {
            engine2.add_rule(&name, r);
        }
        assert_eq!(engine2.forward_chain(None).len(), 1); // B
        assert_eq!(engine2.forward_chain(None).len(), 1); // C
        assert!(engine2.forward_chain(None).is_empty());
    }

    #[test]
    fn test_clear_resets_state() {
        let mut engine = modus_ponens_engine();
        engine.forward_chain(None);
        assert!(engine.fact_count() > 0 && engine.rule_count() > 0);

        engine.clear();
        assert_eq!(engine.fact_count(), 0);
        assert_eq!(engine.rule_count(), 0);
        assert!(!engine.backward_chain("B", None).success());
    }

    #[test]
    fn test_snapshots_are_copies() {
        let engine = modus_ponens_engine();

        let mut snapshot = engine.facts_snapshot();
        snapshot.insert("Injected".to_string(), scalar(1.0).unwrap());
        assert!(engine.get_fact("Injected").is_none());
    }
}
