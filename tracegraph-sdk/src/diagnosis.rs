//! Pattern-based diagnosis over the accumulated timeline.

use std::collections::BTreeMap;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};

use parking_lot::RwLock;
use tracegraph_types::{
    current_timestamp_ms, Connection, Diagnosis, Node, NodeId, NodeKind, SanitizedValue, Severity,
    VariableSnapshot,
};

/// Two async calls closer together than this are flagged as tight succession.
pub const TIGHT_SUCCESSION_MS: u64 = 100;

/// Read-only view of the accumulated session history handed to patterns.
#[derive(Debug, Clone, Copy)]
pub struct Timeline<'a> {
    nodes: &'a [Node],
    connections: &'a [Connection],
    snapshots: &'a [VariableSnapshot],
}

impl<'a> Timeline<'a> {
    /// Assemble a view over graph and snapshot slices.
    pub fn new(
        nodes: &'a [Node],
        connections: &'a [Connection],
        snapshots: &'a [VariableSnapshot],
    ) -> Self {
        Self {
            nodes,
            connections,
            snapshots,
        }
    }

    /// All nodes, in creation order.
    pub fn nodes(&self) -> &'a [Node] {
        self.nodes
    }

    /// All connections, in creation order.
    pub fn connections(&self) -> &'a [Connection] {
        self.connections
    }

    /// All variable snapshots, in capture order.
    pub fn snapshots(&self) -> &'a [VariableSnapshot] {
        self.snapshots
    }

    /// Most recent variable snapshot for an execution id.
    pub fn snapshot(&self, execution_id: &str) -> Option<&'a VariableSnapshot> {
        self.snapshots
            .iter()
            .rev()
            .find(|s| s.execution_id == execution_id)
    }

    /// Whether nothing has been recorded at all.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.snapshots.is_empty()
    }
}

/// Evidence returned by a matched pattern condition.
#[derive(Debug, Clone, Default)]
pub struct Match {
    /// Timestamp of the strongest piece of evidence.
    pub timestamp_ms: u64,

    /// The node the finding centers on, if one exists.
    pub subject: Option<NodeId>,

    /// Pattern-specific facts consumed by the solution text.
    pub detail: BTreeMap<String, String>,
}

impl Match {
    /// Evidence centered on one node.
    pub fn on_node(node: &Node) -> Self {
        Self {
            timestamp_ms: node.timestamp_ms,
            subject: Some(node.id.clone()),
            detail: BTreeMap::new(),
        }
    }

    /// Attach a fact (builder style).
    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.detail.insert(key.into(), value.into());
        self
    }

    /// Look up a fact, empty string if absent.
    pub fn detail(&self, key: &str) -> &str {
        self.detail.get(key).map(String::as_str).unwrap_or("")
    }
}

type Condition = Box<dyn Fn(&Timeline<'_>) -> Option<Match> + Send + Sync>;
type Solution = Box<dyn Fn(&Match) -> String + Send + Sync>;

/// A declarative rule recognizing a known problem signature.
pub struct Pattern {
    name: String,
    severity: Severity,
    condition: Condition,
    solution: Solution,
}

impl Pattern {
    /// Create a pattern from its condition and solution functions.
    pub fn new<C, S>(name: impl Into<String>, severity: Severity, condition: C, solution: S) -> Self
    where
        C: Fn(&Timeline<'_>) -> Option<Match> + Send + Sync + 'static,
        S: Fn(&Match) -> String + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            severity,
            condition: Box::new(condition),
            solution: Box::new(solution),
        }
    }

    /// The pattern's name, used as the diagnosis type.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Debug for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pattern")
            .field("name", &self.name)
            .field("severity", &self.severity)
            .finish_non_exhaustive()
    }
}

/// Holds the ordered pattern list and runs the diagnosis pass.
///
/// Each run is a single synchronous scan over the full current timeline.
/// Diagnoses come back in pattern-registration order; built-ins are
/// registered most-specific first so a report reads from strongest signal
/// to weakest.
#[derive(Debug, Default)]
pub struct DiagnosisEngine {
    patterns: RwLock<Vec<Pattern>>,
}

impl DiagnosisEngine {
    /// Create an engine with no patterns registered.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an engine with the built-in patterns registered.
    pub fn with_builtins() -> Self {
        let engine = Self::new();
        engine.register_pattern(unresolved_dependency());
        engine.register_pattern(null_access());
        engine.register_pattern(tight_succession());
        engine
    }

    /// Append a pattern to the evaluation order.
    pub fn register_pattern(&self, pattern: Pattern) {
        self.patterns.write().push(pattern);
    }

    /// Number of registered patterns.
    pub fn pattern_count(&self) -> usize {
        self.patterns.read().len()
    }

    /// Scan the timeline once and produce diagnoses.
    ///
    /// A panic inside one pattern's condition is isolated: it is logged,
    /// surfaces as a single HIGH-severity entry, and does not prevent other
    /// patterns from running. A run that matches nothing reports that
    /// explicitly instead of returning an empty list.
    pub fn run(&self, timeline: &Timeline<'_>) -> Vec<Diagnosis> {
        let now = current_timestamp_ms();
        let mut diagnoses = Vec::new();

        for pattern in self.patterns.read().iter() {
            match catch_unwind(AssertUnwindSafe(|| (pattern.condition)(timeline))) {
                Ok(Some(found)) => {
                    let solution = (pattern.solution)(&found);
                    diagnoses.push(Diagnosis::new(
                        &pattern.name,
                        pattern.severity,
                        solution,
                        found.timestamp_ms,
                    ));
                }
                Ok(None) => {}
                Err(_) => {
                    tracing::warn!(pattern = %pattern.name, "pattern evaluation panicked");
                    diagnoses.push(Diagnosis::new(
                        "Diagnosis failure",
                        Severity::High,
                        format!(
                            "Pattern \"{}\" failed to evaluate and was skipped. \
                             Remaining patterns still ran.",
                            pattern.name
                        ),
                        now,
                    ));
                }
            }
        }

        if diagnoses.is_empty() {
            let solution = if timeline.is_empty() {
                "No events recorded yet. Start tracing and exercise the program \
                 to collect a timeline."
            } else {
                "No known problem signatures matched the recorded timeline."
            };
            diagnoses.push(Diagnosis::new(
                "General Analysis",
                Severity::Low,
                solution,
                now,
            ));
        }

        diagnoses
    }
}

/// A failed network call, with its target recovered from the pre-call snapshot.
pub fn unresolved_dependency() -> Pattern {
    Pattern::new(
        "Unresolved dependency",
        Severity::High,
        |timeline| {
            let failed = timeline
                .nodes()
                .iter()
                .find(|n| n.kind == NodeKind::Error && n.label.starts_with("Fetch Error"))?;

            let endpoint = failed
                .execution_id()
                .and_then(|id| timeline.snapshot(&format!("{id}_start")))
                .and_then(|snap| snap.variables.arguments.as_ref())
                .and_then(first_text)
                .unwrap_or_else(|| "an unknown endpoint".into());

            Some(Match::on_node(failed).with_detail("endpoint", endpoint))
        },
        |found| {
            format!(
                "The network request to {} failed. Check: 1) server availability, \
                 2) a typo in the endpoint URL, 3) cross-origin policy errors.",
                found.detail("endpoint")
            )
        },
    )
}

/// An error node whose message points at a null/absent value.
pub fn null_access() -> Pattern {
    Pattern::new(
        "Null value access",
        Severity::Medium,
        |timeline| {
            let node = timeline.nodes().iter().find(|n| {
                if n.kind != NodeKind::Error {
                    return false;
                }
                let label = n.label.to_lowercase();
                label.contains("null") || label.contains("undefined") || label.contains("none")
            })?;
            Some(Match::on_node(node).with_detail("message", &node.label))
        },
        |found| {
            format!(
                "An error mentioned a null or absent value ({}). Guard the access \
                 with an existence check or a default before dereferencing.",
                found.detail("message")
            )
        },
    )
}

/// Two or more async calls fired within [`TIGHT_SUCCESSION_MS`] of each other.
pub fn tight_succession() -> Pattern {
    Pattern::new(
        "Tight async succession",
        Severity::Low,
        |timeline| {
            let mut last: Option<&Node> = None;
            for node in timeline.nodes() {
                if node.kind != NodeKind::AsyncCall {
                    continue;
                }
                if let Some(prev) = last {
                    if node.timestamp_ms.saturating_sub(prev.timestamp_ms) <= TIGHT_SUCCESSION_MS {
                        return Some(
                            Match::on_node(node)
                                .with_detail("first", prev.label.clone())
                                .with_detail("second", node.label.clone()),
                        );
                    }
                }
                last = Some(node);
            }
            None
        },
        |found| {
            format!(
                "{} and {} started within {TIGHT_SUCCESSION_MS}ms of each other. \
                 If they depend on each other, sequence them explicitly; if not, \
                 consider aggregating them into one request.",
                found.detail("first"),
                found.detail("second")
            )
        },
    )
}

fn first_text(value: &SanitizedValue) -> Option<String> {
    match value {
        SanitizedValue::Text(s) => Some(s.clone()),
        SanitizedValue::List(items) => items.first().and_then(first_text),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracegraph_types::{CapturedVariables, PROP_EXECUTION_ID};

    fn error_node(id: &str, label: &str, ts: u64) -> Node {
        Node::new(id, NodeKind::Error, label, ts)
    }

    #[test]
    fn empty_timeline_reports_informational_entry() {
        let engine = DiagnosisEngine::with_builtins();
        let timeline = Timeline::new(&[], &[], &[]);

        let diagnoses = engine.run(&timeline);
        assert_eq!(diagnoses.len(), 1);
        assert_eq!(diagnoses[0].diagnosis_type, "General Analysis");
        assert_eq!(diagnoses[0].severity, Severity::Low);
    }

    #[test]
    fn clean_timeline_reports_no_known_issue() {
        let engine = DiagnosisEngine::with_builtins();
        let nodes = [Node::new("a", NodeKind::Success, "Response", 1)];
        let timeline = Timeline::new(&nodes, &[], &[]);

        let diagnoses = engine.run(&timeline);
        assert_eq!(diagnoses.len(), 1);
        assert_eq!(diagnoses[0].diagnosis_type, "General Analysis");
        assert!(diagnoses[0].solution.contains("No known problem"));
    }

    #[test]
    fn unresolved_dependency_recovers_endpoint_from_snapshot() {
        let engine = DiagnosisEngine::with_builtins();

        let nodes = [
            Node::new("call_1", NodeKind::AsyncCall, "fetch(\"https://api.example/users\")", 1)
                .with_property(PROP_EXECUTION_ID, "call_1"),
            error_node("err_1", "Fetch Error: connection refused", 2)
                .with_property(PROP_EXECUTION_ID, "call_1"),
        ];
        let snapshots = [VariableSnapshot {
            timestamp_ms: 1,
            execution_id: "call_1_start".into(),
            variables: CapturedVariables::from_arguments(SanitizedValue::List(vec![
                SanitizedValue::Text("https://api.example/users".into()),
            ])),
            call_stack: vec![],
            source: None,
        }];
        let timeline = Timeline::new(&nodes, &[], &snapshots);

        let diagnoses = engine.run(&timeline);
        let dep = diagnoses
            .iter()
            .find(|d| d.diagnosis_type == "Unresolved dependency")
            .unwrap();
        assert_eq!(dep.severity, Severity::High);
        assert!(dep.solution.contains("https://api.example/users"));
    }

    #[test]
    fn null_access_matches_case_insensitively() {
        let engine = DiagnosisEngine::new();
        engine.register_pattern(null_access());

        let nodes = [error_node("e", "Global Error: cannot read x of Undefined", 3)];
        let timeline = Timeline::new(&nodes, &[], &[]);

        let diagnoses = engine.run(&timeline);
        assert_eq!(diagnoses[0].diagnosis_type, "Null value access");
        assert_eq!(diagnoses[0].severity, Severity::Medium);
    }

    #[test]
    fn tight_succession_respects_threshold() {
        let engine = DiagnosisEngine::new();
        engine.register_pattern(tight_succession());

        let close = [
            Node::new("a", NodeKind::AsyncCall, "fetch(\"/a\")", 1000),
            Node::new("b", NodeKind::AsyncCall, "fetch(\"/b\")", 1010),
        ];
        let timeline = Timeline::new(&close, &[], &[]);
        assert_eq!(engine.run(&timeline)[0].diagnosis_type, "Tight async succession");

        let apart = [
            Node::new("a", NodeKind::AsyncCall, "fetch(\"/a\")", 1000),
            Node::new("b", NodeKind::AsyncCall, "fetch(\"/b\")", 2000),
        ];
        let timeline = Timeline::new(&apart, &[], &[]);
        assert_eq!(engine.run(&timeline)[0].diagnosis_type, "General Analysis");
    }

    #[test]
    fn diagnoses_come_back_in_registration_order() {
        let engine = DiagnosisEngine::new();
        engine.register_pattern(Pattern::new(
            "Second by time, first by registration",
            Severity::Low,
            |_| Some(Match { timestamp_ms: 2000, ..Match::default() }),
            |_| "b".into(),
        ));
        engine.register_pattern(Pattern::new(
            "First by time, second by registration",
            Severity::Low,
            |_| Some(Match { timestamp_ms: 1000, ..Match::default() }),
            |_| "a".into(),
        ));

        let nodes = [Node::new("n", NodeKind::Call, "f()", 1)];
        let timeline = Timeline::new(&nodes, &[], &[]);
        let diagnoses = engine.run(&timeline);

        assert_eq!(diagnoses[0].diagnosis_type, "Second by time, first by registration");
        assert_eq!(diagnoses[1].diagnosis_type, "First by time, second by registration");
    }

    #[test]
    fn panicking_pattern_is_isolated() {
        let engine = DiagnosisEngine::new();
        engine.register_pattern(Pattern::new(
            "Broken",
            Severity::Low,
            |_| panic!("bad pattern"),
            |_| unreachable!(),
        ));
        engine.register_pattern(null_access());

        let nodes = [error_node("e", "value was null", 1)];
        let timeline = Timeline::new(&nodes, &[], &[]);
        let diagnoses = engine.run(&timeline);

        assert_eq!(diagnoses.len(), 2);
        assert_eq!(diagnoses[0].diagnosis_type, "Diagnosis failure");
        assert_eq!(diagnoses[0].severity, Severity::High);
        assert_eq!(diagnoses[1].diagnosis_type, "Null value access");
    }
}
