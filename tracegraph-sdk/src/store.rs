//! The snapshot store - an append-only timeline of sanitized variable state.

use std::collections::BTreeMap;
use std::panic::{catch_unwind, AssertUnwindSafe};

use serde::Serialize;
use tracegraph_types::{
    current_timestamp_ms, CapturedVariables, SanitizedValue, SourceContext, VariableSnapshot,
};

/// Maximum structural depth preserved by the sanitizer; anything deeper
/// collapses to a type-name summary.
pub const MAX_SANITIZE_DEPTH: usize = 4;

/// Maximum list elements preserved per level.
pub const MAX_LIST_LEN: usize = 16;

/// Append-only timeline of [`VariableSnapshot`] records plus a lookup table
/// keyed by execution id.
///
/// Multiple snapshots per logical call are expected (`<nodeId>_start`,
/// `<nodeId>_response`, ...); the point lookup resolves to the most recent
/// capture for a key while the timeline keeps every capture in insertion
/// order.
#[derive(Debug, Default)]
pub struct SnapshotStore {
    timeline: Vec<VariableSnapshot>,
    index: BTreeMap<String, usize>,
}

impl SnapshotStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a snapshot and return its execution id.
    pub fn capture(
        &mut self,
        execution_id: impl Into<String>,
        variables: CapturedVariables,
        call_stack: Vec<String>,
        source: Option<SourceContext>,
    ) -> String {
        let execution_id = execution_id.into();
        let snapshot = VariableSnapshot {
            timestamp_ms: current_timestamp_ms(),
            execution_id: execution_id.clone(),
            variables,
            call_stack,
            source,
        };
        self.index.insert(execution_id.clone(), self.timeline.len());
        self.timeline.push(snapshot);
        execution_id
    }

    /// Point lookup by execution id (most recent capture for the key).
    pub fn get(&self, execution_id: &str) -> Option<&VariableSnapshot> {
        self.index.get(execution_id).map(|&i| &self.timeline[i])
    }

    /// The full timeline in insertion order.
    pub fn timeline(&self) -> &[VariableSnapshot] {
        &self.timeline
    }

    /// Number of captured snapshots.
    pub fn len(&self) -> usize {
        self.timeline.len()
    }

    /// Whether nothing has been captured.
    pub fn is_empty(&self) -> bool {
        self.timeline.is_empty()
    }

    /// Drop the timeline and lookup table.
    pub fn clear(&mut self) {
        self.timeline.clear();
        self.index.clear();
    }
}

/// Sanitize an arbitrary serializable value into a bounded, cycle-safe shape.
///
/// Returns `None` when serialization itself fails (a hostile `Serialize`
/// impl returning an error or panicking); callers record the
/// `Cannot extract variables` sentinel in that case instead of letting the
/// failure reach the monitored program.
pub fn sanitize<T>(value: &T) -> Option<SanitizedValue>
where
    T: Serialize + ?Sized,
{
    let json = catch_unwind(AssertUnwindSafe(|| serde_json::to_value(value)))
        .ok()?
        .ok()?;
    Some(sanitize_json(&json, MAX_SANITIZE_DEPTH))
}

/// Capture call arguments, degrading to the extraction-failure sentinel.
pub fn capture_arguments<T>(args: &T) -> CapturedVariables
where
    T: Serialize + ?Sized,
{
    match sanitize(args) {
        Some(v) => CapturedVariables::from_arguments(v),
        None => {
            tracing::debug!("argument capture failed, recording sentinel");
            CapturedVariables::extraction_failure()
        }
    }
}

/// Convert an already-serialized value into the bounded summary shape.
///
/// Primitives survive as-is. Lists survive up to [`MAX_LIST_LEN`] elements
/// per level and [`MAX_SANITIZE_DEPTH`] levels. Objects are summarized as a
/// type name rather than deep-copied - a deliberate fidelity/robustness
/// trade-off that bounds memory and sidesteps cyclic data.
pub fn sanitize_json(value: &serde_json::Value, depth: usize) -> SanitizedValue {
    use serde_json::Value;

    match value {
        Value::Null => SanitizedValue::Null,
        Value::Bool(b) => SanitizedValue::Bool(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                SanitizedValue::Int(i)
            } else {
                SanitizedValue::Float(n.as_f64().unwrap_or(f64::NAN))
            }
        }
        Value::String(s) => SanitizedValue::Text(s.clone()),
        Value::Array(items) => {
            if depth == 0 {
                return SanitizedValue::summary("array");
            }
            let mut out: Vec<SanitizedValue> = items
                .iter()
                .take(MAX_LIST_LEN)
                .map(|v| sanitize_json(v, depth - 1))
                .collect();
            if items.len() > MAX_LIST_LEN {
                out.push(SanitizedValue::summary("truncated"));
            }
            SanitizedValue::List(out)
        }
        Value::Object(_) => SanitizedValue::summary("object"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::ser::Error as _;

    #[test]
    fn capture_and_point_lookup() {
        let mut store = SnapshotStore::new();
        let id = store.capture(
            "node_0_1_start",
            CapturedVariables::from_arguments(SanitizedValue::Text("/api".into())),
            vec![],
            None,
        );

        assert_eq!(id, "node_0_1_start");
        let snap = store.get("node_0_1_start").unwrap();
        assert_eq!(snap.execution_id, "node_0_1_start");
        assert!(store.get("missing").is_none());
    }

    #[test]
    fn timeline_keeps_insertion_order_and_duplicates() {
        let mut store = SnapshotStore::new();
        store.capture("a", CapturedVariables::default(), vec![], None);
        store.capture("b", CapturedVariables::default(), vec![], None);
        store.capture(
            "a",
            CapturedVariables::from_return_value(SanitizedValue::Int(2)),
            vec![],
            None,
        );

        assert_eq!(store.len(), 3);
        assert_eq!(store.timeline()[0].execution_id, "a");
        assert_eq!(store.timeline()[1].execution_id, "b");
        // Point lookup resolves to the most recent capture.
        assert!(store.get("a").unwrap().variables.return_value.is_some());
    }

    #[test]
    fn clear_empties_timeline_and_index() {
        let mut store = SnapshotStore::new();
        store.capture("a", CapturedVariables::default(), vec![], None);
        store.clear();
        assert!(store.is_empty());
        assert!(store.get("a").is_none());
    }

    #[test]
    fn primitives_survive_sanitization() {
        assert_eq!(sanitize(&42i64), Some(SanitizedValue::Int(42)));
        assert_eq!(sanitize(&true), Some(SanitizedValue::Bool(true)));
        assert_eq!(sanitize("hello"), Some(SanitizedValue::Text("hello".into())));
    }

    #[test]
    fn objects_summarize_instead_of_deep_copy() {
        #[derive(serde::Serialize)]
        struct Payload {
            user: String,
        }

        let v = sanitize(&Payload { user: "ada".into() }).unwrap();
        assert_eq!(v, SanitizedValue::summary("object"));
        assert!(v.is_lossy());
    }

    #[test]
    fn deep_nesting_collapses_at_the_bound() {
        let deep = serde_json::json!([[[[[[1]]]]]]);
        let v = sanitize_json(&deep, MAX_SANITIZE_DEPTH);
        assert!(v.is_lossy());
    }

    #[test]
    fn long_lists_truncate() {
        let items: Vec<u32> = (0..100).collect();
        let v = sanitize(&items).unwrap();
        match v {
            SanitizedValue::List(items) => {
                assert_eq!(items.len(), MAX_LIST_LEN + 1);
                assert_eq!(items.last(), Some(&SanitizedValue::summary("truncated")));
            }
            other => panic!("expected list, got {other:?}"),
        }
    }

    #[test]
    fn hostile_serialize_degrades_to_sentinel() {
        struct Hostile;

        impl serde::Serialize for Hostile {
            fn serialize<S: serde::Serializer>(&self, _: S) -> Result<S::Ok, S::Error> {
                Err(S::Error::custom("refusing to serialize"))
            }
        }

        assert_eq!(sanitize(&Hostile), None);
        let vars = capture_arguments(&Hostile);
        assert!(vars.is_failure());
    }
}
