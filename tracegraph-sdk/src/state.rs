//! Shared session state: the graph, the snapshot timeline, and the flags.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use parking_lot::RwLock;
use tracegraph_types::{
    current_timestamp_ms, CapturedVariables, Connection, GraphSnapshot, Node, NodeId,
    SourceContext, VariableSnapshot,
};

use crate::error::TraceError;
use crate::graph::GraphModel;
use crate::store::SnapshotStore;

/// State shared by one tracing session.
///
/// Lock order: anything that needs both stores takes `graph` before
/// `snapshots`. Interception hooks only ever hold one lock at a time;
/// [`clear`](SessionState::clear) holds both write locks so no consumer can
/// observe a half-cleared session.
#[derive(Debug)]
pub struct SessionState {
    pub(crate) graph: RwLock<GraphModel>,
    pub(crate) snapshots: RwLock<SnapshotStore>,
    tracing_active: AtomicBool,
    node_counter: AtomicU64,
}

impl SessionState {
    /// Create session state with the given connection-validation mode.
    pub fn new(lenient_connections: bool) -> Self {
        let graph = if lenient_connections {
            GraphModel::lenient()
        } else {
            GraphModel::new()
        };
        Self {
            graph: RwLock::new(graph),
            snapshots: RwLock::new(SnapshotStore::new()),
            tracing_active: AtomicBool::new(false),
            node_counter: AtomicU64::new(0),
        }
    }

    /// Whether tracing is currently active.
    pub fn is_tracing(&self) -> bool {
        self.tracing_active.load(Ordering::Acquire)
    }

    /// Flip the tracing flag. Returns `true` if the value changed.
    pub fn set_tracing(&self, active: bool) -> bool {
        self.tracing_active.swap(active, Ordering::AcqRel) != active
    }

    /// Mint a fresh node id: `node_<counter>_<timestamp_ms>`.
    ///
    /// The counter guarantees uniqueness under concurrent overlapping calls;
    /// the timestamp keeps ids readable in exports.
    pub fn next_node_id(&self) -> NodeId {
        let n = self.node_counter.fetch_add(1, Ordering::Relaxed);
        NodeId::new(format!("node_{}_{}", n, current_timestamp_ms()))
    }

    /// Append a node and return the graph snapshot including it.
    ///
    /// Returns `None` when the id already existed (idempotent no-op). The
    /// snapshot is taken under the same write lock as the insert, so it is
    /// consistent with the delta it accompanies.
    pub fn add_node(&self, node: Node) -> Option<GraphSnapshot> {
        let mut graph = self.graph.write();
        if graph.add_node(node) {
            Some(graph.snapshot())
        } else {
            None
        }
    }

    /// Append a connection and return the graph snapshot including it.
    ///
    /// `Ok(None)` means the edge was dropped in lenient mode.
    pub fn add_connection(&self, connection: Connection) -> Result<Option<GraphSnapshot>, TraceError> {
        let mut graph = self.graph.write();
        if graph.add_connection(connection)? {
            Ok(Some(graph.snapshot()))
        } else {
            Ok(None)
        }
    }

    /// Apply a targeted mutation to an existing node.
    pub fn update_node<F>(&self, id: &NodeId, f: F) -> bool
    where
        F: FnOnce(&mut Node),
    {
        self.graph.write().update_node(id, f)
    }

    /// Capture a variable snapshot into the timeline.
    pub fn capture(
        &self,
        execution_id: impl Into<String>,
        variables: CapturedVariables,
        call_stack: Vec<String>,
        source: Option<SourceContext>,
    ) -> String {
        self.snapshots
            .write()
            .capture(execution_id, variables, call_stack, source)
    }

    /// Point lookup of a captured snapshot, cloned out of the lock.
    pub fn snapshot_for(&self, execution_id: &str) -> Option<VariableSnapshot> {
        self.snapshots.read().get(execution_id).cloned()
    }

    /// A read-only copy of the whole graph.
    pub fn graph_snapshot(&self) -> GraphSnapshot {
        self.graph.read().snapshot()
    }

    /// Atomically reset both stores.
    ///
    /// Both write locks are held until both stores are empty, so no
    /// interceptor callback or reader can observe the graph cleared while
    /// the snapshot timeline still has entries, or vice versa.
    pub fn clear(&self) {
        let mut graph = self.graph.write();
        let mut snapshots = self.snapshots.write();
        graph.clear();
        snapshots.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;
    use tracegraph_types::NodeKind;

    #[test]
    fn tracing_flag_reports_changes() {
        let state = SessionState::new(false);
        assert!(!state.is_tracing());
        assert!(state.set_tracing(true));
        assert!(!state.set_tracing(true)); // idempotent
        assert!(state.is_tracing());
        assert!(state.set_tracing(false));
    }

    #[test]
    fn node_ids_are_unique_across_threads() {
        let state = Arc::new(SessionState::new(false));

        let mut handles = vec![];
        for _ in 0..8 {
            let state = state.clone();
            handles.push(std::thread::spawn(move || {
                (0..250).map(|_| state.next_node_id()).collect::<Vec<_>>()
            }));
        }

        let mut seen = HashSet::new();
        for handle in handles {
            for id in handle.join().unwrap() {
                assert!(seen.insert(id), "duplicate node id");
            }
        }
        assert_eq!(seen.len(), 2000);
    }

    #[test]
    fn add_node_snapshot_includes_delta() {
        let state = SessionState::new(false);
        let node = Node::new(state.next_node_id(), NodeKind::Call, "f()", 0);
        let id = node.id.clone();

        let snap = state.add_node(node.clone()).unwrap();
        assert!(snap.nodes.iter().any(|n| n.id == id));

        // Duplicate insert is a no-op.
        assert!(state.add_node(node).is_none());
        assert_eq!(state.graph_snapshot().node_count(), 1);
    }

    #[test]
    fn clear_resets_both_stores() {
        let state = SessionState::new(false);
        state.add_node(Node::new("a", NodeKind::Call, "f()", 0));
        state.capture("a_start", CapturedVariables::default(), vec![], None);

        state.clear();
        assert!(state.graph_snapshot().is_empty());
        assert!(state.snapshot_for("a_start").is_none());
    }
}
