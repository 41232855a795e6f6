//! The execution graph - append-only nodes and connections for one session.

use std::collections::BTreeMap;

use tracegraph_types::{Connection, GraphSnapshot, Node, NodeId};

use crate::error::TraceError;

/// Owns the append-only sequence of nodes and connections that constitute
/// the execution graph for one tracing session.
///
/// Nodes are never reordered or deleted individually; the only targeted
/// mutation is [`update_node`](GraphModel::update_node), which attaches
/// completion fields (`status`, `duration_ms`) to an existing record.
/// [`clear`](GraphModel::clear) is the only bulk-destructive operation.
#[derive(Debug, Default)]
pub struct GraphModel {
    nodes: Vec<Node>,
    index: BTreeMap<NodeId, usize>,
    connections: Vec<Connection>,
    lenient: bool,
}

impl GraphModel {
    /// Create a graph with strict connection validation (the default).
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a graph that silently drops connections whose endpoints are
    /// missing, for transports with at-least-once delivery where node and
    /// connection messages may arrive out of order.
    pub fn lenient() -> Self {
        Self {
            lenient: true,
            ..Self::default()
        }
    }

    /// Append a node.
    ///
    /// Idempotent on duplicate ids: a second insert with an id already in
    /// the graph is a no-op and returns `false`.
    pub fn add_node(&mut self, node: Node) -> bool {
        if self.index.contains_key(&node.id) {
            return false;
        }
        self.index.insert(node.id.clone(), self.nodes.len());
        self.nodes.push(node);
        true
    }

    /// Append a connection between two existing nodes.
    ///
    /// In strict mode (the default) a missing endpoint is an error - the
    /// caller is expected to create both nodes before the edge. In lenient
    /// mode the edge is dropped and `Ok(false)` is returned.
    pub fn add_connection(&mut self, connection: Connection) -> Result<bool, TraceError> {
        let missing = [&connection.from, &connection.to]
            .into_iter()
            .find(|id| !self.index.contains_key(*id));

        if let Some(id) = missing {
            if self.lenient {
                return Ok(false);
            }
            return Err(TraceError::MissingEndpoint(id.clone()));
        }

        self.connections.push(connection);
        Ok(true)
    }

    /// Apply a targeted mutation to an existing node.
    ///
    /// Returns `false` if the id is unknown. The closure must not change the
    /// node's id; this is the keyed-update path for attaching completion
    /// fields, not a general rewrite facility.
    pub fn update_node<F>(&mut self, id: &NodeId, f: F) -> bool
    where
        F: FnOnce(&mut Node),
    {
        match self.index.get(id) {
            Some(&i) => {
                f(&mut self.nodes[i]);
                true
            }
            None => false,
        }
    }

    /// Look up a node by id.
    pub fn get(&self, id: &NodeId) -> Option<&Node> {
        self.index.get(id).map(|&i| &self.nodes[i])
    }

    /// Whether a node with this id exists.
    pub fn contains(&self, id: &NodeId) -> bool {
        self.index.contains_key(id)
    }

    /// All nodes, in creation order.
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// All connections, in creation order.
    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    /// Number of nodes.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of connections.
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// A read-only copy of the whole graph.
    pub fn snapshot(&self) -> GraphSnapshot {
        GraphSnapshot {
            nodes: self.nodes.clone(),
            connections: self.connections.clone(),
        }
    }

    /// Drop all nodes and connections.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.index.clear();
        self.connections.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracegraph_types::{ConnectionKind, NodeKind};

    fn node(id: &str) -> Node {
        Node::new(id, NodeKind::Call, id, 0)
    }

    #[test]
    fn add_node_is_idempotent_on_duplicate_ids() {
        let mut graph = GraphModel::new();
        assert!(graph.add_node(node("a")));
        assert!(!graph.add_node(node("a")));
        assert_eq!(graph.node_count(), 1);
    }

    #[test]
    fn strict_mode_rejects_missing_endpoints() {
        let mut graph = GraphModel::new();
        graph.add_node(node("a"));

        let err = graph
            .add_connection(Connection::new("a", "ghost", ConnectionKind::DataFlow))
            .unwrap_err();
        assert!(matches!(err, TraceError::MissingEndpoint(id) if id.as_str() == "ghost"));
        assert_eq!(graph.connection_count(), 0);
    }

    #[test]
    fn lenient_mode_drops_missing_endpoints() {
        let mut graph = GraphModel::lenient();
        graph.add_node(node("a"));

        let added = graph
            .add_connection(Connection::new("a", "ghost", ConnectionKind::DataFlow))
            .unwrap();
        assert!(!added);
        assert_eq!(graph.connection_count(), 0);
    }

    #[test]
    fn connections_between_existing_nodes_append() {
        let mut graph = GraphModel::new();
        graph.add_node(node("a"));
        graph.add_node(node("b"));

        let added = graph
            .add_connection(Connection::new("a", "b", ConnectionKind::ErrorFlow))
            .unwrap();
        assert!(added);
        assert_eq!(graph.connections()[0].kind, ConnectionKind::ErrorFlow);
    }

    #[test]
    fn update_node_is_targeted() {
        let mut graph = GraphModel::new();
        graph.add_node(node("a"));

        assert!(graph.update_node(&NodeId::from("a"), |n| n.set_property("status", "ok")));
        assert!(!graph.update_node(&NodeId::from("ghost"), |_| unreachable!()));

        let status = graph
            .get(&NodeId::from("a"))
            .and_then(|n| n.property("status"))
            .and_then(|p| p.as_text());
        assert_eq!(status, Some("ok"));
    }

    #[test]
    fn clear_empties_everything() {
        let mut graph = GraphModel::new();
        graph.add_node(node("a"));
        graph.add_node(node("b"));
        graph
            .add_connection(Connection::new("a", "b", ConnectionKind::DataFlow))
            .unwrap();

        graph.clear();
        assert_eq!(graph.node_count(), 0);
        assert_eq!(graph.connection_count(), 0);
        assert!(!graph.contains(&NodeId::from("a")));

        // Ids may be reused after a clear without tripping idempotency.
        assert!(graph.add_node(node("a")));
    }

    #[test]
    fn snapshot_preserves_creation_order() {
        let mut graph = GraphModel::new();
        graph.add_node(node("first"));
        graph.add_node(node("second"));

        let snap = graph.snapshot();
        assert_eq!(snap.nodes[0].id.as_str(), "first");
        assert_eq!(snap.nodes[1].id.as_str(), "second");
    }
}
