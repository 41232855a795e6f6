//! The versioned export document - a persisted snapshot of one graph.
//!
//! Exports are written by an external collaborator (the panel's
//! export-to-file control); this crate only fixes the shape so it
//! round-trips through serialization. Field names keep the original
//! document's camelCase so existing consumers can read both.

use alloc::collections::BTreeMap;
use alloc::string::String;
use alloc::vec::Vec;

use crate::{Connection, GraphSnapshot, Node, NodeId, NodeKind, PropertyValue, SchemaVersion, SourceContext};

/// Renderer-assigned node position, `(0, 0)` when never laid out.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "minicbor", derive(minicbor::Encode, minicbor::Decode))]
pub struct Position {
    /// Horizontal offset in renderer units.
    #[cfg_attr(feature = "minicbor", n(0))]
    pub x: f64,

    /// Vertical offset in renderer units.
    #[cfg_attr(feature = "minicbor", n(1))]
    pub y: f64,
}

/// A node as persisted in an export document: the node plus its position.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ExportedNode {
    /// Node id.
    pub id: NodeId,

    /// Node kind.
    pub kind: NodeKind,

    /// Node label.
    pub label: String,

    /// Creation timestamp, Unix milliseconds.
    #[cfg_attr(feature = "serde", serde(rename = "timestampMs"))]
    pub timestamp_ms: u64,

    /// Layout position at export time.
    pub position: Position,

    /// Source attribution, if captured.
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    #[cfg_attr(feature = "serde", serde(default))]
    pub source: Option<SourceContext>,

    /// Node properties.
    #[cfg_attr(feature = "serde", serde(default))]
    pub properties: BTreeMap<String, PropertyValue>,
}

impl ExportedNode {
    /// Wrap a graph node with a layout position.
    pub fn from_node(node: Node, position: Position) -> Self {
        Self {
            id: node.id,
            kind: node.kind,
            label: node.label,
            timestamp_ms: node.timestamp_ms,
            position,
            source: node.source,
            properties: node.properties,
        }
    }
}

/// Export document metadata.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct ExportMetadata {
    /// Export time, Unix milliseconds.
    pub exported_at_ms: u64,

    /// Identifier of the producing tool.
    pub source: String,

    /// Node count at export time.
    pub total_nodes: usize,

    /// Connection count at export time.
    pub total_connections: usize,
}

/// A versioned, persisted snapshot of the graph at export time.
///
/// Re-importing is not required of consumers, but the document round-trips
/// through serialization without loss of node/connection identity.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ExportDocument {
    /// Schema version of this document.
    pub version: SchemaVersion,

    /// Name of the traced program/session.
    pub program: String,

    /// All nodes with their positions.
    pub nodes: Vec<ExportedNode>,

    /// All connections.
    pub connections: Vec<Connection>,

    /// Counts and provenance.
    pub metadata: ExportMetadata,
}

impl ExportDocument {
    /// Build an export document from a graph snapshot.
    ///
    /// Positions default to the origin; a renderer that tracked layout
    /// substitutes real positions before writing the file.
    pub fn from_graph(program: impl Into<String>, graph: GraphSnapshot, exported_at_ms: u64) -> Self {
        let total_nodes = graph.node_count();
        let total_connections = graph.connection_count();
        let nodes = graph
            .nodes
            .into_iter()
            .map(|n| ExportedNode::from_node(n, Position::default()))
            .collect();

        Self {
            version: SchemaVersion::current(),
            program: program.into(),
            nodes,
            connections: graph.connections,
            metadata: ExportMetadata {
                exported_at_ms,
                source: "tracegraph".into(),
                total_nodes,
                total_connections,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ConnectionKind;
    use alloc::vec;

    fn sample_graph() -> GraphSnapshot {
        GraphSnapshot {
            nodes: vec![
                Node::new("a", NodeKind::AsyncCall, "fetch(\"/api\")", 1),
                Node::new("b", NodeKind::Success, "Response 200", 2),
            ],
            connections: vec![Connection::new("a", "b", ConnectionKind::DataFlow)],
        }
    }

    #[test]
    fn counts_match_graph() {
        let doc = ExportDocument::from_graph("demo", sample_graph(), 99);
        assert_eq!(doc.metadata.total_nodes, 2);
        assert_eq!(doc.metadata.total_connections, 1);
        assert_eq!(doc.nodes.len(), 2);
        assert!(doc.version.is_compatible());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn round_trip_preserves_ids_and_counts() {
        let doc = ExportDocument::from_graph("demo", sample_graph(), 99);
        let json = serde_json::to_string(&doc).unwrap();
        let back: ExportDocument = serde_json::from_str(&json).unwrap();

        assert_eq!(back.nodes.len(), doc.nodes.len());
        assert_eq!(back.connections.len(), doc.connections.len());
        assert_eq!(back.nodes[0].id, doc.nodes[0].id);
        assert_eq!(back.metadata.total_nodes, doc.metadata.total_nodes);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn metadata_uses_camel_case() {
        let doc = ExportDocument::from_graph("demo", sample_graph(), 99);
        let json = serde_json::to_value(&doc).unwrap();
        assert_eq!(json["metadata"]["exportedAtMs"], 99);
        assert_eq!(json["metadata"]["totalNodes"], 2);
    }
}
