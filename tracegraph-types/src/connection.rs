//! Connections - directed, typed causal edges between nodes.

use crate::NodeId;

/// How a connection's target relates to its origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "minicbor", derive(minicbor::Encode, minicbor::Decode))]
#[cfg_attr(feature = "minicbor", cbor(index_only))]
pub enum ConnectionKind {
    /// Value produced by the origin flowed to the target (success path).
    #[cfg_attr(feature = "minicbor", n(0))]
    DataFlow,

    /// The origin failed and the target records the error.
    #[cfg_attr(feature = "minicbor", n(1))]
    ErrorFlow,

    /// Synchronous return from the origin back to its caller.
    #[cfg_attr(feature = "minicbor", n(2))]
    ReturnFlow,
}

/// A directed, typed edge recording a causal/data relationship.
///
/// Connections are append-only. Both endpoints must exist in the graph at
/// the time the edge is created; the engine always creates the two nodes
/// before the edge between them.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "minicbor", derive(minicbor::Encode, minicbor::Decode))]
pub struct Connection {
    /// Origin node (the call).
    #[cfg_attr(feature = "minicbor", n(0))]
    pub from: NodeId,

    /// Target node (the completion).
    #[cfg_attr(feature = "minicbor", n(1))]
    pub to: NodeId,

    /// Relationship between the endpoints.
    #[cfg_attr(feature = "minicbor", n(2))]
    pub kind: ConnectionKind,
}

impl Connection {
    /// Create a connection between two existing nodes.
    pub fn new(from: impl Into<NodeId>, to: impl Into<NodeId>, kind: ConnectionKind) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            kind,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoints_preserved() {
        let c = Connection::new("a", "b", ConnectionKind::ErrorFlow);
        assert_eq!(c.from.as_str(), "a");
        assert_eq!(c.to.as_str(), "b");
        assert_eq!(c.kind, ConnectionKind::ErrorFlow);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn serde_round_trip() {
        let c = Connection::new("node_0_1", "node_1_2", ConnectionKind::DataFlow);
        let json = serde_json::to_string(&c).unwrap();
        let back: Connection = serde_json::from_str(&json).unwrap();
        assert_eq!(c, back);
    }
}
