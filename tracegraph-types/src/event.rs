//! The event stream and command surface shared with external collaborators.
//!
//! Renderers and transports consume [`TraceEvent`]s and issue [`Command`]s;
//! neither side sees engine internals. Wire names follow the original
//! devtools protocol (`NODE_ADDED`, `START_TRACING`, ...).

use alloc::vec::Vec;

use crate::{Connection, Diagnosis, Node};

/// A read-only copy of the whole graph at one instant.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "minicbor", derive(minicbor::Encode, minicbor::Decode))]
pub struct GraphSnapshot {
    /// All nodes, in creation order.
    #[cfg_attr(feature = "minicbor", n(0))]
    pub nodes: Vec<Node>,

    /// All connections, in creation order.
    #[cfg_attr(feature = "minicbor", n(1))]
    pub connections: Vec<Connection>,
}

impl GraphSnapshot {
    /// Number of nodes.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of connections.
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Whether the graph holds no events at all.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.connections.is_empty()
    }
}

/// Outbound event emitted for every graph mutation or diagnosis run.
///
/// Each mutation payload carries the full current graph snapshot alongside
/// the delta; consumers may ignore the snapshot and apply deltas
/// incrementally, or resync from the snapshot after a gap.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "event", content = "data"))]
pub enum TraceEvent {
    /// A node was appended to the graph.
    #[cfg_attr(feature = "serde", serde(rename = "NODE_ADDED"))]
    NodeAdded {
        /// The new node.
        node: Node,
        /// Full graph including the new node.
        graph: GraphSnapshot,
    },

    /// A connection was appended to the graph.
    #[cfg_attr(feature = "serde", serde(rename = "CONNECTION_ADDED"))]
    ConnectionAdded {
        /// The new connection.
        connection: Connection,
        /// Full graph including the new connection.
        graph: GraphSnapshot,
    },

    /// Results of one diagnosis run.
    #[cfg_attr(feature = "serde", serde(rename = "DIAGNOSIS_RESULT"))]
    DiagnosisResult(Vec<Diagnosis>),
}

/// Inbound control command from the panel/transport.
///
/// All commands are idempotent: starting an active session, stopping an
/// inactive one, or clearing an empty graph are no-ops.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum Command {
    /// Activate tracing for the session.
    StartTracing,

    /// Deactivate tracing; wrapped primitives forward unmodified.
    StopTracing,

    /// Run the diagnosis pass over the accumulated timeline.
    RunDiagnosis,

    /// Atomically clear the graph and snapshot timeline.
    ClearGraph,
}
