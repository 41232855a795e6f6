//! Error types for the tracing engine.

use thiserror::Error;
use tracegraph_types::NodeId;

/// Errors that can surface from the engine's own bookkeeping.
///
/// None of these ever propagate into the monitored program: interception
/// hooks degrade and log instead. They are visible only through the direct
/// store/export APIs.
#[derive(Debug, Error)]
pub enum TraceError {
    /// A connection referenced a node the graph does not contain (strict mode).
    #[error("connection endpoint not present in graph: {0}")]
    MissingEndpoint(NodeId),

    /// Serializing the export document failed.
    #[error("export serialization failed: {0}")]
    Export(#[from] serde_json::Error),

    /// Writing to an output destination failed.
    #[error("output I/O failed: {0}")]
    Io(#[from] std::io::Error),
}
