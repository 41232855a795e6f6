//! Nodes - discrete recorded execution events.

use alloc::collections::BTreeMap;
use alloc::string::String;
use core::fmt;

use crate::SourceContext;

/// Opaque node identifier, unique within one tracing session.
///
/// The engine mints ids of the shape `node_<counter>_<timestamp_ms>` but
/// consumers must treat them as opaque strings.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
#[cfg_attr(feature = "minicbor", derive(minicbor::Encode, minicbor::Decode))]
#[cfg_attr(feature = "minicbor", cbor(transparent))]
pub struct NodeId(#[cfg_attr(feature = "minicbor", n(0))] pub String);

impl NodeId {
    /// Create a node id from any string-like value.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for NodeId {
    fn from(s: &str) -> Self {
        Self(s.into())
    }
}

impl From<String> for NodeId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The kind of execution event a node records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "minicbor", derive(minicbor::Encode, minicbor::Decode))]
#[cfg_attr(feature = "minicbor", cbor(index_only))]
pub enum NodeKind {
    /// Synchronous call into a wrapped primitive.
    #[cfg_attr(feature = "minicbor", n(0))]
    Call,

    /// Asynchronous call (network request, deferred computation).
    #[cfg_attr(feature = "minicbor", n(1))]
    AsyncCall,

    /// Successful completion of an earlier call.
    #[cfg_attr(feature = "minicbor", n(2))]
    Success,

    /// Failed completion, or an uncorrelated host error.
    #[cfg_attr(feature = "minicbor", n(3))]
    Error,

    /// Timer scheduling (one-shot or repeating).
    #[cfg_attr(feature = "minicbor", n(4))]
    Timer,

    /// Event-listener registration or dispatch.
    #[cfg_attr(feature = "minicbor", n(5))]
    Event,

    /// Application-defined event.
    #[cfg_attr(feature = "minicbor", n(6))]
    Custom,
}

impl NodeKind {
    /// Whether this kind terminates an earlier call node.
    pub fn is_completion(&self) -> bool {
        matches!(self, NodeKind::Success | NodeKind::Error)
    }
}

/// A primitive value attached to a node's property map.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
#[cfg_attr(feature = "minicbor", derive(minicbor::Encode, minicbor::Decode))]
pub enum PropertyValue {
    /// Absent or null value.
    #[cfg_attr(feature = "minicbor", n(0))]
    Null,

    /// Boolean flag (e.g. `ok`).
    #[cfg_attr(feature = "minicbor", n(1))]
    Bool(#[cfg_attr(feature = "minicbor", n(0))] bool),

    /// Integer value (e.g. `status`, `delay_ms`).
    #[cfg_attr(feature = "minicbor", n(2))]
    Int(#[cfg_attr(feature = "minicbor", n(0))] i64),

    /// Floating point value.
    #[cfg_attr(feature = "minicbor", n(3))]
    Float(#[cfg_attr(feature = "minicbor", n(0))] f64),

    /// Text value (e.g. `url`, `method`, `error`).
    #[cfg_attr(feature = "minicbor", n(4))]
    Text(#[cfg_attr(feature = "minicbor", n(0))] String),
}

impl From<bool> for PropertyValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for PropertyValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<u64> for PropertyValue {
    fn from(v: u64) -> Self {
        Self::Int(v as i64)
    }
}

impl From<f64> for PropertyValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for PropertyValue {
    fn from(v: &str) -> Self {
        Self::Text(v.into())
    }
}

impl From<String> for PropertyValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl PropertyValue {
    /// The text content, if this is a text property.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            PropertyValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// The integer content, if this is an integer property.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            PropertyValue::Int(i) => Some(*i),
            _ => None,
        }
    }
}

/// Property key linking a node to the call it completes or belongs to.
pub const PROP_EXECUTION_ID: &str = "executionId";

/// One recorded execution event.
///
/// Nodes are immutable after creation except for targeted, keyed updates
/// made by a completion event referencing the same id (attaching `status`,
/// `duration_ms`). They are never deleted individually; the whole graph may
/// be cleared.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "minicbor", derive(minicbor::Encode, minicbor::Decode))]
pub struct Node {
    /// Unique id within the session.
    #[cfg_attr(feature = "minicbor", n(0))]
    pub id: NodeId,

    /// What kind of event this node records.
    #[cfg_attr(feature = "minicbor", n(1))]
    pub kind: NodeKind,

    /// Human-readable label: primitive name plus a truncated argument summary.
    #[cfg_attr(feature = "minicbor", n(2))]
    pub label: String,

    /// Wall-clock Unix milliseconds at creation.
    #[cfg_attr(feature = "minicbor", n(3))]
    pub timestamp_ms: u64,

    /// Call-site attribution, when one could be captured.
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    #[cfg_attr(feature = "serde", serde(default))]
    #[cfg_attr(feature = "minicbor", n(4))]
    pub source: Option<SourceContext>,

    /// Free-form primitive properties (`url`, `status`, `executionId`, ...).
    #[cfg_attr(feature = "serde", serde(default))]
    #[cfg_attr(feature = "minicbor", n(5))]
    pub properties: BTreeMap<String, PropertyValue>,
}

impl Node {
    /// Create a node with an empty property map and no source context.
    pub fn new(
        id: impl Into<NodeId>,
        kind: NodeKind,
        label: impl Into<String>,
        timestamp_ms: u64,
    ) -> Self {
        Self {
            id: id.into(),
            kind,
            label: label.into(),
            timestamp_ms,
            source: None,
            properties: BTreeMap::new(),
        }
    }

    /// Attach a source context (builder style).
    pub fn with_source(mut self, source: SourceContext) -> Self {
        self.source = Some(source);
        self
    }

    /// Attach a property (builder style).
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Look up a property by key.
    pub fn property(&self, key: &str) -> Option<&PropertyValue> {
        self.properties.get(key)
    }

    /// Set or replace a property in place.
    pub fn set_property(&mut self, key: impl Into<String>, value: impl Into<PropertyValue>) {
        self.properties.insert(key.into(), value.into());
    }

    /// The execution id correlating this node to its call lifecycle, if any.
    ///
    /// Call nodes carry their own id here; completion nodes carry the id of
    /// the call they complete.
    pub fn execution_id(&self) -> Option<&str> {
        self.property(PROP_EXECUTION_ID).and_then(|p| p.as_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_style_properties() {
        let node = Node::new("node_0_1", NodeKind::AsyncCall, "fetch(\"/api\")", 1)
            .with_property("url", "/api")
            .with_property(PROP_EXECUTION_ID, "node_0_1");

        assert_eq!(node.property("url").and_then(|p| p.as_text()), Some("/api"));
        assert_eq!(node.execution_id(), Some("node_0_1"));
        assert!(node.property("missing").is_none());
    }

    #[test]
    fn completion_kinds() {
        assert!(NodeKind::Success.is_completion());
        assert!(NodeKind::Error.is_completion());
        assert!(!NodeKind::AsyncCall.is_completion());
        assert!(!NodeKind::Timer.is_completion());
    }

    #[test]
    fn targeted_update_keeps_identity() {
        let mut node = Node::new("node_3_9", NodeKind::AsyncCall, "fetch", 9);
        node.set_property("status", 200i64);
        node.set_property("duration_ms", 41i64);

        assert_eq!(node.id, NodeId::from("node_3_9"));
        assert_eq!(node.property("status").and_then(|p| p.as_int()), Some(200));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn serde_round_trip() {
        let node = Node::new("node_1_2", NodeKind::Timer, "setTimeout(50ms)", 2)
            .with_property("delay_ms", 50i64);
        let json = serde_json::to_string(&node).unwrap();
        let back: Node = serde_json::from_str(&json).unwrap();
        assert_eq!(node, back);
    }
}
