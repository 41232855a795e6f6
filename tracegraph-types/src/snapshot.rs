//! Variable snapshots - sanitized views of call state at one point in time.

use alloc::string::String;
use alloc::vec::Vec;

use crate::SourceContext;

/// Recorded when snapshot capture fails on a hostile value.
pub const CANNOT_EXTRACT: &str = "Cannot extract variables";

/// A sanitized value captured from the monitored program.
///
/// Values are deliberately lossy: primitives survive, shallow lists survive
/// up to a bound, and anything deeper or structured collapses to a
/// [`Summary`](SanitizedValue::Summary) naming its type. This bounds memory
/// use and makes cyclic or unbounded data safe to record.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "minicbor", derive(minicbor::Encode, minicbor::Decode))]
pub enum SanitizedValue {
    /// Null/absent.
    #[cfg_attr(feature = "minicbor", n(0))]
    Null,

    /// Boolean primitive.
    #[cfg_attr(feature = "minicbor", n(1))]
    Bool(#[cfg_attr(feature = "minicbor", n(0))] bool),

    /// Integer primitive.
    #[cfg_attr(feature = "minicbor", n(2))]
    Int(#[cfg_attr(feature = "minicbor", n(0))] i64),

    /// Floating point primitive.
    #[cfg_attr(feature = "minicbor", n(3))]
    Float(#[cfg_attr(feature = "minicbor", n(0))] f64),

    /// Text primitive.
    #[cfg_attr(feature = "minicbor", n(4))]
    Text(#[cfg_attr(feature = "minicbor", n(0))] String),

    /// A list whose elements were themselves sanitized.
    #[cfg_attr(feature = "minicbor", n(5))]
    List(#[cfg_attr(feature = "minicbor", n(0))] Vec<SanitizedValue>),

    /// A structured value summarized by type name instead of deep-copied.
    #[cfg_attr(feature = "minicbor", n(6))]
    Summary {
        /// Name of the summarized type (`"object"`, `"map"`, ...).
        #[cfg_attr(feature = "minicbor", n(0))]
        type_name: String,
    },
}

impl SanitizedValue {
    /// Create a summary for a structured value.
    pub fn summary(type_name: impl Into<String>) -> Self {
        Self::Summary {
            type_name: type_name.into(),
        }
    }

    /// Whether this value (or any element of a list) was summarized away.
    pub fn is_lossy(&self) -> bool {
        match self {
            SanitizedValue::Summary { .. } => true,
            SanitizedValue::List(items) => items.iter().any(SanitizedValue::is_lossy),
            _ => false,
        }
    }
}

/// The variables captured around one call-lifecycle point.
///
/// Only arguments, return value, and receiver are captured - never the full
/// frame. A serialization failure during capture is recorded in `error`
/// rather than propagated into the monitored program.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "minicbor", derive(minicbor::Encode, minicbor::Decode))]
pub struct CapturedVariables {
    /// Arguments at call time (`_start` / `_setup` snapshots).
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    #[cfg_attr(feature = "serde", serde(default))]
    #[cfg_attr(feature = "minicbor", n(0))]
    pub arguments: Option<SanitizedValue>,

    /// Named locals explicitly handed to the engine, if any.
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    #[cfg_attr(feature = "serde", serde(default))]
    #[cfg_attr(feature = "minicbor", n(1))]
    pub local_vars: Option<SanitizedValue>,

    /// Return value at completion time (`_response` snapshots).
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    #[cfg_attr(feature = "serde", serde(default))]
    #[cfg_attr(feature = "minicbor", n(2))]
    pub return_value: Option<SanitizedValue>,

    /// The receiver (`self`/`this`) the call was bound to, if any.
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    #[cfg_attr(feature = "serde", serde(default))]
    #[cfg_attr(feature = "minicbor", n(3))]
    pub receiver: Option<SanitizedValue>,

    /// Error message recorded at failure points, or the
    /// `Cannot extract variables` sentinel when capture itself failed.
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    #[cfg_attr(feature = "serde", serde(default))]
    #[cfg_attr(feature = "minicbor", n(4))]
    pub error: Option<String>,
}

impl CapturedVariables {
    /// Variables captured from call arguments only.
    pub fn from_arguments(arguments: SanitizedValue) -> Self {
        Self {
            arguments: Some(arguments),
            ..Self::default()
        }
    }

    /// Variables captured from a return value only.
    pub fn from_return_value(return_value: SanitizedValue) -> Self {
        Self {
            return_value: Some(return_value),
            ..Self::default()
        }
    }

    /// The sentinel recorded when capture itself failed.
    pub fn extraction_failure() -> Self {
        Self {
            error: Some(CANNOT_EXTRACT.into()),
            ..Self::default()
        }
    }

    /// Whether capture failed for this snapshot.
    pub fn is_failure(&self) -> bool {
        self.error.as_deref() == Some(CANNOT_EXTRACT)
    }
}

/// A captured, sanitized view of call state at one point in time.
///
/// Snapshots are keyed by execution id; a single logical call produces
/// several (`<nodeId>_start`, `<nodeId>_response`, `<nodeId>_error`,
/// `<nodeId>_callback`) over its lifecycle.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "minicbor", derive(minicbor::Encode, minicbor::Decode))]
pub struct VariableSnapshot {
    /// Wall-clock Unix milliseconds at capture.
    #[cfg_attr(feature = "minicbor", n(0))]
    pub timestamp_ms: u64,

    /// Correlation key (`<nodeId>_start` and friends).
    #[cfg_attr(feature = "minicbor", n(1))]
    pub execution_id: String,

    /// The captured variables.
    #[cfg_attr(feature = "minicbor", n(2))]
    pub variables: CapturedVariables,

    /// Raw stack-frame strings, outermost last, possibly empty.
    #[cfg_attr(feature = "serde", serde(default))]
    #[cfg_attr(feature = "minicbor", n(3))]
    pub call_stack: Vec<String>,

    /// Source attribution for the capture point, when available.
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    #[cfg_attr(feature = "serde", serde(default))]
    #[cfg_attr(feature = "minicbor", n(4))]
    pub source: Option<SourceContext>,
}
