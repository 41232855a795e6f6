//! Source location for a recorded execution event.

use alloc::borrow::ToOwned;
use alloc::string::String;
use core::fmt;

/// Where in the monitored program a call originated.
///
/// A `SourceContext` is derived, not stored on its own: it rides along on the
/// node or snapshot that references it. When no non-internal frame can be
/// identified, the [`SourceContext::unknown`] sentinel is used instead of
/// failing - source attribution is best-effort by design.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "minicbor", derive(minicbor::Encode, minicbor::Decode))]
pub struct SourceContext {
    /// File the call site lives in.
    #[cfg_attr(feature = "minicbor", n(0))]
    pub file_name: String,

    /// 1-based line number, 0 when unknown.
    #[cfg_attr(feature = "minicbor", n(1))]
    pub line_number: u32,

    /// 1-based column number, 0 when unknown.
    #[cfg_attr(feature = "minicbor", n(2))]
    pub column_number: u32,

    /// Enclosing function name, `"anonymous"` when unknown.
    #[cfg_attr(feature = "minicbor", n(3))]
    pub function_name: String,
}

impl SourceContext {
    /// Create a source context from its parts.
    pub fn new(
        file_name: impl Into<String>,
        line_number: u32,
        column_number: u32,
        function_name: impl Into<String>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            line_number,
            column_number,
            function_name: function_name.into(),
        }
    }

    /// The degraded-but-non-fatal fallback when no usable frame exists.
    pub fn unknown() -> Self {
        Self {
            file_name: "unknown".to_owned(),
            line_number: 0,
            column_number: 0,
            function_name: "anonymous".to_owned(),
        }
    }

    /// Whether this context is the [`unknown`](Self::unknown) sentinel.
    pub fn is_unknown(&self) -> bool {
        self.file_name == "unknown" && self.line_number == 0
    }
}

impl From<&core::panic::Location<'_>> for SourceContext {
    /// Structured call-site capture via `#[track_caller]`, the substitutable
    /// alternative to parsing textual stack traces.
    fn from(loc: &core::panic::Location<'_>) -> Self {
        Self {
            file_name: loc.file().to_owned(),
            line_number: loc.line(),
            column_number: loc.column(),
            function_name: "anonymous".to_owned(),
        }
    }
}

impl fmt::Display for SourceContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{} ({})",
            self.file_name, self.line_number, self.column_number, self.function_name
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_sentinel_round_trips() {
        let s = SourceContext::unknown();
        assert!(s.is_unknown());
        assert_eq!(s.function_name, "anonymous");
    }

    #[test]
    fn from_caller_location() {
        #[track_caller]
        fn capture() -> SourceContext {
            SourceContext::from(core::panic::Location::caller())
        }

        let ctx = capture();
        assert!(ctx.file_name.ends_with("source.rs"));
        assert!(ctx.line_number > 0);
        assert!(!ctx.is_unknown());
    }

    #[test]
    fn display_format() {
        let s = SourceContext::new("app.rs", 10, 4, "main");
        assert_eq!(s.to_string(), "app.rs:10:4 (main)");
    }
}
