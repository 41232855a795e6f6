//! Source location from textual stack traces.
//!
//! The engine's own wrappers capture call sites structurally (via
//! `#[track_caller]`), so this parser only runs on stacks delivered from
//! outside - host error reports that arrive as frame strings. The frame
//! grammar is the widely used V8 format:
//!
//! ```text
//! frame    = "at" SP symbol SP "(" location ")"   ; named frame
//!          | "at" SP location                     ; anonymous frame
//! location = file ":" line ":" column
//! ```
//!
//! Unparseable frames are skipped; if no non-internal frame parses, the
//! [`SourceContext::unknown`] sentinel is returned. Location failures are
//! degraded-but-non-fatal by design, never errors.

use tracegraph_types::SourceContext;

/// Substring identifying the engine's own frames, filtered out of results.
pub const INTERNAL_MARKER: &str = "tracegraph";

/// Parse a single stack-frame line.
///
/// Returns `None` for frames that do not match the grammar (including
/// frames with no location, like `at <anonymous>`).
pub fn parse_frame(line: &str) -> Option<SourceContext> {
    let rest = line.trim().strip_prefix("at ")?;

    if let Some((symbol, tail)) = rest.split_once(" (") {
        let location = tail.strip_suffix(')')?;
        let (file, line, column) = parse_location(location)?;
        return Some(SourceContext::new(file, line, column, symbol));
    }

    let (file, line, column) = parse_location(rest)?;
    Some(SourceContext::new(file, line, column, "anonymous"))
}

/// Return the first frame not belonging to the instrumentation itself.
///
/// `internal_marker` is matched against the frame's file name; frames whose
/// file contains it are treated as engine-internal and skipped.
pub fn locate<'a, I>(frames: I, internal_marker: &str) -> SourceContext
where
    I: IntoIterator<Item = &'a str>,
{
    for frame in frames {
        if let Some(ctx) = parse_frame(frame) {
            if !ctx.file_name.contains(internal_marker) {
                return ctx;
            }
        }
    }
    SourceContext::unknown()
}

fn parse_location(location: &str) -> Option<(&str, u32, u32)> {
    // File paths may themselves contain ':' (URLs, Windows drives), so the
    // line and column are taken from the right.
    let (rest, column) = location.rsplit_once(':')?;
    let (file, line) = rest.rsplit_once(':')?;
    if file.is_empty() {
        return None;
    }
    Some((file, line.parse().ok()?, column.parse().ok()?))
}
