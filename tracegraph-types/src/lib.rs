//! # tracegraph-types
//!
//! Core types for execution-graph tracing. This crate defines the universal
//! schema shared by the tracing engine, transports, and graph viewers: every
//! recorded execution event (node), causal edge (connection), captured
//! variable snapshot, and diagnosis flows through these types.
//!
//! ## Design Goals
//!
//! - **Zero required dependencies**: Core types work without any serialization framework
//! - **Optional serialization**: Enable `serde` and/or `minicbor` features as needed
//! - **Transport agnostic**: The same schema feeds channels, files, or sockets
//! - **Versioned exports**: Exported trace documents carry version info for
//!   forward compatibility
//!
//! ## Features
//!
//! - `std` (default): Standard library support (timestamps, `From<Location>`)
//! - `serde`: JSON/MessagePack/etc. serialization via serde
//! - `minicbor`: Compact binary serialization via CBOR
//! - `all`: Enable all serialization formats
//!
//! ## Example
//!
//! ```rust
//! use tracegraph_types::{Connection, ConnectionKind, Node, NodeId, NodeKind};
//!
//! let call = Node::new("node_0_1700000000000", NodeKind::AsyncCall, "fetch(\"/api\")", 1_700_000_000_000);
//! let done = Node::new("node_1_1700000000050", NodeKind::Success, "Response 200", 1_700_000_000_050);
//!
//! let edge = Connection::new(call.id.clone(), done.id.clone(), ConnectionKind::DataFlow);
//! assert_eq!(edge.from, NodeId::from("node_0_1700000000000"));
//! ```
//!
//! ## Schema Version
//!
//! The current schema version is **1**. The version is embedded in exported
//! trace documents so consumers can handle format evolution gracefully.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

mod connection;
mod diagnosis;
mod event;
mod export;
mod node;
mod snapshot;
mod source;
mod version;

pub use connection::*;
pub use diagnosis::*;
pub use event::*;
pub use export::*;
pub use node::*;
pub use snapshot::*;
pub use source::*;
pub use version::*;

/// Current schema version.
///
/// Increment this when making breaking changes to the exported trace format.
/// Consumers should check this version and handle older formats appropriately.
pub const SCHEMA_VERSION: u32 = 1;

/// Current wall-clock time as Unix milliseconds.
///
/// Node and snapshot timestamps are "monotonic-ish": they come from the wall
/// clock, so ordering between events recorded in the same session is reliable
/// at millisecond granularity but not guaranteed against clock adjustments.
#[cfg(feature = "std")]
pub fn current_timestamp_ms() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};

    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
