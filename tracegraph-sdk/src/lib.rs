//! # tracegraph-sdk
//!
//! Instrumentation SDK for building causal graphs of asynchronous execution.
//!
//! This crate wraps a program's asynchronous primitives (network-style calls,
//! timers, event listeners) so that every call and its completion are
//! recorded as nodes and causal edges, variable state is captured at the
//! interception boundaries, and a pattern-based diagnosis pass can explain
//! failures from the accumulated timeline.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use tracegraph_sdk::{Output, Session};
//!
//! #[tokio::main]
//! async fn main() {
//!     // Create a session that streams events to a file
//!     let session = Session::builder()
//!         .program("my-service")
//!         .output(Output::file("trace.jsonl"))
//!         .build();
//!     session.start_tracing();
//!
//!     // Route calls through the interceptor instead of calling directly
//!     let tracer = session.interceptor();
//!     let result: Result<u16, String> = tracer
//!         .async_call("https://api.example/users", async {
//!             // ... the real request ...
//!             Ok(200)
//!         })
//!         .await;
//!     let _ = result; // values and errors pass through unchanged
//!
//!     // Ask the engine what went wrong
//!     for diagnosis in session.run_diagnosis() {
//!         println!("[{:?}] {}: {}", diagnosis.severity, diagnosis.diagnosis_type, diagnosis.solution);
//!     }
//! }
//! ```
//!
//! ## Features
//!
//! - **Transparent interception**: wrapped calls return the exact value or
//!   error of the original
//! - **Causal graph**: call/completion nodes with data-, error-, and
//!   return-flow edges
//! - **Variable snapshots**: sanitized captures keyed by execution id
//! - **Pattern diagnosis**: built-in and custom rules over the timeline
//! - **Multiple outputs**: file, TCP, or in-process channel
//! - **Thread-safe**: use one session from any thread or async task

pub mod diagnosis;
mod error;
mod graph;
mod intercept;
pub mod locate;
mod output;
mod registry;
mod session;
mod state;
mod store;

pub use diagnosis::{DiagnosisEngine, Match, Pattern, Timeline};
pub use error::TraceError;
pub use graph::GraphModel;
pub use intercept::{Interceptor, MAX_LABEL_LEN};
pub use output::Output;
pub use registry::{Primitive, Registry};
pub use session::{Session, SessionBuilder};
pub use state::SessionState;
pub use store::SnapshotStore;

// Re-export types for convenience
pub use tracegraph_types::{
    CapturedVariables, Command, Connection, ConnectionKind, Diagnosis, ExportDocument,
    GraphSnapshot, Node, NodeId, NodeKind, SanitizedValue, Severity, SourceContext, TraceEvent,
    VariableSnapshot,
};
