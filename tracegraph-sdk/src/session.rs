//! The main Session type - one tracing session over one monitored program.

use std::sync::Arc;

use tracegraph_types::{
    current_timestamp_ms, Command, Diagnosis, ExportDocument, GraphSnapshot, TraceEvent,
    VariableSnapshot,
};

use crate::diagnosis::{DiagnosisEngine, Pattern, Timeline};
use crate::error::TraceError;
use crate::intercept::Interceptor;
use crate::output::Output;
use crate::registry::Registry;
use crate::state::SessionState;

/// The main entry point for tracing a program.
///
/// A Session owns the causal graph, the variable-snapshot timeline, the
/// interception registry, and the diagnosis patterns. Route the program's
/// asynchronous calls through the session's [`Interceptor`] and drive the
/// session with [`start_tracing`](Session::start_tracing) /
/// [`stop_tracing`](Session::stop_tracing) / [`run_diagnosis`](Session::run_diagnosis).
///
/// # Example
///
/// ```rust,no_run
/// use tracegraph_sdk::{Output, Session};
///
/// #[tokio::main]
/// async fn main() {
///     let session = Session::builder()
///         .program("checkout-service")
///         .output(Output::file("trace.jsonl"))
///         .build();
///     session.start_tracing();
///
///     let tracer = session.interceptor();
///     let result: Result<u16, String> = tracer
///         .async_call("https://api.example/users", async { Ok(200) })
///         .await;
///     let _ = result;
///
///     for diagnosis in session.run_diagnosis() {
///         println!("{}: {}", diagnosis.diagnosis_type, diagnosis.solution);
///     }
/// }
/// ```
#[derive(Debug)]
pub struct Session {
    state: Arc<SessionState>,
    outputs: Arc<Vec<Output>>,
    registry: Arc<Registry>,
    engine: DiagnosisEngine,
    program: String,
}

impl Session {
    /// Create a session with default settings.
    ///
    /// No outputs are configured, every primitive is installed, the built-in
    /// diagnosis patterns are registered, and tracing starts inactive.
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Create a builder for configuring the session.
    pub fn builder() -> SessionBuilder {
        SessionBuilder::new()
    }

    /// Get an interception handle for routing calls through this session.
    ///
    /// Handles are cheap to clone and can be used from any thread or task.
    pub fn interceptor(&self) -> Interceptor {
        Interceptor {
            state: self.state.clone(),
            outputs: self.outputs.clone(),
            registry: self.registry.clone(),
        }
    }

    /// The interception registry, for installing or uninstalling primitives
    /// while the session runs.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Start recording. Returns `false` if tracing was already active.
    pub fn start_tracing(&self) -> bool {
        self.state.set_tracing(true)
    }

    /// Stop recording. Returns `false` if tracing was already inactive.
    ///
    /// The accumulated graph and snapshots are kept; diagnosis and export
    /// keep working on them after the stop.
    pub fn stop_tracing(&self) -> bool {
        self.state.set_tracing(false)
    }

    /// Whether tracing is currently active.
    pub fn is_tracing(&self) -> bool {
        self.state.is_tracing()
    }

    /// Atomically discard the graph and the snapshot timeline.
    pub fn clear(&self) {
        self.state.clear();
    }

    /// A read-only copy of the current graph.
    pub fn graph_snapshot(&self) -> GraphSnapshot {
        self.state.graph_snapshot()
    }

    /// Point lookup of a captured variable snapshot.
    pub fn snapshot_for(&self, execution_id: &str) -> Option<VariableSnapshot> {
        self.state.snapshot_for(execution_id)
    }

    /// Append a diagnosis pattern after the built-ins.
    pub fn register_pattern(&self, pattern: Pattern) {
        self.engine.register_pattern(pattern);
    }

    /// Run the diagnosis pass over the accumulated timeline.
    ///
    /// The result is emitted to every configured output as a
    /// `DIAGNOSIS_RESULT` event and also returned to the caller.
    pub fn run_diagnosis(&self) -> Vec<Diagnosis> {
        // Lock order: graph before snapshots, matching clear().
        let diagnoses = {
            let graph = self.state.graph.read();
            let snapshots = self.state.snapshots.read();
            let timeline = Timeline::new(graph.nodes(), graph.connections(), snapshots.timeline());
            self.engine.run(&timeline)
        };

        let event = TraceEvent::DiagnosisResult(diagnoses.clone());
        for output in self.outputs.iter() {
            output.emit(&event);
        }
        diagnoses
    }

    /// Build a versioned export document from the current graph.
    pub fn export(&self) -> ExportDocument {
        ExportDocument::from_graph(
            self.program.clone(),
            self.state.graph_snapshot(),
            current_timestamp_ms(),
        )
    }

    /// Serialize the export document to a JSON string.
    pub fn export_json(&self) -> Result<String, TraceError> {
        Ok(serde_json::to_string_pretty(&self.export())?)
    }

    /// Write the export document to a file as JSON.
    pub fn export_to_file(&self, path: impl AsRef<std::path::Path>) -> Result<(), TraceError> {
        let json = self.export_json()?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Dispatch a control command received from a transport.
    pub fn handle_command(&self, command: Command) {
        match command {
            Command::StartTracing => {
                self.start_tracing();
            }
            Command::StopTracing => {
                self.stop_tracing();
            }
            Command::RunDiagnosis => {
                self.run_diagnosis();
            }
            Command::ClearGraph => self.clear(),
        }
    }

    /// End the session: stop tracing and uninstall every primitive.
    ///
    /// Wrappers obtained earlier keep working but forward calls unmodified,
    /// exactly as before the session started.
    pub fn shutdown(&self) {
        self.stop_tracing();
        self.registry.uninstall_all();
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for configuring a Session.
#[derive(Debug)]
pub struct SessionBuilder {
    program: String,
    outputs: Vec<Output>,
    lenient_connections: bool,
    builtin_patterns: bool,
}

impl SessionBuilder {
    /// Create a builder with default settings.
    pub fn new() -> Self {
        Self {
            program: "unnamed".to_owned(),
            outputs: Vec::new(),
            lenient_connections: false,
            builtin_patterns: true,
        }
    }

    /// Name of the traced program, recorded in export documents.
    pub fn program(mut self, name: impl Into<String>) -> Self {
        self.program = name.into();
        self
    }

    /// Add an output destination.
    ///
    /// Multiple outputs can be added; events are emitted to all of them.
    pub fn output(mut self, output: Output) -> Self {
        self.outputs.push(output);
        self
    }

    /// Drop connections referencing unknown nodes instead of rejecting them.
    ///
    /// Strict validation is the default: the engine creates both endpoints
    /// before any edge, so an unknown endpoint indicates a bug worth
    /// surfacing.
    pub fn lenient_connections(mut self, lenient: bool) -> Self {
        self.lenient_connections = lenient;
        self
    }

    /// Whether to register the built-in diagnosis patterns. Defaults to true.
    pub fn builtin_patterns(mut self, enabled: bool) -> Self {
        self.builtin_patterns = enabled;
        self
    }

    /// Build the session.
    pub fn build(self) -> Session {
        let engine = if self.builtin_patterns {
            DiagnosisEngine::with_builtins()
        } else {
            DiagnosisEngine::new()
        };
        Session {
            state: Arc::new(SessionState::new(self.lenient_connections)),
            outputs: Arc::new(self.outputs),
            registry: Arc::new(Registry::with_defaults()),
            engine,
            program: self.program,
        }
    }
}

impl Default for SessionBuilder {
    fn default() -> Self {
        Self::new()
    }
}
