//! Transparent interception of asynchronous primitives.
//!
//! Each wrapper follows the same contract: when its primitive is not
//! installed or tracing is inactive, the call is forwarded unmodified and
//! returns its exact result. When active, the wrapper records a call node
//! (plus a pre-call snapshot), invokes the original with the original
//! arguments, and records exactly one completion node and edge per firing -
//! then forwards the value or error unchanged. Errors are always re-returned
//! after recording, never swallowed; a failure inside the engine's own hooks
//! degrades and logs instead of reaching the monitored program.

use std::fmt::Display;
use std::future::Future;
use std::panic::Location;
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tracegraph_types::{
    current_timestamp_ms, CapturedVariables, Connection, ConnectionKind, Node, NodeId, NodeKind,
    SanitizedValue, SourceContext, TraceEvent, PROP_EXECUTION_ID,
};

use crate::output::Output;
use crate::registry::{Primitive, Registry};
use crate::state::SessionState;
use crate::store;
use crate::{locate, locate::INTERNAL_MARKER};

#[cfg(feature = "tokio")]
use std::time::Duration;

/// Labels longer than this are truncated with a trailing ellipsis.
pub const MAX_LABEL_LEN: usize = 64;

/// Wraps asynchronous primitives for one session.
///
/// Cheap to clone; obtain one from [`Session::interceptor`](crate::Session::interceptor)
/// and hand clones to whatever parts of the program route calls through it.
#[derive(Debug, Clone)]
pub struct Interceptor {
    pub(crate) state: Arc<SessionState>,
    pub(crate) outputs: Arc<Vec<Output>>,
    pub(crate) registry: Arc<Registry>,
}

impl Interceptor {
    fn active(&self, primitive: Primitive) -> bool {
        self.registry.is_installed(primitive) && self.state.is_tracing()
    }

    fn emit(&self, event: &TraceEvent) {
        for output in self.outputs.iter() {
            output.emit(event);
        }
    }

    fn record_node(&self, node: Node) {
        if let Some(graph) = self.state.add_node(node.clone()) {
            self.emit(&TraceEvent::NodeAdded { node, graph });
        }
    }

    fn record_connection(&self, connection: Connection) {
        match self.state.add_connection(connection.clone()) {
            Ok(Some(graph)) => self.emit(&TraceEvent::ConnectionAdded { connection, graph }),
            Ok(None) => {}
            // The engine creates both endpoints before the edge, so this is
            // unreachable in practice; degrade rather than unwind.
            Err(err) => tracing::warn!(error = %err, "dropping invalid connection"),
        }
    }

    fn record_completion(&self, call_id: &NodeId, node: Node, kind: ConnectionKind) {
        let to = node.id.clone();
        self.record_node(node);
        self.record_connection(Connection::new(call_id.clone(), to, kind));
    }

    /// Wrap a synchronous call.
    ///
    /// Records a `Call` node, runs `f`, then records a `Success` node with a
    /// `ReturnFlow` edge (or an `Error` node with an `ErrorFlow` edge) and
    /// forwards the result unchanged.
    #[track_caller]
    pub fn call<A, T, E, F>(&self, name: &str, args: &A, f: F) -> Result<T, E>
    where
        A: Serialize + ?Sized,
        E: Display,
        F: FnOnce() -> Result<T, E>,
    {
        if !self.active(Primitive::SyncCall) {
            return f();
        }

        let source = SourceContext::from(Location::caller());
        let call_id = self.state.next_node_id();
        self.state.capture(
            format!("{call_id}_start"),
            store::capture_arguments(args),
            vec![],
            Some(source.clone()),
        );
        self.record_node(
            Node::new(
                call_id.clone(),
                NodeKind::Call,
                call_label(name, args),
                current_timestamp_ms(),
            )
            .with_source(source)
            .with_property(PROP_EXECUTION_ID, call_id.as_str()),
        );

        let started = Instant::now();
        match f() {
            Ok(value) => {
                self.finish_call(&call_id, started, "ok");
                self.state.capture(
                    format!("{call_id}_response"),
                    CapturedVariables::from_return_value(SanitizedValue::summary(
                        std::any::type_name::<T>(),
                    )),
                    vec![],
                    None,
                );
                let node = Node::new(
                    self.state.next_node_id(),
                    NodeKind::Success,
                    "Returned",
                    current_timestamp_ms(),
                )
                .with_property(PROP_EXECUTION_ID, call_id.as_str());
                self.record_completion(&call_id, node, ConnectionKind::ReturnFlow);
                Ok(value)
            }
            Err(err) => {
                self.finish_call(&call_id, started, "error");
                self.record_error_completion(&call_id, &format!("Error: {err}"), &err);
                Err(err)
            }
        }
    }

    /// Wrap a network-style one-shot asynchronous call.
    ///
    /// Records an `AsyncCall` node labeled with the target, awaits the
    /// future, then records exactly one completion (`Success`/`DataFlow` or
    /// `Error`/`ErrorFlow`) and forwards the value or error unchanged.
    #[track_caller]
    pub fn async_call<T, E, F>(&self, target: &str, future: F) -> impl Future<Output = Result<T, E>>
    where
        E: Display,
        F: Future<Output = Result<T, E>>,
    {
        let engine = self.clone();
        let active = self.active(Primitive::AsyncCall);
        let source = SourceContext::from(Location::caller());
        let target = target.to_owned();

        async move {
            if !active {
                return future.await;
            }

            let call_id = engine.state.next_node_id();
            engine.state.capture(
                format!("{call_id}_start"),
                CapturedVariables::from_arguments(SanitizedValue::List(vec![
                    SanitizedValue::Text(target.clone()),
                ])),
                vec![],
                Some(source.clone()),
            );
            engine.record_node(
                Node::new(
                    call_id.clone(),
                    NodeKind::AsyncCall,
                    truncate_label(&format!("fetch(\"{target}\")")),
                    current_timestamp_ms(),
                )
                .with_source(source)
                .with_property("url", target.as_str())
                .with_property(PROP_EXECUTION_ID, call_id.as_str()),
            );

            let started = Instant::now();
            match future.await {
                Ok(value) => {
                    engine.finish_call(&call_id, started, "ok");
                    engine.state.capture(
                        format!("{call_id}_response"),
                        CapturedVariables::from_return_value(SanitizedValue::summary(
                            std::any::type_name::<T>(),
                        )),
                        vec![],
                        None,
                    );
                    let node = Node::new(
                        engine.state.next_node_id(),
                        NodeKind::Success,
                        "Response",
                        current_timestamp_ms(),
                    )
                    .with_property(PROP_EXECUTION_ID, call_id.as_str());
                    engine.record_completion(&call_id, node, ConnectionKind::DataFlow);
                    Ok(value)
                }
                Err(err) => {
                    engine.finish_call(&call_id, started, "error");
                    engine.record_error_completion(&call_id, &format!("Fetch Error: {err}"), &err);
                    Err(err)
                }
            }
        }
    }

    /// Wrap a one-shot deferred callback.
    ///
    /// Records a `Timer` node at scheduling time; when the delay elapses, a
    /// completion node and a `DataFlow` edge are recorded and the callback
    /// runs. The returned handle aborts the timer like the unwrapped
    /// primitive would.
    #[cfg(feature = "tokio")]
    #[track_caller]
    pub fn set_timeout<F>(&self, delay: Duration, callback: F) -> tokio::task::JoinHandle<()>
    where
        F: FnOnce() + Send + 'static,
    {
        if !self.active(Primitive::Timeout) {
            return tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                callback();
            });
        }

        let engine = self.clone();
        let call_id = self.schedule_timer("setTimeout", delay, Location::caller());
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            engine.record_timer_fired(&call_id);
            callback();
        })
    }

    /// Wrap a repeating deferred callback.
    ///
    /// One `Timer` node is recorded at scheduling time; every firing records
    /// its own completion node and `DataFlow` edge - a repeating timer fires
    /// once per connection it adds. Abort the returned handle to stop it.
    #[cfg(feature = "tokio")]
    #[track_caller]
    pub fn set_interval<F>(&self, period: Duration, mut callback: F) -> tokio::task::JoinHandle<()>
    where
        F: FnMut() + Send + 'static,
    {
        if !self.active(Primitive::Interval) {
            return tokio::spawn(async move {
                loop {
                    tokio::time::sleep(period).await;
                    callback();
                }
            });
        }

        let engine = self.clone();
        let call_id = self.schedule_timer("setInterval", period, Location::caller());
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(period).await;
                engine.record_timer_fired(&call_id);
                callback();
            }
        })
    }

    /// Wrap an event-listener callback.
    ///
    /// Registration records an `Event` node; every invocation of the
    /// returned closure records a completion node plus `DataFlow` edge,
    /// captures the payload, and then runs the original callback with the
    /// payload unchanged.
    #[track_caller]
    pub fn listener<P, F>(&self, event_name: &str, mut callback: F) -> impl FnMut(P)
    where
        P: Serialize,
        F: FnMut(P),
    {
        let registration = if self.active(Primitive::EventListener) {
            let source = SourceContext::from(Location::caller());
            let call_id = self.state.next_node_id();
            self.state.capture(
                format!("{call_id}_setup"),
                CapturedVariables::from_arguments(SanitizedValue::Text(event_name.to_owned())),
                vec![],
                Some(source.clone()),
            );
            self.record_node(
                Node::new(
                    call_id.clone(),
                    NodeKind::Event,
                    truncate_label(&format!("on(\"{event_name}\")")),
                    current_timestamp_ms(),
                )
                .with_source(source)
                .with_property("event", event_name)
                .with_property(PROP_EXECUTION_ID, call_id.as_str()),
            );
            Some(call_id)
        } else {
            None
        };

        let engine = self.clone();
        move |payload: P| {
            if let Some(call_id) = &registration {
                engine.state.capture(
                    format!("{call_id}_callback"),
                    store::capture_arguments(&payload),
                    vec![],
                    None,
                );
                let node = Node::new(
                    engine.state.next_node_id(),
                    NodeKind::Success,
                    "Event Fired",
                    current_timestamp_ms(),
                )
                .with_property(PROP_EXECUTION_ID, call_id.as_str());
                engine.record_completion(call_id, node, ConnectionKind::DataFlow);
            }
            callback(payload)
        }
    }

    /// Record an error reported by the host program itself.
    ///
    /// This is the ingestion path for uncorrelated faults (uncaught errors,
    /// unhandled rejections) that arrive with a textual stack. The source is
    /// located from the stack; no edge is created.
    pub fn record_host_error(&self, message: &str, stack: &[String]) -> Option<NodeId> {
        if !self.active(Primitive::HostError) {
            return None;
        }

        let source = locate::locate(stack.iter().map(String::as_str), INTERNAL_MARKER);
        let node = Node::new(
            self.state.next_node_id(),
            NodeKind::Error,
            truncate_label(&format!("Global Error: {message}")),
            current_timestamp_ms(),
        )
        .with_source(source)
        .with_property("message", message);
        let id = node.id.clone();

        self.state.capture(
            format!("{id}_error"),
            CapturedVariables {
                error: Some(message.to_owned()),
                ..CapturedVariables::default()
            },
            stack.to_vec(),
            None,
        );
        self.record_node(node);
        Some(id)
    }

    /// Record an application-defined event as a `Custom` node.
    pub fn record_custom(&self, label: &str) -> Option<NodeId> {
        if !self.state.is_tracing() {
            return None;
        }
        let node = Node::new(
            self.state.next_node_id(),
            NodeKind::Custom,
            truncate_label(label),
            current_timestamp_ms(),
        );
        let id = node.id.clone();
        self.record_node(node);
        Some(id)
    }

    /// Attach completion fields to the call node (keyed, targeted update).
    fn finish_call(&self, call_id: &NodeId, started: Instant, status: &str) {
        let duration_ms = started.elapsed().as_millis() as u64;
        let status = status.to_owned();
        self.state.update_node(call_id, move |node| {
            node.set_property("status", status);
            node.set_property("duration_ms", duration_ms);
        });
    }

    fn record_error_completion(&self, call_id: &NodeId, label: &str, err: &dyn Display) {
        self.state.capture(
            format!("{call_id}_error"),
            CapturedVariables {
                error: Some(err.to_string()),
                ..CapturedVariables::default()
            },
            vec![],
            None,
        );
        let node = Node::new(
            self.state.next_node_id(),
            NodeKind::Error,
            truncate_label(label),
            current_timestamp_ms(),
        )
        .with_property(PROP_EXECUTION_ID, call_id.as_str());
        self.record_completion(call_id, node, ConnectionKind::ErrorFlow);
    }

    #[cfg(feature = "tokio")]
    fn schedule_timer(
        &self,
        name: &str,
        delay: Duration,
        caller: &'static Location<'static>,
    ) -> NodeId {
        let source = SourceContext::from(caller);
        let call_id = self.state.next_node_id();
        let delay_ms = delay.as_millis() as u64;
        self.state.capture(
            format!("{call_id}_setup"),
            CapturedVariables::from_arguments(SanitizedValue::List(vec![SanitizedValue::Int(
                delay_ms as i64,
            )])),
            vec![],
            Some(source.clone()),
        );
        self.record_node(
            Node::new(
                call_id.clone(),
                NodeKind::Timer,
                format!("{name}({delay_ms}ms)"),
                current_timestamp_ms(),
            )
            .with_source(source)
            .with_property("delay_ms", delay_ms)
            .with_property(PROP_EXECUTION_ID, call_id.as_str()),
        );
        call_id
    }

    #[cfg(feature = "tokio")]
    fn record_timer_fired(&self, call_id: &NodeId) {
        self.state
            .capture(format!("{call_id}_callback"), CapturedVariables::default(), vec![], None);
        let node = Node::new(
            self.state.next_node_id(),
            NodeKind::Success,
            "Timer Executed",
            current_timestamp_ms(),
        )
        .with_property(PROP_EXECUTION_ID, call_id.as_str());
        self.record_completion(call_id, node, ConnectionKind::DataFlow);
    }
}

fn call_label<A>(name: &str, args: &A) -> String
where
    A: Serialize + ?Sized,
{
    let summary = serde_json::to_string(args).unwrap_or_else(|_| "...".to_owned());
    truncate_label(&format!("{name}({summary})"))
}

fn truncate_label(label: &str) -> String {
    if label.chars().count() <= MAX_LABEL_LEN {
        return label.to_owned();
    }
    let mut out: String = label.chars().take(MAX_LABEL_LEN).collect();
    out.push_str("...");
    out
}
