//! Output destinations for the trace event stream.
//!
//! Emission is synchronous: interception hooks run at the monitored
//! program's own suspension boundaries and must not introduce new ones.
//! Emission failures degrade with a log line - a broken output never
//! surfaces inside the monitored program.

use std::fs::OpenOptions;
use std::io::Write;
use std::net::TcpStream;
use std::path::PathBuf;

use parking_lot::Mutex;
use tracegraph_types::TraceEvent;

/// Output destination for trace events.
#[derive(Debug)]
pub enum Output {
    /// Append events to a file, one JSON document per line.
    File(PathBuf),

    /// Send events to a TCP server as newline-delimited JSON.
    ///
    /// The connection is established lazily on first emit and re-established
    /// after a write failure.
    Tcp(TcpOutput),

    /// Send events through a channel.
    ///
    /// Use `Output::channel()` to create this variant and get the receiver.
    /// Events are dropped (with a log line) when the channel is full.
    #[cfg(feature = "tokio")]
    Channel(tokio::sync::mpsc::Sender<TraceEvent>),
}

/// Lazily connected TCP sink.
#[derive(Debug)]
pub struct TcpOutput {
    addr: String,
    stream: Mutex<Option<TcpStream>>,
}

impl Output {
    /// Create a file output.
    ///
    /// # Example
    ///
    /// ```rust
    /// use tracegraph_sdk::Output;
    ///
    /// let output = Output::file("trace.jsonl");
    /// ```
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Output::File(path.into())
    }

    /// Create a TCP output.
    ///
    /// # Example
    ///
    /// ```rust
    /// use tracegraph_sdk::Output;
    ///
    /// let output = Output::tcp("localhost:9090");
    /// ```
    pub fn tcp(addr: impl Into<String>) -> Self {
        Output::Tcp(TcpOutput {
            addr: addr.into(),
            stream: Mutex::new(None),
        })
    }

    /// Create a channel output and return both the output and receiver.
    ///
    /// This is how an in-process renderer or transport subscribes to the
    /// event stream.
    ///
    /// # Example
    ///
    /// ```rust
    /// use tracegraph_sdk::Output;
    ///
    /// let (output, mut rx) = Output::channel(64);
    ///
    /// // Later, receive events
    /// // while let Some(event) = rx.recv().await { ... }
    /// ```
    #[cfg(feature = "tokio")]
    pub fn channel(buffer: usize) -> (Self, tokio::sync::mpsc::Receiver<TraceEvent>) {
        let (tx, rx) = tokio::sync::mpsc::channel(buffer);
        (Output::Channel(tx), rx)
    }

    /// Emit one event, degrading on failure.
    pub fn emit(&self, event: &TraceEvent) {
        let result = match self {
            Output::File(path) => emit_file(path, event),
            Output::Tcp(tcp) => tcp.emit(event),
            #[cfg(feature = "tokio")]
            Output::Channel(tx) => {
                if tx.try_send(event.clone()).is_err() {
                    tracing::warn!("trace event channel full or closed, dropping event");
                }
                Ok(())
            }
        };

        if let Err(err) = result {
            tracing::warn!(error = %err, "failed to emit trace event");
        }
    }
}

fn emit_file(path: &PathBuf, event: &TraceEvent) -> std::io::Result<()> {
    let line = serde_json::to_string(event)?;
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    file.write_all(line.as_bytes())?;
    file.write_all(b"\n")
}

impl TcpOutput {
    fn emit(&self, event: &TraceEvent) -> std::io::Result<()> {
        let line = serde_json::to_string(event)?;
        let mut guard = self.stream.lock();

        let stream = match &mut *guard {
            Some(stream) => stream,
            slot @ None => slot.insert(TcpStream::connect(&self.addr)?),
        };
        let result = stream
            .write_all(line.as_bytes())
            .and_then(|()| stream.write_all(b"\n"));

        if result.is_err() {
            // Drop the broken connection; the next emit reconnects.
            *guard = None;
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracegraph_types::{GraphSnapshot, Node, NodeKind};

    fn sample_event() -> TraceEvent {
        TraceEvent::NodeAdded {
            node: Node::new("n", NodeKind::Call, "f()", 0),
            graph: GraphSnapshot::default(),
        }
    }

    #[test]
    fn file_output_appends_json_lines() {
        let dir = std::env::temp_dir().join(format!("tracegraph-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("events.jsonl");

        let output = Output::file(&path);
        output.emit(&sample_event());
        output.emit(&sample_event());

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        let parsed: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(parsed["event"], "NODE_ADDED");

        std::fs::remove_dir_all(&dir).ok();
    }

    #[cfg(feature = "tokio")]
    #[test]
    fn channel_output_delivers_events() {
        let (output, mut rx) = Output::channel(4);
        output.emit(&sample_event());

        let received = rx.try_recv().unwrap();
        assert_eq!(received, sample_event());
    }

    #[cfg(feature = "tokio")]
    #[test]
    fn full_channel_drops_without_panicking() {
        let (output, _rx) = Output::channel(1);
        output.emit(&sample_event());
        output.emit(&sample_event()); // buffer full, dropped
    }

    #[test]
    fn unreachable_tcp_degrades() {
        // Port 9 on localhost is almost certainly closed; emit must not panic.
        let output = Output::tcp("127.0.0.1:9");
        output.emit(&sample_event());
    }
}
