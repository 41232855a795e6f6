//! Example: Tracing a small async program
//!
//! This example routes a handful of asynchronous operations through a
//! session's interceptor, then prints the resulting causal graph and the
//! diagnosis report.
//!
//! This is useful when you want to see:
//! - How call and completion nodes pair up through causal edges
//! - How a failed call surfaces in the diagnosis pass
//! - What the export document looks like
//!
//! # Usage
//!
//! ```bash
//! cargo run --example traced_program
//! ```

use std::time::Duration;

use tracegraph_sdk::{Output, Session};

#[tokio::main]
async fn main() {
    let (output, mut events) = Output::channel(64);
    let session = Session::builder()
        .program("traced-program")
        .output(output)
        .build();
    session.start_tracing();

    // Drain the event stream in the background, like a renderer would.
    let stream = tokio::spawn(async move {
        let mut count = 0usize;
        while let Some(_event) = events.recv().await {
            count += 1;
        }
        count
    });

    let tracer = session.interceptor();

    // A successful network-style call.
    let users: Result<u16, String> = tracer
        .async_call("https://api.example/users", async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            Ok(200)
        })
        .await;
    println!("users -> {users:?}");

    // A failing one, fired in tight succession with the first.
    let orders: Result<u16, String> = tracer
        .async_call("https://api.example/orders", async {
            Err("connection refused".to_owned())
        })
        .await;
    println!("orders -> {orders:?}");

    // A one-shot timer.
    let timer = tracer.set_timeout(Duration::from_millis(10), || {
        println!("timer fired");
    });
    let _ = timer.await;

    // An event listener, dispatched twice.
    let mut on_click = tracer.listener("click", |button: u8| {
        println!("clicked button {button}");
    });
    on_click(0);
    on_click(1);

    session.stop_tracing();

    let graph = session.graph_snapshot();
    println!("\nGraph: {} nodes, {} connections", graph.node_count(), graph.connection_count());
    for node in &graph.nodes {
        println!("  [{:?}] {}", node.kind, node.label);
    }

    println!("\nDiagnosis:");
    for diagnosis in session.run_diagnosis() {
        println!("  [{:?}] {}: {}", diagnosis.severity, diagnosis.diagnosis_type, diagnosis.solution);
    }

    let doc = session.export();
    println!(
        "\nExport: program={} nodes={} connections={}",
        doc.program, doc.metadata.total_nodes, doc.metadata.total_connections
    );

    session.shutdown();
    // Drop every sender so the stream task sees the channel close.
    drop(on_click);
    drop(tracer);
    drop(session);
    println!("\n{} events were streamed", stream.await.unwrap_or(0));
}
