use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use tracegraph_sdk::{Connection, ConnectionKind, GraphModel, Node, NodeKind, Session};

/// Benchmark appending nodes to the graph at varying graph sizes
fn bench_node_append(c: &mut Criterion) {
    let mut group = c.benchmark_group("node_append");

    for size in [100, 1_000, 10_000].iter() {
        group.throughput(Throughput::Elements(*size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            b.iter(|| {
                let mut graph = GraphModel::new();
                for i in 0..size {
                    graph.add_node(black_box(Node::new(
                        format!("node_{i}_0"),
                        NodeKind::AsyncCall,
                        "fetch(\"/api\")",
                        i as u64,
                    )));
                }
            });
        });
    }
    group.finish();
}

/// Benchmark connection validation against an existing node set
fn bench_connection_append(c: &mut Criterion) {
    let mut group = c.benchmark_group("connection_append");

    for size in [100, 1_000].iter() {
        group.throughput(Throughput::Elements(*size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            b.iter(|| {
                let mut graph = GraphModel::new();
                for i in 0..=size {
                    graph.add_node(Node::new(format!("node_{i}_0"), NodeKind::Call, "f()", 0));
                }
                for i in 0..size {
                    graph
                        .add_connection(black_box(Connection::new(
                            format!("node_{i}_0"),
                            format!("node_{}_0", i + 1),
                            ConnectionKind::DataFlow,
                        )))
                        .unwrap();
                }
            });
        });
    }
    group.finish();
}

/// Benchmark the sync-call wrapper against the bare closure
fn bench_call_wrapper_overhead(c: &mut Criterion) {
    let mut group = c.benchmark_group("call_wrapper");

    group.bench_function("active", |b| {
        let session = Session::new();
        session.start_tracing();
        let tracer = session.interceptor();
        b.iter(|| {
            let result: Result<u64, String> =
                tracer.call("work", &black_box(7u64), || Ok(black_box(42)));
            black_box(result)
        });
    });

    group.bench_function("inactive", |b| {
        let session = Session::new();
        let tracer = session.interceptor();
        b.iter(|| {
            let result: Result<u64, String> =
                tracer.call("work", &black_box(7u64), || Ok(black_box(42)));
            black_box(result)
        });
    });

    group.finish();
}

/// Benchmark a full diagnosis pass over timelines of varying length
fn bench_diagnosis_run(c: &mut Criterion) {
    let mut group = c.benchmark_group("diagnosis_run");

    for size in [10, 100, 1_000].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            let session = Session::new();
            session.start_tracing();
            let tracer = session.interceptor();
            for i in 0..size {
                let result: Result<u64, String> = tracer.call("work", &(i as u64), || Ok(1));
                let _ = result;
            }
            session.stop_tracing();

            b.iter(|| black_box(session.run_diagnosis()));
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_node_append,
    bench_connection_append,
    bench_call_wrapper_overhead,
    bench_diagnosis_run
);
criterion_main!(benches);
