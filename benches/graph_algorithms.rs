//! Criterion benchmarks for graph algorithms
//!
//! Covers:
//! - CSR construction and text parsing
//! - BFS / Bellman-Ford / connected components per direction policy
//! - `PageRank` power iteration
//! - Rank backends against the shared-memory backend

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use frontier_graph::algorithms::{
    bellman_ford_with_config, bfs_on, bfs_with_config, connected_components_with_config,
};
use frontier_graph::comm::{Communicator, ThreadCluster};
use frontier_graph::{
    pagerank, CsrGraph, DirectionPolicy, EngineConfig, GraphSlice, Layout, NodeId, Partition,
    TextFormat, VertexId, Weight,
};
use std::hint::black_box;

/// Generate scale-free-ish graph (LCG targets skewed towards low ids)
fn generate_graph(num_nodes: usize, edges_per_node: usize) -> Vec<(VertexId, VertexId, Weight)> {
    let mut edges = Vec::with_capacity(num_nodes * edges_per_node);
    let mut rng_state = 12345_u64; // Simple LCG for reproducibility

    for node in 0..num_nodes {
        for _ in 0..edges_per_node {
            rng_state = rng_state.wrapping_mul(1_103_515_245).wrapping_add(12345);
            let a = (rng_state >> 16) % num_nodes as u64;
            rng_state = rng_state.wrapping_mul(1_103_515_245).wrapping_add(12345);
            let b = (rng_state >> 16) % num_nodes as u64;
            let target = a.min(b) as VertexId;
            let weight = (rng_state % 16) as Weight + 1;

            if target != node as VertexId {
                edges.push((node as VertexId, target, weight));
            }
        }
    }

    edges
}

fn graph(num_nodes: usize, edges_per_node: usize) -> CsrGraph {
    CsrGraph::from_weighted_edges(num_nodes, &generate_graph(num_nodes, edges_per_node)).unwrap()
}

fn text_of(graph: &CsrGraph) -> String {
    let mut text = format!("{} {}\n", graph.num_nodes(), graph.num_edges());
    let block = graph.out_adjacency();
    for offset in &block.offsets {
        text.push_str(&offset.to_string());
        text.push(' ');
    }
    text.push('\n');
    for target in &block.targets {
        text.push_str(&target.to_string());
        text.push(' ');
    }
    text.push('\n');
    text
}

const POLICIES: [(&str, DirectionPolicy); 3] = [
    ("adaptive", DirectionPolicy::Adaptive),
    ("sparse", DirectionPolicy::AlwaysSparse),
    ("dense", DirectionPolicy::AlwaysDense),
];

/// Benchmark: CSR construction from edge list
fn bench_csr_construction(c: &mut Criterion) {
    let mut group = c.benchmark_group("csr_construction");

    for size in [1_000, 10_000, 100_000] {
        let edges = generate_graph(size, 8);

        group.bench_with_input(BenchmarkId::new("from_weighted_edges", size), &edges, |b, edges| {
            b.iter(|| {
                let graph = CsrGraph::from_weighted_edges(size, black_box(edges)).unwrap();
                black_box(graph);
            });
        });
    }

    group.finish();
}

/// Benchmark: text parsing with in-adjacency derived on load
fn bench_parse_text(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse_text");
    let format = TextFormat::new().with_layout(Layout::OutOnly);

    for size in [10_000, 100_000] {
        let text = text_of(&graph(size, 8));

        group.bench_with_input(BenchmarkId::new("out_only", size), &text, |b, text| {
            b.iter(|| {
                let graph = CsrGraph::parse_text(black_box(text), format).unwrap();
                black_box(graph);
            });
        });
    }

    group.finish();
}

/// Benchmark: BFS per direction policy
fn bench_bfs(c: &mut Criterion) {
    let mut group = c.benchmark_group("bfs");

    for size in [10_000, 100_000] {
        let graph = graph(size, 8);

        for (name, policy) in POLICIES {
            let config = EngineConfig::default().with_policy(policy);
            group.bench_with_input(BenchmarkId::new(name, size), &graph, |b, graph| {
                b.iter(|| {
                    let result = bfs_with_config(black_box(graph), NodeId(0), config).unwrap();
                    black_box(result);
                });
            });
        }
    }

    group.finish();
}

/// Benchmark: Bellman-Ford per direction policy
fn bench_bellman_ford(c: &mut Criterion) {
    let mut group = c.benchmark_group("bellman_ford");
    let graph = graph(20_000, 8);

    for (name, policy) in POLICIES {
        let config = EngineConfig::default().with_policy(policy);
        group.bench_function(name, |b| {
            b.iter(|| {
                let result = bellman_ford_with_config(black_box(&graph), NodeId(0), config).unwrap();
                black_box(result);
            });
        });
    }

    group.finish();
}

/// Benchmark: connected components per direction policy
fn bench_components(c: &mut Criterion) {
    let mut group = c.benchmark_group("connected_components");
    let graph = graph(50_000, 2);

    for (name, policy) in POLICIES {
        let config = EngineConfig::default().with_policy(policy);
        group.bench_function(name, |b| {
            b.iter(|| {
                let result = connected_components_with_config(black_box(&graph), config).unwrap();
                black_box(result);
            });
        });
    }

    group.finish();
}

/// Benchmark: PageRank algorithm
fn bench_pagerank(c: &mut Criterion) {
    let mut group = c.benchmark_group("pagerank");

    for size in [1_000, 10_000, 100_000] {
        let graph = graph(size, 8);

        group.bench_with_input(BenchmarkId::new("20_iterations", size), &graph, |b, graph| {
            b.iter(|| {
                let scores = pagerank(black_box(graph), 20, 0.0).unwrap();
                black_box(scores);
            });
        });
    }

    group.finish();
}

/// Benchmark: BFS on rank backends
fn bench_ranks(c: &mut Criterion) {
    let mut group = c.benchmark_group("bfs_ranks");
    let graph = graph(100_000, 8);

    for (ranks, threads) in [(1, 4), (2, 2), (4, 1)] {
        let cluster = ThreadCluster::new(ranks, threads);
        let slices: Vec<GraphSlice> = (0..ranks)
            .map(|rank| {
                let partition = Partition::new(rank, ranks, graph.num_nodes()).unwrap();
                GraphSlice::from_graph(&graph, partition)
            })
            .collect();

        group.bench_function(format!("{ranks}x{threads}"), |b| {
            b.iter(|| {
                let results = cluster
                    .run(|comm| {
                        let slice = &slices[comm.rank()];
                        Ok(bfs_on(slice, comm, NodeId(0), EngineConfig::default())?.rounds.len())
                    })
                    .unwrap();
                black_box(results);
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_csr_construction,
    bench_parse_text,
    bench_bfs,
    bench_bellman_ford,
    bench_components,
    bench_pagerank,
    bench_ranks
);
criterion_main!(benches);
