//! Helpers shared by the integration suites

#![allow(dead_code)]

use frontier_graph::storage::AdjacencyBlock;
use frontier_graph::{CsrGraph, Layout, VertexId, Weight};
use std::fmt::Write;
use std::path::{Path, PathBuf};

/// Render a graph in the text format
pub fn to_text(graph: &CsrGraph, layout: Layout) -> String {
    let mut text = format!("{} {}\n", graph.num_nodes(), graph.num_edges());
    write_block(&mut text, graph.out_adjacency());
    if layout == Layout::Dual {
        write_block(&mut text, graph.in_adjacency());
    }
    text
}

fn write_block(text: &mut String, block: &AdjacencyBlock) {
    let offsets: Vec<String> = block.offsets.iter().map(ToString::to_string).collect();
    writeln!(text, "{}", offsets.join(" ")).unwrap();

    let edges: Vec<String> = match &block.weights {
        Some(weights) => block
            .targets
            .iter()
            .zip(weights)
            .map(|(t, w)| format!("{t} {w}"))
            .collect(),
        None => block.targets.iter().map(ToString::to_string).collect(),
    };
    writeln!(text, "{}", edges.join(" ")).unwrap();
}

/// Write `text` to `dir/name` and return the path
pub fn write_graph(dir: &Path, name: &str, text: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, text).unwrap();
    path
}

/// Pseudo-random directed graph (LCG for reproducibility)
pub fn lcg_edges(num_nodes: usize, edges_per_node: usize, seed: u64) -> Vec<(VertexId, VertexId, Weight)> {
    let mut state = seed;
    let mut edges = Vec::new();
    for node in 0..num_nodes {
        for _ in 0..edges_per_node {
            state = state.wrapping_mul(6_364_136_223_846_793_005).wrapping_add(1_442_695_040_888_963_407);
            let target = ((state >> 33) % num_nodes as u64) as VertexId;
            let weight = ((state >> 17) % 9) as Weight + 1;
            edges.push((node as VertexId, target, weight));
        }
    }
    edges
}

/// Weighted graph built from [`lcg_edges`]
pub fn lcg_graph(num_nodes: usize, edges_per_node: usize, seed: u64) -> CsrGraph {
    CsrGraph::from_weighted_edges(num_nodes, &lcg_edges(num_nodes, edges_per_node, seed)).unwrap()
}
