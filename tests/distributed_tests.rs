//! Rank backends agree with the shared-memory backend
//!
//! Every test slices one graph over a `ThreadCluster` and compares each
//! rank's result with a single-address-space run.

mod common;

use common::{lcg_graph, to_text};
use frontier_graph::algorithms::{
    bellman_ford, bellman_ford_on, bfs, bfs_on, connected_components, connected_components_on,
    pagerank_on, pagerank_with_config,
};
use frontier_graph::comm::{Communicator, ReduceOp, ThreadCluster};
use frontier_graph::storage::Adjacency;
use frontier_graph::{
    CsrGraph, DirectionPolicy, EngineConfig, GraphError, GraphSlice, Layout, NodeId,
    PageRankConfig, Partition, TextFormat,
};

fn slice(graph: &CsrGraph, rank: usize, ranks: usize) -> GraphSlice {
    GraphSlice::from_graph(graph, Partition::new(rank, ranks, graph.num_nodes()).unwrap())
}

#[test]
fn test_bfs_matches_shared_memory() {
    let graph = lcg_graph(200, 3, 1);
    let expected = bfs(&graph, NodeId(0)).unwrap().distances;

    for (ranks, threads) in [(1, 1), (2, 1), (3, 2), (4, 1), (7, 1)] {
        let results = ThreadCluster::new(ranks, threads)
            .run(|comm| {
                let slice = slice(&graph, comm.rank(), comm.ranks());
                Ok(bfs_on(&slice, comm, NodeId(0), EngineConfig::default())?.distances)
            })
            .unwrap();

        assert_eq!(results.len(), ranks);
        for distances in results {
            assert_eq!(distances, expected, "{ranks} ranks x {threads} threads");
        }
    }
}

#[test]
fn test_forced_directions_on_ranks() {
    let graph = lcg_graph(120, 2, 9);
    let expected = bellman_ford(&graph, NodeId(5)).unwrap().distances;

    for policy in [DirectionPolicy::AlwaysSparse, DirectionPolicy::AlwaysDense] {
        let config = EngineConfig::default().with_policy(policy);
        let results = ThreadCluster::new(3, 1)
            .run(|comm| {
                let slice = slice(&graph, comm.rank(), comm.ranks());
                Ok(bellman_ford_on(&slice, comm, NodeId(5), config)?.distances)
            })
            .unwrap();

        for distances in results {
            assert_eq!(distances, expected, "{policy:?}");
        }
    }
}

#[test]
fn test_negative_cycle_reported_on_every_rank() {
    let graph = CsrGraph::from_weighted_edges(
        6,
        &[(0, 1, 2), (1, 2, 2), (2, 3, -1), (3, 1, -2), (4, 5, 1)],
    )
    .unwrap();
    assert!(bellman_ford(&graph, NodeId(0)).unwrap().negative_cycle);

    let flags = ThreadCluster::new(3, 1)
        .run(|comm| {
            let slice = slice(&graph, comm.rank(), comm.ranks());
            Ok(bellman_ford_on(&slice, comm, NodeId(0), EngineConfig::default())?.negative_cycle)
        })
        .unwrap();
    assert_eq!(flags, vec![true, true, true]);
}

#[test]
fn test_components_matches_shared_memory() {
    // Sparse graph: many small components
    let graph = lcg_graph(300, 1, 4);
    let expected = connected_components(&graph).unwrap().labels;

    let results = ThreadCluster::new(4, 2)
        .run(|comm| {
            let slice = slice(&graph, comm.rank(), comm.ranks());
            Ok(connected_components_on(&slice, comm, EngineConfig::default())?.labels)
        })
        .unwrap();

    for labels in results {
        assert_eq!(labels, expected);
    }
}

#[test]
fn test_pagerank_matches_shared_memory() {
    let graph = lcg_graph(150, 2, 21);
    let config = PageRankConfig::default()
        .with_max_iterations(25)
        .with_tolerance(0.0);
    let expected = pagerank_with_config(&graph, config).unwrap();

    let results = ThreadCluster::new(3, 2)
        .run(|comm| {
            let slice = slice(&graph, comm.rank(), comm.ranks());
            pagerank_on(&slice, comm, config)
        })
        .unwrap();

    for result in results {
        assert_eq!(result.iterations, expected.iterations);
        for (a, e) in result.scores.iter().zip(&expected.scores) {
            assert!((a - e).abs() < 1e-12, "{a} vs {e}");
        }
    }
}

#[test]
fn test_more_ranks_than_vertices() {
    let graph = CsrGraph::from_edges(3, &[(0, 1), (1, 2)]).unwrap();

    let results = ThreadCluster::new(5, 1)
        .run(|comm| {
            let slice = slice(&graph, comm.rank(), comm.ranks());
            let distances = bfs_on(&slice, comm, NodeId(0), EngineConfig::default())?.distances;
            let labels = connected_components_on(&slice, comm, EngineConfig::default())?.labels;
            Ok((distances, labels))
        })
        .unwrap();

    for (distances, labels) in results {
        assert_eq!(distances, vec![0, 1, 2]);
        assert_eq!(labels, vec![0, 0, 0]);
    }
}

#[test]
fn test_parsed_slices_cover_the_graph() {
    let graph = lcg_graph(80, 3, 17);
    let format = TextFormat::new().with_weighted(true);

    for layout in [Layout::Dual, Layout::OutOnly] {
        let text = to_text(&graph, layout);
        let degrees = ThreadCluster::new(4, 1)
            .run(|comm| {
                let slice = GraphSlice::parse_text(
                    &text,
                    format.with_layout(layout),
                    comm.rank(),
                    comm.ranks(),
                )?;
                // No asserts in here: a panicking rank would leave its peers waiting
                let matches = slice.owned().all(|v| {
                    let v = v as u32;
                    slice.out_neighbors(v) == graph.out_neighbors(v)
                        && slice.in_neighbors(v) == graph.in_neighbors(v)
                });
                let edges: usize = slice.owned().map(|v| slice.out_degree(v as u32)).sum();
                Ok((matches, comm.all_reduce_scalar(edges, ReduceOp::Sum)))
            })
            .unwrap();

        assert_eq!(degrees, vec![(true, graph.num_edges()); 4], "{layout:?}");
    }
}

#[test]
fn test_slice_owns_only_its_range() {
    let graph = lcg_graph(10, 2, 2);
    let slice = slice(&graph, 1, 3);

    assert_eq!(slice.owned_range(), 3..6);
    assert!(slice.owns(3) && slice.owns(5));
    assert!(!slice.owns(2) && !slice.owns(6));
    assert_eq!(slice.partition().owner_of(9), 2);
}

#[test]
fn test_bad_root_fails_every_rank() {
    let graph = lcg_graph(20, 2, 3);

    let err = ThreadCluster::new(2, 1)
        .run(|comm| {
            let slice = slice(&graph, comm.rank(), comm.ranks());
            Ok(bfs_on(&slice, comm, NodeId(20), EngineConfig::default())?.distances)
        })
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<GraphError>(),
        Some(GraphError::VertexOutOfRange { vertex: 20, .. })
    ));
}
