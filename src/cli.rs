//! Shared driver for the command-line tools
//!
//! Every binary (`bfs`, `bellman-ford`, `connected-components`, `pagerank`,
//! `graph-scan`) is a one-line `main` calling [`main_for`]. The driver parses
//! arguments, installs logging on stderr, loads the graph, runs the algorithm
//! on the selected backend and prints either the elapsed seconds or the full
//! result array on stdout.
//!
//! ```bash
//! # Time a BFS from vertex 0 on 8 threads
//! bfs graph.txt 0 --threads 8
//!
//! # Bellman-Ford on 4 ranks of 2 threads each, checked against the reference
//! bellman-ford weighted.txt 0 --weighted --backend hybrid --ranks 4 --threads 2 --verify
//! ```

use crate::algorithms::verify::{
    first_mismatch, reference_bellman_ford, reference_bfs, reference_components,
    reference_pagerank,
};
use crate::algorithms::{
    bellman_ford_on, bfs_on, connected_components_on, pagerank_on, BfsResult, Components,
    PageRank, PageRankConfig, ShortestPaths,
};
use crate::comm::{Communicator, ReduceOp, ThreadCluster};
use crate::engine::{DirectionPolicy, EngineConfig, DEFAULT_THRESHOLD_DENOM, INFINITY};
use crate::storage::text::read_file;
use crate::storage::{Adjacency, AdjacencyBlock, CsrGraph, GraphSlice, Layout, NodeId, TextFormat};
use anyhow::{anyhow, bail, ensure, Context, Result};
use clap::{Parser, ValueEnum};
use rayon::prelude::*;
use std::fmt::Display;
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

/// The five tools
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tool {
    /// `bfs <graph> <root>`
    Bfs,
    /// `bellman-ford <graph> <root>`
    BellmanFord,
    /// `connected-components <graph> <repetitions>`
    ConnectedComponents,
    /// `pagerank <graph> <iterations>`
    PageRank,
    /// `graph-scan <graph>`
    GraphScan,
}

impl Tool {
    /// Binary name
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Bfs => "bfs",
            Self::BellmanFord => "bellman-ford",
            Self::ConnectedComponents => "connected-components",
            Self::PageRank => "pagerank",
            Self::GraphScan => "graph-scan",
        }
    }

    /// One-line usage string
    #[must_use]
    pub const fn usage(self) -> &'static str {
        match self {
            Self::Bfs => "Usage: bfs <path_to_graph> <root_vertex_id> [OPTIONS]",
            Self::BellmanFord => "Usage: bellman-ford <path_to_graph> <root_vertex_id> [OPTIONS]",
            Self::ConnectedComponents => {
                "Usage: connected-components <path_to_graph> <num_iterations> [OPTIONS]"
            }
            Self::PageRank => "Usage: pagerank <path_to_graph> <num_iterations> [OPTIONS]",
            Self::GraphScan => "Usage: graph-scan <path_to_graph> [OPTIONS]",
        }
    }

    /// Whether the tool takes the second positional argument
    #[must_use]
    pub const fn takes_value(self) -> bool {
        !matches!(self, Self::GraphScan)
    }
}

/// Where the computation runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Backend {
    /// One address space, one rayon pool
    Shared,
    /// Several ranks, one worker thread each
    Distributed,
    /// Several ranks, several worker threads each
    Hybrid,
}

/// Input file layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LayoutArg {
    /// Out-adjacency followed by in-adjacency
    Dual,
    /// Out-adjacency only; in-adjacency derived on load
    OutOnly,
}

impl From<LayoutArg> for Layout {
    fn from(arg: LayoutArg) -> Self {
        match arg {
            LayoutArg::Dual => Self::Dual,
            LayoutArg::OutOnly => Self::OutOnly,
        }
    }
}

/// Traversal direction policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DirectionArg {
    /// Switch per round on frontier size
    Adaptive,
    /// Always push from the frontier
    Sparse,
    /// Always pull into every vertex
    Dense,
}

impl From<DirectionArg> for DirectionPolicy {
    fn from(arg: DirectionArg) -> Self {
        match arg {
            DirectionArg::Adaptive => Self::Adaptive,
            DirectionArg::Sparse => Self::AlwaysSparse,
            DirectionArg::Dense => Self::AlwaysDense,
        }
    }
}

/// Arguments shared by every tool
#[derive(Debug, Clone, Parser)]
#[command(author, version, about = "Direction-optimizing parallel graph algorithms")]
pub struct ToolArgs {
    /// Graph file
    pub graph: PathBuf,

    /// Root vertex id (bfs, bellman-ford) or iteration count (connected-components, pagerank)
    pub value: Option<u64>,

    /// Input layout
    #[arg(long, value_enum, default_value = "dual")]
    pub layout: LayoutArg,

    /// Edges carry weights
    #[arg(long)]
    pub weighted: bool,

    /// Execution backend
    #[arg(long, value_enum, default_value = "shared")]
    pub backend: Backend,

    /// Ranks for the distributed and hybrid backends
    #[arg(long, default_value_t = 2)]
    pub ranks: usize,

    /// Worker threads (shared: pool size, hybrid: per rank)
    #[arg(long)]
    pub threads: Option<usize>,

    /// Push while the frontier is smaller than `num_nodes / N`
    #[arg(long, default_value_t = DEFAULT_THRESHOLD_DENOM)]
    pub threshold_denom: usize,

    /// Direction policy
    #[arg(long, value_enum, default_value = "adaptive")]
    pub direction: DirectionArg,

    /// `PageRank` convergence tolerance (L1)
    #[arg(long, default_value_t = 1e-4)]
    pub tolerance: f64,

    /// Print the result array instead of the elapsed time
    #[arg(long)]
    pub print: bool,

    /// Check the result against the sequential reference
    #[arg(long)]
    pub verify: bool,

    /// Debug logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl ToolArgs {
    fn text_format(&self) -> TextFormat {
        TextFormat::new()
            .with_layout(self.layout.into())
            .with_weighted(self.weighted)
    }

    fn engine_config(&self) -> EngineConfig {
        EngineConfig::default()
            .with_policy(self.direction.into())
            .with_threshold_denom(self.threshold_denom)
    }

    fn value(&self, tool: Tool) -> Result<u64> {
        self.value
            .ok_or_else(|| anyhow!("{} needs a second argument", tool.name()))
    }

    fn root(&self, tool: Tool) -> Result<NodeId> {
        let value = self.value(tool)?;
        let root = u32::try_from(value)
            .with_context(|| format!("Root vertex {value} does not fit a vertex id"))?;
        Ok(NodeId(root))
    }

    fn count(&self, tool: Tool) -> Result<usize> {
        let value = self.value(tool)?;
        Ok(usize::try_from(value)?)
    }

    fn cluster(&self) -> ThreadCluster {
        let threads = match self.backend {
            Backend::Shared | Backend::Distributed => 1,
            Backend::Hybrid => self.threads.unwrap_or_else(|| {
                let cores = std::thread::available_parallelism().map_or(1, usize::from);
                (cores / self.ranks.max(1)).max(1)
            }),
        };
        ThreadCluster::new(self.ranks, threads)
    }
}

/// Entry point of every tool binary
///
/// Argument errors print the tool's usage line on stdout and exit with
/// status 2; runtime errors and failed verification exit with status 1.
#[must_use]
pub fn main_for(tool: Tool) -> ExitCode {
    let args = match ToolArgs::try_parse() {
        Ok(args) if args.value.is_some() == tool.takes_value() => args,
        Ok(_) => {
            println!("{}", tool.usage());
            return ExitCode::from(2);
        }
        Err(err) => {
            use clap::error::ErrorKind;
            if matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) {
                let _ = err.print();
                return ExitCode::SUCCESS;
            }
            println!("{}", tool.usage());
            return ExitCode::from(2);
        }
    };

    setup_logging(args.verbose);

    let stdout = std::io::stdout();
    match execute(tool, &args, &mut stdout.lock()) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn setup_logging(verbose: bool) {
    let default = if verbose {
        "frontier_graph=debug"
    } else {
        "frontier_graph=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    // A second init (tests, embedding) keeps the first subscriber
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Load the graph, run `tool` and write its report to `out`
///
/// Returns `Ok(false)` when `--verify` found a mismatch.
///
/// # Errors
///
/// Returns error if the graph cannot be loaded, the arguments do not fit the
/// graph (root out of range, missing weights), or a backend fails.
pub fn execute<W: Write>(tool: Tool, args: &ToolArgs, out: &mut W) -> Result<bool> {
    let text = load(&args.graph)?;
    let format = args.text_format();
    let config = args.engine_config();

    match tool {
        Tool::Bfs => {
            let root = args.root(tool)?;
            let (result, elapsed) = dispatch(args, &text, 1, &BfsJob { root, config })?;
            report(out, args, elapsed, result.distances.iter().map(|&d| Distance(d)))?;
            if !args.verify {
                return Ok(true);
            }
            let graph = parse_full(&text, format, &args.graph)?;
            Ok(check("bfs", &reference_bfs(&graph, root.0), &result.distances))
        }
        Tool::BellmanFord => {
            let root = args.root(tool)?;
            let (result, elapsed) = dispatch(args, &text, 1, &BellmanFordJob { root, config })?;
            report(out, args, elapsed, result.distances.iter().map(|&d| Distance(d)))?;
            if !args.verify {
                return Ok(true);
            }
            let graph = parse_full(&text, format, &args.graph)?;
            let (expected, cycle) = reference_bellman_ford(&graph, root.0);
            if cycle != result.negative_cycle {
                tracing::error!(
                    expected = cycle,
                    actual = result.negative_cycle,
                    "bellman-ford verification failed: negative cycle flag differs"
                );
                return Ok(false);
            }
            Ok(check("bellman-ford", &expected, &result.distances))
        }
        Tool::ConnectedComponents => {
            let repetitions = args.count(tool)?;
            ensure!(repetitions > 0, "connected-components needs at least one iteration");
            let (result, elapsed) = dispatch(args, &text, repetitions, &ComponentsJob { config })?;
            report(out, args, elapsed, result.labels.iter())?;
            if !args.verify {
                return Ok(true);
            }
            let graph = parse_full(&text, format, &args.graph)?;
            Ok(check(
                "connected-components",
                &reference_components(&graph),
                &result.labels,
            ))
        }
        Tool::PageRank => {
            let config = PageRankConfig::default()
                .with_max_iterations(args.count(tool)?)
                .with_tolerance(args.tolerance);
            let (result, elapsed) = dispatch(args, &text, 1, &PageRankJob { config })?;
            tracing::info!(
                iterations = result.iterations,
                error = result.error,
                "pagerank finished"
            );
            report(out, args, elapsed, result.scores.iter())?;
            if !args.verify {
                return Ok(true);
            }
            let graph = parse_full(&text, format, &args.graph)?;
            Ok(check_scores(&reference_pagerank(&graph, config), &result.scores))
        }
        Tool::GraphScan => {
            let graph = parse_full(&text, format, &args.graph)?;
            scan(out, args, &graph)
        }
    }
}

fn load(path: &std::path::Path) -> Result<String> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    runtime.block_on(read_file(path))
}

fn parse_full(text: &str, format: TextFormat, path: &std::path::Path) -> Result<CsrGraph> {
    CsrGraph::parse_text(text, format).with_context(|| format!("Failed to parse {}", path.display()))
}

/// An algorithm runnable on any backend
trait Job: Sync {
    type Output: Send;

    fn run<A: Adjacency, C: Communicator>(&self, adjacency: &A, comm: &C) -> Result<Self::Output>;
}

struct BfsJob {
    root: NodeId,
    config: EngineConfig,
}

impl Job for BfsJob {
    type Output = BfsResult;

    fn run<A: Adjacency, C: Communicator>(&self, adjacency: &A, comm: &C) -> Result<BfsResult> {
        bfs_on(adjacency, comm, self.root, self.config)
    }
}

struct BellmanFordJob {
    root: NodeId,
    config: EngineConfig,
}

impl Job for BellmanFordJob {
    type Output = ShortestPaths;

    fn run<A: Adjacency, C: Communicator>(&self, adjacency: &A, comm: &C) -> Result<ShortestPaths> {
        bellman_ford_on(adjacency, comm, self.root, self.config)
    }
}

struct ComponentsJob {
    config: EngineConfig,
}

impl Job for ComponentsJob {
    type Output = Components;

    fn run<A: Adjacency, C: Communicator>(&self, adjacency: &A, comm: &C) -> Result<Components> {
        connected_components_on(adjacency, comm, self.config)
    }
}

struct PageRankJob {
    config: PageRankConfig,
}

impl Job for PageRankJob {
    type Output = PageRank;

    fn run<A: Adjacency, C: Communicator>(&self, adjacency: &A, comm: &C) -> Result<PageRank> {
        pagerank_on(adjacency, comm, self.config)
    }
}

/// Run `job` `repetitions` times on the selected backend
///
/// Returns the last result and the mean time per run. Only the algorithm is
/// timed, never loading.
fn dispatch<J: Job>(
    args: &ToolArgs,
    text: &str,
    repetitions: usize,
    job: &J,
) -> Result<(J::Output, Duration)> {
    let format = args.text_format();

    let (output, total) = match args.backend {
        Backend::Shared => {
            let graph = parse_full(text, format, &args.graph)?;
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(args.threads.unwrap_or(0))
                .build()?;
            tracing::debug!(threads = pool.current_num_threads(), "shared backend");

            pool.install(|| {
                let comm = crate::comm::LocalComm;
                let mut total = Duration::ZERO;
                let mut output = None;
                for _ in 0..repetitions {
                    let start = Instant::now();
                    output = Some(job.run(&graph, &comm)?);
                    total += start.elapsed();
                }
                Ok::<_, anyhow::Error>((output, total))
            })?
        }
        Backend::Distributed | Backend::Hybrid => {
            let cluster = args.cluster();
            tracing::debug!(
                ranks = cluster.ranks(),
                threads_per_rank = cluster.threads_per_rank(),
                "rank backend"
            );

            let mut results = cluster.run(|comm| {
                let slice = GraphSlice::parse_text(text, format, comm.rank(), comm.ranks());
                // Every rank must agree before the first collective
                if !comm.all_reduce_scalar(slice.is_ok(), ReduceOp::And) {
                    return match slice {
                        Err(err) => Err(err),
                        Ok(_) => Err(anyhow!("another rank failed to load the graph")),
                    };
                }
                let slice = slice?;

                let mut total = Duration::ZERO;
                let mut output = None;
                for _ in 0..repetitions {
                    comm.barrier();
                    let start = Instant::now();
                    output = Some(job.run(&slice, comm)?);
                    comm.barrier();
                    total += start.elapsed();
                }
                Ok((output, total))
            })?;

            // Every rank holds the full result; report rank 0's
            if results.is_empty() {
                bail!("cluster returned no results");
            }
            results.swap_remove(0)
        }
    };

    let output = output.ok_or_else(|| anyhow!("no repetitions were run"))?;
    Ok((output, mean(total, repetitions)))
}

/// Mean of `repetitions` runs taking `total` together
#[allow(clippy::cast_precision_loss)]
fn mean(total: Duration, repetitions: usize) -> Duration {
    total.div_f64(repetitions.max(1) as f64)
}

/// Traversal value with [`INFINITY`] printed as `inf`
struct Distance(i64);

impl Display for Distance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.0 == INFINITY {
            f.write_str("inf")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

fn report<W, I>(out: &mut W, args: &ToolArgs, elapsed: Duration, values: I) -> Result<()>
where
    W: Write,
    I: Iterator,
    I::Item: Display,
{
    if args.print {
        for (v, value) in values.enumerate() {
            writeln!(out, "{v} {value}")?;
        }
    } else {
        writeln!(out, "{:.6}", elapsed.as_secs_f64())?;
    }
    Ok(())
}

fn check<T: PartialEq + std::fmt::Debug>(tool: &str, expected: &[T], actual: &[T]) -> bool {
    match first_mismatch(expected, actual) {
        None => {
            tracing::info!(tool, "verified against sequential reference");
            true
        }
        Some(vertex) => {
            tracing::error!(
                tool,
                vertex,
                expected = ?expected.get(vertex),
                actual = ?actual.get(vertex),
                "verification failed"
            );
            false
        }
    }
}

fn check_scores(expected: &[f64], actual: &[f64]) -> bool {
    const SCORE_TOLERANCE: f64 = 1e-6;

    if expected.len() != actual.len() {
        tracing::error!(
            expected = expected.len(),
            actual = actual.len(),
            "pagerank verification failed: length differs"
        );
        return false;
    }
    let worst = expected
        .iter()
        .zip(actual)
        .map(|(e, a)| (e - a).abs())
        .fold(0.0_f64, f64::max);
    if worst > SCORE_TOLERANCE {
        tracing::error!(worst, "pagerank verification failed");
        return false;
    }
    tracing::info!(worst, "verified against sequential reference");
    true
}

/// Parallel sweep touching every edge of a block; returns the neighbor sum
fn sweep(block: &AdjacencyBlock) -> u64 {
    (0..block.offsets.len())
        .into_par_iter()
        .map(|v| {
            block.targets[block.edge_range(v)]
                .iter()
                .map(|&t| u64::from(t))
                .sum::<u64>()
        })
        .sum()
}

fn scan<W: Write>(out: &mut W, args: &ToolArgs, graph: &CsrGraph) -> Result<bool> {
    if args.backend != Backend::Shared {
        tracing::warn!("graph-scan always runs on the shared backend");
    }
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(args.threads.unwrap_or(0))
        .build()?;

    let (in_sum, in_time, out_sum, out_time, consistent) = pool.install(|| {
        let start = Instant::now();
        let in_sum = std::hint::black_box(sweep(graph.in_adjacency()));
        let in_time = start.elapsed();

        let start = Instant::now();
        let out_sum = std::hint::black_box(sweep(graph.out_adjacency()));
        let out_time = start.elapsed();

        (in_sum, in_time, out_sum, out_time, graph.is_consistent())
    });
    tracing::debug!(in_sum, out_sum, "sweeps finished");

    writeln!(out, "nodes {}", graph.num_nodes())?;
    writeln!(out, "edges {}", graph.num_edges())?;
    writeln!(out, "in-sweep {:.6}", in_time.as_secs_f64())?;
    writeln!(out, "out-sweep {:.6}", out_time.as_secs_f64())?;
    writeln!(out, "consistent {consistent}")?;
    Ok(consistent)
}
