//! Whitespace-delimited CSR text format
//!
//! # Format
//!
//! ```text
//! <num_nodes> <num_edges>
//! <num_nodes out-offsets>
//! <num_edges targets>              (unweighted)
//! <num_edges "target weight" pairs> (weighted)
//! [same two blocks again for in-adjacency, Layout::Dual only]
//! ```
//!
//! Line breaks carry no meaning; only token order does. Every block is
//! validated before a graph is built, so a malformed file never yields a
//! partial graph.

use super::csr::{validate_offsets, AdjacencyBlock, CsrGraph, EdgeId, VertexId, Weight};
use crate::error::GraphError;
use anyhow::{Context, Result};
use std::ops::Range;
use std::path::Path;
use std::str::SplitWhitespace;

/// Which adjacency blocks the file contains
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Layout {
    /// Out-adjacency followed by in-adjacency
    #[default]
    Dual,
    /// Out-adjacency only; in-adjacency is derived by inversion
    OutOnly,
}

/// Text format flavor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TextFormat {
    /// Blocks present in the file
    pub layout: Layout,
    /// Whether each edge is followed by a weight token
    pub weighted: bool,
}

impl TextFormat {
    /// Unweighted dual-layout format
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the block layout
    #[must_use]
    pub fn with_layout(mut self, layout: Layout) -> Self {
        self.layout = layout;
        self
    }

    /// Set whether edges carry weights
    #[must_use]
    pub fn with_weighted(mut self, weighted: bool) -> Self {
        self.weighted = weighted;
        self
    }
}

/// Vertex and edge counts from the first line
#[derive(Debug, Clone, Copy)]
pub(crate) struct Header {
    pub(crate) num_nodes: usize,
    pub(crate) num_edges: usize,
}

pub(crate) struct Tokens<'a> {
    inner: SplitWhitespace<'a>,
    position: usize,
}

impl<'a> Tokens<'a> {
    pub(crate) fn new(text: &'a str) -> Self {
        Self {
            inner: text.split_whitespace(),
            position: 0,
        }
    }

    fn next_token(&mut self, expected: &'static str) -> Result<(usize, &'a str), GraphError> {
        let token = self
            .inner
            .next()
            .ok_or(GraphError::UnexpectedEof { expected })?;
        let position = self.position;
        self.position += 1;
        Ok((position, token))
    }

    fn next_u64(&mut self, expected: &'static str) -> Result<u64, GraphError> {
        let (position, token) = self.next_token(expected)?;
        token.parse().map_err(|_| GraphError::InvalidToken {
            position,
            token: token.to_string(),
        })
    }

    fn next_i64(&mut self, expected: &'static str) -> Result<i64, GraphError> {
        let (position, token) = self.next_token(expected)?;
        token.parse().map_err(|_| GraphError::InvalidToken {
            position,
            token: token.to_string(),
        })
    }

    pub(crate) fn header(&mut self) -> Result<Header, GraphError> {
        let num_nodes = self.next_u64("vertex count")?;
        let num_edges = self.next_u64("edge count")?;
        if num_nodes > u64::from(VertexId::MAX) || num_edges > u64::from(EdgeId::MAX) {
            return Err(GraphError::InvalidHeader(format!(
                "{num_nodes} vertices / {num_edges} edges exceed 32-bit ids"
            )));
        }
        if num_nodes == 0 && num_edges > 0 {
            return Err(GraphError::InvalidHeader(format!(
                "{num_edges} edges in a graph without vertices"
            )));
        }
        #[allow(clippy::cast_possible_truncation)] // Checked against u32 above
        let header = Header {
            num_nodes: num_nodes as usize,
            num_edges: num_edges as usize,
        };
        Ok(header)
    }

    pub(crate) fn finish(mut self) -> Result<(), GraphError> {
        match self.inner.next() {
            Some(_) => Err(GraphError::TrailingData {
                position: self.position,
            }),
            None => Ok(()),
        }
    }
}

/// Reversed edges of owned heads: `(local head, tail, weight)` in tail order
pub(crate) type ReversedEdges = Vec<(usize, VertexId, Weight)>;

/// Read one `offsets + edges` block, keeping only the vertices in `owned`
///
/// The returned block covers `owned` with offsets rebased to zero. When
/// `reversed` is given, every edge whose neighbor is owned is also recorded
/// from the neighbor's side, which is how out-only files yield in-adjacency
/// without a full inversion.
pub(crate) fn read_block(
    tokens: &mut Tokens<'_>,
    header: Header,
    weighted: bool,
    owned: &Range<usize>,
    mut reversed: Option<&mut ReversedEdges>,
) -> Result<AdjacencyBlock, GraphError> {
    let Header {
        num_nodes,
        num_edges,
    } = header;

    let mut offsets = Vec::with_capacity(num_nodes);
    for _ in 0..num_nodes {
        let offset = tokens.next_u64("offset")?;
        #[allow(clippy::cast_possible_truncation)] // Offsets beyond m are rejected next
        let clamped = offset.min(u64::from(EdgeId::MAX)) as EdgeId;
        offsets.push(clamped);
        if offset > num_edges as u64 {
            return Err(GraphError::InvalidOffsets {
                vertex: offsets.len() - 1,
                reason: format!("offset {offset} exceeds edge count {num_edges}"),
            });
        }
    }
    validate_offsets(&offsets, num_edges)?;

    let edge_start = offsets.get(owned.start).map_or(num_edges, |&o| o as usize);
    let edge_end = offsets.get(owned.end).map_or(num_edges, |&o| o as usize);
    let local_offsets = offsets[owned.clone()]
        .iter()
        .map(|&o| o - offsets[owned.start])
        .collect();

    let mut targets = Vec::with_capacity(edge_end - edge_start);
    let mut weights = Vec::with_capacity(if weighted { edge_end - edge_start } else { 0 });
    let mut tail = 0;

    for edge in 0..num_edges {
        let target = tokens.next_u64("edge target")?;
        if target >= num_nodes as u64 {
            return Err(GraphError::VertexOutOfRange {
                vertex: target,
                num_nodes,
            });
        }
        let weight = if weighted {
            tokens.next_i64("edge weight")?
        } else {
            1
        };
        #[allow(clippy::cast_possible_truncation)] // Checked against num_nodes above
        let target = target as VertexId;

        if (edge_start..edge_end).contains(&edge) {
            targets.push(target);
            if weighted {
                weights.push(weight);
            }
        }

        if let Some(reversed) = reversed.as_deref_mut() {
            while tail + 1 < num_nodes && offsets[tail + 1] as usize <= edge {
                tail += 1;
            }
            if owned.contains(&(target as usize)) {
                #[allow(clippy::cast_possible_truncation)]
                let tail = tail as VertexId;
                reversed.push((target as usize - owned.start, tail, weight));
            }
        }
    }

    Ok(AdjacencyBlock {
        offsets: local_offsets,
        targets,
        weights: weighted.then_some(weights),
    })
}

impl CsrGraph {
    /// Parse a graph from text
    ///
    /// # Errors
    ///
    /// Returns error if the text is malformed or violates a CSR invariant
    /// (see [`GraphError`]).
    ///
    /// # Example
    ///
    /// ```
    /// use frontier_graph::{CsrGraph, Layout, TextFormat};
    ///
    /// let text = "3 2\n0 1 2\n1 2\n";
    /// let format = TextFormat::new().with_layout(Layout::OutOnly);
    /// let graph = CsrGraph::parse_text(text, format).unwrap();
    ///
    /// assert_eq!(graph.in_neighbors(2), &[1]);
    /// ```
    pub fn parse_text(text: &str, format: TextFormat) -> Result<Self> {
        let mut tokens = Tokens::new(text);
        let header = tokens.header()?;
        let all = 0..header.num_nodes;

        let out = read_block(&mut tokens, header, format.weighted, &all, None)?;
        let graph = match format.layout {
            Layout::Dual => {
                let inc = read_block(&mut tokens, header, format.weighted, &all, None)?;
                tokens.finish()?;
                Self::from_dual_adjacency(header.num_nodes, out, inc)?
            }
            Layout::OutOnly => {
                tokens.finish()?;
                Self::from_out_adjacency(header.num_nodes, out)?
            }
        };

        tracing::info!(
            nodes = graph.num_nodes(),
            edges = graph.num_edges(),
            weighted = graph.is_weighted(),
            "graph loaded"
        );
        Ok(graph)
    }

    /// Read a graph file
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::FileNotFound`] if `path` does not exist, or any
    /// error from [`parse_text`](Self::parse_text).
    pub async fn read_text<P: AsRef<Path>>(path: P, format: TextFormat) -> Result<Self> {
        let text = read_file(path.as_ref()).await?;
        Self::parse_text(&text, format)
            .with_context(|| format!("Failed to parse {}", path.as_ref().display()))
    }
}

/// Read a whole graph file after checking it exists
///
/// # Errors
///
/// Returns [`GraphError::FileNotFound`] if `path` does not exist, or the I/O
/// error from reading it.
pub async fn read_file(path: &Path) -> Result<String> {
    if !tokio::fs::try_exists(path).await.unwrap_or(false) {
        return Err(GraphError::FileNotFound(path.to_path_buf()).into());
    }
    tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))
}
