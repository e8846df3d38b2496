//! Betweenness, closeness and eigenvector centrality.
//!
//! Path costs use `1 / weight`: a heavier trade relationship is a shorter
//! path. Under unit weighting every edge costs 1 and paths are hop counts.
//! Self-loops and edges with non-positive weight take no part in any of the
//! three measures.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BinaryHeap};

use serde::{Deserialize, Serialize};

use crate::error::AnalysisError;
use crate::graph::{Adjacency, TradeGraph};

use super::components::tarjan;
use super::types::{CentralityReport, NodeCentrality};

/// Relative slack when deciding two path lengths are equal
const PATH_TOLERANCE: f64 = 1e-9;

/// Power-iteration bounds for eigenvector centrality
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EigenvectorSettings {
    pub tolerance: f64,
    pub max_iterations: usize,
}

impl Default for EigenvectorSettings {
    fn default() -> Self {
        Self {
            tolerance: 1e-6,
            max_iterations: 100,
        }
    }
}

/// All three centrality scores for every node.
///
/// Fails when eigenvector centrality is undefined or does not converge; the
/// individual measures remain available through their own functions.
pub fn analyze_centrality(
    graph: &TradeGraph,
    settings: &EigenvectorSettings,
) -> Result<CentralityReport, AnalysisError> {
    let adjacency = graph.adjacency();

    let eigenvector = eigenvector_scores(&adjacency, settings)?;
    let betweenness = betweenness_scores(&adjacency);
    let closeness = closeness_scores(&adjacency);

    let scores = adjacency
        .ids
        .iter()
        .enumerate()
        .map(|(i, id)| {
            (
                id.to_string(),
                NodeCentrality {
                    betweenness: betweenness[i],
                    closeness: closeness[i],
                    eigenvector: eigenvector[i],
                },
            )
        })
        .collect();

    Ok(CentralityReport { scores })
}

/// Normalized betweenness centrality of every node
pub fn betweenness_centrality(graph: &TradeGraph) -> BTreeMap<String, f64> {
    let adjacency = graph.adjacency();
    keyed(&adjacency, betweenness_scores(&adjacency))
}

/// Closeness centrality (outgoing direction) of every node
pub fn closeness_centrality(graph: &TradeGraph) -> BTreeMap<String, f64> {
    let adjacency = graph.adjacency();
    keyed(&adjacency, closeness_scores(&adjacency))
}

/// Eigenvector centrality of every node.
///
/// Requires the graph to be strongly connected with at least one edge; a
/// lone node without edges is reducible.
pub fn eigenvector_centrality(
    graph: &TradeGraph,
    settings: &EigenvectorSettings,
) -> Result<BTreeMap<String, f64>, AnalysisError> {
    let adjacency = graph.adjacency();
    let scores = eigenvector_scores(&adjacency, settings)?;
    Ok(keyed(&adjacency, scores))
}

fn keyed(adjacency: &Adjacency<'_>, scores: Vec<f64>) -> BTreeMap<String, f64> {
    adjacency
        .ids
        .iter()
        .zip(scores)
        .map(|(id, score)| (id.to_string(), score))
        .collect()
}

/// Cost of traversing an edge, or None if it takes no part in paths
fn edge_length(weight: f64) -> Option<f64> {
    if weight > 0.0 && weight.is_finite() {
        Some(1.0 / weight)
    } else {
        None
    }
}

fn same_length(a: f64, b: f64) -> bool {
    (a - b).abs() <= PATH_TOLERANCE * a.abs().max(b.abs()).max(1.0)
}

/// Min-heap entry for Dijkstra; ties broken by node index
#[derive(Debug, Clone, Copy, PartialEq)]
struct QueueEntry {
    distance: f64,
    node: usize,
}

impl Eq for QueueEntry {}

impl Ord for QueueEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .distance
            .total_cmp(&self.distance)
            .then_with(|| other.node.cmp(&self.node))
    }
}

impl PartialOrd for QueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Brandes' algorithm with Dijkstra search, normalized by 1/((n-1)(n-2))
pub(crate) fn betweenness_scores(adjacency: &Adjacency<'_>) -> Vec<f64> {
    let n = adjacency.len();
    let mut centrality = vec![0.0; n];

    for source in 0..n {
        let mut settled_order: Vec<usize> = Vec::with_capacity(n);
        let mut predecessors: Vec<Vec<usize>> = vec![Vec::new(); n];
        let mut path_counts = vec![0.0f64; n];
        let mut distance = vec![f64::INFINITY; n];
        let mut settled = vec![false; n];
        let mut heap = BinaryHeap::new();

        path_counts[source] = 1.0;
        distance[source] = 0.0;
        heap.push(QueueEntry {
            distance: 0.0,
            node: source,
        });

        while let Some(QueueEntry { node: v, .. }) = heap.pop() {
            if settled[v] {
                continue;
            }
            settled[v] = true;
            settled_order.push(v);

            for &(w, weight) in &adjacency.outgoing[v] {
                let Some(length) = edge_length(weight) else {
                    continue;
                };
                if settled[w] {
                    continue;
                }
                let candidate = distance[v] + length;

                if distance[w].is_infinite() || (candidate < distance[w] && !same_length(candidate, distance[w])) {
                    distance[w] = candidate;
                    path_counts[w] = path_counts[v];
                    predecessors[w].clear();
                    predecessors[w].push(v);
                    heap.push(QueueEntry {
                        distance: candidate,
                        node: w,
                    });
                } else if same_length(candidate, distance[w]) {
                    path_counts[w] += path_counts[v];
                    predecessors[w].push(v);
                }
            }
        }

        let mut dependency = vec![0.0f64; n];
        while let Some(w) = settled_order.pop() {
            for &v in &predecessors[w] {
                dependency[v] += path_counts[v] / path_counts[w] * (1.0 + dependency[w]);
            }
            if w != source {
                centrality[w] += dependency[w];
            }
        }
    }

    if n > 2 {
        let scale = 1.0 / ((n - 1) * (n - 2)) as f64;
        for value in &mut centrality {
            *value *= scale;
        }
    }

    centrality
}

/// Shortest path lengths from `source` along outgoing edges
fn shortest_distances(adjacency: &Adjacency<'_>, source: usize) -> Vec<f64> {
    let n = adjacency.len();
    let mut distance = vec![f64::INFINITY; n];
    let mut settled = vec![false; n];
    let mut heap = BinaryHeap::new();

    distance[source] = 0.0;
    heap.push(QueueEntry {
        distance: 0.0,
        node: source,
    });

    while let Some(QueueEntry { node: v, .. }) = heap.pop() {
        if settled[v] {
            continue;
        }
        settled[v] = true;

        for &(w, weight) in &adjacency.outgoing[v] {
            let Some(length) = edge_length(weight) else {
                continue;
            };
            let candidate = distance[v] + length;
            if candidate < distance[w] {
                distance[w] = candidate;
                heap.push(QueueEntry {
                    distance: candidate,
                    node: w,
                });
            }
        }
    }

    distance
}

/// Reachable count over total distance; 0 when nothing is reachable
fn closeness_scores(adjacency: &Adjacency<'_>) -> Vec<f64> {
    (0..adjacency.len())
        .map(|source| {
            let distances = shortest_distances(adjacency, source);
            let (reachable, total) = distances
                .iter()
                .enumerate()
                .filter(|&(target, d)| target != source && d.is_finite())
                .fold((0usize, 0.0f64), |(count, sum), (_, d)| (count + 1, sum + d));

            if reachable == 0 || total <= 0.0 {
                0.0
            } else {
                reachable as f64 / total
            }
        })
        .collect()
}

/// Power iteration on x <- x + A^T x, L2-normalized each round
fn eigenvector_scores(
    adjacency: &Adjacency<'_>,
    settings: &EigenvectorSettings,
) -> Result<Vec<f64>, AnalysisError> {
    let n = adjacency.len();

    let incoming: Vec<Vec<(usize, f64)>> = adjacency
        .incoming
        .iter()
        .map(|edges| {
            edges
                .iter()
                .copied()
                .filter(|&(_, weight)| edge_length(weight).is_some())
                .collect()
        })
        .collect();
    let outgoing: Vec<Vec<(usize, f64)>> = adjacency
        .outgoing
        .iter()
        .map(|edges| {
            edges
                .iter()
                .copied()
                .filter(|&(_, weight)| edge_length(weight).is_some())
                .collect()
        })
        .collect();

    let components = tarjan(&outgoing).len();
    let has_edges = outgoing.iter().any(|edges| !edges.is_empty());
    if n == 0 || components != 1 || !has_edges {
        return Err(AnalysisError::Reducibility { components });
    }

    let mut scores = vec![1.0 / n as f64; n];

    for _ in 0..settings.max_iterations {
        let previous = scores.clone();

        for (v, edges) in incoming.iter().enumerate() {
            for &(u, weight) in edges {
                scores[v] += previous[u] * weight;
            }
        }

        let norm = scores.iter().map(|x| x * x).sum::<f64>().sqrt();
        let norm = if norm == 0.0 { 1.0 } else { norm };
        for value in &mut scores {
            *value /= norm;
        }

        let change: f64 = scores
            .iter()
            .zip(&previous)
            .map(|(current, last)| (current - last).abs())
            .sum();
        if change < n as f64 * settings.tolerance {
            return Ok(scores);
        }
    }

    Err(AnalysisError::Convergence {
        iterations: settings.max_iterations,
    })
}
