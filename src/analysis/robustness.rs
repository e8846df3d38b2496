//! Network robustness under node removal.
//!
//! Repeatedly removes countries from a private copy of the trade graph and
//! records how the network fragments into strongly connected components.

use std::fmt;
use std::str::FromStr;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::AnalysisError;
use crate::graph::TradeGraph;

use super::centrality::betweenness_scores;
use super::components::summarize_components;
use super::degree::weighted_degrees;
use super::types::FragmentationTrace;

/// Policy for picking the next node to remove
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemovalStrategy {
    /// Uniformly random failure
    Random,
    /// Highest weighted in+out degree on the current graph
    MaxDegree,
    /// Highest betweenness on the current graph
    MaxBetweenness,
    /// Remove the listed countries in order
    Explicit(Vec<String>),
}

impl fmt::Display for RemovalStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RemovalStrategy::Random => write!(f, "random"),
            RemovalStrategy::MaxDegree => write!(f, "max-degree"),
            RemovalStrategy::MaxBetweenness => write!(f, "max-betweenness"),
            RemovalStrategy::Explicit(targets) => write!(f, "explicit:{}", targets.join(",")),
        }
    }
}

impl FromStr for RemovalStrategy {
    type Err = String;

    /// Accepts `random`, `max-degree`, `max-betweenness` and `explicit:US,HK,CN`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if let Some(list) = trimmed.strip_prefix("explicit:") {
            let targets: Vec<String> = list
                .split(',')
                .map(str::trim)
                .filter(|code| !code.is_empty())
                .map(str::to_string)
                .collect();
            if targets.is_empty() {
                return Err("explicit strategy needs at least one country".to_string());
            }
            return Ok(RemovalStrategy::Explicit(targets));
        }

        match trimmed.to_ascii_lowercase().replace('_', "-").as_str() {
            "random" => Ok(RemovalStrategy::Random),
            "max-degree" | "degree" => Ok(RemovalStrategy::MaxDegree),
            "max-betweenness" | "betweenness" => Ok(RemovalStrategy::MaxBetweenness),
            other => Err(format!("Unknown removal strategy '{}'", other)),
        }
    }
}

impl RemovalStrategy {
    /// Removals a run takes when no limit is given: the whole list for an
    /// explicit order, `fallback` otherwise
    pub fn default_steps(&self, fallback: usize) -> usize {
        match self {
            RemovalStrategy::Explicit(targets) => targets.len(),
            _ => fallback,
        }
    }
}

/// Simulate an attack with an entropy-seeded generator
pub fn simulate(
    graph: &TradeGraph,
    strategy: &RemovalStrategy,
    max_steps: usize,
) -> Result<FragmentationTrace, AnalysisError> {
    simulate_with_rng(graph, strategy, max_steps, &mut StdRng::from_entropy())
}

/// Simulate an attack, drawing random choices from `rng`.
///
/// Stops once the working graph is empty or `max_steps` removals happened.
/// An explicit list that runs out while a removal is still due fails with
/// [`AnalysisError::ExhaustedList`].
pub fn simulate_with_rng<R: Rng + ?Sized>(
    graph: &TradeGraph,
    strategy: &RemovalStrategy,
    max_steps: usize,
    rng: &mut R,
) -> Result<FragmentationTrace, AnalysisError> {
    let mut working = graph.clone();
    let mut trace = FragmentationTrace::new(strategy.to_string(), summarize_components(&working));
    let mut cursor = 0usize;

    while !working.is_empty() && trace.steps().len() < max_steps {
        let target = match strategy {
            RemovalStrategy::Random => pick_random(&working, rng),
            RemovalStrategy::MaxDegree => pick_max_degree(&working),
            RemovalStrategy::MaxBetweenness => pick_max_betweenness(&working),
            RemovalStrategy::Explicit(targets) => {
                let node = targets.get(cursor).ok_or(AnalysisError::ExhaustedList {
                    available: targets.len(),
                })?;
                cursor += 1;
                if !working.contains_node(node) {
                    return Err(AnalysisError::UnknownNode(node.clone()));
                }
                Some(node.clone())
            }
        };

        let Some(target) = target else {
            break;
        };

        working.remove_node(&target);
        trace.record(target, summarize_components(&working));
    }

    Ok(trace)
}

/// Run independent simulations in parallel, one private copy each.
///
/// With a seed, strategy `i` uses `seed + i` so every run is reproducible.
/// Results keep the order of `strategies`.
pub fn simulate_all(
    graph: &TradeGraph,
    strategies: &[RemovalStrategy],
    max_steps: usize,
    seed: Option<u64>,
) -> Vec<Result<FragmentationTrace, AnalysisError>> {
    run_parallel(graph, strategies.iter().map(|s| (s, max_steps)).collect(), seed)
}

/// [`simulate_all`] with a separate step limit for each strategy
pub fn simulate_plans(
    graph: &TradeGraph,
    plans: &[(RemovalStrategy, usize)],
    seed: Option<u64>,
) -> Vec<Result<FragmentationTrace, AnalysisError>> {
    run_parallel(graph, plans.iter().map(|(s, steps)| (s, *steps)).collect(), seed)
}

fn run_parallel(
    graph: &TradeGraph,
    plans: Vec<(&RemovalStrategy, usize)>,
    seed: Option<u64>,
) -> Vec<Result<FragmentationTrace, AnalysisError>> {
    plans
        .par_iter()
        .enumerate()
        .map(|(i, &(strategy, max_steps))| {
            let mut rng = match seed {
                Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(i as u64)),
                None => StdRng::from_entropy(),
            };
            simulate_with_rng(graph, strategy, max_steps, &mut rng)
        })
        .collect()
}

fn pick_random<R: Rng + ?Sized>(graph: &TradeGraph, rng: &mut R) -> Option<String> {
    let nodes: Vec<&str> = graph.nodes().collect();
    nodes.choose(rng).map(|node| node.to_string())
}

/// Highest total weighted degree; the first maximum in id order wins ties
fn pick_max_degree(graph: &TradeGraph) -> Option<String> {
    let degrees = weighted_degrees(graph);
    let mut best: Option<(&String, f64)> = None;

    for (node, degree) in &degrees {
        if best.map_or(true, |(_, top)| degree.total > top) {
            best = Some((node, degree.total));
        }
    }

    best.map(|(node, _)| node.clone())
}

/// Highest betweenness on the current graph; ties as for degree
fn pick_max_betweenness(graph: &TradeGraph) -> Option<String> {
    let adjacency = graph.adjacency();
    let scores = betweenness_scores(&adjacency);

    let mut best: Option<(usize, f64)> = None;
    for (i, &score) in scores.iter().enumerate() {
        if best.map_or(true, |(_, top)| score > top) {
            best = Some((i, score));
        }
    }

    best.map(|(i, _)| adjacency.ids[i].to_string())
}
