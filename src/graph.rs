//! Weighted directed trade graph.
//!
//! Nodes are country codes; an edge runs from importer to exporter and
//! carries one pre-aggregated weight per ordered pair.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use crate::analysis::components::strongly_connected_components;
use crate::error::AnalysisError;
use crate::ingest::TransactionTable;

/// How repeated transactions between the same ordered pair become an edge weight
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeightScheme {
    /// Every distinct pair weighs 1.0
    Unit,
    /// Weight is the number of transactions for the pair
    #[default]
    Frequency,
}

impl std::fmt::Display for WeightScheme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WeightScheme::Unit => write!(f, "unit"),
            WeightScheme::Frequency => write!(f, "frequency"),
        }
    }
}

impl std::str::FromStr for WeightScheme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "unit" => Ok(WeightScheme::Unit),
            "frequency" | "freq" => Ok(WeightScheme::Frequency),
            other => Err(format!("Unknown weight scheme '{}'", other)),
        }
    }
}

/// A directed, weighted edge borrowed from a [`TradeGraph`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Edge<'a> {
    pub source: &'a str,
    pub target: &'a str,
    pub weight: f64,
}

impl Edge<'_> {
    pub fn is_self_loop(&self) -> bool {
        self.source == self.target
    }
}

/// Directed trade network keyed by country code
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TradeGraph {
    nodes: BTreeSet<String>,
    edges: BTreeMap<(String, String), f64>,
}

impl TradeGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a node; returns false if it was already present
    pub fn add_node(&mut self, node: &str) -> bool {
        self.nodes.insert(node.to_string())
    }

    /// Set the weight of `source -> target`, adding both endpoints.
    ///
    /// An existing edge for the same ordered pair is replaced, never summed.
    pub fn set_edge(&mut self, source: &str, target: &str, weight: f64) {
        self.add_node(source);
        self.add_node(target);
        self.edges
            .insert((source.to_string(), target.to_string()), weight);
    }

    pub fn contains_node(&self, node: &str) -> bool {
        self.nodes.contains(node)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Nodes in ascending identifier order
    pub fn nodes(&self) -> impl Iterator<Item = &str> + '_ {
        self.nodes.iter().map(String::as_str)
    }

    /// Edges ordered by (source, target)
    pub fn edges(&self) -> impl Iterator<Item = Edge<'_>> + '_ {
        self.edges.iter().map(|((source, target), &weight)| Edge {
            source: source.as_str(),
            target: target.as_str(),
            weight,
        })
    }

    pub fn weight(&self, source: &str, target: &str) -> Option<f64> {
        self.edges
            .get(&(source.to_string(), target.to_string()))
            .copied()
    }

    pub fn total_weight(&self) -> f64 {
        self.edges.values().sum()
    }

    /// Remove a node and every edge incident to it
    pub fn remove_node(&mut self, node: &str) -> bool {
        if !self.nodes.remove(node) {
            return false;
        }
        self.edges
            .retain(|(source, target), _| source != node && target != node);
        true
    }

    /// Subgraph on the given nodes with every edge between them
    pub fn induced_subgraph<'a, I>(&self, nodes: I) -> TradeGraph
    where
        I: IntoIterator<Item = &'a str>,
    {
        let keep: BTreeSet<String> = nodes
            .into_iter()
            .filter(|node| self.nodes.contains(*node))
            .map(str::to_string)
            .collect();

        let edges = self
            .edges
            .iter()
            .filter(|((source, target), _)| keep.contains(source) && keep.contains(target))
            .map(|(pair, &weight)| (pair.clone(), weight))
            .collect();

        TradeGraph { nodes: keep, edges }
    }

    /// Induced subgraph of the largest strongly connected component.
    ///
    /// Ties between equally large components go to the one whose smallest
    /// member sorts first.
    pub fn largest_strongly_connected_component(&self) -> TradeGraph {
        let components = strongly_connected_components(self);
        match components.first() {
            Some(largest) => self.induced_subgraph(largest.iter().map(String::as_str)),
            None => TradeGraph::new(),
        }
    }

    /// Index-based view used by the traversal algorithms. Self-loops are dropped.
    pub(crate) fn adjacency(&self) -> Adjacency<'_> {
        let ids: Vec<&str> = self.nodes().collect();
        let index: HashMap<&str, usize> = ids.iter().enumerate().map(|(i, &id)| (id, i)).collect();

        let mut outgoing = vec![Vec::new(); ids.len()];
        let mut incoming = vec![Vec::new(); ids.len()];

        for edge in self.edges() {
            if edge.is_self_loop() {
                continue;
            }
            let (u, v) = (index[edge.source], index[edge.target]);
            outgoing[u].push((v, edge.weight));
            incoming[v].push((u, edge.weight));
        }

        Adjacency {
            ids,
            outgoing,
            incoming,
        }
    }
}

/// Dense index form of a [`TradeGraph`]; node `i` is `ids[i]` in ascending order
pub(crate) struct Adjacency<'a> {
    pub ids: Vec<&'a str>,
    pub outgoing: Vec<Vec<(usize, f64)>>,
    pub incoming: Vec<Vec<(usize, f64)>>,
}

impl Adjacency<'_> {
    pub fn len(&self) -> usize {
        self.ids.len()
    }
}

/// Build the trade graph from a transaction table.
///
/// Fails with [`AnalysisError::Schema`] on the first row that lacks an
/// importer or exporter. No country code is filtered.
pub fn build_graph(
    transactions: &TransactionTable,
    scheme: WeightScheme,
) -> Result<TradeGraph, AnalysisError> {
    let mut pair_counts: BTreeMap<(String, String), usize> = BTreeMap::new();
    let mut nodes: BTreeSet<String> = BTreeSet::new();

    for (row, record) in transactions.rows().iter().enumerate() {
        let importer = required_field(record.importer.as_deref(), row, "importer")?;
        let exporter = required_field(record.exporter.as_deref(), row, "exporter")?;

        nodes.insert(importer.to_string());
        nodes.insert(exporter.to_string());
        *pair_counts
            .entry((importer.to_string(), exporter.to_string()))
            .or_insert(0) += 1;
    }

    let edges = pair_counts
        .into_iter()
        .map(|(pair, count)| {
            let weight = match scheme {
                WeightScheme::Unit => 1.0,
                WeightScheme::Frequency => count as f64,
            };
            (pair, weight)
        })
        .collect();

    Ok(TradeGraph { nodes, edges })
}

fn required_field<'a>(
    value: Option<&'a str>,
    row: usize,
    field: &'static str,
) -> Result<&'a str, AnalysisError> {
    match value {
        Some(code) if !code.trim().is_empty() => Ok(code),
        _ => Err(AnalysisError::Schema { row, field }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::TransactionRecord;

    fn sample_table() -> TransactionTable {
        TransactionTable::from_pairs(&[
            ("US", "CN"),
            ("US", "CN"),
            ("CN", "HK"),
            ("HK", "US"),
            ("NA", "ZA"),
        ])
    }

    #[test]
    fn test_node_set_is_union_of_partners() {
        let graph = build_graph(&sample_table(), WeightScheme::Frequency).unwrap();
        let nodes: Vec<&str> = graph.nodes().collect();
        assert_eq!(nodes, vec!["CN", "HK", "NA", "US", "ZA"]);
    }

    #[test]
    fn test_frequency_weights_sum_to_transaction_count() {
        let table = sample_table();
        let graph = build_graph(&table, WeightScheme::Frequency).unwrap();

        assert_eq!(graph.edge_count(), 4);
        assert_eq!(graph.weight("US", "CN"), Some(2.0));
        assert_eq!(graph.weight("CN", "US"), None);
        assert_eq!(graph.total_weight(), table.len() as f64);
    }

    #[test]
    fn test_unit_weights_are_one() {
        let graph = build_graph(&sample_table(), WeightScheme::Unit).unwrap();
        assert!(graph.edges().all(|edge| edge.weight == 1.0));
        assert_eq!(graph.weight("US", "CN"), Some(1.0));
    }

    #[test]
    fn test_missing_partner_is_schema_error() {
        let mut rows = vec![TransactionRecord::new("US", "CN")];
        rows.push(TransactionRecord {
            importer: Some("HK".to_string()),
            exporter: None,
            ..TransactionRecord::default()
        });
        let table = TransactionTable::new(rows);

        let err = build_graph(&table, WeightScheme::Unit).unwrap_err();
        assert_eq!(err, AnalysisError::Schema { row: 1, field: "exporter" });

        let blank = TransactionTable::from_pairs(&[("", "CN")]);
        assert_eq!(
            build_graph(&blank, WeightScheme::Unit).unwrap_err(),
            AnalysisError::Schema { row: 0, field: "importer" }
        );
    }

    #[test]
    fn test_self_loops_are_kept() {
        let table = TransactionTable::from_pairs(&[("BE", "BE"), ("BE", "FR")]);
        let graph = build_graph(&table, WeightScheme::Frequency).unwrap();
        assert_eq!(graph.weight("BE", "BE"), Some(1.0));
        assert_eq!(graph.node_count(), 2);

        // The traversal view ignores them
        let adjacency = graph.adjacency();
        assert_eq!(adjacency.outgoing[0], vec![(1, 1.0)]);
    }

    #[test]
    fn test_build_is_deterministic() {
        let a = build_graph(&sample_table(), WeightScheme::Frequency).unwrap();
        let b = build_graph(&sample_table(), WeightScheme::Frequency).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_remove_node_drops_incident_edges() {
        let mut graph = build_graph(&sample_table(), WeightScheme::Frequency).unwrap();
        assert!(graph.remove_node("US"));
        assert!(!graph.remove_node("US"));

        assert!(!graph.contains_node("US"));
        let edges: Vec<(&str, &str)> = graph.edges().map(|e| (e.source, e.target)).collect();
        assert_eq!(edges, vec![("CN", "HK"), ("NA", "ZA")]);
    }

    #[test]
    fn test_set_edge_replaces_weight() {
        let mut graph = TradeGraph::new();
        graph.set_edge("A", "B", 2.0);
        graph.set_edge("A", "B", 5.0);
        assert_eq!(graph.edge_count(), 1);
        assert_eq!(graph.weight("A", "B"), Some(5.0));
    }

    #[test]
    fn test_largest_strongly_connected_component() {
        let graph = build_graph(&sample_table(), WeightScheme::Frequency).unwrap();
        let giant = graph.largest_strongly_connected_component();

        let nodes: Vec<&str> = giant.nodes().collect();
        assert_eq!(nodes, vec!["CN", "HK", "US"]);
        assert_eq!(giant.edge_count(), 3);
        assert_eq!(giant.weight("US", "CN"), Some(2.0));
    }

    #[test]
    fn test_weight_scheme_parsing() {
        assert_eq!("freq".parse::<WeightScheme>(), Ok(WeightScheme::Frequency));
        assert_eq!("Unit".parse::<WeightScheme>(), Ok(WeightScheme::Unit));
        assert!("log".parse::<WeightScheme>().is_err());
    }
}
