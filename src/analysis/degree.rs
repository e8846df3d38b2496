//! Weighted degree distribution analysis.
//!
//! Degrees are sums of incident edge weights, not edge counts. Every node in
//! the graph appears in the report, isolated ones with degree zero.

use std::collections::BTreeMap;

use crate::graph::TradeGraph;

use super::powerlaw::fit_frequency_outcome;
use super::types::*;

/// Analyze weighted in/out degrees of `graph` and fit both distributions
pub fn analyze_degrees(graph: &TradeGraph) -> DegreeReport {
    let nodes = weighted_degrees(graph);

    let in_values: Vec<f64> = nodes.values().map(|d| d.in_degree).collect();
    let out_values: Vec<f64> = nodes.values().map(|d| d.out_degree).collect();
    let total_values: Vec<f64> = nodes.values().map(|d| d.total).collect();

    DegreeReport {
        in_degree: degree_series(&in_values),
        out_degree: degree_series(&out_values),
        total_frequency: frequency_table(&total_values),
        nodes,
    }
}

/// Weighted in/out degree of every node. A self-loop counts toward both.
pub fn weighted_degrees(graph: &TradeGraph) -> BTreeMap<String, NodeDegree> {
    let mut degrees: BTreeMap<String, NodeDegree> = graph
        .nodes()
        .map(|node| {
            (
                node.to_string(),
                NodeDegree {
                    node: node.to_string(),
                    in_degree: 0.0,
                    out_degree: 0.0,
                    total: 0.0,
                },
            )
        })
        .collect();

    for edge in graph.edges() {
        if let Some(source) = degrees.get_mut(edge.source) {
            source.out_degree += edge.weight;
            source.total += edge.weight;
        }
        if let Some(target) = degrees.get_mut(edge.target) {
            target.in_degree += edge.weight;
            target.total += edge.weight;
        }
    }

    degrees
}

/// Group degree values by their integer value.
///
/// Edge weights are whole transaction counts (or 1.0), so rounding only
/// removes floating-point noise from the sums.
pub fn frequency_table(values: &[f64]) -> BTreeMap<u64, usize> {
    let mut histogram: BTreeMap<u64, usize> = BTreeMap::new();
    for &value in values {
        *histogram.entry(value.max(0.0).round() as u64).or_insert(0) += 1;
    }
    histogram
}

fn degree_series(values: &[f64]) -> DegreeSeries {
    let frequency = frequency_table(values);
    let fit = fit_frequency_outcome(&frequency);
    DegreeSeries {
        stats: calculate_stats(values),
        frequency,
        fit,
    }
}

/// Calculate statistical summary
fn calculate_stats(values: &[f64]) -> DegreeStats {
    if values.is_empty() {
        return DegreeStats {
            min: 0.0,
            max: 0.0,
            mean: 0.0,
            median: 0.0,
            std_dev: 0.0,
        };
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let min = sorted[0];
    let max = sorted[sorted.len() - 1];
    let mean = sorted.iter().sum::<f64>() / sorted.len() as f64;

    let median = if sorted.len() % 2 == 0 {
        (sorted[sorted.len() / 2 - 1] + sorted[sorted.len() / 2]) / 2.0
    } else {
        sorted[sorted.len() / 2]
    };

    let variance: f64 = sorted
        .iter()
        .map(|&v| {
            let diff = v - mean;
            diff * diff
        })
        .sum::<f64>()
        / sorted.len() as f64;

    DegreeStats {
        min,
        max,
        mean,
        median,
        std_dev: variance.sqrt(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AnalysisError;
    use crate::graph::{build_graph, WeightScheme};
    use crate::ingest::TransactionTable;

    /// A -> B (3), A -> C (1), C -> B (2), D isolated
    fn four_node_graph() -> TradeGraph {
        let mut graph = TradeGraph::new();
        graph.set_edge("A", "B", 3.0);
        graph.set_edge("A", "C", 1.0);
        graph.set_edge("C", "B", 2.0);
        graph.add_node("D");
        graph
    }

    #[test]
    fn test_weighted_in_degree_sums_incoming_weights() {
        let report = analyze_degrees(&four_node_graph());

        assert_eq!(report.nodes["A"].in_degree, 0.0);
        assert_eq!(report.nodes["A"].out_degree, 4.0);
        assert_eq!(report.nodes["B"].in_degree, 5.0);
        assert_eq!(report.nodes["B"].out_degree, 0.0);
        assert_eq!(report.nodes["C"].in_degree, 1.0);
        assert_eq!(report.nodes["C"].out_degree, 2.0);
        assert_eq!(report.nodes["C"].total, 3.0);
    }

    #[test]
    fn test_isolated_node_is_reported() {
        let report = analyze_degrees(&four_node_graph());
        let isolated = &report.nodes["D"];
        assert_eq!(isolated.in_degree, 0.0);
        assert_eq!(isolated.out_degree, 0.0);
        assert_eq!(report.nodes.len(), 4);
    }

    #[test]
    fn test_frequency_tables() {
        let report = analyze_degrees(&four_node_graph());

        // in-degrees: A 0, B 5, C 1, D 0
        let expected_in: BTreeMap<u64, usize> = [(0, 2), (1, 1), (5, 1)].into_iter().collect();
        assert_eq!(report.in_degree.frequency, expected_in);

        // totals: A 4, B 5, C 3, D 0
        let expected_total: BTreeMap<u64, usize> =
            [(0, 1), (3, 1), (4, 1), (5, 1)].into_iter().collect();
        assert_eq!(report.total_frequency, expected_total);

        assert_eq!(report.in_degree.stats.max, 5.0);
        assert_eq!(report.in_degree.stats.mean, 1.5);
        assert_eq!(report.in_degree.stats.median, 0.5);
    }

    #[test]
    fn test_fit_attached_when_possible() {
        let report = analyze_degrees(&four_node_graph());

        // in-degree nonzero values {1, 5}: two distinct values, fit succeeds
        let fit = report.in_degree.fit.fit().unwrap();
        assert_eq!(fit.xmin, 1.0);

        // out-degree nonzero values {4, 2}: fit succeeds too
        assert!(report.out_degree.fit.fit().is_ok());
    }

    #[test]
    fn test_single_node_has_zero_degree_and_no_fit() {
        let mut graph = TradeGraph::new();
        graph.add_node("NA");
        let report = analyze_degrees(&graph);

        assert_eq!(report.nodes["NA"].total, 0.0);
        assert_eq!(
            report.in_degree.fit.fit().unwrap_err(),
            AnalysisError::InsufficientData { distinct: 0 }
        );
    }

    #[test]
    fn test_insufficient_fit_keeps_distinct_count() {
        // Out-degrees: A 2, B 2, C 0; one distinct positive value
        let mut graph = TradeGraph::new();
        graph.set_edge("A", "C", 2.0);
        graph.set_edge("B", "C", 2.0);
        let report = analyze_degrees(&graph);

        assert_eq!(report.out_degree.fit, FitOutcome::Insufficient { distinct: 1 });
        assert_eq!(
            report.out_degree.fit.fit().unwrap_err(),
            AnalysisError::InsufficientData { distinct: 1 }
        );
    }

    #[test]
    fn test_self_loop_counts_both_directions() {
        let mut graph = TradeGraph::new();
        graph.set_edge("BE", "BE", 2.0);
        let degrees = weighted_degrees(&graph);
        assert_eq!(degrees["BE"].in_degree, 2.0);
        assert_eq!(degrees["BE"].out_degree, 2.0);
    }

    #[test]
    fn test_reports_are_reproducible() {
        let table = TransactionTable::from_pairs(&[
            ("US", "CN"),
            ("US", "CN"),
            ("CN", "HK"),
            ("HK", "US"),
            ("JP", "CN"),
        ]);
        let first = analyze_degrees(&build_graph(&table, WeightScheme::Frequency).unwrap());
        let second = analyze_degrees(&build_graph(&table, WeightScheme::Frequency).unwrap());
        assert_eq!(first, second);
    }
}
