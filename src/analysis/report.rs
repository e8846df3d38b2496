//! Report generation for trade network analysis.
//!
//! Generates both JSON and human-readable text reports.

use std::fs;
use std::path::Path;

use color_eyre::eyre::{Context, Result};

use crate::graph::{TradeGraph, WeightScheme};
use crate::ingest::TransactionTable;

use super::types::*;

/// Rows shown in each centrality ranking
const TOP_RANKED: usize = 10;

/// Two-sided significance used when naming the preferred distribution
const SIGNIFICANCE: f64 = 0.1;

/// Build report metadata for a run over `transactions`
pub fn build_metadata(
    source: &str,
    weight_scheme: WeightScheme,
    transactions: &TransactionTable,
    graph: &TradeGraph,
) -> AnalysisMetadata {
    AnalysisMetadata {
        analysis_timestamp: chrono::Utc::now().to_rfc3339(),
        source: source.to_string(),
        weight_scheme,
        total_transactions: transactions.len(),
        total_nodes: graph.node_count(),
        total_edges: graph.edge_count(),
    }
}

/// Generate JSON report
pub fn generate_json_report(report: &FullAnalysisReport, output_path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(report)
        .context("Failed to serialize report to JSON")?;

    fs::write(output_path, json)
        .with_context(|| format!("Failed to write JSON report to {}", output_path.display()))?;

    log::info!("JSON report written to {}", output_path.display());
    Ok(())
}

/// Generate human-readable text report
pub fn generate_text_report(report: &FullAnalysisReport, output_path: &Path) -> Result<()> {
    let content = render_text_report(report);
    fs::write(output_path, content)
        .with_context(|| format!("Failed to write text report to {}", output_path.display()))?;

    log::info!("Text report written to {}", output_path.display());
    Ok(())
}

fn section_header(lines: &mut Vec<String>, title: &str) {
    lines.push("=".repeat(80));
    lines.push(format!("{:^80}", title));
    lines.push("=".repeat(80));
    lines.push(String::new());
}

fn render_text_report(report: &FullAnalysisReport) -> String {
    let mut lines: Vec<String> = Vec::new();

    section_header(&mut lines, "TRADE NETWORK ANALYSIS");

    lines.push(format!("Analysis Date: {}", report.metadata.analysis_timestamp));
    lines.push(format!("Source: {}", report.metadata.source));
    lines.push(format!("Edge Weights: {}", report.metadata.weight_scheme));
    lines.push(format!("Transactions: {}", report.metadata.total_transactions));
    lines.push(format!("Countries: {}", report.metadata.total_nodes));
    lines.push(format!("Trade Relationships: {}", report.metadata.total_edges));
    lines.push(String::new());

    if let Some(ref degree) = report.degree_analysis {
        section_header(&mut lines, "DEGREE DISTRIBUTION");
        render_series(&mut lines, "In-degree", &degree.in_degree);
        render_series(&mut lines, "Out-degree", &degree.out_degree);

        let mut hubs: Vec<&NodeDegree> = degree.nodes.values().collect();
        hubs.sort_by(|a, b| {
            b.total
                .partial_cmp(&a.total)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.node.cmp(&b.node))
        });
        if !hubs.is_empty() {
            lines.push("Largest Traders (weighted in + out):".to_string());
            for (i, hub) in hubs.iter().take(TOP_RANKED).enumerate() {
                lines.push(format!(
                    "  {}. {}: {:.0} (in {:.0}, out {:.0})",
                    i + 1,
                    hub.node,
                    hub.total,
                    hub.in_degree,
                    hub.out_degree
                ));
            }
            lines.push(String::new());
        }
    }

    if let Some(ref centrality) = report.centrality_analysis {
        section_header(&mut lines, "CENTRALITY");
        for (label, metric) in [
            ("Betweenness", CentralityMetric::Betweenness),
            ("Closeness", CentralityMetric::Closeness),
            ("Eigenvector", CentralityMetric::Eigenvector),
        ] {
            lines.push(format!("Top {} by {}:", TOP_RANKED, label));
            for row in centrality.ranked(metric).iter().take(TOP_RANKED) {
                lines.push(format!("  {:>2}. {:<8} {:.4}", row.rank, row.node, row.score));
            }
            lines.push(String::new());
        }
    }

    if !report.robustness_analysis.is_empty() {
        section_header(&mut lines, "ROBUSTNESS");
        for trace in &report.robustness_analysis {
            lines.push(format!("Strategy: {}", trace.strategy()));
            lines.push(format!(
                "  Intact graph: {} nodes in {} strongly connected components (largest {})",
                trace.baseline().node_count,
                trace.baseline().component_count,
                trace.baseline().component_sizes.first().copied().unwrap_or(0)
            ));
            for step in trace.steps() {
                lines.push(format!(
                    "  {:>3}. removed {:<8} -> {} nodes, {} components (largest {})",
                    step.step,
                    step.removed,
                    step.remaining_nodes,
                    step.component_count,
                    step.component_sizes.first().copied().unwrap_or(0)
                ));
            }
            lines.push(String::new());
        }
    }

    if let Some(ref balance) = report.trade_balance {
        section_header(&mut lines, "TRADE BALANCE");
        let mut header = format!("{:<8} {:>8} {:>8} {:>8}", "Country", "Imports", "Exports", "Net");
        for year in &balance.years {
            header.push_str(&format!(" {:>6}", year));
        }
        lines.push(header);
        for country in &balance.countries {
            let mut row = format!(
                "{:<8} {:>8} {:>8} {:>8}",
                country.country, country.total_imports, country.total_exports, country.net_imports
            );
            for year in &balance.years {
                let net = country.per_year.get(year).map(|b| b.net_imports).unwrap_or(0);
                row.push_str(&format!(" {:>6}", net));
            }
            lines.push(row);
        }
        lines.push(String::new());
    }

    lines.push("=".repeat(80));
    lines.join("\n")
}

fn render_series(lines: &mut Vec<String>, label: &str, series: &DegreeSeries) {
    lines.push(format!("{}:", label));
    lines.push(format!(
        "  Min: {:.0}, Max: {:.0}, Mean: {:.2}, Median: {:.1}, Std Dev: {:.2}",
        series.stats.min, series.stats.max, series.stats.mean, series.stats.median, series.stats.std_dev
    ));

    match &series.fit {
        FitOutcome::Fitted(fit) => {
            lines.push(format!(
                "  Power-law fit: alpha = {:.3} +/- {:.3}, x_min = {:.0}, KS = {:.3} ({} of {} values in tail)",
                fit.alpha, fit.sigma, fit.xmin, fit.ks_distance, fit.tail_size, fit.sample_size
            ));
            for comparison in &fit.comparisons {
                let verdict = match comparison.preferred(SIGNIFICANCE) {
                    Some(winner) => format!("favors {}", winner),
                    None => "inconclusive".to_string(),
                };
                lines.push(format!(
                    "    {} vs {}: R = {:.3}, p = {:.3} ({})",
                    comparison.first, comparison.second, comparison.ratio, comparison.p_value, verdict
                ));
            }
        }
        FitOutcome::Insufficient { distinct } => {
            lines.push(format!(
                "  Power-law fit: not enough data ({} distinct positive values)",
                distinct
            ));
        }
    }
    lines.push(String::new());
}

/// Print a summary to stdout
pub fn print_summary(report: &FullAnalysisReport) {
    println!("\n=== TRADE NETWORK ANALYSIS SUMMARY ===\n");
    println!("Countries: {}", report.metadata.total_nodes);
    println!("Trade relationships: {}", report.metadata.total_edges);
    println!("Transactions: {}", report.metadata.total_transactions);

    if let Some(ref degree) = report.degree_analysis {
        println!("\nDegree Distribution:");
        for (label, series) in [("In", &degree.in_degree), ("Out", &degree.out_degree)] {
            match series.fit.fit() {
                Ok(fit) => println!("  {} alpha: {:.3} (x_min {:.0})", label, fit.alpha, fit.xmin),
                Err(e) => println!("  {}: {}", label, e),
            }
        }
    }

    if let Some(ref centrality) = report.centrality_analysis {
        println!("\nCentrality Leaders:");
        for (label, metric) in [
            ("Betweenness", CentralityMetric::Betweenness),
            ("Closeness", CentralityMetric::Closeness),
            ("Eigenvector", CentralityMetric::Eigenvector),
        ] {
            if let Some(top) = centrality.ranked(metric).first() {
                println!("  {}: {} ({:.4})", label, top.node, top.score);
            }
        }
    }

    for trace in &report.robustness_analysis {
        let last = trace
            .steps()
            .last()
            .map(|s| s.component_count)
            .unwrap_or(trace.baseline().component_count);
        println!(
            "\nRobustness ({}): {} removals, components {} -> {}",
            trace.strategy(),
            trace.steps().len(),
            trace.baseline().component_count,
            last
        );
    }

    if let Some(ref balance) = report.trade_balance {
        println!("\nTrade Balance: {} countries over {} years", balance.countries.len(), balance.years.len());
    }

    println!();
}
