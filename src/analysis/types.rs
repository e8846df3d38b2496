//! Report types produced by the trade network analyses.

use std::collections::BTreeMap;
use serde::{Deserialize, Serialize};

use crate::error::AnalysisError;
use crate::graph::WeightScheme;

/// Weighted degrees of a single country
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeDegree {
    pub node: String,
    /// Sum of weights of edges pointing at this node (exporter side)
    pub in_degree: f64,
    /// Sum of weights of edges leaving this node (importer side)
    pub out_degree: f64,
    pub total: f64,
}

/// Statistical summary of a degree series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DegreeStats {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub median: f64,
    pub std_dev: f64,
}

/// Distribution families compared against the power-law tail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Distribution {
    PowerLaw,
    Exponential,
    LogNormal,
}

impl std::fmt::Display for Distribution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Distribution::PowerLaw => write!(f, "power_law"),
            Distribution::Exponential => write!(f, "exponential"),
            Distribution::LogNormal => write!(f, "lognormal"),
        }
    }
}

/// Log-likelihood ratio test between two fitted families.
///
/// A positive `ratio` favours `first`, a negative one favours `second`.
/// `p_value` is the probability of seeing a ratio this far from zero if
/// both families fit equally well.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistributionComparison {
    pub first: Distribution,
    pub second: Distribution,
    /// Normalized log-likelihood ratio
    pub ratio: f64,
    pub p_value: f64,
}

impl DistributionComparison {
    /// The family the test favours at the given significance level, if any
    pub fn preferred(&self, significance: f64) -> Option<Distribution> {
        if self.p_value >= significance || self.ratio == 0.0 {
            None
        } else if self.ratio > 0.0 {
            Some(self.first)
        } else {
            Some(self.second)
        }
    }
}

/// Maximum-likelihood power-law fit of a degree tail
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PowerLawFit {
    /// Scaling exponent
    pub alpha: f64,
    /// Lower cutoff of the fitted tail
    pub xmin: f64,
    /// Standard error of alpha
    pub sigma: f64,
    /// Kolmogorov-Smirnov distance between tail and model
    pub ks_distance: f64,
    /// Observations at or above xmin
    pub tail_size: usize,
    /// Nonzero observations considered
    pub sample_size: usize,
    pub comparisons: Vec<DistributionComparison>,
}

impl PowerLawFit {
    /// Look up the comparison between two families, in either order
    pub fn comparison(&self, a: Distribution, b: Distribution) -> Option<DistributionComparison> {
        self.comparisons.iter().find_map(|c| {
            if c.first == a && c.second == b {
                Some(c.clone())
            } else if c.first == b && c.second == a {
                Some(DistributionComparison {
                    first: a,
                    second: b,
                    ratio: -c.ratio,
                    p_value: c.p_value,
                })
            } else {
                None
            }
        })
    }
}

/// Result of fitting one degree series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FitOutcome {
    Fitted(PowerLawFit),
    Insufficient { distinct: usize },
}

impl FitOutcome {
    /// The fit, or the [`AnalysisError::InsufficientData`] that prevented it
    pub fn fit(&self) -> Result<&PowerLawFit, AnalysisError> {
        match self {
            FitOutcome::Fitted(fit) => Ok(fit),
            FitOutcome::Insufficient { distinct } => {
                Err(AnalysisError::InsufficientData { distinct: *distinct })
            }
        }
    }
}

/// Empirical distribution of one degree direction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DegreeSeries {
    /// Degree value -> number of nodes holding it
    pub frequency: BTreeMap<u64, usize>,
    pub stats: DegreeStats,
    pub fit: FitOutcome,
}

/// Degree analysis of a trade graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DegreeReport {
    pub nodes: BTreeMap<String, NodeDegree>,
    pub in_degree: DegreeSeries,
    pub out_degree: DegreeSeries,
    /// Total (in + out) degree value -> number of nodes
    pub total_frequency: BTreeMap<u64, usize>,
}

/// Centrality scores of a single country
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NodeCentrality {
    pub betweenness: f64,
    pub closeness: f64,
    pub eigenvector: f64,
}

/// Which score to rank by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CentralityMetric {
    Betweenness,
    Closeness,
    Eigenvector,
}

impl CentralityMetric {
    pub fn score(&self, scores: &NodeCentrality) -> f64 {
        match self {
            CentralityMetric::Betweenness => scores.betweenness,
            CentralityMetric::Closeness => scores.closeness,
            CentralityMetric::Eigenvector => scores.eigenvector,
        }
    }
}

/// One row of a ranked centrality table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedNode {
    pub rank: usize,
    pub node: String,
    pub score: f64,
}

/// Centrality analysis of a trade graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CentralityReport {
    pub scores: BTreeMap<String, NodeCentrality>,
}

impl CentralityReport {
    /// Nodes by descending score; ties go to the smaller identifier
    pub fn ranked(&self, metric: CentralityMetric) -> Vec<RankedNode> {
        let mut rows: Vec<(&String, f64)> = self
            .scores
            .iter()
            .map(|(node, scores)| (node, metric.score(scores)))
            .collect();

        rows.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.cmp(b.0))
        });

        rows.into_iter()
            .enumerate()
            .map(|(i, (node, score))| RankedNode {
                rank: i + 1,
                node: node.clone(),
                score,
            })
            .collect()
    }
}

/// Strongly connected component structure of a graph
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentSummary {
    pub node_count: usize,
    pub component_count: usize,
    /// Component sizes, largest first
    pub component_sizes: Vec<usize>,
    /// Component members (sorted), in the same order as `component_sizes`
    pub components: Vec<Vec<String>>,
}

/// State of the working graph after one removal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemovalStep {
    /// 1-based removal number
    pub step: usize,
    pub removed: String,
    pub remaining_nodes: usize,
    pub component_count: usize,
    pub component_sizes: Vec<usize>,
    pub components: Vec<Vec<String>>,
}

/// Fragmentation curve of one attack simulation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FragmentationTrace {
    strategy: String,
    baseline: ComponentSummary,
    steps: Vec<RemovalStep>,
}

impl FragmentationTrace {
    pub(crate) fn new(strategy: String, baseline: ComponentSummary) -> Self {
        Self {
            strategy,
            baseline,
            steps: Vec::new(),
        }
    }

    pub(crate) fn record(&mut self, removed: String, summary: ComponentSummary) {
        let step = self.steps.len() + 1;
        self.steps.push(RemovalStep {
            step,
            removed,
            remaining_nodes: summary.node_count,
            component_count: summary.component_count,
            component_sizes: summary.component_sizes,
            components: summary.components,
        });
    }

    pub fn strategy(&self) -> &str {
        &self.strategy
    }

    /// Components of the intact graph before any removal
    pub fn baseline(&self) -> &ComponentSummary {
        &self.baseline
    }

    pub fn steps(&self) -> &[RemovalStep] {
        &self.steps
    }

    /// Nodes removed, in order
    pub fn removed_nodes(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.removed.as_str()).collect()
    }

    /// (removals so far, component count) points, starting with the intact graph
    pub fn component_curve(&self) -> Vec<(usize, usize)> {
        std::iter::once((0, self.baseline.component_count))
            .chain(self.steps.iter().map(|s| (s.step, s.component_count)))
            .collect()
    }
}

/// Import/export transaction counts for one country in one year
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearBalance {
    pub imports: usize,
    pub exports: usize,
    pub net_imports: i64,
}

/// Import/export transaction counts for one country
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountryBalance {
    pub country: String,
    pub total_imports: usize,
    pub total_exports: usize,
    pub net_imports: i64,
    /// Every year present in the table, zero-filled
    pub per_year: BTreeMap<i32, YearBalance>,
}

/// Per-country trade balance table
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeBalanceReport {
    pub years: Vec<i32>,
    pub countries: Vec<CountryBalance>,
}

/// Metadata about an analysis run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisMetadata {
    pub analysis_timestamp: String,
    pub source: String,
    pub weight_scheme: WeightScheme,
    pub total_transactions: usize,
    pub total_nodes: usize,
    pub total_edges: usize,
}

/// Complete analysis report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FullAnalysisReport {
    pub metadata: AnalysisMetadata,
    pub degree_analysis: Option<DegreeReport>,
    pub centrality_analysis: Option<CentralityReport>,
    #[serde(default)]
    pub robustness_analysis: Vec<FragmentationTrace>,
    pub trade_balance: Option<TradeBalanceReport>,
}
