//! Trade network analysis CLI.
//!
//! Builds a weighted importer -> exporter graph from a transaction file and
//! reports degree distributions, centrality, robustness under node removal
//! and per-country trade balance.

use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Context, Result};
use env_logger::Env;
use log::{info, warn};

use tradenet::analysis::{self, report, types::FullAnalysisReport, RemovalStrategy};
use tradenet::config::{self, AnalysisConfig};
use tradenet::{build_graph, ingest, TradeGraph, TransactionTable, WeightScheme};

#[derive(Parser, Debug)]
#[command(name = "tradenet")]
#[command(about = "Structural analysis of international trade networks")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Analysis configuration YAML file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Output directory for reports
    #[arg(short, long, default_value = "analysis_output", global = true)]
    output: PathBuf,

    /// Log level (trace, debug, info, warn, error); overrides the config file
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Edge weighting (unit, frequency); overrides the config file
    #[arg(long, global = true)]
    weights: Option<WeightScheme>,

    /// Number of parallel workers (0 = auto-detect)
    #[arg(short = 'j', long, default_value = "0", global = true)]
    threads: usize,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run every analysis and write a combined report
    Full {
        /// Transaction file (.csv or .json)
        input: PathBuf,

        /// Compute centrality on the largest strongly connected component
        #[arg(long)]
        largest_component: bool,
    },

    /// Weighted degree distributions and power-law fits
    Degree {
        /// Transaction file (.csv or .json)
        input: PathBuf,
    },

    /// Betweenness, closeness and eigenvector centrality
    Centrality {
        /// Transaction file (.csv or .json)
        input: PathBuf,

        /// Compute on the largest strongly connected component
        #[arg(long)]
        largest_component: bool,
    },

    /// Node-removal simulation
    Robustness {
        /// Transaction file (.csv or .json)
        input: PathBuf,

        /// Removal strategy (random, max-degree, max-betweenness, explicit:US,HK);
        /// repeat to run several simulations in parallel
        #[arg(long = "strategy")]
        strategies: Vec<RemovalStrategy>,

        /// Maximum number of removals
        #[arg(long)]
        max_steps: Option<usize>,

        /// Seed for the random strategy
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Per-country import/export counts
    Balance {
        /// Transaction file (.csv or .json)
        input: PathBuf,
    },

    /// Show summary statistics
    Summary {
        /// Transaction file (.csv or .json)
        input: PathBuf,
    },
}

impl Commands {
    fn input(&self) -> &Path {
        match self {
            Commands::Full { input, .. }
            | Commands::Degree { input }
            | Commands::Centrality { input, .. }
            | Commands::Robustness { input, .. }
            | Commands::Balance { input }
            | Commands::Summary { input } => input,
        }
    }
}

fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();

    // Configuration is read first so its log level can seed the logger
    let mut analysis_config = match &cli.config {
        Some(path) => config::load_config(path)?,
        None => AnalysisConfig::default(),
    };
    if let Some(weights) = cli.weights {
        analysis_config.weight_scheme = weights;
    }

    let log_level = cli
        .log_level
        .clone()
        .or_else(|| analysis_config.log_level.clone())
        .unwrap_or_else(|| "info".to_string());
    env_logger::Builder::from_env(Env::default().default_filter_or(&log_level)).init();

    if let Some(path) = &cli.config {
        info!("Configuration loaded from {}", path.display());
    }

    if cli.threads > 0 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(cli.threads)
            .build_global()
            .context("Failed to configure thread pool")?;
    }

    let input = cli.command.input().to_path_buf();
    let transactions = ingest::load_transactions(&input)?;
    let graph = build_graph(&transactions, analysis_config.weight_scheme)
        .with_context(|| format!("Failed to build trade graph from {}", input.display()))?;
    info!(
        "Built {} graph with {} countries and {} trade relationships",
        analysis_config.weight_scheme,
        graph.node_count(),
        graph.edge_count()
    );

    if !matches!(cli.command, Commands::Summary { .. }) {
        fs::create_dir_all(&cli.output).with_context(|| {
            format!("Failed to create output directory: {}", cli.output.display())
        })?;
    }

    let mut report = FullAnalysisReport {
        metadata: report::build_metadata(
            &input.display().to_string(),
            analysis_config.weight_scheme,
            &transactions,
            &graph,
        ),
        degree_analysis: None,
        centrality_analysis: None,
        robustness_analysis: Vec::new(),
        trade_balance: None,
    };

    let prefix = match cli.command {
        Commands::Full { largest_component, .. } => {
            run_full_analysis(
                &mut report,
                &analysis_config,
                &transactions,
                &graph,
                largest_component,
            )?;
            "full"
        }
        Commands::Degree { .. } => {
            info!("Analyzing degree distributions...");
            report.degree_analysis = Some(analysis::analyze_degrees(&graph));
            "degree"
        }
        Commands::Centrality { largest_component, .. } => {
            let target = centrality_graph(&graph, largest_component);
            info!("Analyzing centrality on {} countries...", target.node_count());
            let centrality = analysis::analyze_centrality(&target, &analysis_config.eigenvector_settings())
                .context("Centrality analysis failed (try --largest-component)")?;
            report.centrality_analysis = Some(centrality);
            "centrality"
        }
        Commands::Robustness {
            strategies,
            max_steps,
            seed,
            ..
        } => {
            if max_steps == Some(0) {
                color_eyre::eyre::bail!("--max-steps must be a positive integer");
            }
            let plans = plan_simulations(strategies, max_steps, &analysis_config);
            let seed = seed.or(analysis_config.random_seed);

            report.robustness_analysis = run_simulations(&graph, &plans, seed)?;
            "robustness"
        }
        Commands::Balance { .. } => {
            info!("Computing trade balance...");
            report.trade_balance = Some(analysis::trade_balance(&transactions));
            "balance"
        }
        Commands::Summary { .. } => {
            print_data_summary(&input, &transactions, &graph);
            return Ok(());
        }
    };

    analysis::generate_json_report(&report, &cli.output.join(format!("{}_report.json", prefix)))?;
    analysis::generate_text_report(&report, &cli.output.join(format!("{}_report.txt", prefix)))?;
    report::print_summary(&report);

    info!("Analysis complete. Reports written to {}", cli.output.display());
    Ok(())
}

fn run_full_analysis(
    report: &mut FullAnalysisReport,
    analysis_config: &AnalysisConfig,
    transactions: &TransactionTable,
    graph: &TradeGraph,
    largest_component: bool,
) -> Result<()> {
    info!("Running full analysis...");

    let core = centrality_graph(graph, largest_component);
    let settings = analysis_config.eigenvector_settings();

    // Both analyzers only read the graph
    let (degree, centrality) = rayon::join(
        || analysis::analyze_degrees(graph),
        || analysis::analyze_centrality(&core, &settings),
    );

    report.degree_analysis = Some(degree);
    report.centrality_analysis = match centrality {
        Ok(centrality) => Some(centrality),
        Err(e) => {
            warn!("Skipping centrality: {}", e);
            None
        }
    };

    report.robustness_analysis = run_simulations(
        graph,
        &plan_simulations(Vec::new(), None, analysis_config),
        analysis_config.random_seed,
    )?;
    report.trade_balance = Some(analysis::trade_balance(transactions));

    Ok(())
}

fn centrality_graph(graph: &TradeGraph, largest_component: bool) -> TradeGraph {
    if largest_component {
        let core = graph.largest_strongly_connected_component();
        info!(
            "Restricting centrality to the largest strongly connected component ({} of {} countries)",
            core.node_count(),
            graph.node_count()
        );
        core
    } else {
        graph.clone()
    }
}

/// Pair each strategy with its removal limit. Without `--strategy` the
/// configured strategy runs; without `--max-steps` an explicit list runs to
/// its end.
fn plan_simulations(
    strategies: Vec<RemovalStrategy>,
    max_steps: Option<usize>,
    analysis_config: &AnalysisConfig,
) -> Vec<(RemovalStrategy, usize)> {
    let strategies = if strategies.is_empty() {
        vec![analysis_config.strategy()]
    } else {
        strategies
    };

    strategies
        .into_iter()
        .map(|strategy| {
            let steps = max_steps.unwrap_or_else(|| analysis_config.step_limit(&strategy));
            (strategy, steps)
        })
        .collect()
}

fn run_simulations(
    graph: &TradeGraph,
    plans: &[(RemovalStrategy, usize)],
    seed: Option<u64>,
) -> Result<Vec<analysis::FragmentationTrace>> {
    info!(
        "Simulating {} removal strateg{}...",
        plans.len(),
        if plans.len() == 1 { "y" } else { "ies" }
    );

    let mut traces = Vec::with_capacity(plans.len());
    for ((strategy, steps), result) in plans
        .iter()
        .zip(analysis::simulate_plans(graph, plans, seed))
    {
        let trace = result.with_context(|| {
            format!("Removal simulation '{}' ({} steps) failed", strategy, steps)
        })?;
        info!(
            "Strategy {} removed {} countries",
            trace.strategy(),
            trace.steps().len()
        );
        traces.push(trace);
    }
    Ok(traces)
}

fn print_data_summary(input: &Path, transactions: &TransactionTable, graph: &TradeGraph) {
    let years: std::collections::BTreeSet<i32> =
        transactions.rows().iter().filter_map(|r| r.year).collect();
    let self_loops = graph.edges().filter(|e| e.is_self_loop()).count();
    let components = analysis::summarize_components(graph);

    println!("\n=== TRADE DATA SUMMARY ===\n");
    println!("Source: {}", input.display());
    println!();
    println!("Transactions: {}", transactions.len());
    match (years.first(), years.last()) {
        (Some(first), Some(last)) => println!("  Years: {}-{} ({} distinct)", first, last, years.len()),
        _ => println!("  Years: none recorded"),
    }
    println!();
    println!("Countries: {}", graph.node_count());
    println!("Trade relationships: {}", graph.edge_count());
    println!("  Self-loops: {}", self_loops);
    println!("  Total weight: {:.0}", graph.total_weight());
    println!();
    println!("Strongly connected components: {}", components.component_count);
    println!(
        "  Largest: {} countries",
        components.component_sizes.first().copied().unwrap_or(0)
    );
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_robustness_flags() {
        let cli = Cli::try_parse_from([
            "tradenet",
            "--output",
            "out",
            "robustness",
            "trade.csv",
            "--strategy",
            "max-degree",
            "--strategy",
            "explicit:US,HK",
            "--max-steps",
            "3",
        ])
        .unwrap();

        assert_eq!(cli.output, PathBuf::from("out"));
        match cli.command {
            Commands::Robustness {
                input,
                strategies,
                max_steps,
                seed,
            } => {
                assert_eq!(input, PathBuf::from("trade.csv"));
                assert_eq!(
                    strategies,
                    vec![
                        RemovalStrategy::MaxDegree,
                        RemovalStrategy::Explicit(vec!["US".into(), "HK".into()])
                    ]
                );
                assert_eq!(max_steps, Some(3));
                assert_eq!(seed, None);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "tradenet",
            "centrality",
            "trade.json",
            "--largest-component",
            "--weights",
            "unit",
            "-j",
            "2",
        ])
        .unwrap();

        assert_eq!(cli.weights, Some(WeightScheme::Unit));
        assert_eq!(cli.threads, 2);
        assert!(matches!(
            cli.command,
            Commands::Centrality {
                largest_component: true,
                ..
            }
        ));
        assert_eq!(cli.command.input(), Path::new("trade.json"));
    }

    #[test]
    fn test_explicit_list_runs_to_its_end_by_default() {
        let cli = Cli::try_parse_from([
            "tradenet",
            "robustness",
            "trade.csv",
            "--strategy",
            "explicit:US,HK,CN",
            "--strategy",
            "max-degree",
        ])
        .unwrap();
        let Commands::Robustness { strategies, max_steps, .. } = cli.command else {
            panic!("expected robustness command");
        };

        let config = AnalysisConfig::default();
        let plans = plan_simulations(strategies.clone(), max_steps, &config);
        assert_eq!(plans[0].1, 3);
        assert_eq!(plans[1].1, tradenet::config::DEFAULT_MAX_STEPS);

        let capped = plan_simulations(strategies, Some(2), &config);
        assert!(capped.iter().all(|(_, steps)| *steps == 2));

        let configured = plan_simulations(Vec::new(), None, &config);
        assert_eq!(configured, vec![(RemovalStrategy::MaxDegree, tradenet::config::DEFAULT_MAX_STEPS)]);
    }

    #[test]
    fn test_rejects_unknown_strategy() {
        let result = Cli::try_parse_from(["tradenet", "robustness", "trade.csv", "--strategy", "sideways"]);
        assert!(result.is_err());
    }
}
