//! # tradenet - Structural analysis of international trade networks
//!
//! This library turns a table of bilateral trade transactions into a weighted
//! directed graph of countries and measures how that network is shaped and
//! how it breaks apart.
//!
//! ## Overview
//!
//! Each transaction names an importer and an exporter. Repeated pairs are
//! aggregated into a single importer -> exporter edge whose weight is either
//! 1.0 or the number of transactions. Four analyses run over the resulting
//! graph:
//!
//! - **Degree distribution**: weighted in/out degrees with a maximum-likelihood
//!   power-law fit and likelihood-ratio comparisons against exponential and
//!   log-normal alternatives
//! - **Centrality**: betweenness, closeness and eigenvector scores per country
//! - **Robustness**: targeted or random node removal, recording the strongly
//!   connected component structure after every step
//! - **Trade balance**: per-country import/export counts, overall and per year
//!
//! ## Architecture
//!
//! - `ingest`: CSV/JSON transaction loading
//! - `graph`: the `TradeGraph` type and `build_graph`
//! - `analysis`: the analyzers and report writers
//! - `config`: YAML analysis settings and validation
//! - `error`: the typed `AnalysisError` raised by the core
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use std::path::Path;
//! use tradenet::analysis::{self, EigenvectorSettings, RemovalStrategy};
//! use tradenet::{build_graph, ingest, WeightScheme};
//!
//! let table = ingest::load_transactions(Path::new("transactions.csv"))?;
//! let graph = build_graph(&table, WeightScheme::Frequency)?;
//!
//! let degrees = analysis::analyze_degrees(&graph);
//! let core = graph.largest_strongly_connected_component();
//! let centrality = analysis::analyze_centrality(&core, &EigenvectorSettings::default())?;
//! let trace = analysis::simulate(&graph, &RemovalStrategy::MaxDegree, 10)?;
//!
//! println!("in-degree fit: {:?}", degrees.in_degree.fit);
//! println!("components after each removal: {:?}", trace.component_curve());
//! # let _ = centrality;
//! # Ok::<(), color_eyre::eyre::Error>(())
//! ```
//!
//! ## Configuration Format
//!
//! ```yaml
//! weight_scheme: frequency        # or unit
//! removal_strategy: explicit      # random/max_degree/max_betweenness/explicit
//! explicit_targets: [US, HK, CN]
//! max_steps: 3
//! centrality_convergence_tolerance: 1.0e-6
//! centrality_max_iterations: 100
//! random_seed: 7
//! ```
//!
//! ## Error Handling
//!
//! The analyzers return `Result<T, AnalysisError>`. Loading, configuration and
//! reporting return `color_eyre::Result` with context attached.

pub mod error;
pub mod ingest;
pub mod graph;
pub mod config;
pub mod analysis;

pub use error::AnalysisError;
pub use graph::{build_graph, Edge, TradeGraph, WeightScheme};
pub use ingest::{TransactionRecord, TransactionTable};
