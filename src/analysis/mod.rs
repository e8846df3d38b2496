//! Structural analysis of directed trade networks.
//!
//! This module provides weighted degree distributions with power-law fits,
//! centrality rankings, node-removal robustness simulations and per-country
//! trade balance tables.

pub mod types;
pub mod components;
pub mod powerlaw;
pub mod degree;
pub mod centrality;
pub mod robustness;
pub mod trade_balance;
pub mod report;

pub use types::*;
pub use components::{is_strongly_connected, strongly_connected_components, summarize_components};
pub use powerlaw::{fit_frequency_outcome, fit_frequency_table, fit_power_law};
pub use degree::analyze_degrees;
pub use centrality::{analyze_centrality, EigenvectorSettings};
pub use robustness::{simulate, simulate_all, simulate_plans, simulate_with_rng, RemovalStrategy};
pub use trade_balance::trade_balance;
pub use report::{generate_json_report, generate_text_report};
