//! Analysis configuration.
//!
//! Settings come from an optional YAML file; every field has a default so an
//! empty file (or no file at all) is a valid configuration.

use std::fs::File;
use std::path::Path;

use color_eyre::eyre::{Context, Result};
use log::info;
use serde::{Deserialize, Serialize};

use crate::analysis::centrality::EigenvectorSettings;
use crate::analysis::robustness::RemovalStrategy;
use crate::graph::WeightScheme;

/// Removal budget for non-explicit strategies when `max_steps` is unset
pub const DEFAULT_MAX_STEPS: usize = 50;

/// Removal policy names accepted in the configuration file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    Random,
    #[default]
    #[serde(alias = "max-degree")]
    MaxDegree,
    #[serde(alias = "max-betweenness")]
    MaxBetweenness,
    Explicit,
}

/// Top-level analysis configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub weight_scheme: WeightScheme,
    pub removal_strategy: StrategyKind,
    /// Removal order for the explicit strategy
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub explicit_targets: Vec<String>,
    /// Removal limit; unset runs an explicit list to its end and other
    /// strategies for [`DEFAULT_MAX_STEPS`] removals
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_steps: Option<usize>,
    pub centrality_convergence_tolerance: f64,
    pub centrality_max_iterations: usize,
    /// Seed for the random strategy; entropy when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub random_seed: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        let eigen = EigenvectorSettings::default();
        Self {
            weight_scheme: WeightScheme::Frequency,
            removal_strategy: StrategyKind::MaxDegree,
            explicit_targets: Vec::new(),
            max_steps: None,
            centrality_convergence_tolerance: eigen.tolerance,
            centrality_max_iterations: eigen.max_iterations,
            random_seed: None,
            log_level: None,
        }
    }
}

impl AnalysisConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_steps == Some(0) {
            return Err(ConfigError::InvalidRobustness(
                "max_steps must be a positive integer".to_string(),
            ));
        }

        if self.removal_strategy == StrategyKind::Explicit && self.explicit_targets.is_empty() {
            return Err(ConfigError::InvalidRobustness(
                "explicit removal strategy requires explicit_targets".to_string(),
            ));
        }

        let tolerance = self.centrality_convergence_tolerance;
        if !(tolerance.is_finite() && tolerance > 0.0) {
            return Err(ConfigError::InvalidCentrality(format!(
                "centrality_convergence_tolerance must be positive, got {}",
                tolerance
            )));
        }

        if self.centrality_max_iterations == 0 {
            return Err(ConfigError::InvalidCentrality(
                "centrality_max_iterations must be a positive integer".to_string(),
            ));
        }

        Ok(())
    }

    pub fn eigenvector_settings(&self) -> EigenvectorSettings {
        EigenvectorSettings {
            tolerance: self.centrality_convergence_tolerance,
            max_iterations: self.centrality_max_iterations,
        }
    }

    /// Removal limit for a run of `strategy`
    pub fn step_limit(&self, strategy: &RemovalStrategy) -> usize {
        self.max_steps
            .unwrap_or_else(|| strategy.default_steps(DEFAULT_MAX_STEPS))
    }

    /// Removal strategy with the explicit target list attached
    pub fn strategy(&self) -> RemovalStrategy {
        match self.removal_strategy {
            StrategyKind::Random => RemovalStrategy::Random,
            StrategyKind::MaxDegree => RemovalStrategy::MaxDegree,
            StrategyKind::MaxBetweenness => RemovalStrategy::MaxBetweenness,
            StrategyKind::Explicit => RemovalStrategy::Explicit(self.explicit_targets.clone()),
        }
    }
}

/// Configuration validation errors
#[derive(Debug, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid robustness configuration: {0}")]
    InvalidRobustness(String),
    #[error("Invalid centrality configuration: {0}")]
    InvalidCentrality(String),
}

/// Load and validate configuration from a YAML file
pub fn load_config(config_path: &Path) -> Result<AnalysisConfig> {
    info!("Loading configuration from: {:?}", config_path);

    let file = File::open(config_path)
        .with_context(|| format!("Failed to open config file {}", config_path.display()))?;

    // An empty document deserializes as null rather than an empty mapping
    let value: serde_yaml::Value = serde_yaml::from_reader(file)
        .with_context(|| format!("Failed to parse YAML in {}", config_path.display()))?;
    let config: AnalysisConfig = if value.is_null() {
        AnalysisConfig::default()
    } else {
        serde_yaml::from_value(value).context("Invalid analysis configuration")?
    };

    config.validate()?;

    info!(
        "Using {} weights, {} removal strategy, up to {} steps",
        config.weight_scheme,
        config.strategy(),
        config.step_limit(&config.strategy())
    );

    Ok(config)
}
