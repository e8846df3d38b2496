//! Typed failures raised by the analysis core.
//!
//! None of these are transient: each one means the input was malformed or
//! the request cannot be satisfied on the given graph, so callers decide
//! how to present them and nothing is retried.

/// Errors produced by graph construction and the analyzers
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AnalysisError {
    /// A transaction row lacks a required field
    #[error("Transaction row {row} is missing the {field} field")]
    Schema { row: usize, field: &'static str },

    /// The degree spectrum is too small to fit
    #[error("Power-law fit needs at least 2 distinct nonzero degree values, found {distinct}")]
    InsufficientData { distinct: usize },

    /// Eigenvector power iteration hit its cap
    #[error("Eigenvector centrality did not converge within {iterations} iterations")]
    Convergence { iterations: usize },

    /// Eigenvector centrality requested on a graph that is not strongly connected
    #[error("Eigenvector centrality requires a strongly connected graph with at least one edge, found {components} components")]
    Reducibility { components: usize },

    /// The explicit removal list ran out before the simulation finished
    #[error("Explicit removal list exhausted after {available} removals")]
    ExhaustedList { available: usize },

    /// A named node is not present in the graph
    #[error("Node '{0}' is not present in the graph")]
    UnknownNode(String),
}
