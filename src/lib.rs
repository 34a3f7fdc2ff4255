//! Genre Tools - post-processing utilities for topic models of dramatic texts
//!
//! The library reads document embedding tables (tab-separated, vectors as JSON
//! arrays), pools segment vectors into per-work vectors, scores cluster
//! assignments against genre labels, cross-validates genre classifiers and
//! renders principal-component scatterplots.

pub mod aggregate;
pub mod classify;
pub mod convert;
pub mod learn;
pub mod pooling;
pub mod purity;
pub mod scatterplot;
pub mod table;
pub mod utils;

pub use classify::{AccuracyScores, EvaluationConfig};
pub use pooling::PoolingStrategy;
pub use purity::PurityReport;
pub use scatterplot::PlotStyle;
pub use table::{GenreMetadata, VectorRow};
pub use utils::ToolError;

/// Result type used throughout the library
pub type Result<T> = anyhow::Result<T>;
