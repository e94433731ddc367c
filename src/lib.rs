//! # Kartta - SOM Training Engine
//!
//! Kartta trains self-organizing maps: fixed and growing rectangular
//! lattices of units, plus a growing mesh (a dynamic simplicial-complex
//! variant of growing neural gas), projecting high-dimensional input
//! vectors onto a low-dimensional structure.
//!
//! ## Overview
//!
//! The lattice trainer runs the classic competitive-learning loop: find
//! the best-matching unit for an input, then pull every unit towards the
//! input weighted by a Gaussian neighbourhood kernel over map distance.
//! Between epochs the map quality is evaluated and the lattice can grow
//! by interpolated rows, columns, or planes until a quality target is
//! met. The weight-update phase runs on a fixed worker pool over a
//! disjoint spatial partition of the lattice volume.
//!
//! The growing mesh starts from three units joined by one simplex and
//! inserts/removes units driven by decayed win-frequency statistics,
//! with a force-directed layout for its display positions.
//!
//! The adaptive-coordinates layer maintains, per configured threshold,
//! a continuously relaxed virtual position per lattice unit, updated
//! inline with every training step and persisted in a dedicated text
//! format (optionally gzip-compressed).
//!
//! ## Quick Start
//!
//! ```rust
//! use kartta::{
//!     DenseInputs, InputDatum, Lattice, LatticeConfig, LatticeTrainer, TrainingConfig,
//! };
//!
//! let source = DenseInputs::new(vec![
//!     InputDatum::new("a", vec![0.0, 0.0]),
//!     InputDatum::new("b", vec![1.0, 1.0]),
//! ]);
//!
//! let config = LatticeConfig {
//!     xsize: 4,
//!     ysize: 4,
//!     dim: 2,
//!     seed: Some(42),
//!     ..Default::default()
//! };
//! let mut lattice = Lattice::from_source(&config, &source).unwrap();
//!
//! let mut trainer = LatticeTrainer::new(
//!     TrainingConfig {
//!         iterations: 200,
//!         seed: Some(42),
//!         ..Default::default()
//!     },
//!     &lattice,
//! );
//! let run = trainer.train_epochs(&mut lattice, &source).unwrap();
//! assert!(run.converged);
//! ```
//!
//! ## Architecture
//!
//! - [`lattice`] - unit/grid data model, spatial partition, trainer
//! - [`mesh`] - the growing mesh structure and its trainer
//! - [`adaptive`] - adaptive-coordinates layers and file format
//! - [`metric`] - pluggable distance metrics
//! - [`quality`] - pluggable map quality measures
//! - [`input`] - input data sources
//! - [`progress`] - progress reporting and cancellation

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod adaptive;
pub mod config;
pub mod error;
pub mod input;
pub mod lattice;
pub mod mesh;
pub mod metric;
pub mod progress;
pub mod quality;

// Re-export commonly used types
pub use adaptive::{AdaptiveCoordinates, CoordinatesFormat, VirtualLayer, VirtualUnit};
pub use config::{
    AdaptiveConfig, LatticeConfig, LayoutConfig, MeshConfig, TrainingConfig, WeightInit,
};
pub use error::{KarttaError, Result};
pub use input::{DenseInputs, InputDatum, InputSource};
pub use lattice::{
    Axis, Lattice, LatticeTrainer, MappedInput, Position, SpatialPartition, TrainingMetrics,
    TrainingRun, Unit,
};
pub use mesh::{MeshGraph, MeshTrainer, MeshUnit, Simplex, SimplexKey, UnitKey};
pub use metric::{DistanceMetric, EuclideanMetric, ManhattanMetric, MetricKind, SquaredEuclideanMetric};
pub use progress::{CancelToken, NullProgress, ProgressListener};
pub use quality::{MeanQuantizationError, QualityKind, QualityMeasure, QuantizationError};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
