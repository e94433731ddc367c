//! Configuration for the Kartta SOM training engine.

use crate::metric::MetricKind;
use crate::quality::QualityKind;
use serde::{Deserialize, Serialize};

/// Weight-vector initialization strategy for new units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum WeightInit {
    /// Sample each component from a normal distribution with mean 0.
    Normal {
        /// Standard deviation of the distribution.
        std: f64,
    },
    /// Sample each component uniformly from `[lo, hi)`.
    Uniform {
        /// Lower bound.
        lo: f64,
        /// Upper bound.
        hi: f64,
    },
    /// Sample each component uniformly from the input source's
    /// per-feature data intervals.
    Intervals,
    /// All components zero.
    Zeros,
}

impl Default for WeightInit {
    fn default() -> Self {
        WeightInit::Normal { std: 0.1 }
    }
}

/// Lattice shape and initialization configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LatticeConfig {
    /// Number of units along the x axis.
    /// Default: 2.
    pub xsize: usize,

    /// Number of units along the y axis.
    /// Default: 2.
    pub ysize: usize,

    /// Number of units along the z axis (1 for a planar map).
    /// Default: 1.
    pub zsize: usize,

    /// Dimensionality of the unit weight vectors, fixed for the
    /// lifetime of the lattice.
    pub dim: usize,

    /// Use toroidal (wrap-around) map distance instead of planar
    /// Euclidean.
    /// Default: false.
    pub toroidal: bool,

    /// Weight initialization strategy.
    /// Default: normal with std 0.1.
    pub init: WeightInit,

    /// Random seed for reproducible initialization.
    /// Default: None (random).
    pub seed: Option<u64>,
}

impl Default for LatticeConfig {
    fn default() -> Self {
        Self {
            xsize: 2,
            ysize: 2,
            zsize: 1,
            dim: 2,
            toroidal: false,
            init: WeightInit::default(),
            seed: None,
        }
    }
}

impl LatticeConfig {
    /// Returns the total number of lattice cells.
    #[inline]
    pub fn total_units(&self) -> usize {
        self.xsize * self.ysize * self.zsize
    }
}

/// Lattice trainer configuration.
///
/// The decay floors, growth bound, and interruption cadence surface
/// constants that the training loop depends on; they rarely need tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingConfig {
    /// Competitive-learning steps per epoch.
    /// Default: 1000.
    pub iterations: usize,

    /// Initial learning rate.
    /// Default: 0.7.
    pub initial_learnrate: f64,

    /// Initial neighbourhood width (sigma of the Gaussian kernel).
    /// Default: half the largest lattice axis is a common choice;
    /// the default here is 2.0.
    pub initial_sigma: f64,

    /// Growth control: `1.0` trains a fixed-size map; lower values keep
    /// growing until the global quality reaches `target_quality * tau`.
    /// Default: 1.0.
    pub tau: f64,

    /// Quality target for the growth loop, in the units of the
    /// configured quality measure.
    /// Default: 0.0.
    pub target_quality: f64,

    /// Lower bound for the decayed learning rate, avoiding stalls.
    /// Default: 0.0001.
    pub learnrate_floor: f64,

    /// Lower bound for the decayed sigma.
    /// Default: 0.01.
    pub sigma_floor: f64,

    /// Time constant of the exponential decay, in iterations.
    /// 0 selects `iterations / 8`.
    /// Default: 0.
    pub decay_param: f64,

    /// Minimum per-class training probability for selective training.
    /// Default: 0.1.
    pub min_class_probability: f64,

    /// Fire the progress listener (and check cancellation) every this
    /// many iterations.
    /// Default: 1000.
    pub interrupt_every: usize,

    /// Upper bound on growth steps; reaching it stops the growth loop
    /// with a warning instead of spinning on an unreachable target.
    /// Default: 100.
    pub max_growth_steps: usize,

    /// Worker-pool size for the parallel weight-update phase.
    /// 0 uses all available cores.
    /// Default: 0.
    pub pool_size: usize,

    /// Distance metric used for winner search and mapping.
    /// Default: Euclidean.
    pub metric: MetricKind,

    /// Quality measure gating the growth loop.
    /// Default: mean quantization error.
    pub quality: QualityKind,

    /// Random seed for input sampling.
    /// Default: None (random).
    pub seed: Option<u64>,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            iterations: 1000,
            initial_learnrate: 0.7,
            initial_sigma: 2.0,
            tau: 1.0,
            target_quality: 0.0,
            learnrate_floor: 0.0001,
            sigma_floor: 0.01,
            decay_param: 0.0,
            min_class_probability: 0.1,
            interrupt_every: 1000,
            max_growth_steps: 100,
            pool_size: 0,
            metric: MetricKind::Euclidean,
            quality: QualityKind::MeanQuantizationError,
            seed: None,
        }
    }
}

/// Growing mesh (cell structures) configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeshConfig {
    /// Dimensionality of the unit weight vectors.
    pub dim: usize,

    /// Learning rate applied to the winner.
    /// Default: 0.06.
    pub epsilon_b: f64,

    /// Learning rate applied to the winner's topological neighbours.
    /// Default: 0.002.
    pub epsilon_n: f64,

    /// Geometric decay applied to every signal counter each step
    /// (counters are multiplied by `1 - alpha`).
    /// Default: 0.05.
    pub alpha: f64,

    /// Training steps between growth steps.
    /// Default: 100.
    pub lambda: usize,

    /// Normalized probability-density threshold below which units are
    /// marked for removal.
    /// Default: 0.05.
    pub eta: f64,

    /// Removals per growth step are capped at
    /// `unit_count / removal_cap_divisor - 1`.
    /// Default: 20 (i.e. at most 5% of the mesh).
    pub removal_cap_divisor: usize,

    /// Removal never shrinks the mesh below this unit count.
    /// Default: 10.
    pub min_units: usize,

    /// Weight initialization for the three seed units.
    /// Default: uniform over [0, 1).
    pub init: WeightInit,

    /// Distance metric for winner search and Voronoi estimation.
    /// Default: Euclidean.
    pub metric: MetricKind,

    /// Random seed.
    /// Default: None (random).
    pub seed: Option<u64>,
}

impl Default for MeshConfig {
    fn default() -> Self {
        Self {
            dim: 2,
            epsilon_b: 0.06,
            epsilon_n: 0.002,
            alpha: 0.05,
            lambda: 100,
            eta: 0.05,
            removal_cap_divisor: 20,
            min_units: 10,
            init: WeightInit::Uniform { lo: 0.0, hi: 1.0 },
            metric: MetricKind::Euclidean,
            seed: None,
        }
    }
}

/// Force-directed layout configuration for the mesh display positions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutConfig {
    /// Maximum relaxation passes per invocation.
    /// Default: 20.
    pub max_passes: usize,

    /// Stop relaxing once the total movement of a pass falls below
    /// this threshold.
    /// Default: 0.5.
    pub movement_threshold: f64,

    /// Nominal display diameter of a unit; repulsion buckets are
    /// multiples of this.
    /// Default: 30.0.
    pub unit_diameter: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            max_passes: 20,
            movement_threshold: 0.5,
            unit_diameter: 30.0,
        }
    }
}

/// Adaptive-coordinates virtual layer configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdaptiveConfig {
    /// Threshold values; one virtual layer is maintained per entry.
    /// A layer starts relaxing once the iteration count exceeds
    /// `threshold * xsize * ysize`.
    /// Default: [1.0].
    pub thresholds: Vec<f64>,
}

impl Default for AdaptiveConfig {
    fn default() -> Self {
        Self {
            thresholds: vec![1.0],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_lattice_config() {
        let config = LatticeConfig::default();
        assert_eq!(config.total_units(), 4);
        assert!(!config.toroidal);
    }

    #[test]
    fn test_default_training_config() {
        let config = TrainingConfig::default();
        assert_eq!(config.tau, 1.0);
        assert!((config.learnrate_floor - 0.0001).abs() < 1e-12);
        assert!((config.sigma_floor - 0.01).abs() < 1e-12);
    }

    #[test]
    fn test_default_mesh_config() {
        let config = MeshConfig::default();
        assert_eq!(config.min_units, 10);
        assert_eq!(config.removal_cap_divisor, 20);
        assert_eq!(config.lambda, 100);
    }
}
