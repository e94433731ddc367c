//! Map quality measures.
//!
//! Quality measures evaluate a lattice after the dataset has been mapped
//! onto it (see [`Lattice::map_inputs`]). Like the distance metrics they
//! are a closed set behind a shared trait, selected at configuration time
//! via [`QualityKind`].

mod quantization;

pub use quantization::{MeanQuantizationError, QuantizationError};

use crate::lattice::Lattice;
use crate::Result;
use serde::{Deserialize, Serialize};

/// Trait for global and per-unit map quality.
///
/// `per_unit` returns one value per lattice cell in scan order, `NaN`
/// for holes. Errors are [`crate::KarttaError::Quality`] and propagate
/// to the training driver.
pub trait QualityMeasure {
    /// The map's global error.
    fn global(&self, lattice: &Lattice) -> Result<f64>;

    /// Per-cell error grid in scan order (`NaN` for holes).
    fn per_unit(&self, lattice: &Lattice) -> Result<Vec<f64>>;
}

/// The built-in quality measures, resolved at configuration time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QualityKind {
    /// Summed quantization error over all units.
    QuantizationError,
    /// Quantization error averaged over the mapped inputs.
    MeanQuantizationError,
}

impl QualityMeasure for QualityKind {
    fn global(&self, lattice: &Lattice) -> Result<f64> {
        match self {
            QualityKind::QuantizationError => QuantizationError.global(lattice),
            QualityKind::MeanQuantizationError => MeanQuantizationError.global(lattice),
        }
    }

    fn per_unit(&self, lattice: &Lattice) -> Result<Vec<f64>> {
        match self {
            QualityKind::QuantizationError => QuantizationError.per_unit(lattice),
            QualityKind::MeanQuantizationError => MeanQuantizationError.per_unit(lattice),
        }
    }
}
