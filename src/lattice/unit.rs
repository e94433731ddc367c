//! Unit representation for lattices.

use crate::config::WeightInit;
use rand::Rng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};

/// An input mapped onto a unit: the input's name and its distance to the
/// unit's weight vector at mapping time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MappedInput {
    /// Name of the mapped input.
    pub name: String,
    /// Distance between the input vector and the unit weight vector.
    pub distance: f64,
}

/// A unit in the lattice.
///
/// Each unit has an integer position on the 3D grid, a weight vector of
/// the lattice's fixed dimensionality, and bookkeeping for the inputs
/// currently mapped onto it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Unit {
    /// Position along the x axis.
    pub x: usize,
    /// Position along the y axis.
    pub y: usize,
    /// Position along the z axis.
    pub z: usize,
    /// Weight vector.
    pub weights: Vec<f64>,
    /// Inputs mapped onto this unit, sorted ascending by distance with
    /// ties broken lexicographically by name.
    mapped: Vec<MappedInput>,
    /// Optional per-feature weights scaling the adaptation of each
    /// component.
    pub feature_weights: Option<Vec<f64>>,
}

impl Unit {
    /// Creates a unit with weights drawn by the given strategy.
    ///
    /// `intervals` supplies the per-feature (min, max) bounds for
    /// [`WeightInit::Intervals`]; without them that strategy falls back
    /// to the unit interval.
    pub fn new<R: Rng + ?Sized>(
        x: usize,
        y: usize,
        z: usize,
        dim: usize,
        init: WeightInit,
        intervals: Option<(&[f64], &[f64])>,
        rng: &mut R,
    ) -> Self {
        let weights: Vec<f64> = match init {
            WeightInit::Normal { std } => {
                let normal = Normal::new(0.0, std).unwrap_or_else(|_| Normal::new(0.0, 0.1).unwrap());
                (0..dim).map(|_| normal.sample(rng)).collect()
            }
            WeightInit::Uniform { lo, hi } => (0..dim).map(|_| rng.gen_range(lo..hi)).collect(),
            WeightInit::Intervals => match intervals {
                Some((min, max)) => (0..dim)
                    .map(|k| {
                        let (lo, hi) = (min[k], max[k]);
                        if hi > lo {
                            rng.gen_range(lo..hi)
                        } else {
                            lo
                        }
                    })
                    .collect(),
                None => (0..dim).map(|_| rng.gen_range(0.0..1.0)).collect(),
            },
            WeightInit::Zeros => vec![0.0; dim],
        };

        Self::with_weights(x, y, z, weights)
    }

    /// Creates a unit with the given weights.
    pub fn with_weights(x: usize, y: usize, z: usize, weights: Vec<f64>) -> Self {
        Self {
            x,
            y,
            z,
            weights,
            mapped: Vec::new(),
            feature_weights: None,
        }
    }

    /// Dimensionality of the weight vector.
    #[inline]
    pub fn dim(&self) -> usize {
        self.weights.len()
    }

    /// Moves the weight vector towards an input by the given influence.
    ///
    /// `NaN` input components are missing values and leave the
    /// corresponding weight untouched. Per-feature weights, when set,
    /// scale the influence componentwise.
    pub fn adapt(&mut self, input: &[f64], influence: f64) {
        match &self.feature_weights {
            Some(fw) => {
                for ((w, &i), &f) in self.weights.iter_mut().zip(input).zip(fw) {
                    if !i.is_nan() {
                        *w += influence * f * (i - *w);
                    }
                }
            }
            None => {
                for (w, &i) in self.weights.iter_mut().zip(input) {
                    if !i.is_nan() {
                        *w += influence * (i - *w);
                    }
                }
            }
        }
    }

    /// Records an input as mapped onto this unit, keeping the list
    /// sorted ascending by distance, ties broken by name.
    pub fn add_mapped_input(&mut self, name: impl Into<String>, distance: f64) {
        let entry = MappedInput {
            name: name.into(),
            distance,
        };
        let at = self
            .mapped
            .partition_point(|m| (m.distance, m.name.as_str()) < (entry.distance, entry.name.as_str()));
        self.mapped.insert(at, entry);
    }

    /// Removes all mapped inputs.
    pub fn clear_mapped_inputs(&mut self) {
        self.mapped.clear();
    }

    /// The inputs currently mapped onto this unit.
    #[inline]
    pub fn mapped_inputs(&self) -> &[MappedInput] {
        &self.mapped
    }

    /// Sum of the mapped inputs' distances.
    pub fn quantization_error(&self) -> f64 {
        self.mapped.iter().map(|m| m.distance).sum()
    }

    /// Quantization error divided by the number of mapped inputs
    /// (0 when nothing is mapped).
    pub fn mean_quantization_error(&self) -> f64 {
        if self.mapped.is_empty() {
            0.0
        } else {
            self.quantization_error() / self.mapped.len() as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_creation_modes() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);

        let zeros = Unit::new(0, 0, 0, 5, WeightInit::Zeros, None, &mut rng);
        assert!(zeros.weights.iter().all(|&w| w == 0.0));

        let normal = Unit::new(0, 0, 0, 5, WeightInit::Normal { std: 0.1 }, None, &mut rng);
        assert_eq!(normal.dim(), 5);
        assert!(normal.weights.iter().any(|&w| w != 0.0));

        let min = vec![1.0, 2.0];
        let max = vec![2.0, 4.0];
        let interval = Unit::new(
            0,
            0,
            0,
            2,
            WeightInit::Intervals,
            Some((&min, &max)),
            &mut rng,
        );
        assert!(interval.weights[0] >= 1.0 && interval.weights[0] < 2.0);
        assert!(interval.weights[1] >= 2.0 && interval.weights[1] < 4.0);
    }

    #[test]
    fn test_adapt_moves_towards_input() {
        let mut unit = Unit::with_weights(0, 0, 0, vec![0.0, 0.0]);
        unit.adapt(&[1.0, 1.0], 0.5);
        assert!((unit.weights[0] - 0.5).abs() < 1e-10);
        assert!((unit.weights[1] - 0.5).abs() < 1e-10);
    }

    #[test]
    fn test_adapt_skips_missing_components() {
        let mut unit = Unit::with_weights(0, 0, 0, vec![0.0, 3.0]);
        unit.adapt(&[1.0, f64::NAN], 1.0);
        assert!((unit.weights[0] - 1.0).abs() < 1e-10);
        assert!((unit.weights[1] - 3.0).abs() < 1e-10);
    }

    #[test]
    fn test_adapt_with_feature_weights() {
        let mut unit = Unit::with_weights(0, 0, 0, vec![0.0, 0.0]);
        unit.feature_weights = Some(vec![1.0, 0.0]);
        unit.adapt(&[2.0, 2.0], 1.0);
        assert!((unit.weights[0] - 2.0).abs() < 1e-10);
        assert!(unit.weights[1].abs() < 1e-10);
    }

    #[test]
    fn test_mapped_input_ordering() {
        let mut unit = Unit::with_weights(0, 0, 0, vec![0.0]);
        unit.add_mapped_input("b", 0.5);
        unit.add_mapped_input("a", 0.5);
        unit.add_mapped_input("c", 0.1);

        let names: Vec<&str> = unit.mapped_inputs().iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["c", "a", "b"]);
        assert!((unit.quantization_error() - 1.1).abs() < 1e-10);
        assert!((unit.mean_quantization_error() - 1.1 / 3.0).abs() < 1e-10);

        unit.clear_mapped_inputs();
        assert_eq!(unit.mapped_inputs().len(), 0);
        assert_eq!(unit.mean_quantization_error(), 0.0);
    }
}
