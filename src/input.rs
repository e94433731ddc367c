//! Input data sources for training.
//!
//! Trainers consume inputs through the [`InputSource`] trait so that file
//! readers and synthetic generators can be plugged in by the driver. The
//! crate ships [`DenseInputs`], a plain in-memory implementation.

use rand::Rng;
use serde::{Deserialize, Serialize};

/// A single labelled input vector.
///
/// `NaN` components mark missing values; metrics and weight updates skip
/// them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputDatum {
    /// Name/label of the vector (unique within a source).
    pub label: String,
    /// The input vector.
    pub vector: Vec<f64>,
}

impl InputDatum {
    /// Creates a new input datum.
    pub fn new(label: impl Into<String>, vector: Vec<f64>) -> Self {
        Self {
            label: label.into(),
            vector,
        }
    }
}

/// A source of training vectors.
pub trait InputSource {
    /// Number of vectors in the source.
    fn num_vectors(&self) -> usize;

    /// Dimensionality of the vectors.
    fn dim(&self) -> usize;

    /// The `i`-th vector, or `None` out of range.
    fn input(&self, i: usize) -> Option<&InputDatum>;

    /// A uniformly sampled vector. The RNG is the caller's seed context.
    fn random_input(&self, rng: &mut dyn rand::RngCore) -> &InputDatum;

    /// Per-feature (min, max) intervals over all vectors, ignoring `NaN`
    /// components.
    fn data_intervals(&self) -> (Vec<f64>, Vec<f64>);
}

/// An in-memory input source.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DenseInputs {
    data: Vec<InputDatum>,
    dim: usize,
}

impl DenseInputs {
    /// Creates a source from a list of data. All vectors must share one
    /// dimensionality; violating entries are dropped with a warning.
    pub fn new(data: Vec<InputDatum>) -> Self {
        let dim = data.first().map(|d| d.vector.len()).unwrap_or(0);
        let (data, dropped): (Vec<_>, Vec<_>) =
            data.into_iter().partition(|d| d.vector.len() == dim);
        if !dropped.is_empty() {
            log::warn!(
                "Dropped {} input vectors with dimensionality != {}",
                dropped.len(),
                dim
            );
        }
        Self { data, dim }
    }

    /// Returns true if the source holds no vectors.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl InputSource for DenseInputs {
    fn num_vectors(&self) -> usize {
        self.data.len()
    }

    fn dim(&self) -> usize {
        self.dim
    }

    fn input(&self, i: usize) -> Option<&InputDatum> {
        self.data.get(i)
    }

    fn random_input(&self, rng: &mut dyn rand::RngCore) -> &InputDatum {
        let idx = rng.gen_range(0..self.data.len());
        &self.data[idx]
    }

    fn data_intervals(&self) -> (Vec<f64>, Vec<f64>) {
        let mut min = vec![f64::INFINITY; self.dim];
        let mut max = vec![f64::NEG_INFINITY; self.dim];
        for datum in &self.data {
            for (j, &v) in datum.vector.iter().enumerate() {
                if v.is_nan() {
                    continue;
                }
                if v < min[j] {
                    min[j] = v;
                }
                if v > max[j] {
                    max[j] = v;
                }
            }
        }
        (min, max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn test_source() -> DenseInputs {
        DenseInputs::new(vec![
            InputDatum::new("a", vec![0.0, 1.0]),
            InputDatum::new("b", vec![2.0, -1.0]),
            InputDatum::new("c", vec![1.0, 0.5]),
        ])
    }

    #[test]
    fn test_dimensions_and_access() {
        let source = test_source();
        assert_eq!(source.num_vectors(), 3);
        assert_eq!(source.dim(), 2);
        assert_eq!(source.input(1).unwrap().label, "b");
        assert!(source.input(3).is_none());
    }

    #[test]
    fn test_intervals() {
        let source = test_source();
        let (min, max) = source.data_intervals();
        assert_eq!(min, vec![0.0, -1.0]);
        assert_eq!(max, vec![2.0, 1.0]);
    }

    #[test]
    fn test_random_sampling_is_deterministic() {
        let source = test_source();
        let mut a = ChaCha8Rng::seed_from_u64(7);
        let mut b = ChaCha8Rng::seed_from_u64(7);
        for _ in 0..10 {
            assert_eq!(
                source.random_input(&mut a).label,
                source.random_input(&mut b).label
            );
        }
    }

    #[test]
    fn test_mismatched_dims_dropped() {
        let source = DenseInputs::new(vec![
            InputDatum::new("a", vec![0.0, 1.0]),
            InputDatum::new("bad", vec![0.0]),
        ]);
        assert_eq!(source.num_vectors(), 1);
    }
}
