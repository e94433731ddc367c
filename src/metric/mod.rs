//! Distance metrics for weight and input vectors.
//!
//! Metrics are a pluggable capability: winner search and mapping take any
//! [`DistanceMetric`]. The crate ships a closed set of built-ins selected
//! at configuration time via [`MetricKind`]; there is no runtime lookup by
//! name.

mod euclidean;
mod manhattan;

pub use euclidean::{EuclideanMetric, SquaredEuclideanMetric};
pub use manhattan::ManhattanMetric;

use crate::error::{KarttaError, Result};
use serde::{Deserialize, Serialize};

/// Trait for distance metrics between real-valued vectors.
///
/// Components that are `NaN` on either side mark missing values and are
/// skipped pairwise. A length mismatch is a [`KarttaError::Metric`] error.
pub trait DistanceMetric {
    /// Computes the distance between two vectors.
    fn distance(&self, a: &[f64], b: &[f64]) -> Result<f64>;
}

/// Checks that both vectors have the same dimensionality.
pub(crate) fn check_dims(a: &[f64], b: &[f64]) -> Result<()> {
    if a.len() != b.len() {
        return Err(KarttaError::Metric(format!(
            "Vector dimension {} does not match {}",
            a.len(),
            b.len()
        )));
    }
    Ok(())
}

/// The built-in distance metrics, resolved at configuration time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MetricKind {
    /// Euclidean (L2) distance.
    Euclidean,
    /// Squared Euclidean distance (no square root; same winner ordering).
    SquaredEuclidean,
    /// Manhattan (L1) distance.
    Manhattan,
}

impl DistanceMetric for MetricKind {
    fn distance(&self, a: &[f64], b: &[f64]) -> Result<f64> {
        match self {
            MetricKind::Euclidean => EuclideanMetric.distance(a, b),
            MetricKind::SquaredEuclidean => SquaredEuclideanMetric.distance(a, b),
            MetricKind::Manhattan => ManhattanMetric.distance(a, b),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_dispatch() {
        let a = vec![0.0, 0.0];
        let b = vec![3.0, 4.0];

        let l2 = MetricKind::Euclidean.distance(&a, &b).unwrap();
        let l2sq = MetricKind::SquaredEuclidean.distance(&a, &b).unwrap();
        let l1 = MetricKind::Manhattan.distance(&a, &b).unwrap();

        assert!((l2 - 5.0).abs() < 1e-10);
        assert!((l2sq - 25.0).abs() < 1e-10);
        assert!((l1 - 7.0).abs() < 1e-10);
    }

    #[test]
    fn test_dimension_mismatch_is_error() {
        let a = vec![1.0, 2.0];
        let b = vec![1.0, 2.0, 3.0];
        assert!(MetricKind::Euclidean.distance(&a, &b).is_err());
    }
}
