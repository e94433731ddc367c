//! Euclidean distance metrics.

use crate::metric::{check_dims, DistanceMetric};
use crate::Result;

/// Euclidean (L2) distance.
#[derive(Debug, Clone, Copy, Default)]
pub struct EuclideanMetric;

impl DistanceMetric for EuclideanMetric {
    fn distance(&self, a: &[f64], b: &[f64]) -> Result<f64> {
        SquaredEuclideanMetric.distance(a, b).map(f64::sqrt)
    }
}

/// Squared Euclidean distance.
///
/// Orders candidates identically to [`EuclideanMetric`] while avoiding
/// the square root; preferable for pure winner searches.
#[derive(Debug, Clone, Copy, Default)]
pub struct SquaredEuclideanMetric;

impl DistanceMetric for SquaredEuclideanMetric {
    fn distance(&self, a: &[f64], b: &[f64]) -> Result<f64> {
        check_dims(a, b)?;
        let sum = a
            .iter()
            .zip(b.iter())
            .filter(|(x, y)| !x.is_nan() && !y.is_nan())
            .map(|(x, y)| (x - y) * (x - y))
            .sum();
        Ok(sum)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical() {
        let a = vec![1.0, 2.0, 3.0];
        assert!(EuclideanMetric.distance(&a, &a).unwrap().abs() < 1e-10);
    }

    #[test]
    fn test_pythagorean() {
        let a = vec![0.0, 0.0];
        let b = vec![3.0, 4.0];
        let dist = EuclideanMetric.distance(&a, &b).unwrap();
        assert!((dist - 5.0).abs() < 1e-10);
    }

    #[test]
    fn test_missing_components_skipped() {
        let a = vec![0.0, f64::NAN, 0.0];
        let b = vec![3.0, 7.0, 4.0];
        let dist = EuclideanMetric.distance(&a, &b).unwrap();
        assert!((dist - 5.0).abs() < 1e-10);
    }
}
