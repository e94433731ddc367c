//! Manhattan distance metric.

use crate::metric::{check_dims, DistanceMetric};
use crate::Result;

/// Manhattan (L1) distance.
#[derive(Debug, Clone, Copy, Default)]
pub struct ManhattanMetric;

impl DistanceMetric for ManhattanMetric {
    fn distance(&self, a: &[f64], b: &[f64]) -> Result<f64> {
        check_dims(a, b)?;
        let sum = a
            .iter()
            .zip(b.iter())
            .filter(|(x, y)| !x.is_nan() && !y.is_nan())
            .map(|(x, y)| (x - y).abs())
            .sum();
        Ok(sum)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symmetric() {
        let a = vec![1.0, -2.0];
        let b = vec![4.0, 2.0];
        let ab = ManhattanMetric.distance(&a, &b).unwrap();
        let ba = ManhattanMetric.distance(&b, &a).unwrap();
        assert!((ab - ba).abs() < 1e-10);
        assert!((ab - 7.0).abs() < 1e-10);
    }
}
