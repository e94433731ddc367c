//! Quantization-error quality measures.

use crate::lattice::Lattice;
use crate::quality::QualityMeasure;
use crate::Result;

/// Summed quantization error: per unit, the sum of its mapped inputs'
/// distances; globally, the sum over all units.
#[derive(Debug, Clone, Copy, Default)]
pub struct QuantizationError;

impl QualityMeasure for QuantizationError {
    fn global(&self, lattice: &Lattice) -> Result<f64> {
        Ok(lattice.iter_units().map(|u| u.quantization_error()).sum())
    }

    fn per_unit(&self, lattice: &Lattice) -> Result<Vec<f64>> {
        Ok(lattice
            .cells()
            .iter()
            .map(|slot| {
                slot.as_ref()
                    .map(|u| u.quantization_error())
                    .unwrap_or(f64::NAN)
            })
            .collect())
    }
}

/// Mean quantization error: the summed error divided by the number of
/// mapped inputs (globally) or per unit by its own mapped count.
#[derive(Debug, Clone, Copy, Default)]
pub struct MeanQuantizationError;

impl QualityMeasure for MeanQuantizationError {
    fn global(&self, lattice: &Lattice) -> Result<f64> {
        let mut total = 0.0;
        let mut count = 0usize;
        for unit in lattice.iter_units() {
            total += unit.quantization_error();
            count += unit.mapped_inputs().len();
        }
        if count == 0 {
            Ok(0.0)
        } else {
            Ok(total / count as f64)
        }
    }

    fn per_unit(&self, lattice: &Lattice) -> Result<Vec<f64>> {
        Ok(lattice
            .cells()
            .iter()
            .map(|slot| {
                slot.as_ref()
                    .map(|u| u.mean_quantization_error())
                    .unwrap_or(f64::NAN)
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{LatticeConfig, WeightInit};
    use crate::input::{DenseInputs, InputDatum};
    use crate::metric::MetricKind;

    fn mapped_lattice() -> Lattice {
        let mut lattice = Lattice::new(&LatticeConfig {
            xsize: 2,
            ysize: 1,
            zsize: 1,
            dim: 1,
            init: WeightInit::Zeros,
            seed: Some(42),
            ..Default::default()
        })
        .unwrap();
        lattice.unit_mut(0, 0, 0).unwrap().weights = vec![0.0];
        lattice.unit_mut(1, 0, 0).unwrap().weights = vec![10.0];

        let source = DenseInputs::new(vec![
            InputDatum::new("a", vec![1.0]),
            InputDatum::new("b", vec![2.0]),
            InputDatum::new("c", vec![9.0]),
        ]);
        lattice.map_inputs(&source, &MetricKind::Euclidean).unwrap();
        lattice
    }

    #[test]
    fn test_quantization_error() {
        let lattice = mapped_lattice();
        // Unit 0 holds a (1.0) and b (2.0); unit 1 holds c (1.0).
        let global = QuantizationError.global(&lattice).unwrap();
        assert!((global - 4.0).abs() < 1e-10);

        let per_unit = QuantizationError.per_unit(&lattice).unwrap();
        assert!((per_unit[0] - 3.0).abs() < 1e-10);
        assert!((per_unit[1] - 1.0).abs() < 1e-10);
    }

    #[test]
    fn test_mean_quantization_error() {
        let lattice = mapped_lattice();
        let global = MeanQuantizationError.global(&lattice).unwrap();
        assert!((global - 4.0 / 3.0).abs() < 1e-10);

        let per_unit = MeanQuantizationError.per_unit(&lattice).unwrap();
        assert!((per_unit[0] - 1.5).abs() < 1e-10);
        assert!((per_unit[1] - 1.0).abs() < 1e-10);
    }

    #[test]
    fn test_unmapped_lattice_is_zero() {
        let lattice = Lattice::new(&LatticeConfig {
            dim: 1,
            init: WeightInit::Zeros,
            ..Default::default()
        })
        .unwrap();
        assert_eq!(MeanQuantizationError.global(&lattice).unwrap(), 0.0);
        assert_eq!(QuantizationError.global(&lattice).unwrap(), 0.0);
    }
}
