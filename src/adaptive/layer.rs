//! The adaptive-coordinates virtual layers.

use crate::error::{KarttaError, Result};
use crate::lattice::Axis;
use serde::{Deserialize, Serialize};

/// A virtual unit: a continuously relaxed position plus the cached
/// distance to the current winner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VirtualUnit {
    /// Adaptive x position.
    pub ax: f64,
    /// Adaptive y position.
    pub ay: f64,
    /// Distance to the input of the most recent training step.
    pub distance_to_winner: f64,
}

/// One (X x Y) grid of virtual units for a single threshold.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VirtualLayer {
    /// The layer's threshold: relaxation starts once the iteration
    /// count exceeds `threshold * xsize * ysize`.
    pub threshold: f64,
    units: Vec<VirtualUnit>,
}

impl VirtualLayer {
    fn new(threshold: f64, xsize: usize, ysize: usize) -> Self {
        let mut units = Vec::with_capacity(xsize * ysize);
        for y in 0..ysize {
            for x in 0..xsize {
                units.push(VirtualUnit {
                    ax: x as f64,
                    ay: y as f64,
                    distance_to_winner: 0.0,
                });
            }
        }
        Self { threshold, units }
    }

    /// The layer's virtual units in scan order.
    #[inline]
    pub fn units(&self) -> &[VirtualUnit] {
        &self.units
    }
}

/// The adaptive-coordinates layer stack: one virtual grid per
/// configured threshold, relaxed inline with lattice training.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdaptiveCoordinates {
    xsize: usize,
    ysize: usize,
    layers: Vec<VirtualLayer>,
}

impl AdaptiveCoordinates {
    /// Creates the stack with positions initialized to the lattice
    /// coordinates.
    pub fn new(xsize: usize, ysize: usize, thresholds: &[f64]) -> Result<Self> {
        if thresholds.is_empty() {
            return Err(KarttaError::Config(
                "adaptive coordinates require at least one threshold".to_string(),
            ));
        }
        if xsize == 0 || ysize == 0 {
            return Err(KarttaError::Config(
                "adaptive coordinates require a non-empty grid".to_string(),
            ));
        }
        let layers = thresholds
            .iter()
            .map(|&t| VirtualLayer::new(t, xsize, ysize))
            .collect();
        Ok(Self { xsize, ysize, layers })
    }

    /// Grid width.
    #[inline]
    pub fn xsize(&self) -> usize {
        self.xsize
    }

    /// Grid height.
    #[inline]
    pub fn ysize(&self) -> usize {
        self.ysize
    }

    /// The configured thresholds, in layer order.
    pub fn thresholds(&self) -> Vec<f64> {
        self.layers.iter().map(|l| l.threshold).collect()
    }

    /// The virtual layers.
    #[inline]
    pub fn layers(&self) -> &[VirtualLayer] {
        &self.layers
    }

    /// The virtual position of `(x, y)` in layer `layer`.
    pub fn position(&self, layer: usize, x: usize, y: usize) -> Option<(f64, f64)> {
        if x >= self.xsize || y >= self.ysize {
            return None;
        }
        let unit = &self.layers.get(layer)?.units[y * self.xsize + x];
        Some((unit.ax, unit.ay))
    }

    pub(crate) fn set_position(&mut self, layer: usize, x: usize, y: usize, ax: f64, ay: f64) {
        let idx = y * self.xsize + x;
        let unit = &mut self.layers[layer].units[idx];
        unit.ax = ax;
        unit.ay = ay;
    }

    /// Relaxes every layer whose threshold has been passed.
    ///
    /// `prior` holds each unit's distance to the current input from the
    /// winner-search pass preceding the weight update; `current` the
    /// distance after adaptation (both in lattice scan order, `NaN` for
    /// holes). Each unit moves towards the winner's virtual position by
    /// the relative improvement `(prior - current) / prior`, skipped
    /// when `prior` is zero.
    pub fn update(
        &mut self,
        winner: (usize, usize),
        prior: &[f64],
        current: &[f64],
        iteration: usize,
    ) {
        let cells = self.xsize * self.ysize;
        let winner_idx = winner.1 * self.xsize + winner.0;

        for layer in &mut self.layers {
            if iteration as f64 <= layer.threshold * cells as f64 {
                continue;
            }
            let (winner_ax, winner_ay) = {
                let w = &layer.units[winner_idx];
                (w.ax, w.ay)
            };
            for (idx, unit) in layer.units.iter_mut().enumerate() {
                let (p, c) = (prior[idx], current[idx]);
                if p.is_nan() || c.is_nan() {
                    continue;
                }
                unit.distance_to_winner = c;
                if p == 0.0 {
                    continue;
                }
                let improvement = (p - c) / p;
                unit.ax += improvement * (winner_ax - unit.ax);
                unit.ay += improvement * (winner_ay - unit.ay);
            }
        }
    }

    /// Mirrors a lattice growth step: inserts one interpolated plane of
    /// virtual units before index `at` along the axis.
    pub fn insert_plane(&mut self, axis: Axis, at: usize) -> Result<()> {
        let (old_x, old_y) = (self.xsize, self.ysize);
        let old_size = match axis {
            Axis::X => old_x,
            Axis::Y => old_y,
            Axis::Z => {
                return Err(KarttaError::Config(
                    "adaptive coordinates are planar; cannot grow along z".to_string(),
                ))
            }
        };
        if at == 0 || at > old_size {
            return Err(KarttaError::Training(format!(
                "plane insertion index {} outside 1..={}",
                at, old_size
            )));
        }

        let (new_x, new_y) = match axis {
            Axis::X => (old_x + 1, old_y),
            _ => (old_x, old_y + 1),
        };

        for layer in &mut self.layers {
            let mut units = Vec::with_capacity(new_x * new_y);
            for y in 0..new_y {
                for x in 0..new_x {
                    let c = match axis {
                        Axis::X => x,
                        _ => y,
                    };
                    let unit = if c == at {
                        let (lo, hi) = (at - 1, at % old_size);
                        let (lx, ly) = match axis {
                            Axis::X => (lo, y),
                            _ => (x, lo),
                        };
                        let (hx, hy) = match axis {
                            Axis::X => (hi, y),
                            _ => (x, hi),
                        };
                        let a = &layer.units[ly * old_x + lx];
                        let b = &layer.units[hy * old_x + hx];
                        VirtualUnit {
                            ax: (a.ax + b.ax) / 2.0,
                            ay: (a.ay + b.ay) / 2.0,
                            distance_to_winner: 0.0,
                        }
                    } else {
                        let src = if c < at { c } else { c - 1 };
                        let (ox, oy) = match axis {
                            Axis::X => (src, y),
                            _ => (x, src),
                        };
                        layer.units[oy * old_x + ox].clone()
                    };
                    units.push(unit);
                }
            }
            layer.units = units;
        }

        self.xsize = new_x;
        self.ysize = new_y;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_positions_initialized_to_lattice_coords() {
        let coords = AdaptiveCoordinates::new(3, 2, &[1.0, 2.0]).unwrap();
        assert_eq!(coords.layers().len(), 2);
        assert_eq!(coords.position(0, 2, 1), Some((2.0, 1.0)));
        assert_eq!(coords.position(1, 0, 0), Some((0.0, 0.0)));
        assert_eq!(coords.position(0, 3, 0), None);
    }

    #[test]
    fn test_update_respects_threshold() {
        let mut coords = AdaptiveCoordinates::new(2, 2, &[1.0]).unwrap();
        // Threshold 1.0 * 4 cells: nothing moves before iteration 5.
        let prior = vec![2.0; 4];
        let current = vec![1.0; 4];
        coords.update((0, 0), &prior, &current, 4);
        assert_eq!(coords.position(0, 1, 1), Some((1.0, 1.0)));

        coords.update((0, 0), &prior, &current, 5);
        // Improvement 0.5 towards the winner at (0, 0).
        assert_eq!(coords.position(0, 1, 1), Some((0.5, 0.5)));
    }

    #[test]
    fn test_update_skips_zero_prior() {
        let mut coords = AdaptiveCoordinates::new(2, 1, &[0.0]).unwrap();
        let prior = vec![0.0, 4.0];
        let current = vec![0.0, 2.0];
        coords.update((0, 0), &prior, &current, 100);
        assert_eq!(coords.position(0, 0, 0), Some((0.0, 0.0)));
        assert_eq!(coords.position(0, 1, 0), Some((0.5, 0.0)));
    }

    #[test]
    fn test_insert_plane_interpolates() {
        let mut coords = AdaptiveCoordinates::new(2, 1, &[1.0]).unwrap();
        coords.insert_plane(Axis::X, 1).unwrap();
        assert_eq!(coords.xsize(), 3);
        assert_eq!(coords.position(0, 1, 0), Some((0.5, 0.0)));
        assert_eq!(coords.position(0, 2, 0), Some((1.0, 0.0)));
    }

    #[test]
    fn test_insert_plane_rejects_z() {
        let mut coords = AdaptiveCoordinates::new(2, 2, &[1.0]).unwrap();
        assert!(coords.insert_plane(Axis::Z, 1).is_err());
    }
}
