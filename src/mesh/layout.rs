//! Force-directed relaxation of the mesh display positions.

use crate::config::LayoutConfig;
use crate::mesh::MeshGraph;
use std::collections::HashMap;

/// Repulsion magnitude for pairs closer than one unit diameter.
const REPULSION_NEAR: f64 = 3.0;
/// Repulsion magnitude for pairs within two unit diameters.
const REPULSION_MID: f64 = 1.0;
/// Repulsion magnitude for pairs within four unit diameters.
const REPULSION_FAR: f64 = 0.25;
/// Attraction factor towards topological neighbours.
const ATTRACTION_NEIGHBOUR: f64 = 0.06;
/// Coherence pull towards the mesh centroid.
const COHERENCE_PULL: f64 = 0.01;
/// After relaxation the minimum position is pinned here.
const PIN_CORNER: f64 = 10.0;

/// Relaxes the display positions: piecewise-constant pairwise repulsion
/// bucketed by distance relative to the unit diameter, attraction
/// towards topological neighbours, and a small coherence pull towards
/// all units.
///
/// Runs at most `max_passes` passes, stopping early once the total
/// movement of a pass falls below `movement_threshold`; afterwards all
/// positions are translated so the minimum sits at (10, 10).
pub fn relax(mesh: &mut MeshGraph, config: &LayoutConfig) {
    let keys = mesh.unit_keys_sorted();
    if keys.is_empty() {
        return;
    }
    let index_of: HashMap<_, _> = keys.iter().enumerate().map(|(i, &k)| (k, i)).collect();
    let neighbour_indices: Vec<Vec<usize>> = keys
        .iter()
        .map(|&k| {
            mesh.neighbours(k)
                .into_iter()
                .map(|n| index_of[&n])
                .collect()
        })
        .collect();

    let mut positions: Vec<(f64, f64)> = keys
        .iter()
        .map(|&k| {
            let unit = mesh.unit(k).expect("layout over removed unit");
            (unit.x, unit.y)
        })
        .collect();

    let n = positions.len();
    for _ in 0..config.max_passes {
        let centroid = {
            let (sx, sy) = positions
                .iter()
                .fold((0.0, 0.0), |(ax, ay), &(x, y)| (ax + x, ay + y));
            (sx / n as f64, sy / n as f64)
        };

        let mut movement = 0.0;
        let snapshot = positions.clone();
        for i in 0..n {
            let (xi, yi) = snapshot[i];
            let mut dx = 0.0;
            let mut dy = 0.0;

            for (j, &(xj, yj)) in snapshot.iter().enumerate() {
                if i == j {
                    continue;
                }
                let (ex, ey) = (xi - xj, yi - yj);
                let dist = (ex * ex + ey * ey).sqrt();
                let magnitude = repulsion_magnitude(dist, config.unit_diameter);
                if magnitude > 0.0 {
                    if dist > f64::EPSILON {
                        dx += magnitude * ex / dist;
                        dy += magnitude * ey / dist;
                    } else {
                        // Coincident pair: push apart along x,
                        // deterministically by index order.
                        dx += if i < j { -magnitude } else { magnitude };
                    }
                }
            }

            for &j in &neighbour_indices[i] {
                let (xj, yj) = snapshot[j];
                dx += ATTRACTION_NEIGHBOUR * (xj - xi);
                dy += ATTRACTION_NEIGHBOUR * (yj - yi);
            }

            dx += COHERENCE_PULL * (centroid.0 - xi);
            dy += COHERENCE_PULL * (centroid.1 - yi);

            positions[i].0 += dx;
            positions[i].1 += dy;
            movement += dx.abs() + dy.abs();
        }

        if movement < config.movement_threshold {
            break;
        }
    }

    // Pin the minimum position to the display corner.
    let min_x = positions.iter().map(|p| p.0).fold(f64::INFINITY, f64::min);
    let min_y = positions.iter().map(|p| p.1).fold(f64::INFINITY, f64::min);
    for (key, (x, y)) in keys.iter().zip(positions) {
        let unit = mesh.unit_mut(*key).expect("layout over removed unit");
        unit.x = x - min_x + PIN_CORNER;
        unit.y = y - min_y + PIN_CORNER;
    }
}

fn repulsion_magnitude(dist: f64, diameter: f64) -> f64 {
    if dist < diameter {
        REPULSION_NEAR
    } else if dist < 2.0 * diameter {
        REPULSION_MID
    } else if dist < 4.0 * diameter {
        REPULSION_FAR
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MeshConfig;
    use crate::metric::MetricKind;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn test_mesh() -> MeshGraph {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        MeshGraph::initialize(&MeshConfig::default(), None, &mut rng).unwrap()
    }

    #[test]
    fn test_relax_pins_minimum_corner() {
        let mut mesh = test_mesh();
        relax(&mut mesh, &LayoutConfig::default());

        let min_x = mesh
            .iter_units()
            .map(|(_, u)| u.x)
            .fold(f64::INFINITY, f64::min);
        let min_y = mesh
            .iter_units()
            .map(|(_, u)| u.y)
            .fold(f64::INFINITY, f64::min);
        assert!((min_x - 10.0).abs() < 1e-9);
        assert!((min_y - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_relax_separates_coincident_units() {
        let mut mesh = test_mesh();
        let keys = mesh.unit_keys_sorted();
        mesh.split_edge(keys[0], keys[1], &MetricKind::Euclidean)
            .unwrap();
        // Collapse everything onto one point.
        for key in mesh.unit_keys_sorted() {
            let unit = mesh.unit_mut(key).unwrap();
            unit.x = 50.0;
            unit.y = 50.0;
        }
        relax(&mut mesh, &LayoutConfig::default());

        let positions: Vec<(f64, f64)> = mesh.iter_units().map(|(_, u)| (u.x, u.y)).collect();
        let distinct_x: std::collections::HashSet<i64> =
            positions.iter().map(|p| (p.0 * 1e6) as i64).collect();
        assert!(distinct_x.len() > 1);
    }

    #[test]
    fn test_relax_bounded_passes() {
        let mut mesh = test_mesh();
        let config = LayoutConfig {
            max_passes: 1,
            movement_threshold: 0.0,
            ..Default::default()
        };
        // Must terminate promptly even with an unreachable threshold.
        relax(&mut mesh, &config);
    }
}
