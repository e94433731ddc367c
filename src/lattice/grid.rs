//! The rectangular unit lattice.

use crate::config::{LatticeConfig, WeightInit};
use crate::error::{KarttaError, Result};
use crate::input::InputSource;
use crate::lattice::Unit;
use crate::metric::DistanceMetric;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// An integer position on the lattice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    /// x coordinate.
    pub x: usize,
    /// y coordinate.
    pub y: usize,
    /// z coordinate.
    pub z: usize,
}

impl Position {
    /// Creates a position.
    #[inline]
    pub fn new(x: usize, y: usize, z: usize) -> Self {
        Self { x, y, z }
    }
}

/// A lattice axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Axis {
    /// The x axis.
    X,
    /// The y axis.
    Y,
    /// The z axis.
    Z,
}

/// A three-dimensional lattice of units.
///
/// Cells hold `Option<Unit>`: the mnemonic variant permits holes (`None`)
/// that every operation skips; the regular variant has all cells occupied.
/// Weight dimensionality is fixed at construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lattice {
    xsize: usize,
    ysize: usize,
    zsize: usize,
    dim: usize,
    toroidal: bool,
    units: Vec<Option<Unit>>,
}

impl Lattice {
    /// Creates a fully occupied lattice per the configuration.
    ///
    /// [`WeightInit::Intervals`] requires an input source; use
    /// [`Lattice::from_source`] for it.
    pub fn new(config: &LatticeConfig) -> Result<Self> {
        if matches!(config.init, WeightInit::Intervals) {
            return Err(KarttaError::Config(
                "interval initialization requires an input source; use Lattice::from_source"
                    .to_string(),
            ));
        }
        Self::build(config, None, None)
    }

    /// Creates a fully occupied lattice, drawing interval-uniform weights
    /// from the source's data intervals when configured.
    pub fn from_source(config: &LatticeConfig, source: &dyn InputSource) -> Result<Self> {
        if source.dim() != config.dim {
            return Err(KarttaError::Config(format!(
                "Input dimension {} does not match lattice dimension {}",
                source.dim(),
                config.dim
            )));
        }
        let intervals = source.data_intervals();
        Self::build(config, Some(intervals), None)
    }

    /// Creates a mnemonic lattice: `mask[index]` decides cell occupancy,
    /// row-major with x fastest.
    pub fn new_mnemonic(config: &LatticeConfig, mask: &[bool]) -> Result<Self> {
        if mask.len() != config.total_units() {
            return Err(KarttaError::Config(format!(
                "Mnemonic mask length {} does not match lattice volume {}",
                mask.len(),
                config.total_units()
            )));
        }
        if matches!(config.init, WeightInit::Intervals) {
            return Err(KarttaError::Config(
                "interval initialization requires an input source; use Lattice::from_source"
                    .to_string(),
            ));
        }
        Self::build(config, None, Some(mask))
    }

    fn build(
        config: &LatticeConfig,
        intervals: Option<(Vec<f64>, Vec<f64>)>,
        mask: Option<&[bool]>,
    ) -> Result<Self> {
        if config.dim == 0 {
            return Err(KarttaError::Config("weight dimension must be > 0".to_string()));
        }
        if config.total_units() == 0 {
            return Err(KarttaError::Config("lattice volume must be > 0".to_string()));
        }

        let mut rng = match config.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };

        let interval_refs = intervals
            .as_ref()
            .map(|(min, max)| (min.as_slice(), max.as_slice()));

        let mut units = Vec::with_capacity(config.total_units());
        for z in 0..config.zsize {
            for y in 0..config.ysize {
                for x in 0..config.xsize {
                    let idx = units.len();
                    let occupied = mask.map(|m| m[idx]).unwrap_or(true);
                    units.push(occupied.then(|| {
                        Unit::new(x, y, z, config.dim, config.init, interval_refs, &mut rng)
                    }));
                }
            }
        }

        Ok(Self {
            xsize: config.xsize,
            ysize: config.ysize,
            zsize: config.zsize,
            dim: config.dim,
            toroidal: config.toroidal,
            units,
        })
    }

    /// Lattice extents (X, Y, Z).
    #[inline]
    pub fn sizes(&self) -> (usize, usize, usize) {
        (self.xsize, self.ysize, self.zsize)
    }

    /// Weight dimensionality.
    #[inline]
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Whether map distance wraps around the lattice edges.
    #[inline]
    pub fn toroidal(&self) -> bool {
        self.toroidal
    }

    /// Total number of cells, including holes.
    #[inline]
    pub fn total_cells(&self) -> usize {
        self.units.len()
    }

    /// Number of occupied cells.
    pub fn num_units(&self) -> usize {
        self.units.iter().filter(|u| u.is_some()).count()
    }

    #[inline]
    fn index(&self, x: usize, y: usize, z: usize) -> usize {
        (z * self.ysize + y) * self.xsize + x
    }

    #[inline]
    fn position_of(&self, index: usize) -> Position {
        let x = index % self.xsize;
        let y = (index / self.xsize) % self.ysize;
        let z = index / (self.xsize * self.ysize);
        Position::new(x, y, z)
    }

    #[inline]
    fn in_range(&self, x: usize, y: usize, z: usize) -> bool {
        x < self.xsize && y < self.ysize && z < self.zsize
    }

    fn access_error(&self, x: usize, y: usize, z: usize) -> KarttaError {
        KarttaError::LayerAccess {
            x,
            y,
            z,
            xsize: self.xsize,
            ysize: self.ysize,
            zsize: self.zsize,
        }
    }

    /// Gets the unit at a position, `None` when out of range or a hole.
    #[inline]
    pub fn get(&self, x: usize, y: usize, z: usize) -> Option<&Unit> {
        if self.in_range(x, y, z) {
            self.units[self.index(x, y, z)].as_ref()
        } else {
            None
        }
    }

    /// Mutable variant of [`Lattice::get`].
    #[inline]
    pub fn get_mut(&mut self, x: usize, y: usize, z: usize) -> Option<&mut Unit> {
        if self.in_range(x, y, z) {
            let idx = self.index(x, y, z);
            self.units[idx].as_mut()
        } else {
            None
        }
    }

    /// Gets the unit at a position; out-of-range coordinates and holes
    /// are a [`KarttaError::LayerAccess`] error.
    pub fn unit(&self, x: usize, y: usize, z: usize) -> Result<&Unit> {
        if !self.in_range(x, y, z) {
            return Err(self.access_error(x, y, z));
        }
        self.units[self.index(x, y, z)]
            .as_ref()
            .ok_or_else(|| self.access_error(x, y, z))
    }

    /// Mutable variant of [`Lattice::unit`].
    pub fn unit_mut(&mut self, x: usize, y: usize, z: usize) -> Result<&mut Unit> {
        if !self.in_range(x, y, z) {
            return Err(self.access_error(x, y, z));
        }
        let idx = self.index(x, y, z);
        let err = self.access_error(x, y, z);
        self.units[idx].as_mut().ok_or(err)
    }

    /// Iterates over all occupied cells in scan order.
    pub fn iter_units(&self) -> impl Iterator<Item = &Unit> {
        self.units.iter().filter_map(|u| u.as_ref())
    }

    /// Mutable iteration over all occupied cells in scan order.
    pub fn iter_units_mut(&mut self) -> impl Iterator<Item = &mut Unit> {
        self.units.iter_mut().filter_map(|u| u.as_mut())
    }

    /// Raw cell storage, for the trainer's partitioned update phase.
    #[inline]
    pub(crate) fn cells(&self) -> &[Option<Unit>] {
        &self.units
    }

    /// Mutable raw cell storage.
    #[inline]
    pub(crate) fn cells_mut(&mut self) -> &mut [Option<Unit>] {
        &mut self.units
    }

    #[inline]
    pub(crate) fn cell_position(&self, index: usize) -> Position {
        self.position_of(index)
    }

    /// Squared map distance between two lattice positions.
    ///
    /// Planar Euclidean by default; with the toroidal topology each axis
    /// delta wraps: `d = min(|Δ|, size - |Δ|)`.
    #[inline]
    pub fn map_distance_squared(&self, a: Position, b: Position) -> f64 {
        map_distance_squared_dims(a, b, (self.xsize, self.ysize, self.zsize), self.toroidal)
    }

    /// Every cell's metric distance to an input, in scan order (`NaN`
    /// for holes).
    pub fn distances_to(&self, input: &[f64], metric: &dyn DistanceMetric) -> Result<Vec<f64>> {
        let mut distances = vec![f64::NAN; self.units.len()];
        for (idx, slot) in self.units.iter().enumerate() {
            if let Some(unit) = slot.as_ref() {
                distances[idx] = metric.distance(&unit.weights, input)?;
            }
        }
        Ok(distances)
    }

    /// Direct topological neighbours of a position (±1 per axis),
    /// skipping holes. Wraps around the edges on a toroidal lattice.
    pub fn neighbours(&self, pos: Position) -> Vec<Position> {
        let mut out = Vec::with_capacity(6);
        let axes = [
            (Axis::X, pos.x, self.xsize),
            (Axis::Y, pos.y, self.ysize),
            (Axis::Z, pos.z, self.zsize),
        ];
        for (axis, c, size) in axes {
            if size < 2 {
                continue;
            }
            let mut candidates = Vec::with_capacity(2);
            if c > 0 {
                candidates.push(c - 1);
            } else if self.toroidal {
                candidates.push(size - 1);
            }
            if c + 1 < size {
                candidates.push(c + 1);
            } else if self.toroidal {
                candidates.push(0);
            }
            candidates.dedup();
            for n in candidates {
                let p = match axis {
                    Axis::X => Position::new(n, pos.y, pos.z),
                    Axis::Y => Position::new(pos.x, n, pos.z),
                    Axis::Z => Position::new(pos.x, pos.y, n),
                };
                if p != pos && self.get(p.x, p.y, p.z).is_some() && !out.contains(&p) {
                    out.push(p);
                }
            }
        }
        out
    }

    pub(crate) fn winner_with_distance(
        &self,
        input: &[f64],
        metric: &dyn DistanceMetric,
    ) -> Result<(Position, f64)> {
        let mut best: Option<(usize, f64)> = None;
        for (idx, slot) in self.units.iter().enumerate() {
            let Some(unit) = slot.as_ref() else { continue };
            let dist = metric.distance(&unit.weights, input)?;
            match best {
                Some((_, d)) if dist >= d => {}
                _ => best = Some((idx, dist)),
            }
        }
        let (idx, dist) =
            best.ok_or_else(|| KarttaError::Training("winner search on empty lattice".to_string()))?;
        Ok((self.position_of(idx), dist))
    }

    /// Finds the best-matching unit for an input: the occupied cell with
    /// minimal metric distance, ties resolved by scan order.
    pub fn find_winner(&self, input: &[f64], metric: &dyn DistanceMetric) -> Result<Position> {
        self.winner_with_distance(input, metric).map(|(pos, _)| pos)
    }

    /// Winner search that also returns every cell's distance to the
    /// input (indexed in scan order, `NaN` for holes). Used by the
    /// adaptive-coordinates layer.
    pub fn find_winner_with_distances(
        &self,
        input: &[f64],
        metric: &dyn DistanceMetric,
    ) -> Result<(Position, Vec<f64>)> {
        let mut distances = vec![f64::NAN; self.units.len()];
        let mut best: Option<(usize, f64)> = None;
        for (idx, slot) in self.units.iter().enumerate() {
            let Some(unit) = slot.as_ref() else { continue };
            let dist = metric.distance(&unit.weights, input)?;
            distances[idx] = dist;
            match best {
                Some((_, d)) if dist >= d => {}
                _ => best = Some((idx, dist)),
            }
        }
        let (idx, _) =
            best.ok_or_else(|| KarttaError::Training("winner search on empty lattice".to_string()))?;
        Ok((self.position_of(idx), distances))
    }

    /// The `k` nearest units to an input, as (position, distance) pairs
    /// sorted ascending by distance.
    pub fn find_k_nearest(
        &self,
        input: &[f64],
        metric: &dyn DistanceMetric,
        k: usize,
    ) -> Result<Vec<(Position, f64)>> {
        let mut distances = Vec::with_capacity(self.num_units());
        for (idx, slot) in self.units.iter().enumerate() {
            let Some(unit) = slot.as_ref() else { continue };
            distances.push((self.position_of(idx), metric.distance(&unit.weights, input)?));
        }
        distances.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
        distances.truncate(k);
        Ok(distances)
    }

    /// Clears all mapped inputs and maps every vector of the source onto
    /// its winner.
    pub fn map_inputs(
        &mut self,
        source: &dyn InputSource,
        metric: &dyn DistanceMetric,
    ) -> Result<()> {
        for unit in self.iter_units_mut() {
            unit.clear_mapped_inputs();
        }
        for i in 0..source.num_vectors() {
            let datum = source
                .input(i)
                .ok_or_else(|| KarttaError::Training(format!("input {} out of range", i)))?;
            let (pos, dist) = self.winner_with_distance(&datum.vector, metric)?;
            self.unit_mut(pos.x, pos.y, pos.z)?
                .add_mapped_input(datum.label.clone(), dist);
        }
        Ok(())
    }

    /// Inserts a plane of interpolated units before index `at` along an
    /// axis. Valid `at` ranges over `1..=size`; `at == size` closes the
    /// toroidal seam, interpolating between the last and first plane.
    ///
    /// Every new unit's weight is the elementwise mean of the two
    /// bounding units; a hole in either bounding cell makes the new cell
    /// a hole.
    pub fn insert_plane(&mut self, axis: Axis, at: usize) -> Result<()> {
        let old_size = match axis {
            Axis::X => self.xsize,
            Axis::Y => self.ysize,
            Axis::Z => self.zsize,
        };
        if at == 0 || at > old_size {
            return Err(KarttaError::Training(format!(
                "plane insertion index {} outside 1..={}",
                at, old_size
            )));
        }

        let (nx, ny, nz) = match axis {
            Axis::X => (self.xsize + 1, self.ysize, self.zsize),
            Axis::Y => (self.xsize, self.ysize + 1, self.zsize),
            Axis::Z => (self.xsize, self.ysize, self.zsize + 1),
        };

        // Interpolate the new plane from the bounding planes before any
        // cells move.
        let lo_coord = at - 1;
        let hi_coord = at % old_size;
        let mut plane: Vec<Option<Unit>> = Vec::new();
        for z in 0..nz {
            for y in 0..ny {
                for x in 0..nx {
                    if coord_along(axis, x, y, z) != at {
                        continue;
                    }
                    let (lx, ly, lz) = replace_coord(axis, x, y, z, lo_coord);
                    let (hx, hy, hz) = replace_coord(axis, x, y, z, hi_coord);
                    let cell = match (self.get(lx, ly, lz), self.get(hx, hy, hz)) {
                        (Some(a), Some(b)) => {
                            let weights: Vec<f64> = a
                                .weights
                                .iter()
                                .zip(b.weights.iter())
                                .map(|(p, q)| (p + q) / 2.0)
                                .collect();
                            Some(Unit::with_weights(x, y, z, weights))
                        }
                        _ => None,
                    };
                    plane.push(cell);
                }
            }
        }

        let mut old_units = std::mem::take(&mut self.units);
        let old_index = |x: usize, y: usize, z: usize| (z * self.ysize + y) * self.xsize + x;

        let mut plane_iter = plane.into_iter();
        let mut new_units: Vec<Option<Unit>> = Vec::with_capacity(nx * ny * nz);
        for z in 0..nz {
            for y in 0..ny {
                for x in 0..nx {
                    let c = coord_along(axis, x, y, z);
                    let cell = if c == at {
                        plane_iter.next().expect("interpolated plane exhausted")
                    } else {
                        let src = if c < at { c } else { c - 1 };
                        let (ox, oy, oz) = replace_coord(axis, x, y, z, src);
                        let mut cell = old_units[old_index(ox, oy, oz)].take();
                        if let Some(unit) = cell.as_mut() {
                            unit.x = x;
                            unit.y = y;
                            unit.z = z;
                        }
                        cell
                    };
                    new_units.push(cell);
                }
            }
        }

        self.xsize = nx;
        self.ysize = ny;
        self.zsize = nz;
        self.units = new_units;
        log::debug!(
            "Lattice grew along {:?} at {}: now {}x{}x{}",
            axis,
            at,
            nx,
            ny,
            nz
        );
        Ok(())
    }

    /// Grows the lattice by one plane between two directly neighbouring
    /// positions, returning the axis and insertion index used.
    pub fn grow_between(&mut self, a: Position, b: Position) -> Result<(Axis, usize)> {
        let diffs = [
            (Axis::X, a.x, b.x, self.xsize),
            (Axis::Y, a.y, b.y, self.ysize),
            (Axis::Z, a.z, b.z, self.zsize),
        ];
        let mut split: Option<(Axis, usize)> = None;
        for (axis, ca, cb, size) in diffs {
            if ca == cb {
                continue;
            }
            if split.is_some() {
                return Err(KarttaError::Training(
                    "growth anchors differ along more than one axis".to_string(),
                ));
            }
            let (lo, hi) = (ca.min(cb), ca.max(cb));
            let at = if hi - lo == 1 {
                hi
            } else if self.toroidal && lo == 0 && hi == size - 1 {
                size
            } else {
                return Err(KarttaError::Training(
                    "growth anchors are not direct neighbours".to_string(),
                ));
            };
            split = Some((axis, at));
        }
        let (axis, at) = split.ok_or_else(|| {
            KarttaError::Training("growth anchors are the same position".to_string())
        })?;
        self.insert_plane(axis, at)?;
        Ok((axis, at))
    }
}

/// Squared map distance between two positions for the given extents,
/// usable while the lattice's cells are mutably borrowed.
#[inline]
pub(crate) fn map_distance_squared_dims(
    a: Position,
    b: Position,
    sizes: (usize, usize, usize),
    toroidal: bool,
) -> f64 {
    let axes = [(a.x, b.x, sizes.0), (a.y, b.y, sizes.1), (a.z, b.z, sizes.2)];
    axes.iter()
        .map(|&(p, q, size)| {
            let d = p.abs_diff(q);
            let d = if toroidal { d.min(size - d) } else { d };
            (d * d) as f64
        })
        .sum()
}

#[inline]
fn coord_along(axis: Axis, x: usize, y: usize, z: usize) -> usize {
    match axis {
        Axis::X => x,
        Axis::Y => y,
        Axis::Z => z,
    }
}

#[inline]
fn replace_coord(axis: Axis, x: usize, y: usize, z: usize, c: usize) -> (usize, usize, usize) {
    match axis {
        Axis::X => (c, y, z),
        Axis::Y => (x, c, z),
        Axis::Z => (x, y, c),
    }
}
