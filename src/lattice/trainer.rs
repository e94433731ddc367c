//! Competitive-learning trainer for the lattice.
//!
//! The trainer owns the decay schedule, the spatial partition for the
//! parallel weight-update phase, the optional adaptive-coordinates layer,
//! and the quality-gated growth loop.

use crate::adaptive::AdaptiveCoordinates;
use crate::config::{AdaptiveConfig, TrainingConfig};
use crate::error::{KarttaError, Result};
use crate::input::InputSource;
use crate::lattice::{map_distance_squared_dims, Lattice, Position, SpatialPartition, Unit};
use crate::metric::DistanceMetric;
use crate::progress::{CancelToken, NullProgress, ProgressListener};
use crate::quality::QualityMeasure;
use log::{info, warn};
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use std::collections::HashMap;

/// Per-epoch statistics recorded during training.
#[derive(Debug, Clone, Default)]
pub struct TrainingMetrics {
    /// Global quality after each epoch.
    pub epoch_errors: Vec<f64>,
    /// Learning rate at the end of each epoch (after decay and floor).
    pub learnrates: Vec<f64>,
    /// Sigma at the end of each epoch (after decay and floor).
    pub sigmas: Vec<f64>,
}

/// Outcome of a [`LatticeTrainer::train_epochs`] run.
#[derive(Debug, Clone, Default)]
pub struct TrainingRun {
    /// The quality target was reached (or the map is fixed-size).
    pub converged: bool,
    /// The cancel token fired before convergence.
    pub cancelled: bool,
    /// Number of growth steps executed.
    pub growth_steps: usize,
    /// Global quality after the last epoch.
    pub final_quality: f64,
    /// Per-epoch statistics.
    pub metrics: TrainingMetrics,
}

/// Trainer for fixed-size and growing lattices.
pub struct LatticeTrainer {
    config: TrainingConfig,
    rng: ChaCha8Rng,
    partition: SpatialPartition,
    adaptive: Option<AdaptiveCoordinates>,
    listener: Box<dyn ProgressListener>,
    cancel: CancelToken,
    /// Cumulative iteration count across epochs; gates the adaptive
    /// layer thresholds.
    iteration: usize,
}

impl LatticeTrainer {
    /// Creates a trainer for the given lattice.
    ///
    /// The worker-pool size (and with it the spatial partition) is fixed
    /// here; the partition is rebuilt automatically after growth steps.
    pub fn new(config: TrainingConfig, lattice: &Lattice) -> Self {
        let rng = match config.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        let (xs, ys, zs) = lattice.sizes();
        let pool = effective_pool(config.pool_size);
        let partition = SpatialPartition::new(xs, ys, zs, pool);

        Self {
            config,
            rng,
            partition,
            adaptive: None,
            listener: Box::new(NullProgress),
            cancel: CancelToken::new(),
            iteration: 0,
        }
    }

    /// Replaces the progress listener.
    pub fn with_listener(mut self, listener: Box<dyn ProgressListener>) -> Self {
        self.listener = listener;
        self
    }

    /// Replaces the cancel token; keep a clone to request cancellation.
    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = token;
        self
    }

    /// The trainer's configuration.
    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    /// Attaches an adaptive-coordinates layer stack, one virtual grid
    /// per configured threshold. Requires a planar (Z = 1) lattice.
    pub fn attach_adaptive(&mut self, config: &AdaptiveConfig, lattice: &Lattice) -> Result<()> {
        let (xs, ys, zs) = lattice.sizes();
        if zs != 1 {
            return Err(KarttaError::Config(
                "adaptive coordinates require a planar lattice (zsize == 1)".to_string(),
            ));
        }
        self.adaptive = Some(AdaptiveCoordinates::new(xs, ys, &config.thresholds)?);
        Ok(())
    }

    /// The attached adaptive-coordinates layer, if any.
    pub fn adaptive(&self) -> Option<&AdaptiveCoordinates> {
        self.adaptive.as_ref()
    }

    /// Detaches and returns the adaptive-coordinates layer.
    pub fn take_adaptive(&mut self) -> Option<AdaptiveCoordinates> {
        self.adaptive.take()
    }

    /// Rebuilds the spatial partition for the lattice's current extents.
    pub fn repartition(&mut self, lattice: &Lattice) {
        let (xs, ys, zs) = lattice.sizes();
        self.partition = SpatialPartition::new(xs, ys, zs, effective_pool(self.config.pool_size));
    }

    fn decay_scale(&self) -> f64 {
        if self.config.decay_param > 0.0 {
            self.config.decay_param
        } else {
            (self.config.iterations as f64 / 8.0).max(1.0)
        }
    }

    /// Learning rate at iteration `i` of an epoch, floored.
    #[inline]
    pub fn learnrate_at(&self, i: usize) -> f64 {
        let decayed = self.config.initial_learnrate * (-(i as f64) / self.decay_scale()).exp();
        decayed.max(self.config.learnrate_floor)
    }

    /// Sigma at iteration `i` of an epoch, floored.
    #[inline]
    pub fn sigma_at(&self, i: usize) -> f64 {
        let decayed = self.config.initial_sigma * (-(i as f64) / self.decay_scale()).exp();
        decayed.max(self.config.sigma_floor)
    }

    /// Applies the neighbourhood-weighted update for one input to every
    /// unit of the lattice.
    ///
    /// Each worker of the fixed pool updates only the units inside its
    /// partition box; the boxes are disjoint, so no unit is written by
    /// two workers. The call returns only after all workers finished.
    pub fn update_weights(
        &self,
        lattice: &mut Lattice,
        winner: Position,
        input: &[f64],
        learnrate: f64,
        sigma: f64,
    ) {
        let sizes = lattice.sizes();
        let toroidal = lattice.toroidal();
        let (xsize, ysize) = (sizes.0, sizes.1);
        let denom = 2.0 * sigma * sigma;

        let mut buckets: Vec<Vec<&mut Unit>> =
            (0..self.partition.len()).map(|_| Vec::new()).collect();
        for (idx, slot) in lattice.cells_mut().iter_mut().enumerate() {
            let Some(unit) = slot.as_mut() else { continue };
            let pos = Position::new(idx % xsize, (idx / xsize) % ysize, idx / (xsize * ysize));
            let owner = self.partition.box_of(pos).unwrap_or(0);
            buckets[owner].push(unit);
        }

        buckets.into_par_iter().for_each(|bucket| {
            for unit in bucket {
                let pos = Position::new(unit.x, unit.y, unit.z);
                let d2 = map_distance_squared_dims(pos, winner, sizes, toroidal);
                let hci = if d2 == 0.0 {
                    learnrate
                } else {
                    learnrate * (-d2 / denom).exp()
                };
                unit.adapt(input, hci);
            }
        });
    }

    /// Runs one competitive-learning step: winner search, parallel
    /// weight update, and (when attached) the adaptive-coordinates
    /// relaxation. Returns the winner position.
    pub fn train_step(
        &mut self,
        lattice: &mut Lattice,
        input: &[f64],
        learnrate: f64,
        sigma: f64,
    ) -> Result<Position> {
        let winner = if self.adaptive.is_some() {
            let (winner, prior) =
                lattice.find_winner_with_distances(input, &self.config.metric)?;
            self.update_weights(lattice, winner, input, learnrate, sigma);
            let current = lattice.distances_to(input, &self.config.metric)?;
            self.iteration += 1;
            let layer = self.adaptive.as_mut().expect("adaptive layer present");
            layer.update((winner.x, winner.y), &prior, &current, self.iteration);
            winner
        } else {
            let winner = lattice.find_winner(input, &self.config.metric)?;
            self.update_weights(lattice, winner, input, learnrate, sigma);
            self.iteration += 1;
            winner
        };
        Ok(winner)
    }

    /// Runs one epoch of `iterations` steps over randomly sampled
    /// inputs. Returns true if cancellation was observed.
    fn run_iterations(&mut self, lattice: &mut Lattice, source: &dyn InputSource) -> Result<bool> {
        let total = self.config.iterations;
        for i in 0..total {
            if i % self.config.interrupt_every.max(1) == 0 {
                self.listener.progress(i, total);
                if self.cancel.is_cancelled() {
                    return Ok(true);
                }
            }
            let datum = source.random_input(&mut self.rng);
            let learnrate = self.learnrate_at(i);
            let sigma = self.sigma_at(i);
            self.train_step(lattice, &datum.vector, learnrate, sigma)?;
        }
        Ok(false)
    }

    /// Trains until the configured quality target is met, growing the
    /// lattice between epochs.
    ///
    /// Each round runs `iterations` steps, maps the full dataset,
    /// evaluates the configured quality measure, and either stops
    /// (`tau == 1.0`, quality reached, growth bound hit, or cancelled)
    /// or inserts one interpolated plane between the worst unit and its
    /// most distant neighbour and re-partitions the worker boxes.
    pub fn train_epochs(
        &mut self,
        lattice: &mut Lattice,
        source: &dyn InputSource,
    ) -> Result<TrainingRun> {
        if source.num_vectors() == 0 {
            return Err(KarttaError::Training("no input vectors provided".to_string()));
        }
        if source.dim() != lattice.dim() {
            return Err(KarttaError::Training(format!(
                "input dimension {} does not match lattice dimension {}",
                source.dim(),
                lattice.dim()
            )));
        }

        let mut run = TrainingRun::default();
        loop {
            if self.cancel.is_cancelled() {
                run.cancelled = true;
                break;
            }
            self.listener.phase("epoch");
            let cancelled = self.run_iterations(lattice, source)?;

            lattice.map_inputs(source, &self.config.metric)?;
            let quality = self.config.quality.global(lattice)?;
            run.final_quality = quality;
            run.metrics.epoch_errors.push(quality);
            run.metrics
                .learnrates
                .push(self.learnrate_at(self.config.iterations.saturating_sub(1)));
            run.metrics
                .sigmas
                .push(self.sigma_at(self.config.iterations.saturating_sub(1)));

            info!(
                "Epoch done: quality {:.6}, {} units ({} growth steps)",
                quality,
                lattice.num_units(),
                run.growth_steps
            );

            if cancelled {
                run.cancelled = true;
                break;
            }
            if self.config.tau == 1.0 || quality <= self.config.target_quality * self.config.tau {
                run.converged = true;
                break;
            }
            if run.growth_steps >= self.config.max_growth_steps {
                warn!(
                    "Growth bound of {} steps reached at quality {:.6} (target {:.6})",
                    self.config.max_growth_steps,
                    quality,
                    self.config.target_quality * self.config.tau
                );
                break;
            }

            let (worst, partner) = self.growth_anchors(lattice)?;
            self.listener.phase("grow");
            let (axis, at) = lattice.grow_between(worst, partner)?;
            if let Some(layer) = &mut self.adaptive {
                layer.insert_plane(axis, at)?;
            }
            self.repartition(lattice);
            run.growth_steps += 1;
        }

        Ok(run)
    }

    /// Batch SOM update: one full pass over the dataset accumulating
    /// each unit's Gaussian-weighted neighbourhood, then setting every
    /// weight to the weighted mean. Mutually exclusive with the
    /// incremental update of [`LatticeTrainer::train_step`].
    pub fn train_batch_epoch(
        &mut self,
        lattice: &mut Lattice,
        source: &dyn InputSource,
        sigma: f64,
    ) -> Result<()> {
        if source.num_vectors() == 0 {
            return Err(KarttaError::Training("no input vectors provided".to_string()));
        }
        let dim = lattice.dim();
        let total = lattice.total_cells();
        let sizes = lattice.sizes();
        let toroidal = lattice.toroidal();
        let denom = 2.0 * sigma * sigma;

        let mut numerator = vec![0.0f64; total * dim];
        let mut weight_sum = vec![0.0f64; total * dim];

        for i in 0..source.num_vectors() {
            let datum = source
                .input(i)
                .ok_or_else(|| KarttaError::Training(format!("input {} out of range", i)))?;
            let winner = lattice.find_winner(&datum.vector, &self.config.metric)?;

            for (idx, slot) in lattice.cells().iter().enumerate() {
                if slot.is_none() {
                    continue;
                }
                let pos = lattice.cell_position(idx);
                let d2 = map_distance_squared_dims(pos, winner, sizes, toroidal);
                let h = if d2 == 0.0 { 1.0 } else { (-d2 / denom).exp() };
                let offset = idx * dim;
                for (k, &v) in datum.vector.iter().enumerate() {
                    if v.is_nan() {
                        continue;
                    }
                    numerator[offset + k] += h * v;
                    weight_sum[offset + k] += h;
                }
            }
        }

        for (idx, slot) in lattice.cells_mut().iter_mut().enumerate() {
            let Some(unit) = slot.as_mut() else { continue };
            let offset = idx * dim;
            for k in 0..dim {
                if weight_sum[offset + k] > 0.0 {
                    unit.weights[k] = numerator[offset + k] / weight_sum[offset + k];
                }
            }
        }
        self.iteration += 1;
        Ok(())
    }

    /// Selective training: inputs are accepted with their class's
    /// probability (floored at `min_class_probability`); everything else
    /// follows the incremental update.
    ///
    /// `classes` maps input names to class names; `class_probabilities`
    /// maps class names to acceptance probabilities. Unlisted inputs and
    /// classes train with probability 1.
    pub fn train_selective(
        &mut self,
        lattice: &mut Lattice,
        source: &dyn InputSource,
        classes: &HashMap<String, String>,
        class_probabilities: &HashMap<String, f64>,
        iterations: usize,
    ) -> Result<()> {
        if source.num_vectors() == 0 {
            return Err(KarttaError::Training("no input vectors provided".to_string()));
        }
        for i in 0..iterations {
            if i % self.config.interrupt_every.max(1) == 0 {
                self.listener.progress(i, iterations);
                if self.cancel.is_cancelled() {
                    return Ok(());
                }
            }
            let learnrate = self.learnrate_at(i);
            let sigma = self.sigma_at(i);

            let datum = loop {
                let datum = source.random_input(&mut self.rng);
                let probability = classes
                    .get(&datum.label)
                    .and_then(|class| class_probabilities.get(class))
                    .copied()
                    .unwrap_or(1.0)
                    .max(self.config.min_class_probability);
                let accepted = probability >= 1.0 || self.rng.gen::<f64>() < probability;
                if accepted {
                    break datum;
                }
            };
            self.train_step(lattice, &datum.vector, learnrate, sigma)?;
        }
        Ok(())
    }

    /// Pinned training: inputs listed in `pins` always update around
    /// their pinned unit, bypassing winner search; all other inputs
    /// train normally.
    pub fn train_pinned(
        &mut self,
        lattice: &mut Lattice,
        source: &dyn InputSource,
        pins: &HashMap<String, Position>,
        iterations: usize,
    ) -> Result<()> {
        if source.num_vectors() == 0 {
            return Err(KarttaError::Training("no input vectors provided".to_string()));
        }
        for i in 0..iterations {
            if i % self.config.interrupt_every.max(1) == 0 {
                self.listener.progress(i, iterations);
                if self.cancel.is_cancelled() {
                    return Ok(());
                }
            }
            let learnrate = self.learnrate_at(i);
            let sigma = self.sigma_at(i);
            let datum = source.random_input(&mut self.rng);

            match pins.get(&datum.label) {
                Some(&pos) => {
                    lattice.unit(pos.x, pos.y, pos.z)?;
                    self.update_weights(lattice, pos, &datum.vector, learnrate, sigma);
                    self.iteration += 1;
                }
                None => {
                    self.train_step(lattice, &datum.vector, learnrate, sigma)?;
                }
            }
        }
        Ok(())
    }

    /// Picks the growth anchors: the unit with the worst per-unit error
    /// and its most weight-distant direct neighbour.
    fn growth_anchors(&self, lattice: &Lattice) -> Result<(Position, Position)> {
        let errors = self.config.quality.per_unit(lattice)?;
        let mut worst: Option<(usize, f64)> = None;
        for (idx, &e) in errors.iter().enumerate() {
            if e.is_nan() {
                continue;
            }
            match worst {
                Some((_, w)) if e <= w => {}
                _ => worst = Some((idx, e)),
            }
        }
        let (worst_idx, _) = worst
            .ok_or_else(|| KarttaError::Training("no units available for growth".to_string()))?;
        let worst_pos = lattice.cell_position(worst_idx);
        let worst_unit = lattice.unit(worst_pos.x, worst_pos.y, worst_pos.z)?;

        let mut partner: Option<(Position, f64)> = None;
        for pos in lattice.neighbours(worst_pos) {
            let unit = lattice.unit(pos.x, pos.y, pos.z)?;
            let dist = self
                .config
                .metric
                .distance(&worst_unit.weights, &unit.weights)?;
            if partner.map_or(true, |(_, best)| dist > best) {
                partner = Some((pos, dist));
            }
        }
        let (partner_pos, _) = partner.ok_or_else(|| {
            KarttaError::Training("worst unit has no neighbours to grow towards".to_string())
        })?;
        Ok((worst_pos, partner_pos))
    }
}

fn effective_pool(pool_size: usize) -> usize {
    if pool_size == 0 {
        rayon::current_num_threads()
    } else {
        pool_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{LatticeConfig, WeightInit};
    use crate::input::{DenseInputs, InputDatum};

    fn lattice(xsize: usize, ysize: usize, dim: usize) -> Lattice {
        Lattice::new(&LatticeConfig {
            xsize,
            ysize,
            zsize: 1,
            dim,
            init: WeightInit::Zeros,
            seed: Some(42),
            ..Default::default()
        })
        .unwrap()
    }

    fn trainer_for(lattice: &Lattice) -> LatticeTrainer {
        LatticeTrainer::new(
            TrainingConfig {
                iterations: 50,
                seed: Some(42),
                pool_size: 2,
                ..Default::default()
            },
            lattice,
        )
    }

    #[test]
    fn test_decay_respects_floors() {
        let lattice = lattice(2, 2, 2);
        let trainer = trainer_for(&lattice);

        assert!((trainer.learnrate_at(0) - 0.7).abs() < 1e-10);
        assert!(trainer.learnrate_at(10) < trainer.learnrate_at(0));
        assert!(trainer.learnrate_at(1_000_000) >= 0.0001);
        assert!(trainer.sigma_at(1_000_000) >= 0.01);
    }

    #[test]
    fn test_update_with_zero_learnrate_is_noop() {
        let mut lattice = lattice(3, 3, 2);
        for unit in lattice.iter_units_mut() {
            unit.weights = vec![0.25, -0.5];
        }
        let trainer = trainer_for(&lattice);
        trainer.update_weights(&mut lattice, Position::new(1, 1, 0), &[1.0, 1.0], 0.0, 2.0);
        for unit in lattice.iter_units() {
            assert_eq!(unit.weights, vec![0.25, -0.5]);
        }
    }

    #[test]
    fn test_single_unit_full_learnrate_snaps_to_input() {
        let mut lattice = lattice(1, 1, 2);
        let trainer = trainer_for(&lattice);
        trainer.update_weights(&mut lattice, Position::new(0, 0, 0), &[1.0, 1.0], 1.0, 5.0);
        assert_eq!(lattice.unit(0, 0, 0).unwrap().weights, vec![1.0, 1.0]);
    }

    #[test]
    fn test_tiny_sigma_updates_only_winner() {
        let mut lattice = lattice(2, 1, 2);
        lattice.unit_mut(0, 0, 0).unwrap().weights = vec![0.0, 0.0];
        lattice.unit_mut(1, 0, 0).unwrap().weights = vec![10.0, 0.0];

        let winner = lattice
            .find_winner(&[10.0, 0.0], &crate::metric::MetricKind::Euclidean)
            .unwrap();
        assert_eq!(winner, Position::new(1, 0, 0));

        // An input closer to the second unit: it alone moves halfway.
        let mut trainer = trainer_for(&lattice);
        let winner = trainer
            .train_step(&mut lattice, &[6.0, 0.0], 0.5, 1e-12)
            .unwrap();
        assert_eq!(winner, Position::new(1, 0, 0));
        assert_eq!(lattice.unit(0, 0, 0).unwrap().weights, vec![0.0, 0.0]);
        assert_eq!(lattice.unit(1, 0, 0).unwrap().weights, vec![8.0, 0.0]);
    }

    #[test]
    fn test_train_epochs_fixed_size_converges() {
        let mut lattice = lattice(2, 2, 2);
        let source = DenseInputs::new(vec![
            InputDatum::new("a", vec![0.0, 0.0]),
            InputDatum::new("b", vec![1.0, 1.0]),
        ]);
        let mut trainer = trainer_for(&lattice);

        let run = trainer.train_epochs(&mut lattice, &source).unwrap();
        assert!(run.converged);
        assert_eq!(run.growth_steps, 0);
        assert_eq!(run.metrics.epoch_errors.len(), 1);
        for unit in lattice.iter_units() {
            assert_eq!(unit.dim(), 2);
        }
    }

    #[test]
    fn test_train_epochs_grows_until_bound() {
        let mut lattice = lattice(2, 2, 2);
        let source = DenseInputs::new(vec![
            InputDatum::new("a", vec![0.0, 0.0]),
            InputDatum::new("b", vec![1.0, 1.0]),
            InputDatum::new("c", vec![-1.0, 2.0]),
            InputDatum::new("d", vec![3.0, -2.0]),
        ]);
        let mut trainer = LatticeTrainer::new(
            TrainingConfig {
                iterations: 20,
                tau: 0.5,
                // Unreachable target forces growth to the bound.
                target_quality: 0.0,
                max_growth_steps: 3,
                seed: Some(42),
                pool_size: 2,
                ..Default::default()
            },
            &lattice,
        );

        let run = trainer.train_epochs(&mut lattice, &source).unwrap();
        assert!(!run.converged);
        assert_eq!(run.growth_steps, 3);
        // Each growth step adds exactly one plane.
        let (xs, ys, zs) = lattice.sizes();
        assert_eq!(xs * ys * zs, lattice.num_units());
        assert_eq!((xs - 2) + (ys - 2) + (zs - 1), 3);
        for unit in lattice.iter_units() {
            assert_eq!(unit.dim(), 2);
        }
    }

    #[test]
    fn test_cancel_token_stops_training() {
        let mut lattice = lattice(2, 2, 2);
        let source = DenseInputs::new(vec![InputDatum::new("a", vec![0.0, 0.0])]);
        let token = CancelToken::new();
        token.cancel();
        let mut trainer = trainer_for(&lattice).with_cancel_token(token);

        let run = trainer.train_epochs(&mut lattice, &source).unwrap();
        assert!(run.cancelled);
        assert!(!run.converged);
    }

    #[test]
    fn test_batch_epoch_moves_weights_to_data_mean() {
        let mut lattice = lattice(1, 1, 2);
        let source = DenseInputs::new(vec![
            InputDatum::new("a", vec![0.0, 2.0]),
            InputDatum::new("b", vec![4.0, 2.0]),
        ]);
        let mut trainer = trainer_for(&lattice);
        trainer.train_batch_epoch(&mut lattice, &source, 1.0).unwrap();

        let weights = &lattice.unit(0, 0, 0).unwrap().weights;
        assert!((weights[0] - 2.0).abs() < 1e-10);
        assert!((weights[1] - 2.0).abs() < 1e-10);
    }

    #[test]
    fn test_pinned_training_bypasses_winner_search() {
        let mut lattice = lattice(2, 1, 2);
        lattice.unit_mut(0, 0, 0).unwrap().weights = vec![0.0, 0.0];
        lattice.unit_mut(1, 0, 0).unwrap().weights = vec![10.0, 10.0];

        let source = DenseInputs::new(vec![InputDatum::new("pin-me", vec![10.0, 10.0])]);
        let mut pins = HashMap::new();
        // The natural winner would be unit (1, 0, 0).
        pins.insert("pin-me".to_string(), Position::new(0, 0, 0));

        let mut trainer = LatticeTrainer::new(
            TrainingConfig {
                iterations: 1,
                initial_learnrate: 1.0,
                initial_sigma: 1e-12,
                sigma_floor: 1e-12,
                seed: Some(42),
                pool_size: 1,
                ..Default::default()
            },
            &lattice,
        );
        trainer
            .train_pinned(&mut lattice, &source, &pins, 1)
            .unwrap();

        assert_eq!(lattice.unit(0, 0, 0).unwrap().weights, vec![10.0, 10.0]);
    }

    #[test]
    fn test_selective_training_skips_zero_probability_class() {
        let mut lattice = lattice(2, 1, 1);
        for unit in lattice.iter_units_mut() {
            unit.weights = vec![0.0];
        }
        let source = DenseInputs::new(vec![
            InputDatum::new("keep", vec![1.0]),
            InputDatum::new("drop", vec![-1.0]),
        ]);
        let mut classes = HashMap::new();
        classes.insert("drop".to_string(), "noise".to_string());
        let mut probabilities = HashMap::new();
        probabilities.insert("noise".to_string(), 0.0);

        let mut trainer = LatticeTrainer::new(
            TrainingConfig {
                iterations: 40,
                min_class_probability: 0.0,
                seed: Some(42),
                pool_size: 1,
                ..Default::default()
            },
            &lattice,
        );
        trainer
            .train_selective(&mut lattice, &source, &classes, &probabilities, 40)
            .unwrap();

        // Only the "keep" vector trained, so no weight went negative.
        for unit in lattice.iter_units() {
            assert!(unit.weights[0] >= 0.0);
        }
    }
}
