//! Trainer for the growing mesh.
//!
//! All mesh training and growth is single-threaded; only the lattice
//! trainer uses the worker pool.

use crate::config::{LayoutConfig, MeshConfig};
use crate::error::{KarttaError, Result};
use crate::input::InputSource;
use crate::mesh::{layout, MeshGraph, UnitKey};
use crate::metric::DistanceMetric;
use log::debug;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// Trainer driving [`MeshGraph`] growth: winner/neighbour adaptation,
/// signal-counter bookkeeping, and periodic insertion/removal with
/// layout relaxation.
pub struct MeshTrainer {
    config: MeshConfig,
    layout: LayoutConfig,
    rng: ChaCha8Rng,
    steps: usize,
}

impl MeshTrainer {
    /// Creates a mesh trainer.
    pub fn new(config: MeshConfig, layout: LayoutConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        Self {
            config,
            layout,
            rng,
            steps: 0,
        }
    }

    /// The trainer's configuration.
    pub fn config(&self) -> &MeshConfig {
        &self.config
    }

    /// Number of training steps executed so far.
    pub fn steps(&self) -> usize {
        self.steps
    }

    /// Builds the initial three-unit mesh, drawing interval-uniform
    /// weights from the source when configured.
    pub fn initialize(&mut self, source: Option<&dyn InputSource>) -> Result<MeshGraph> {
        if let Some(source) = source {
            if source.dim() != self.config.dim {
                return Err(KarttaError::Config(format!(
                    "Input dimension {} does not match mesh dimension {}",
                    source.dim(),
                    self.config.dim
                )));
            }
            let (min, max) = source.data_intervals();
            MeshGraph::initialize(&self.config, Some((&min, &max)), &mut self.rng)
        } else {
            MeshGraph::initialize(&self.config, None, &mut self.rng)
        }
    }

    /// Runs one training step: winner adaptation with `epsilon_b`,
    /// neighbour adaptation with `epsilon_n`, then counter bookkeeping
    /// (winner +1, everything decayed by `1 - alpha`).
    pub fn train_step(&mut self, mesh: &mut MeshGraph, input: &[f64]) -> Result<UnitKey> {
        let winner = mesh.find_winner(input, &self.config.metric)?;

        let neighbours = mesh.neighbours(winner);
        mesh.unit_mut(winner)
            .expect("winner removed mid-step")
            .adapt(input, self.config.epsilon_b);
        for key in neighbours {
            if let Some(unit) = mesh.unit_mut(key) {
                unit.adapt(input, self.config.epsilon_n);
            }
        }

        mesh.unit_mut(winner)
            .expect("winner removed mid-step")
            .signal_counter += 1.0;
        mesh.decay_counters(1.0 - self.config.alpha);

        self.steps += 1;
        Ok(winner)
    }

    /// Runs one growth step: edge insertion at the highest-frequency
    /// unit, density-threshold removal, then layout relaxation.
    pub fn growth_step(&mut self, mesh: &mut MeshGraph) -> Result<()> {
        self.insert_step(mesh)?;
        mesh.remove_low_density_units(
            self.config.eta,
            self.config.removal_cap_divisor,
            self.config.min_units,
            &self.config.metric,
        )?;
        layout::relax(mesh, &self.layout);
        Ok(())
    }

    /// Splits the edge between the unit with the highest relative signal
    /// frequency and its most weight-distant topological neighbour.
    fn insert_step(&mut self, mesh: &mut MeshGraph) -> Result<UnitKey> {
        let total = mesh.total_signal();
        let mut sf_winner: Option<(UnitKey, f64)> = None;
        for key in mesh.unit_keys_sorted() {
            let counter = mesh.unit(key).expect("sorted key").signal_counter;
            let frequency = if total > 0.0 { counter / total } else { 0.0 };
            match sf_winner {
                Some((_, best)) if frequency <= best => {}
                _ => sf_winner = Some((key, frequency)),
            }
        }
        let (sf_winner, _) = sf_winner
            .ok_or_else(|| KarttaError::Training("growth step on empty mesh".to_string()))?;

        let winner_weights = mesh.unit(sf_winner).expect("winner present").weights.clone();
        let mut sf_partner: Option<(UnitKey, f64)> = None;
        for key in mesh.neighbours(sf_winner) {
            let dist = self
                .config
                .metric
                .distance(&winner_weights, &mesh.unit(key).expect("neighbour present").weights)?;
            match sf_partner {
                Some((_, best)) if dist <= best => {}
                _ => sf_partner = Some((key, dist)),
            }
        }
        let (sf_partner, _) = sf_partner.ok_or_else(|| {
            KarttaError::Training("frequency winner has no topological neighbours".to_string())
        })?;

        let new_key = mesh.split_edge(sf_winner, sf_partner, &self.config.metric)?;
        debug!(
            "Mesh insertion: {} units, {} simplices",
            mesh.num_units(),
            mesh.num_simplices()
        );
        Ok(new_key)
    }

    /// Trains for `steps` steps over randomly sampled inputs, running a
    /// growth step every `lambda` steps.
    pub fn train(
        &mut self,
        mesh: &mut MeshGraph,
        source: &dyn InputSource,
        steps: usize,
    ) -> Result<()> {
        if source.num_vectors() == 0 {
            return Err(KarttaError::Training("no input vectors provided".to_string()));
        }
        if source.dim() != mesh.dim() {
            return Err(KarttaError::Training(format!(
                "input dimension {} does not match mesh dimension {}",
                source.dim(),
                mesh.dim()
            )));
        }
        for _ in 0..steps {
            let input = source.random_input(&mut self.rng).vector.clone();
            self.train_step(mesh, &input)?;
            if self.config.lambda > 0 && self.steps % self.config.lambda == 0 {
                self.growth_step(mesh)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::{DenseInputs, InputDatum};

    fn source() -> DenseInputs {
        DenseInputs::new(vec![
            InputDatum::new("a", vec![0.1, 0.1]),
            InputDatum::new("b", vec![0.9, 0.1]),
            InputDatum::new("c", vec![0.5, 0.9]),
            InputDatum::new("d", vec![0.9, 0.9]),
        ])
    }

    fn trainer() -> MeshTrainer {
        MeshTrainer::new(
            MeshConfig {
                dim: 2,
                lambda: 25,
                seed: Some(42),
                ..Default::default()
            },
            LayoutConfig::default(),
        )
    }

    #[test]
    fn test_train_step_updates_winner_and_counters() {
        let mut trainer = trainer();
        let mut mesh = trainer.initialize(None).unwrap();
        let keys = mesh.unit_keys_sorted();
        for (i, &key) in keys.iter().enumerate() {
            mesh.unit_mut(key).unwrap().weights = vec![i as f64, 0.0];
        }

        let winner = trainer.train_step(&mut mesh, &[2.0, 0.0]).unwrap();
        assert_eq!(winner, keys[2]);

        // Winner's counter incremented then decayed once.
        let alpha = trainer.config().alpha;
        let counter = mesh.unit(winner).unwrap().signal_counter;
        assert!((counter - (1.0 - alpha)).abs() < 1e-10);

        // Winner moved further than its neighbours.
        let winner_w = mesh.unit(winner).unwrap().weights[0];
        assert!(winner_w > 2.0 - 1e-9 || (winner_w - 2.0).abs() < 1e-9);
        let other_w = mesh.unit(keys[0]).unwrap().weights[0];
        assert!(other_w.abs() < trainer.config().epsilon_b);
    }

    #[test]
    fn test_growth_inserts_units() {
        let mut trainer = trainer();
        let mut mesh = trainer.initialize(Some(&source())).unwrap();

        trainer.train(&mut mesh, &source(), 200).unwrap();
        // 200 steps / lambda 25 = 8 growth steps, each inserting one
        // unit (removal may prune some but never below the floor of the
        // initial three).
        assert!(mesh.num_units() > 3);
        mesh.debug_validate();
    }

    #[test]
    fn test_training_preserves_dim() {
        let mut trainer = trainer();
        let mut mesh = trainer.initialize(Some(&source())).unwrap();
        trainer.train(&mut mesh, &source(), 120).unwrap();
        for (_, unit) in mesh.iter_units() {
            assert_eq!(unit.weights.len(), 2);
        }
    }

    #[test]
    fn test_dim_mismatch_is_error() {
        let mut trainer = trainer();
        let mut mesh = trainer.initialize(None).unwrap();
        let bad = DenseInputs::new(vec![InputDatum::new("x", vec![1.0, 2.0, 3.0])]);
        assert!(trainer.train(&mut mesh, &bad, 10).is_err());
    }
}
