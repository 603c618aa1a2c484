use crate::config::PbtConfig;
use crate::engines::generation::candidate::Parent;
use crate::engines::generation::operators::{mutate, rank_by_fitness};
use crate::error::Result;
use log::debug;
use rand::Rng;

/// Population-Based Training: exploit the top half, explore around it.
pub struct PopulationBasedTrainer {
    config: PbtConfig,
}

impl PopulationBasedTrainer {
    pub fn new(config: PbtConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PbtConfig {
        &self.config
    }

    /// Replace every member of the bottom half with a perturbed clone of a
    /// random top-half member.
    ///
    /// Members keep their positions. A clone gets the donor's learning rates
    /// scaled by `1 + U(-explore_factor, explore_factor)`, a light mutation,
    /// and the donor's warm-start state.
    pub fn exploit_and_explore<R: Rng>(&self, mut parents: Vec<Parent>, rng: &mut R) -> Result<Vec<Parent>> {
        if parents.len() < 2 {
            return Ok(parents);
        }

        let fitness: Vec<f64> = parents.iter().map(|p| p.fitness).collect();
        let ranked = rank_by_fitness(&fitness);
        let donor_count = (parents.len() / 2).max(1);
        let (donors, underperformers) = ranked.split_at(donor_count);

        for &slot in underperformers {
            let donor = parents[donors[rng.gen_range(0..donors.len())]].clone();
            let factor = self.config.explore_factor;

            let scaled: Vec<f64> = donor
                .genome
                .learning_rates()
                .iter()
                .map(|lr| lr * (1.0 + rng.gen_range(-factor..=factor)))
                .collect();
            let explored = donor.genome.with_learning_rates(scaled)?;
            let genome = mutate(
                &explored,
                self.config.mutation_rate,
                self.config.mutation_strength,
                rng,
            )?;

            debug!(
                "PBT: {} (fitness {:.4}) takes weights from {} (fitness {:.4})",
                parents[slot].id, parents[slot].fitness, donor.id, donor.fitness
            );

            parents[slot] = Parent {
                source: None,
                id: parents[slot].id,
                genome,
                fitness: donor.fitness,
                warm_state: donor.warm_state.clone(),
                donor: Some(donor.id),
            };
        }

        Ok(parents)
    }
}
