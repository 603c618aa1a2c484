use crate::config::{EvolutionConfig, SearchSpaceConfig};
use crate::engines::generation::candidate::{Candidate, Parent};
use crate::engines::generation::genome::Genome;
use crate::engines::generation::operators::{
    crossover, elite_count, mutate, random_genome, rank_by_fitness, tournament_selection,
};
use crate::engines::generation::pbt::PopulationBasedTrainer;
use crate::error::{EvolveError, Result};
use crate::phenotype::{PhenotypeBuilder, TrainableModel};
use crate::types::{CandidateId, Device, ModelState};
use log::{debug, warn};
use rand::seq::index;
use rand::Rng;

/// Owns the current generation and produces the next one
pub struct PopulationManager<M> {
    config: EvolutionConfig,
    search_space: SearchSpaceConfig,
    device: Device,
    pbt: Option<PopulationBasedTrainer>,
    candidates: Vec<Candidate<M>>,
    generation: usize,
    mutation_rate: f64,
    next_id: u64,
}

impl<M: TrainableModel> PopulationManager<M> {
    pub fn new(
        config: EvolutionConfig,
        search_space: SearchSpaceConfig,
        device: Device,
        pbt: Option<PopulationBasedTrainer>,
    ) -> Self {
        let mutation_rate = config.mutation_rate;
        Self {
            config,
            search_space,
            device,
            pbt,
            candidates: Vec::new(),
            generation: 0,
            mutation_rate,
            next_id: 0,
        }
    }

    pub fn candidates(&self) -> &[Candidate<M>] {
        &self.candidates
    }

    pub fn candidates_mut(&mut self) -> &mut [Candidate<M>] {
        &mut self.candidates
    }

    pub fn generation(&self) -> usize {
        self.generation
    }

    pub fn mutation_rate(&self) -> f64 {
        self.mutation_rate
    }

    pub fn elite_count(&self) -> usize {
        elite_count(self.config.population_size, self.config.elitism_rate)
    }

    pub fn fitness_scores(&self) -> Vec<f64> {
        self.candidates.iter().map(Candidate::fitness).collect()
    }

    /// Seed `population_size` random candidates.
    ///
    /// Fails only if no phenotype at all could be built, which points at the
    /// builder rather than at individual genomes.
    pub fn initialize<B, R>(&mut self, input_size: usize, output_size: usize, builder: &B, rng: &mut R) -> Result<()>
    where
        B: PhenotypeBuilder<Model = M>,
        R: Rng,
    {
        if input_size == 0 || output_size == 0 {
            return Err(EvolveError::Configuration(format!(
                "input and output sizes must be positive, got {} and {}",
                input_size, output_size
            )));
        }

        let mut candidates = Vec::with_capacity(self.config.population_size);
        for _ in 0..self.config.population_size {
            let genome = random_genome(input_size, output_size, &self.search_space, rng)?;
            candidates.push(self.spawn(genome, None, builder));
        }

        if !candidates.is_empty() && candidates.iter().all(|c| c.model.is_none()) {
            let reason = candidates[0].build_error.clone().unwrap_or_default();
            return Err(EvolveError::PhenotypeBuildFailure(format!(
                "no phenotype could be built for the initial population: {}",
                reason
            )));
        }

        self.candidates = candidates;
        self.generation = 0;
        self.mutation_rate = self.config.mutation_rate;
        Ok(())
    }

    /// Elites by rank, then tournament winners for the remaining slots
    pub fn select_parents<R: Rng>(&self, fitness: &[f64], rng: &mut R) -> Vec<Parent> {
        let n = self.candidates.len();
        if n == 0 {
            return Vec::new();
        }
        let elites = elite_count(n, self.config.elitism_rate);

        let mut parents: Vec<Parent> = rank_by_fitness(fitness)
            .into_iter()
            .take(elites)
            .map(|idx| self.candidates[idx].to_parent(idx))
            .collect();

        while parents.len() < n {
            let idx = tournament_selection(fitness, self.config.tournament_size, rng);
            parents.push(self.candidates[idx].to_parent(idx));
        }

        parents
    }

    /// Replace the population with the next generation
    pub fn evolve_generation<B, R>(&mut self, builder: &B, rng: &mut R) -> Result<()>
    where
        B: PhenotypeBuilder<Model = M>,
        R: Rng,
    {
        let n = self.config.population_size;
        let elites = self.elite_count();
        let fitness = self.fitness_scores();

        let mut parents = self.select_parents(&fitness, rng);
        if parents.is_empty() {
            return Err(EvolveError::Configuration(
                "cannot evolve an uninitialized population".to_string(),
            ));
        }
        if let Some(pbt) = &self.pbt {
            if self.generation > 0 {
                parents = pbt.exploit_and_explore(parents, rng)?;
            }
        }

        let mut previous: Vec<Option<Candidate<M>>> =
            std::mem::take(&mut self.candidates).into_iter().map(Some).collect();
        let mut next: Vec<Candidate<M>> = Vec::with_capacity(n);

        for parent in parents.iter().take(elites) {
            let carried = match parent.source {
                Some(idx) if !parent.is_donated() => previous.get_mut(idx).and_then(Option::take),
                _ => None,
            };
            match carried {
                Some(candidate) => next.push(candidate),
                None => next.push(self.spawn(parent.genome.clone(), parent.warm_state.clone(), builder)),
            }
        }

        while next.len() < n {
            let (first, second) = if parents.len() > 1 {
                let pair = index::sample(rng, parents.len(), 2);
                (pair.index(0), pair.index(1))
            } else {
                (0, 0)
            };
            let parent1 = &parents[first];
            let parent2 = &parents[second];

            // clones keep the parent's weights, crossover children start cold
            let (genome, warm_state) = if rng.gen::<f64>() < self.config.crossover_rate {
                (crossover(&parent1.genome, &parent2.genome, rng)?, None)
            } else {
                (parent1.genome.clone(), parent1.warm_state.clone())
            };
            let genome = mutate(&genome, self.mutation_rate, self.config.mutation_strength, rng)?;
            next.push(self.spawn(genome, warm_state, builder));
        }

        self.candidates = next;
        self.generation += 1;
        if self.generation > self.config.decay_after {
            self.mutation_rate = (self.mutation_rate * self.config.mutation_decay).max(self.config.min_mutation_rate);
        }

        Ok(())
    }

    /// Build a fresh candidate; build failures are kept on the candidate
    fn spawn<B>(&mut self, genome: Genome, warm_state: Option<ModelState>, builder: &B) -> Candidate<M>
    where
        B: PhenotypeBuilder<Model = M>,
    {
        let id = CandidateId(self.next_id);
        self.next_id += 1;

        match builder.build(&genome, self.device) {
            Ok(mut model) => {
                let warm_state = warm_state.and_then(|state| match model.load_state(&state) {
                    Ok(()) => Some(state),
                    Err(e) => {
                        debug!("candidate {} starts cold: {}", id, e);
                        None
                    }
                });
                let mut candidate = Candidate::new(id, genome, Some(model));
                candidate.warm_state = warm_state;
                candidate
            }
            Err(e) => {
                warn!("candidate {} has no phenotype: {}", id, e);
                let mut candidate = Candidate::new(id, genome, None);
                candidate.build_error = Some(e.to_string());
                candidate
            }
        }
    }
}
