use crate::config::{AppConfig, EvaluationConfig, EvolutionConfig, NoveltyConfig, PbtConfig, SearchSpaceConfig};
use crate::config::ConfigSection;
use crate::engines::evaluation::fitness::{evaluate_candidate, EvaluationPlan, Evaluator, TrainingPlan};
use crate::engines::generation::{
    genome::Genome,
    hall_of_fame::{EliteGenome, HallOfFame},
    novelty::NoveltyArchive,
    pbt::PopulationBasedTrainer,
    population::PopulationManager,
    progress::LogProgressCallback,
};
use crate::error::{EvolveError, Result};
use crate::phenotype::PhenotypeBuilder;
use crate::types::CandidateId;
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Everything the engine needs to know about a run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    pub evolution: EvolutionConfig,
    pub search_space: SearchSpaceConfig,
    pub evaluation: EvaluationConfig,
    pub novelty: NoveltyConfig,
    pub pbt: PbtConfig,
}

impl EngineConfig {
    pub fn validate(&self) -> Result<()> {
        self.evolution.validate()?;
        self.search_space.validate()?;
        self.evaluation.validate()?;
        self.novelty.validate()?;
        self.pbt.validate()?;
        Ok(())
    }
}

impl From<&AppConfig> for EngineConfig {
    fn from(app: &AppConfig) -> Self {
        Self {
            evolution: app.evolution.clone(),
            search_space: app.search_space.clone(),
            evaluation: app.evaluation.clone(),
            novelty: app.novelty.clone(),
            pbt: app.pbt.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EngineState {
    Uninitialized,
    PopulationSeeded,
    Evaluating,
    Selecting,
    Evolving,
    Terminated,
}

/// Summary of one evaluated generation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationStats {
    pub generation: usize,
    pub best_fitness: f64,
    /// Mean over candidates that did not fail
    pub mean_fitness: Option<f64>,
    pub worst_fitness: Option<f64>,
    pub failures: usize,
    pub best_ever: f64,
    pub improved: bool,
    pub quick_evaluation: bool,
    pub mutation_rate: f64,
    pub archive_size: usize,
}

/// Result of a complete run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvolutionOutcome {
    pub best_genome: Genome,
    pub best_fitness: f64,
    pub best_candidate: CandidateId,
    pub found_in_generation: usize,
    pub history: Vec<GenerationStats>,
    pub generations_run: usize,
    pub stopped_early: bool,
    pub hall_of_fame: Vec<EliteGenome>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl EvolutionOutcome {
    /// Best fitness of each generation, in order
    pub fn fitness_history(&self) -> Vec<f64> {
        self.history.iter().map(|g| g.best_fitness).collect()
    }

    /// Running best-ever fitness after each generation
    pub fn best_ever_history(&self) -> Vec<f64> {
        self.history.iter().map(|g| g.best_ever).collect()
    }
}

pub trait ProgressCallback {
    fn on_generation_start(&mut self, generation: usize);
    fn on_generation_complete(&mut self, stats: &GenerationStats);
    fn on_candidate_evaluated(&mut self, candidate_num: usize, total: usize);
}

pub struct EvolutionEngine<B: PhenotypeBuilder, E> {
    config: EngineConfig,
    builder: B,
    evaluator: E,
    population: PopulationManager<B::Model>,
    archive: NoveltyArchive,
    hall_of_fame: HallOfFame,
    rng: StdRng,
    pool: Option<rayon::ThreadPool>,
    state: EngineState,
    history: Vec<GenerationStats>,
}

impl<B, E> EvolutionEngine<B, E>
where
    B: PhenotypeBuilder,
    E: Evaluator<B::Model>,
{
    pub fn new(config: EngineConfig, builder: B, evaluator: E) -> Result<Self> {
        config.validate()?;

        let rng = match config.evolution.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let pool = if config.evaluation.parallel {
            let cores = std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1);
            let workers = config
                .evaluation
                .max_workers
                .unwrap_or(cores)
                .min(config.evolution.population_size)
                .max(1);
            Some(
                rayon::ThreadPoolBuilder::new()
                    .num_threads(workers)
                    .thread_name(|i| format!("evaluator-{}", i))
                    .build()?,
            )
        } else {
            None
        };

        let pbt = config
            .pbt
            .enabled
            .then(|| PopulationBasedTrainer::new(config.pbt.clone()));
        let population = PopulationManager::new(
            config.evolution.clone(),
            config.search_space.clone(),
            config.evaluation.device,
            pbt,
        );

        Ok(Self {
            archive: NoveltyArchive::new(config.novelty.k_nearest),
            hall_of_fame: HallOfFame::new(config.evolution.hall_of_fame_size),
            config,
            builder,
            evaluator,
            population,
            rng,
            pool,
            state: EngineState::Uninitialized,
            history: Vec::new(),
        })
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn population(&self) -> &PopulationManager<B::Model> {
        &self.population
    }

    pub fn archive(&self) -> &NoveltyArchive {
        &self.archive
    }

    pub fn get_hall_of_fame(&self) -> &HallOfFame {
        &self.hall_of_fame
    }

    pub fn best_ever(&self) -> Option<&EliteGenome> {
        self.hall_of_fame.best()
    }

    pub fn history(&self) -> &[GenerationStats] {
        &self.history
    }

    fn transition(&mut self, next: EngineState) {
        debug!("engine state {:?} -> {:?}", self.state, next);
        self.state = next;
    }

    /// Seed a fresh random population and clear run-scoped state
    pub fn initialize_population(&mut self, input_size: usize, output_size: usize) -> Result<()> {
        self.population
            .initialize(input_size, output_size, &self.builder, &mut self.rng)?;
        self.archive = NoveltyArchive::new(self.config.novelty.k_nearest);
        self.hall_of_fame.clear();
        self.history.clear();
        self.transition(EngineState::PopulationSeeded);
        info!(
            "seeded {} candidates ({} -> {})",
            self.population.candidates().len(),
            input_size,
            output_size
        );
        Ok(())
    }

    /// Run the evolution process
    pub fn run<C: ProgressCallback>(
        &mut self,
        input_size: usize,
        output_size: usize,
        mut callback: C,
    ) -> Result<EvolutionOutcome> {
        self.evaluator.ensure_ready()?;
        self.initialize_population(input_size, output_size)?;

        let started_at = Utc::now();
        let generations = self.config.evolution.generations;
        let patience = self.config.evolution.patience;
        let quick_threshold = generations as f64 * self.config.evaluation.quick_eval_fraction;

        let mut best_ever = f64::NEG_INFINITY;
        let mut stale = 0usize;
        let mut stopped_early = false;

        for generation in 0..generations {
            callback.on_generation_start(generation);

            let quick = (generation as f64) < quick_threshold;
            let fitness = self.evaluate_generation(generation, quick, &mut callback);
            let stats = self.aggregate(generation, quick, &fitness, best_ever);

            if stats.improved {
                best_ever = stats.best_ever;
                stale = 0;
            } else {
                stale += 1;
            }

            info!(
                "generation {}/{}: best {:.4}, best ever {:.4}, {} failed, mutation rate {:.4}",
                generation + 1,
                generations,
                stats.best_fitness,
                stats.best_ever,
                stats.failures,
                stats.mutation_rate
            );
            callback.on_generation_complete(&stats);
            self.history.push(stats);

            if stale >= patience {
                info!("no improvement for {} generations, stopping", stale);
                stopped_early = generation + 1 < generations;
                break;
            }
            if generation + 1 == generations {
                break;
            }

            self.transition(EngineState::Selecting);
            self.transition(EngineState::Evolving);
            self.population.evolve_generation(&self.builder, &mut self.rng)?;
        }

        self.transition(EngineState::Terminated);
        self.outcome(started_at, stopped_early)
    }

    /// Train and score every candidate. Returns once all of them are done.
    fn evaluate_generation<C: ProgressCallback>(&mut self, generation: usize, quick: bool, callback: &mut C) -> Vec<f64> {
        self.transition(EngineState::Evaluating);

        let eval = &self.config.evaluation;
        let plan = EvaluationPlan {
            max_batches: quick.then_some(eval.quick_eval_batches),
            training: (eval.train_between_generations && generation > 0).then_some(TrainingPlan {
                epochs: eval.train_epochs,
                max_batches: eval.train_max_batches,
            }),
        };
        let archive = self.config.novelty.enabled.then_some(&self.archive);
        let evaluator = &self.evaluator;
        let candidates = self.population.candidates_mut();

        let fitness: Vec<f64> = match &self.pool {
            Some(pool) => pool.install(|| {
                candidates
                    .par_iter_mut()
                    .map(|candidate| evaluate_candidate(candidate, evaluator, archive, &plan))
                    .collect()
            }),
            None => candidates
                .iter_mut()
                .map(|candidate| evaluate_candidate(candidate, evaluator, archive, &plan))
                .collect(),
        };

        for i in 0..fitness.len() {
            callback.on_candidate_evaluated(i + 1, fitness.len());
        }
        fitness
    }

    /// Serial step after the parallel phase: archive signatures, update the
    /// hall of fame and compute generation statistics.
    fn aggregate(&mut self, generation: usize, quick: bool, fitness: &[f64], best_ever: f64) -> GenerationStats {
        if self.config.novelty.enabled {
            for candidate in self.population.candidates() {
                if let Some(signature) = &candidate.signature {
                    self.archive.add(signature.clone());
                }
            }
        }

        for candidate in self.population.candidates() {
            self.hall_of_fame.try_add(EliteGenome::new(
                candidate.genome.clone(),
                candidate.fitness(),
                candidate.id,
                generation,
                candidate.metrics.last_accuracy,
            ));
        }

        let finite: Vec<f64> = fitness.iter().cloned().filter(|f| f.is_finite()).collect();
        let failures = fitness.len() - finite.len();
        if failures > 0 {
            warn!("{} of {} candidates failed in generation {}", failures, fitness.len(), generation);
        }
        let best_fitness = fitness.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        let improved = best_fitness > best_ever;

        GenerationStats {
            generation,
            best_fitness,
            mean_fitness: (!finite.is_empty()).then(|| finite.iter().sum::<f64>() / finite.len() as f64),
            worst_fitness: finite.iter().cloned().reduce(f64::min),
            failures,
            best_ever: if improved { best_fitness } else { best_ever },
            improved,
            quick_evaluation: quick,
            mutation_rate: self.population.mutation_rate(),
            archive_size: self.archive.len(),
        }
    }

    fn outcome(&self, started_at: DateTime<Utc>, stopped_early: bool) -> Result<EvolutionOutcome> {
        let best = self.hall_of_fame.best().ok_or_else(|| {
            EvolveError::EvaluationFailure("no candidate was evaluated successfully".to_string())
        })?;
        for (rank, elite) in self.hall_of_fame.get_top_n(3).iter().enumerate() {
            debug!(
                "hall of fame #{}: fitness {:.4}, layers {:?}, generation {}",
                rank + 1,
                elite.fitness,
                elite.genome.layers(),
                elite.generation
            );
        }

        Ok(EvolutionOutcome {
            best_genome: best.genome.clone(),
            best_fitness: best.fitness,
            best_candidate: best.candidate,
            found_in_generation: best.generation,
            history: self.history.clone(),
            generations_run: self.history.len(),
            stopped_early,
            hall_of_fame: self.hall_of_fame.get_all().to_vec(),
            started_at,
            finished_at: Utc::now(),
        })
    }
}

/// Run a complete search and return the best genome found
pub fn run_evolution<B, E>(
    builder: B,
    evaluator: E,
    config: EngineConfig,
    input_size: usize,
    output_size: usize,
) -> Result<EvolutionOutcome>
where
    B: PhenotypeBuilder,
    E: Evaluator<B::Model>,
{
    let mut engine = EvolutionEngine::new(config, builder, evaluator)?;
    engine.run(input_size, output_size, LogProgressCallback)
}
