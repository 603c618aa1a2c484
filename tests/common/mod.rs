#![allow(dead_code)]

use alpha_evolve::config::{EvaluationConfig, EvolutionConfig, NoveltyConfig, PbtConfig};
use alpha_evolve::data::{BatchIter, TrainingDataSource};
use alpha_evolve::engines::evaluation::{Assessment, Evaluator};
use alpha_evolve::engines::generation::{EngineConfig, Genome};
use alpha_evolve::error::{EvolveError, Result};
use alpha_evolve::phenotype::PrototypeModel;
use std::sync::{Arc, Mutex};

/// Scores a genome by how close its widths sum to `target`; ignores the model
pub struct LayerSumEvaluator {
    pub target: usize,
}

impl LayerSumEvaluator {
    pub fn score(&self, genome: &Genome) -> f64 {
        let sum: usize = genome.layers().iter().sum();
        -(sum as f64 - self.target as f64).abs()
    }
}

impl Evaluator<PrototypeModel> for LayerSumEvaluator {
    fn assess(&self, _model: &mut PrototypeModel, genome: &Genome, _max_batches: Option<usize>) -> Result<Assessment> {
        Ok(Assessment {
            fitness: self.score(genome),
            accuracy: 0.0,
            loss: 0.0,
            parameter_count: genome.dense_parameter_count(),
            signature: None,
        })
    }

    fn train(&self, _model: &mut PrototypeModel, _genome: &Genome, _epochs: usize, _max_batches: Option<usize>) -> Result<f64> {
        Ok(0.0)
    }
}

/// Same fitness for everyone
pub struct ConstantEvaluator(pub f64);

impl Evaluator<PrototypeModel> for ConstantEvaluator {
    fn assess(&self, _model: &mut PrototypeModel, genome: &Genome, _max_batches: Option<usize>) -> Result<Assessment> {
        Ok(Assessment {
            fitness: self.0,
            accuracy: self.0,
            loss: 0.0,
            parameter_count: genome.dense_parameter_count(),
            signature: None,
        })
    }

    fn train(&self, _model: &mut PrototypeModel, _genome: &Genome, _epochs: usize, _max_batches: Option<usize>) -> Result<f64> {
        Ok(0.0)
    }
}

/// Fails every genome whose first hidden layer has an odd width
pub struct OddWidthFailingEvaluator {
    pub inner: LayerSumEvaluator,
}

impl OddWidthFailingEvaluator {
    pub fn fails(genome: &Genome) -> bool {
        genome.layers()[1] % 2 == 1
    }
}

impl Evaluator<PrototypeModel> for OddWidthFailingEvaluator {
    fn assess(&self, model: &mut PrototypeModel, genome: &Genome, max_batches: Option<usize>) -> Result<Assessment> {
        if Self::fails(genome) {
            return Err(EvolveError::EvaluationFailure("odd hidden width".to_string()));
        }
        self.inner.assess(model, genome, max_batches)
    }

    fn train(&self, model: &mut PrototypeModel, genome: &Genome, epochs: usize, max_batches: Option<usize>) -> Result<f64> {
        self.inner.train(model, genome, epochs, max_batches)
    }
}

pub struct AlwaysFailingEvaluator;

impl Evaluator<PrototypeModel> for AlwaysFailingEvaluator {
    fn assess(&self, _model: &mut PrototypeModel, _genome: &Genome, _max_batches: Option<usize>) -> Result<Assessment> {
        Err(EvolveError::EvaluationFailure("always fails".to_string()))
    }

    fn train(&self, _model: &mut PrototypeModel, _genome: &Genome, _epochs: usize, _max_batches: Option<usize>) -> Result<f64> {
        Err(EvolveError::EvaluationFailure("always fails".to_string()))
    }
}

/// Data source that never yields a batch
pub struct EmptySource;

impl TrainingDataSource for EmptySource {
    fn batches(&self) -> Result<BatchIter<'_>> {
        Ok(Box::new(std::iter::empty()))
    }

    fn feature_count(&self) -> usize {
        4
    }

    fn class_count(&self) -> usize {
        2
    }
}

/// Small seeded config for fast runs
pub fn create_test_config(population_size: usize, generations: usize, seed: u64) -> EngineConfig {
    EngineConfig {
        evolution: EvolutionConfig {
            population_size,
            generations,
            elitism_rate: 0.2,
            seed: Some(seed),
            ..Default::default()
        },
        evaluation: EvaluationConfig {
            max_workers: Some(2),
            ..Default::default()
        },
        novelty: NoveltyConfig {
            enabled: false,
            ..Default::default()
        },
        pbt: PbtConfig {
            enabled: false,
            ..Default::default()
        },
        ..Default::default()
    }
}

/// One call seen by `RecordingEvaluator`
#[derive(Debug, Clone, PartialEq)]
pub enum EvaluatorCall {
    Train { epochs: usize, max_batches: Option<usize> },
    Assess { max_batches: Option<usize> },
}

/// Constant fitness; logs every train and assess call in order into a log
/// the test keeps a handle to
pub struct RecordingEvaluator {
    pub calls: Arc<Mutex<Vec<EvaluatorCall>>>,
}

impl RecordingEvaluator {
    pub fn with_log() -> (Self, Arc<Mutex<Vec<EvaluatorCall>>>) {
        let calls = Arc::new(Mutex::new(Vec::new()));
        (Self { calls: Arc::clone(&calls) }, calls)
    }
}

impl Evaluator<PrototypeModel> for RecordingEvaluator {
    fn assess(&self, model: &mut PrototypeModel, genome: &Genome, max_batches: Option<usize>) -> Result<Assessment> {
        self.calls.lock().unwrap().push(EvaluatorCall::Assess { max_batches });
        ConstantEvaluator(0.5).assess(model, genome, max_batches)
    }

    fn train(&self, _model: &mut PrototypeModel, _genome: &Genome, epochs: usize, max_batches: Option<usize>) -> Result<f64> {
        self.calls.lock().unwrap().push(EvaluatorCall::Train { epochs, max_batches });
        Ok(0.25)
    }
}
