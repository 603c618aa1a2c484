use crate::engines::generation::genome::Genome;
use crate::types::{CandidateId, ModelState};
use serde::{Deserialize, Serialize};

/// Fitness bookkeeping carried by a candidate for its whole life
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateMetrics {
    pub fitness_history: Vec<f64>,
    pub evaluations: usize,
    pub last_fitness: f64,
    pub last_accuracy: Option<f64>,
    pub last_loss: Option<f64>,
    pub last_train_loss: Option<f64>,
}

impl Default for CandidateMetrics {
    fn default() -> Self {
        Self {
            fitness_history: Vec::new(),
            evaluations: 0,
            last_fitness: f64::NEG_INFINITY,
            last_accuracy: None,
            last_loss: None,
            last_train_loss: None,
        }
    }
}

impl CandidateMetrics {
    pub fn record(&mut self, fitness: f64) {
        self.fitness_history.push(fitness);
        self.evaluations += 1;
        self.last_fitness = fitness;
    }

    pub fn best_fitness(&self) -> Option<f64> {
        self.fitness_history
            .iter()
            .cloned()
            .filter(|f| !f.is_nan())
            .reduce(f64::max)
    }
}

/// One member of the population: a genome, its phenotype and its history.
///
/// `model` is `None` when the phenotype could not be built; evaluating such a
/// candidate fails and it scores `-inf`.
pub struct Candidate<M> {
    pub id: CandidateId,
    pub genome: Genome,
    pub model: Option<M>,
    pub metrics: CandidateMetrics,
    pub signature: Option<Vec<f64>>,
    pub warm_state: Option<ModelState>,
    pub build_error: Option<String>,
}

impl<M> Candidate<M> {
    pub fn new(id: CandidateId, genome: Genome, model: Option<M>) -> Self {
        Self {
            id,
            genome,
            model,
            metrics: CandidateMetrics::default(),
            signature: None,
            warm_state: None,
            build_error: None,
        }
    }

    pub fn fitness(&self) -> f64 {
        self.metrics.last_fitness
    }

    /// Model-free copy used for selection and PBT
    pub fn to_parent(&self, source: usize) -> Parent {
        Parent {
            source: Some(source),
            id: self.id,
            genome: self.genome.clone(),
            fitness: self.metrics.last_fitness,
            warm_state: self.warm_state.clone(),
            donor: None,
        }
    }
}

/// Selected parent. `source` points back into the population it was drawn
/// from; it is cleared once PBT replaces the parent with a donor clone.
#[derive(Debug, Clone)]
pub struct Parent {
    pub source: Option<usize>,
    pub id: CandidateId,
    pub genome: Genome,
    pub fitness: f64,
    pub warm_state: Option<ModelState>,
    /// Candidate whose genome and weights were copied in by PBT
    pub donor: Option<CandidateId>,
}

impl Parent {
    pub fn is_donated(&self) -> bool {
        self.donor.is_some()
    }
}
