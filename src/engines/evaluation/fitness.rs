use crate::data::{ensure_available, TrainingDataSource};
use crate::engines::generation::candidate::Candidate;
use crate::engines::generation::genome::Genome;
use crate::engines::generation::novelty::NoveltyArchive;
use crate::error::{EvolveError, Result};
use crate::phenotype::{argmax, TrainableModel};
use log::{debug, error, warn};

/// Fitness lost per million parameters
pub const SIZE_PENALTY_PER_MILLION: f64 = 0.01;
/// Weight of the novelty score added to fitness
pub const NOVELTY_WEIGHT: f64 = 0.1;

/// Raw result of scoring one phenotype
#[derive(Debug, Clone, PartialEq)]
pub struct Assessment {
    pub fitness: f64,
    pub accuracy: f64,
    pub loss: f64,
    pub parameter_count: u64,
    /// Behaviour descriptor used by novelty search
    pub signature: Option<Vec<f64>>,
}

/// Scores and trains phenotypes.
///
/// `FitnessEvaluator` is the dataset-backed implementation. Implementations
/// are shared across evaluation threads and must not keep per-call state.
pub trait Evaluator<M: TrainableModel>: Send + Sync {
    fn assess(&self, model: &mut M, genome: &Genome, max_batches: Option<usize>) -> Result<Assessment>;

    /// Returns the mean training loss
    fn train(&self, model: &mut M, genome: &Genome, epochs: usize, max_batches: Option<usize>) -> Result<f64>;

    /// Checked once before a run starts
    fn ensure_ready(&self) -> Result<()> {
        Ok(())
    }
}

/// `accuracy - 0.01 * (parameter_count / 1e6)`
pub fn size_regularized_fitness(accuracy: f64, parameter_count: u64) -> f64 {
    accuracy - SIZE_PENALTY_PER_MILLION * (parameter_count as f64 / 1_000_000.0)
}

/// Evaluates phenotypes on a `TrainingDataSource`
pub struct FitnessEvaluator<D> {
    data: D,
}

impl<D: TrainingDataSource> FitnessEvaluator<D> {
    pub fn new(data: D) -> Self {
        Self { data }
    }

    pub fn data(&self) -> &D {
        &self.data
    }

    /// Eval-mode pass over the data: accuracy, mean loss, and the mean
    /// softmax output as behaviour signature
    pub fn compute_fitness<M: TrainableModel>(&self, model: &mut M, max_batches: Option<usize>) -> Result<Assessment> {
        model.set_training(false);

        let mut correct = 0usize;
        let mut total = 0usize;
        let mut loss_sum = 0.0;
        let mut batches = 0usize;
        let mut signature: Vec<f64> = Vec::new();

        for batch in self.data.batches()?.take(max_batches.unwrap_or(usize::MAX)) {
            let batch = batch?;
            if batch.is_empty() {
                continue;
            }
            let predictions = model.forward(&batch.inputs)?;
            loss_sum += model.loss(&predictions, &batch.labels)?;
            batches += 1;

            for (scores, &label) in predictions.iter().zip(&batch.labels) {
                if argmax(scores) == Some(label) {
                    correct += 1;
                }
                accumulate_softmax(&mut signature, scores);
            }
            total += batch.len();
        }

        if total == 0 {
            return Err(EvolveError::EvaluationFailure(
                "no samples were evaluated".to_string(),
            ));
        }

        let accuracy = correct as f64 / total as f64;
        let loss = loss_sum / batches as f64;
        let parameter_count = model.parameter_count();
        for value in signature.iter_mut() {
            *value /= total as f64;
        }

        Ok(Assessment {
            fitness: size_regularized_fitness(accuracy, parameter_count),
            accuracy,
            loss,
            parameter_count,
            signature: Some(signature),
        })
    }
}

impl<D: TrainingDataSource, M: TrainableModel> Evaluator<M> for FitnessEvaluator<D> {
    fn assess(&self, model: &mut M, _genome: &Genome, max_batches: Option<usize>) -> Result<Assessment> {
        self.compute_fitness(model, max_batches)
    }

    fn train(&self, model: &mut M, _genome: &Genome, epochs: usize, max_batches: Option<usize>) -> Result<f64> {
        model.set_training(true);
        let mut loss_sum = 0.0;
        let mut steps = 0usize;

        for _ in 0..epochs {
            for batch in self.data.batches()?.take(max_batches.unwrap_or(usize::MAX)) {
                let batch = batch?;
                if batch.is_empty() {
                    continue;
                }
                loss_sum += model.train_step(&batch)?;
                steps += 1;
            }
        }
        model.set_training(false);

        if steps == 0 {
            return Ok(0.0);
        }
        let mean = loss_sum / steps as f64;
        if !mean.is_finite() {
            return Err(EvolveError::EvaluationFailure(format!("training loss is {}", mean)));
        }
        Ok(mean)
    }

    fn ensure_ready(&self) -> Result<()> {
        ensure_available(&self.data)
    }
}

fn accumulate_softmax(acc: &mut Vec<f64>, scores: &[f64]) {
    if acc.len() < scores.len() {
        acc.resize(scores.len(), 0.0);
    }
    let max = scores.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = scores.iter().map(|s| (s - max).exp()).collect();
    let sum: f64 = exps.iter().sum();
    if sum > 0.0 && sum.is_finite() {
        for (slot, e) in acc.iter_mut().zip(exps) {
            *slot += e / sum;
        }
    }
}

/// Per-generation evaluation settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EvaluationPlan {
    /// Batch cap for scoring; `None` scores on the whole data source
    pub max_batches: Option<usize>,
    /// Training to run before scoring
    pub training: Option<TrainingPlan>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrainingPlan {
    pub epochs: usize,
    pub max_batches: Option<usize>,
}

/// Train (if planned) and score one candidate, recording the result.
///
/// Never fails: any error becomes a `-inf` fitness and a warning. The archive
/// is only read here; new signatures are added by the caller once the whole
/// generation is done.
pub fn evaluate_candidate<M, E>(
    candidate: &mut Candidate<M>,
    evaluator: &E,
    archive: Option<&NoveltyArchive>,
    plan: &EvaluationPlan,
) -> f64
where
    M: TrainableModel,
    E: Evaluator<M> + ?Sized,
{
    let fitness = match try_evaluate(candidate, evaluator, plan) {
        Ok(assessment) => {
            let bonus = match (archive, &assessment.signature) {
                (Some(archive), Some(signature)) => NOVELTY_WEIGHT * archive.novelty(signature),
                _ => 0.0,
            };
            let fitness = assessment.fitness + bonus;
            if fitness.is_nan() {
                warn!("candidate {} produced a NaN fitness", candidate.id);
                candidate.signature = None;
                f64::NEG_INFINITY
            } else {
                debug!(
                    "candidate {} accuracy {:.4} loss {:.4} params {} fitness {:.4}",
                    candidate.id, assessment.accuracy, assessment.loss, assessment.parameter_count, fitness
                );
                candidate.metrics.last_accuracy = Some(assessment.accuracy);
                candidate.metrics.last_loss = Some(assessment.loss);
                candidate.signature = assessment.signature;
                fitness
            }
        }
        Err(e) => {
            if e.is_recoverable() {
                warn!("candidate {} evaluation failed: {}", candidate.id, e);
            } else {
                error!("candidate {} hit an unexpected error: {}", candidate.id, e);
            }
            candidate.signature = None;
            f64::NEG_INFINITY
        }
    };

    candidate.metrics.record(fitness);
    fitness
}

fn try_evaluate<M, E>(candidate: &mut Candidate<M>, evaluator: &E, plan: &EvaluationPlan) -> Result<Assessment>
where
    M: TrainableModel,
    E: Evaluator<M> + ?Sized,
{
    let model = match candidate.model.as_mut() {
        Some(model) => model,
        None => {
            return Err(EvolveError::PhenotypeBuildFailure(
                candidate
                    .build_error
                    .clone()
                    .unwrap_or_else(|| "phenotype missing".to_string()),
            ))
        }
    };

    if let Some(training) = plan.training {
        let loss = evaluator.train(model, &candidate.genome, training.epochs, training.max_batches)?;
        candidate.metrics.last_train_loss = Some(loss);
        candidate.warm_state = Some(model.serialize_state()?);
    }

    evaluator.assess(model, &candidate.genome, plan.max_batches)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::InMemoryDataSource;
    use crate::phenotype::PrototypeModel;
    use crate::types::{Activation, CandidateId};

    fn genome(hidden: usize) -> Genome {
        Genome::new(
            vec![2, hidden, 2],
            vec![Activation::Relu; 2],
            vec![0.5; 2],
            vec![0.0; 2],
            vec![false; 2],
        )
        .unwrap()
    }

    fn data() -> InMemoryDataSource {
        let mut inputs = Vec::new();
        let mut labels = Vec::new();
        for i in 0..40 {
            let sign = if i % 2 == 0 { 1.0 } else { -1.0 };
            inputs.push(vec![sign * 2.0, sign * 1.5]);
            labels.push(i % 2);
        }
        InMemoryDataSource::new(inputs, labels, 8).unwrap()
    }

    #[test]
    fn test_size_penalty_formula() {
        assert_eq!(size_regularized_fitness(0.9, 0), 0.9);
        assert!((size_regularized_fitness(0.9, 2_000_000) - 0.88).abs() < 1e-12);
    }

    #[test]
    fn test_training_improves_fitness() {
        let evaluator = FitnessEvaluator::new(data());
        let g = genome(8);
        let mut model = PrototypeModel::new(&g, 0);

        let before = evaluator.assess(&mut model, &g, None).unwrap();
        evaluator.train(&mut model, &g, 2, None).unwrap();
        let after = evaluator.assess(&mut model, &g, None).unwrap();

        assert!(after.accuracy > before.accuracy);
        assert_eq!(after.accuracy, 1.0);
        let signature = after.signature.unwrap();
        assert_eq!(signature.len(), 2);
        assert!((signature.iter().sum::<f64>() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_batch_cap_limits_samples() {
        let evaluator = FitnessEvaluator::new(data());
        let g = genome(8);
        let mut model = PrototypeModel::new(&g, 0);
        let capped = evaluator.assess(&mut model, &g, Some(1)).unwrap();
        assert!(capped.loss.is_finite());
        assert!(evaluator.assess(&mut model, &g, Some(0)).is_err());
    }

    #[test]
    fn test_missing_phenotype_scores_negative_infinity() {
        let evaluator = FitnessEvaluator::new(data());
        let mut candidate: Candidate<PrototypeModel> = Candidate::new(CandidateId(3), genome(8), None);
        candidate.build_error = Some("boom".to_string());

        let fitness = evaluate_candidate(&mut candidate, &evaluator, None, &EvaluationPlan::default());
        assert_eq!(fitness, f64::NEG_INFINITY);
        assert_eq!(candidate.metrics.fitness_history, vec![f64::NEG_INFINITY]);
        assert!(candidate.signature.is_none());
    }

    #[test]
    fn test_novelty_bonus_and_warm_state() {
        let evaluator = FitnessEvaluator::new(data());
        let g = genome(8);
        let mut candidate = Candidate::new(CandidateId(1), g.clone(), Some(PrototypeModel::new(&g, 0)));
        let plan = EvaluationPlan {
            max_batches: None,
            training: Some(TrainingPlan { epochs: 1, max_batches: None }),
        };

        let archive = NoveltyArchive::new(5);
        let fitness = evaluate_candidate(&mut candidate, &evaluator, Some(&archive), &plan);
        let base = size_regularized_fitness(candidate.metrics.last_accuracy.unwrap(), g.dense_parameter_count());
        assert!((fitness - (base + NOVELTY_WEIGHT)).abs() < 1e-12);
        assert!(candidate.warm_state.is_some());
        assert!(candidate.metrics.last_train_loss.is_some());
        assert_eq!(candidate.metrics.evaluations, 1);
    }
}
