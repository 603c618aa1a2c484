//! Capability boundary between the search engine and whatever executes a
//! network.
//!
//! The engine never looks inside a model. It builds one per genome through a
//! `PhenotypeBuilder`, trains it with `train_step`, scores it through
//! `forward`/`loss`, and moves weights between candidates with
//! `serialize_state`/`load_state`.

pub mod prototype;

use crate::engines::generation::Genome;
use crate::error::{EvolveError, Result};
use crate::types::{Batch, Device, ModelState};

pub use prototype::{PrototypeBuilder, PrototypeModel};

pub trait TrainableModel: Send {
    /// One row of class scores per input row
    fn forward(&mut self, inputs: &[Vec<f64>]) -> Result<Vec<Vec<f64>>>;

    fn loss(&self, predictions: &[Vec<f64>], labels: &[usize]) -> Result<f64> {
        softmax_cross_entropy(predictions, labels)
    }

    /// One optimisation step; returns the batch loss
    fn train_step(&mut self, batch: &Batch) -> Result<f64>;

    fn parameter_count(&self) -> u64;

    /// Toggle dropout/batch-norm behaviour. Models without either ignore it.
    fn set_training(&mut self, _training: bool) {}

    fn serialize_state(&self) -> Result<ModelState>;

    fn load_state(&mut self, state: &ModelState) -> Result<()>;
}

pub trait PhenotypeBuilder: Send + Sync {
    type Model: TrainableModel;

    fn build(&self, genome: &Genome, device: Device) -> Result<Self::Model>;
}

/// Mean negative log-likelihood of the softmax of each score row
pub fn softmax_cross_entropy(predictions: &[Vec<f64>], labels: &[usize]) -> Result<f64> {
    if predictions.len() != labels.len() {
        return Err(EvolveError::EvaluationFailure(format!(
            "{} predictions for {} labels",
            predictions.len(),
            labels.len()
        )));
    }
    if predictions.is_empty() {
        return Ok(0.0);
    }

    let mut total = 0.0;
    for (scores, &label) in predictions.iter().zip(labels) {
        let target = scores.get(label).ok_or_else(|| {
            EvolveError::EvaluationFailure(format!(
                "label {} out of range for {} outputs",
                label,
                scores.len()
            ))
        })?;
        let max = scores.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        let log_sum_exp = max + scores.iter().map(|s| (s - max).exp()).sum::<f64>().ln();
        total += log_sum_exp - target;
    }
    Ok(total / predictions.len() as f64)
}

/// Index of the highest score; `None` for an empty or NaN row
pub fn argmax(scores: &[f64]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, &s) in scores.iter().enumerate() {
        if s.is_nan() {
            return None;
        }
        match best {
            Some((_, b)) if b >= s => {}
            _ => best = Some((i, s)),
        }
    }
    best.map(|(i, _)| i)
}
