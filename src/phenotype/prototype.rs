use super::{PhenotypeBuilder, TrainableModel};
use crate::engines::generation::Genome;
use crate::error::{EvolveError, Result};
use crate::types::{Batch, Device, ModelState};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Nearest-prototype classifier.
///
/// Keeps one prototype per class and scores an input by its negative squared
/// distance to each prototype. Training pulls the prototype of the true class
/// towards each sample at the genome's mean learning rate. Input dropout uses
/// the first transition's dropout rate. The reported parameter count is that
/// of the dense network the genome describes, so the size penalty still sees
/// the architecture.
pub struct PrototypeModel {
    prototypes: Vec<Vec<f64>>,
    learning_rate: f64,
    dropout: f64,
    parameter_count: u64,
    training: bool,
    rng: StdRng,
}

#[derive(Serialize, Deserialize)]
struct PrototypeState {
    prototypes: Vec<Vec<f64>>,
}

impl PrototypeModel {
    pub fn new(genome: &Genome, seed: u64) -> Self {
        Self {
            prototypes: vec![vec![0.0; genome.input_size()]; genome.output_size()],
            learning_rate: genome.mean_learning_rate(),
            dropout: genome.dropout_rates()[0],
            parameter_count: genome.dense_parameter_count(),
            training: true,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn prototypes(&self) -> &[Vec<f64>] {
        &self.prototypes
    }

    fn check_width(&self, row: &[f64]) -> Result<()> {
        let expected = self.prototypes.first().map(Vec::len).unwrap_or(0);
        if row.len() != expected {
            return Err(EvolveError::EvaluationFailure(format!(
                "input has {} features, model expects {}",
                row.len(),
                expected
            )));
        }
        Ok(())
    }
}

impl TrainableModel for PrototypeModel {
    fn forward(&mut self, inputs: &[Vec<f64>]) -> Result<Vec<Vec<f64>>> {
        inputs
            .iter()
            .map(|row| {
                self.check_width(row)?;
                Ok(self
                    .prototypes
                    .iter()
                    .map(|p| -p.iter().zip(row).map(|(a, b)| (a - b).powi(2)).sum::<f64>())
                    .collect())
            })
            .collect()
    }

    fn train_step(&mut self, batch: &Batch) -> Result<f64> {
        let predictions = self.forward(&batch.inputs)?;
        let loss = self.loss(&predictions, &batch.labels)?;

        for (row, &label) in batch.inputs.iter().zip(&batch.labels) {
            let dropout = if self.training { self.dropout } else { 0.0 };
            let keep = 1.0 / (1.0 - dropout);
            let lr = self.learning_rate;
            let mask: Vec<bool> = (0..row.len()).map(|_| self.rng.gen::<f64>() >= dropout).collect();
            let prototype = self.prototypes.get_mut(label).ok_or_else(|| {
                EvolveError::EvaluationFailure(format!("label {} has no prototype", label))
            })?;
            for ((p, x), kept) in prototype.iter_mut().zip(row).zip(mask) {
                if kept {
                    *p += lr * (x * keep - *p);
                }
            }
        }

        if !loss.is_finite() {
            return Err(EvolveError::EvaluationFailure(format!("loss diverged to {}", loss)));
        }
        Ok(loss)
    }

    fn parameter_count(&self) -> u64 {
        self.parameter_count
    }

    fn set_training(&mut self, training: bool) {
        self.training = training;
    }

    fn serialize_state(&self) -> Result<ModelState> {
        let state = PrototypeState {
            prototypes: self.prototypes.clone(),
        };
        Ok(ModelState(serde_json::to_vec(&state)?))
    }

    fn load_state(&mut self, state: &ModelState) -> Result<()> {
        let state: PrototypeState = serde_json::from_slice(state.as_bytes())?;
        let same_shape = state.prototypes.len() == self.prototypes.len()
            && state
                .prototypes
                .iter()
                .zip(&self.prototypes)
                .all(|(a, b)| a.len() == b.len());
        if !same_shape {
            return Err(EvolveError::PhenotypeBuildFailure(
                "saved prototypes do not match the model shape".to_string(),
            ));
        }
        self.prototypes = state.prototypes;
        Ok(())
    }
}

/// Builds `PrototypeModel`s; CPU only
#[derive(Debug, Clone, Default)]
pub struct PrototypeBuilder {
    pub seed: u64,
}

impl PrototypeBuilder {
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }
}

impl PhenotypeBuilder for PrototypeBuilder {
    type Model = PrototypeModel;

    fn build(&self, genome: &Genome, device: Device) -> Result<PrototypeModel> {
        if device != Device::Cpu {
            return Err(EvolveError::PhenotypeBuildFailure(format!(
                "prototype models cannot run on {}",
                device
            )));
        }
        Ok(PrototypeModel::new(genome, self.seed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Activation;

    fn genome(lr: f64) -> Genome {
        Genome::new(
            vec![2, 16, 2],
            vec![Activation::Relu; 2],
            vec![lr; 2],
            vec![0.0; 2],
            vec![false; 2],
        )
        .unwrap()
    }

    fn batch() -> Batch {
        Batch::new(
            vec![vec![1.0, 1.0], vec![-1.0, -1.0], vec![1.2, 0.8], vec![-0.9, -1.1]],
            vec![0, 1, 0, 1],
        )
    }

    #[test]
    fn test_training_separates_classes() {
        let mut model = PrototypeBuilder::new(0).build(&genome(0.5), Device::Cpu).unwrap();
        let first = model.train_step(&batch()).unwrap();
        for _ in 0..20 {
            model.train_step(&batch()).unwrap();
        }
        let last = model.train_step(&batch()).unwrap();
        assert!(last < first);

        let scores = model.forward(&[vec![2.0, 2.0]]).unwrap();
        assert!(scores[0][0] > scores[0][1]);
    }

    #[test]
    fn test_state_roundtrip_and_shape_check() {
        let mut trained = PrototypeModel::new(&genome(0.5), 0);
        trained.train_step(&batch()).unwrap();
        let state = trained.serialize_state().unwrap();

        let mut fresh = PrototypeModel::new(&genome(0.01), 0);
        fresh.load_state(&state).unwrap();
        assert_eq!(fresh.prototypes(), trained.prototypes());

        let wider = Genome::new(
            vec![3, 2],
            vec![Activation::Relu],
            vec![0.1],
            vec![0.0],
            vec![false],
        )
        .unwrap();
        let mut other = PrototypeModel::new(&wider, 0);
        assert!(other.load_state(&state).is_err());
    }

    #[test]
    fn test_cuda_is_rejected() {
        let result = PrototypeBuilder::default().build(&genome(0.1), Device::Cuda(0));
        assert!(matches!(result, Err(EvolveError::PhenotypeBuildFailure(_))));
    }

    #[test]
    fn test_wrong_width_is_an_evaluation_failure() {
        let mut model = PrototypeModel::new(&genome(0.1), 0);
        assert!(matches!(
            model.forward(&[vec![1.0]]),
            Err(EvolveError::EvaluationFailure(_))
        ));
    }
}
