//! Genome representation for architecture search
//!
//! A genome describes the shape of a feed-forward network and the training
//! hyperparameters of every layer transition:
//! - `layers`: widths from input to output (at least two entries)
//! - `activations`, `learning_rates`, `dropout_rates`, `batch_norm_flags`:
//!   one entry per transition, i.e. `layers.len() - 1` entries each
//!
//! # Immutability
//!
//! Genomes are plain values. Operators in `operators.rs` never touch a genome
//! in place, they return a new one built through `Genome::new`. Because the
//! fields are private and every constructor validates, a genome that breaks
//! the length invariant cannot exist, including one read back with serde.
//!
//! # Example
//!
//! ```
//! use alpha_evolve::engines::generation::Genome;
//! use alpha_evolve::types::Activation;
//!
//! let genome = Genome::new(
//!     vec![784, 128, 10],
//!     vec![Activation::Relu, Activation::Relu],
//!     vec![1e-3, 1e-3],
//!     vec![0.1, 0.0],
//!     vec![true, false],
//! ).unwrap();
//! assert_eq!(genome.depth(), 2);
//! ```
use crate::error::{EvolveError, Result};
use crate::types::Activation;
use serde::{Deserialize, Serialize};

pub const MIN_LEARNING_RATE: f64 = 1e-6;
pub const MAX_LEARNING_RATE: f64 = 1.0;
pub const MAX_DROPOUT: f64 = 0.9;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "GenomeSpec", into = "GenomeSpec")]
pub struct Genome {
    layers: Vec<usize>,
    activations: Vec<Activation>,
    learning_rates: Vec<f64>,
    dropout_rates: Vec<f64>,
    batch_norm_flags: Vec<bool>,
}

/// Unvalidated wire form of a genome
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenomeSpec {
    pub layers: Vec<usize>,
    pub activations: Vec<Activation>,
    pub learning_rates: Vec<f64>,
    pub dropout_rates: Vec<f64>,
    pub batch_norm_flags: Vec<bool>,
}

impl Genome {
    pub fn new(
        layers: Vec<usize>,
        activations: Vec<Activation>,
        learning_rates: Vec<f64>,
        dropout_rates: Vec<f64>,
        batch_norm_flags: Vec<bool>,
    ) -> Result<Self> {
        if layers.len() < 2 {
            return Err(EvolveError::InvalidGenome(format!(
                "need at least input and output layers, got {}",
                layers.len()
            )));
        }
        let transitions = layers.len() - 1;
        let lengths = [
            ("activations", activations.len()),
            ("learning_rates", learning_rates.len()),
            ("dropout_rates", dropout_rates.len()),
            ("batch_norm_flags", batch_norm_flags.len()),
        ];
        for (name, len) in lengths {
            if len != transitions {
                return Err(EvolveError::InvalidGenome(format!(
                    "{} has {} entries, expected {}",
                    name, len, transitions
                )));
            }
        }
        if let Some(pos) = layers.iter().position(|&width| width == 0) {
            return Err(EvolveError::InvalidGenome(format!(
                "layer {} has zero width",
                pos
            )));
        }
        if let Some(lr) = learning_rates.iter().find(|lr| !lr.is_finite() || **lr <= 0.0) {
            return Err(EvolveError::InvalidGenome(format!(
                "learning rate {} is not positive",
                lr
            )));
        }
        if let Some(p) = dropout_rates
            .iter()
            .find(|p| !(0.0..=MAX_DROPOUT).contains(*p))
        {
            return Err(EvolveError::InvalidGenome(format!(
                "dropout rate {} outside [0, {}]",
                p, MAX_DROPOUT
            )));
        }

        Ok(Self {
            layers,
            activations,
            learning_rates,
            dropout_rates,
            batch_norm_flags,
        })
    }

    /// Rebuild with a new learning-rate vector, clamped to the legal range
    pub fn with_learning_rates(&self, learning_rates: Vec<f64>) -> Result<Self> {
        let clamped = learning_rates
            .into_iter()
            .map(clamp_learning_rate)
            .collect();
        Genome::new(
            self.layers.clone(),
            self.activations.clone(),
            clamped,
            self.dropout_rates.clone(),
            self.batch_norm_flags.clone(),
        )
    }

    pub fn layers(&self) -> &[usize] {
        &self.layers
    }

    pub fn activations(&self) -> &[Activation] {
        &self.activations
    }

    pub fn learning_rates(&self) -> &[f64] {
        &self.learning_rates
    }

    pub fn dropout_rates(&self) -> &[f64] {
        &self.dropout_rates
    }

    pub fn batch_norm_flags(&self) -> &[bool] {
        &self.batch_norm_flags
    }

    pub fn input_size(&self) -> usize {
        self.layers[0]
    }

    pub fn output_size(&self) -> usize {
        self.layers[self.layers.len() - 1]
    }

    /// Number of layer transitions
    pub fn depth(&self) -> usize {
        self.layers.len() - 1
    }

    pub fn hidden_layers(&self) -> &[usize] {
        &self.layers[1..self.layers.len() - 1]
    }

    /// Weights plus biases of a dense network with this shape
    pub fn dense_parameter_count(&self) -> u64 {
        self.layers
            .windows(2)
            .map(|pair| (pair[0] * pair[1] + pair[1]) as u64)
            .sum()
    }

    pub fn mean_learning_rate(&self) -> f64 {
        self.learning_rates.iter().sum::<f64>() / self.learning_rates.len() as f64
    }

    /// Stable textual key, used for hall-of-fame deduplication
    pub fn canonical_string(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| format!("{:?}", self))
    }
}

impl TryFrom<GenomeSpec> for Genome {
    type Error = EvolveError;

    fn try_from(spec: GenomeSpec) -> Result<Self> {
        Genome::new(
            spec.layers,
            spec.activations,
            spec.learning_rates,
            spec.dropout_rates,
            spec.batch_norm_flags,
        )
    }
}

impl From<Genome> for GenomeSpec {
    fn from(genome: Genome) -> Self {
        GenomeSpec {
            layers: genome.layers,
            activations: genome.activations,
            learning_rates: genome.learning_rates,
            dropout_rates: genome.dropout_rates,
            batch_norm_flags: genome.batch_norm_flags,
        }
    }
}

pub fn clamp_learning_rate(lr: f64) -> f64 {
    if lr.is_nan() {
        return MIN_LEARNING_RATE;
    }
    lr.clamp(MIN_LEARNING_RATE, MAX_LEARNING_RATE)
}

pub fn clamp_dropout(p: f64) -> f64 {
    if p.is_nan() {
        return 0.0;
    }
    p.clamp(0.0, MAX_DROPOUT)
}
