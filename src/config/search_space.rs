use super::traits::ConfigSection;
use crate::engines::generation::genome::{MAX_DROPOUT, MAX_LEARNING_RATE, MIN_LEARNING_RATE};
use crate::error::EvolveError;
use serde::{Deserialize, Serialize};

/// Ranges used to seed the initial population
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSpaceConfig {
    pub min_hidden_layers: usize,
    pub max_hidden_layers: usize,
    pub min_hidden_size: usize,
    pub max_hidden_size: usize,
    pub min_learning_rate: f64,
    pub max_learning_rate: f64,
    pub min_dropout: f64,
    pub max_dropout: f64,
}

impl Default for SearchSpaceConfig {
    fn default() -> Self {
        Self {
            min_hidden_layers: 1,
            max_hidden_layers: 4,
            min_hidden_size: 16,
            max_hidden_size: 128,
            min_learning_rate: 1e-4,
            max_learning_rate: 1e-2,
            min_dropout: 0.0,
            max_dropout: 0.5,
        }
    }
}

impl ConfigSection for SearchSpaceConfig {
    fn section_name() -> &'static str {
        "search_space"
    }

    fn validate(&self) -> Result<(), EvolveError> {
        if self.min_hidden_layers > self.max_hidden_layers {
            return Err(EvolveError::Configuration(
                "min_hidden_layers exceeds max_hidden_layers".to_string()
            ));
        }
        if self.min_hidden_size == 0 || self.min_hidden_size > self.max_hidden_size {
            return Err(EvolveError::Configuration(
                "Hidden size range must be non-empty and positive".to_string()
            ));
        }
        if self.min_learning_rate < MIN_LEARNING_RATE
            || self.max_learning_rate > MAX_LEARNING_RATE
            || self.min_learning_rate > self.max_learning_rate
        {
            return Err(EvolveError::Configuration(format!(
                "Learning rate range must lie within [{}, {}]",
                MIN_LEARNING_RATE, MAX_LEARNING_RATE
            )));
        }
        if self.min_dropout < 0.0 || self.max_dropout > MAX_DROPOUT || self.min_dropout > self.max_dropout {
            return Err(EvolveError::Configuration(format!(
                "Dropout range must lie within [0, {}]",
                MAX_DROPOUT
            )));
        }
        Ok(())
    }
}
