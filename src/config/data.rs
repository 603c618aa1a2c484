use super::traits::ConfigSection;
use crate::error::EvolveError;
use serde::{Deserialize, Serialize};

/// Synthetic dataset used by the command-line runner
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    pub classes: usize,
    pub features: usize,
    pub samples_per_class: usize,
    pub batch_size: usize,
    /// Std-dev of each blob around its centre
    pub spread: f64,
    pub seed: u64,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            classes: 3,
            features: 8,
            samples_per_class: 200,
            batch_size: 32,
            spread: 1.0,
            seed: 42,
        }
    }
}

impl ConfigSection for DataConfig {
    fn section_name() -> &'static str {
        "data"
    }

    fn validate(&self) -> Result<(), EvolveError> {
        if self.classes < 2 {
            return Err(EvolveError::Configuration(
                "data.classes must be at least 2".to_string()
            ));
        }
        if self.features == 0 || self.samples_per_class == 0 || self.batch_size == 0 {
            return Err(EvolveError::Configuration(
                "data.features, samples_per_class and batch_size must be positive".to_string()
            ));
        }
        if !self.spread.is_finite() || self.spread <= 0.0 {
            return Err(EvolveError::Configuration(
                "data.spread must be positive".to_string()
            ));
        }
        Ok(())
    }
}
