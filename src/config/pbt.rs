use super::traits::{ensure_unit_interval, ConfigSection};
use crate::error::EvolveError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PbtConfig {
    pub enabled: bool,
    /// Learning rates of a donated clone are scaled by `1 + U(-f, f)`
    pub explore_factor: f64,
    pub mutation_rate: f64,
    pub mutation_strength: f64,
}

impl Default for PbtConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            explore_factor: 0.2,
            mutation_rate: 0.1,
            mutation_strength: 0.05,
        }
    }
}

impl ConfigSection for PbtConfig {
    fn section_name() -> &'static str {
        "pbt"
    }

    fn validate(&self) -> Result<(), EvolveError> {
        if !(0.0..1.0).contains(&self.explore_factor) {
            return Err(EvolveError::Configuration(
                "pbt.explore_factor must be in [0, 1)".to_string()
            ));
        }
        ensure_unit_interval(Self::section_name(), "mutation_rate", self.mutation_rate)?;
        if !self.mutation_strength.is_finite() || self.mutation_strength < 0.0 {
            return Err(EvolveError::Configuration(
                "pbt.mutation_strength must be non-negative".to_string()
            ));
        }
        Ok(())
    }
}
