use super::traits::{ensure_unit_interval, ConfigSection};
use crate::error::EvolveError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EvolutionConfig {
    pub population_size: usize,
    pub generations: usize,
    /// Generations without a new best before the run stops
    pub patience: usize,
    pub elitism_rate: f64,
    pub crossover_rate: f64,
    pub mutation_rate: f64,
    pub mutation_strength: f64,
    pub tournament_size: usize,
    /// Multiplicative decay applied to the mutation rate after `decay_after` generations
    pub mutation_decay: f64,
    pub min_mutation_rate: f64,
    pub decay_after: usize,
    pub hall_of_fame_size: usize,
    pub seed: Option<u64>,
}

impl Default for EvolutionConfig {
    fn default() -> Self {
        Self {
            population_size: 20,
            generations: 50,
            patience: 10,
            elitism_rate: 0.1,
            crossover_rate: 0.7,
            mutation_rate: 0.1,
            mutation_strength: 0.1,
            tournament_size: 3,
            mutation_decay: 0.98,
            min_mutation_rate: 0.01,
            decay_after: 10,
            hall_of_fame_size: 10,
            seed: None,
        }
    }
}

impl ConfigSection for EvolutionConfig {
    fn section_name() -> &'static str {
        "evolution"
    }

    fn validate(&self) -> Result<(), EvolveError> {
        if self.population_size == 0 {
            return Err(EvolveError::Configuration(
                "Population size must be at least 1".to_string()
            ));
        }
        if self.generations == 0 {
            return Err(EvolveError::Configuration(
                "Number of generations must be at least 1".to_string()
            ));
        }
        if self.patience == 0 {
            return Err(EvolveError::Configuration(
                "Patience must be at least 1".to_string()
            ));
        }
        if self.hall_of_fame_size == 0 {
            return Err(EvolveError::Configuration(
                "Hall of fame size must be at least 1".to_string()
            ));
        }
        if self.tournament_size == 0 {
            return Err(EvolveError::Configuration(
                "Tournament size must be at least 1".to_string()
            ));
        }
        if !self.mutation_strength.is_finite() || self.mutation_strength < 0.0 {
            return Err(EvolveError::Configuration(
                "Mutation strength must be a non-negative number".to_string()
            ));
        }
        ensure_unit_interval(Self::section_name(), "elitism_rate", self.elitism_rate)?;
        ensure_unit_interval(Self::section_name(), "crossover_rate", self.crossover_rate)?;
        ensure_unit_interval(Self::section_name(), "mutation_rate", self.mutation_rate)?;
        ensure_unit_interval(Self::section_name(), "mutation_decay", self.mutation_decay)?;
        ensure_unit_interval(Self::section_name(), "min_mutation_rate", self.min_mutation_rate)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(EvolutionConfig::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_contradictory_values() {
        let config = EvolutionConfig { population_size: 0, ..Default::default() };
        assert!(matches!(config.validate(), Err(EvolveError::Configuration(_))));

        let config = EvolutionConfig { crossover_rate: 1.5, ..Default::default() };
        assert!(config.validate().is_err());

        let config = EvolutionConfig { patience: 0, ..Default::default() };
        assert!(config.validate().is_err());
    }
}
