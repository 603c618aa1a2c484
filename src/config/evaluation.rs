use super::traits::{ensure_unit_interval, ConfigSection};
use crate::error::EvolveError;
use crate::types::Device;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluationConfig {
    pub device: Device,
    /// Share of planned generations that use the quick (batch-capped) evaluation
    pub quick_eval_fraction: f64,
    pub quick_eval_batches: usize,
    /// Train every candidate before it is scored, from generation 1 on
    pub train_between_generations: bool,
    pub train_epochs: usize,
    pub train_max_batches: Option<usize>,
    pub parallel: bool,
    /// Upper bound on evaluation threads; defaults to the available cores
    pub max_workers: Option<usize>,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            device: Device::Cpu,
            quick_eval_fraction: 0.3,
            quick_eval_batches: 10,
            train_between_generations: true,
            train_epochs: 1,
            train_max_batches: Some(100),
            parallel: true,
            max_workers: None,
        }
    }
}

impl ConfigSection for EvaluationConfig {
    fn section_name() -> &'static str {
        "evaluation"
    }

    fn validate(&self) -> Result<(), EvolveError> {
        ensure_unit_interval(Self::section_name(), "quick_eval_fraction", self.quick_eval_fraction)?;
        if self.quick_eval_batches == 0 {
            return Err(EvolveError::Configuration(
                "quick_eval_batches must be at least 1".to_string()
            ));
        }
        if self.train_epochs == 0 {
            return Err(EvolveError::Configuration(format!(
                "{}.train_epochs must be at least 1",
                Self::section_name()
            )));
        }
        if self.train_max_batches == Some(0) {
            return Err(EvolveError::Configuration(format!(
                "{}.train_max_batches must be at least 1 when set",
                Self::section_name()
            )));
        }
        if self.max_workers == Some(0) {
            return Err(EvolveError::Configuration(
                "max_workers must be at least 1".to_string()
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(EvaluationConfig::default().validate().is_ok());
    }

    #[test]
    fn test_training_without_steps_rejected() {
        let config = EvaluationConfig {
            train_epochs: 0,
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("evaluation.train_epochs"));

        let config = EvaluationConfig {
            train_max_batches: Some(0),
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(EvolveError::Configuration(_))));

        let uncapped = EvaluationConfig {
            train_max_batches: None,
            ..Default::default()
        };
        assert!(uncapped.validate().is_ok());
    }
}
