use super::traits::ConfigSection;
use crate::error::EvolveError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NoveltyConfig {
    pub enabled: bool,
    /// Number of nearest archived behaviours averaged into the novelty score
    pub k_nearest: usize,
}

impl Default for NoveltyConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            k_nearest: 15,
        }
    }
}

impl ConfigSection for NoveltyConfig {
    fn section_name() -> &'static str {
        "novelty"
    }

    fn validate(&self) -> Result<(), EvolveError> {
        if self.k_nearest == 0 {
            return Err(EvolveError::Configuration(
                "novelty.k_nearest must be at least 1".to_string()
            ));
        }
        Ok(())
    }
}
