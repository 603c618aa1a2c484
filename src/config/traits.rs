use crate::error::EvolveError;
use serde::{Deserialize, Serialize};

/// Trait for configuration sections
pub trait ConfigSection: Serialize + for<'de> Deserialize<'de> + Default + Clone {
    fn section_name() -> &'static str;
    fn validate(&self) -> Result<(), EvolveError>;
}

/// Shared check for probabilities and rates
pub(crate) fn ensure_unit_interval(section: &str, name: &str, value: f64) -> Result<(), EvolveError> {
    if !(0.0..=1.0).contains(&value) {
        return Err(EvolveError::Configuration(format!(
            "{}.{} must be between 0 and 1, got {}",
            section, name, value
        )));
    }
    Ok(())
}
