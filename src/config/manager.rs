use super::{
    data::DataConfig,
    evaluation::EvaluationConfig,
    evolution::EvolutionConfig,
    novelty::NoveltyConfig,
    pbt::PbtConfig,
    search_space::SearchSpaceConfig,
    traits::ConfigSection,
};
use crate::error::EvolveError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{Arc, RwLock};

/// Prefix for environment overrides, e.g. `ALPHA_EVOLVE_EVOLUTION__POPULATION_SIZE=40`
pub const ENV_PREFIX: &str = "ALPHA_EVOLVE";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub evolution: EvolutionConfig,
    pub search_space: SearchSpaceConfig,
    pub evaluation: EvaluationConfig,
    pub novelty: NoveltyConfig,
    pub pbt: PbtConfig,
    pub data: DataConfig,
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), EvolveError> {
        self.evolution.validate()?;
        self.search_space.validate()?;
        self.evaluation.validate()?;
        self.novelty.validate()?;
        self.pbt.validate()?;
        self.data.validate()?;
        Ok(())
    }
}

pub struct ConfigManager {
    config: Arc<RwLock<AppConfig>>,
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigManager {
    pub fn new() -> Self {
        Self {
            config: Arc::new(RwLock::new(AppConfig::default())),
        }
    }

    /// Load a TOML/JSON file, then apply environment overrides on top
    pub fn load_from_file<P: AsRef<Path>>(&self, path: P) -> Result<(), EvolveError> {
        let settings = config::Config::builder()
            .add_source(config::File::from(path.as_ref()))
            .add_source(Self::environment())
            .build()?;
        self.install(settings)
    }

    /// Defaults plus environment overrides only
    pub fn load_from_env(&self) -> Result<(), EvolveError> {
        let settings = config::Config::builder()
            .add_source(Self::environment())
            .build()?;
        self.install(settings)
    }

    fn environment() -> config::Environment {
        config::Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true)
    }

    fn install(&self, settings: config::Config) -> Result<(), EvolveError> {
        let config: AppConfig = settings.try_deserialize()?;
        config.validate()?;

        *self.config.write().unwrap_or_else(|e| e.into_inner()) = config;
        Ok(())
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), EvolveError> {
        let config = self.get();
        let toml_str = toml::to_string_pretty(&config)?;
        std::fs::write(path, toml_str)?;
        Ok(())
    }

    pub fn get(&self) -> AppConfig {
        self.config.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Apply `f` and keep the result only if it still validates
    pub fn update<F>(&self, f: F) -> Result<(), EvolveError>
    where
        F: FnOnce(&mut AppConfig),
    {
        let mut config = self.config.write().unwrap_or_else(|e| e.into_inner());
        let mut candidate = config.clone();
        f(&mut candidate);
        candidate.validate()?;
        *config = candidate;
        Ok(())
    }
}
