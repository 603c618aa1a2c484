use thiserror::Error;

#[derive(Error, Debug)]
pub enum EvolveError {
    #[error("Invalid genome: {0}")]
    InvalidGenome(String),

    #[error("Evaluation failed: {0}")]
    EvaluationFailure(String),

    #[error("Dataset unavailable: {0}")]
    DatasetUnavailable(String),

    #[error("Phenotype build failed: {0}")]
    PhenotypeBuildFailure(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serde error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("Config source error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Thread pool error: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

impl EvolveError {
    /// Candidate-level failures that are converted to a `-inf` fitness
    /// instead of aborting the generation.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            EvolveError::EvaluationFailure(_) | EvolveError::PhenotypeBuildFailure(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, EvolveError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_candidate_failures_are_recoverable() {
        assert!(EvolveError::EvaluationFailure("nan".to_string()).is_recoverable());
        assert!(EvolveError::PhenotypeBuildFailure("cuda".to_string()).is_recoverable());
        assert!(!EvolveError::DatasetUnavailable("empty".to_string()).is_recoverable());
        assert!(!EvolveError::Configuration("k = 0".to_string()).is_recoverable());
    }
}
