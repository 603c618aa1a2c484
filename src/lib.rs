pub mod config;
pub mod data;
pub mod engines;
pub mod error;
pub mod phenotype;
pub mod types;

pub use engines::generation::{run_evolution, EngineConfig, EvolutionEngine, EvolutionOutcome, Genome};
pub use error::{EvolveError, Result};
