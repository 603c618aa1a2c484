pub mod genome;
pub mod candidate;
pub mod operators;
pub mod novelty;
pub mod pbt;
pub mod population;
pub mod hall_of_fame;
pub mod evolution_engine;
pub mod progress;

pub use genome::Genome;
pub use candidate::{Candidate, CandidateMetrics, Parent};
pub use novelty::NoveltyArchive;
pub use pbt::PopulationBasedTrainer;
pub use population::PopulationManager;
pub use hall_of_fame::{HallOfFame, EliteGenome};
pub use evolution_engine::{
    run_evolution, EngineConfig, EngineState, EvolutionEngine, EvolutionOutcome, GenerationStats,
    ProgressCallback,
};
pub use progress::{ChannelProgressCallback, LogProgressCallback, ProgressMessage, SilentProgressCallback};
