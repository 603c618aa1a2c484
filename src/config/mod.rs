pub mod traits;
pub mod evolution;
pub mod search_space;
pub mod evaluation;
pub mod novelty;
pub mod pbt;
pub mod data;
pub mod manager;

pub use manager::{ConfigManager, AppConfig};
pub use traits::ConfigSection;
pub use evolution::EvolutionConfig;
pub use search_space::SearchSpaceConfig;
pub use evaluation::EvaluationConfig;
pub use novelty::NoveltyConfig;
pub use pbt::PbtConfig;
pub use data::DataConfig;
