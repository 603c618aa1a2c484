pub mod source;
pub mod synthetic;

pub use source::{ensure_available, BatchIter, DatasetMetadata, InMemoryDataSource, TrainingDataSource};
pub use synthetic::gaussian_blobs;
