use crate::error::{EvolveError, Result};
use crate::types::Batch;
use serde::{Deserialize, Serialize};

/// One pass over a data source
pub type BatchIter<'a> = Box<dyn Iterator<Item = Result<Batch>> + 'a>;

/// Finite, restartable sequence of labelled batches.
///
/// Every call to `batches` starts a fresh pass, so the same source can be read
/// by several evaluation workers at once without shared cursor state.
pub trait TrainingDataSource: Send + Sync {
    fn batches(&self) -> Result<BatchIter<'_>>;

    fn feature_count(&self) -> usize;

    fn class_count(&self) -> usize;
}

/// Metadata about a loaded dataset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetMetadata {
    pub samples: usize,
    pub features: usize,
    pub classes: usize,
    pub batches: usize,
}

/// Fail with `DatasetUnavailable` unless the source yields at least one
/// non-empty batch
pub fn ensure_available<D: TrainingDataSource + ?Sized>(source: &D) -> Result<()> {
    let mut batches = source
        .batches()
        .map_err(|e| EvolveError::DatasetUnavailable(e.to_string()))?;
    match batches.next() {
        Some(Ok(batch)) if !batch.is_empty() => Ok(()),
        Some(Ok(_)) => Err(EvolveError::DatasetUnavailable(
            "first batch is empty".to_string(),
        )),
        Some(Err(e)) => Err(EvolveError::DatasetUnavailable(e.to_string())),
        None => Err(EvolveError::DatasetUnavailable(
            "data source yielded no batches".to_string(),
        )),
    }
}

/// Dataset held fully in memory and served in fixed-size batches
#[derive(Debug, Clone)]
pub struct InMemoryDataSource {
    inputs: Vec<Vec<f64>>,
    labels: Vec<usize>,
    batch_size: usize,
    features: usize,
    classes: usize,
}

impl InMemoryDataSource {
    pub fn new(inputs: Vec<Vec<f64>>, labels: Vec<usize>, batch_size: usize) -> Result<Self> {
        if inputs.len() != labels.len() {
            return Err(EvolveError::Configuration(format!(
                "{} inputs but {} labels",
                inputs.len(),
                labels.len()
            )));
        }
        if batch_size == 0 {
            return Err(EvolveError::Configuration(
                "batch size must be positive".to_string(),
            ));
        }
        let features = inputs.first().map(Vec::len).unwrap_or(0);
        if inputs.iter().any(|row| row.len() != features) {
            return Err(EvolveError::Configuration(
                "all inputs must have the same number of features".to_string(),
            ));
        }
        let classes = labels.iter().max().map(|&max| max + 1).unwrap_or(0);

        Ok(Self {
            inputs,
            labels,
            batch_size,
            features,
            classes,
        })
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn metadata(&self) -> DatasetMetadata {
        DatasetMetadata {
            samples: self.len(),
            features: self.features,
            classes: self.classes,
            batches: self.len().div_ceil(self.batch_size),
        }
    }
}

impl TrainingDataSource for InMemoryDataSource {
    fn batches(&self) -> Result<BatchIter<'_>> {
        let iter = self
            .inputs
            .chunks(self.batch_size)
            .zip(self.labels.chunks(self.batch_size))
            .map(|(inputs, labels)| Ok(Batch::new(inputs.to_vec(), labels.to_vec())));
        Ok(Box::new(iter))
    }

    fn feature_count(&self) -> usize {
        self.features
    }

    fn class_count(&self) -> usize {
        self.classes
    }
}
