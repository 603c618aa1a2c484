use super::source::InMemoryDataSource;
use crate::config::DataConfig;
use crate::error::{EvolveError, Result};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};

/// Isotropic Gaussian blobs, one per class, shuffled into a single dataset
pub fn gaussian_blobs(config: &DataConfig) -> Result<InMemoryDataSource> {
    let mut rng = StdRng::seed_from_u64(config.seed);
    let noise = Normal::new(0.0, config.spread)
        .map_err(|e| EvolveError::Configuration(format!("invalid blob spread: {}", e)))?;

    let centres: Vec<Vec<f64>> = (0..config.classes)
        .map(|_| (0..config.features).map(|_| rng.gen_range(-5.0..5.0)).collect())
        .collect();

    let mut samples: Vec<(Vec<f64>, usize)> = Vec::with_capacity(config.classes * config.samples_per_class);
    for (label, centre) in centres.iter().enumerate() {
        for _ in 0..config.samples_per_class {
            let point = centre.iter().map(|c| c + noise.sample(&mut rng)).collect();
            samples.push((point, label));
        }
    }
    samples.shuffle(&mut rng);

    let (inputs, labels) = samples.into_iter().unzip();
    InMemoryDataSource::new(inputs, labels, config.batch_size)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::TrainingDataSource;

    #[test]
    fn test_blob_shape() {
        let config = DataConfig {
            classes: 4,
            features: 5,
            samples_per_class: 25,
            batch_size: 10,
            ..Default::default()
        };
        let data = gaussian_blobs(&config).unwrap();
        assert_eq!(data.len(), 100);
        assert_eq!(data.feature_count(), 5);
        assert_eq!(data.class_count(), 4);
        assert_eq!(data.batches().unwrap().count(), 10);
    }

    #[test]
    fn test_seed_is_deterministic() {
        let config = DataConfig::default();
        let a: Vec<_> = gaussian_blobs(&config).unwrap().batches().unwrap().map(|b| b.unwrap()).collect();
        let b: Vec<_> = gaussian_blobs(&config).unwrap().batches().unwrap().map(|b| b.unwrap()).collect();
        assert_eq!(a, b);
    }
}
