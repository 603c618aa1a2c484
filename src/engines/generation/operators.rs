use crate::config::SearchSpaceConfig;
use crate::engines::generation::genome::{clamp_dropout, clamp_learning_rate, Genome};
use crate::error::{EvolveError, Result};
use crate::types::Activation;
use rand::seq::SliceRandom;
use rand::Rng;
use rand_distr::{Distribution, Normal};
use std::cmp::Ordering;

/// Fixed dropout given to every transition of a crossover child
pub const CROSSOVER_DROPOUT: f64 = 0.1;
/// Fixed batch-norm flag given to every transition of a crossover child
pub const CROSSOVER_BATCH_NORM: bool = true;
/// Std-dev of the noise added to interpolated learning rates
pub const CROSSOVER_LR_NOISE: f64 = 0.01;

fn gaussian(std_dev: f64) -> Result<Normal<f64>> {
    Normal::new(0.0, std_dev)
        .map_err(|e| EvolveError::Configuration(format!("invalid mutation strength {}: {}", std_dev, e)))
}

/// Descending order on fitness; NaN compares equal
pub fn by_fitness_desc(a: f64, b: f64) -> Ordering {
    b.partial_cmp(&a).unwrap_or(Ordering::Equal)
}

/// Tournament selection: index of the best of K uniformly drawn entries
pub fn tournament_selection<R: Rng>(
    fitness: &[f64],
    tournament_size: usize,
    rng: &mut R,
) -> usize {
    let mut best_idx = rng.gen_range(0..fitness.len());
    let mut best_fitness = fitness[best_idx];

    for _ in 1..tournament_size {
        let idx = rng.gen_range(0..fitness.len());
        if fitness[idx] > best_fitness {
            best_idx = idx;
            best_fitness = fitness[idx];
        }
    }

    best_idx
}

/// Indices sorted from best to worst fitness. Ties keep population order.
pub fn rank_by_fitness(fitness: &[f64]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..fitness.len()).collect();
    order.sort_by(|&a, &b| by_fitness_desc(fitness[a], fitness[b]));
    order
}

/// Number of candidates carried over unchanged. Halves round to even.
pub fn elite_count(population_size: usize, elitism_rate: f64) -> usize {
    let elites = (elitism_rate * population_size as f64).round_ties_even() as usize;
    elites.max(1).min(population_size)
}

/// Point mutation of hyperparameters plus rare structural changes.
///
/// - learning rates: with probability `rate`, scaled by `1 + N(0, strength)`
/// - dropout: with probability `rate`, shifted by `N(0, strength)`
/// - activation: with probability `rate * 0.1`, resampled
/// - with probability `rate * 0.05`, one interior layer is removed together
///   with the matching per-transition entries
pub fn mutate<R: Rng>(genome: &Genome, rate: f64, strength: f64, rng: &mut R) -> Result<Genome> {
    let noise = gaussian(strength)?;

    let mut layers = genome.layers().to_vec();
    let mut activations = genome.activations().to_vec();
    let mut learning_rates = genome.learning_rates().to_vec();
    let mut dropout_rates = genome.dropout_rates().to_vec();
    let mut batch_norm_flags = genome.batch_norm_flags().to_vec();

    for lr in learning_rates.iter_mut() {
        if rng.gen::<f64>() < rate {
            *lr = clamp_learning_rate(*lr * (1.0 + noise.sample(rng)));
        }
    }

    for p in dropout_rates.iter_mut() {
        if rng.gen::<f64>() < rate {
            *p = clamp_dropout(*p + noise.sample(rng));
        }
    }

    for activation in activations.iter_mut() {
        if rng.gen::<f64>() < rate * 0.1 {
            if let Some(choice) = Activation::ALL.choose(rng) {
                *activation = *choice;
            }
        }
    }

    if layers.len() > 2 && rng.gen::<f64>() < rate * 0.05 {
        // Layer i feeds transition i; dropping it merges transitions i-1 and i.
        let idx = rng.gen_range(1..layers.len() - 1);
        layers.remove(idx);
        activations.remove(idx);
        learning_rates.remove(idx);
        dropout_rates.remove(idx);
        batch_norm_flags.remove(idx);
    }

    Genome::new(layers, activations, learning_rates, dropout_rates, batch_norm_flags)
}

/// Uniform position-wise crossover producing a single child.
///
/// Dropout and batch-norm are reset to fixed defaults instead of being
/// inherited.
pub fn crossover<R: Rng>(parent1: &Genome, parent2: &Genome, rng: &mut R) -> Result<Genome> {
    let (longer, shorter) = if parent1.layers().len() >= parent2.layers().len() {
        (parent1, parent2)
    } else {
        (parent2, parent1)
    };

    let layers: Vec<usize> = (0..longer.layers().len())
        .map(|i| match shorter.layers().get(i) {
            Some(&width) if rng.gen_bool(0.5) => width,
            _ => longer.layers()[i],
        })
        .collect();
    let transitions = layers.len() - 1;
    let common = shorter.depth();

    let mut activations: Vec<Activation> = (0..common)
        .map(|i| {
            if rng.gen_bool(0.5) {
                parent1.activations()[i]
            } else {
                parent2.activations()[i]
            }
        })
        .collect();
    activations.resize(transitions, Activation::default());

    let noise = gaussian(CROSSOVER_LR_NOISE)?;
    let learning_rates: Vec<f64> = (0..transitions)
        .map(|i| {
            if i < common {
                let mean = 0.5 * (parent1.learning_rates()[i] + parent2.learning_rates()[i]);
                clamp_learning_rate(mean + noise.sample(rng))
            } else {
                longer.learning_rates()[i]
            }
        })
        .collect();

    Genome::new(
        layers,
        activations,
        learning_rates,
        vec![CROSSOVER_DROPOUT; transitions],
        vec![CROSSOVER_BATCH_NORM; transitions],
    )
}

/// Random genome inside the configured search space
pub fn random_genome<R: Rng>(
    input_size: usize,
    output_size: usize,
    space: &SearchSpaceConfig,
    rng: &mut R,
) -> Result<Genome> {
    let hidden_count = rng.gen_range(space.min_hidden_layers..=space.max_hidden_layers);

    let mut layers = Vec::with_capacity(hidden_count + 2);
    layers.push(input_size);
    for _ in 0..hidden_count {
        layers.push(rng.gen_range(space.min_hidden_size..=space.max_hidden_size));
    }
    layers.push(output_size);

    let transitions = layers.len() - 1;
    let mut activations = Vec::with_capacity(transitions);
    let mut learning_rates = Vec::with_capacity(transitions);
    let mut dropout_rates = Vec::with_capacity(transitions);
    let mut batch_norm_flags = Vec::with_capacity(transitions);
    for _ in 0..transitions {
        activations.push(*Activation::ALL.choose(rng).unwrap_or(&Activation::Relu));
        learning_rates.push(rng.gen_range(space.min_learning_rate..=space.max_learning_rate));
        dropout_rates.push(rng.gen_range(space.min_dropout..=space.max_dropout));
        batch_norm_flags.push(rng.gen_bool(0.5));
    }

    Genome::new(layers, activations, learning_rates, dropout_rates, batch_norm_flags)
}
