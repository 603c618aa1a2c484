use alpha_evolve::config::ConfigManager;
use alpha_evolve::data::{gaussian_blobs, TrainingDataSource};
use alpha_evolve::engines::evaluation::FitnessEvaluator;
use alpha_evolve::engines::generation::{run_evolution, EngineConfig};
use alpha_evolve::phenotype::PrototypeBuilder;
use anyhow::Context;
use log::info;

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let manager = ConfigManager::new();
    match std::env::args().nth(1) {
        Some(path) => manager
            .load_from_file(&path)
            .with_context(|| format!("failed to load configuration from {}", path))?,
        None => manager
            .load_from_env()
            .context("failed to load configuration from the environment")?,
    }
    let config = manager.get();

    let data = gaussian_blobs(&config.data).context("failed to generate the synthetic dataset")?;
    let (input_size, output_size) = (data.feature_count(), data.class_count());
    info!(
        "searching over {} samples, {} features, {} classes",
        data.len(),
        input_size,
        output_size
    );

    let builder = PrototypeBuilder::new(config.data.seed);
    let evaluator = FitnessEvaluator::new(data);
    let outcome = run_evolution(builder, evaluator, EngineConfig::from(&config), input_size, output_size)
        .context("evolution run failed")?;

    info!(
        "best fitness {:.4} found in generation {} after {} generations",
        outcome.best_fitness,
        outcome.found_in_generation + 1,
        outcome.generations_run
    );
    println!("{}", serde_json::to_string_pretty(&outcome)?);
    Ok(())
}
