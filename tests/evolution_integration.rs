mod common;

use alpha_evolve::config::DataConfig;
use alpha_evolve::data::{gaussian_blobs, TrainingDataSource};
use alpha_evolve::engines::evaluation::FitnessEvaluator;
use alpha_evolve::engines::generation::{
    run_evolution, ChannelProgressCallback, EngineState, EvolutionEngine, ProgressMessage,
    SilentProgressCallback,
};
use alpha_evolve::error::EvolveError;
use alpha_evolve::phenotype::PrototypeBuilder;
use common::*;
use std::sync::mpsc;

#[test]
fn test_best_ever_improves_on_layer_sum_target() {
    let config = create_test_config(6, 3, 7);
    let evaluator = LayerSumEvaluator { target: 100 };

    let outcome = run_evolution(PrototypeBuilder::default(), evaluator, config, 4, 2).unwrap();

    assert_eq!(outcome.generations_run, 3);
    let best_ever = outcome.best_ever_history();
    assert!(best_ever[2] >= best_ever[0]);
    assert_eq!(outcome.best_fitness, best_ever[2]);
    assert_eq!(
        outcome.best_fitness,
        LayerSumEvaluator { target: 100 }.score(&outcome.best_genome)
    );
}

#[test]
fn test_best_ever_is_monotonic() {
    let mut config = create_test_config(10, 15, 21);
    config.evolution.patience = 15;
    config.pbt.enabled = true;

    let outcome = run_evolution(
        PrototypeBuilder::default(),
        LayerSumEvaluator { target: 150 },
        config,
        6,
        3,
    )
    .unwrap();

    let history = outcome.best_ever_history();
    assert_eq!(history.len(), 15);
    for pair in history.windows(2) {
        assert!(pair[1] >= pair[0], "best ever dropped: {:?}", history);
    }
    for stats in &outcome.history {
        assert!(stats.best_fitness <= stats.best_ever);
    }
}

#[test]
fn test_failing_candidates_score_negative_infinity() {
    let config = create_test_config(8, 4, 3);
    let evaluator = OddWidthFailingEvaluator {
        inner: LayerSumEvaluator { target: 100 },
    };
    let mut engine = EvolutionEngine::new(config, PrototypeBuilder::default(), evaluator).unwrap();

    let outcome = engine.run(4, 2, SilentProgressCallback).unwrap();

    assert_eq!(outcome.generations_run, 4);
    assert_eq!(engine.population().candidates().len(), 8);
    for candidate in engine.population().candidates() {
        if OddWidthFailingEvaluator::fails(&candidate.genome) {
            assert_eq!(candidate.fitness(), f64::NEG_INFINITY);
        } else {
            assert!(candidate.fitness().is_finite());
        }
    }
    assert!(!OddWidthFailingEvaluator::fails(&outcome.best_genome));
}

#[test]
fn test_all_failures_is_an_error() {
    let config = create_test_config(4, 2, 5);
    let result = run_evolution(PrototypeBuilder::default(), AlwaysFailingEvaluator, config, 4, 2);
    assert!(matches!(result, Err(EvolveError::EvaluationFailure(_))));
}

#[test]
fn test_early_stopping_after_patience() {
    let mut config = create_test_config(6, 20, 9);
    config.evolution.patience = 2;
    let mut engine = EvolutionEngine::new(config, PrototypeBuilder::default(), ConstantEvaluator(0.5)).unwrap();

    let outcome = engine.run(4, 2, SilentProgressCallback).unwrap();

    // generation 0 sets the best, generations 1 and 2 are stale
    assert_eq!(outcome.generations_run, 3);
    assert!(outcome.stopped_early);
    assert_eq!(outcome.best_fitness, 0.5);
    assert_eq!(outcome.found_in_generation, 0);
    assert_eq!(engine.state(), EngineState::Terminated);
}

#[test]
fn test_quick_evaluation_covers_leading_fraction() {
    for (generations, expected) in [
        (3, vec![true, false, false]),
        (5, vec![true, true, false, false, false]),
        (10, vec![true, true, true, false, false, false, false, false, false, false]),
    ] {
        let config = create_test_config(4, generations, 13);
        let outcome = run_evolution(PrototypeBuilder::default(), ConstantEvaluator(0.5), config, 4, 2).unwrap();
        let quick: Vec<bool> = outcome.history.iter().map(|g| g.quick_evaluation).collect();
        assert_eq!(quick, expected, "generations = {}", generations);
    }
}

#[test]
fn test_training_precedes_scoring_after_first_generation() {
    let mut config = create_test_config(3, 3, 19);
    config.evaluation.parallel = false;
    let (evaluator, calls) = RecordingEvaluator::with_log();
    let mut engine = EvolutionEngine::new(config, PrototypeBuilder::default(), evaluator).unwrap();

    engine.run(4, 2, SilentProgressCallback).unwrap();

    let quick = EvaluatorCall::Assess { max_batches: Some(10) };
    let train = EvaluatorCall::Train { epochs: 1, max_batches: Some(100) };
    let full = EvaluatorCall::Assess { max_batches: None };
    let mut expected = vec![quick.clone(), quick.clone(), quick];
    for _ in 0..2 {
        for _ in 0..3 {
            expected.push(train.clone());
            expected.push(full.clone());
        }
    }
    assert_eq!(*calls.lock().unwrap(), expected);

    for candidate in engine.population().candidates() {
        assert_eq!(candidate.metrics.last_train_loss, Some(0.25));
        assert!(candidate.warm_state.is_some());
    }
}

#[test]
fn test_progress_messages() {
    let config = create_test_config(5, 2, 11);
    let (tx, rx) = mpsc::channel();
    let mut engine = EvolutionEngine::new(config, PrototypeBuilder::default(), LayerSumEvaluator { target: 60 }).unwrap();

    engine.run(3, 2, ChannelProgressCallback::new(tx)).unwrap();

    let messages: Vec<ProgressMessage> = rx.try_iter().collect();
    let starts = messages
        .iter()
        .filter(|m| matches!(m, ProgressMessage::GenerationStart(_)))
        .count();
    let evaluated = messages
        .iter()
        .filter(|m| matches!(m, ProgressMessage::CandidateEvaluated { .. }))
        .count();
    let completed: Vec<usize> = messages
        .iter()
        .filter_map(|m| match m {
            ProgressMessage::GenerationComplete(stats) => Some(stats.generation),
            _ => None,
        })
        .collect();

    assert_eq!(starts, 2);
    assert_eq!(evaluated, 10);
    assert_eq!(completed, vec![0, 1]);
}

#[test]
fn test_end_to_end_on_gaussian_blobs() {
    let data_config = DataConfig {
        classes: 3,
        features: 4,
        samples_per_class: 40,
        batch_size: 16,
        spread: 0.5,
        seed: 3,
    };
    let data = gaussian_blobs(&data_config).unwrap();
    let (input_size, output_size) = (data.feature_count(), data.class_count());

    let mut config = create_test_config(6, 4, 17);
    config.novelty.enabled = true;
    config.pbt.enabled = true;
    config.search_space.min_learning_rate = 0.1;
    config.search_space.max_learning_rate = 0.5;
    config.search_space.max_dropout = 0.0;

    let outcome = run_evolution(
        PrototypeBuilder::new(1),
        FitnessEvaluator::new(data),
        config,
        input_size,
        output_size,
    )
    .unwrap();

    assert_eq!(outcome.best_genome.input_size(), 4);
    assert_eq!(outcome.best_genome.output_size(), 3);
    assert!(outcome.best_fitness.is_finite());
    assert!(outcome.best_fitness > 0.5);
    let best_accuracy = outcome
        .hall_of_fame
        .iter()
        .filter_map(|e| e.accuracy)
        .fold(0.0, f64::max);
    assert!(best_accuracy > 0.8, "best accuracy {}", best_accuracy);
    assert!(outcome.history[0].quick_evaluation);
    assert!(!outcome.history[3].quick_evaluation);
    assert!(outcome.history.last().unwrap().archive_size > 0);
    assert!(!outcome.hall_of_fame.is_empty());

    let json = serde_json::to_string(&outcome).unwrap();
    assert!(json.contains("best_genome"));
}

#[test]
fn test_empty_dataset_is_unavailable() {
    let config = create_test_config(4, 2, 1);
    let result = run_evolution(
        PrototypeBuilder::default(),
        FitnessEvaluator::new(EmptySource),
        config,
        4,
        2,
    );
    assert!(matches!(result, Err(EvolveError::DatasetUnavailable(_))));
}

#[test]
fn test_zero_population_rejected() {
    let config = create_test_config(0, 2, 1);
    let result = EvolutionEngine::new(config, PrototypeBuilder::default(), ConstantEvaluator(1.0));
    assert!(matches!(result, Err(EvolveError::Configuration(_))));
}
