pub mod fitness;

pub use fitness::{
    evaluate_candidate, size_regularized_fitness, Assessment, EvaluationPlan, Evaluator,
    FitnessEvaluator, TrainingPlan,
};
