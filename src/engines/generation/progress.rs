use super::evolution_engine::{GenerationStats, ProgressCallback};
use log::{debug, info};
use std::sync::mpsc::Sender;

/// Reports progress through the `log` facade
pub struct LogProgressCallback;

impl ProgressCallback for LogProgressCallback {
    fn on_generation_start(&mut self, generation: usize) {
        debug!("Generation {} starting...", generation + 1);
    }

    fn on_generation_complete(&mut self, stats: &GenerationStats) {
        info!(
            "Generation {} complete. Best fitness: {:.4}, best ever: {:.4}, archive size: {}",
            stats.generation + 1, stats.best_fitness, stats.best_ever, stats.archive_size
        );
    }

    fn on_candidate_evaluated(&mut self, candidate_num: usize, total: usize) {
        if candidate_num % 10 == 0 || candidate_num == total {
            debug!("  Evaluated {}/{} candidates", candidate_num, total);
        }
    }
}

/// Ignores every notification
pub struct SilentProgressCallback;

impl ProgressCallback for SilentProgressCallback {
    fn on_generation_start(&mut self, _generation: usize) {}

    fn on_generation_complete(&mut self, _stats: &GenerationStats) {}

    fn on_candidate_evaluated(&mut self, _candidate_num: usize, _total: usize) {}
}

/// For callers that watch a run from another thread
pub struct ChannelProgressCallback {
    sender: Sender<ProgressMessage>,
}

#[derive(Debug, Clone)]
pub enum ProgressMessage {
    GenerationStart(usize),
    GenerationComplete(GenerationStats),
    CandidateEvaluated { current: usize, total: usize },
}

impl ChannelProgressCallback {
    pub fn new(sender: Sender<ProgressMessage>) -> Self {
        Self { sender }
    }
}

impl ProgressCallback for ChannelProgressCallback {
    fn on_generation_start(&mut self, generation: usize) {
        let _ = self.sender.send(ProgressMessage::GenerationStart(generation));
    }

    fn on_generation_complete(&mut self, stats: &GenerationStats) {
        let _ = self.sender.send(ProgressMessage::GenerationComplete(stats.clone()));
    }

    fn on_candidate_evaluated(&mut self, candidate_num: usize, total: usize) {
        let _ = self.sender.send(ProgressMessage::CandidateEvaluated {
            current: candidate_num,
            total,
        });
    }
}
