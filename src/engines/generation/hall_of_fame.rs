use crate::engines::generation::genome::Genome;
use crate::types::CandidateId;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Snapshot of a candidate that outlives its generation
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EliteGenome {
    pub genome: Genome,
    pub fitness: f64,
    pub candidate: CandidateId,
    pub generation: usize,
    pub accuracy: Option<f64>,
    pub canonical_string: String, // For deduplication
}

impl EliteGenome {
    pub fn new(genome: Genome, fitness: f64, candidate: CandidateId, generation: usize, accuracy: Option<f64>) -> Self {
        let canonical_string = genome.canonical_string();
        Self {
            genome,
            fitness,
            candidate,
            generation,
            accuracy,
            canonical_string,
        }
    }
}

/// Best distinct genomes of a run, sorted by fitness. The head is the
/// best-ever candidate; its fitness never decreases.
pub struct HallOfFame {
    genomes: Vec<EliteGenome>,
    max_size: usize,
    seen_signatures: HashSet<String>,
}

impl HallOfFame {
    pub fn new(max_size: usize) -> Self {
        Self {
            genomes: Vec::new(),
            max_size: max_size.max(1),
            seen_signatures: HashSet::new(),
        }
    }

    /// Attempt to add a genome. A genome already present only replaces its
    /// entry when it scores higher. Non-finite fitness is ignored.
    pub fn try_add(&mut self, elite: EliteGenome) -> bool {
        if !elite.fitness.is_finite() {
            return false;
        }

        if self.seen_signatures.contains(&elite.canonical_string) {
            let existing = self
                .genomes
                .iter_mut()
                .find(|e| e.canonical_string == elite.canonical_string);
            return match existing {
                Some(entry) if elite.fitness > entry.fitness => {
                    *entry = elite;
                    self.sort_and_trim();
                    true
                }
                _ => false,
            };
        }

        self.seen_signatures.insert(elite.canonical_string.clone());
        self.genomes.push(elite);
        self.sort_and_trim();
        true
    }

    fn sort_and_trim(&mut self) {
        // Sort by fitness (descending)
        self.genomes.sort_by(|a, b| {
            b.fitness.partial_cmp(&a.fitness).unwrap_or(std::cmp::Ordering::Equal)
        });

        while self.genomes.len() > self.max_size {
            if let Some(removed) = self.genomes.pop() {
                self.seen_signatures.remove(&removed.canonical_string);
            }
        }
    }

    pub fn best(&self) -> Option<&EliteGenome> {
        self.genomes.first()
    }

    pub fn get_all(&self) -> &[EliteGenome] {
        &self.genomes
    }

    pub fn get_top_n(&self, n: usize) -> &[EliteGenome] {
        &self.genomes[..n.min(self.genomes.len())]
    }

    pub fn filter_by_threshold(&self, min_fitness: f64) -> Vec<EliteGenome> {
        self.genomes
            .iter()
            .filter(|e| e.fitness >= min_fitness)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.genomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.genomes.is_empty()
    }

    pub fn clear(&mut self) {
        self.genomes.clear();
        self.seen_signatures.clear();
    }
}
