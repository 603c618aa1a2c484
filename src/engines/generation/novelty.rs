/// Novelty archive for behavioural diversity
///
/// Keeps every behaviour signature seen during a run. The novelty of a new
/// signature is its mean Euclidean distance to the `k` closest archived ones.
/// The archive only grows.
#[derive(Debug, Clone)]
pub struct NoveltyArchive {
    signatures: Vec<Vec<f64>>,
    k: usize,
}

/// Novelty reported while the archive is empty
pub const EMPTY_ARCHIVE_NOVELTY: f64 = 1.0;

impl NoveltyArchive {
    pub fn new(k: usize) -> Self {
        Self {
            signatures: Vec::new(),
            k: k.max(1),
        }
    }

    /// Append without deduplication
    pub fn add(&mut self, signature: Vec<f64>) {
        self.signatures.push(signature);
    }

    pub fn novelty(&self, signature: &[f64]) -> f64 {
        if self.signatures.is_empty() {
            return EMPTY_ARCHIVE_NOVELTY;
        }

        let mut distances: Vec<f64> = self
            .signatures
            .iter()
            .map(|archived| euclidean_distance(signature, archived))
            .collect();
        distances.sort_by(|a, b| a.total_cmp(b));

        let k = self.k.min(distances.len());
        distances[..k].iter().sum::<f64>() / k as f64
    }

    pub fn len(&self) -> usize {
        self.signatures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signatures.is_empty()
    }

    pub fn k(&self) -> usize {
        self.k
    }

    pub fn signatures(&self) -> &[Vec<f64>] {
        &self.signatures
    }
}

/// Euclidean distance; the shorter vector is padded with zeros
pub fn euclidean_distance(a: &[f64], b: &[f64]) -> f64 {
    let len = a.len().max(b.len());
    (0..len)
        .map(|i| {
            let x = a.get(i).copied().unwrap_or(0.0);
            let y = b.get(i).copied().unwrap_or(0.0);
            (x - y).powi(2)
        })
        .sum::<f64>()
        .sqrt()
}
