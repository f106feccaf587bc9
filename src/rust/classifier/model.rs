use std::path::Path;

use anyhow::Result;

use crate::diagnostics::DiagnosticSink;

/// What a loader hands back after opening a model file: the labels in native
/// index order and the scoring function bound to them.
pub struct LoadedModel {
    pub labels: Vec<String>,
    pub scorer: Box<dyn TextScorer>,
}

impl std::fmt::Debug for LoadedModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadedModel")
            .field("labels", &self.labels.len())
            .finish_non_exhaustive()
    }
}

/// Opens a binary model. This is the only place the on-disk model format is touched.
pub trait ModelLoader: Send + Sync {
    /// Reads the model at `path`. Anything worth reporting during the load goes
    /// to `diagnostics` rather than straight to stderr.
    fn open(&self, path: &Path, diagnostics: &dyn DiagnosticSink) -> Result<LoadedModel>;
}

/// Scores a single text against a loaded model.
///
/// Implementations must be pure: the same text always yields the same
/// probabilities, and no shared state is mutated, so one scorer can serve
/// every worker of the pool at once.
pub trait TextScorer: Send + Sync {
    /// Returns one probability per label, indexed like the loader's label list.
    fn score(&self, text: &str) -> Result<Vec<f32>>;
}

/// Probabilities over a model's labels, indexed by native label index.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbabilityDistribution {
    probs: Vec<f32>,
}

impl ProbabilityDistribution {
    /// Wraps raw scorer output after checking it has one finite,
    /// non-negative entry per label.
    pub fn new(probs: Vec<f32>, num_labels: usize) -> Result<Self> {
        if probs.len() != num_labels {
            anyhow::bail!(
                "scorer returned {} probabilities for {} labels",
                probs.len(),
                num_labels
            );
        }
        if let Some((i, p)) = probs.iter().enumerate().find(|(_, p)| !p.is_finite() || **p < 0.0) {
            anyhow::bail!("invalid probability {} for label index {}", p, i);
        }
        Ok(Self { probs })
    }

    pub fn probs(&self) -> &[f32] {
        &self.probs
    }

    pub fn get(&self, index: usize) -> Option<f32> {
        self.probs.get(index).copied()
    }

    pub fn len(&self) -> usize {
        self.probs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.probs.is_empty()
    }

    pub fn total(&self) -> f32 {
        self.probs.iter().sum()
    }
}
