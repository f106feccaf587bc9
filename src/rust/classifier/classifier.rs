use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use rayon::ThreadPool;

use super::batch::{BatchRequest, BatchResult, BatchScorer, Prediction};
use super::error::ClassifierError;
use super::labels::{LabelMode, LabelSet};
use super::model::{ProbabilityDistribution, TextScorer};
use crate::runtime::RuntimeConfig;

/// A loaded model ready for batched top-k prediction.
///
/// # Thread Safety
///
/// The model, the label dictionary and the code table are immutable after
/// loading and shared by reference with every worker; scoring takes no locks.
/// The handle itself is `Send + Sync` and can be wrapped in an `Arc` to serve
/// several callers.
///
/// ```no_run
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// use fasttext_parallel::{Classifier, LabelCodes};
///
/// let classifier = Classifier::builder()
///     .with_label_codes(LabelCodes::new([("__label__en", 0), ("__label__zh", 1)])?)
///     .load("model/lid.176.bin")?;
///
/// let result = classifier.batch(&["hello", "你好"], 1, -1.0)?;
/// let (labels, probs) = result.into_parts();
/// println!("{:?} {:?}", labels, probs);
/// # Ok(())
/// # }
/// ```
pub struct Classifier {
    pub(crate) model_path: PathBuf,
    pub(crate) labels: Arc<LabelSet>,
    pub(crate) scorer: Arc<dyn TextScorer>,
    pub(crate) label_mode: LabelMode,
    pub(crate) pool: Arc<ThreadPool>,
    pub(crate) runtime_config: RuntimeConfig,
    pub(crate) stats: ClassifierStats,
}

// Compile-time verification of thread-safety
const _: () = {
    fn assert_send_sync<T: Send + Sync>() {}
    fn verify_thread_safety() {
        assert_send_sync::<Classifier>();
    }
};

impl std::fmt::Debug for Classifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Classifier")
            .field("model_path", &self.model_path)
            .field("num_labels", &self.labels.len())
            .field("label_mode", &self.label_mode)
            .field("num_threads", &self.pool.current_num_threads())
            .finish()
    }
}

/// Counters kept for instrumentation only
#[derive(Debug, Default)]
pub(crate) struct ClassifierStats {
    batches: AtomicU64,
    texts: AtomicU64,
    failed_batches: AtomicU64,
}

/// Snapshot of a classifier's counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatsSnapshot {
    pub batches: u64,
    pub texts: u64,
    pub failed_batches: u64,
}

impl ClassifierStats {
    pub(crate) fn record(&self, texts: usize, failed: bool) {
        self.batches.fetch_add(1, Ordering::Relaxed);
        self.texts.fetch_add(texts as u64, Ordering::Relaxed);
        if failed {
            self.failed_batches.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            batches: self.batches.load(Ordering::Relaxed),
            texts: self.texts.load(Ordering::Relaxed),
            failed_batches: self.failed_batches.load(Ordering::Relaxed),
        }
    }
}

impl Classifier {
    /// Creates a new ClassifierBuilder for fluent construction
    pub fn builder() -> super::builder::ClassifierBuilder {
        super::builder::ClassifierBuilder::new()
    }

    /// Returns information about the classifier's current state
    pub fn info(&self) -> super::ClassifierInfo {
        super::ClassifierInfo {
            model_path: self.model_path.clone(),
            num_labels: self.labels.len(),
            remapped: self.label_mode.is_remapped(),
            num_threads: self.pool.current_num_threads(),
        }
    }

    pub fn model_path(&self) -> &Path {
        &self.model_path
    }

    /// The model's labels in native index order
    pub fn get_labels(&self) -> &LabelSet {
        &self.labels
    }

    /// # Errors
    /// `IndexError` when `index` is outside `[0, number of labels)`.
    pub fn get_label_by_id(&self, index: usize) -> Result<&str, ClassifierError> {
        self.labels.label_at(index)
    }

    pub fn label_mode(&self) -> &LabelMode {
        &self.label_mode
    }

    pub fn runtime_config(&self) -> &RuntimeConfig {
        &self.runtime_config
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Scores one text, returning the probability of every label.
    ///
    /// Scoring is pure: the same text always produces the same distribution.
    /// A failure is reported as a `PredictionError` at index 0.
    pub fn score(&self, text: &str) -> Result<ProbabilityDistribution, ClassifierError> {
        self.scorer_view()
            .score(text)
            .map_err(|e| ClassifierError::PredictionError { index: 0, reason: format!("{:#}", e) })
    }

    /// Top-k prediction for a single text, computed on the calling thread.
    pub fn predict(
        &self,
        text: &str,
        k: usize,
        threshold: f32,
    ) -> Result<Vec<Prediction>, ClassifierError> {
        super::topk::validate_k(k)?;
        super::topk::validate_threshold(threshold)?;
        self.scorer_view().rank(0, text, k, threshold)
    }

    /// Top-k prediction for every text, spread over the worker pool.
    ///
    /// `threshold` is `-1.0` for no filtering or an inclusive lower bound in
    /// `[0, 1]`. The result has one entry per text, in input order. If any
    /// text fails, the whole call fails with the error of the lowest failing
    /// index.
    pub fn batch<S>(&self, texts: &[S], k: usize, threshold: f32) -> Result<BatchResult, ClassifierError>
    where
        S: AsRef<str> + Sync,
    {
        super::topk::validate_k(k)?;
        super::topk::validate_threshold(threshold)?;
        let result = self.scorer_view().run(texts, k, threshold);
        self.stats.record(texts.len(), result.is_err());
        result
    }

    pub fn run(&self, request: &BatchRequest) -> Result<BatchResult, ClassifierError> {
        self.batch(&request.texts, request.k, request.threshold)
    }

    fn scorer_view(&self) -> BatchScorer<'_> {
        BatchScorer {
            scorer: self.scorer.as_ref(),
            labels: &self.labels,
            label_mode: &self.label_mode,
            pool: &self.pool,
            channel_capacity: self.runtime_config.channel_capacity,
        }
    }
}
