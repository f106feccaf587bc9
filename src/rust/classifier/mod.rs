mod batch;
mod builder;
mod classifier;
mod error;
mod labels;
mod model;
mod topk;

use std::path::PathBuf;

pub use batch::{BatchRequest, BatchResult, Prediction};
pub use builder::ClassifierBuilder;
pub use classifier::{Classifier, StatsSnapshot};
pub use error::ClassifierError;
pub use labels::{LabelCode, LabelCodes, LabelMode, LabelRemapper, LabelSet, PredictedLabel, PADDING_CODE};
pub use model::{LoadedModel, ModelLoader, ProbabilityDistribution, TextScorer};
pub use topk::{top_k, RankedEntry, NO_THRESHOLD};

/// Summary of a loaded classifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifierInfo {
    pub model_path: PathBuf,
    pub num_labels: usize,
    /// Whether labels are emitted as codes
    pub remapped: bool,
    pub num_threads: usize,
}
