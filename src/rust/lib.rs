//! Batched, parallel top-k inference for fastText language identification models.
//!
//! # Basic Usage
//!
//! ```no_run
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use fasttext_parallel::{load_model, LabelCodes};
//!
//! let codes = LabelCodes::from_json_file("label_codes.json")?;
//! let classifier = load_model("model/lid.176.bin", Some(codes))?;
//!
//! let texts = ["你好", "春天在哪里", "hello", "how are you"];
//! let result = classifier.batch(&texts, 2, -1.0)?;
//! let (codes, probs) = result.to_arrays()?;
//! println!("{}\n{}", codes, probs);
//! # Ok(())
//! # }
//! ```
//!
//! # Thread Safety
//!
//! A [`Classifier`] owns a bounded worker pool and shares its read-only model
//! with every worker. `batch` blocks until every text has been scored and
//! always returns results in input order. The classifier can itself be
//! shared across threads using `Arc`:
//!
//! ```no_run
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use fasttext_parallel::Classifier;
//! use std::sync::Arc;
//! use std::thread;
//!
//! let classifier = Arc::new(Classifier::builder().with_threads(4).load("model/lid.176.bin")?);
//!
//! let mut handles = vec![];
//! for _ in 0..3 {
//!     let classifier = Arc::clone(&classifier);
//!     handles.push(thread::spawn(move || {
//!         classifier.batch(&["test text"], 1, -1.0).unwrap();
//!     }));
//! }
//!
//! for handle in handles {
//!     handle.join().unwrap();
//! }
//! # Ok(())
//! # }
//! ```
//!
//! Model files are read by a [`ModelLoader`]. The `fasttext` feature provides
//! one for fastText `.bin`/`.ftz` files and makes it the default.

pub mod backends;
pub mod classifier;
pub mod diagnostics;
pub mod model_manager;
mod runtime;

use std::path::Path;

pub use classifier::{
    top_k, BatchRequest, BatchResult, Classifier, ClassifierBuilder, ClassifierError, ClassifierInfo,
    LabelCode, LabelCodes, LabelMode, LabelRemapper, LabelSet, LoadedModel, ModelLoader, PredictedLabel,
    Prediction, ProbabilityDistribution, RankedEntry, StatsSnapshot, TextScorer, NO_THRESHOLD,
    PADDING_CODE,
};
pub use diagnostics::{DiagnosticSink, LogSink, NullSink};
pub use model_manager::{BuiltinModel, ModelError, ModelInfo, ModelManager};
pub use runtime::{create_thread_pool, RuntimeConfig, DEFAULT_CHANNEL_CAPACITY};

/// Loads a model with the default configuration, emitting label codes when
/// `label_codes` is given and native labels otherwise.
pub fn load_model(
    path: impl AsRef<Path>,
    label_codes: Option<LabelCodes>,
) -> Result<Classifier, ClassifierError> {
    let builder = Classifier::builder();
    match label_codes {
        Some(codes) => builder.with_label_codes(codes).load(path),
        None => builder.load(path),
    }
}

pub fn init_logger() {
    env_logger::init();
}
