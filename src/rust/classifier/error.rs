use std::path::PathBuf;

use crate::model_manager::ModelError;

/// Represents the different types of errors that can occur while loading a model
/// or classifying texts.
#[derive(Debug, thiserror::Error)]
pub enum ClassifierError {
    /// The model file could not be opened or is not a well-formed model
    #[error("Failed to load model from {path:?}: {reason}")]
    LoadError { path: PathBuf, reason: String },
    /// A caller supplied an argument outside its valid range
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    /// A label produced by the model has no entry in the configured code table
    #[error("Label '{label}' has no entry in the label code table")]
    UnmappedLabel { label: String },
    /// A label index lookup fell outside `[0, len)`
    #[error("Label index {index} out of range for {len} labels")]
    IndexError { index: usize, len: usize },
    /// Scoring failed for one text of a batch; the whole batch is aborted
    #[error("Prediction failed for text at index {index}: {reason}")]
    PredictionError { index: usize, reason: String },
    /// Error raised while resolving a model inside the local models directory
    #[error(transparent)]
    ModelManager(#[from] ModelError),
}

impl ClassifierError {
    pub(crate) fn load(path: impl Into<PathBuf>, err: &anyhow::Error) -> Self {
        Self::LoadError {
            path: path.into(),
            reason: format!("{:#}", err),
        }
    }

    /// Index of the batch slot that caused the failure, if any
    pub fn failed_index(&self) -> Option<usize> {
        match self {
            Self::PredictionError { index, .. } => Some(*index),
            _ => None,
        }
    }
}
