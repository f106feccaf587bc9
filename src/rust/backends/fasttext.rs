//! Loader for fastText `.bin` and `.ftz` models, backed by the fastText C++ library.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use fasttext::FastText;
use log::Level;

use crate::classifier::{LoadedModel, ModelLoader, TextScorer};
use crate::diagnostics::DiagnosticSink;

/// Disables fastText's own probability cut-off so every label is reported
const FASTTEXT_NO_THRESHOLD: f32 = -1.0;

#[derive(Debug, Default, Clone, Copy)]
pub struct FastTextLoader;

impl ModelLoader for FastTextLoader {
    fn open(&self, path: &Path, diagnostics: &dyn DiagnosticSink) -> Result<LoadedModel> {
        let path_str = path
            .to_str()
            .ok_or_else(|| anyhow!("model path is not valid UTF-8"))?;

        let mut model = FastText::new();
        model
            .load_model(path_str)
            .map_err(|e| anyhow!(e))
            .context("fastText rejected the model file")?;

        let (labels, counts) = model.get_labels().map_err(|e| anyhow!(e))?;
        diagnostics.emit(
            Level::Debug,
            &format!(
                "fastText model {:?}: {} labels seen in {} training examples",
                path,
                labels.len(),
                counts.iter().sum::<i64>()
            ),
        );

        let index = labels
            .iter()
            .enumerate()
            .map(|(i, label)| (label.clone(), i))
            .collect();

        Ok(LoadedModel {
            labels,
            scorer: Box::new(FastTextScorer { model, index }),
        })
    }
}

struct FastTextScorer {
    model: FastText,
    index: HashMap<String, usize>,
}

impl TextScorer for FastTextScorer {
    fn score(&self, text: &str) -> Result<Vec<f32>> {
        let num_labels = self.index.len();
        // All labels, so ranking and tie-breaks stay with `top_k`
        let predictions = self
            .model
            .predict(text, num_labels as i32, FASTTEXT_NO_THRESHOLD)
            .map_err(|e| anyhow!(e))?;

        let mut probs = vec![0.0; num_labels];
        for prediction in predictions {
            let i = *self
                .index
                .get(&prediction.label)
                .ok_or_else(|| anyhow!("fastText predicted unknown label '{}'", prediction.label))?;
            probs[i] = prediction.prob;
        }
        Ok(probs)
    }
}
