use std::thread;

use anyhow::Result as AnyResult;
use crossbeam::channel::bounded;
use log::{debug, error};
use ndarray::Array2;
use rayon::prelude::*;
use rayon::ThreadPool;

use super::error::ClassifierError;
use super::labels::{LabelMode, LabelSet, PredictedLabel, PADDING_CODE};
use super::model::{ProbabilityDistribution, TextScorer};
use super::topk::{self, NO_THRESHOLD};

/// One ranked label for one text
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub label: PredictedLabel,
    /// Native index of the label, usable with `get_label_by_id`
    pub label_index: usize,
    pub prob: f32,
}

/// Texts to classify together with the ranking parameters
#[derive(Debug, Clone, PartialEq)]
pub struct BatchRequest {
    pub texts: Vec<String>,
    pub k: usize,
    pub threshold: f32,
}

impl BatchRequest {
    /// A request for the single best label of each text, unfiltered
    pub fn new(texts: Vec<impl Into<String>>) -> Self {
        Self {
            texts: texts.into_iter().map(Into::into).collect(),
            k: 1,
            threshold: NO_THRESHOLD,
        }
    }

    pub fn with_k(mut self, k: usize) -> Self {
        self.k = k;
        self
    }

    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold;
        self
    }
}

/// Ranked predictions for every text of a batch, in input order.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchResult {
    k: usize,
    /// Columns of the dense output: `k` capped at the label count
    width: usize,
    results: Vec<Vec<Prediction>>,
}

impl BatchResult {
    pub fn k(&self) -> usize {
        self.k
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Predictions for the text at `index`, best first
    pub fn get(&self, index: usize) -> Option<&[Prediction]> {
        self.results.get(index).map(Vec::as_slice)
    }

    pub fn iter(&self) -> impl Iterator<Item = &[Prediction]> {
        self.results.iter().map(Vec::as_slice)
    }

    pub fn labels(&self) -> Vec<Vec<PredictedLabel>> {
        self.results
            .iter()
            .map(|row| row.iter().map(|p| p.label.clone()).collect())
            .collect()
    }

    pub fn probs(&self) -> Vec<Vec<f32>> {
        self.results
            .iter()
            .map(|row| row.iter().map(|p| p.prob).collect())
            .collect()
    }

    /// Splits into the two parallel ragged sequences of labels and probabilities
    pub fn into_parts(self) -> (Vec<Vec<PredictedLabel>>, Vec<Vec<f32>>) {
        self.results
            .into_iter()
            .map(|row| -> (Vec<PredictedLabel>, Vec<f32>) {
                row.into_iter().map(|p| (p.label, p.prob)).unzip()
            })
            .unzip()
    }

    pub fn into_inner(self) -> Vec<Vec<Prediction>> {
        self.results
    }

    /// Dense `(texts, min(k, labels))` matrices of codes and probabilities.
    /// Short rows are padded with code `-1` and probability `0.0`.
    ///
    /// # Errors
    /// `InvalidArgument` when the classifier emits native labels instead of codes.
    pub fn to_arrays(&self) -> Result<(Array2<i16>, Array2<f32>), ClassifierError> {
        let shape = (self.results.len(), self.width);
        let mut codes = Array2::from_elem(shape, PADDING_CODE);
        let mut probs = Array2::<f32>::zeros(shape);
        for (i, row) in self.results.iter().enumerate() {
            for (j, prediction) in row.iter().enumerate() {
                codes[[i, j]] = prediction.label.as_code().ok_or_else(|| {
                    ClassifierError::InvalidArgument(
                        "dense output requires a classifier loaded with label codes".into(),
                    )
                })?;
                probs[[i, j]] = prediction.prob;
            }
        }
        Ok((codes, probs))
    }
}

/// Borrowed view of a classifier's shared, read-only state used to score texts.
pub(crate) struct BatchScorer<'a> {
    pub(crate) scorer: &'a dyn TextScorer,
    pub(crate) labels: &'a LabelSet,
    pub(crate) label_mode: &'a LabelMode,
    pub(crate) pool: &'a ThreadPool,
    pub(crate) channel_capacity: usize,
}

impl BatchScorer<'_> {
    pub(crate) fn score(&self, text: &str) -> AnyResult<ProbabilityDistribution> {
        let probs = self.scorer.score(text)?;
        ProbabilityDistribution::new(probs, self.labels.len())
    }

    /// Scores, ranks and relabels one text. `index` only tags errors.
    pub(crate) fn rank(
        &self,
        index: usize,
        text: &str,
        k: usize,
        threshold: f32,
    ) -> Result<Vec<Prediction>, ClassifierError> {
        let dist = self.score(text).map_err(|e| ClassifierError::PredictionError {
            index,
            reason: format!("{:#}", e),
        })?;
        topk::select(&dist, k, threshold)
            .into_iter()
            .map(|entry| {
                let native = self.labels.label_at(entry.index)?;
                Ok(Prediction {
                    label: self.label_mode.emit(native)?,
                    label_index: entry.index,
                    prob: entry.prob,
                })
            })
            .collect()
    }

    /// Fans the texts out over the pool. Workers send `(index, result)` pairs
    /// through a bounded channel and the calling thread writes each into its
    /// slot, so completion order never affects output order.
    pub(crate) fn run<S>(&self, texts: &[S], k: usize, threshold: f32) -> Result<BatchResult, ClassifierError>
    where
        S: AsRef<str> + Sync,
    {
        topk::validate_k(k)?;
        topk::validate_threshold(threshold)?;
        let width = k.min(self.labels.len());
        if texts.is_empty() {
            return Ok(BatchResult { k, width, results: Vec::new() });
        }

        debug!("Scoring batch of {} texts (k = {}, threshold = {})", texts.len(), k, threshold);
        let mut slots: Vec<Option<Result<Vec<Prediction>, ClassifierError>>> =
            (0..texts.len()).map(|_| None).collect();
        let (sender, receiver) = bounded(self.channel_capacity.max(1));

        thread::scope(|s| {
            s.spawn(move || {
                self.pool.install(|| {
                    texts.par_iter().enumerate().for_each_with(sender, |sender, (i, text)| {
                        let result = self.rank(i, text.as_ref(), k, threshold);
                        // The collector only hangs up when it panics
                        let _ = sender.send((i, result));
                    });
                });
                debug!("Batch workers finished");
            });

            for (i, result) in receiver {
                slots[i] = Some(result);
            }
        });

        let mut results = Vec::with_capacity(slots.len());
        for (i, slot) in slots.into_iter().enumerate() {
            match slot {
                Some(Ok(predictions)) => results.push(predictions),
                Some(Err(e)) => {
                    error!("Batch aborted: {}", e);
                    return Err(e);
                }
                None => {
                    return Err(ClassifierError::PredictionError {
                        index: i,
                        reason: "no result was produced for this text".into(),
                    })
                }
            }
        }
        Ok(BatchResult { k, width, results })
    }
}
